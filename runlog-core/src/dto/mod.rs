//! Data Transfer Objects for the HTTP surface
//!
//! Request and response bodies exchanged between the server and its
//! clients (CLI, dashboards, pipeline producers).

pub mod log;
pub mod run;

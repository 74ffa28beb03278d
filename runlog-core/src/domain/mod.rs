//! Core domain types
//!
//! These types are what the server persists in the blob store and what
//! clients receive back. The same structures are shared between producers
//! (which append log entries), readers and the cancellation coordinator.

pub mod cancel;
pub mod log;
pub mod run;

//! Runlog Core
//!
//! Core types shared by the runlog server, client and CLI.
//!
//! This crate contains:
//! - Domain types: log entries, run records, cancellation flags
//! - DTOs: request/response shapes for the HTTP surface

pub mod domain;
pub mod dto;

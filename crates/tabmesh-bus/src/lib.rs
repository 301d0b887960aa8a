//! tabmesh Bus - local broadcast transport
//!
//! This crate provides:
//! - Named fan-out channels shared by every attached endpoint
//! - At-most-once, per-sender-ordered delivery
//! - A background receive loop adapter

pub mod local;

pub use local::*;

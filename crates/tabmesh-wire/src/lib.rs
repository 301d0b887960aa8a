//! tabmesh Wire Format - envelope encoding
//!
//! Everything that crosses the bus is one envelope:
//! - `ping` / `pong` presence probes
//! - `broadcast` named event, optionally ack-requesting
//! - `done` wait-broadcast acknowledgement
//! - `var` variable replication

pub mod envelope;

pub use envelope::*;

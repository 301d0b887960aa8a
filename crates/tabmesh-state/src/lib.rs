//! tabmesh State - local halves of the shared state
//!
//! This crate implements the two purely local stores:
//! - Variable map with last-writer-wins remote application
//! - Registry of declared message and variable names
//!
//! Neither store touches the bus; the runtime node wires mutations to
//! envelope publishes and remote envelopes back into the stores.

pub mod registry;
pub mod variables;

pub use registry::*;
pub use variables::*;

//! SyncMesh Protocol - wire types for the mesh admin API
//!
//! Defines the node and message records served by every mesh node's
//! `/admin` and `/api/messages` endpoints, plus the decoding rules the
//! console applies to their bodies.

pub mod constants;
pub mod error;
pub mod types;

pub use constants::*;
pub use error::*;
pub use types::*;

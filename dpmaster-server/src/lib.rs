#![warn(missing_docs)]

//! Core logic for the dpmaster-lineage UDP master server: the server registry, the
//! per-message handlers, and their ambient collaborators (accepted-games policy,
//! address-map table, configuration). The binary entry point (`src/main.rs`) wires these
//! into an actual `tokio` UDP receive loop; everything in this crate is synchronous and
//! independent of any executor, so it can be exercised directly in tests.

pub mod addrmap;
pub mod config;
pub mod error;
pub mod handlers;
pub mod policy;
pub mod registry;

pub use error::HandlerError;
pub use handlers::{
    handle_getservers, handle_getserversext, handle_heartbeat, handle_inforesponse, Outbound,
};
pub use registry::{Registry, ServerEntry, ServerState};

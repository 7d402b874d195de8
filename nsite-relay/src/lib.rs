//! Event network access for nsite
//!
//! Index records are small signed events appended to a log keyed by the
//! site's public key. This crate provides:
//! - The event model and its canonical id/signature scheme
//! - Mapping between events and `FileRecord`s / server lists
//! - The `EventNetwork` trait used by the sync engine
//! - A directory-backed log and an in-memory network implementing it

pub mod errors;
pub mod event;
pub mod local;
pub mod memory;
pub mod network;
pub mod records;

pub use errors::{RelayError, Result};
pub use event::{
    Event, EventTemplate, KIND_DELETION, KIND_SERVER_LIST, KIND_SITE_FILE,
};
pub use local::LocalEventLog;
pub use memory::MemoryEventNetwork;
pub use network::{EventNetwork, Filter};
pub use records::{
    deletion_template, file_record_template, parse_file_record, parse_server_list,
    server_list_template,
};

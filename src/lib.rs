//! coedit - real-time collaborative document synchronization core
//!
//! Multiple concurrently connected participants edit one shared text
//! buffer, see each other's caret positions on join, and jointly undo/redo
//! edits. Edits are applied under a serialized event model - one hub task
//! owns all session state and handles every inbound message to completion
//! before the next - so there is no OT/CRDT merging and no locking of
//! session content.
//!
//! ## Modules
//!
//! - **hub**: the serialized command loop owning all session state
//! - **session**: document sessions, participants, history snapshots, registry
//! - **engine**: edit application (splice, undo, redo)
//! - **broadcast**: the channel capability and fan-out dispatcher
//! - **server**: hyper/tungstenite transport binding
//! - **auth** / **directory**: injected admission and display-name seams

pub mod auth;
pub mod broadcast;
pub mod config;
pub mod directory;
pub mod engine;
pub mod hub;
pub mod protocol;
pub mod server;
pub mod session;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{CoeditError, Result};

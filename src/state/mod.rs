//! Persisted run state.
//!
//! A JSON document in the project directory recording which remote thing
//! this project maps to and the remote metadata of every asset synced so
//! far. It lets a later run skip discovery and resume after a failure.

pub mod error;
pub mod store;
pub mod types;

pub use error::StateError;
pub use store::StateFile;
pub use types::RunState;

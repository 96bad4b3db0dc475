//! Listen-along sessions: which connections mirror which host.

pub mod manager;

pub use manager::{DisconnectOutcome, ListenAlongManager, StartRejection};

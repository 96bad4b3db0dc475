//! Listen-along wire protocol: message types, serialization, and validation.

pub mod serializer;
pub mod types;
pub mod validator;

pub use types::{ClientMessage, DirectMessage, ServerMessage};

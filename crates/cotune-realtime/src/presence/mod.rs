//! User presence: "now playing" activity per identity.

pub mod activity;

pub use activity::ActivityDirectory;

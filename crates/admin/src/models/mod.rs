//! Session-held state of the panel.

pub mod session;

pub use session::{keys as session_keys, set_flash, take_flash};

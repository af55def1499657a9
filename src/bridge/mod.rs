//! Clipboard/input bridge: primitive operations over OS input injection.
//!
//! Everything the rest of the crate does to a target surface goes through
//! these primitives — clipboard exchange, simulated key combos, pointer
//! clicks and debug screenshots. No decision logic lives here.

pub mod executor;
pub mod input;

pub use executor::{CommandExecutor, SystemCommandExecutor};
pub use input::{InputBridge, KeyCombo};

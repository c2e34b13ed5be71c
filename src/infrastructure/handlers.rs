//! Item handlers built from scripts

pub mod command_handler;
pub mod selector_handler;

pub use command_handler::{CommandHandler, CommandScript};
pub use selector_handler::{SelectorHandler, SelectorScript};

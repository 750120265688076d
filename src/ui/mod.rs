//! Line-oriented interactive host for the feed controller.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and signal handling
//! - `input` - Command parsing and dispatch
//! - `render` - Plain-text snapshot rendering

mod input;
mod loop_runner;
mod render;

pub use loop_runner::{run, Action};

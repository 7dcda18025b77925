//! dagboard-tui: terminal host for the DAG status table.
//!
//! Owns everything around `dagboard-core`: config, logging, the item source,
//! action pass-through, the countdown ticker, rendering and the event loop.

pub mod actions;
pub mod app;
pub mod cli;
pub mod config;
pub mod input;
pub mod logging;
pub mod render;
pub mod runtime;
pub mod source;
pub mod ticker;

/// Crate identity label.
pub fn crate_label() -> &'static str {
    "dagboard-tui"
}

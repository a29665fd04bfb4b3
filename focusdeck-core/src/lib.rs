pub mod config;
pub mod error;
pub mod keys;

// Selection and list models
pub mod cursor;
pub mod list_model;

// Contexts and the focus stack
pub mod context;
pub mod focus;
pub mod list_context;

// Input routing and status reporting
pub mod keybinding;
pub mod report;

// Asynchronous main-view rendering
pub mod render;

// Headless run results
pub mod result;

pub use error::{Error, Result};

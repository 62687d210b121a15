//! HTTP request handlers.

pub mod common;
pub mod health;
pub mod history;
pub mod predict;

pub use health::*;
pub use history::*;
pub use predict::*;

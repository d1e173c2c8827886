//! Application layer managing worksheet state and the cell update workflow.
//!
//! This module sits between the formula domain and the outside world: it owns
//! the grid and applies user input to it.

pub mod state;

pub use state::*;

//! Infrastructure layer providing external service integrations.
//!
//! This module contains the file formats the command-line driver reads and
//! writes: CSV grids and JSON evaluation reports.

pub mod grid_io;

pub use grid_io::*;

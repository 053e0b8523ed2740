//! Utility types and functions for tilepack.
//!
//! This module contains fundamental pieces used throughout the library:
//! - [`Error`] / [`Result`] - Error handling
//! - [`Cursor`] - Explicit little-endian read cursor
//! - Padding helpers for the 4-byte alignment every format requires

mod cursor;
mod error;
mod pad;

pub use cursor::*;
pub use error::*;
pub use pad::*;

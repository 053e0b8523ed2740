//! Tile containers: b3dm, i3dm, and pnts.
//!
//! The three table-bearing formats share one layout — fixed header, feature
//! table, batch table, optional payload — and differ only in the constants
//! captured by [`FormatSpec`]. [`codec::encode`] and [`codec::decode`] are
//! the single entry points for all of them.

pub mod codec;
pub mod format;

pub use codec::{decode, encode, DecodedTile, Payload};
pub use format::{FormatSpec, B3DM, I3DM, PNTS};

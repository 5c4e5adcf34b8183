//! DVB subtitle (ETSI EN 300 743) decoding and page composition.
//!
//! Packets are scanned into segments, grouped into display sets and epochs,
//! and rendered by replaying the epoch of the requested display set.

mod bits;
mod clut;
mod compositor;
mod display;
mod display_set;
mod epoch;
mod error;
mod object;
mod page;
mod pixel;
mod region;
mod render;
mod scanner;
mod segment;
mod stream;
mod text;
mod tree;

#[cfg(test)]
pub(crate) mod testutil;

pub use bits::*;
pub use clut::*;
pub use compositor::*;
pub use display::*;
pub use display_set::*;
pub use epoch::*;
pub use error::*;
pub use object::*;
pub use page::*;
pub use pixel::*;
pub use region::*;
pub use render::*;
pub use scanner::*;
pub use segment::*;
pub use stream::*;
pub use text::*;
pub use tree::*;

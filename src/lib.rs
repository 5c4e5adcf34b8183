//! # dvbsub
//!
//! Decoder and renderer for DVB bitmap subtitles (ETSI EN 300 743).
//!
//! Subtitle PES payloads are scanned into segments, grouped into display sets
//! and epochs, and rendered to RGBA pages by replaying the epoch of the
//! requested display set. The library compiles to WebAssembly for use in web
//! players and works as a plain Rust library as well.

mod dvb;
mod renderer;
mod utils;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global allocator.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize the WASM module. Call this once before using other functions.
#[wasm_bindgen(start)]
pub fn init() {
    // Set up better error messages for panics in debug builds
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

// Re-export main types
pub use dvb::*;
pub use renderer::*;

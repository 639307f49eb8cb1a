//! Codecs for PaRappa the Rapper 2 asset containers: `.INT` resource archives,
//! `.HD`/`.BD` sound banks and standalone `.VAG` samples.

mod be;
mod error;
mod grab;

pub mod compression;
pub mod hd;
pub mod int;
pub mod lzss;
pub mod vag;

pub use {
    compression::{Compression, CompressionError},
    error::{Error, Result},
    hd::AudioBank,
    int::{IntCodec, IntContainer},
    lzss::Lzss,
    vag::Vag,
};

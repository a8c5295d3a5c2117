#![no_std]
#![cfg_attr(docs_rs, feature(doc_cfg))]
//#![warn(missing_docs)]

//! A PNG and APNG codec.
//!
//! Decoding turns a PNG data stream into a [`RawImage`](png::RawImage) (or an
//! [`AnimatedImage`](png::AnimatedImage) with the `apng` feature), encoding
//! turns a `RawImage` back into a data stream. See the [`png`] module for
//! the details and for driving the codec with your own DEFLATE backend.
//!
//! ```
//! # #[cfg(feature = "miniz_oxide")] {
//! use pngine::png::{PixelData, RawImage};
//!
//! let data = PixelData::U8(vec![255, 0, 0, 0, 0, 255]);
//! let image = RawImage::from_channels(2, 1, 3, 8, data).unwrap();
//! let bytes = pngine::encode(&image, Default::default()).unwrap();
//! let back = pngine::decode(&bytes, Default::default()).unwrap();
//! assert_eq!(back.data, image.data);
//! # }
//! ```

extern crate alloc;

#[cfg(target_pointer_width = "16")]
compile_error!("this crate assumes 32-bit or bigger pointers!");

mod error;
pub use error::*;

pub mod bit_depth;
pub mod io_buffer;
pub mod png;

#[cfg(feature = "miniz_oxide")]
use alloc::vec::Vec;

/// Decodes a PNG into a single image.
///
/// For an animated PNG this gives the default image.
#[cfg(feature = "miniz_oxide")]
#[cfg_attr(docs_rs, doc(cfg(feature = "miniz_oxide")))]
pub fn decode(bytes: &[u8], options: png::DecoderOptions) -> PngResult<png::RawImage> {
  png::PngDecoder::<png::ZlibInflator>::new(bytes, options).decode()
}

/// Decodes every frame of an animated PNG.
#[cfg(all(feature = "miniz_oxide", feature = "apng"))]
#[cfg_attr(docs_rs, doc(cfg(all(feature = "miniz_oxide", feature = "apng"))))]
pub fn decode_apng(bytes: &[u8], options: png::DecoderOptions) -> PngResult<png::AnimatedImage> {
  png::PngDecoder::<png::ZlibInflator>::new(bytes, options).decode_apng()
}

/// Encodes an image as a PNG data stream.
#[cfg(feature = "miniz_oxide")]
#[cfg_attr(docs_rs, doc(cfg(feature = "miniz_oxide")))]
pub fn encode(image: &png::RawImage, options: png::EncoderOptions) -> PngResult<Vec<u8>> {
  Ok(png::PngEncoder::<png::ZlibDeflater>::new(image, options)?.encode())
}

#![forbid(unsafe_code)]

//! Holds all the tools for decoding and encoding PNG data.
//!
//! ## Quick Use
//! With the `miniz_oxide` feature (on by default) the crate root offers
//! [`decode`](crate::decode), [`decode_apng`](crate::decode_apng) and
//! [`encode`](crate::encode), which do everything in one call.
//!
//! ## The Format
//! A PNG is an 8-byte signature followed by a series of "chunks". Each chunk
//! is a big-endian `u32` length, a four byte type tag, the body, and a CRC-32
//! of the tag and body. There's four "critical" chunk types:
//! * **Header** (`IHDR`) - Dimensions, bit depth, color type, and interlace
//!   method. Always the first chunk.
//! * **Palette** (`PLTE`) - For indexed images, what index values map to what
//!   colors. Must come before the image data.
//! * **Image Data** (`IDAT`) - One or more chunks of compressed data. All of
//!   them together form a single zlib data stream.
//! * **End** (`IEND`) - The last chunk.
//!
//! Ancillary chunks that this crate understands are `tRNS`, `iCCP`, `tEXt`,
//! and `pHYs`. With the `apng` feature the animation chunks `acTL`, `fcTL`
//! and `fdAT` are understood too. Anything else is skipped.
//!
//! Once decompressed, the image data is a series of scanlines, each with a
//! leading filter tag byte. The lines are unfiltered (see [`FilterType`]) and,
//! for interlaced images, scattered back from the seven reduced images of the
//! Adam7 scheme (see [`ADAM7`]).
//!
//! ## Doing It Yourself
//! [`PngDecoder`] and [`PngEncoder`] are generic over the DEFLATE
//! implementation through the [`Decompressor`] and [`Compressor`] traits, so
//! they can be used without `miniz_oxide` by plugging in another backend.

use alloc::{
  borrow::Cow,
  collections::BTreeMap,
  string::{String, ToString},
  vec,
  vec::Vec,
};
use core::fmt::{Debug, Display, Write};

use log::{debug, trace, warn};

use crate::{bit_depth::*, io_buffer::*, PngError, PngResult};

mod chunk_type;
pub use chunk_type::*;

mod crc32;
pub use crc32::*;

mod header;
pub use header::*;

mod image;
pub use image::*;

mod filter;
pub use filter::*;

mod interlace;
pub use interlace::*;

mod indexed;
pub use indexed::*;

mod text;
pub use text::*;

mod zlib;
pub use zlib::*;

mod decoder;
pub use decoder::*;

#[cfg(feature = "apng")]
mod apng;
#[cfg(feature = "apng")]
pub use apng::*;

mod encoder;
pub use encoder::*;


/// The first eight bytes of every PNG data stream.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Checks if the bytes begin with the PNG signature.
#[inline]
#[must_use]
pub fn has_png_signature(bytes: &[u8]) -> bool {
  bytes.starts_with(&PNG_SIGNATURE)
}

/// Consumes the signature from the cursor.
///
/// On failure the error names the first wrong byte and where it was.
pub(crate) fn check_signature<C: ByteCursor>(cursor: &mut C) -> PngResult<()> {
  for (i, &expected) in PNG_SIGNATURE.iter().enumerate() {
    let offset = cursor.offset();
    match cursor.read_u8() {
      Ok(b) if b == expected => (),
      Ok(b) => return Err(PngError::Signature { offset, found: Some(b), expected }),
      Err(_) => return Err(PngError::Signature { offset: i, found: None, expected }),
    }
  }
  Ok(())
}

/// Writes the signature at the cursor.
#[inline]
pub(crate) fn write_signature<C: ByteCursor>(cursor: &mut C) {
  cursor.write_bytes(&PNG_SIGNATURE);
}

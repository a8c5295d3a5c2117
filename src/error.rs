use alloc::string::String;

use thiserror::Error;

use crate::png::{ChunkType, ColorType};

/// Shorthand for results with a [`PngError`].
pub type PngResult<T> = Result<T, PngError>;

/// An error from the `pngine` crate.
///
/// Every decode and encode failure is fatal for the call that produced it,
/// there's no partial output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PngError {
  /// The first eight bytes aren't the PNG signature.
  ///
  /// `found` is `None` when the input ended before `offset`.
  #[error("wrong PNG signature: found {found:?} at offset {offset}, expected {expected}")]
  Signature { offset: usize, found: Option<u8>, expected: u8 },

  /// A read went past the end of the input.
  #[error(
    "unexpected end of data: needed {needed} bytes at offset {offset}, {available} available"
  )]
  UnexpectedEof { offset: usize, needed: usize, available: usize },

  /// The stored CRC of a chunk doesn't match its content.
  #[error("CRC mismatch for chunk {chunk}. Expected {expected:#010x}, found {actual:#010x}")]
  CrcMismatch { chunk: ChunkType, expected: u32, actual: u32 },

  /// A chunk handler consumed a different number of bytes than declared.
  #[error("length mismatch while decoding chunk {chunk}: declared {declared}, consumed {consumed}")]
  ChunkLength { chunk: ChunkType, declared: u32, consumed: usize },

  /// A chunk appeared somewhere the format forbids.
  #[error("chunk {chunk} is out of order: {reason}")]
  ChunkOrder { chunk: ChunkType, reason: &'static str },

  /// A field holds a value outside of what the format allows.
  #[error("invalid {field}: {value}")]
  InvalidHeader { field: &'static str, value: u32 },

  /// The bit depth isn't allowed for the color type.
  #[error("invalid bit depth {depth} for color type {color_type:?}")]
  IllegalBitDepth { color_type: ColorType, depth: u8 },

  /// PLTE length is not a multiple of 3, or the entry count is out of range.
  #[error("PLTE field length must be a multiple of 3 and hold 1 to 256 entries. Got {length}")]
  PaletteLength { length: usize },

  /// An indexed image has no palette.
  #[error("color palette is undefined")]
  MissingPalette,

  /// A pixel refers past the end of the palette.
  #[error("palette index {index} out of range for a palette of {len} colors")]
  PaletteIndex { index: u8, len: usize },

  /// tRNS chunk for grey or truecolor has an odd length.
  #[error("tRNS chunk length must be a multiple of 2. Got {length}")]
  TransparencyLength { length: usize },

  /// tRNS chunk holds more entries than the image allows.
  #[error("tRNS chunk contains more alpha values than there are {limit_name} ({found} vs {limit})")]
  TransparencyCount { found: usize, limit: usize, limit_name: &'static str },

  /// tRNS used with a color type that already carries alpha.
  #[error("tRNS chunk is not supported for color type {color_type:?}")]
  TransparencyColorType { color_type: ColorType },

  /// Scanline filter tag outside of 0..=4.
  #[error("unsupported filter: {filter}")]
  UnsupportedFilter { filter: u8 },

  /// fcTL dispose op outside of 0..=2.
  #[error("unknown dispose op: {0}")]
  UnknownDisposeOp(u8),

  /// fcTL blend op outside of 0..=1.
  #[error("unknown blend op: {0}")]
  UnknownBlendOp(u8),

  /// A frame region doesn't fit within the canvas.
  #[error(
    "frame {sequence_number} region {width}x{height}+{x_offset}+{y_offset} doesn't fit the canvas"
  )]
  FrameGeometry { sequence_number: u32, width: u32, height: u32, x_offset: u32, y_offset: u32 },

  /// The animation canvas can't be allocated.
  #[error("canvas of {width}x{height} with {channels} channels is too large to composite")]
  CanvasSize { width: u32, height: u32, channels: u8 },

  /// acTL declared a different number of frames than the stream carries.
  #[error("animation declares {declared} frames but {found} were found")]
  FrameCount { declared: u32, found: usize },

  /// A pixel buffer doesn't match the size implied by the image geometry.
  #[error("wrong data size. Found {found}, expected {expected}")]
  DataSize { found: usize, expected: usize },

  /// Byte samples given for 16-bit depth, or 16-bit samples for other depths.
  #[error("sample buffer type doesn't match bit depth {depth}")]
  SampleType { depth: u8 },

  /// Channel count outside of 1..=4.
  #[error("unsupported number of channels: {0}")]
  InvalidChannels(u8),

  /// Width or height is zero.
  #[error("{name} must be a positive integer")]
  InvalidDimension { name: &'static str },

  /// Text isn't representable as a PNG keyword or latin-1 value.
  #[error("{0}")]
  InvalidText(&'static str),

  /// The decompressor reported an error.
  #[error("error while decompressing the data: {0}")]
  Decompression(String),

  /// Not enough decompressed image data for the image geometry.
  #[error("not enough image data: found {found} bytes, expected {expected}")]
  ImageDataLength { found: usize, expected: usize },
}

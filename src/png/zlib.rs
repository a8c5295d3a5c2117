//! The DEFLATE collaborators.
//!
//! The codec never compresses or decompresses on its own, it drives a
//! [`Decompressor`] and a [`Compressor`]. With the `miniz_oxide` feature
//! there's a default for each.

use super::*;

#[cfg(feature = "miniz_oxide")]
use alloc::{boxed::Box, format};
#[cfg(feature = "miniz_oxide")]
use miniz_oxide::{
  deflate::compress_to_vec_zlib,
  inflate::stream::{inflate, InflateState},
  DataFormat, MZError, MZFlush, MZStatus,
};

/// An incremental zlib decompressor.
///
/// Bytes are pushed in arrival order. The output is only complete once a
/// push with `is_final` set has happened, and [`error`](Self::error) must be
/// checked after every push.
pub trait Decompressor {
  /// Feeds more compressed bytes.
  fn push(&mut self, bytes: &[u8], is_final: bool);

  /// Everything decompressed so far.
  fn result(&self) -> &[u8];

  /// Moves the output out, leaving an empty buffer behind.
  fn take_result(&mut self) -> Vec<u8>;

  /// The first error hit, if any. Once set, further pushes do nothing.
  fn error(&self) -> Option<&str>;

  /// Starts over for a new zlib stream.
  fn reset(&mut self);

  /// Turns the error state into a `PngResult`.
  #[inline]
  fn check(&self) -> PngResult<()> {
    match self.error() {
      Some(msg) => Err(PngError::Decompression(msg.to_string())),
      None => Ok(()),
    }
  }

  /// Decompresses one complete stream in a single go.
  fn decompress(&mut self, bytes: &[u8]) -> PngResult<Vec<u8>> {
    self.reset();
    self.push(bytes, false);
    self.check()?;
    self.push(&[], true);
    self.check()?;
    Ok(self.take_result())
  }
}

/// A zlib compressor.
pub trait Compressor {
  /// Compresses a whole buffer at the given level (0 to 10, higher is
  /// smaller and slower).
  fn compress(&mut self, bytes: &[u8], level: u8) -> Vec<u8>;
}

/// [`Decompressor`] on the streaming inflater of `miniz_oxide`.
#[cfg(feature = "miniz_oxide")]
#[cfg_attr(docs_rs, doc(cfg(feature = "miniz_oxide")))]
pub struct ZlibInflator {
  state: Box<InflateState>,
  out: Vec<u8>,
  error: Option<String>,
  finished: bool,
}
#[cfg(feature = "miniz_oxide")]
impl ZlibInflator {
  const OUT_STEP: usize = 32 * 1024;

  #[inline]
  #[must_use]
  pub fn new() -> Self {
    Self {
      state: InflateState::new_boxed(DataFormat::Zlib),
      out: Vec::new(),
      error: None,
      finished: false,
    }
  }
}
#[cfg(feature = "miniz_oxide")]
impl Default for ZlibInflator {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}
#[cfg(feature = "miniz_oxide")]
impl Debug for ZlibInflator {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("ZlibInflator")
      .field("out_len", &self.out.len())
      .field("error", &self.error)
      .field("finished", &self.finished)
      .finish()
  }
}
#[cfg(feature = "miniz_oxide")]
impl Decompressor for ZlibInflator {
  fn push(&mut self, mut bytes: &[u8], is_final: bool) {
    if self.error.is_some() {
      return;
    }
    let flush = if is_final { MZFlush::Finish } else { MZFlush::None };
    while !self.finished {
      let start = self.out.len();
      self.out.resize(start + Self::OUT_STEP, 0);
      let r = inflate(&mut self.state, bytes, &mut self.out[start..], flush);
      self.out.truncate(start + r.bytes_written);
      bytes = &bytes[r.bytes_consumed..];
      let stalled = r.bytes_consumed == 0 && r.bytes_written == 0;
      match r.status {
        Ok(MZStatus::StreamEnd) => self.finished = true,
        Ok(_) | Err(MZError::Buf) => {
          if stalled {
            if is_final {
              self.error = Some(String::from("compressed data ended before the stream did"));
            }
            break;
          }
          if bytes.is_empty() && !is_final && r.bytes_written < Self::OUT_STEP {
            break;
          }
        }
        Err(e) => {
          self.error = Some(format!("{e:?}"));
          break;
        }
      }
    }
    if self.finished && !bytes.is_empty() {
      warn!("ignoring {} bytes after the end of the zlib stream", bytes.len());
    }
  }

  #[inline]
  fn result(&self) -> &[u8] {
    &self.out
  }

  #[inline]
  fn take_result(&mut self) -> Vec<u8> {
    core::mem::take(&mut self.out)
  }

  #[inline]
  fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  fn reset(&mut self) {
    *self = Self::new();
  }
}

/// [`Compressor`] on `miniz_oxide`.
#[cfg(feature = "miniz_oxide")]
#[cfg_attr(docs_rs, doc(cfg(feature = "miniz_oxide")))]
#[derive(Debug, Clone, Copy, Default)]
pub struct ZlibDeflater;
#[cfg(feature = "miniz_oxide")]
impl Compressor for ZlibDeflater {
  #[inline]
  fn compress(&mut self, bytes: &[u8], level: u8) -> Vec<u8> {
    compress_to_vec_zlib(bytes, level.min(10))
  }
}

#[cfg(all(test, feature = "miniz_oxide"))]
mod tests {
  use super::*;

  #[test]
  fn test_split_pushes_match_one_shot() {
    let data: Vec<u8> = (0..100_000_u32).map(|i| (i % 251) as u8 ^ (i >> 9) as u8).collect();
    let z = ZlibDeflater.compress(&data, 6);
    let mut inf = ZlibInflator::new();
    for piece in z.chunks(7) {
      inf.push(piece, false);
      assert_eq!(inf.error(), None);
    }
    inf.push(&[], true);
    assert_eq!(inf.check(), Ok(()));
    assert_eq!(inf.result(), &data[..]);
    assert_eq!(inf.take_result(), data);
    assert!(inf.result().is_empty());
  }

  #[test]
  fn test_truncated_stream_is_an_error() {
    let z = ZlibDeflater.compress(b"hello hello hello hello", 6);
    let mut inf = ZlibInflator::new();
    inf.push(&z[..z.len() / 2], false);
    assert_eq!(inf.error(), None);
    inf.push(&[], true);
    assert!(matches!(inf.check(), Err(PngError::Decompression(_))));
  }

  #[test]
  fn test_garbage_is_an_error() {
    let mut inf = ZlibInflator::new();
    assert!(inf.decompress(&[0xFF; 16]).is_err());
    assert_eq!(inf.decompress(&ZlibDeflater.compress(b"abc", 1)).unwrap(), b"abc");
  }
}

#![forbid(unsafe_code)]

//! A byte cursor over an in-memory buffer.
//!
//! The decoder and encoder each own one [`IoBuffer`] and talk to it through
//! the [`ByteCursor`] trait. Decoding borrows the caller's bytes, encoding
//! grows an owned buffer.

use alloc::{borrow::Cow, vec::Vec};

use crate::{PngError, PngResult};

/// Byte order used for multi-byte integers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Endian {
  /// Most significant byte first. PNG is always this.
  #[default]
  Big,
  /// Least significant byte first.
  Little,
}

/// Read and write operations over a byte buffer with a current position.
///
/// Reads that would run past the end of the buffer fail with
/// [`PngError::UnexpectedEof`] and leave the position unchanged. Writes
/// overwrite bytes at the current position and grow the buffer as needed.
pub trait ByteCursor {
  /// Current position.
  fn offset(&self) -> usize;

  /// Total length of the buffer.
  fn len(&self) -> usize;

  /// If the buffer holds no bytes at all.
  #[inline]
  fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Bytes left between the position and the end.
  #[inline]
  fn remaining(&self) -> usize {
    self.len().saturating_sub(self.offset())
  }

  /// Remembers the current position.
  fn mark(&mut self);

  /// Moves back to the last marked position (or 0 if never marked).
  fn reset(&mut self);

  /// Advances the position by `n` bytes.
  fn skip(&mut self, n: usize) -> PngResult<()>;

  /// Reads the next `n` bytes.
  fn read_bytes(&mut self, n: usize) -> PngResult<&[u8]>;

  /// Everything in the buffer, regardless of position.
  fn as_bytes(&self) -> &[u8];

  /// Writes a run of bytes at the position.
  fn write_bytes(&mut self, bytes: &[u8]);

  /// The byte order for integer reads and writes.
  fn endian(&self) -> Endian;

  /// Reads the next `N` bytes as an array.
  #[inline]
  fn read_array<const N: usize>(&mut self) -> PngResult<[u8; N]> {
    let mut out = [0_u8; N];
    out.copy_from_slice(self.read_bytes(N)?);
    Ok(out)
  }

  /// Reads one byte.
  #[inline]
  fn read_u8(&mut self) -> PngResult<u8> {
    let [b] = self.read_array::<1>()?;
    Ok(b)
  }

  /// Reads a `u16` in the cursor's byte order.
  #[inline]
  fn read_u16(&mut self) -> PngResult<u16> {
    let a = self.read_array::<2>()?;
    Ok(match self.endian() {
      Endian::Big => u16::from_be_bytes(a),
      Endian::Little => u16::from_le_bytes(a),
    })
  }

  /// Reads a `u32` in the cursor's byte order.
  #[inline]
  fn read_u32(&mut self) -> PngResult<u32> {
    let a = self.read_array::<4>()?;
    Ok(match self.endian() {
      Endian::Big => u32::from_be_bytes(a),
      Endian::Little => u32::from_le_bytes(a),
    })
  }

  /// Writes one byte.
  #[inline]
  fn write_u8(&mut self, value: u8) {
    self.write_bytes(&[value]);
  }

  /// Writes a `u16` in the cursor's byte order.
  #[inline]
  fn write_u16(&mut self, value: u16) {
    let a = match self.endian() {
      Endian::Big => value.to_be_bytes(),
      Endian::Little => value.to_le_bytes(),
    };
    self.write_bytes(&a);
  }

  /// Writes a `u32` in the cursor's byte order.
  #[inline]
  fn write_u32(&mut self, value: u32) {
    let a = match self.endian() {
      Endian::Big => value.to_be_bytes(),
      Endian::Little => value.to_le_bytes(),
    };
    self.write_bytes(&a);
  }
}

/// The one [`ByteCursor`] implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoBuffer<'b> {
  data: Cow<'b, [u8]>,
  offset: usize,
  mark: usize,
  endian: Endian,
}
impl<'b> IoBuffer<'b> {
  /// A cursor over borrowed bytes, positioned at the start.
  #[inline]
  #[must_use]
  pub const fn from_slice(bytes: &'b [u8]) -> Self {
    Self { data: Cow::Borrowed(bytes), offset: 0, mark: 0, endian: Endian::Big }
  }

  /// An empty, owned, growable cursor.
  #[inline]
  #[must_use]
  pub const fn new() -> Self {
    Self { data: Cow::Owned(Vec::new()), offset: 0, mark: 0, endian: Endian::Big }
  }

  /// Switches the byte order used for integer reads and writes.
  #[inline]
  #[must_use]
  pub fn with_endian(mut self, endian: Endian) -> Self {
    self.endian = endian;
    self
  }

  /// Gives up the cursor and returns the buffer.
  #[inline]
  #[must_use]
  pub fn into_vec(self) -> Vec<u8> {
    self.data.into_owned()
  }
}
impl Default for IoBuffer<'_> {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}
impl ByteCursor for IoBuffer<'_> {
  #[inline]
  fn offset(&self) -> usize {
    self.offset
  }

  #[inline]
  fn len(&self) -> usize {
    self.data.len()
  }

  #[inline]
  fn mark(&mut self) {
    self.mark = self.offset;
  }

  #[inline]
  fn reset(&mut self) {
    self.offset = self.mark;
  }

  #[inline]
  fn skip(&mut self, n: usize) -> PngResult<()> {
    self.read_bytes(n).map(|_| ())
  }

  #[inline]
  fn read_bytes(&mut self, n: usize) -> PngResult<&[u8]> {
    let start = self.offset;
    let available = self.remaining();
    if n > available {
      return Err(PngError::UnexpectedEof { offset: start, needed: n, available });
    }
    self.offset += n;
    Ok(&self.data[start..start + n])
  }

  #[inline]
  fn as_bytes(&self) -> &[u8] {
    &self.data
  }

  fn write_bytes(&mut self, bytes: &[u8]) {
    let start = self.offset;
    let end = start + bytes.len();
    let buf = self.data.to_mut();
    if end > buf.len() {
      buf.resize(end, 0);
    }
    buf[start..end].copy_from_slice(bytes);
    self.offset = end;
  }

  #[inline]
  fn endian(&self) -> Endian {
    self.endian
  }
}

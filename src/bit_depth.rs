#![forbid(unsafe_code)]

//! Packing and unpacking of sub-byte samples.
//!
//! PNG stores samples of 1, 2, or 4 bits tightly packed, left-most sample in
//! the highest bits of the byte. Every scanline starts on a fresh byte, so the
//! final byte of a row can have unused low bits. Those are always written as 0.

use alloc::vec::Vec;

/// How many samples of the given depth fit in one byte.
///
/// ## Panics
/// * If `depth` is not 1, 2, 4, or 8.
#[inline]
#[must_use]
pub const fn samples_per_byte(depth: u8) -> usize {
  match depth {
    1 => 8,
    2 => 4,
    4 => 2,
    8 => 1,
    _ => panic!("sub-byte depth must be 1, 2, 4, or 8"),
  }
}

/// The number of bytes a row of `samples` samples uses at the given depth.
#[inline]
#[must_use]
pub const fn packed_row_len(samples: usize, depth: u8) -> usize {
  (samples * depth as usize + 7) / 8
}

/// Unpacks one packed row into `out`, one sample per byte.
///
/// Exactly `count` samples are produced. Bits past that point in the last
/// byte are padding and are ignored.
pub fn unpack_row(packed: &[u8], depth: u8, count: usize, out: &mut Vec<u8>) {
  if depth == 8 {
    out.extend_from_slice(&packed[..count]);
    return;
  }
  let top_mask: u8 = 0xFF << (8 - depth);
  let mut remaining = count;
  for &byte in packed {
    if remaining == 0 {
      break;
    }
    let mut mask = top_mask;
    let mut shift = 8;
    while mask != 0 && remaining > 0 {
      shift -= depth;
      out.push((byte & mask) >> shift);
      mask >>= depth;
      remaining -= 1;
    }
  }
}

/// Unpacks a whole image of packed rows, one sample per byte.
///
/// `row_samples` is the number of samples in each row.
#[must_use]
pub fn unpack_rows(packed: &[u8], depth: u8, row_samples: usize, rows: usize) -> Vec<u8> {
  let row_len = packed_row_len(row_samples, depth);
  let mut out = Vec::with_capacity(row_samples * rows);
  for row in packed.chunks_exact(row_len).take(rows) {
    unpack_row(row, depth, row_samples, &mut out);
  }
  out
}

/// Packs samples (one per byte, low bits used) into `out`.
///
/// The final byte is zero-padded in its unused low bits.
pub fn pack_row(samples: &[u8], depth: u8, out: &mut Vec<u8>) {
  if depth == 8 {
    out.extend_from_slice(samples);
    return;
  }
  let value_mask: u8 = 0xFF >> (8 - depth);
  for group in samples.chunks(samples_per_byte(depth)) {
    let mut byte = 0_u8;
    let mut shift = 8;
    for &s in group {
      shift -= depth;
      byte |= (s & value_mask) << shift;
    }
    out.push(byte);
  }
}

/// Packs a whole image of one-sample-per-byte rows into packed rows.
#[must_use]
pub fn pack_rows(samples: &[u8], depth: u8, row_samples: usize) -> Vec<u8> {
  let rows = if row_samples == 0 { 0 } else { samples.len() / row_samples };
  let mut out = Vec::with_capacity(packed_row_len(row_samples, depth) * rows);
  for row in samples.chunks_exact(row_samples.max(1)).take(rows) {
    pack_row(row, depth, &mut out);
  }
  out
}

/// Reads the sample at `index` from a packed row.
#[inline]
#[must_use]
pub fn packed_sample(row: &[u8], index: usize, depth: u8) -> u8 {
  let per_byte = samples_per_byte(depth);
  let byte = row[index / per_byte];
  let shift = 8 - depth as usize * (index % per_byte + 1);
  (byte >> shift) & (0xFF >> (8 - depth))
}

/// Writes the sample at `index` into a packed row, leaving other bits alone.
#[inline]
pub fn set_packed_sample(row: &mut [u8], index: usize, depth: u8, value: u8) {
  let per_byte = samples_per_byte(depth);
  let shift = 8 - depth as usize * (index % per_byte + 1);
  let mask = (0xFF_u8 >> (8 - depth)) << shift;
  let byte = &mut row[index / per_byte];
  *byte = (*byte & !mask) | ((value << shift) & mask);
}

#[cfg(test)]
mod tests {
  use super::*;
  use alloc::vec;

  #[test]
  fn test_unpack_msb_first() {
    let mut out = Vec::new();
    unpack_row(&[0b0001_1011], 1, 8, &mut out);
    assert_eq!(out, [0, 0, 0, 1, 1, 0, 1, 1]);
    out.clear();
    unpack_row(&[0b0001_1011], 2, 4, &mut out);
    assert_eq!(out, [0, 1, 2, 3]);
    out.clear();
    unpack_row(&[0xA5, 0xF0], 4, 3, &mut out);
    assert_eq!(out, [0xA, 0x5, 0xF]);
  }

  #[test]
  fn test_unpack_rows_restart_each_row() {
    // 10 wide at 1 bit is two bytes per row, the last 6 bits are padding
    let packed = [255, 192, 0, 192];
    let samples = unpack_rows(&packed, 1, 10, 2);
    assert_eq!(samples, [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1]);
  }

  #[test]
  fn test_unpack_then_pack_is_identity() {
    for depth in [1_u8, 2, 4] {
      for row_samples in 1..=17_usize {
        let row_len = packed_row_len(row_samples, depth);
        let rows = 3;
        let mut packed = vec![0_u8; row_len * rows];
        for (i, b) in packed.iter_mut().enumerate() {
          *b = (i as u8).wrapping_mul(97).wrapping_add(31);
        }
        // padding bits must be zero for an exact match
        let used_bits = row_samples * depth as usize;
        let pad = row_len * 8 - used_bits;
        if pad > 0 {
          for row in packed.chunks_exact_mut(row_len) {
            row[row_len - 1] &= 0xFF << pad;
          }
        }
        let samples = unpack_rows(&packed, depth, row_samples, rows);
        assert_eq!(samples.len(), row_samples * rows);
        let repacked = pack_rows(&samples, depth, row_samples);
        assert_eq!(repacked, packed, "depth {depth}, width {row_samples}");
      }
    }
  }

  #[test]
  fn test_pack_zero_pads() {
    let mut out = Vec::new();
    pack_row(&[1, 1, 1], 1, &mut out);
    assert_eq!(out, [0b1110_0000]);
    out.clear();
    pack_row(&[3, 2, 1, 0, 3], 2, &mut out);
    assert_eq!(out, [0b1110_0100, 0b1100_0000]);
  }

  #[test]
  fn test_packed_sample_access() {
    let mut row = [0_u8; 2];
    for i in 0..4 {
      set_packed_sample(&mut row, i, 4, (i as u8) + 0xC);
    }
    assert_eq!(row, [0xCD, 0xEF]);
    assert_eq!(packed_sample(&row, 2, 4), 0xE);
    set_packed_sample(&mut row, 9, 1, 0);
    assert_eq!(row, [0xCD, 0xAF]);
    assert_eq!(packed_sample(&row, 8, 1), 1);
    assert_eq!(packed_sample(&row, 9, 1), 0);
  }
}

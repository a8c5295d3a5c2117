//! Scanline filtering.
//!
//! As the format itself puts it:
//!
//! > Filters are applied to **bytes**, not to pixels, regardless of the bit
//! > depth or color type of the image.
//!
//! "Left" is `bpp` bytes back in the same line and "up" is the same byte in
//! the previous line of the same pass. Both are zero past the edges, and an
//! empty `prev` slice stands for a line of zeroes.

use super::*;

/// The five scanline filters, tagged by the byte in front of each line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FilterType {
  None = 0,
  Sub = 1,
  Up = 2,
  Average = 3,
  Paeth = 4,
}
impl FilterType {
  pub const ALL: [Self; 5] = [Self::None, Self::Sub, Self::Up, Self::Average, Self::Paeth];
}
impl TryFrom<u8> for FilterType {
  type Error = PngError;
  #[inline]
  fn try_from(filter: u8) -> Result<Self, Self::Error> {
    Ok(match filter {
      0 => Self::None,
      1 => Self::Sub,
      2 => Self::Up,
      3 => Self::Average,
      4 => Self::Paeth,
      _ => return Err(PngError::UnsupportedFilter { filter }),
    })
  }
}

/// How the encoder picks a filter for each scanline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FilterStrategy {
  /// Tag 0 on every line.
  #[default]
  None,
  /// Try all five filters and keep the one with the smallest sum of absolute
  /// (signed) byte values.
  Adaptive,
}

/// The Paeth predictor of left (`a`), up (`b`) and upper-left (`c`).
#[inline]
#[must_use]
pub const fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
  let a_ = a as i16;
  let b_ = b as i16;
  let c_ = c as i16;
  let p = a_ + b_ - c_;
  let pa = (p - a_).abs();
  let pb = (p - b_).abs();
  let pc = (p - c_).abs();
  // Note: the order of these tests is fixed by the format.
  if pa <= pb && pa <= pc {
    a
  } else if pb <= pc {
    b
  } else {
    c
  }
}

#[inline]
const fn average(a: u8, b: u8) -> u8 {
  ((a as u16 + b as u16) / 2) as u8
}

/// Reverses a filter in place.
///
/// `line` holds filtered bytes on entry and reconstructed bytes on return.
/// Processing runs left to right because Sub, Average and Paeth read bytes of
/// `line` that were already reconstructed.
pub fn unfilter_scanline(filter: FilterType, line: &mut [u8], prev: &[u8], bpp: usize) {
  let up = |i: usize| prev.get(i).copied().unwrap_or(0);
  match filter {
    FilterType::None => (),
    FilterType::Sub => {
      for i in bpp..line.len() {
        line[i] = line[i].wrapping_add(line[i - bpp]);
      }
    }
    FilterType::Up => {
      for (i, x) in line.iter_mut().enumerate() {
        *x = x.wrapping_add(up(i));
      }
    }
    FilterType::Average => {
      for i in 0..line.len() {
        let a = if i >= bpp { line[i - bpp] } else { 0 };
        line[i] = line[i].wrapping_add(average(a, up(i)));
      }
    }
    FilterType::Paeth => {
      for i in 0..line.len() {
        let (a, c) = if i >= bpp { (line[i - bpp], up(i - bpp)) } else { (0, 0) };
        line[i] = line[i].wrapping_add(paeth_predictor(a, up(i), c));
      }
    }
  }
}

/// Applies a filter, writing the filtered bytes of `line` into `out`.
///
/// `out` must be the same length as `line`.
pub fn filter_scanline(filter: FilterType, line: &[u8], prev: &[u8], bpp: usize, out: &mut [u8]) {
  debug_assert_eq!(line.len(), out.len());
  let up = |i: usize| prev.get(i).copied().unwrap_or(0);
  let left = |i: usize| if i >= bpp { line[i - bpp] } else { 0 };
  for (i, (o, &x)) in out.iter_mut().zip(line).enumerate() {
    let predicted = match filter {
      FilterType::None => 0,
      FilterType::Sub => left(i),
      FilterType::Up => up(i),
      FilterType::Average => average(left(i), up(i)),
      FilterType::Paeth => {
        let c = if i >= bpp { up(i - bpp) } else { 0 };
        paeth_predictor(left(i), up(i), c)
      }
    };
    *o = x.wrapping_sub(predicted);
  }
}

/// Filters one line per the strategy and appends the tag byte and the
/// filtered bytes to `out`.
pub(crate) fn filter_line_into(
  strategy: FilterStrategy, line: &[u8], prev: &[u8], bpp: usize, out: &mut Vec<u8>,
) {
  match strategy {
    FilterStrategy::None => {
      out.push(FilterType::None as u8);
      out.extend_from_slice(line);
    }
    FilterStrategy::Adaptive => {
      let mut attempt = vec![0_u8; line.len()];
      let mut best = vec![0_u8; line.len()];
      let mut best_filter = FilterType::None;
      let mut smallest = usize::MAX;
      for filter in FilterType::ALL {
        filter_scanline(filter, line, prev, bpp, &mut attempt);
        // tag 0 isn't a difference, so its bytes count as unsigned
        let sum: usize = if filter == FilterType::None {
          attempt.iter().map(|&s| usize::from(s)).sum()
        } else {
          attempt.iter().map(|&s| usize::from(if s < 128 { s } else { 255 - s })).sum()
        };
        if sum < smallest {
          smallest = sum;
          best_filter = filter;
          core::mem::swap(&mut attempt, &mut best);
        }
      }
      out.push(best_filter as u8);
      out.extend_from_slice(&best);
    }
  }
}

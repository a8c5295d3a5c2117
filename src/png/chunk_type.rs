use super::*;

/// The four-byte type tag of a chunk.
///
/// Chunk kinds this crate handles get their own variant, anything else is
/// carried as [`ChunkType::Other`] and skipped by the decoder.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(nonstandard_style)]
pub enum ChunkType {
  /// Image header
  IHDR,
  /// Palette
  PLTE,
  /// Image data
  IDAT,
  /// Image trailer
  IEND,
  /// Transparency
  tRNS,
  /// Embedded ICC profile
  iCCP,
  /// Latin-1 text
  tEXt,
  /// Physical pixel dimensions
  pHYs,
  /// Animation control
  acTL,
  /// Frame control
  fcTL,
  /// Frame data
  fdAT,
  /// Any other tag.
  Other([u8; 4]),
}
impl ChunkType {
  /// The tag as it appears in the data stream.
  #[inline]
  #[must_use]
  pub const fn to_bytes(self) -> [u8; 4] {
    match self {
      Self::IHDR => *b"IHDR",
      Self::PLTE => *b"PLTE",
      Self::IDAT => *b"IDAT",
      Self::IEND => *b"IEND",
      Self::tRNS => *b"tRNS",
      Self::iCCP => *b"iCCP",
      Self::tEXt => *b"tEXt",
      Self::pHYs => *b"pHYs",
      Self::acTL => *b"acTL",
      Self::fcTL => *b"fcTL",
      Self::fdAT => *b"fdAT",
      Self::Other(bytes) => bytes,
    }
  }

  /// Critical chunks have an uppercase first letter.
  #[inline]
  #[must_use]
  pub const fn is_critical(self) -> bool {
    self.to_bytes()[0].is_ascii_uppercase()
  }
}
impl From<[u8; 4]> for ChunkType {
  #[inline]
  fn from(bytes: [u8; 4]) -> Self {
    match &bytes {
      b"IHDR" => Self::IHDR,
      b"PLTE" => Self::PLTE,
      b"IDAT" => Self::IDAT,
      b"IEND" => Self::IEND,
      b"tRNS" => Self::tRNS,
      b"iCCP" => Self::iCCP,
      b"tEXt" => Self::tEXt,
      b"pHYs" => Self::pHYs,
      b"acTL" => Self::acTL,
      b"fcTL" => Self::fcTL,
      b"fdAT" => Self::fdAT,
      _ => Self::Other(bytes),
    }
  }
}
impl Debug for ChunkType {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    for b in self.to_bytes() {
      f.write_char(if b.is_ascii_graphic() { b as char } else { '?' })?;
    }
    Ok(())
  }
}
impl Display for ChunkType {
  #[inline]
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    Debug::fmt(self, f)
  }
}

#[test]
fn test_chunk_type_round_trip() {
  for tag in [*b"IHDR", *b"fdAT", *b"tEXt", *b"zTXt", *b"bKGD"] {
    assert_eq!(ChunkType::from(tag).to_bytes(), tag);
  }
  assert_eq!(ChunkType::from(*b"zTXt"), ChunkType::Other(*b"zTXt"));
  assert!(ChunkType::IDAT.is_critical());
  assert!(!ChunkType::tRNS.is_critical());
  assert_eq!(alloc::format!("{}", ChunkType::Other([b'a', 0, b'c', b'd'])), "a?cd");
}

use super::*;

const CRC_TABLE: [u32; 256] = make_crc_table();

const fn make_crc_table() -> [u32; 256] {
  let mut out = [0; 256];
  let mut n = 0;
  while n < 256 {
    let mut c = n as u32;
    let mut k = 0;
    while k < 8 {
      if (c & 1) != 0 {
        c = 0xEDB8_8320_u32 ^ (c >> 1);
      } else {
        c >>= 1;
      }
      //
      k += 1;
    }
    out[n] = c;
    //
    n += 1;
  }
  out
}

/// Runs more bytes through a CRC that's in progress.
///
/// Start from `u32::MAX` and XOR the final value with `u32::MAX`, or just use
/// [`png_crc`].
#[inline]
#[must_use]
pub fn update_crc(mut crc: u32, bytes: &[u8]) -> u32 {
  for &byte in bytes {
    let i = (crc ^ u32::from(byte)) as u8 as usize;
    crc = CRC_TABLE[i] ^ (crc >> 8);
  }
  crc
}

/// The PNG CRC-32 of the first `length` bytes.
///
/// For a chunk this covers the type tag and the body, not the length.
///
/// ## Panics
/// * If `length` exceeds `bytes.len()`.
#[inline]
#[must_use]
pub fn png_crc(bytes: &[u8], length: usize) -> u32 {
  update_crc(u32::MAX, &bytes[..length]) ^ u32::MAX
}

/// Reads the 4-byte CRC at the cursor and compares it with the CRC of the
/// `crc_length` bytes just before it.
pub(crate) fn check_crc<C: ByteCursor>(
  cursor: &mut C, crc_length: usize, chunk: ChunkType,
) -> PngResult<()> {
  let start = cursor.offset().checked_sub(crc_length).ok_or(PngError::UnexpectedEof {
    offset: cursor.offset(),
    needed: crc_length,
    available: cursor.offset(),
  })?;
  let expected = cursor.read_u32()?;
  let actual = {
    let covered = &cursor.as_bytes()[start..start + crc_length];
    png_crc(covered, crc_length)
  };
  if actual != expected {
    return Err(PngError::CrcMismatch { chunk, expected, actual });
  }
  Ok(())
}

/// Writes the CRC of the `length` bytes just before the cursor.
pub(crate) fn write_crc<C: ByteCursor>(cursor: &mut C, length: usize) {
  let start = cursor.offset() - length;
  let crc = png_crc(&cursor.as_bytes()[start..], length);
  cursor.write_u32(crc);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_known_values() {
    assert_eq!(png_crc(b"123456789", 9), 0xCBF4_3926);
    // every IEND chunk carries this CRC
    assert_eq!(png_crc(b"IEND", 4), 0xAE42_6082);
    assert_eq!(png_crc(b"IEND-and-trailing-bytes", 4), 0xAE42_6082);
  }

  #[test]
  fn test_check_crc_detects_a_flipped_byte() {
    let mut bytes = IoBuffer::new();
    bytes.write_bytes(b"tEXtkey\0value");
    write_crc(&mut bytes, 13);
    let good = bytes.into_vec();

    let mut c = IoBuffer::from_slice(&good);
    c.skip(13).unwrap();
    assert_eq!(check_crc(&mut c, 13, ChunkType::tEXt), Ok(()));

    for i in 4..13 {
      let mut bad = good.clone();
      bad[i] ^= 0x01;
      let mut c = IoBuffer::from_slice(&bad);
      c.skip(13).unwrap();
      match check_crc(&mut c, 13, ChunkType::tEXt) {
        Err(PngError::CrcMismatch { chunk, expected, actual }) => {
          assert_eq!(chunk, ChunkType::tEXt);
          assert_ne!(expected, actual);
        }
        other => panic!("flipped byte {i} not caught: {other:?}"),
      }
    }
  }
}

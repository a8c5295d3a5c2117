use super::*;

/// Expands an indexed image into RGB or RGBA bytes, following its palette.
///
/// The output has 3 bytes per pixel for an RGB palette and 4 for an RGBA one.
/// Sub-byte indices are unpacked row by row first.
///
/// ## Failure
/// * [`PngError::MissingPalette`] if the image has no palette.
/// * [`PngError::IllegalBitDepth`] if the depth is 16.
/// * [`PngError::DataSize`] if the data doesn't fit the geometry. This is
///   checked before allocating the output.
/// * [`PngError::PaletteIndex`] for an index past the end of the palette.
pub fn convert_indexed_to_rgb(image: &RawImage) -> PngResult<Vec<u8>> {
  let palette = image.palette.as_ref().ok_or(PngError::MissingPalette)?;
  if !ColorType::Indexed.allows_depth(image.depth) {
    return Err(PngError::IllegalBitDepth { color_type: ColorType::Indexed, depth: image.depth });
  }
  let indices = image.data.as_u8().ok_or(PngError::SampleType { depth: image.depth })?;
  let width = image.width as usize;
  let row_bytes = packed_row_len(width, image.depth);
  let expected = row_bytes * image.height as usize;
  if indices.len() != expected {
    return Err(PngError::DataSize { found: indices.len(), expected });
  }
  if expected == 0 {
    return Ok(Vec::new());
  }

  let components = palette.components();
  let mut out = Vec::with_capacity(width * image.height as usize * components);
  let mut row_indices = Vec::with_capacity(width);
  for packed in indices.chunks_exact(row_bytes) {
    row_indices.clear();
    unpack_row(packed, image.depth, width, &mut row_indices);
    for &index in &row_indices {
      let color = palette
        .get(usize::from(index))
        .ok_or(PngError::PaletteIndex { index, len: palette.len() })?;
      out.extend_from_slice(color);
    }
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn indexed(width: u32, depth: u8, data: Vec<u8>, palette: Palette) -> RawImage {
    RawImage::indexed(width, 1, depth, data, palette).unwrap()
  }

  #[test]
  fn test_one_bit() {
    let img = indexed(8, 1, vec![0x1B], Palette::Rgb(vec![[0, 0, 1], [0, 0, 2]]));
    let rgb = convert_indexed_to_rgb(&img).unwrap();
    assert_eq!(
      rgb,
      [0, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 2, 0, 0, 2, 0, 0, 1, 0, 0, 2, 0, 0, 2]
    );
  }

  #[test]
  fn test_two_bit_rgba() {
    let palette = Palette::Rgba(vec![[0, 0, 1, 10], [0, 0, 2, 20], [0, 0, 3, 30], [0, 0, 4, 40]]);
    let img = indexed(4, 2, vec![0x1B], palette);
    let rgba = convert_indexed_to_rgb(&img).unwrap();
    assert_eq!(rgba, [0, 0, 1, 10, 0, 0, 2, 20, 0, 0, 3, 30, 0, 0, 4, 40]);
  }

  #[test]
  fn test_rows_start_on_a_byte() {
    // 3 wide at 4 bits: the low nibble of each row's second byte is padding
    let palette = Palette::Rgb((0..16).map(|i| [i, i, i]).collect());
    let img = RawImage::indexed(3, 2, 4, vec![0x12, 0x30, 0x45, 0x60], palette).unwrap();
    let rgb = convert_indexed_to_rgb(&img).unwrap();
    let greys: Vec<u8> = rgb.chunks_exact(3).map(|c| c[0]).collect();
    assert_eq!(greys, [1, 2, 3, 4, 5, 6]);
  }

  #[test]
  fn test_failures() {
    let mut img = indexed(2, 8, vec![0, 2], Palette::Rgb(vec![[1, 1, 1], [2, 2, 2]]));
    assert_eq!(convert_indexed_to_rgb(&img), Err(PngError::PaletteIndex { index: 2, len: 2 }));
    img.data = PixelData::U8(vec![0, 1, 1]);
    assert_eq!(convert_indexed_to_rgb(&img), Err(PngError::DataSize { found: 3, expected: 2 }));
    img.palette = None;
    assert_eq!(convert_indexed_to_rgb(&img), Err(PngError::MissingPalette));
  }
}

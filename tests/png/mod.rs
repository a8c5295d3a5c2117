use pngine::{
  decode, decode_apng, encode,
  png::{
    convert_indexed_to_rgb, ColorType, DecoderOptions, EncoderOptions, FilterStrategy, IccProfile,
    Palette, PixelData, RawImage, Resolution, ResolutionUnit, Transparency, PNG_SIGNATURE,
  },
  PngError,
};

const CHECKED: DecoderOptions = DecoderOptions { check_crc: true };

fn random_data(len: usize, depth: u8) -> PixelData {
  if depth == 16 {
    let bytes = super::rand_bytes(len * 2);
    PixelData::U16(bytes.chunks_exact(2).map(|c| u16::from_ne_bytes([c[0], c[1]])).collect())
  } else {
    PixelData::U8(super::rand_bytes(len))
  }
}

fn random_image(width: u32, height: u32, channels: u8, depth: u8) -> RawImage {
  let row_bits = width as usize * channels as usize * depth as usize;
  let len = if depth == 16 {
    width as usize * channels as usize * height as usize
  } else {
    ((row_bits + 7) / 8) * height as usize
  };
  RawImage::from_channels(width, height, channels, depth, random_data(len, depth)).unwrap()
}

/// Zeroes the padding bits at the end of each packed row, which don't
/// survive a round trip.
fn clear_row_padding(image: &mut RawImage) {
  let row_bits = image.width as usize * image.channels() as usize * image.depth as usize;
  if row_bits % 8 == 0 {
    return;
  }
  let row_bytes = (row_bits + 7) / 8;
  let keep = 0xFF_u8 << (8 - row_bits % 8);
  if let PixelData::U8(data) = &mut image.data {
    for row in data.chunks_exact_mut(row_bytes) {
      row[row_bytes - 1] &= keep;
    }
  }
}

fn count_chunks(png: &[u8], tag: &[u8; 4]) -> usize {
  let mut count = 0;
  let mut at = PNG_SIGNATURE.len();
  while at + 8 <= png.len() {
    let len = u32::from_be_bytes(png[at..at + 4].try_into().unwrap()) as usize;
    if &png[at + 4..at + 8] == tag {
      count += 1;
    }
    at += 12 + len;
  }
  count
}

#[test]
fn test_round_trip_every_color_model() {
  for channels in 1..=4 {
    for depth in [8, 16] {
      for interlace in [false, true] {
        let image = random_image(13, 7, channels, depth);
        let options = EncoderOptions { interlace, ..Default::default() };
        let png = encode(&image, options).unwrap();
        let back = decode(&png, CHECKED).unwrap();
        assert_eq!(back, image, "channels {channels}, depth {depth}, interlace {interlace}");
      }
    }
  }
}

#[test]
fn test_round_trip_low_depth_greyscale() {
  for depth in [1, 2, 4] {
    for interlace in [false, true] {
      let mut image = random_image(11, 5, 1, depth);
      clear_row_padding(&mut image);
      let png = encode(&image, EncoderOptions { interlace, ..Default::default() }).unwrap();
      assert_eq!(decode(&png, CHECKED).unwrap(), image, "depth {depth}, interlace {interlace}");
    }
  }
}

#[test]
fn test_round_trip_indexed() {
  for depth in [1_u8, 2, 4, 8] {
    let colors = 1_usize << depth;
    let palette = Palette::Rgb((0..colors).map(|i| [i as u8, 255 - i as u8, 7]).collect());
    let indices = random_image(9, 4, 1, depth).data;
    let PixelData::U8(indices) = indices else { unreachable!() };
    let mut image = RawImage::indexed(9, 4, depth, indices, palette).unwrap();
    clear_row_padding(&mut image);
    let png = encode(&image, EncoderOptions::default()).unwrap();
    let back = decode(&png, CHECKED).unwrap();
    assert_eq!(back, image, "depth {depth}");
    assert_eq!(convert_indexed_to_rgb(&back).unwrap().len(), 9 * 4 * 3);
  }
}

#[test]
fn test_indexed_expansion_after_decode() {
  // 8 pixels at 1 bit: 0x1B is 0,0,0,1,1,0,1,1
  let palette = Palette::Rgb(vec![[0, 0, 0], [255, 255, 255]]);
  let image = RawImage::indexed(8, 1, 1, vec![0x1B], palette).unwrap();
  let back = decode(&encode(&image, EncoderOptions::default()).unwrap(), CHECKED).unwrap();
  let rgb = convert_indexed_to_rgb(&back).unwrap();
  let expected: Vec<u8> =
    [0, 0, 0, 1, 1, 0, 1, 1].iter().flat_map(|&i| [i * 255; 3]).collect();
  assert_eq!(rgb, expected);
}

#[test]
fn test_interlaced_decodes_like_plain() {
  let image = random_image(37, 19, 3, 8);
  let plain = encode(&image, EncoderOptions::default()).unwrap();
  let laced = encode(&image, EncoderOptions { interlace: true, ..Default::default() }).unwrap();
  assert_ne!(plain, laced);
  assert_eq!(decode(&plain, CHECKED).unwrap(), decode(&laced, CHECKED).unwrap());
}

#[test]
fn test_adaptive_filter() {
  // a smooth gradient, which the adaptive filter should shrink
  let data: Vec<u8> = (0..64_u32 * 64).flat_map(|i| [(i % 64) as u8, (i / 64) as u8, 0]).collect();
  let image = RawImage::from_channels(64, 64, 3, 8, PixelData::U8(data)).unwrap();
  let none = encode(&image, EncoderOptions::default()).unwrap();
  let adaptive =
    encode(&image, EncoderOptions { filter: FilterStrategy::Adaptive, ..Default::default() })
      .unwrap();
  assert!(adaptive.len() < none.len(), "{} vs {}", adaptive.len(), none.len());
  assert_eq!(decode(&adaptive, CHECKED).unwrap(), image);

  let image = random_image(20, 20, 2, 16);
  let options = EncoderOptions { filter: FilterStrategy::Adaptive, interlace: true, level: 9 };
  assert_eq!(decode(&encode(&image, options).unwrap(), CHECKED).unwrap(), image);
}

#[test]
fn test_large_images_split_image_data() {
  let image = random_image(300, 300, 4, 8);
  let png = encode(&image, EncoderOptions::default()).unwrap();
  assert!(count_chunks(&png, b"IDAT") >= 2);
  assert_eq!(count_chunks(&png, b"IEND"), 1);
  assert_eq!(decode(&png, CHECKED).unwrap(), image);
}

#[test]
fn test_metadata_round_trip() {
  let mut image = random_image(4, 4, 3, 8);
  image.text.insert("Title".into(), "A t\u{EA}st".into());
  image.text.insert("Comment".into(), String::new());
  image.resolution = Some(Resolution { x: 3780, y: 3780, unit: ResolutionUnit::Meter });
  image.icc_profile = Some(IccProfile { name: "Display P3".into(), profile: vec![3; 500] });
  image.transparency = Some(Transparency::Samples(vec![1, 2, 3]));
  let png = encode(&image, EncoderOptions::default()).unwrap();
  assert_eq!(count_chunks(&png, b"tEXt"), 2);
  assert_eq!(decode(&png, CHECKED).unwrap(), image);
}

#[test]
fn test_wrong_data_size_message() {
  let mut image = random_image(2, 2, 1, 8);
  image.data = PixelData::U8(vec![0; 3]);
  let err = encode(&image, EncoderOptions::default()).unwrap_err();
  assert_eq!(err, PngError::DataSize { found: 3, expected: 4 });
  assert_eq!(err.to_string(), "wrong data size. Found 3, expected 4");
}

#[test]
fn test_animation_of_a_plain_png() {
  let image = random_image(5, 3, 4, 8);
  let png = encode(&image, EncoderOptions::default()).unwrap();
  let anim = decode_apng(&png, CHECKED).unwrap();
  assert_eq!((anim.width, anim.height), (5, 3));
  assert_eq!(anim.color_type, ColorType::TruecolorAlpha);
  assert_eq!(anim.frames.len(), 1);
  assert_eq!(anim.frames[0].data, image.data);
}

#[test]
fn test_no_panics_on_random_input() {
  // even totally random data should never panic the decoder!
  for _ in 0..50 {
    let v = super::rand_bytes(1024);
    let _ = decode(&v, CHECKED);
    let _ = decode_apng(&v, DecoderOptions::default());
  }
  // random chunks after a good signature
  for _ in 0..50 {
    let mut v = PNG_SIGNATURE.to_vec();
    v.extend(super::rand_bytes(512));
    let _ = decode(&v, DecoderOptions::default());
    let _ = decode_apng(&v, DecoderOptions::default());
  }
  // a good stream with a few bytes broken
  let png = encode(&random_image(16, 16, 3, 8), EncoderOptions::default()).unwrap();
  for _ in 0..100 {
    let mut v = png.clone();
    for pick in super::rand_bytes(4).chunks_exact(2) {
      let at = (usize::from(pick[0]) * 7) % v.len();
      v[at] ^= pick[1] | 1;
    }
    let _ = decode(&v, DecoderOptions::default());
    let _ = decode_apng(&v, DecoderOptions::default());
  }
}

#[test]
fn test_truncated_streams_fail_cleanly() {
  let png = encode(&random_image(8, 8, 1, 8), EncoderOptions::default()).unwrap();
  for len in [0, 7, 8, 12, 20, 33, png.len() - 12, png.len() - 1] {
    assert!(decode(&png[..len], CHECKED).is_err(), "length {len}");
  }
}

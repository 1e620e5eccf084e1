/// Cross-module validation tests.
///
/// These tests verify:
/// 1. **Round-trip correctness** for every algorithm and every output format
/// 2. **Backward compatibility** - each historical generation decodes, and
///    magic-less headers spelling another signature resolve by probe order
/// 3. **Integrity** - corruption and truncation are detected, never decoded
/// 4. **Algorithmic properties** - Huffman optimality and prefix codes
/// 5. **Edge cases** - single pixels, single symbols, uniform bytes
#[cfg(test)]
mod tests {
    use crate::codebook::CodeBook;
    use crate::codec::{compress_payload, Algorithm};
    use crate::container::{self, Generation, Metadata, OutputFormat};
    use crate::frequency::FrequencyTable;
    use crate::huffman::HuffmanTree;
    use crate::pipeline::{compress, decode_image, encode_image, CompressOptions};
    use crate::pixel::PixelLayout;
    use crate::PzError;

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use proptest::prelude::*;

    // ---------------------------------------------------------------
    // Helper: generate diverse test images
    // ---------------------------------------------------------------

    /// Solid color, the most compressible case.
    fn image_solid(w: u32, h: u32, channels: usize) -> Vec<u8> {
        vec![0xFF; w as usize * h as usize * channels]
    }

    /// Horizontal gradient.
    fn image_gradient(w: u32, h: u32, channels: usize) -> Vec<u8> {
        let mut v = Vec::with_capacity(w as usize * h as usize * channels);
        for _ in 0..h {
            for x in 0..w {
                let value = (x * 255 / w.max(2).saturating_sub(1)) as u8;
                v.extend(std::iter::repeat(value).take(channels));
            }
        }
        v
    }

    /// Every byte value, no redundancy.
    fn image_noise(w: u32, h: u32, channels: usize) -> Vec<u8> {
        let mut state = 0x2545_F491u32;
        (0..w as usize * h as usize * channels)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                state as u8
            })
            .collect()
    }

    fn options(algorithm: Algorithm, format: OutputFormat) -> CompressOptions {
        CompressOptions {
            algorithm,
            format,
            ..Default::default()
        }
    }

    // ---------------------------------------------------------------
    // 1. Round trips across algorithms and formats
    // ---------------------------------------------------------------

    fn assert_round_trip(pixels: &[u8], w: u32, h: u32, layout: PixelLayout) {
        for algorithm in Algorithm::ALL {
            for format in [OutputFormat::Binary, OutputFormat::Json, OutputFormat::Zip] {
                let (blob, stats) =
                    encode_image(pixels, w, h, &options(algorithm, format)).unwrap();
                let image = decode_image(&blob).unwrap();
                assert_eq!(image.width, w, "{algorithm} {format:?}");
                assert_eq!(image.height, h, "{algorithm} {format:?}");
                assert_eq!(image.layout, layout, "{algorithm} {format:?}");
                assert_eq!(image.pixels, pixels, "{algorithm} {format:?}");
                assert_eq!(stats.original_size, pixels.len());
            }
        }
    }

    #[test]
    fn round_trip_gray_solid() {
        assert_round_trip(&image_solid(16, 9, 1), 16, 9, PixelLayout::Gray);
    }

    #[test]
    fn round_trip_rgb_solid() {
        assert_round_trip(&image_solid(2, 2, 3), 2, 2, PixelLayout::Rgb);
    }

    #[test]
    fn round_trip_gray_gradient() {
        assert_round_trip(&image_gradient(64, 8, 1), 64, 8, PixelLayout::Gray);
    }

    #[test]
    fn round_trip_rgb_gradient() {
        assert_round_trip(&image_gradient(33, 7, 3), 33, 7, PixelLayout::Rgb);
    }

    #[test]
    fn round_trip_rgb_noise() {
        assert_round_trip(&image_noise(20, 20, 3), 20, 20, PixelLayout::Rgb);
    }

    #[test]
    fn round_trip_single_pixel() {
        assert_round_trip(&[42], 1, 1, PixelLayout::Gray);
        assert_round_trip(&[1, 2, 3], 1, 1, PixelLayout::Rgb);
    }

    // ---------------------------------------------------------------
    // 2. Historical generations
    // ---------------------------------------------------------------

    /// A 2x2 RGB image and its zlib payload.
    fn fixture() -> (Vec<u8>, Vec<u8>) {
        let pixels = image_gradient(2, 2, 3);
        let payload = compress_payload(&pixels, Algorithm::Zlib).unwrap();
        (pixels, payload)
    }

    fn assert_decodes(blob: &[u8], generation: Generation, pixels: &[u8]) {
        assert_eq!(container::read(blob).unwrap().generation, generation);
        let image = decode_image(blob).unwrap();
        assert_eq!((image.width, image.height), (2, 2));
        assert_eq!(image.pixels, pixels);
    }

    #[test]
    fn generation_legacy_text() {
        let (pixels, payload) = fixture();
        let blob = format!(
            "KOMPRESSION-IMAGE\nWidth: 2\nHeight: 2\nType: rgb\nAlgorithm: zlib\nDATA:\n{}\n",
            STANDARD.encode(&payload)
        );
        assert_decodes(blob.as_bytes(), Generation::LegacyText, &pixels);
    }

    #[test]
    fn generation_legacy_json() {
        let (pixels, payload) = fixture();
        let blob = serde_json::json!({
            "data": STANDARD.encode(&payload),
            "metadata": {"width": 2, "height": 2, "type": "rgb", "algorithm": "zlib"},
        });
        let blob = serde_json::to_vec(&blob).unwrap();
        assert_decodes(&blob, Generation::LegacyJson, &pixels);
    }

    #[test]
    fn generation_binary_v1() {
        let (pixels, payload) = fixture();
        let mut blob = b"KOMPRSN1".to_vec();
        for field in [1u32, 2, 2, payload.len() as u32, 1, 0] {
            blob.extend_from_slice(&field.to_le_bytes());
        }
        blob.extend_from_slice(&payload);
        assert_decodes(&blob, Generation::BinaryV1, &pixels);
    }

    #[test]
    fn generation_numeric() {
        let (pixels, payload) = fixture();
        let mut blob = Vec::new();
        for field in [2u32, 2, payload.len() as u32] {
            blob.extend_from_slice(&field.to_le_bytes());
        }
        blob.extend_from_slice(&payload);
        assert_decodes(&blob, Generation::Numeric, &pixels);
    }

    #[test]
    fn generation_earliest() {
        let (pixels, payload) = fixture();
        let mut blob = Vec::new();
        blob.extend_from_slice(&2u16.to_le_bytes());
        blob.extend_from_slice(&2u16.to_le_bytes());
        blob.push(PixelLayout::Rgb.to_tag());
        blob.push(Algorithm::Zlib.id() as u8);
        blob.extend_from_slice(&payload);
        assert_decodes(&blob, Generation::Earliest, &pixels);
    }

    #[test]
    fn generation_current_writers() {
        let (pixels, payload) = fixture();
        let meta = Metadata::new(2, 2, Algorithm::Zlib).with_layout(PixelLayout::Rgb);
        for (format, generation) in [
            (OutputFormat::Binary, Generation::BinaryV2),
            (OutputFormat::Json, Generation::CompactJson),
            (OutputFormat::Zip, Generation::Zip),
        ] {
            let blob = container::write(&payload, &meta, format).unwrap();
            assert_decodes(&blob, generation, &pixels);
        }
    }

    // ---------------------------------------------------------------
    // 2b. Magic-less headers that begin with another signature
    // ---------------------------------------------------------------

    fn numeric_blob(width: u32, height: u32, payload: &[u8]) -> Vec<u8> {
        let mut blob = Vec::new();
        for field in [width, height, payload.len() as u32] {
            blob.extend_from_slice(&field.to_le_bytes());
        }
        blob.extend_from_slice(payload);
        blob
    }

    fn earliest_blob(
        width: u16,
        height: u16,
        layout: PixelLayout,
        algorithm: Algorithm,
        payload: &[u8],
    ) -> Vec<u8> {
        let mut blob = Vec::new();
        blob.extend_from_slice(&width.to_le_bytes());
        blob.extend_from_slice(&height.to_le_bytes());
        blob.push(layout.to_tag());
        blob.push(algorithm.id() as u8);
        blob.extend_from_slice(payload);
        blob
    }

    #[test]
    fn numeric_width_123_starts_with_brace() {
        let pixels = image_gradient(123, 2, 1);
        let payload = compress_payload(&pixels, Algorithm::Zlib).unwrap();
        let blob = numeric_blob(123, 2, &payload);
        assert_eq!(blob[0], b'{');
        assert_eq!(container::read(&blob).unwrap().generation, Generation::Numeric);
        let image = decode_image(&blob).unwrap();
        assert_eq!((image.width, image.height), (123, 2));
        assert_eq!(image.pixels, pixels);

        // Width 0x7B20: a blank, then the brace.
        let blob = numeric_blob(0x7B20, 1, &[9; 4]);
        assert!(blob.starts_with(b" {"));
        let c = container::read(&blob).unwrap();
        assert_eq!(c.generation, Generation::Numeric);
        assert_eq!(c.metadata.width, 0x7B20);
    }

    #[test]
    fn earliest_width_123_starts_with_brace() {
        let pixels = image_gradient(123, 2, 1);
        let payload = compress_payload(&pixels, Algorithm::Zlib).unwrap();
        let blob = earliest_blob(123, 2, PixelLayout::Gray, Algorithm::Zlib, &payload);
        assert_eq!(blob[0], b'{');
        assert_eq!(container::read(&blob).unwrap().generation, Generation::Earliest);
        let image = decode_image(&blob).unwrap();
        assert_eq!(image.layout, PixelLayout::Gray);
        assert_eq!(image.pixels, pixels);
    }

    #[test]
    fn magicless_headers_spelling_zip_magic_are_claimed_as_zip() {
        let width = u32::from_le_bytes(*b"PK\x03\x04");
        let numeric = numeric_blob(width, 1, &[9; 4]);
        let earliest = earliest_blob(0x4B50, 0x0403, PixelLayout::Gray, Algorithm::None, &[9; 10]);
        for blob in [numeric, earliest] {
            assert!(blob.starts_with(b"PK\x03\x04"));
            assert!(matches!(container::read(&blob), Err(PzError::Zip(_))));
        }
    }

    #[test]
    fn magicless_headers_spelling_jpeg_magic_are_rejected_as_jpeg() {
        let width = u32::from_le_bytes([0xFF, 0xD8, 0xFF, 0x00]);
        let numeric = numeric_blob(width, 1, &[9; 4]);
        let earliest = earliest_blob(0xD8FF, 0x01FF, PixelLayout::Rgb, Algorithm::Zlib, &[9; 10]);
        for blob in [numeric, earliest] {
            assert!(blob.starts_with(&[0xFF, 0xD8, 0xFF]));
            assert!(matches!(
                container::read(&blob),
                Err(PzError::UnsupportedFormat(_))
            ));
        }
    }

    #[test]
    fn broken_magic_formats_are_not_reinterpreted() {
        let (_, payload) = fixture();
        let meta = Metadata::new(2, 2, Algorithm::Zlib);
        let zip = container::write(&payload, &meta, OutputFormat::Zip).unwrap();
        assert!(matches!(
            container::read(&zip[..zip.len() / 2]),
            Err(PzError::Zip(_))
        ));
        // Not JSON at all: declined by every probe.
        assert!(matches!(
            container::read(b"{not json"),
            Err(PzError::UnrecognizedFormat)
        ));
    }

    // ---------------------------------------------------------------
    // 3. Integrity
    // ---------------------------------------------------------------

    #[test]
    fn every_payload_bit_flip_is_detected() {
        let pixels = image_gradient(4, 4, 1);
        let (blob, _) = encode_image(&pixels, 4, 4, &CompressOptions::default()).unwrap();
        for byte in container::binary::HEADER_SIZE_V2..blob.len() {
            for bit in 0..8 {
                let mut damaged = blob.clone();
                damaged[byte] ^= 1 << bit;
                assert!(
                    matches!(
                        decode_image(&damaged),
                        Err(PzError::CorruptionDetected { .. })
                    ),
                    "flip at byte {byte} bit {bit} went unnoticed"
                );
            }
        }
    }

    #[test]
    fn truncation_fails_length_check_first() {
        let pixels = image_noise(8, 8, 3);
        let (blob, _) = encode_image(&pixels, 8, 8, &CompressOptions::default()).unwrap();
        for cut in 1..=4 {
            let err = decode_image(&blob[..blob.len() - cut]).unwrap_err();
            assert!(matches!(err, PzError::LengthMismatch { .. }), "{err}");
        }
    }

    #[test]
    fn empty_pixels_are_rejected() {
        for algorithm in Algorithm::ALL {
            assert!(matches!(
                compress(&[], 1, 1, &options(algorithm, OutputFormat::Binary)),
                Err(PzError::EmptyInput)
            ));
        }
    }

    #[test]
    fn payload_with_wrong_length_is_a_format_mismatch() {
        let payload = compress_payload(&[1, 2, 3, 4, 5], Algorithm::Zlib).unwrap();
        let blob = container::write(
            &payload,
            &Metadata::new(2, 2, Algorithm::Zlib),
            OutputFormat::Binary,
        )
        .unwrap();
        assert!(matches!(
            decode_image(&blob),
            Err(PzError::PixelFormatMismatch { len: 5, .. })
        ));
    }

    // ---------------------------------------------------------------
    // 4. Algorithmic properties
    // ---------------------------------------------------------------

    #[test]
    fn huffman_within_one_bit_of_entropy() {
        for data in [
            image_gradient(50, 10, 3),
            image_noise(32, 32, 1),
            b"abracadabra".repeat(20),
        ] {
            let freq = FrequencyTable::from_bytes(&data);
            let tree = HuffmanTree::build(&freq).unwrap();
            let avg = tree.weighted_path_length() as f64 / freq.total() as f64;
            let h = freq.entropy();
            assert!(avg + 1e-9 >= h, "avg {avg} below entropy {h}");
            assert!(avg < h + 1.0, "avg {avg} more than a bit above entropy {h}");
        }
    }

    #[test]
    fn huffman_beats_fixed_width_on_skewed_data() {
        let data: Vec<u8> = (0..1000).map(|i| if i % 10 == 0 { 1 } else { 0 }).collect();
        let payload = compress_payload(&data, Algorithm::Huffman).unwrap();
        assert!(payload.len() < data.len() / 4);
    }

    #[test]
    fn codebook_from_tree_is_prefix_free() {
        let data = image_noise(16, 16, 3);
        let tree = HuffmanTree::from_data(&data);
        let book = CodeBook::generate(tree.as_ref());
        assert!(book.is_prefix_free());
        assert_eq!(book.len(), FrequencyTable::from_bytes(&data).distinct());
        let bits = book.encode(&data).unwrap();
        assert_eq!(book.decode(&bits, data.len()).unwrap(), data);
    }

    // ---------------------------------------------------------------
    // 5. Properties over arbitrary images
    // ---------------------------------------------------------------

    proptest! {
        #[test]
        fn arbitrary_gray_images_round_trip(
            w in 1u32..24,
            h in 1u32..24,
            seed in any::<u8>(),
            alg in 0usize..3,
        ) {
            let pixels: Vec<u8> = (0..w * h)
                .map(|i| (i as u8).wrapping_mul(seed) >> 2)
                .collect();
            let (blob, _) = encode_image(
                &pixels,
                w,
                h,
                &options(Algorithm::ALL[alg], OutputFormat::Binary),
            )
            .unwrap();
            let image = decode_image(&blob).unwrap();
            prop_assert_eq!(image.pixels, pixels);
            prop_assert_eq!(image.layout, PixelLayout::Gray);
        }
    }
}

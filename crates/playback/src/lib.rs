//! Sample playback core: container parser and streaming converter.
//!
//! ```text
//! boot ──► loader::load_sample(flash, offset, diag)
//!              │ Ok(PlaybackBinding)        Err(LoadError)
//!              ▼                                 ▼
//!          StreamingConverter::new(Some(b))  StreamingConverter::silent()
//!              │
//!              ▼ moved into the audio task
//!          AudioCallback::process(left, right)  ── once per block
//! ```
//!
//! The binding is built before the audio engine starts and never changes
//! afterwards; the cursor lives inside the converter, owned by the audio task.
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(clippy::unwrap_used)]

pub mod converter;
pub mod diagnostics;
pub mod error;
pub mod header;
pub mod loader;

pub use converter::StreamingConverter;
pub use diagnostics::{Diagnostics, LoadEvent, LoadSummary, NullDiagnostics};
pub use error::LoadError;
pub use header::{Tag, WavHeader, HEADER_LEN};
pub use loader::{load_sample, PlaybackBinding, SampleFormat};

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::panic,
    clippy::float_cmp
)]
mod tests {
    /// Builds a header + payload image starting at offset 0.
    fn image(header: &crate::WavHeader, payload: &[u8]) -> Vec<u8> {
        let mut bytes = header.encode().to_vec();
        bytes.extend_from_slice(payload);
        bytes
    }

    /// Header decoding tests
    mod header_tests {
        use crate::header::{FourCc, Tag, WavHeader, HEADER_LEN};

        #[test]
        fn test_decode_reads_fields_at_fixed_offsets() {
            let mut raw = [0u8; HEADER_LEN];
            raw[0..4].copy_from_slice(b"RIFF");
            raw[20..22].copy_from_slice(&1u16.to_le_bytes());
            raw[22..24].copy_from_slice(&1u16.to_le_bytes());
            raw[24..28].copy_from_slice(&44_100u32.to_le_bytes());
            raw[34..36].copy_from_slice(&16u16.to_le_bytes());
            raw[40..44].copy_from_slice(&8u32.to_le_bytes());
            let h = WavHeader::decode(&raw);
            assert_eq!(&h.riff, b"RIFF");
            assert_eq!(h.format, 1);
            assert_eq!(h.channels, 1);
            assert_eq!(h.sample_rate, 44_100);
            assert_eq!(h.bits_per_sample, 16);
            assert_eq!(h.data_size, 8);
        }

        #[test]
        fn test_pcm_mono_fills_derived_fields() {
            let h = WavHeader::pcm_mono(48_000, 32, 192_000);
            assert_eq!(h.byte_rate, 192_000);
            assert_eq!(h.block_align, 4);
            assert_eq!(h.riff_size, 192_036);
            assert_eq!(WavHeader::decode(&h.encode()), h);
        }

        #[test]
        fn test_tag_ranges_match_layout() {
            assert_eq!(Tag::Riff.range(), 0..4);
            assert_eq!(Tag::Wave.range(), 8..12);
            assert_eq!(Tag::Fmt.range(), 12..16);
            assert_eq!(Tag::Data.range(), 36..40);
        }

        #[test]
        fn test_fourcc_escapes_non_printable() {
            assert_eq!(format!("{}", FourCc(*b"fmt ")), "\"fmt \"");
            assert_eq!(format!("{}", FourCc([0x00, b'a', 0xFF, b'Z'])), "\"\\x00a\\xFFZ\"");
        }
    }

    /// Loader tests
    mod loader_tests {
        use super::image;
        use crate::diagnostics::{EventLog, LoadEvent, HEADER_ROWS};
        use crate::{load_sample, LoadError, NullDiagnostics, SampleFormat, Tag, WavHeader};
        use platform::mocks::MockFlash;
        use platform::{FlashError, SliceFlash};

        #[test]
        fn test_valid_16bit_header_binds_payload() {
            let bytes = image(&WavHeader::pcm_mono(44_100, 16, 8), &[1, 0, 2, 0, 3, 0, 4, 0]);
            let mut flash = SliceFlash::new(&bytes);
            let b = load_sample(&mut flash, 0, &mut NullDiagnostics).expect("valid header");
            assert_eq!(b.format(), SampleFormat::S16);
            assert_eq!(b.payload().len(), 8);
            assert_eq!(b.payload_offset(), 44);
            assert_eq!(b.sample_count(), 4);
            assert_eq!(b.sample_rate(), 44_100);
        }

        #[test]
        fn test_header_offset_is_respected() {
            let mut bytes = vec![0xEEu8; 12];
            bytes.extend(image(&WavHeader::pcm_mono(48_000, 32, 4), &[0, 0, 0, 0x40]));
            let mut flash = SliceFlash::new(&bytes);
            let b = load_sample(&mut flash, 12, &mut NullDiagnostics).unwrap();
            assert_eq!(b.payload_offset(), 56);
            assert_eq!(b.format(), SampleFormat::S32);
            assert_eq!(b.sample(0), Some(0.5));
        }

        #[test]
        fn test_every_read_is_invalidated_first() {
            let bytes = image(&WavHeader::pcm_mono(48_000, 16, 4), &[0; 4]);
            let mut flash = MockFlash::new(&bytes);
            load_sample(&mut flash, 0, &mut NullDiagnostics).unwrap();
            assert_eq!(flash.log().len(), 4, "invalidate+read header, invalidate+map payload");
            assert!(flash.every_access_invalidated());
        }

        #[test]
        fn test_bad_fmt_tag_names_expected_and_found() {
            let mut h = WavHeader::pcm_mono(44_100, 16, 8);
            h.set_tag(Tag::Fmt, *b"FMT ");
            let bytes = image(&h, &[0; 8]);
            let mut log = EventLog::new();
            let err = load_sample(&mut SliceFlash::new(&bytes), 0, &mut log).unwrap_err();
            assert_eq!(
                err,
                LoadError::BadTag { field: Tag::Fmt, expected: *b"fmt ", found: *b"FMT " }
            );
            assert_eq!(log.rejection(), Some(err));
            assert_eq!(log.header_rows(), HEADER_ROWS);
            assert!(
                !log.events.iter().any(|e| matches!(e, LoadEvent::Fields(_))),
                "field values are only dumped once every tag matched"
            );
            assert_eq!(
                err.to_string(),
                "bad \"fmt \" tag: expected \"fmt \", found \"FMT \""
            );
        }

        #[test]
        fn test_checks_run_in_order() {
            // Stereo AND 24-bit: channels is checked first.
            let mut h = WavHeader::pcm_mono(44_100, 24, 6);
            h.channels = 2;
            let bytes = image(&h, &[0; 6]);
            let err = load_sample(&mut SliceFlash::new(&bytes), 0, &mut NullDiagnostics);
            assert_eq!(err, Err(LoadError::UnsupportedChannels(2)));
        }

        #[test]
        fn test_float_format_rejected() {
            let mut h = WavHeader::pcm_mono(48_000, 32, 4);
            h.format = 3;
            let bytes = image(&h, &[0; 4]);
            let err = load_sample(&mut SliceFlash::new(&bytes), 0, &mut NullDiagnostics);
            assert_eq!(err, Err(LoadError::UnsupportedFormat(3)));
        }

        #[test]
        fn test_unsupported_bit_depth_rejected() {
            let bytes = image(&WavHeader::pcm_mono(48_000, 8, 4), &[0; 4]);
            let mut log = EventLog::new();
            let err = load_sample(&mut SliceFlash::new(&bytes), 0, &mut log);
            assert_eq!(err, Err(LoadError::UnsupportedBitDepth(8)));
            assert!(log.events.iter().any(|e| matches!(e, LoadEvent::Fields(_))));
        }

        #[test]
        fn test_payload_past_flash_end_is_flash_error() {
            let bytes = image(&WavHeader::pcm_mono(48_000, 16, 1_000), &[0; 8]);
            let err = load_sample(&mut SliceFlash::new(&bytes), 0, &mut NullDiagnostics);
            assert_eq!(
                err,
                Err(LoadError::Flash(FlashError::OutOfBounds {
                    offset: 44,
                    len: 1_000,
                    capacity: 52
                }))
            );
        }

        #[test]
        fn test_truncated_header_is_flash_error() {
            let bytes = [0u8; 20];
            let err = load_sample(&mut SliceFlash::new(&bytes), 0, &mut NullDiagnostics);
            assert!(matches!(err, Err(LoadError::Flash(_))));
        }

        #[test]
        fn test_accepted_summary_is_last_event() {
            let bytes = image(&WavHeader::pcm_mono(44_100, 16, 8), &[0; 8]);
            let mut log = EventLog::new();
            load_sample(&mut SliceFlash::new(&bytes), 0, &mut log).unwrap();
            match log.events.last() {
                Some(LoadEvent::Accepted(s)) => {
                    assert_eq!((s.sample_rate, s.channels, s.bits_per_sample, s.data_size), (44_100, 1, 16, 8));
                }
                other => panic!("expected Accepted, got {other:?}"),
            }
            assert!(matches!(log.events.first(), Some(LoadEvent::Reading { offset: 0 })));
        }

        #[test]
        fn test_only_the_verdict_is_a_rejection() {
            let mut header = WavHeader::pcm_mono(48_000, 16, 4);
            header.bits_per_sample = 8;
            let bytes = image(&header, &[0; 4]);
            let mut log = EventLog::new();
            load_sample(&mut SliceFlash::new(&bytes), 0, &mut log).unwrap_err();

            let rejections = log.events.iter().filter(|e| e.is_rejection()).count();
            assert_eq!(rejections, 1);
            assert!(log.events.last().is_some_and(LoadEvent::is_rejection));
            assert_eq!(log.header_rows(), HEADER_ROWS);
        }
    }

    /// Converter tests
    mod converter_tests {
        use crate::converter::{normalize_s16, normalize_s32};
        use crate::{PlaybackBinding, SampleFormat, StreamingConverter};
        use platform::AudioCallback;

        #[test]
        fn test_normalize_s16_bounds() {
            assert_eq!(normalize_s16(i16::MIN), -1.0);
            assert_eq!(normalize_s16(0), 0.0);
            assert_eq!(normalize_s16(i16::MAX), 32_767.0 / 32_768.0);
            assert!(normalize_s16(i16::MAX) < 1.0);
        }

        #[test]
        fn test_normalize_s32_bounds() {
            assert_eq!(normalize_s32(i32::MIN), -1.0);
            assert_eq!(normalize_s32(1 << 30), 0.5);
            assert!(normalize_s32(i32::MAX) < 1.0);
            assert!(normalize_s32(i32::MAX) > 0.999_999);
        }

        #[test]
        fn test_silent_converter_writes_zeros() {
            let mut conv = StreamingConverter::silent();
            let mut left = [0.7f32; 48];
            let mut right = [-0.7f32; 48];
            conv.process(&mut left, &mut right);
            assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));
            assert_eq!(conv.cursor(), 0);
        }

        #[test]
        fn test_channels_are_identical() {
            let payload = [0x00, 0x40, 0x00, 0xC0]; // 16384, -16384
            let mut conv =
                StreamingConverter::new(Some(PlaybackBinding::new(&payload, SampleFormat::S16, 48_000)));
            let mut left = [0f32; 3];
            let mut right = [0f32; 3];
            conv.process(&mut left, &mut right);
            assert_eq!(left, [0.5, -0.5, 0.5]);
            assert_eq!(left, right);
        }

        #[test]
        fn test_trailing_partial_sample_is_never_read() {
            let payload = [0x00, 0x40, 0xFF]; // one whole sample plus a stray byte
            let mut conv =
                StreamingConverter::new(Some(PlaybackBinding::new(&payload, SampleFormat::S16, 48_000)));
            let mut left = [0f32; 4];
            let mut right = [0f32; 4];
            conv.process(&mut left, &mut right);
            assert_eq!(left, [0.5; 4]);
        }

        #[test]
        fn test_empty_payload_plays_silence() {
            let mut conv =
                StreamingConverter::new(Some(PlaybackBinding::new(&[], SampleFormat::S32, 48_000)));
            let mut left = [1f32; 8];
            let mut right = [1f32; 8];
            conv.process(&mut left, &mut right);
            assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));
        }

        #[test]
        fn test_mismatched_buffers_write_common_prefix() {
            let payload = [0x00, 0x40];
            let mut conv =
                StreamingConverter::new(Some(PlaybackBinding::new(&payload, SampleFormat::S16, 48_000)));
            let mut left = [9f32; 4];
            let mut right = [9f32; 2];
            conv.process(&mut left, &mut right);
            assert_eq!(left, [0.5, 0.5, 9.0, 9.0]);
            assert_eq!(right, [0.5, 0.5]);
            assert_eq!(conv.cursor(), 0);
        }
    }
}

//! Property-based tests for the container parser.
//! Every valid header binds; every single-field corruption rejects.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation
)]

use platform::SliceFlash;
use playback::diagnostics::EventLog;
use playback::{load_sample, LoadError, NullDiagnostics, SampleFormat, Tag, WavHeader};
use proptest::prelude::*;

fn image(header: &WavHeader, payload_len: usize) -> Vec<u8> {
    let mut bytes = header.encode().to_vec();
    bytes.resize(bytes.len() + payload_len, 0x11);
    bytes
}

fn bits() -> impl Strategy<Value = u16> {
    prop_oneof![Just(16u16), Just(32u16)]
}

proptest! {
    /// Valid headers bind with payload length == data_size and the payload
    /// starting right after the header.
    #[test]
    fn valid_header_binds(
        rate in 8_000u32..=192_000,
        bits in bits(),
        data_size in 0u32..512,
        header_offset in 0u32..64,
    ) {
        let mut bytes = vec![0u8; header_offset as usize];
        bytes.extend(image(&WavHeader::pcm_mono(rate, bits, data_size), data_size as usize));
        let mut flash = SliceFlash::new(&bytes);
        let binding = load_sample(&mut flash, header_offset, &mut NullDiagnostics)
            .expect("valid header must bind");
        prop_assert_eq!(binding.payload().len(), data_size as usize);
        prop_assert_eq!(binding.payload_offset(), header_offset + 44);
        prop_assert_eq!(binding.format().bits(), bits);
        prop_assert_eq!(binding.sample_count(), data_size as usize / usize::from(bits / 8));
    }

    /// Any single corrupted tag rejects, naming that tag.
    #[test]
    fn corrupted_tag_rejects(
        which in 0usize..4,
        byte in 0usize..4,
        flip in 1u8..=255,
    ) {
        let tag = Tag::ALL[which];
        let mut header = WavHeader::pcm_mono(44_100, 16, 8);
        let mut bad = tag.expected();
        bad[byte] ^= flip;
        header.set_tag(tag, bad);
        let bytes = image(&header, 8);
        let mut log = EventLog::new();
        let err = load_sample(&mut SliceFlash::new(&bytes), 0, &mut log).unwrap_err();
        prop_assert_eq!(err, LoadError::BadTag { field: tag, expected: tag.expected(), found: bad });
        prop_assert_eq!(log.rejection(), Some(err));
    }

    /// Non-PCM format codes reject.
    #[test]
    fn non_pcm_rejects(format in any::<u16>().prop_filter("not PCM", |f| *f != 1)) {
        let mut header = WavHeader::pcm_mono(48_000, 16, 4);
        header.format = format;
        let bytes = image(&header, 4);
        let err = load_sample(&mut SliceFlash::new(&bytes), 0, &mut NullDiagnostics);
        prop_assert_eq!(err, Err(LoadError::UnsupportedFormat(format)));
    }

    /// Anything but mono rejects.
    #[test]
    fn non_mono_rejects(channels in any::<u16>().prop_filter("not mono", |c| *c != 1)) {
        let mut header = WavHeader::pcm_mono(48_000, 16, 4);
        header.channels = channels;
        let bytes = image(&header, 4);
        let err = load_sample(&mut SliceFlash::new(&bytes), 0, &mut NullDiagnostics);
        prop_assert_eq!(err, Err(LoadError::UnsupportedChannels(channels)));
    }

    /// Bit depths other than 16 and 32 reject.
    #[test]
    fn other_bit_depths_reject(bits in any::<u16>().prop_filter("16/32", |b| *b != 16 && *b != 32)) {
        prop_assert!(SampleFormat::from_bits(bits).is_none());
        let mut header = WavHeader::pcm_mono(48_000, 16, 4);
        header.bits_per_sample = bits;
        let bytes = image(&header, 4);
        let err = load_sample(&mut SliceFlash::new(&bytes), 0, &mut NullDiagnostics);
        prop_assert_eq!(err, Err(LoadError::UnsupportedBitDepth(bits)));
    }

    /// Decoding never panics on arbitrary bytes, and garbage never binds
    /// unless it happens to carry every tag.
    #[test]
    fn arbitrary_bytes_never_panic(raw in proptest::collection::vec(any::<u8>(), 0..128)) {
        let result = load_sample(&mut SliceFlash::new(&raw), 0, &mut NullDiagnostics);
        if raw.len() >= 44 && result.is_ok() {
            prop_assert_eq!(&raw[0..4], b"RIFF");
        }
    }
}

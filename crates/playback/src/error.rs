//! Load error taxonomy.

use core::fmt;

use platform::FlashError;

use crate::header::{FourCc, Tag};

/// Reason a sample image was rejected.
///
/// Every variant is terminal for the boot: flash content is static, so the
/// only recovery is reflashing the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadError {
    /// A magic tag did not match.
    BadTag {
        /// Which tag slot was wrong.
        field: Tag,
        /// Bytes the slot must hold.
        expected: [u8; 4],
        /// Bytes actually found.
        found: [u8; 4],
    },
    /// Format code other than uncompressed PCM.
    UnsupportedFormat(u16),
    /// Channel count other than mono.
    UnsupportedChannels(u16),
    /// Bit depth other than 16 or 32.
    UnsupportedBitDepth(u16),
    /// The flash region could not serve the header or payload range.
    Flash(FlashError),
}

impl From<FlashError> for LoadError {
    fn from(e: FlashError) -> Self {
        Self::Flash(e)
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadTag {
                field,
                expected,
                found,
            } => write!(
                f,
                "bad {field} tag: expected {}, found {}",
                FourCc(*expected),
                FourCc(*found)
            ),
            Self::UnsupportedFormat(code) => {
                write!(f, "unsupported format code {code} (expected 1 = PCM)")
            }
            Self::UnsupportedChannels(n) => {
                write!(f, "unsupported channel count {n} (expected 1 = mono)")
            }
            Self::UnsupportedBitDepth(bits) => {
                write!(f, "unsupported bit depth {bits} (expected 16 or 32)")
            }
            Self::Flash(e) => write!(f, "flash read failed: {e}"),
        }
    }
}

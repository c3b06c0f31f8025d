use crate::error::{FcsError, Result};
use crate::version::Version;
use serde::Serialize;
use std::ops::RangeInclusive;

/// Number of bytes in the fixed HEADER segment.
pub const HEADER_LEN: usize = 58;

/// Largest offset representable in an 8-character HEADER field. Segments
/// beyond this ceiling are zero-sentinelled in the HEADER and carry their
/// true offsets in TEXT.
pub const HEADER_OFFSET_CEILING: usize = 99_999_999;

/// Contains the FCS version and byte offsets to the TEXT, DATA, and
/// ANALYSIS segments
///
/// The HEADER is the first segment of a data set (first 58 bytes):
/// - The FCS version string (e.g., "FCS3.1")
/// - Byte offsets to the TEXT segment (contains metadata/keywords)
/// - Byte offsets to the DATA segment (contains event data)
/// - Byte offsets to the ANALYSIS segment (optional)
///
/// All offsets are relative to the start of the data set (which is the
/// start of the file for the first data set) and end offsets are inclusive.
/// A zero DATA or ANALYSIS offset means the segment location must be
/// resolved from TEXT instead.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Header {
    pub version: Version,
    pub text_offset: RangeInclusive<usize>,
    pub data_offset: RangeInclusive<usize>,
    pub analysis_offset: RangeInclusive<usize>,
}

impl Header {
    /// Parses the 58-byte HEADER at the start of `bytes`
    /// # Errors
    /// Will return `Err` if:
    /// - fewer than 58 bytes are available
    /// - the version string is not recognized
    /// - bytes 6-9 are not spaces
    /// - any offset field is non-numeric
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(FcsError::TruncatedData(format!(
                "need {HEADER_LEN} HEADER bytes, have {}",
                bytes.len()
            )));
        }

        let version_str = std::str::from_utf8(&bytes[..6])
            .map_err(|_| FcsError::MalformedHeader("version bytes are not ASCII".into()))?;
        let version = Version::from_header_str(version_str.trim_end())?;

        Self::check_header_spaces(&bytes[6..=9])?;

        Ok(Self {
            version,
            text_offset: Self::offset_field(bytes, 10)?..=Self::offset_field(bytes, 18)?,
            data_offset: Self::offset_field(bytes, 26)?..=Self::offset_field(bytes, 34)?,
            analysis_offset: Self::offset_field(bytes, 42)?..=Self::offset_field(bytes, 50)?,
        })
    }

    /// Check for the four separator spaces between the version string and
    /// the first offset field
    /// # Errors
    /// Will return `Err` if the number of spaces is not 4
    pub fn check_header_spaces(buffer: &[u8]) -> Result<()> {
        if bytecount::count(buffer, b' ') != 4 {
            return Err(FcsError::MalformedHeader(
                "bytes 6-9 are not spaces, file may be corrupted".into(),
            ));
        }
        Ok(())
    }

    /// Parse an 8-byte field as a right-justified ASCII decimal offset.
    /// An absent segment is spelled with the literal digit `0`; anything
    /// that does not parse as a decimal (a blank field included) is
    /// malformed.
    fn offset_field(bytes: &[u8], start: usize) -> Result<usize> {
        let text = std::str::from_utf8(&bytes[start..start + 8])
            .map_err(|_| FcsError::MalformedHeader(format!("offset field at byte {start} is not ASCII")))?
            .trim();
        text.parse::<usize>().map_err(|_| {
            FcsError::MalformedHeader(format!("non-numeric offset field `{text}` at byte {start}"))
        })
    }
}

impl Default for Header {
    fn default() -> Self {
        Self {
            version: Version::default(),
            text_offset: 0..=0,
            data_offset: 0..=0,
            analysis_offset: 0..=0,
        }
    }
}

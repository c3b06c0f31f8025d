use crate::error::{FcsError, Result};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// An enum representing the supported FCS file format versions
///
/// Each version has different required keywords and structural requirements.
/// The codec reads and writes FCS 2.0, 3.0, and 3.1; other version strings
/// in the HEADER are rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Version {
    #[strum(serialize = "FCS2.0")]
    V2_0,
    #[strum(serialize = "FCS3.0")]
    V3_0,
    #[default]
    #[strum(serialize = "FCS3.1")]
    V3_1,
}

impl Version {
    /// Returns a valid FCS version after checking the 6-byte HEADER prefix
    /// # Errors
    /// Will return `Err` if the version string is not one the codec supports
    pub fn from_header_str(version: &str) -> Result<Self> {
        match version {
            "FCS2.0" => Ok(Self::V2_0),
            "FCS3.0" => Ok(Self::V3_0),
            "FCS3.1" => Ok(Self::V3_1),
            _ => Err(FcsError::MalformedHeader(format!(
                "unrecognized version string `{version}`"
            ))),
        }
    }

    /// Returns the required *non-parameter* indexed keywords for the TEXT
    /// segment in a given FCS version as a static array of strings
    #[must_use]
    pub fn required_keywords(&self) -> &'static [&'static str] {
        const V2_0: [&str; 5] = [
            "$BYTEORD",  // byte order for data acquisition computer
            "$DATATYPE", // type of data in data segment (ASCII, int, float)
            "$MODE",     // data mode (list mode - preferred, histogram - deprecated)
            "$NEXTDATA", // byte-offset to next data set in the file
            "$PAR",      // number of parameters in an event
        ];
        const V3_0_V3_1: [&str; 12] = [
            "$BEGINANALYSIS", // byte-offset to the beginning of analysis segment
            "$BEGINDATA",     // byte-offset of beginning of data segment
            "$BEGINSTEXT",    // byte-offset to beginning of supplemental text segment
            "$BYTEORD",       // byte order for data acquisition computer
            "$DATATYPE",      // type of data in data segment (ASCII, int, float)
            "$ENDANALYSIS",   // byte-offset to end of analysis segment
            "$ENDDATA",       // byte-offset to end of data segment
            "$ENDSTEXT",      // byte-offset to end of supplemental text segment
            "$MODE",          // data mode (list mode - preferred, histogram - deprecated)
            "$NEXTDATA",      // byte-offset to next data set in the file
            "$PAR",           // number of parameters in an event
            "$TOT",           // total number of events in the data set
        ];

        match self {
            Self::V2_0 => &V2_0,
            Self::V3_0 | Self::V3_1 => &V3_0_V3_1,
        }
    }

    /// `$TOT` may be omitted in FCS 2.0 and derived from the DATA span;
    /// 3.0 and 3.1 require it.
    #[must_use]
    pub fn requires_event_count(&self) -> bool {
        !matches!(self, Self::V2_0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_strings_round_trip() {
        for v in [Version::V2_0, Version::V3_0, Version::V3_1] {
            assert_eq!(Version::from_header_str(&v.to_string()).unwrap(), v);
        }
    }

    #[test]
    fn unsupported_versions_are_rejected() {
        for s in ["FCS1.0", "FCS3.2", "FCS4.0", "LMD1.0", ""] {
            assert!(matches!(
                Version::from_header_str(s),
                Err(FcsError::MalformedHeader(_))
            ));
        }
    }
}

use crate::error::{FcsError, Result};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// The data type of the DATA segment, which determines how event values are
/// stored
///
/// Single-precision floating point (F) is the most common in modern files
/// and is the writer's default.
#[derive(Default, Display, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum FcsDataType {
    /// Unsigned binary integer, per-parameter `$PnB` bit widths
    I,
    /// Single-precision floating point (f32)
    #[default]
    F,
    /// Double-precision floating point (f64)
    D,
    /// ASCII-encoded decimal integers, fixed or variable width
    A,
}

impl FcsDataType {
    /// Matches the `$DATATYPE` value and returns the corresponding data type
    /// # Errors
    /// Will return `Err` if the value is not one of `I`, `F`, `D`, or `A`
    pub fn from_keyword_str(data_type: &str) -> Result<Self> {
        let trimmed = data_type.trim();
        if trimmed.eq_ignore_ascii_case("I") {
            Ok(Self::I)
        } else if trimmed.eq_ignore_ascii_case("F") {
            Ok(Self::F)
        } else if trimmed.eq_ignore_ascii_case("D") {
            Ok(Self::D)
        } else if trimmed.eq_ignore_ascii_case("A") {
            Ok(Self::A)
        } else {
            Err(FcsError::UnsupportedDataType(trimmed.to_string()))
        }
    }

    /// Returns the keyword value written for this data type
    #[must_use]
    pub fn keyword_str(&self) -> &'static str {
        match self {
            Self::I => "I",
            Self::F => "F",
            Self::D => "D",
            Self::A => "A",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_types() {
        assert_eq!(FcsDataType::from_keyword_str("I").unwrap(), FcsDataType::I);
        assert_eq!(FcsDataType::from_keyword_str(" f ").unwrap(), FcsDataType::F);
        assert_eq!(FcsDataType::from_keyword_str("D").unwrap(), FcsDataType::D);
        assert_eq!(FcsDataType::from_keyword_str("A").unwrap(), FcsDataType::A);
    }

    #[test]
    fn rejects_unknown_types() {
        assert!(matches!(
            FcsDataType::from_keyword_str("X"),
            Err(FcsError::UnsupportedDataType(_))
        ));
    }
}

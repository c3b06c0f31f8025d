use crate::error::{FcsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The `$PnB` bit width of one parameter
///
/// Almost all files use a fixed width; the `*` token marks variable-width
/// ASCII values delimited by whitespace (`$DATATYPE=A` only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitWidth {
    Fixed(u32),
    Variable,
}

impl BitWidth {
    /// Parses a `$PnB` value (`*` or a positive decimal bit count)
    /// # Errors
    /// Will return `Err` if the value is neither `*` nor a positive integer
    pub fn from_keyword_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed == "*" {
            return Ok(Self::Variable);
        }
        match trimmed.parse::<u32>() {
            Ok(bits) if bits > 0 => Ok(Self::Fixed(bits)),
            _ => Err(FcsError::MalformedText(format!(
                "invalid $PnB value `{trimmed}`"
            ))),
        }
    }

    /// The keyword representation written back out
    #[must_use]
    pub fn keyword_string(&self) -> String {
        match self {
            Self::Fixed(bits) => bits.to_string(),
            Self::Variable => "*".to_string(),
        }
    }
}

impl fmt::Display for BitWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword_string())
    }
}

/// The `$PnE` logarithmic amplification of one parameter: the number of
/// decades and the linear value at log 0. `0,0` means linear (and is
/// mandatory for floating point data).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Amplification {
    pub decades: f32,
    pub offset: f32,
}

impl Amplification {
    /// Parses a `$PnE` value of the form `decades,offset`
    #[must_use]
    pub fn from_keyword_str(value: &str) -> Option<Self> {
        let (decades, offset) = value.trim().split_once(',')?;
        Some(Self {
            decades: decades.trim().parse().ok()?,
            offset: offset.trim().parse().ok()?,
        })
    }

    #[must_use]
    pub fn keyword_string(&self) -> String {
        format!("{},{}", self.decades, self.offset)
    }

    #[must_use]
    pub fn is_linear(&self) -> bool {
        self.decades == 0.0
    }
}

/// One channel of a data set, assembled from the `$PnX` keyword family
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    /// 1-based index, matching the `n` in `$PnB`, `$PnN`, ...
    pub index: usize,
    /// `$PnB`: bits reserved per value
    pub bit_width: BitWidth,
    /// `$PnR`: the logical range of stored values
    pub range: u64,
    /// `$PnN`: short channel name (e.g. "FSC-A")
    pub short_name: String,
    /// `$PnS`: optional descriptive label (e.g. "CD8")
    pub long_name: Option<String>,
    /// `$PnE`: logarithmic amplification, when declared
    pub amplification: Option<Amplification>,
    /// `$PnG`: detector gain (3.0+)
    pub gain: Option<f32>,
}

impl Parameter {
    /// The bit mask applied to raw integer values for this channel.
    ///
    /// `$PnR` is the logical range and may be smaller than `2^$PnB`;
    /// writers are expected to store values below it but some do not, so
    /// decoded values are reduced modulo the smallest power of two at or
    /// above the range. A power-of-two range (e.g. 262144) masks to
    /// `range - 1`; anything else rounds up first so in-range values pass
    /// unchanged.
    #[must_use]
    pub fn mask(&self) -> u64 {
        match self.range.checked_next_power_of_two() {
            Some(ceiling) => ceiling - 1,
            None => u64::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parameter(range: u64) -> Parameter {
        Parameter {
            index: 1,
            bit_width: BitWidth::Fixed(16),
            range,
            short_name: "FSC-A".into(),
            long_name: None,
            amplification: None,
            gain: None,
        }
    }

    #[test]
    fn mask_for_power_of_two_range() {
        assert_eq!(parameter(1024).mask(), 0x3FF);
        assert_eq!(parameter(262_144).mask(), 262_143);
    }

    #[test]
    fn mask_rounds_up_for_other_ranges() {
        assert_eq!(parameter(1000).mask(), 1023);
        assert_eq!(parameter(3).mask(), 3);
        assert_eq!(parameter(1).mask(), 0);
    }

    #[test]
    fn bit_width_parses_fixed_and_variable() {
        assert_eq!(BitWidth::from_keyword_str("16").unwrap(), BitWidth::Fixed(16));
        assert_eq!(BitWidth::from_keyword_str(" * ").unwrap(), BitWidth::Variable);
        assert!(BitWidth::from_keyword_str("0").is_err());
        assert!(BitWidth::from_keyword_str("wide").is_err());
    }

    #[test]
    fn amplification_parses_decades_and_offset() {
        let amp = Amplification::from_keyword_str("4,1").unwrap();
        assert_eq!(amp.decades, 4.0);
        assert_eq!(amp.offset, 1.0);
        assert!(!amp.is_linear());
        assert!(Amplification::from_keyword_str("0,0").unwrap().is_linear());
        assert!(Amplification::from_keyword_str("linear").is_none());
    }
}

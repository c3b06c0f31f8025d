use crate::byteorder::ByteOrder;
use crate::datatype::FcsDataType;
use crate::error::{FcsError, ParseWarning, Result};
use crate::parameter::{Amplification, BitWidth, Parameter};
use crate::text;
use crate::version::Version;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Keyword map of a TEXT or ANALYSIS segment: normalized (lowercased) key
/// to verbatim value.
pub type KeywordMap = FxHashMap<String, String>;

/// Contains the keyword/value pairs and delimiter from the TEXT segment of
/// an FCS data set
///
/// The TEXT segment carries all metadata about the data set: its shape
/// (`$PAR`, `$TOT`), the numeric encoding (`$DATATYPE`, `$BYTEORD`,
/// per-parameter `$PnB`/`$PnR`), segment offsets, and free-form annotations
/// (`$CYT`, `$FIL`, `$SPILLOVER`, ...). Keys are stored case-folded to
/// lowercase because keyword semantics are case-insensitive; values are
/// stored exactly as written. Typed access to the standard keywords goes
/// through the resolver methods below; everything else stays reachable
/// verbatim through [`Metadata::get`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct Metadata {
    pub keywords: KeywordMap,
    pub delimiter: u8,
}

impl Metadata {
    /// Parses a primary TEXT segment (delimiter byte plus pairs)
    /// # Errors
    /// Will return `Err` if the segment is empty or malformed
    pub(crate) fn parse(
        bytes: &[u8],
        empty_values: bool,
    ) -> Result<(Self, Vec<ParseWarning>)> {
        let (delimiter, keywords, warnings) = text::parse_text_segment(bytes, empty_values)?;
        Ok((
            Self {
                keywords,
                delimiter,
            },
            warnings,
        ))
    }

    /// Looks up a keyword by any casing; the leading `$` is part of the key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.keywords.get(&key.to_lowercase()).map(String::as_str)
    }

    fn required(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| FcsError::MissingRequiredKeyword(key.to_uppercase()))
    }

    /// Parses a keyword value as an unsigned integer, tolerating the space
    /// padding that fixed-width offset fields carry.
    fn usize_value(&self, key: &str) -> Result<Option<usize>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value.trim().parse::<usize>().map(Some).map_err(|_| {
                FcsError::MalformedText(format!(
                    "keyword {} has non-numeric value `{}`",
                    key.to_uppercase(),
                    value.trim()
                ))
            }),
        }
    }

    fn required_usize(&self, key: &str) -> Result<usize> {
        self.usize_value(key)?
            .ok_or_else(|| FcsError::MissingRequiredKeyword(key.to_uppercase()))
    }

    /// Check that the required keywords for `version` are present
    /// # Errors
    /// Will return `Err` naming the first missing keyword
    pub fn validate_required_keywords(&self, version: Version) -> Result<()> {
        for keyword in version.required_keywords() {
            if self.get(keyword).is_none() {
                return Err(FcsError::MissingRequiredKeyword((*keyword).to_string()));
            }
        }
        Ok(())
    }

    /// Check that `$MODE` is list mode; the deprecated histogram modes are
    /// rejected
    /// # Errors
    /// Will return `Err` for any `$MODE` other than `L`
    pub fn validate_mode(&self) -> Result<()> {
        let mode = self.required("$MODE")?.trim();
        if mode.eq_ignore_ascii_case("L") {
            Ok(())
        } else {
            Err(FcsError::UnsupportedMode(mode.to_string()))
        }
    }

    /// Warns about `$Pn*` keywords whose parameter index exceeds `$PAR`,
    /// which usually signals a file assembled from mismatched sources.
    pub(crate) fn parameter_index_warnings(&self, parameter_count: usize) -> Vec<ParseWarning> {
        let pattern = Regex::new(r"^\$p(\d+)[a-z]+$").expect("parameter keyword pattern");
        let mut flagged: Vec<String> = self
            .keywords
            .keys()
            .filter(|key| {
                pattern
                    .captures(key)
                    .and_then(|captures| captures.get(1)?.as_str().parse::<usize>().ok())
                    .is_some_and(|index| index == 0 || index > parameter_count)
            })
            .cloned()
            .collect();
        flagged.sort();
        flagged
            .into_iter()
            .map(|key| ParseWarning::ParameterIndexOutOfRange {
                key,
                parameter_count,
            })
            .collect()
    }

    /// `$PAR`: the number of parameters per event
    /// # Errors
    /// Will return `Err` if `$PAR` is absent or non-numeric
    pub fn parameter_count(&self) -> Result<usize> {
        self.required_usize("$PAR")
    }

    /// `$TOT`: the number of events, when declared
    /// # Errors
    /// Will return `Err` if the value is non-numeric
    pub fn event_count(&self) -> Result<Option<usize>> {
        self.usize_value("$TOT")
    }

    /// `$DATATYPE` resolved to a decoding mode
    /// # Errors
    /// Will return `Err` if the keyword is absent or outside `{I,F,D,A}`
    pub fn data_type(&self) -> Result<FcsDataType> {
        FcsDataType::from_keyword_str(self.required("$DATATYPE")?)
    }

    /// `$BYTEORD` resolved to an endianness or byte permutation
    /// # Errors
    /// Will return `Err` if the keyword is absent or not a permutation
    pub fn byte_order(&self) -> Result<ByteOrder> {
        ByteOrder::from_keyword_str(self.required("$BYTEORD")?)
    }

    /// `$NEXTDATA`: offset of the next data set relative to this one, 0 if
    /// this is the last
    /// # Errors
    /// Will return `Err` if the keyword is absent or non-numeric
    pub fn next_data(&self) -> Result<usize> {
        self.required_usize("$NEXTDATA")
    }

    /// A `$BEGIN*`/`$END*` offset pair from TEXT, `None` when either key is
    /// absent
    /// # Errors
    /// Will return `Err` if a present value is non-numeric
    pub fn segment_override(&self, begin_key: &str, end_key: &str) -> Result<Option<(usize, usize)>> {
        match (self.usize_value(begin_key)?, self.usize_value(end_key)?) {
            (Some(begin), Some(end)) => Ok(Some((begin, end))),
            _ => Ok(None),
        }
    }

    /// Builds the [`Parameter`] record for channel `n` (1-based).
    ///
    /// `$PnB` and `$PnR` are always required. `$PnN` is required from 3.0
    /// on; 2.0 files may omit it, in which case the channel is named `Pn`.
    ///
    /// # Errors
    /// Will return `Err` if a required `$Pn*` keyword is absent or invalid
    pub fn parameter(&self, n: usize, version: Version) -> Result<Parameter> {
        let bit_width = BitWidth::from_keyword_str(self.required(&format!("$P{n}B"))?)?;
        let range = self
            .required(&format!("$P{n}R"))?
            .trim()
            .parse::<u64>()
            .map_err(|_| {
                FcsError::MalformedText(format!("keyword $P{n}R has a non-numeric value"))
            })?;

        let short_name = match self.get(&format!("$P{n}N")) {
            Some(name) => name.to_string(),
            None if version == Version::V2_0 => format!("P{n}"),
            None => return Err(FcsError::MissingRequiredKeyword(format!("$P{n}N"))),
        };

        Ok(Parameter {
            index: n,
            bit_width,
            range,
            short_name,
            long_name: self.get(&format!("$P{n}S")).map(str::to_string),
            amplification: self
                .get(&format!("$P{n}E"))
                .and_then(Amplification::from_keyword_str),
            gain: self
                .get(&format!("$P{n}G"))
                .and_then(|value| value.trim().parse().ok()),
        })
    }

    /// Builds all `$PAR` parameter records in index order
    /// # Errors
    /// Will return `Err` if any channel is missing a required keyword
    pub fn parameters(&self, parameter_count: usize, version: Version) -> Result<Vec<Parameter>> {
        (1..=parameter_count)
            .map(|n| self.parameter(n, version))
            .collect()
    }

    /// Transform the keyword map into a JSON object via serde
    /// # Errors
    /// Will return `Err` if serialization fails
    pub fn keywords_as_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.keywords)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(pairs: &[(&str, &str)]) -> Metadata {
        let mut keywords = KeywordMap::default();
        for (key, value) in pairs {
            keywords.insert(key.to_lowercase(), (*value).to_string());
        }
        Metadata {
            keywords,
            delimiter: b'|',
        }
    }

    #[test]
    fn lookups_are_case_insensitive() {
        let meta = metadata(&[("$PAR", "4")]);
        assert_eq!(meta.get("$PAR"), Some("4"));
        assert_eq!(meta.get("$par"), Some("4"));
        assert_eq!(meta.parameter_count().unwrap(), 4);
    }

    #[test]
    fn numeric_values_tolerate_padding() {
        let meta = metadata(&[("$TOT", "        100")]);
        assert_eq!(meta.event_count().unwrap(), Some(100));
    }

    #[test]
    fn missing_required_keyword_is_reported_by_name() {
        let meta = metadata(&[]);
        assert!(matches!(
            meta.parameter_count(),
            Err(FcsError::MissingRequiredKeyword(name)) if name == "$PAR"
        ));
    }

    #[test]
    fn mode_l_passes_others_fail() {
        assert!(metadata(&[("$MODE", "L")]).validate_mode().is_ok());
        for mode in ["C", "U", "list"] {
            assert!(matches!(
                metadata(&[("$MODE", mode)]).validate_mode(),
                Err(FcsError::UnsupportedMode(_))
            ));
        }
    }

    #[test]
    fn builds_parameter_records() {
        let meta = metadata(&[
            ("$P1B", "16"),
            ("$P1R", "1024"),
            ("$P1N", "FSC-A"),
            ("$P1S", "Forward scatter"),
            ("$P1E", "0,0"),
            ("$P1G", "1.5"),
        ]);
        let p = meta.parameter(1, Version::V3_1).unwrap();
        assert_eq!(p.bit_width, BitWidth::Fixed(16));
        assert_eq!(p.range, 1024);
        assert_eq!(p.short_name, "FSC-A");
        assert_eq!(p.long_name.as_deref(), Some("Forward scatter"));
        assert!(p.amplification.unwrap().is_linear());
        assert_eq!(p.gain, Some(1.5));
    }

    #[test]
    fn missing_channel_name_defaults_only_in_fcs_2_0() {
        let meta = metadata(&[("$P1B", "32"), ("$P1R", "1024")]);
        assert_eq!(meta.parameter(1, Version::V2_0).unwrap().short_name, "P1");
        assert!(matches!(
            meta.parameter(1, Version::V3_1),
            Err(FcsError::MissingRequiredKeyword(name)) if name == "$P1N"
        ));
    }

    #[test]
    fn warns_on_out_of_range_parameter_keywords() {
        let meta = metadata(&[("$P1B", "32"), ("$P3N", "ghost")]);
        let warnings = meta.parameter_index_warnings(2);
        assert_eq!(
            warnings,
            vec![ParseWarning::ParameterIndexOutOfRange {
                key: "$p3n".into(),
                parameter_count: 2
            }]
        );
    }

    #[test]
    fn keyword_map_exports_as_json() {
        let meta = metadata(&[("$cyt", "FACSCalibur")]);
        let json = meta.keywords_as_json().unwrap();
        assert!(json.contains("FACSCalibur"));
    }
}

//! TEXT segment tokenization
//!
//! The same keyword/value grammar is used by the primary TEXT segment, the
//! supplemental TEXT segment, and the ANALYSIS segment: single-byte
//! delimiters between alternating key and value tokens, with a doubled
//! delimiter inside a token acting as an escaped literal.

use crate::error::{FcsError, ParseWarning, Result};
use crate::metadata::KeywordMap;

/// Splits a segment body into tokens, one per key or value.
///
/// Uses memchr for fast delimiter finding. When `empty_values` is false
/// (the default), a doubled delimiter is an escaped literal delimiter byte;
/// when true, every delimiter is a token boundary and consecutive
/// delimiters produce empty tokens (the flowCore-style reading for files
/// that write empty values). The two readings of `k||v` are mutually
/// exclusive, so the choice is the caller's.
///
/// A missing delimiter after the final token is tolerated.
fn tokenize(bytes: &[u8], delimiter: u8, empty_values: bool) -> Vec<Vec<u8>> {
    let mut tokens = Vec::new();
    let mut current: Vec<u8> = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        match memchr::memchr(delimiter, &bytes[pos..]) {
            Some(rel) => {
                let at = pos + rel;
                current.extend_from_slice(&bytes[pos..at]);
                if !empty_values && bytes.get(at + 1) == Some(&delimiter) {
                    // Escaped literal delimiter.
                    current.push(delimiter);
                    pos = at + 2;
                } else {
                    tokens.push(std::mem::take(&mut current));
                    pos = at + 1;
                }
            }
            None => {
                current.extend_from_slice(&bytes[pos..]);
                pos = bytes.len();
            }
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Normalizes a keyword: lowercased, leading `$` preserved.
///
/// FCS keywords are case-insensitive while values are case-preserving, so
/// the map is keyed by the folded form.
pub(crate) fn normalize_key(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_lowercase()
}

/// Tokenizes a segment body into `map`, recording a warning for every
/// duplicate key (last write wins).
///
/// # Errors
/// Will return `Err` if the tokens do not pair up into keys and values
pub(crate) fn parse_pairs_into(
    bytes: &[u8],
    delimiter: u8,
    empty_values: bool,
    map: &mut KeywordMap,
    warnings: &mut Vec<ParseWarning>,
) -> Result<()> {
    let tokens = tokenize(bytes, delimiter, empty_values);
    if tokens.len() % 2 != 0 {
        return Err(FcsError::MalformedText(format!(
            "{} token(s) do not pair up into keywords and values",
            tokens.len()
        )));
    }

    for pair in tokens.chunks_exact(2) {
        let key = normalize_key(&pair[0]);
        let value = String::from_utf8_lossy(&pair[1]).into_owned();
        if map.insert(key.clone(), value).is_some() {
            warnings.push(ParseWarning::DuplicateKeyword { key });
        }
    }
    Ok(())
}

/// Parses a primary TEXT segment: the first byte names the delimiter, the
/// remainder is keyword/value pairs.
///
/// # Errors
/// Will return `Err` if the segment is empty or the tokens do not pair up
pub(crate) fn parse_text_segment(
    bytes: &[u8],
    empty_values: bool,
) -> Result<(u8, KeywordMap, Vec<ParseWarning>)> {
    let Some((&delimiter, body)) = bytes.split_first() else {
        return Err(FcsError::MalformedText("empty TEXT segment".into()));
    };
    if delimiter == 0 {
        return Err(FcsError::MalformedText("NUL delimiter byte".into()));
    }

    let mut map = KeywordMap::default();
    let mut warnings = Vec::new();
    parse_pairs_into(body, delimiter, empty_values, &mut map, &mut warnings)?;
    Ok((delimiter, map, warnings))
}

/// Parses a continuation segment (supplemental TEXT or ANALYSIS) that uses
/// an already-known delimiter. A restated leading delimiter is tolerated.
///
/// # Errors
/// Will return `Err` if the tokens do not pair up
pub(crate) fn parse_continuation_segment(
    bytes: &[u8],
    delimiter: u8,
    empty_values: bool,
    warnings: &mut Vec<ParseWarning>,
) -> Result<KeywordMap> {
    let body = match bytes.first() {
        Some(&b) if b == delimiter => &bytes[1..],
        _ => bytes,
    };
    let mut map = KeywordMap::default();
    parse_pairs_into(body, delimiter, empty_values, &mut map, warnings)?;
    Ok(map)
}

/// Appends `value` to `out`, doubling every embedded delimiter byte.
pub(crate) fn escape_into(out: &mut Vec<u8>, value: &[u8], delimiter: u8) {
    for &b in value {
        out.push(b);
        if b == delimiter {
            out.push(delimiter);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(bytes: &[u8]) -> (KeywordMap, Vec<ParseWarning>) {
        let (delim, map, warnings) = parse_text_segment(bytes, false).unwrap();
        assert_eq!(delim, b'|');
        (map, warnings)
    }

    #[test]
    fn splits_simple_pairs() {
        let (map, warnings) = parse(b"|$PAR|2|$TOT|100|");
        assert_eq!(map.get("$par").map(String::as_str), Some("2"));
        assert_eq!(map.get("$tot").map(String::as_str), Some("100"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn doubled_delimiter_is_an_escape() {
        let (map, _) = parse(b"|$FIL|my||file.fcs|");
        assert_eq!(map.get("$fil").map(String::as_str), Some("my|file.fcs"));
    }

    #[test]
    fn escape_applies_to_keys_too() {
        let (map, _) = parse(b"|odd||key|value|");
        assert_eq!(map.get("odd|key").map(String::as_str), Some("value"));
    }

    #[test]
    fn keys_fold_case_values_do_not() {
        let (map, _) = parse(b"|$CYT|FACSCalibur|");
        assert_eq!(map.get("$cyt").map(String::as_str), Some("FACSCalibur"));
        assert!(!map.contains_key("$CYT"));
    }

    #[test]
    fn missing_trailing_delimiter_is_tolerated() {
        let (map, _) = parse(b"|$PAR|2");
        assert_eq!(map.get("$par").map(String::as_str), Some("2"));
    }

    #[test]
    fn duplicate_keys_warn_and_last_wins() {
        let (map, warnings) = parse(b"|$SYS|a|$sys|b|");
        assert_eq!(map.get("$sys").map(String::as_str), Some("b"));
        assert_eq!(
            warnings,
            vec![ParseWarning::DuplicateKeyword {
                key: "$sys".into()
            }]
        );
    }

    #[test]
    fn odd_token_count_is_malformed() {
        assert!(matches!(
            parse_text_segment(b"|$PAR|2|$TOT|", false),
            Err(FcsError::MalformedText(_))
        ));
    }

    #[test]
    fn empty_segment_is_malformed() {
        assert!(matches!(
            parse_text_segment(b"", false),
            Err(FcsError::MalformedText(_))
        ));
    }

    #[test]
    fn empty_value_mode_disables_escapes() {
        let (_, map, _) = parse_text_segment(b"|$SYS||$PAR|2|", true).unwrap();
        assert_eq!(map.get("$sys").map(String::as_str), Some(""));
        assert_eq!(map.get("$par").map(String::as_str), Some("2"));
    }

    #[test]
    fn single_delimiter_before_key_reads_as_empty_value() {
        // `||` after a complete value is unambiguous only in empty-value
        // mode; a lone empty token between single delimiters parses in
        // both modes.
        let (_, map, _) = parse_text_segment(b"|k|v|k2||k3|v3|", true).unwrap();
        assert_eq!(map.get("k2").map(String::as_str), Some(""));
        assert_eq!(map.get("k3").map(String::as_str), Some("v3"));
    }

    #[test]
    fn continuation_segment_tolerates_leading_delimiter() {
        let mut warnings = Vec::new();
        let map = parse_continuation_segment(b"|extra|1|", b'|', false, &mut warnings).unwrap();
        assert_eq!(map.get("extra").map(String::as_str), Some("1"));
        let map = parse_continuation_segment(b"extra|1|", b'|', false, &mut warnings).unwrap();
        assert_eq!(map.get("extra").map(String::as_str), Some("1"));
    }

    #[test]
    fn escape_round_trips_through_tokenizer() {
        let mut out = vec![b'|'];
        escape_into(&mut out, b"a|b", b'|');
        out.push(b'|');
        escape_into(&mut out, b"v|w|", b'|');
        out.push(b'|');
        let (map, _) = parse(&out);
        assert_eq!(map.get("a|b").map(String::as_str), Some("v|w|"));
    }
}

use crate::data::{self, DataLayout, EventBuffer};
use crate::error::{FcsError, ParseWarning, Result};
use crate::header::Header;
use crate::metadata::{KeywordMap, Metadata};
use crate::parameter::Parameter;
use crate::source::FcsSource;
use crate::text;
use crate::version::Version;
use serde::Serialize;
use std::io;
use std::ops::RangeInclusive;
use std::path::Path;
use tracing::{debug, warn};

/// Knobs for the under-specified corners of the format
///
/// Both default to off, which is the strict standards-conforming reading.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Accept `$PnB` widths that are not a multiple of 8 by decoding DATA
    /// as a tightly packed big-endian bit stream. Off by default because
    /// writers disagree on the packing; see `UnsupportedBitWidth`.
    pub bit_packed_integers: bool,

    /// Read doubled delimiters in TEXT as empty values instead of escaped
    /// literal delimiters (the flowCore-style reading). The two
    /// interpretations of `key||next` are mutually exclusive, so files
    /// that write empty values need this flag.
    pub empty_text_values: bool,
}

/// One parsed FCS data set: keywords, channel descriptions, and the flat
/// event table
///
/// Immutable once returned by the reader; the byte source is fully
/// consumed during the parse and not retained, so a `DataSet` can outlive
/// it and be shared across threads freely.
#[derive(Debug, Clone, Serialize)]
pub struct DataSet {
    pub version: Version,
    /// TEXT keywords (primary plus supplemental) and the delimiter
    pub metadata: Metadata,
    /// Channel records in `$Pn*` index order; length equals `$PAR`
    pub parameters: Vec<Parameter>,
    /// Flat row-major event values of length `$PAR x $TOT`
    pub events: EventBuffer,
    /// Keywords from the ANALYSIS segment; empty when absent
    pub analysis: KeywordMap,
    /// Absolute byte offset of the next data set's HEADER, 0 when this is
    /// the last data set
    pub next_data_offset: usize,
    /// Non-fatal findings recorded during the parse
    pub warnings: Vec<ParseWarning>,
}

impl DataSet {
    /// Parses the first data set of `source` with default options
    /// # Errors
    /// Will return `Err` if any segment is malformed; see [`FcsError`]
    pub fn read(source: &FcsSource) -> Result<Self> {
        Self::read_with(source, &ReadOptions::default())
    }

    /// Parses the first data set of `source`
    /// # Errors
    /// Will return `Err` if any segment is malformed; see [`FcsError`]
    pub fn read_with(source: &FcsSource, options: &ReadOptions) -> Result<Self> {
        Self::read_at(source, 0, options)
    }

    /// Lazily iterates all data sets in `source`, following `$NEXTDATA`
    /// until it reads 0
    #[must_use]
    pub fn read_multiple(source: &FcsSource) -> DataSetIter<'_> {
        Self::read_multiple_with(source, ReadOptions::default())
    }

    /// Lazily iterates all data sets in `source` with explicit options
    #[must_use]
    pub fn read_multiple_with(source: &FcsSource, options: ReadOptions) -> DataSetIter<'_> {
        DataSetIter {
            source,
            options,
            next_offset: Some(0),
        }
    }

    /// Memory-maps the file at `path` and parses its first data set
    /// # Errors
    /// Will return `Err` if the extension is not `.fcs`, the file cannot
    /// be opened, or the parse fails
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        validate_fcs_extension(path)?;
        let source = FcsSource::open(path)?;
        Self::read(&source)
    }

    /// Parses the data set whose HEADER starts at the absolute byte
    /// `origin`. Segment offsets inside the data set are relative to
    /// `origin`, which is how chained data sets are laid out.
    ///
    /// # Errors
    /// Will return `Err` if any segment is malformed; see [`FcsError`]
    pub fn read_at(source: &FcsSource, origin: usize, options: &ReadOptions) -> Result<Self> {
        let set = source.bytes().get(origin..).ok_or_else(|| {
            FcsError::TruncatedData(format!(
                "data set offset {origin} is beyond the {}-byte source",
                source.bytes().len()
            ))
        })?;

        let header = Header::parse(set)?;
        let version = header.version;
        debug!(%version, origin, "parsing FCS data set");

        // Primary TEXT.
        let text_begin = *header.text_offset.start();
        let text_end = *header.text_offset.end();
        if text_begin == 0 || text_end < text_begin {
            return Err(FcsError::MalformedHeader(format!(
                "HEADER does not locate a TEXT segment ({text_begin}..={text_end})"
            )));
        }
        let text_bytes = slice_segment(set, text_begin, text_end, "TEXT")?;
        let (mut metadata, mut warnings) = Metadata::parse(text_bytes, options.empty_text_values)?;

        // Supplemental TEXT, merged behind the primary keywords.
        if let Some((begin, end)) = metadata.segment_override("$beginstext", "$endstext")? {
            if begin != 0 && end >= begin {
                let stext = slice_segment(set, begin, end, "supplemental TEXT")?;
                let supplement = text::parse_continuation_segment(
                    stext,
                    metadata.delimiter,
                    options.empty_text_values,
                    &mut warnings,
                )?;
                debug!(keywords = supplement.len(), "merged supplemental TEXT");
                for (key, value) in supplement {
                    if metadata.keywords.contains_key(&key) {
                        warnings.push(ParseWarning::DuplicateKeyword { key });
                    } else {
                        metadata.keywords.insert(key, value);
                    }
                }
            }
        }

        metadata.validate_required_keywords(version)?;
        metadata.validate_mode()?;

        let parameter_count = metadata.parameter_count()?;
        if parameter_count == 0 {
            return Err(FcsError::MalformedText("$PAR must be positive".into()));
        }
        let parameters = metadata.parameters(parameter_count, version)?;
        warnings.extend(metadata.parameter_index_warnings(parameter_count));

        let data_type = metadata.data_type()?;
        let byte_order = metadata.byte_order()?;

        // DATA span: HEADER when present, TEXT overrides on disagreement
        // or when the HEADER is zero-sentinelled.
        let data_range = resolve_segment_range(
            &header.data_offset,
            metadata.segment_override("$begindata", "$enddata")?,
            "DATA",
            &mut warnings,
        );
        let data_span: &[u8] = match data_range {
            Some((begin, end)) if end >= begin => slice_segment(set, begin, end, "DATA")?,
            _ => &[],
        };

        // $TOT, or for FCS 2.0 the event count implied by the DATA span.
        let probe = DataLayout {
            version,
            data_type,
            byte_order: byte_order.clone(),
            parameters: &parameters,
            event_count: 0,
        };
        let event_count = match metadata.event_count()? {
            Some(tot) => tot,
            None if version.requires_event_count() => {
                return Err(FcsError::MissingRequiredKeyword("$TOT".into()));
            }
            None => {
                let row = probe.row_bytes()?.filter(|&r| r > 0).ok_or_else(|| {
                    FcsError::MissingRequiredKeyword("$TOT".into())
                })?;
                let derived = data_span.len() / row;
                warnings.push(ParseWarning::EventCountDerived { derived });
                derived
            }
        };

        let layout = DataLayout {
            version,
            data_type,
            byte_order,
            parameters: &parameters,
            event_count,
        };
        if let Some(expected) = layout.expected_bytes(options)? {
            if data_span.len() < expected {
                return Err(FcsError::InconsistentOffsets(format!(
                    "DATA span holds {} byte(s) but {event_count} event(s) x \
                     {parameter_count} parameter(s) need {expected}",
                    data_span.len()
                )));
            }
            if data_span.len() > expected {
                warnings.push(ParseWarning::TrailingDataBytes {
                    count: data_span.len() - expected,
                });
            }
        }

        let events = data::decode_events(data_span, &layout, options)?;
        debug!(
            parameter_count,
            event_count,
            values = events.len(),
            "decoded DATA segment"
        );

        // ANALYSIS, with the same grammar as TEXT.
        let analysis_range = resolve_segment_range(
            &header.analysis_offset,
            metadata.segment_override("$beginanalysis", "$endanalysis")?,
            "ANALYSIS",
            &mut warnings,
        );
        let analysis = match analysis_range {
            Some((begin, end)) if begin != 0 && end >= begin => {
                let bytes = slice_segment(set, begin, end, "ANALYSIS")?;
                text::parse_continuation_segment(
                    bytes,
                    metadata.delimiter,
                    options.empty_text_values,
                    &mut warnings,
                )?
            }
            _ => KeywordMap::default(),
        };

        let next_raw = metadata.next_data()?;
        let next_data_offset = if next_raw == 0 { 0 } else { origin + next_raw };

        for warning in &warnings {
            warn!(%warning, "FCS parse warning");
        }

        Ok(Self {
            version,
            metadata,
            parameters,
            events,
            analysis,
            next_data_offset,
            warnings,
        })
    }

    /// The number of channels (`$PAR`)
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// The number of events (`$TOT`, or derived for 2.0 files without it)
    #[must_use]
    pub fn event_count(&self) -> usize {
        if self.parameters.is_empty() {
            0
        } else {
            self.events.len() / self.parameters.len()
        }
    }

    /// Looks up a TEXT keyword by any casing
    #[must_use]
    pub fn keyword(&self, key: &str) -> Option<&str> {
        self.metadata.get(key)
    }
}

/// Lazy iterator over the data sets of a source, produced by
/// [`DataSet::read_multiple`]. The chain is finite (it stops at
/// `$NEXTDATA=0` or on the first error) and not restartable.
#[derive(Debug)]
pub struct DataSetIter<'a> {
    source: &'a FcsSource,
    options: ReadOptions,
    next_offset: Option<usize>,
}

impl Iterator for DataSetIter<'_> {
    type Item = Result<DataSet>;

    fn next(&mut self) -> Option<Self::Item> {
        let origin = self.next_offset.take()?;
        match DataSet::read_at(self.source, origin, &self.options) {
            Ok(data_set) => {
                let next = data_set.next_data_offset;
                if next > origin {
                    self.next_offset = Some(next);
                } else if next != 0 {
                    // A backwards $NEXTDATA would loop forever.
                    warn!(origin, next, "ignoring non-advancing $NEXTDATA");
                }
                Some(Ok(data_set))
            }
            Err(error) => Some(Err(error)),
        }
    }
}

fn validate_fcs_extension(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    if extension.eq_ignore_ascii_case("fcs") {
        Ok(())
    } else {
        Err(FcsError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("expected a .fcs file, got `{}`", path.display()),
        )))
    }
}

fn slice_segment<'a>(set: &'a [u8], begin: usize, end: usize, name: &str) -> Result<&'a [u8]> {
    if end >= set.len() {
        return Err(FcsError::TruncatedData(format!(
            "{name} segment ends at byte {end} but the data set holds {}",
            set.len()
        )));
    }
    Ok(&set[begin..=end])
}

/// Chooses between HEADER and TEXT locations for the DATA or ANALYSIS
/// segment. TEXT wins a disagreement; a zero HEADER offset defers to TEXT
/// entirely (the "too large for HEADER" sentinel).
fn resolve_segment_range(
    header_range: &RangeInclusive<usize>,
    text_range: Option<(usize, usize)>,
    segment: &'static str,
    warnings: &mut Vec<ParseWarning>,
) -> Option<(usize, usize)> {
    let header = if *header_range.start() == 0 {
        None
    } else {
        Some((*header_range.start(), *header_range.end()))
    };
    let text = text_range.filter(|&(begin, _)| begin != 0);

    match (header, text) {
        (Some(h), Some(t)) if t != h => {
            warnings.push(ParseWarning::OffsetMismatch {
                segment,
                header: h,
                text: t,
            });
            Some(t)
        }
        (Some(h), _) => Some(h),
        (None, text) => text,
    }
}

use serde::Serialize;
use std::fmt;
use std::io;
use thiserror::Error;

/// Errors that can occur while reading or writing FCS files.
///
/// All errors are fatal and surface to the caller; the codec never recovers
/// internally. Recoverable oddities (duplicate keywords, HEADER/TEXT offset
/// disagreements) are reported as [`ParseWarning`]s on the returned data set
/// instead.
#[derive(Debug, Error)]
pub enum FcsError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Bad magic bytes, unrecognized version string, or a non-numeric
    /// offset field in the 58-byte HEADER.
    #[error("malformed HEADER: {0}")]
    MalformedHeader(String),

    /// Odd token count, unterminated token, or an unparsable value in the
    /// TEXT (or ANALYSIS) segment.
    #[error("malformed TEXT segment: {0}")]
    MalformedText(String),

    #[error("missing required keyword {0}")]
    MissingRequiredKeyword(String),

    /// `$DATATYPE` outside `{I, F, D, A}`.
    #[error("unsupported $DATATYPE value `{0}`")]
    UnsupportedDataType(String),

    /// `$MODE` other than list mode. The deprecated correlated (`C`) and
    /// uncorrelated (`U`) histogram modes are rejected.
    #[error("unsupported $MODE value `{0}`, only list mode `L` is supported")]
    UnsupportedMode(String),

    /// `$BYTEORD` that is not a permutation of `1..n`, or a mixed
    /// permutation used where only little-/big-endian data is defined.
    #[error("unsupported $BYTEORD value `{0}`")]
    UnsupportedByteOrder(String),

    /// `$PnB` wider than 64 bits, not a multiple of 8 without the
    /// bit-packing opt-in, or otherwise incompatible with the data type.
    #[error("unsupported bit width: {0}")]
    UnsupportedBitWidth(String),

    /// Declared DATA span does not accommodate `$PAR x $TOT` values.
    #[error("inconsistent segment offsets: {0}")]
    InconsistentOffsets(String),

    /// The source ends before a declared segment does.
    #[error("truncated source: {0}")]
    TruncatedData(String),

    /// Writer input whose flat event length is not divisible by the
    /// channel count.
    #[error("event buffer of length {events} does not divide into {channels} channel(s)")]
    InvalidEventShape { events: usize, channels: usize },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FcsError>;

/// Non-fatal findings recorded while parsing a data set.
///
/// Warnings never abort the parse; they are attached to the returned
/// [`DataSet`](crate::DataSet) and mirrored through `tracing::warn!`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ParseWarning {
    /// The same (normalized) keyword appeared more than once; the last
    /// occurrence wins.
    DuplicateKeyword { key: String },

    /// HEADER and TEXT both declare offsets for a segment and disagree;
    /// the TEXT values were used.
    OffsetMismatch {
        segment: &'static str,
        header: (usize, usize),
        text: (usize, usize),
    },

    /// A `$Pn*` keyword references a parameter index greater than `$PAR`.
    ParameterIndexOutOfRange { key: String, parameter_count: usize },

    /// `$TOT` was absent (legal in FCS 2.0) and the event count was derived
    /// from the DATA span size.
    EventCountDerived { derived: usize },

    /// The declared DATA span holds more bytes than the events need; the
    /// excess (CRC, padding) was ignored.
    TrailingDataBytes { count: usize },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKeyword { key } => {
                write!(f, "duplicate keyword `{key}`, last occurrence wins")
            }
            Self::OffsetMismatch {
                segment,
                header,
                text,
            } => write!(
                f,
                "{segment} offsets disagree: HEADER says {}..={}, TEXT says {}..={}; using TEXT",
                header.0, header.1, text.0, text.1
            ),
            Self::ParameterIndexOutOfRange {
                key,
                parameter_count,
            } => write!(
                f,
                "keyword `{key}` references a parameter beyond $PAR={parameter_count}"
            ),
            Self::EventCountDerived { derived } => {
                write!(f, "$TOT absent, derived {derived} events from the DATA span")
            }
            Self::TrailingDataBytes { count } => {
                write!(f, "ignored {count} trailing byte(s) in the DATA span")
            }
        }
    }
}

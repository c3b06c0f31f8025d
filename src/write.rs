//! FCS writing
//!
//! The writer emits one or more FCS 3.1 data sets from flat row-major
//! event values and channel descriptions. Layout is two-pass: offset
//! keywords are reserved as fixed 20-character fields, the segments are
//! laid out, and the reserved fields plus the HEADER are back-patched.
//! The fixed width breaks the cycle between the TEXT length and the digit
//! count of the offsets it must carry.

use crate::byteorder::ByteOrder;
use crate::datatype::FcsDataType;
use crate::error::{FcsError, Result};
use crate::header::{HEADER_LEN, HEADER_OFFSET_CEILING};
use crate::parameter::Amplification;
use crate::text::escape_into;
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use derive_builder::Builder;
use std::io::Write;
use std::ops::Range;
use tracing::debug;

/// Width reserved in TEXT for every offset value that gets back-patched.
const OFFSET_FIELD_WIDTH: usize = 20;

/// Description of one output channel, mapped to the `$PnX` keyword family
///
/// Only the short name is mandatory; the defaults describe the common
/// 32-bit float channel with a 262144 range.
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(setter(into))]
pub struct ChannelSpec {
    /// `$PnN`
    pub short_name: String,
    /// `$PnB`; only consulted for integer events, floats are fixed at
    /// 32/64 bits
    #[builder(default = "32")]
    pub bit_width: u32,
    /// `$PnR`
    #[builder(default = "262144")]
    pub range: u64,
    /// `$PnS`, omitted when `None`
    #[builder(default)]
    pub long_name: Option<String>,
    /// `$PnE`, written as `0,0` (linear) when `None`
    #[builder(default)]
    pub amplification: Option<Amplification>,
    /// `$PnG`, omitted when `None`
    #[builder(default)]
    pub gain: Option<f32>,
}

impl ChannelSpec {
    /// A channel with the default float32 layout
    #[must_use]
    pub fn new(short_name: impl Into<String>) -> Self {
        Self {
            short_name: short_name.into(),
            bit_width: 32,
            range: 262_144,
            long_name: None,
            amplification: None,
            gain: None,
        }
    }
}

/// Flat row-major event values to write; the variant selects `$DATATYPE`
#[derive(Debug, Clone, Copy)]
pub enum EventValues<'a> {
    /// `$DATATYPE=F`
    F32(&'a [f32]),
    /// `$DATATYPE=D`
    F64(&'a [f64]),
    /// `$DATATYPE=I`, honoring each channel's `bit_width`
    Uint(&'a [u64]),
}

impl EventValues<'_> {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::F32(values) => values.len(),
            Self::F64(values) => values.len(),
            Self::Uint(values) => values.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn data_type(&self) -> FcsDataType {
        match self {
            Self::F32(_) => FcsDataType::F,
            Self::F64(_) => FcsDataType::D,
            Self::Uint(_) => FcsDataType::I,
        }
    }
}

/// Options for one written data set
///
/// Values in `extra_text`/`analysis` may contain the delimiter byte (it is
/// escaped by doubling) but must not be empty and must not begin with it:
/// those two shapes cannot be distinguished from token boundaries when
/// read back with the default escape handling.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// TEXT delimiter byte; must not be NUL, a space, or a decimal digit
    /// (the back-patched offset fields consist of those)
    pub delimiter: u8,
    /// Scalar byte order for the DATA segment. Output is FCS 3.1, which
    /// restricts `$BYTEORD` to little- or big-endian; a mixed permutation
    /// is refused.
    pub byte_order: ByteOrder,
    /// Additional TEXT keywords, written in order. Keys colliding with the
    /// structural keywords the writer owns are skipped.
    pub extra_text: Vec<(String, String)>,
    /// ANALYSIS keywords; the segment is omitted when empty
    pub analysis: Vec<(String, String)>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            delimiter: b'|',
            byte_order: ByteOrder::LittleEndian,
            extra_text: Vec::new(),
            analysis: Vec::new(),
        }
    }
}

/// One data set of a multi-data-set file, for [`write_data_sets`]
#[derive(Debug, Clone)]
pub struct DataSetSpec<'a> {
    pub events: EventValues<'a>,
    pub channels: &'a [ChannelSpec],
    pub options: WriteOptions,
}

/// Writes a single data set (`$NEXTDATA=0`) to `sink`
/// # Errors
/// Will return `Err` if the event shape or channel widths are invalid, or
/// on I/O failure
pub fn write_data_set<W: Write>(
    sink: &mut W,
    events: EventValues<'_>,
    channels: &[ChannelSpec],
    options: &WriteOptions,
) -> Result<()> {
    let (buffer, _) = build_data_set(events, channels, options)?;
    sink.write_all(&buffer)?;
    Ok(())
}

/// Writes several data sets back to back, chaining them through
/// `$NEXTDATA` (each set's value is the offset of the next HEADER relative
/// to its own; the final set carries 0)
/// # Errors
/// Will return `Err` if any set is invalid or on I/O failure
pub fn write_data_sets<W: Write>(sink: &mut W, sets: &[DataSetSpec<'_>]) -> Result<()> {
    let mut buffers: Vec<(Vec<u8>, Range<usize>)> = sets
        .iter()
        .map(|set| build_data_set(set.events, set.channels, &set.options))
        .collect::<Result<_>>()?;

    let last = buffers.len().saturating_sub(1);
    for (buffer, next_data_span) in &mut buffers[..last] {
        let next = buffer.len();
        patch_offset(buffer, next_data_span, next);
    }
    for (buffer, _) in &buffers {
        sink.write_all(buffer)?;
    }
    Ok(())
}

/// Lays out one complete data set in memory and returns it together with
/// the byte span of its `$NEXTDATA` value (for chain patching).
fn build_data_set(
    events: EventValues<'_>,
    channels: &[ChannelSpec],
    options: &WriteOptions,
) -> Result<(Vec<u8>, Range<usize>)> {
    if channels.is_empty() || events.len() % channels.len() != 0 {
        return Err(FcsError::InvalidEventShape {
            events: events.len(),
            channels: channels.len(),
        });
    }
    let event_count = events.len() / channels.len();

    let delimiter = options.delimiter;
    if delimiter == 0 || delimiter == b' ' || delimiter.is_ascii_digit() {
        return Err(FcsError::MalformedText(format!(
            "byte {delimiter:#04x} cannot delimit TEXT: offset fields are digits and spaces"
        )));
    }
    if !options.byte_order.is_pure() {
        return Err(FcsError::UnsupportedByteOrder(format!(
            "FCS 3.1 output cannot use $BYTEORD {}",
            options.byte_order
        )));
    }

    let data = encode_data(events, channels, &options.byte_order)?;
    let (mut text, spans) = build_text(events, channels, options, event_count)?;
    let analysis = build_analysis(options);

    // Everything is contiguous: HEADER, TEXT, DATA, ANALYSIS.
    let text_start = HEADER_LEN;
    let text_end = text_start + text.len() - 1;
    let (data_start, data_end) = if data.is_empty() {
        (0, 0)
    } else {
        (text_end + 1, text_end + data.len())
    };
    let (analysis_start, analysis_end) = match &analysis {
        Some(bytes) => {
            let start = text_end + 1 + data.len();
            (start, start + bytes.len() - 1)
        }
        None => (0, 0),
    };

    patch_offset(&mut text, &spans.begin_data, data_start);
    patch_offset(&mut text, &spans.end_data, data_end);
    patch_offset(&mut text, &spans.begin_analysis, analysis_start);
    patch_offset(&mut text, &spans.end_analysis, analysis_end);
    patch_offset(&mut text, &spans.next_data, 0);

    let header = build_header(
        (text_start, text_end),
        (data_start, data_end),
        (analysis_start, analysis_end),
    )?;

    let mut buffer = header;
    let next_data_span =
        HEADER_LEN + spans.next_data.start..HEADER_LEN + spans.next_data.end;
    buffer.extend_from_slice(&text);
    buffer.extend_from_slice(&data);
    if let Some(bytes) = &analysis {
        buffer.extend_from_slice(bytes);
    }

    debug!(
        channels = channels.len(),
        event_count,
        bytes = buffer.len(),
        "laid out FCS data set"
    );
    Ok((buffer, next_data_span))
}

/// Byte spans (within the TEXT buffer) of the offset values that get
/// back-patched after layout.
struct OffsetSpans {
    begin_data: Range<usize>,
    end_data: Range<usize>,
    begin_analysis: Range<usize>,
    end_analysis: Range<usize>,
    next_data: Range<usize>,
}

fn build_text(
    events: EventValues<'_>,
    channels: &[ChannelSpec],
    options: &WriteOptions,
    event_count: usize,
) -> Result<(Vec<u8>, OffsetSpans)> {
    let delimiter = options.delimiter;
    let data_type = events.data_type();

    let mut text = vec![delimiter];
    let mut emitted: Vec<String> = Vec::new();

    let push_pair = |text: &mut Vec<u8>, emitted: &mut Vec<String>, key: &str, value: &str| {
        escape_into(text, key.as_bytes(), delimiter);
        text.push(delimiter);
        escape_into(text, value.as_bytes(), delimiter);
        text.push(delimiter);
        emitted.push(key.to_lowercase());
    };
    let push_offset_pair =
        |text: &mut Vec<u8>, emitted: &mut Vec<String>, key: &str| -> Range<usize> {
            escape_into(text, key.as_bytes(), delimiter);
            text.push(delimiter);
            let span = text.len()..text.len() + OFFSET_FIELD_WIDTH;
            text.resize(text.len() + OFFSET_FIELD_WIDTH, b' ');
            text.push(delimiter);
            emitted.push(key.to_lowercase());
            span
        };

    let begin_analysis = push_offset_pair(&mut text, &mut emitted, "$BEGINANALYSIS");
    let end_analysis = push_offset_pair(&mut text, &mut emitted, "$ENDANALYSIS");
    let begin_data = push_offset_pair(&mut text, &mut emitted, "$BEGINDATA");
    let end_data = push_offset_pair(&mut text, &mut emitted, "$ENDDATA");
    push_pair(&mut text, &mut emitted, "$BEGINSTEXT", "0");
    push_pair(&mut text, &mut emitted, "$ENDSTEXT", "0");
    push_pair(
        &mut text,
        &mut emitted,
        "$BYTEORD",
        &options.byte_order.keyword_string(4),
    );
    push_pair(&mut text, &mut emitted, "$DATATYPE", data_type.keyword_str());
    push_pair(&mut text, &mut emitted, "$MODE", "L");
    let next_data = push_offset_pair(&mut text, &mut emitted, "$NEXTDATA");
    push_pair(&mut text, &mut emitted, "$PAR", &channels.len().to_string());
    push_pair(&mut text, &mut emitted, "$TOT", &event_count.to_string());

    for (n, channel) in channels.iter().enumerate().map(|(i, c)| (i + 1, c)) {
        let bits = match data_type {
            FcsDataType::F => 32,
            FcsDataType::D => 64,
            FcsDataType::I | FcsDataType::A => channel.bit_width,
        };
        push_pair(&mut text, &mut emitted, &format!("$P{n}B"), &bits.to_string());
        let amplification = channel.amplification.unwrap_or_default();
        push_pair(
            &mut text,
            &mut emitted,
            &format!("$P{n}E"),
            &amplification.keyword_string(),
        );
        push_pair(&mut text, &mut emitted, &format!("$P{n}N"), &channel.short_name);
        push_pair(
            &mut text,
            &mut emitted,
            &format!("$P{n}R"),
            &channel.range.to_string(),
        );
        if let Some(long_name) = &channel.long_name {
            push_pair(&mut text, &mut emitted, &format!("$P{n}S"), long_name);
        }
        if let Some(gain) = channel.gain {
            push_pair(&mut text, &mut emitted, &format!("$P{n}G"), &gain.to_string());
        }
    }

    for (key, value) in &options.extra_text {
        if emitted.contains(&key.to_lowercase()) {
            debug!(key = %key, "skipping extra TEXT keyword the writer owns");
            continue;
        }
        push_pair(&mut text, &mut emitted, key, value);
    }

    Ok((
        text,
        OffsetSpans {
            begin_data,
            end_data,
            begin_analysis,
            end_analysis,
            next_data,
        },
    ))
}

fn build_analysis(options: &WriteOptions) -> Option<Vec<u8>> {
    if options.analysis.is_empty() {
        return None;
    }
    let delimiter = options.delimiter;
    let mut bytes = vec![delimiter];
    for (key, value) in &options.analysis {
        escape_into(&mut bytes, key.as_bytes(), delimiter);
        bytes.push(delimiter);
        escape_into(&mut bytes, value.as_bytes(), delimiter);
        bytes.push(delimiter);
    }
    Some(bytes)
}

fn encode_data(
    events: EventValues<'_>,
    channels: &[ChannelSpec],
    byte_order: &ByteOrder,
) -> Result<Vec<u8>> {
    match events {
        EventValues::F32(values) => {
            let mut data = Vec::with_capacity(4 * values.len());
            match byte_order {
                ByteOrder::LittleEndian => {
                    for &value in values {
                        data.write_f32::<LittleEndian>(value)?;
                    }
                }
                ByteOrder::BigEndian => {
                    for &value in values {
                        data.write_f32::<BigEndian>(value)?;
                    }
                }
                ByteOrder::Mixed(_) => {
                    return Err(FcsError::UnsupportedByteOrder(format!(
                        "floating point data cannot use $BYTEORD {byte_order}"
                    )));
                }
            }
            Ok(data)
        }
        EventValues::F64(values) => {
            let mut data = Vec::with_capacity(8 * values.len());
            match byte_order {
                ByteOrder::LittleEndian => {
                    for &value in values {
                        data.write_f64::<LittleEndian>(value)?;
                    }
                }
                ByteOrder::BigEndian => {
                    for &value in values {
                        data.write_f64::<BigEndian>(value)?;
                    }
                }
                ByteOrder::Mixed(_) => {
                    return Err(FcsError::UnsupportedByteOrder(format!(
                        "floating point data cannot use $BYTEORD {byte_order}"
                    )));
                }
            }
            Ok(data)
        }
        EventValues::Uint(values) => encode_integers(values, channels, byte_order),
    }
}

fn encode_integers(
    values: &[u64],
    channels: &[ChannelSpec],
    byte_order: &ByteOrder,
) -> Result<Vec<u8>> {
    let widths: Vec<usize> = channels
        .iter()
        .map(|channel| {
            if channel.bit_width == 0 || channel.bit_width > 64 || channel.bit_width % 8 != 0 {
                Err(FcsError::UnsupportedBitWidth(format!(
                    "cannot write {}-bit integers for channel `{}`; widths must be a \
                     multiple of 8 up to 64",
                    channel.bit_width, channel.short_name
                )))
            } else {
                Ok(channel.bit_width as usize / 8)
            }
        })
        .collect::<Result<_>>()?;
    let permutations: Vec<Vec<usize>> = widths
        .iter()
        .map(|&width| byte_order.permutation(width))
        .collect::<Result<_>>()?;

    let row: usize = widths.iter().sum();
    let mut data = vec![0u8; row * (values.len() / channels.len())];
    let mut offset = 0;
    for (i, &value) in values.iter().enumerate() {
        let channel = i % channels.len();
        let slab = &mut data[offset..offset + widths[channel]];
        for (significance, &position) in permutations[channel].iter().enumerate() {
            slab[position] = (value >> (8 * significance)) as u8;
        }
        offset += widths[channel];
    }
    Ok(data)
}

fn patch_offset(text: &mut [u8], span: &Range<usize>, value: usize) {
    let rendered = format!("{value:>width$}", width = OFFSET_FIELD_WIDTH);
    text[span.clone()].copy_from_slice(rendered.as_bytes());
}

fn build_header(
    text: (usize, usize),
    data: (usize, usize),
    analysis: (usize, usize),
) -> Result<Vec<u8>> {
    let mut header = vec![b' '; HEADER_LEN];
    header[..6].copy_from_slice(b"FCS3.1");

    if text.1 > HEADER_OFFSET_CEILING {
        return Err(FcsError::InconsistentOffsets(format!(
            "primary TEXT segment ends at byte {}, beyond the HEADER offset ceiling",
            text.1
        )));
    }
    write_header_field(&mut header, 10, text.0);
    write_header_field(&mut header, 18, text.1);

    // Segments past the 8-digit ceiling are zero-sentinelled here; their
    // true offsets live in TEXT.
    let (data_start, data_end) = if data.1 > HEADER_OFFSET_CEILING {
        (0, 0)
    } else {
        data
    };
    write_header_field(&mut header, 26, data_start);
    write_header_field(&mut header, 34, data_end);

    let (analysis_start, analysis_end) = if analysis.1 > HEADER_OFFSET_CEILING {
        (0, 0)
    } else {
        analysis
    };
    write_header_field(&mut header, 42, analysis_start);
    write_header_field(&mut header, 50, analysis_end);

    Ok(header)
}

fn write_header_field(header: &mut [u8], at: usize, value: usize) {
    let rendered = format!("{value:>8}");
    header[at..at + 8].copy_from_slice(rendered.as_bytes());
}

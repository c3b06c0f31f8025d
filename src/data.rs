//! DATA segment decoding
//!
//! Every decoder produces one flat, contiguous, row-major buffer of
//! `$PAR x $TOT` values; reshaping into events-by-channels is the caller's
//! concern. Integer values are widened to `u64` and reduced by the
//! per-channel `$PnR` mask, floats keep their stored precision.

use crate::byteorder::ByteOrder;
use crate::dataset::ReadOptions;
use crate::datatype::FcsDataType;
use crate::error::{FcsError, Result};
use crate::parameter::{BitWidth, Parameter};
use crate::version::Version;
use byteorder::{BigEndian as BE, ByteOrder as BO, LittleEndian as LE};
use itertools::izip;
use serde::Serialize;

/// The decoded event values of one data set, row-major (event-major):
/// event `i`, channel `j` is at index `i * parameter_count + j`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EventBuffer {
    /// `$DATATYPE=I` or `A`: unsigned integers widened to 64 bits
    Uint(Vec<u64>),
    /// `$DATATYPE=F`: IEEE-754 binary32
    F32(Vec<f32>),
    /// `$DATATYPE=D`: IEEE-754 binary64
    F64(Vec<f64>),
}

impl EventBuffer {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Uint(values) => values.len(),
            Self::F32(values) => values.len(),
            Self::F64(values) => values.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The value at flat index `i`, widened to f64. Integers above 2^53
    /// lose precision through this accessor; use [`EventBuffer::as_uint`]
    /// for exact access.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<f64> {
        match self {
            Self::Uint(values) => values.get(i).map(|&v| v as f64),
            Self::F32(values) => values.get(i).map(|&v| f64::from(v)),
            Self::F64(values) => values.get(i).copied(),
        }
    }

    /// Iterates all values widened to f64
    pub fn iter_f64(&self) -> Box<dyn Iterator<Item = f64> + '_> {
        match self {
            Self::Uint(values) => Box::new(values.iter().map(|&v| v as f64)),
            Self::F32(values) => Box::new(values.iter().map(|&v| f64::from(v))),
            Self::F64(values) => Box::new(values.iter().copied()),
        }
    }

    #[must_use]
    pub fn as_uint(&self) -> Option<&[u64]> {
        match self {
            Self::Uint(values) => Some(values),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            Self::F32(values) => Some(values),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            Self::F64(values) => Some(values),
            _ => None,
        }
    }
}

/// The resolved picture of how the DATA segment is laid out, assembled
/// from the version, `$DATATYPE`, `$BYTEORD`, `$TOT`, and the parameter
/// records.
#[derive(Debug)]
pub(crate) struct DataLayout<'a> {
    pub version: Version,
    pub data_type: FcsDataType,
    pub byte_order: ByteOrder,
    pub parameters: &'a [Parameter],
    pub event_count: usize,
}

impl DataLayout<'_> {
    fn value_count(&self) -> usize {
        self.parameters.len() * self.event_count
    }

    /// FCS 3.1 restricts `$BYTEORD` to the two pure orders for numeric
    /// data; 2.0 and 3.0 permit arbitrary permutations.
    fn validate_byte_order(&self) -> Result<()> {
        if self.version == Version::V3_1 && !self.byte_order.is_pure() {
            return Err(FcsError::UnsupportedByteOrder(format!(
                "FCS 3.1 numeric data cannot use $BYTEORD {}",
                self.byte_order
            )));
        }
        Ok(())
    }

    /// Per-parameter fixed bit widths; variable width is only defined for
    /// ASCII data.
    fn fixed_bits(&self) -> Result<Vec<u32>> {
        self.parameters
            .iter()
            .map(|p| match p.bit_width {
                BitWidth::Fixed(bits) => Ok(bits),
                BitWidth::Variable => Err(FcsError::UnsupportedBitWidth(format!(
                    "$P{}B=* is only defined for $DATATYPE=A",
                    p.index
                ))),
            })
            .collect()
    }

    fn require_uniform_bits(&self, expected: u32) -> Result<()> {
        for (p, bits) in self.parameters.iter().zip(self.fixed_bits()?) {
            if bits != expected {
                return Err(FcsError::UnsupportedBitWidth(format!(
                    "$DATATYPE={} requires $PnB={expected}, but $P{}B={bits}",
                    self.data_type.keyword_str(),
                    p.index
                )));
            }
        }
        Ok(())
    }

    /// Bytes per event for byte-aligned layouts; `None` when the event
    /// size is not fixed (variable-width ASCII) or not byte-aligned.
    pub fn row_bytes(&self) -> Result<Option<usize>> {
        match self.data_type {
            FcsDataType::F => Ok(Some(4 * self.parameters.len())),
            FcsDataType::D => Ok(Some(8 * self.parameters.len())),
            FcsDataType::I => {
                let bits = self.fixed_bits()?;
                if bits.iter().all(|&b| b % 8 == 0) {
                    Ok(Some(bits.iter().map(|&b| b as usize / 8).sum()))
                } else {
                    Ok(None)
                }
            }
            FcsDataType::A => {
                if self
                    .parameters
                    .iter()
                    .any(|p| p.bit_width == BitWidth::Variable)
                {
                    Ok(None)
                } else {
                    let bits = self.fixed_bits()?;
                    // Fixed-width ASCII reserves $PnB *characters* per value.
                    Ok(Some(bits.iter().map(|&b| b as usize).sum()))
                }
            }
        }
    }

    /// The exact number of DATA bytes the events occupy, or `None` for
    /// variable-width ASCII where only decoding can tell.
    pub fn expected_bytes(&self, options: &ReadOptions) -> Result<Option<usize>> {
        if let Some(row) = self.row_bytes()? {
            return Ok(Some(row * self.event_count));
        }
        match self.data_type {
            FcsDataType::A => Ok(None),
            FcsDataType::I => {
                if !options.bit_packed_integers {
                    return Err(FcsError::UnsupportedBitWidth(
                        "bit widths that are not a multiple of 8 require the bit-packing opt-in"
                            .into(),
                    ));
                }
                let row_bits: usize = self
                    .fixed_bits()?
                    .iter()
                    .map(|&b| b as usize)
                    .sum();
                Ok(Some((row_bits * self.event_count).div_ceil(8)))
            }
            FcsDataType::F | FcsDataType::D => unreachable!("fixed-width types have row bytes"),
        }
    }
}

/// Decodes the DATA byte range into a flat event buffer.
///
/// `data` must start at the first DATA byte; trailing bytes beyond what the
/// layout needs (CRC, padding) are ignored.
pub(crate) fn decode_events(
    data: &[u8],
    layout: &DataLayout<'_>,
    options: &ReadOptions,
) -> Result<EventBuffer> {
    if layout.data_type != FcsDataType::A {
        layout.validate_byte_order()?;
    }
    match layout.data_type {
        FcsDataType::I => decode_integers(data, layout, options),
        FcsDataType::F => {
            layout.require_uniform_bits(32)?;
            decode_f32(data, layout)
        }
        FcsDataType::D => {
            layout.require_uniform_bits(64)?;
            decode_f64(data, layout)
        }
        FcsDataType::A => decode_ascii(data, layout),
    }
}

fn check_len(data: &[u8], needed: usize) -> Result<()> {
    if data.len() < needed {
        return Err(FcsError::TruncatedData(format!(
            "DATA segment holds {} byte(s), need {needed}",
            data.len()
        )));
    }
    Ok(())
}

fn decode_integers(
    data: &[u8],
    layout: &DataLayout<'_>,
    options: &ReadOptions,
) -> Result<EventBuffer> {
    let bits = layout.fixed_bits()?;
    if let Some(&too_wide) = bits.iter().find(|&&b| b > 64) {
        return Err(FcsError::UnsupportedBitWidth(format!(
            "{too_wide}-bit integers exceed the 64-bit limit"
        )));
    }

    if bits.iter().all(|&b| b % 8 == 0) {
        decode_aligned_integers(data, layout, &bits)
    } else if options.bit_packed_integers {
        decode_packed_integers(data, layout, &bits)
    } else {
        Err(FcsError::UnsupportedBitWidth(format!(
            "bit widths {:?} are not byte-aligned; enable bit-packed decoding to accept them",
            bits
        )))
    }
}

fn decode_aligned_integers(
    data: &[u8],
    layout: &DataLayout<'_>,
    bits: &[u32],
) -> Result<EventBuffer> {
    let widths: Vec<usize> = bits.iter().map(|&b| b as usize / 8).collect();
    let permutations: Vec<Vec<usize>> = widths
        .iter()
        .map(|&w| layout.byte_order.permutation(w))
        .collect::<Result<_>>()?;
    let masks: Vec<u64> = layout.parameters.iter().map(Parameter::mask).collect();

    let row: usize = widths.iter().sum();
    check_len(data, row * layout.event_count)?;

    let mut values = Vec::with_capacity(layout.value_count());
    let mut offset = 0;
    for _ in 0..layout.event_count {
        for (width, permutation, mask) in izip!(&widths, &permutations, &masks) {
            let slab = &data[offset..offset + width];
            let mut value: u64 = 0;
            for (significance, &position) in permutation.iter().enumerate() {
                value |= u64::from(slab[position]) << (8 * significance);
            }
            values.push(value & mask);
            offset += width;
        }
    }
    Ok(EventBuffer::Uint(values))
}

/// Reads big-endian-within-bytes bit fields, the packing the 3.x
/// clarifications describe for non-byte-aligned `$PnB`.
struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl BitReader<'_> {
    fn read(&mut self, bits: u32) -> Result<u64> {
        let mut value: u64 = 0;
        for _ in 0..bits {
            let byte = self
                .data
                .get(self.bit_pos / 8)
                .ok_or_else(|| {
                    FcsError::TruncatedData(format!(
                        "bit stream ends at bit {} of the DATA segment",
                        self.bit_pos
                    ))
                })?;
            let bit = (byte >> (7 - self.bit_pos % 8)) & 1;
            value = (value << 1) | u64::from(bit);
            self.bit_pos += 1;
        }
        Ok(value)
    }
}

fn decode_packed_integers(
    data: &[u8],
    layout: &DataLayout<'_>,
    bits: &[u32],
) -> Result<EventBuffer> {
    if !layout.byte_order.is_pure() {
        // How a mixed permutation interacts with a bit stream is not
        // portable across writers; refuse rather than guess.
        return Err(FcsError::UnsupportedBitWidth(format!(
            "bit-packed integers with $BYTEORD {} are not supported",
            layout.byte_order
        )));
    }

    let masks: Vec<u64> = layout.parameters.iter().map(Parameter::mask).collect();
    let mut reader = BitReader { data, bit_pos: 0 };
    let mut values = Vec::with_capacity(layout.value_count());
    for _ in 0..layout.event_count {
        for (&width, mask) in bits.iter().zip(&masks) {
            values.push(reader.read(width)? & mask);
        }
    }
    Ok(EventBuffer::Uint(values))
}

fn decode_f32(data: &[u8], layout: &DataLayout<'_>) -> Result<EventBuffer> {
    let n = layout.value_count();
    check_len(data, 4 * n)?;
    let data = &data[..4 * n];

    let values = match &layout.byte_order {
        ByteOrder::LittleEndian => {
            if cfg!(target_endian = "little") {
                // Zero-copy cast when the stored order matches the host;
                // falls through to the chunked path on misalignment.
                if let Ok(slice) = bytemuck::try_cast_slice::<u8, f32>(data) {
                    return Ok(EventBuffer::F32(slice.to_vec()));
                }
            }
            data.chunks_exact(4).map(<LE as BO>::read_f32).collect()
        }
        ByteOrder::BigEndian => data.chunks_exact(4).map(<BE as BO>::read_f32).collect(),
        // 2.0/3.0 files may reorder the bytes of each scalar.
        ByteOrder::Mixed(_) => {
            let permutation = layout.byte_order.permutation(4)?;
            data.chunks_exact(4)
                .map(|slab| {
                    let mut bits: u32 = 0;
                    for (significance, &position) in permutation.iter().enumerate() {
                        bits |= u32::from(slab[position]) << (8 * significance);
                    }
                    f32::from_bits(bits)
                })
                .collect()
        }
    };
    Ok(EventBuffer::F32(values))
}

fn decode_f64(data: &[u8], layout: &DataLayout<'_>) -> Result<EventBuffer> {
    let n = layout.value_count();
    check_len(data, 8 * n)?;
    let data = &data[..8 * n];

    let values = match &layout.byte_order {
        ByteOrder::LittleEndian => data.chunks_exact(8).map(<LE as BO>::read_f64).collect(),
        ByteOrder::BigEndian => data.chunks_exact(8).map(<BE as BO>::read_f64).collect(),
        // 2.0/3.0 files may reorder the bytes of each scalar.
        ByteOrder::Mixed(_) => {
            let permutation = layout.byte_order.permutation(8)?;
            data.chunks_exact(8)
                .map(|slab| {
                    let mut bits: u64 = 0;
                    for (significance, &position) in permutation.iter().enumerate() {
                        bits |= u64::from(slab[position]) << (8 * significance);
                    }
                    f64::from_bits(bits)
                })
                .collect()
        }
    };
    Ok(EventBuffer::F64(values))
}

fn decode_ascii(data: &[u8], layout: &DataLayout<'_>) -> Result<EventBuffer> {
    let n = layout.value_count();
    let variable = layout
        .parameters
        .iter()
        .filter(|p| p.bit_width == BitWidth::Variable)
        .count();
    if variable != 0 && variable != layout.parameters.len() {
        return Err(FcsError::UnsupportedBitWidth(
            "mixing fixed and variable ASCII widths is not supported".into(),
        ));
    }

    if variable != 0 {
        decode_ascii_variable(data, n)
    } else {
        decode_ascii_fixed(data, layout, n)
    }
}

fn decode_ascii_variable(data: &[u8], n: usize) -> Result<EventBuffer> {
    let Ok(body) = std::str::from_utf8(data) else {
        return Err(FcsError::MalformedText(
            "ASCII DATA segment contains non-ASCII bytes".into(),
        ));
    };

    let mut values = Vec::with_capacity(n);
    for token in body.split_ascii_whitespace() {
        if values.len() == n {
            break;
        }
        values.push(token.parse::<u64>().map_err(|_| {
            FcsError::MalformedText(format!("non-numeric ASCII event value `{token}`"))
        })?);
    }
    if values.len() < n {
        return Err(FcsError::TruncatedData(format!(
            "ASCII DATA segment holds {} value(s), need {n}",
            values.len()
        )));
    }
    Ok(EventBuffer::Uint(values))
}

fn decode_ascii_fixed(data: &[u8], layout: &DataLayout<'_>, n: usize) -> Result<EventBuffer> {
    let widths: Vec<usize> = layout
        .fixed_bits()?
        .iter()
        .map(|&chars| chars as usize)
        .collect();
    let row: usize = widths.iter().sum();
    check_len(data, row * layout.event_count)?;

    let mut values = Vec::with_capacity(n);
    let mut offset = 0;
    for _ in 0..layout.event_count {
        for &width in &widths {
            let field = &data[offset..offset + width];
            let token = std::str::from_utf8(field)
                .map_err(|_| {
                    FcsError::MalformedText("ASCII DATA segment contains non-ASCII bytes".into())
                })?
                .trim();
            values.push(token.parse::<u64>().map_err(|_| {
                FcsError::MalformedText(format!("non-numeric ASCII event value `{token}`"))
            })?);
            offset += width;
        }
    }
    Ok(EventBuffer::Uint(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ReadOptions;

    fn param(index: usize, bit_width: BitWidth, range: u64) -> Parameter {
        Parameter {
            index,
            bit_width,
            range,
            short_name: format!("P{index}"),
            long_name: None,
            amplification: None,
            gain: None,
        }
    }

    fn layout<'a>(
        data_type: FcsDataType,
        byte_order: ByteOrder,
        parameters: &'a [Parameter],
        event_count: usize,
    ) -> DataLayout<'a> {
        DataLayout {
            version: Version::V3_1,
            data_type,
            byte_order,
            parameters,
            event_count,
        }
    }

    fn layout_3_0<'a>(
        data_type: FcsDataType,
        byte_order: ByteOrder,
        parameters: &'a [Parameter],
        event_count: usize,
    ) -> DataLayout<'a> {
        DataLayout {
            version: Version::V3_0,
            ..layout(data_type, byte_order, parameters, event_count)
        }
    }

    #[test]
    fn integer_values_are_masked_by_range() {
        // $PnB=16, $PnR=1024: raw 0xFFFF masks down to 1023.
        let params = [param(1, BitWidth::Fixed(16), 1024)];
        let l = layout(FcsDataType::I, ByteOrder::LittleEndian, &params, 1);
        let decoded = decode_events(&[0xFF, 0xFF], &l, &ReadOptions::default()).unwrap();
        assert_eq!(decoded.as_uint().unwrap(), &[0x3FF]);
    }

    #[test]
    fn big_endian_32_bit_integer() {
        let params = [param(1, BitWidth::Fixed(32), 4_294_967_295)];
        let l = layout(FcsDataType::I, ByteOrder::BigEndian, &params, 1);
        let decoded = decode_events(&[0x00, 0x00, 0x00, 0x2A], &l, &ReadOptions::default()).unwrap();
        assert_eq!(decoded.as_uint().unwrap(), &[42]);
    }

    #[test]
    fn mixed_byte_order_integer_in_fcs_3_0() {
        // PDP-11 order 3,4,1,2: LSB 0x01 at slab[2], 0x02 at slab[3],
        // 0x03 at slab[0], 0x04 at slab[1].
        let params = [param(1, BitWidth::Fixed(32), 4_294_967_295)];
        let l = layout_3_0(
            FcsDataType::I,
            ByteOrder::Mixed(vec![3, 4, 1, 2]),
            &params,
            1,
        );
        let decoded =
            decode_events(&[0x03, 0x04, 0x01, 0x02], &l, &ReadOptions::default()).unwrap();
        assert_eq!(decoded.as_uint().unwrap(), &[0x0403_0201]);
    }

    #[test]
    fn fcs_3_1_restricts_numeric_byte_order() {
        // The same mixed permutation is valid 3.0 input but not 3.1, for
        // integers and floats alike.
        let params = [param(1, BitWidth::Fixed(32), 4_294_967_295)];
        let l = layout(
            FcsDataType::I,
            ByteOrder::Mixed(vec![3, 4, 1, 2]),
            &params,
            1,
        );
        assert!(matches!(
            decode_events(&[0x03, 0x04, 0x01, 0x02], &l, &ReadOptions::default()),
            Err(FcsError::UnsupportedByteOrder(_))
        ));

        let l = layout(
            FcsDataType::F,
            ByteOrder::Mixed(vec![3, 4, 1, 2]),
            &params,
            1,
        );
        assert!(matches!(
            decode_events(&[0; 4], &l, &ReadOptions::default()),
            Err(FcsError::UnsupportedByteOrder(_))
        ));
    }

    #[test]
    fn mixed_byte_order_floats_decode_in_fcs_3_0() {
        // 1.5f32 has bits 0x3FC00000; under 3,4,1,2 the LSB-first bytes
        // [00 00 C0 3F] land at slab positions [2, 3, 0, 1].
        let params = [param(1, BitWidth::Fixed(32), 262_144)];
        let l = layout_3_0(
            FcsDataType::F,
            ByteOrder::Mixed(vec![3, 4, 1, 2]),
            &params,
            1,
        );
        let decoded =
            decode_events(&[0xC0, 0x3F, 0x00, 0x00], &l, &ReadOptions::default()).unwrap();
        assert_eq!(decoded.as_f32().unwrap(), &[1.5]);
    }

    #[test]
    fn heterogeneous_widths_per_event() {
        let params = [
            param(1, BitWidth::Fixed(8), 256),
            param(2, BitWidth::Fixed(16), 65_536),
        ];
        let l = layout(FcsDataType::I, ByteOrder::LittleEndian, &params, 2);
        let data = [0x01, 0x34, 0x12, 0x02, 0x78, 0x56];
        let decoded = decode_events(&data, &l, &ReadOptions::default()).unwrap();
        assert_eq!(decoded.as_uint().unwrap(), &[0x01, 0x1234, 0x02, 0x5678]);
    }

    #[test]
    fn unaligned_widths_need_the_opt_in() {
        let params = [
            param(1, BitWidth::Fixed(10), 1024),
            param(2, BitWidth::Fixed(6), 64),
        ];
        let l = layout(FcsDataType::I, ByteOrder::BigEndian, &params, 1);
        // 1023 (10 bits) then 21 (6 bits): 11111111 11 010101.
        let data = [0xFF, 0xD5];

        assert!(matches!(
            decode_events(&data, &l, &ReadOptions::default()),
            Err(FcsError::UnsupportedBitWidth(_))
        ));

        let options = ReadOptions {
            bit_packed_integers: true,
            ..ReadOptions::default()
        };
        let decoded = decode_events(&data, &l, &options).unwrap();
        assert_eq!(decoded.as_uint().unwrap(), &[1023, 21]);
    }

    #[test]
    fn packed_stream_crosses_event_boundaries() {
        // Two events of one 12-bit channel pack into exactly 3 bytes.
        let params = [param(1, BitWidth::Fixed(12), 4096)];
        let l = layout(FcsDataType::I, ByteOrder::BigEndian, &params, 2);
        let options = ReadOptions {
            bit_packed_integers: true,
            ..ReadOptions::default()
        };
        // 0xABC then 0x123 -> bits 101010111100 000100100011.
        let decoded = decode_events(&[0xAB, 0xC1, 0x23], &l, &options).unwrap();
        assert_eq!(decoded.as_uint().unwrap(), &[0xABC, 0x123]);
    }

    #[test]
    fn widths_beyond_64_bits_are_rejected() {
        let params = [param(1, BitWidth::Fixed(96), 1024)];
        let l = layout(FcsDataType::I, ByteOrder::LittleEndian, &params, 1);
        assert!(matches!(
            decode_events(&[0; 12], &l, &ReadOptions::default()),
            Err(FcsError::UnsupportedBitWidth(_))
        ));
    }

    #[test]
    fn f32_little_and_big_endian() {
        let params: Vec<Parameter> = (1..=2)
            .map(|i| param(i, BitWidth::Fixed(32), 262_144))
            .collect();

        let mut le = Vec::new();
        for v in [1.5f32, -2.0] {
            le.extend_from_slice(&v.to_le_bytes());
        }
        let l = layout(FcsDataType::F, ByteOrder::LittleEndian, &params, 1);
        let decoded = decode_events(&le, &l, &ReadOptions::default()).unwrap();
        assert_eq!(decoded.as_f32().unwrap(), &[1.5, -2.0]);

        let mut be = Vec::new();
        for v in [1.5f32, -2.0] {
            be.extend_from_slice(&v.to_be_bytes());
        }
        let l = layout(FcsDataType::F, ByteOrder::BigEndian, &params, 1);
        let decoded = decode_events(&be, &l, &ReadOptions::default()).unwrap();
        assert_eq!(decoded.as_f32().unwrap(), &[1.5, -2.0]);
    }

    #[test]
    fn f32_requires_32_bit_widths() {
        let params = [param(1, BitWidth::Fixed(16), 1024)];
        let l = layout(FcsDataType::F, ByteOrder::LittleEndian, &params, 1);
        assert!(matches!(
            decode_events(&[0; 4], &l, &ReadOptions::default()),
            Err(FcsError::UnsupportedBitWidth(_))
        ));
    }

    #[test]
    fn f64_round_trips() {
        let params = [param(1, BitWidth::Fixed(64), 262_144)];
        let l = layout(FcsDataType::D, ByteOrder::LittleEndian, &params, 2);
        let mut data = Vec::new();
        for v in [1.25f64, 3.5] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        let decoded = decode_events(&data, &l, &ReadOptions::default()).unwrap();
        assert_eq!(decoded.as_f64().unwrap(), &[1.25, 3.5]);
    }

    #[test]
    fn variable_ascii_consumes_exactly_the_token_count() {
        let params: Vec<Parameter> = (1..=2)
            .map(|i| param(i, BitWidth::Variable, 1_000_000))
            .collect();
        let l = layout(FcsDataType::A, ByteOrder::LittleEndian, &params, 2);
        let decoded =
            decode_events(b"12 345\n6789 0 ignored", &l, &ReadOptions::default()).unwrap();
        assert_eq!(decoded.as_uint().unwrap(), &[12, 345, 6789, 0]);
    }

    #[test]
    fn variable_ascii_reports_missing_tokens() {
        let params = [param(1, BitWidth::Variable, 1024)];
        let l = layout(FcsDataType::A, ByteOrder::LittleEndian, &params, 3);
        assert!(matches!(
            decode_events(b"1 2", &l, &ReadOptions::default()),
            Err(FcsError::TruncatedData(_))
        ));
    }

    #[test]
    fn fixed_ascii_reads_character_fields() {
        let params = [
            param(1, BitWidth::Fixed(3), 1000),
            param(2, BitWidth::Fixed(4), 10_000),
        ];
        let l = layout(FcsDataType::A, ByteOrder::LittleEndian, &params, 2);
        let decoded = decode_events(b" 42 123  7  88", &l, &ReadOptions::default()).unwrap();
        assert_eq!(decoded.as_uint().unwrap(), &[42, 123, 7, 88]);
    }

    #[test]
    fn empty_event_count_decodes_to_empty_buffer() {
        let params = [param(1, BitWidth::Fixed(32), 1024)];
        let l = layout(FcsDataType::F, ByteOrder::LittleEndian, &params, 0);
        let decoded = decode_events(&[], &l, &ReadOptions::default()).unwrap();
        assert!(decoded.is_empty());
    }
}

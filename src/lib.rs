//! Reader and writer for Flow Cytometry Standard (FCS) files, versions
//! 2.0, 3.0, and 3.1.
//!
//! The codec turns a byte source into validated [`DataSet`]s (HEADER
//! discovery, TEXT tokenization, typed keyword resolution, bit-accurate
//! DATA decoding) and symmetrically produces standards-conforming files
//! from flat event arrays plus channel descriptions. Events are exposed as
//! a single flat row-major buffer; compensation, transformation, and
//! gating belong to downstream libraries.
//!
//! ```no_run
//! use fcs_codec::{DataSet, FcsSource};
//!
//! let source = FcsSource::open("data/sample.fcs")?;
//! let data_set = DataSet::read(&source)?;
//! println!(
//!     "{} events x {} channels",
//!     data_set.event_count(),
//!     data_set.parameter_count()
//! );
//! # Ok::<(), fcs_codec::FcsError>(())
//! ```

pub use crate::byteorder::ByteOrder;
pub use data::EventBuffer;
pub use dataset::{DataSet, DataSetIter, ReadOptions};
pub use datatype::FcsDataType;
pub use error::{FcsError, ParseWarning, Result};
pub use header::Header;
pub use metadata::{KeywordMap, Metadata};
pub use parameter::{Amplification, BitWidth, Parameter};
pub use source::FcsSource;
pub use version::Version;
pub use write::{
    write_data_set, write_data_sets, ChannelSpec, ChannelSpecBuilder, DataSetSpec, EventValues,
    WriteOptions,
};

mod byteorder;
mod data;
mod dataset;
mod datatype;
mod error;
mod header;
mod metadata;
mod parameter;
mod source;
mod text;
mod version;
mod write;

/// Parses the first data set of `source`; see [`DataSet::read`]
/// # Errors
/// Will return `Err` if any segment is malformed
pub fn read(source: &FcsSource) -> Result<DataSet> {
    DataSet::read(source)
}

/// Lazily iterates every data set of `source`, following `$NEXTDATA`;
/// see [`DataSet::read_multiple`]
#[must_use]
pub fn read_multiple(source: &FcsSource) -> DataSetIter<'_> {
    DataSet::read_multiple(source)
}

/// Writes one data set to `sink`; see [`write_data_set`]
/// # Errors
/// Will return `Err` if the event shape is invalid or on I/O failure
pub fn write<W: std::io::Write>(
    sink: &mut W,
    events: EventValues<'_>,
    channels: &[ChannelSpec],
    options: &WriteOptions,
) -> Result<()> {
    write_data_set(sink, events, channels, options)
}

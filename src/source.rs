use crate::error::Result;
use memmap3::{Mmap, MmapOptions};
use std::fs::File;
use std::ops::Deref;
use std::path::{Path, PathBuf};

/// A read-only, random-access byte provider over an FCS input
///
/// Files are memory-mapped so multi-gigabyte inputs can be parsed without
/// loading the whole file; in-memory buffers are wrapped directly. The
/// reader borrows the source only for the duration of a parse and never
/// retains it inside a returned data set.
#[derive(Debug)]
pub struct FcsSource {
    inner: SourceInner,
}

#[derive(Debug)]
enum SourceInner {
    Mapped {
        /// An owned path to the file on disk, kept for diagnostics
        path: PathBuf,
        /// The memory-mapped file
        ///
        /// # Safety
        /// The mapping stays valid because the file handle lives as long as
        /// the map and the codec never writes back to an open source.
        mmap: Mmap,
    },
    Buffer(Vec<u8>),
}

impl FcsSource {
    /// Memory-maps the file at `path`
    /// # Errors
    /// Will return `Err` if the file cannot be opened or memory-mapped
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mmap = unsafe { MmapOptions::new().map(&file)? };

        Ok(Self {
            inner: SourceInner::Mapped {
                path: path.to_path_buf(),
                mmap,
            },
        })
    }

    /// Wraps an in-memory buffer, e.g. bytes produced by the writer
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: SourceInner::Buffer(bytes.into()),
        }
    }

    /// The full byte range of the source
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        match &self.inner {
            SourceInner::Mapped { mmap, .. } => mmap,
            SourceInner::Buffer(bytes) => bytes,
        }
    }

    /// The backing file path, if this source came from [`FcsSource::open`]
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.inner {
            SourceInner::Mapped { path, .. } => Some(path),
            SourceInner::Buffer(_) => None,
        }
    }
}

impl Deref for FcsSource {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.bytes()
    }
}

impl From<Vec<u8>> for FcsSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

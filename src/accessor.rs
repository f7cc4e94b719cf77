//! Single-segment I/O boundary
//!
//! The stream keeps exactly one underlying resource open at a time. These
//! traits are the contract with whatever provides that resource;
//! [`FsAccessor`] is the filesystem implementation behind
//! [`SegcatStream::open`](crate::stream::SegcatStream::open).

use crate::error::{Result, SegcatError};
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use tracing::debug;

/// One open segment resource.
pub trait SegmentHandle {
    /// Read up to `buf.len()` bytes. Zero may mean only the end of the data
    /// currently available in this segment, not the end of the sequence.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Seek within this segment; returns the new local position.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64>;

    /// Current size of the segment. Re-queried on every call: a segment may
    /// still be growing while it is read.
    fn size(&mut self) -> Result<u64>;

    /// Release the resource.
    fn close(self) -> Result<()>;
}

/// Provider of segment resources, addressed by filename.
pub trait SegmentAccessor {
    type Handle: SegmentHandle;

    fn open(&self, filename: &str) -> Result<Self::Handle>;

    /// Best-effort readability check. Never authoritative: a segment can
    /// vanish between this probe and `open` (ring-buffer rotation), in which
    /// case `open` reports the failure.
    fn probe_readable(&self, filename: &str) -> bool;
}

/// Filesystem-backed accessor over `std::fs::File`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsAccessor;

/// An open segment file.
pub struct FsHandle {
    file: File,
    filename: String,
}

impl SegmentHandle for FsHandle {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.file.read(buf)?)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.file.seek(pos)?)
    }

    fn size(&mut self) -> Result<u64> {
        // Through metadata rather than a cached value so that growth of the
        // segment is observed.
        let metadata = self
            .file
            .metadata()
            .map_err(|_| SegcatError::SizeUnavailable(self.filename.clone()))?;
        Ok(metadata.len())
    }

    fn close(self) -> Result<()> {
        debug!("Closing segment {}", self.filename);
        Ok(())
    }
}

impl SegmentAccessor for FsAccessor {
    type Handle = FsHandle;

    fn open(&self, filename: &str) -> Result<FsHandle> {
        let file = File::open(filename)?;
        debug!("Opened segment {}", filename);
        Ok(FsHandle {
            file,
            filename: filename.to_string(),
        })
    }

    fn probe_readable(&self, filename: &str) -> bool {
        fs::metadata(filename).map(|m| m.is_file()).unwrap_or(false)
    }
}

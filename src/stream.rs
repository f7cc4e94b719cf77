//! The virtual stream: buffer filling across segments and seek translation

use crate::accessor::{FsAccessor, SegmentAccessor, SegmentHandle};
use crate::error::{Result, SegcatError};
use crate::navigator::{Direction, Navigator, Progress};
use crate::pattern::SegmentPattern;
use std::io::{self, Read, Seek, SeekFrom};
use tracing::trace;

/// A read-only, seekable byte stream over a numbered sequence of segment
/// files.
///
/// Offsets are virtual: position 0 is the start of the seed segment, and the
/// stream extends backward (negative offsets) and forward through whatever
/// sibling segments exist at the time they are reached.
pub struct SegcatStream<A: SegmentAccessor> {
    navigator: Navigator<A>,
}

impl SegcatStream<FsAccessor> {
    /// Open a stream over local files from a seed path such as
    /// `segcat:/rec/chunk0042.ts`.
    pub fn open(seed: &str) -> Result<Self> {
        Self::open_with(FsAccessor, seed)
    }
}

impl<A: SegmentAccessor> SegcatStream<A> {
    /// Open a stream over an arbitrary backend. On failure nothing stays
    /// allocated.
    pub fn open_with(accessor: A, seed: &str) -> Result<Self> {
        let pattern = SegmentPattern::parse(seed)?;
        let navigator = Navigator::open(accessor, pattern)?;
        Ok(Self { navigator })
    }

    /// Fill `buf`, crossing segment boundaries transparently.
    ///
    /// Returns fewer bytes than requested (possibly zero) once no further
    /// segment exists: a soft EOF, never an error. An error raised after
    /// some bytes were already delivered in this call yields the partial
    /// count instead; the error will be hit again on the next call.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut total = 0;
        while total < buf.len() {
            let n = match self.navigator.handle_mut()?.read(&mut buf[total..]) {
                Ok(n) => n,
                Err(err) if total > 0 => {
                    trace!("Read error after {} bytes: {}", total, err);
                    return Ok(total);
                }
                Err(err) => return Err(err),
            };
            total += n;
            if total == buf.len() {
                break;
            }
            // Short read: this segment has no more data right now.
            match self.navigator.progress(Direction::Forward) {
                // The next segment is already positioned at its start.
                Ok(Progress::Switched) => {}
                // End of the sequence. Do not retry, or a caller looping on
                // read would spin here forever.
                Ok(Progress::NotSwitched) => break,
                Err(err) if total > 0 => {
                    trace!("Transition error after {} bytes: {}", total, err);
                    return Ok(total);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(total)
    }

    /// Seek within the virtual stream; returns the resulting absolute
    /// virtual offset.
    ///
    /// Positions beyond either end of the sequence are clamped to the first
    /// byte of the first segment or the last byte of the last segment. An
    /// empty last segment has no last byte to clamp to; overshooting into
    /// one surfaces the local seek error instead.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<i64> {
        match pos {
            SeekFrom::Current(delta) => self.seek_relative(delta),
            SeekFrom::Start(target) => {
                let current = self.position()?;
                self.seek_relative(target as i64 - current)
            }
            SeekFrom::End(delta) => {
                // Walk to the last segment that currently exists.
                loop {
                    match self.navigator.progress(Direction::Forward)? {
                        Progress::Switched => {}
                        Progress::NotSwitched => break,
                    }
                }
                // seek_relative assumes a valid local position in the
                // current segment.
                self.navigator.handle_mut()?.seek(SeekFrom::Start(0))?;
                let size = self.navigator.current_size()? as i64;
                self.seek_relative(size + delta)
            }
        }
    }

    /// Absolute virtual offset of the next byte to be read.
    pub fn position(&mut self) -> Result<i64> {
        let offset = self.navigator.handle_mut()?.seek(SeekFrom::Current(0))?;
        Ok(self.navigator.segment_start() + offset as i64)
    }

    /// Release the currently open segment.
    pub fn close(self) -> Result<()> {
        self.navigator.close()
    }

    /// Move by `delta` bytes from the current position, switching segments
    /// until the target falls inside the open one.
    fn seek_relative(&mut self, mut delta: i64) -> Result<i64> {
        let offset = self.navigator.handle_mut()?.seek(SeekFrom::Current(0))? as i64;

        while offset + delta < 0 {
            // Reaches back into an earlier segment.
            match self.navigator.progress(Direction::Backward)? {
                Progress::Switched => delta += self.navigator.current_size()? as i64,
                Progress::NotSwitched => {
                    // Already at the first segment: clamp to its start.
                    let local = self.navigator.handle_mut()?.seek(SeekFrom::Start(0))?;
                    return Ok(self.navigator.segment_start() + local as i64);
                }
            }
        }

        while offset + delta > self.navigator.current_size()? as i64 {
            // Reaches into a later segment.
            let departed = self.navigator.current_size()? as i64;
            match self.navigator.progress(Direction::Forward)? {
                Progress::Switched => delta -= departed,
                Progress::NotSwitched => {
                    // Last segment; it may have grown since last measured.
                    self.navigator.refresh_size()?;
                    let local = self.navigator.handle_mut()?.seek(SeekFrom::End(-1))?;
                    return Ok(self.navigator.segment_start() + local as i64);
                }
            }
        }

        let local = self
            .navigator
            .handle_mut()?
            .seek(SeekFrom::Start((offset + delta) as u64))?;
        Ok(self.navigator.segment_start() + local as i64)
    }
}

fn to_io_error(err: SegcatError) -> io::Error {
    match err {
        SegcatError::Io(err) => err,
        other => io::Error::other(other),
    }
}

impl<A: SegmentAccessor> Read for SegcatStream<A> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        SegcatStream::read(self, buf).map_err(to_io_error)
    }
}

impl<A: SegmentAccessor> Seek for SegcatStream<A> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let offset = SegcatStream::seek(self, pos).map_err(to_io_error)?;
        u64::try_from(offset).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("virtual offset {offset} precedes the seed segment"),
            )
        })
    }
}

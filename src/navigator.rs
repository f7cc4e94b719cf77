//! Segment switching and cumulative offset bookkeeping
//!
//! The navigator owns the one currently-open segment and walks the numbered
//! sequence one neighbor at a time. `segment_start` is the virtual offset at
//! which the current segment begins: the running sum of the sizes of every
//! segment traversed before it in this session. Every forward or backward
//! switch must keep `segment_start + local offset == absolute virtual offset`
//! true for callers.

use crate::accessor::{SegmentAccessor, SegmentHandle};
use crate::error::{Result, SegcatError};
use crate::pattern::SegmentPattern;
use std::io::SeekFrom;
use tracing::{debug, trace};

/// Traversal direction for [`Navigator::progress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn step(self) -> i64 {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }
}

/// Outcome of a transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The neighboring segment is now open and positioned at its start.
    Switched,
    /// No neighboring segment exists; nothing changed.
    NotSwitched,
}

/// Currently open segment plus its last-known size.
struct Segment<H> {
    handle: H,
    size: u64,
}

/// Owns the one open segment and switches between neighbors in the sequence.
pub struct Navigator<A: SegmentAccessor> {
    accessor: A,
    pattern: SegmentPattern,
    index: i64,
    /// Virtual offset at which the current segment begins. Signed: opening
    /// mid-sequence and walking backward goes below the seed's origin.
    segment_start: i64,
    /// `None` only transiently during a transition, or permanently after a
    /// transition failed mid-way.
    current: Option<Segment<A::Handle>>,
}

impl<A: SegmentAccessor> Navigator<A> {
    /// Open the seed segment. On failure nothing stays allocated.
    pub fn open(accessor: A, pattern: SegmentPattern) -> Result<Self> {
        let index = pattern.start_index();
        let filename = pattern.filename_for(index);
        let segment = match Self::open_segment(&accessor, &filename) {
            Ok(segment) => segment,
            Err(err @ SegcatError::SizeUnavailable(_)) => return Err(err),
            Err(_) => return Err(SegcatError::SegmentNotFound(filename)),
        };
        debug!("Opened seed segment {} ({} bytes)", filename, segment.size);
        Ok(Self {
            accessor,
            pattern,
            index,
            segment_start: 0,
            current: Some(segment),
        })
    }

    /// Switch to the next or previous segment, if one exists.
    ///
    /// Returns [`Progress::NotSwitched`] without touching any state when the
    /// neighbor is not readable. The readability probe and the open are not
    /// atomic: a segment rotated away in between makes the open fail, and
    /// that error reaches the caller rather than being reported as
    /// `NotSwitched`. After such a failure the navigator holds no open
    /// segment and further operations return [`SegcatError::NotOpen`].
    pub fn progress(&mut self, direction: Direction) -> Result<Progress> {
        let candidate = self.pattern.filename_for(self.index + direction.step());
        if !self.accessor.probe_readable(&candidate) {
            trace!("No segment at {}", candidate);
            return Ok(Progress::NotSwitched);
        }

        let old_size = self.refresh_size()?;
        let old = self.current.take().ok_or(SegcatError::NotOpen)?;
        old.handle.close()?;

        let mut segment = Self::open_segment(&self.accessor, &candidate)?;
        segment.handle.seek(SeekFrom::Start(0))?;

        self.index += direction.step();
        match direction {
            Direction::Forward => self.segment_start += old_size as i64,
            Direction::Backward => self.segment_start -= segment.size as i64,
        }
        debug!(
            "Switched to segment {} (index {}, start offset {})",
            candidate, self.index, self.segment_start
        );
        self.current = Some(segment);
        Ok(Progress::Switched)
    }

    /// Re-read the current segment's size from the backend.
    pub fn refresh_size(&mut self) -> Result<u64> {
        let segment = self.current.as_mut().ok_or(SegcatError::NotOpen)?;
        segment.size = segment.handle.size()?;
        Ok(segment.size)
    }

    /// Last-known size of the current segment.
    pub fn current_size(&self) -> Result<u64> {
        self.current
            .as_ref()
            .map(|segment| segment.size)
            .ok_or(SegcatError::NotOpen)
    }

    /// Virtual offset at which the current segment begins.
    pub fn segment_start(&self) -> i64 {
        self.segment_start
    }

    /// Index of the current segment.
    pub fn index(&self) -> i64 {
        self.index
    }

    /// Handle of the current segment, for local reads and seeks.
    pub fn handle_mut(&mut self) -> Result<&mut A::Handle> {
        self.current
            .as_mut()
            .map(|segment| &mut segment.handle)
            .ok_or(SegcatError::NotOpen)
    }

    /// Release the currently open segment, if any.
    pub fn close(mut self) -> Result<()> {
        match self.current.take() {
            Some(segment) => segment.handle.close(),
            None => Ok(()),
        }
    }

    fn open_segment(accessor: &A, filename: &str) -> Result<Segment<A::Handle>> {
        let mut handle = accessor.open(filename)?;
        let size = match handle.size() {
            Ok(size) => size,
            Err(err) => {
                let _ = handle.close();
                return Err(err);
            }
        };
        Ok(Segment { handle, size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::io;
    use std::rc::Rc;

    type Files = Rc<RefCell<HashMap<String, Vec<u8>>>>;

    /// In-memory accessor. Segments listed in `vanish_on_open` stay visible
    /// to the probe but disappear when opened, like a ring buffer rotating
    /// underneath the navigator; segments listed in `fail_size` open fine
    /// but cannot report a size. Closed handles record their name in
    /// `closed`.
    #[derive(Default, Clone)]
    struct MemAccessor {
        files: Files,
        vanish_on_open: Rc<RefCell<Vec<String>>>,
        fail_size: Rc<RefCell<Vec<String>>>,
        closed: Rc<RefCell<Vec<String>>>,
    }

    impl MemAccessor {
        fn insert(&self, name: &str, data: &[u8]) {
            self.files.borrow_mut().insert(name.to_string(), data.to_vec());
        }

        fn vanish_on_open(&self, name: &str) {
            self.vanish_on_open.borrow_mut().push(name.to_string());
        }

        fn fail_size(&self, name: &str) {
            self.fail_size.borrow_mut().push(name.to_string());
        }
    }

    struct MemHandle {
        name: String,
        files: Files,
        pos: u64,
        fail_size: bool,
        closed: Rc<RefCell<Vec<String>>>,
    }

    impl MemHandle {
        fn data_len(&self) -> Result<u64> {
            let files = self.files.borrow();
            let data = files.get(&self.name).ok_or_else(|| {
                SegcatError::Io(io::Error::new(io::ErrorKind::NotFound, self.name.clone()))
            })?;
            Ok(data.len() as u64)
        }
    }

    impl SegmentHandle for MemHandle {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            let files = self.files.borrow();
            let data = files.get(&self.name).ok_or_else(|| {
                SegcatError::Io(io::Error::new(io::ErrorKind::NotFound, self.name.clone()))
            })?;
            let start = (self.pos as usize).min(data.len());
            let n = (data.len() - start).min(buf.len());
            buf[..n].copy_from_slice(&data[start..start + n]);
            self.pos += n as u64;
            Ok(n)
        }

        fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
            let target = match pos {
                SeekFrom::Start(offset) => offset as i64,
                SeekFrom::Current(delta) => self.pos as i64 + delta,
                SeekFrom::End(delta) => self.data_len()? as i64 + delta,
            };
            if target < 0 {
                return Err(SegcatError::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "seek before start",
                )));
            }
            self.pos = target as u64;
            Ok(self.pos)
        }

        fn size(&mut self) -> Result<u64> {
            if self.fail_size {
                return Err(SegcatError::SizeUnavailable(self.name.clone()));
            }
            self.data_len()
        }

        fn close(self) -> Result<()> {
            self.closed.borrow_mut().push(self.name);
            Ok(())
        }
    }

    impl SegmentAccessor for MemAccessor {
        type Handle = MemHandle;

        fn open(&self, filename: &str) -> Result<MemHandle> {
            if self.vanish_on_open.borrow().iter().any(|n| n == filename) {
                self.files.borrow_mut().remove(filename);
            }
            if !self.files.borrow().contains_key(filename) {
                return Err(SegcatError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    filename.to_string(),
                )));
            }
            Ok(MemHandle {
                name: filename.to_string(),
                files: Rc::clone(&self.files),
                pos: 0,
                fail_size: self.fail_size.borrow().iter().any(|n| n == filename),
                closed: Rc::clone(&self.closed),
            })
        }

        fn probe_readable(&self, filename: &str) -> bool {
            self.files.borrow().contains_key(filename)
        }
    }

    fn navigator(accessor: &MemAccessor, seed: &str) -> Navigator<MemAccessor> {
        let pattern = SegmentPattern::parse(seed).unwrap();
        Navigator::open(accessor.clone(), pattern).unwrap()
    }

    #[test]
    fn forward_switch_updates_bookkeeping() {
        let accessor = MemAccessor::default();
        accessor.insert("seg05", b"hello");
        accessor.insert("seg06", b"world");
        let mut nav = navigator(&accessor, "seg05");

        assert_eq!(nav.progress(Direction::Forward).unwrap(), Progress::Switched);
        assert_eq!(nav.index(), 6);
        assert_eq!(nav.segment_start(), 5);
        assert_eq!(nav.current_size().unwrap(), 5);

        // New segment is positioned at its start.
        let mut buf = [0u8; 5];
        assert_eq!(nav.handle_mut().unwrap().read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"world");
    }

    #[test]
    fn backward_switch_subtracts_new_segment_size() {
        let accessor = MemAccessor::default();
        accessor.insert("seg04", b"abcdefg");
        accessor.insert("seg05", b"hello");
        let mut nav = navigator(&accessor, "seg05");

        assert_eq!(nav.progress(Direction::Backward).unwrap(), Progress::Switched);
        assert_eq!(nav.index(), 4);
        assert_eq!(nav.segment_start(), -7);
    }

    #[test]
    fn missing_neighbor_leaves_state_untouched() {
        let accessor = MemAccessor::default();
        accessor.insert("seg00", b"only");
        let mut nav = navigator(&accessor, "seg00");

        assert_eq!(
            nav.progress(Direction::Backward).unwrap(),
            Progress::NotSwitched
        );
        assert_eq!(
            nav.progress(Direction::Forward).unwrap(),
            Progress::NotSwitched
        );
        assert_eq!(nav.index(), 0);
        assert_eq!(nav.segment_start(), 0);
        assert_eq!(nav.current_size().unwrap(), 4);
    }

    #[test]
    fn vanished_between_probe_and_open_is_an_error() {
        let accessor = MemAccessor::default();
        accessor.insert("seg04", b"gone soon");
        accessor.insert("seg05", b"hello");
        accessor.vanish_on_open("seg04");
        let mut nav = navigator(&accessor, "seg05");

        assert!(matches!(
            nav.progress(Direction::Backward),
            Err(SegcatError::Io(_))
        ));
        // The failed transition left no segment open.
        assert!(matches!(nav.handle_mut(), Err(SegcatError::NotOpen)));
        assert!(matches!(nav.refresh_size(), Err(SegcatError::NotOpen)));
        nav.close().unwrap();
    }

    #[test]
    fn seed_open_failure_is_segment_not_found() {
        let accessor = MemAccessor::default();
        let pattern = SegmentPattern::parse("seg07").unwrap();
        assert!(matches!(
            Navigator::open(accessor, pattern),
            Err(SegcatError::SegmentNotFound(name)) if name == "seg07"
        ));
    }

    #[test]
    fn unsizable_seed_fails_open_and_closes_the_handle() {
        let accessor = MemAccessor::default();
        accessor.insert("seg05", b"hello");
        accessor.fail_size("seg05");
        let pattern = SegmentPattern::parse("seg05").unwrap();

        assert!(matches!(
            Navigator::open(accessor.clone(), pattern),
            Err(SegcatError::SizeUnavailable(name)) if name == "seg05"
        ));
        // The handle opened for the size query must not be leaked.
        assert_eq!(*accessor.closed.borrow(), ["seg05"]);
    }

    #[test]
    fn unsizable_neighbor_fails_the_transition() {
        let accessor = MemAccessor::default();
        accessor.insert("seg05", b"hello");
        accessor.insert("seg06", b"world");
        accessor.fail_size("seg06");
        let mut nav = navigator(&accessor, "seg05");

        assert!(matches!(
            nav.progress(Direction::Forward),
            Err(SegcatError::SizeUnavailable(name)) if name == "seg06"
        ));
        // Both the departed segment and the unsizable candidate are closed.
        assert_eq!(*accessor.closed.borrow(), ["seg05", "seg06"]);
        assert!(matches!(nav.handle_mut(), Err(SegcatError::NotOpen)));
    }

    #[test]
    fn zero_padded_navigation_finds_wider_neighbor() {
        let accessor = MemAccessor::default();
        accessor.insert("seg09", b"nine");
        accessor.insert("seg10", b"ten");
        let mut nav = navigator(&accessor, "seg09");

        assert_eq!(nav.progress(Direction::Forward).unwrap(), Progress::Switched);
        assert_eq!(nav.index(), 10);
    }
}

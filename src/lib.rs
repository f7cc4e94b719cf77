//! Virtual byte stream over a rotating sequence of numbered segment files
//!
//! Recorders that write a circular buffer of chunk files (`chunk0007.ts`,
//! `chunk0008.ts`, ...) leave consumers with many small files where one
//! logical stream is wanted. This crate stitches such a sequence back
//! together: given one seed path it presents every sibling segment as a
//! single continuous, seekable byte stream, holding exactly one file open at
//! a time and discovering neighbors lazily as reads and seeks cross segment
//! boundaries.
//!
//! ```no_run
//! use segcat::SegcatStream;
//! use std::io::SeekFrom;
//!
//! let mut stream = SegcatStream::open("segcat:/rec/chunk0042.ts")?;
//! stream.seek(SeekFrom::Start(1024))?;
//! let mut buf = [0u8; 4096];
//! let n = stream.read(&mut buf)?;
//! # Ok::<(), segcat::SegcatError>(())
//! ```

pub mod accessor;
pub mod error;
pub mod navigator;
pub mod pattern;
pub mod stream;

pub use accessor::{FsAccessor, SegmentAccessor, SegmentHandle};
pub use error::{Result, SegcatError};
pub use navigator::{Direction, Navigator, Progress};
pub use pattern::{SCHEME, SegmentPattern};
pub use stream::SegcatStream;

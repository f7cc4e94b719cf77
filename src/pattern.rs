//! Filename pattern derivation from a seed path
//!
//! A seed like `segcat:/rec/chunk0042.ts` names one member of a numbered
//! sequence. The trailing digit run is the starting index; the text around
//! it addresses the sibling segments.

use crate::error::{Result, SegcatError};

/// URI scheme prefix accepted (and stripped) on seed paths.
pub const SCHEME: &str = "segcat:";

/// Decomposed seed path: `prefix + <zero-padded index> + suffix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentPattern {
    prefix: String,
    suffix: String,
    width: usize,
    start_index: i64,
}

impl SegmentPattern {
    /// Parse a seed path into a pattern and starting index.
    ///
    /// Scans from the end of the seed for the last contiguous run of decimal
    /// digits. The run's zero-padding width is preserved when instantiating
    /// sibling filenames, so `chunk0009.ts` is followed by `chunk0010.ts`.
    pub fn parse(seed: &str) -> Result<Self> {
        let path = seed.strip_prefix(SCHEME).unwrap_or(seed);
        let bytes = path.as_bytes();

        let last_digit = bytes
            .iter()
            .rposition(u8::is_ascii_digit)
            .ok_or_else(|| SegcatError::NoDigitRun(seed.to_string()))?;
        let end = last_digit + 1;
        let begin = bytes[..end]
            .iter()
            .rposition(|b| !b.is_ascii_digit())
            .map_or(0, |i| i + 1);

        // Runs too long for i64 are unusable as an index.
        let start_index = path[begin..end]
            .parse()
            .map_err(|_| SegcatError::NoDigitRun(seed.to_string()))?;

        Ok(Self {
            prefix: path[..begin].to_string(),
            suffix: path[end..].to_string(),
            width: end - begin,
            start_index,
        })
    }

    /// Index parsed from the seed's digit run.
    pub fn start_index(&self) -> i64 {
        self.start_index
    }

    /// Filename for segment `index`, zero-padded to the seed's digit width.
    pub fn filename_for(&self, index: i64) -> String {
        format!(
            "{}{:0width$}{}",
            self.prefix,
            index,
            self.suffix,
            width = self.width
        )
    }
}

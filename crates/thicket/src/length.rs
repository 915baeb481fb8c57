//! Byte offsets paired with row/column positions.
//!
//! Subtrees never store absolute positions. Each one records its padding and
//! size as a [`Length`], and absolute positions are recovered by summing
//! lengths while walking down from the root. This is what lets an edited tree
//! share untouched subtrees with its predecessor.

use std::fmt;
use std::ops::{Add, Sub};

/// A zero-based row/column position. Columns count bytes, not characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Point {
    /// Zero-based line index.
    pub row: usize,
    /// Zero-based byte offset within the line.
    pub column: usize,
}

impl Point {
    /// Creates a point from a row and a byte column.
    #[must_use]
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// A span of text measured both in bytes and as a row/column extent.
///
/// When used as an absolute position the extent is the point reached from the
/// start of the document; when used as a relative size the extent follows the
/// usual convention: if `row > 0`, `column` is the column on the last row,
/// otherwise it is the number of bytes advanced on the current row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Length {
    /// Number of bytes.
    pub bytes: usize,
    /// Row/column extent.
    pub extent: Point,
}

impl Length {
    /// The empty length.
    pub const ZERO: Self = Self {
        bytes: 0,
        extent: Point { row: 0, column: 0 },
    };

    /// Creates a length from its components.
    #[must_use]
    pub const fn new(bytes: usize, extent: Point) -> Self {
        Self { bytes, extent }
    }

    /// Measures a slice of text.
    #[must_use]
    pub fn of(text: &[u8]) -> Self {
        let mut extent = Point::default();
        for &b in text {
            if b == b'\n' {
                extent.row += 1;
                extent.column = 0;
            } else {
                extent.column += 1;
            }
        }
        Self {
            bytes: text.len(),
            extent,
        }
    }

    /// Returns `true` if this length spans no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }
}

impl Add for Length {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let extent = if rhs.extent.row > 0 {
            Point::new(self.extent.row + rhs.extent.row, rhs.extent.column)
        } else {
            Point::new(self.extent.row, self.extent.column + rhs.extent.column)
        };
        Self {
            bytes: self.bytes + rhs.bytes,
            extent,
        }
    }
}

impl Sub for Length {
    type Output = Self;

    /// Distance from `rhs` to `self`. Both operands are expected to be
    /// positions in the same coordinate space with `rhs <= self`; the result
    /// saturates at zero otherwise.
    fn sub(self, rhs: Self) -> Self {
        let extent = if self.extent.row > rhs.extent.row {
            Point::new(self.extent.row - rhs.extent.row, self.extent.column)
        } else {
            Point::new(0, self.extent.column.saturating_sub(rhs.extent.column))
        };
        Self {
            bytes: self.bytes.saturating_sub(rhs.bytes),
            extent,
        }
    }
}

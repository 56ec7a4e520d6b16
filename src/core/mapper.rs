//! Region mapping interface
//!
//! Every annotated object lives in its own local coordinate space
//! (1-based, inclusive). A [`RegionMapper`] translates a local range of an
//! object into the reference coordinates of the currently mapped area and
//! reports how the range relates to that area:
//! 1. Out of area: nothing of the range is visible
//! 2. Mapped: `(y1, y2)` in reference coordinates, `y1 > y2` when the object
//!    runs backwards along the reference
//! 3. Clip flags for the local start/end that were clamped to the area
//! 4. A reverse hint for single-base ranges, whose orientation cannot be
//!    read from `y1`/`y2`

use crate::core::store::ObjKey;

/// Strand orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub enum Strand {
    #[default]
    Plus,
    Minus,
}

impl Strand {
    /// Get the complement strand
    ///
    /// # Examples
    /// ```
    /// use fast_smap::core::Strand;
    /// assert_eq!(Strand::Plus.complement(), Strand::Minus);
    /// assert_eq!(Strand::Minus.complement(), Strand::Plus);
    /// ```
    pub fn complement(&self) -> Self {
        match self {
            Strand::Plus => Strand::Minus,
            Strand::Minus => Strand::Plus,
        }
    }

    /// Parse strand from char
    ///
    /// # Examples
    /// ```
    /// use fast_smap::core::Strand;
    /// assert_eq!(Strand::from_char('+'), Some(Strand::Plus));
    /// assert_eq!(Strand::from_char('-'), Some(Strand::Minus));
    /// assert_eq!(Strand::from_char('.'), None);
    /// ```
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Strand::Plus),
            '-' => Some(Strand::Minus),
            _ => None,
        }
    }

    /// Convert to char
    pub fn to_char(&self) -> char {
        match self {
            Strand::Plus => '+',
            Strand::Minus => '-',
        }
    }

    /// Strand of a range given as `(from, to)`: reversed ranges are Minus
    pub fn of_range(from: i64, to: i64) -> Self {
        if from > to {
            Strand::Minus
        } else {
            Strand::Plus
        }
    }

    /// Combine two strands (orientation on the reference + orientation of a match)
    ///
    /// # Examples
    /// ```
    /// use fast_smap::core::Strand;
    /// assert_eq!(Strand::Plus.combine(Strand::Plus), Strand::Plus);
    /// assert_eq!(Strand::Plus.combine(Strand::Minus), Strand::Minus);
    /// assert_eq!(Strand::Minus.combine(Strand::Plus), Strand::Minus);
    /// assert_eq!(Strand::Minus.combine(Strand::Minus), Strand::Plus);
    /// ```
    pub fn combine(&self, other: Strand) -> Strand {
        if *self == other {
            Strand::Plus
        } else {
            Strand::Minus
        }
    }
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// Which local ends of a mapped range were clamped to the area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClipFlags {
    /// The local start of the range lies outside the area
    pub start: bool,
    /// The local end of the range lies outside the area
    pub end: bool,
}

impl ClipFlags {
    pub const NONE: ClipFlags = ClipFlags { start: false, end: false };

    pub fn any(&self) -> bool {
        self.start || self.end
    }
}

/// A range translated into reference coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedRange {
    /// Reference position of the local start (after clipping)
    pub y1: i64,
    /// Reference position of the local end (after clipping)
    pub y2: i64,
    pub clip: ClipFlags,
    /// The range spans an internal gap of the assembly
    pub gapped: bool,
    /// The object runs backwards along the reference
    pub reverse_hint: bool,
}

/// Result of mapping a local range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapOutcome {
    OutOfArea,
    Mapped(MappedRange),
}

impl MapOutcome {
    pub fn mapped(self) -> Option<MappedRange> {
        match self {
            MapOutcome::Mapped(range) => Some(range),
            MapOutcome::OutOfArea => None,
        }
    }
}

/// One ungapped block of an object aligned onto the reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapBlock {
    pub local_start: i64,
    pub local_end: i64,
    pub ref_start: i64,
    pub ref_end: i64,
}

/// Coordinate translation from object space into the mapped area
pub trait RegionMapper {
    /// The mapped area, reference coordinates, inclusive
    fn area(&self) -> (i64, i64);

    /// Map a local range `(x1, x2)` of `object`
    fn map(&self, object: &ObjKey, local: (i64, i64)) -> MapOutcome;

    /// Ungapped blocks of a gapped object; empty when the object maps colinearly
    fn gap_blocks(&self, object: &ObjKey) -> Vec<GapBlock>;

    /// Objects whose mapped extent intersects `interval`
    fn enumerate_overlapping(&self, interval: (i64, i64)) -> Vec<ObjKey>;

    /// Local extent `(1, length)` of a placed object
    fn extent(&self, object: &ObjKey) -> Option<(i64, i64)>;
}

/// Compute the intersection of two closed intervals
///
/// # Returns
/// The intersection interval (start, end) or None if no overlap
#[inline]
pub fn intersect_intervals(start1: i64, end1: i64, start2: i64, end2: i64) -> Option<(i64, i64)> {
    if start1 > end2 || end1 < start2 {
        return None;
    }
    Some((start1.max(start2), end1.min(end2)))
}

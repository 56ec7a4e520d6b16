//! Error types for FastSmap
//!
//! Two tiers:
//! - [`Diagnostic`]: a data-consistency problem in one record. The record is
//!   dropped, the diagnostic is logged and collected, conversion continues.
//! - [`ConversionError`]: an engine invariant or caller contract was
//!   violated. The whole conversion aborts.

use crate::core::ace::AceParseError;
use crate::core::store::{FieldError, ObjKey};
use thiserror::Error;

/// Main error type for FastSmap operations
#[derive(Debug, Error)]
pub enum FastSmapError {
    /// `.ace` parsing errors
    #[error("Ace parse error: {0}")]
    AceParse(#[from] AceParseError),

    /// Fatal conversion errors
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal errors that abort a conversion
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConversionError {
    /// A side-table handle does not refer to an entry
    #[error("Invalid {table} handle {index} (table holds {len})")]
    InvalidHandle {
        table: &'static str,
        index: usize,
        len: usize,
    },

    /// The mapped area is empty or inverted
    #[error("Invalid mapped area: start ({start}) > end ({end})")]
    InvalidArea { start: i64, end: i64 },

    /// The root object is not known to the store
    #[error("Root object not found: {0}")]
    UnknownRoot(ObjKey),

    /// Any other broken engine invariant
    #[error("Invariant violated: {0}")]
    Invariant(String),
}

/// Recoverable problems with one record
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Diagnostic {
    /// A row of the wrong shape
    #[error("{object}: malformed {tag} row: {error}")]
    MalformedRow {
        object: ObjKey,
        tag: String,
        error: FieldError,
    },

    /// A homology block that could not be mapped
    #[error("{object}: cannot map {tag} {method} {target} {x1}..{x2} ({m1}..{m2})")]
    HomolMapFailed {
        object: ObjKey,
        tag: String,
        method: String,
        target: String,
        x1: i64,
        x2: i64,
        m1: i64,
        m2: i64,
    },

    /// Gapped alignment whose sub-blocks disagree with the block lengths
    #[error("{object}: inconsistent alignment to {target} at {x1}..{x2}: {reason}")]
    InconsistentAlignment {
        object: ObjKey,
        target: String,
        x1: i64,
        x2: i64,
        reason: String,
    },

    /// A CDS range that does not fall on the exons
    #[error("{object}: CDS {c1}..{c2} does not overlap the exons")]
    CdsOutsideExons { object: ObjKey, c1: i64, c2: i64 },

    /// Exon or CDS running against the orientation of its anchor
    #[error("{object}: {what} {x1}..{x2} runs against the anchor orientation")]
    ExonOrientation {
        object: ObjKey,
        what: &'static str,
        x1: i64,
        x2: i64,
    },

    /// Paired reads whose near ends are in the wrong order
    #[error("paired reads {five_prime} ({near5}) and {three_prime} ({near3}) have crossed ends")]
    CrossedPairEnds {
        five_prime: String,
        three_prime: String,
        near5: i64,
        near3: i64,
    },

    /// An evidence kind not in the vocabulary
    #[error("{object}: unknown Confirmed_intron evidence '{kind}' at {x1}..{x2}")]
    UnknownEvidence {
        object: ObjKey,
        kind: String,
        x1: i64,
        x2: i64,
    },
}

/// Result type alias for FastSmap operations
pub type Result<T> = std::result::Result<T, FastSmapError>;

/// Result type alias for conversion operations
pub type ConversionResult<T> = std::result::Result<T, ConversionError>;

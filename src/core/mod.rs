//! Core data model and placement
//!
//! This module contains the annotation store, the `.ace` parser,
//! the method catalog and the assembly index that maps object-local
//! coordinates onto the reference.

pub mod ace;
pub mod error;
pub mod index;
pub mod io;
pub mod mapper;
pub mod method;
pub mod store;

pub use ace::{parse_ace_bytes, parse_ace_file, parse_ace_reader, AceParseError, AceParseErrorKind};
pub use error::{ConversionError, ConversionResult, Diagnostic, FastSmapError, Result};
pub use index::{AssemblyIndex, PLACEABLE_CLASSES};
pub use io::{
    detect_compression, open_input, CompressionFormat, IoStrategy, LineIterator, SmartReader,
    DEFAULT_BUFFER_SIZE, LARGE_BUFFER_SIZE, MMAP_THRESHOLD,
};
pub use mapper::{intersect_intervals, ClipFlags, GapBlock, MapOutcome, MappedRange, RegionMapper, Strand};
pub use method::{Method, MethodCatalog, MethodTable};
pub use store::{AceObject, AnnotationStore, Fields, MemoryStore, ObjKey, Row, Value};

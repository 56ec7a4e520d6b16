//! FastSmap - Annotation-to-feature projection
//!
//! Projects the annotation objects of a nested sequence assembly onto one
//! reference area and returns a flat, canonically sorted feature array
//! for display or export.
//!
//! # Features
//!
//! - `.ace` annotation dumps, plain or gzip/bzip2 compressed
//! - Exon, intron, CDS and phase reconstruction for transcripts
//! - Homology blocks with gapped alignments and paired-read gaps
//! - Strand complement of a whole conversion
//! - Parallel conversion of independent roots with rayon
//!
//! # Example
//!
//! ```ignore
//! use fast_smap::{convert, AssemblyIndex, ConversionOptions, MemoryStore, MethodTable, ObjKey};
//!
//! let mut store = MemoryStore::new();
//! fast_smap::parse_ace_file("clone.ace".as_ref(), &mut store)?;
//! let root = ObjKey::new("Sequence", "clone");
//! let index = AssemblyIndex::new(&store, &root, None)?;
//! let methods = MethodTable::from_store(&store);
//! let map = convert(&store, &index, &methods, &root, &ConversionOptions::default())?;
//! ```

pub mod convert;
pub mod core;
pub mod formats;

// Re-export commonly used types
pub use convert::{
    convert, convert_with_naming, ConversionOptions, Feature, FeatureFlags, FeatureKind, FeatureMap, FeatureType,
    Payload, SelfMatchNaming,
};
pub use core::{
    parse_ace_bytes, parse_ace_file, AnnotationStore, AssemblyIndex, ConversionError, Diagnostic, FastSmapError,
    MemoryStore, Method, MethodCatalog, MethodTable, ObjKey, RegionMapper, Strand,
};
pub use formats::table;

//! Conversion state
//!
//! [`ConversionContext`] is the single mutable owner of everything one
//! conversion produces. Builders borrow it mutably one at a time; the
//! capability objects (store, mapper, methods) are shared references.

use crate::convert::feature::{
    Feature, FeatureFlags, FeatureInfo, FeatureKind, FeatureType, FeatInfoId, HandleSet, HomolId,
    HomologyInfo, Payload, SeqId, SequenceInfo, Table,
};
use crate::convert::pairs::PairIndex;
use crate::convert::sort::UnsortedFeatures;
use crate::core::error::{ConversionError, ConversionResult, Diagnostic};
use crate::core::mapper::{RegionMapper, Strand};
use crate::core::method::{Method, MethodCatalog};
use crate::core::store::{AnnotationStore, FieldError, ObjKey};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

/// Caller-controlled conversion settings
#[derive(Debug, Clone, Default)]
pub struct ConversionOptions {
    /// When non-empty, only these methods are converted
    pub include_methods: HashSet<String>,
    pub exclude_methods: HashSet<String>,
    /// Convert methods tagged `Calculated`
    pub include_calculated: bool,
    /// Complement every feature onto the other strand
    pub reverse: bool,
}

/// A local range placed on the reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placed {
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    /// Clip bits only
    pub flags: FeatureFlags,
}

/// State of the object being converted
#[derive(Debug, Clone)]
pub(crate) struct CurrentObject {
    pub key: ObjKey,
    /// Local extent, possibly shrunk to the first exon
    pub extent: (i64, i64),
    /// Index of the anchor feature
    pub anchor: Option<usize>,
    pub anchor_info: Option<SeqId>,
    /// Exon feature per exon block, `None` where the exon fell outside the area
    pub exon_features: Vec<Option<usize>>,
    /// Intron features of the anchor
    pub intron_features: Vec<usize>,
}

pub struct ConversionContext<'a> {
    pub(crate) store: &'a dyn AnnotationStore,
    pub(crate) mapper: &'a dyn RegionMapper,
    pub(crate) methods: &'a dyn MethodCatalog,
    pub(crate) options: &'a ConversionOptions,
    pub features: UnsortedFeatures,
    pub sequences: Table<SeqId, SequenceInfo>,
    pub homologies: Table<HomolId, HomologyInfo>,
    pub feature_infos: Table<FeatInfoId, FeatureInfo>,
    pub diagnostics: Vec<Diagnostic>,
    pub(crate) table_sourced: HandleSet<HomolId>,
    pub(crate) pairs: PairIndex,
    pub(crate) current: Option<CurrentObject>,
    /// (source, match, method) -> (alignment id, next block)
    align_ids: HashMap<(ObjKey, ObjKey, String), (u32, u32)>,
}

impl<'a> ConversionContext<'a> {
    pub fn new(
        store: &'a dyn AnnotationStore,
        mapper: &'a dyn RegionMapper,
        methods: &'a dyn MethodCatalog,
        options: &'a ConversionOptions,
    ) -> Self {
        Self {
            store,
            mapper,
            methods,
            options,
            features: UnsortedFeatures::new(),
            sequences: Table::new(),
            homologies: Table::new(),
            feature_infos: Table::new(),
            diagnostics: Vec::new(),
            table_sourced: HandleSet::new(),
            pairs: PairIndex::default(),
            current: None,
            align_ids: HashMap::new(),
        }
    }

    /// Log and keep a recoverable problem
    pub fn report(&mut self, diagnostic: Diagnostic) {
        log::warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    pub(crate) fn malformed(&mut self, object: &ObjKey, tag: &str, error: FieldError) {
        self.report(Diagnostic::MalformedRow {
            object: object.clone(),
            tag: tag.to_string(),
            error,
        });
    }

    /// Method lookup with inclusion filtering applied
    ///
    /// `None` when the method is filtered out. Methods missing from the
    /// catalog get every flag off.
    pub fn method(&self, name: &str) -> Option<Cow<'a, Method>> {
        if self.options.exclude_methods.contains(name) {
            return None;
        }
        if !self.options.include_methods.is_empty() && !self.options.include_methods.contains(name) {
            return None;
        }
        match self.methods.get(name) {
            Some(method) if method.calculated && !self.options.include_calculated => None,
            Some(method) => Some(Cow::Borrowed(method)),
            None => Some(Cow::Owned(Method::named(name))),
        }
    }

    pub(crate) fn begin_object(&mut self, key: ObjKey, extent: (i64, i64)) {
        self.current = Some(CurrentObject {
            key,
            extent,
            anchor: None,
            anchor_info: None,
            exon_features: Vec::new(),
            intron_features: Vec::new(),
        });
    }

    pub(crate) fn current(&self) -> ConversionResult<&CurrentObject> {
        self.current
            .as_ref()
            .ok_or_else(|| ConversionError::Invariant("no object being converted".into()))
    }

    pub(crate) fn current_mut(&mut self) -> ConversionResult<&mut CurrentObject> {
        self.current
            .as_mut()
            .ok_or_else(|| ConversionError::Invariant("no object being converted".into()))
    }

    /// Anchor feature of the current object, if it was placed
    pub(crate) fn anchor(&self) -> Option<&Feature> {
        let index = self.current.as_ref()?.anchor?;
        self.features.get(index)
    }

    /// Map a local range of `object` and orient it
    ///
    /// A range running backwards along the reference lands on the minus
    /// strand with its clip bits swapped, so CLIPPED_TOP always refers to
    /// the low reference end. Single bases take their strand from the
    /// reverse hint.
    pub fn place(&self, object: &ObjKey, local: (i64, i64)) -> Option<Placed> {
        let range = self.mapper.map(object, local).mapped()?;
        let reverse = match range.y1.cmp(&range.y2) {
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Equal => range.reverse_hint,
        };
        let (start, end) = (range.y1.min(range.y2), range.y1.max(range.y2));
        let (top, bottom) = if reverse {
            (range.clip.end, range.clip.start)
        } else {
            (range.clip.start, range.clip.end)
        };
        let mut flags = FeatureFlags::empty();
        flags.set(FeatureFlags::CLIPPED_TOP, top);
        flags.set(FeatureFlags::CLIPPED_BOTTOM, bottom);
        Some(Placed {
            start,
            end,
            strand: if reverse { Strand::Minus } else { Strand::Plus },
            flags,
        })
    }

    /// Append a feature, returning its index
    pub fn push(&mut self, feature: Feature) -> usize {
        log::trace!("{} {}..{} {}", feature.ty, feature.start, feature.end, feature.key);
        self.features.push(feature)
    }

    /// Place `local` of the current object and emit a feature of `kind`
    ///
    /// Returns the feature index, or `None` when the range is out of area.
    pub(crate) fn emit_local(
        &mut self,
        kind: FeatureKind,
        local: (i64, i64),
        key: ObjKey,
        force_forward: bool,
        payload: Payload,
    ) -> ConversionResult<Option<usize>> {
        let source = self.current()?.key.clone();
        let Some(placed) = self.place(&source, local) else {
            return Ok(None);
        };
        let strand = if force_forward { Strand::Plus } else { placed.strand };
        let feature = Feature::new(FeatureType::new(kind, strand), placed.start, placed.end, key, source.clone())
            .with_parent(source)
            .with_flags(placed.flags)
            .with_payload(payload);
        Ok(Some(self.push(feature)))
    }

    /// Alignment id and block number for the next block of one alignment
    pub(crate) fn next_block(&mut self, source: &ObjKey, target: &ObjKey, method: &str) -> (u32, u32) {
        let next_id = self.align_ids.len() as u32;
        let entry = self
            .align_ids
            .entry((source.clone(), target.clone(), method.to_string()))
            .or_insert((next_id, 0));
        let ids = *entry;
        entry.1 += 1;
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ace::parse_ace_bytes;
    use crate::core::index::AssemblyIndex;
    use crate::core::method::MethodTable;

    fn store() -> crate::core::store::MemoryStore {
        parse_ace_bytes(
            b"\
Sequence : \"clone\"
Length 3000
Subsequence \"fwd\" 1000 1999
Subsequence \"rev\" 2999 2000

Sequence : \"fwd\"

Sequence : \"rev\"

Method : \"ab_initio\"
Calculated
",
        )
        .unwrap()
    }

    #[test]
    fn test_method_filtering() {
        let store = store();
        let index = AssemblyIndex::new(&store, &ObjKey::new("Sequence", "clone"), None).unwrap();
        let methods = MethodTable::from_store(&store);
        let mut options = ConversionOptions::default();
        options.exclude_methods.insert("hidden".into());
        let ctx = ConversionContext::new(&store, &index, &methods, &options);

        assert!(ctx.method("hidden").is_none());
        assert!(ctx.method("ab_initio").is_none());
        assert_eq!(ctx.method("unknown").unwrap().name, "unknown");

        let mut options = ConversionOptions::default();
        options.include_calculated = true;
        options.include_methods.insert("ab_initio".into());
        let ctx = ConversionContext::new(&store, &index, &methods, &options);
        assert!(ctx.method("ab_initio").is_some());
        assert!(ctx.method("unknown").is_none());
    }

    #[test]
    fn test_place_orients_and_swaps_clips() {
        let store = store();
        let index =
            AssemblyIndex::new(&store, &ObjKey::new("Sequence", "clone"), Some((1, 2990))).unwrap();
        let methods = MethodTable::new();
        let options = ConversionOptions::default();
        let ctx = ConversionContext::new(&store, &index, &methods, &options);

        let placed = ctx.place(&ObjKey::new("Sequence", "fwd"), (1, 100)).unwrap();
        assert_eq!((placed.start, placed.end, placed.strand), (1000, 1099, Strand::Plus));
        assert_eq!(placed.flags, FeatureFlags::empty());

        // rev local 1 sits at 2999, beyond the area: its low end is intact,
        // the high reference end is clipped
        let placed = ctx.place(&ObjKey::new("Sequence", "rev"), (1, 100)).unwrap();
        assert_eq!((placed.start, placed.end, placed.strand), (2900, 2990, Strand::Minus));
        assert!(placed.flags.contains(FeatureFlags::CLIPPED_BOTTOM));
        assert!(!placed.flags.contains(FeatureFlags::CLIPPED_TOP));

        // Single base takes the reverse hint
        let placed = ctx.place(&ObjKey::new("Sequence", "rev"), (50, 50)).unwrap();
        assert_eq!((placed.start, placed.end, placed.strand), (2950, 2950, Strand::Minus));
    }

    #[test]
    fn test_next_block_counts_per_alignment() {
        let store = store();
        let index = AssemblyIndex::new(&store, &ObjKey::new("Sequence", "clone"), None).unwrap();
        let methods = MethodTable::new();
        let options = ConversionOptions::default();
        let mut ctx = ConversionContext::new(&store, &index, &methods, &options);
        let src = ObjKey::new("Sequence", "fwd");
        let m1 = ObjKey::new("Sequence", "est1");
        let m2 = ObjKey::new("Sequence", "est2");

        assert_eq!(ctx.next_block(&src, &m1, "blat"), (0, 0));
        assert_eq!(ctx.next_block(&src, &m1, "blat"), (0, 1));
        assert_eq!(ctx.next_block(&src, &m2, "blat"), (1, 0));
        assert_eq!(ctx.next_block(&src, &m1, "blat"), (0, 2));
    }
}

//! Annotation-to-feature conversion
//!
//! [`convert`] projects every object overlapping the mapped area onto the
//! reference and returns one canonically sorted feature array with its
//! side tables.
//!
//! # Pipeline
//!
//! 1. MASTER feature spanning the area
//! 2. Per candidate object, root first: anchor, exons, CDS, homologies, tags
//! 3. Paired-read gap features
//! 4. Optional strand complement
//! 5. Sort, intron reconciliation, sort, self-homology removal, sort
//! 6. Buried and table-sourced homology sets

pub mod builder;
pub mod coding;
pub mod context;
pub mod exons;
pub mod feature;
pub mod flip;
pub mod homol;
pub mod introns;
pub mod pairs;
pub mod self_homol;
pub mod sort;
pub mod tags;

pub use context::{ConversionContext, ConversionOptions, Placed};
pub use feature::{
    AlignBlock, CdsInfo, Evidence, EvidenceKind, EvidenceSet, Feature, FeatureFlags, FeatureInfo, FeatureKind,
    FeatureType, FeatInfoId, Handle, HandleSet, HomolId, HomolKind, HomologyInfo, Payload, SeqId, SequenceFlags,
    SequenceInfo, Table,
};
pub use self_homol::{PrefixStripping, SelfMatchNaming};
pub use sort::{SortedFeatures, UnsortedFeatures};

use crate::core::error::{ConversionError, ConversionResult, Diagnostic};
use crate::core::mapper::{RegionMapper, Strand};
use crate::core::method::MethodCatalog;
use crate::core::store::{AnnotationStore, ObjKey};
use std::collections::{HashMap, HashSet};

/// Everything one conversion produces
#[derive(Debug, Clone)]
pub struct FeatureMap {
    /// MASTER first, then canonical order
    pub features: SortedFeatures,
    pub sequences: Table<SeqId, SequenceInfo>,
    pub homologies: Table<HomolId, HomologyInfo>,
    pub feature_infos: Table<FeatInfoId, FeatureInfo>,
    /// Homologies contained in another block of the same match
    pub buried: HandleSet<HomolId>,
    /// Homologies read from `Homol_data` objects
    pub table_sourced: HandleSet<HomolId>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FeatureMap {
    pub fn master(&self) -> Option<&Feature> {
        self.features.as_slice().first().filter(|f| f.kind() == FeatureKind::Master)
    }
}

/// Convert with the default self-homology naming
pub fn convert(
    store: &dyn AnnotationStore,
    mapper: &dyn RegionMapper,
    methods: &dyn MethodCatalog,
    root: &ObjKey,
    options: &ConversionOptions,
) -> ConversionResult<FeatureMap> {
    convert_with_naming(store, mapper, methods, root, options, &PrefixStripping)
}

/// Convert every object overlapping the mapper's area
pub fn convert_with_naming(
    store: &dyn AnnotationStore,
    mapper: &dyn RegionMapper,
    methods: &dyn MethodCatalog,
    root: &ObjKey,
    options: &ConversionOptions,
    naming: &dyn SelfMatchNaming,
) -> ConversionResult<FeatureMap> {
    let area = mapper.area();
    if area.0 > area.1 {
        return Err(ConversionError::InvalidArea { start: area.0, end: area.1 });
    }
    if store.object(root).is_none() {
        return Err(ConversionError::UnknownRoot(root.clone()));
    }

    let mut ctx = ConversionContext::new(store, mapper, methods, options);
    ctx.push(Feature::new(FeatureType::forward(FeatureKind::Master), area.0, area.1, root.clone(), root.clone()));

    let mut seen = HashSet::new();
    seen.insert(root.clone());
    builder::convert_object(&mut ctx, root, true)?;
    for key in mapper.enumerate_overlapping(area) {
        if seen.insert(key.clone()) {
            builder::convert_object(&mut ctx, &key, false)?;
        }
    }
    log::debug!("Built {} features from {} objects", ctx.features.len(), seen.len());

    let (gaps, pair_diagnostics) = ctx.pairs.link();
    for feature in gaps {
        ctx.push(feature);
    }
    for diagnostic in pair_diagnostics {
        ctx.report(diagnostic);
    }

    let ConversionContext {
        mut features,
        mut sequences,
        mut homologies,
        feature_infos,
        diagnostics,
        table_sourced,
        ..
    } = ctx;

    check_ordered(&features)?;
    if options.reverse {
        flip::complement_strands(&mut features, &mut sequences, &mut homologies, area);
    }

    let sorted = features.sort(&homologies);
    let sorted = introns::reconcile_introns(sorted, &mut sequences)?.sort(&homologies);
    let sorted = self_homol::remove_self_homologies(sorted, naming).sort(&homologies);
    let buried = buried_homologies(&sorted)?;

    log::info!(
        "{}: {} features, {} diagnostics",
        root,
        sorted.len(),
        diagnostics.len()
    );
    Ok(FeatureMap {
        features: sorted,
        sequences,
        homologies,
        feature_infos,
        buried,
        table_sourced,
        diagnostics,
    })
}

/// Every feature but MASTER must have `start <= end`
fn check_ordered(features: &UnsortedFeatures) -> ConversionResult<()> {
    match features.iter().find(|f| f.kind() != FeatureKind::Master && f.start > f.end) {
        Some(f) => Err(ConversionError::Invariant(format!(
            "{} {} has start {} after end {}",
            f.ty, f.key, f.start, f.end
        ))),
        None => Ok(()),
    }
}

/// Homology blocks wholly inside another block of the same match, strand and parent
fn buried_homologies(features: &SortedFeatures) -> ConversionResult<HandleSet<HomolId>> {
    let mut buried = HandleSet::new();
    for strand in [Strand::Plus, Strand::Minus] {
        let mut groups: HashMap<(&ObjKey, Option<&ObjKey>), Vec<(i64, i64, HomolId)>> = HashMap::new();
        for f in features.of_type(FeatureType::new(FeatureKind::Homol, strand)) {
            let id = f.homology_id().ok_or_else(|| {
                ConversionError::Invariant(format!("homology {} has no homology record", f.key))
            })?;
            groups.entry((&f.key, f.parent.as_ref())).or_default().push((f.start, f.end, id));
        }
        for mut blocks in groups.into_values() {
            blocks.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
            let mut reach = i64::MIN;
            for (_, end, id) in blocks {
                if end <= reach {
                    buried.insert(id);
                } else {
                    reach = end;
                }
            }
        }
    }
    Ok(buried)
}

//! Canonical feature order
//!
//! Features are ordered by type (kind, then strand), HOMOL features
//! additionally by (match, parent, alignment block), then by start and end.
//! [`SortedFeatures`] is the only way to ask for the index range of one
//! type, so a range lookup on unsorted data cannot be written.

use crate::convert::feature::{Feature, FeatureKind, FeatureType, HomologyInfo, HomolId, Table};
use std::cmp::Ordering;
use std::ops::Range;

/// Features in emission order, possibly holding tombstones
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnsortedFeatures {
    items: Vec<Feature>,
}

impl UnsortedFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(items: Vec<Feature>) -> Self {
        Self { items }
    }

    /// Append a feature, returning its index
    pub fn push(&mut self, feature: Feature) -> usize {
        self.items.push(feature);
        self.items.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&Feature> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Feature> {
        self.items.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Feature> {
        self.items.iter_mut()
    }

    /// Drop tombstones and sort into canonical order
    ///
    /// The sort is stable, so equal features keep emission order.
    pub fn sort(self, homologies: &Table<HomolId, HomologyInfo>) -> SortedFeatures {
        let mut items: Vec<Feature> = self.items.into_iter().filter(|f| !f.is_deleted()).collect();
        items.sort_by(|a, b| compare_features(a, b, homologies));
        SortedFeatures { items }
    }
}

/// Alignment position of a HOMOL feature, `(0, 0)` when it has none
fn block_key(feature: &Feature, homologies: &Table<HomolId, HomologyInfo>) -> (u32, u32) {
    feature
        .homology_id()
        .and_then(|id| homologies.get(id).ok())
        .map_or((0, 0), |info| (info.align_id, info.block))
}

/// Canonical comparison of two features
pub fn compare_features(a: &Feature, b: &Feature, homologies: &Table<HomolId, HomologyInfo>) -> Ordering {
    a.ty.cmp(&b.ty)
        .then_with(|| {
            if a.kind() == FeatureKind::Homol {
                a.key
                    .cmp(&b.key)
                    .then_with(|| a.parent.cmp(&b.parent))
                    .then_with(|| block_key(a, homologies).cmp(&block_key(b, homologies)))
            } else {
                Ordering::Equal
            }
        })
        .then_with(|| a.start.cmp(&b.start))
        .then_with(|| a.end.cmp(&b.end))
}

/// Features in canonical order, tombstone free
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortedFeatures {
    items: Vec<Feature>,
}

impl SortedFeatures {
    pub fn as_slice(&self) -> &[Feature] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.items.iter()
    }

    /// Index range holding every feature of type `ty`
    ///
    /// Empty (at the insertion point) when there are none.
    pub fn bounds(&self, ty: FeatureType) -> Range<usize> {
        let lo = self.items.partition_point(|f| f.ty < ty);
        let hi = lo + self.items[lo..].partition_point(|f| f.ty == ty);
        lo..hi
    }

    /// Features of type `ty`
    pub fn of_type(&self, ty: FeatureType) -> &[Feature] {
        &self.items[self.bounds(ty)]
    }

    /// Give up the ordering guarantee to edit features in place
    pub fn into_unsorted(self) -> UnsortedFeatures {
        UnsortedFeatures { items: self.items }
    }

    pub fn into_vec(self) -> Vec<Feature> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::feature::{FeatureFlags, HomolKind, Payload};
    use crate::core::mapper::Strand;
    use crate::core::store::ObjKey;

    fn feature(kind: FeatureKind, strand: Strand, start: i64, end: i64) -> Feature {
        let key = ObjKey::new("Sequence", "s");
        Feature::new(FeatureType::new(kind, strand), start, end, key.clone(), key)
    }

    fn homology(block: u32) -> HomologyInfo {
        HomologyInfo {
            kind: HomolKind::Dna,
            method: "blat".into(),
            score: None,
            align_id: 0,
            block,
            matched: (1, 10),
            strand: Strand::Plus,
            gaps: Vec::new(),
            alignment: None,
            cluster: None,
        }
    }

    #[test]
    fn test_sort_by_type_then_coordinates() {
        let mut features = UnsortedFeatures::new();
        features.push(feature(FeatureKind::Intron, Strand::Plus, 10, 20));
        features.push(feature(FeatureKind::Exon, Strand::Minus, 1, 5));
        features.push(feature(FeatureKind::Exon, Strand::Plus, 30, 40));
        features.push(feature(FeatureKind::Exon, Strand::Plus, 1, 9));
        features.push(feature(FeatureKind::Cds, Strand::Plus, 5, 35));

        let sorted = features.sort(&Table::new());
        let order: Vec<(FeatureKind, Strand, i64)> =
            sorted.iter().map(|f| (f.kind(), f.strand(), f.start)).collect();
        assert_eq!(
            order,
            vec![
                (FeatureKind::Cds, Strand::Plus, 5),
                (FeatureKind::Exon, Strand::Plus, 1),
                (FeatureKind::Exon, Strand::Plus, 30),
                (FeatureKind::Exon, Strand::Minus, 1),
                (FeatureKind::Intron, Strand::Plus, 10),
            ]
        );
    }

    #[test]
    fn test_bounds() {
        let mut features = UnsortedFeatures::new();
        for i in 0..3 {
            features.push(feature(FeatureKind::Exon, Strand::Plus, i * 10, i * 10 + 5));
        }
        features.push(feature(FeatureKind::Intron, Strand::Minus, 1, 2));
        let sorted = features.sort(&Table::new());

        assert_eq!(sorted.bounds(FeatureType::new(FeatureKind::Exon, Strand::Plus)), 0..3);
        assert_eq!(sorted.bounds(FeatureType::new(FeatureKind::Intron, Strand::Minus)), 3..4);
        let empty = sorted.bounds(FeatureType::new(FeatureKind::Exon, Strand::Minus));
        assert!(empty.is_empty());
        assert_eq!(empty.start, 3);
    }

    #[test]
    fn test_tombstones_dropped() {
        let mut features = UnsortedFeatures::new();
        features.push(feature(FeatureKind::Exon, Strand::Plus, 1, 2));
        let mut dead = feature(FeatureKind::Exon, Strand::Plus, 3, 4);
        dead.flags.insert(FeatureFlags::DELETED);
        features.push(dead);
        assert_eq!(features.sort(&Table::new()).len(), 1);
    }

    #[test]
    fn test_homol_sorted_by_block_before_start() {
        let mut homologies = Table::new();
        let second = homologies.push(homology(1));
        let first = homologies.push(homology(0));

        let mut features = UnsortedFeatures::new();
        features.push(
            feature(FeatureKind::Homol, Strand::Plus, 100, 200).with_payload(Payload::Homology(second)),
        );
        features.push(
            feature(FeatureKind::Homol, Strand::Plus, 300, 400).with_payload(Payload::Homology(first)),
        );
        let sorted = features.sort(&homologies);
        assert_eq!(sorted.as_slice()[0].start, 300);
        assert_eq!(sorted.as_slice()[1].start, 100);
    }
}

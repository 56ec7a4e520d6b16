//! Strand complement
//!
//! Reflects a whole conversion about the centre of its area: every
//! position `x` becomes `a + b - x` for the area `(a, b)`. Applying the
//! reflection twice restores the input exactly.

use crate::convert::feature::{FeatureKind, HomologyInfo, HomolId, SeqId, SequenceInfo, Table};
use crate::convert::sort::UnsortedFeatures;

/// Reflection of positions about the centre of an area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reflection {
    sum: i64,
}

impl Reflection {
    pub fn new(area: (i64, i64)) -> Self {
        Self { sum: area.0 + area.1 }
    }

    #[inline]
    pub fn point(&self, x: i64) -> i64 {
        self.sum - x
    }

    /// Reflect an ordered range, keeping it ordered
    #[inline]
    pub fn range(&self, start: i64, end: i64) -> (i64, i64) {
        (self.point(end), self.point(start))
    }
}

/// Complement every non-MASTER feature and all side-table coordinates
///
/// Takes every table at once so the pass cannot be applied to part of a
/// conversion.
pub fn complement_strands(
    features: &mut UnsortedFeatures,
    sequences: &mut Table<SeqId, SequenceInfo>,
    homologies: &mut Table<HomolId, HomologyInfo>,
    area: (i64, i64),
) {
    let reflect = Reflection::new(area);
    for feature in features.iter_mut() {
        if feature.kind() == FeatureKind::Master {
            continue;
        }
        (feature.start, feature.end) = reflect.range(feature.start, feature.end);
        feature.ty = feature.ty.flipped();
        feature.flags.swap_clips();
    }
    for info in sequences.values_mut() {
        for gap in &mut info.gaps {
            gap.ref_start = reflect.point(gap.ref_start);
            gap.ref_end = reflect.point(gap.ref_end);
        }
        if let Some(cds) = info.cds.as_mut() {
            (cds.start, cds.end) = reflect.range(cds.start, cds.end);
        }
    }
    for info in homologies.values_mut() {
        info.strand = info.strand.complement();
        for gap in &mut info.gaps {
            gap.ref_start = reflect.point(gap.ref_start);
            gap.ref_end = reflect.point(gap.ref_end);
        }
    }
    log::debug!("Complemented {} features about {}..{}", features.len(), area.0, area.1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::feature::{CdsInfo, Feature, FeatureFlags, FeatureType, Handle};
    use crate::core::mapper::{GapBlock, Strand};
    use crate::core::store::ObjKey;

    #[test]
    fn test_reflection() {
        let r = Reflection::new((1, 1000));
        assert_eq!(r.point(1), 1000);
        assert_eq!(r.range(10, 20), (981, 991));
    }

    #[test]
    fn test_complement_feature_and_tables() {
        let key = ObjKey::new("Sequence", "s");
        let mut features = UnsortedFeatures::new();
        features.push(Feature::new(FeatureType::forward(FeatureKind::Master), 1, 1000, key.clone(), key.clone()));
        features.push(
            Feature::new(FeatureType::forward(FeatureKind::Exon), 10, 20, key.clone(), key.clone())
                .with_flags(FeatureFlags::CLIPPED_TOP),
        );
        let mut sequences = Table::new();
        sequences.push(SequenceInfo {
            gaps: vec![GapBlock { local_start: 1, local_end: 5, ref_start: 10, ref_end: 14 }],
            cds: Some(CdsInfo { start: 10, end: 20, cds_only: false }),
            ..SequenceInfo::default()
        });
        let mut homologies = Table::new();

        complement_strands(&mut features, &mut sequences, &mut homologies, (1, 1000));

        let master = features.get(0).unwrap();
        assert_eq!((master.start, master.end, master.strand()), (1, 1000, Strand::Plus));
        let exon = features.get(1).unwrap();
        assert_eq!((exon.start, exon.end, exon.strand()), (981, 991, Strand::Minus));
        assert!(exon.flags.contains(FeatureFlags::CLIPPED_BOTTOM));

        let info = sequences.get(SeqId::from_index(0)).unwrap();
        assert_eq!(info.gaps[0].ref_start, 991);
        assert_eq!(info.cds, Some(CdsInfo { start: 981, end: 991, cds_only: false }));
    }
}

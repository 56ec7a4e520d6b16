//! Property-based tests for canonical ordering and self-homology removal
//!
//! **Property 8: sorting yields canonical order with exact type bounds**
//! **Property 9: self-homology removal treats both strands alike**

use fast_smap::convert::flip::Reflection;
use fast_smap::convert::self_homol::remove_self_homologies;
use fast_smap::convert::sort::compare_features;
use fast_smap::convert::{Feature, FeatureKind, FeatureType, PrefixStripping, Table, UnsortedFeatures};
use fast_smap::core::{ObjKey, Strand};
use proptest::prelude::*;
use std::cmp::Ordering;

const KINDS: [FeatureKind; 6] = [
    FeatureKind::Sequence,
    FeatureKind::Cds,
    FeatureKind::Exon,
    FeatureKind::Intron,
    FeatureKind::Homol,
    FeatureKind::Visible,
];

fn feature_strategy() -> impl Strategy<Value = Feature> {
    (0..KINDS.len(), any::<bool>(), 1i64..1000, 0i64..200, 0usize..3).prop_map(|(kind, minus, start, len, name)| {
        let strand = if minus { Strand::Minus } else { Strand::Plus };
        let key = ObjKey::new("Sequence", format!("obj{}", name));
        Feature::new(FeatureType::new(KINDS[kind], strand), start, start + len, key.clone(), key)
    })
}

/// CDS owned by `gene{n}` or a homology to `WP:gene{n}`
fn self_match_strategy() -> impl Strategy<Value = Feature> {
    (any::<bool>(), any::<bool>(), 0usize..3, 1i64..2000, 0i64..500).prop_map(|(is_cds, minus, gene, start, len)| {
        let strand = if minus { Strand::Minus } else { Strand::Plus };
        let clone = ObjKey::new("Sequence", "clone");
        if is_cds {
            let key = ObjKey::new("CDS", format!("gene{}", gene));
            Feature::new(FeatureType::new(FeatureKind::Cds, strand), start, start + len, key.clone(), key.clone())
                .with_parent(key)
        } else {
            let key = ObjKey::new("Protein", format!("WP:gene{}", gene));
            Feature::new(FeatureType::new(FeatureKind::Homol, strand), start, start + len, key, clone.clone())
                .with_parent(clone)
        }
    })
}

fn survivors(features: Vec<Feature>) -> usize {
    let empty = Table::new();
    let sorted = UnsortedFeatures::from_vec(features).sort(&empty);
    remove_self_homologies(sorted, &PrefixStripping).sort(&empty).len()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_sorted_with_exact_bounds(features in prop::collection::vec(feature_strategy(), 0..60)) {
        let empty = Table::new();
        let sorted = UnsortedFeatures::from_vec(features.clone()).sort(&empty);
        prop_assert_eq!(sorted.len(), features.len());
        for pair in sorted.as_slice().windows(2) {
            prop_assert_ne!(compare_features(&pair[0], &pair[1], &empty), Ordering::Greater);
        }

        for kind in KINDS {
            for strand in [Strand::Plus, Strand::Minus] {
                let ty = FeatureType::new(kind, strand);
                let expected = features.iter().filter(|f| f.ty == ty).count();
                let slice = sorted.of_type(ty);
                prop_assert_eq!(slice.len(), expected);
                prop_assert!(slice.iter().all(|f| f.ty == ty));
            }
        }
    }

    #[test]
    fn prop_self_homology_strand_symmetric(features in prop::collection::vec(self_match_strategy(), 0..40)) {
        let reflect = Reflection::new((1, 3000));
        let mirrored: Vec<Feature> = features
            .iter()
            .map(|f| {
                let mut m = f.clone();
                (m.start, m.end) = reflect.range(f.start, f.end);
                m.ty = f.ty.flipped();
                m
            })
            .collect();
        prop_assert_eq!(survivors(features), survivors(mirrored));
    }
}

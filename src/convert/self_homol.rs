//! Self-homology suppression
//!
//! A CDS built from a homology, such as a gene model derived from a protein
//! alignment, matches its own source object. Such homologies are removed
//! when a CDS on the same strand contains them and belongs to the object
//! the match names.

use crate::convert::feature::{FeatureFlags, FeatureKind, FeatureType};
use crate::convert::sort::{SortedFeatures, UnsortedFeatures};
use crate::core::mapper::Strand;
use std::collections::HashMap;

/// Maps a match object name to the name of the object it was built for
pub trait SelfMatchNaming {
    fn source_name<'n>(&self, match_name: &'n str) -> &'n str;
}

/// Drops a `source:` prefix, `"WP:CE01234"` names `"CE01234"`
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixStripping;

impl SelfMatchNaming for PrefixStripping {
    fn source_name<'n>(&self, match_name: &'n str) -> &'n str {
        match match_name.find(':') {
            Some(i) => &match_name[i + 1..],
            None => match_name,
        }
    }
}

/// Tombstone every homology redundant with a CDS on its strand
pub fn remove_self_homologies(features: SortedFeatures, naming: &dyn SelfMatchNaming) -> UnsortedFeatures {
    let mut doomed = Vec::new();
    for strand in [Strand::Plus, Strand::Minus] {
        let mut cds_by_name: HashMap<&str, Vec<(i64, i64)>> = HashMap::new();
        for cds in features.of_type(FeatureType::new(FeatureKind::Cds, strand)) {
            let owner = cds.parent.as_ref().unwrap_or(&cds.key);
            cds_by_name.entry(owner.name.as_str()).or_default().push((cds.start, cds.end));
        }
        if cds_by_name.is_empty() {
            continue;
        }
        let range = features.bounds(FeatureType::new(FeatureKind::Homol, strand));
        for (index, homol) in features.as_slice()[range.clone()].iter().enumerate() {
            let name = naming.source_name(&homol.key.name);
            let redundant = cds_by_name
                .get(name)
                .map_or(false, |spans| spans.iter().any(|&(s, e)| s <= homol.start && homol.end <= e));
            if redundant {
                doomed.push(range.start + index);
            }
        }
    }

    if !doomed.is_empty() {
        log::debug!("Removing {} self-homologies", doomed.len());
    }
    let mut features = features.into_unsorted();
    for index in doomed {
        if let Some(feature) = features.get_mut(index) {
            feature.flags.insert(FeatureFlags::DELETED);
        }
    }
    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::feature::{Feature, Table};
    use crate::core::store::ObjKey;

    fn cds(name: &str, strand: Strand, start: i64, end: i64) -> Feature {
        let key = ObjKey::new("CDS", name);
        Feature::new(FeatureType::new(FeatureKind::Cds, strand), start, end, key.clone(), key.clone())
            .with_parent(key)
    }

    fn homol(target: &str, strand: Strand, start: i64, end: i64) -> Feature {
        Feature::new(
            FeatureType::new(FeatureKind::Homol, strand),
            start,
            end,
            ObjKey::new("Protein", target),
            ObjKey::new("Sequence", "clone"),
        )
    }

    #[test]
    fn test_prefix_stripping() {
        assert_eq!(PrefixStripping.source_name("WP:CE01234"), "CE01234");
        assert_eq!(PrefixStripping.source_name("a:b:c"), "b:c");
        assert_eq!(PrefixStripping.source_name("plain"), "plain");
    }

    #[test]
    fn test_removes_contained_self_match() {
        let mut features = UnsortedFeatures::new();
        features.push(cds("gene1", Strand::Plus, 100, 900));
        features.push(homol("WP:gene1", Strand::Plus, 200, 300));
        features.push(homol("WP:gene1", Strand::Plus, 50, 300));
        features.push(homol("WP:other", Strand::Plus, 200, 300));
        features.push(homol("WP:gene1", Strand::Minus, 200, 300));
        let sorted = features.sort(&Table::new());

        let kept = remove_self_homologies(sorted, &PrefixStripping).sort(&Table::new());
        let homols: Vec<(&str, Strand, i64)> = kept
            .iter()
            .filter(|f| f.kind() == FeatureKind::Homol)
            .map(|f| (f.key.name.as_str(), f.strand(), f.start))
            .collect();
        assert_eq!(
            homols,
            vec![
                ("WP:gene1", Strand::Plus, 50),
                ("WP:other", Strand::Plus, 200),
                ("WP:gene1", Strand::Minus, 200),
            ]
        );
    }
}

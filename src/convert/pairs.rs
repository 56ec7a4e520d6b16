//! Paired-read joining
//!
//! Reads from the two ends of one insert name each other with
//! `Paired_read`. Every homology to such a read is registered here; each
//! pair record keeps the reference span of its 5' and 3' member. Once both
//! are known a dashed HOMOL_GAP feature joins the ends that face each other.

use crate::convert::feature::{Feature, FeatureFlags, FeatureKind, FeatureType, HomolId, Payload};
use crate::core::error::Diagnostic;
use crate::core::mapper::Strand;
use crate::core::store::{AceObject, AnnotationStore, ObjKey};
use std::collections::HashMap;

/// Which end of the insert a read comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadRole {
    FivePrime,
    ThreePrime,
}

impl ReadRole {
    pub fn mate(self) -> ReadRole {
        match self {
            ReadRole::FivePrime => ReadRole::ThreePrime,
            ReadRole::ThreePrime => ReadRole::FivePrime,
        }
    }
}

/// Role of a read: `EST_5`/`EST_3` tags, else the name suffix
pub fn read_role(object: Option<&AceObject>, name: &str) -> Option<ReadRole> {
    if let Some(object) = object {
        if object.has_tag("EST_5") {
            return Some(ReadRole::FivePrime);
        }
        if object.has_tag("EST_3") {
            return Some(ReadRole::ThreePrime);
        }
    }
    if name.ends_with("/5") || name.ends_with(".5") || name.ends_with("5'") {
        Some(ReadRole::FivePrime)
    } else if name.ends_with("/3") || name.ends_with(".3") || name.ends_with("3'") {
        Some(ReadRole::ThreePrime)
    } else {
        None
    }
}

/// Reference position of a read facing its mate
///
/// `strand` is the orientation of the insert, the strand of its 5' read:
/// the 5' read faces downstream, the 3' read upstream.
pub fn near_end(strand: Strand, role: ReadRole, span: (i64, i64)) -> i64 {
    match (strand, role) {
        (Strand::Plus, ReadRole::FivePrime) | (Strand::Minus, ReadRole::ThreePrime) => span.1,
        (Strand::Plus, ReadRole::ThreePrime) | (Strand::Minus, ReadRole::FivePrime) => span.0,
    }
}

#[derive(Debug, Clone)]
struct ReadEnd {
    read: ObjKey,
    source: ObjKey,
    strand: Strand,
    /// Union of the read's blocks
    span: (i64, i64),
    first_homol: HomolId,
}

impl ReadEnd {
    /// Fold in another block of the same read
    fn extend(&mut self, range: (i64, i64)) {
        self.span = (self.span.0.min(range.0), self.span.1.max(range.1));
    }
}

#[derive(Debug, Clone, Default)]
struct PairRecord {
    five: Option<ReadEnd>,
    three: Option<ReadEnd>,
}

/// Paired reads seen during one conversion
#[derive(Debug, Clone, Default)]
pub struct PairIndex {
    records: Vec<PairRecord>,
    /// Unordered pair of read names
    by_names: HashMap<(String, String), usize>,
}

impl PairIndex {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Register one homology block to `read`
    ///
    /// Returns the pair cluster id, or `None` when the read is not paired
    /// or its role cannot be told.
    pub fn register(
        &mut self,
        store: &dyn AnnotationStore,
        read: &ObjKey,
        source: &ObjKey,
        strand: Strand,
        range: (i64, i64),
        homol: HomolId,
    ) -> Option<u32> {
        let object = store.object(read);
        let mate = object
            .and_then(|o| o.first_tagged("Paired_read"))
            .and_then(|mut f| f.next::<&str>().found())?;
        let role = read_role(object, &read.name).or_else(|| {
            let mate_object = store.object(&ObjKey::new(read.class.clone(), mate));
            read_role(mate_object, mate).map(ReadRole::mate)
        });
        let Some(role) = role else {
            log::debug!("{}: paired with {} but neither is marked 5' or 3'", read, mate);
            return None;
        };

        let names = if read.name.as_str() <= mate {
            (read.name.clone(), mate.to_string())
        } else {
            (mate.to_string(), read.name.clone())
        };
        let index = *self.by_names.entry(names).or_insert_with(|| {
            self.records.push(PairRecord::default());
            self.records.len() - 1
        });
        let record = &mut self.records[index];
        let slot = match role {
            ReadRole::FivePrime => &mut record.five,
            ReadRole::ThreePrime => &mut record.three,
        };

        if let Some(end) = slot.as_mut() {
            if end.read == *read && end.strand == strand {
                end.extend(range);
            } else {
                log::debug!(
                    "{}: block on {} ignored for pairing, {} {} already holds this end",
                    read,
                    strand,
                    end.read,
                    end.strand
                );
            }
        } else {
            *slot = Some(ReadEnd {
                read: read.clone(),
                source: source.clone(),
                strand,
                span: range,
                first_homol: homol,
            });
        }
        Some(index as u32)
    }

    /// Gap features for every pair with both ends placed
    pub fn link(&self) -> (Vec<Feature>, Vec<Diagnostic>) {
        let mut features = Vec::new();
        let mut diagnostics = Vec::new();
        for record in &self.records {
            let (Some(five), Some(three)) = (&record.five, &record.three) else {
                continue;
            };
            let near5 = near_end(five.strand, ReadRole::FivePrime, five.span);
            let near3 = near_end(five.strand, ReadRole::ThreePrime, three.span);
            let crossed = match five.strand {
                Strand::Plus => near5 > near3,
                Strand::Minus => near5 < near3,
            };
            if crossed {
                diagnostics.push(Diagnostic::CrossedPairEnds {
                    five_prime: five.read.name.clone(),
                    three_prime: three.read.name.clone(),
                    near5,
                    near3,
                });
                continue;
            }
            let ty = FeatureType::new(FeatureKind::HomolGap, five.strand);
            let (start, end) = (near5.min(near3), near5.max(near3));
            features.push(
                Feature::new(ty, start, end, five.read.clone(), five.source.clone())
                    .with_parent(three.read.clone())
                    .with_subfeature("Paired_read")
                    .with_flags(FeatureFlags::DASHED | FeatureFlags::TWO_PARENT_CLUSTER)
                    .with_payload(Payload::Homology(five.first_homol)),
            );
        }
        (features, diagnostics)
    }
}

//! Intron reconciliation
//!
//! The same intron often arrives several times: implied by a transcript's
//! exons and confirmed by EST or cDNA evidence. Each run of INTRON features
//! with identical coordinates on one strand is reduced to a single shared
//! SequenceInfo holding the union of their evidence.

use crate::convert::feature::{FeatureFlags, FeatureKind, FeatureType, Payload, SeqId, SequenceInfo, Table};
use crate::convert::sort::{SortedFeatures, UnsortedFeatures};
use crate::core::error::{ConversionError, ConversionResult};
use crate::core::mapper::Strand;
use std::ops::Range;

/// Maximal runs of equal (start, end) inside `range`, length two or more
fn duplicate_runs(features: &SortedFeatures, range: Range<usize>) -> Vec<Range<usize>> {
    let slice = features.as_slice();
    let mut runs = Vec::new();
    let mut i = range.start;
    while i < range.end {
        let mut j = i + 1;
        while j < range.end && slice[j].start == slice[i].start && slice[j].end == slice[i].end {
            j += 1;
        }
        if j - i > 1 {
            runs.push(i..j);
        }
        i = j;
    }
    runs
}

/// Union of the evidence of several intron records
fn merge_infos(infos: &[&SequenceInfo]) -> SequenceInfo {
    let mut merged = SequenceInfo {
        method: infos.iter().find_map(|i| i.method.clone()),
        score: infos.iter().find_map(|i| i.score),
        ..SequenceInfo::default()
    };
    for info in infos {
        merged.confirmed = merged.confirmed.union(info.confirmed);
        for evidence in &info.evidence {
            merged.add_evidence(evidence.clone());
        }
    }
    merged.flags.merged = true;
    merged
}

/// Merge duplicate introns
///
/// When any member of a run hangs off a parent transcript only the
/// parent-linked members survive; otherwise all do. Survivors share the
/// merged record. A run whose members already share one record is left
/// alone, so a second pass changes nothing.
pub fn reconcile_introns(
    features: SortedFeatures,
    sequences: &mut Table<SeqId, SequenceInfo>,
) -> ConversionResult<UnsortedFeatures> {
    let mut runs = Vec::new();
    for strand in [Strand::Plus, Strand::Minus] {
        runs.extend(duplicate_runs(&features, features.bounds(FeatureType::new(FeatureKind::Intron, strand))));
    }

    let mut plan: Vec<(Range<usize>, Option<SeqId>, bool)> = Vec::with_capacity(runs.len());
    for run in runs {
        let members = &features.as_slice()[run.clone()];
        let mut handles = Vec::with_capacity(members.len());
        for intron in members {
            let id = intron.sequence_id().ok_or_else(|| {
                ConversionError::Invariant(format!("intron {}..{} has no sequence record", intron.start, intron.end))
            })?;
            handles.push(id);
        }
        let any_parent = members.iter().any(|f| f.parent.is_some());
        let shared = handles.windows(2).all(|w| w[0] == w[1]);
        if shared {
            plan.push((run, None, any_parent));
            continue;
        }
        let infos = handles
            .iter()
            .map(|&id| sequences.get(id))
            .collect::<ConversionResult<Vec<_>>>()?;
        let merged = merge_infos(&infos);
        plan.push((run, Some(sequences.push(merged)), any_parent));
    }

    let mut merged_runs = 0usize;
    let mut features = features.into_unsorted();
    for (run, merged, any_parent) in plan {
        merged_runs += usize::from(merged.is_some());
        for index in run {
            let Some(intron) = features.get_mut(index) else {
                continue;
            };
            if any_parent && intron.parent.is_none() {
                intron.flags.insert(FeatureFlags::DELETED);
            } else if let Some(id) = merged {
                intron.payload = Payload::Sequence(id);
            }
        }
    }
    if merged_runs > 0 {
        log::debug!("Merged {} duplicate intron runs", merged_runs);
    }
    Ok(features)
}

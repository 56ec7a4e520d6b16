//! Coding regions
//!
//! A `CDS` row gives the coding range in spliced (exon-concatenated)
//! coordinates; without values it covers every exon. Phases follow the
//! codon bases carried across exon boundaries:
//!
//! ```text
//! phase   = codon bases already read before the exon's first base
//! skip    = (3 - phase) % 3        bases that finish the carried codon
//! trailing = (len - skip) mod 3    bases left over, the next exon's phase
//! ```

use crate::convert::context::ConversionContext;
use crate::convert::exons::ExonLayout;
use crate::convert::feature::{CdsInfo, Evidence, EvidenceKind, FeatureKind, Payload};
use crate::core::error::{ConversionResult, Diagnostic};
use crate::core::mapper::intersect_intervals;
use crate::core::store::{AceObject, FieldError};

/// Bases at the start of an exon that complete the codon carried into it
#[inline]
pub fn skip_bases(phase: u8) -> i64 {
    (3 - i64::from(phase)) % 3
}

/// Bases of an incomplete codon left at the end of an exon
#[inline]
pub fn trailing_bases(len: i64, phase: u8) -> u8 {
    (len - skip_bases(phase)).rem_euclid(3) as u8
}

/// Phase of each exon over the coding range `cds` (local coordinates)
///
/// `start_skip` leading bases of the coding range belong to an incomplete
/// first codon. Non-coding exons get `None`.
///
/// Phases count codon bases already read, not bases to skip: an exon of
/// phase `p` skips `skip_bases(p) = (3 - p) % 3` bases, so `Start_not_found n`
/// (skip `n - 1`) gives the first exon phase `(3 - (n - 1)) % 3`. The next
/// phase is `(len - skip) mod 3`, which equals `(len + p) mod 3`.
pub fn coding_phases(layout: &ExonLayout, cds: (i64, i64), start_skip: u8) -> Vec<Option<u8>> {
    let mut phase = ((3 - i64::from(start_skip)) % 3) as u8;
    layout
        .blocks
        .iter()
        .map(|&(s, e)| {
            let (cs, ce) = intersect_intervals(s, e, cds.0, cds.1)?;
            let this = phase;
            phase = trailing_bases(ce - cs + 1, this);
            Some(this)
        })
        .collect()
}

/// The range a `CDS` row covers, spliced coordinates
fn read_cds_range(ctx: &mut ConversionContext<'_>, object: &AceObject, spliced_len: i64) -> Option<(i64, i64)> {
    let mut fields = object.first_tagged("CDS")?;
    let position = fields.position();
    let first = fields.next::<i64>().optional();
    let second = fields.next::<i64>().optional();
    match (first, second) {
        (Ok(Some(c1)), Ok(Some(c2))) => Some((c1, c2)),
        (Ok(None), _) => Some((1, spliced_len)),
        (Ok(Some(_)), Ok(None)) => {
            ctx.malformed(
                object.key(),
                "CDS",
                FieldError::Missing { what: "integer", position: position + 1 },
            );
            None
        }
        (Err(e), _) | (_, Err(e)) => {
            ctx.malformed(object.key(), "CDS", e);
            None
        }
    }
}

/// Emit the CDS feature of the current anchor
///
/// Returns the coding range in local coordinates when one was recorded.
pub fn convert_cds(
    ctx: &mut ConversionContext<'_>,
    object: &AceObject,
    layout: &ExonLayout,
) -> ConversionResult<Option<(i64, i64)>> {
    let Some((c1, c2)) = read_cds_range(ctx, object, layout.spliced_len()) else {
        return Ok(None);
    };
    if c1 > c2 {
        ctx.report(Diagnostic::ExonOrientation { object: object.key().clone(), what: "CDS", x1: c1, x2: c2 });
        return Ok(None);
    }
    let (Some(l1), Some(l2)) = (layout.spliced_to_local(c1), layout.spliced_to_local(c2)) else {
        ctx.report(Diagnostic::CdsOutsideExons { object: object.key().clone(), c1, c2 });
        return Ok(None);
    };

    let Some(anchor_info) = ctx.current()?.anchor_info else {
        return Ok(None);
    };
    let cds_only = object.has_tag("CDS_only");
    let placed = ctx.emit_local(
        FeatureKind::Cds,
        (l1, l2),
        object.key().clone(),
        false,
        Payload::Sequence(anchor_info),
    )?;

    if let Some(index) = placed {
        let (start, end) = match ctx.features.get(index) {
            Some(cds) => (cds.start, cds.end),
            None => return Ok(Some((l1, l2))),
        };
        let info = ctx.sequences.get_mut(anchor_info)?;
        info.cds = Some(CdsInfo { start, end, cds_only });
        info.flags.coding = true;
        mark_utr_introns(ctx, (start, end))?;
    } else {
        ctx.sequences.get_mut(anchor_info)?.flags.coding = true;
    }
    Ok(Some((l1, l2)))
}

/// Introns of the anchor lying wholly outside the coding range are UTR introns
fn mark_utr_introns(ctx: &mut ConversionContext<'_>, cds: (i64, i64)) -> ConversionResult<()> {
    let key = ctx.current()?.key.clone();
    let introns = ctx.current()?.intron_features.clone();
    for index in introns {
        let Some(intron) = ctx.features.get(index) else {
            continue;
        };
        if intron.end >= cds.0 && intron.start <= cds.1 {
            continue;
        }
        if let Some(id) = intron.sequence_id() {
            ctx.sequences.get_mut(id)?.add_evidence(Evidence {
                kind: EvidenceKind::Utr,
                supporting: Some(key.clone()),
            });
        }
    }
    Ok(())
}

/// `Start_not_found [n]`: the coding range opens `n - 1` bases into a codon
pub fn convert_start_not_found(ctx: &mut ConversionContext<'_>, object: &AceObject) -> ConversionResult<()> {
    let Some(mut fields) = object.first_tagged("Start_not_found") else {
        return Ok(());
    };
    let position = fields.position();
    let n = match fields.next::<i64>().optional() {
        Ok(n) => n.unwrap_or(1),
        Err(e) => {
            ctx.malformed(object.key(), "Start_not_found", e);
            return Ok(());
        }
    };
    if !(1..=3).contains(&n) {
        ctx.malformed(
            object.key(),
            "Start_not_found",
            FieldError::Mismatch { expected: "frame 1..3", found: n.to_string(), position },
        );
        return Ok(());
    }
    if let Some(id) = ctx.current()?.anchor_info {
        ctx.sequences.get_mut(id)?.start_not_found = (n - 1) as u8;
    }
    Ok(())
}

pub fn convert_end_not_found(ctx: &mut ConversionContext<'_>, object: &AceObject) -> ConversionResult<()> {
    if !object.has_tag("End_not_found") {
        return Ok(());
    }
    if let Some(id) = ctx.current()?.anchor_info {
        ctx.sequences.get_mut(id)?.end_not_found = true;
    }
    Ok(())
}

/// Rewrite the phase of every coding exon of the current anchor
pub fn resolve_phases(
    ctx: &mut ConversionContext<'_>,
    layout: &ExonLayout,
    cds: (i64, i64),
) -> ConversionResult<()> {
    let start_skip = match ctx.current()?.anchor_info {
        Some(id) => ctx.sequences.get(id)?.start_not_found,
        None => 0,
    };
    let phases = coding_phases(layout, cds, start_skip);
    let exons = ctx.current()?.exon_features.clone();
    for (slot, phase) in exons.into_iter().zip(phases) {
        if let (Some(index), Some(phase)) = (slot, phase) {
            if let Some(exon) = ctx.features.get_mut(index) {
                exon.payload = Payload::Phase(phase);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_and_trailing() {
        assert_eq!(skip_bases(0), 0);
        assert_eq!(skip_bases(1), 2);
        assert_eq!(skip_bases(2), 1);
        assert_eq!(trailing_bases(100, 0), 1);
        assert_eq!(trailing_bases(81, 1), 1);
        assert_eq!(trailing_bases(2, 1), 0);
    }

    #[test]
    fn test_coding_phases_tile() {
        let layout = ExonLayout { blocks: vec![(1, 100), (150, 230), (300, 310)] };
        let phases = coding_phases(&layout, (1, 310), 0);
        assert_eq!(phases, vec![Some(0), Some(1), Some(1)]);
    }

    #[test]
    fn test_coding_phases_skip_utr() {
        let layout = ExonLayout { blocks: vec![(1, 50), (100, 200), (300, 400)] };
        // CDS opens inside the second exon and stops inside it
        let phases = coding_phases(&layout, (120, 180), 0);
        assert_eq!(phases, vec![None, Some(0), None]);
    }

    #[test]
    fn test_coding_phases_start_not_found() {
        let layout = ExonLayout { blocks: vec![(1, 10), (20, 30)] };
        // Two leading bases finish a codon: the first exon carries one base in
        let phases = coding_phases(&layout, (1, 30), 2);
        assert_eq!(phases[0], Some(1));
        // 10 bases, 2 skipped, 8 left: trailing 2
        assert_eq!(phases[1], Some(2));
    }
}

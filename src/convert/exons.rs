//! Exon and intron synthesis
//!
//! `Source_Exons` blocks become EXON features, each carrying its
//! transcript-order phase. Any gap between consecutive exons wider than
//! [`ABUTMENT_TOLERANCE`] becomes an INTRON spanning exactly the bases
//! between them.

use crate::convert::context::ConversionContext;
use crate::convert::feature::{FeatureFlags, FeatureKind, Payload, SequenceInfo};
use crate::core::error::{ConversionResult, Diagnostic};
use crate::core::store::AceObject;

/// Exons whose gap is at most this many bases abut: no intron between them
pub const ABUTMENT_TOLERANCE: i64 = 1;

/// Exon blocks of one object, local coordinates, sorted by start
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExonLayout {
    pub blocks: Vec<(i64, i64)>,
}

impl ExonLayout {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total exonic length
    pub fn spliced_len(&self) -> i64 {
        self.blocks.iter().map(|(s, e)| e - s + 1).sum()
    }

    /// Local position of 1-based spliced position `pos`
    pub fn spliced_to_local(&self, pos: i64) -> Option<i64> {
        if pos < 1 {
            return None;
        }
        let mut remaining = pos;
        for &(s, e) in &self.blocks {
            let len = e - s + 1;
            if remaining <= len {
                return Some(s + remaining - 1);
            }
            remaining -= len;
        }
        None
    }
}

/// Read and validate `Source_Exons x1 x2` rows
///
/// Inverted blocks are reported and skipped.
pub fn read_exons(ctx: &mut ConversionContext<'_>, object: &AceObject) -> ExonLayout {
    let mut blocks = Vec::new();
    for mut fields in object.tagged("Source_Exons") {
        match fields.take::<(i64, i64)>() {
            Ok((x1, x2)) if x1 > x2 => ctx.report(Diagnostic::ExonOrientation {
                object: object.key().clone(),
                what: "exon",
                x1,
                x2,
            }),
            Ok(block) => blocks.push(block),
            Err(e) => ctx.malformed(object.key(), "Source_Exons", e),
        }
    }
    blocks.sort_unstable();
    ExonLayout { blocks }
}

/// Emit EXON and INTRON features for the current anchor
pub fn convert_exons(ctx: &mut ConversionContext<'_>, layout: &ExonLayout) -> ConversionResult<()> {
    let key = ctx.current()?.key.clone();
    let method = match ctx.current()?.anchor_info {
        Some(id) => ctx.sequences.get(id)?.method.clone(),
        None => None,
    };

    let mut exon_features = Vec::with_capacity(layout.blocks.len());
    let mut intron_features = Vec::new();
    let mut spliced = 0i64;
    let mut prev_end: Option<i64> = None;
    for &(x1, x2) in &layout.blocks {
        if let Some(pe) = prev_end {
            if x1 - pe > ABUTMENT_TOLERANCE {
                if let Some(index) = emit_intron(ctx, pe, x1, method.clone())? {
                    intron_features.push(index);
                }
            }
        }
        let phase = (spliced % 3) as u8;
        exon_features.push(ctx.emit_local(FeatureKind::Exon, (x1, x2), key.clone(), false, Payload::Phase(phase))?);
        spliced += x2 - x1 + 1;
        prev_end = Some(prev_end.map_or(x2, |pe| pe.max(x2)));
    }

    if let Some(id) = ctx.current()?.anchor_info {
        ctx.sequences.get_mut(id)?.flags.has_exons = !layout.is_empty();
    }
    let current = ctx.current_mut()?;
    current.exon_features = exon_features;
    current.intron_features = intron_features;
    Ok(())
}

/// Intron between the exon ending at `prev_end` and the one starting at `next_start`
///
/// The range is mapped from exon end to exon start and then pulled in one
/// base at each end that was not clipped. A range that inverts collapses
/// onto its start.
fn emit_intron(
    ctx: &mut ConversionContext<'_>,
    prev_end: i64,
    next_start: i64,
    method: Option<String>,
) -> ConversionResult<Option<usize>> {
    let key = ctx.current()?.key.clone();
    let Some(index) = ctx.emit_local(FeatureKind::Intron, (prev_end, next_start), key, false, Payload::None)? else {
        return Ok(None);
    };
    let info = ctx.sequences.push(SequenceInfo::with_method(method));
    if let Some(intron) = ctx.features.get_mut(index) {
        if !intron.flags.contains(FeatureFlags::CLIPPED_TOP) {
            intron.start += 1;
        }
        if !intron.flags.contains(FeatureFlags::CLIPPED_BOTTOM) {
            intron.end -= 1;
        }
        if intron.end < intron.start {
            intron.end = intron.start;
        }
        intron.payload = Payload::Sequence(info);
    }
    Ok(Some(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spliced_to_local() {
        let layout = ExonLayout { blocks: vec![(1, 100), (150, 230)] };
        assert_eq!(layout.spliced_len(), 181);
        assert_eq!(layout.spliced_to_local(1), Some(1));
        assert_eq!(layout.spliced_to_local(100), Some(100));
        assert_eq!(layout.spliced_to_local(101), Some(150));
        assert_eq!(layout.spliced_to_local(181), Some(230));
        assert_eq!(layout.spliced_to_local(182), None);
        assert_eq!(layout.spliced_to_local(0), None);
    }
}

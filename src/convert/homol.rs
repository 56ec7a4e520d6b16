//! Homology conversion
//!
//! Row layout:
//!
//! ```text
//! Homol <Kind> "match" "method" score x1 x2 m1 m2 [Align x m [len]] [Alignment_string "s"]
//! ```
//!
//! Rows repeating the same block prefix (kind, match, method, score, local
//! and matched range) belong to one block and contribute their `Align`
//! points to it. `x1..x2` is the local range on the annotated object,
//! `m1..m2` the range on the matched object; `m1 > m2` means the match runs
//! backwards.

use crate::convert::context::ConversionContext;
use crate::convert::feature::{
    AlignBlock, Feature, FeatureFlags, FeatureKind, FeatureType, HomolKind, HomologyInfo, Payload,
};
use crate::core::error::{ConversionResult, Diagnostic};
use crate::core::mapper::Strand;
use crate::core::method::Method;
use crate::core::store::{AceObject, FieldError, Fields, ObjKey, Value};
use std::collections::HashMap;

/// Tag on a match object requesting reverse display
pub const SHOW_IN_REVERSE: &str = "Show_in_reverse_orientation";

/// Class of objects that hold nothing but homologies
pub const HOMOL_DATA_CLASS: &str = "Homol_data";

/// Start of an ungapped sub-block inside a homology block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignPoint {
    pub x: i64,
    pub m: i64,
    /// Local bases covered; runs to the next point when absent
    pub len: Option<i64>,
}

/// One fully specified homology block of an object
#[derive(Debug, Clone, PartialEq)]
pub struct HomolBlock<'o> {
    pub kind: HomolKind,
    pub target: &'o str,
    pub method: &'o str,
    pub score: f64,
    pub local: (i64, i64),
    pub matched: (i64, i64),
    pub points: Vec<AlignPoint>,
    pub alignment: Option<&'o str>,
}

type BlockKey<'o> = (HomolKind, &'o str, &'o str, u64, (i64, i64), (i64, i64));

/// Trailing `Align` and `Alignment_string` entries of one row
fn read_trailer<'o>(fields: &mut Fields<'o>, block: &mut HomolBlock<'o>) -> Result<(), FieldError> {
    while !fields.is_exhausted() {
        if fields.accept("Align") {
            let (x, m) = fields.take::<(i64, i64)>()?;
            let len = match fields.peek() {
                Some(Value::Int(_)) => fields.next::<i64>().found(),
                _ => None,
            };
            block.points.push(AlignPoint { x, m, len });
        } else if fields.accept("Alignment_string") {
            let position = fields.position();
            block.alignment = Some(fields.next::<&str>().required("alignment string", position)?);
        } else {
            let position = fields.position();
            let found = fields.next::<&str>().found().unwrap_or("number").to_string();
            return Err(FieldError::Mismatch { expected: "Align or Alignment_string", found, position });
        }
    }
    Ok(())
}

fn read_row<'o>(fields: &mut Fields<'o>) -> Result<HomolBlock<'o>, FieldError> {
    let position = fields.position();
    let kind_tag = fields.word().ok_or(FieldError::Missing { what: "homology kind", position })?;
    let kind = HomolKind::from_tag(kind_tag).ok_or_else(|| FieldError::Mismatch {
        expected: "homology kind",
        found: kind_tag.to_string(),
        position,
    })?;
    let (target, method, score, x1, x2) = fields.take::<(&str, &str, f64, i64, i64)>()?;
    let (m1, m2) = fields.take::<(i64, i64)>()?;
    let mut block = HomolBlock {
        kind,
        target,
        method,
        score,
        local: (x1, x2),
        matched: (m1, m2),
        points: Vec::new(),
        alignment: None,
    };
    read_trailer(fields, &mut block)?;
    Ok(block)
}

/// Read every `Homol` row of an object, merging rows of the same block
pub fn read_homol_blocks<'o>(ctx: &mut ConversionContext<'_>, object: &'o AceObject) -> Vec<HomolBlock<'o>> {
    let mut blocks: Vec<HomolBlock<'o>> = Vec::new();
    let mut seen: HashMap<BlockKey<'o>, usize> = HashMap::new();
    for mut fields in object.tagged("Homol") {
        let row = match read_row(&mut fields) {
            Ok(row) => row,
            Err(e) => {
                ctx.malformed(object.key(), "Homol", e);
                continue;
            }
        };
        let key = (row.kind, row.target, row.method, row.score.to_bits(), row.local, row.matched);
        match seen.get(&key) {
            Some(&i) => {
                blocks[i].points.extend(row.points);
                if row.alignment.is_some() {
                    blocks[i].alignment = row.alignment;
                }
            }
            None => {
                seen.insert(key, blocks.len());
                blocks.push(row);
            }
        }
    }
    blocks
}

/// Ungapped sub-blocks `(local, matched)` of a block
///
/// `Err` carries the reason when the sub-blocks disagree with each other
/// or with the block.
pub fn sub_blocks(block: &HomolBlock<'_>) -> Result<Vec<((i64, i64), (i64, i64))>, String> {
    if block.points.is_empty() {
        return Ok(Vec::new());
    }
    let ratio = block.kind.ratio();
    let dir_x = if block.local.0 <= block.local.1 { 1 } else { -1 };
    let dir_m = if block.matched.0 <= block.matched.1 { 1 } else { -1 };
    let (lo, hi) = (block.local.0.min(block.local.1), block.local.0.max(block.local.1));

    let mut points = block.points.clone();
    points.sort_by_key(|p| dir_x * p.x);

    let mut subs = Vec::with_capacity(points.len());
    for (i, p) in points.iter().enumerate() {
        let next = points.get(i + 1);
        let (local_end, matched_end) = match p.len {
            Some(len) => (p.x + dir_x * (len - 1), p.m + dir_m * (len / ratio - 1)),
            None => match next {
                Some(n) => (n.x - dir_x, n.m - dir_m),
                None => (block.local.1, block.matched.1),
            },
        };
        let local_len = (local_end - p.x).abs() + 1;
        let matched_len = (matched_end - p.m).abs() + 1;
        if local_len != matched_len * ratio {
            return Err(format!(
                "sub-block at {} covers {} local bases against {} matched",
                p.x, local_len, matched_len
            ));
        }
        if p.x < lo || p.x > hi || local_end < lo || local_end > hi {
            return Err(format!("sub-block {}..{} lies outside the block", p.x, local_end));
        }
        subs.push(((p.x, local_end), (p.m, matched_end)));
    }
    Ok(subs)
}

/// Map sub-blocks onto the reference according to the method flags
fn map_gaps(
    ctx: &ConversionContext<'_>,
    source: &ObjKey,
    subs: &[((i64, i64), (i64, i64))],
    method: &Method,
    clipped: bool,
) -> Vec<AlignBlock> {
    if !method.map_gaps || (clipped && !method.allow_clipping) {
        return Vec::new();
    }
    subs.iter()
        .filter_map(|&(local, matched)| {
            let range = ctx.mapper.map(source, local).mapped()?;
            Some(AlignBlock { local, matched, ref_start: range.y1, ref_end: range.y2 })
        })
        .collect()
}

/// Emit a HOMOL feature for one block
fn convert_block(ctx: &mut ConversionContext<'_>, object: &AceObject, block: &HomolBlock<'_>) -> ConversionResult<()> {
    let Some(method) = ctx.method(block.method) else {
        return Ok(());
    };
    let source = object.key().clone();
    let (x1, x2) = block.local;
    let (m1, m2) = block.matched;

    let in_extent = ctx
        .mapper
        .extent(&source)
        .map_or(false, |(lo, hi)| x1.min(x2) >= lo && x1.max(x2) <= hi);
    if !in_extent {
        ctx.report(Diagnostic::HomolMapFailed {
            object: source,
            tag: block.kind.as_str().to_string(),
            method: method.name.clone(),
            target: block.target.to_string(),
            x1,
            x2,
            m1,
            m2,
        });
        return Ok(());
    }
    let Some(placed) = ctx.place(&source, (x1, x2)) else {
        return Ok(());
    };

    let subs = match sub_blocks(block) {
        Ok(subs) => subs,
        Err(reason) if !method.allow_misalign => {
            ctx.report(Diagnostic::InconsistentAlignment {
                object: source,
                target: block.target.to_string(),
                x1,
                x2,
                reason,
            });
            return Ok(());
        }
        Err(reason) => {
            log::debug!("{}: keeping misaligned homology to {}: {}", source, block.target, reason);
            Vec::new()
        }
    };
    let clipped = placed.flags.contains(FeatureFlags::CLIPPED_TOP)
        || placed.flags.contains(FeatureFlags::CLIPPED_BOTTOM);
    let gaps = map_gaps(ctx, &source, &subs, &method, clipped);

    let target = ObjKey::new(block.kind.match_class(), block.target);
    let mut strand = placed.strand.combine(Strand::of_range(m1, m2));
    let mut matched = block.matched;
    let mut flags = placed.flags;
    let store = ctx.store;
    if store.object(&target).map_or(false, |o| o.has_tag(SHOW_IN_REVERSE)) {
        strand = strand.complement();
        matched = (m2, m1);
        flags.insert(FeatureFlags::FLIPPED);
    }

    let (align_id, block_no) = ctx.next_block(&source, &target, &method.name);
    let id = ctx.homologies.push(HomologyInfo {
        kind: block.kind,
        method: method.name.clone(),
        score: Some(block.score),
        align_id,
        block: block_no,
        matched,
        strand,
        gaps,
        alignment: if method.export_string { block.alignment.map(str::to_string) } else { None },
        cluster: None,
    });
    if object.class() == HOMOL_DATA_CLASS {
        ctx.table_sourced.insert(id);
    }

    let ty = FeatureType::new(FeatureKind::Homol, strand);
    let feature = Feature::new(ty, placed.start, placed.end, target.clone(), source.clone())
        .with_parent(source.clone())
        .with_subfeature(block.kind.as_str())
        .with_flags(flags)
        .with_payload(Payload::Homology(id));
    ctx.push(feature);

    if method.join_blocks {
        if let Some(cluster) = ctx.pairs.register(store, &target, &source, strand, (placed.start, placed.end), id) {
            ctx.homologies.get_mut(id)?.cluster = Some(cluster);
        }
    }
    Ok(())
}

/// Convert every homology block of an object
pub fn convert_homols(ctx: &mut ConversionContext<'_>, object: &AceObject) -> ConversionResult<()> {
    for block in read_homol_blocks(ctx, object) {
        convert_block(ctx, object, &block)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(kind: HomolKind, local: (i64, i64), matched: (i64, i64), points: Vec<AlignPoint>) -> HomolBlock<'static> {
        HomolBlock {
            kind,
            target: "m",
            method: "blat",
            score: 1.0,
            local,
            matched,
            points,
            alignment: None,
        }
    }

    #[test]
    fn test_sub_blocks_run_to_next_point() {
        let b = block(
            HomolKind::Dna,
            (101, 200),
            (1, 100),
            vec![AlignPoint { x: 101, m: 1, len: None }, AlignPoint { x: 151, m: 51, len: None }],
        );
        let subs = sub_blocks(&b).unwrap();
        assert_eq!(subs, vec![((101, 150), (1, 50)), ((151, 200), (51, 100))]);
    }

    #[test]
    fn test_sub_blocks_reverse_match() {
        let b = block(
            HomolKind::Dna,
            (1, 20),
            (20, 1),
            vec![AlignPoint { x: 1, m: 20, len: Some(10) }, AlignPoint { x: 11, m: 10, len: Some(10) }],
        );
        let subs = sub_blocks(&b).unwrap();
        assert_eq!(subs, vec![((1, 10), (20, 11)), ((11, 20), (10, 1))]);
    }

    #[test]
    fn test_sub_blocks_peptide_ratio() {
        let b = block(HomolKind::Pep, (1, 30), (1, 10), vec![AlignPoint { x: 1, m: 1, len: Some(30) }]);
        assert_eq!(sub_blocks(&b).unwrap(), vec![((1, 30), (1, 10))]);
    }

    #[test]
    fn test_sub_blocks_inconsistent() {
        let b = block(
            HomolKind::Dna,
            (1, 100),
            (1, 100),
            vec![AlignPoint { x: 1, m: 1, len: None }, AlignPoint { x: 50, m: 60, len: None }],
        );
        assert!(sub_blocks(&b).is_err());
    }

    #[test]
    fn test_read_row_with_trailer() {
        let store = crate::core::ace::parse_ace_bytes(
            b"Sequence : s\nHomol DNA_homol \"est1\" \"blat\" 98.5 1 100 1 100 Align 1 1 Alignment_string \"100M\"\n",
        )
        .unwrap();
        use crate::core::store::AnnotationStore;
        let object = store.object(&ObjKey::new("Sequence", "s")).unwrap();
        let mut fields = object.first_tagged("Homol").unwrap();
        let row = read_row(&mut fields).unwrap();
        assert_eq!(row.kind, HomolKind::Dna);
        assert_eq!(row.target, "est1");
        assert_eq!(row.score, 98.5);
        assert_eq!(row.points, vec![AlignPoint { x: 1, m: 1, len: None }]);
        assert_eq!(row.alignment, Some("100M"));
    }

    #[test]
    fn test_read_row_unknown_kind() {
        let store =
            crate::core::ace::parse_ace_bytes(b"Sequence : s\nHomol Bogus_homol \"x\" \"m\" 1 1 2 1 2\n").unwrap();
        use crate::core::store::AnnotationStore;
        let object = store.object(&ObjKey::new("Sequence", "s")).unwrap();
        let mut fields = object.first_tagged("Homol").unwrap();
        assert!(matches!(read_row(&mut fields), Err(FieldError::Mismatch { .. })));
    }
}

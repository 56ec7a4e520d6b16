//! Per-object feature builder
//!
//! Decides whether an object needs an anchor feature and runs the tag
//! converters in a fixed order. Exon-driven converters and the simple tag
//! converters only run for anchored objects; homologies, generic features,
//! confirmed introns and splices are converted for every candidate.

use crate::convert::coding;
use crate::convert::context::ConversionContext;
use crate::convert::exons::{self, ExonLayout};
use crate::convert::feature::{Feature, FeatureInfo, FeatureKind, FeatureType, Payload, SequenceInfo};
use crate::convert::homol;
use crate::convert::tags;
use crate::core::error::ConversionResult;
use crate::core::mapper::Strand;
use crate::core::method::Method;
use crate::core::store::{AceObject, ObjKey};

/// Class of lightweight feature objects
pub const FEATURE_CLASS: &str = "Feature";

/// Emit the SEQUENCE or FEATURE_OBJ anchor of the current object
fn build_anchor(
    ctx: &mut ConversionContext<'_>,
    object: &AceObject,
    method: Option<&Method>,
    local: (i64, i64),
) -> ConversionResult<()> {
    let key = object.key().clone();
    let Some(placed) = ctx.place(&key, local) else {
        return Ok(());
    };

    let (kind, strand, payload, info) = if object.class() == FEATURE_CLASS {
        let strand = match method {
            Some(m) if m.strand_sensitive => placed.strand,
            _ => Strand::Plus,
        };
        let id = ctx.feature_infos.push(FeatureInfo {
            method: method.map(|m| m.name.clone()).unwrap_or_default(),
        });
        (FeatureKind::FeatureObj, strand, Payload::FeatureObj(id), None)
    } else {
        let score = object.first_tagged("Score").and_then(|mut f| f.next::<f64>().found());
        let id = ctx.sequences.push(SequenceInfo {
            method: method.map(|m| m.name.clone()),
            score,
            gaps: ctx.mapper.gap_blocks(&key),
            ..SequenceInfo::default()
        });
        (FeatureKind::Sequence, placed.strand, Payload::Sequence(id), Some(id))
    };

    let feature = Feature::new(FeatureType::new(kind, strand), placed.start, placed.end, key.clone(), key.clone())
        .with_flags(placed.flags)
        .with_payload(payload);
    let index = ctx.push(feature);
    let current = ctx.current_mut()?;
    current.anchor = Some(index);
    current.anchor_info = info;
    Ok(())
}

/// Convert one candidate object
pub fn convert_object(ctx: &mut ConversionContext<'_>, key: &ObjKey, is_root: bool) -> ConversionResult<()> {
    let store = ctx.store;
    let Some(object) = store.object(key) else {
        log::debug!("{}: overlaps the area but is not in the store", key);
        return Ok(());
    };
    let Some(extent) = ctx.mapper.extent(key) else {
        log::debug!("{}: not placed, skipped", key);
        return Ok(());
    };
    ctx.begin_object(key.clone(), extent);

    let method_name = object.first_tagged("Method").and_then(|mut f| f.next::<&str>().found());
    let method = method_name.and_then(|name| ctx.method(name));
    let anchored = method.is_some() || is_root;
    log::debug!(
        "Converting {} (method {}, anchored: {})",
        key,
        method_name.unwrap_or("-"),
        anchored
    );

    if anchored {
        let mut layout = exons::read_exons(ctx, object);
        // The object starts at its first exon
        let anchor_start = layout.blocks.first().map_or(extent.0, |&(s, _)| s.max(extent.0));
        let local = (anchor_start, extent.1.max(anchor_start));
        ctx.current_mut()?.extent = local;
        build_anchor(ctx, object, method.as_deref(), local)?;

        if ctx.current()?.anchor_info.is_some() {
            if layout.is_empty() && object.has_tag("CDS") {
                layout = ExonLayout { blocks: vec![local] };
            }
            exons::convert_exons(ctx, &layout)?;
            let cds = coding::convert_cds(ctx, object, &layout)?;
            coding::convert_start_not_found(ctx, object)?;
            coding::convert_end_not_found(ctx, object)?;
            if let Some(cds) = cds {
                coding::resolve_phases(ctx, &layout, cds)?;
            }
        }
    }

    homol::convert_homols(ctx, object)?;
    tags::convert_features(ctx, object)?;
    tags::convert_confirmed_introns(ctx, object)?;
    tags::convert_splices(ctx, object)?;

    if anchored {
        tags::convert_visible(ctx, object)?;
        tags::convert_assembly_tags(ctx, object)?;
        tags::convert_alleles(ctx, object)?;
        tags::convert_clone_ends(ctx, object)?;
        tags::convert_oligos(ctx, object)?;
        tags::convert_embl_features(ctx, object)?;
    }
    ctx.current = None;
    Ok(())
}

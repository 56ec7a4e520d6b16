//! Tag converters
//!
//! One function per annotation tag that maps to a simple feature: generic
//! method features, confirmed introns, splice predictions, visible tags,
//! assembly tags, alleles, clone ends, oligos and EMBL features.

use crate::convert::context::ConversionContext;
use crate::convert::feature::{Evidence, EvidenceKind, FeatureKind, Payload, SequenceInfo};
use crate::core::error::{ConversionResult, Diagnostic};
use crate::core::store::{AceObject, FieldError, Fields, ObjKey, Value};

/// Optional trailing score
fn optional_score(fields: &mut Fields<'_>) -> Result<Option<f64>, FieldError> {
    match fields.peek() {
        Some(Value::Int(_) | Value::Float(_)) => fields.next::<f64>().optional(),
        _ => Ok(None),
    }
}

/// Optional trailing text
fn optional_text(fields: &mut Fields<'_>) -> Result<Option<String>, FieldError> {
    fields.next::<String>().optional()
}

fn note(score: Option<f64>, text: Option<String>) -> Payload {
    if score.is_none() && text.is_none() {
        Payload::None
    } else {
        Payload::Note { score, text }
    }
}

/// Set the subfeature tag of a freshly emitted feature
fn label(ctx: &mut ConversionContext<'_>, index: Option<usize>, subfeature: &str) {
    if let Some(feature) = index.and_then(|i| ctx.features.get_mut(i)) {
        feature.subfeature = Some(subfeature.to_string());
    }
}

/// `Feature "method" x1 x2 [score] ["remark"]`
pub fn convert_features(ctx: &mut ConversionContext<'_>, object: &AceObject) -> ConversionResult<()> {
    for mut fields in object.tagged("Feature") {
        let row = fields
            .take::<(&str, i64, i64)>()
            .and_then(|(m, x1, x2)| Ok((m, x1, x2, optional_score(&mut fields)?, optional_text(&mut fields)?)));
        let (method_name, x1, x2, score, remark) = match row {
            Ok(row) => row,
            Err(e) => {
                ctx.malformed(object.key(), "Feature", e);
                continue;
            }
        };
        let Some(method) = ctx.method(method_name) else {
            continue;
        };
        let key = ObjKey::new("Method", method_name);
        let index = ctx.emit_local(FeatureKind::Feature, (x1, x2), key, !method.strand_sensitive, note(score, remark))?;
        label(ctx, index, method_name);
    }
    Ok(())
}

/// `Confirmed_intron x1 x2 Kind ["supporting"]`
///
/// Each row becomes its own INTRON with a fresh SequenceInfo; rows at the
/// same coordinates are merged by intron reconciliation.
pub fn convert_confirmed_introns(ctx: &mut ConversionContext<'_>, object: &AceObject) -> ConversionResult<()> {
    for mut fields in object.tagged("Confirmed_intron") {
        let (x1, x2) = match fields.take::<(i64, i64)>() {
            Ok(range) => range,
            Err(e) => {
                ctx.malformed(object.key(), "Confirmed_intron", e);
                continue;
            }
        };
        let position = fields.position();
        let kind_tag = match fields.next::<&str>().required("evidence kind", position) {
            Ok(tag) => tag,
            Err(e) => {
                ctx.malformed(object.key(), "Confirmed_intron", e);
                continue;
            }
        };
        let Some(kind) = EvidenceKind::from_tag(kind_tag) else {
            ctx.report(Diagnostic::UnknownEvidence {
                object: object.key().clone(),
                kind: kind_tag.to_string(),
                x1,
                x2,
            });
            continue;
        };
        let supporting = fields.next::<&str>().found().map(|name| ObjKey::new("Sequence", name));

        let Some(index) = ctx.emit_local(FeatureKind::Intron, (x1, x2), object.key().clone(), false, Payload::None)?
        else {
            continue;
        };
        let mut info = SequenceInfo::default();
        info.add_evidence(Evidence { kind, supporting });
        let id = ctx.sequences.push(info);
        if let Some(intron) = ctx.features.get_mut(index) {
            intron.parent = None;
            intron.subfeature = Some("Confirmed_intron".to_string());
            intron.payload = Payload::Sequence(id);
        }
    }
    Ok(())
}

/// `Splices Predicted_5|Predicted_3 "method" x1 x2 [score]`
pub fn convert_splices(ctx: &mut ConversionContext<'_>, object: &AceObject) -> ConversionResult<()> {
    for mut fields in object.tagged("Splices") {
        let position = fields.position();
        let kind = match fields.word() {
            Some("Predicted_5") => FeatureKind::Splice5,
            Some("Predicted_3") => FeatureKind::Splice3,
            other => {
                let error = FieldError::Mismatch {
                    expected: "Predicted_5 or Predicted_3",
                    found: other.unwrap_or("nothing").to_string(),
                    position,
                };
                ctx.malformed(object.key(), "Splices", error);
                continue;
            }
        };
        let row = fields
            .take::<(&str, i64, i64)>()
            .and_then(|(m, x1, x2)| Ok((m, x1, x2, optional_score(&mut fields)?)));
        let (method_name, x1, x2, score) = match row {
            Ok(row) => row,
            Err(e) => {
                ctx.malformed(object.key(), "Splices", e);
                continue;
            }
        };
        let Some(method) = ctx.method(method_name) else {
            continue;
        };
        let key = ObjKey::new("Method", method_name);
        let index = ctx.emit_local(kind, (x1, x2), key, !method.strand_sensitive, note(score, None))?;
        label(ctx, index, method_name);
    }
    Ok(())
}

/// `Visible Subtag "value"`: a feature spanning the anchor
pub fn convert_visible(ctx: &mut ConversionContext<'_>, object: &AceObject) -> ConversionResult<()> {
    let Some(anchor) = ctx.anchor().cloned() else {
        return Ok(());
    };
    for mut fields in object.tagged("Visible") {
        let position = fields.position();
        let row = fields
            .word()
            .ok_or(FieldError::Missing { what: "visible tag", position })
            .and_then(|tag| Ok((tag, fields.next::<&str>().required("text", position + 1)?)));
        let (subtag, value) = match row {
            Ok(row) => row,
            Err(e) => {
                ctx.malformed(object.key(), "Visible", e);
                continue;
            }
        };
        let mut feature = anchor.clone();
        feature.ty.kind = FeatureKind::Visible;
        feature.key = ObjKey::new(subtag, value);
        feature.parent = Some(object.key().clone());
        feature.source = object.key().clone();
        feature.subfeature = Some(subtag.to_string());
        feature.payload = Payload::None;
        ctx.push(feature);
    }
    Ok(())
}

/// `Assembly_tags "type" x1 x2 ["text"]`
pub fn convert_assembly_tags(ctx: &mut ConversionContext<'_>, object: &AceObject) -> ConversionResult<()> {
    for mut fields in object.tagged("Assembly_tags") {
        let row = fields
            .take::<(&str, i64, i64)>()
            .and_then(|(t, x1, x2)| Ok((t, x1, x2, optional_text(&mut fields)?)));
        let (tag_type, x1, x2, text) = match row {
            Ok(row) => row,
            Err(e) => {
                ctx.malformed(object.key(), "Assembly_tags", e);
                continue;
            }
        };
        let index =
            ctx.emit_local(FeatureKind::AssemblyTag, (x1, x2), object.key().clone(), false, note(None, text))?;
        label(ctx, index, tag_type);
    }
    Ok(())
}

/// `Allele "name" [x1 x2] ["text"]`
///
/// An allele without coordinates is not drawn; one with a lone coordinate
/// is malformed.
pub fn convert_alleles(ctx: &mut ConversionContext<'_>, object: &AceObject) -> ConversionResult<()> {
    for mut fields in object.tagged("Allele") {
        let row = (|| {
            let position = fields.position();
            let name = fields.next::<&str>().required("allele name", position)?;
            let x1 = fields.next::<i64>().optional()?;
            let position = fields.position();
            let x2 = match x1 {
                Some(_) => Some(fields.next::<i64>().required("integer", position)?),
                None => None,
            };
            let text = optional_text(&mut fields)?;
            Ok::<_, FieldError>((name, x1.zip(x2), text))
        })();
        let (name, range, text) = match row {
            Ok(row) => row,
            Err(e) => {
                ctx.malformed(object.key(), "Allele", e);
                continue;
            }
        };
        let Some(range) = range else {
            log::debug!("{}: allele {} has no position", object.key(), name);
            continue;
        };
        let index =
            ctx.emit_local(FeatureKind::Allele, range, ObjKey::new("Allele", name), false, note(None, text))?;
        label(ctx, index, "Allele");
    }
    Ok(())
}

/// `Clone_left_end "clone" x` and `Clone_right_end "clone" x`
pub fn convert_clone_ends(ctx: &mut ConversionContext<'_>, object: &AceObject) -> ConversionResult<()> {
    for tag in ["Clone_left_end", "Clone_right_end"] {
        for mut fields in object.tagged(tag) {
            let (clone, x) = match fields.take::<(&str, i64)>() {
                Ok(row) => row,
                Err(e) => {
                    ctx.malformed(object.key(), tag, e);
                    continue;
                }
            };
            let index = ctx.emit_local(FeatureKind::CloneEnd, (x, x), ObjKey::new("Clone", clone), false, Payload::None)?;
            label(ctx, index, tag);
        }
    }
    Ok(())
}

/// `Oligo "name" x1 x2`
pub fn convert_oligos(ctx: &mut ConversionContext<'_>, object: &AceObject) -> ConversionResult<()> {
    for mut fields in object.tagged("Oligo") {
        let (name, x1, x2) = match fields.take::<(&str, i64, i64)>() {
            Ok(row) => row,
            Err(e) => {
                ctx.malformed(object.key(), "Oligo", e);
                continue;
            }
        };
        ctx.emit_local(FeatureKind::Oligo, (x1, x2), ObjKey::new("Oligo", name), false, Payload::None)?;
    }
    Ok(())
}

/// `EMBL_feature "type" x1 x2 ["text"]`
pub fn convert_embl_features(ctx: &mut ConversionContext<'_>, object: &AceObject) -> ConversionResult<()> {
    for mut fields in object.tagged("EMBL_feature") {
        let row = fields
            .take::<(&str, i64, i64)>()
            .and_then(|(t, x1, x2)| Ok((t, x1, x2, optional_text(&mut fields)?)));
        let (feature_type, x1, x2, text) = match row {
            Ok(row) => row,
            Err(e) => {
                ctx.malformed(object.key(), "EMBL_feature", e);
                continue;
            }
        };
        let index =
            ctx.emit_local(FeatureKind::EmblFeature, (x1, x2), object.key().clone(), false, note(None, text))?;
        label(ctx, index, feature_type);
    }
    Ok(())
}

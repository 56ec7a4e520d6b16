//! Assembly index
//!
//! A [`RegionMapper`] over objects placed by `Subsequence` rows. Starting
//! from a root, every placement composes a linear transform
//! `ref = offset + sign * local`, so a child placed at `s..e` inside a
//! reversed parent ends up reversed on the reference. Overlap queries use
//! rust-lapper for O(log n + k) lookups.

use crate::core::error::ConversionError;
use crate::core::mapper::{ClipFlags, GapBlock, MapOutcome, MappedRange, RegionMapper};
use crate::core::store::{AnnotationStore, ObjKey, Value};
use rust_lapper::{Interval, Lapper};
use std::collections::{HashMap, HashSet};

/// Classes searched, in order, when a `Subsequence` row names a child without a class
pub const PLACEABLE_CLASSES: &[&str] = &[
    "Sequence",
    "Transcript",
    "CDS",
    "Pseudogene",
    "Feature",
    "Homol_data",
    "Feature_data",
];

/// Linear transform of one placed object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placement {
    offset: i64,
    /// +1 forward, -1 reversed
    sign: i64,
    length: i64,
}

impl Placement {
    #[inline]
    fn to_ref(&self, local: i64) -> i64 {
        self.offset + self.sign * local
    }

    fn ref_extent(&self) -> (i64, i64) {
        let a = self.to_ref(1);
        let b = self.to_ref(self.length);
        (a.min(b), a.max(b))
    }

    /// Placement of a child occupying `s..e` of this object
    ///
    /// Child local `l` sits at parent position `s + cs * (l - 1)`.
    fn child(&self, s: i64, e: i64) -> Placement {
        let cs = if s <= e { 1 } else { -1 };
        Placement {
            offset: self.offset + self.sign * (s - cs),
            sign: self.sign * cs,
            length: (e - s).abs() + 1,
        }
    }
}

/// Region mapper over a placement tree rooted at one object
pub struct AssemblyIndex {
    root: ObjKey,
    area: (i64, i64),
    placements: HashMap<ObjKey, Placement>,
    lapper: Lapper<u64, ObjKey>,
    /// Shift that makes every reference position non-negative for the interval tree
    bias: i64,
}

/// A child named by a `Subsequence` row
fn resolve_child<S: AnnotationStore + ?Sized>(store: &S, class: Option<&str>, name: &str) -> ObjKey {
    if let Some(class) = class {
        return ObjKey::new(class, name);
    }
    PLACEABLE_CLASSES
        .iter()
        .map(|class| ObjKey::new(*class, name))
        .find(|key| store.object(key).is_some())
        .unwrap_or_else(|| ObjKey::new("Sequence", name))
}

/// `Subsequence` rows of an object: (child, s, e)
fn child_rows<S: AnnotationStore + ?Sized>(store: &S, key: &ObjKey) -> Vec<(ObjKey, i64, i64)> {
    let Some(object) = store.object(key) else {
        return Vec::new();
    };
    let mut children = Vec::new();
    for mut fields in object.tagged("Subsequence") {
        // `Subsequence Class "name" s e` names the class explicitly
        let class = match (fields.peek(), fields.peek_nth(1)) {
            (Some(Value::Word(_)), Some(Value::Text(_) | Value::Word(_))) => fields.word(),
            _ => None,
        };
        match fields.take::<(&str, i64, i64)>() {
            Ok((name, s, e)) => children.push((resolve_child(store, class, name), s, e)),
            Err(e) => log::warn!("{}: malformed Subsequence row: {}", key, e),
        }
    }
    children
}

impl AssemblyIndex {
    /// Build the placement tree under `root`
    ///
    /// `area` defaults to the root's full extent.
    pub fn new<S: AnnotationStore + ?Sized>(
        store: &S,
        root: &ObjKey,
        area: Option<(i64, i64)>,
    ) -> Result<Self, ConversionError> {
        let root_object = store
            .object(root)
            .ok_or_else(|| ConversionError::UnknownRoot(root.clone()))?;

        let mut placements: HashMap<ObjKey, Placement> = HashMap::new();
        let mut visited: HashSet<ObjKey> = HashSet::new();
        visited.insert(root.clone());

        // Placements relative to the root first; the root length may depend on them
        let root_placement = Placement { offset: 0, sign: 1, length: 0 };
        let mut stack = vec![(root.clone(), root_placement)];
        let mut max_child_end = 0i64;
        while let Some((key, placement)) = stack.pop() {
            for (child, s, e) in child_rows(store, &key) {
                if !visited.insert(child.clone()) {
                    log::warn!("{}: {} placed more than once, keeping the first placement", key, child);
                    continue;
                }
                let child_placement = placement.child(s, e);
                let (_, hi) = child_placement.ref_extent();
                max_child_end = max_child_end.max(hi);
                placements.insert(child.clone(), child_placement);
                stack.push((child, child_placement));
            }
        }

        let root_length = root_object
            .first_tagged("Length")
            .and_then(|mut f| f.next::<i64>().found())
            .unwrap_or(max_child_end)
            .max(1);
        placements.insert(root.clone(), Placement { offset: 0, sign: 1, length: root_length });

        let area = area.unwrap_or((1, root_length));
        if area.0 > area.1 {
            return Err(ConversionError::InvalidArea { start: area.0, end: area.1 });
        }

        let bias = placements
            .values()
            .map(|p| p.ref_extent().0)
            .min()
            .unwrap_or(1)
            .min(area.0);
        let mut intervals: Vec<Interval<u64, ObjKey>> = placements
            .iter()
            .map(|(key, p)| {
                let (lo, hi) = p.ref_extent();
                Interval {
                    start: (lo - bias) as u64,
                    stop: (hi - bias + 1) as u64,
                    val: key.clone(),
                }
            })
            .collect();
        intervals.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.val.cmp(&b.val)));

        log::debug!("Indexed {} placed objects under {}", placements.len(), root);
        Ok(Self {
            root: root.clone(),
            area,
            placements,
            lapper: Lapper::new(intervals),
            bias,
        })
    }

    pub fn root(&self) -> &ObjKey {
        &self.root
    }

    /// Number of placed objects, root included
    pub fn placed_count(&self) -> usize {
        self.placements.len()
    }
}

impl RegionMapper for AssemblyIndex {
    fn area(&self) -> (i64, i64) {
        self.area
    }

    fn map(&self, object: &ObjKey, local: (i64, i64)) -> MapOutcome {
        let Some(placement) = self.placements.get(object) else {
            return MapOutcome::OutOfArea;
        };
        let (a1, a2) = self.area;
        let y1 = placement.to_ref(local.0);
        let y2 = placement.to_ref(local.1);
        if y1.max(y2) < a1 || y1.min(y2) > a2 {
            return MapOutcome::OutOfArea;
        }
        let c1 = y1.clamp(a1, a2);
        let c2 = y2.clamp(a1, a2);
        MapOutcome::Mapped(MappedRange {
            y1: c1,
            y2: c2,
            clip: ClipFlags { start: c1 != y1, end: c2 != y2 },
            gapped: false,
            reverse_hint: placement.sign < 0,
        })
    }

    fn gap_blocks(&self, _object: &ObjKey) -> Vec<GapBlock> {
        Vec::new()
    }

    fn enumerate_overlapping(&self, interval: (i64, i64)) -> Vec<ObjKey> {
        let lo = (interval.0.min(interval.1) - self.bias).max(0) as u64;
        let hi = (interval.0.max(interval.1) - self.bias + 1).max(0) as u64;
        self.lapper.find(lo, hi).map(|iv| iv.val.clone()).collect()
    }

    fn extent(&self, object: &ObjKey) -> Option<(i64, i64)> {
        self.placements.get(object).map(|p| (1, p.length))
    }
}

//! Method catalog
//!
//! Methods are style/inclusion descriptors keyed by name. The engine only
//! reads them: inclusion filtering, homology gap handling, strand
//! sensitivity, and paired-read joining all key off these flags.

use crate::core::store::{AceObject, AnnotationStore};
use std::collections::HashMap;

/// Flags and score ranges of one method
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Method {
    pub name: String,
    pub bumpable: bool,
    pub cluster: bool,
    pub score_by_width: bool,
    pub score_by_offset: bool,
    pub score_by_histogram: bool,
    pub strand_sensitive: bool,
    pub allow_misalign: bool,
    pub map_gaps: bool,
    pub allow_clipping: bool,
    pub export_string: bool,
    pub join_blocks: bool,
    pub calculated: bool,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub min_mag: Option<f64>,
    pub max_mag: Option<f64>,
}

impl Method {
    /// A method with every flag off
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Read a method from its `Method` class object
    ///
    /// Flags are bare tags; score limits are `Min_score x`, `Max_score x`,
    /// `Min_mag x`, `Max_mag x`. `Score_bounds lo hi` sets both score limits.
    pub fn from_object(object: &AceObject) -> Self {
        let mut method = Method::named(object.name());
        method.bumpable = object.has_tag("Bumpable");
        method.cluster = object.has_tag("Cluster");
        method.score_by_width = object.has_tag("Score_by_width");
        method.score_by_offset = object.has_tag("Score_by_offset");
        method.score_by_histogram = object.has_tag("Score_by_histogram");
        method.strand_sensitive = object.has_tag("Strand_sensitive");
        method.allow_misalign = object.has_tag("Allow_misalign");
        method.map_gaps = object.has_tag("Map_gaps");
        method.allow_clipping = object.has_tag("Allow_clipping");
        method.export_string = object.has_tag("Export_string");
        method.join_blocks = object.has_tag("Join_blocks");
        method.calculated = object.has_tag("Calculated");

        let number = |tag: &str| {
            object
                .first_tagged(tag)
                .and_then(|mut fields| fields.next::<f64>().found())
        };
        method.min_score = number("Min_score");
        method.max_score = number("Max_score");
        method.min_mag = number("Min_mag");
        method.max_mag = number("Max_mag");

        if let Some(mut fields) = object.first_tagged("Score_bounds") {
            if let Ok((lo, hi)) = fields.take::<(f64, f64)>() {
                method.min_score = Some(lo);
                method.max_score = Some(hi);
            }
        }
        method
    }
}

/// Lookup of methods by name
pub trait MethodCatalog {
    fn get(&self, name: &str) -> Option<&Method>;
}

/// Method catalog held in memory
#[derive(Debug, Clone, Default)]
pub struct MethodTable {
    methods: HashMap<String, Method>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every `Method` class object of a store
    pub fn from_store<S: AnnotationStore + ?Sized>(store: &S) -> Self {
        let mut table = Self::new();
        for object in store.objects_of_class("Method") {
            table.insert(Method::from_object(object));
        }
        log::debug!("Loaded {} methods", table.len());
        table
    }

    pub fn insert(&mut self, method: Method) {
        self.methods.insert(method.name.clone(), method);
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl MethodCatalog for MethodTable {
    fn get(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::{MemoryStore, ObjKey, Row, Value};

    fn method_object(name: &str, rows: Vec<Vec<Value>>) -> AceObject {
        let mut obj = AceObject::new(ObjKey::new("Method", name));
        for values in rows {
            obj.push_row(Row::new(values));
        }
        obj
    }

    #[test]
    fn test_method_flags_from_object() {
        let obj = method_object(
            "EST_BLAT",
            vec![
                vec![Value::Word("Join_blocks".into())],
                vec![Value::Word("Map_gaps".into())],
                vec![Value::Word("Score_bounds".into()), Value::Int(50), Value::Float(100.0)],
            ],
        );
        let m = Method::from_object(&obj);
        assert_eq!(m.name, "EST_BLAT");
        assert!(m.join_blocks);
        assert!(m.map_gaps);
        assert!(!m.allow_clipping);
        assert_eq!(m.min_score, Some(50.0));
        assert_eq!(m.max_score, Some(100.0));
    }

    #[test]
    fn test_method_table_from_store() {
        let mut store = MemoryStore::new();
        store.insert(method_object("curated", vec![vec![Value::Word("Strand_sensitive".into())]]));
        store.insert(AceObject::new(ObjKey::new("Sequence", "not_a_method")));
        let table = MethodTable::from_store(&store);
        assert_eq!(table.len(), 1);
        assert!(table.get("curated").unwrap().strand_sensitive);
        assert!(table.get("missing").is_none());
    }
}

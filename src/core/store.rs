//! Annotation store
//!
//! A schema-less, per-object attribute store. Each object is a list of rows,
//! each row a tag word followed by typed values. Rows are never read by
//! position: converters walk them with a [`Fields`] cursor whose typed reads
//! return [`Parsed`], so a missing value and a value of the wrong type are
//! told apart.

use std::collections::HashMap;
use thiserror::Error;

/// Object identity: class plus name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjKey {
    pub class: String,
    pub name: String,
}

impl ObjKey {
    pub fn new(class: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ObjKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.class, self.name)
    }
}

/// A single value in a row
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    /// Quoted text
    Text(String),
    /// Bare word: tags and unquoted identifiers
    Word(String),
}

impl Value {
    fn describe(&self) -> String {
        match self {
            Value::Int(i) => format!("integer {}", i),
            Value::Float(x) => format!("float {}", x),
            Value::Text(s) => format!("text \"{}\"", s),
            Value::Word(w) => format!("word {}", w),
        }
    }
}

/// One row of an object: a tag word followed by values
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Leading tag word, if the row starts with one
    pub fn tag(&self) -> Option<&str> {
        match self.values.first() {
            Some(Value::Word(w)) => Some(w.as_str()),
            _ => None,
        }
    }

    /// Cursor positioned after the tag
    pub fn fields(&self) -> Fields<'_> {
        let skip = usize::from(self.tag().is_some());
        Fields {
            tag: self.tag().unwrap_or(""),
            values: &self.values,
            pos: skip,
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// An annotated object
#[derive(Debug, Clone, PartialEq)]
pub struct AceObject {
    key: ObjKey,
    rows: Vec<Row>,
}

impl AceObject {
    pub fn new(key: ObjKey) -> Self {
        Self { key, rows: Vec::new() }
    }

    pub fn key(&self) -> &ObjKey {
        &self.key
    }

    pub fn class(&self) -> &str {
        &self.key.class
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Cursors over every row carrying `tag`, in stored order
    pub fn tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = Fields<'a>> + 'a {
        self.rows
            .iter()
            .filter(move |row| row.tag() == Some(tag))
            .map(Row::fields)
    }

    /// Cursor over the first row carrying `tag`
    pub fn first_tagged(&self, tag: &str) -> Option<Fields<'_>> {
        self.rows.iter().find(|row| row.tag() == Some(tag)).map(Row::fields)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.rows.iter().any(|row| row.tag() == Some(tag))
    }
}

/// Read access to annotated objects
pub trait AnnotationStore {
    fn object(&self, key: &ObjKey) -> Option<&AceObject>;

    /// All objects of a class, in load order
    fn objects_of_class(&self, class: &str) -> Vec<&AceObject>;
}

/// In-memory store filled by the `.ace` parser
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: HashMap<ObjKey, AceObject>,
    order: Vec<ObjKey>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an object for appending rows, creating it on first use
    pub fn entry(&mut self, key: ObjKey) -> &mut AceObject {
        if !self.objects.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.objects
            .entry(key.clone())
            .or_insert_with(|| AceObject::new(key))
    }

    /// Insert an object, appending to any rows already stored under its key
    pub fn insert(&mut self, object: AceObject) {
        let AceObject { key, rows } = object;
        let target = self.entry(key);
        for row in rows {
            target.push_row(row);
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ObjKey> {
        self.order.iter()
    }
}

impl AnnotationStore for MemoryStore {
    fn object(&self, key: &ObjKey) -> Option<&AceObject> {
        self.objects.get(key)
    }

    fn objects_of_class(&self, class: &str) -> Vec<&AceObject> {
        self.order
            .iter()
            .filter(|key| key.class == class)
            .filter_map(|key| self.objects.get(key))
            .collect()
    }
}

/// Why a typed read failed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("missing {what} at field {position}")]
    Missing { what: &'static str, position: usize },

    #[error("expected {expected} at field {position}, found {found}")]
    Mismatch {
        expected: &'static str,
        found: String,
        position: usize,
    },
}

/// Outcome of one typed read
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    Found(T),
    /// The row ended
    Absent,
    /// The next value has another type; the cursor did not move
    Malformed(FieldError),
}

impl<T> Parsed<T> {
    /// Treat an absent value as an error
    pub fn required(self, what: &'static str, position: usize) -> Result<T, FieldError> {
        match self {
            Parsed::Found(v) => Ok(v),
            Parsed::Absent => Err(FieldError::Missing { what, position }),
            Parsed::Malformed(e) => Err(e),
        }
    }

    /// Treat an absent value as `None`, a mistyped one as an error
    pub fn optional(self) -> Result<Option<T>, FieldError> {
        match self {
            Parsed::Found(v) => Ok(Some(v)),
            Parsed::Absent => Ok(None),
            Parsed::Malformed(e) => Err(e),
        }
    }

    /// Found value only; absent and mistyped both give `None`
    pub fn found(self) -> Option<T> {
        match self {
            Parsed::Found(v) => Some(v),
            _ => None,
        }
    }
}

/// A value type readable from a row
pub trait Field<'a>: Sized {
    const NAME: &'static str;

    fn from_value(value: &'a Value) -> Option<Self>;
}

impl<'a> Field<'a> for i64 {
    const NAME: &'static str = "integer";

    fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl<'a> Field<'a> for f64 {
    const NAME: &'static str = "number";

    fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Float(x) => Some(*x),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl<'a> Field<'a> for &'a str {
    const NAME: &'static str = "text";

    fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Text(s) | Value::Word(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl<'a> Field<'a> for String {
    const NAME: &'static str = "text";

    fn from_value(value: &'a Value) -> Option<Self> {
        <&'a str as Field<'a>>::from_value(value).map(str::to_string)
    }
}

/// A fixed tuple of required values
pub trait FromFields<'a>: Sized {
    fn from_fields(fields: &mut Fields<'a>) -> Result<Self, FieldError>;
}

macro_rules! tuple_from_fields {
    ($($t:ident),+) => {
        impl<'a, $($t: Field<'a>),+> FromFields<'a> for ($($t,)+) {
            fn from_fields(fields: &mut Fields<'a>) -> Result<Self, FieldError> {
                Ok(($({
                    let position = fields.position();
                    fields.next::<$t>().required(<$t as Field<'a>>::NAME, position)?
                },)+))
            }
        }
    };
}

tuple_from_fields!(A);
tuple_from_fields!(A, B);
tuple_from_fields!(A, B, C);
tuple_from_fields!(A, B, C, D);
tuple_from_fields!(A, B, C, D, E);

/// Typed cursor over the values of one row
#[derive(Debug, Clone)]
pub struct Fields<'a> {
    tag: &'a str,
    values: &'a [Value],
    pos: usize,
}

impl<'a> Fields<'a> {
    pub fn tag(&self) -> &'a str {
        self.tag
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.values.len()
    }

    pub fn peek(&self) -> Option<&'a Value> {
        self.values.get(self.pos)
    }

    /// Look `n` values ahead without moving
    pub fn peek_nth(&self, n: usize) -> Option<&'a Value> {
        self.values.get(self.pos + n)
    }

    /// Read the next value as `T`
    pub fn next<T: Field<'a>>(&mut self) -> Parsed<T> {
        let Some(value) = self.values.get(self.pos) else {
            return Parsed::Absent;
        };
        match T::from_value(value) {
            Some(v) => {
                self.pos += 1;
                Parsed::Found(v)
            }
            None => Parsed::Malformed(FieldError::Mismatch {
                expected: T::NAME,
                found: value.describe(),
                position: self.pos,
            }),
        }
    }

    /// Read a tuple of required values
    pub fn take<T: FromFields<'a>>(&mut self) -> Result<T, FieldError> {
        T::from_fields(self)
    }

    /// Read the next value only if it is a bare word
    pub fn word(&mut self) -> Option<&'a str> {
        match self.values.get(self.pos) {
            Some(Value::Word(w)) => {
                self.pos += 1;
                Some(w.as_str())
            }
            _ => None,
        }
    }

    /// Consume the next value if it is the bare word `expected`
    pub fn accept(&mut self, expected: &str) -> bool {
        match self.values.get(self.pos) {
            Some(Value::Word(w)) if w == expected => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }
}

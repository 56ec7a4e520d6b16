//! `.ace` text parsing
//!
//! Loads annotation objects into a [`MemoryStore`].
//!
//! # Format
//!
//! ```text
//! // comment
//! Sequence : "AC3"
//! Length 40000
//! Subsequence "AC3.1" 1000 3000
//!
//! Transcript : "AC3.1"
//! Method "curated"
//! Source_Exons 1 100
//! ```
//!
//! - `Class : name` opens an object; a blank line closes it
//! - Every other line is one row: a tag word followed by values
//! - Quoted tokens are text, integers and decimals are numbers,
//!   anything else is a bare word
//! - Reopening an object appends to its rows

use crate::core::io::{open_input, LineIterator};
use crate::core::store::{AceObject, MemoryStore, ObjKey, Row, Value};
use memchr::{memchr, memmem};
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Error type for `.ace` parsing
#[derive(Debug, Clone)]
pub struct AceParseError {
    /// Human-readable error message
    pub message: String,
    /// Line number where the error occurred (1-based)
    pub line_number: Option<usize>,
    pub kind: AceParseErrorKind,
    /// The problematic content (if available)
    pub content: Option<String>,
}

/// Specific kinds of `.ace` parsing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AceParseErrorKind {
    /// Object header without a name
    InvalidHeader,
    /// A quoted token that never closes
    UnterminatedQuote,
    /// A data row before any object header
    RowOutsideObject,
    IoError,
    FileNotFound,
}

impl std::fmt::Display for AceParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line_number {
            Some(line) => write!(f, "Line {}: {}", line, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for AceParseError {}

impl AceParseError {
    pub fn with_context(
        message: impl Into<String>,
        line_number: usize,
        kind: AceParseErrorKind,
        content: &str,
    ) -> Self {
        Self {
            message: message.into(),
            line_number: Some(line_number),
            kind,
            content: Some(content.chars().take(100).collect()),
        }
    }

    pub fn file_not_found(path: &Path) -> Self {
        Self {
            message: format!("Ace file not found: {}", path.display()),
            line_number: None,
            kind: AceParseErrorKind::FileNotFound,
            content: None,
        }
    }

    pub fn is_kind(&self, kind: AceParseErrorKind) -> bool {
        self.kind == kind
    }
}

impl From<std::io::Error> for AceParseError {
    fn from(e: std::io::Error) -> Self {
        Self {
            message: format!("IO error: {}", e),
            line_number: None,
            kind: AceParseErrorKind::IoError,
            content: None,
        }
    }
}

/// Split one line into values
///
/// Returns `Err(())` on an unterminated quote.
fn tokenize(line: &str) -> Result<Vec<Value>, ()> {
    let bytes = line.as_bytes();

    // Fast path: no quotes and no comments
    if memchr(b'"', bytes).is_none() && memmem::find(bytes, b"//").is_none() {
        return Ok(line.split_whitespace().map(classify).collect());
    }

    let mut values = Vec::new();
    let mut chars = line.char_indices().peekable();
    while let Some(&(i, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if line[i..].starts_with("//") {
            break;
        }
        if c == '"' {
            chars.next();
            let mut text = String::new();
            let mut closed = false;
            while let Some((_, c)) = chars.next() {
                match c {
                    '\\' => {
                        if let Some((_, escaped)) = chars.next() {
                            text.push(escaped);
                        }
                    }
                    '"' => {
                        closed = true;
                        break;
                    }
                    _ => text.push(c),
                }
            }
            if !closed {
                return Err(());
            }
            values.push(Value::Text(text));
            continue;
        }
        let start = i;
        let mut end = line.len();
        while let Some(&(j, c)) = chars.peek() {
            if c.is_whitespace() || c == '"' || line[j..].starts_with("//") {
                end = j;
                break;
            }
            chars.next();
        }
        values.push(classify(&line[start..end]));
    }
    Ok(values)
}

/// Classify a bare token as integer, decimal or word
fn classify(token: &str) -> Value {
    if let Ok(i) = token.parse::<i64>() {
        return Value::Int(i);
    }
    let numeric_start = token
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_digit() || c == '-' || c == '+' || c == '.');
    if numeric_start {
        if let Ok(x) = token.parse::<f64>() {
            return Value::Float(x);
        }
    }
    Value::Word(token.to_string())
}

/// Object key from a header row `Class : name`
fn header_key(values: &[Value]) -> Option<Option<ObjKey>> {
    match values {
        [Value::Word(class), Value::Word(colon), rest @ ..] if colon == ":" => {
            let name = match rest.first() {
                Some(Value::Text(s)) | Some(Value::Word(s)) => s.clone(),
                Some(Value::Int(i)) => i.to_string(),
                Some(Value::Float(x)) => x.to_string(),
                None => return Some(None),
            };
            Some(Some(ObjKey::new(class.clone(), name)))
        }
        _ => None,
    }
}

/// Parse `.ace` text from a reader into `store`
///
/// Returns the number of object headers read.
pub fn parse_ace_reader<R: BufRead>(reader: R, store: &mut MemoryStore) -> Result<usize, AceParseError> {
    let mut lines = LineIterator::new(reader);
    let mut current: Option<AceObject> = None;
    let mut headers = 0usize;

    while let Some(line) = lines.next_line() {
        let (line_number, line) = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            if let Some(object) = current.take() {
                store.insert(object);
            }
            continue;
        }
        if trimmed.starts_with("//") {
            continue;
        }

        let values = tokenize(trimmed).map_err(|_| {
            AceParseError::with_context(
                "Unterminated quoted text",
                line_number,
                AceParseErrorKind::UnterminatedQuote,
                trimmed,
            )
        })?;
        if values.is_empty() {
            continue;
        }

        match header_key(&values) {
            Some(Some(key)) => {
                if let Some(object) = current.take() {
                    store.insert(object);
                }
                headers += 1;
                current = Some(AceObject::new(key));
            }
            Some(None) => {
                return Err(AceParseError::with_context(
                    "Object header without a name",
                    line_number,
                    AceParseErrorKind::InvalidHeader,
                    trimmed,
                ));
            }
            None => match current.as_mut() {
                Some(object) => object.push_row(Row::new(values)),
                None => {
                    return Err(AceParseError::with_context(
                        "Data row outside of an object",
                        line_number,
                        AceParseErrorKind::RowOutsideObject,
                        trimmed,
                    ));
                }
            },
        }
    }

    if let Some(object) = current.take() {
        store.insert(object);
    }
    Ok(headers)
}

/// Parse an `.ace` file (plain, gzip or bzip2) into `store`
pub fn parse_ace_file(path: &Path, store: &mut MemoryStore) -> Result<usize, AceParseError> {
    if !path.exists() {
        return Err(AceParseError::file_not_found(path));
    }
    let reader = open_input(path)?;
    let headers = parse_ace_reader(reader, store)?;
    log::info!("Loaded {} objects from {}", headers, path.display());
    Ok(headers)
}

/// Parse `.ace` text held in memory
pub fn parse_ace_bytes(data: &[u8]) -> Result<MemoryStore, AceParseError> {
    let mut store = MemoryStore::new();
    parse_ace_reader(BufReader::new(data), &mut store)?;
    Ok(store)
}

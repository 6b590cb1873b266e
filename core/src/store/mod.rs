//! Property/value store boundary.
//!
//! The analysis core only needs a handful of operations on the experiment
//! graph: query by class, read the objects of a subject/predicate pair, add,
//! replace, remove and serialize. `PropertyStore` captures exactly that; `Graph`
//! is the in-memory implementation backed by Turtle files.

pub mod codec;
pub mod graph;
pub mod turtle;

pub use graph::Graph;

use crate::vocab::{self, pred, XSD};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("turtle error: {0}")]
    Turtle(String),
    #[error("invalid IRI {iri:?}: {reason}")]
    InvalidIri { iri: String, reason: String },
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload of {0} bytes is not a whole number of f32 samples")]
    RaggedPayload(usize),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// How a literal should be typed when it is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeHint {
    Float,
    Int,
    Date,
    Base64Binary,
    String,
    Uri,
}

/// One RDF term. IRIs and datatypes are always held expanded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    Iri(String),
    Blank(String),
    Literal { lexical: String, datatype: String },
    LangLiteral { lexical: String, language: String },
}

impl Value {
    /// IRI reference; prefixed names are expanded.
    pub fn iri(name: &str) -> Self {
        if let Some(label) = name.strip_prefix("_:") {
            return Value::Blank(label.to_string());
        }
        Value::Iri(vocab::expand(name).into_owned())
    }

    pub fn typed(lexical: impl Into<String>, xsd_local: &str) -> Self {
        Value::Literal {
            lexical: lexical.into(),
            datatype: format!("{XSD}{xsd_local}"),
        }
    }

    /// `xsd:float` literal. Values are narrowed to single precision.
    pub fn float(value: f64) -> Self {
        Self::float32(value as f32)
    }

    pub fn float32(value: f32) -> Self {
        let lexical = if value.is_nan() {
            "NaN".to_string()
        } else if value.is_infinite() {
            let sign = if value > 0.0 { "INF" } else { "-INF" };
            sign.to_string()
        } else {
            format!("{value}")
        };
        Self::typed(lexical, "float")
    }

    pub fn int(value: i64) -> Self {
        Self::typed(value.to_string(), "int")
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::typed(value, "string")
    }

    pub fn date(value: impl Into<String>) -> Self {
        Self::typed(value, "date")
    }

    pub fn base64(payload: impl Into<String>) -> Self {
        Self::typed(payload, "base64Binary")
    }

    pub fn with_hint(text: &str, hint: TypeHint) -> Self {
        match hint {
            TypeHint::Float => Self::typed(text, "float"),
            TypeHint::Int => Self::typed(text, "int"),
            TypeHint::Date => Self::date(text),
            TypeHint::Base64Binary => Self::base64(text),
            TypeHint::String => Self::string(text),
            TypeHint::Uri => Self::iri(text),
        }
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Value::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// Subject form of a node: the IRI, or `_:label` for blank nodes.
    pub fn as_node(&self) -> Option<String> {
        match self {
            Value::Iri(iri) => Some(iri.clone()),
            Value::Blank(label) => Some(format!("_:{label}")),
            _ => None,
        }
    }

    pub fn lexical(&self) -> &str {
        match self {
            Value::Iri(text) | Value::Blank(text) => text,
            Value::Literal { lexical, .. } | Value::LangLiteral { lexical, .. } => lexical,
        }
    }

    pub fn datatype_local(&self) -> Option<&str> {
        match self {
            Value::Literal { datatype, .. } => Some(vocab::local_name(datatype)),
            Value::LangLiteral { .. } => Some("langString"),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        let text = match self {
            Value::Literal { lexical, .. } => lexical.trim(),
            _ => return None,
        };
        match text {
            "INF" | "+INF" => Some(f64::INFINITY),
            "-INF" => Some(f64::NEG_INFINITY),
            "NaN" => Some(f64::NAN),
            other => other.parse().ok(),
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        let text = match self {
            Value::Literal { lexical, .. } => lexical.trim(),
            _ => return None,
        };
        text.parse::<usize>().ok().or_else(|| {
            let float: f64 = text.parse().ok()?;
            (float >= 0.0 && float.fract() == 0.0).then_some(float as usize)
        })
    }
}

/// Narrow triple-store contract used by the analysis stages.
///
/// Subjects and predicates may be given as prefixed names. Blank nodes are
/// addressed as `_:label`.
pub trait PropertyStore {
    /// Subjects that carry `predicate`, optionally restricted to one object.
    fn subjects_with(&self, predicate: &str, object: Option<&Value>) -> Vec<String>;
    fn objects(&self, subject: &str, predicate: &str) -> Vec<Value>;
    fn add(&mut self, subject: &str, predicate: &str, object: Value);
    /// Replaces every object of `subject`/`predicate` with `object`.
    fn set(&mut self, subject: &str, predicate: &str, object: Value);
    /// Removes matching triples; `None` is a wildcard. Returns how many went.
    fn remove(&mut self, subject: &str, predicate: Option<&str>, object: Option<&Value>)
        -> usize;
    fn serialize(&self) -> StoreResult<String>;

    fn instances_of(&self, class: &str) -> Vec<String> {
        self.subjects_with(pred::RDF_TYPE, Some(&Value::iri(class)))
    }

    fn first_object(&self, subject: &str, predicate: &str) -> Option<Value> {
        self.objects(subject, predicate).into_iter().next()
    }

    fn types_of(&self, subject: &str) -> Vec<String> {
        self.objects(subject, pred::RDF_TYPE)
            .iter()
            .filter_map(|value| value.as_iri().map(str::to_string))
            .collect()
    }

    fn has_type(&self, subject: &str, class: &str) -> bool {
        let class = vocab::expand(class);
        self.types_of(subject).iter().any(|t| *t == *class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_literals_round_trip_special_values() {
        assert_eq!(Value::float(f64::INFINITY).lexical(), "INF");
        assert_eq!(Value::float(f64::NEG_INFINITY).as_f64(), Some(f64::NEG_INFINITY));
        assert!(Value::float(f64::NAN).as_f64().unwrap().is_nan());
        assert_eq!(Value::float(5000.0).as_f64(), Some(5000.0));
    }

    #[test]
    fn usize_accepts_integral_floats() {
        assert_eq!(Value::int(7).as_usize(), Some(7));
        assert_eq!(Value::typed("7.0", "float").as_usize(), Some(7));
        assert_eq!(Value::typed("7.5", "float").as_usize(), None);
        assert_eq!(Value::iri("dynamat:Seven").as_usize(), None);
    }

    #[test]
    fn hints_map_to_xsd_datatypes() {
        assert_eq!(Value::with_hint("2024-01-01", TypeHint::Date).datatype_local(), Some("date"));
        assert_eq!(Value::with_hint("AAAA", TypeHint::Base64Binary).datatype_local(), Some("base64Binary"));
        assert_eq!(
            Value::with_hint("dynamat:Volts", TypeHint::Uri),
            Value::Iri(vocab::dynamat("Volts"))
        );
        assert_eq!(Value::iri("_:b1"), Value::Blank("b1".into()));
    }
}

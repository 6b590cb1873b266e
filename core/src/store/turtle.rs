use super::{Graph, PropertyStore, StoreError, StoreResult, Value};
use crate::vocab::PREFIXES;
use oxrdf::{BlankNode, Literal, NamedNode, Subject, Term, Triple};
use oxttl::{TurtleParser, TurtleSerializer};
use std::fs;
use std::io::Write;
use std::path::Path;

impl Graph {
    pub fn from_turtle(text: &str) -> StoreResult<Self> {
        let mut graph = Graph::new();
        for triple in TurtleParser::new().for_reader(text.as_bytes()) {
            let triple = triple.map_err(|err| StoreError::Turtle(err.to_string()))?;
            let subject = subject_key(&triple.subject)?;
            let object = term_value(&triple.object)?;
            graph.add(&subject, triple.predicate.as_str(), object);
        }
        Ok(graph)
    }

    pub fn load(path: &Path) -> StoreResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_turtle(&text)
    }

    pub fn to_turtle(&self) -> StoreResult<String> {
        let mut serializer = TurtleSerializer::new();
        for (prefix, namespace) in PREFIXES {
            serializer = serializer
                .with_prefix(*prefix, *namespace)
                .map_err(|err| invalid_iri(namespace, err))?;
        }
        let mut writer = serializer.for_writer(Vec::new());
        for (subject, predicate, object) in self.iter() {
            let triple = Triple::new(
                node_subject(subject)?,
                named(predicate)?,
                value_term(object)?,
            );
            writer.serialize_triple(&triple)?;
        }
        let bytes = writer.finish()?;
        String::from_utf8(bytes).map_err(|err| StoreError::Turtle(err.to_string()))
    }

    /// Writes to a temporary file beside `path`, then renames it over `path`.
    pub fn save_atomic(&self, path: &Path) -> StoreResult<()> {
        let text = self.to_turtle()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        staged.write_all(text.as_bytes())?;
        staged.flush()?;
        staged.persist(path).map_err(|err| StoreError::Io(err.error))?;
        Ok(())
    }
}

fn invalid_iri(iri: &str, reason: impl ToString) -> StoreError {
    StoreError::InvalidIri {
        iri: iri.to_string(),
        reason: reason.to_string(),
    }
}

fn named(iri: &str) -> StoreResult<NamedNode> {
    NamedNode::new(iri).map_err(|err| invalid_iri(iri, err))
}

fn blank(label: &str) -> StoreResult<BlankNode> {
    BlankNode::new(label).map_err(|err| invalid_iri(label, err))
}

#[allow(unreachable_patterns)]
fn subject_key(subject: &Subject) -> StoreResult<String> {
    match subject {
        Subject::NamedNode(node) => Ok(node.as_str().to_string()),
        Subject::BlankNode(node) => Ok(format!("_:{}", node.as_str())),
        other => Err(StoreError::Turtle(format!("unsupported subject {other}"))),
    }
}

#[allow(unreachable_patterns)]
fn term_value(term: &Term) -> StoreResult<Value> {
    match term {
        Term::NamedNode(node) => Ok(Value::Iri(node.as_str().to_string())),
        Term::BlankNode(node) => Ok(Value::Blank(node.as_str().to_string())),
        Term::Literal(literal) => Ok(match literal.language() {
            Some(language) => Value::LangLiteral {
                lexical: literal.value().to_string(),
                language: language.to_string(),
            },
            None => Value::Literal {
                lexical: literal.value().to_string(),
                datatype: literal.datatype().as_str().to_string(),
            },
        }),
        other => Err(StoreError::Turtle(format!("unsupported object {other}"))),
    }
}

fn node_subject(key: &str) -> StoreResult<Subject> {
    match key.strip_prefix("_:") {
        Some(label) => Ok(blank(label)?.into()),
        None => Ok(named(key)?.into()),
    }
}

fn value_term(value: &Value) -> StoreResult<Term> {
    Ok(match value {
        Value::Iri(iri) => named(iri)?.into(),
        Value::Blank(label) => blank(label)?.into(),
        Value::Literal { lexical, datatype } => {
            Literal::new_typed_literal(lexical.as_str(), named(datatype)?).into()
        }
        Value::LangLiteral { lexical, language } => {
            Literal::new_language_tagged_literal(lexical.as_str(), language.as_str())
                .map_err(|err| invalid_iri(language, err))?
                .into()
        }
    })
}

use super::{PropertyStore, StoreResult, Value};
use crate::vocab;
use std::collections::BTreeMap;

type Predicates = BTreeMap<String, Vec<Value>>;

/// Ordered in-memory triple set.
///
/// Keys are kept expanded and sorted, so two graphs holding the same triples
/// serialize byte-for-byte identically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    triples: BTreeMap<String, Predicates>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.triples
            .values()
            .flat_map(|predicates| predicates.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.triples.keys().map(String::as_str)
    }

    pub fn contains_subject(&self, subject: &str) -> bool {
        self.triples.contains_key(vocab::expand(subject).as_ref())
    }

    /// Every triple as `(subject, predicate, object)`, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &Value)> {
        self.triples.iter().flat_map(|(subject, predicates)| {
            predicates.iter().flat_map(move |(predicate, objects)| {
                objects
                    .iter()
                    .map(move |object| (subject.as_str(), predicate.as_str(), object))
            })
        })
    }

    /// Drops every triple whose subject is `subject`.
    pub fn remove_subject(&mut self, subject: &str) -> usize {
        self.triples
            .remove(vocab::expand(subject).as_ref())
            .map(|predicates| predicates.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Number of triples, from any subject, pointing at `object`.
    pub fn references(&self, object: &Value) -> usize {
        self.iter().filter(|(_, _, o)| *o == object).count()
    }

    /// Copies every triple of `other` into this graph.
    pub fn extend_from(&mut self, other: &Graph) {
        for (subject, predicate, object) in other.iter() {
            self.add(subject, predicate, object.clone());
        }
    }
}

impl PropertyStore for Graph {
    fn subjects_with(&self, predicate: &str, object: Option<&Value>) -> Vec<String> {
        let predicate = vocab::expand(predicate);
        self.triples
            .iter()
            .filter(|(_, predicates)| {
                predicates
                    .get(predicate.as_ref())
                    .is_some_and(|objects| match object {
                        Some(wanted) => objects.contains(wanted),
                        None => !objects.is_empty(),
                    })
            })
            .map(|(subject, _)| subject.clone())
            .collect()
    }

    fn objects(&self, subject: &str, predicate: &str) -> Vec<Value> {
        self.triples
            .get(vocab::expand(subject).as_ref())
            .and_then(|predicates| predicates.get(vocab::expand(predicate).as_ref()))
            .cloned()
            .unwrap_or_default()
    }

    fn add(&mut self, subject: &str, predicate: &str, object: Value) {
        let objects = self
            .triples
            .entry(vocab::expand(subject).into_owned())
            .or_default()
            .entry(vocab::expand(predicate).into_owned())
            .or_default();
        if !objects.contains(&object) {
            objects.push(object);
        }
    }

    fn set(&mut self, subject: &str, predicate: &str, object: Value) {
        self.triples
            .entry(vocab::expand(subject).into_owned())
            .or_default()
            .insert(vocab::expand(predicate).into_owned(), vec![object]);
    }

    fn remove(
        &mut self,
        subject: &str,
        predicate: Option<&str>,
        object: Option<&Value>,
    ) -> usize {
        let subject = vocab::expand(subject);
        let Some(predicates) = self.triples.get_mut(subject.as_ref()) else {
            return 0;
        };

        let mut removed = 0;
        let keys: Vec<String> = match predicate {
            Some(p) => vec![vocab::expand(p).into_owned()],
            None => predicates.keys().cloned().collect(),
        };
        for key in keys {
            if let Some(objects) = predicates.get_mut(&key) {
                let before = objects.len();
                match object {
                    Some(wanted) => objects.retain(|o| o != wanted),
                    None => objects.clear(),
                }
                removed += before - objects.len();
                if objects.is_empty() {
                    predicates.remove(&key);
                }
            }
        }
        if predicates.is_empty() {
            self.triples.remove(subject.as_ref());
        }
        removed
    }

    fn serialize(&self) -> StoreResult<String> {
        self.to_turtle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::pred;

    fn sample() -> Graph {
        let mut graph = Graph::new();
        graph.add("dynamat:Bar_1", pred::RDF_TYPE, Value::iri("dynamat:IncidentBar"));
        graph.add("dynamat:Bar_1", pred::HAS_VALUE, Value::float(1.0));
        graph.add("dynamat:Bar_2", pred::RDF_TYPE, Value::iri("dynamat:TransmittedBar"));
        graph
    }

    #[test]
    fn add_ignores_duplicates() {
        let mut graph = sample();
        graph.add("dynamat:Bar_1", pred::HAS_VALUE, Value::float(1.0));
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn set_replaces_all_objects() {
        let mut graph = sample();
        graph.add("dynamat:Bar_1", pred::HAS_VALUE, Value::float(2.0));
        graph.set("dynamat:Bar_1", pred::HAS_VALUE, Value::float(3.0));
        assert_eq!(
            graph.objects("dynamat:Bar_1", pred::HAS_VALUE),
            vec![Value::float(3.0)]
        );
    }

    #[test]
    fn query_by_class_uses_expanded_names() {
        let graph = sample();
        assert_eq!(
            graph.instances_of("dynamat:IncidentBar"),
            vec![vocab::dynamat("Bar_1")]
        );
        assert!(graph.has_type("dynamat:Bar_2", "dynamat:TransmittedBar"));
    }

    #[test]
    fn remove_with_wildcards_prunes_empty_subjects() {
        let mut graph = sample();
        assert_eq!(graph.remove("dynamat:Bar_1", None, None), 2);
        assert!(!graph.contains_subject("dynamat:Bar_1"));
        assert_eq!(graph.remove("dynamat:Missing", None, None), 0);
        assert_eq!(graph.remove_subject("dynamat:Bar_2"), 1);
        assert!(graph.is_empty());
    }
}

use super::table::{Dimension, Unit};
use crate::prelude::{AnalysisError, AnalysisResult};
use crate::store::{codec, Graph, PropertyStore, Value};
use crate::vocab::{self, pred};
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};

/// Number of rewritten instances per dimension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionReport {
    pub converted: BTreeMap<Dimension, usize>,
}

impl ConversionReport {
    pub fn total(&self) -> usize {
        self.converted.values().sum()
    }

    pub fn count(&self, dimension: Dimension) -> usize {
        self.converted.get(&dimension).copied().unwrap_or(0)
    }
}

enum Payload {
    Scalar(f32),
    Samples(Vec<f32>),
}

struct Rewrite {
    instance: String,
    from: String,
    to: Unit,
    payload: Payload,
}

/// Normalizes every `hasUnits`-tagged quantity to its dimension's canonical unit.
///
/// The pass is planned in full before anything is written; a single
/// unsupported unit leaves the graph untouched.
#[derive(Default)]
pub struct UnitConverter<'a> {
    ontology: Option<&'a Graph>,
}

impl<'a> UnitConverter<'a> {
    pub fn new() -> Self {
        Self { ontology: None }
    }

    /// Copies unit metadata from `ontology` instead of the built-in table.
    pub fn with_ontology(ontology: &'a Graph) -> Self {
        Self {
            ontology: Some(ontology),
        }
    }

    pub fn convert(&self, graph: &mut Graph) -> AnalysisResult<ConversionReport> {
        let plan = self.plan(graph)?;
        let mut report = ConversionReport::default();
        let mut retired = BTreeSet::new();
        let mut targets = BTreeSet::new();

        for rewrite in plan {
            match rewrite.payload {
                Payload::Scalar(value) => {
                    graph.set(&rewrite.instance, pred::HAS_VALUE, Value::float32(value));
                }
                Payload::Samples(samples) => {
                    graph.set(
                        &rewrite.instance,
                        pred::HAS_ENCODED_DATA,
                        Value::base64(codec::encode_f32(&samples)),
                    );
                }
            }
            graph.set(&rewrite.instance, pred::HAS_UNITS, Value::Iri(rewrite.to.iri()));
            if rewrite.from != rewrite.to.iri() {
                retired.insert(rewrite.from);
            }
            targets.insert(rewrite.to);
            if let Some(dimension) = rewrite.to.dimension() {
                *report.converted.entry(dimension).or_insert(0) += 1;
            }
        }

        for unit_iri in retired {
            if graph.references(&Value::Iri(unit_iri.clone())) == 0 {
                graph.remove_subject(&unit_iri);
            }
        }
        for unit in targets {
            self.describe_unit(graph, unit);
        }

        info!(
            "Unit conversion rewrote {} instances ({} triples in graph)",
            report.total(),
            graph.len()
        );
        Ok(report)
    }

    fn plan(&self, graph: &Graph) -> AnalysisResult<Vec<Rewrite>> {
        let has_units = vocab::expand(pred::HAS_UNITS);
        let tagged: Vec<(String, String)> = graph
            .iter()
            .filter(|(_, predicate, _)| *predicate == has_units)
            .filter_map(|(subject, _, unit)| {
                unit.as_iri().map(|iri| (subject.to_string(), iri.to_string()))
            })
            .collect();

        let mut plan = Vec::with_capacity(tagged.len());
        for (instance, unit_iri) in tagged {
            let Some(unit) = self.resolve(graph, &instance, &unit_iri)? else {
                continue;
            };
            let Some(dimension) = unit.dimension() else {
                continue;
            };
            let target = dimension.canonical();

            if dimension.converts_scalars() {
                if let Some(value) = graph.first_object(&instance, pred::HAS_VALUE) {
                    let raw = value.as_f64().ok_or_else(|| {
                        AnalysisError::InvalidInput(format!(
                            "{instance}: hasValue {:?} is not numeric",
                            value.lexical()
                        ))
                    })?;
                    plan.push(Rewrite {
                        instance,
                        from: unit_iri,
                        to: target,
                        payload: Payload::Scalar(unit.to_canonical(raw) as f32),
                    });
                    continue;
                }
            }
            if dimension.converts_arrays() {
                if let Some(payload) = graph.first_object(&instance, pred::HAS_ENCODED_DATA) {
                    let samples = match graph
                        .first_object(&instance, pred::HAS_SIZE)
                        .and_then(|size| size.as_usize())
                    {
                        Some(declared) => codec::decode_checked(&instance, payload.lexical(), declared)?,
                        None => codec::decode_f32(payload.lexical())?,
                    };
                    let converted = samples
                        .iter()
                        .map(|&sample| unit.to_canonical(sample as f64) as f32)
                        .collect();
                    plan.push(Rewrite {
                        instance,
                        from: unit_iri,
                        to: target,
                        payload: Payload::Samples(converted),
                    });
                    continue;
                }
            }
            debug!(
                "{instance}: {} unit {} carries no convertible payload",
                dimension.name(),
                unit.local_name()
            );
        }
        Ok(plan)
    }

    /// Unknown IRIs are only an error when the graph types them as a unit of
    /// a dimension this converter handles.
    fn resolve(&self, graph: &Graph, instance: &str, unit_iri: &str) -> AnalysisResult<Option<Unit>> {
        if let Some(unit) = Unit::from_iri(unit_iri) {
            return Ok(Some(unit));
        }
        let typed = graph
            .types_of(unit_iri)
            .into_iter()
            .chain(self.ontology.map(|o| o.types_of(unit_iri)).unwrap_or_default())
            .find_map(|class| Dimension::from_class(&class));
        match typed {
            Some(dimension) => {
                warn!("{instance}: no conversion for {} unit {unit_iri}", dimension.name());
                Err(AnalysisError::UnsupportedUnit {
                    instance: instance.to_string(),
                    unit: unit_iri.to_string(),
                    dimension: dimension.name().to_string(),
                })
            }
            None => Ok(None),
        }
    }

    /// Copies a unit's metadata into `store`, from the ontology when it
    /// describes the unit and from the built-in table otherwise.
    pub fn describe_unit<S: PropertyStore + ?Sized>(&self, store: &mut S, unit: Unit) {
        let iri = unit.iri();
        if let Some(ontology) = self.ontology {
            let triples: Vec<(String, Value)> = ontology
                .iter()
                .filter(|(subject, _, _)| *subject == iri)
                .map(|(_, predicate, object)| (predicate.to_string(), object.clone()))
                .collect();
            if !triples.is_empty() {
                for (predicate, object) in triples {
                    store.add(&iri, &predicate, object);
                }
                return;
            }
        }
        if let Some(dimension) = unit.dimension() {
            store.add(&iri, pred::RDF_TYPE, Value::iri(dimension.class()));
        }
        store.add(&iri, pred::RDFS_LABEL, Value::string(unit.label()));
        store.add(&iri, pred::HAS_ABBREVIATION, Value::string(unit.abbreviation()));
    }
}

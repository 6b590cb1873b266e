//! Writes derived quantities back to the experiment graph.
//!
//! Everything hangs off the experiment's SecondaryData node, so clearing it
//! before a rerun only has to follow three links.

use crate::model::{to_f32, ExtractedSignal, PulseProperty, SeriesEntity};
use crate::processing::extractor::WaveSpeedUpdate;
use crate::store::{codec, PropertyStore, Value};
use crate::units::{Unit, UnitConverter};
use crate::vocab::{self, class, key, pred, Producer, SeriesKind, SECONDARY_DATA_INSTANCE};
use std::collections::BTreeSet;

const SECONDARY_LINKS: [&str; 3] = [
    pred::HAS_EXTRACTED_SIGNAL,
    pred::HAS_PULSE_PROPERTY,
    pred::HAS_SERIES_DATA,
];

pub struct SecondaryDataWriter<'s, S: PropertyStore + ?Sized> {
    store: &'s mut S,
    node: String,
    units: BTreeSet<Unit>,
}

impl<'s, S: PropertyStore + ?Sized> SecondaryDataWriter<'s, S> {
    /// Uses the experiment's SecondaryData node, creating it when absent.
    pub fn new(store: &'s mut S) -> Self {
        let node = match store.instances_of(class::SECONDARY_DATA).into_iter().next() {
            Some(node) => node,
            None => {
                store.add(
                    SECONDARY_DATA_INSTANCE,
                    pred::RDF_TYPE,
                    Value::iri(class::SECONDARY_DATA),
                );
                vocab::expand(SECONDARY_DATA_INSTANCE).into_owned()
            }
        };
        Self {
            store,
            node,
            units: BTreeSet::new(),
        }
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    fn linked(&self, link: &str) -> Vec<String> {
        self.store
            .objects(&self.node, link)
            .iter()
            .filter_map(Value::as_node)
            .collect()
    }

    /// Drops every derived entity and its link. Returns the triples removed.
    pub fn clear_all(&mut self) -> usize {
        let mut removed = 0;
        for link in SECONDARY_LINKS {
            for target in self.linked(link) {
                removed += self.store.remove(&target, None, None);
            }
            removed += self.store.remove(&self.node, Some(link), None);
        }
        removed
    }

    /// Drops only the series a given stage produces.
    pub fn clear_series(&mut self, producer: Producer) -> usize {
        let owned: Vec<String> = SeriesKind::ALL
            .iter()
            .filter(|kind| kind.producer() == producer)
            .map(|kind| vocab::expand(kind.instance()).into_owned())
            .collect();
        let mut removed = 0;
        for target in self.linked(pred::HAS_SERIES_DATA) {
            if owned.contains(&target) {
                removed += self.store.remove(&target, None, None);
                removed += self.store.remove(
                    &self.node,
                    Some(pred::HAS_SERIES_DATA),
                    Some(&Value::iri(&target)),
                );
            }
        }
        removed
    }

    fn fresh(&mut self, instance: &str, link: &str, classes: &[&str]) {
        self.store.remove(instance, None, None);
        for type_iri in classes {
            self.store.add(instance, pred::RDF_TYPE, Value::iri(type_iri));
        }
        self.store.add(&self.node, link, Value::iri(instance));
    }

    fn tag_unit(&mut self, instance: &str, unit_iri: &str) {
        self.store.add(instance, pred::HAS_UNITS, Value::iri(unit_iri));
        if let Some(unit) = Unit::from_iri(unit_iri) {
            self.units.insert(unit);
        }
    }

    fn encoded(&mut self, instance: &str, samples: &[f64]) {
        let samples = to_f32(samples);
        self.store.add(
            instance,
            pred::HAS_ENCODED_DATA,
            Value::base64(codec::encode_f32(&samples)),
        );
        self.store
            .add(instance, pred::HAS_ENCODING, Value::string("base64Binary"));
        self.store
            .add(instance, pred::HAS_SIZE, Value::int(samples.len() as i64));
    }

    pub fn pulse_properties(&mut self, properties: &[PulseProperty]) {
        for property in properties {
            let kind = property.kind;
            let instance = kind.instance();
            self.fresh(
                instance,
                pred::HAS_PULSE_PROPERTY,
                &[class::PULSE_PROPERTIES, kind.class()],
            );
            self.tag_unit(instance, kind.unit());
            self.store
                .add(instance, pred::HAS_VALUE, Value::float(property.value));
            self.store
                .add(instance, pred::HAS_DESCRIPTION, Value::string(kind.description()));
        }
    }

    pub fn extracted_signals(&mut self, signals: &[ExtractedSignal]) {
        for signal in signals {
            let role = signal.role;
            let instance = role.extracted_instance();
            let role_class = role.extracted_class();
            self.fresh(
                &instance,
                pred::HAS_EXTRACTED_SIGNAL,
                &[class::EXTRACTED_SIGNAL, role_class.as_str()],
            );
            self.tag_unit(&instance, role.extracted_unit());
            self.store
                .add(&instance, pred::HAS_LEGEND_NAME, Value::string(role.legend()));
            self.store.add(
                &instance,
                pred::HAS_DESCRIPTION,
                Value::string(role.extracted_description()),
            );
            self.encoded(&instance, &signal.samples);
        }
    }

    pub fn series(&mut self, series: &[SeriesEntity]) {
        for entity in series {
            let kind = entity.kind;
            let instance = kind.instance();
            self.fresh(
                instance,
                pred::HAS_SERIES_DATA,
                &[class::SERIES_DATA, kind.class()],
            );
            self.tag_unit(instance, kind.unit());
            self.store
                .add(instance, pred::HAS_LEGEND_NAME, Value::string(kind.legend()));
            self.store
                .add(instance, pred::HAS_DESCRIPTION, Value::string(kind.description()));
            self.encoded(instance, &entity.samples);
        }
    }

    /// Stores a calibrated wave speed on each bar, reusing its WaveSpeed node.
    pub fn wave_speeds(&mut self, updates: &[WaveSpeedUpdate]) {
        for update in updates {
            let node = match &update.node {
                Some(node) => node.clone(),
                None => {
                    let node = format!("{}_{}", update.bar, key::WAVE_SPEED);
                    self.store.add(
                        &update.bar,
                        pred::HAS_MECHANICAL_PROPERTY,
                        Value::iri(&node),
                    );
                    self.store
                        .add(&node, pred::RDF_TYPE, Value::iri(class::MECHANICAL_PROPERTY));
                    self.store
                        .add(&node, pred::RDF_TYPE, Value::Iri(vocab::dynamat(key::WAVE_SPEED)));
                    self.tag_unit(&node, &Unit::MeterPerSecond.iri());
                    node
                }
            };
            self.store.set(&node, pred::HAS_VALUE, Value::float(update.value));
        }
    }

    /// Describes every unit the derived entities written so far point at.
    pub fn describe_units(&mut self, converter: &UnitConverter) {
        for unit in std::mem::take(&mut self.units) {
            converter.describe_unit(&mut *self.store, unit);
        }
    }
}

use crate::prelude::{AnalysisError, AnalysisResult};
use crate::store::{codec, PropertyStore};
use crate::vocab::{self, class, key, pred, BarRole, SignalRole, TestType};
use std::collections::BTreeMap;

/// Numeric properties reachable from one owner node.
///
/// A property node is matched to a key by, in order: its `rdf:type`
/// (`dynamat:{key}`), its local name equal to the key or ending in `_{key}`,
/// and finally a unique local name containing the key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySet {
    owner: String,
    values: BTreeMap<&'static str, f64>,
    nodes: BTreeMap<&'static str, String>,
}

impl PropertySet {
    pub fn load<S: PropertyStore + ?Sized>(
        store: &S,
        owner: &str,
        predicates: &[&str],
        keys: &[&'static str],
    ) -> AnalysisResult<Self> {
        let candidates: Vec<String> = predicates
            .iter()
            .flat_map(|predicate| store.objects(owner, predicate))
            .filter_map(|value| value.as_node())
            .collect();

        let mut set = Self {
            owner: owner.to_string(),
            ..Self::default()
        };
        for &name in keys {
            let Some(node) = match_property(store, &candidates, name) else {
                continue;
            };
            let value = store
                .first_object(&node, pred::HAS_VALUE)
                .ok_or_else(|| AnalysisError::missing(node.as_str(), pred::HAS_VALUE))?;
            let number = value.as_f64().ok_or_else(|| {
                AnalysisError::InvalidInput(format!(
                    "{node}: {name} value {:?} is not numeric",
                    value.lexical()
                ))
            })?;
            set.values.insert(name, number);
            set.nodes.insert(name, node);
        }
        Ok(set)
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn require(&self, key: &str) -> AnalysisResult<f64> {
        self.get(key)
            .ok_or_else(|| AnalysisError::missing(self.owner.as_str(), key))
    }

    /// Node holding the value for `key`, when one was found.
    pub fn node(&self, key: &str) -> Option<&str> {
        self.nodes.get(key).map(String::as_str)
    }
}

fn match_property<S: PropertyStore + ?Sized>(
    store: &S,
    candidates: &[String],
    name: &str,
) -> Option<String> {
    let class = vocab::dynamat(name);
    if let Some(node) = candidates.iter().find(|node| store.has_type(node, &class)) {
        return Some(node.clone());
    }

    let suffix = format!("_{name}");
    if let Some(node) = candidates.iter().find(|node| {
        let local = vocab::local_name(node);
        local == name || local.ends_with(&suffix)
    }) {
        return Some(node.clone());
    }

    let mut loose = candidates
        .iter()
        .filter(|node| vocab::local_name(node).contains(name));
    match (loose.next(), loose.next()) {
        (Some(node), None) => Some(node.clone()),
        _ => None,
    }
}

/// A digitized sensor recording, decoded and size-checked.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSignal {
    pub instance: String,
    pub role: SignalRole,
    /// Unit IRI, expanded.
    pub unit: String,
    pub samples: Vec<f64>,
    pub gauge: Option<String>,
}

impl RawSignal {
    pub fn load<S: PropertyStore + ?Sized>(
        store: &S,
        instance: &str,
        role: SignalRole,
    ) -> AnalysisResult<Self> {
        let required = |predicate: &str| {
            store
                .first_object(instance, predicate)
                .ok_or_else(|| AnalysisError::missing(instance, predicate))
        };

        let encoding = required(pred::HAS_ENCODING)?;
        let encoding_name = vocab::local_name(encoding.lexical());
        if !codec::ACCEPTED_ENCODINGS.contains(&encoding_name) {
            return Err(AnalysisError::UnsupportedEncoding {
                instance: instance.to_string(),
                encoding: encoding.lexical().to_string(),
            });
        }
        let size = required(pred::HAS_SIZE)?;
        let declared = size.as_usize().ok_or_else(|| {
            AnalysisError::InvalidInput(format!("{instance}: size {:?} is not a count", size.lexical()))
        })?;
        let payload = required(pred::HAS_ENCODED_DATA)?;
        let unit = required(pred::HAS_UNITS)?
            .as_iri()
            .map(str::to_string)
            .ok_or_else(|| AnalysisError::missing(instance, pred::HAS_UNITS))?;

        let samples = codec::decode_checked(instance, payload.lexical(), declared)?
            .into_iter()
            .map(f64::from)
            .collect();

        Ok(Self {
            instance: vocab::expand(instance).into_owned(),
            role,
            unit,
            samples,
            gauge: store
                .first_object(instance, pred::HAS_STRAIN_GAUGE)
                .and_then(|value| value.as_node()),
        })
    }

    pub fn has_unit(&self, unit: &str) -> bool {
        self.unit == vocab::expand(unit)
    }
}

/// Geometry, material and gauge placement of one bar.
#[derive(Debug, Clone, PartialEq)]
pub struct BarRecord {
    pub role: BarRole,
    pub instance: String,
    pub properties: PropertySet,
    pub gauges: Vec<String>,
}

impl BarRecord {
    const KEYS: [&'static str; 6] = [
        key::ORIGINAL_LENGTH,
        key::CROSS_SECTION,
        key::DENSITY,
        key::ELASTIC_MODULUS,
        key::WAVE_SPEED,
        key::VELOCITY,
    ];

    pub fn load<S: PropertyStore + ?Sized>(
        store: &S,
        role: BarRole,
    ) -> AnalysisResult<Self> {
        let instance = store
            .instances_of(role.class())
            .into_iter()
            .next()
            .ok_or_else(|| AnalysisError::missing("experiment", role.class()))?;
        let properties = PropertySet::load(
            store,
            &instance,
            &[pred::HAS_DIMENSION, pred::HAS_MECHANICAL_PROPERTY],
            &Self::KEYS,
        )?;
        let gauges = store
            .objects(&instance, pred::HAS_STRAIN_GAUGE)
            .iter()
            .filter_map(|value| value.as_node())
            .collect();
        Ok(Self {
            role,
            instance,
            properties,
            gauges,
        })
    }

    pub fn require(&self, key: &str) -> AnalysisResult<f64> {
        self.properties.require(key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentRecord {
    pub test_name: Option<String>,
    pub test_type: TestType,
    pub test_mode: Option<String>,
    pub test_temperature: Option<String>,
    pub secondary_data: Option<String>,
    pub incident_bar: BarRecord,
    pub transmitted_bar: BarRecord,
    pub striker_bar: BarRecord,
    pub specimen: Option<PropertySet>,
    pub gauges: BTreeMap<String, PropertySet>,
    pub signals: Vec<RawSignal>,
}

impl ExperimentRecord {
    /// Reads everything the analysis needs in one pass over the store.
    pub fn load<S: PropertyStore + ?Sized>(store: &S) -> AnalysisResult<Self> {
        let conditions = store
            .instances_of(class::TESTING_CONDITIONS)
            .into_iter()
            .next()
            .ok_or_else(|| AnalysisError::missing("experiment", class::TESTING_CONDITIONS))?;
        let type_value = store
            .first_object(&conditions, pred::HAS_TEST_TYPE)
            .ok_or_else(|| AnalysisError::missing(conditions.as_str(), pred::HAS_TEST_TYPE))?;
        let test_type = TestType::from_iri(type_value.lexical()).ok_or_else(|| {
            AnalysisError::InvalidInput(format!("unknown test type {}", type_value.lexical()))
        })?;
        let iri_of = |subject: &str, predicate: &str| {
            store
                .first_object(subject, predicate)
                .and_then(|value| value.as_iri().map(str::to_string))
        };

        let test_name = store
            .instances_of(class::METADATA)
            .first()
            .and_then(|metadata| store.first_object(metadata, pred::HAS_TEST_NAME))
            .map(|value| value.lexical().to_string());

        let specimen = match store.instances_of(class::SPECIMEN).first() {
            Some(instance) => Some(PropertySet::load(
                store,
                instance,
                &[pred::HAS_DIMENSION],
                &[key::ORIGINAL_LENGTH, key::CROSS_SECTION],
            )?),
            None => None,
        };

        let mut signals = Vec::new();
        for role in [
            SignalRole::Incident,
            SignalRole::Transmitted,
            SignalRole::Time,
            SignalRole::Temperature,
        ] {
            let Some(class) = role.sensor_class() else {
                continue;
            };
            for instance in store.instances_of(&class) {
                signals.push(RawSignal::load(store, &instance, role)?);
            }
        }

        let incident_bar = BarRecord::load(store, BarRole::Incident)?;
        let transmitted_bar = BarRecord::load(store, BarRole::Transmitted)?;
        let striker_bar = BarRecord::load(store, BarRole::Striker)?;

        let mut gauges = BTreeMap::new();
        let referenced = signals
            .iter()
            .filter_map(|signal| signal.gauge.clone())
            .chain(incident_bar.gauges.iter().cloned())
            .chain(transmitted_bar.gauges.iter().cloned());
        for gauge in referenced {
            if gauges.contains_key(&gauge) {
                continue;
            }
            let properties = PropertySet::load(
                store,
                &gauge,
                &[pred::HAS_STRAIN_GAUGE_PROPERTY, pred::HAS_DIMENSION],
                &[
                    key::GAUGE_RESISTANCE,
                    key::GAUGE_FACTOR,
                    key::CALIBRATION_VOLTAGE,
                    key::CALIBRATION_RESISTANCE,
                    key::DISTANCE,
                ],
            )?;
            gauges.insert(gauge, properties);
        }

        Ok(Self {
            test_name,
            test_type,
            test_mode: iri_of(&conditions, pred::HAS_TEST_MODE),
            test_temperature: iri_of(&conditions, pred::HAS_TEST_TEMPERATURE),
            secondary_data: store.instances_of(class::SECONDARY_DATA).into_iter().next(),
            incident_bar,
            transmitted_bar,
            striker_bar,
            specimen,
            gauges,
            signals,
        })
    }

    /// Label used to scope log lines and reports.
    pub fn label(&self) -> String {
        self.test_name
            .clone()
            .unwrap_or_else(|| "unnamed experiment".to_string())
    }

    pub fn signals_of(&self, role: SignalRole) -> Vec<&RawSignal> {
        self.signals.iter().filter(|s| s.role == role).collect()
    }

    /// Gauge-to-specimen distance of a bar's first strain gauge.
    pub fn gauge_distance(&self, bar: &BarRecord) -> AnalysisResult<f64> {
        let gauge = bar
            .gauges
            .first()
            .ok_or_else(|| AnalysisError::missing(bar.instance.as_str(), pred::HAS_STRAIN_GAUGE))?;
        self.gauge_properties(gauge)?.require(key::DISTANCE)
    }

    pub fn gauge_properties(&self, gauge: &str) -> AnalysisResult<&PropertySet> {
        self.gauges
            .get(gauge)
            .ok_or_else(|| AnalysisError::missing(gauge, pred::HAS_STRAIN_GAUGE_PROPERTY))
    }

    pub fn bar(&self, role: BarRole) -> &BarRecord {
        match role {
            BarRole::Incident => &self.incident_bar,
            BarRole::Transmitted => &self.transmitted_bar,
            BarRole::Striker => &self.striker_bar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Graph, Value};

    fn property(graph: &mut Graph, owner: &str, link: &str, node: &str, value: f64) {
        graph.add(owner, link, Value::iri(node));
        graph.add(node, pred::HAS_VALUE, Value::float(value));
    }

    #[test]
    fn resistance_key_does_not_match_calibration_resistance() {
        let mut graph = Graph::new();
        let gauge = "dynamat:SG";
        property(&mut graph, gauge, pred::HAS_STRAIN_GAUGE_PROPERTY, "dynamat:SG_CalibrationResistance", 59950.0);
        property(&mut graph, gauge, pred::HAS_STRAIN_GAUGE_PROPERTY, "dynamat:SG_Resistance", 120.0);

        let set = PropertySet::load(
            &graph,
            gauge,
            &[pred::HAS_STRAIN_GAUGE_PROPERTY],
            &[key::GAUGE_RESISTANCE, key::CALIBRATION_RESISTANCE],
        )
        .unwrap();

        assert_eq!(set.get(key::GAUGE_RESISTANCE), Some(120.0));
        assert_eq!(set.get(key::CALIBRATION_RESISTANCE), Some(59950.0));
    }

    #[test]
    fn rdf_type_wins_over_naming() {
        let mut graph = Graph::new();
        property(&mut graph, "dynamat:Bar", pred::HAS_MECHANICAL_PROPERTY, "_:p1", 5000.0);
        graph.add("_:p1", pred::RDF_TYPE, Value::iri("dynamat:WaveSpeed"));
        property(&mut graph, "dynamat:Bar", pred::HAS_MECHANICAL_PROPERTY, "dynamat:Bar_WaveSpeed_old", 1.0);

        let set = PropertySet::load(
            &graph,
            "dynamat:Bar",
            &[pred::HAS_MECHANICAL_PROPERTY],
            &[key::WAVE_SPEED],
        )
        .unwrap();

        assert_eq!(set.get(key::WAVE_SPEED), Some(5000.0));
        assert_eq!(set.node(key::WAVE_SPEED), Some("_:p1"));
    }

    #[test]
    fn ambiguous_loose_match_is_not_guessed() {
        let mut graph = Graph::new();
        property(&mut graph, "dynamat:S", pred::HAS_DIMENSION, "dynamat:LengthA", 1.0);
        property(&mut graph, "dynamat:S", pred::HAS_DIMENSION, "dynamat:LengthB", 2.0);

        let set = PropertySet::load(&graph, "dynamat:S", &[pred::HAS_DIMENSION], &["Length"]).unwrap();

        assert_eq!(set.get("Length"), None);
        let err = set.require("Length").unwrap_err();
        assert!(matches!(err, AnalysisError::MissingProperty { ref property, .. } if property == "Length"));
    }

    #[test]
    fn property_node_without_value_is_missing() {
        let mut graph = Graph::new();
        graph.add("dynamat:S", pred::HAS_DIMENSION, Value::iri("dynamat:S_OriginalLength"));
        graph.add("dynamat:S_OriginalLength", pred::HAS_UNITS, Value::iri("dynamat:Millimeter"));

        let err = PropertySet::load(&graph, "dynamat:S", &[pred::HAS_DIMENSION], &[key::ORIGINAL_LENGTH])
            .unwrap_err();

        assert!(matches!(err, AnalysisError::MissingProperty { ref property, .. } if property == pred::HAS_VALUE));
    }

    #[test]
    fn raw_signal_rejects_unknown_encoding() {
        let mut graph = Graph::new();
        let signal = "dynamat:IncidentSensorSignal_0";
        graph.add(signal, pred::HAS_ENCODING, Value::string("hex"));
        graph.add(signal, pred::HAS_SIZE, Value::int(1));
        graph.add(signal, pred::HAS_ENCODED_DATA, Value::base64(codec::encode_f32(&[1.0])));
        graph.add(signal, pred::HAS_UNITS, Value::iri("dynamat:Volts"));

        let err = RawSignal::load(&graph, signal, SignalRole::Incident).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedEncoding { .. }));

        graph.set(signal, pred::HAS_ENCODING, Value::string("base64"));
        let raw = RawSignal::load(&graph, signal, SignalRole::Incident).unwrap();
        assert_eq!(raw.samples, vec![1.0]);
        assert!(raw.has_unit("dynamat:Volts"));
        assert_eq!(raw.gauge, None);
    }
}

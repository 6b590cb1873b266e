use super::GaugeCalibration;
use crate::store::{codec, Graph, PropertyStore, Value};
use crate::units::Unit;
use crate::vocab::{class, key, pred, BarRole, SignalRole, TestType};

/// Geometry and material of a bar, in canonical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarSpec {
    /// mm
    pub length: f64,
    /// mm²
    pub cross_section: f64,
    /// kg/mm³
    pub density: f64,
    /// MPa
    pub elastic_modulus: f64,
    /// m/s
    pub wave_speed: Option<f64>,
    /// m/s, striker only.
    pub velocity: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeSpec {
    pub calibration: GaugeCalibration,
    /// Gauge-to-specimen distance in mm.
    pub distance: f64,
}

/// Authors the primary-data part of an experiment graph.
///
/// Property nodes follow the `{owner}_{Property}` naming convention and are
/// typed with their property class, so both lookup routes find them.
pub struct ExperimentWriter {
    graph: Graph,
    name: String,
}

impl ExperimentWriter {
    pub fn new(test_name: &str, test_type: TestType) -> Self {
        let mut graph = Graph::new();
        let metadata = format!("dynamat:{test_name}_Metadata");
        graph.add(&metadata, pred::RDF_TYPE, Value::iri(class::METADATA));
        graph.add(&metadata, pred::HAS_TEST_NAME, Value::string(test_name));

        let conditions = format!("dynamat:{test_name}_TestingConditions");
        graph.add(&conditions, pred::RDF_TYPE, Value::iri(class::TESTING_CONDITIONS));
        graph.add(&conditions, pred::HAS_TEST_TYPE, Value::iri(test_type.iri()));
        graph.add(&conditions, pred::HAS_TEST_MODE, Value::iri("dynamat:LABMode"));
        graph.add(
            &conditions,
            pred::HAS_TEST_TEMPERATURE,
            Value::iri("dynamat:RoomTemperature"),
        );

        graph.add("dynamat:Experiment_Primary_Data", pred::RDF_TYPE, Value::iri(class::PRIMARY_DATA));
        Self {
            graph,
            name: test_name.to_string(),
        }
    }

    fn conditions(&self) -> String {
        format!("dynamat:{}_TestingConditions", self.name)
    }

    pub fn test_mode(&mut self, mode: &str) -> &mut Self {
        self.graph
            .set(&self.conditions(), pred::HAS_TEST_MODE, Value::iri(mode));
        self
    }

    pub fn test_temperature(&mut self, temperature: &str) -> &mut Self {
        self.graph
            .set(&self.conditions(), pred::HAS_TEST_TEMPERATURE, Value::iri(temperature));
        self
    }

    fn property(&mut self, owner: &str, link: &str, name: &str, value: f64, unit: Unit) {
        let node = format!("{owner}_{name}");
        let kind = if link == pred::HAS_DIMENSION {
            class::DIMENSION
        } else if link == pred::HAS_STRAIN_GAUGE_PROPERTY {
            class::STRAIN_GAUGE_PROPERTY
        } else {
            class::MECHANICAL_PROPERTY
        };
        self.graph.add(owner, link, Value::iri(&node));
        self.graph.add(&node, pred::RDF_TYPE, Value::iri(kind));
        self.graph.add(&node, pred::RDF_TYPE, Value::iri(&format!("dynamat:{name}")));
        self.graph.add(&node, pred::HAS_VALUE, Value::float(value));
        self.graph.add(&node, pred::HAS_UNITS, Value::Iri(unit.iri()));
    }

    /// Adds a bar and returns its IRI.
    pub fn bar(&mut self, role: BarRole, spec: &BarSpec) -> String {
        let bar = format!("{}_{}", role.class(), self.name);
        self.graph.add(&bar, pred::RDF_TYPE, Value::iri(class::BAR));
        self.graph.add(&bar, pred::RDF_TYPE, Value::iri(role.class()));

        self.property(&bar, pred::HAS_DIMENSION, key::ORIGINAL_LENGTH, spec.length, Unit::Millimeter);
        self.property(
            &bar,
            pred::HAS_DIMENSION,
            key::CROSS_SECTION,
            spec.cross_section,
            Unit::SquareMillimeters,
        );
        self.property(
            &bar,
            pred::HAS_MECHANICAL_PROPERTY,
            key::DENSITY,
            spec.density,
            Unit::KilogramPerCubicMillimeter,
        );
        self.property(
            &bar,
            pred::HAS_MECHANICAL_PROPERTY,
            key::ELASTIC_MODULUS,
            spec.elastic_modulus,
            Unit::Megapascal,
        );
        if let Some(speed) = spec.wave_speed {
            self.property(&bar, pred::HAS_MECHANICAL_PROPERTY, key::WAVE_SPEED, speed, Unit::MeterPerSecond);
        }
        if let Some(velocity) = spec.velocity {
            self.property(&bar, pred::HAS_DIMENSION, key::VELOCITY, velocity, Unit::MeterPerSecond);
        }
        bar
    }

    /// Attaches a strain gauge to `bar` and returns the gauge IRI.
    pub fn gauge(&mut self, bar: &str, spec: &GaugeSpec) -> String {
        let gauge = format!("{bar}_SG");
        self.graph.add(bar, pred::HAS_STRAIN_GAUGE, Value::iri(&gauge));
        self.graph.add(&gauge, pred::RDF_TYPE, Value::iri(class::STRAIN_GAUGE));

        let link = pred::HAS_STRAIN_GAUGE_PROPERTY;
        let cal = &spec.calibration;
        self.property(&gauge, link, key::GAUGE_RESISTANCE, cal.resistance, Unit::Ohms);
        self.property(&gauge, link, key::GAUGE_FACTOR, cal.gauge_factor, Unit::Unitless);
        self.property(&gauge, link, key::CALIBRATION_VOLTAGE, cal.calibration_voltage, Unit::Volts);
        self.property(
            &gauge,
            link,
            key::CALIBRATION_RESISTANCE,
            cal.calibration_resistance,
            Unit::Ohms,
        );
        self.property(&gauge, pred::HAS_DIMENSION, key::DISTANCE, spec.distance, Unit::Millimeter);
        gauge
    }

    pub fn specimen(&mut self, length: f64, cross_section: f64) -> String {
        let specimen = format!("dynamat:SHPBSpecimen_{}", self.name);
        self.graph.add(&specimen, pred::RDF_TYPE, Value::iri(class::SPECIMEN));
        self.property(&specimen, pred::HAS_DIMENSION, key::ORIGINAL_LENGTH, length, Unit::Millimeter);
        self.property(
            &specimen,
            pred::HAS_DIMENSION,
            key::CROSS_SECTION,
            cross_section,
            Unit::SquareMillimeters,
        );
        specimen
    }

    /// Records a raw signal; `index` distinguishes several signals of one role.
    pub fn sensor_signal(
        &mut self,
        role: SignalRole,
        index: usize,
        samples: &[f32],
        unit: Unit,
        gauge: Option<&str>,
    ) -> Option<String> {
        let role_class = role.sensor_class()?;
        let signal = format!("{role_class}_{index}");
        self.graph.add(&signal, pred::RDF_TYPE, Value::iri(class::SENSOR_SIGNAL));
        self.graph.add(&signal, pred::RDF_TYPE, Value::Iri(role_class));
        self.graph.add(&signal, pred::HAS_UNITS, Value::Iri(unit.iri()));
        self.graph.add(
            &signal,
            pred::HAS_ENCODED_DATA,
            Value::base64(codec::encode_f32(samples)),
        );
        self.graph.add(&signal, pred::HAS_ENCODING, Value::string("base64Binary"));
        self.graph.add(&signal, pred::HAS_SIZE, Value::int(samples.len() as i64));
        self.graph.add(
            "dynamat:Experiment_Primary_Data",
            pred::HAS_SENSOR_SIGNAL,
            Value::iri(&signal),
        );
        if let Some(gauge) = gauge {
            self.graph.add(&signal, pred::HAS_STRAIN_GAUGE, Value::iri(gauge));
        }
        Some(signal)
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn finish(self) -> Graph {
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExperimentRecord;

    fn steel() -> BarSpec {
        BarSpec {
            length: 1828.8,
            cross_section: 126.677,
            density: 8.0e-6,
            elastic_modulus: 200_000.0,
            wave_speed: Some(5000.0),
            velocity: None,
        }
    }

    #[test]
    fn written_experiment_loads_back_as_a_record() {
        let gauge = GaugeSpec {
            calibration: GaugeCalibration {
                resistance: 120.0,
                gauge_factor: 2.06,
                calibration_voltage: 2.0,
                calibration_resistance: 59_950.0,
            },
            distance: 900.0,
        };
        let mut writer = ExperimentWriter::new("T01", TestType::SpecimenTest);
        let incident = writer.bar(BarRole::Incident, &steel());
        let transmitted = writer.bar(BarRole::Transmitted, &steel());
        writer.bar(
            BarRole::Striker,
            &BarSpec {
                length: 304.8,
                velocity: Some(10.0),
                ..steel()
            },
        );
        let sg_in = writer.gauge(&incident, &gauge);
        writer.gauge(&transmitted, &gauge);
        writer.specimen(10.0, 50.0);
        writer.sensor_signal(SignalRole::Incident, 0, &[0.0, -0.1], Unit::Volts, Some(&sg_in));
        writer.sensor_signal(SignalRole::Time, 0, &[0.0, 0.1], Unit::Millisecond, None);

        let record = ExperimentRecord::load(&writer.finish()).unwrap();

        assert_eq!(record.test_name.as_deref(), Some("T01"));
        assert_eq!(record.test_type, TestType::SpecimenTest);
        assert_eq!(record.striker_bar.require(key::VELOCITY).unwrap(), 10.0);
        assert_eq!(record.gauge_distance(&record.incident_bar).unwrap(), 900.0);
        let calibration =
            GaugeCalibration::from_properties(record.gauge_properties(&record.incident_bar.gauges[0]).unwrap())
                .unwrap();
        assert_eq!(calibration, gauge.calibration);
        assert_eq!(record.signals_of(SignalRole::Incident).len(), 1);
        assert_eq!(
            record.specimen.as_ref().unwrap().get(key::CROSS_SECTION),
            Some(50.0)
        );
    }

    #[test]
    fn reflected_role_has_no_sensor_signal() {
        let mut writer = ExperimentWriter::new("T02", TestType::PulseTest);
        assert!(writer
            .sensor_signal(SignalRole::Reflected, 0, &[0.0], Unit::Unitless, None)
            .is_none());
    }
}

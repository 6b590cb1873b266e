//! DynaMat ontology vocabulary and the typed identities of every derived quantity.
//!
//! Names are written as prefixed names (`dynamat:hasValue`); the store expands
//! them on the way in, so callers never splice IRIs by hand.

use std::borrow::Cow;

pub const DYNAMAT: &str =
    "https://github.com/UTEP-Dynamic-Materials-Lab/SHPB_Toolkit/tree/main/ontology#";
pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
pub const OWL: &str = "http://www.w3.org/2002/07/owl#";

pub const PREFIXES: &[(&str, &str)] = &[
    ("dynamat", DYNAMAT),
    ("rdf", RDF),
    ("rdfs", RDFS),
    ("xsd", XSD),
    ("owl", OWL),
];

/// Expands a prefixed name; full IRIs and blank-node labels pass through.
pub fn expand(name: &str) -> Cow<'_, str> {
    if name.starts_with("http://") || name.starts_with("https://") || name.starts_with("_:") {
        return Cow::Borrowed(name);
    }
    if let Some((prefix, local)) = name.split_once(':') {
        if let Some((_, namespace)) = PREFIXES.iter().find(|(p, _)| *p == prefix) {
            return Cow::Owned(format!("{namespace}{local}"));
        }
    }
    Cow::Borrowed(name)
}

pub fn dynamat(local: &str) -> String {
    format!("{DYNAMAT}{local}")
}

/// Fragment or last path segment of an IRI.
pub fn local_name(iri: &str) -> &str {
    iri.rsplit(['#', '/']).next().unwrap_or(iri)
}

pub mod pred {
    pub const RDF_TYPE: &str = "rdf:type";
    pub const RDFS_LABEL: &str = "rdfs:label";
    pub const HAS_VALUE: &str = "dynamat:hasValue";
    pub const HAS_UNITS: &str = "dynamat:hasUnits";
    pub const HAS_ENCODED_DATA: &str = "dynamat:hasEncodedData";
    pub const HAS_ENCODING: &str = "dynamat:hasEncoding";
    pub const HAS_SIZE: &str = "dynamat:hasSize";
    pub const HAS_LEGEND_NAME: &str = "dynamat:hasLegendName";
    pub const HAS_DESCRIPTION: &str = "dynamat:hasDescription";
    pub const HAS_ABBREVIATION: &str = "dynamat:hasAbbreviation";
    pub const HAS_STRAIN_GAUGE: &str = "dynamat:hasStrainGauge";
    pub const HAS_STRAIN_GAUGE_PROPERTY: &str = "dynamat:hasStrainGaugeProperty";
    pub const HAS_DIMENSION: &str = "dynamat:hasDimension";
    pub const HAS_MECHANICAL_PROPERTY: &str = "dynamat:hasMechanicalProperty";
    pub const HAS_TEST_NAME: &str = "dynamat:hasTestName";
    pub const HAS_TEST_TYPE: &str = "dynamat:hasTestType";
    pub const HAS_TEST_MODE: &str = "dynamat:hasTestMode";
    pub const HAS_TEST_TEMPERATURE: &str = "dynamat:hasTestTemperature";
    pub const HAS_SENSOR_SIGNAL: &str = "dynamat:hasSensorSignal";
    pub const HAS_EXTRACTED_SIGNAL: &str = "dynamat:hasExtractedSignal";
    pub const HAS_PULSE_PROPERTY: &str = "dynamat:hasPulseProperty";
    pub const HAS_SERIES_DATA: &str = "dynamat:hasSeriesData";
    pub const HAS_BAR: &str = "dynamat:hasBar";
    pub const HAS_SPECIMEN: &str = "dynamat:hasSpecimen";
}

pub mod class {
    pub const METADATA: &str = "dynamat:Metadata";
    pub const TESTING_CONDITIONS: &str = "dynamat:TestingConditions";
    pub const PRIMARY_DATA: &str = "dynamat:PrimaryData";
    pub const SECONDARY_DATA: &str = "dynamat:SecondaryData";
    pub const BAR: &str = "dynamat:Bar";
    pub const INCIDENT_BAR: &str = "dynamat:IncidentBar";
    pub const TRANSMITTED_BAR: &str = "dynamat:TransmittedBar";
    pub const STRIKER_BAR: &str = "dynamat:StrikerBar";
    pub const SPECIMEN: &str = "dynamat:SHPBSpecimen";
    pub const STRAIN_GAUGE: &str = "dynamat:StrainGauge";
    pub const SENSOR_SIGNAL: &str = "dynamat:SensorSignal";
    pub const EXTRACTED_SIGNAL: &str = "dynamat:ExtractedSignal";
    pub const PULSE_PROPERTIES: &str = "dynamat:PulseProperties";
    pub const SERIES_DATA: &str = "dynamat:SeriesData";
    pub const MECHANICAL_PROPERTY: &str = "dynamat:MechanicalProperty";
    pub const DIMENSION: &str = "dynamat:Dimension";
    pub const STRAIN_GAUGE_PROPERTY: &str = "dynamat:StrainGaugeProperty";
}

/// Property-node keys, matched against the node's class or IRI local name.
pub mod key {
    pub const ORIGINAL_LENGTH: &str = "OriginalLength";
    pub const CROSS_SECTION: &str = "OriginalCrossSectionalArea";
    pub const DENSITY: &str = "Density";
    pub const ELASTIC_MODULUS: &str = "ElasticModulus";
    pub const WAVE_SPEED: &str = "WaveSpeed";
    pub const VELOCITY: &str = "Velocity";
    pub const DISTANCE: &str = "Distance";
    pub const GAUGE_RESISTANCE: &str = "Resistance";
    pub const GAUGE_FACTOR: &str = "GaugeFactor";
    pub const CALIBRATION_VOLTAGE: &str = "CalibrationVoltage";
    pub const CALIBRATION_RESISTANCE: &str = "CalibrationResistance";
}

pub const SECONDARY_DATA_INSTANCE: &str = "dynamat:Experiment_Secondary_Data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestType {
    SpecimenTest,
    PulseTest,
}

impl TestType {
    pub fn from_iri(iri: &str) -> Option<Self> {
        match local_name(iri) {
            "SpecimenTest" => Some(TestType::SpecimenTest),
            "PulseTest" => Some(TestType::PulseTest),
            _ => None,
        }
    }

    pub fn iri(self) -> &'static str {
        match self {
            TestType::SpecimenTest => "dynamat:SpecimenTest",
            TestType::PulseTest => "dynamat:PulseTest",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarRole {
    Incident,
    Transmitted,
    Striker,
}

impl BarRole {
    pub const ALL: [BarRole; 3] = [BarRole::Incident, BarRole::Transmitted, BarRole::Striker];

    pub fn class(self) -> &'static str {
        match self {
            BarRole::Incident => class::INCIDENT_BAR,
            BarRole::Transmitted => class::TRANSMITTED_BAR,
            BarRole::Striker => class::STRIKER_BAR,
        }
    }
}

/// Physical role of a signal in the bar setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalRole {
    Incident,
    Reflected,
    Transmitted,
    Time,
    Temperature,
}

impl SignalRole {
    fn stem(self) -> &'static str {
        match self {
            SignalRole::Incident => "Incident",
            SignalRole::Reflected => "Reflected",
            SignalRole::Transmitted => "Transmitted",
            SignalRole::Time => "Time",
            SignalRole::Temperature => "Temperature",
        }
    }

    /// Class of the raw recording; reflected waves have no sensor of their own.
    pub fn sensor_class(self) -> Option<String> {
        match self {
            SignalRole::Reflected => None,
            role => Some(dynamat(&format!("{}SensorSignal", role.stem()))),
        }
    }

    pub fn extracted_class(self) -> String {
        dynamat(&format!("{}ExtractedSignal", self.stem()))
    }

    pub fn extracted_instance(self) -> String {
        dynamat(&format!("{}ExtractedSignal_0", self.stem()))
    }

    pub fn legend(self) -> &'static str {
        self.stem()
    }

    pub fn extracted_description(self) -> String {
        format!("Extracted {} Signal from SG", self.stem())
    }

    /// Unit carried by the extracted window.
    pub fn extracted_unit(self) -> &'static str {
        match self {
            SignalRole::Time => "dynamat:Millisecond",
            SignalRole::Temperature => "dynamat:DegreesCelsius",
            _ => "dynamat:Unitless",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PulsePropertyKind {
    Duration,
    Length,
    Speed,
    StressAmplitude,
    StrainAmplitude,
}

impl PulsePropertyKind {
    pub const ALL: [PulsePropertyKind; 5] = [
        PulsePropertyKind::Duration,
        PulsePropertyKind::Length,
        PulsePropertyKind::Speed,
        PulsePropertyKind::StressAmplitude,
        PulsePropertyKind::StrainAmplitude,
    ];

    pub fn class(self) -> &'static str {
        match self {
            PulsePropertyKind::Duration => "dynamat:PulseDuration",
            PulsePropertyKind::Length => "dynamat:PulseLength",
            PulsePropertyKind::Speed => "dynamat:PulseSpeed",
            PulsePropertyKind::StressAmplitude => "dynamat:PulseStressAmplitude",
            PulsePropertyKind::StrainAmplitude => "dynamat:PulseStrainAmplitude",
        }
    }

    pub fn instance(self) -> &'static str {
        match self {
            PulsePropertyKind::Duration => "dynamat:Pulse_Duration",
            PulsePropertyKind::Length => "dynamat:Pulse_Length",
            PulsePropertyKind::Speed => "dynamat:Pulse_Speed",
            PulsePropertyKind::StressAmplitude => "dynamat:Pulse_Stress_Amplitude",
            PulsePropertyKind::StrainAmplitude => "dynamat:Pulse_Strain_Amplitude",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            PulsePropertyKind::Duration => "dynamat:Millisecond",
            PulsePropertyKind::Length => "dynamat:Millimeter",
            PulsePropertyKind::Speed => "dynamat:MeterPerSecond",
            PulsePropertyKind::StressAmplitude => "dynamat:Megapascal",
            PulsePropertyKind::StrainAmplitude => "dynamat:Unitless",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PulsePropertyKind::Duration => "Test wave pulse duration",
            PulsePropertyKind::Length => "Test wave pulse length",
            PulsePropertyKind::Speed => "Test wave pulse speed",
            PulsePropertyKind::StressAmplitude => "Test pulse stress amplitude",
            PulsePropertyKind::StrainAmplitude => "Test pulse strain amplitude",
        }
    }
}

/// Which analysis stage writes a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Producer {
    Extraction,
    Series,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesKind {
    ParticleVelocityFront,
    ParticleVelocityBack,
    EngineeringStrainRate,
    EngineeringStrain,
    TrueStrain,
    EngineeringStressFront,
    EngineeringStressBack,
    TrueStressFront,
    TrueStressBack,
    IncidentStrainEnergy,
    ReflectedStrainEnergy,
    TransmittedStrainEnergy,
    AbsorbedElasticEnergy,
    AbsorbedKineticEnergy,
    TotalAbsorbedEnergy,
}

/// Row of the series lookup table: (class, instance, unit, legend, description).
type SeriesRow = (&'static str, &'static str, &'static str, &'static str, &'static str);

impl SeriesKind {
    pub const ALL: [SeriesKind; 15] = [
        SeriesKind::ParticleVelocityFront,
        SeriesKind::ParticleVelocityBack,
        SeriesKind::EngineeringStrainRate,
        SeriesKind::EngineeringStrain,
        SeriesKind::TrueStrain,
        SeriesKind::EngineeringStressFront,
        SeriesKind::EngineeringStressBack,
        SeriesKind::TrueStressFront,
        SeriesKind::TrueStressBack,
        SeriesKind::IncidentStrainEnergy,
        SeriesKind::ReflectedStrainEnergy,
        SeriesKind::TransmittedStrainEnergy,
        SeriesKind::AbsorbedElasticEnergy,
        SeriesKind::AbsorbedKineticEnergy,
        SeriesKind::TotalAbsorbedEnergy,
    ];

    fn row(self) -> SeriesRow {
        match self {
            SeriesKind::ParticleVelocityFront => (
                "dynamat:ParticleVelocity",
                "dynamat:ParticleVelocity_1_Series",
                "dynamat:MeterPerSecond",
                "Front Surface",
                "Incident - Specimen Particle Velocity determined from pulse strains",
            ),
            SeriesKind::ParticleVelocityBack => (
                "dynamat:ParticleVelocity",
                "dynamat:ParticleVelocity_2_Series",
                "dynamat:MeterPerSecond",
                "Back Surface",
                "Transmitted - Specimen Particle Velocity determined from pulse strains",
            ),
            SeriesKind::EngineeringStrainRate => (
                "dynamat:EngineeringStrainRate",
                "dynamat:EngineeringStrainRate_Series",
                "dynamat:Hertz",
                "Engineering Strain Rate",
                "Engineering Strain Rate determined from pulse strains",
            ),
            SeriesKind::EngineeringStrain => (
                "dynamat:EngineeringStrain",
                "dynamat:EngineeringStrain_Series",
                "dynamat:Unitless",
                "Engineering Strain",
                "Engineering Strain determined from pulse strains",
            ),
            SeriesKind::TrueStrain => (
                "dynamat:TrueStrain",
                "dynamat:TrueStrain_Series",
                "dynamat:Unitless",
                "True Strain",
                "True Strain determined from pulse strains",
            ),
            SeriesKind::EngineeringStressFront => (
                "dynamat:EngineeringStress",
                "dynamat:EngineeringStress_Series_1",
                "dynamat:Megapascal",
                "Engineering Stress Front",
                "Engineering Stress at the incident / specimen determined from pulse strains",
            ),
            SeriesKind::EngineeringStressBack => (
                "dynamat:EngineeringStress",
                "dynamat:EngineeringStress_Series_2",
                "dynamat:Megapascal",
                "Engineering Stress Back",
                "Engineering Stress at the transmitted / specimen determined from pulse strains",
            ),
            SeriesKind::TrueStressFront => (
                "dynamat:TrueStress",
                "dynamat:TrueStress_Series_1",
                "dynamat:Megapascal",
                "True Stress Front",
                "True Stress at the incident / specimen determined from pulse strains",
            ),
            SeriesKind::TrueStressBack => (
                "dynamat:TrueStress",
                "dynamat:TrueStress_Series_2",
                "dynamat:Megapascal",
                "True Stress Back",
                "True Stress at the transmitted / specimen determined from pulse strains",
            ),
            SeriesKind::IncidentStrainEnergy => (
                "dynamat:StrainEnergy",
                "dynamat:Incident_StrainEnergy_Series",
                "dynamat:Millijoule",
                "Incident Pulse Strain Energy",
                "Incident Pulse Strain Energy determined from pulse strains",
            ),
            SeriesKind::ReflectedStrainEnergy => (
                "dynamat:StrainEnergy",
                "dynamat:Reflected_StrainEnergy_Series",
                "dynamat:Millijoule",
                "Reflected Pulse Strain Energy",
                "Reflected Pulse Strain Energy determined from pulse strains",
            ),
            SeriesKind::TransmittedStrainEnergy => (
                "dynamat:StrainEnergy",
                "dynamat:Transmitted_StrainEnergy_Series",
                "dynamat:Millijoule",
                "Transmitted Pulse Strain Energy",
                "Transmitted Pulse Strain Energy determined from pulse strains",
            ),
            SeriesKind::AbsorbedElasticEnergy => (
                "dynamat:AbsorbedEnergy",
                "dynamat:Delta_E_Series",
                "dynamat:Millijoule",
                "Absorbed Elastic Energy",
                "Absorbed Elastic Energy determined from pulse strains",
            ),
            SeriesKind::AbsorbedKineticEnergy => (
                "dynamat:AbsorbedEnergy",
                "dynamat:Delta_K_Series",
                "dynamat:Millijoule",
                "Absorbed Kinetic Energy",
                "Absorbed Kinetic Energy determined from pulse strains",
            ),
            SeriesKind::TotalAbsorbedEnergy => (
                "dynamat:AbsorbedEnergy",
                "dynamat:Total_Energy_Series",
                "dynamat:Millijoule",
                "Total Absorbed Energy",
                "Total Absorbed Energy determined from pulse strains",
            ),
        }
    }

    pub fn class(self) -> &'static str {
        self.row().0
    }

    pub fn instance(self) -> &'static str {
        self.row().1
    }

    pub fn unit(self) -> &'static str {
        self.row().2
    }

    pub fn legend(self) -> &'static str {
        self.row().3
    }

    pub fn description(self) -> &'static str {
        self.row().4
    }

    pub fn producer(self) -> Producer {
        match self {
            SeriesKind::ParticleVelocityFront | SeriesKind::ParticleVelocityBack => {
                Producer::Extraction
            }
            _ => Producer::Series,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_resolves_known_prefixes_only() {
        assert_eq!(expand("dynamat:hasValue"), format!("{DYNAMAT}hasValue"));
        assert_eq!(expand("rdf:type"), format!("{RDF}type"));
        assert_eq!(expand("urn:other:thing"), "urn:other:thing");
        assert_eq!(expand("_:b0"), "_:b0");
    }

    #[test]
    fn local_name_strips_namespace() {
        assert_eq!(local_name(&dynamat("Pulse_Duration")), "Pulse_Duration");
        assert_eq!(local_name("http://example.org/a/b"), "b");
    }

    #[test]
    fn series_instances_are_unique() {
        let mut instances: Vec<_> = SeriesKind::ALL.iter().map(|k| k.instance()).collect();
        instances.sort();
        instances.dedup();
        assert_eq!(instances.len(), SeriesKind::ALL.len());
    }

    #[test]
    fn reflected_role_has_no_sensor() {
        assert!(SignalRole::Reflected.sensor_class().is_none());
        assert_eq!(
            SignalRole::Incident.sensor_class().as_deref(),
            Some(dynamat("IncidentSensorSignal").as_str())
        );
        assert_ne!(
            SignalRole::Incident.extracted_class(),
            SignalRole::Incident.extracted_instance()
        );
    }
}

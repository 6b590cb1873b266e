use crate::vocab::{self, dynamat};

/// Physical dimension of a convertible unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dimension {
    Length,
    Density,
    Area,
    Pressure,
    Temperature,
    Velocity,
    Time,
    Resistance,
    Potential,
}

impl Dimension {
    pub const ALL: [Dimension; 9] = [
        Dimension::Length,
        Dimension::Density,
        Dimension::Area,
        Dimension::Pressure,
        Dimension::Temperature,
        Dimension::Velocity,
        Dimension::Time,
        Dimension::Resistance,
        Dimension::Potential,
    ];

    /// Ontology class that unit individuals of this dimension are typed with.
    pub fn class(self) -> &'static str {
        match self {
            Dimension::Length => "dynamat:LengthUnit",
            Dimension::Density => "dynamat:DensityUnit",
            Dimension::Area => "dynamat:AreaUnit",
            Dimension::Pressure => "dynamat:PressureUnit",
            Dimension::Temperature => "dynamat:TemperatureUnit",
            Dimension::Velocity => "dynamat:VelocityUnit",
            Dimension::Time => "dynamat:TimeUnit",
            Dimension::Resistance => "dynamat:ElectricResistanceUnit",
            Dimension::Potential => "dynamat:ElectricPotentialUnit",
        }
    }

    pub fn from_class(iri: &str) -> Option<Self> {
        let expanded = vocab::expand(iri);
        Self::ALL
            .into_iter()
            .find(|dim| vocab::expand(dim.class()) == expanded)
    }

    pub fn canonical(self) -> Unit {
        match self {
            Dimension::Length => Unit::Millimeter,
            Dimension::Density => Unit::KilogramPerCubicMillimeter,
            Dimension::Area => Unit::SquareMillimeters,
            Dimension::Pressure => Unit::Megapascal,
            Dimension::Temperature => Unit::DegreesCelsius,
            Dimension::Velocity => Unit::MeterPerSecond,
            Dimension::Time => Unit::Millisecond,
            Dimension::Resistance => Unit::Ohms,
            Dimension::Potential => Unit::Volts,
        }
    }

    /// Whether `hasValue` scalars of this dimension are converted.
    pub fn converts_scalars(self) -> bool {
        !matches!(self, Dimension::Time)
    }

    /// Whether `hasEncodedData` arrays of this dimension are converted.
    pub fn converts_arrays(self) -> bool {
        matches!(self, Dimension::Time | Dimension::Potential)
    }

    pub fn name(self) -> &'static str {
        match self {
            Dimension::Length => "length",
            Dimension::Density => "density",
            Dimension::Area => "area",
            Dimension::Pressure => "pressure",
            Dimension::Temperature => "temperature",
            Dimension::Velocity => "velocity",
            Dimension::Time => "time",
            Dimension::Resistance => "electric resistance",
            Dimension::Potential => "electric potential",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Unit {
    Meter,
    Micrometer,
    Inch,
    Foot,
    Millimeter,
    GramPerCubicMillimeter,
    KilogramPerCubicMeter,
    KilogramPerCubicMillimeter,
    SquareInches,
    SquareMeters,
    SquareMillimeters,
    Psi,
    Pascal,
    Gigapascal,
    Megapascal,
    DegreesFahrenheit,
    Kelvin,
    DegreesCelsius,
    FootPerSecond,
    InchPerSecond,
    MillimeterPerSecond,
    MeterPerSecond,
    Second,
    Microsecond,
    Millisecond,
    MilliOhms,
    Ohms,
    MilliVolts,
    Volts,
    Unitless,
    Hertz,
    Millijoule,
}

/// (ontology local name, label, abbreviation, dimension, scale, offset)
type UnitRow = (
    &'static str,
    &'static str,
    &'static str,
    Option<Dimension>,
    f64,
    f64,
);

impl Unit {
    pub const ALL: [Unit; 32] = [
        Unit::Meter,
        Unit::Micrometer,
        Unit::Inch,
        Unit::Foot,
        Unit::Millimeter,
        Unit::GramPerCubicMillimeter,
        Unit::KilogramPerCubicMeter,
        Unit::KilogramPerCubicMillimeter,
        Unit::SquareInches,
        Unit::SquareMeters,
        Unit::SquareMillimeters,
        Unit::Psi,
        Unit::Pascal,
        Unit::Gigapascal,
        Unit::Megapascal,
        Unit::DegreesFahrenheit,
        Unit::Kelvin,
        Unit::DegreesCelsius,
        Unit::FootPerSecond,
        Unit::InchPerSecond,
        Unit::MillimeterPerSecond,
        Unit::MeterPerSecond,
        Unit::Second,
        Unit::Microsecond,
        Unit::Millisecond,
        Unit::MilliOhms,
        Unit::Ohms,
        Unit::MilliVolts,
        Unit::Volts,
        Unit::Unitless,
        Unit::Hertz,
        Unit::Millijoule,
    ];

    fn row(self) -> UnitRow {
        use Dimension::*;
        match self {
            Unit::Meter => ("Meter", "Meter", "m", Some(Length), 1000.0, 0.0),
            Unit::Micrometer => ("Micrometer", "Micrometer", "um", Some(Length), 0.001, 0.0),
            Unit::Inch => ("Inch", "Inch", "in", Some(Length), 25.4, 0.0),
            Unit::Foot => ("Foot", "Foot", "ft", Some(Length), 304.8, 0.0),
            Unit::Millimeter => ("Millimeter", "Millimeter", "mm", Some(Length), 1.0, 0.0),
            Unit::GramPerCubicMillimeter => (
                "GramPerCubicMillimeter",
                "Gram per cubic millimeter",
                "g/mm^3",
                Some(Density),
                0.001,
                0.0,
            ),
            Unit::KilogramPerCubicMeter => (
                "KilogramPerCubicMeter",
                "Kilogram per cubic meter",
                "kg/m^3",
                Some(Density),
                1e-9,
                0.0,
            ),
            Unit::KilogramPerCubicMillimeter => (
                "KilogramPerCubicMillimeter",
                "Kilogram per cubic millimeter",
                "kg/mm^3",
                Some(Density),
                1.0,
                0.0,
            ),
            Unit::SquareInches => ("SquareInches", "Square inches", "in^2", Some(Area), 645.16, 0.0),
            Unit::SquareMeters => ("SquareMeters", "Square meters", "m^2", Some(Area), 1e6, 0.0),
            // Historical ontology spelling.
            Unit::SquareMillimeters => (
                "SquareMilimeters",
                "Square millimeters",
                "mm^2",
                Some(Area),
                1.0,
                0.0,
            ),
            Unit::Psi => ("Psi", "Pound per square inch", "psi", Some(Pressure), 6.89476e-3, 0.0),
            Unit::Pascal => ("Pascal", "Pascal", "Pa", Some(Pressure), 1e-6, 0.0),
            Unit::Gigapascal => ("Gigapascal", "Gigapascal", "GPa", Some(Pressure), 1e3, 0.0),
            Unit::Megapascal => ("Megapascal", "Megapascal", "MPa", Some(Pressure), 1.0, 0.0),
            Unit::DegreesFahrenheit => (
                "DegressFahrenheit",
                "Degrees Fahrenheit",
                "F",
                Some(Temperature),
                5.0 / 9.0,
                -32.0 * 5.0 / 9.0,
            ),
            Unit::Kelvin => ("Kelvin", "Kelvin", "K", Some(Temperature), 1.0, -273.15),
            Unit::DegreesCelsius => (
                "DegreesCelsius",
                "Degrees Celsius",
                "C",
                Some(Temperature),
                1.0,
                0.0,
            ),
            Unit::FootPerSecond => ("FootPerSecond", "Foot per second", "ft/s", Some(Velocity), 0.3048, 0.0),
            Unit::InchPerSecond => ("InchPerSecond", "Inch per second", "in/s", Some(Velocity), 0.0254, 0.0),
            Unit::MillimeterPerSecond => (
                "MillimeterPerSecond",
                "Millimeter per second",
                "mm/s",
                Some(Velocity),
                0.001,
                0.0,
            ),
            Unit::MeterPerSecond => ("MeterPerSecond", "Meter per second", "m/s", Some(Velocity), 1.0, 0.0),
            Unit::Second => ("Second", "Second", "s", Some(Time), 1e3, 0.0),
            Unit::Microsecond => ("Microsecond", "Microsecond", "us", Some(Time), 1e-3, 0.0),
            Unit::Millisecond => ("Millisecond", "Millisecond", "ms", Some(Time), 1.0, 0.0),
            Unit::MilliOhms => ("MilliOhms", "Milliohms", "mOhm", Some(Resistance), 0.001, 0.0),
            Unit::Ohms => ("Ohms", "Ohms", "Ohm", Some(Resistance), 1.0, 0.0),
            Unit::MilliVolts => ("MilliVolts", "Millivolts", "mV", Some(Potential), 0.001, 0.0),
            Unit::Volts => ("Volts", "Volts", "V", Some(Potential), 1.0, 0.0),
            Unit::Unitless => ("Unitless", "Unitless", "-", None, 1.0, 0.0),
            Unit::Hertz => ("Hertz", "Hertz", "1/s", None, 1.0, 0.0),
            Unit::Millijoule => ("Millijoule", "Millijoule", "mJ", None, 1.0, 0.0),
        }
    }

    /// Alternative spellings accepted on input.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Unit::SquareMillimeters => &["SquareMillimeters"],
            Unit::DegreesFahrenheit => &["DegreesFahrenheit"],
            _ => &[],
        }
    }

    /// Resolves a unit IRI (or prefixed name) in the DynaMat namespace.
    pub fn from_iri(iri: &str) -> Option<Self> {
        let expanded = vocab::expand(iri);
        let local = expanded.strip_prefix(vocab::DYNAMAT)?;
        Self::ALL
            .into_iter()
            .find(|unit| unit.local_name() == local || unit.aliases().contains(&local))
    }

    pub fn local_name(self) -> &'static str {
        self.row().0
    }

    pub fn iri(self) -> String {
        dynamat(self.local_name())
    }

    pub fn label(self) -> &'static str {
        self.row().1
    }

    pub fn abbreviation(self) -> &'static str {
        self.row().2
    }

    /// `None` for descriptive units that are never converted.
    pub fn dimension(self) -> Option<Dimension> {
        self.row().3
    }

    pub fn is_canonical(self) -> bool {
        self.dimension().is_some_and(|dim| dim.canonical() == self)
    }

    pub fn to_canonical(self, value: f64) -> f64 {
        let (_, _, _, _, scale, offset) = self.row();
        value * scale + offset
    }

    pub fn from_canonical(self, value: f64) -> f64 {
        let (_, _, _, _, scale, offset) = self.row();
        (value - offset) / scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_unit_round_trips_within_f32_precision() {
        for unit in Unit::ALL {
            for value in [0.0_f32, 1.0, -3.5, 1234.5] {
                let canonical = unit.to_canonical(value as f64) as f32;
                let back = unit.from_canonical(canonical as f64) as f32;
                let tolerance = 1e-5 * value.abs().max(1.0) + 1e-4;
                assert!(
                    (back - value).abs() <= tolerance,
                    "{unit:?}: {value} -> {canonical} -> {back}"
                );
            }
        }
    }

    #[test]
    fn each_dimension_has_an_identity_canonical_unit() {
        for dim in Dimension::ALL {
            let canonical = dim.canonical();
            assert_eq!(canonical.dimension(), Some(dim));
            assert!(canonical.is_canonical());
            assert_eq!(canonical.to_canonical(42.0), 42.0);
        }
    }

    #[test]
    fn temperature_conversions_are_affine() {
        assert!((Unit::DegreesFahrenheit.to_canonical(212.0) - 100.0).abs() < 1e-9);
        assert!((Unit::DegreesFahrenheit.to_canonical(32.0)).abs() < 1e-9);
        assert!((Unit::Kelvin.to_canonical(273.15)).abs() < 1e-9);
    }

    #[test]
    fn historical_spellings_and_aliases_resolve() {
        assert_eq!(Unit::from_iri("dynamat:SquareMilimeters"), Some(Unit::SquareMillimeters));
        assert_eq!(Unit::from_iri("dynamat:SquareMillimeters"), Some(Unit::SquareMillimeters));
        assert_eq!(Unit::from_iri("dynamat:DegressFahrenheit"), Some(Unit::DegreesFahrenheit));
        assert_eq!(Unit::from_iri("dynamat:DegreesFahrenheit"), Some(Unit::DegreesFahrenheit));
        assert_eq!(Unit::from_iri("dynamat:Furlong"), None);
        assert_eq!(Unit::from_iri("http://example.org#Meter"), None);
    }

    #[test]
    fn dimension_classes_resolve() {
        assert_eq!(
            Dimension::from_class(&dynamat("ElectricPotentialUnit")),
            Some(Dimension::Potential)
        );
        assert_eq!(Dimension::from_class("dynamat:Unit"), None);
    }
}

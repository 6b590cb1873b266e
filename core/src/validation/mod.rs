//! Pass/fail gate run before an experiment enters the permanent collection.
//!
//! Shapes cover a practical subset of SHACL: node shapes that target a
//! class, with property shapes bounding cardinality, literal datatype and
//! the class of linked nodes.

use crate::store::PropertyStore;
use crate::vocab::{self, class, pred};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyShape {
    pub path: String,
    #[serde(default)]
    pub min_count: Option<usize>,
    #[serde(default)]
    pub max_count: Option<usize>,
    /// XSD local name, e.g. `float`.
    #[serde(default)]
    pub datatype: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl PropertyShape {
    pub fn required(path: &str) -> Self {
        Self {
            path: path.to_string(),
            min_count: Some(1),
            max_count: None,
            datatype: None,
            class: None,
            message: None,
        }
    }

    pub fn exactly_one(mut self) -> Self {
        self.max_count = Some(1);
        self
    }

    pub fn datatype(mut self, xsd_local: &str) -> Self {
        self.datatype = Some(xsd_local.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.class = Some(class.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeShape {
    pub target_class: String,
    /// The class itself must have at least one instance.
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub properties: Vec<PropertyShape>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeSet {
    pub name: String,
    #[serde(default)]
    pub shapes: Vec<NodeShape>,
}

impl ShapeSet {
    /// Metadata every experiment must carry regardless of its test type.
    pub fn metadata() -> Self {
        Self {
            name: "metadata".to_string(),
            shapes: vec![
                NodeShape {
                    target_class: class::METADATA.to_string(),
                    required: true,
                    properties: vec![PropertyShape::required(pred::HAS_TEST_NAME)
                        .exactly_one()
                        .datatype("string")],
                },
                NodeShape {
                    target_class: class::TESTING_CONDITIONS.to_string(),
                    required: true,
                    properties: vec![
                        PropertyShape::required(pred::HAS_TEST_TYPE).exactly_one(),
                        PropertyShape::required(pred::HAS_TEST_MODE).exactly_one(),
                        PropertyShape::required(pred::HAS_TEST_TEMPERATURE).exactly_one(),
                    ],
                },
            ],
        }
    }

    /// Bars, gauges and a specimen with the properties the analysis reads.
    pub fn specimen_test() -> Self {
        let mut set = Self::pulse_test();
        set.name = "specimen-test".to_string();
        set.shapes.push(NodeShape {
            target_class: class::SPECIMEN.to_string(),
            required: true,
            properties: vec![PropertyShape::required(pred::HAS_DIMENSION)
                .class(class::DIMENSION)],
        });
        set
    }

    pub fn pulse_test() -> Self {
        let bar = |target: &str| NodeShape {
            target_class: target.to_string(),
            required: true,
            properties: vec![
                PropertyShape::required(pred::HAS_DIMENSION).class(class::DIMENSION),
                PropertyShape::required(pred::HAS_MECHANICAL_PROPERTY)
                    .class(class::MECHANICAL_PROPERTY),
            ],
        };
        Self {
            name: "pulse-test".to_string(),
            shapes: vec![
                bar(class::INCIDENT_BAR),
                bar(class::TRANSMITTED_BAR),
                bar(class::STRIKER_BAR),
                NodeShape {
                    target_class: class::SENSOR_SIGNAL.to_string(),
                    required: true,
                    properties: vec![
                        PropertyShape::required(pred::HAS_ENCODED_DATA)
                            .exactly_one()
                            .datatype("base64Binary"),
                        PropertyShape::required(pred::HAS_SIZE).exactly_one(),
                        PropertyShape::required(pred::HAS_UNITS).exactly_one(),
                    ],
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub shape_set: String,
    pub focus: String,
    pub path: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub conforms: bool,
    pub results: Vec<ValidationResult>,
}

impl ValidationReport {
    pub fn conforming() -> Self {
        Self {
            conforms: true,
            results: Vec::new(),
        }
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.conforms &= other.conforms;
        self.results.extend(other.results);
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conforms {
            return writeln!(f, "Conforms: true");
        }
        writeln!(f, "Conforms: false ({} violations)", self.results.len())?;
        for result in &self.results {
            write!(f, "  [{}] {}", result.shape_set, vocab::local_name(&result.focus))?;
            if let Some(path) = &result.path {
                write!(f, " {}", vocab::local_name(&vocab::expand(path)))?;
            }
            writeln!(f, ": {}", result.message)?;
        }
        Ok(())
    }
}

pub trait Validator {
    fn validate(&self, store: &dyn PropertyStore) -> ValidationReport;
}

/// Runs each of its shape sets; conforms only if all of them do.
#[derive(Debug, Clone, Default)]
pub struct ShapeValidator {
    sets: Vec<ShapeSet>,
}

impl ShapeValidator {
    pub fn new(sets: Vec<ShapeSet>) -> Self {
        Self { sets }
    }

    pub fn push(&mut self, set: ShapeSet) {
        self.sets.push(set);
    }

    pub fn sets(&self) -> &[ShapeSet] {
        &self.sets
    }

    fn check_property(
        store: &dyn PropertyStore,
        set: &str,
        focus: &str,
        shape: &PropertyShape,
        results: &mut Vec<ValidationResult>,
    ) {
        let values = store.objects(focus, &shape.path);
        let mut fail = |message: String| {
            results.push(ValidationResult {
                shape_set: set.to_string(),
                focus: focus.to_string(),
                path: Some(shape.path.clone()),
                message: shape.message.clone().unwrap_or(message),
            })
        };

        if let Some(min) = shape.min_count {
            if values.len() < min {
                fail(format!("expected at least {min} value(s), found {}", values.len()));
            }
        }
        if let Some(max) = shape.max_count {
            if values.len() > max {
                fail(format!("expected at most {max} value(s), found {}", values.len()));
            }
        }
        if let Some(datatype) = &shape.datatype {
            for value in &values {
                if value.datatype_local() != Some(datatype.as_str()) {
                    fail(format!("value {:?} is not xsd:{datatype}", value.lexical()));
                }
            }
        }
        if let Some(expected) = &shape.class {
            for value in &values {
                let typed = value
                    .as_node()
                    .map(|node| store.has_type(&node, expected))
                    .unwrap_or(false);
                if !typed {
                    fail(format!("{} is not a {expected}", value.lexical()));
                }
            }
        }
    }

    fn check_set(store: &dyn PropertyStore, set: &ShapeSet) -> ValidationReport {
        let mut results = Vec::new();
        for shape in &set.shapes {
            let focus_nodes = store.instances_of(&shape.target_class);
            if shape.required && focus_nodes.is_empty() {
                results.push(ValidationResult {
                    shape_set: set.name.clone(),
                    focus: vocab::expand(&shape.target_class).into_owned(),
                    path: None,
                    message: "no instance of the target class".to_string(),
                });
            }
            for focus in &focus_nodes {
                for property in &shape.properties {
                    Self::check_property(store, &set.name, focus, property, &mut results);
                }
            }
        }
        ValidationReport {
            conforms: results.is_empty(),
            results,
        }
    }
}

impl Validator for ShapeValidator {
    fn validate(&self, store: &dyn PropertyStore) -> ValidationReport {
        let mut report = ValidationReport::conforming();
        for set in &self.sets {
            report.merge(Self::check_set(store, set));
        }
        report
    }
}

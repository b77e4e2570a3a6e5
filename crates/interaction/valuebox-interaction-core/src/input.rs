//! Raw user input, its validation and the requests built from it.
//!
//! The host UI hands over three strings (one per box). Each may be empty,
//! meaning "leave that box alone". Every non-empty field is checked against
//! its box type and all failures are reported together.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Type of value a box holds. Also the box's slot (0, 1, 2) in the scene.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Int,
    Double,
    Char,
}

impl ValueKind {
    pub const ALL: [ValueKind; 3] = [ValueKind::Int, ValueKind::Double, ValueKind::Char];

    pub fn slot(self) -> usize {
        match self {
            ValueKind::Int => 0,
            ValueKind::Double => 1,
            ValueKind::Char => 2,
        }
    }

    pub fn from_slot(slot: usize) -> Option<Self> {
        Self::ALL.get(slot).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            ValueKind::Int => "int",
            ValueKind::Double => "double",
            ValueKind::Char => "char",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The three input fields as typed by the user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawInputs {
    pub int: String,
    pub double: String,
    pub char: String,
}

impl RawInputs {
    pub fn new(int: impl Into<String>, double: impl Into<String>, char: impl Into<String>) -> Self {
        Self {
            int: int.into(),
            double: double.into(),
            char: char.into(),
        }
    }

    pub fn field(&self, kind: ValueKind) -> &str {
        match kind {
            ValueKind::Int => &self.int,
            ValueKind::Double => &self.double,
            ValueKind::Char => &self.char,
        }
    }

    /// True when every field is blank after trimming.
    pub fn is_blank(&self) -> bool {
        ValueKind::ALL
            .iter()
            .all(|k| self.field(*k).trim().is_empty())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("not an integer")]
    NotAnInteger,
    #[error("not a number")]
    NotANumber,
    #[error("not a single character")]
    NotASingleChar,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub kind: ValueKind,
    pub raw: String,
    pub error: ValidationError,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?} is {}", self.kind, self.raw, self.error)
    }
}

/// Every field that failed validation in one submission.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<FieldError>,
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid input: ")?;
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl ValidationReport {
    pub fn error_for(&self, kind: ValueKind) -> Option<ValidationError> {
        self.errors.iter().find(|e| e.kind == kind).map(|e| e.error)
    }

    pub fn contains(&self, error: ValidationError) -> bool {
        self.errors.iter().any(|e| e.error == error)
    }
}

/// One value to animate into its box. Only built from validated input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnimationRequest<H> {
    kind: ValueKind,
    raw_value: String,
    target_container: H,
}

impl<H: Copy> AnimationRequest<H> {
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn raw_value(&self) -> &str {
        &self.raw_value
    }

    pub fn target_container(&self) -> H {
        self.target_container
    }
}

fn is_integer(text: &str) -> bool {
    if text.parse::<i128>().is_ok() {
        return true;
    }
    // Integral decimals such as "3.0" or "1e3" denote integers too.
    text.parse::<f64>()
        .map(|v| v.is_finite() && v.fract() == 0.0)
        .unwrap_or(false)
}

fn is_finite_number(text: &str) -> bool {
    text.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

fn is_single_char(text: &str) -> bool {
    let mut chars = text.chars();
    chars.next().is_some() && chars.next().is_none()
}

/// Check one field. `Ok(None)` means the field is blank and should be skipped;
/// `Ok(Some(text))` carries the trimmed text to display.
pub fn validate_field(kind: ValueKind, raw: &str) -> Result<Option<String>, ValidationError> {
    let text = raw.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let ok = match kind {
        ValueKind::Int => is_integer(text),
        ValueKind::Double => is_finite_number(text),
        ValueKind::Char => is_single_char(text),
    };
    if ok {
        Ok(Some(text.to_string()))
    } else {
        Err(match kind {
            ValueKind::Int => ValidationError::NotAnInteger,
            ValueKind::Double => ValidationError::NotANumber,
            ValueKind::Char => ValidationError::NotASingleChar,
        })
    }
}

/// Validate all fields and build one request per non-blank field, targeting
/// `containers[kind.slot()]`. Any failure rejects the whole set.
pub fn validate<H: Copy>(
    inputs: &RawInputs,
    containers: [H; 3],
) -> Result<Vec<AnimationRequest<H>>, ValidationReport> {
    let mut requests = Vec::new();
    let mut errors = Vec::new();
    for kind in ValueKind::ALL {
        let raw = inputs.field(kind);
        match validate_field(kind, raw) {
            Ok(Some(text)) => requests.push(AnimationRequest {
                kind,
                raw_value: text,
                target_container: containers[kind.slot()],
            }),
            Ok(None) => {}
            Err(error) => errors.push(FieldError {
                kind,
                raw: raw.to_string(),
                error,
            }),
        }
    }
    if errors.is_empty() {
        Ok(requests)
    } else {
        Err(ValidationReport { errors })
    }
}

/// Display form of the submitted values, blanks shown with the type's
/// default literal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodePreview {
    pub int: String,
    pub double: String,
    pub char: String,
}

impl CodePreview {
    pub fn from_inputs(inputs: &RawInputs) -> Self {
        let or = |raw: &str, fallback: &str| {
            let t = raw.trim();
            if t.is_empty() {
                fallback.to_string()
            } else {
                t.to_string()
            }
        };
        let c = inputs.char.trim();
        Self {
            int: or(&inputs.int, "0"),
            double: or(&inputs.double, "0.0"),
            char: if c.is_empty() {
                "'A'".to_string()
            } else {
                format!("'{c}'")
            },
        }
    }
}

impl fmt::Display for CodePreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "int a = {};", self.int)?;
        writeln!(f, "double b = {};", self.double)?;
        write!(f, "char c = {};", self.char)
    }
}

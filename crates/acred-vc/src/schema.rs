//! # Claim Schemas
//!
//! A [`CredentialSchema`] is an ordered list of claim fields, each tagged
//! with a [`FieldType`]. [`CredentialSchema::validate()`] dispatches on the
//! tag, normalizes accepted inputs (numeric strings, `"true"`/`"false"`,
//! trimmed dates) to their JSON form, and reports every offending field at
//! once.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Default lower bound for `float` claims (GPA scale).
pub const DEFAULT_FLOAT_MIN: f64 = 0.0;

/// Default upper bound for `float` claims (GPA scale).
pub const DEFAULT_FLOAT_MAX: f64 = 4.0;

/// Claim value type.
///
/// Serialized in lowercase; the short aliases `str`, `int` and `bool`
/// used by existing schema definitions are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[serde(alias = "str")]
    String,
    #[serde(alias = "int")]
    Integer,
    Float,
    Date,
    #[serde(alias = "bool")]
    Boolean,
}

impl FieldType {
    /// Parse a schema type tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "str" | "string" => Some(Self::String),
            "int" | "integer" => Some(Self::Integer),
            "float" => Some(Self::Float),
            "date" => Some(Self::Date),
            "bool" | "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Date => "date",
            Self::Boolean => "boolean",
        };
        f.write_str(s)
    }
}

/// One field of a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    /// Inclusive bounds for `Float` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<(f64, f64)>,
}

impl FieldSpec {
    /// An optional field; floats get the default 0.0–4.0 range.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let range = (field_type == FieldType::Float).then_some((DEFAULT_FLOAT_MIN, DEFAULT_FLOAT_MAX));
        Self {
            name: name.into(),
            field_type,
            required: false,
            range,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }
}

/// A single field failure.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldViolation {
    Missing { field: String },
    InvalidValue { field: String, expected: FieldType, found: String },
    OutOfRange { field: String, value: f64, min: f64, max: f64 },
    Unknown { field: String },
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing { field } => write!(f, "{field}: required field is missing"),
            Self::InvalidValue { field, expected, found } => {
                write!(f, "{field}: expected {expected}, found {found}")
            }
            Self::OutOfRange { field, value, min, max } => {
                write!(f, "{field}: {value} is outside [{min}, {max}]")
            }
            Self::Unknown { field } => write!(f, "{field}: not defined by the schema"),
        }
    }
}

/// Schema definition or claim validation failure.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("invalid schema definition: {0}")]
    Definition(String),

    #[error("claims failed schema {schema}: {}", join_violations(.violations))]
    Claims {
        schema: String,
        violations: Vec<FieldViolation>,
    },
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// An ordered set of typed claim fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialSchema {
    pub id: String,
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    pub fields: Vec<FieldSpec>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl CredentialSchema {
    pub fn new(id: impl Into<String>, name: impl Into<String>, fields: Vec<FieldSpec>) -> Result<Self, SchemaError> {
        let schema = Self {
            id: id.into(),
            name: name.into(),
            version: default_version(),
            fields,
        };
        schema.check_definition()?;
        Ok(schema)
    }

    /// Build from the compact `{"name": "type"}` form, all fields optional.
    pub fn from_type_map(id: impl Into<String>, name: impl Into<String>, map: &Map<String, Value>) -> Result<Self, SchemaError> {
        let fields = map
            .iter()
            .map(|(field, tag)| {
                let tag = tag
                    .as_str()
                    .ok_or_else(|| SchemaError::Definition(format!("type of {field} must be a string")))?;
                let ty = FieldType::from_tag(tag)
                    .ok_or_else(|| SchemaError::Definition(format!("unknown type {tag:?} for {field}")))?;
                Ok(FieldSpec::new(field.clone(), ty))
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;
        Self::new(id, name, fields)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn check_definition(&self) -> Result<(), SchemaError> {
        for (i, spec) in self.fields.iter().enumerate() {
            if spec.name.is_empty() || spec.name == "id" {
                return Err(SchemaError::Definition(format!("invalid field name {:?}", spec.name)));
            }
            if self.fields[..i].iter().any(|f| f.name == spec.name) {
                return Err(SchemaError::Definition(format!("duplicate field {}", spec.name)));
            }
            if let Some((min, max)) = spec.range {
                if spec.field_type != FieldType::Float || min > max {
                    return Err(SchemaError::Definition(format!("invalid range on {}", spec.name)));
                }
            }
        }
        Ok(())
    }

    /// Validate claims and return them normalized.
    ///
    /// Empty strings and `null` count as absent. Absent optional fields are
    /// omitted from the output.
    pub fn validate(&self, claims: &Map<String, Value>) -> Result<Map<String, Value>, SchemaError> {
        let mut out = Map::new();
        let mut violations = Vec::new();

        for key in claims.keys() {
            if self.field(key).is_none() {
                violations.push(FieldViolation::Unknown { field: key.clone() });
            }
        }

        for spec in &self.fields {
            let value = match claims.get(&spec.name) {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) if s.trim().is_empty() => None,
                Some(v) => Some(v),
            };
            let Some(value) = value else {
                if spec.required {
                    violations.push(FieldViolation::Missing { field: spec.name.clone() });
                }
                continue;
            };
            match coerce(spec, value) {
                Ok(v) => {
                    out.insert(spec.name.clone(), v);
                }
                Err(v) => violations.push(v),
            }
        }

        if violations.is_empty() {
            Ok(out)
        } else {
            Err(SchemaError::Claims {
                schema: self.name.clone(),
                violations,
            })
        }
    }
}

fn coerce(spec: &FieldSpec, value: &Value) -> Result<Value, FieldViolation> {
    let invalid = || FieldViolation::InvalidValue {
        field: spec.name.clone(),
        expected: spec.field_type,
        found: value.to_string(),
    };
    match spec.field_type {
        FieldType::String => match value {
            Value::String(s) => Ok(Value::String(s.clone())),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            _ => Err(invalid()),
        },
        FieldType::Integer => {
            let n = match value {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            n.map(Value::from).ok_or_else(invalid)
        }
        FieldType::Float => {
            let x = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            }
            .filter(|x| x.is_finite())
            .ok_or_else(invalid)?;
            if let Some((min, max)) = spec.range {
                if x < min || x > max {
                    return Err(FieldViolation::OutOfRange {
                        field: spec.name.clone(),
                        value: x,
                        min,
                        max,
                    });
                }
            }
            Number::from_f64(x).map(Value::Number).ok_or_else(invalid)
        }
        FieldType::Date => {
            let s = value.as_str().map(str::trim).ok_or_else(invalid)?;
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
                .map_err(|_| invalid())
        }
        FieldType::Boolean => match value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
                "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn degree_schema() -> CredentialSchema {
        CredentialSchema::new(
            "schema-degree",
            "Academic Degree",
            vec![
                FieldSpec::new("degree", FieldType::String).required(),
                FieldSpec::new("gpa", FieldType::Float),
                FieldSpec::new("year", FieldType::Integer),
                FieldSpec::new("graduated", FieldType::Date),
                FieldSpec::new("honors", FieldType::Boolean),
            ],
        )
        .unwrap()
    }

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn normalizes_valid_claims() {
        let out = degree_schema()
            .validate(&obj(json!({
                "degree": "BSc",
                "gpa": "3.5",
                "year": "2024",
                "graduated": "2024-06-30",
                "honors": "true"
            })))
            .unwrap();
        assert_eq!(out["gpa"], json!(3.5));
        assert_eq!(out["year"], json!(2024));
        assert_eq!(out["honors"], json!(true));
        assert_eq!(out["graduated"], "2024-06-30");
    }

    #[test]
    fn optional_fields_may_be_blank() {
        let out = degree_schema()
            .validate(&obj(json!({"degree": "BA", "gpa": "", "honors": null})))
            .unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn collects_every_violation() {
        let err = degree_schema()
            .validate(&obj(json!({"gpa": 4.2, "year": "twenty", "graduated": "30/06/2024", "club": "chess"})))
            .unwrap_err();
        let SchemaError::Claims { violations, .. } = err else {
            panic!("expected claims error");
        };
        assert_eq!(violations.len(), 5);
        assert!(violations.contains(&FieldViolation::Missing { field: "degree".into() }));
        assert!(violations.contains(&FieldViolation::Unknown { field: "club".into() }));
        assert!(violations
            .iter()
            .any(|v| matches!(v, FieldViolation::OutOfRange { field, .. } if field == "gpa")));
    }

    #[test]
    fn custom_float_range() {
        let schema = CredentialSchema::new(
            "s",
            "Score",
            vec![FieldSpec::new("score", FieldType::Float).with_range(0.0, 100.0)],
        )
        .unwrap();
        assert!(schema.validate(&obj(json!({"score": 87.5}))).is_ok());
        assert!(schema.validate(&obj(json!({"score": 101}))).is_err());
    }

    #[test]
    fn compact_type_map() {
        let schema = CredentialSchema::from_type_map(
            "s",
            "Legacy",
            &obj(json!({"name": "str", "credits": "int", "passed": "bool"})),
        )
        .unwrap();
        assert_eq!(schema.field("credits").unwrap().field_type, FieldType::Integer);
        assert!(CredentialSchema::from_type_map("s", "Bad", &obj(json!({"x": "blob"}))).is_err());
    }

    #[test]
    fn rejects_bad_definitions() {
        let dup = vec![
            FieldSpec::new("a", FieldType::String),
            FieldSpec::new("a", FieldType::Integer),
        ];
        assert!(CredentialSchema::new("s", "Dup", dup).is_err());
        let reserved = vec![FieldSpec::new("id", FieldType::String)];
        assert!(CredentialSchema::new("s", "Id", reserved).is_err());
        let range_on_int = vec![FieldSpec::new("n", FieldType::Integer).with_range(0.0, 1.0)];
        assert!(CredentialSchema::new("s", "Range", range_on_int).is_err());
    }

    #[test]
    fn field_type_aliases_deserialize() {
        let spec: FieldSpec = serde_json::from_value(json!({"name": "x", "type": "bool"})).unwrap();
        assert_eq!(spec.field_type, FieldType::Boolean);
        assert!(!spec.required);
    }
}

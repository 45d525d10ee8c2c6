//! Template metadata and the variable binder.
//!
//! Template records carry a loose JSON metadata blob on the wire
//! (`{medium, variables: [{name, type, position}]}`). Parsing is lenient:
//! anything missing or unparsable falls back to defaults rather than
//! failing the whole record, and the channel default is `sms`.

use std::collections::HashMap;

use serde::Deserialize;

use crate::{domain::Channel, errors::ValidationError};

/// Declared slot type for a template variable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VarType {
    #[default]
    Text,
    Number,
}

/// A declared variable slot of a template.
///
/// `position` defines rendering/validation order, not array index; display
/// and validation must sort by it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub var_type: VarType,
    pub position: u32,
}

/// Typed view of a template's `MetaData` blob.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(from = "serde_json::Value")]
pub struct TemplateMetadata {
    pub medium: Option<Channel>,
    pub variables: Vec<Variable>,
}

impl From<serde_json::Value> for TemplateMetadata {
    fn from(v: serde_json::Value) -> Self {
        // Some records store the blob as a JSON string rather than an
        // object; unwrap that layer first.
        let v = match v {
            serde_json::Value::String(s) => {
                serde_json::from_str(&s).unwrap_or(serde_json::Value::String(s))
            }
            other => other,
        };

        let medium = v
            .get("medium")
            .and_then(|m| m.as_str())
            .and_then(Channel::parse);

        let variables = v
            .get("variables")
            .and_then(|vars| vars.as_array())
            .map(|vars| vars.iter().filter_map(parse_variable).collect())
            .unwrap_or_default();

        Self { medium, variables }
    }
}

fn parse_variable(v: &serde_json::Value) -> Option<Variable> {
    let name = v.get("name").and_then(|n| n.as_str())?.to_string();
    let var_type = match v.get("type").and_then(|t| t.as_str()) {
        Some("number") => VarType::Number,
        _ => VarType::Text,
    };
    let position = v.get("position").and_then(|p| p.as_u64()).unwrap_or(0) as u32;
    Some(Variable {
        name,
        var_type,
        position,
    })
}

/// Variables in display/validation order: ascending by `position`, stable
/// on ties (input order breaks them).
pub fn sorted_by_position(variables: &[Variable]) -> Vec<&Variable> {
    let mut out: Vec<&Variable> = variables.iter().collect();
    out.sort_by_key(|v| v.position);
    out
}

/// Resolve a template's declared variable slots against raw operator input.
///
/// Every declared variable requires a non-blank value; `Number` slots must
/// parse as a numeric literal. The first failure (in position order) is
/// returned. The binding keeps the raw entered values; only validation
/// trims.
pub fn bind_variables(
    variables: &[Variable],
    input: &HashMap<String, String>,
) -> Result<HashMap<String, String>, ValidationError> {
    for var in sorted_by_position(variables) {
        let value = input.get(&var.name).map(String::as_str).unwrap_or("");
        if value.trim().is_empty() {
            return Err(ValidationError::MissingVariable(var.name.clone()));
        }
        if var.var_type == VarType::Number && value.trim().parse::<f64>().is_err() {
            return Err(ValidationError::InvalidVariableType(var.name.clone()));
        }
    }

    Ok(variables
        .iter()
        .filter_map(|var| {
            input
                .get(&var.name)
                .map(|value| (var.name.clone(), value.clone()))
        })
        .collect())
}

//! Data model produced by document extraction.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A declared infrastructure resource.
///
/// Identified by `(resource_type, name)`. Attributes preserve declaration
/// order; nested sub-blocks appear as attributes holding an array with one
/// object per repeated block. Non-literal expressions are captured as their
/// source text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub attributes: IndexMap<String, Value>,
    #[serde(default)]
    pub source_file: String,
    #[serde(default)]
    pub line: usize,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            attributes: IndexMap::new(),
            source_file: String::new(),
            line: 0,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Address in `type.name` form, as referenced by other resources.
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }

    /// Provider prefix inferred from the resource type (`aws_s3_bucket` -> `aws`).
    pub fn provider(&self) -> &str {
        self.resource_type
            .split('_')
            .next()
            .unwrap_or(&self.resource_type)
    }
}

/// A declared input variable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Variable {
    pub name: String,
    #[serde(default = "default_var_type")]
    pub var_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub source_file: String,
    #[serde(default)]
    pub line: usize,
}

fn default_var_type() -> String {
    "string".to_string()
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            var_type: default_var_type(),
            description: String::new(),
            default: None,
            source_file: String::new(),
            line: 0,
        }
    }
}

/// A declared output value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Output {
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub source_file: String,
    #[serde(default)]
    pub line: usize,
}

impl Output {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            description: String::new(),
            sensitive: false,
            source_file: String::new(),
            line: 0,
        }
    }
}

/// Severity of an extraction diagnostic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// A note attached to the model when extraction had to degrade.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub message: String,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            message: message.into(),
        }
    }
}

/// Best-effort structural model of one or more Terraform documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentModel {
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub outputs: Vec<Output>,
    #[serde(default)]
    pub locals: IndexMap<String, Value>,
    /// Provider requirements from `terraform.required_providers`.
    #[serde(default)]
    pub providers: IndexMap<String, Value>,
    /// Remaining `terraform` block settings (e.g. `required_version`).
    #[serde(default)]
    pub settings: IndexMap<String, Value>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

impl DocumentModel {
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.variables.is_empty() && self.outputs.is_empty()
    }

    pub fn resource(&self, resource_type: &str, name: &str) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|r| r.resource_type == resource_type && r.name == name)
    }

    pub fn resources_of_type<'a>(&'a self, resource_type: &'a str) -> impl Iterator<Item = &'a Resource> {
        self.resources
            .iter()
            .filter(move |r| r.resource_type == resource_type)
    }

    /// Distinct resource types present, in first-seen order.
    pub fn resource_types(&self) -> Vec<&str> {
        let mut types = Vec::new();
        for resource in &self.resources {
            let ty = resource.resource_type.as_str();
            if !types.contains(&ty) {
                types.push(ty);
            }
        }
        types
    }

    pub fn has_error_diagnostics(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == DiagnosticSeverity::Error)
    }

    /// Fold another model into this one, keeping declaration order.
    pub fn merge(&mut self, other: DocumentModel) {
        self.resources.extend(other.resources);
        self.variables.extend(other.variables);
        self.outputs.extend(other.outputs);
        self.locals.extend(other.locals);
        self.providers.extend(other.providers);
        self.settings.extend(other.settings);
        self.diagnostics.extend(other.diagnostics);
    }
}

/// Truthiness for attribute values: null, false, zero, and empty
/// strings/arrays/objects are falsy, everything else is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

//! Document extraction: structural parse with a pattern-based fallback.
//!
//! Extraction never fails. The primary path parses the full block grammar;
//! when that is impossible the extractor degrades to a scanning pass over
//! top-level block headers and records the degradation as a diagnostic.

use std::path::Path;

use hcl_edit::expr::{Expression, ObjectKey};
use hcl_edit::parser;
use hcl_edit::structure::{Block, BlockLabel, Body};
use hcl_edit::template::Element;
use hcl_edit::Span;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{HclError, HclResult};
use crate::model::{Diagnostic, DocumentModel, Output, Resource, Variable};

/// Top-level block headers recognized by the fallback scanner.
const LABELED_BLOCK: &str =
    r#"(?m)^\s*(resource|data)\s+"([^"]+)"\s+"([^"]+)"\s*\{"#;
const NAMED_BLOCK: &str = r#"(?m)^\s*(variable|output)\s+"([^"]+)"\s*\{"#;
const BARE_BLOCK: &str = r"(?m)^\s*(locals|terraform)\s*\{";
const KEY_VALUE: &str = r"(?m)^\s*([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(.+?)\s*$";

/// Extracts a [`DocumentModel`] from Terraform-style text.
#[derive(Debug, Default, Clone)]
pub struct Extractor;

impl Extractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract a model from raw text. Never fails; on a structural parse
    /// failure the result carries a diagnostic and whatever the fallback
    /// scanner could recover.
    pub fn extract(&self, text: &str, source_name: &str) -> DocumentModel {
        match parser::parse_body(text) {
            Ok(body) => {
                let model = self.from_body(&body, text, source_name);
                debug!(
                    source = source_name,
                    resources = model.resources.len(),
                    variables = model.variables.len(),
                    outputs = model.outputs.len(),
                    "structural extraction complete"
                );
                model
            }
            Err(err) => {
                warn!(source = source_name, error = %err, "structural parse failed, using pattern fallback");
                let mut model = self.fallback(text, source_name);
                model.diagnostics.insert(
                    0,
                    Diagnostic::error(format!(
                        "Structural parse failed for {source_name}: {err}"
                    )),
                );
                model
            }
        }
    }

    /// Extract from a single `.tf` file.
    pub fn extract_file(&self, path: &Path) -> HclResult<DocumentModel> {
        if !path.exists() {
            return Err(HclError::NotFound(path.to_path_buf()));
        }
        if path.extension().and_then(|e| e.to_str()) != Some("tf") {
            return Err(HclError::NotTerraform(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let source = path.to_string_lossy().to_string();
        Ok(self.extract(&text, &source))
    }

    /// Extract and merge every `*.tf` file directly inside a directory.
    pub fn extract_dir(&self, dir: &Path) -> HclResult<DocumentModel> {
        if !dir.is_dir() {
            return Err(HclError::NotFound(dir.to_path_buf()));
        }
        let pattern = dir.join("*.tf");
        let paths = glob::glob(&pattern.to_string_lossy()).map_err(|err| {
            HclError::InvalidPattern {
                path: dir.to_path_buf(),
                message: err.to_string(),
            }
        })?;

        let mut files: Vec<_> = paths.filter_map(Result::ok).collect();
        files.sort();

        let mut model = DocumentModel::default();
        if files.is_empty() {
            model
                .diagnostics
                .push(Diagnostic::warning(format!(
                    "No .tf files found in {}",
                    dir.display()
                )));
            return Ok(model);
        }
        for file in files {
            model.merge(self.extract_file(&file)?);
        }
        Ok(model)
    }

    fn from_body(&self, body: &Body, text: &str, source_name: &str) -> DocumentModel {
        let mut model = DocumentModel::default();
        for block in body.blocks() {
            let line = block
                .span()
                .map(|span| line_of_offset(text, span.start))
                .unwrap_or(0);
            match block.ident.value().as_str() {
                "resource" => self.push_resource(&mut model, block, source_name, line),
                "variable" => self.push_variable(&mut model, block, source_name, line),
                "output" => self.push_output(&mut model, block, source_name, line),
                "locals" => {
                    for attr in block.body.attributes() {
                        model
                            .locals
                            .insert(attr.key.as_str().to_string(), expression_to_value(&attr.value));
                    }
                }
                "terraform" => self.collect_settings(&mut model, block),
                "provider" => {
                    if let Some(name) = label_text(block, 0) {
                        model
                            .providers
                            .insert(name, Value::Object(body_to_object(&block.body)));
                    }
                }
                other => {
                    debug!(block = other, "skipping unhandled top-level block");
                }
            }
        }
        model
    }

    fn push_resource(&self, model: &mut DocumentModel, block: &Block, source: &str, line: usize) {
        let (resource_type, name) = match (label_text(block, 0), label_text(block, 1)) {
            (Some(ty), Some(name)) => (ty, name),
            _ => {
                model.diagnostics.push(Diagnostic::warning(format!(
                    "resource block at line {line} is missing type or name labels"
                )));
                return;
            }
        };
        let mut resource = Resource::new(resource_type, name);
        resource.attributes = body_to_attributes(&block.body);
        resource.source_file = source.to_string();
        resource.line = line;
        model.resources.push(resource);
    }

    fn push_variable(&self, model: &mut DocumentModel, block: &Block, source: &str, line: usize) {
        let name = match label_text(block, 0) {
            Some(name) => name,
            None => {
                model.diagnostics.push(Diagnostic::warning(format!(
                    "variable block at line {line} is missing its name label"
                )));
                return;
            }
        };
        let mut variable = Variable::new(name);
        for attr in block.body.attributes() {
            let value = expression_to_value(&attr.value);
            match attr.key.as_str() {
                "type" => variable.var_type = value_to_text(&value),
                "description" => variable.description = value_to_text(&value),
                "default" => variable.default = Some(value),
                _ => {}
            }
        }
        variable.source_file = source.to_string();
        variable.line = line;
        model.variables.push(variable);
    }

    fn push_output(&self, model: &mut DocumentModel, block: &Block, source: &str, line: usize) {
        let name = match label_text(block, 0) {
            Some(name) => name,
            None => {
                model.diagnostics.push(Diagnostic::warning(format!(
                    "output block at line {line} is missing its name label"
                )));
                return;
            }
        };
        let mut output = Output::new(name);
        for attr in block.body.attributes() {
            let value = expression_to_value(&attr.value);
            match attr.key.as_str() {
                "value" => output.value = Some(value),
                "description" => output.description = value_to_text(&value),
                "sensitive" => output.sensitive = matches!(value, Value::Bool(true)),
                _ => {}
            }
        }
        output.source_file = source.to_string();
        output.line = line;
        model.outputs.push(output);
    }

    fn collect_settings(&self, model: &mut DocumentModel, block: &Block) {
        for attr in block.body.attributes() {
            model
                .settings
                .insert(attr.key.as_str().to_string(), expression_to_value(&attr.value));
        }
        for nested in block.body.blocks() {
            if nested.ident.value().as_str() == "required_providers" {
                for attr in nested.body.attributes() {
                    model
                        .providers
                        .insert(attr.key.as_str().to_string(), expression_to_value(&attr.value));
                }
            }
        }
    }

    /// Pattern-based recovery pass. Finds top-level block headers, walks to
    /// each block's closing brace by depth counting, and keeps only the
    /// non-nested `key = value` pairs. Nested blocks beyond one level and
    /// cross-resource references are not resolved here.
    fn fallback(&self, text: &str, source_name: &str) -> DocumentModel {
        let mut model = DocumentModel::default();
        let (labeled, named, bare, key_value) = match (
            compile(LABELED_BLOCK),
            compile(NAMED_BLOCK),
            compile(BARE_BLOCK),
            compile(KEY_VALUE),
        ) {
            (Some(a), Some(b), Some(c), Some(d)) => (a, b, c, d),
            _ => return model,
        };

        for caps in labeled.captures_iter(text) {
            let whole = match caps.get(0) {
                Some(m) => m,
                None => continue,
            };
            let keyword = &caps[1];
            if keyword != "resource" {
                // data blocks carry no policy semantics here
                continue;
            }
            if let Some(body) = block_body(text, whole.end() - 1) {
                let mut resource = Resource::new(&caps[2], &caps[3]);
                resource.attributes = scan_attributes(body, &key_value);
                resource.source_file = source_name.to_string();
                resource.line = line_of_offset(text, whole.start());
                model.resources.push(resource);
            }
        }

        for caps in named.captures_iter(text) {
            let whole = match caps.get(0) {
                Some(m) => m,
                None => continue,
            };
            let body = match block_body(text, whole.end() - 1) {
                Some(body) => body,
                None => continue,
            };
            let attributes = scan_attributes(body, &key_value);
            let line = line_of_offset(text, whole.start());
            if &caps[1] == "variable" {
                let mut variable = Variable::new(&caps[2]);
                if let Some(ty) = attributes.get("type") {
                    variable.var_type = value_to_text(ty);
                }
                if let Some(desc) = attributes.get("description") {
                    variable.description = value_to_text(desc);
                }
                variable.default = attributes.get("default").cloned();
                variable.source_file = source_name.to_string();
                variable.line = line;
                model.variables.push(variable);
            } else {
                let mut output = Output::new(&caps[2]);
                output.value = attributes.get("value").cloned();
                if let Some(desc) = attributes.get("description") {
                    output.description = value_to_text(desc);
                }
                output.sensitive = attributes
                    .get("sensitive")
                    .map(|v| matches!(v, Value::Bool(true)))
                    .unwrap_or(false);
                output.source_file = source_name.to_string();
                output.line = line;
                model.outputs.push(output);
            }
        }

        for caps in bare.captures_iter(text) {
            let whole = match caps.get(0) {
                Some(m) => m,
                None => continue,
            };
            let body = match block_body(text, whole.end() - 1) {
                Some(body) => body,
                None => continue,
            };
            let attributes = scan_attributes(body, &key_value);
            if &caps[1] == "locals" {
                model.locals.extend(attributes);
            } else {
                model.settings.extend(attributes);
            }
        }

        model
    }
}

/// Identifier references (`type.name` with an underscored type segment)
/// mentioned inside a resource's attribute values. Used for dry-run
/// reference checking; `var.*`, `local.*` and similar prefixes never match
/// because their first segment carries no underscore.
pub fn resource_references(resource: &Resource) -> Vec<String> {
    let pattern = r"\b(?:(data)\.)?([a-z][a-z0-9]*(?:_[a-z0-9]+)+)\.([a-zA-Z][a-zA-Z0-9_-]*)\b";
    let regex = match compile(pattern) {
        Some(re) => re,
        None => return Vec::new(),
    };
    let rendered = serde_json::to_string(&resource.attributes).unwrap_or_default();
    let mut refs = Vec::new();
    for caps in regex.captures_iter(&rendered) {
        // data source references resolve outside the document model
        if caps.get(1).is_some() {
            continue;
        }
        let reference = format!("{}.{}", &caps[2], &caps[3]);
        if !refs.contains(&reference) {
            refs.push(reference);
        }
    }
    refs
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(err) => {
            warn!(pattern, error = %err, "invalid extraction pattern");
            None
        }
    }
}

/// 1-based line number of a byte offset.
fn line_of_offset(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    text[..end].bytes().filter(|b| *b == b'\n').count() + 1
}

/// Body text between an opening brace and its matching close, or `None`
/// when the block is never closed.
fn block_body(text: &str, open_brace: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.get(open_brace) != Some(&b'{') {
        return None;
    }
    let mut depth = 0usize;
    let mut in_string = false;
    let mut previous = 0u8;
    for (index, byte) in bytes.iter().enumerate().skip(open_brace) {
        match byte {
            b'"' if previous != b'\\' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open_brace + 1..index]);
                }
            }
            _ => {}
        }
        previous = *byte;
    }
    None
}

/// Top-level `key = value` pairs of a block body, nested blocks stripped.
fn scan_attributes(body: &str, key_value: &Regex) -> IndexMap<String, Value> {
    let surface = strip_nested(body);
    let mut attributes = IndexMap::new();
    for caps in key_value.captures_iter(&surface) {
        attributes.insert(caps[1].to_string(), coerce_literal(&caps[2]));
    }
    attributes
}

/// Drops everything inside nested `{ ... }` groups, keeping surface text.
fn strip_nested(body: &str) -> String {
    let mut surface = String::with_capacity(body.len());
    let mut depth = 0usize;
    let mut in_string = false;
    let mut previous = '\0';
    for ch in body.chars() {
        match ch {
            '"' if previous != '\\' => {
                in_string = !in_string;
                if depth == 0 {
                    surface.push(ch);
                }
            }
            '{' if !in_string => depth += 1,
            '}' if !in_string && depth > 0 => depth -= 1,
            _ if depth == 0 => surface.push(ch),
            _ => {}
        }
        previous = ch;
    }
    surface
}

/// Literal coercion for fallback values: quoted strings, booleans and
/// numbers become typed values; anything else stays raw source text.
fn coerce_literal(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        return Value::String(trimmed[1..trimmed.len() - 1].to_string());
    }
    match trimmed {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Ok(float) = trimmed.parse::<f64>() {
        if let Some(number) = serde_json::Number::from_f64(float) {
            return Value::Number(number);
        }
    }
    Value::String(trimmed.to_string())
}

fn label_text(block: &Block, index: usize) -> Option<String> {
    block.labels.get(index).map(|label| match label {
        BlockLabel::String(value) => value.value().to_string(),
        BlockLabel::Ident(ident) => ident.value().to_string(),
    })
}

/// Attribute map of a block body; nested blocks become arrays of objects,
/// one object per repeated block.
fn body_to_attributes(body: &Body) -> IndexMap<String, Value> {
    let mut attributes = IndexMap::new();
    for attr in body.attributes() {
        attributes.insert(attr.key.as_str().to_string(), expression_to_value(&attr.value));
    }
    for nested in body.blocks() {
        let key = nested.ident.as_str().to_string();
        let object = Value::Object(body_to_object(&nested.body));
        match attributes
            .entry(key)
            .or_insert_with(|| Value::Array(Vec::new()))
        {
            Value::Array(items) => items.push(object),
            existing => {
                // an attribute and a block share the name; the block wins
                *existing = Value::Array(vec![object]);
            }
        }
    }
    attributes
}

fn body_to_object(body: &Body) -> Map<String, Value> {
    let mut object = Map::new();
    for (key, value) in body_to_attributes(body) {
        object.insert(key, value);
    }
    object
}

/// Converts an HCL expression to a JSON value. Literals map directly;
/// templates collapse to a string when fully literal; every other
/// expression form is captured as its source text.
fn expression_to_value(expr: &Expression) -> Value {
    match expr {
        Expression::Null(_) => Value::Null,
        Expression::Bool(value) => Value::Bool(*value.value()),
        Expression::Number(number) => {
            let inner = number.value();
            if let Some(int) = inner.as_i64() {
                Value::Number(int.into())
            } else if let Some(unsigned) = inner.as_u64() {
                Value::Number(unsigned.into())
            } else if let Some(float) = inner.as_f64() {
                serde_json::Number::from_f64(float)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            } else {
                Value::Null
            }
        }
        Expression::String(value) => Value::String(value.to_string()),
        Expression::Array(entries) => {
            Value::Array(entries.iter().map(expression_to_value).collect())
        }
        Expression::Object(object) => {
            let mut map = Map::new();
            for (key, value) in object.into_iter() {
                let key = match key {
                    ObjectKey::Ident(ident) => ident.to_string(),
                    ObjectKey::Expression(Expression::String(text)) => text.to_string(),
                    ObjectKey::Expression(other) => raw_text(other),
                };
                map.insert(key, expression_to_value(value.expr()));
            }
            Value::Object(map)
        }
        Expression::StringTemplate(template) => {
            let mut literal = String::new();
            let mut fully_literal = true;
            for element in template.into_iter() {
                match element {
                    Element::Literal(text) => literal.push_str(text.value()),
                    _ => {
                        fully_literal = false;
                        break;
                    }
                }
            }
            if fully_literal {
                Value::String(literal)
            } else {
                Value::String(raw_text(expr))
            }
        }
        other => Value::String(raw_text(other)),
    }
}

fn raw_text(expr: &Expression) -> String {
    expr.to_string().trim().to_string()
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = r#"
terraform {
  required_version = ">= 1.0"
  required_providers {
    aws = {
      source  = "hashicorp/aws"
      version = "~> 5.0"
    }
  }
}

variable "environment" {
  type        = string
  description = "Deployment environment"
  default     = "dev"
}

resource "aws_s3_bucket" "data" {
  bucket = "my-data-bucket"
  acl    = "private"

  versioning {
    enabled = true
  }

  tags = {
    Environment = "dev"
    Project     = "terravet"
  }
}

resource "aws_security_group" "web" {
  name = "web-sg"

  ingress {
    from_port   = 22
    to_port     = 22
    protocol    = "tcp"
    cidr_blocks = ["0.0.0.0/0"]
  }

  ingress {
    from_port   = 443
    to_port     = 443
    protocol    = "tcp"
    cidr_blocks = ["0.0.0.0/0"]
  }
}

output "bucket_arn" {
  value       = aws_s3_bucket.data.arn
  description = "ARN of the data bucket"
}
"#;

    #[test]
    fn test_structural_extraction() {
        let model = Extractor::new().extract(SAMPLE, "main.tf");

        assert!(model.diagnostics.is_empty());
        assert_eq!(model.resources.len(), 2);
        assert_eq!(model.variables.len(), 1);
        assert_eq!(model.outputs.len(), 1);
        assert_eq!(model.settings.get("required_version"), Some(&json!(">= 1.0")));
        assert!(model.providers.contains_key("aws"));

        let bucket = model.resource("aws_s3_bucket", "data").unwrap();
        assert_eq!(bucket.attributes.get("bucket"), Some(&json!("my-data-bucket")));
        assert_eq!(
            bucket.attributes.get("tags").and_then(|t| t.get("Environment")),
            Some(&json!("dev"))
        );
        let versioning = bucket.attributes.get("versioning").unwrap();
        assert_eq!(versioning, &json!([{ "enabled": true }]));
        assert!(bucket.line > 0);
        assert_eq!(bucket.source_file, "main.tf");
    }

    #[test]
    fn test_repeated_blocks_become_arrays() {
        let model = Extractor::new().extract(SAMPLE, "main.tf");
        let group = model.resource("aws_security_group", "web").unwrap();
        let ingress = group.attributes.get("ingress").unwrap();
        let rules = ingress.as_array().unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].get("from_port"), Some(&json!(22)));
        assert_eq!(rules[1].get("from_port"), Some(&json!(443)));
        assert_eq!(rules[0].get("cidr_blocks"), Some(&json!(["0.0.0.0/0"])));
    }

    #[test]
    fn test_provider_block_configuration() {
        let text = r#"
provider "aws" {
  region  = "eu-west-1"
  profile = "prod"
}
"#;
        let model = Extractor::new().extract(text, "providers.tf");
        let aws = model.providers.get("aws").unwrap();
        assert_eq!(aws.get("region"), Some(&json!("eu-west-1")));
        assert_eq!(aws.get("profile"), Some(&json!("prod")));
    }

    #[test]
    fn test_variable_extraction() {
        let model = Extractor::new().extract(SAMPLE, "main.tf");
        let variable = &model.variables[0];
        assert_eq!(variable.name, "environment");
        assert_eq!(variable.description, "Deployment environment");
        assert_eq!(variable.default, Some(json!("dev")));
    }

    #[test]
    fn test_output_reference_text() {
        let model = Extractor::new().extract(SAMPLE, "main.tf");
        let output = &model.outputs[0];
        assert_eq!(output.name, "bucket_arn");
        assert_eq!(output.value, Some(json!("aws_s3_bucket.data.arn")));
    }

    #[test]
    fn test_malformed_input_fallback() {
        let broken = "resource \"aws_s3_bucket\" \"b\" {\n  bucket = \n  {{{";
        let model = Extractor::new().extract(broken, "broken.tf");
        assert_eq!(model.resources.len(), 0);
        assert!(!model.diagnostics.is_empty());
        assert!(model.has_error_diagnostics());
    }

    #[test]
    fn test_fallback_recovers_blocks() {
        // an unclosed trailing block forces the fallback; the complete
        // resource above it is still recovered
        let partial = r#"
resource "aws_instance" "web" {
  ami           = "ami-12345"
  instance_type = "t3.micro"
  count         = 2
  monitoring    = true
}

resource "aws_s3_bucket" "broken" {
  bucket = "x"
"#;
        let model = Extractor::new().extract(partial, "partial.tf");
        assert!(model.has_error_diagnostics());
        assert_eq!(model.resources.len(), 1);
        let web = &model.resources[0];
        assert_eq!(web.resource_type, "aws_instance");
        assert_eq!(web.attributes.get("ami"), Some(&json!("ami-12345")));
        assert_eq!(web.attributes.get("count"), Some(&json!(2)));
        assert_eq!(web.attributes.get("monitoring"), Some(&json!(true)));
        assert_eq!(web.line, 2);
    }

    #[test]
    fn test_fallback_skips_nested_attrs() {
        let partial = r#"
resource "aws_security_group" "web" {
  name = "web"
  ingress {
    from_port = 22
  }
}

variable "oops" {
  default = "x"
"#;
        let model = Extractor::new().extract(partial, "partial.tf");
        let group = &model.resources[0];
        assert_eq!(group.attributes.get("name"), Some(&json!("web")));
        // one level down is out of reach for the scanner
        assert!(group.attributes.get("from_port").is_none());
        assert!(group.attributes.get("ingress").is_none());
    }

    #[test]
    fn test_resource_references() {
        let refs = resource_references(
            &Resource::new("aws_instance", "app")
                .with_attribute("subnet_id", json!("aws_subnet.main.id"))
                .with_attribute("ami", json!("data.aws_ami.ubuntu.id"))
                .with_attribute("instance_type", json!("var.instance_type")),
        );
        assert_eq!(refs, vec!["aws_subnet.main".to_string()]);
    }

    #[test]
    fn test_directory_extraction() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.tf"),
            "resource \"aws_s3_bucket\" \"one\" {\n  bucket = \"a\"\n}\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b.tf"),
            "resource \"aws_s3_bucket\" \"two\" {\n  bucket = \"b\"\n}\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let model = Extractor::new().extract_dir(dir.path()).unwrap();
        assert_eq!(model.resources.len(), 2);
        assert!(model.resources[0].source_file.ends_with("a.tf"));
        assert!(model.resources[1].source_file.ends_with("b.tf"));
    }

    #[test]
    fn test_missing_path_errors() {
        let missing = Path::new("/nonexistent/terravet/main.tf");
        assert!(matches!(
            Extractor::new().extract_file(missing),
            Err(HclError::NotFound(_))
        ));
    }
}

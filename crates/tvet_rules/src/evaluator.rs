//! Rule evaluation over extracted documents.
//!
//! Dispatch is a single exhaustive match over [`RuleKind`], so an unknown
//! kind cannot exist at runtime. One (rule, resource) evaluation produces at
//! most one issue; several rules may each flag the same resource. A failing
//! evaluation is logged and skipped, never aborting the pass.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use tvet_hcl::{is_truthy, DocumentModel, Resource};

use crate::advisor::KnowledgeSource;
use crate::error::{RulesError, RulesResult};
use crate::report::{aggregate, AnalysisReport, Issue};
use crate::rules::{Category, Rule, RuleKind, RuleStore};

/// Network-perimeter resource types subject to the ingress exposure check.
const PERIMETER_TYPES: &[&str] = &["aws_security_group", "azurerm_network_security_group"];

/// The one port allowed to face the world (TLS).
const SAFE_PORT: i64 = 443;

const OPEN_CIDR: &str = "0.0.0.0/0";

/// Evaluates a rule store against extracted resources.
pub struct Evaluator {
    store: Arc<RuleStore>,
    knowledge: Option<Arc<dyn KnowledgeSource>>,
}

impl Evaluator {
    pub fn new(store: Arc<RuleStore>) -> Self {
        Self {
            store,
            knowledge: None,
        }
    }

    /// Evaluator over the built-in rule catalog.
    pub fn standard() -> Self {
        Self::new(Arc::new(RuleStore::standard()))
    }

    pub fn with_knowledge(mut self, knowledge: Arc<dyn KnowledgeSource>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    /// Runs every category in the store against every resource.
    pub fn evaluate_model(&self, model: &DocumentModel) -> Vec<Issue> {
        let categories: Vec<Category> = self.store.categories().collect();
        self.evaluate_categories(model, &categories)
    }

    /// Category-major evaluation pass over the model's resources.
    pub fn evaluate_categories(
        &self,
        model: &DocumentModel,
        categories: &[Category],
    ) -> Vec<Issue> {
        debug!(
            resources = model.resource_count(),
            rules = self.store.len(),
            "starting analysis pass"
        );
        let mut issues = Vec::new();
        for &category in categories {
            for resource in &model.resources {
                issues.extend(self.evaluate_resource(resource, category));
            }
        }
        issues
    }

    /// Evaluates one category's rules against a single resource.
    pub fn evaluate_resource(&self, resource: &Resource, category: Category) -> Vec<Issue> {
        let mut issues = Vec::new();
        for rule in self.store.rules_for_category(category) {
            if !rule.applies_to(&resource.resource_type) {
                continue;
            }
            match self.dispatch(rule, resource) {
                Ok(Some(issue)) => issues.push(issue),
                Ok(None) => {}
                Err(error) => {
                    warn!(
                        rule = %rule.id,
                        resource = %resource.address(),
                        %error,
                        "rule evaluation failed, skipping"
                    );
                }
            }
        }
        issues
    }

    /// Full pass plus aggregation into a scored report.
    pub fn analyze(&self, model: &DocumentModel, source: impl Into<String>) -> AnalysisReport {
        let issues = self.evaluate_model(model);
        aggregate(issues, model.resource_count(), source)
    }

    fn dispatch(&self, rule: &Rule, resource: &Resource) -> RulesResult<Option<Issue>> {
        let issue = match &rule.kind {
            RuleKind::RequiredAttr { attribute } => check_required_attr(rule, resource, attribute),
            RuleKind::ForbiddenAttr { attribute } => {
                check_forbidden_attr(rule, resource, attribute)
            }
            RuleKind::AttrValue {
                attribute,
                expected,
            } => check_attr_value(rule, resource, attribute, expected),
            RuleKind::NetworkExposure => check_network_exposure(rule, resource),
            RuleKind::Encryption { attributes } => check_encryption(rule, resource, attributes),
            RuleKind::Tagging { required_tags } => check_tagging(rule, resource, required_tags),
            RuleKind::BestPractice => self.check_best_practice(rule, resource)?,
        };
        Ok(issue)
    }

    fn check_best_practice(
        &self,
        rule: &Rule,
        resource: &Resource,
    ) -> RulesResult<Option<Issue>> {
        let knowledge = match &self.knowledge {
            Some(knowledge) => knowledge,
            None => return Ok(None),
        };
        let advisories = knowledge
            .advisories(resource.provider(), &resource.resource_type)
            .map_err(|source| RulesError::EvaluationFailed {
                rule: rule.id.clone(),
                message: source.to_string(),
            })?;
        if advisories.is_empty() {
            return Ok(None);
        }
        let guidance: Vec<&str> = advisories.iter().take(3).map(String::as_str).collect();
        Ok(Some(issue_for(
            rule,
            resource,
            rule.title.clone(),
            format!(
                "Provider guidance for {}: {}",
                resource.resource_type,
                guidance.join("; ")
            ),
            advisories[0].clone(),
            None,
        )))
    }
}

fn check_required_attr(rule: &Rule, resource: &Resource, attribute: &str) -> Option<Issue> {
    if resource.attributes.contains_key(attribute) {
        return None;
    }
    Some(issue_for(
        rule,
        resource,
        format!("Missing required attribute: {attribute}"),
        text_or(
            &rule.description,
            format!(
                "Resource {} is missing required attribute {attribute}",
                resource.name
            ),
        ),
        format!("Add the {attribute} attribute to {}", resource.name),
        None,
    ))
}

fn check_forbidden_attr(rule: &Rule, resource: &Resource, attribute: &str) -> Option<Issue> {
    if !resource.attributes.contains_key(attribute) {
        return None;
    }
    Some(issue_for(
        rule,
        resource,
        format!("Forbidden attribute present: {attribute}"),
        text_or(
            &rule.description,
            format!(
                "Resource {} contains forbidden attribute {attribute}",
                resource.name
            ),
        ),
        format!("Remove the {attribute} attribute from {}", resource.name),
        None,
    ))
}

fn check_attr_value(
    rule: &Rule,
    resource: &Resource,
    attribute: &str,
    expected: &Value,
) -> Option<Issue> {
    let actual = resource.attributes.get(attribute);
    if actual == Some(expected) {
        return None;
    }
    Some(issue_for(
        rule,
        resource,
        format!("Incorrect attribute value: {attribute}"),
        format!(
            "Resource {} has {attribute}={}, expected {}",
            resource.name,
            value_text(actual),
            value_text(Some(expected))
        ),
        format!("Set {attribute} to {}", value_text(Some(expected))),
        None,
    ))
}

fn check_network_exposure(rule: &Rule, resource: &Resource) -> Option<Issue> {
    if !PERIMETER_TYPES.contains(&resource.resource_type.as_str()) {
        return None;
    }
    let ingress = resource.attributes.get("ingress")?;
    let blocks: Vec<&Value> = match ingress {
        Value::Array(entries) => entries.iter().collect(),
        single @ Value::Object(_) => vec![single],
        _ => return None,
    };
    for block in blocks {
        if open_to_world(block) && ingress_port(block) != Some(SAFE_PORT) {
            return Some(issue_for(
                rule,
                resource,
                "Overly permissive security group rule".to_string(),
                format!(
                    "Security group {} allows traffic from {OPEN_CIDR}",
                    resource.name
                ),
                "Restrict CIDR blocks to specific IP ranges".to_string(),
                None,
            ));
        }
    }
    None
}

fn check_encryption(rule: &Rule, resource: &Resource, attributes: &[String]) -> Option<Issue> {
    for attribute in attributes {
        let enabled = resource
            .attributes
            .get(attribute)
            .map(is_truthy)
            .unwrap_or(false);
        if !enabled {
            return Some(issue_for(
                rule,
                resource,
                format!("Encryption not enabled: {attribute}"),
                format!(
                    "Resource {} does not have {attribute} enabled",
                    resource.name
                ),
                format!("Enable {attribute} for {}", resource.name),
                Some(format!("{attribute} = true")),
            ));
        }
    }
    None
}

fn check_tagging(rule: &Rule, resource: &Resource, required_tags: &[String]) -> Option<Issue> {
    let tags = resource.attributes.get("tags");
    let missing: Vec<&str> = required_tags
        .iter()
        .filter(|tag| !has_tag(tags, tag))
        .map(String::as_str)
        .collect();
    if missing.is_empty() {
        return None;
    }
    let joined = missing.join(", ");
    Some(issue_for(
        rule,
        resource,
        "Missing required tags".to_string(),
        format!(
            "Resource {} is missing required tags: {joined}",
            resource.name
        ),
        format!("Add required tags: {joined}"),
        Some(tag_remediation(&missing)),
    ))
}

fn has_tag(tags: Option<&Value>, key: &str) -> bool {
    matches!(tags, Some(Value::Object(map)) if map.contains_key(key))
}

fn tag_remediation(missing: &[&str]) -> String {
    let lines: Vec<String> = missing
        .iter()
        .map(|tag| format!("    {tag} = \"TODO: Set appropriate value\""))
        .collect();
    format!("tags = {{\n{}\n  }}", lines.join("\n"))
}

/// The rule's own description or recommendation wins when present; the
/// generated text is the fallback.
fn text_or(rule_text: &str, fallback: String) -> String {
    if rule_text.is_empty() {
        fallback
    } else {
        rule_text.to_string()
    }
}

fn value_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "unset".to_string(),
    }
}

fn issue_for(
    rule: &Rule,
    resource: &Resource,
    title: String,
    description: String,
    fallback_recommendation: String,
    fallback_snippet: Option<String>,
) -> Issue {
    Issue {
        category: rule.category,
        severity: rule.severity,
        title,
        description,
        resource_type: resource.resource_type.clone(),
        resource_name: resource.name.clone(),
        recommendation: text_or(&rule.recommendation, fallback_recommendation),
        remediation_snippet: rule.remediation_snippet.clone().or(fallback_snippet),
        references: rule.references.clone(),
    }
}

fn open_to_world(block: &Value) -> bool {
    match block.get("cidr_blocks") {
        Some(Value::Array(cidrs)) => cidrs.iter().any(|c| c.as_str() == Some(OPEN_CIDR)),
        Some(Value::String(raw)) => raw.contains(OPEN_CIDR),
        _ => false,
    }
}

fn ingress_port(block: &Value) -> Option<i64> {
    match block.get("from_port") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::{MockKnowledgeSource, StaticKnowledge};
    use crate::rules::Severity;
    use serde_json::json;

    fn store_with(category: Category, rule: Rule) -> Arc<RuleStore> {
        let mut store = RuleStore::new();
        store.add(category, rule);
        Arc::new(store)
    }

    fn open_security_group(from_port: i64) -> Resource {
        Resource::new("aws_security_group", "web").with_attribute(
            "ingress",
            json!([{
                "from_port": from_port,
                "to_port": from_port,
                "protocol": "tcp",
                "cidr_blocks": ["0.0.0.0/0"],
            }]),
        )
    }

    #[test]
    fn test_required_attr_emits_single_issue() {
        let rule = Rule::required_attr("T-001", "Versioning", "versioning")
            .with_severity(Severity::High);
        let evaluator = Evaluator::new(store_with(Category::Reliability, rule));

        let bare = Resource::new("aws_s3_bucket", "data");
        let issues = evaluator.evaluate_resource(&bare, Category::Reliability);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::High);
        assert_eq!(issues[0].title, "Missing required attribute: versioning");

        let versioned = bare.with_attribute("versioning", json!({"enabled": true}));
        assert!(evaluator
            .evaluate_resource(&versioned, Category::Reliability)
            .is_empty());
    }

    #[test]
    fn test_forbidden_attr() {
        let rule = Rule::forbidden_attr("T-002", "No public ACLs", "public_read_write");
        let evaluator = Evaluator::new(store_with(Category::Security, rule));

        let public = Resource::new("aws_s3_bucket", "data")
            .with_attribute("public_read_write", json!(true));
        let issues = evaluator.evaluate_resource(&public, Category::Security);
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].title,
            "Forbidden attribute present: public_read_write"
        );
    }

    #[test]
    fn test_attr_value_missing_counts_as_mismatch() {
        let rule = Rule::attr_value("T-003", "gp3 volumes", "type", json!("gp3"));
        let evaluator = Evaluator::new(store_with(Category::Performance, rule));

        let wrong = Resource::new("aws_ebs_volume", "disk").with_attribute("type", json!("gp2"));
        let issues = evaluator.evaluate_resource(&wrong, Category::Performance);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].description.contains("has type=gp2, expected gp3"));

        let missing = Resource::new("aws_ebs_volume", "disk");
        assert_eq!(
            evaluator
                .evaluate_resource(&missing, Category::Performance)
                .len(),
            1
        );

        let right = Resource::new("aws_ebs_volume", "disk").with_attribute("type", json!("gp3"));
        assert!(evaluator
            .evaluate_resource(&right, Category::Performance)
            .is_empty());
    }

    #[test]
    fn test_open_ingress_flagged_except_tls() {
        let evaluator = Evaluator::standard();

        let issues = evaluator.evaluate_resource(&open_security_group(22), Category::Security);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].title, "Overly permissive security group rule");
        assert_eq!(issues[0].severity, Severity::Critical);

        let issues = evaluator.evaluate_resource(&open_security_group(443), Category::Security);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_open_ingress_ignores_other_types() {
        let rule = Rule::network_exposure("T-004", "Restrict ingress");
        let evaluator = Evaluator::new(store_with(Category::Security, rule));

        let not_a_perimeter = Resource::new("aws_s3_bucket", "data").with_attribute(
            "ingress",
            json!([{"from_port": 22, "cidr_blocks": ["0.0.0.0/0"]}]),
        );
        assert!(evaluator
            .evaluate_resource(&not_a_perimeter, Category::Security)
            .is_empty());
    }

    #[test]
    fn test_encryption_flags_first_missing_attribute() {
        let rule = Rule::encryption(
            "T-005",
            "Encryption required",
            vec![
                "server_side_encryption_configuration".to_string(),
                "encrypted".to_string(),
            ],
        );
        let evaluator = Evaluator::new(store_with(Category::Security, rule));

        let plain = Resource::new("aws_s3_bucket", "data").with_attribute("encrypted", json!(false));
        let issues = evaluator.evaluate_resource(&plain, Category::Security);
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].title,
            "Encryption not enabled: server_side_encryption_configuration"
        );

        let encrypted = Resource::new("aws_s3_bucket", "data")
            .with_attribute("server_side_encryption_configuration", json!([{}]))
            .with_attribute("encrypted", json!(true));
        // an empty nested block is still falsy
        let issues = evaluator.evaluate_resource(&encrypted, Category::Security);
        assert_eq!(issues.len(), 1);

        let fully = Resource::new("aws_s3_bucket", "data")
            .with_attribute(
                "server_side_encryption_configuration",
                json!([{"rule": [{"apply_server_side_encryption_by_default": [{"sse_algorithm": "AES256"}]}]}]),
            )
            .with_attribute("encrypted", json!(true));
        assert!(evaluator.evaluate_resource(&fully, Category::Security).is_empty());
    }

    #[test]
    fn test_tagging_reports_missing_keys() {
        let rule = Rule::tagging(
            "T-006",
            "Required tags",
            vec![
                "Environment".to_string(),
                "Project".to_string(),
                "Owner".to_string(),
            ],
        );
        let evaluator = Evaluator::new(store_with(Category::Operations, rule));

        let partially_tagged = Resource::new("aws_instance", "app")
            .with_attribute("tags", json!({"Environment": "prod"}));
        let issues = evaluator.evaluate_resource(&partially_tagged, Category::Operations);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].title, "Missing required tags");
        assert!(issues[0].description.contains("Project, Owner"));
        let snippet = issues[0].remediation_snippet.as_deref().unwrap();
        assert_eq!(
            snippet,
            "tags = {\n    Project = \"TODO: Set appropriate value\"\n    Owner = \"TODO: Set appropriate value\"\n  }"
        );
    }

    #[test]
    fn test_best_practice_silent_without_knowledge() {
        let rule = Rule::best_practice("T-007", "Instance sizing");
        let evaluator = Evaluator::new(store_with(Category::Performance, rule));
        let instance = Resource::new("aws_instance", "app");
        assert!(evaluator
            .evaluate_resource(&instance, Category::Performance)
            .is_empty());
    }

    #[test]
    fn test_best_practice_surfaces_advisories() {
        let rule = Rule::best_practice("T-007", "Instance sizing").with_severity(Severity::Info);
        let knowledge = StaticKnowledge::empty().with_resource(
            "aws",
            "aws_instance",
            ["Prefer current generation instance families"],
        );
        let evaluator = Evaluator::new(store_with(Category::Performance, rule))
            .with_knowledge(Arc::new(knowledge));

        let instance = Resource::new("aws_instance", "app");
        let issues = evaluator.evaluate_resource(&instance, Category::Performance);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Info);
        assert!(issues[0]
            .description
            .contains("Prefer current generation instance families"));
    }

    #[test]
    fn test_failing_knowledge_is_skipped() {
        let rule = Rule::best_practice("T-007", "Instance sizing");
        let mut knowledge = MockKnowledgeSource::new();
        knowledge.expect_advisories().returning(|provider, resource_type| {
            Err(RulesError::KnowledgeUnavailable {
                provider: provider.to_string(),
                resource_type: resource_type.to_string(),
                message: "offline".to_string(),
            })
        });
        let evaluator = Evaluator::new(store_with(Category::Performance, rule))
            .with_knowledge(Arc::new(knowledge));

        let instance = Resource::new("aws_instance", "app");
        assert!(evaluator
            .evaluate_resource(&instance, Category::Performance)
            .is_empty());
    }

    #[test]
    fn test_bare_bucket_analysis() {
        let evaluator = Evaluator::standard();
        let mut model = DocumentModel::default();
        model.resources.push(
            Resource::new("aws_s3_bucket", "data")
                .with_attribute("bucket", json!("my-data"))
                .with_attribute("public_read_write", json!(true)),
        );

        let issues =
            evaluator.evaluate_categories(&model, &[Category::Security, Category::Reliability]);
        assert!(issues.len() >= 3);
        let titles: Vec<&str> = issues.iter().map(|i| i.title.as_str()).collect();
        assert!(titles
            .contains(&"Encryption not enabled: server_side_encryption_configuration"));
        assert!(titles.contains(&"Forbidden attribute present: public_read_write"));
        assert!(titles.contains(&"Missing required attribute: versioning"));

        let report = aggregate(issues, model.resource_count(), "main.tf");
        assert!(report.score < 70.0);
    }
}

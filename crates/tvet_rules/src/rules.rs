//! Rule taxonomy, typed rule kinds, and the rule store.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::catalog;
use crate::error::{RulesError, RulesResult};

/// Analysis categories, loosely modeled on well-architected pillars.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    Security,
    Reliability,
    Performance,
    Cost,
    Operations,
    Sustainability,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Security,
        Category::Reliability,
        Category::Performance,
        Category::Cost,
        Category::Operations,
        Category::Sustainability,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Security => "security",
            Category::Reliability => "reliability",
            Category::Performance => "performance",
            Category::Cost => "cost",
            Category::Operations => "operations",
            Category::Sustainability => "sustainability",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issue severity levels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }

    /// Whether this severity demands another refinement pass.
    pub fn blocks(&self) -> bool {
        matches!(self, Severity::Critical | Severity::High)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The typed check a rule performs. Closed set, dispatched exhaustively.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    /// Issue when the attribute is absent.
    RequiredAttr { attribute: String },
    /// Issue when the attribute is present.
    ForbiddenAttr { attribute: String },
    /// Issue when the attribute is missing or differs from the expected
    /// value.
    AttrValue { attribute: String, expected: Value },
    /// Issue when an ingress-like sub-block is open to the world on a
    /// non-TLS port. Only meaningful for perimeter resource types.
    NetworkExposure,
    /// Issue when any of the listed attributes is absent or falsy.
    Encryption { attributes: Vec<String> },
    /// Issue listing required tag keys missing from `tags`.
    Tagging { required_tags: Vec<String> },
    /// Advisory check backed by the knowledge source; silent without one.
    BestPractice,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::RequiredAttr { .. } => "required_attr",
            RuleKind::ForbiddenAttr { .. } => "forbidden_attr",
            RuleKind::AttrValue { .. } => "attr_value",
            RuleKind::NetworkExposure => "network_exposure",
            RuleKind::Encryption { .. } => "encryption",
            RuleKind::Tagging { .. } => "tagging",
            RuleKind::BestPractice => "best_practice",
        }
    }
}

/// A typed policy rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rule {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Category,
    pub severity: Severity,
    #[serde(flatten)]
    pub kind: RuleKind,
    /// Applicable resource types; empty, or an entry `"*"`, means all.
    #[serde(default)]
    pub resource_types: Vec<String>,
    #[serde(default)]
    pub recommendation: String,
    #[serde(default)]
    pub remediation_snippet: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
}

impl Rule {
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            category: Category::Security,
            severity: Severity::Medium,
            kind,
            resource_types: Vec::new(),
            recommendation: String::new(),
            remediation_snippet: None,
            references: Vec::new(),
        }
    }

    pub fn required_attr(
        id: impl Into<String>,
        title: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            title,
            RuleKind::RequiredAttr {
                attribute: attribute.into(),
            },
        )
    }

    pub fn forbidden_attr(
        id: impl Into<String>,
        title: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            title,
            RuleKind::ForbiddenAttr {
                attribute: attribute.into(),
            },
        )
    }

    pub fn attr_value(
        id: impl Into<String>,
        title: impl Into<String>,
        attribute: impl Into<String>,
        expected: Value,
    ) -> Self {
        Self::new(
            id,
            title,
            RuleKind::AttrValue {
                attribute: attribute.into(),
                expected,
            },
        )
    }

    pub fn network_exposure(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(id, title, RuleKind::NetworkExposure)
    }

    pub fn encryption(
        id: impl Into<String>,
        title: impl Into<String>,
        attributes: Vec<String>,
    ) -> Self {
        Self::new(id, title, RuleKind::Encryption { attributes })
    }

    pub fn tagging(
        id: impl Into<String>,
        title: impl Into<String>,
        required_tags: Vec<String>,
    ) -> Self {
        Self::new(id, title, RuleKind::Tagging { required_tags })
    }

    pub fn best_practice(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(id, title, RuleKind::BestPractice)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_types(mut self, types: &[&str]) -> Self {
        self.resource_types = types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = recommendation.into();
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.remediation_snippet = Some(snippet.into());
        self
    }

    pub fn with_references(mut self, references: &[&str]) -> Self {
        self.references = references.iter().map(|r| r.to_string()).collect();
        self
    }

    /// Whether this rule applies to a resource type. An empty list and a
    /// `"*"` entry both mean universal applicability.
    pub fn applies_to(&self, resource_type: &str) -> bool {
        self.resource_types.is_empty()
            || self
                .resource_types
                .iter()
                .any(|t| t == "*" || t == resource_type)
    }
}

/// Categorized rule collection.
///
/// Loading from a definition file merges additively: category lists are
/// concatenated, never replaced, and duplicate ids are deliberately kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleStore {
    categories: IndexMap<Category, Vec<Rule>>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in catalog.
    pub fn standard() -> Self {
        let mut store = Self::new();
        catalog::install(&mut store);
        store
    }

    /// Add a rule under a category. The rule's own category field is made
    /// consistent with its placement.
    pub fn add(&mut self, category: Category, mut rule: Rule) {
        rule.category = category;
        self.categories.entry(category).or_default().push(rule);
    }

    pub fn rules_for_category(&self, category: Category) -> &[Rule] {
        self.categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every rule applicable to a resource type, across categories, in
    /// store iteration order.
    pub fn rules_for_resource_type(&self, resource_type: &str) -> Vec<&Rule> {
        self.categories
            .values()
            .flatten()
            .filter(|rule| rule.applies_to(resource_type))
            .collect()
    }

    pub fn rule(&self, id: &str) -> Option<&Rule> {
        self.categories
            .values()
            .flatten()
            .find(|rule| rule.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.categories.values().flatten()
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.categories.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fold another store into this one, concatenating category lists.
    pub fn merge(&mut self, other: RuleStore) {
        for (category, rules) in other.categories {
            self.categories.entry(category).or_default().extend(rules);
        }
    }

    /// Load a rule definition file (`.yaml`, `.yml` or `.json`). Malformed
    /// files are hard errors; nothing is merged on failure.
    pub fn load_file(path: &Path) -> RulesResult<RuleStore> {
        if !path.exists() {
            return Err(RulesError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let mut store: RuleStore = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&text)?,
            Some("json") => serde_json::from_str(&text)?,
            _ => return Err(RulesError::UnsupportedFormat(path.to_path_buf())),
        };
        for (category, rules) in store.categories.iter_mut() {
            for rule in rules {
                rule.category = *category;
            }
        }
        info!(path = %path.display(), rules = store.len(), "loaded rule definitions");
        Ok(store)
    }

    /// Load a definition file and merge it additively into this store.
    pub fn merge_file(&mut self, path: &Path) -> RulesResult<()> {
        let loaded = Self::load_file(path)?;
        self.merge(loaded);
        Ok(())
    }

    pub fn to_yaml(&self) -> RulesResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> RulesResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

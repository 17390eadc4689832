//! Provider best-practice knowledge.
//!
//! Best-practice rules consult a [`KnowledgeSource`] for provider guidance
//! keyed by `(provider, resource_type)`. [`StaticKnowledge`] is the built-in
//! offline catalog; [`CachedKnowledge`] wraps any source with a read-through
//! cache so repeated lookups during multi-resource analysis stay cheap.

use std::collections::HashMap;

#[cfg(test)]
use mockall::automock;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::RulesResult;

/// Lookup for provider guidance.
///
/// Implementations may hit the network; failures are surfaced as errors and
/// handled by the caller (the evaluator degrades gracefully).
#[cfg_attr(test, automock)]
pub trait KnowledgeSource: Send + Sync {
    fn advisories(&self, provider: &str, resource_type: &str) -> RulesResult<Vec<String>>;
}

/// Curated offline guidance catalog.
///
/// Resource-specific entries win over the provider-level list; the
/// provider-level list is general guidance plus per-provider extensions.
#[derive(Debug, Clone, Default)]
pub struct StaticKnowledge {
    general: Vec<String>,
    by_provider: HashMap<String, Vec<String>>,
    by_resource: HashMap<(String, String), Vec<String>>,
}

impl StaticKnowledge {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in catalog shipped with the analyzer.
    pub fn standard() -> Self {
        Self::empty()
            .with_general([
                "Use descriptive resource names",
                "Add appropriate tags for resource management",
                "Enable monitoring and logging",
                "Follow security best practices",
                "Use variables for configurable values",
            ])
            .with_provider(
                "aws",
                [
                    "Use IAM roles for service authentication",
                    "Enable encryption at rest and in transit",
                    "Use VPC for network isolation",
                    "Implement least privilege access",
                ],
            )
            .with_provider(
                "azurerm",
                [
                    "Use managed identities",
                    "Enable Azure Security Center",
                    "Use resource groups for organization",
                    "Implement network security groups",
                ],
            )
            .with_provider(
                "google",
                [
                    "Use service accounts",
                    "Enable Cloud Security Command Center",
                    "Use VPC for network isolation",
                    "Implement IAM policies",
                ],
            )
    }

    pub fn with_general<I, S>(mut self, advisories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.general.extend(advisories.into_iter().map(Into::into));
        self
    }

    pub fn with_provider<I, S>(mut self, provider: impl Into<String>, advisories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.by_provider
            .entry(provider.into())
            .or_default()
            .extend(advisories.into_iter().map(Into::into));
        self
    }

    pub fn with_resource<I, S>(
        mut self,
        provider: impl Into<String>,
        resource_type: impl Into<String>,
        advisories: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.by_resource
            .entry((provider.into(), resource_type.into()))
            .or_default()
            .extend(advisories.into_iter().map(Into::into));
        self
    }
}

impl KnowledgeSource for StaticKnowledge {
    fn advisories(&self, provider: &str, resource_type: &str) -> RulesResult<Vec<String>> {
        let key = (provider.to_string(), resource_type.to_string());
        if let Some(advisories) = self.by_resource.get(&key) {
            return Ok(advisories.clone());
        }
        let mut advisories = self.general.clone();
        if let Some(extra) = self.by_provider.get(provider) {
            advisories.extend(extra.iter().cloned());
        }
        Ok(advisories)
    }
}

/// Read-through cache over another [`KnowledgeSource`].
///
/// Only successful lookups are cached; a failing source is retried on the
/// next call. `invalidate` drops a single key so refreshed guidance is
/// picked up without rebuilding the whole cache.
pub struct CachedKnowledge<S> {
    source: S,
    cache: RwLock<HashMap<(String, String), Vec<String>>>,
}

impl<S: KnowledgeSource> CachedKnowledge<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn invalidate(&self, provider: &str, resource_type: &str) {
        self.cache
            .write()
            .remove(&(provider.to_string(), resource_type.to_string()));
    }

    pub fn clear(&self) {
        self.cache.write().clear();
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }
}

impl<S: KnowledgeSource> KnowledgeSource for CachedKnowledge<S> {
    fn advisories(&self, provider: &str, resource_type: &str) -> RulesResult<Vec<String>> {
        let key = (provider.to_string(), resource_type.to_string());
        if let Some(hit) = self.cache.read().get(&key) {
            return Ok(hit.clone());
        }
        debug!(provider, resource_type, "knowledge cache miss");
        let advisories = self.source.advisories(provider, resource_type)?;
        self.cache.write().insert(key, advisories.clone());
        Ok(advisories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RulesError;
    use mockall::Sequence;

    #[test]
    fn test_static_knowledge_provider_merge() {
        let knowledge = StaticKnowledge::standard();
        let advisories = knowledge.advisories("aws", "aws_instance").unwrap();
        assert!(advisories.contains(&"Use descriptive resource names".to_string()));
        assert!(advisories.contains(&"Use IAM roles for service authentication".to_string()));
    }

    #[test]
    fn test_resource_specific_entries_win() {
        let knowledge = StaticKnowledge::standard().with_resource(
            "aws",
            "aws_s3_bucket",
            ["Enable bucket versioning"],
        );
        let advisories = knowledge.advisories("aws", "aws_s3_bucket").unwrap();
        assert_eq!(advisories, vec!["Enable bucket versioning".to_string()]);
    }

    #[test]
    fn test_unknown_provider_gets_general_guidance() {
        let knowledge = StaticKnowledge::standard();
        let advisories = knowledge.advisories("oci", "oci_core_instance").unwrap();
        assert_eq!(advisories.len(), 5);
    }

    #[test]
    fn test_cache_read_through() {
        let mut source = MockKnowledgeSource::new();
        source
            .expect_advisories()
            .times(1)
            .returning(|_, _| Ok(vec!["advice".to_string()]));

        let cached = CachedKnowledge::new(source);
        assert_eq!(cached.advisories("aws", "aws_instance").unwrap().len(), 1);
        assert_eq!(cached.advisories("aws", "aws_instance").unwrap().len(), 1);
        assert_eq!(cached.len(), 1);
    }

    #[test]
    fn test_invalidate_forces_refetch() {
        let mut source = MockKnowledgeSource::new();
        source
            .expect_advisories()
            .times(2)
            .returning(|_, _| Ok(vec!["advice".to_string()]));

        let cached = CachedKnowledge::new(source);
        cached.advisories("aws", "aws_instance").unwrap();
        cached.invalidate("aws", "aws_instance");
        assert!(cached.is_empty());
        cached.advisories("aws", "aws_instance").unwrap();
    }

    #[test]
    fn test_failures_are_not_cached() {
        let mut source = MockKnowledgeSource::new();
        let mut seq = Sequence::new();
        source
            .expect_advisories()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|provider, resource_type| {
                Err(RulesError::KnowledgeUnavailable {
                    provider: provider.to_string(),
                    resource_type: resource_type.to_string(),
                    message: "offline".to_string(),
                })
            });
        source
            .expect_advisories()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(vec!["advice".to_string()]));

        let cached = CachedKnowledge::new(source);
        assert!(cached.advisories("aws", "aws_instance").is_err());
        assert!(cached.is_empty());
        assert_eq!(cached.advisories("aws", "aws_instance").unwrap().len(), 1);
    }
}

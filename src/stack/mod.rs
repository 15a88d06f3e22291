//! Typed stack builder.
//!
//! Components are plain functions: they take the typed handles of what they
//! depend on and return handles to what they create. Handles render as
//! templates, so wiring through them produces the same `StackConfig` a
//! hand-written cloudjar.yaml would.

pub mod composition;
pub mod compute;
pub mod datastores;
pub mod frontend;
pub mod secrets;

use crate::core::resolver::TemplateRef;
use crate::core::types::*;
use indexmap::IndexMap;
use std::fmt;

/// A declared resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handle {
    id: String,
    resource_type: ResourceType,
}

impl Handle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// `{{<id>.<attribute>}}`
    pub fn output(&self, attribute: &str) -> Output {
        Output(TemplateRef::Output {
            resource: self.id.clone(),
            attribute: attribute.to_string(),
        })
    }
}

/// A provider-assigned value of another resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output(TemplateRef);

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A secret read from the store at deploy time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRef(TemplateRef);

impl SecretRef {
    pub fn of(secret: &Handle) -> Self {
        Self(TemplateRef::Secret(secret.id.clone()))
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A declared stack parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param(TemplateRef);

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

pub struct StackBuilder {
    config: StackConfig,
}

impl StackBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            config: StackConfig {
                version: "1.0".to_string(),
                name: name.to_string(),
                description: None,
                provider: ProviderConfig::default(),
                params: IndexMap::new(),
                resources: IndexMap::new(),
                outputs: IndexMap::new(),
                policy: Policy::default(),
            },
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.config.description = Some(description.to_string());
        self
    }

    pub fn provider(mut self, region: &str, account_id: &str) -> Self {
        self.config.provider = ProviderConfig {
            region: region.to_string(),
            account_id: account_id.to_string(),
        };
        self
    }

    pub fn param(&mut self, key: &str, value: impl Into<serde_yaml_ng::Value>) -> Param {
        self.config.params.insert(key.to_string(), value.into());
        Param(TemplateRef::Param(key.to_string()))
    }

    pub fn add(&mut self, id: &str, kind: ResourceKind) -> Handle {
        let resource_type = kind.resource_type();
        self.config
            .resources
            .insert(id.to_string(), Resource::new(kind));
        Handle {
            id: id.to_string(),
            resource_type,
        }
    }

    /// Add an explicit edge on top of template-implied ones.
    pub fn depends_on(&mut self, resource: &Handle, dependency: &Handle) {
        if let Some(r) = self.config.resources.get_mut(&resource.id) {
            r.depends_on.push(dependency.id.clone());
        }
    }

    pub fn output(&mut self, name: &str, value: &Output) {
        self.config
            .outputs
            .insert(name.to_string(), value.to_string());
    }

    pub fn build(self) -> StackConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolver::parse_refs;

    #[test]
    fn test_handles_render_templates() {
        let mut b = StackBuilder::new("t");
        let cluster = b.add("cluster", ResourceKind::ComputeCluster(ComputeClusterSpec::default()));
        assert_eq!(cluster.output("arn").to_string(), "{{cluster.arn}}");
        assert_eq!(SecretRef::of(&cluster).to_string(), "{{secret.cluster}}");
        let p = b.param("db_name", "app");
        assert_eq!(p.to_string(), "{{params.db_name}}");
        assert_eq!(parse_refs(&p.to_string()).unwrap().len(), 1);
    }

    #[test]
    fn test_builder_collects_config() {
        let mut b = StackBuilder::new("t")
            .description("demo")
            .provider("us-east-1", "123456789012");
        let a = b.add("a", ResourceKind::ComputeCluster(ComputeClusterSpec::default()));
        let c = b.add("c", ResourceKind::ComputeCluster(ComputeClusterSpec::default()));
        b.depends_on(&c, &a);
        b.output("cluster", &a.output("name"));
        let config = b.build();
        assert_eq!(config.provider.region, "us-east-1");
        assert_eq!(config.resources["c"].depends_on, vec!["a"]);
        assert_eq!(config.outputs["cluster"], "{{a.name}}");
        assert_eq!(a.resource_type(), ResourceType::ComputeCluster);
    }
}

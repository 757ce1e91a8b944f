//! Keep selected classes out of the tree.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use valscope::v1::{ClassDef, Kind, Node, NodeDetail, Parser, Plugin, Trigger, Value, hint};

/// Class names to suppress.
///
/// ```json
/// { "blacklist": ["Secrets"], "shallow_blacklist": ["Container"] }
/// ```
///
/// A name matches instances of that class and of its subclasses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistConfig {
    /// Suppressed everywhere.
    #[serde(default)]
    pub blacklist: Vec<String>,
    /// Suppressed below the root only, so dumping one directly still works.
    #[serde(default)]
    pub shallow_blacklist: Vec<String>,
}

impl BlacklistConfig {
    pub fn from_json(json: &str) -> valscope::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Replaces matching objects with an empty instance node hinted
/// `blacklist` and stops their expansion.
#[derive(Debug, Clone, Default)]
pub struct BlacklistPlugin {
    config: BlacklistConfig,
}

impl BlacklistPlugin {
    pub fn new(config: BlacklistConfig) -> Self {
        Self { config }
    }

    pub fn deny(mut self, class: impl Into<String>) -> Self {
        self.config.blacklist.push(class.into());
        self
    }

    pub fn deny_nested(mut self, class: impl Into<String>) -> Self {
        self.config.shallow_blacklist.push(class.into());
        self
    }

    pub fn config(&self) -> &BlacklistConfig {
        &self.config
    }

    fn matches(&self, class: &ClassDef, depth: usize) -> bool {
        if self.config.blacklist.iter().any(|name| class.is_a(name)) {
            return true;
        }
        depth > 0 && self.config.shallow_blacklist.iter().any(|name| class.is_a(name))
    }
}

impl Plugin for BlacklistPlugin {
    fn types(&self) -> &[Kind] {
        &[Kind::Object]
    }

    fn triggers(&self) -> Trigger {
        Trigger::BEGIN
    }

    fn parse(
        &self,
        value: &Value,
        node: &mut Node,
        _trigger: Trigger,
        parser: &Parser,
    ) -> Result<()> {
        let Some(object) = value.as_object() else {
            return Ok(());
        };
        let class = object
            .try_borrow()
            .context("object is mutably borrowed")?
            .class()
            .clone();
        if !self.matches(&class, node.depth) {
            return Ok(());
        }

        let identity = value.identity().context("object has no identity")?;
        let mut blocked = Node::default().with_detail(NodeDetail::Instance {
            class: class.name().to_string(),
            identity,
        });
        blocked.transplant(std::mem::take(node));
        blocked.clear_representations();
        blocked.value = None;
        blocked.size = None;
        blocked.add_hint(hint::BLACKLIST);
        *node = blocked;

        parser.halt_parse();
        Ok(())
    }

    fn name(&self) -> &str {
        "blacklist"
    }
}

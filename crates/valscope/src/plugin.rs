//! The extension contract between the parser and its collaborators.

use crate::node::{Kind, Node};
use crate::parser::Parser;
use crate::value::Value;
use bitflags::bitflags;

bitflags! {
    /// Points in a node's lifecycle at which plugins run.
    ///
    /// Every node sees `BEGIN` and then exactly one terminal trigger:
    /// `SUCCESS`, `DEPTH_LIMIT` or `RECURSION`. `COMPLETE` is the union of
    /// the terminal triggers, for plugins that want to run once per node
    /// however its walk ended.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Trigger: u8 {
        const NONE = 0;
        const BEGIN = 1 << 0;
        const SUCCESS = 1 << 1;
        const DEPTH_LIMIT = 1 << 2;
        const RECURSION = 1 << 3;
        const COMPLETE = Self::SUCCESS.bits() | Self::DEPTH_LIMIT.bits() | Self::RECURSION.bits();
    }
}

/// A hook the parser runs on nodes of certain kinds at certain triggers.
///
/// `types` and `triggers` are read once, at registration. A handler may
/// mutate `node`, replace it wholesale (see [`Node::transplant`]), parse
/// further values through `parser`, or stop the current node with
/// [`Parser::halt_parse`]. An `Err` is reported as a diagnostic and the
/// walk carries on.
pub trait Plugin {
    fn types(&self) -> &[Kind];

    fn triggers(&self) -> Trigger;

    fn parse(
        &self,
        value: &Value,
        node: &mut Node,
        trigger: Trigger,
        parser: &Parser,
    ) -> anyhow::Result<()>;

    /// Label used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

type Handler = dyn Fn(&Value, &mut Node, Trigger, &Parser) -> anyhow::Result<()>;

/// A plugin made from a closure, for ad-hoc hooks.
///
/// ```
/// use valscope::v1::{Kind, Node, Parser, ProxyPlugin, Trigger, Value};
///
/// let mut parser = Parser::default();
/// parser.add_plugin(ProxyPlugin::new(
///     [Kind::Integer],
///     Trigger::SUCCESS,
///     |_value, node, _trigger, _parser| {
///         node.add_hint("seen");
///         Ok(())
///     },
/// ));
///
/// let node = parser.parse(&Value::Int(7), Node::new("$n"));
/// assert!(node.has_hint("seen"));
/// ```
pub struct ProxyPlugin {
    name: String,
    types: Vec<Kind>,
    triggers: Trigger,
    handler: Box<Handler>,
}

impl ProxyPlugin {
    pub fn new<F>(types: impl Into<Vec<Kind>>, triggers: Trigger, handler: F) -> Self
    where
        F: Fn(&Value, &mut Node, Trigger, &Parser) -> anyhow::Result<()> + 'static,
    {
        Self {
            name: "proxy".to_string(),
            types: types.into(),
            triggers,
            handler: Box::new(handler),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Plugin for ProxyPlugin {
    fn types(&self) -> &[Kind] {
        &self.types
    }

    fn triggers(&self) -> Trigger {
        self.triggers
    }

    fn parse(
        &self,
        value: &Value,
        node: &mut Node,
        trigger: Trigger,
        parser: &Parser,
    ) -> anyhow::Result<()> {
        (self.handler)(value, node, trigger, parser)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

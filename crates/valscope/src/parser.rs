//! The traversal engine.

use crate::access;
use crate::classify::{Classifier, Member, StandardClassifier};
use crate::config::ParserConfig;
use crate::error::{Error, Result};
use crate::node::{Encoding, Kind, Node, NodeDetail, Representation, Scalar, hint};
use crate::plugin::{Plugin, Trigger};
use crate::tracker::IdentityTracker;
use crate::value::{ClassRef, ClassTable, Identity, Value};
use std::cell::{Cell, RefCell};
use std::fmt;

/// A plugin fault, reported instead of failing the walk.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub plugin: String,
    pub trigger: Trigger,
    /// Name of the node the plugin was handling.
    pub node: String,
    pub message: String,
}

struct Registration {
    types: Vec<Kind>,
    triggers: Trigger,
    plugin: Box<dyn Plugin>,
}

impl Registration {
    fn applies(&self, kind: Kind, trigger: Trigger) -> bool {
        self.triggers.intersects(trigger) && self.types.contains(&kind)
    }
}

/// Walks a [`Value`] into a [`Node`] tree.
///
/// Configuration (depth limit, caller class) can only change while the
/// parser is idle; plugins receive `&Parser` and get
/// [`Error::ParseInProgress`] if they try. Other parser instances are
/// unaffected.
///
/// ```
/// use valscope::v1::{Node, Parser, Value, hint};
///
/// let list = Value::array([Value::Int(1), Value::from("two")]);
/// list.as_array().unwrap().borrow_mut().push(list.clone());
///
/// let parser = Parser::default();
/// let node = parser.parse(&list, Node::new("list").with_access_path("list"));
///
/// assert_eq!(node.children().len(), 3);
/// assert_eq!(node.children()[1].access_path.as_deref(), Some("list[1]"));
/// assert!(node.children()[2].has_hint(hint::RECURSION));
/// ```
pub struct Parser {
    depth_limit: Cell<usize>,
    caller_class: RefCell<Option<ClassRef>>,
    plugins: Vec<Registration>,
    classifier: Box<dyn Classifier>,
    active: Cell<usize>,
    halted: Cell<bool>,
    tracker: RefCell<IdentityTracker>,
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(0, None)
    }
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plugins: Vec<&str> = self.plugins.iter().map(|r| r.plugin.name()).collect();
        f.debug_struct("Parser")
            .field("depth_limit", &self.depth_limit.get())
            .field(
                "caller_class",
                &self.caller_class.borrow().as_ref().map(|c| c.name().to_string()),
            )
            .field("plugins", &plugins)
            .field("active", &self.active.get())
            .finish()
    }
}

/// Marks the parser busy for the lifetime of one `parse` call.
struct ActiveGuard<'a> {
    parser: &'a Parser,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        let remaining = self.parser.active.get() - 1;
        self.parser.active.set(remaining);
        if remaining == 0 {
            self.parser.tracker.borrow_mut().clear();
            self.parser.halted.set(false);
        }
    }
}

/// A composite whose members are still being walked.
struct Frame {
    value: Value,
    kind: Kind,
    identity: Option<Identity>,
    node: Node,
    members: std::vec::IntoIter<(Member, Value)>,
    children: Vec<Node>,
}

enum Step {
    Done(Node),
    Expand(Frame),
}

impl Parser {
    /// `depth_limit` 0 means unlimited.
    pub fn new(depth_limit: usize, caller_class: Option<ClassRef>) -> Self {
        Self {
            depth_limit: Cell::new(depth_limit),
            caller_class: RefCell::new(caller_class),
            plugins: Vec::new(),
            classifier: Box::new(StandardClassifier),
            active: Cell::new(0),
            halted: Cell::new(false),
            tracker: RefCell::new(IdentityTracker::new()),
            diagnostics: RefCell::new(Vec::new()),
        }
    }

    pub fn from_config(config: &ParserConfig, classes: &ClassTable) -> Result<Self> {
        Ok(Self::new(config.depth_limit, config.resolve_caller(classes)?))
    }

    /// Replace the kind-classification hook.
    pub fn with_classifier(mut self, classifier: impl Classifier + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    // ── Configuration ────────────────────────────────────────────────

    pub fn depth_limit(&self) -> usize {
        self.depth_limit.get()
    }

    pub fn caller_class(&self) -> Option<ClassRef> {
        self.caller_class.borrow().clone()
    }

    pub fn set_depth_limit(&self, depth_limit: usize) -> Result<()> {
        self.ensure_idle("change the depth limit")?;
        self.depth_limit.set(depth_limit);
        Ok(())
    }

    pub fn set_caller_class(&self, caller_class: Option<ClassRef>) -> Result<()> {
        self.ensure_idle("change the caller class")?;
        *self.caller_class.borrow_mut() = caller_class;
        Ok(())
    }

    pub fn configure(&self, depth_limit: usize, caller_class: Option<ClassRef>) -> Result<()> {
        self.ensure_idle("reconfigure")?;
        self.depth_limit.set(depth_limit);
        *self.caller_class.borrow_mut() = caller_class;
        Ok(())
    }

    fn ensure_idle(&self, operation: &'static str) -> Result<()> {
        if self.active.get() > 0 {
            return Err(Error::ParseInProgress { operation });
        }
        Ok(())
    }

    // ── Plugins ──────────────────────────────────────────────────────

    /// Register a plugin after those already registered.
    ///
    /// A plugin with no types or no triggers is not registered and `false`
    /// is returned.
    pub fn add_plugin(&mut self, plugin: impl Plugin + 'static) -> bool {
        let types = plugin.types().to_vec();
        let triggers = plugin.triggers();
        if types.is_empty() || triggers.is_empty() {
            tracing::debug!(plugin = plugin.name(), "plugin declares no types or triggers");
            return false;
        }
        self.plugins.push(Registration {
            types,
            triggers,
            plugin: Box::new(plugin),
        });
        true
    }

    pub fn clear_plugins(&mut self) {
        self.plugins.clear();
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    /// Stop work on the node the calling plugin is handling.
    ///
    /// Plugins still pending at the current trigger are skipped and the
    /// node is returned as it stands. Siblings and ancestors carry on.
    pub fn halt_parse(&self) {
        self.halted.set(true);
    }

    /// Drain the faults reported by plugins so far.
    ///
    /// Faults accumulate across `parse` calls until drained here, so a
    /// long-lived parser should call this after each walk.
    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }

    // ── Helpers for plugins ──────────────────────────────────────────

    /// Whether `child`, a member of `parent`, is referenceable from this
    /// parser's caller class. See [`access::child_has_path`].
    pub fn child_has_path(&self, parent: &Node, child: &Node) -> Result<bool> {
        access::child_has_path(self.caller_class.borrow().as_deref(), parent, child)
    }

    /// A copy of `value` a plugin may mutate freely without affecting the
    /// walk in progress or the caller's value.
    pub fn clean_snapshot(&self, value: &Value) -> Value {
        value.detached()
    }

    // ── Traversal ────────────────────────────────────────────────────

    /// Describe `value`, starting from `seed` (its name, depth and access
    /// path). Never fails: cycles, depth limits, unknown kinds and plugin
    /// faults all still produce a node.
    ///
    /// The walk keeps its own stack of open composites, so nesting depth
    /// is bounded by memory rather than by the thread's call stack.
    pub fn parse(&self, value: &Value, seed: Node) -> Node {
        self.active.set(self.active.get() + 1);
        let _guard = ActiveGuard { parser: self };

        let mut open: Vec<Frame> = Vec::new();
        let mut step = self.begin_node(value.clone(), seed);
        loop {
            let mut done = match step {
                Step::Done(node) => Some(node),
                Step::Expand(frame) => {
                    open.push(frame);
                    None
                }
            };
            step = loop {
                let Some(frame) = open.last_mut() else {
                    // Only the root finishes with nothing left open.
                    return done.unwrap_or_default();
                };
                if let Some(node) = done.take() {
                    frame.children.push(node);
                }
                if let Some((member, child_value)) = frame.members.next() {
                    let child = self.child_node(&frame.node, member);
                    break self.begin_node(child_value, child);
                }
                done = open.pop().map(|frame| self.finish_composite(frame));
            };
        }
    }

    /// Classify, run BEGIN, and either finish the node or open it for
    /// expansion.
    fn begin_node(&self, value: Value, mut node: Node) -> Step {
        let kind = self.classifier.kind(&value);
        node.kind = kind;

        if !self.apply_plugins(&value, &mut node, Trigger::BEGIN) {
            return Step::Done(node);
        }

        if kind.is_composite() {
            self.begin_composite(value, kind, node)
        } else {
            Step::Done(self.parse_leaf(&value, node))
        }
    }

    fn parse_leaf(&self, value: &Value, mut node: Node) -> Node {
        match value {
            Value::Null => node.value = Some(Scalar::Null),
            Value::Bool(b) => node.value = Some(Scalar::Bool(*b)),
            Value::Int(i) => node.value = Some(Scalar::Int(*i)),
            Value::Float(x) => node.value = Some(Scalar::Float(*x)),
            Value::Str(s) => {
                node.detail = NodeDetail::Blob {
                    encoding: Encoding::detect(s.as_bytes()),
                };
                node.size = Some(s.len());
                node.value = Some(Scalar::Str(s.clone()));
            }
            Value::Bytes(b) => {
                node.detail = NodeDetail::Blob {
                    encoding: Encoding::detect(b),
                };
                node.size = Some(b.len());
                node.value = Some(Scalar::Bytes(b.clone()));
            }
            Value::Resource(r) => {
                node.detail = NodeDetail::Resource {
                    resource_type: r.resource_type().to_string(),
                };
            }
            Value::Array(_) | Value::Object(_) | Value::Uninitialized | Value::Opaque(_) => {}
        }

        self.apply_plugins(value, &mut node, Trigger::SUCCESS);
        node
    }

    fn begin_composite(&self, value: Value, kind: Kind, mut node: Node) -> Step {
        let identity = self.classifier.identity(&value);

        if let Value::Object(object) = &value
            && let Some(identity) = identity
        {
            let class = match object.try_borrow() {
                Ok(object) => object.class().name().to_string(),
                Err(_) => {
                    tracing::warn!(
                        name = %node.name,
                        "object is mutably borrowed, class name unknown"
                    );
                    String::new()
                }
            };
            node.detail = NodeDetail::Instance { class, identity };
        }

        let entered = identity.map(|id| self.tracker.borrow_mut().enter(id));
        if entered == Some(false) {
            tracing::trace!(name = %node.name, depth = node.depth, "recursion");
            node.add_hint(hint::RECURSION);
            self.apply_plugins(&value, &mut node, Trigger::RECURSION);
            return Step::Done(node);
        }

        let limit = self.depth_limit.get();
        if limit > 0 && node.depth >= limit {
            if let Some(id) = identity {
                self.tracker.borrow_mut().leave(id);
            }
            tracing::trace!(name = %node.name, depth = node.depth, "depth limit");
            node.add_hint(hint::DEPTH_LIMIT);
            self.apply_plugins(&value, &mut node, Trigger::DEPTH_LIMIT);
            return Step::Done(node);
        }

        let members = self.classifier.members(&value);
        Step::Expand(Frame {
            children: Vec::with_capacity(members.len()),
            members: members.into_iter(),
            value,
            kind,
            identity,
            node,
        })
    }

    /// Attach the children of an exhausted composite and run SUCCESS.
    fn finish_composite(&self, frame: Frame) -> Node {
        let Frame {
            value,
            kind,
            identity,
            mut node,
            children,
            ..
        } = frame;

        let label = if kind == Kind::Object {
            "Properties"
        } else {
            "Contents"
        };
        node.size = Some(children.len());
        node.add_representation(
            Representation::new(label)
                .with_hint(hint::PRIMARY)
                .with_nodes(children),
        );

        // Still on the tracker here, so plugins that parse this value again
        // see recursion.
        self.apply_plugins(&value, &mut node, Trigger::SUCCESS);

        if let Some(id) = identity {
            self.tracker.borrow_mut().leave(id);
        }
        node
    }

    fn child_node(&self, parent: &Node, member: Member) -> Node {
        let mut child = Node::new(member.name);
        child.depth = parent.depth + 1;
        child.operator = member.operator;
        child.visibility = member.visibility;
        child.owner = member.owner;
        child.is_static = member.is_static;
        child.is_const = member.is_const;
        child.is_readonly = member.is_readonly;

        let visible = match child.visibility {
            None => true,
            Some(_) => self.child_has_path(parent, &child).unwrap_or_else(|err| {
                tracing::warn!(name = %child.name, "no access path: {}", err);
                false
            }),
        };
        if visible {
            child.access_path = access::member_path(parent, &child);
        }
        child
    }

    /// Run the plugins registered for `node.kind` at `trigger`, in
    /// registration order. Returns `false` if one of them halted the node.
    fn apply_plugins(&self, value: &Value, node: &mut Node, trigger: Trigger) -> bool {
        let kind = node.kind;
        let stash = self.halted.replace(false);

        for registration in self.plugins.iter().filter(|r| r.applies(kind, trigger)) {
            let plugin = &registration.plugin;
            if let Err(err) = plugin.parse(value, node, trigger, self) {
                tracing::warn!(
                    plugin = plugin.name(),
                    node = %node.name,
                    ?trigger,
                    "plugin failed: {:#}",
                    err
                );
                self.diagnostics.borrow_mut().push(Diagnostic {
                    plugin: plugin.name().to_string(),
                    trigger,
                    node: node.name.to_string(),
                    message: format!("{:#}", err),
                });
            }

            if self.halted.get() {
                self.halted.set(stash);
                return false;
            }
        }

        self.halted.set(stash);
        true
    }
}

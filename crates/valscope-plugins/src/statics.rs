//! Constants and static properties of an object's class hierarchy.

use anyhow::{Context, Result};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use valscope::v1::{
    ClassDef, ClassRef, Kind, Node, NodeDetail, Operator, Parser, Plugin, Representation, Trigger,
    Value, Visibility, access,
};

/// A constant or static property as seen from one class.
#[derive(Debug, Clone)]
pub struct ClassMember {
    /// Declaring class.
    pub owner: ClassRef,
    pub name: String,
    pub visibility: Visibility,
    pub value: Value,
}

/// Walk `class` and its ancestors, nearest first, keeping the nearest
/// declaration of each name. Inherited private members are not visible.
fn flatten(
    class: &ClassRef,
    declared: impl Fn(&ClassDef) -> Vec<(String, Visibility, Value)>,
) -> Vec<ClassMember> {
    let mut seen = HashSet::new();
    let mut members = Vec::new();
    for (depth, owner) in ClassDef::lineage(class).into_iter().enumerate() {
        for (name, visibility, value) in declared(&*owner) {
            if depth > 0 && visibility == Visibility::Private {
                continue;
            }
            if !seen.insert(name.clone()) {
                continue;
            }
            members.push(ClassMember {
                owner: owner.clone(),
                name,
                visibility,
                value,
            });
        }
    }
    members
}

fn class_constants(class: &ClassRef) -> Vec<ClassMember> {
    flatten(class, |c| {
        c.constants()
            .iter()
            .map(|d| (d.name.clone(), d.visibility, d.value.clone()))
            .collect()
    })
}

/// Static values are read fresh on every call.
fn class_statics(class: &ClassRef) -> Vec<ClassMember> {
    flatten(class, |c| {
        c.statics()
            .iter()
            .map(|d| (d.name.clone(), d.visibility, d.value.borrow().clone()))
            .collect()
    })
}

// ============================================================================
// Constant cache
// ============================================================================

/// Per-class memo of the flattened constant list.
///
/// Clones share storage. Entries are filled lazily, once per class name,
/// and recomputing one yields an equal list, so clearing the cache or
/// disabling it never changes what the plugin produces.
#[derive(Debug, Clone)]
pub struct ConstantCache {
    entries: Option<Rc<RefCell<HashMap<String, Rc<[ClassMember]>>>>>,
}

impl Default for ConstantCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantCache {
    pub fn new() -> Self {
        Self {
            entries: Some(Rc::new(RefCell::new(HashMap::new()))),
        }
    }

    /// A cache that stores nothing and recomputes on every lookup.
    pub fn disabled() -> Self {
        Self { entries: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    pub fn constants(&self, class: &ClassRef) -> Rc<[ClassMember]> {
        let Some(entries) = &self.entries else {
            return class_constants(class).into();
        };
        if let Some(hit) = entries.borrow().get(class.name()) {
            return hit.clone();
        }
        let computed: Rc<[ClassMember]> = class_constants(class).into();
        entries
            .borrow_mut()
            .insert(class.name().to_string(), computed.clone());
        computed
    }

    pub fn clear(&self) {
        if let Some(entries) = &self.entries {
            entries.borrow_mut().clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |e| e.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Plugin
// ============================================================================

/// Adds a "Static class properties" representation (key `statics`) to
/// object nodes.
///
/// Constants come first, then statics; within each group public members
/// precede protected and private ones, and subclass members precede those
/// of their ancestors. Static paths read `Owner::name` and are only set
/// when the parser's caller class may see the member.
///
/// ```
/// use valscope::v1::*;
/// use valscope_plugins::ClassStaticsPlugin;
///
/// let class = ClassDef::new("Config")
///     .with_constant("VERSION", Visibility::Public, Value::Int(2))
///     .with_static("instances", Visibility::Public, Value::Int(0))
///     .shared();
///
/// let mut parser = Parser::default();
/// parser.add_plugin(ClassStaticsPlugin::new());
/// let node = parser.parse(&Value::object(Object::new(&class)), Node::new("$c").with_access_path("$c"));
///
/// let statics = node.representation("statics").unwrap();
/// let paths: Vec<_> = statics.nodes().iter().map(|n| n.access_path.clone().unwrap()).collect();
/// assert_eq!(paths, ["Config::VERSION", "Config::instances"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClassStaticsPlugin {
    cache: ConstantCache,
}

impl ClassStaticsPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(mut self, cache: ConstantCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &ConstantCache {
        &self.cache
    }

    fn member_node(
        parent: &Node,
        member: &ClassMember,
        is_const: bool,
        parser: &Parser,
    ) -> Result<Node> {
        let mut child = Node::new(member.name.as_str()).with_depth(parent.depth + 1);
        child.operator = Operator::Static;
        child.visibility = Some(member.visibility);
        child.owner = Some(member.owner.clone());
        child.is_const = is_const;
        child.is_static = !is_const;
        if parser.child_has_path(parent, &child)? {
            child.access_path = access::member_path(parent, &child);
        }
        Ok(child)
    }
}

impl Plugin for ClassStaticsPlugin {
    fn types(&self) -> &[Kind] {
        &[Kind::Object]
    }

    fn triggers(&self) -> Trigger {
        Trigger::SUCCESS
    }

    fn parse(
        &self,
        value: &Value,
        node: &mut Node,
        _trigger: Trigger,
        parser: &Parser,
    ) -> Result<()> {
        if !matches!(node.detail, NodeDetail::Instance { .. }) {
            return Ok(());
        }
        let Some(object) = value.as_object() else {
            return Ok(());
        };
        let class = object
            .try_borrow()
            .context("object is mutably borrowed")?
            .class()
            .clone();

        let mut members = Vec::new();
        for constant in self.cache.constants(&class).iter() {
            let child = Self::member_node(node, constant, true, parser)?;
            members.push(parser.parse(&constant.value, child));
        }
        for static_member in class_statics(&class) {
            let child = Self::member_node(node, &static_member, false, parser)?;
            members.push(parser.parse(&static_member.value, child));
        }

        if members.is_empty() {
            return Ok(());
        }

        // Constants first, then by visibility, then subclass members before
        // the superclasses they extend. Stable, so ties keep declaration order.
        members.sort_by(|a, b| {
            (!a.is_const)
                .cmp(&!b.is_const)
                .then(a.visibility.cmp(&b.visibility))
                .then_with(|| match (&a.owner, &b.owner) {
                    (Some(x), Some(y)) => ClassDef::hierarchy_order(x, y),
                    _ => Ordering::Equal,
                })
        });

        node.add_representation(
            Representation::new("Static class properties")
                .with_key("statics")
                .with_nodes(members),
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "class_statics"
    }
}

//! The in-memory value graph walked by the parser.
//!
//! Scalars are held inline. Arrays and objects live behind `Rc<RefCell<_>>`
//! so they can be shared, aliased, and made to contain themselves; their
//! [`Identity`] is the address of that shared allocation.

use serde::Serialize;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

pub type ArrayRef = Rc<RefCell<Array>>;
pub type ObjectRef = Rc<RefCell<Object>>;
pub type ResourceRef = Rc<Resource>;
pub type ClassRef = Rc<ClassDef>;

// ============================================================================
// Names and identity
// ============================================================================

/// Display identifier of an entry: an ordinal index or a string key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Name {
    Index(i64),
    Key(String),
}

impl Name {
    pub fn as_index(&self) -> Option<i64> {
        match self {
            Name::Index(i) => Some(*i),
            Name::Key(_) => None,
        }
    }

    pub fn as_key(&self) -> Option<&str> {
        match self {
            Name::Index(_) => None,
            Name::Key(k) => Some(k),
        }
    }
}

impl Default for Name {
    fn default() -> Self {
        Name::Key(String::new())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Name::Index(i) => write!(f, "{}", i),
            Name::Key(k) => write!(f, "{}", k),
        }
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name::Key(s.to_string())
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Name::Key(s)
    }
}

impl From<i64> for Name {
    fn from(i: i64) -> Self {
        Name::Index(i)
    }
}

/// Opaque token distinguishing distinct composite instances.
///
/// Derived from the address of the shared allocation, so it is stable for
/// as long as the value is alive and two structurally equal but separate
/// containers never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Identity(usize);

impl Identity {
    pub fn of<T: ?Sized>(rc: &Rc<T>) -> Self {
        Identity(Rc::as_ptr(rc) as *const () as usize)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:x}", self.0)
    }
}

/// Member visibility. Ordered public < protected < private.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Protected => write!(f, "protected"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

// ============================================================================
// Value
// ============================================================================

/// A raw value handed to [`Parser::parse`](crate::v1::Parser::parse).
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Array(ArrayRef),
    Object(ObjectRef),
    Resource(ResourceRef),
    /// A declared member that was never assigned.
    Uninitialized,
    /// Anything the standard classifier does not understand.
    Opaque(Rc<dyn Any>),
}

impl Value {
    /// A fresh list-like array holding `values` at indices `0..`.
    pub fn array(values: impl IntoIterator<Item = Value>) -> Self {
        Self::from_array(Array::from_values(values))
    }

    pub fn from_array(array: Array) -> Self {
        Value::Array(Rc::new(RefCell::new(array)))
    }

    pub fn object(object: Object) -> Self {
        Value::Object(Rc::new(RefCell::new(object)))
    }

    pub fn resource(resource_type: impl Into<String>) -> Self {
        Value::Resource(Rc::new(Resource::new(resource_type)))
    }

    pub fn opaque<T: Any>(inner: T) -> Self {
        Value::Opaque(Rc::new(inner))
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Identity of a shared container; `None` for inline values.
    pub fn identity(&self) -> Option<Identity> {
        match self {
            Value::Array(a) => Some(Identity::of(a)),
            Value::Object(o) => Some(Identity::of(o)),
            _ => None,
        }
    }

    /// Copy with new identities for every array reachable through arrays.
    ///
    /// An array met twice (shared, or containing itself) maps to one copy,
    /// so sharing and cycles are kept inside the copy. A top-level object
    /// gets a new identity and its property values are copied the same way;
    /// objects found below the top level stay shared handles.
    pub fn detached(&self) -> Self {
        let mut copier = ArrayCopier::default();
        let copy = match self {
            Value::Object(o) => match o.try_borrow() {
                Ok(object) => {
                    let mut object = object.clone();
                    for property in &mut object.properties {
                        property.value = copier.copy_of(&property.value);
                    }
                    Value::object(object)
                }
                Err(_) => {
                    tracing::warn!("object is mutably borrowed, sharing it instead of copying");
                    self.clone()
                }
            },
            other => copier.copy_of(other),
        };
        copier.fill();
        copy
    }
}

/// Deep array copy keyed by original identity. Works from an explicit
/// work list, so nesting depth never reaches the call stack.
#[derive(Default)]
struct ArrayCopier {
    copies: HashMap<Identity, ArrayRef>,
    pending: Vec<(ArrayRef, ArrayRef)>,
}

impl ArrayCopier {
    /// The copy standing in for `value`. Arrays get an empty placeholder
    /// that [`ArrayCopier::fill`] completes.
    fn copy_of(&mut self, value: &Value) -> Value {
        let Value::Array(original) = value else {
            return value.clone();
        };
        let pending = &mut self.pending;
        let copy = self.copies.entry(Identity::of(original)).or_insert_with(|| {
            let copy = Rc::new(RefCell::new(Array::new()));
            pending.push((original.clone(), copy.clone()));
            copy
        });
        Value::Array(copy.clone())
    }

    fn fill(&mut self) {
        while let Some((original, copy)) = self.pending.pop() {
            let entries = match original.try_borrow() {
                Ok(array) => array.entries.clone(),
                Err(_) => {
                    tracing::warn!("array is mutably borrowed, copying no entries");
                    Vec::new()
                }
            };
            let entries = entries
                .into_iter()
                .map(|(key, value)| {
                    let value = self.copy_of(&value);
                    (key, value)
                })
                .collect();
            copy.replace(Array { entries });
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Float(x) => write!(f, "Float({})", x),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Value::Array(a) => match a.try_borrow() {
                Ok(a) => write!(f, "Array({} entries)", a.len()),
                Err(_) => write!(f, "Array(<borrowed>)"),
            },
            Value::Object(o) => match o.try_borrow() {
                Ok(o) => write!(f, "Object({})", o.class().name()),
                Err(_) => write!(f, "Object(<borrowed>)"),
            },
            Value::Resource(r) => write!(f, "Resource({})", r.resource_type()),
            Value::Uninitialized => write!(f, "Uninitialized"),
            Value::Opaque(_) => write!(f, "Opaque"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

// ============================================================================
// Array
// ============================================================================

/// Ordered keyed map. Keys compare exactly: `Index(0)` and `Key("0")` are
/// different entries.
#[derive(Debug, Clone, Default)]
pub struct Array {
    entries: Vec<(Name, Value)>,
}

impl Array {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        let mut array = Self::new();
        for value in values {
            array.push(value);
        }
        array
    }

    /// Insert or replace in place.
    pub fn insert(&mut self, key: impl Into<Name>, value: Value) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Append after the highest integer key.
    pub fn push(&mut self, value: Value) {
        let next = self
            .entries
            .iter()
            .filter_map(|(k, _)| k.as_index())
            .max()
            .map_or(0, |max| max + 1);
        self.entries.push((Name::Index(next), value));
    }

    pub fn get(&self, key: &Name) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn entries(&self) -> &[(Name, Value)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Resource
// ============================================================================

/// An external handle: a type label plus an open/closed state.
#[derive(Debug)]
pub struct Resource {
    resource_type: String,
    closed: Cell<bool>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            closed: Cell::new(false),
        }
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    pub fn close(&self) {
        self.closed.set(true);
    }
}

// ============================================================================
// Classes
// ============================================================================

/// A declared instance property.
#[derive(Debug, Clone)]
pub struct PropertyDecl {
    pub name: String,
    pub visibility: Visibility,
    pub readonly: bool,
    pub default: Value,
}

/// A class-level constant.
#[derive(Debug, Clone)]
pub struct ConstantDecl {
    pub name: String,
    pub visibility: Visibility,
    pub value: Value,
}

/// A class-level static property. The value is shared by every instance.
#[derive(Debug)]
pub struct StaticDecl {
    pub name: String,
    pub visibility: Visibility,
    pub value: RefCell<Value>,
}

/// A composite type: the owner of members and the unit of visibility.
///
/// Two classes are the same type when their names match.
///
/// ```
/// use valscope::v1::{ClassDef, Value, Visibility};
///
/// let base = ClassDef::new("Base")
///     .with_property("id", Visibility::Public, Value::Int(0))
///     .shared();
/// let leaf = ClassDef::new("Leaf")
///     .with_parent(&base)
///     .with_constant("KIND", Visibility::Public, Value::from("leaf"))
///     .shared();
///
/// assert!(leaf.is_subclass_of(&base));
/// assert!(!base.is_subclass_of(&leaf));
/// assert_eq!(leaf.depth(), 1);
/// ```
#[derive(Debug)]
pub struct ClassDef {
    name: String,
    parent: Option<ClassRef>,
    properties: Vec<PropertyDecl>,
    constants: Vec<ConstantDecl>,
    statics: Vec<StaticDecl>,
}

impl PartialEq for ClassDef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            properties: Vec::new(),
            constants: Vec::new(),
            statics: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: &ClassRef) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    pub fn with_property(
        mut self,
        name: impl Into<String>,
        visibility: Visibility,
        default: Value,
    ) -> Self {
        self.properties.push(PropertyDecl {
            name: name.into(),
            visibility,
            readonly: false,
            default,
        });
        self
    }

    pub fn with_readonly_property(
        mut self,
        name: impl Into<String>,
        visibility: Visibility,
        default: Value,
    ) -> Self {
        self.properties.push(PropertyDecl {
            name: name.into(),
            visibility,
            readonly: true,
            default,
        });
        self
    }

    pub fn with_constant(
        mut self,
        name: impl Into<String>,
        visibility: Visibility,
        value: Value,
    ) -> Self {
        self.constants.push(ConstantDecl {
            name: name.into(),
            visibility,
            value,
        });
        self
    }

    pub fn with_static(
        mut self,
        name: impl Into<String>,
        visibility: Visibility,
        value: Value,
    ) -> Self {
        self.statics.push(StaticDecl {
            name: name.into(),
            visibility,
            value: RefCell::new(value),
        });
        self
    }

    pub fn shared(self) -> ClassRef {
        Rc::new(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&ClassRef> {
        self.parent.as_ref()
    }

    pub fn properties(&self) -> &[PropertyDecl] {
        &self.properties
    }

    pub fn constants(&self) -> &[ConstantDecl] {
        &self.constants
    }

    pub fn statics(&self) -> &[StaticDecl] {
        &self.statics
    }

    /// Assign a static declared directly on this class.
    pub fn set_static(&self, name: &str, value: Value) -> bool {
        match self.statics.iter().find(|s| s.name == name) {
            Some(decl) => {
                *decl.value.borrow_mut() = value;
                true
            }
            None => false,
        }
    }

    /// This class followed by its ancestors, nearest first.
    pub fn lineage(class: &ClassRef) -> Vec<ClassRef> {
        std::iter::successors(Some(class.clone()), |c| c.parent.clone()).collect()
    }

    /// Number of ancestors.
    pub fn depth(&self) -> usize {
        std::iter::successors(self.parent.as_deref(), |c| c.parent.as_deref()).count()
    }

    /// Strict subtype check.
    pub fn is_subclass_of(&self, other: &ClassDef) -> bool {
        std::iter::successors(self.parent.as_deref(), |c| c.parent.as_deref()).any(|c| c == other)
    }

    /// `self` is the class named `name` or one of its subclasses.
    pub fn is_a(&self, name: &str) -> bool {
        std::iter::successors(Some(self), |c| c.parent.as_deref()).any(|c| c.name == name)
    }

    /// Same type, or a subtype/supertype of it.
    pub fn is_related_to(&self, other: &ClassDef) -> bool {
        self == other || self.is_subclass_of(other) || other.is_subclass_of(self)
    }

    /// Subclasses order before their superclasses; unrelated classes are equal.
    pub fn hierarchy_order(a: &ClassDef, b: &ClassDef) -> Ordering {
        if a.is_subclass_of(b) {
            Ordering::Less
        } else if b.is_subclass_of(a) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}

/// Name → class lookup, used to resolve caller contexts from configuration.
#[derive(Debug, Clone, Default)]
pub struct ClassTable {
    classes: HashMap<String, ClassRef>,
}

impl ClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, class: ClassDef) -> ClassRef {
        let class = class.shared();
        self.insert(class.clone());
        class
    }

    pub fn insert(&mut self, class: ClassRef) {
        self.classes.insert(class.name().to_string(), class);
    }

    pub fn get(&self, name: &str) -> Option<ClassRef> {
        self.classes.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

// ============================================================================
// Objects
// ============================================================================

/// One instance property slot.
#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    pub visibility: Visibility,
    pub owner: ClassRef,
    pub readonly: bool,
    pub value: Value,
}

/// An instance of a [`ClassDef`].
#[derive(Debug, Clone)]
pub struct Object {
    class: ClassRef,
    properties: Vec<Property>,
}

impl Object {
    /// Instantiate with declared defaults, root ancestor first.
    ///
    /// A redeclared non-private property takes over its ancestor's slot;
    /// private ancestor properties keep their own.
    pub fn new(class: &ClassRef) -> Self {
        let mut properties: Vec<Property> = Vec::new();
        for owner in ClassDef::lineage(class).into_iter().rev() {
            for decl in owner.properties() {
                let slot = Property {
                    name: decl.name.clone(),
                    visibility: decl.visibility,
                    owner: owner.clone(),
                    readonly: decl.readonly,
                    value: decl.default.clone(),
                };
                match properties
                    .iter_mut()
                    .find(|p| p.name == decl.name && p.visibility != Visibility::Private)
                {
                    Some(existing) => *existing = slot,
                    None => properties.push(slot),
                }
            }
        }
        Self {
            class: class.clone(),
            properties,
        }
    }

    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    /// Assign the first property called `name`, or add a dynamic public one.
    pub fn set(&mut self, name: &str, value: Value) {
        match self.properties.iter_mut().find(|p| p.name == name) {
            Some(p) => p.value = value,
            None => self.properties.push(Property {
                name: name.to_string(),
                visibility: Visibility::Public,
                owner: self.class.clone(),
                readonly: false,
                value,
            }),
        }
    }

    /// Assign the property `name` declared by `owner`.
    pub fn set_declared(&mut self, owner: &str, name: &str, value: Value) -> bool {
        match self
            .properties
            .iter_mut()
            .find(|p| p.name == name && p.owner.name() == owner)
        {
            Some(p) => {
                p.value = value;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

//! Kind classification: the step that tells the parser what a raw value is
//! and, for composites, what its children are.

use crate::node::{Kind, Operator};
use crate::value::{ClassRef, Identity, Name, Value, Visibility};

/// Descriptor of one child of a composite.
#[derive(Debug, Clone, Default)]
pub struct Member {
    pub name: Name,
    pub operator: Operator,
    /// Object members only; `None` for array entries.
    pub visibility: Option<Visibility>,
    pub owner: Option<ClassRef>,
    pub is_static: bool,
    pub is_const: bool,
    pub is_readonly: bool,
}

impl Member {
    /// An array-like entry.
    pub fn entry(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            operator: Operator::Index,
            ..Default::default()
        }
    }

    /// An instance property declared by `owner`.
    pub fn property(name: impl Into<Name>, visibility: Visibility, owner: &ClassRef) -> Self {
        Self {
            name: name.into(),
            operator: Operator::Property,
            visibility: Some(visibility),
            owner: Some(owner.clone()),
            ..Default::default()
        }
    }

    pub fn readonly(mut self, readonly: bool) -> Self {
        self.is_readonly = readonly;
        self
    }
}

/// Pluggable classification hook.
///
/// `members` returns the parser's working copy of a composite's children in
/// display order. It is only called for composite kinds that are actually
/// expanded, and key collisions are the classifier's business.
pub trait Classifier {
    fn kind(&self, value: &Value) -> Kind;

    fn identity(&self, value: &Value) -> Option<Identity> {
        value.identity()
    }

    fn members(&self, value: &Value) -> Vec<(Member, Value)>;
}

/// Classifier for the built-in [`Value`] variants.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardClassifier;

impl Classifier for StandardClassifier {
    fn kind(&self, value: &Value) -> Kind {
        match value {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Boolean,
            Value::Int(_) => Kind::Integer,
            Value::Float(_) => Kind::Float,
            Value::Str(_) | Value::Bytes(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Object(_) => Kind::Object,
            Value::Resource(r) if r.is_closed() => Kind::ResourceClosed,
            Value::Resource(_) => Kind::Resource,
            Value::Uninitialized => Kind::Uninitialized,
            Value::Opaque(_) => Kind::Unknown,
        }
    }

    fn members(&self, value: &Value) -> Vec<(Member, Value)> {
        match value {
            Value::Array(array) => match array.try_borrow() {
                Ok(array) => array
                    .entries()
                    .iter()
                    .map(|(key, v)| (Member::entry(key.clone()), v.clone()))
                    .collect(),
                Err(_) => {
                    tracing::warn!("array is mutably borrowed, listing no entries");
                    Vec::new()
                }
            },
            Value::Object(object) => match object.try_borrow() {
                Ok(object) => object
                    .properties()
                    .iter()
                    .map(|p| {
                        let member = Member::property(p.name.as_str(), p.visibility, &p.owner)
                            .readonly(p.readonly);
                        (member, p.value.clone())
                    })
                    .collect(),
                Err(_) => {
                    tracing::warn!("object is mutably borrowed, listing no properties");
                    Vec::new()
                }
            },
            _ => Vec::new(),
        }
    }
}

//! Access paths: whether a member can be referenced from the caller's
//! context, and the expression that reaches it.

use crate::error::{Error, Result};
use crate::node::{Node, Operator};
use crate::value::{ClassDef, Name, Visibility};

/// Can `child`, a member of `parent`, be referenced by code running in
/// `caller`?
///
/// The parent must itself have an access path. Public members are always
/// reachable, protected ones need a caller related to the owner by
/// inheritance, private ones need the owner itself as caller. A member
/// without visibility, or a non-public one without owner, is rejected.
pub fn child_has_path(caller: Option<&ClassDef>, parent: &Node, child: &Node) -> Result<bool> {
    let visibility = child.visibility.ok_or_else(|| {
        Error::InvalidArgument(format!("member `{}` has no visibility", child.name))
    })?;

    let owner = match (&child.owner, visibility) {
        (Some(owner), _) => Some(owner.as_ref()),
        (None, Visibility::Public) => None,
        (None, _) => {
            return Err(Error::InvalidArgument(format!(
                "{} member `{}` has no owner class",
                visibility, child.name
            )));
        }
    };

    if parent.access_path.is_none() {
        return Ok(false);
    }

    Ok(match (visibility, caller, owner) {
        (Visibility::Public, _, _) => true,
        (Visibility::Protected, Some(caller), Some(owner)) => caller.is_related_to(owner),
        (Visibility::Private, Some(caller), Some(owner)) => caller == owner,
        _ => false,
    })
}

/// The expression reaching `child` from `parent`, if the parent has one.
pub fn member_path(parent: &Node, child: &Node) -> Option<String> {
    let base = parent.access_path.as_deref()?;
    match child.operator {
        Operator::Index => Some(format!("{}[{}]", base, index_key(&child.name))),
        Operator::Property => Some(match &child.name {
            Name::Key(key) if is_identifier(key) => format!("{}.{}", base, key),
            other => format!("{}.{{{:?}}}", base, other.to_string()),
        }),
        Operator::Static => child
            .owner
            .as_ref()
            .map(|owner| format!("{}::{}", owner.name(), child.name)),
        Operator::None => None,
    }
}

fn index_key(name: &Name) -> String {
    match name {
        Name::Index(i) => i.to_string(),
        Name::Key(key) => format!("{:?}", key),
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

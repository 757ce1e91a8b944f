//! Shared test fixtures.

use crate::node::Kind;
use crate::plugin::{ProxyPlugin, Trigger};
use crate::value::{ClassDef, ClassRef, Value, Visibility};
use std::cell::RefCell;
use std::rc::Rc;

/// `Leaf -> Mid -> Base`, each declaring `pub_*`, `pro_*` and `pri_*`.
pub fn hierarchy() -> (ClassRef, ClassRef, ClassRef) {
    let level = |name: &str, lower: &str, parent: Option<&ClassRef>| {
        let mut class = ClassDef::new(name)
            .with_property(format!("pub_{}", lower), Visibility::Public, Value::Null)
            .with_property(format!("pro_{}", lower), Visibility::Protected, Value::Null)
            .with_property(format!("pri_{}", lower), Visibility::Private, Value::Null);
        if let Some(parent) = parent {
            class = class.with_parent(parent);
        }
        class.shared()
    };
    let base = level("Base", "base", None);
    let mid = level("Mid", "mid", Some(&base));
    let leaf = level("Leaf", "leaf", Some(&mid));
    (base, mid, leaf)
}

/// A plugin that records every trigger it is dispatched with.
pub fn recorder(
    types: impl Into<Vec<Kind>>,
    triggers: Trigger,
) -> (ProxyPlugin, Rc<RefCell<Vec<Trigger>>>) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    let plugin = ProxyPlugin::new(types, triggers, move |_, _, trigger, _| {
        log.borrow_mut().push(trigger);
        Ok(())
    })
    .with_name("recorder");
    (plugin, seen)
}

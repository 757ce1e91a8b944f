#![doc = include_str!("../README.md")]

mod access;
mod classify;
mod config;
mod error;
mod node;
mod parser;
mod plugin;
mod tracker;
mod value;

#[cfg(test)]
mod fixtures;

pub use error::{Error, Result};

pub mod v1 {
    //! Versioned public API.
    //!
    //! # Values
    //!
    //! What gets walked:
    //!
    //! - [`Value`]: a raw value; arrays and objects are shared and may be cyclic
    //! - [`Array`], [`Object`], [`Resource`]: the container and handle types
    //! - [`ClassDef`] / [`ClassTable`]: classes with properties, constants and statics
    //! - [`Identity`]: per-allocation token used for cycle detection
    //!
    //! # Description tree
    //!
    //! What comes out:
    //!
    //! - [`Node`]: one described value, with [`Representation`]s holding children
    //! - [`Kind`], [`Operator`], [`NodeDetail`], [`Scalar`]: node attributes
    //! - [`hint`]: well-known hint tags
    //!
    //! # Engine and extension points
    //!
    //! - [`Parser`]: the traversal engine
    //! - [`Plugin`] / [`ProxyPlugin`] with [`Trigger`] masks
    //! - [`Classifier`]: replaceable kind-classification hook
    //! - [`ParserConfig`]: serde-loadable settings
    //!
    //! # Example: describe an object as seen from its own class
    //!
    //! ```
    //! use valscope::v1::*;
    //!
    //! let class = ClassDef::new("Account")
    //!     .with_property("owner", Visibility::Public, Value::from("sam"))
    //!     .with_property("balance", Visibility::Private, Value::Int(10))
    //!     .shared();
    //! let account = Value::object(Object::new(&class));
    //!
    //! let outside = Parser::default().parse(&account, Node::new("$a").with_access_path("$a"));
    //! assert_eq!(outside.child("owner").unwrap().access_path.as_deref(), Some("$a.owner"));
    //! assert!(outside.child("balance").unwrap().access_path.is_none());
    //!
    //! let inside = Parser::new(0, Some(class.clone()));
    //! let node = inside.parse(&account, Node::new("$a").with_access_path("$a"));
    //! assert_eq!(node.child("balance").unwrap().access_path.as_deref(), Some("$a.balance"));
    //! ```

    pub use crate::classify::{Classifier, Member, StandardClassifier};
    pub use crate::config::ParserConfig;
    pub use crate::error::{Error, Result};
    pub use crate::node::{
        Contents, Encoding, Kind, Node, NodeDetail, NodeIter, Operator, Representation, Scalar,
        hint,
    };
    pub use crate::parser::{Diagnostic, Parser};
    pub use crate::plugin::{Plugin, ProxyPlugin, Trigger};
    pub use crate::tracker::IdentityTracker;
    pub use crate::value::{
        Array, ArrayRef, ClassDef, ClassRef, ClassTable, ConstantDecl, Identity, Name, Object,
        ObjectRef, Property, PropertyDecl, Resource, ResourceRef, StaticDecl, Value, Visibility,
    };

    /// Access-path helpers for plugins that attach children of their own.
    pub mod access {
        pub use crate::access::{child_has_path, member_path};
    }
}

#![doc = include_str!("../README.md")]

pub mod blacklist;
pub mod statics;

pub use blacklist::{BlacklistConfig, BlacklistPlugin};
pub use statics::{ClassMember, ClassStaticsPlugin, ConstantCache};

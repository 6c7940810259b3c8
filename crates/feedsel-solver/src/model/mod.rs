//! Data model shared between the provider, the solver and the selections
//! document.
//!
//! Feed parsing happens elsewhere; the model here is the already-parsed
//! shape the solver observes: implementations with versions, platform tags,
//! dependencies, commands and bindings, all hanging off a lightweight
//! [`Element`] tree.

mod dependency;
mod element;
mod implementation;
mod machine;

pub use dependency::{Dependency, Importance, Restriction, VersionRestriction};
pub use element::Element;
pub use implementation::{Command, ImplKind, Implementation, SourceRef};
pub use machine::{machine_group, machine_ranks, os_ranks, MACHINE_GROUP_64, MACHINE_GROUP_DEFAULT, SOURCE_MACHINE};

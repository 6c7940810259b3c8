//! Version handling for feed implementations.
//!
//! Implementation versions are dotted integer sequences with optional
//! `pre`/`rc`/`post` modifier segments (`1.2`, `1.2-pre3`, `0.48-post`).
//! Restrictions on acceptable versions are written as constraint
//! expressions (`>=2.0`, `1.2..!2.0`, `!1.5`) OR-joined with `|`.

mod expr;
mod version;

pub use expr::{Op, VersionExpr};
pub use version::{Version, VersionError};

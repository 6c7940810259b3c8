//! The implementation provider consulted during problem construction.

use std::fmt;
use std::rc::Rc;

use crate::model::{Dependency, Implementation};

/// Why a candidate was filtered out before reaching the solver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    UnsupportedOs(String),
    UnsupportedMachine(String),
    /// Source wanted but the candidate is a binary (or vice versa).
    WrongForm,
    UnsupportedLanguage(String),
    /// Failed an extra restriction from the requirements.
    ExtraRestriction(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::UnsupportedOs(os) => write!(f, "unsupported OS {}", os),
            RejectReason::UnsupportedMachine(machine) => {
                write!(f, "unsupported machine {}", machine)
            }
            RejectReason::WrongForm => write!(f, "wrong form (source vs binary)"),
            RejectReason::UnsupportedLanguage(lang) => write!(f, "unsupported language {}", lang),
            RejectReason::ExtraRestriction(expr) => {
                write!(f, "does not match the requested version ({})", expr)
            }
        }
    }
}

/// Usable candidates for one interface, in the provider's preference order,
/// plus the candidates it filtered out and why.
#[derive(Debug, Default)]
pub struct CandidateList {
    /// Target of a `<replaced-by>` declaration on the interface, if any.
    pub replacement: Option<String>,
    pub impls: Vec<Rc<Implementation>>,
    pub rejects: Vec<(Rc<Implementation>, RejectReason)>,
}

/// Supplies candidate implementations per interface. Consulted read-only,
/// synchronously, during problem construction.
pub trait ImplementationProvider {
    fn get_implementations(&self, iface: &str) -> CandidateList;

    /// Whether a dependency applies in the current scope (`use` flag and
    /// OS-specific dependencies).
    fn is_dep_needed(&self, dep: &Dependency) -> bool;
}

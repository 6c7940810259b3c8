use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use feedsel_version::VersionExpr;

use super::element::Element;
use super::implementation::Implementation;

/// How strongly a dependency binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    /// The dependency must be satisfied for the user to be selectable.
    Essential,
    /// Satisfied if possible; the target interface may stay unused.
    Recommended,
    /// Only constrains versions of the target; never requires selection.
    Restricts,
}

impl Default for Importance {
    fn default() -> Self {
        Importance::Essential
    }
}

/// A predicate narrowing the acceptable implementations of a dependency's
/// target interface.
pub trait Restriction: fmt::Display {
    fn meets_restriction(&self, candidate: &Implementation) -> bool;
}

/// Restriction on the candidate's version.
#[derive(Debug)]
pub struct VersionRestriction {
    expr: VersionExpr,
}

impl VersionRestriction {
    pub fn new(expr: VersionExpr) -> Self {
        VersionRestriction { expr }
    }
}

impl Restriction for VersionRestriction {
    fn meets_restriction(&self, candidate: &Implementation) -> bool {
        self.expr.accepts(&candidate.version)
    }
}

impl fmt::Display for VersionRestriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "version {}", self.expr)
    }
}

/// A directed link from an implementation or command to a target interface.
pub struct Dependency {
    pub iface: String,
    pub importance: Importance,
    pub restrictions: Vec<Rc<dyn Restriction>>,
    /// Commands the target must provide.
    pub required_commands: Vec<String>,
    /// Only applies when selecting for this OS.
    pub os: Option<String>,
    /// Only applies when the scope enables this use flag.
    pub use_flag: Option<String>,
    /// The originating node, copied into the selections document.
    pub element: Element,
}

impl Dependency {
    pub fn new(iface: impl Into<String>, importance: Importance) -> Self {
        let iface = iface.into();
        let element_name = match importance {
            Importance::Restricts => "restricts",
            _ => "requires",
        };
        let element = Element::new(element_name).with_attr("interface", iface.clone());
        Dependency {
            iface,
            importance,
            restrictions: Vec::new(),
            required_commands: Vec::new(),
            os: None,
            use_flag: None,
            element,
        }
    }

    /// Whether `candidate` passes every restriction. The diagnostic dummy
    /// passes unconditionally.
    pub fn accepts(&self, candidate: &Implementation) -> bool {
        candidate.is_dummy()
            || self
                .restrictions
                .iter()
                .all(|r| r.meets_restriction(candidate))
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("iface", &self.iface)
            .field("importance", &self.importance)
            .field("restrictions", &self.restrictions.len())
            .field("required_commands", &self.required_commands)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsel_version::Version;

    #[test]
    fn test_version_restriction() {
        let expr = VersionExpr::parse(">=2").unwrap();
        let restriction = VersionRestriction::new(expr);

        let old = Implementation::simple("b1", Version::parse("1").unwrap());
        let new = Implementation::simple("b2", Version::parse("2").unwrap());
        assert!(!restriction.meets_restriction(&old));
        assert!(restriction.meets_restriction(&new));
    }

    #[test]
    fn test_dummy_passes_restrictions() {
        let mut dep = Dependency::new("http://example.com/b", Importance::Essential);
        dep.restrictions.push(Rc::new(VersionRestriction::new(
            VersionExpr::parse(">=99").unwrap(),
        )));

        let dummy = Implementation::dummy();
        assert!(dep.accepts(&dummy));

        let real = Implementation::simple("b1", Version::parse("1").unwrap());
        assert!(!dep.accepts(&real));
    }
}

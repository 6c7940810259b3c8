//! What the user asked to run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A root requirement plus the options that shape the candidate scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    /// Interface URI to solve for.
    pub interface: String,

    /// Command to run, if any (`ReqCommand` vs `ReqIface` root).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Target OS tag, defaulting to the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,

    /// Target CPU tag, defaulting to the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine: Option<String>,

    /// Select source implementations instead of binaries.
    #[serde(default)]
    pub source: bool,

    /// Whether compiling a binary from source is acceptable.
    #[serde(default)]
    pub may_compile: bool,

    /// Extra version restrictions, interface URI → constraint expression.
    #[serde(default)]
    pub extra_restrictions: BTreeMap<String, String>,

    /// Preferred languages, best first.
    #[serde(default)]
    pub languages: Vec<String>,
}

impl Requirements {
    pub fn new(interface: impl Into<String>) -> Self {
        Requirements {
            interface: interface.into(),
            command: None,
            os: None,
            machine: None,
            source: false,
            may_compile: false,
            extra_restrictions: BTreeMap::new(),
            languages: Vec::new(),
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_restriction(
        mut self,
        iface: impl Into<String>,
        expr: impl Into<String>,
    ) -> Self {
        self.extra_restrictions.insert(iface.into(), expr.into());
        self
    }

    pub fn with_source(mut self, source: bool) -> Self {
        self.source = source;
        self
    }
}

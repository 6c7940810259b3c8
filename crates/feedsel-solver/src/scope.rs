//! The derived view of [`Requirements`] the provider consults.

use std::collections::BTreeMap;

use anyhow::{Context, Result};

use feedsel_version::VersionExpr;

use crate::model::{machine_ranks, os_ranks};
use crate::requirements::Requirements;

/// Scope filter: which candidates are even considered, and in what
/// platform order.
#[derive(Debug, Clone)]
pub struct ScopeFilter {
    /// Acceptable OS tags, best first. Implementations with no OS tag are
    /// always acceptable.
    pub os_ranks: Vec<String>,
    /// Acceptable machine tags, best first.
    pub machine_ranks: Vec<String>,
    /// Preferred languages, best first (empty = no preference).
    pub languages: Vec<String>,
    /// Select source implementations instead of binaries.
    pub source: bool,
    /// Offer compiled-from-source candidates as a fallback.
    pub may_compile: bool,
    /// Parsed extra version restrictions per interface.
    pub extra_restrictions: BTreeMap<String, VersionExpr>,
    /// Active `use` flag (`testing` when solving for the `test` command).
    pub use_flag: Option<String>,
}

impl ScopeFilter {
    /// Build the scope for `requirements`, defaulting OS and CPU to the
    /// host platform.
    pub fn for_requirements(requirements: &Requirements) -> Result<ScopeFilter> {
        let os = requirements.os.clone().unwrap_or_else(host_os);
        let machine = requirements.machine.clone().unwrap_or_else(host_machine);

        let mut extra_restrictions = BTreeMap::new();
        for (iface, expr) in &requirements.extra_restrictions {
            let parsed = VersionExpr::parse(expr)
                .with_context(|| format!("invalid restriction for {}", iface))?;
            extra_restrictions.insert(iface.clone(), parsed);
        }

        let use_flag = match requirements.command.as_deref() {
            Some("test") => Some("testing".to_string()),
            _ => None,
        };

        Ok(ScopeFilter {
            os_ranks: os_ranks(&os),
            machine_ranks: machine_ranks(&machine),
            languages: requirements.languages.clone(),
            source: requirements.source,
            may_compile: requirements.may_compile,
            extra_restrictions,
            use_flag,
        })
    }

    pub fn os_ok(&self, os: Option<&str>) -> bool {
        match os {
            None | Some("*") => true,
            Some(os) => self.os_ranks.iter().any(|o| o == os),
        }
    }

    pub fn machine_ok(&self, machine: Option<&str>) -> bool {
        match machine {
            None | Some("*") => true,
            Some(machine) => self.machine_ranks.iter().any(|m| m == machine),
        }
    }

    /// Rank of a machine tag in preference order (untagged ranks last).
    pub fn machine_rank(&self, machine: Option<&str>) -> usize {
        match machine {
            None | Some("*") => self.machine_ranks.len(),
            Some(machine) => self
                .machine_ranks
                .iter()
                .position(|m| m == machine)
                .unwrap_or(self.machine_ranks.len()),
        }
    }
}

/// Host OS as a feed tag.
pub fn host_os() -> String {
    let os = match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        "freebsd" => "FreeBSD",
        other => other,
    };
    os.to_string()
}

/// Host CPU as a feed tag.
pub fn host_machine() -> String {
    let machine = match std::env::consts::ARCH {
        "x86" => "i686",
        "arm" => "armv7l",
        other => other,
    };
    machine.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reqs_with(os: &str, machine: &str) -> Requirements {
        let mut reqs = Requirements::new("http://example.com/app");
        reqs.os = Some(os.to_string());
        reqs.machine = Some(machine.to_string());
        reqs
    }

    #[test]
    fn test_scope_platform_filter() {
        let scope = ScopeFilter::for_requirements(&reqs_with("Linux", "x86_64")).unwrap();
        assert!(scope.os_ok(None));
        assert!(scope.os_ok(Some("Linux")));
        assert!(scope.os_ok(Some("POSIX")));
        assert!(!scope.os_ok(Some("Windows")));
        assert!(scope.machine_ok(Some("x86_64")));
        assert!(scope.machine_ok(Some("i686")));
        assert!(!scope.machine_ok(Some("aarch64")));
    }

    #[test]
    fn test_machine_rank_prefers_native() {
        let scope = ScopeFilter::for_requirements(&reqs_with("Linux", "x86_64")).unwrap();
        assert!(scope.machine_rank(Some("x86_64")) < scope.machine_rank(Some("i686")));
        assert!(scope.machine_rank(Some("i686")) < scope.machine_rank(None));
    }

    #[test]
    fn test_testing_use_flag() {
        let reqs = Requirements::new("http://example.com/app").with_command("test");
        let scope = ScopeFilter::for_requirements(&reqs).unwrap();
        assert_eq!(scope.use_flag.as_deref(), Some("testing"));

        let reqs = Requirements::new("http://example.com/app").with_command("run");
        let scope = ScopeFilter::for_requirements(&reqs).unwrap();
        assert!(scope.use_flag.is_none());
    }

    #[test]
    fn test_invalid_restriction_is_an_error() {
        let reqs = Requirements::new("http://example.com/app")
            .with_restriction("http://example.com/lib", "not a version");
        assert!(ScopeFilter::for_requirements(&reqs).is_err());
    }
}

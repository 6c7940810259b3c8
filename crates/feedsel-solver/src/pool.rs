//! In-memory catalogue of candidate implementations.
//!
//! [`Catalog`] is the serde-friendly description of a set of feeds (used by
//! the CLI and the test suite); [`FeedPool`] turns one into an
//! [`ImplementationProvider`]: it filters candidates against the scope
//! (platform, source preference, languages, extra restrictions), records a
//! reject reason for everything it drops, and ranks what remains by
//! stability, version and machine preference.

use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use feedsel_version::{Version, VersionExpr};

use crate::model::{
    Command, Dependency, Element, ImplKind, Implementation, Importance, SourceRef,
    VersionRestriction,
};
use crate::provider::{CandidateList, ImplementationProvider, RejectReason};
use crate::scope::ScopeFilter;

/// A whole catalogue: interface URI → feed description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub interfaces: BTreeMap<String, FeedSpec>,
}

/// One interface's feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedSpec {
    /// Target of a `<replaced-by>` declaration, if any.
    #[serde(default, rename = "replaced-by", skip_serializing_if = "Option::is_none")]
    pub replaced_by: Option<String>,
    #[serde(default)]
    pub implementations: Vec<ImplSpec>,
}

/// One implementation in a feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImplSpec {
    pub id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub langs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stability: Option<String>,
    /// Extra attributes copied onto the selection (main, self-test,
    /// from-feed, local-path, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub digests: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<DepSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<Element>,
    /// Present when this candidate must be compiled first: the companion
    /// source implementation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Box<ImplSpec>>,
}

/// One dependency of an implementation or command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepSpec {
    pub interface: String,
    #[serde(default)]
    pub importance: Importance,
    /// Version constraint expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Commands the target must provide.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_flag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
}

/// One command of an implementation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<DepSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<Element>,
}

impl DepSpec {
    fn build(&self) -> Result<Rc<Dependency>> {
        let mut dep = Dependency::new(&self.interface, self.importance);

        if self.importance == Importance::Recommended {
            dep.element.set_attr("importance", "recommended");
        }
        if let Some(expr) = &self.version {
            let parsed = VersionExpr::parse(expr)
                .with_context(|| format!("invalid version restriction on {}", self.interface))?;
            dep.element.set_attr("version", expr.clone());
            dep.restrictions.push(Rc::new(VersionRestriction::new(parsed)));
        }
        for name in &self.commands {
            dep.required_commands.push(name.clone());
            dep.element
                .children
                .push(Element::new("command").with_attr("name", name.clone()));
        }
        if let Some(os) = &self.os {
            dep.os = Some(os.clone());
            dep.element.set_attr("os", os.clone());
        }
        if let Some(use_flag) = &self.use_flag {
            dep.use_flag = Some(use_flag.clone());
            dep.element.set_attr("use", use_flag.clone());
        }

        Ok(Rc::new(dep))
    }
}

impl CommandSpec {
    fn build(&self) -> Result<Rc<Command>> {
        let mut command = Command::new(&self.name);
        if let Some(path) = &self.path {
            command.element.set_attr("path", path.clone());
        }
        for spec in &self.requires {
            let dep = spec.build()?;
            command.element.children.push(dep.element.clone());
            command.requires.push(dep);
        }
        for binding in &self.bindings {
            command.element.children.push(binding.clone());
            command.bindings.push(binding.clone());
        }
        Ok(Rc::new(command))
    }
}

impl ImplSpec {
    fn build(&self) -> Result<Rc<Implementation>> {
        let version = Version::parse(&self.version)
            .with_context(|| format!("implementation {}", self.id))?;
        let mut imp = Implementation::new(&self.id, version);

        imp.os = self.os.clone();
        imp.machine = self.machine.clone();
        imp.langs = self.langs.clone();
        if let Some(stability) = &self.stability {
            imp.attrs.insert("stability".to_string(), stability.clone());
        }
        for (key, value) in &self.attrs {
            imp.attrs.insert(key.clone(), value.clone());
        }
        if !self.digests.is_empty() {
            let mut digest = Element::new("manifest-digest");
            for (algo, value) in &self.digests {
                digest.set_attr(algo.clone(), value.clone());
            }
            imp.manifest_digest = Some(digest);
        }
        for spec in &self.requires {
            imp.requires.push(spec.build()?);
        }
        for spec in &self.commands {
            imp.commands.insert(spec.name.clone(), spec.build()?);
        }
        imp.bindings = self.bindings.clone();

        if let Some(source_spec) = &self.source {
            let source = source_spec.build()?;
            imp.kind = ImplKind::RequiresCompilation(SourceRef::lazy(move || source));
        }

        Ok(Rc::new(imp))
    }
}

struct Feed {
    replaced_by: Option<String>,
    impls: Vec<Rc<Implementation>>,
}

/// Concrete provider over a [`Catalog`], filtered by a [`ScopeFilter`].
pub struct FeedPool {
    scope: ScopeFilter,
    feeds: IndexMap<String, Feed>,
}

impl FeedPool {
    pub fn new(catalog: &Catalog, scope: ScopeFilter) -> Result<FeedPool> {
        let mut feeds = IndexMap::new();
        for (iface, spec) in &catalog.interfaces {
            let mut impls = Vec::with_capacity(spec.implementations.len());
            for impl_spec in &spec.implementations {
                let built = impl_spec
                    .build()
                    .with_context(|| format!("in feed {}", iface))?;
                impls.push(built);
            }
            feeds.insert(
                iface.clone(),
                Feed {
                    replaced_by: spec.replaced_by.clone(),
                    impls,
                },
            );
        }
        Ok(FeedPool { scope, feeds })
    }

    pub fn scope(&self) -> &ScopeFilter {
        &self.scope
    }

    fn consider(&self, iface: &str, imp: &Implementation) -> Result<(), RejectReason> {
        if self.scope.source {
            if !imp.is_source() {
                return Err(RejectReason::WrongForm);
            }
        } else {
            if imp.is_source() {
                return Err(RejectReason::WrongForm);
            }
            if matches!(imp.kind, ImplKind::RequiresCompilation(_)) && !self.scope.may_compile {
                return Err(RejectReason::WrongForm);
            }
        }

        if !self.scope.os_ok(imp.os.as_deref()) {
            return Err(RejectReason::UnsupportedOs(
                imp.os.clone().unwrap_or_default(),
            ));
        }
        if !imp.is_source() && !self.scope.machine_ok(imp.machine.as_deref()) {
            return Err(RejectReason::UnsupportedMachine(
                imp.machine.clone().unwrap_or_default(),
            ));
        }

        if !imp.langs.is_empty() && !self.scope.languages.is_empty() {
            let supported = imp
                .langs
                .iter()
                .any(|lang| self.scope.languages.contains(lang));
            if !supported {
                return Err(RejectReason::UnsupportedLanguage(imp.langs[0].clone()));
            }
        }

        if let Some(expr) = self.scope.extra_restrictions.get(iface) {
            if !expr.accepts(&imp.version) {
                return Err(RejectReason::ExtraRestriction(expr.to_string()));
            }
        }

        Ok(())
    }

    fn stability_rank(imp: &Implementation) -> u8 {
        match imp.attrs.get("stability").map(String::as_str) {
            Some("developer") => 2,
            Some("testing") => 1,
            _ => 0,
        }
    }

    fn compile_rank(imp: &Implementation) -> u8 {
        match imp.kind {
            ImplKind::Immediate => 0,
            ImplKind::RequiresCompilation(_) => 1,
        }
    }

    /// Preference order: stability, then version (descending), then native
    /// machine, then ready-to-run before compile-from-source. The sort is
    /// stable, so equal candidates keep their feed order.
    fn rank(&self, impls: &mut [Rc<Implementation>]) {
        impls.sort_by(|a, b| {
            Self::stability_rank(a)
                .cmp(&Self::stability_rank(b))
                .then_with(|| b.version.cmp(&a.version))
                .then_with(|| {
                    self.scope
                        .machine_rank(a.machine.as_deref())
                        .cmp(&self.scope.machine_rank(b.machine.as_deref()))
                })
                .then_with(|| Self::compile_rank(a).cmp(&Self::compile_rank(b)))
        });
    }
}

impl ImplementationProvider for FeedPool {
    fn get_implementations(&self, iface: &str) -> CandidateList {
        let Some(feed) = self.feeds.get(iface) else {
            return CandidateList::default();
        };

        let mut impls = Vec::new();
        let mut rejects = Vec::new();
        for imp in &feed.impls {
            match self.consider(iface, imp) {
                Ok(()) => impls.push(imp.clone()),
                Err(reason) => rejects.push((imp.clone(), reason)),
            }
        }
        self.rank(&mut impls);

        CandidateList {
            replacement: feed.replaced_by.clone(),
            impls,
            rejects,
        }
    }

    fn is_dep_needed(&self, dep: &Dependency) -> bool {
        if let Some(os) = &dep.os {
            if !self.scope.os_ok(Some(os)) {
                return false;
            }
        }
        match &dep.use_flag {
            None => true,
            Some(flag) => self.scope.use_flag.as_deref() == Some(flag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirements::Requirements;

    fn scope_for(os: &str, machine: &str) -> ScopeFilter {
        let mut reqs = Requirements::new("http://example.com/app");
        reqs.os = Some(os.to_string());
        reqs.machine = Some(machine.to_string());
        ScopeFilter::for_requirements(&reqs).unwrap()
    }

    fn catalog_json(json: &str) -> Catalog {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_pool_orders_by_version_descending() {
        let catalog = catalog_json(
            r#"{"interfaces": {"http://example.com/b": {"implementations": [
                {"id": "b1", "version": "1"},
                {"id": "b3", "version": "3"},
                {"id": "b2", "version": "2"}
            ]}}}"#,
        );
        let pool = FeedPool::new(&catalog, scope_for("Linux", "x86_64")).unwrap();
        let list = pool.get_implementations("http://example.com/b");
        let ids: Vec<_> = list.impls.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["b3", "b2", "b1"]);
        assert!(list.rejects.is_empty());
    }

    #[test]
    fn test_pool_prefers_stable() {
        let catalog = catalog_json(
            r#"{"interfaces": {"http://example.com/b": {"implementations": [
                {"id": "b2", "version": "2", "stability": "testing"},
                {"id": "b1", "version": "1", "stability": "stable"}
            ]}}}"#,
        );
        let pool = FeedPool::new(&catalog, scope_for("Linux", "x86_64")).unwrap();
        let list = pool.get_implementations("http://example.com/b");
        let ids: Vec<_> = list.impls.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["b1", "b2"]);
    }

    #[test]
    fn test_pool_rejects_wrong_platform() {
        let catalog = catalog_json(
            r#"{"interfaces": {"http://example.com/b": {"implementations": [
                {"id": "linux64", "version": "1", "os": "Linux", "machine": "x86_64"},
                {"id": "windows", "version": "1", "os": "Windows"},
                {"id": "arm", "version": "1", "machine": "aarch64"}
            ]}}}"#,
        );
        let pool = FeedPool::new(&catalog, scope_for("Linux", "x86_64")).unwrap();
        let list = pool.get_implementations("http://example.com/b");
        assert_eq!(list.impls.len(), 1);
        assert_eq!(list.impls[0].id, "linux64");
        assert_eq!(list.rejects.len(), 2);
        assert!(list
            .rejects
            .iter()
            .any(|(_, r)| matches!(r, RejectReason::UnsupportedOs(_))));
        assert!(list
            .rejects
            .iter()
            .any(|(_, r)| matches!(r, RejectReason::UnsupportedMachine(_))));
    }

    #[test]
    fn test_pool_source_preference() {
        let catalog = catalog_json(
            r#"{"interfaces": {"http://example.com/b": {"implementations": [
                {"id": "bin", "version": "1", "machine": "x86_64"},
                {"id": "src", "version": "1", "machine": "src"}
            ]}}}"#,
        );

        let pool = FeedPool::new(&catalog, scope_for("Linux", "x86_64")).unwrap();
        let list = pool.get_implementations("http://example.com/b");
        assert_eq!(list.impls.len(), 1);
        assert_eq!(list.impls[0].id, "bin");

        let mut reqs = Requirements::new("http://example.com/app").with_source(true);
        reqs.os = Some("Linux".to_string());
        reqs.machine = Some("x86_64".to_string());
        let scope = ScopeFilter::for_requirements(&reqs).unwrap();
        let pool = FeedPool::new(&catalog, scope).unwrap();
        let list = pool.get_implementations("http://example.com/b");
        assert_eq!(list.impls.len(), 1);
        assert_eq!(list.impls[0].id, "src");
    }

    #[test]
    fn test_pool_extra_restrictions() {
        let catalog = catalog_json(
            r#"{"interfaces": {"http://example.com/b": {"implementations": [
                {"id": "b1", "version": "1"},
                {"id": "b2", "version": "2"}
            ]}}}"#,
        );
        let mut reqs = Requirements::new("http://example.com/app")
            .with_restriction("http://example.com/b", ">=2");
        reqs.os = Some("Linux".to_string());
        reqs.machine = Some("x86_64".to_string());
        let scope = ScopeFilter::for_requirements(&reqs).unwrap();
        let pool = FeedPool::new(&catalog, scope).unwrap();

        let list = pool.get_implementations("http://example.com/b");
        assert_eq!(list.impls.len(), 1);
        assert_eq!(list.impls[0].id, "b2");
        assert!(matches!(
            list.rejects[0].1,
            RejectReason::ExtraRestriction(_)
        ));
    }

    #[test]
    fn test_pool_unknown_interface_is_empty() {
        let catalog = Catalog::default();
        let pool = FeedPool::new(&catalog, scope_for("Linux", "x86_64")).unwrap();
        let list = pool.get_implementations("http://example.com/missing");
        assert!(list.impls.is_empty());
        assert!(list.replacement.is_none());
    }

    #[test]
    fn test_is_dep_needed_use_flag() {
        let catalog = Catalog::default();
        let pool = FeedPool::new(&catalog, scope_for("Linux", "x86_64")).unwrap();

        let plain = Dependency::new("http://example.com/b", Importance::Essential);
        assert!(pool.is_dep_needed(&plain));

        let mut testing = Dependency::new("http://example.com/b", Importance::Essential);
        testing.use_flag = Some("testing".to_string());
        assert!(!pool.is_dep_needed(&testing));

        let mut windows_only = Dependency::new("http://example.com/b", Importance::Essential);
        windows_only.os = Some("Windows".to_string());
        assert!(!pool.is_dep_needed(&windows_only));
    }

    #[test]
    fn test_compiled_candidates_need_may_compile() {
        let catalog = catalog_json(
            r#"{"interfaces": {"http://example.com/a": {"implementations": [
                {"id": "a-src", "version": "1",
                 "commands": [{"name": "run"}],
                 "source": {"id": "a-src", "version": "1", "machine": "src",
                            "commands": [{"name": "compile"}]}}
            ]}}}"#,
        );

        let pool = FeedPool::new(&catalog, scope_for("Linux", "x86_64")).unwrap();
        assert!(pool.get_implementations("http://example.com/a").impls.is_empty());

        let mut reqs = Requirements::new("http://example.com/app");
        reqs.os = Some("Linux".to_string());
        reqs.machine = Some("x86_64".to_string());
        reqs.may_compile = true;
        let scope = ScopeFilter::for_requirements(&reqs).unwrap();
        let pool = FeedPool::new(&catalog, scope).unwrap();
        let list = pool.get_implementations("http://example.com/a");
        assert_eq!(list.impls.len(), 1);
        assert!(matches!(
            list.impls[0].kind,
            ImplKind::RequiresCompilation(_)
        ));
    }
}

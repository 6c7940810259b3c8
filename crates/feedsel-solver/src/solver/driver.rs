//! The two-pass driver: solve normally, and on failure re-solve in
//! closest-match mode so the failure can be explained.

use std::path::Path;
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::model::Implementation;
use crate::provider::ImplementationProvider;
use crate::requirements::Requirements;
use crate::sat::{Literal, ReasonTree};
use crate::scope::ScopeFilter;

use super::builder::{Problem, ProblemBuilder, Req};
use super::cache::Snapshot;
use super::candidates::{CommandCandidates, ImplCandidates, Sat};
use super::decider::Decider;
use super::selections::{assemble, Selections};

/// A satisfying assignment together with everything needed to inspect it.
pub struct Solution {
    provider: Rc<dyn ImplementationProvider>,
    sat: Sat,
    impls: Snapshot<String, Rc<ImplCandidates>>,
    commands: Snapshot<(String, String), Rc<CommandCandidates>>,
    root: Req,
}

impl std::fmt::Debug for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solution").finish_non_exhaustive()
    }
}

impl Solution {
    /// Assemble the selections document.
    pub fn selections(&self) -> Selections {
        assemble(
            &self.sat,
            &self.impls,
            &self.commands,
            self.provider.as_ref(),
            &self.root,
        )
    }

    /// The selected implementation for `iface`. Never returns the
    /// diagnostic dummy.
    pub fn get_selected(&self, iface: &str) -> Option<Rc<Implementation>> {
        let candidates = self.impls.get(&iface.to_string())?;
        let (_lit, imp) = candidates.selected(&self.sat)?;
        if imp.is_dummy() {
            None
        } else {
            Some(imp)
        }
    }

    /// Every interface in the problem with its selected candidate, if any.
    pub fn implementations(&self) -> Vec<(String, Option<(Literal, Rc<Implementation>)>)> {
        self.impls
            .bindings()
            .into_iter()
            .map(|(iface, candidates)| (iface.clone(), candidates.selected(&self.sat)))
            .collect()
    }

    /// All candidates considered for `iface`, in preference order.
    pub fn candidates(&self, iface: &str) -> Option<&Rc<ImplCandidates>> {
        self.impls.get(&iface.to_string())
    }

    pub fn impl_provider(&self) -> &dyn ImplementationProvider {
        self.provider.as_ref()
    }

    /// The root requirement this solution answers.
    pub fn root(&self) -> &Req {
        &self.root
    }

    /// Why is `lit` forced to its current value? Only meaningful after a
    /// closest-match solve.
    pub fn explain(&self, lit: Literal) -> ReasonTree {
        self.sat.explain_reason(lit)
    }
}

/// One solver pass. Returns `None` iff the problem is unsatisfiable.
pub fn do_solve(
    provider: Rc<dyn ImplementationProvider>,
    root: Req,
    closest_match: bool,
) -> Option<Solution> {
    let builder = ProblemBuilder::new(provider.as_ref(), closest_match);
    let Problem {
        mut sat,
        impls,
        commands,
        root,
    } = builder.build(root);

    let decider = Decider::new(&impls, &commands, provider.as_ref(), root.clone());
    let ok = sat.run_solver(|sat| decider.next(sat));
    if !ok {
        return None;
    }

    Some(Solution {
        provider,
        sat,
        impls,
        commands,
        root,
    })
}

/// Compute the scope filter and root requirement for `requirements`.
pub fn derive_root(requirements: &Requirements) -> Result<(ScopeFilter, Req)> {
    let mut scope = ScopeFilter::for_requirements(requirements)?;

    // Without the 32-bit loader, a 64-bit Linux host cannot run its
    // multi-arch fallbacks.
    if scope.os_ranks.first().map(String::as_str) == Some("Linux")
        && scope.machine_ranks.len() > 1
        && !Path::new("/lib/ld-linux.so.2").exists()
    {
        scope.machine_ranks.truncate(1);
    }

    let root = match &requirements.command {
        Some(name) => Req::Command {
            name: name.clone(),
            iface: requirements.interface.clone(),
        },
        None => Req::Iface(requirements.interface.clone()),
    };

    Ok((scope, root))
}

/// Solve for `requirements`: derive the scope, build the provider, run the
/// first pass, and on unsatisfiability re-run in closest-match mode. The
/// returned flag is `true` when the first pass succeeded.
pub fn solve_for<P, F>(requirements: &Requirements, make_provider: F) -> Result<(bool, Solution)>
where
    P: ImplementationProvider + 'static,
    F: FnOnce(ScopeFilter) -> Result<P>,
{
    let solve = move || -> Result<(bool, Solution)> {
        let (scope, root) = derive_root(requirements)?;
        let provider: Rc<dyn ImplementationProvider> = Rc::new(make_provider(scope)?);

        if let Some(solution) = do_solve(provider.clone(), root.clone(), false) {
            return Ok((true, solution));
        }

        debug!(root = %root, "no solution; retrying in closest-match mode");
        match do_solve(provider, root, true) {
            Some(solution) => Ok((false, solution)),
            // The dummy candidate satisfies every restriction and provides
            // every command, so this pass cannot fail.
            None => bail!("no solution found, even with closest match"),
        }
    };

    solve().with_context(|| format!("... solving for interface {}", requirements.interface))
}

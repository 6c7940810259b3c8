//! Branching heuristic: walk the partially-built solution depth-first and
//! pick the highest-ranked undecided candidate of the earliest unresolved
//! requirement.

use std::collections::HashSet;
use std::rc::Rc;

use crate::model::Importance;
use crate::provider::ImplementationProvider;
use crate::sat::Literal;

use super::builder::Req;
use super::cache::Snapshot;
use super::candidates::{CommandCandidates, DecisionState, ImplCandidates, Sat};

pub struct Decider<'a> {
    impls: &'a Snapshot<String, Rc<ImplCandidates>>,
    commands: &'a Snapshot<(String, String), Rc<CommandCandidates>>,
    provider: &'a dyn ImplementationProvider,
    root: Req,
}

impl<'a> Decider<'a> {
    pub fn new(
        impls: &'a Snapshot<String, Rc<ImplCandidates>>,
        commands: &'a Snapshot<(String, String), Rc<CommandCandidates>>,
        provider: &'a dyn ImplementationProvider,
        root: Req,
    ) -> Self {
        Decider {
            impls,
            commands,
            provider,
            root,
        }
    }

    /// Next decision literal, or `None` when every live obligation is
    /// decided.
    pub fn next(&self, sat: &Sat) -> Option<Literal> {
        let mut seen = HashSet::new();
        self.find_undecided(sat, &mut seen, &self.root)
    }

    fn find_undecided(
        &self,
        sat: &Sat,
        seen: &mut HashSet<Req>,
        req: &Req,
    ) -> Option<Literal> {
        if !seen.insert(req.clone()) {
            return None;
        }

        let state = match req {
            Req::Iface(iface) => self.impls.get_exn(iface).state(sat),
            Req::Command { name, iface } => self
                .commands
                .get_exn(&(name.clone(), iface.clone()))
                .state(sat),
        };

        match state {
            DecisionState::Unselected => None,
            DecisionState::Undecided(lit) => Some(lit),
            DecisionState::Selected(deps) => {
                for dep in deps {
                    if dep.importance == Importance::Restricts {
                        continue;
                    }
                    if !self.provider.is_dep_needed(&dep) {
                        continue;
                    }
                    if let Some(lit) =
                        self.find_undecided(sat, seen, &Req::Iface(dep.iface.clone()))
                    {
                        return Some(lit);
                    }
                    for name in &dep.required_commands {
                        let command_req = Req::Command {
                            name: name.clone(),
                            iface: dep.iface.clone(),
                        };
                        if let Some(lit) = self.find_undecided(sat, seen, &command_req) {
                            return Some(lit);
                        }
                    }
                }
                // A selected command still needs its implementation's own
                // dependencies resolved.
                if let Req::Command { iface, .. } = req {
                    return self.find_undecided(sat, seen, &Req::Iface(iface.clone()));
                }
                None
            }
        }
    }
}

//! Problem construction: walks the requirement graph reachable from the
//! root, populating the candidate caches and emitting clauses.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::model::{
    machine_group, Command, Dependency, Element, ImplKind, Implementation, Importance,
    MACHINE_GROUP_64, MACHINE_GROUP_DEFAULT,
};
use crate::provider::ImplementationProvider;
use crate::sat::{neg, Literal};

use super::cache::{CandidateCache, Snapshot};
use super::candidates::{CommandCandidates, ImplCandidates, Sat, VarLabel};

/// A requirement on the solution: an interface, or a named command of an
/// interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Req {
    Iface(String),
    Command { name: String, iface: String },
}

impl Req {
    pub fn iface(&self) -> &str {
        match self {
            Req::Iface(iface) => iface,
            Req::Command { iface, .. } => iface,
        }
    }

    pub fn command(&self) -> Option<&str> {
        match self {
            Req::Iface(_) => None,
            Req::Command { name, .. } => Some(name),
        }
    }
}

impl std::fmt::Display for Req {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Req::Iface(iface) => write!(f, "{}", iface),
            Req::Command { name, iface } => write!(f, "command {} of {}", name, iface),
        }
    }
}

/// The constructed boolean problem, with both caches frozen.
pub struct Problem {
    pub sat: Sat,
    pub impls: Snapshot<String, Rc<ImplCandidates>>,
    pub commands: Snapshot<(String, String), Rc<CommandCandidates>>,
    pub root: Req,
}

/// Deferred per-candidate work: run after the candidate set is cached so
/// that dependency cycles terminate.
struct Followup {
    user_var: Literal,
    machine: Option<String>,
    bindings: Vec<Element>,
    deps: Vec<Rc<Dependency>>,
}

pub struct ProblemBuilder<'a> {
    provider: &'a dyn ImplementationProvider,
    sat: Sat,
    impl_cache: CandidateCache<String, Rc<ImplCandidates>>,
    command_cache: CandidateCache<(String, String), Rc<CommandCandidates>>,
    /// `Interface(iface)` helper variables for optional dependencies.
    iface_flags: HashMap<String, Literal>,
    machine_group_default: Literal,
    machine_group_64: Literal,
    /// Deferred `<replaced-by>` conflicts: (interface, replacement).
    replacements: Vec<(String, String)>,
    closest_match: bool,
}

impl<'a> ProblemBuilder<'a> {
    pub fn new(provider: &'a dyn ImplementationProvider, closest_match: bool) -> Self {
        let mut sat = Sat::new();
        let machine_group_default = sat.add_variable(VarLabel::MachineGroup(MACHINE_GROUP_DEFAULT));
        let machine_group_64 = sat.add_variable(VarLabel::MachineGroup(MACHINE_GROUP_64));
        // 64-bit and default-group implementations cannot be mixed.
        sat.at_most_one(vec![machine_group_default, machine_group_64]);

        ProblemBuilder {
            provider,
            sat,
            impl_cache: CandidateCache::new(),
            command_cache: CandidateCache::new(),
            iface_flags: HashMap::new(),
            machine_group_default,
            machine_group_64,
            replacements: Vec::new(),
            closest_match,
        }
    }

    pub fn build(mut self, root: Req) -> Problem {
        debug!(root = %root, closest_match = self.closest_match, "building problem");
        let root_lits = match &root {
            Req::Iface(iface) => self.lookup_iface(iface).lits(),
            Req::Command { name, iface } => self.lookup_command(name, iface).lits(),
        };
        self.sat.at_least_one(root_lits, "need root");
        self.resolve_replacements();

        Problem {
            sat: self.sat,
            impls: self.impl_cache.snapshot(),
            commands: self.command_cache.snapshot(),
            root,
        }
    }

    /// Candidates for `iface`, building them on first request.
    fn lookup_iface(&mut self, iface: &str) -> Rc<ImplCandidates> {
        if let Some(existing) = self.impl_cache.get(&iface.to_string()) {
            return existing;
        }

        let (candidates, followups) = self.make_impl_candidates(iface);
        let candidates = Rc::new(candidates);
        // Insert before walking dependencies: a cycle back to this
        // interface must find the entry rather than rebuild it.
        self.impl_cache.insert(iface.to_string(), candidates.clone());
        self.process_followups(iface, followups);
        candidates
    }

    /// Construct the candidate set and clauses for `iface`. Must not
    /// recurse into either cache; recursive work goes into the followups.
    fn make_impl_candidates(&mut self, iface: &str) -> (ImplCandidates, Vec<Followup>) {
        let list = self.provider.get_implementations(iface);
        let mut impls = list.impls;
        if self.closest_match {
            impls.push(Rc::new(Implementation::dummy()));
        }

        let entries: Vec<(Literal, Rc<Implementation>)> = impls
            .into_iter()
            .map(|imp| (self.sat.add_variable(VarLabel::Impl(imp.clone())), imp))
            .collect();

        let mut followups = Vec::new();
        let mut dropped = vec![false; entries.len()];

        // Source/binary coalescing: a candidate that is compiled from
        // source forces the source variant (when listed) and the source's
        // compile command.
        for i in 0..entries.len() {
            let (compiled_var, imp) = entries[i].clone();
            let ImplKind::RequiresCompilation(source) = &imp.kind else {
                continue;
            };

            if let Some(j) = entries
                .iter()
                .position(|(_, other)| other.id == imp.id && matches!(other.kind, ImplKind::Immediate))
            {
                dropped[j] = true;
                self.sat.implies(
                    compiled_var,
                    &[entries[j].0],
                    format!("{} is compiled from its source form", imp.id),
                );
            }

            let source = source.force();
            if let Some(compile) = source.commands.get("compile") {
                let compile_var = self.sat.add_variable(VarLabel::Command(compile.clone()));
                self.sat.implies(
                    compiled_var,
                    &[compile_var],
                    format!("compiling {} needs its compile command", imp.id),
                );
                followups.push(Followup {
                    user_var: compile_var,
                    machine: None,
                    bindings: compile.bindings.clone(),
                    deps: compile.requires.clone(),
                });
            }
        }

        let remaining: Vec<(Literal, Rc<Implementation>)> = entries
            .into_iter()
            .zip(dropped)
            .filter(|(_, dropped)| !dropped)
            .map(|(entry, _)| entry)
            .collect();

        let clause = if remaining.is_empty() {
            None
        } else {
            let lits: Vec<Literal> = remaining.iter().map(|(lit, _)| *lit).collect();
            Some(self.sat.at_most_one(lits))
        };

        match list.replacement {
            Some(replacement) if replacement == iface => {
                warn!(iface, "interface is replaced by itself; ignoring");
            }
            Some(replacement) => {
                self.replacements.push((iface.to_string(), replacement));
            }
            None => {}
        }

        for (var, imp) in &remaining {
            followups.push(Followup {
                user_var: *var,
                machine: if imp.is_source() { None } else { imp.machine.clone() },
                bindings: imp.bindings.clone(),
                deps: imp.requires.clone(),
            });
        }

        (ImplCandidates { clause, vars: remaining }, followups)
    }

    fn process_followups(&mut self, iface: &str, followups: Vec<Followup>) {
        for followup in followups {
            if let Some(group) = followup.machine.as_deref().and_then(machine_group) {
                let group_var = if group == MACHINE_GROUP_64 {
                    self.machine_group_64
                } else {
                    self.machine_group_default
                };
                self.sat.implies(
                    followup.user_var,
                    &[group_var],
                    format!("machine family {}", group),
                );
            }
            self.process_user(followup.user_var, iface, &followup.bindings, &followup.deps);
        }
    }

    /// Self-bindings and dependencies of one implementation or command.
    fn process_user(
        &mut self,
        user_var: Literal,
        iface: &str,
        bindings: &[Element],
        deps: &[Rc<Dependency>],
    ) {
        for binding in bindings {
            if let Some(command) = binding.attr("command") {
                let command = command.to_string();
                let candidates = self.lookup_command(&command, iface);
                let user = self.sat.user_data(user_var).to_string();
                self.sat.implies(
                    user_var,
                    &candidates.lits(),
                    format!("{} binds command {} of {}", user, command, iface),
                );
            }
        }
        for dep in deps {
            if !self.provider.is_dep_needed(dep) {
                continue;
            }
            self.process_dep(user_var, dep);
        }
    }

    fn process_dep(&mut self, user_var: Literal, dep: &Dependency) {
        let candidates = self.lookup_iface(&dep.iface);
        let user = self.sat.user_data(user_var).to_string();

        let mut pass = Vec::new();
        let mut fail = Vec::new();
        for (lit, imp) in &candidates.vars {
            if dep.accepts(imp) {
                pass.push(*lit);
            } else {
                fail.push(*lit);
            }
        }

        // A version-only dependency never requires commands or selection.
        if dep.importance != Importance::Restricts {
            for name in &dep.required_commands {
                let command_candidates = self.lookup_command(name, &dep.iface);
                let command_lits = command_candidates.lits();
                if dep.importance == Importance::Essential {
                    self.sat.implies(
                        user_var,
                        &command_lits,
                        format!("{} requires command {} of {}", user, name, dep.iface),
                    );
                } else {
                    let flag = self.iface_flag(&dep.iface);
                    // Selecting any acceptable candidate forces the flag...
                    let mut exclusive = vec![neg(flag)];
                    exclusive.extend_from_slice(&pass);
                    self.sat.at_most_one(exclusive);
                    // ...and a used interface must then provide the command.
                    let mut rhs = vec![neg(flag)];
                    rhs.extend_from_slice(&command_lits);
                    self.sat.implies(
                        user_var,
                        &rhs,
                        format!("{} wants command {} of {}", user, name, dep.iface),
                    );
                }
            }
        }

        match dep.importance {
            Importance::Essential => {
                self.sat.implies(
                    user_var,
                    &pass,
                    format!("{} requires {}", user, describe_dep(dep)),
                );
            }
            Importance::Recommended | Importance::Restricts => {
                // The user may not be combined with a failing candidate.
                if !fail.is_empty() {
                    let mut exclusive = vec![user_var];
                    exclusive.extend_from_slice(&fail);
                    self.sat.at_most_one(exclusive);
                }
            }
        }
    }

    /// Candidates for `(command, iface)`, building them on first request.
    fn lookup_command(&mut self, name: &str, iface: &str) -> Rc<CommandCandidates> {
        let key = (name.to_string(), iface.to_string());
        if let Some(existing) = self.command_cache.get(&key) {
            return existing;
        }

        let impl_candidates = self.lookup_iface(iface);
        // Building the interface entry may itself have required this
        // command (a dependency cycle); re-check before constructing.
        if let Some(existing) = self.command_cache.get(&key) {
            return existing;
        }

        let mut vars = Vec::new();
        let mut owners = Vec::new();
        for (impl_var, imp) in &impl_candidates.vars {
            if let Some(command) = imp.command(name) {
                let command_var = self.sat.add_variable(VarLabel::Command(command.clone()));
                vars.push((command_var, command));
                owners.push(*impl_var);
            }
        }

        let clause = if vars.is_empty() {
            None
        } else {
            let lits: Vec<Literal> = vars.iter().map(|(lit, _)| *lit).collect();
            Some(self.sat.at_most_one(lits))
        };

        let candidates = Rc::new(CommandCandidates { clause, vars });
        self.command_cache.insert(key, candidates.clone());

        // Continuation: tie each command to its implementation and walk the
        // command's own bindings and dependencies.
        let entries: Vec<(Literal, Rc<Command>)> = candidates.vars.clone();
        for ((command_var, command), impl_var) in entries.into_iter().zip(owners) {
            self.sat.implies(
                command_var,
                &[impl_var],
                format!("command {} needs its implementation", name),
            );
            self.process_user(command_var, iface, &command.bindings, &command.requires);
        }

        candidates
    }

    fn iface_flag(&mut self, iface: &str) -> Literal {
        if let Some(&flag) = self.iface_flags.get(iface) {
            return flag;
        }
        let flag = self.sat.add_variable(VarLabel::Interface(iface.to_string()));
        self.iface_flags.insert(iface.to_string(), flag);
        flag
    }

    /// Post-pass: an interface and its declared replacement may not both
    /// contribute a real selection.
    fn resolve_replacements(&mut self) {
        let replacements = std::mem::take(&mut self.replacements);
        for (iface, replacement) in replacements {
            // Only applies if the replacement was pulled into the problem.
            let Some(replacement_candidates) = self.impl_cache.get(&replacement) else {
                continue;
            };
            let original = self
                .impl_cache
                .get(&iface)
                .expect("interface with a recorded replacement was materialised");

            let real_vars = |candidates: &ImplCandidates| -> Vec<Literal> {
                candidates
                    .vars
                    .iter()
                    .filter(|(_, imp)| !imp.is_dummy())
                    .map(|(lit, _)| *lit)
                    .collect()
            };

            let original_vars = real_vars(&original);
            let replacement_vars = real_vars(&replacement_candidates);
            if original_vars.is_empty() || replacement_vars.is_empty() {
                continue;
            }

            debug!(iface = %iface, replacement = %replacement, "adding replacement conflict");
            let mut lits = original_vars;
            lits.extend(replacement_vars);
            self.sat.at_most_one(lits);
        }
    }
}

fn describe_dep(dep: &Dependency) -> String {
    if dep.restrictions.is_empty() {
        dep.iface.clone()
    } else {
        let restrictions: Vec<String> = dep.restrictions.iter().map(|r| r.to_string()).collect();
        format!("{} ({})", dep.iface, restrictions.join(", "))
    }
}

//! SAT variable labels and candidate sets.

use std::fmt;
use std::rc::Rc;

use crate::model::{Command, Dependency, ImplKind, Implementation};
use crate::sat::{AtMostOne, Literal, Solver};

/// The SAT engine instantiated with solver labels.
pub type Sat = Solver<VarLabel>;

/// Payload attached to every SAT variable.
#[derive(Debug, Clone)]
pub enum VarLabel {
    /// "This implementation is chosen."
    Impl(Rc<Implementation>),
    /// "This command record is chosen."
    Command(Rc<Command>),
    /// Auxiliary variable for CPU-family exclusion.
    MachineGroup(&'static str),
    /// "Some candidate for this interface is selected" (optional deps only).
    Interface(String),
}

impl fmt::Display for VarLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarLabel::Impl(imp) => write!(f, "impl {}", imp),
            VarLabel::Command(command) => write!(f, "command {}", command.name),
            VarLabel::MachineGroup(group) => write!(f, "machine group {}", group),
            VarLabel::Interface(iface) => write!(f, "use of {}", iface),
        }
    }
}

/// State of a candidate set under the current partial assignment.
pub enum DecisionState {
    /// No candidates, or every candidate is already falsified.
    Unselected,
    /// Best undecided candidate, in preference order.
    Undecided(Literal),
    /// A candidate is selected; walk these dependencies next.
    Selected(Vec<Rc<Dependency>>),
}

/// Candidates for one interface.
#[derive(Debug)]
pub struct ImplCandidates {
    pub clause: Option<AtMostOne>,
    pub vars: Vec<(Literal, Rc<Implementation>)>,
}

impl ImplCandidates {
    /// The implementation currently assigned true, if any.
    pub fn selected(&self, sat: &Sat) -> Option<(Literal, Rc<Implementation>)> {
        let lit = sat.get_selected(self.clause?)?;
        match sat.user_data(lit) {
            VarLabel::Impl(imp) => Some((lit, imp.clone())),
            other => panic!("implementation clause selected {}", other),
        }
    }

    pub fn state(&self, sat: &Sat) -> DecisionState {
        let Some(clause) = self.clause else {
            return DecisionState::Unselected;
        };
        if let Some(lit) = sat.get_selected(clause) {
            let VarLabel::Impl(imp) = sat.user_data(lit) else {
                panic!("implementation clause selected {}", sat.user_data(lit));
            };
            return DecisionState::Selected(walk_dependencies(imp));
        }
        match sat.get_best_undecided(clause) {
            Some(lit) => DecisionState::Undecided(lit),
            None => DecisionState::Unselected,
        }
    }
}

/// Dependencies to walk once `imp` is selected. A candidate that must be
/// compiled first also drags in the build dependencies of its source's
/// `compile` command.
fn walk_dependencies(imp: &Rc<Implementation>) -> Vec<Rc<Dependency>> {
    let mut deps = imp.requires.clone();
    if let ImplKind::RequiresCompilation(source) = &imp.kind {
        let source = source.force();
        if let Some(compile) = source.commands.get("compile") {
            deps.extend(compile.requires.iter().cloned());
        }
    }
    deps
}

/// Candidates for one (command name, interface) pair.
#[derive(Debug)]
pub struct CommandCandidates {
    pub clause: Option<AtMostOne>,
    pub vars: Vec<(Literal, Rc<Command>)>,
}

impl CommandCandidates {
    pub fn selected(&self, sat: &Sat) -> Option<(Literal, Rc<Command>)> {
        let lit = sat.get_selected(self.clause?)?;
        match sat.user_data(lit) {
            VarLabel::Command(command) => Some((lit, command.clone())),
            other => panic!("command clause selected {}", other),
        }
    }

    pub fn state(&self, sat: &Sat) -> DecisionState {
        let Some(clause) = self.clause else {
            return DecisionState::Unselected;
        };
        if let Some(lit) = sat.get_selected(clause) {
            let VarLabel::Command(command) = sat.user_data(lit) else {
                panic!("command clause selected {}", sat.user_data(lit));
            };
            return DecisionState::Selected(command.requires.clone());
        }
        match sat.get_best_undecided(clause) {
            Some(lit) => DecisionState::Undecided(lit),
            None => DecisionState::Unselected,
        }
    }

    pub fn lits(&self) -> Vec<Literal> {
        self.vars.iter().map(|(lit, _)| *lit).collect()
    }
}

impl ImplCandidates {
    pub fn lits(&self) -> Vec<Literal> {
        self.vars.iter().map(|(lit, _)| *lit).collect()
    }
}

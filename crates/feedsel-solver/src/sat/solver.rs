use std::fmt;

/// A literal is a signed variable index: positive means "variable is true",
/// negative means "variable is false". Variables are numbered from 1.
pub type Literal = i32;

/// Negate a literal.
pub fn neg(lit: Literal) -> Literal {
    -lit
}

fn var_of(lit: Literal) -> usize {
    debug_assert!(lit != 0);
    lit.unsigned_abs() as usize - 1
}

/// Index into the watch table for the event "`lit` became true".
fn watch_index(lit: Literal) -> usize {
    var_of(lit) * 2 + (lit < 0) as usize
}

type ClauseId = usize;

/// Handle to an at-most-one clause, used to query the selected and the best
/// undecided candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtMostOne(ClauseId);

#[derive(Debug, Clone, Copy)]
enum Reason {
    /// Assigned by the branching callback.
    Decision,
    /// The negation of a decision that led to a conflict.
    Flipped,
    /// Forced by a clause.
    Clause(ClauseId),
}

#[derive(Debug)]
enum Clause {
    /// At least one of `lits` must hold. Positions 0 and 1 are the watched
    /// literals.
    Union { lits: Vec<Literal>, reason: String },
    /// At most one of `lits` may hold. Watches every member.
    AtMostOne { lits: Vec<Literal> },
}

#[derive(Debug)]
struct VarData<T> {
    user: T,
    value: Option<bool>,
    reason: Option<Reason>,
}

/// DPLL solver with user-labelled variables.
///
/// All clauses are loaded before [`Solver::run_solver`] is called; clause
/// addition never fails. Conflicts detected while loading (or during the
/// search) make `run_solver` return `false`.
pub struct Solver<T> {
    vars: Vec<VarData<T>>,
    clauses: Vec<Clause>,
    /// `watches[watch_index(lit)]` lists the clauses to wake when `lit`
    /// becomes true.
    watches: Vec<Vec<ClauseId>>,
    /// Assigned literals in assignment order.
    trail: Vec<Literal>,
    /// Trail length at the start of each decision level.
    trail_lim: Vec<usize>,
    /// Next trail position to propagate.
    prop_head: usize,
    /// Set when clause loading already proves unsatisfiability.
    toplevel_conflict: bool,
}

impl<T> Solver<T> {
    pub fn new() -> Self {
        Solver {
            vars: Vec::new(),
            clauses: Vec::new(),
            watches: Vec::new(),
            trail: Vec::new(),
            trail_lim: Vec::new(),
            prop_head: 0,
            toplevel_conflict: false,
        }
    }

    /// Create a new variable carrying `user` and return its positive literal.
    pub fn add_variable(&mut self, user: T) -> Literal {
        self.vars.push(VarData {
            user,
            value: None,
            reason: None,
        });
        self.watches.push(Vec::new());
        self.watches.push(Vec::new());
        self.vars.len() as Literal
    }

    pub fn user_data(&self, lit: Literal) -> &T {
        &self.vars[var_of(lit)].user
    }

    /// Current value of `lit`, `None` if the variable is unassigned.
    pub fn lit_value(&self, lit: Literal) -> Option<bool> {
        self.vars[var_of(lit)].value.map(|v| v == (lit > 0))
    }

    pub fn lit_is_true(&self, lit: Literal) -> bool {
        self.lit_value(lit) == Some(true)
    }

    /// Assert that at most one of `lits` is true. Returns a handle for
    /// candidate queries. If two of the literals are already forced true the
    /// problem is unsatisfiable; this is reported by `run_solver`, not here.
    pub fn at_most_one(&mut self, lits: Vec<Literal>) -> AtMostOne {
        debug_assert!(!lits.is_empty());
        debug_assert!(self.trail_lim.is_empty(), "clauses are loaded before solving");

        let cid = self.clauses.len();
        for &lit in &lits {
            self.watches[watch_index(lit)].push(cid);
        }

        // A member may already be forced true by an earlier unit clause.
        let forced: Vec<Literal> = lits
            .iter()
            .copied()
            .filter(|&l| self.lit_value(l) == Some(true))
            .collect();
        match forced.len() {
            0 => {}
            1 => {
                for &lit in &lits {
                    if lit != forced[0] && !self.enqueue(neg(lit), Reason::Clause(cid)) {
                        self.toplevel_conflict = true;
                    }
                }
            }
            _ => self.toplevel_conflict = true,
        }

        self.clauses.push(Clause::AtMostOne { lits });
        AtMostOne(cid)
    }

    /// Assert the disjunction of `lits`, with `reason` kept for diagnostics.
    pub fn at_least_one(&mut self, lits: Vec<Literal>, reason: impl Into<String>) {
        debug_assert!(self.trail_lim.is_empty(), "clauses are loaded before solving");

        let mut seen = Vec::new();
        let mut lits: Vec<Literal> = lits
            .into_iter()
            .filter(|&l| {
                if seen.contains(&l) {
                    false
                } else {
                    seen.push(l);
                    true
                }
            })
            .collect();

        // Already satisfied at load time.
        if lits.iter().any(|&l| self.lit_value(l) == Some(true)) {
            return;
        }

        // Move two literals that are not yet false into the watch positions.
        let mut live = 0;
        for i in 0..lits.len() {
            if self.lit_value(lits[i]) != Some(false) {
                lits.swap(live, i);
                live += 1;
                if live == 2 {
                    break;
                }
            }
        }

        let cid = self.clauses.len();
        match live {
            0 => {
                self.clauses.push(Clause::Union {
                    lits,
                    reason: reason.into(),
                });
                self.toplevel_conflict = true;
            }
            1 => {
                let unit = lits[0];
                self.clauses.push(Clause::Union {
                    lits,
                    reason: reason.into(),
                });
                if !self.enqueue(unit, Reason::Clause(cid)) {
                    self.toplevel_conflict = true;
                }
            }
            _ => {
                self.watches[watch_index(neg(lits[0]))].push(cid);
                self.watches[watch_index(neg(lits[1]))].push(cid);
                self.clauses.push(Clause::Union {
                    lits,
                    reason: reason.into(),
                });
            }
        }
    }

    /// Assert `a → (b₁ ∨ … ∨ bₙ)`.
    pub fn implies(&mut self, a: Literal, bs: &[Literal], reason: impl Into<String>) {
        let mut lits = Vec::with_capacity(bs.len() + 1);
        lits.push(neg(a));
        lits.extend_from_slice(bs);
        self.at_least_one(lits, reason);
    }

    /// The literal currently assigned true among those governed by `clause`.
    pub fn get_selected(&self, clause: AtMostOne) -> Option<Literal> {
        let Clause::AtMostOne { lits } = &self.clauses[clause.0] else {
            unreachable!()
        };
        lits.iter().copied().find(|&l| self.lit_value(l) == Some(true))
    }

    /// The first literal (in insertion order) of `clause` that is neither
    /// forced true nor forced false.
    pub fn get_best_undecided(&self, clause: AtMostOne) -> Option<Literal> {
        let Clause::AtMostOne { lits } = &self.clauses[clause.0] else {
            unreachable!()
        };
        lits.iter().copied().find(|&l| self.lit_value(l).is_none())
    }

    fn enqueue(&mut self, lit: Literal, reason: Reason) -> bool {
        match self.lit_value(lit) {
            Some(true) => true,
            Some(false) => false,
            None => {
                let var = &mut self.vars[var_of(lit)];
                var.value = Some(lit > 0);
                var.reason = Some(reason);
                self.trail.push(lit);
                true
            }
        }
    }

    /// Propagate until saturation; returns the conflicting clause if any.
    fn propagate(&mut self) -> Option<ClauseId> {
        while self.prop_head < self.trail.len() {
            let lit = self.trail[self.prop_head];
            self.prop_head += 1;

            let wi = watch_index(lit);
            let watchers = std::mem::take(&mut self.watches[wi]);
            for (i, &cid) in watchers.iter().enumerate() {
                if !self.propagate_clause(cid, lit) {
                    // Keep the watchers we did not get to.
                    self.watches[wi].extend_from_slice(&watchers[i + 1..]);
                    return Some(cid);
                }
            }
        }
        None
    }

    /// Wake `cid` because `lit` just became true. Returns false on conflict.
    /// The clause re-registers its watches as needed.
    fn propagate_clause(&mut self, cid: ClauseId, lit: Literal) -> bool {
        if matches!(self.clauses[cid], Clause::AtMostOne { .. }) {
            let lits = match &self.clauses[cid] {
                Clause::AtMostOne { lits } => lits.clone(),
                Clause::Union { .. } => unreachable!(),
            };
            // Keep watching this member.
            self.watches[watch_index(lit)].push(cid);
            for other in lits {
                if other != lit && !self.enqueue(neg(other), Reason::Clause(cid)) {
                    return false;
                }
            }
            return true;
        }

        // `lit` being true falsified one of our two watched literals.
        let false_lit = neg(lit);
        let (first, len) = {
            let Clause::Union { lits, .. } = &mut self.clauses[cid] else {
                unreachable!()
            };
            if lits[0] == false_lit {
                lits.swap(0, 1);
            }
            debug_assert_eq!(lits[1], false_lit);
            (lits[0], lits.len())
        };

        if self.lit_value(first) == Some(true) {
            // Clause is satisfied; keep the watch where it is.
            self.watches[watch_index(lit)].push(cid);
            return true;
        }

        // Look for a replacement watch.
        let mut replacement = None;
        for j in 2..len {
            let candidate = {
                let Clause::Union { lits, .. } = &self.clauses[cid] else {
                    unreachable!()
                };
                lits[j]
            };
            if self.lit_value(candidate) != Some(false) {
                replacement = Some(j);
                break;
            }
        }

        if let Some(j) = replacement {
            let new_watch = {
                let Clause::Union { lits, .. } = &mut self.clauses[cid] else {
                    unreachable!()
                };
                lits.swap(1, j);
                lits[1]
            };
            self.watches[watch_index(neg(new_watch))].push(cid);
            true
        } else {
            // Unit (or conflicting): keep the watch and force lits[0].
            self.watches[watch_index(lit)].push(cid);
            self.enqueue(first, Reason::Clause(cid))
        }
    }

    fn decide(&mut self, lit: Literal) {
        assert!(
            self.lit_value(lit).is_none(),
            "decision literal must be undecided"
        );
        self.trail_lim.push(self.trail.len());
        let ok = self.enqueue(lit, Reason::Decision);
        debug_assert!(ok);
    }

    /// Undo the current decision level; returns its decision literal, or
    /// `None` at level zero.
    fn backtrack(&mut self) -> Option<Literal> {
        let lim = self.trail_lim.pop()?;
        let decision = self.trail[lim];
        for lit in self.trail.drain(lim..) {
            let var = &mut self.vars[var_of(lit)];
            var.value = None;
            var.reason = None;
        }
        self.prop_head = lim;
        Some(decision)
    }

    /// Run the search. `decider` is called at every decision point with the
    /// current assignment and returns the next literal to try, or `None`
    /// when every live obligation is decided, which completes the search.
    ///
    /// Returns `false` iff the clause set is unsatisfiable.
    pub fn run_solver<F>(&mut self, mut decider: F) -> bool
    where
        F: FnMut(&Solver<T>) -> Option<Literal>,
    {
        if self.toplevel_conflict {
            return false;
        }
        loop {
            if self.propagate().is_some() {
                match self.backtrack() {
                    // Conflict with no decisions left: exhausted.
                    None => return false,
                    Some(decision) => {
                        let ok = self.enqueue(neg(decision), Reason::Flipped);
                        debug_assert!(ok);
                        continue;
                    }
                }
            }
            match decider(self) {
                Some(lit) => self.decide(lit),
                None => return true,
            }
        }
    }
}

impl<T> Default for Solver<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Explanation for the current value of a literal: the clause (or decision)
/// that forced it, with the forcing literals explained recursively.
#[derive(Debug)]
pub struct ReasonTree {
    pub label: String,
    pub cause: String,
    pub children: Vec<ReasonTree>,
}

impl ReasonTree {
    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}{} ({})", "", self.label, self.cause, indent = depth * 2)?;
        for child in &self.children {
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ReasonTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

impl<T: fmt::Display> Solver<T> {
    fn lit_label(&self, lit: Literal) -> String {
        if lit > 0 {
            format!("{}", self.user_data(lit))
        } else {
            format!("not {}", self.user_data(lit))
        }
    }

    /// Explain why `lit` holds its current (typically false) value.
    pub fn explain_reason(&self, lit: Literal) -> ReasonTree {
        let mut seen = Vec::new();
        self.explain_inner(lit, &mut seen)
    }

    fn explain_inner(&self, lit: Literal, seen: &mut Vec<usize>) -> ReasonTree {
        let var = var_of(lit);
        // Display the literal as it currently stands.
        let shown = match self.vars[var].value {
            Some(true) => lit.abs(),
            Some(false) => -lit.abs(),
            None => lit,
        };
        let label = self.lit_label(shown);

        if seen.contains(&var) {
            return ReasonTree {
                label,
                cause: "shown above".to_string(),
                children: Vec::new(),
            };
        }
        seen.push(var);

        let (cause, children) = match self.vars[var].reason {
            None => ("undecided".to_string(), Vec::new()),
            Some(Reason::Decision) => ("decided".to_string(), Vec::new()),
            Some(Reason::Flipped) => ("the alternative led to a conflict".to_string(), Vec::new()),
            Some(Reason::Clause(cid)) => match &self.clauses[cid] {
                Clause::Union { lits, reason } => {
                    let children = lits
                        .iter()
                        .copied()
                        .filter(|&l| var_of(l) != var)
                        .map(|l| self.explain_inner(l, seen))
                        .collect();
                    (reason.clone(), children)
                }
                Clause::AtMostOne { lits } => {
                    let children = lits
                        .iter()
                        .copied()
                        .filter(|&l| var_of(l) != var && self.lit_value(l) == Some(true))
                        .map(|l| self.explain_inner(l, seen))
                        .collect();
                    ("at most one candidate may be selected".to_string(), children)
                }
            },
        };

        ReasonTree {
            label,
            cause,
            children,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Decider that works through at-most-one clauses in order, always
    /// preferring the first undecided candidate.
    fn clause_decider(clauses: Vec<AtMostOne>) -> impl FnMut(&Solver<&'static str>) -> Option<Literal> {
        move |sat| {
            for &c in &clauses {
                if sat.get_selected(c).is_some() {
                    continue;
                }
                if let Some(lit) = sat.get_best_undecided(c) {
                    return Some(lit);
                }
            }
            None
        }
    }

    #[test]
    fn test_unit_clause_forces_assignment() {
        let mut sat = Solver::new();
        let a = sat.add_variable("a");
        sat.at_least_one(vec![a], "need a");

        assert!(sat.run_solver(|_| None));
        assert!(sat.lit_is_true(a));
    }

    #[test]
    fn test_implication_chain() {
        let mut sat = Solver::new();
        let a = sat.add_variable("a");
        let b = sat.add_variable("b");
        let c = sat.add_variable("c");
        sat.implies(a, &[b], "a needs b");
        sat.implies(b, &[c], "b needs c");
        sat.at_least_one(vec![a], "need a");

        assert!(sat.run_solver(|_| None));
        assert!(sat.lit_is_true(a));
        assert!(sat.lit_is_true(b));
        assert!(sat.lit_is_true(c));
    }

    #[test]
    fn test_at_most_one_excludes_others() {
        let mut sat = Solver::new();
        let a = sat.add_variable("a");
        let b = sat.add_variable("b");
        let c = sat.add_variable("c");
        let clause = sat.at_most_one(vec![a, b, c]);
        sat.at_least_one(vec![b], "need b");

        assert!(sat.run_solver(|_| None));
        assert_eq!(sat.get_selected(clause), Some(b));
        assert_eq!(sat.lit_value(a), Some(false));
        assert_eq!(sat.lit_value(c), Some(false));
    }

    #[test]
    fn test_best_undecided_follows_insertion_order() {
        let mut sat = Solver::new();
        let a = sat.add_variable("a");
        let b = sat.add_variable("b");
        let clause = sat.at_most_one(vec![a, b]);

        assert_eq!(sat.get_best_undecided(clause), Some(a));
        assert!(sat.run_solver(clause_decider(vec![clause])));
        assert_eq!(sat.get_selected(clause), Some(a));
    }

    #[test]
    fn test_excluded_consequence_forces_alternative() {
        let mut sat = Solver::new();
        let a = sat.add_variable("a");
        let b = sat.add_variable("b");
        let bad = sat.add_variable("bad");
        let clause = sat.at_most_one(vec![a, b]);
        sat.at_least_one(vec![a, b], "need one");
        // Choosing a forces bad, and bad is forbidden.
        sat.implies(a, &[bad], "a needs bad");
        sat.at_least_one(vec![neg(bad)], "bad is excluded");

        assert!(sat.run_solver(clause_decider(vec![clause])));
        assert_eq!(sat.get_selected(clause), Some(b));
        assert_eq!(sat.lit_value(a), Some(false));
    }

    #[test]
    fn test_unsatisfiable() {
        let mut sat = Solver::new();
        let a = sat.add_variable("a");
        let b = sat.add_variable("b");
        let clause = sat.at_most_one(vec![a, b]);
        sat.at_least_one(vec![a, b], "need one");
        sat.at_least_one(vec![neg(a)], "a excluded");
        sat.at_least_one(vec![neg(b)], "b excluded");

        assert!(!sat.run_solver(clause_decider(vec![clause])));
    }

    #[test]
    fn test_empty_disjunction_is_unsat() {
        let mut sat: Solver<&str> = Solver::new();
        sat.at_least_one(vec![], "impossible");
        assert!(!sat.run_solver(|_| None));
    }

    #[test]
    fn test_two_forced_true_in_at_most_one_is_unsat() {
        let mut sat = Solver::new();
        let a = sat.add_variable("a");
        let b = sat.add_variable("b");
        sat.at_least_one(vec![a], "need a");
        sat.at_least_one(vec![b], "need b");
        sat.at_most_one(vec![a, b]);

        assert!(!sat.run_solver(|_| None));
    }

    #[test]
    fn test_deep_backtracking() {
        // Two candidate groups; any pairing of (a1, b1) conflicts, so the
        // solver must revisit the first decision after failing on the second.
        let mut sat = Solver::new();
        let a1 = sat.add_variable("a1");
        let a2 = sat.add_variable("a2");
        let b1 = sat.add_variable("b1");
        let b2 = sat.add_variable("b2");
        let ca = sat.at_most_one(vec![a1, a2]);
        let cb = sat.at_most_one(vec![b1, b2]);
        sat.at_least_one(vec![a1, a2], "need an a");
        sat.at_least_one(vec![b1, b2], "need a b");
        // a1 is incompatible with both b candidates.
        sat.implies(a1, &[neg(b1)], "a1 conflicts with b1");
        sat.implies(a1, &[neg(b2)], "a1 conflicts with b2");

        assert!(sat.run_solver(clause_decider(vec![ca, cb])));
        assert_eq!(sat.get_selected(ca), Some(a2));
        assert!(sat.get_selected(cb).is_some());
    }

    #[test]
    fn test_explain_reason() {
        let mut sat = Solver::new();
        let a = sat.add_variable("a");
        let b = sat.add_variable("b");
        sat.at_most_one(vec![a, b]);
        sat.at_least_one(vec![a], "need a");

        assert!(sat.run_solver(|_| None));
        let tree = sat.explain_reason(b);
        assert_eq!(tree.label, "not b");
        assert!(tree.cause.contains("at most one"));
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].label, "a");
        assert_eq!(tree.children[0].cause, "need a");
    }

    #[test]
    fn test_user_data_roundtrip() {
        let mut sat = Solver::new();
        let a = sat.add_variable("alpha");
        let b = sat.add_variable("beta");
        assert_eq!(*sat.user_data(a), "alpha");
        assert_eq!(*sat.user_data(neg(b)), "beta");
    }
}

//! Boolean satisfiability engine with user-labelled variables.
//!
//! This is a small DPLL-style solver tailored to the clause shapes the
//! problem builder emits:
//!
//! - **at-most-one** clauses over a candidate list (candidate exclusivity),
//! - **union** clauses (`at_least_one`, and `a → b₁ ∨ … ∨ bₙ` implications)
//!   with an attached textual reason used for diagnostics.
//!
//! Union clauses use two watched literals; an at-most-one clause watches
//! every member and falsifies the rest as soon as one becomes true.
//! Decisions are supplied by a caller-provided branching callback and pushed
//! on a trail; on conflict the engine backtracks one level and flips the
//! most recent decision, which makes the search exhaustive.
//!
//! Insertion order is preserved everywhere: the first undecided literal of
//! an at-most-one clause is the preferred candidate.

mod solver;

pub use solver::{AtMostOne, Literal, ReasonTree, Solver, neg};

//! The component selection core.
//!
//! Solving proceeds in stages:
//!
//! 1. [`ProblemBuilder`] walks the requirement graph reachable from the
//!    root, populating the candidate caches and emitting clauses into the
//!    SAT engine.
//! 2. The caches are frozen into snapshots and the engine runs with the
//!    [`Decider`] supplying branch literals: a depth-first walk of the
//!    partially-built solution that prefers the provider's candidate order.
//! 3. A satisfying assignment is assembled into a [`Selections`] document.
//! 4. [`solve_for`] drives the whole thing twice: a normal pass, then (only
//!    on failure) a closest-match pass whose dummy candidates always
//!    succeed, so the failure can be explained.

mod builder;
mod cache;
mod candidates;
mod decider;
mod driver;
mod selections;


pub use builder::{Problem, ProblemBuilder, Req};
pub use cache::{CandidateCache, Snapshot};
pub use candidates::{CommandCandidates, DecisionState, ImplCandidates, Sat, VarLabel};
pub use decider::Decider;
pub use driver::{derive_root, do_solve, solve_for, Solution};
pub use selections::{assemble, Selections};

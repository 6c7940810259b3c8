//! Component selection core for a decentralized software-distribution
//! system.
//!
//! Given a root requirement (an interface URI, optionally qualified by a
//! named command), a catalogue of candidate implementations per interface
//! and a scope filter, the solver picks a mutually consistent set of
//! implementations, one per participating interface, preferring candidates
//! in the provider's order.
//!
//! # Example
//!
//! ```no_run
//! use feedsel_solver::pool::{Catalog, FeedPool};
//! use feedsel_solver::requirements::Requirements;
//! use feedsel_solver::solver::solve_for;
//!
//! let catalog: Catalog = serde_json::from_str("...").unwrap();
//! let reqs = Requirements::new("http://example.com/app").with_command("run");
//!
//! let (ok, solution) = solve_for(&reqs, |scope| FeedPool::new(&catalog, scope)).unwrap();
//! if ok {
//!     print!("{}", solution.selections());
//! }
//! ```

pub mod model;
pub mod pool;
pub mod provider;
pub mod requirements;
pub mod sat;
pub mod scope;
pub mod solver;

pub use pool::{Catalog, FeedPool};
pub use provider::{CandidateList, ImplementationProvider, RejectReason};
pub use requirements::Requirements;
pub use scope::ScopeFilter;
pub use solver::{solve_for, Req, Selections, Solution};

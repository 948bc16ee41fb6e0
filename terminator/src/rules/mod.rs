//! Rule evaluation and execution.
//!
//! A reconcile is one linear pass: read the `Sidecar`, resolve and apply each delete
//! rule in order, then record a `Reconciled` condition. The first error aborts the
//! pass and is returned unchanged; deletions already issued are not rolled back.

mod cull;
mod engine;
mod namespaces;
mod selector;
mod status;

pub use cull::cull_pods;
pub use engine::{reconcile_sidecar, run_delete_rules, RulesOutcome};
pub use namespaces::resolve_namespaces;
pub use selector::{PodSelector, Requirement};
pub use status::{reconciled_condition, report_outcome};

//! A small cluster hygiene controller.
//!
//! It watches `Sidecar` resources, each holding an ordered list of delete rules,
//! and removes the pods those rules select. The outcome of every successful pass
//! is appended to the resource status as a `Reconciled` condition.

pub mod config;
pub mod controller;
pub mod crd;
pub mod error;
pub mod k8s;
pub mod requeue;
pub mod rules;

pub use error::Error;

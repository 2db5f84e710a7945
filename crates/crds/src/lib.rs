//! Gitea Operator CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the repo controller.

pub mod conditions;
pub mod repo;

pub use conditions::*;
pub use repo::*;

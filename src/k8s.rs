//! Kubernetes access to HyperPod EKS orchestrators.

pub mod access;
pub mod client;
pub mod nodes;
pub mod quota;

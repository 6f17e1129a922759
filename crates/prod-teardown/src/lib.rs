//! prod-teardown - dependency-ordered teardown of a project's AWS resources
//!
//! Finds everything tagged (or named) for one project and removes it family
//! by family: ECS, load balancers, RDS, EFS, Lambda, the VPC and finally IAM.
//! A report-only pass always runs first; deletion needs confirmation.

pub mod aws;
pub mod config;
pub mod confirm;
pub mod families;
pub mod pipeline;
pub mod report;
pub mod wait;

#[cfg(test)]
pub(crate) mod testing;

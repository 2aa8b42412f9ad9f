//! Pre-deployment checks for a bot project about to be pushed to a Git host
//! and run as a hosted web service.

pub mod checklist;
pub mod configuration;
pub mod deployment;
pub mod files;
pub mod runtime;

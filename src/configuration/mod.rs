pub mod deployment;
pub mod dotenv;
pub mod project;
pub mod runtime;
pub mod service;

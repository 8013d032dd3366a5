//! CVM Deployer Library
//!
//! Deploys a Confidential VM to Phala Cloud from a CI step.

pub mod app;
pub mod crypto;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod report;
pub mod secrets;
pub mod utils;

//! Phala Cloud API models shared by the deployer

pub mod models;

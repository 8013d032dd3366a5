//! Deployment module

pub mod compose;
pub mod fsm;
pub mod node;
pub mod provider;
pub mod provisioner;

//! Application wiring: inputs, configuration and the deployment run

pub mod inputs;
pub mod options;
pub mod run;

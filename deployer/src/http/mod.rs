//! Provider HTTP API

pub mod client;
pub mod cvms;
pub mod retry;
pub mod teepods;

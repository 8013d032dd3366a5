//! Encryption of values sent to the provider

pub mod envelope;

//! Secret selection

pub mod projector;

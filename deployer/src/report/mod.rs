//! Result reporting

pub mod output;

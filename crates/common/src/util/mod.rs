//! Small helpers

pub mod calculator;

pub use calculator::Calculator;

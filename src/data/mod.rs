//! Document readers.

pub mod tei;

//! Crate-level test support shared across module test suites.

pub(crate) mod support;

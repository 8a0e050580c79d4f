//! Test suites for the reconciliation engine.

pub(crate) mod support;

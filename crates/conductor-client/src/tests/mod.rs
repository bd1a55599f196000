//! Test suites for the conductor client.

pub(crate) mod support;

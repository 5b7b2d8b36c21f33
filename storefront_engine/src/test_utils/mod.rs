//! Helpers for setting up throwaway databases in tests and downstream integration suites.

pub mod prepare_env;

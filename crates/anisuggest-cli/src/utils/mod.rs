//! Utility functions for the anisuggest CLI

pub mod logging;

pub use logging::initialize_logging;

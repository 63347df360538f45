//! Utility functions for common display formatting.

pub mod formatting;

pub use formatting::truncate_id;

/// Shared service infrastructure.
pub mod common;

/// MPRIS media player service.
pub mod mpris;

//! Error in tessera

/// Sendable error, returned by the hooks supplied to the core
pub type SendableError = Box<dyn std::error::Error + Send + Sync>;

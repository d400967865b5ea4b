// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error handling module
//!
//! Every error here is terminal for the process: the server has no recovery
//! paths, it logs once and lets `main` exit non-zero.

use std::time::Duration;

use thiserror::Error;

/// Error types for server lifecycle operations
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration validation errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Network binding errors
    #[error("Failed to bind to {address}: {source}")]
    Bind {
        /// Address that failed to bind
        address: String,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Server startup errors
    #[error("Server startup failed: {source}")]
    Startup {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Shutdown signal handlers could not be registered
    #[error("Signal handling error: {source}")]
    Signal {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Listener terminated without a shutdown being requested
    #[error("Runtime error: {message}")]
    Runtime {
        /// Error message
        message: String,
    },

    /// Server shutdown errors
    #[error("Server shutdown failed: {source}")]
    Shutdown {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// In-flight requests were still running when the grace period elapsed
    #[error("Failed to gracefully shutdown within {grace_period:?}")]
    ShutdownTimeout {
        /// Grace period that elapsed
        grace_period: Duration,
    },

    /// Task join errors for async operations
    #[error("Task join error: {source}")]
    TaskJoin {
        /// Underlying tokio join error
        #[source]
        source: tokio::task::JoinError,
    },
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

impl From<tokio::task::JoinError> for ServerError {
    fn from(source: tokio::task::JoinError) -> Self {
        Self::TaskJoin { source }
    }
}

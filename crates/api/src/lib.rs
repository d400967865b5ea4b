// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Todo GraphQL Server Implementation
//!
//! This crate provides the HTTP server for the todo GraphQL service, built with
//! Axum: a fixed middleware chain, a playground page, the GraphQL execution
//! endpoint, and a signal-driven graceful shutdown bounded by a grace period.
//!
//! # Module Structure
//!
//! - [`config`]: Port resolution and hierarchical configuration loading
//! - [`error`]: Error types for the server lifecycle
//! - [`state`]: Lifecycle phases observable through a `watch` channel
//! - [`server`]: Router assembly, listener lifecycle, and coordinated shutdown
//! - [`routes`]: The playground and query routes and their handlers
//! - [`middleware`]: Request context, request spans, and cross-origin policy
//!
//! # Lifecycle
//!
//! `Starting -> Serving -> ShuttingDown -> Stopped`. SIGINT and SIGTERM cancel
//! a `CancellationToken`; the listener then stops accepting connections and
//! in-flight requests get up to the grace period to finish.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{Server, ShutdownConfig};
pub use state::LifecycleState;

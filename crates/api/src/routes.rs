// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Routes module
//!
//! Exactly two paths are served: the playground page on [`PLAYGROUND_PATH`]
//! and the GraphQL executor on [`QUERY_PATH`]. Everything else falls through
//! to the router's default 404.

pub mod handlers;

use axum::{
    Router,
    routing::{MethodRouter, any, get},
};
use handlers::{graphql_handler, playground_handler};
use todo_schema::TodoSchema;

/// Path of the interactive playground page
pub const PLAYGROUND_PATH: &str = "/";

/// Path of the GraphQL execution endpoint
pub const QUERY_PATH: &str = "/query";

/// Create application routes around the given query executor
pub fn create_routes(query_service: MethodRouter) -> Router {
    Router::new()
        .route(PLAYGROUND_PATH, get(playground_handler))
        .route(QUERY_PATH, query_service)
}

/// Query executor backed by `schema`, accepting any method
pub fn graphql_route(schema: TodoSchema) -> MethodRouter {
    any(graphql_handler).with_state(schema)
}

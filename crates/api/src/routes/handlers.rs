// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP request handlers module

use async_graphql::http::{GraphQLPlaygroundConfig, playground_source};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{extract::State, response::Html};
use todo_schema::TodoSchema;

use super::QUERY_PATH;

/// Playground page pointed at the query endpoint
pub async fn playground_handler() -> Html<String> {
    Html(playground_source(
        GraphQLPlaygroundConfig::new(QUERY_PATH).title("GraphQL playground"),
    ))
}

/// Execute a GraphQL request against the schema
///
/// Runs inside the request span, so resolver logs carry the request id.
pub async fn graphql_handler(
    State(schema): State<TodoSchema>,
    request: GraphQLRequest,
) -> GraphQLResponse {
    schema.execute(request.into_inner()).await.into()
}

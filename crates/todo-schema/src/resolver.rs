// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Query and mutation resolvers

use async_graphql::{Context, EmptySubscription, Object, Result, Schema};
use tracing::info;

use crate::{
    model::{NewTodo, Todo},
    store::TodoStore,
};

/// Executable schema served on the query endpoint
pub type TodoSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the executable schema around `store`
pub fn build_schema(store: TodoStore) -> TodoSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(store)
        .finish()
}

/// Root query type
#[derive(Debug, Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// All todo items
    async fn todos(&self, ctx: &Context<'_>) -> Result<Vec<Todo>> {
        let store = ctx.data::<TodoStore>()?;
        Ok(store.list().await)
    }
}

/// Root mutation type
#[derive(Debug, Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Create a todo item owned by `input.userId`
    async fn create_todo(&self, ctx: &Context<'_>, input: NewTodo) -> Result<Todo> {
        let store = ctx.data::<TodoStore>()?;
        let todo = store.create(input).await;
        info!(todo_id = %todo.id.as_str(), user_id = %todo.user.id.as_str(), "created todo");
        Ok(todo)
    }
}

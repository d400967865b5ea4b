// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory todo storage
//!
//! Items live for the lifetime of the process. The store is cheap to clone and
//! every clone shares the same underlying list.

use std::sync::Arc;

use async_graphql::ID;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::model::{NewTodo, Todo, User};

/// Shared, process-local todo list
#[derive(Debug, Clone, Default)]
pub struct TodoStore {
    todos: Arc<RwLock<Vec<Todo>>>,
}

impl TodoStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all items in insertion order
    pub async fn list(&self) -> Vec<Todo> {
        self.todos.read().await.clone()
    }

    /// Insert a new, not yet done item owned by `input.user_id`
    pub async fn create(&self, input: NewTodo) -> Todo {
        let todo = Todo {
            id: ID::from(Uuid::new_v4().to_string()),
            text: input.text,
            done: false,
            user: User::from_id(&input.user_id),
        };

        let mut todos = self.todos.write().await;
        todos.push(todo.clone());
        debug!(todo_id = %todo.id.as_str(), total = todos.len(), "todo created");

        todo
    }

    /// Number of stored items
    pub async fn len(&self) -> usize {
        self.todos.read().await.len()
    }

    /// Whether the store holds no items
    pub async fn is_empty(&self) -> bool {
        self.todos.read().await.is_empty()
    }
}

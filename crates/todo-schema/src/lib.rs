// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! GraphQL schema for the todo service
//!
//! This crate owns the GraphQL types, the query and mutation resolvers, and the
//! process-local store backing them. The HTTP server treats the resulting
//! [`TodoSchema`] as an opaque executor.
//!
//! ```graphql
//! type Todo { id: ID!, text: String!, done: Boolean!, user: User! }
//! type User { id: ID!, name: String! }
//! type Query { todos: [Todo!]! }
//! input NewTodo { text: String!, userId: String! }
//! type Mutation { createTodo(input: NewTodo!): Todo! }
//! ```

pub mod model;
pub mod resolver;
pub mod store;

pub use model::{NewTodo, Todo, User};
pub use resolver::{MutationRoot, QueryRoot, TodoSchema, build_schema};
pub use store::TodoStore;

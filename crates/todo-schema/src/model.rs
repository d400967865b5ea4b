// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! GraphQL object and input types

use async_graphql::{ID, InputObject, SimpleObject};

/// A single todo item
#[derive(Debug, Clone, PartialEq, Eq, SimpleObject)]
pub struct Todo {
    /// Unique identifier assigned on creation
    pub id: ID,
    /// Free-form description
    pub text: String,
    /// Completion flag, `false` for new items
    pub done: bool,
    /// Owner of the item
    pub user: User,
}

/// Owner of a todo item
#[derive(Debug, Clone, PartialEq, Eq, SimpleObject)]
pub struct User {
    /// User identifier as supplied by the client
    pub id: ID,
    /// Display name
    pub name: String,
}

impl User {
    /// Build the user referenced by `user_id`
    ///
    /// There is no user directory, so the display name is derived from the id.
    pub fn from_id(user_id: &str) -> Self {
        Self {
            id: ID::from(user_id),
            name: format!("user {user_id}"),
        }
    }
}

/// Input for the `createTodo` mutation
#[derive(Debug, Clone, InputObject)]
pub struct NewTodo {
    /// Description of the new item
    pub text: String,
    /// Identifier of the owning user
    pub user_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_name_derived_from_id() {
        let user = User::from_id("42");
        assert_eq!(user.id, ID::from("42"));
        assert_eq!(user.name, "user 42");
    }
}

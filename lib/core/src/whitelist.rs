//! Explicit set of usernames that are always authorized.
//!
//! The whitelist is supplied as an ordered list in configuration and is
//! converted to a set once. It never changes afterwards; reconfiguring it
//! means building a new provider.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Case-sensitive set of authorized usernames.
///
/// An empty whitelist grants nothing on its own, leaving authorization
/// entirely to the provider's group membership check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Whitelist {
    users: HashSet<String>,
}

impl Whitelist {
    /// Creates a whitelist from any collection of usernames.
    #[must_use]
    pub fn new<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            users: users.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if `username` is whitelisted.
    #[must_use]
    pub fn contains(&self, username: &str) -> bool {
        self.users.contains(username)
    }

    /// Returns true if no usernames are whitelisted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Returns the number of distinct whitelisted usernames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Iterates over the whitelisted usernames in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.users.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for Whitelist {
    fn from(users: Vec<String>) -> Self {
        Self::new(users)
    }
}

impl From<Whitelist> for Vec<String> {
    fn from(whitelist: Whitelist) -> Self {
        let mut users: Vec<String> = whitelist.users.into_iter().collect();
        users.sort();
        users
    }
}

impl<S: Into<String>> FromIterator<S> for Whitelist {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

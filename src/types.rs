//! Typed identifiers for accounts.
//!
//! A `UserId` and an `Email` are both strings on the wire, but they are
//! never interchangeable: tokens carry the former, logins look up the latter.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a value that is already in canonical form.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

newtype_string!(
    /// Public, stable identifier of a user account.
    ///
    /// Assigned once at signup and carried as the `sub` claim of every
    /// token. Distinct from the SurrealDB record id, which never leaves
    /// the store.
    UserId
);

newtype_string!(
    /// Login identity of a user: a trimmed, lower-cased email address.
    ///
    /// Construct through [`Email::normalize`] so lookups and the unique
    /// index agree on one canonical form.
    Email
);

impl UserId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }
}

impl Email {
    pub fn normalize(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }
}

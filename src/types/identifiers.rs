//! Newtype wrappers for identifiers that travel over the wire

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// Generates a transparent string newtype with the usual conversions.
macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an owned or borrowed string
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the inner string
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_newtype!(
    /// Conversation session identifier
    ///
    /// The default session is literally `"default"`, which is what the CLI
    /// expects when the caller does not manage sessions itself.
    SessionId
);

string_newtype!(
    /// Tool name as understood by the CLI (`Bash`, `Read`, `mcp__calc__add`, ...)
    ToolName
);

impl Default for SessionId {
    fn default() -> Self {
        Self("default".to_string())
    }
}

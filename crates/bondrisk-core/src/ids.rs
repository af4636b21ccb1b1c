//! Identifier types.
//!
//! All identities are stable integers so they can be embedded in cache keys.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Create a new identifier.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Raw integer value.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

integer_id!(
    /// User identifier issued by the identity collaborator.
    UserId
);

integer_id!(
    /// Portfolio identifier issued by the persistence collaborator.
    PortfolioId
);

integer_id!(
    /// Bond identifier, unique within the persistence collaborator.
    BondId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_serde() {
        let id = PortfolioId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");

        let back: UserId = serde_json::from_str("7").unwrap();
        assert_eq!(back, UserId::new(7));
    }
}

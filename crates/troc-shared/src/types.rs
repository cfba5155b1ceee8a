use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(
    /// Identity issued by the authentication provider.
    UserId
);
uuid_id!(
    /// A listed item offered for swapping.
    ItemId
);
uuid_id!(MatchId);
uuid_id!(ConversationId);
uuid_id!(MessageId);
uuid_id!(NotificationId);

/// Direction-independent key for a pair of items.
///
/// Both matches and conversations are deduplicated on this key: `(a, b)` and
/// `(b, a)` normalize to the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemPair {
    pub lo: ItemId,
    pub hi: ItemId,
}

impl ItemPair {
    pub fn new(a: ItemId, b: ItemId) -> Self {
        if a <= b {
            Self { lo: a, hi: b }
        } else {
            Self { lo: b, hi: a }
        }
    }

    pub fn contains(&self, item: ItemId) -> bool {
        self.lo == item || self.hi == item
    }
}

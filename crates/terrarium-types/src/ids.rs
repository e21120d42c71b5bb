//! Type-safe identifier wrappers around `u64`.
//!
//! Every entity in the simulation has a strongly-typed ID to prevent
//! accidental mixing of identifiers at compile time. IDs are issued by an
//! [`IdSequence`] owned by the world, so a fixed seed and tick count always
//! produce the same identifiers. IDs are never reused.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around `u64` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Return the inner `u64` value.
            pub const fn into_inner(self) -> u64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for an agent (herbivore, predator, or social actor).
    AgentId
}

define_id! {
    /// Unique identifier for an institution in the society variant.
    InstitutionId
}

/// Monotonic issuer of raw identifiers, starting at 1.
///
/// Zero is never issued so that it can never be confused with a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdSequence {
    /// The next raw value to hand out.
    next: u64,
}

impl IdSequence {
    /// Create a sequence whose first issued value is 1.
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Issue the next identifier.
    pub fn issue<T: From<u64>>(&mut self) -> T {
        let raw = self.next;
        self.next = self.next.saturating_add(1);
        T::from(raw)
    }

    /// Peek at the value the next call to [`issue`](Self::issue) returns.
    pub const fn peek(&self) -> u64 {
        self.next
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn sequence_starts_at_one_and_increments() {
        let mut seq = IdSequence::new();
        let a: AgentId = seq.issue();
        let b: AgentId = seq.issue();
        assert_eq!(a, AgentId(1));
        assert_eq!(b, AgentId(2));
        assert_eq!(seq.peek(), 3);
    }

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let json = serde_json::to_string(&InstitutionId(7)).unwrap();
        assert_eq!(json, "7");
        let back: InstitutionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, InstitutionId(7));
    }
}

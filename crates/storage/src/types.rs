//! Identifier types shared by every crate in the workspace.

/// Macro to define a newtype wrapper around an unsigned integer with
/// standard trait implementations.
///
/// Each generated type:
/// - Is a transparent wrapper around the integer (zero runtime cost)
/// - Derives `Copy`, `Clone`, `Debug`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Derives `Serialize` and `Deserialize` (transparent)
/// - Implements `From` in both directions and a `Display` that outputs the inner value
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(
            Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            /// Returns the raw integer value.
            #[must_use]
            pub const fn get(self) -> $inner {
                self.0
            }

            /// Returns the next identifier, or `None` on overflow.
            #[must_use]
            pub fn checked_next(self) -> Option<Self> {
                self.0.checked_add(1).map(Self)
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl From<$name> for $inner {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Version number of a key inside a key ring.
    ///
    /// Versions start at 1 and strictly increase with every rotation. A
    /// sealed value and a token both carry the version of the key that
    /// produced them, so the matching key can be found after rotation.
    ///
    /// # Examples
    ///
    /// ```
    /// use gradeguard_storage::KeyVersion;
    ///
    /// let v = KeyVersion::from(3);
    /// assert_eq!(u32::from(v), 3);
    /// assert_eq!(v.to_string(), "3");
    /// assert_eq!(v.checked_next(), Some(KeyVersion(4)));
    /// ```
    KeyVersion(u32)
);

define_id!(
    /// Position of an entry in the audit ledger.
    ///
    /// The first entry has sequence 1; there are no gaps.
    ///
    /// # Examples
    ///
    /// ```
    /// use gradeguard_storage::Sequence;
    ///
    /// assert_eq!(Sequence::FIRST.get(), 1);
    /// ```
    Sequence(u64)
);

impl KeyVersion {
    /// The version assigned to the first key of every ring.
    pub const FIRST: Self = Self(1);
}

impl Sequence {
    /// The sequence number of the genesis entry.
    pub const FIRST: Self = Self(1);
}

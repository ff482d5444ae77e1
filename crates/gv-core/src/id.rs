use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Global string interner for dataset identifiers (images, persons, color tags).
/// Every dataset repeats the same few names thousands of times, once per row.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Declares a 4-byte interned identifier backed by the shared interner.
macro_rules! interned_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(Spur);

        impl $name {
            /// Intern a new string, or return the existing id if already interned.
            pub fn intern(s: &str) -> Self {
                $name(INTERNER.get_or_intern(s))
            }

            /// Resolve back to a string slice.
            pub fn as_str(&self) -> &str {
                INTERNER.resolve(&self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($name), self.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok($name::intern(&s))
            }
        }
    };
}

interned_id! {
    /// Stimulus image identifier, usually the image file name.
    ImageId
}

interned_id! {
    /// Participant identifier (`p1`, `p2`, ...).
    PersonId
}

interned_id! {
    /// Viewing-condition tag of a scanpath (`color` or `gray` in the stock dataset).
    ColorTag
}

/// Identifier of an AOI, unique within one image's registry.
///
/// Ids are handed out as `max + 1` and never renumbered, so an id stays
/// valid for the AOI's whole lifetime regardless of other deletions.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AoiId(pub u32);

impl AoiId {
    pub const FIRST: AoiId = AoiId(1);

    #[must_use]
    pub fn next(self) -> AoiId {
        AoiId(self.0 + 1)
    }

    /// Key used for graph nodes and renderer lookups, e.g. `aoi3`.
    pub fn key(&self) -> String {
        format!("aoi{}", self.0)
    }
}

impl fmt::Debug for AoiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AoiId({})", self.0)
    }
}

impl fmt::Display for AoiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AOI{}", self.0)
    }
}

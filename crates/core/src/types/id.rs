//! Newtype IDs for type-safe entity references.
//!
//! Catalog identifiers are opaque strings assigned by the external catalog
//! service. Use the `define_id!` macro to create wrappers that reject empty
//! values and prevent accidentally mixing IDs from different entity types.

use thiserror::Error;

/// Error returned when an ID is empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} cannot be empty")]
pub struct EmptyIdError {
    /// Name of the ID type that failed to parse.
    pub kind: &'static str,
}

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - A fallible `parse()` that trims and rejects empty input
/// - `as_str()`, `Display`, `FromStr`, and `AsRef<str>`
///
/// # Example
///
/// ```rust
/// # use kicks_core::define_id;
/// define_id!(SkuId);
/// define_id!(BrandId);
///
/// let sku = SkuId::parse("dz5485-612").unwrap();
/// assert_eq!(sku.as_str(), "dz5485-612");
/// assert!(BrandId::parse("   ").is_err());
///
/// // These are different types, so this won't compile:
/// // let _: BrandId = sku;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Parse an ID, trimming surrounding whitespace.
            ///
            /// # Errors
            ///
            /// Returns an error if the trimmed input is empty.
            pub fn parse(id: &str) -> ::core::result::Result<Self, $crate::EmptyIdError> {
                let trimmed = id.trim();
                if trimmed.is_empty() {
                    return Err($crate::EmptyIdError {
                        kind: stringify!($name),
                    });
                }
                Ok(Self(trimmed.to_owned()))
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return its inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::EmptyIdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(ProductId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_whitespace() {
        let id = ProductId::parse("  abc-123 ").unwrap();
        assert_eq!(id.as_str(), "abc-123");
    }

    #[test]
    fn test_parse_rejects_empty() {
        let err = ProductId::parse("").unwrap_err();
        assert_eq!(err.kind, "ProductId");
        assert!(ProductId::parse("   ").is_err());
    }

    #[test]
    fn test_display_and_from_str() {
        let id: ProductId = "jordan-4".parse().unwrap();
        assert_eq!(format!("{id}"), "jordan-4");
    }

    #[test]
    fn test_serde_transparent() {
        let id = ProductId::parse("42").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"42\"");
    }
}

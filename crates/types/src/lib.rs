//! Validated identifier types shared across the greencard crates.
//!
//! The EMR refers to patients and concepts by positive integer ids and to programs, encounter
//! types and forms by externally assigned uuid-like strings. These wrappers guarantee the value
//! is well formed once constructed, so downstream code never re-checks it.

use std::str::FromStr;

/// Errors that can occur when creating validated identifier types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentifierError {
    /// A numeric identifier was zero.
    #[error("{kind} must be a positive integer")]
    NotPositive { kind: &'static str },
    /// A numeric identifier could not be parsed.
    #[error("{kind} is not a valid integer: {input}")]
    NotANumber { kind: &'static str, input: String },
    /// The input text was empty or contained only whitespace
    #[error("metadata identifier cannot be empty")]
    Empty,
}

macro_rules! positive_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            /// Creates a new identifier, rejecting zero.
            pub fn new(value: u32) -> Result<Self, IdentifierError> {
                if value == 0 {
                    return Err(IdentifierError::NotPositive { kind: $kind });
                }
                Ok(Self(value))
            }

            /// Returns the raw integer value.
            pub fn get(self) -> u32 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdentifierError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s.trim().parse::<u32>().map_err(|_| IdentifierError::NotANumber {
                    kind: $kind,
                    input: s.to_owned(),
                })?;
                Self::new(value)
            }
        }

        impl TryFrom<u32> for $name {
            type Error = IdentifierError;

            fn try_from(value: u32) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_u32(self.0)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let value = u32::deserialize(deserializer)?;
                $name::new(value).map_err(serde::de::Error::custom)
            }
        }
    };
}

positive_id!(
    /// Integer identifier of a patient record.
    PatientId,
    "patient id"
);

positive_id!(
    /// Integer identifier of a concept (a question or an answer).
    ConceptId,
    "concept id"
);

/// External identifier of a program, encounter type or form.
///
/// The input is trimmed of leading and trailing whitespace during construction and must not be
/// empty. No further format is enforced: EMR dictionaries mix real UUIDs with padded codes such
/// as `856AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetadataUuid(String);

impl MetadataUuid {
    /// Creates a new `MetadataUuid` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `IdentifierError::Empty` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, IdentifierError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MetadataUuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for MetadataUuid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for MetadataUuid {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for MetadataUuid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for MetadataUuid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        MetadataUuid::new(&s).map_err(serde::de::Error::custom)
    }
}

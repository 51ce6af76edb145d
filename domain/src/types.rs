//! Identifier newtypes and validated names.
//!
//! Every aggregate and entity gets its own UUID-backed id type so a
//! booking id can never be passed where a spot id is expected.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random id.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// The underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

define_id! {
    /// Identifies a marketplace user.
    UserId
}

define_id! {
    /// Identifies a parking community.
    ParkingId
}

define_id! {
    /// Identifies a parking spot.
    SpotId
}

define_id! {
    /// Identifies one availability window on a spot.
    AvailabilityId
}

define_id! {
    /// Identifies a booking on a spot.
    BookingId
}

define_id! {
    /// Identifies a booking request inside a parking community.
    BookingRequestId
}

/// A validated spot name: one to ten uppercase ASCII letters or digits,
/// matching the short labels painted on real parking spots ("A1", "B12").
///
/// # Example
///
/// ```
/// use spotswap_domain::SpotName;
///
/// let name = SpotName::new("B12")?;
/// assert_eq!(name.as_str(), "B12");
/// assert!(SpotName::new("b12").is_err());
/// assert!(SpotName::new("").is_err());
/// # Ok::<(), spotswap_domain::DomainError>(())
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpotName(String);

impl SpotName {
    const MAX_LEN: usize = 10;

    /// Validates and wraps a spot name.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidEditing`] when the name is empty,
    /// longer than ten characters, or contains anything other than
    /// uppercase ASCII letters and digits.
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        if name.is_empty() || name.len() > Self::MAX_LEN {
            return Err(DomainError::InvalidEditing(format!(
                "spot name must be 1 to {} characters",
                Self::MAX_LEN
            )));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        {
            return Err(DomainError::InvalidEditing(
                "spot name must contain only uppercase letters and digits".into(),
            ));
        }
        Ok(Self(name))
    }

    /// The validated name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

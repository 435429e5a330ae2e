//! Domain models for the dental clinic.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// A stored enum value that does not name any known variant.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Closed enums stored and exchanged as fixed strings.
pub trait TextEnum: Sized + Copy + 'static {
    /// Every variant, in declaration order.
    fn variants() -> &'static [Self];

    fn as_text(&self) -> &'static str;

    fn from_text(s: &str) -> Option<Self> {
        Self::variants().iter().copied().find(|v| v.as_text() == s)
    }
}

/// Declares a closed enum whose wire and storage form is a fixed
/// SCREAMING_SNAKE_CASE string.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl $crate::models::TextEnum for $name {
            fn variants() -> &'static [Self] {
                $name::ALL
            }

            fn as_text(&self) -> &'static str {
                self.as_str()
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::models::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err($crate::models::UnknownVariant {
                        kind: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

mod anamnesis;
mod appointment;
mod attachment;
mod finance;
mod inventory;
mod odontogram;
mod patient;
mod task;
mod user;

pub use anamnesis::*;
pub use appointment::*;
pub use attachment::*;
pub use finance::*;
pub use inventory::*;
pub use odontogram::*;
pub use patient::*;
pub use task::*;
pub use user::*;

/// Current time truncated to millisecond precision, which is what storage keeps.
pub fn timestamp_now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::<Utc>::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Fresh random identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

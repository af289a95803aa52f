//! Macro for implementing Display and FromStr for string-keyed enums
//!
//! Provider kinds, repeat modes and similar enums travel through config files
//! and action payloads as lowercase strings. The macro below derives both
//! directions of that mapping from a single table.
//!
//! # Example
//!
//! ```rust
//! use actionarc_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum RepeatMode {
//!     Off,
//!     Track,
//!     Context,
//! }
//!
//! impl_domain_status_conversions!(RepeatMode {
//!     Off => "off",
//!     Track => "track",
//!     Context => "context",
//! });
//! ```

/// Implements `as_str`, `Display` and case-insensitive `FromStr` for a unit enum.
///
/// Parsing failures return `"Invalid <EnumName>: <input>"`.
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

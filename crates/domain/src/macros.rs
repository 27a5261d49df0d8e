//! Macro for implementing Display and FromStr for status enums
//!
//! Task runtimes and batch results report their states as fixed strings
//! (`"PENDING"`, `"success"`, `"timeout"`, ...). This macro keeps each enum's
//! wire string in one place and gives case-insensitive parsing for free.
//!
//! # Example
//!
//! ```rust
//! use jobwarden_domain::impl_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Lane {
//!     Fast,
//!     Slow,
//! }
//!
//! impl_status_conversions!(Lane {
//!     Fast => "FAST",
//!     Slow => "SLOW",
//! });
//!
//! assert_eq!(Lane::Fast.to_string(), "FAST");
//! assert_eq!("slow".parse::<Lane>(), Ok(Lane::Slow));
//! ```

/// Implements `Display`, `FromStr` and `as_str` for status enums
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their canonical string
///
/// `Display` writes the canonical string exactly as given. `FromStr` accepts
/// any ASCII casing of it.
#[macro_export]
macro_rules! impl_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical string representation
            pub const fn as_str(&self) -> &'static str {
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

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($str) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }
    };
}

//! Wire-name conversions for status enums
//!
//! Health status, alert severity and route class all travel as lowercase
//! strings (headers, query parameters, JSON). This macro gives each enum an
//! `as_str`, a `Display` and a case-insensitive `FromStr` from one mapping.
//!
//! # Example
//!
//! ```rust
//! use lorekeep_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum ProbeOutcome {
//!     Ok,
//!     TimedOut,
//! }
//!
//! impl_domain_status_conversions!(ProbeOutcome {
//!     Ok => "ok",
//!     TimedOut => "timed_out",
//! });
//!
//! assert_eq!(ProbeOutcome::TimedOut.as_str(), "timed_out");
//! assert_eq!("OK".parse::<ProbeOutcome>(), Ok(ProbeOutcome::Ok));
//! ```

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum.
///
/// Parsing trims surrounding whitespace and ignores case. The error is a
/// message naming the enum and the rejected input.
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Lowercase wire name.
            #[must_use]
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

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

//! Character policies and password lengths
//!
//! A policy names the character classes a generated password may draw from.
//! The set is closed: anything that doesn't parse into [`Policy`] is rejected
//! up front rather than generating from an empty alphabet.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const PUNCTUATION: &[u8] = b"!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

const LETTERS_DIGITS: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const LETTERS_DIGITS_PUNCTUATION: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// Shortest password the generator accepts
pub const MIN_LENGTH: u16 = 1;
/// Longest password the generator accepts
pub const MAX_LENGTH: u16 = 999;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Unknown policy '{0}' (expected one of: basic, medium, advanced, uppercase, lowercase, numbers, symbols)")]
    Unknown(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LengthError {
    #[error("Length must be between 1 and 999, got {0}")]
    OutOfRange(u64),

    #[error("Length must be a whole number, got '{0}'")]
    NotANumber(String),
}

/// Character policy for generated passwords
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Lowercase letters only
    Basic,
    /// Upper and lowercase letters plus digits
    Medium,
    /// Letters, digits and punctuation
    Advanced,
    /// Uppercase letters only
    Uppercase,
    /// Lowercase letters only
    Lowercase,
    /// Digits only
    Numbers,
    /// Punctuation only
    Symbols,
}

impl Policy {
    /// Every policy, in menu order
    pub const ALL: [Policy; 7] = [
        Policy::Basic,
        Policy::Medium,
        Policy::Advanced,
        Policy::Uppercase,
        Policy::Lowercase,
        Policy::Numbers,
        Policy::Symbols,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::Basic => "basic",
            Policy::Medium => "medium",
            Policy::Advanced => "advanced",
            Policy::Uppercase => "uppercase",
            Policy::Lowercase => "lowercase",
            Policy::Numbers => "numbers",
            Policy::Symbols => "symbols",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Policy::Basic => "Lowercase letters only",
            Policy::Medium => "Letters (upper/lower) + digits",
            Policy::Advanced => "Letters + digits + symbols",
            Policy::Uppercase => "Uppercase letters only",
            Policy::Lowercase => "Lowercase letters only",
            Policy::Numbers => "Digits only",
            Policy::Symbols => "Symbols only",
        }
    }

    /// The characters this policy draws from. All ASCII, no duplicates.
    pub fn charset(&self) -> &'static [u8] {
        match self {
            Policy::Basic | Policy::Lowercase => LOWERCASE,
            Policy::Medium => LETTERS_DIGITS,
            Policy::Advanced => LETTERS_DIGITS_PUNCTUATION,
            Policy::Uppercase => UPPERCASE,
            Policy::Numbers => DIGITS,
            Policy::Symbols => PUNCTUATION,
        }
    }

    /// Check whether a character belongs to this policy
    pub fn allows(&self, c: char) -> bool {
        c.is_ascii() && self.charset().contains(&(c as u8))
    }
}

impl FromStr for Policy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Policy::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PolicyError::Unknown(s.to_string()))
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A password length, guaranteed to be within `MIN_LENGTH..=MAX_LENGTH`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u16")]
pub struct Length(u16);

impl Length {
    /// Length used when nothing else is configured
    pub const DEFAULT: Length = Length(16);

    pub fn new(n: u16) -> Result<Self, LengthError> {
        if (MIN_LENGTH..=MAX_LENGTH).contains(&n) {
            Ok(Self(n))
        } else {
            Err(LengthError::OutOfRange(n.into()))
        }
    }

    pub fn get(&self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u64> for Length {
    type Error = LengthError;

    fn try_from(n: u64) -> Result<Self, Self::Error> {
        u16::try_from(n)
            .map_err(|_| LengthError::OutOfRange(n))
            .and_then(Length::new)
    }
}

impl From<Length> for u16 {
    fn from(len: Length) -> u16 {
        len.0
    }
}

impl FromStr for Length {
    type Err = LengthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LengthError::NotANumber(s.to_string()));
        }
        // Digits only, so a parse failure here means overflow
        let n: u64 = s.parse().map_err(|_| LengthError::OutOfRange(u64::MAX))?;
        Length::try_from(n)
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

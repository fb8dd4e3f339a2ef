//! Bluetooth device addresses.
//!
//! The key device is identified by its radio MAC address. Users may type it in
//! any of the common notations:
//!
//! - `AB:CD:EF:12:34:56` (colon separated)
//! - `ab-cd-ef-12-34-56` (dash separated)
//! - `abcd.ef12.3456` (dotted, as printed by some network gear)
//!
//! Whatever the input notation, a [`DeviceAddress`] always renders in the
//! upper-case colon form that `l2ping` expects.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Matches six hex octets separated by `:`/`-`, or three dotted groups of four.
///
/// Both alternatives are anchored so trailing garbage is rejected.
static MAC_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?:[0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}$",
        r"|^[0-9A-Fa-f]{4}\.[0-9A-Fa-f]{4}\.[0-9A-Fa-f]{4}$",
    ))
    .expect("MAC address regex is valid")
});

/// Example shown to users who pass a malformed address.
pub const EXAMPLE_ADDRESS: &str = "AB:CD:EF:12:34:56";

/// Errors produced while parsing a device address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The input was empty or only whitespace.
    #[error(
        "Device address is empty. Pass the key device's MAC address, e.g. {ex}",
        ex = EXAMPLE_ADDRESS
    )]
    Empty,

    /// The input does not look like a MAC address.
    #[error(
        "Invalid MAC address '{0}'. Please retry with this format: {ex}",
        ex = EXAMPLE_ADDRESS
    )]
    Malformed(String),
}

/// Returns `true` if `address` is a syntactically valid MAC address.
#[must_use]
pub fn is_valid_mac_address(address: &str) -> bool {
    MAC_REGEX.is_match(address)
}

/// A validated Bluetooth device address.
///
/// Constructed once at startup and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceAddress([u8; 6]);

impl DeviceAddress {
    /// Parse and validate a user-supplied address.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError`] if the input is empty or malformed.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AddressError::Empty);
        }
        if !is_valid_mac_address(trimmed) {
            return Err(AddressError::Malformed(trimmed.to_string()));
        }

        let hex: String = trimmed.chars().filter(char::is_ascii_hexdigit).collect();
        let mut octets = [0u8; 6];
        for (octet, pair) in octets.iter_mut().zip(hex.as_bytes().chunks(2)) {
            let pair = std::str::from_utf8(pair)
                .map_err(|_| AddressError::Malformed(trimmed.to_string()))?;
            *octet = u8::from_str_radix(pair, 16)
                .map_err(|_| AddressError::Malformed(trimmed.to_string()))?;
        }

        Ok(Self(octets))
    }

    /// The raw address bytes, most significant first.
    #[must_use]
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for DeviceAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

//! IPv4 address and CIDR utilities.
//!
//! Provides [`Ipv4`] for `addr/prefix` pairs and [`derive_range`], which
//! computes the default active lease range of a subnet created from an
//! interface address.

use crate::error::{ConsoleError, Result};
use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Maximum length for an IPv4 prefix (32 bits).
pub const MAX_LENGTH: u8 = 32;

fn check_len(len: u8) -> Result<()> {
    if len > MAX_LENGTH {
        Err(ConsoleError::InvalidInput(format!(
            "prefix length {len} is longer than {MAX_LENGTH}"
        )))
    } else {
        Ok(())
    }
}

/// Convert a CIDR prefix length to a subnet mask as u32.
///
/// # Examples
/// ```
/// use provision_console::models::get_cidr_mask;
/// assert_eq!(get_cidr_mask(24).unwrap(), 0xFFFFFF00);
/// ```
pub fn get_cidr_mask(len: u8) -> Result<u32> {
    check_len(len)?;
    let right_len = MAX_LENGTH - len;
    let all_bits = u32::MAX as u64;
    Ok(((all_bits >> right_len) << right_len) as u32)
}

/// Network (lowest) address for a given IP and prefix length.
pub fn cut_addr(addr: Ipv4Addr, len: u8) -> Result<Ipv4Addr> {
    let mask = get_cidr_mask(len)?;
    Ok(Ipv4Addr::from(u32::from(addr) & mask))
}

/// Broadcast (highest) address for a given IP and prefix length.
pub fn broadcast_addr(addr: Ipv4Addr, len: u8) -> Result<Ipv4Addr> {
    let mask = get_cidr_mask(len)?;
    Ok(Ipv4Addr::from((u32::from(addr) & mask) | !mask))
}

/// Parse a dotted quad strictly: four decimal octets, each 0..=255.
pub fn parse_octets(address: &str) -> Result<[u8; 4]> {
    let invalid = || ConsoleError::InvalidInput(format!("invalid IPv4 address '{address}'"));
    let parts: Vec<&str> = address.trim().split('.').collect();
    if parts.len() != 4 {
        return Err(invalid());
    }
    let mut octets = [0u8; 4];
    for (octet, part) in octets.iter_mut().zip(parts) {
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        *octet = part.parse().map_err(|_| invalid())?;
    }
    Ok(octets)
}

/// Compute the inclusive `(low, high)` range of the subnet holding `address`.
///
/// The prefix is consumed one octet at a time: each octet keeps its top
/// `min(remaining, 8)` bits for `low` and sets the rest for `high`.
///
/// # Examples
/// ```
/// use provision_console::models::derive_range;
/// use std::net::Ipv4Addr;
/// let (lo, hi) = derive_range("192.168.1.200", 30).unwrap();
/// assert_eq!(lo, Ipv4Addr::new(192, 168, 1, 200));
/// assert_eq!(hi, Ipv4Addr::new(192, 168, 1, 203));
/// ```
pub fn derive_range(address: &str, prefix: u8) -> Result<(Ipv4Addr, Ipv4Addr)> {
    check_len(prefix)?;
    let octets = parse_octets(address)?;

    let mut remaining = prefix;
    let mut low = [0u8; 4];
    let mut high = [0u8; 4];
    for i in 0..4 {
        let n = remaining.min(8);
        let span = 1u16 << (8 - n);
        let masked = u16::from(octets[i]) & (256 - span);
        low[i] = masked as u8;
        high[i] = (masked + span - 1) as u8;
        remaining -= n;
    }
    log::trace!("derive_range({address}/{prefix}) => {low:?}..{high:?}");
    Ok((Ipv4Addr::from(low), Ipv4Addr::from(high)))
}

/// Same as [`derive_range`] for an `"a.b.c.d/nn"` string.
pub fn derive_range_cidr(addr_cidr: &str) -> Result<(Ipv4Addr, Ipv4Addr)> {
    let (address, prefix) = split_cidr(addr_cidr)?;
    derive_range(address, prefix)
}

fn split_cidr(addr_cidr: &str) -> Result<(&str, u8)> {
    let addr_cidr = addr_cidr.trim();
    let (address, prefix) = addr_cidr.split_once('/').ok_or_else(|| {
        ConsoleError::InvalidInput(format!("missing '/prefix' in '{addr_cidr}'"))
    })?;
    let prefix: u8 = prefix
        .parse()
        .map_err(|_| ConsoleError::InvalidInput(format!("invalid prefix in '{addr_cidr}'")))?;
    check_len(prefix)?;
    Ok((address, prefix))
}

/// IPv4 address with a prefix length, e.g. an interface address.
#[derive(Eq, Ord, PartialOrd, PartialEq, Debug, Copy, Clone, Hash)]
pub struct Ipv4 {
    /// The IPv4 address.
    pub addr: Ipv4Addr,
    /// The prefix length (0-32).
    pub mask: u8,
}

impl Ipv4 {
    /// Create a new [`Ipv4`] from a CIDR string (e.g. "10.0.0.5/24").
    pub fn new(addr_cidr: &str) -> Result<Ipv4> {
        let (address, mask) = split_cidr(addr_cidr)?;
        Ok(Ipv4 {
            addr: Ipv4Addr::from(parse_octets(address)?),
            mask,
        })
    }

    /// Lowest address of the subnet.
    pub fn lo(&self) -> Ipv4Addr {
        // mask is validated on construction
        cut_addr(self.addr, self.mask).unwrap_or(self.addr)
    }

    /// Highest address of the subnet.
    pub fn hi(&self) -> Ipv4Addr {
        broadcast_addr(self.addr, self.mask).unwrap_or(self.addr)
    }

    /// Default active lease range for a subnet created from this address.
    pub fn active_range(&self) -> Result<(Ipv4Addr, Ipv4Addr)> {
        derive_range(&self.addr.to_string(), self.mask)
    }
}

impl FromStr for Ipv4 {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Ipv4> {
        Ipv4::new(s)
    }
}

impl Serialize for Ipv4 {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Ipv4 {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Ipv4, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ipv4::new(&s).map_err(de::Error::custom)
    }
}

impl std::fmt::Display for Ipv4 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.addr, self.mask)
    }
}

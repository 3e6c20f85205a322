// File: prefix.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    pub fn max_len(self) -> u8 {
        match self {
            AddressFamily::Ipv4 => 32,
            AddressFamily::Ipv6 => 128,
        }
    }

    pub(crate) fn tag(self) -> u8 {
        match self {
            AddressFamily::Ipv4 => 4,
            AddressFamily::Ipv6 => 6,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            4 => Some(AddressFamily::Ipv4),
            6 => Some(AddressFamily::Ipv6),
            _ => None,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::Ipv4 => write!(f, "IPv4"),
            AddressFamily::Ipv6 => write!(f, "IPv6"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefixParseError {
    MissingLength(String),
    InvalidAddress(String),
    InvalidLength(String),
    LengthOutOfRange { input: String, max: u8 },
    HostBitsSet(String),
}

impl fmt::Display for PrefixParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingLength(input) => write!(f, "Missing prefix length in '{}'", input),
            Self::InvalidAddress(input) => write!(f, "Invalid address in '{}'", input),
            Self::InvalidLength(input) => write!(f, "Invalid prefix length in '{}'", input),
            Self::LengthOutOfRange { input, max } => {
                write!(f, "Prefix length in '{}' exceeds {}", input, max)
            }
            Self::HostBitsSet(input) => {
                write!(f, "Address bits set beyond the mask in '{}'", input)
            }
        }
    }
}

impl std::error::Error for PrefixParseError {}

/// A canonical CIDR block. IPv4 addresses live in the low 32 bits of `bits`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Prefix {
    family: AddressFamily,
    bits: u128,
    len: u8,
}

fn mask(family: AddressFamily, len: u8) -> u128 {
    if len == 0 {
        return 0;
    }
    match family {
        AddressFamily::Ipv4 => u128::from(u32::MAX << (32 - u32::from(len))),
        AddressFamily::Ipv6 => u128::MAX << (128 - u32::from(len)),
    }
}

impl Prefix {
    /// Builds a prefix, rejecting lengths beyond the family width and
    /// addresses with bits set past the mask.
    pub fn new(addr: IpAddr, len: u8) -> Result<Self, PrefixParseError> {
        let (family, bits) = match addr {
            IpAddr::V4(v4) => (AddressFamily::Ipv4, u128::from(u32::from(v4))),
            IpAddr::V6(v6) => (AddressFamily::Ipv6, u128::from(v6)),
        };
        let input = format!("{}/{}", addr, len);
        if len > family.max_len() {
            return Err(PrefixParseError::LengthOutOfRange {
                input,
                max: family.max_len(),
            });
        }
        if bits & !mask(family, len) != 0 {
            return Err(PrefixParseError::HostBitsSet(input));
        }
        Ok(Self { family, bits, len })
    }

    pub(crate) fn from_raw(family: AddressFamily, bits: u128, len: u8) -> Option<Self> {
        if len > family.max_len() || bits & !mask(family, len) != 0 {
            return None;
        }
        if family == AddressFamily::Ipv4 && bits > u128::from(u32::MAX) {
            return None;
        }
        Some(Self { family, bits, len })
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn length(&self) -> u8 {
        self.len
    }

    pub(crate) fn bits(&self) -> u128 {
        self.bits
    }

    pub fn addr(&self) -> IpAddr {
        match self.family {
            AddressFamily::Ipv4 => IpAddr::V4(Ipv4Addr::from(self.bits as u32)),
            AddressFamily::Ipv6 => IpAddr::V6(Ipv6Addr::from(self.bits)),
        }
    }

    /// First and last address of the block, as integers of the family.
    pub fn range(&self) -> (u128, u128) {
        let host = !mask(self.family, self.len) & mask(self.family, self.family.max_len());
        (self.bits, self.bits | host)
    }

    /// `self` covers `inner` when both share a family and `inner`'s range
    /// lies inside `self`'s. A prefix covers itself.
    pub fn contains(&self, inner: &Prefix) -> bool {
        let (first, last) = self.range();
        let (inner_first, inner_last) = inner.range();
        self.family == inner.family && first <= inner_first && inner_last <= last
    }

    /// The enclosing prefix of length `len`, or `None` if `len` is longer
    /// than this prefix.
    pub fn supernet(&self, len: u8) -> Option<Prefix> {
        if len > self.len {
            return None;
        }
        Some(Prefix {
            family: self.family,
            bits: self.bits & mask(self.family, len),
            len,
        })
    }

    /// Every prefix that covers this one, most specific first, ending with
    /// the family's default route.
    pub fn covering_prefixes(&self) -> impl Iterator<Item = Prefix> + '_ {
        (0..=self.len).rev().filter_map(move |len| self.supernet(len))
    }
}

/// Orders longer prefixes before shorter ones; ties fall back to family and
/// address so the order is total.
pub fn most_specific_first(a: &Prefix, b: &Prefix) -> Ordering {
    b.len
        .cmp(&a.len)
        .then_with(|| a.family.cmp(&b.family))
        .then_with(|| a.bits.cmp(&b.bits))
}

impl FromStr for Prefix {
    type Err = PrefixParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = s
            .split_once('/')
            .ok_or_else(|| PrefixParseError::MissingLength(s.to_string()))?;
        let addr: IpAddr = addr
            .parse()
            .map_err(|_| PrefixParseError::InvalidAddress(s.to_string()))?;
        if len.is_empty() || !len.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PrefixParseError::InvalidLength(s.to_string()));
        }
        if len.len() > 1 && len.starts_with('0') {
            return Err(PrefixParseError::InvalidLength(s.to_string()));
        }
        let len: u8 = len.parse().map_err(|_| PrefixParseError::LengthOutOfRange {
            input: s.to_string(),
            max: match addr {
                IpAddr::V4(_) => 32,
                IpAddr::V6(_) => 128,
            },
        })?;
        Prefix::new(addr, len).map_err(|e| match e {
            PrefixParseError::LengthOutOfRange { max, .. } => PrefixParseError::LengthOutOfRange {
                input: s.to_string(),
                max,
            },
            PrefixParseError::HostBitsSet(_) => PrefixParseError::HostBitsSet(s.to_string()),
            other => other,
        })
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr(), self.len)
    }
}

impl Serialize for Prefix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

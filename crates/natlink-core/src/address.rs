//! Local address utilities
//!
//! Controllers use these to pick the interfaces they announce on and to
//! sanity check where a discovered gateway lives. Nothing here is cached;
//! every call asks the platform resolver again.
//!
//! # Private ranges
//!
//! Two predicates are provided. [`is_private_ipv4`] is the compatible
//! classifier: the 172.x case tests bit `0x10` of the second octet rather
//! than the numeric range 16..=31, so `172.48.0.1` counts as private while
//! `172.32.0.1` does not. [`is_rfc1918`] is the exact RFC 1918 check.
//! [`PrivateRangeCheck`] selects between them where callers need a knob.

use crate::error::{NatError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};

/// Source of the local host name and its addresses
pub trait HostResolver {
    /// Name of the local host
    ///
    /// # Errors
    ///
    /// Returns an error if the platform cannot report a host name.
    fn host_name(&self) -> io::Result<String>;

    /// Addresses `host` resolves to, in resolver order
    ///
    /// # Errors
    ///
    /// Returns an error if resolution fails.
    fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

/// Resolver backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl HostResolver for SystemResolver {
    fn host_name(&self) -> io::Result<String> {
        hostname::get()?.into_string().map_err(|raw| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("host name is not valid UTF-8: {raw:?}"),
            )
        })
    }

    fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        Ok((host, 0u16).to_socket_addrs()?.map(|sa| sa.ip()).collect())
    }
}

/// Local host addresses using the system resolver
///
/// Returns every IPv4 address, plus IPv6 addresses when `include_ipv6` is
/// set, in resolver order. Duplicates are kept.
///
/// # Errors
///
/// Returns [`NatError::Resolution`] if the host name cannot be obtained or
/// resolved.
pub fn local_addresses(include_ipv6: bool) -> Result<Vec<IpAddr>> {
    local_addresses_with(&SystemResolver, include_ipv6)
}

/// [`local_addresses`] against an explicit resolver
///
/// # Errors
///
/// Returns [`NatError::Resolution`] if the host name cannot be obtained or
/// resolved.
pub fn local_addresses_with<R>(resolver: &R, include_ipv6: bool) -> Result<Vec<IpAddr>>
where
    R: HostResolver + ?Sized,
{
    let host = resolver.host_name().map_err(|source| NatError::Resolution {
        host: String::new(),
        source,
    })?;
    let resolved = resolver
        .resolve(&host)
        .map_err(|source| NatError::Resolution {
            host: host.clone(),
            source,
        })?;

    let addresses: Vec<IpAddr> = resolved
        .into_iter()
        .filter(|addr| addr.is_ipv4() || include_ipv6)
        .collect();

    tracing::debug!(
        host = %host,
        include_ipv6,
        count = addresses.len(),
        "Resolved local addresses"
    );
    Ok(addresses)
}

/// Local IPv4 addresses that `check` classifies as private
///
/// # Errors
///
/// Returns [`NatError::Resolution`] if local resolution fails.
pub fn private_local_addresses<R>(resolver: &R, check: PrivateRangeCheck) -> Result<Vec<Ipv4Addr>>
where
    R: HostResolver + ?Sized,
{
    Ok(local_addresses_with(resolver, false)?
        .into_iter()
        .filter_map(|addr| match addr {
            IpAddr::V4(v4) if check.is_private(v4) => Some(v4),
            _ => None,
        })
        .collect())
}

/// Compatible private-range predicate
///
/// | first octet | extra test | private |
/// |---|---|---|
/// | 10 | none | yes |
/// | 172 | `second & 0x10 != 0` | yes |
/// | 192 | `second == 168` | yes |
/// | other | none | no |
#[must_use]
pub const fn is_private_ipv4(address: Ipv4Addr) -> bool {
    let [first, second, _, _] = address.octets();
    match first {
        10 => true,
        172 => second & 0x10 != 0,
        192 => second == 168,
        _ => false,
    }
}

/// Exact RFC 1918 predicate (10/8, 172.16/12, 192.168/16)
#[must_use]
pub const fn is_rfc1918(address: Ipv4Addr) -> bool {
    let [first, second, _, _] = address.octets();
    matches!((first, second), (10, _) | (172, 16..=31) | (192, 168))
}

/// Classify `address` with the compatible predicate
///
/// # Errors
///
/// Returns [`NatError::UnsupportedAddressFamily`] for IPv6 input.
pub fn is_private_address_space(address: IpAddr) -> Result<bool> {
    match address {
        IpAddr::V4(v4) => Ok(is_private_ipv4(v4)),
        IpAddr::V6(_) => Err(NatError::UnsupportedAddressFamily(address)),
    }
}

/// Which private-range predicate to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivateRangeCheck {
    /// [`is_private_ipv4`]
    #[default]
    Compatible,
    /// [`is_rfc1918`]
    Rfc1918,
}

impl PrivateRangeCheck {
    /// Apply the selected predicate
    #[must_use]
    pub const fn is_private(self, address: Ipv4Addr) -> bool {
        match self {
            Self::Compatible => is_private_ipv4(address),
            Self::Rfc1918 => is_rfc1918(address),
        }
    }

    /// Classify any address
    ///
    /// # Errors
    ///
    /// Returns [`NatError::UnsupportedAddressFamily`] for IPv6 input.
    pub fn classify(self, address: IpAddr) -> Result<bool> {
        match address {
            IpAddr::V4(v4) => Ok(self.is_private(v4)),
            IpAddr::V6(_) => Err(NatError::UnsupportedAddressFamily(address)),
        }
    }
}

impl fmt::Display for PrivateRangeCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compatible => write!(f, "compatible"),
            Self::Rfc1918 => write!(f, "rfc1918"),
        }
    }
}

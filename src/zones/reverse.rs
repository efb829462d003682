//! Translation of IP literals into their reverse-lookup owner names.

use std::fmt::Write as _;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::Error;

pub const IPV4_REVERSE_SUFFIX: &str = "in-addr.arpa.";
pub const IPV6_REVERSE_SUFFIX: &str = "ip6.arpa.";

/// Parse an IP literal.
///
/// # Errors
///
/// If the literal is not a valid IPv4 or IPv6 address.
pub fn parse_address(address: &str) -> Result<IpAddr, Error> {
    address
        .trim()
        .parse()
        .map_err(|_| Error::address_format(address))
}

/// The fully-qualified reverse-lookup name of an IP literal, eg
/// `1.1.168.192.in-addr.arpa.` for `192.168.1.1`.
///
/// # Errors
///
/// If the literal is not a valid IPv4 or IPv6 address.
pub fn reverse_name(address: &str) -> Result<String, Error> {
    Ok(reverse_name_of(parse_address(address)?))
}

pub fn reverse_name_of(address: IpAddr) -> String {
    match address {
        IpAddr::V4(address) => reverse_name_v4(address),
        IpAddr::V6(address) => reverse_name_v6(address),
    }
}

/// Octets in reverse order, under `in-addr.arpa.`.
pub fn reverse_name_v4(address: Ipv4Addr) -> String {
    let mut out = String::with_capacity(29);
    for octet in address.octets().iter().rev() {
        _ = write!(&mut out, "{octet}.");
    }
    out.push_str(IPV4_REVERSE_SUFFIX);
    out
}

/// All 32 nibbles of the fully expanded address in reverse order,
/// lower case, under `ip6.arpa.`.
pub fn reverse_name_v6(address: Ipv6Addr) -> String {
    let mut out = String::with_capacity(73);
    for octet in address.octets().iter().rev() {
        _ = write!(&mut out, "{:x}.{:x}.", octet & 0xf, octet >> 4);
    }
    out.push_str(IPV6_REVERSE_SUFFIX);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_v4() {
        assert_eq!(
            "1.1.168.192.in-addr.arpa.",
            reverse_name("192.168.1.1").unwrap()
        );
        assert_eq!("4.3.2.1.in-addr.arpa.", reverse_name("1.2.3.4").unwrap());
    }

    #[test]
    fn reverse_v6() {
        assert_eq!(
            "1.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.8.b.d.0.1.0.0.2.ip6.arpa.",
            reverse_name("2001:db8::1").unwrap()
        );
    }

    #[test]
    fn reverse_v6_abbreviations_normalise() {
        let canonical = reverse_name("abcd:ef12:0:0:0:0:0:4321").unwrap();

        assert_eq!(canonical, reverse_name("abcd:ef12::4321").unwrap());
        assert_eq!(canonical, reverse_name("ABCD:EF12::4321").unwrap());
        assert_eq!(canonical, reverse_name("AbCd:eF12:0000::0:4321").unwrap());
    }

    #[test]
    fn reverse_v6_leading_and_trailing_double_colon() {
        assert_eq!(
            "1.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.ip6.arpa.",
            reverse_name("::1").unwrap()
        );
        assert_eq!(
            "0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.8.e.f.ip6.arpa.",
            reverse_name("fe80::").unwrap()
        );
    }

    #[test]
    fn reverse_malformed() {
        for bad in ["", "192.168.1", "192.168.1.256", "1::2::3", "gggg::1", "host.example.com"] {
            match reverse_name(bad) {
                Err(Error::AddressFormat { address }) => assert_eq!(bad, address),
                other => panic!("expected address format error for {bad:?}, got {other:?}"),
            }
        }
    }
}

//! Parsing of route-definition lines and CIDR literals
//!
//! Route files are Windows-style batch scripts:
//!
//! ```text
//! route ADD 10.1.0.0 MASK 255.255.0.0 10.1.0.1
//! ```
//!
//! Only lines of exactly that shape are converted; everything else in the
//! file (comments, `@echo off`, blank lines) is silently ignored.

use super::NetworkPrefix;
use ipnetwork::Ipv4Network;
use std::net::Ipv4Addr;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Invalid subnet mask: {0}")]
    InvalidMask(String),
    #[error("Invalid CIDR: {0}")]
    InvalidCidr(String),
}

/// Extract the target address and netmask from a `route ADD` line
///
/// Keywords are matched case-insensitively. Returns `None` for any line that
/// doesn't have the expected shape.
pub fn parse_route_line(line: &str) -> Option<(&str, &str)> {
    let mut fields = line.split_whitespace();
    let (route, add, ip, mask_kw, mask) = (
        fields.next()?,
        fields.next()?,
        fields.next()?,
        fields.next()?,
        fields.next()?,
    );

    if !route.eq_ignore_ascii_case("route")
        || !add.eq_ignore_ascii_case("add")
        || !mask_kw.eq_ignore_ascii_case("mask")
    {
        return None;
    }

    if !looks_like_dotted_quad(ip) || !looks_like_dotted_quad(mask) {
        return None;
    }

    Some((ip, mask))
}

/// Convert an address and dotted netmask into a prefix
///
/// The prefix length is the number of set bits in the mask. Masks with holes
/// (e.g. `255.0.255.0`) are accepted and counted the same way, with a warning.
pub fn convert_mask_pair(ip: &str, mask: &str) -> Result<NetworkPrefix, ParseError> {
    let address = parse_octets(ip).ok_or_else(|| ParseError::InvalidAddress(ip.to_string()))?;
    let netmask = parse_octets(mask).ok_or_else(|| ParseError::InvalidMask(mask.to_string()))?;

    let bits = u32::from(netmask);
    if bits.leading_ones() != bits.count_ones() {
        warn!("Non-contiguous mask {} for {}, using bit count", mask, ip);
    }

    // count_ones() of a u32 is at most 32
    NetworkPrefix::new(address, bits.count_ones() as u8)
        .ok_or_else(|| ParseError::InvalidMask(mask.to_string()))
}

/// Validate a CIDR literal such as `192.168.50.0/24`
///
/// The `/length` part is mandatory; a bare address is rejected rather than
/// read as a /32.
pub fn parse_cidr(text: &str) -> Result<NetworkPrefix, ParseError> {
    let invalid = || ParseError::InvalidCidr(text.to_string());

    let (addr, len) = text.trim().split_once('/').ok_or_else(invalid)?;
    if len.is_empty() || len.len() > 2 || !len.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let address: Ipv4Addr = addr.parse().map_err(|_| invalid())?;
    let length: u8 = len.parse().map_err(|_| invalid())?;
    let network = Ipv4Network::new(address, length).map_err(|_| invalid())?;

    Ok(NetworkPrefix(network))
}

/// Dotted-quad parsing as the route files write it: octets may be zero-padded
/// (`255.255.255.000`), but each must fit in a byte.
fn parse_octets(field: &str) -> Option<Ipv4Addr> {
    let mut octets = [0u8; 4];
    let mut parts = field.split('.');
    for octet in &mut octets {
        let part = parts.next()?;
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *octet = part.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(Ipv4Addr::from(octets))
}

fn looks_like_dotted_quad(field: &str) -> bool {
    let mut octets = 0;
    for part in field.split('.') {
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        octets += 1;
    }
    octets == 4
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert_line(line: &str) -> Option<String> {
        let (ip, mask) = parse_route_line(line)?;
        convert_mask_pair(ip, mask).ok().map(|p| p.to_string())
    }

    #[test]
    fn test_parse_route_line_basic() {
        let parsed = parse_route_line("route ADD 10.1.0.0 MASK 255.255.0.0 10.1.0.1");
        assert_eq!(parsed, Some(("10.1.0.0", "255.255.0.0")));
    }

    #[test]
    fn test_parse_route_line_case_and_whitespace() {
        assert_eq!(
            parse_route_line("  ROUTE add 1.2.3.0   mask 255.255.255.0\r"),
            Some(("1.2.3.0", "255.255.255.0"))
        );
        assert_eq!(
            parse_route_line("Route Add 5.6.0.0\tMask 255.255.0.0 0.0.0.0 metric 5"),
            Some(("5.6.0.0", "255.255.0.0"))
        );
    }

    #[test]
    fn test_parse_route_line_ignores_other_lines() {
        assert_eq!(parse_route_line(""), None);
        assert_eq!(parse_route_line("@echo off"), None);
        assert_eq!(parse_route_line("rem route ADD 1.2.3.0 MASK 255.255.255.0"), None);
        assert_eq!(parse_route_line("route DELETE 1.2.3.0 MASK 255.255.255.0"), None);
        assert_eq!(parse_route_line("route ADD 1.2.3.0 MASK"), None);
        assert_eq!(parse_route_line("route ADD 1.2.3.0 NETMASK 255.255.255.0"), None);
        assert_eq!(parse_route_line("route ADD host.example MASK 255.255.255.0"), None);
        assert_eq!(parse_route_line("route ADD 1.2.3 MASK 255.255.255.0"), None);
        assert_eq!(parse_route_line("route ADD 1.2.3.4.5 MASK 255.255.255.0"), None);
    }

    #[test]
    fn test_convert_mask_pair_prefix_lengths() {
        let cases = [
            ("255.255.255.255", 32),
            ("255.255.255.0", 24),
            ("255.255.254.0", 23),
            ("255.255.0.0", 16),
            ("255.240.0.0", 12),
            ("0.0.0.0", 0),
        ];
        for (mask, expected) in cases {
            let prefix = convert_mask_pair("10.0.0.0", mask).unwrap();
            assert_eq!(prefix.length(), expected, "mask {}", mask);
        }
    }

    #[test]
    fn test_convert_mask_pair_non_contiguous_uses_bit_count() {
        let prefix = convert_mask_pair("10.0.0.0", "255.0.255.0").unwrap();
        assert_eq!(prefix.to_string(), "10.0.0.0/16");
    }

    #[test]
    fn test_convert_mask_pair_keeps_host_bits() {
        let prefix = convert_mask_pair("10.1.2.3", "255.255.255.0").unwrap();
        assert_eq!(prefix.to_string(), "10.1.2.3/24");
    }

    #[test]
    fn test_convert_mask_pair_errors() {
        assert_eq!(
            convert_mask_pair("300.0.0.1", "255.255.255.0"),
            Err(ParseError::InvalidAddress("300.0.0.1".to_string()))
        );
        assert_eq!(
            convert_mask_pair("10.0.0.1", "255.255.256.0"),
            Err(ParseError::InvalidMask("255.255.256.0".to_string()))
        );
    }

    #[test]
    fn test_zero_padded_octets() {
        assert_eq!(
            convert_line("route ADD 10.1.0.0 MASK 255.255.255.000 10.1.0.1"),
            Some("10.1.0.0/24".to_string())
        );
        assert_eq!(
            convert_line("route ADD 010.001.000.000 MASK 255.255.000.000"),
            Some("10.1.0.0/16".to_string())
        );
        assert_eq!(convert_line("route ADD 10.1.0.0 MASK 255.255.256.000"), None);
    }

    #[test]
    fn test_unparsable_address_in_line_yields_nothing() {
        assert_eq!(convert_line("route ADD 999.1.1.1 MASK 255.255.255.0"), None);
    }

    #[test]
    fn test_convert_line_end_to_end() {
        assert_eq!(
            convert_line("route ADD 10.1.0.0 MASK 255.255.0.0 10.1.0.1"),
            Some("10.1.0.0/16".to_string())
        );
    }

    #[test]
    fn test_parse_cidr_valid() {
        assert_eq!(parse_cidr("192.168.50.0/24").unwrap().to_string(), "192.168.50.0/24");
        assert_eq!(parse_cidr(" 0.0.0.0/0 ").unwrap().length(), 0);
        assert_eq!(parse_cidr("8.8.8.8/32").unwrap().length(), 32);
    }

    #[test]
    fn test_parse_cidr_invalid() {
        for text in [
            "192.168.50.0",
            "192.168.50.0/",
            "192.168.50.0/33",
            "192.168.50.0/+8",
            "192.168.50.0/-1",
            "192.168.50/24",
            "not-a-cidr",
            "2001:db8::/32",
            "10.0.0.0/8/8",
        ] {
            assert_eq!(
                parse_cidr(text),
                Err(ParseError::InvalidCidr(text.to_string())),
                "{}",
                text
            );
        }
    }
}

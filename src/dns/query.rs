//! Minimal DNS query encoding.
//!
//! Builds the smallest valid RFC 1035 message that asks for the A record
//! of a hostname: a 12-byte header with one question, no compression, no
//! EDNS0 and no additional records.

use crate::config::validate_hostname;
use crate::error::Result;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Size of the fixed DNS header in bytes.
pub const HEADER_LEN: usize = 12;

/// Flags word for a standard query with recursion desired.
const FLAGS_STANDARD_QUERY: u16 = 0x0100;

/// QTYPE for an IPv4 address record.
const QTYPE_A: u16 = 1;

/// QCLASS for the Internet class.
const QCLASS_IN: u16 = 1;

/// Encode an A/IN query for an already-validated hostname.
///
/// Only the transaction ID (first two bytes) is random; everything else is
/// a pure function of the hostname.
#[must_use]
pub fn encode(hostname: &str) -> Vec<u8> {
    encode_with_id(rand::random::<u16>(), hostname)
}

/// Encode an A/IN query with an explicit transaction ID.
#[must_use]
pub fn encode_with_id(id: u16, hostname: &str) -> Vec<u8> {
    let name = hostname.trim_end_matches('.');
    let mut buf = Vec::with_capacity(HEADER_LEN + name.len() + 6);

    buf.extend_from_slice(&id.to_be_bytes());
    buf.extend_from_slice(&FLAGS_STANDARD_QUERY.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes()); // QDCOUNT
    buf.extend_from_slice(&[0u8; 6]); // ANCOUNT, NSCOUNT, ARCOUNT

    for label in name.split('.').filter(|l| !l.is_empty()) {
        buf.push(label.len() as u8);
        buf.extend_from_slice(label.as_bytes());
    }
    buf.push(0);

    buf.extend_from_slice(&QTYPE_A.to_be_bytes());
    buf.extend_from_slice(&QCLASS_IN.to_be_bytes());
    buf
}

/// Validate the hostname, then encode it.
///
/// # Errors
///
/// Returns a validation error if the hostname is malformed.
pub fn encode_checked(hostname: &str) -> Result<Vec<u8>> {
    let hostname = validate_hostname(hostname)?;
    Ok(encode(&hostname))
}

/// Encode a query message for the `dns` GET parameter (RFC 8484).
#[must_use]
pub fn to_base64url(message: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(message)
}

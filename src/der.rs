//! # Minimal DER encoder for RSA public keys
//!
//! Builds the X.509 `SubjectPublicKeyInfo` for an RSA key from its raw
//! big-endian modulus and exponent, as published in a JWK:
//!
//! ```text
//! SubjectPublicKeyInfo ::= SEQUENCE {
//!     algorithm         AlgorithmIdentifier,   -- rsaEncryption, NULL parameters
//!     subjectPublicKey  BIT STRING             -- wraps RSAPublicKey
//! }
//!
//! RSAPublicKey ::= SEQUENCE {
//!     modulus           INTEGER,
//!     publicExponent    INTEGER
//! }
//! ```
//!
//! ## Length encoding
//! - **Short form**: lengths up to 127 are a single byte
//! - **Long form**: `0x80 | k` followed by the length in `k` big-endian bytes
//!
//! The module only produces bytes; it has no knowledge of signatures, so it
//! can be checked against any ASN.1 decoder on its own.

use base64::engine::general_purpose;
use base64::Engine as _;

/// Tag of an ASN.1 INTEGER.
pub const TAG_INTEGER: u8 = 0x02;
/// Tag of an ASN.1 BIT STRING.
pub const TAG_BIT_STRING: u8 = 0x03;
/// Tag of a constructed ASN.1 SEQUENCE.
pub const TAG_SEQUENCE: u8 = 0x30;

/// DER `AlgorithmIdentifier` for `rsaEncryption` (OID 1.2.840.113549.1.1.1)
/// with NULL parameters.
pub const RSA_ENCRYPTION_ALGORITHM_ID: [u8; 15] = [
    0x30, 0x0d, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01, 0x05, 0x00,
];

/// PEM label of a `SubjectPublicKeyInfo`.
pub const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";

const PEM_LINE_WIDTH: usize = 64;

/// Encodes a DER length prefix.
pub fn encode_length(len: usize) -> Vec<u8> {
    if len <= 0x7f {
        return vec![len as u8];
    }

    let be = len.to_be_bytes();
    let first = be.iter().position(|&b| b != 0).unwrap_or(be.len() - 1);
    let significant = &be[first..];

    let mut out = Vec::with_capacity(1 + significant.len());
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(significant);
    out
}

/// Encodes a tag-length-value triple.
pub fn encode_tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let len = encode_length(content.len());
    let mut out = Vec::with_capacity(1 + len.len() + content.len());
    out.push(tag);
    out.extend_from_slice(&len);
    out.extend_from_slice(content);
    out
}

/// Encodes an unsigned big-endian integer as a DER INTEGER.
///
/// Redundant leading zero bytes are dropped, then a single `0x00` is
/// prepended when the most significant bit is set so the value stays
/// non-negative.
pub fn encode_integer(unsigned_be: &[u8]) -> Vec<u8> {
    let first = unsigned_be
        .iter()
        .position(|&b| b != 0)
        .unwrap_or(unsigned_be.len());
    let magnitude = &unsigned_be[first..];

    let mut content = Vec::with_capacity(magnitude.len() + 1);
    match magnitude.first() {
        None => content.push(0x00),
        Some(&msb) if msb > 0x7f => {
            content.push(0x00);
            content.extend_from_slice(magnitude);
        }
        Some(_) => content.extend_from_slice(magnitude),
    }

    encode_tlv(TAG_INTEGER, &content)
}

/// Encodes a SEQUENCE over already-encoded elements.
pub fn encode_sequence(elements: &[&[u8]]) -> Vec<u8> {
    encode_tlv(TAG_SEQUENCE, &elements.concat())
}

/// Encodes a BIT STRING with zero unused bits.
pub fn encode_bit_string(bytes: &[u8]) -> Vec<u8> {
    let mut content = Vec::with_capacity(bytes.len() + 1);
    content.push(0x00);
    content.extend_from_slice(bytes);
    encode_tlv(TAG_BIT_STRING, &content)
}

/// PKCS#1 `RSAPublicKey` for the given modulus and exponent.
pub fn rsa_public_key(modulus: &[u8], exponent: &[u8]) -> Vec<u8> {
    let n = encode_integer(modulus);
    let e = encode_integer(exponent);
    encode_sequence(&[&n, &e])
}

/// X.509 `SubjectPublicKeyInfo` for the given modulus and exponent.
pub fn subject_public_key_info(modulus: &[u8], exponent: &[u8]) -> Vec<u8> {
    let rsa_key = rsa_public_key(modulus, exponent);
    let bit_string = encode_bit_string(&rsa_key);
    encode_sequence(&[&RSA_ENCRYPTION_ALGORITHM_ID, &bit_string])
}

/// Frames DER bytes as PEM text.
pub fn pem_encode(der: &[u8], label: &str) -> String {
    let body = general_purpose::STANDARD.encode(der);

    let mut pem = String::with_capacity(body.len() + body.len() / PEM_LINE_WIDTH + 2 * label.len() + 32);
    pem.push_str("-----BEGIN ");
    pem.push_str(label);
    pem.push_str("-----\n");
    // base64 output is ASCII, so byte chunks are valid UTF-8
    for line in body.as_bytes().chunks(PEM_LINE_WIDTH) {
        pem.push_str(std::str::from_utf8(line).unwrap_or_default());
        pem.push('\n');
    }
    pem.push_str("-----END ");
    pem.push_str(label);
    pem.push_str("-----\n");
    pem
}

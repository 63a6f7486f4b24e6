//! Keyed message digests over canonically ordered key-value data.
//!
//! All three gateways authenticate requests and callbacks with an HMAC over some canonical rendering of the payload.
//! The renderings differ per gateway, but the digest and comparison logic is shared and lives here.
//!
//! Signatures are rendered as lowercase hex. Verification is case-insensitive and runs in constant time: the candidate
//! is hex-decoded and checked with [`Mac::verify_slice`].
use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha512};
use thiserror::Error;
use url::form_urlencoded;

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashAlgorithm {
    HmacSha256,
    HmacSha512,
}

#[derive(Debug, Clone, Error)]
pub enum SignatureError {
    #[error("The signing key was rejected: {0}")]
    InvalidKey(String),
}

/// Signs `canonical` with `key` and returns the digest as lowercase hex.
pub fn sign(key: &str, canonical: &str, algorithm: HashAlgorithm) -> Result<String, SignatureError> {
    let digest = match algorithm {
        HashAlgorithm::HmacSha256 => {
            let mut mac = new_mac::<HmacSha256>(key)?;
            mac.update(canonical.as_bytes());
            mac.finalize().into_bytes().to_vec()
        },
        HashAlgorithm::HmacSha512 => {
            let mut mac = new_mac::<HmacSha512>(key)?;
            mac.update(canonical.as_bytes());
            mac.finalize().into_bytes().to_vec()
        },
    };
    Ok(hex::encode(digest))
}

/// Returns true if `candidate` is the hex-encoded signature of `canonical` under `key`.
///
/// Candidates that are not valid hex never verify.
pub fn verify(candidate: &str, key: &str, canonical: &str, algorithm: HashAlgorithm) -> bool {
    let Ok(candidate) = hex::decode(candidate.trim().to_ascii_lowercase()) else {
        return false;
    };
    match algorithm {
        HashAlgorithm::HmacSha256 => new_mac::<HmacSha256>(key)
            .map(|mut mac| {
                mac.update(canonical.as_bytes());
                mac.verify_slice(&candidate).is_ok()
            })
            .unwrap_or(false),
        HashAlgorithm::HmacSha512 => new_mac::<HmacSha512>(key)
            .map(|mut mac| {
                mac.update(canonical.as_bytes());
                mac.verify_slice(&candidate).is_ok()
            })
            .unwrap_or(false),
    }
}

fn new_mac<M: Mac + hmac::digest::KeyInit>(key: &str) -> Result<M, SignatureError> {
    <M as Mac>::new_from_slice(key.as_bytes()).map_err(|e| SignatureError::InvalidKey(e.to_string()))
}

/// Builds the form-encoded canonical string used by the redirect gateway.
///
/// Empty values and any key listed in `exclude` are dropped. The remaining pairs are sorted by key (ordinal byte
/// order), form-url-encoded (spaces become `+`) and joined with `&`.
pub fn canonical_query<'a, I>(fields: I, exclude: &[&str]) -> String
where I: IntoIterator<Item = (&'a str, &'a str)> {
    let sorted = sorted_fields(fields, exclude);
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (k, v) in sorted {
        serializer.append_pair(k, v);
    }
    serializer.finish()
}

/// Builds a canonical string from sorted, non-empty fields, joined as raw `key=value` pairs with no encoding.
pub fn raw_canonical<'a, I>(fields: I, exclude: &[&str]) -> String
where I: IntoIterator<Item = (&'a str, &'a str)> {
    sorted_fields(fields, exclude).into_iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&")
}

/// Joins the pairs in exactly the order given, without sorting, filtering or encoding.
pub fn ordered_canonical<'a, I>(fields: I) -> String
where I: IntoIterator<Item = (&'a str, &'a str)> {
    fields.into_iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&")
}

fn sorted_fields<'a, I>(fields: I, exclude: &[&str]) -> BTreeMap<&'a str, &'a str>
where I: IntoIterator<Item = (&'a str, &'a str)> {
    fields.into_iter().filter(|(k, v)| !v.is_empty() && !exclude.contains(k)).collect()
}

//! Request and delivery signatures.
//!
//! Upload requests are signed by hashing the sorted `key=value` parameter
//! string with the API secret appended (SHA-256, hex). Delivery URLs carry a
//! `s--<sig>--` component: the first 32 characters of the URL-safe base64
//! SHA-256 of the signed path with the secret appended.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use doclink_core::DeliveryDescriptor;

/// Length of the delivery signature embedded in URLs.
const DELIVERY_SIGNATURE_LEN: usize = 32;

/// Transformation component that asks browsers to render the object.
pub const INLINE_FLAG: &str = "fl_inline";

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

/// Sign API request parameters.
///
/// Empty values are skipped. Keys are sorted, so callers may build the map
/// in any order.
pub fn sign_params(params: &BTreeMap<&str, String>, secret: &str) -> String {
    let to_sign = params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(secret.as_bytes());
    to_hex(&hasher.finalize())
}

/// Signature component for a delivery path.
pub fn delivery_signature(to_sign: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(secret.as_bytes());
    let mut encoded = URL_SAFE_NO_PAD.encode(hasher.finalize());
    encoded.truncate(DELIVERY_SIGNATURE_LEN);
    encoded
}

/// Build a signed delivery URL for `descriptor`.
///
/// Layout:
/// `{delivery}/{cloud}/{resource}/{type}/s--{sig}--[/fl_inline]/v{version}/{object_id}`.
/// The version is not part of the signed string.
pub fn signed_delivery_url(
    delivery_base: &str,
    cloud_name: &str,
    descriptor: &DeliveryDescriptor,
    inline: bool,
    secret: &str,
) -> String {
    let to_sign = if inline {
        format!("{INLINE_FLAG}/{}", descriptor.object_id)
    } else {
        descriptor.object_id.clone()
    };
    let signature = delivery_signature(&to_sign, secret);

    let mut url = format!(
        "{delivery_base}/{cloud_name}/{}/{}/s--{signature}--",
        descriptor.resource_category.storage_resource_type(),
        descriptor.access_type.as_str(),
    );
    if inline {
        url.push('/');
        url.push_str(INLINE_FLAG);
    }
    if let Some(version) = descriptor.version {
        let _ = write!(url, "/v{version}");
    }
    url.push('/');
    url.push_str(&descriptor.object_id);
    url
}

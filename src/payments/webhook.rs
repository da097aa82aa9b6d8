//! Parsing of the PIX provider's push notifications.
//!
//! The provider has sent several payload shapes over time; the extractors
//! below are tried in order and the first txid found wins.

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub const SIGNATURE_HEADERS: [&str; 2] = ["x-efibank-signature", "x-gerencianet-signature"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaidNotice {
    pub txid: String,
    pub paid_at: Option<DateTime<Utc>>,
}

type Extractor = fn(&Value) -> Option<&str>;

const EXTRACTORS: [(&str, Extractor); 3] = [
    ("pix-array", pix_array_txid),
    ("event", event_txid),
    ("top-level", top_level_txid),
];

/// `{"pix": [{"txid": "...", "horario": "..."}]}`
fn pix_array_txid(payload: &Value) -> Option<&str> {
    payload.get("pix")?.as_array()?.first()?.get("txid")?.as_str()
}

/// `{"event": "payment.succeeded", "data": {"txid": "..."}}`
fn event_txid(payload: &Value) -> Option<&str> {
    if payload.get("event")?.as_str()? != "payment.succeeded" {
        return None;
    }
    payload.get("data")?.get("txid")?.as_str()
}

fn top_level_txid(payload: &Value) -> Option<&str> {
    payload.get("txid")?.as_str()
}

pub fn extract_notice(payload: &Value) -> Option<PaidNotice> {
    let (shape, txid) = EXTRACTORS.iter().find_map(|(shape, extract)| {
        extract(payload)
            .map(str::trim)
            .filter(|txid| !txid.is_empty())
            .map(|txid| (*shape, txid))
    })?;
    tracing::debug!(shape, txid, "webhook txid extracted");

    let paid_at = payload
        .get("pix")
        .and_then(Value::as_array)
        .and_then(|entries| entries.first())
        .and_then(|entry| entry.get("horario"))
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Some(PaidNotice {
        txid: txid.to_string(),
        paid_at,
    })
}

/// With no secret configured every request is accepted.
pub fn signature_matches(headers: &HeaderMap, secret: Option<&str>) -> bool {
    let Some(secret) = secret else {
        return true;
    };
    SIGNATURE_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok())
        .is_some_and(|given| constant_time_eq(given.as_bytes(), secret.as_bytes()))
}

/// Compares SHA-256 digests so neither the content nor the length of the
/// secret shows up in the timing.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    Sha256::digest(a).ct_eq(&Sha256::digest(b)).into()
}

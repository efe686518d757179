//! Anonymous identity derivation.
//!
//! When a client supplies no user id, a stable anonymous id is derived from
//! the observed IP and user-agent, so repeated requests from the same pair
//! resolve to the same identity without storing any state.

use chrono::{NaiveDate, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Network signals observed from the transport layer.
#[derive(Debug, Clone, Default)]
pub struct RequestSignals {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Resolved identity attached to every captured event. Both fields are
/// guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub session_id: String,
}

/// Derive an anonymous user id.
///
/// With both IP and user-agent available this is deterministic: `anon_` plus
/// the first 8 hex characters of SHA-256 over `"{ip}:{user_agent}"`. Without
/// a stable signal to key on, a random id is generated instead.
pub fn anonymous_user_id(signals: &RequestSignals) -> String {
    let ip = signals.ip_address.as_deref().filter(|s| !s.is_empty());
    let user_agent = signals.user_agent.as_deref().filter(|s| !s.is_empty());

    match (ip, user_agent) {
        (Some(ip), Some(user_agent)) => {
            let digest = Sha256::digest(format!("{ip}:{user_agent}").as_bytes());
            let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
            format!("anon_{}", &hex[..8])
        }
        _ => {
            let hex = Uuid::new_v4().simple().to_string();
            format!("anon_{}", &hex[..8])
        }
    }
}

/// Session id for the current day, see [`session_id_on`].
pub fn session_id(user_id: &str) -> String {
    session_id_on(user_id, Utc::now().date_naive())
}

/// Build a session id of the form `{user_id}_{YYYYMMDD}_{NNNN}` where NNNN
/// is a uniform random number in [0, 10000) rendered with leading zeros.
/// An empty user id is substituted with the literal `unknown`.
pub fn session_id_on(user_id: &str, date: NaiveDate) -> String {
    let user_id = if user_id.is_empty() { "unknown" } else { user_id };
    let digits: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("{user_id}_{}_{digits:04}", date.format("%Y%m%d"))
}

/// Resolve the identity for a request: client-supplied values win, anything
/// missing is derived. Never fails.
pub fn resolve(
    signals: &RequestSignals,
    user_id: Option<String>,
    session_id_override: Option<String>,
) -> Identity {
    let user_id = user_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| anonymous_user_id(signals));
    let session_id = session_id_override
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| session_id(&user_id));
    Identity {
        user_id,
        session_id,
    }
}

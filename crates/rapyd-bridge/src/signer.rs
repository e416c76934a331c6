//! Request signing for the Rapyd REST API.
//!
//! The canonical string is the straight concatenation
//! `method + path + salt + timestamp + access_key + secret_key + body`,
//! signed with HMAC-SHA256 keyed by the secret key. The signature is the
//! standard (padded, non URL-safe) base64 of the raw 32-byte digest.
//!
//! Time and randomness are injected through [`Clock`] and [`RandomSource`]
//! so that signing is deterministic under test.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::{Position, Url};

use crate::config::Credentials;
use crate::constants::{API_PATH_PREFIX, SALT_BYTES};
use crate::error::PaymentError;

type HmacSha256 = Hmac<Sha256>;

/// Any special-scheme origin works; only path and query are kept.
const PATH_RESOLUTION_BASE: &str = "https://gateway.invalid";

/// HTTP methods the gateway accepts for signed calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Lower-case form used in the canonical string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
            Method::Put => "put",
            Method::Delete => "delete",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Method::Get),
            "post" => Ok(Method::Post),
            "put" => Ok(Method::Put),
            "delete" => Ok(Method::Delete),
            other => Err(PaymentError::Validation(format!(
                "unsupported HTTP method: {other}"
            ))),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Source of the signing timestamp.
pub trait Clock: Send + Sync {
    /// Whole seconds since the Unix epoch.
    fn now_unix(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_unix(&self) -> u64 {
        self.0
    }
}

/// Source of salt bytes. Production implementations must be a CSPRNG.
pub trait RandomSource: Send + Sync {
    fn fill(&self, dest: &mut [u8]);
}

/// Thread-local CSPRNG, reseeded from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, dest: &mut [u8]) {
        rand::fill(dest);
    }
}

/// Repeats a fixed byte pattern. Only for deterministic tests and fixtures.
#[derive(Debug, Clone)]
pub struct FixedRandom(pub Vec<u8>);

impl RandomSource for FixedRandom {
    fn fill(&self, dest: &mut [u8]) {
        if self.0.is_empty() {
            dest.fill(0);
            return;
        }
        for (slot, byte) in dest.iter_mut().zip(self.0.iter().cycle()) {
            *slot = *byte;
        }
    }
}

/// Output of [`sign`]: the freshness material, the signature, and the exact
/// body string that was signed. `body` is what must be transmitted.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub path: String,
    pub salt: String,
    pub timestamp: String,
    pub signature: String,
    pub body: String,
}

impl SignedRequest {
    /// Per-call idempotency token. Unique because the salt is never reused.
    pub fn idempotency_key(&self) -> String {
        format!("{}{}", self.timestamp, self.salt)
    }
}

impl fmt::Debug for SignedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedRequest")
            .field("path", &self.path)
            .field("salt", &self.salt)
            .field("timestamp", &self.timestamp)
            .field("signature", &self.signature)
            .field("body_len", &self.body.len())
            .finish()
    }
}

/// Reduce `path` to the gateway-relative form that gets signed.
///
/// Absolute URLs are cut at the first `/v1` of their path and query; the
/// fragment is dropped. Every path is then resolved through the URL parser
/// so the signed bytes match what the HTTP client puts on the wire
/// (percent-encoding, dot segments). The result must start with `/v1`.
pub fn normalize_path(path: &str) -> Result<String, PaymentError> {
    if path.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(PaymentError::Validation(
            "path must not contain whitespace or control characters".to_string(),
        ));
    }

    let relative = if path.starts_with("http://") || path.starts_with("https://") {
        let parsed = Url::parse(path)
            .map_err(|e| PaymentError::Validation(format!("invalid request URL: {e}")))?;
        let tail = &parsed[Position::BeforePath..Position::AfterQuery];
        match tail.find(API_PATH_PREFIX) {
            Some(start) => tail[start..].to_string(),
            None => {
                return Err(PaymentError::Validation(format!(
                    "URL has no {API_PATH_PREFIX} segment: {tail}"
                )))
            }
        }
    } else {
        path.to_string()
    };

    // Checked before resolving so `//host/...` can never swap the authority.
    if !relative.starts_with(API_PATH_PREFIX) {
        return Err(PaymentError::Validation(format!(
            "path must start with {API_PATH_PREFIX}: {relative}"
        )));
    }

    let resolved = wire_form(&relative)?;
    if !resolved.starts_with(API_PATH_PREFIX) {
        return Err(PaymentError::Validation(format!(
            "path must stay under {API_PATH_PREFIX}: {relative} resolves to {resolved}"
        )));
    }

    Ok(resolved)
}

/// Path and query exactly as the URL parser serializes them.
fn wire_form(relative: &str) -> Result<String, PaymentError> {
    let base = Url::parse(PATH_RESOLUTION_BASE)
        .map_err(|e| PaymentError::Validation(format!("invalid request URL: {e}")))?;
    let joined = base
        .join(relative)
        .map_err(|e| PaymentError::Validation(format!("invalid request path: {e}")))?;
    Ok(joined[Position::BeforePath..Position::AfterQuery].to_string())
}

/// Serialize a body exactly as it will be transmitted: minified JSON, or
/// the empty string when there is no body.
pub fn serialize_body(body: Option<&serde_json::Value>) -> Result<String, PaymentError> {
    match body {
        Some(value) => Ok(serde_json::to_string(value)?),
        None => Ok(String::new()),
    }
}

/// Assemble the string to sign. The order is fixed by the gateway.
pub fn canonical_string(
    method: Method,
    path: &str,
    salt: &str,
    timestamp: &str,
    access_key: &str,
    secret_key: &str,
    body: &str,
) -> String {
    let mut s = String::with_capacity(
        method.as_str().len()
            + path.len()
            + salt.len()
            + timestamp.len()
            + access_key.len()
            + secret_key.len()
            + body.len(),
    );
    s.push_str(method.as_str());
    s.push_str(path);
    s.push_str(salt);
    s.push_str(timestamp);
    s.push_str(access_key);
    s.push_str(secret_key);
    s.push_str(body);
    s
}

/// HMAC-SHA256 over `canonical` keyed by `secret_key`, base64 of the raw digest.
pub fn compute_signature(secret_key: &[u8], canonical: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret_key).expect("HMAC accepts any key length");
    mac.update(canonical.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

/// Check a base64 signature against `canonical`.
///
/// Uses constant-time comparison. Undecodable signatures are compared
/// against zeros so the MAC is always computed.
pub fn verify_signature(secret_key: &[u8], canonical: &str, signature: &str) -> bool {
    let mut mac = HmacSha256::new_from_slice(secret_key).expect("HMAC accepts any key length");
    mac.update(canonical.as_bytes());

    let expected = base64::engine::general_purpose::STANDARD
        .decode(signature)
        .unwrap_or_else(|_| vec![0u8; 32]);

    mac.verify_slice(&expected).is_ok()
}

/// Render bytes as lower-case hex.
fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        use std::fmt::Write;
        let _ = write!(s, "{b:02x}");
        s
    })
}

/// Sign one outbound request.
///
/// Fails with [`PaymentError::Configuration`] on empty keys and
/// [`PaymentError::Validation`] when the path is not under `/v1`.
pub fn sign(
    method: Method,
    path: &str,
    body: Option<&serde_json::Value>,
    credentials: &Credentials,
    clock: &dyn Clock,
    random: &dyn RandomSource,
) -> Result<SignedRequest, PaymentError> {
    if credentials.access_key().is_empty() || credentials.secret_key().is_empty() {
        return Err(PaymentError::Configuration(
            "access key and secret key must be non-empty".to_string(),
        ));
    }

    let path = normalize_path(path)?;

    let mut salt_bytes = [0u8; SALT_BYTES];
    random.fill(&mut salt_bytes);
    let salt = to_hex(&salt_bytes);

    let timestamp = clock.now_unix().to_string();
    let body = serialize_body(body)?;

    let canonical = canonical_string(
        method,
        &path,
        &salt,
        &timestamp,
        credentials.access_key(),
        credentials.secret_key(),
        &body,
    );
    let signature = compute_signature(credentials.secret_key().as_bytes(), &canonical);

    Ok(SignedRequest {
        path,
        salt,
        timestamp,
        signature,
        body,
    })
}

/// Rapyd sandbox API base URL.
pub const SANDBOX_BASE_URL: &str = "https://sandboxapi.rapyd.net";

/// Rapyd production API base URL.
pub const LIVE_BASE_URL: &str = "https://api.rapyd.net";

/// Every signable path lives under this prefix.
pub const API_PATH_PREFIX: &str = "/v1";

/// Number of random bytes behind each salt (rendered as twice as many hex chars).
pub const SALT_BYTES: usize = 8;

/// Upstream request timeout when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

// Outbound header names. Rapyd expects these exact lower-case spellings.
pub const HEADER_ACCESS_KEY: &str = "access_key";
pub const HEADER_SALT: &str = "salt";
pub const HEADER_TIMESTAMP: &str = "timestamp";
pub const HEADER_SIGNATURE: &str = "signature";
pub const HEADER_IDEMPOTENCY: &str = "idempotency";
pub const CONTENT_TYPE_JSON: &str = "application/json";

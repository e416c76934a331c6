//! Signed request dispatch for the Rapyd payment gateway.
//!
//! Every outbound call carries a fresh HMAC-SHA256 signature computed over a
//! canonical string built from the method, path, salt, timestamp, both keys
//! and the exact JSON body that goes on the wire.
//!
//! # Components
//!
//! - **Signer** ([`signer::sign`]) — pure; clock and randomness are injected
//! - **Dispatcher** ([`Dispatcher`]) — picks sandbox or live credentials,
//!   signs, sends, and unwraps the gateway envelope
//! - **Translator** ([`translate::translate`]) — maps upstream error codes
//!   to a stable `{code, message, hint}` triple
//!
//! # Quick example
//!
//! ```no_run
//! use rapyd::{Dispatcher, Environment, GatewayConfig, Method};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = GatewayConfig::from_env().unwrap();
//! let dispatcher = Dispatcher::with_reqwest(config);
//!
//! let body = serde_json::json!({ "amount": "10.00", "currency": "EUR" });
//! let checkout = dispatcher
//!     .dispatch(Environment::Sandbox, Method::Post, "/v1/checkout", Some(&body))
//!     .await
//!     .unwrap();
//! let redirect_url = checkout["redirect_url"].as_str();
//! # let _ = redirect_url;
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod error;
pub mod security;
pub mod signer;
pub mod translate;
pub mod transport;

pub use config::{ConfigError, Credentials, Environment, EnvironmentConfig, GatewayConfig};
pub use dispatcher::Dispatcher;
pub use error::{CanonicalError, PaymentError};
pub use signer::{sign, Clock, Method, OsRandom, RandomSource, SignedRequest, SystemClock};
pub use translate::{translate, translate_upstream};
pub use transport::{HttpTransport, ReqwestTransport};

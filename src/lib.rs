/* src/lib.rs */
//! # IP Gate
//!
//! A small request gate that resolves the originating client IP of an HTTP
//! request and allows or rejects it against a configured list of addresses.
//!
//! ## Features
//!
//! - Resolve the client IP from the transport peer address, or optionally from
//!   common forwarding headers (`X-Client-IP`, `X-Forwarded-For`, `X-Real-IP`,
//!   `CF-Connecting-IP`, ...)
//! - Whitelist or blacklist mode with exact string matching
//! - Optional Axum layer and extractor via the `axum` feature
//! - Optional `Deserialize` support for [`GateConfig`] via the `serde` feature
//!
//! Forwarding headers are supplied by the client and can be forged. Only
//! enable them behind a proxy that overwrites them.
//!
//! ## Examples
//!
//! ### Basic Usage
//!
//! ```rust
//! use ipgate::{GateOptions, IpGate, RequestInfo, Verdict};
//!
//! let gate = IpGate::new(["203.0.113.7"], GateOptions::new().allow_forwarded(true));
//!
//! let req = RequestInfo::new()
//!     .with_connection_address("10.0.0.2")
//!     .with_header("X-Forwarded-For", "203.0.113.7, 10.0.0.2");
//!
//! assert_eq!(gate.check(&req), Verdict::Proceed);
//! ```

pub mod error;
pub mod extractor;
pub mod gate;
pub mod request;

#[cfg(feature = "axum")]
pub mod middleware;

pub use error::{GateError, Result};
pub use extractor::{
    DEFAULT_FORWARD_HEADERS, IpExtractor, clean_candidate, get_client_ip, is_ipv4, is_ipv6,
};
pub use gate::{AccessMode, GateConfig, GateOptions, IpGate, IpList, Verdict, make_gate};
pub use request::{Connection, HeaderMap, Info, RequestInfo, Socket};

#[cfg(feature = "axum")]
pub use middleware::{ClientIp, IpGateLayer, IpGateService};

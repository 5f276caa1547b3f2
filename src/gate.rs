/* src/gate.rs */

use std::sync::Arc;
use tracing::debug;

use crate::error::{GateError, Result};
use crate::extractor::IpExtractor;
use crate::request::RequestInfo;

/// Outcome of running a request through the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Hand the request to the next stage.
    Proceed,
    /// Answer with 403 Forbidden.
    Reject,
}

impl Verdict {
    pub fn is_proceed(self) -> bool {
        self == Verdict::Proceed
    }

    pub fn is_reject(self) -> bool {
        self == Verdict::Reject
    }

    /// Turn a rejection into [`GateError::Forbidden`] carrying `ip`.
    pub fn into_result(self, ip: Option<String>) -> Result<Option<String>> {
        match self {
            Verdict::Proceed => Ok(ip),
            Verdict::Reject => Err(GateError::Forbidden { ip }),
        }
    }
}

/// How the configured list is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Whitelist: only listed addresses get through.
    Allow,
    /// Blacklist: listed addresses are refused.
    Deny,
}

/// User supplied options. Unset fields take their defaults when the gate is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateOptions {
    /// `true` treats the list as a whitelist. Defaults to `true`.
    pub allow: Option<bool>,
    /// `true` also consults forwarding headers. Defaults to `false`.
    pub allow_forwarded: Option<bool>,
}

impl GateOptions {
    /// Create options with every field unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether the list is a whitelist (`true`) or a blacklist (`false`).
    pub fn allow(mut self, allow: bool) -> Self {
        self.allow = Some(allow);
        self
    }

    /// Set whether forwarding headers are trusted.
    pub fn allow_forwarded(mut self, allow_forwarded: bool) -> Self {
        self.allow_forwarded = Some(allow_forwarded);
        self
    }

    /// Access mode after defaulting. An explicit `false` is kept.
    pub fn mode(&self) -> AccessMode {
        match self.allow {
            Some(false) => AccessMode::Deny,
            Some(true) | None => AccessMode::Allow,
        }
    }

    /// Whether forwarding headers are trusted after defaulting.
    pub fn forwarded(&self) -> bool {
        self.allow_forwarded.unwrap_or(false)
    }
}

/// Ordered list of configured addresses. Membership is exact string equality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpList(Vec<String>);

impl IpList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, ip: &str) -> bool {
        self.0.iter().any(|listed| listed == ip)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<String> for IpList {
    // An empty string configures nothing, same as an empty list.
    fn from(ip: String) -> Self {
        if ip.is_empty() {
            Self::default()
        } else {
            Self(vec![ip])
        }
    }
}

impl From<&str> for IpList {
    fn from(ip: &str) -> Self {
        Self::from(ip.to_string())
    }
}

impl From<Vec<String>> for IpList {
    fn from(ips: Vec<String>) -> Self {
        Self(ips)
    }
}

impl From<Vec<&str>> for IpList {
    fn from(ips: Vec<&str>) -> Self {
        ips.into_iter().map(str::to_string).collect()
    }
}

impl<const N: usize> From<[&str; N]> for IpList {
    fn from(ips: [&str; N]) -> Self {
        ips.into_iter().map(str::to_string).collect()
    }
}

impl FromIterator<String> for IpList {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for IpList {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(ip) => ip.into(),
            OneOrMany::Many(ips) => ips.into(),
        })
    }
}

/// Construction-time configuration, suitable for embedding in a host's config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GateConfig {
    pub ips: IpList,
    pub allow: Option<bool>,
    #[cfg_attr(feature = "serde", serde(alias = "allowForwarded"))]
    pub allow_forwarded: Option<bool>,
}

impl GateConfig {
    pub fn options(&self) -> GateOptions {
        GateOptions {
            allow: self.allow,
            allow_forwarded: self.allow_forwarded,
        }
    }
}

/// Per-request access gate built once from a list and options.
///
/// The gate is immutable after construction and cheap to clone, so a single
/// instance can be shared by any number of concurrent requests.
///
/// # Examples
///
/// ```rust
/// use ipgate::{GateOptions, IpGate, RequestInfo, Verdict};
///
/// let gate = IpGate::new(["1.2.3.4"], GateOptions::default());
///
/// let allowed = RequestInfo::new().with_connection_address("1.2.3.4");
/// let other = RequestInfo::new().with_connection_address("9.9.9.9");
///
/// assert_eq!(gate.check(&allowed), Verdict::Proceed);
/// assert_eq!(gate.check(&other), Verdict::Reject);
/// ```
#[derive(Debug, Clone)]
pub struct IpGate {
    ips: Arc<IpList>,
    mode: AccessMode,
    extractor: Arc<IpExtractor>,
}

impl IpGate {
    pub fn new(ips: impl Into<IpList>, options: GateOptions) -> Self {
        Self {
            ips: Arc::new(ips.into()),
            mode: options.mode(),
            extractor: Arc::new(IpExtractor::new().allow_forwarded(options.forwarded())),
        }
    }

    pub fn from_config(config: GateConfig) -> Self {
        let options = config.options();
        Self::new(config.ips, options)
    }

    /// Replace the forwarding headers consulted when forwarding is allowed.
    pub fn with_forward_headers<I, T>(mut self, headers: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let extractor = (*self.extractor).clone().try_with_headers(headers)?;
        self.extractor = Arc::new(extractor);
        Ok(self)
    }

    /// How the configured list is interpreted.
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Whether this gate consults forwarding headers.
    pub fn allows_forwarded(&self) -> bool {
        self.extractor.allow_forwarded
    }

    /// The configured address list.
    pub fn ips(&self) -> &IpList {
        &self.ips
    }

    /// Resolve the client IP of `request` with this gate's settings.
    pub fn resolve(&self, request: &RequestInfo) -> Option<String> {
        self.extractor.extract(request)
    }

    /// Decide whether `request` may proceed.
    pub fn check(&self, request: &RequestInfo) -> Verdict {
        self.decide(request).0
    }

    /// Decide for an address that was resolved elsewhere.
    ///
    /// An unresolved address is never a member of the list.
    pub fn check_ip(&self, ip: Option<&str>) -> Verdict {
        if self.ips.is_empty() {
            return Verdict::Proceed;
        }

        let listed = ip.is_some_and(|ip| self.ips.contains(ip));
        let verdict = match (self.mode, listed) {
            (AccessMode::Allow, true) | (AccessMode::Deny, false) => Verdict::Proceed,
            (AccessMode::Allow, false) | (AccessMode::Deny, true) => Verdict::Reject,
        };

        if verdict.is_reject() {
            debug!(ip = ?ip, mode = ?self.mode, "client ip rejected");
        }
        verdict
    }

    /// Like [`IpGate::check`] but returns the resolved address on success and
    /// [`GateError::Forbidden`] on rejection.
    pub fn authorize(&self, request: &RequestInfo) -> Result<Option<String>> {
        let (verdict, ip) = self.decide(request);
        verdict.into_result(ip)
    }

    /// Resolve the client IP and decide. The address is resolved even when
    /// the list is empty so callers always see what the gate let through.
    pub(crate) fn decide(&self, request: &RequestInfo) -> (Verdict, Option<String>) {
        let ip = self.resolve(request);
        (self.check_ip(ip.as_deref()), ip)
    }
}

/// Build a gate and return it as a per-request handler.
///
/// ```rust
/// use ipgate::{make_gate, GateOptions, RequestInfo, Verdict};
///
/// let handler = make_gate("1.2.3.4", GateOptions::new().allow(false));
/// let req = RequestInfo::new().with_connection_address("1.2.3.4");
///
/// assert_eq!(handler(&req), Verdict::Reject);
/// ```
pub fn make_gate(
    ips: impl Into<IpList>,
    options: GateOptions,
) -> impl Fn(&RequestInfo) -> Verdict + Clone + Send + Sync + 'static {
    let gate = IpGate::new(ips, options);
    move |request: &RequestInfo| gate.check(request)
}

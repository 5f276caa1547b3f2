/* src/request.rs */

use std::collections::HashMap;

/// Type alias for header maps. Keys are matched case-insensitively on lookup.
pub type HeaderMap = HashMap<String, String>;

/// Socket-level view of a peer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Socket {
    pub remote_address: Option<String>,
}

/// Connection-level view of a peer, optionally carrying its own socket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Connection {
    pub remote_address: Option<String>,
    pub socket: Option<Socket>,
}

/// Framework-specific request info block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Info {
    pub remote_address: Option<String>,
}

/// The parts of an incoming request the gate looks at.
///
/// Hosts fill in whatever they know about the peer. Every part is optional
/// and absent parts are treated as "no address here".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    pub connection: Option<Connection>,
    pub socket: Option<Socket>,
    pub info: Option<Info>,
    pub headers: HeaderMap,
}

impl RequestInfo {
    /// Create an empty request view with no addresses or headers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection-level remote address.
    pub fn with_connection_address(mut self, addr: impl Into<String>) -> Self {
        self.connection.get_or_insert_with(Connection::default).remote_address = Some(addr.into());
        self
    }

    /// Set the socket-level remote address.
    pub fn with_socket_address(mut self, addr: impl Into<String>) -> Self {
        self.socket = Some(Socket {
            remote_address: Some(addr.into()),
        });
        self
    }

    /// Set the remote address of the socket nested under the connection.
    pub fn with_connection_socket_address(mut self, addr: impl Into<String>) -> Self {
        self.connection.get_or_insert_with(Connection::default).socket = Some(Socket {
            remote_address: Some(addr.into()),
        });
        self
    }

    /// Set the remote address carried by the framework info block.
    pub fn with_info_address(mut self, addr: impl Into<String>) -> Self {
        self.info = Some(Info {
            remote_address: Some(addr.into()),
        });
        self
    }

    /// Add a header. The name is stored lowercased.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Connection-level remote address, if any.
    pub fn connection_address(&self) -> Option<&str> {
        self.connection.as_ref()?.remote_address.as_deref()
    }

    /// Socket-level remote address, if any.
    pub fn socket_address(&self) -> Option<&str> {
        self.socket.as_ref()?.remote_address.as_deref()
    }

    /// Remote address of the socket nested under the connection, if any.
    pub fn connection_socket_address(&self) -> Option<&str> {
        self.connection
            .as_ref()?
            .socket
            .as_ref()?
            .remote_address
            .as_deref()
    }

    /// Remote address from the framework info block, if any.
    pub fn info_address(&self) -> Option<&str> {
        self.info.as_ref()?.remote_address.as_deref()
    }

    /// Look up a header value, ignoring ASCII case in the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.headers.get(name) {
            return Some(value.as_str());
        }

        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Transport-layer addresses in priority order. Absent parts yield `None`.
    pub fn transport_candidates(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        [
            self.connection_address(),
            self.socket_address(),
            self.connection_socket_address(),
            self.info_address(),
        ]
        .into_iter()
    }
}

use std::fmt;

use url::Url;

use crate::HttpError;

/// Host and effective port a request is sent to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    host: String,
    port: u16,
}

impl Origin {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port` pair suitable for `TcpStream::connect`.
    pub fn authority(&self) -> String {
        match self.host.contains(':') {
            // IPv6 literal
            true => format!("[{}]:{}", self.host, self.port),
            false => format!("{}:{}", self.host, self.port),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.authority())
    }
}

/// A parsed request target: where to connect and what to put on the request line.
#[derive(Debug, Clone)]
pub struct Target {
    pub origin: Origin,
    pub path: String,
}

impl Target {
    pub fn parse(input: &str) -> Result<Self, HttpError> {
        let url =
            Url::parse(input).map_err(|e| HttpError::malformed_address(input, e.to_string()))?;

        if url.scheme() != "http" {
            return Err(HttpError::malformed_address(
                input,
                format!("unsupported scheme `{}`", url.scheme()),
            ));
        }

        let host = match url.host() {
            Some(url::Host::Ipv6(addr)) => addr.to_string(),
            Some(host) => host.to_string(),
            None => return Err(HttpError::malformed_address(input, "missing host")),
        };

        let port = url
            .port_or_known_default()
            .ok_or_else(|| HttpError::malformed_address(input, "no port and no default"))?;

        let path = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        Ok(Self {
            origin: Origin::new(host, port),
            path,
        })
    }
}

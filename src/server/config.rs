//! Listen configuration

/// Hostname used when the build process never sends one
pub const DEFAULT_HOSTNAME: &str = "localhost";

/// Port used when the build process never sends one
pub const DEFAULT_PORT: u16 = 3123;

/// Parameters for the client-facing listener.
///
/// Supplied by the build process over the control channel; stored until
/// the first commit binds the listener. Updates arriving after the bind
/// are stored but have no effect on the running endpoint.
#[derive(Debug, Clone)]
pub struct ListenConfig {
    /// Hostname or address to bind
    pub hostname: String,

    /// Port to bind (0 picks an ephemeral port)
    pub port: u16,

    /// Opaque TLS material, carried through but never interpreted;
    /// TLS termination happens in front of the service
    pub tlsoptions: Option<serde_json::Value>,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            hostname: DEFAULT_HOSTNAME.to_string(),
            port: DEFAULT_PORT,
            tlsoptions: None,
        }
    }
}

impl ListenConfig {
    /// Create a config from the fields of a `config` control message
    pub fn new(
        hostname: impl Into<String>,
        port: u16,
        tlsoptions: Option<serde_json::Value>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            tlsoptions,
        }
    }

    /// Create a plain-TCP config for the given address
    pub fn with_addr(hostname: impl Into<String>, port: u16) -> Self {
        Self::new(hostname, port, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ListenConfig::default();

        assert_eq!(config.hostname, "localhost");
        assert_eq!(config.port, 3123);
        assert!(config.tlsoptions.is_none());
    }

    #[test]
    fn test_with_addr() {
        let config = ListenConfig::with_addr("127.0.0.1", 4000);

        assert_eq!(config.hostname, "127.0.0.1");
        assert_eq!(config.port, 4000);
    }
}

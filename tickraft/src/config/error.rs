use anyerror::AnyError;

/// Error variants related to configuration.
#[derive(Debug, thiserror::Error)]
#[derive(PartialEq, Eq)]
pub enum ConfigError {
    /// Failed to parse configuration from command-line style arguments.
    #[error("ParseError: {source} while parsing ({args:?})")]
    ParseError {
        /// The underlying parse error.
        source: AnyError,
        /// The arguments that failed to parse.
        args: Vec<String>,
    },

    /// The election timeout does not dominate the heartbeat interval.
    #[error("election_timeout({election_timeout}) must be > request_timeout({request_timeout})")]
    ElectionTimeoutLTRequestTimeout {
        /// The configured election timeout, in milliseconds.
        election_timeout: u64,
        /// The configured heartbeat interval, in milliseconds.
        request_timeout: u64,
    },

    /// The `max_payload_entries` configuration must be greater than 0.
    #[error("max_payload_entries must be > 0")]
    MaxPayloadIs0,
}

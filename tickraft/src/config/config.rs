//! Engine runtime configuration.

use std::time::Duration;

use anyerror::AnyError;
use clap::Parser;
use rand::thread_rng;
use rand::Rng;

use crate::config::error::ConfigError;

/// Runtime configuration for a single consensus engine.
///
/// The timing options follow the Raft inequality
/// `heartbeat interval ≪ election timeout`: a follower must hear from the
/// leader several times before it suspects the leader is gone.
///
/// ```
/// use tickraft::Config;
///
/// let config = Config::build(&["my-node", "--election-timeout", "500", "--request-timeout", "100"])?;
/// # Ok::<(), tickraft::ConfigError>(())
/// ```
#[derive(Clone, Debug, Parser)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Config {
    /// The base election timeout in milliseconds.
    ///
    /// An actual timeout is re-drawn from
    /// `[election_timeout, 2 * election_timeout)` whenever the election
    /// timer resets, so that concurrent candidacies de-synchronize.
    #[clap(long, default_value = "1000")]
    pub election_timeout: u64,

    /// The interval in milliseconds at which a leader re-sends
    /// append-entries to its followers.
    #[clap(long, default_value = "200")]
    pub request_timeout: u64,

    /// The maximum number of entries per append-entries message.
    #[clap(long, default_value = "300")]
    pub max_payload_entries: u64,

    /// Whether this node starts with a voting seat.
    ///
    /// A node added to an existing cluster starts without one and is
    /// promoted through configuration-change entries once it has caught up.
    // clap 4 requires `num_args = 0..=1`, or it complains about missing arg error
    #[clap(long,
           default_value_t = true,
           action = clap::ArgAction::Set,
           num_args = 0..=1,
           default_missing_value = "true"
    )]
    pub self_is_voting: bool,
}

impl Default for Config {
    fn default() -> Self {
        <Self as Parser>::parse_from(Vec::<&'static str>::new())
    }
}

impl Config {
    /// Generate a new randomized election timeout.
    pub fn new_rand_election_timeout(&self) -> Duration {
        let ms = thread_rng().gen_range(self.election_timeout..self.election_timeout * 2);
        Duration::from_millis(ms)
    }

    /// Get the heartbeat interval as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }

    /// Build a `Config` instance from a series of command line arguments.
    ///
    /// The first element in `args` must be the application name.
    pub fn build(args: &[&str]) -> Result<Config, ConfigError> {
        let config = <Self as Parser>::try_parse_from(args).map_err(|e| ConfigError::ParseError {
            source: AnyError::from(&e),
            args: args.iter().map(|x| x.to_string()).collect(),
        })?;
        config.validate()
    }

    /// Validate the state of this config.
    pub fn validate(self) -> Result<Config, ConfigError> {
        if self.request_timeout >= self.election_timeout {
            return Err(ConfigError::ElectionTimeoutLTRequestTimeout {
                election_timeout: self.election_timeout,
                request_timeout: self.request_timeout,
            });
        }

        if self.max_payload_entries == 0 {
            return Err(ConfigError::MaxPayloadIs0);
        }

        Ok(self)
    }
}

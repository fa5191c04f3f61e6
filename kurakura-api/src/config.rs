//! Server settings from `KURAKURA_*` environment variables.

use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;

use derive_more::{Display, Error};

use crate::lobby::LobbySettings;

/// Largest board a room may be created with.
pub const MAX_BOARD_SIZE: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    /// Side of the board in newly created rooms.
    pub board_size: usize,
    /// Longest accepted player name, in bytes.
    pub max_name_len: usize,
    /// Stones in a row needed to win.
    pub win_len: usize,
    /// Seconds a room or a roomless user may stay untouched.
    pub idle_timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Display, Error)]
#[display("invalid value {value:?} for {var}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            board_size: kurakura_core::DEFAULT_BOARD_SIZE,
            max_name_len: 250,
            win_len: kurakura_core::DEFAULT_WIN_LEN,
            idle_timeout_secs: 3600,
        }
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError { var, value }),
    }
}

/// Like [`parse`], also rejecting values outside `range`.
fn parse_in<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
    range: std::ops::RangeInclusive<T>,
) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + ToString,
{
    let value = parse(lookup, var, default)?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError {
            var,
            value: value.to_string(),
        })
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read settings through `lookup`, falling back to defaults for unset
    /// variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            host: parse(&lookup, "KURAKURA_HOST", defaults.host)?,
            port: parse(&lookup, "KURAKURA_PORT", defaults.port)?,
            board_size: parse_in(
                &lookup,
                "KURAKURA_BOARD_SIZE",
                defaults.board_size,
                1..=MAX_BOARD_SIZE,
            )?,
            max_name_len: parse(&lookup, "KURAKURA_MAX_NAME_LEN", defaults.max_name_len)?,
            win_len: parse_in(&lookup, "KURAKURA_WIN_LEN", defaults.win_len, 1..=MAX_BOARD_SIZE)?,
            idle_timeout_secs: parse_in(
                &lookup,
                "KURAKURA_IDLE_TIMEOUT_SECS",
                defaults.idle_timeout_secs,
                1..=u64::MAX,
            )?,
        })
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn lobby_settings(&self) -> LobbySettings {
        LobbySettings {
            board_size: self.board_size,
            max_name_len: self.max_name_len,
            win_len: self.win_len,
            idle_timeout: self.idle_timeout(),
        }
    }
}

//! Configuration: CLI flags layered over an optional TOML file.
//!
//! Following the game client binary's `clap::Clap` derive style, [`Opts`] is the thing
//! `main` parses from `std::env::args()`. Anything also settable from a TOML file is
//! optional on `Opts`; [`Config::load`] reads the file (if given), then lets any present
//! CLI flag override the corresponding file value.

use crate::addrmap::AddrMap;
use crate::policy::AcceptedGames;
use clap::Clap;
use dpmaster_proto::messages::{GameName, Ipv4Encoding};
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::path::PathBuf;

/// Command-line options.
#[derive(Clap, Debug)]
#[clap(about = "UDP master server for the dpmaster/ef2master game server browser protocol")]
pub struct Opts {
    /// IPv4 address to listen for game server and game client UDP datagrams on. Pass an
    /// empty string to disable the IPv4 socket.
    #[clap(long, default_value = "0.0.0.0:27950")]
    pub listen: String,

    /// IPv6 address to listen on in addition to `--listen`. Pass an empty string to
    /// disable the IPv6 socket.
    #[clap(long, default_value = "[::]:27950")]
    pub listen_v6: String,

    /// Optional TOML configuration file; CLI flags take precedence over its values.
    #[clap(short, long, parse(from_os_str))]
    pub config: Option<PathBuf>,

    /// Restricts tracked games to this list; may be given more than once. Unset (and no
    /// `accepted_games` in the config file) accepts every game.
    #[clap(short = 'g', long = "accept-game")]
    pub accept_game: Vec<String>,

    /// Caps the number of distinct server addresses tracked at once. Unset means unbounded.
    #[clap(long)]
    pub max_servers: Option<usize>,

    /// Selects the non-standard two-ASCII-hex-digit IPv4 record encoding (`hex`, the
    /// default, matching this master's historical clients) or the standard raw-byte
    /// encoding (`raw`).
    #[clap(long, default_value = "hex")]
    pub ipv4_encoding: String,
}

/// On-disk configuration file shape, deserialized with `serde` from TOML.
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    listen: Option<String>,
    #[serde(default)]
    listen_v6: Option<String>,
    #[serde(default)]
    accepted_games: Vec<String>,
    #[serde(default)]
    max_servers: Option<usize>,
    #[serde(default)]
    ipv4_encoding: Option<String>,
    #[serde(default)]
    addrmap: Vec<AddrMapEntry>,
}

#[derive(Debug, Deserialize)]
struct AddrMapEntry {
    from: Ipv4Addr,
    to: Ipv4Addr,
}

/// Fully resolved configuration, built from CLI flags layered over an optional file.
#[derive(Debug)]
pub struct Config {
    /// Address to bind the IPv4 UDP socket to, if any.
    pub listen: Option<String>,
    /// Address to bind the IPv6 UDP socket to, if any.
    pub listen_v6: Option<String>,
    /// Accepted-games allow-list.
    pub accepted_games: AcceptedGames,
    /// Registry capacity cap, if any.
    pub max_servers: Option<usize>,
    /// IPv4 record encoding mode.
    pub ipv4_encoding: Ipv4Encoding,
    /// Address-map table.
    pub addrmap: AddrMap,
}

/// Failure while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file was not valid TOML, or had values of the wrong shape.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// A `--accept-game`/`accepted_games` entry or the legacy game default was not a valid
    /// [`GameName`].
    #[error("invalid game name `{name}`: {source}")]
    InvalidGameName {
        /// The offending text.
        name: String,
        /// Underlying protocol error.
        #[source]
        source: dpmaster_proto::ProtocolError,
    },

    /// `--ipv4-encoding`/`ipv4_encoding` was not `hex` or `raw`.
    #[error("invalid ipv4-encoding `{0}`, expected `hex` or `raw`")]
    InvalidIpv4Encoding(String),
}

impl Config {
    /// Loads configuration from `opts`, reading and merging `opts.config` if present.
    pub fn load(opts: &Opts) -> Result<Self, ConfigError> {
        let file = match &opts.config {
            Some(path) => {
                let contents =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                        path: path.clone(),
                        source,
                    })?;
                toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: path.clone(),
                    source,
                })?
            }
            None => FileConfig::default(),
        };

        let listen_raw = if opts.listen != "0.0.0.0:27950" {
            opts.listen.clone()
        } else {
            file.listen.unwrap_or(opts.listen.clone())
        };
        let listen = if listen_raw.is_empty() { None } else { Some(listen_raw) };

        let listen_v6_raw = if opts.listen_v6 != "[::]:27950" {
            opts.listen_v6.clone()
        } else {
            file.listen_v6.unwrap_or(opts.listen_v6.clone())
        };
        let listen_v6 = if listen_v6_raw.is_empty() {
            None
        } else {
            Some(listen_v6_raw)
        };

        let game_names: Vec<&str> = if !opts.accept_game.is_empty() {
            opts.accept_game.iter().map(String::as_str).collect()
        } else {
            file.accepted_games.iter().map(String::as_str).collect()
        };
        let mut accepted = Vec::with_capacity(game_names.len());
        for name in game_names {
            let game_name =
                GameName::new(name.as_bytes().to_vec()).map_err(|source| ConfigError::InvalidGameName {
                    name: name.to_string(),
                    source,
                })?;
            accepted.push(game_name);
        }
        let accepted_games = AcceptedGames::only(accepted);

        let max_servers = opts.max_servers.or(file.max_servers);

        let encoding_str = if opts.ipv4_encoding != "hex" {
            opts.ipv4_encoding.as_str()
        } else {
            file.ipv4_encoding.as_deref().unwrap_or(opts.ipv4_encoding.as_str())
        };
        let ipv4_encoding = match encoding_str {
            "hex" => Ipv4Encoding::HexAscii,
            "raw" => Ipv4Encoding::Raw,
            other => return Err(ConfigError::InvalidIpv4Encoding(other.to_string())),
        };

        let addrmap = AddrMap::from_pairs(file.addrmap.into_iter().map(|entry| (entry.from, entry.to)));

        Ok(Self {
            listen,
            listen_v6,
            accepted_games,
            max_servers,
            ipv4_encoding,
            addrmap,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_opts() -> Opts {
        Opts {
            listen: "0.0.0.0:27950".to_string(),
            listen_v6: "[::]:27950".to_string(),
            config: None,
            accept_game: vec![],
            max_servers: None,
            ipv4_encoding: "hex".to_string(),
        }
    }

    #[test]
    fn defaults_accept_every_game() {
        let config = Config::load(&base_opts()).unwrap();
        assert!(config
            .accepted_games
            .accepts(&GameName::new(b"Nexuiz".to_vec()).unwrap()));
    }

    #[test]
    fn cli_accept_game_restricts_policy() {
        let mut opts = base_opts();
        opts.accept_game = vec!["Nexuiz".to_string()];
        let config = Config::load(&opts).unwrap();
        assert!(config
            .accepted_games
            .accepts(&GameName::new(b"Nexuiz".to_vec()).unwrap()));
        assert!(!config
            .accepted_games
            .accepts(&GameName::new(b"Quake3".to_vec()).unwrap()));
    }

    #[test]
    fn raw_ipv4_encoding_selected() {
        let mut opts = base_opts();
        opts.ipv4_encoding = "raw".to_string();
        let config = Config::load(&opts).unwrap();
        assert_eq!(config.ipv4_encoding, Ipv4Encoding::Raw);
    }

    #[test]
    fn invalid_ipv4_encoding_rejected() {
        let mut opts = base_opts();
        opts.ipv4_encoding = "bogus".to_string();
        assert!(matches!(
            Config::load(&opts),
            Err(ConfigError::InvalidIpv4Encoding(_))
        ));
    }
}

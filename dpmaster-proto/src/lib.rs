#![warn(missing_docs)]

pub mod deserializer;
pub mod error;
pub mod messages;
pub mod serializer;

pub use messages::{
    gametype_shorthand, legacy_gamename, Challenge, FilterExtOptions, FilterOptions, GameName,
    GameType, GetInfoMessage, GetServersExtMessage, GetServersExtResponseMessage,
    GetServersMessage, GetServersResponseMessage, HeartbeatMessage, Info, InfoKey,
    InfoResponseMessage, InfoValue, Ipv4Encoding, ProtocolName, ProtocolNumber,
    CHALLENGE_MAX_LENGTH, CHALLENGE_MIN_LENGTH, HEARTBEAT_GAMEID_MAX_LENGTH,
    HEARTBEAT_SHUTDOWN_SENTINEL, INFOSTRING_ITEM_MAX_LENGTH,
};

pub use crate::error::ProtocolError;
/// [std::result::Result] alias with [ProtocolError] as `Err`
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

//! Error types for the master server's own request-handling logic, as distinct from
//! [`dpmaster_proto::ProtocolError`] (wire-format decode failures).

use std::net::SocketAddr;
use thiserror::Error;

/// Failure while applying a decoded message to the [registry](crate::registry::Registry).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandlerError {
    /// An `infoResponse` arrived from an address with no outstanding challenge, or whose
    /// challenge already expired.
    #[error("no live challenge outstanding for {address}")]
    NoLiveChallenge {
        /// Sender of the unexpected `infoResponse`.
        address: SocketAddr,
    },

    /// An `infoResponse`'s echoed `challenge` value did not match the one issued.
    #[error("challenge mismatch for {address}")]
    ChallengeMismatch {
        /// Sender of the mismatched `infoResponse`.
        address: SocketAddr,
    },

    /// An `infoResponse` omitted a required `Info` field.
    #[error("infoResponse from {address} missing required field `{field}`")]
    MissingField {
        /// Sender of the incomplete `infoResponse`.
        address: SocketAddr,
        /// Name of the absent field.
        field: &'static str,
    },

    /// An `infoResponse` reported `sv_maxclients == 0`, which the wire protocol reserves to
    /// mean "not a real game server slot" rather than "a server with room for nobody".
    #[error("infoResponse from {address} reported sv_maxclients = 0")]
    ZeroMaxClients {
        /// Sender of the degenerate `infoResponse`.
        address: SocketAddr,
    },

    /// An `infoResponse` reported more connected clients than its own advertised capacity.
    #[error("infoResponse from {address} reported clients ({clients}) > sv_maxclients ({max})")]
    ClientsExceedMax {
        /// Sender of the inconsistent `infoResponse`.
        address: SocketAddr,
        /// Reported `clients` value.
        clients: u32,
        /// Reported `sv_maxclients` value.
        max: u32,
    },

    /// A `heartbeat` or `getservers`/`getserversExt` named a game not on the accepted-games
    /// allow-list.
    #[error("game `{game}` is not on the accepted-games list")]
    GameNotAccepted {
        /// The rejected game name, rendered for diagnostics.
        game: String,
    },

    /// The registry has reached its configured capacity and cannot track a new address.
    #[error("registry is full, refusing new entry for {address}")]
    RegistryFull {
        /// Sender that could not be registered.
        address: SocketAddr,
    },
}

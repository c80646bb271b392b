//! In-memory server registry: the master's view of which game servers are alive.
//!
//! Kept as a plain synchronous [`Registry`] wrapping a [`HashMap`], per the teacher's
//! preference for a thin data type with no I/O of its own; the binary wraps it in a lock
//! shared across the receive loop and the periodic sweeper (see `main.rs`).

use dpmaster_proto::messages::{Challenge, GameName, GameType, ProtocolNumber};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// How long an outstanding `getinfo` challenge stays valid before a late `infoResponse`
/// is rejected as stale.
pub const CHALLENGE_TIMEOUT: Duration = Duration::from_secs(2);
/// How long a validated entry stays listable without a fresh `infoResponse`.
pub const LIVENESS_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Lifecycle state of a [`ServerEntry`].
///
/// `UnusedSlot` mirrors the historical fixed-size C array's free-slot marker; this
/// reimplementation's registry is a growable map keyed by address, so no entry is ever
/// observed in this state. It is kept in the enum purely as documented history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Historical-only; never constructed by this registry.
    UnusedSlot,
    /// Challenged, awaiting a valid `infoResponse`.
    Uninitialized,
    /// Validated, reporting zero clients.
    Empty,
    /// Validated, reporting `0 < clients < sv_maxclients`.
    Occupied,
    /// Validated, reporting `clients == sv_maxclients`.
    Full,
}

impl ServerState {
    /// Whether this state implies the entry has passed `infoResponse` validation at least
    /// once (i.e. `gamename`/`protocol`/`liveness_expiry` are meaningful).
    pub fn is_validated(self) -> bool {
        matches!(self, ServerState::Empty | ServerState::Occupied | ServerState::Full)
    }
}

/// One known game server.
#[derive(Debug, Clone)]
pub struct ServerEntry {
    address: SocketAddr,
    state: ServerState,
    protocol: Option<ProtocolNumber>,
    gamename: Option<GameName>,
    gametype: Option<GameType>,
    challenge: Option<Challenge>,
    challenge_expiry: Option<Instant>,
    liveness_expiry: Option<Instant>,
}

impl ServerEntry {
    fn new(address: SocketAddr) -> Self {
        Self {
            address,
            state: ServerState::Uninitialized,
            protocol: None,
            gamename: None,
            gametype: None,
            challenge: None,
            challenge_expiry: None,
            liveness_expiry: None,
        }
    }

    /// The server's own network address and port.
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Reported protocol version, if validated at least once.
    pub fn protocol(&self) -> Option<ProtocolNumber> {
        self.protocol
    }

    /// Reported game name, if validated at least once.
    pub fn gamename(&self) -> Option<&GameName> {
        self.gamename.as_ref()
    }

    /// Reported gametype, if validated at least once.
    pub fn gametype(&self) -> Option<&GameType> {
        self.gametype.as_ref()
    }

    /// Currently outstanding challenge, if any.
    pub fn challenge(&self) -> Option<&Challenge> {
        self.challenge.as_ref()
    }

    /// Deadline for the outstanding challenge, if any.
    pub fn challenge_expiry(&self) -> Option<Instant> {
        self.challenge_expiry
    }

    /// Whether a still-valid challenge is outstanding at `now`.
    pub fn has_live_challenge(&self, now: Instant) -> bool {
        self.challenge_expiry.map_or(false, |expiry| expiry > now)
    }

    /// Deadline past which this entry is no longer listable.
    pub fn liveness_expiry(&self) -> Option<Instant> {
        self.liveness_expiry
    }

    /// Whether this entry is still listable at `now`.
    pub fn is_live(&self, now: Instant) -> bool {
        self.state.is_validated() && self.liveness_expiry.map_or(false, |expiry| expiry > now)
    }

    /// Replaces the outstanding challenge, resetting its expiry to `now + `[`CHALLENGE_TIMEOUT`].
    pub fn issue_challenge(&mut self, challenge: Challenge, now: Instant) {
        self.challenge = Some(challenge);
        self.challenge_expiry = Some(now + CHALLENGE_TIMEOUT);
    }

    /// Records a validated `infoResponse`: updates descriptive fields, transitions `state`
    /// and refreshes `liveness_expiry = now + `[`LIVENESS_TIMEOUT`].
    pub fn validate(
        &mut self,
        gamename: GameName,
        protocol: ProtocolNumber,
        gametype: GameType,
        state: ServerState,
        now: Instant,
    ) {
        self.gamename = Some(gamename);
        self.protocol = Some(protocol);
        self.gametype = Some(gametype);
        self.state = state;
        self.liveness_expiry = Some(now + LIVENESS_TIMEOUT);
    }

    /// Marks this entry inactive immediately (the `TikiServer-Flatline` shutdown sentinel).
    pub fn mark_inactive(&mut self, now: Instant) {
        self.state = ServerState::Uninitialized;
        self.liveness_expiry = Some(now.checked_sub(Duration::from_secs(1)).unwrap_or(now));
    }

}

/// Registry of known servers, keyed by `(address, port)`.
///
/// `Iterate()`/`GetByAddr()`/`MarkInactive()` from the spec's external contract map onto
/// [`Registry::iter_live`]/[`Registry::get_or_create`]/[`Registry::mark_inactive`].
#[derive(Debug, Default)]
pub struct Registry {
    servers: HashMap<SocketAddr, ServerEntry>,
    max_servers: Option<usize>,
}

impl Registry {
    /// Creates an empty registry with no cap on the number of entries.
    pub fn new() -> Self {
        Self {
            servers: HashMap::new(),
            max_servers: None,
        }
    }

    /// Creates an empty registry that refuses to create new entries past `max_servers`.
    ///
    /// The historical implementation's fixed-size array made this cap unavoidable; this
    /// reimplementation's `HashMap` is unbounded by default (`new()`), but the cap is kept
    /// configurable so the "registry full" error path in the spec remains specifiable.
    pub fn with_capacity_limit(max_servers: usize) -> Self {
        Self {
            servers: HashMap::new(),
            max_servers: Some(max_servers),
        }
    }

    /// Looks up the entry at `address`, creating an `Uninitialized` one if `create` is set
    /// and none exists. Returns `None` if `create` is set but the registry is at capacity.
    pub fn get_or_create(&mut self, address: SocketAddr, create: bool) -> Option<&mut ServerEntry> {
        if !self.servers.contains_key(&address) {
            if !create {
                return None;
            }
            if let Some(max) = self.max_servers {
                if self.servers.len() >= max {
                    return None;
                }
            }
            self.servers.insert(address, ServerEntry::new(address));
        }
        self.servers.get_mut(&address)
    }

    /// Looks up an existing entry without creating one.
    pub fn get(&self, address: &SocketAddr) -> Option<&ServerEntry> {
        self.servers.get(address)
    }

    /// Looks up an existing entry mutably without creating one.
    pub fn get_mut(&mut self, address: &SocketAddr) -> Option<&mut ServerEntry> {
        self.servers.get_mut(address)
    }

    /// Marks the entry at `address` inactive, if one exists. A no-op for an unknown address.
    pub fn mark_inactive(&mut self, address: &SocketAddr, now: Instant) {
        if let Some(entry) = self.servers.get_mut(address) {
            entry.mark_inactive(now);
        }
    }

    /// Iterates every entry, live or not; callers apply the liveness filter themselves.
    pub fn iter(&self) -> impl Iterator<Item = &ServerEntry> {
        self.servers.values()
    }

    /// Number of entries currently tracked (live or not).
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Whether the registry currently tracks no entries.
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Removes entries with no chance of being revived: neither a live challenge nor a
    /// live validation is outstanding. Pure resource hygiene; list queries already exclude
    /// expired entries regardless of whether this has run (§3 "Registry sweeper").
    pub fn sweep(&mut self, now: Instant) {
        self.servers
            .retain(|_, entry| entry.is_live(now) || entry.has_live_challenge(now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpmaster_proto::messages::GameType;
    use std::net::{Ipv4Addr, SocketAddrV4};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), port))
    }

    #[test]
    fn get_or_create_creates_uninitialized() {
        let mut registry = Registry::new();
        let entry = registry.get_or_create(addr(1), true).unwrap();
        assert_eq!(entry.state(), ServerState::Uninitialized);
    }

    #[test]
    fn get_or_create_without_create_returns_none_for_unknown() {
        let mut registry = Registry::new();
        assert!(registry.get_or_create(addr(1), false).is_none());
    }

    #[test]
    fn capacity_limit_refuses_new_entries() {
        let mut registry = Registry::with_capacity_limit(1);
        assert!(registry.get_or_create(addr(1), true).is_some());
        assert!(registry.get_or_create(addr(2), true).is_none());
        // Existing entries remain reachable past the cap.
        assert!(registry.get_or_create(addr(1), true).is_some());
    }

    #[test]
    fn validate_transitions_state_and_sets_liveness() {
        let mut registry = Registry::new();
        let now = Instant::now();
        let entry = registry.get_or_create(addr(1), true).unwrap();
        entry.validate(
            GameName::new(b"STEF2".to_vec()).unwrap(),
            24,
            GameType::new(b"0".to_vec()).unwrap(),
            ServerState::Occupied,
            now,
        );
        assert_eq!(entry.state(), ServerState::Occupied);
        assert!(entry.is_live(now));
        assert!(!entry.is_live(now + LIVENESS_TIMEOUT + Duration::from_secs(1)));
    }

    #[test]
    fn mark_inactive_excludes_from_liveness() {
        let mut registry = Registry::new();
        let now = Instant::now();
        {
            let entry = registry.get_or_create(addr(1), true).unwrap();
            entry.validate(
                GameName::new(b"STEF2".to_vec()).unwrap(),
                24,
                GameType::new(b"0".to_vec()).unwrap(),
                ServerState::Occupied,
                now,
            );
        }
        registry.mark_inactive(&addr(1), now);
        assert!(!registry.get(&addr(1)).unwrap().is_live(now));
    }

    #[test]
    fn sweep_removes_dead_entries_with_no_pending_challenge() {
        let mut registry = Registry::new();
        let now = Instant::now();
        {
            let entry = registry.get_or_create(addr(1), true).unwrap();
            entry.validate(
                GameName::new(b"STEF2".to_vec()).unwrap(),
                24,
                GameType::new(b"0".to_vec()).unwrap(),
                ServerState::Empty,
                now,
            );
        }
        let later = now + LIVENESS_TIMEOUT + Duration::from_secs(1);
        registry.sweep(later);
        assert!(registry.is_empty());
    }

    #[test]
    fn sweep_keeps_entries_with_live_challenge() {
        let mut registry = Registry::new();
        let now = Instant::now();
        registry
            .get_or_create(addr(1), true)
            .unwrap()
            .issue_challenge(Challenge::new(b"abcdef".to_vec()).unwrap(), now);
        registry.sweep(now);
        assert_eq!(registry.len(), 1);
    }
}

//! Pure request-handling logic: each handler takes a decoded message, the sender's address,
//! the current time, a `&mut `[`Registry`] and the loaded policy/addrmap, and returns the
//! list of datagrams the caller should send. No socket I/O happens here, which is what lets
//! every scenario in the concrete test list be exercised without a real `UdpSocket`.

use crate::addrmap::AddrMap;
use crate::error::HandlerError;
use crate::policy::AcceptedGames;
use crate::registry::{Registry, ServerState};
use dpmaster_codec::MasterServerResponse;
use dpmaster_proto::messages::{
    legacy_gamename, Challenge, FilterExtOptions, FilterOptions, GameType, GetInfoMessage,
    GetServersExtMessage, GetServersExtResponseMessage, GetServersMessage,
    GetServersResponseMessage, HeartbeatMessage, InfoResponseMessage, Ipv4Encoding, ProtocolNumber,
};
use dpmaster_proto::serializer::{fit_ext_servers_in_packet, fit_servers_in_packet};
use std::net::{SocketAddr, SocketAddrV4};
use std::time::Instant;
use tracing::{debug, warn};

/// One datagram a handler wants sent, addressed to its destination.
pub type Outbound = (SocketAddr, MasterServerResponse);

/// Approximate size, in bytes, of a response header (four-byte prefix plus literal command
/// name); used only to budget how many server records fit in one packet, so an
/// overestimate is harmless and an underestimate would risk exceeding 1400 bytes.
const GETSERVERSRESPONSE_HEADER_SIZE: usize = 4 + "getserversResponse".len();
const GETSERVERSEXTRESPONSE_HEADER_SIZE: usize = 4 + "getserversExtResponse".len();

/// Implements §4.4: records/refreshes the sender's entry and, if needed, issues a fresh
/// challenge and a `getinfo` reply.
pub fn handle_heartbeat(
    registry: &mut Registry,
    from: SocketAddr,
    message: &HeartbeatMessage,
    now: Instant,
) -> Result<Vec<Outbound>, HandlerError> {
    if message.is_shutdown_sentinel() {
        registry.mark_inactive(&from, now);
        debug!(%from, "heartbeat shutdown sentinel received");
        return Ok(Vec::new());
    }

    let entry = registry
        .get_or_create(from, true)
        .ok_or(HandlerError::RegistryFull { address: from })?;

    if !entry.has_live_challenge(now) {
        entry.issue_challenge(Challenge::generate(), now);
    }

    let challenge = entry
        .challenge()
        .expect("challenge just issued or already live")
        .clone();
    debug!(%from, "sending getinfo challenge");
    Ok(vec![(
        from,
        MasterServerResponse::GetInfo(GetInfoMessage::new(challenge)),
    )])
}

/// Implements §4.5's ordered validation list, plus the `clients <= sv_maxclients` rule implied
/// by the testable property in §8 ("transitions ... iff sv_maxclients > 0 and clients <=
/// maxclients") but not spelled out as its own numbered step.
pub fn handle_inforesponse(
    registry: &mut Registry,
    policy: &AcceptedGames,
    from: SocketAddr,
    message: &InfoResponseMessage,
    now: Instant,
) -> Result<(), HandlerError> {
    let info = message.info();

    let entry = registry
        .get_mut(&from)
        .ok_or(HandlerError::NoLiveChallenge { address: from })?;
    if !entry.has_live_challenge(now) {
        warn!(%from, "infoResponse with no live challenge");
        return Err(HandlerError::NoLiveChallenge { address: from });
    }

    let echoed = info.challenge().ok_or(HandlerError::MissingField {
        address: from,
        field: "challenge",
    })?;
    if echoed != entry.challenge().expect("checked live above").as_bytes() {
        warn!(%from, "infoResponse challenge mismatch");
        return Err(HandlerError::ChallengeMismatch { address: from });
    }

    let protocol: ProtocolNumber = info
        .protocol()
        .map_err(|_| HandlerError::MissingField {
            address: from,
            field: "protocol",
        })?
        .ok_or(HandlerError::MissingField {
            address: from,
            field: "protocol",
        })?;

    let gametype = info
        .gametype()
        .map_err(|_| HandlerError::MissingField {
            address: from,
            field: "gametype",
        })?
        .unwrap_or_else(|| GameType::new(b"0".to_vec()).expect("known value to be valid"));

    let max_clients = info
        .sv_maxclients()
        .map_err(|_| HandlerError::MissingField {
            address: from,
            field: "sv_maxclients",
        })?
        .ok_or(HandlerError::MissingField {
            address: from,
            field: "sv_maxclients",
        })?;
    if max_clients == 0 {
        warn!(%from, "infoResponse sv_maxclients = 0");
        return Err(HandlerError::ZeroMaxClients { address: from });
    }

    let clients = info
        .clients()
        .map_err(|_| HandlerError::MissingField {
            address: from,
            field: "clients",
        })?
        .ok_or(HandlerError::MissingField {
            address: from,
            field: "clients",
        })?;
    if clients > max_clients {
        warn!(%from, clients, max_clients, "infoResponse clients exceeds sv_maxclients");
        return Err(HandlerError::ClientsExceedMax {
            address: from,
            clients,
            max: max_clients,
        });
    }

    let gamename = info
        .gamename()
        .map_err(|_| HandlerError::MissingField {
            address: from,
            field: "gamename",
        })?
        .unwrap_or_else(legacy_gamename);

    if !policy.accepts(&gamename) {
        warn!(%from, ?gamename, "infoResponse game not accepted");
        return Err(HandlerError::GameNotAccepted {
            game: String::from_utf8_lossy(gamename.as_bytes()).into_owned(),
        });
    }

    let state = if clients == 0 {
        ServerState::Empty
    } else if clients == max_clients {
        ServerState::Full
    } else {
        ServerState::Occupied
    };

    entry.validate(gamename, protocol, gametype, state, now);
    debug!(%from, ?state, "infoResponse validated");
    Ok(())
}

fn gametype_matches(requested: Option<&GameType>, entry: Option<&GameType>) -> bool {
    match requested {
        None => true,
        Some(requested) => entry == Some(requested),
    }
}

/// Implements §4.6 for the legacy, IPv4-only `getservers` request. Excludes any entry whose
/// `liveness_expiry` has passed, regardless of whether `sweep_periodically` has run yet.
pub fn handle_getservers(
    registry: &Registry,
    policy: &AcceptedGames,
    from: SocketAddr,
    message: &GetServersMessage,
    ipv4_encoding: Ipv4Encoding,
    addrmap: &AddrMap,
    now: Instant,
) -> Vec<Outbound> {
    let gamename = message.game_name().cloned().unwrap_or_else(legacy_gamename);
    if !policy.accepts(&gamename) {
        return Vec::new();
    }

    let filter: &FilterOptions = message.filter_options();
    let protocol = message.protocol_number();

    let mut matched: Vec<SocketAddrV4> = Vec::new();
    for entry in registry.iter() {
        if !entry.state().is_validated() || !entry.is_live(now) {
            continue;
        }
        if entry.protocol() != Some(protocol) {
            continue;
        }
        if entry.state() == ServerState::Empty && !filter.empty() {
            continue;
        }
        if entry.state() == ServerState::Full && !filter.full() {
            continue;
        }
        if !gametype_matches(filter.gametype(), entry.gametype()) {
            continue;
        }
        if entry.gamename() != Some(&gamename) {
            continue;
        }
        let address = match entry.address() {
            SocketAddr::V4(v4) => v4,
            SocketAddr::V6(_) => continue,
        };
        let (ip, port) = match addrmap.resolve(*address.ip()) {
            Some(mapped) => (mapped, address.port()),
            None => (*address.ip(), address.port()),
        };
        matched.push(SocketAddrV4::new(ip, port));
    }

    let mut outbound = Vec::new();
    let mut remaining = &matched[..];
    loop {
        let (fitted, complete) =
            fit_servers_in_packet(remaining, ipv4_encoding, GETSERVERSRESPONSE_HEADER_SIZE);
        let taken = fitted.len();
        let packet = GetServersResponseMessage::new(fitted.to_vec(), complete);
        outbound.push((from, MasterServerResponse::GetServers(packet)));
        remaining = &remaining[taken..];
        if complete {
            break;
        }
        if taken == 0 {
            // A single record should never exceed the packet budget; guard against looping
            // forever if it somehow did.
            break;
        }
    }
    outbound
}

/// Implements §4.6 for the extended, IPv4/IPv6-capable `getserversExt` request. Excludes any
/// entry whose `liveness_expiry` has passed, regardless of whether `sweep_periodically` has
/// run yet.
pub fn handle_getserversext(
    registry: &Registry,
    policy: &AcceptedGames,
    from: SocketAddr,
    message: &GetServersExtMessage,
    ipv4_encoding: Ipv4Encoding,
    addrmap: &AddrMap,
    now: Instant,
) -> Vec<Outbound> {
    let gamename = message.game_name().clone();
    if !policy.accepts(&gamename) {
        return Vec::new();
    }

    let filter: &FilterExtOptions = message.filter_options();
    let protocol = message.protocol_number();

    let mut matched: Vec<SocketAddr> = Vec::new();
    for entry in registry.iter() {
        if !entry.state().is_validated() || !entry.is_live(now) {
            continue;
        }
        if entry.protocol() != Some(protocol) {
            continue;
        }
        if entry.state() == ServerState::Empty && !filter.empty() {
            continue;
        }
        if entry.state() == ServerState::Full && !filter.full() {
            continue;
        }
        if !gametype_matches(filter.gametype(), entry.gametype()) {
            continue;
        }
        if entry.gamename() != Some(&gamename) {
            continue;
        }
        let address = match entry.address() {
            SocketAddr::V4(v4) => {
                if !filter.ipv4() {
                    continue;
                }
                let (ip, port) = match addrmap.resolve(*v4.ip()) {
                    Some(mapped) => (mapped, v4.port()),
                    None => (*v4.ip(), v4.port()),
                };
                SocketAddr::V4(SocketAddrV4::new(ip, port))
            }
            SocketAddr::V6(v6) => {
                if !filter.ipv6() {
                    continue;
                }
                SocketAddr::V6(v6)
            }
        };
        matched.push(address);
    }

    let mut outbound = Vec::new();
    let mut remaining = &matched[..];
    loop {
        let (fitted, complete) = fit_ext_servers_in_packet(
            remaining,
            ipv4_encoding,
            GETSERVERSEXTRESPONSE_HEADER_SIZE,
        );
        let taken = fitted.len();
        let packet = GetServersExtResponseMessage::new(fitted.to_vec(), complete);
        outbound.push((from, MasterServerResponse::GetServersExt(packet)));
        remaining = &remaining[taken..];
        if complete {
            break;
        }
        if taken == 0 {
            break;
        }
    }
    outbound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CHALLENGE_TIMEOUT, LIVENESS_TIMEOUT};
    use dpmaster_proto::messages::{GameName, Info, InfoKey, InfoValue, ProtocolName};
    use std::net::{Ipv4Addr, Ipv6Addr, SocketAddrV4, SocketAddrV6};

    fn client(port: u16) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(127, 0, 0, 1), port))
    }

    fn server(port: u16) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(10, 1, 1, 1), port))
    }

    fn info_with(pairs: &[(&[u8], &[u8])]) -> Info {
        let mut info = Info::new();
        for (k, v) in pairs {
            info.insert(
                InfoKey::new(k.to_vec()).unwrap(),
                InfoValue::new(v.to_vec()).unwrap(),
            );
        }
        info
    }

    #[test]
    fn heartbeat_then_inforesponse_happy_path() {
        let mut registry = Registry::new();
        let policy = AcceptedGames::all();
        let now = Instant::now();
        let from = server(27960);

        let heartbeat = HeartbeatMessage::new(ProtocolName::new(b"DarkPlaces".to_vec()).unwrap());
        let outbound = handle_heartbeat(&mut registry, from, &heartbeat, now).unwrap();
        assert_eq!(outbound.len(), 1);
        let challenge = match &outbound[0].1 {
            MasterServerResponse::GetInfo(msg) => msg.challenge().clone(),
            _ => panic!("expected GetInfo"),
        };

        let info = info_with(&[
            (b"challenge", challenge.as_bytes()),
            (b"protocol", b"68"),
            (b"sv_maxclients", b"8"),
            (b"clients", b"3"),
            (b"gamename", b"Nexuiz"),
        ]);
        let response = InfoResponseMessage::new(info);
        handle_inforesponse(&mut registry, &policy, from, &response, now).unwrap();

        let entry = registry.get(&from).unwrap();
        assert_eq!(entry.state(), ServerState::Occupied);
        assert_eq!(entry.protocol(), Some(68));
    }

    #[test]
    fn inforesponse_with_wrong_challenge_leaves_entry_uninitialized() {
        let mut registry = Registry::new();
        let policy = AcceptedGames::all();
        let now = Instant::now();
        let from = server(27960);

        let heartbeat = HeartbeatMessage::new(ProtocolName::new(b"DarkPlaces".to_vec()).unwrap());
        handle_heartbeat(&mut registry, from, &heartbeat, now).unwrap();

        let info = info_with(&[
            (b"challenge", b"totally-wrong"),
            (b"protocol", b"68"),
            (b"sv_maxclients", b"8"),
            (b"clients", b"0"),
        ]);
        let response = InfoResponseMessage::new(info);
        let result = handle_inforesponse(&mut registry, &policy, from, &response, now);
        assert_eq!(result, Err(HandlerError::ChallengeMismatch { address: from }));
        assert_eq!(registry.get(&from).unwrap().state(), ServerState::Uninitialized);
    }

    #[test]
    fn inforesponse_after_challenge_expiry_is_rejected() {
        let mut registry = Registry::new();
        let policy = AcceptedGames::all();
        let now = Instant::now();
        let from = server(27960);

        let heartbeat = HeartbeatMessage::new(ProtocolName::new(b"DarkPlaces".to_vec()).unwrap());
        let outbound = handle_heartbeat(&mut registry, from, &heartbeat, now).unwrap();
        let challenge = match &outbound[0].1 {
            MasterServerResponse::GetInfo(msg) => msg.challenge().clone(),
            _ => panic!("expected GetInfo"),
        };

        let later = now + CHALLENGE_TIMEOUT + std::time::Duration::from_secs(1);
        let info = info_with(&[
            (b"challenge", challenge.as_bytes()),
            (b"protocol", b"68"),
            (b"sv_maxclients", b"8"),
            (b"clients", b"0"),
        ]);
        let response = InfoResponseMessage::new(info);
        let result = handle_inforesponse(&mut registry, &policy, from, &response, later);
        assert_eq!(result, Err(HandlerError::NoLiveChallenge { address: from }));
    }

    #[test]
    fn shutdown_sentinel_marks_inactive_and_excludes_from_queries() {
        let mut registry = Registry::new();
        let policy = AcceptedGames::all();
        let now = Instant::now();
        let from = server(27960);

        let info = info_with(&[
            (b"challenge", b"abcdef"),
            (b"protocol", b"68"),
            (b"sv_maxclients", b"8"),
            (b"clients", b"0"),
            (b"gamename", b"Nexuiz"),
        ]);
        registry
            .get_or_create(from, true)
            .unwrap()
            .issue_challenge(Challenge::new(b"abcdef".to_vec()).unwrap(), now);
        handle_inforesponse(&mut registry, &policy, from, &InfoResponseMessage::new(info), now)
            .unwrap();
        assert!(registry.get(&from).unwrap().is_live(now));

        let shutdown = HeartbeatMessage::new(
            ProtocolName::new(b"TikiServer-Flatline".to_vec()).unwrap(),
        );
        let outbound = handle_heartbeat(&mut registry, from, &shutdown, now).unwrap();
        assert!(outbound.is_empty());
        assert!(!registry.get(&from).unwrap().is_live(now));

        let query = GetServersMessage::new(
            Some(GameName::new(b"Nexuiz".to_vec()).unwrap()),
            68,
            FilterOptions::new(None, false, false),
        );
        let results = handle_getservers(
            &registry,
            &policy,
            client(27900),
            &query,
            Ipv4Encoding::HexAscii,
            &AddrMap::new(),
            now,
        );
        let total: usize = results
            .iter()
            .map(|(_, msg)| match msg {
                MasterServerResponse::GetServers(r) => r.servers().len(),
                _ => 0,
            })
            .sum();
        assert_eq!(total, 0);
    }

    fn validated_entry(
        registry: &mut Registry,
        addr: SocketAddr,
        gamename: &str,
        protocol: ProtocolNumber,
        state: ServerState,
        now: Instant,
    ) {
        let entry = registry.get_or_create(addr, true).unwrap();
        entry.validate(
            GameName::new(gamename.as_bytes().to_vec()).unwrap(),
            protocol,
            GameType::new(b"0".to_vec()).unwrap(),
            state,
            now,
        );
    }

    #[test]
    fn getservers_legacy_happy_path_single_packet() {
        let mut registry = Registry::new();
        let policy = AcceptedGames::all();
        let now = Instant::now();
        validated_entry(&mut registry, server(27960), "Nexuiz", 3, ServerState::Occupied, now);

        let query = GetServersMessage::new(
            Some(GameName::new(b"Nexuiz".to_vec()).unwrap()),
            3,
            FilterOptions::new(None, false, false),
        );
        let results = handle_getservers(
            &registry,
            &policy,
            client(27900),
            &query,
            Ipv4Encoding::HexAscii,
            &AddrMap::new(),
            now,
        );
        assert_eq!(results.len(), 1);
        match &results[0].1 {
            MasterServerResponse::GetServers(msg) => {
                assert_eq!(msg.servers().len(), 1);
                assert!(msg.eot());
            }
            _ => panic!("expected GetServers"),
        }
    }

    #[test]
    fn getservers_excludes_expired_entry_before_sweep_runs() {
        let mut registry = Registry::new();
        let policy = AcceptedGames::all();
        let now = Instant::now();
        validated_entry(&mut registry, server(27960), "Nexuiz", 3, ServerState::Occupied, now);

        // No sweep has run; the entry is still in the map, but its liveness window has
        // passed, so list queries must exclude it on their own.
        let stale = now + LIVENESS_TIMEOUT + std::time::Duration::from_secs(1);
        assert_eq!(registry.len(), 1);

        let query = GetServersMessage::new(
            Some(GameName::new(b"Nexuiz".to_vec()).unwrap()),
            3,
            FilterOptions::new(None, false, false),
        );
        let results = handle_getservers(
            &registry,
            &policy,
            client(27900),
            &query,
            Ipv4Encoding::HexAscii,
            &AddrMap::new(),
            stale,
        );
        let total: usize = results
            .iter()
            .map(|(_, msg)| match msg {
                MasterServerResponse::GetServers(r) => r.servers().len(),
                _ => 0,
            })
            .sum();
        assert_eq!(total, 0);
    }

    #[test]
    fn getserversext_excludes_expired_entry_before_sweep_runs() {
        let mut registry = Registry::new();
        let policy = AcceptedGames::all();
        let now = Instant::now();
        validated_entry(&mut registry, server(27960), "Nexuiz", 3, ServerState::Occupied, now);

        let stale = now + LIVENESS_TIMEOUT + std::time::Duration::from_secs(1);
        let query = GetServersExtMessage::new(
            GameName::new(b"Nexuiz".to_vec()).unwrap(),
            3,
            FilterExtOptions::new(None, false, false, true, true),
        );
        let results = handle_getserversext(
            &registry,
            &policy,
            client(27900),
            &query,
            Ipv4Encoding::HexAscii,
            &AddrMap::new(),
            stale,
        );
        let total: usize = results
            .iter()
            .map(|(_, msg)| match msg {
                MasterServerResponse::GetServersExt(r) => r.servers().len(),
                _ => 0,
            })
            .sum();
        assert_eq!(total, 0);
    }

    #[test]
    fn getservers_ipv6_never_returned_by_legacy_query() {
        let mut registry = Registry::new();
        let policy = AcceptedGames::all();
        let now = Instant::now();
        let v6 = SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::LOCALHOST, 27960, 0, 0));
        let entry = registry.get_or_create(v6, true).unwrap();
        entry.validate(
            GameName::new(b"Nexuiz".to_vec()).unwrap(),
            3,
            GameType::new(b"0".to_vec()).unwrap(),
            ServerState::Occupied,
            now,
        );

        let query = GetServersMessage::new(
            Some(GameName::new(b"Nexuiz".to_vec()).unwrap()),
            3,
            FilterOptions::new(None, false, false),
        );
        let results = handle_getservers(
            &registry,
            &policy,
            client(27900),
            &query,
            Ipv4Encoding::HexAscii,
            &AddrMap::new(),
            now,
        );
        let total: usize = results
            .iter()
            .map(|(_, msg)| match msg {
                MasterServerResponse::GetServers(r) => r.servers().len(),
                _ => 0,
            })
            .sum();
        assert_eq!(total, 0);
    }

    #[test]
    fn getserversext_ipv6_only_filter_excludes_ipv4() {
        let mut registry = Registry::new();
        let policy = AcceptedGames::all();
        let now = Instant::now();
        validated_entry(&mut registry, server(27960), "DarkPlaces-Quake", 3, ServerState::Occupied, now);
        let v6 = SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::LOCALHOST, 27961, 0, 0));
        let entry = registry.get_or_create(v6, true).unwrap();
        entry.validate(
            GameName::new(b"DarkPlaces-Quake".to_vec()).unwrap(),
            3,
            GameType::new(b"0".to_vec()).unwrap(),
            ServerState::Occupied,
            now,
        );

        let query = GetServersExtMessage::new(
            GameName::new(b"DarkPlaces-Quake".to_vec()).unwrap(),
            3,
            FilterExtOptions::new(None, false, false, false, true),
        );
        let results = handle_getserversext(
            &registry,
            &policy,
            client(27900),
            &query,
            Ipv4Encoding::HexAscii,
            &AddrMap::new(),
            now,
        );
        let servers: Vec<SocketAddr> = results
            .iter()
            .flat_map(|(_, msg)| match msg {
                MasterServerResponse::GetServersExt(r) => r.servers().to_vec(),
                _ => Vec::new(),
            })
            .collect();
        assert_eq!(servers, vec![v6]);
    }

    #[test]
    fn getservers_pagination_splits_across_packets() {
        let mut registry = Registry::new();
        let policy = AcceptedGames::all();
        let now = Instant::now();
        for i in 0..200u32 {
            let addr = SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::new(10, 0, (i / 256) as u8, (i % 256) as u8),
                27960,
            ));
            validated_entry(&mut registry, addr, "Nexuiz", 3, ServerState::Occupied, now);
        }

        let query = GetServersMessage::new(
            Some(GameName::new(b"Nexuiz".to_vec()).unwrap()),
            3,
            FilterOptions::new(None, false, false),
        );
        let results = handle_getservers(
            &registry,
            &policy,
            client(27900),
            &query,
            Ipv4Encoding::HexAscii,
            &AddrMap::new(),
            now,
        );
        assert!(results.len() >= 2);
        let total: usize = results
            .iter()
            .map(|(_, msg)| match msg {
                MasterServerResponse::GetServers(r) => r.servers().len(),
                _ => 0,
            })
            .sum();
        assert_eq!(total, 200);
        let eot_count = results
            .iter()
            .filter(|(_, msg)| matches!(msg, MasterServerResponse::GetServers(r) if r.eot()))
            .count();
        assert_eq!(eot_count, 1);
    }

    #[test]
    fn addrmap_substitutes_ipv4_address() {
        let mut registry = Registry::new();
        let policy = AcceptedGames::all();
        let now = Instant::now();
        validated_entry(&mut registry, server(27960), "Nexuiz", 3, ServerState::Occupied, now);
        let addrmap = AddrMap::from_pairs(vec![(Ipv4Addr::new(10, 1, 1, 1), Ipv4Addr::new(203, 0, 113, 9))]);

        let query = GetServersMessage::new(
            Some(GameName::new(b"Nexuiz".to_vec()).unwrap()),
            3,
            FilterOptions::new(None, false, false),
        );
        let results = handle_getservers(
            &registry,
            &policy,
            client(27900),
            &query,
            Ipv4Encoding::HexAscii,
            &addrmap,
            now,
        );
        match &results[0].1 {
            MasterServerResponse::GetServers(msg) => {
                assert_eq!(msg.servers()[0].ip(), &Ipv4Addr::new(203, 0, 113, 9));
            }
            _ => panic!("expected GetServers"),
        }
    }

    #[test]
    fn filter_monotonicity_empty_full_is_superset() {
        let mut registry = Registry::new();
        let policy = AcceptedGames::all();
        let now = Instant::now();
        validated_entry(&mut registry, server(1), "Nexuiz", 3, ServerState::Empty, now);
        validated_entry(&mut registry, server(2), "Nexuiz", 3, ServerState::Occupied, now);
        validated_entry(&mut registry, server(3), "Nexuiz", 3, ServerState::Full, now);

        let count = |empty: bool, full: bool| {
            let query = GetServersMessage::new(
                Some(GameName::new(b"Nexuiz".to_vec()).unwrap()),
                3,
                FilterOptions::new(None, empty, full),
            );
            let results = handle_getservers(
                &registry,
                &policy,
                client(27900),
                &query,
                Ipv4Encoding::HexAscii,
                &AddrMap::new(),
                now,
            );
            results
                .iter()
                .map(|(_, msg)| match msg {
                    MasterServerResponse::GetServers(r) => r.servers().len(),
                    _ => 0,
                })
                .sum::<usize>()
        };

        assert_eq!(count(false, false), 1); // Occupied only
        assert_eq!(count(true, false), 2);
        assert_eq!(count(false, true), 2);
        assert_eq!(count(true, true), 3);
    }
}

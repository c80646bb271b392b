#![warn(missing_docs)]

//! Protocol datagram "messages" and related types
//!
//! The dpmaster protocol consists of a few messages that are passed between game servers and the master server to register a game server:
//! 1. [`heartbeat`](HeartbeatMessage)
//! 2. [`getinfo`](GetInfoMessage)
//! 3. [`infoResponse`](InfoResponseMessage)
//!
//! Then there are message that are passed between game clients and the master server to query game servers:
//! 1. [`getservers`](GetServersMessage)
//! 2. [`getserversResponse`](GetServersResponseMessage)
//!
//! To support [IPv6](https://en.wikipedia.org/wiki/IPv6) there are extended versions of the previous messages:
//! 1. [`getserversExt`](GetServersExtMessage)
//! 2. [`getserversExtResponse`](GetServersExtResponseMessage)

use crate::error::{EmptyError, InvalidByteError, InvalidChallengeError};
use crate::{ProtocolError, Result};

use memchr::memchr2;
use rand::Rng;

fn is_ascii_printable(chr: u8) -> bool {
    chr >= 33 && chr <= 126
}

/// Historical bounds for generated [`Challenge`](Challenge) length, inherited from the
/// dpmaster/ef2master lineage this crate reimplements.
pub const CHALLENGE_MIN_LENGTH: usize = 6;
/// See [`CHALLENGE_MIN_LENGTH`].
pub const CHALLENGE_MAX_LENGTH: usize = 33;

/// "Password" to authenticate messages
///
/// Contained in a [`getinfo` message](GetInfoMessage) and [`infoResponse` message](InfoResponseMessage).
///
/// The dpmaster protocol uses [UDP](https://en.wikipedia.org/wiki/User_Datagram_Protocol) which is spoofable so,
/// to authenticate datagrams and prevent denial-of-service in the ([`heartbeat`](HeartbeatMessage) →) [`getinfo`](GetInfoMessage) → [`infoResponse`](InfoResponseMessage) chain,
/// a "password" is used that should only be known to the game server and the master server.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Challenge(Vec<u8>);

impl Challenge {
    /// Creates a new `Challenge` from a container of bytes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use dpmaster_proto::messages::Challenge;
    /// let challenge = Challenge::new(*b"A_ch4Lleng3")?;
    /// # Ok::<(), dpmaster_proto::error::InvalidChallengeError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Will return an [EmptyError](crate::error::EmptyError) if the supplied bytes are empty.
    /// ```rust
    /// # use dpmaster_proto::{error::InvalidChallengeError, messages::Challenge};
    /// #
    /// assert!(matches!(Challenge::new(*b"").unwrap_err(), InvalidChallengeError::Empty(..)));
    /// ```
    ///
    /// Will return [InvalidByteError](crate::error::InvalidByteError)
    /// if a supplied byte is not [ASCII](https://en.wikipedia.org/wiki/ASCII) printable (code 33 to 126)
    /// or is one of the disallowed characters `\`, `/`, `;`, `"` or `%`.
    /// ```rust
    /// # use dpmaster_proto::{error::InvalidChallengeError, messages::Challenge};
    /// #
    /// assert!(matches!(Challenge::new(*b"\xFF").unwrap_err(), InvalidChallengeError::InvalidByte(..)));
    /// assert!(matches!(Challenge::new(*b"uhoh;").unwrap_err(), InvalidChallengeError::InvalidByte(..)));
    /// ```
    pub fn new<T: Into<Vec<u8>>>(t: T) -> Result<Self, InvalidChallengeError> {
        let bytes = t.into();

        if bytes.is_empty() {
            return Err(EmptyError(()))?;
        }

        for (offset, byte) in bytes.iter().copied().enumerate() {
            if !is_ascii_printable(byte) || [b'\\', b'/', b';', b'"', b'%'].contains(&byte) {
                return Err(InvalidByteError(offset, bytes))?;
            }
        }

        Ok(Self(bytes))
    }

    /// Generates a fresh, random `Challenge` of a length in `[CHALLENGE_MIN_LENGTH, CHALLENGE_MAX_LENGTH]`.
    ///
    /// Every byte is drawn uniformly from printable ASCII (`33..=126`), excluding the bytes that
    /// would corrupt an infostring round-trip (`\`, `/`, `;`, `"`, `%`). Uses the thread-local CSPRNG
    /// rather than a weak PRNG, so successive challenges cannot be predicted by an observer within
    /// the 2 second validity window.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let length = rng.gen_range(CHALLENGE_MIN_LENGTH..=CHALLENGE_MAX_LENGTH);
        let mut bytes = Vec::with_capacity(length);
        while bytes.len() < length {
            let candidate: u8 = rng.gen_range(33..=126);
            if [b'\\', b'/', b';', b'"', b'%'].contains(&candidate) {
                continue;
            }
            bytes.push(candidate);
        }
        Self(bytes)
    }

    /// Returns the raw bytes of this challenge.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl<I: std::slice::SliceIndex<[u8]>> std::ops::Index<I> for Challenge {
    type Output = I::Output;

    fn index(&self, index: I) -> &Self::Output {
        std::ops::Index::index(&self.0, index)
    }
}

/// `getinfo` message
///
/// Sent from the master server to a game server in response to a [`heartbeat`](HeartbeatMessage) message from a game server.\
/// Responded to with a [`infoResponse` message](InfoResponseMessage) from the game server.
///
/// Contains a [`Challenge`](Challenge).
#[derive(Debug, PartialEq, Eq)]
pub struct GetInfoMessage {
    challenge: Challenge,
}

impl GetInfoMessage {
    /// Creates a new `GetInfoMessage` for the given `challenge`.
    pub fn new(challenge: Challenge) -> Self {
        Self { challenge }
    }

    /// Returns the `Challenge` contained in this message.
    pub fn challenge(&self) -> &Challenge {
        &self.challenge
    }
}

/// Maximum number of clients on a game server
///
/// Contained in the [`Info`](Info) of an [`infoResponse` message](InfoResponseMessage).
pub type MaxClientsNumber = u32;

/// Current number of clients on a game server
///
/// Contained in the [`Info`](Info) of an [`infoResponse` message](InfoResponseMessage).
pub type ClientsNumber = u32;

/// Maximum length, in bytes, of a key or value in an [`Info`](Info) before it is
/// considered over-long (mirrors the original's 256-byte static scratch buffer).
pub const INFOSTRING_ITEM_MAX_LENGTH: usize = 255;

/// Key in a [`Info`](Info) key-value pair
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct InfoKey(Vec<u8>);

impl InfoKey {
    /// Creates a new `InfoKey` from a container of bytes.
    pub fn new<T: Into<Vec<u8>>>(t: T) -> Result<Self> {
        let bytes = t.into();

        Ok(Self(bytes))
    }

    /// Returns the raw bytes of this key.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl<I: std::slice::SliceIndex<[u8]>> std::ops::Index<I> for InfoKey {
    type Output = I::Output;

    fn index(&self, index: I) -> &Self::Output {
        std::ops::Index::index(&self.0, index)
    }
}

/// Value in a [`Info`](Info) key-value pair
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct InfoValue(Vec<u8>);

impl InfoValue {
    /// Creates a new `InfoValue` from a container of bytes.
    pub fn new<T: Into<Vec<u8>>>(t: T) -> Result<Self> {
        let bytes = t.into();

        Ok(Self(bytes))
    }

    /// Returns the raw bytes of this value.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl<I: std::slice::SliceIndex<[u8]>> std::ops::Index<I> for InfoValue {
    type Output = I::Output;

    fn index(&self, index: I) -> &Self::Output {
        std::ops::Index::index(&self.0, index)
    }
}

/// strtol-style integer scan: optional sign, then a `0x`/`0X` hex prefix, a leading-zero octal
/// prefix, or plain decimal digits. Returns the number of bytes consumed and the parsed value
/// (`None` if no digits were found in the chosen base).
pub(crate) fn scan_c_long(input: &[u8]) -> (usize, Option<i64>) {
    if input.is_empty() {
        return (0, None);
    }

    let mut pos = 0;
    let negative = match input.first() {
        Some(b'-') => {
            pos += 1;
            true
        }
        Some(b'+') => {
            pos += 1;
            false
        }
        _ => false,
    };

    let (radix, digits_start) = if input[pos..].starts_with(b"0x") || input[pos..].starts_with(b"0X")
    {
        (16, pos + 2)
    } else if input[pos..].starts_with(b"0") && input.len() > pos + 1 {
        (8, pos + 1)
    } else {
        (10, pos)
    };

    let digits_end = input[digits_start..]
        .iter()
        .take_while(|b| (**b as char).is_digit(radix))
        .count()
        + digits_start;

    if digits_end == digits_start {
        // No digits in the chosen base; a lone "0" is still valid decimal/octal zero.
        if radix != 10 && digits_start == pos + 1 && input.get(pos) == Some(&b'0') {
            return (pos + 1, Some(0));
        }
        return (pos, None);
    }

    let text = std::str::from_utf8(&input[digits_start..digits_end]).unwrap();
    let magnitude = i64::from_str_radix(text, radix).ok();
    (
        digits_end,
        magnitude.map(|m| if negative { -m } else { m }),
    )
}

/// Like [`scan_c_long`] but only succeeds if the entire input is consumed.
pub(crate) fn parse_c_long_complete(input: &[u8]) -> Option<i64> {
    let (consumed, value) = scan_c_long(input);
    if consumed == input.len() {
        value
    } else {
        None
    }
}

/// Map of [`InfoKey`](InfoKey)-[`InfoValue`](InfoValue) pairs
///
/// Contained in an [`infoResponse` message](InfoResponseMessage).
#[derive(Debug, PartialEq, Eq, Default)]
pub struct Info(indexmap::IndexMap<InfoKey, InfoValue>);

impl Info {
    /// Creates an empty `Info`.
    pub fn new() -> Self {
        Self(indexmap::IndexMap::new())
    }

    /// Inserts a key-value pair, overwriting any previous value for the same key.
    pub fn insert(&mut self, key: InfoKey, value: InfoValue) {
        self.0.insert(key, value);
    }

    /// Iterates over the key-value pairs in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, InfoKey, InfoValue> {
        self.0.iter()
    }

    /// Looks up the raw value for `key`, if present.
    pub fn get(&self, key: &[u8]) -> Option<&InfoValue> {
        self.0
            .iter()
            .find(|(k, _)| k.as_bytes() == key)
            .map(|(_, v)| v)
    }

    /// Returns the raw bytes of the `challenge` value, for comparison against a stored
    /// [`Challenge`](Challenge) without needing the echoed bytes to themselves be a valid challenge.
    pub fn challenge(&self) -> Option<&[u8]> {
        self.get(b"challenge").map(InfoValue::as_bytes)
    }

    /// Parses the `protocol` value as a base-auto (`strtol(…, 0)`-style) integer.
    ///
    /// Returns `Ok(None)` if the key is absent, `Err` if present but not a valid integer
    /// consuming the whole value.
    pub fn protocol(&self) -> Result<Option<ProtocolNumber>> {
        match self.get(b"protocol") {
            None => Ok(None),
            Some(v) => parse_c_long_complete(v.as_bytes())
                .map(|n| Some(n as i32 as u32))
                .ok_or(ProtocolError::InvalidInteger { field: "protocol" }),
        }
    }

    /// Parses the `sv_maxclients` value as a base-auto integer. Does not itself enforce
    /// non-zero-ness; callers apply that business rule.
    pub fn sv_maxclients(&self) -> Result<Option<MaxClientsNumber>> {
        match self.get(b"sv_maxclients") {
            None => Ok(None),
            Some(v) => parse_c_long_complete(v.as_bytes())
                .map(|n| Some(n as i32 as u32))
                .ok_or(ProtocolError::InvalidInteger {
                    field: "sv_maxclients",
                }),
        }
    }

    /// Parses the `clients` value as a base-auto integer.
    pub fn clients(&self) -> Result<Option<ClientsNumber>> {
        match self.get(b"clients") {
            None => Ok(None),
            Some(v) => parse_c_long_complete(v.as_bytes())
                .map(|n| Some(n as i32 as u32))
                .ok_or(ProtocolError::InvalidInteger { field: "clients" }),
        }
    }

    /// Parses the `gamename` value, validating it is nonempty and contains no whitespace.
    pub fn gamename(&self) -> Result<Option<GameName>> {
        match self.get(b"gamename") {
            None => Ok(None),
            Some(v) => GameName::new(v.as_bytes().to_vec()).map(Some),
        }
    }

    /// Parses the `gametype` value, validating it contains no whitespace.
    pub fn gametype(&self) -> Result<Option<GameType>> {
        match self.get(b"gametype") {
            None => Ok(None),
            Some(v) => GameType::new(v.as_bytes().to_vec()).map(Some),
        }
    }
}

/// `infoResponse` message
///
/// Sent concludingly from a game server to the master server in response to a [`getinfo` message](GetInfoMessage) from the master server.
///
/// Contains [`Info`](Info) metadata.
#[derive(Debug, PartialEq, Eq)]
pub struct InfoResponseMessage {
    info: Info,
}

impl InfoResponseMessage {
    /// Creates a new `InfoResponseMessage` for the given `info`.
    pub fn new(info: Info) -> Self {
        Self { info }
    }

    /// Returns the `Info` contained in this message.
    pub fn info(&self) -> &Info {
        &self.info
    }
}

/// Protocol name
///
/// Contained in a [`heartbeat` message](HeartbeatMessage). Games in this protocol family
/// identify themselves in a heartbeat by their "protocol name" (`DarkPlaces`, `QuakeArena-1`, …)
/// rather than a numeric protocol version; the numeric [`ProtocolNumber`](ProtocolNumber) only
/// shows up later, in `getservers`/`infoResponse`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ProtocolName(Vec<u8>);

impl ProtocolName {
    /// Creates a new `ProtocolName` from a container of bytes.
    pub fn new<T: Into<Vec<u8>>>(t: T) -> Result<Self> {
        let bytes = t.into();
        Ok(Self(bytes))
    }

    /// Returns the raw bytes of this protocol name.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl<I: std::slice::SliceIndex<[u8]>> std::ops::Index<I> for ProtocolName {
    type Output = I::Output;

    fn index(&self, index: I) -> &Self::Output {
        std::ops::Index::index(&self.0, index)
    }
}

impl std::default::Default for ProtocolName {
    fn default() -> Self {
        Self::new(b"DarkPlaces".to_vec()).expect("known value to be valid")
    }
}

/// Shutdown sentinel heartbeat identifier
///
/// A server sending `heartbeat TikiServer-Flatline` is announcing its own shutdown; the
/// master marks its entry inactive immediately instead of issuing a challenge.
pub const HEARTBEAT_SHUTDOWN_SENTINEL: &[u8] = b"TikiServer-Flatline";

/// Maximum length, in bytes, of the game identifier in a [`heartbeat` message](HeartbeatMessage).
pub const HEARTBEAT_GAMEID_MAX_LENGTH: usize = 63;

/// `heartbeat` message
///
/// Sent initially from game servers to the master server.\
/// Responded to with a [`getinfo` message](GetInfoMessage) from the master server.
///
/// Contains a [`ProtocolName`](ProtocolName).
#[derive(Debug, PartialEq, Eq)]
pub struct HeartbeatMessage {
    protocol_name: ProtocolName,
}

impl HeartbeatMessage {
    /// Creates a new `HeartbeatMessage` for the given `protocol_name`.
    pub fn new(protocol_name: ProtocolName) -> Self {
        Self { protocol_name }
    }

    /// Returns the `ProtocolName` contained in this message.
    pub fn protocol_name(&self) -> &ProtocolName {
        &self.protocol_name
    }

    /// Returns `true` if this heartbeat is the shutdown sentinel.
    pub fn is_shutdown_sentinel(&self) -> bool {
        self.protocol_name.as_bytes() == HEARTBEAT_SHUTDOWN_SENTINEL
    }
}

/// Protocol number
///
/// Contained in a [`getservers` message](GetServersMessage), [`getserversExt`](GetServersExtMessage)\
/// and in the [`Info`](Info) of an [`infoResponse` message](InfoResponseMessage).
pub type ProtocolNumber = u32;

/// Game name
///
/// Contained in a [`getservers` message](GetServersMessage), [`getserversExt`](GetServersExtMessage)\
/// and in the [`Info`](Info) of an [`infoResponse` message](InfoResponseMessage).
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct GameName(Vec<u8>);

impl GameName {
    /// Creates a new `GameName` from a container of bytes.
    ///
    /// Game names can contain neither null bytes nor whitespace, and must be nonempty.
    ///
    /// # Examples
    /// ```
    /// use dpmaster_proto::GameName;
    /// let game_name = GameName::new(b"Nexuiz".to_vec());
    /// assert!(game_name.is_ok());
    /// ```
    ///
    /// # Errors
    /// This function will return an error if the supplied bytes contain a
    /// null/`0` byte or whitespace/`' '`, or are empty.
    /// The [`ProtocolError::InvalidGameName`] error will include the invalid byte
    /// as well as the first offset it occurred at.
    /// ```
    /// use dpmaster_proto::{GameName, ProtocolError};
    /// let game_name = GameName::new(b"invalid example".to_vec());
    /// assert_eq!(game_name, Err(ProtocolError::InvalidGameName {byte: b' ', offset: 7}));
    /// ```
    pub fn new<T: Into<Vec<u8>>>(t: T) -> Result<Self> {
        let bytes = t.into();
        if bytes.is_empty() {
            return Err(ProtocolError::EmptyGameName);
        }
        match memchr2(b'\0', b' ', &bytes) {
            Some(i) => Err(ProtocolError::InvalidGameName {
                offset: i,
                byte: bytes[i],
            }),
            None => Ok(Self(bytes)),
        }
    }

    /// Returns the raw bytes of this game name.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl<I: std::slice::SliceIndex<[u8]>> std::ops::Index<I> for GameName {
    type Output = I::Output;

    fn index(&self, index: I) -> &Self::Output {
        std::ops::Index::index(&self.0, index)
    }
}

impl std::str::FromStr for GameName {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s.as_bytes().to_vec())
    }
}

/// The legacy default game name this master server was historically paired with, used
/// whenever a heartbeat or request omits `gamename` entirely (plain Quake III Arena clients
/// never send one).
pub fn legacy_gamename() -> GameName {
    GameName::new(b"STEF2".to_vec()).expect("known value to be valid")
}

/// Game type
///
/// Contained in the [`FilterOptions`](FilterOptions) of a [`getservers` message](GetServersMessage),
/// [`FilterExtOptions`](FilterExtOptions) of an [`getserversExt` message](GetServersExtMessage)\
/// and [`Info`](Info) of an [`infoResponse` message](InfoResponseMessage).
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct GameType(Vec<u8>);

impl GameType {
    /// Creates a new `GameType` from a container of bytes.
    ///
    /// Game types can contain no whitespace.
    pub fn new<T: Into<Vec<u8>>>(t: T) -> Result<Self> {
        let bytes = t.into();
        match memchr::memchr(b' ', &bytes) {
            Some(i) => Err(ProtocolError::InvalidGameType {
                offset: i,
                byte: bytes[i],
            }),
            None => Ok(Self(bytes)),
        }
    }

    /// Returns the raw bytes of this game type.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl<I: std::slice::SliceIndex<[u8]>> std::ops::Index<I> for GameType {
    type Output = I::Output;

    fn index(&self, index: I) -> &Self::Output {
        std::ops::Index::index(&self.0, index)
    }
}

impl std::str::FromStr for GameType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s.as_bytes().to_vec())
    }
}

/// Well-known legacy `gametype` filter shorthands (`ffa`/`tourney`/`team`/`ctf` → `0`/`1`/`3`/`4`).
pub fn gametype_shorthand(name: &[u8]) -> Option<GameType> {
    let digit: &[u8] = match name {
        b"ffa" => b"0",
        b"tourney" => b"1",
        b"team" => b"3",
        b"ctf" => b"4",
        _ => return None,
    };
    Some(GameType::new(digit.to_vec()).expect("known value to be valid"))
}

/// Selects how an IPv4 address and port are encoded in a server record of a
/// [`getserversResponse`](GetServersResponseMessage)/[`getserversExtResponse`](GetServersExtResponseMessage).
///
/// This codebase's historical behavior writes each octet/port byte as two lowercase ASCII
/// hex digits instead of a raw byte, which is non-standard for the dpmaster/Quake III wire
/// format but is what the clients this master was paired with actually expect. Both modes
/// are implemented; [`Ipv4Encoding::HexAscii`] is the default for bug-for-bug compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ipv4Encoding {
    /// 4 raw address bytes + 2 raw port bytes (big-endian); standard dpmaster wire format.
    Raw,
    /// Each address octet and port byte as two lowercase ASCII hex digits (zero-padded).
    HexAscii,
}

impl Default for Ipv4Encoding {
    fn default() -> Self {
        Ipv4Encoding::HexAscii
    }
}

/// Filter options for a [`getservers` message](GetServersMessage)
///
/// Contains a [`GameType`](GameType) and "empty" / "full" options.
///
/// IPv4-only variant of [`FilterExtOptions`](FilterExtOptions).
#[derive(Debug, PartialEq, Eq)]
pub struct FilterOptions {
    /// `gametype=X` filter option
    gametype: Option<GameType>,
    /// empty servers option
    empty: bool,
    /// full servers option
    full: bool,
}

impl FilterOptions {
    /// Creates a new `FilterOptions` for the given `gametype`, `empty` / `full` options.
    pub fn new(gametype: Option<GameType>, empty: bool, full: bool) -> Self {
        Self {
            gametype,
            empty,
            full,
        }
    }

    /// Returns the `GameType` option contained in this filter.
    pub fn gametype(&self) -> Option<&GameType> {
        self.gametype.as_ref()
    }

    /// Returns the "empty" option contained in this filter.
    pub fn empty(&self) -> bool {
        self.empty
    }

    /// Returns the "full" option contained in this filter.
    pub fn full(&self) -> bool {
        self.full
    }
}

/// `getservers` message
///
/// Sent initially from a game client to the master server.\
/// Responded to with a [`getserversResponse` message](GetServersResponseMessage) from the master server.
///
/// Contains a [`GameName`](GameName), [`ProtocolNumber`](ProtocolNumber) and [`FilterOptions`](FilterOptions).
///
/// IPv4-only variant of the [`getserversExt` message](GetServersExtMessage).
#[derive(Debug, PartialEq, Eq)]
pub struct GetServersMessage {
    game_name: Option<GameName>,
    protocol_number: ProtocolNumber,
    filter_options: FilterOptions,
}

impl GetServersMessage {
    /// Creates a new `GetServersMessage` for the given `game_name`, `protocol_number` and `filter_options`.
    pub fn new(
        game_name: Option<GameName>,
        protocol_number: ProtocolNumber,
        filter_options: FilterOptions,
    ) -> Self {
        Self {
            game_name,
            protocol_number,
            filter_options,
        }
    }

    /// Returns the `GameName` contained in this message, or `None` if the request was a bare
    /// legacy `getservers <protocol>` (in which case the legacy default gamename applies).
    pub fn game_name(&self) -> Option<&GameName> {
        self.game_name.as_ref()
    }

    /// Returns the `ProtocolNumber` contained in this message.
    pub fn protocol_number(&self) -> ProtocolNumber {
        self.protocol_number
    }

    /// Returns the `FilterOptions` contained in this message.
    pub fn filter_options(&self) -> &FilterOptions {
        &self.filter_options
    }
}

/// `getserversResponse` message
///
/// Sent concludingly from the master server to a game client in response to a [`getservers` message](GetServersMessage) from the game client.
///
/// Contains a list of [`SocketAddrV4`](std::net::SocketAddrV4) and End-of-Transmission flag.
///
/// IPv4-only variant of the [`getserversExtResponse` message](GetServersExtResponseMessage).
#[derive(Debug, PartialEq, Eq)]
pub struct GetServersResponseMessage {
    servers: Vec<std::net::SocketAddrV4>,
    eot: bool,
}

impl GetServersResponseMessage {
    /// Creates a new `GetServersResponseMessage` for the given `servers` and "eot" flag.
    pub fn new(servers: Vec<std::net::SocketAddrV4>, eot: bool) -> Self {
        Self { servers, eot }
    }

    /// Returns the server socket addresses contained in this message.
    pub fn servers(&self) -> &[std::net::SocketAddrV4] {
        &self.servers[..]
    }

    /// Returns the EOT flag contained in this message.
    pub fn eot(&self) -> bool {
        self.eot
    }
}

/// Filter options for a [`getserversExt` message](GetServersExtMessage)
///
/// Contains a [`GameType`](GameType), "empty" / "full" and "ipv4" / "ipv6" options.
///
/// IPv6-enabled variant of [`FilterOptions`](FilterOptions).
#[derive(Debug, PartialEq, Eq)]
pub struct FilterExtOptions {
    /// `gametype=X` filter option
    gametype: Option<GameType>,
    /// empty servers option
    empty: bool,
    /// full servers option
    full: bool,
    // IPv4 servers option
    ipv4: bool,
    // IPv6 servers option
    ipv6: bool,
}

impl FilterExtOptions {
    /// Creates a new `FilterExtOptions` for the given `gametype`, `empty` / `full` and `ìpv4` / `ipv6` options.
    pub fn new(
        gametype: Option<GameType>,
        empty: bool,
        full: bool,
        ipv4: bool,
        ipv6: bool,
    ) -> Self {
        Self {
            gametype,
            empty,
            full,
            ipv4,
            ipv6,
        }
    }

    /// Returns the `GameType` option contained in this filter.
    pub fn gametype(&self) -> Option<&GameType> {
        self.gametype.as_ref()
    }

    /// Returns the "empty" option contained in this filter.
    pub fn empty(&self) -> bool {
        self.empty
    }

    /// Returns the "full" option contained in this filter.
    pub fn full(&self) -> bool {
        self.full
    }

    /// Returns the "ipv4" option contained in this filter.
    pub fn ipv4(&self) -> bool {
        self.ipv4
    }

    /// Returns the "ipv6" option contained in this filter.
    pub fn ipv6(&self) -> bool {
        self.ipv6
    }
}

/// `getserversExt` message
///
/// Sent initially from a game client to the master server.\
/// Responded to with a [`getserversExtResponse` messsage](GetServersExtResponseMessage) from the master server.
///
/// Contains a [`GameName`](GameName), [`ProtocolNumber`](ProtocolNumber) and [`FilterExtOptions`](FilterExtOptions).
///
/// IPv6-enabled variant of the [`getservers` message](GetServersMessage).
#[derive(Debug, PartialEq, Eq)]
pub struct GetServersExtMessage {
    game_name: GameName,
    protocol_number: ProtocolNumber,
    filter_options: FilterExtOptions,
}

impl GetServersExtMessage {
    /// Creates a new `GetServersExtMessage` for the given `game_name`, `protocol_number` and `filter_options`.
    pub fn new(
        game_name: GameName,
        protocol_number: ProtocolNumber,
        filter_options: FilterExtOptions,
    ) -> Self {
        Self {
            game_name,
            protocol_number,
            filter_options,
        }
    }

    /// Returns the `GameName` contained in this message.
    pub fn game_name(&self) -> &GameName {
        &self.game_name
    }

    /// Returns the `ProtocolNumber` contained in this message.
    pub fn protocol_number(&self) -> ProtocolNumber {
        self.protocol_number
    }

    /// Returns the `FilterExtOptions` contained in this message.
    pub fn filter_options(&self) -> &FilterExtOptions {
        &self.filter_options
    }
}

/// `getserversExtResponse` message
///
/// Sent concludingly from the master server to a game client in response to a [`getserversExt` message](GetServersExtMessage) from the game client.
///
/// Contains a list of [`SocketAddr`](std::net::SocketAddr) and End-of-Transmission flag.
///
/// IPv6-enabled variant of the [`getserversResponse` message](GetServersResponseMessage).
#[derive(Debug, PartialEq, Eq)]
pub struct GetServersExtResponseMessage {
    servers: Vec<std::net::SocketAddr>,
    eot: bool,
}

impl GetServersExtResponseMessage {
    /// Creates a new `GetServersExtResponseMessage` for the given `servers` and "eot" flag.
    pub fn new(servers: Vec<std::net::SocketAddr>, eot: bool) -> Self {
        Self { servers, eot }
    }

    /// Returns the server socket addresses contained in this message.
    pub fn servers(&self) -> &[std::net::SocketAddr] {
        &self.servers
    }

    /// Returns the EOT flag contained in this message.
    pub fn eot(&self) -> bool {
        self.eot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_c_long_decimal() {
        assert_eq!(scan_c_long(b"67"), (2, Some(67)));
        assert_eq!(scan_c_long(b"67 empty"), (2, Some(67)));
    }

    #[test]
    fn test_scan_c_long_hex() {
        assert_eq!(scan_c_long(b"0x2a"), (4, Some(42)));
    }

    #[test]
    fn test_scan_c_long_octal() {
        assert_eq!(scan_c_long(b"010"), (3, Some(8)));
    }

    #[test]
    fn test_scan_c_long_zero() {
        assert_eq!(scan_c_long(b"0"), (1, Some(0)));
    }

    #[test]
    fn test_scan_c_long_negative() {
        assert_eq!(scan_c_long(b"-5"), (2, Some(-5)));
    }

    #[test]
    fn test_scan_c_long_none() {
        assert_eq!(scan_c_long(b"nope").1, None);
    }

    #[test]
    fn test_challenge_generate_bounds_and_charset() {
        for _ in 0..200 {
            let challenge = Challenge::generate();
            let bytes = challenge.as_bytes();
            assert!(bytes.len() >= CHALLENGE_MIN_LENGTH);
            assert!(bytes.len() <= CHALLENGE_MAX_LENGTH);
            for &b in bytes {
                assert!(is_ascii_printable(b));
                assert!(![b'\\', b'/', b';', b'"', b'%'].contains(&b));
            }
        }
    }

    #[test]
    fn test_info_typed_accessors() {
        let mut info = Info::new();
        info.insert(
            InfoKey::new(b"protocol".to_vec()).unwrap(),
            InfoValue::new(b"24".to_vec()).unwrap(),
        );
        info.insert(
            InfoKey::new(b"sv_maxclients".to_vec()).unwrap(),
            InfoValue::new(b"16".to_vec()).unwrap(),
        );
        info.insert(
            InfoKey::new(b"clients".to_vec()).unwrap(),
            InfoValue::new(b"3".to_vec()).unwrap(),
        );
        info.insert(
            InfoKey::new(b"gamename".to_vec()).unwrap(),
            InfoValue::new(b"STEF2".to_vec()).unwrap(),
        );

        assert_eq!(info.protocol().unwrap(), Some(24));
        assert_eq!(info.sv_maxclients().unwrap(), Some(16));
        assert_eq!(info.clients().unwrap(), Some(3));
        assert_eq!(
            info.gamename().unwrap(),
            Some(GameName::new(b"STEF2".to_vec()).unwrap())
        );
        assert_eq!(info.gametype().unwrap(), None);
    }

    #[test]
    fn test_info_protocol_invalid() {
        let mut info = Info::new();
        info.insert(
            InfoKey::new(b"protocol".to_vec()).unwrap(),
            InfoValue::new(b"24abc".to_vec()).unwrap(),
        );
        assert!(info.protocol().is_err());
    }

    #[test]
    fn test_gamename_empty_rejected() {
        assert_eq!(GameName::new(b"".to_vec()), Err(ProtocolError::EmptyGameName));
    }

    #[test]
    fn test_gametype_shorthand() {
        assert_eq!(
            gametype_shorthand(b"ctf"),
            Some(GameType::new(b"4".to_vec()).unwrap())
        );
        assert_eq!(gametype_shorthand(b"bogus"), None);
    }
}

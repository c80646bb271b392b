//! deserializer for messages

use crate::error::DeserializationError;
use crate::messages::{
    parse_c_long_complete, scan_c_long, Challenge, FilterExtOptions, FilterOptions, GameName,
    GameType, GetInfoMessage, GetServersExtMessage, GetServersExtResponseMessage,
    GetServersMessage, GetServersResponseMessage, HeartbeatMessage, Info, InfoKey,
    InfoResponseMessage, InfoValue, Ipv4Encoding, ProtocolName, ProtocolNumber,
    HEARTBEAT_GAMEID_MAX_LENGTH, INFOSTRING_ITEM_MAX_LENGTH,
};
use nom::branch::alt;
use nom::bytes::complete::{tag, take, take_while, take_while1};
use nom::character::is_newline;
use nom::combinator::{map_opt, map_res, rest};
use nom::error::context;
use nom::multi::{many1, many_till, separated_list0};
use nom::number::complete::{be_u16, be_u8};
use nom::sequence::{preceded, tuple};
use nom::IResult;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ErrorKind {
    MessagePrefix,
}

pub trait ParseError<I>: nom::error::ParseError<I> {
    fn from_dpmaster_error_kind(input: I, kind: ErrorKind) -> Self;
    fn append_dpmaster(input: I, kind: ErrorKind, other: Self) -> Self;
}

#[derive(Clone, Debug, PartialEq)]
pub enum VerboseErrorKind {
    Context(&'static str),
    Char(char),
    Nom(nom::error::ErrorKind),
    Dpmaster(ErrorKind),
}

#[derive(Clone, Debug, PartialEq)]
pub struct VerboseError<I> {
    pub errors: Vec<(I, VerboseErrorKind)>,
}

impl<I> nom::error::ParseError<I> for VerboseError<I> {
    fn from_error_kind(input: I, kind: nom::error::ErrorKind) -> Self {
        VerboseError {
            errors: vec![(input, VerboseErrorKind::Nom(kind))],
        }
    }

    fn append(input: I, kind: nom::error::ErrorKind, mut other: Self) -> Self {
        other.errors.push((input, VerboseErrorKind::Nom(kind)));
        other
    }

    fn from_char(input: I, c: char) -> Self {
        VerboseError {
            errors: vec![(input, VerboseErrorKind::Char(c))],
        }
    }
}

impl<I> ParseError<I> for () {
    fn from_dpmaster_error_kind(_: I, _: ErrorKind) -> Self {}

    fn append_dpmaster(_: I, _: ErrorKind, _: Self) -> Self {}
}

impl<I> ParseError<I> for VerboseError<I> {
    fn from_dpmaster_error_kind(input: I, kind: ErrorKind) -> Self {
        VerboseError {
            errors: vec![(input, VerboseErrorKind::Dpmaster(kind))],
        }
    }

    fn append_dpmaster(input: I, kind: ErrorKind, mut other: Self) -> Self {
        other.errors.push((input, VerboseErrorKind::Dpmaster(kind)));
        other
    }
}

impl<I> nom::error::ContextError<I> for VerboseError<I> {
    fn add_context(input: I, ctx: &'static str, mut other: Self) -> Self {
        other.errors.push((input, VerboseErrorKind::Context(ctx)));
        other
    }
}

impl<I: std::fmt::Display> std::fmt::Display for VerboseError<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Parse error:")?;
        for (input, error) in &self.errors {
            match error {
                VerboseErrorKind::Dpmaster(e) => writeln!(f, "{:?} at: {}", e, input)?,
                VerboseErrorKind::Nom(e) => writeln!(f, "{:?} at: {}", e, input)?,
                VerboseErrorKind::Char(c) => writeln!(f, "expected '{}' at: {}", c, input)?,
                VerboseErrorKind::Context(s) => writeln!(f, "in section '{}', at: {}", s, input)?,
            }
        }

        Ok(())
    }
}

fn append<I: Clone, E: ParseError<I>, F, O>(
    kind: ErrorKind,
    mut f: F,
) -> impl FnMut(I) -> IResult<I, O, E>
where
    F: nom::Parser<I, O, E>,
{
    move |i: I| match f.parse(i.clone()) {
        Ok(o) => Ok(o),
        Err(nom::Err::Incomplete(i)) => Err(nom::Err::Incomplete(i)),
        Err(nom::Err::Error(e)) => Err(nom::Err::Error(E::append_dpmaster(i, kind, e))),
        Err(nom::Err::Failure(e)) => Err(nom::Err::Failure(E::append_dpmaster(i, kind, e))),
    }
}

/// Parser for the `\xFF\xFF\xFF\xFF` message prefix
pub fn message_prefix<'a, Error>(input: &'a [u8]) -> nom::IResult<&'a [u8], &'a [u8], Error>
where
    Error: ParseError<&'a [u8]> + nom::error::ContextError<&'a [u8]>,
{
    context(
        "message prefix",
        append(ErrorKind::MessagePrefix, tag(b"\xFF\xFF\xFF\xFF")),
    )(input)
}

/// Parses the heartbeat game identifier: the first whitespace-delimited token, truncated to
/// [`HEARTBEAT_GAMEID_MAX_LENGTH`] bytes, mirroring `sscanf("%63s", ...)` which stops at the
/// first space rather than scanning to the end of the line.
fn protocol_name(input: &[u8]) -> IResult<&[u8], ProtocolName, DeserializationError<&[u8]>> {
    map_res(
        take_while1(|chr| !is_space(chr) && !is_newline(chr)),
        |bytes: &[u8]| {
            let truncated = &bytes[..bytes.len().min(HEARTBEAT_GAMEID_MAX_LENGTH)];
            ProtocolName::new(truncated.to_vec())
        },
    )(input)
}

fn heartbeat_command(input: &[u8]) -> IResult<&[u8], &[u8], DeserializationError<&[u8]>> {
    tag(b"heartbeat")(input)
}

fn heartbeat_payload(
    input: &[u8],
) -> IResult<&[u8], HeartbeatMessage, DeserializationError<&[u8]>> {
    let (input, (_, protocol_name, _, _)) = tuple((
        take_while1(is_space),
        protocol_name,
        take_while(|chr| !is_newline(chr)),
        take_while(is_newline),
    ))(input)?;
    Ok((input, HeartbeatMessage::new(protocol_name)))
}

pub fn heartbeat(input: &[u8]) -> IResult<&[u8], HeartbeatMessage, DeserializationError<&[u8]>> {
    preceded(heartbeat_command, heartbeat_payload)(input)
}

pub fn heartbeat_message(
    input: &[u8],
) -> IResult<&[u8], HeartbeatMessage, DeserializationError<&[u8]>> {
    preceded(message_prefix, heartbeat)(input)
}

fn getinfo_command(input: &[u8]) -> IResult<&[u8], &[u8], DeserializationError<&[u8]>> {
    tag(b"getinfo")(input)
}

fn challenge(input: &[u8]) -> IResult<&[u8], Challenge, DeserializationError<&[u8]>> {
    map_res(rest, |bytes: &[u8]| Challenge::new(bytes.to_vec()))(input)
}

fn getinfo_payload(input: &[u8]) -> IResult<&[u8], GetInfoMessage, DeserializationError<&[u8]>> {
    let (input, (_, challenge)) = tuple((take_while1(is_space), challenge))(input)?;
    Ok((input, GetInfoMessage::new(challenge)))
}

pub fn getinfo(input: &[u8]) -> IResult<&[u8], GetInfoMessage, DeserializationError<&[u8]>> {
    preceded(getinfo_command, getinfo_payload)(input)
}

pub fn getinfo_message(
    input: &[u8],
) -> IResult<&[u8], GetInfoMessage, DeserializationError<&[u8]>> {
    preceded(message_prefix, getinfo)(input)
}

fn inforesponse_command(input: &[u8]) -> IResult<&[u8], &[u8], DeserializationError<&[u8]>> {
    tag(b"infoResponse")(input)
}

/// Parses an infostring key. A key over [`INFOSTRING_ITEM_MAX_LENGTH`] bytes is kept as raw
/// bytes; the whole pair is discarded by [`info_kv`] rather than truncating it into a
/// shorter key that might spuriously match a real one.
fn info_key(input: &[u8]) -> IResult<&[u8], &[u8], DeserializationError<&[u8]>> {
    take_while1(|chr| b'\\' != chr)(input)
}

/// Parses an infostring value. A value over [`INFOSTRING_ITEM_MAX_LENGTH`] bytes makes
/// the pair's key unresolvable (`not-found`, per §4.1), so [`info_kv`] discards the pair.
fn info_value(input: &[u8]) -> IResult<&[u8], &[u8], DeserializationError<&[u8]>> {
    take_while(|chr| b'\\' != chr)(input)
}

/// Parses one `\key\value` pair, returning `(raw key bytes, None)` if the key or value is
/// over-long so the caller can tombstone the key instead of storing truncated, possibly-
/// misleading data.
fn info_kv<'a>(
    input: &'a [u8],
) -> IResult<&'a [u8], (&'a [u8], Option<(InfoKey, InfoValue)>), DeserializationError<&'a [u8]>> {
    let (input, (_, k, _, v)) = tuple((tag(b"\\"), info_key, tag(b"\\"), info_value))(input)?;
    if k.len() > INFOSTRING_ITEM_MAX_LENGTH || v.len() > INFOSTRING_ITEM_MAX_LENGTH {
        return Ok((input, (k, None)));
    }
    let key = InfoKey::new(k.to_vec()).unwrap();
    let value = InfoValue::new(v.to_vec()).unwrap();
    Ok((input, (k, Some((key, value)))))
}

fn info(input: &[u8]) -> IResult<&[u8], Info, DeserializationError<&[u8]>> {
    let (input, kv) = many1(info_kv)(input)?;
    let mut info = Info::new();
    // §4.1: lookup returns the first match, so a repeated key's first raw occurrence
    // permanently decides whether it resolves at all -- even if that occurrence carried an
    // over-long value and a later occurrence would otherwise have been valid.
    let mut seen: std::collections::HashSet<&[u8]> = std::collections::HashSet::new();
    for (raw_key, pair) in kv {
        if !seen.insert(raw_key) {
            continue;
        }
        if let Some((key, value)) = pair {
            info.insert(key, value);
        }
    }
    Ok((input, info))
}

fn inforesponse_payload(
    input: &[u8],
) -> IResult<&[u8], InfoResponseMessage, DeserializationError<&[u8]>> {
    let (input, (_, info)) = tuple((tag(b"\n"), info))(input)?;
    Ok((input, InfoResponseMessage::new(info)))
}

pub fn inforesponse(
    input: &[u8],
) -> IResult<&[u8], InfoResponseMessage, DeserializationError<&[u8]>> {
    preceded(inforesponse_command, inforesponse_payload)(input)
}

pub fn inforesponse_message(
    input: &[u8],
) -> IResult<&[u8], InfoResponseMessage, DeserializationError<&[u8]>> {
    preceded(message_prefix, inforesponse)(input)
}

fn getservers_command(input: &[u8]) -> IResult<&[u8], &[u8], DeserializationError<&[u8]>> {
    tag(b"getservers")(input)
}

fn getserversext_command(input: &[u8]) -> IResult<&[u8], &[u8], DeserializationError<&[u8]>> {
    tag(b"getserversExt")(input)
}

fn is_space(chr: u8) -> bool {
    b' ' == chr
}

/// A request token stops only at the next space, matching the original's `sscanf("%s", ...)`
/// semantics (digits are ordinary token characters, not delimiters).
fn token(input: &[u8]) -> IResult<&[u8], &[u8], DeserializationError<&[u8]>> {
    take_while1(|chr| !is_space(chr))(input)
}

fn protocol_number_token(
    input: &[u8],
) -> IResult<&[u8], ProtocolNumber, DeserializationError<&[u8]>> {
    map_opt(token, |bytes: &[u8]| {
        parse_c_long_complete(bytes).map(|n| n as i32 as u32)
    })(input)
}

/// Disambiguates the legacy `getservers <protocol>` form from the DarkPlaces-style
/// `getservers <gamename> <protocol>` form: the first token is tried as a bare base-auto
/// integer first, and only treated as a game name if that fails to fully consume it.
fn getservers_game_and_protocol(
    input: &[u8],
) -> IResult<&[u8], (Option<GameName>, ProtocolNumber), DeserializationError<&[u8]>> {
    let (rest_after_token1, token1) = token(input)?;
    if let Some(n) = parse_c_long_complete(token1) {
        return Ok((rest_after_token1, (None, n as i32 as u32)));
    }

    let game_name = GameName::new(token1.to_vec()).map_err(|_| {
        nom::Err::Error(nom::error::make_error(input, nom::error::ErrorKind::Verify))
    })?;
    let (input, _) = take_while1(is_space)(rest_after_token1)?;
    let (input, protocol_number) = protocol_number_token(input)?;
    Ok((input, (Some(game_name), protocol_number)))
}

enum FilterOption {
    GameType(GameType),
    Empty,
    Full,
    Ipv4,
    Ipv6,
    /// Any token not recognized above; per spec these are ignored rather than rejected,
    /// so a legacy request carrying an extended-only `ipv4`/`ipv6` token (or a future
    /// unknown flag) still parses.
    Unknown,
}

fn filteroption_gametype(
    input: &[u8],
) -> IResult<&[u8], FilterOption, DeserializationError<&[u8]>> {
    let (input, gametype) = preceded(
        tag(b"gametype="),
        map_res(take_while1(|chr| chr != b' '), |bytes: &[u8]| {
            GameType::new(bytes.to_vec())
        }),
    )(input)?;
    Ok((input, FilterOption::GameType(gametype)))
}

/// Matches the well-known legacy gametype shorthands (`ffa`/`tourney`/`team`/`ctf`), which set
/// the same gametype filter as an explicit `gametype=X` token.
fn filteroption_shorthand(
    input: &[u8],
) -> IResult<&[u8], FilterOption, DeserializationError<&[u8]>> {
    map_opt(alt((tag(b"ffa"), tag(b"tourney"), tag(b"team"), tag(b"ctf"))), |bytes: &[u8]| {
        crate::messages::gametype_shorthand(bytes).map(FilterOption::GameType)
    })(input)
}

fn filteroption_empty(input: &[u8]) -> IResult<&[u8], FilterOption, DeserializationError<&[u8]>> {
    let (input, _) = tag(b"empty")(input)?;
    Ok((input, FilterOption::Empty))
}

fn filteroption_full(input: &[u8]) -> IResult<&[u8], FilterOption, DeserializationError<&[u8]>> {
    let (input, _) = tag(b"full")(input)?;
    Ok((input, FilterOption::Full))
}

fn filteroption_ipv4(input: &[u8]) -> IResult<&[u8], FilterOption, DeserializationError<&[u8]>> {
    let (input, _) = tag(b"ipv4")(input)?;
    Ok((input, FilterOption::Ipv4))
}

fn filteroption_ipv6(input: &[u8]) -> IResult<&[u8], FilterOption, DeserializationError<&[u8]>> {
    let (input, _) = tag(b"ipv6")(input)?;
    Ok((input, FilterOption::Ipv6))
}

fn filteroption_unknown(
    input: &[u8],
) -> IResult<&[u8], FilterOption, DeserializationError<&[u8]>> {
    let (input, _) = token(input)?;
    Ok((input, FilterOption::Unknown))
}

fn filteroption(input: &[u8]) -> IResult<&[u8], FilterOption, DeserializationError<&[u8]>> {
    alt((
        filteroption_gametype,
        filteroption_shorthand,
        filteroption_empty,
        filteroption_full,
        filteroption_ipv4,
        filteroption_ipv6,
        filteroption_unknown,
    ))(input)
}

fn filteroption_list(input: &[u8]) -> IResult<&[u8], Vec<FilterOption>, DeserializationError<&[u8]>> {
    separated_list0(tag(b" "), filteroption)(input)
}

fn filteroptions(input: &[u8]) -> IResult<&[u8], FilterOptions, DeserializationError<&[u8]>> {
    let mut gametype: Option<GameType> = None;
    let mut empty: bool = false;
    let mut full: bool = false;

    let (input, filteroptions) = filteroption_list(input)?;
    for filteroption in filteroptions {
        match filteroption {
            FilterOption::GameType(g) => {
                gametype = Some(g);
            }
            FilterOption::Empty => {
                empty = true;
            }
            FilterOption::Full => {
                full = true;
            }
            // Legacy `getservers` requests are implicitly IPv4-only; an `ipv4`/`ipv6` token
            // here (and any other unrecognized token) is ignored per spec.
            FilterOption::Ipv4 | FilterOption::Ipv6 | FilterOption::Unknown => {}
        }
    }

    Ok((input, FilterOptions::new(gametype, empty, full)))
}

fn filterextoptions(
    input: &[u8],
) -> IResult<&[u8], FilterExtOptions, DeserializationError<&[u8]>> {
    let mut gametype: Option<GameType> = None;
    let mut empty: bool = false;
    let mut full: bool = false;
    let mut ipv4: bool = false;
    let mut ipv6: bool = false;

    let (input, filteroptions) = filteroption_list(input)?;
    for filteroption in filteroptions {
        match filteroption {
            FilterOption::GameType(g) => gametype = Some(g),
            FilterOption::Empty => empty = true,
            FilterOption::Full => full = true,
            FilterOption::Ipv4 => ipv4 = true,
            FilterOption::Ipv6 => ipv6 = true,
            FilterOption::Unknown => {}
        }
    }

    // Neither flag set: accept both families.
    if !ipv4 && !ipv6 {
        ipv4 = true;
        ipv6 = true;
    }

    Ok((input, FilterExtOptions::new(gametype, empty, full, ipv4, ipv6)))
}

fn getservers_payload(
    input: &[u8],
) -> IResult<&[u8], GetServersMessage, DeserializationError<&[u8]>> {
    let (input, (_, (game_name, protocol_number), _, filteroptions)) = tuple((
        take_while1(is_space),
        getservers_game_and_protocol,
        take_while(is_space),
        filteroptions,
    ))(input)?;
    Ok((
        input,
        GetServersMessage::new(game_name, protocol_number, filteroptions),
    ))
}

pub fn getservers(input: &[u8]) -> IResult<&[u8], GetServersMessage, DeserializationError<&[u8]>> {
    preceded(getservers_command, getservers_payload)(input)
}

pub fn getservers_message(
    input: &[u8],
) -> IResult<&[u8], GetServersMessage, DeserializationError<&[u8]>> {
    preceded(message_prefix, getservers)(input)
}

fn game_name_required(input: &[u8]) -> IResult<&[u8], GameName, DeserializationError<&[u8]>> {
    map_res(token, |bytes: &[u8]| GameName::new(bytes.to_vec()))(input)
}

fn getserversext_payload(
    input: &[u8],
) -> IResult<&[u8], GetServersExtMessage, DeserializationError<&[u8]>> {
    let (input, (_, game_name, _, protocol_number, _, filteroptions)) = tuple((
        take_while1(is_space),
        game_name_required,
        take_while1(is_space),
        protocol_number_token,
        take_while(is_space),
        filterextoptions,
    ))(input)?;
    Ok((
        input,
        GetServersExtMessage::new(game_name, protocol_number, filteroptions),
    ))
}

pub fn getserversext(
    input: &[u8],
) -> IResult<&[u8], GetServersExtMessage, DeserializationError<&[u8]>> {
    preceded(getserversext_command, getserversext_payload)(input)
}

pub fn getserversext_message(
    input: &[u8],
) -> IResult<&[u8], GetServersExtMessage, DeserializationError<&[u8]>> {
    preceded(message_prefix, getserversext)(input)
}

fn hex_digit_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn hex_byte(input: &[u8]) -> IResult<&[u8], u8, DeserializationError<&[u8]>> {
    map_opt(take(2usize), |bytes: &[u8]| {
        let hi = hex_digit_value(bytes[0])?;
        let lo = hex_digit_value(bytes[1])?;
        Some((hi << 4) | lo)
    })(input)
}

fn socketaddr4_raw(input: &[u8]) -> IResult<&[u8], SocketAddrV4, DeserializationError<&[u8]>> {
    let (input, (a, b, c, d, port)) = tuple((be_u8, be_u8, be_u8, be_u8, be_u16))(input)?;
    let ipv4addr = Ipv4Addr::new(a, b, c, d);
    Ok((input, SocketAddrV4::new(ipv4addr, port)))
}

fn socketaddr4_hex(input: &[u8]) -> IResult<&[u8], SocketAddrV4, DeserializationError<&[u8]>> {
    let (input, (a, b, c, d, p0, p1)) =
        tuple((hex_byte, hex_byte, hex_byte, hex_byte, hex_byte, hex_byte))(input)?;
    let ipv4addr = Ipv4Addr::new(a, b, c, d);
    let port = u16::from_be_bytes([p0, p1]);
    Ok((input, SocketAddrV4::new(ipv4addr, port)))
}

/// Parses a `\`-prefixed IPv4 server record, dispatching to the raw or hex-ascii wire
/// representation according to `encoding`.
fn socketaddr4_with_encoding(
    encoding: Ipv4Encoding,
) -> impl Fn(&[u8]) -> IResult<&[u8], SocketAddrV4, DeserializationError<&[u8]>> {
    move |input| {
        let (input, _) = tag(b"\\")(input)?;
        match encoding {
            Ipv4Encoding::Raw => socketaddr4_raw(input),
            Ipv4Encoding::HexAscii => socketaddr4_hex(input),
        }
    }
}

fn socketaddr6(input: &[u8]) -> IResult<&[u8], SocketAddrV6, DeserializationError<&[u8]>> {
    let (input, _) = tag(b"/")(input)?;
    let (input, octets) = take(16usize)(input)?;
    let (input, port) = be_u16(input)?;
    let mut segments = [0u16; 8];
    for i in 0..8 {
        segments[i] = u16::from_be_bytes([octets[2 * i], octets[2 * i + 1]]);
    }
    let ipv6addr = Ipv6Addr::new(
        segments[0],
        segments[1],
        segments[2],
        segments[3],
        segments[4],
        segments[5],
        segments[6],
        segments[7],
    );
    Ok((input, SocketAddrV6::new(ipv6addr, port, 0, 0)))
}

fn eot(input: &[u8]) -> IResult<&[u8], bool, DeserializationError<&[u8]>> {
    match input {
        b"\\EOT\0\0\0" => Ok((&input[7..], true)),
        b"" => Ok((input, false)),
        _ => Err(nom::Err::Error(nom::error::make_error(
            input,
            nom::error::ErrorKind::Tag,
        ))),
    }
}

fn getserversresponse_payload(
    encoding: Ipv4Encoding,
) -> impl FnMut(&[u8]) -> IResult<&[u8], GetServersResponseMessage, DeserializationError<&[u8]>> {
    move |input| {
        let (input, (servers, eot)) = many_till(socketaddr4_with_encoding(encoding), eot)(input)?;
        Ok((input, GetServersResponseMessage::new(servers, eot)))
    }
}

fn getserversresponse_command(input: &[u8]) -> IResult<&[u8], &[u8], DeserializationError<&[u8]>> {
    tag(b"getserversResponse")(input)
}

/// Parses a `getserversResponse` payload (after the command token) using [`Ipv4Encoding::default`].
pub fn getserversresponse(
    input: &[u8],
) -> IResult<&[u8], GetServersResponseMessage, DeserializationError<&[u8]>> {
    getserversresponse_with_encoding(Ipv4Encoding::default())(input)
}

/// As [`getserversresponse`] but with an explicit IPv4 record encoding.
pub fn getserversresponse_with_encoding(
    encoding: Ipv4Encoding,
) -> impl FnMut(&[u8]) -> IResult<&[u8], GetServersResponseMessage, DeserializationError<&[u8]>> {
    move |input| preceded(getserversresponse_command, getserversresponse_payload(encoding))(input)
}

pub fn getserversresponse_message(
    input: &[u8],
) -> IResult<&[u8], GetServersResponseMessage, DeserializationError<&[u8]>> {
    preceded(message_prefix, getserversresponse)(input)
}

fn getserversextresponse_command(
    input: &[u8],
) -> IResult<&[u8], &[u8], DeserializationError<&[u8]>> {
    tag(b"getserversExtResponse")(input)
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum ExtRecord {
    V4(SocketAddrV4),
    V6(SocketAddrV6),
}

fn extrecord(
    encoding: Ipv4Encoding,
) -> impl Fn(&[u8]) -> IResult<&[u8], ExtRecord, DeserializationError<&[u8]>> {
    move |input| {
        alt((
            |i| socketaddr4_with_encoding(encoding)(i).map(|(i, a)| (i, ExtRecord::V4(a))),
            |i| socketaddr6(i).map(|(i, a)| (i, ExtRecord::V6(a))),
        ))(input)
    }
}

fn getserversextresponse_payload(
    encoding: Ipv4Encoding,
) -> impl FnMut(
    &[u8],
) -> IResult<&[u8], GetServersExtResponseMessage, DeserializationError<&[u8]>> {
    move |input| {
        let (input, (records, eot)) = many_till(extrecord(encoding), eot)(input)?;
        let servers = records
            .into_iter()
            .map(|r| match r {
                ExtRecord::V4(a) => SocketAddr::V4(a),
                ExtRecord::V6(a) => SocketAddr::V6(a),
            })
            .collect();
        Ok((input, GetServersExtResponseMessage::new(servers, eot)))
    }
}

/// Parses a `getserversExtResponse` payload using [`Ipv4Encoding::default`].
pub fn getserversextresponse(
    input: &[u8],
) -> IResult<&[u8], GetServersExtResponseMessage, DeserializationError<&[u8]>> {
    getserversextresponse_with_encoding(Ipv4Encoding::default())(input)
}

/// As [`getserversextresponse`] but with an explicit IPv4 record encoding.
pub fn getserversextresponse_with_encoding(
    encoding: Ipv4Encoding,
) -> impl FnMut(
    &[u8],
) -> IResult<&[u8], GetServersExtResponseMessage, DeserializationError<&[u8]>> {
    move |input| {
        preceded(
            getserversextresponse_command,
            getserversextresponse_payload(encoding),
        )(input)
    }
}

pub fn getserversextresponse_message(
    input: &[u8],
) -> IResult<&[u8], GetServersExtResponseMessage, DeserializationError<&[u8]>> {
    preceded(message_prefix, getserversextresponse)(input)
}

/// Parses the free-form `protocol` value of an [`Info`] entry using base-auto (`strtol(…, 0)`)
/// semantics, returning the parsed value and byte offset consumed rather than requiring complete
/// consumption — used by callers that scan a longer buffer.
pub fn scan_protocol_number(input: &[u8]) -> (usize, Option<ProtocolNumber>) {
    let (consumed, value) = scan_c_long(input);
    (consumed, value.map(|v| v as i32 as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::GameType;

    #[test]
    fn test_message_prefix_empty() {
        let data = &b""[..];
        let result = message_prefix::<VerboseError<_>>(data);
        assert_eq!(
            result,
            Err(nom::Err::Error(VerboseError {
                errors: vec![
                    (&b""[..], VerboseErrorKind::Nom(nom::error::ErrorKind::Tag)),
                    (
                        &b""[..],
                        VerboseErrorKind::Dpmaster(ErrorKind::MessagePrefix)
                    ),
                    (&b""[..], VerboseErrorKind::Context("message prefix")),
                ]
            }))
        );
    }

    #[test]
    fn test_message_prefix_invalid() {
        let data = &b"hurz"[..];
        let result = message_prefix::<VerboseError<_>>(data);
        assert_eq!(
            result,
            Err(nom::Err::Error(VerboseError {
                errors: vec![
                    (
                        &b"hurz"[..],
                        VerboseErrorKind::Nom(nom::error::ErrorKind::Tag)
                    ),
                    (
                        &b"hurz"[..],
                        VerboseErrorKind::Dpmaster(ErrorKind::MessagePrefix)
                    ),
                    (&b"hurz"[..], VerboseErrorKind::Context("message prefix")),
                ]
            }))
        );
    }

    #[test]
    fn test_message_prefix() {
        let data = b"\xFF\xFF\xFF\xFF";
        let result = message_prefix::<()>(data);
        assert_eq!(result, Ok((&b""[..], &b"\xFF\xFF\xFF\xFF"[..])));
    }

    #[test]
    fn test_heartbeat_message_dp() {
        let data = &b"heartbeat DarkPlaces\x0A"[..];
        let result = heartbeat(data);
        assert_eq!(
            result,
            Ok((
                &vec![][..],
                HeartbeatMessage::new(ProtocolName::new(b"DarkPlaces".to_vec()).unwrap(),)
            ))
        );
    }

    #[test]
    fn test_heartbeat_gameid_truncated() {
        let mut data = b"heartbeat ".to_vec();
        data.extend(std::iter::repeat(b'A').take(100));
        data.push(b'\n');
        let (_, message) = heartbeat(&data).unwrap();
        assert_eq!(message.protocol_name().as_bytes().len(), HEARTBEAT_GAMEID_MAX_LENGTH);
    }

    #[test]
    fn test_heartbeat_gameid_stops_at_first_space() {
        let data = &b"heartbeat DarkPlaces garbage\x0A"[..];
        let (_, message) = heartbeat(data).unwrap();
        assert_eq!(
            message.protocol_name(),
            &ProtocolName::new(b"DarkPlaces".to_vec()).unwrap()
        );
    }

    #[test]
    fn test_heartbeat_shutdown_sentinel() {
        let data = &b"heartbeat TikiServer-Flatline\x0A"[..];
        let (_, message) = heartbeat(data).unwrap();
        assert!(message.is_shutdown_sentinel());
    }

    #[test]
    fn test_getinfo_message() {
        let data = &b"getinfo A_ch4Lleng3"[..];
        let result = getinfo(data);
        assert_eq!(
            result,
            Ok((
                &vec![][..],
                GetInfoMessage::new(Challenge::new(b"A_ch4Lleng3".to_vec()).unwrap(),)
            ))
        );
    }

    #[test]
    fn test_inforesponse_message() {
        let data = &b"infoResponse\x0A\\sv_maxclients\\8\\clients\\0"[..];
        let result = inforesponse(data);
        let mut info = Info::new();
        info.insert(
            InfoKey::new(b"sv_maxclients".to_vec()).unwrap(),
            InfoValue::new(b"8".to_vec()).unwrap(),
        );
        info.insert(
            InfoKey::new(b"clients".to_vec()).unwrap(),
            InfoValue::new(b"0".to_vec()).unwrap(),
        );
        assert_eq!(result, Ok((&vec![][..], InfoResponseMessage::new(info),)));
    }

    #[test]
    fn test_inforesponse_skips_overlong_key_and_value() {
        let long_key = "k".repeat(INFOSTRING_ITEM_MAX_LENGTH + 1);
        let long_value = "v".repeat(INFOSTRING_ITEM_MAX_LENGTH + 1);
        let data = format!(
            "infoResponse\n\\{}\\shortvalue\\shortkey\\{}\\clients\\0",
            long_key, long_value
        );
        let (rest, message) = inforesponse(data.as_bytes()).unwrap();
        assert!(rest.is_empty());
        assert_eq!(message.info().get(long_key.as_bytes()), None);
        assert_eq!(message.info().get(b"shortkey"), None);
        assert_eq!(
            message.info().get(b"clients"),
            Some(&InfoValue::new(b"0".to_vec()).unwrap())
        );
    }

    #[test]
    fn test_inforesponse_duplicate_key_keeps_first_value() {
        let data = &b"infoResponse\n\\protocol\\68\\protocol\\99"[..];
        let (_, message) = inforesponse(data).unwrap();
        assert_eq!(
            message.info().get(b"protocol"),
            Some(&InfoValue::new(b"68".to_vec()).unwrap())
        );
    }

    #[test]
    fn test_inforesponse_overlong_first_value_tombstones_later_valid_occurrence() {
        let long_value = "v".repeat(INFOSTRING_ITEM_MAX_LENGTH + 1);
        let data = format!("infoResponse\n\\protocol\\{}\\protocol\\68", long_value);
        let (rest, message) = inforesponse(data.as_bytes()).unwrap();
        assert!(rest.is_empty());
        // The first raw occurrence of "protocol" carried an over-long value, so the key
        // resolves to not-found even though a later occurrence was well-formed.
        assert_eq!(message.info().get(b"protocol"), None);
    }

    #[test]
    fn test_getservers_message_q3a() {
        let data = &b"getservers 67 gametype=0 empty full"[..];
        let result = getservers(data);
        assert_eq!(
            result,
            Ok((
                &vec![][..],
                GetServersMessage::new(
                    None,
                    67,
                    FilterOptions::new(Some(GameType::new(b"0".to_vec()).unwrap()), true, true)
                )
            ))
        );
    }

    #[test]
    fn test_getservers_message_woet() {
        let data = &b"getservers 84"[..];
        let result = getservers(data);
        assert_eq!(
            result,
            Ok((
                &vec![][..],
                GetServersMessage::new(None, 84, FilterOptions::new(None, false, false))
            ))
        );
    }

    #[test]
    fn test_getservers_message_nexuiz() {
        let data = &b"getservers Nexuiz 3"[..];
        let result = getservers(data);
        assert_eq!(
            result,
            Ok((
                &vec![][..],
                GetServersMessage::new(
                    Some(GameName::new(b"Nexuiz".to_vec()).unwrap()),
                    3,
                    FilterOptions::new(None, false, false)
                )
            ))
        );
    }

    #[test]
    fn test_getservers_message_qfusion() {
        let data = &b"getservers qfusion 39 full"[..];
        let result = getservers(data);
        assert_eq!(
            result,
            Ok((
                &vec![][..],
                GetServersMessage::new(
                    Some(GameName::new(b"qfusion".to_vec()).unwrap()),
                    39,
                    FilterOptions::new(None, false, true)
                )
            ))
        );
    }

    #[test]
    fn test_getservers_message_hex_protocol() {
        // base-auto protocol parsing: 0x2a == 42
        let data = &b"getservers 0x2a"[..];
        let result = getservers(data);
        assert_eq!(
            result,
            Ok((
                &vec![][..],
                GetServersMessage::new(None, 42, FilterOptions::new(None, false, false))
            ))
        );
    }

    #[test]
    fn test_getserversresponse_multiple_raw() {
        let data = &b"getserversResponse\\\xC0\x00\x02\x01\x6D\x38\\\xC6\x33\x64\x02\x6D\x39\\\xCB\x00\x71\x03\x6D\x3A"[..];
        let result = getserversresponse_with_encoding(Ipv4Encoding::Raw)(data);
        assert_eq!(
            result,
            Ok((
                &vec![][..],
                GetServersResponseMessage::new(
                    vec![
                        SocketAddrV4::new(Ipv4Addr::new(192, 0, 2, 1), 27960),
                        SocketAddrV4::new(Ipv4Addr::new(198, 51, 100, 2), 27961),
                        SocketAddrV4::new(Ipv4Addr::new(203, 0, 113, 3), 27962),
                    ],
                    false
                )
            ))
        );
    }

    #[test]
    fn test_getserversresponse_eot_raw() {
        let data = &b"getserversResponse\\\x01\x02\x03\x04\x08\x00\\EOT\0\0\0"[..];
        let result = getserversresponse_with_encoding(Ipv4Encoding::Raw)(data);
        assert_eq!(
            result,
            Ok((
                &vec![][..],
                GetServersResponseMessage::new(
                    vec![SocketAddrV4::new(Ipv4Addr::new(1, 2, 3, 4), 2048),],
                    true
                )
            ))
        );
    }

    #[test]
    fn test_getserversresponse_hexascii() {
        let data = &b"getserversResponse\\c0000201\x6D\x38\\EOT\0\0\0"[..];
        let result = getserversresponse_with_encoding(Ipv4Encoding::HexAscii)(data);
        assert_eq!(
            result,
            Ok((
                &vec![][..],
                GetServersResponseMessage::new(
                    vec![SocketAddrV4::new(Ipv4Addr::new(192, 0, 2, 1), 27960),],
                    true
                )
            ))
        );
    }

    #[test]
    fn test_getserversextresponse_mixed() {
        let mut data = Vec::new();
        data.extend_from_slice(b"getserversExtResponse");
        data.extend_from_slice(b"\\c0000201\x6D\x38");
        data.push(b'/');
        data.extend_from_slice(&[0u8; 16]);
        data.extend_from_slice(&27960u16.to_be_bytes());
        data.extend_from_slice(b"\\EOT\0\0\0");

        let result = getserversextresponse_with_encoding(Ipv4Encoding::HexAscii)(&data);
        let (rest, message) = result.unwrap();
        assert!(rest.is_empty());
        assert_eq!(message.servers().len(), 2);
        assert!(message.eot());
    }

    #[test]
    fn test_getserversext_message_ipv6_only() {
        let data = &b"getserversExt DarkPlaces-Quake 68 empty ipv6"[..];
        let (rest, message) = getserversext(data).unwrap();
        assert!(rest.is_empty());
        assert_eq!(
            message.game_name(),
            &GameName::new(b"DarkPlaces-Quake".to_vec()).unwrap()
        );
        assert_eq!(message.protocol_number(), 68);
        assert!(message.filter_options().empty());
        assert!(!message.filter_options().ipv4());
        assert!(message.filter_options().ipv6());
    }

    #[test]
    fn test_getserversext_message_default_both_families() {
        let data = &b"getserversExt Quake3Arena 68"[..];
        let (_, message) = getserversext(data).unwrap();
        assert!(message.filter_options().ipv4());
        assert!(message.filter_options().ipv6());
    }

    #[test]
    fn test_getservers_message_ignores_extended_only_tokens() {
        // A legacy request carrying an `ipv6` token ignores it rather than rejecting the request.
        let data = &b"getservers 68 ipv6 empty"[..];
        let (rest, message) = getservers(data).unwrap();
        assert!(rest.is_empty());
        assert!(message.filter_options().empty());
    }

    #[test]
    fn test_getservers_message_gametype_shorthand() {
        let data = &b"getservers 68 ctf"[..];
        let (_, message) = getservers(data).unwrap();
        assert_eq!(
            message.filter_options().gametype(),
            Some(&GameType::new(b"4".to_vec()).unwrap())
        );
    }
}

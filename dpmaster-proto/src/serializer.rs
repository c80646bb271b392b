//! serializer for messages

use crate::messages::{
    Challenge, FilterExtOptions, FilterOptions, GameName, GameType, GetInfoMessage,
    GetServersExtMessage, GetServersExtResponseMessage, GetServersMessage,
    GetServersResponseMessage, HeartbeatMessage, Info, InfoResponseMessage, Ipv4Encoding,
    ProtocolName, ProtocolNumber,
};
use cookie_factory::bytes::{be_u16, be_u8};
use cookie_factory::combinator::{cond, slice, string};
use cookie_factory::multi::many_ref;
use cookie_factory::sequence::tuple;
use cookie_factory::{SerializeFn, WriteContext};
use std::io::Write;
use std::net::SocketAddr;

/// Largest UDP payload this crate will ever emit for a single response datagram; responses
/// stop appending records once the next one would exceed this.
pub const MAX_PACKET_SIZE_OUT: usize = 1400;

fn gen_message_prefix<W: Write>() -> impl SerializeFn<W> {
    slice(b"\xFF\xFF\xFF\xFF")
}

fn gen_protocol_name<'a, 'b: 'a, W: Write + 'a>(
    protocol_name: &'b ProtocolName,
) -> impl SerializeFn<W> + 'a {
    slice(protocol_name.as_bytes())
}

pub fn gen_heartbeat_message<'a, 'b: 'a, W: Write + 'a>(
    message: &'b HeartbeatMessage,
) -> impl SerializeFn<W> + 'a {
    tuple((
        gen_message_prefix(),
        slice(b"heartbeat "),
        gen_protocol_name(message.protocol_name()),
        slice(b"\n"),
    ))
}

fn gen_challenge<'a, 'b: 'a, W: Write + 'a>(challenge: &'b Challenge) -> impl SerializeFn<W> + 'a {
    slice(challenge.as_bytes())
}

pub fn gen_getinfo_message<'a, 'b: 'a, W: Write + 'a>(
    message: &'b GetInfoMessage,
) -> impl SerializeFn<W> + 'a {
    tuple((
        gen_message_prefix(),
        slice(b"getinfo "),
        gen_challenge(message.challenge()),
    ))
}

fn gen_info_entry<'a, 'b: 'a, W: Write + 'a>(
    entry: (&'b crate::messages::InfoKey, &'b crate::messages::InfoValue),
) -> impl SerializeFn<W> + 'a {
    let (key, value) = entry;
    tuple((
        slice(b"\\"),
        slice(key.as_bytes()),
        slice(b"\\"),
        slice(value.as_bytes()),
    ))
}

pub fn gen_inforesponse_message<'a, 'b: 'a, W: Write + 'a>(
    message: &'b InfoResponseMessage,
) -> impl SerializeFn<W> + 'a {
    tuple((
        gen_message_prefix(),
        slice(b"infoResponse"),
        slice(b"\n"),
        gen_info(message.info()),
    ))
}

fn gen_info<'a, 'b: 'a, W: Write + 'a>(info: &'b Info) -> impl SerializeFn<W> + 'a {
    many_ref(info.iter().collect::<Vec<_>>(), |entry: &(_, _)| {
        gen_info_entry(*entry)
    })
}

fn gen_game_name<'a, 'b: 'a, W: Write + 'a>(game_name: &'b GameName) -> impl SerializeFn<W> + 'a {
    slice(game_name.as_bytes())
}

fn gen_gametype<'a, 'b: 'a, W: Write + 'a>(gametype: &'b GameType) -> impl SerializeFn<W> + 'a {
    slice(gametype.as_bytes())
}

fn gen_protocol_number<W: Write>(protocol_number: ProtocolNumber) -> impl SerializeFn<W> {
    string(protocol_number.to_string())
}

fn gen_filter_options<'a, 'b: 'a, W: Write + 'a>(
    filter_options: &'b FilterOptions,
) -> impl SerializeFn<W> + 'a {
    tuple((
        move |out: WriteContext<W>| match filter_options.gametype() {
            Some(gametype) => {
                tuple((slice(b" "), slice(b"gametype="), gen_gametype(gametype)))(out)
            }
            None => Ok(out),
        },
        cond(filter_options.empty(), slice(b" empty")),
        cond(filter_options.full(), slice(b" full")),
    ))
}

fn gen_filter_ext_options<'a, 'b: 'a, W: Write + 'a>(
    filter_options: &'b FilterExtOptions,
) -> impl SerializeFn<W> + 'a {
    tuple((
        move |out: WriteContext<W>| match filter_options.gametype() {
            Some(gametype) => {
                tuple((slice(b" "), slice(b"gametype="), gen_gametype(gametype)))(out)
            }
            None => Ok(out),
        },
        cond(filter_options.empty(), slice(b" empty")),
        cond(filter_options.full(), slice(b" full")),
        cond(!filter_options.ipv4(), slice(b" ipv6")),
        cond(!filter_options.ipv6(), slice(b" ipv4")),
    ))
}

pub fn gen_getservers_message<'a, 'b: 'a, W: Write + 'a>(
    message: &'b GetServersMessage,
) -> impl SerializeFn<W> + 'a {
    tuple((
        gen_message_prefix(),
        slice(b"getservers "),
        move |out: WriteContext<W>| match message.game_name() {
            Some(game_name) => tuple((gen_game_name(game_name), slice(b" ")))(out),
            None => Ok(out),
        },
        gen_protocol_number(message.protocol_number()),
        gen_filter_options(message.filter_options()),
    ))
}

pub fn gen_getserversext_message<'a, 'b: 'a, W: Write + 'a>(
    message: &'b GetServersExtMessage,
) -> impl SerializeFn<W> + 'a {
    tuple((
        gen_message_prefix(),
        slice(b"getserversExt "),
        gen_game_name(message.game_name()),
        slice(b" "),
        gen_protocol_number(message.protocol_number()),
        gen_filter_ext_options(message.filter_options()),
    ))
}

fn gen_socketaddrv4_raw<'a, 'b: 'a, W: Write + 'a>(
    addr: &'b std::net::SocketAddrV4,
) -> impl SerializeFn<W> + 'a {
    let octets = addr.ip().octets();
    move |out: WriteContext<W>| {
        tuple((
            slice(b"\\"),
            many_ref(&octets[..], |&i| be_u8(i)),
            be_u16(addr.port()),
        ))(out)
    }
}

fn hex_digit(nibble: u8) -> u8 {
    match nibble {
        0..=9 => b'0' + nibble,
        10..=15 => b'a' + (nibble - 10),
        _ => unreachable!(),
    }
}

fn hex_byte_string(byte: u8) -> [u8; 2] {
    [hex_digit(byte >> 4), hex_digit(byte & 0x0F)]
}

fn gen_socketaddrv4_hex<'a, 'b: 'a, W: Write + 'a>(
    addr: &'b std::net::SocketAddrV4,
) -> impl SerializeFn<W> + 'a {
    let mut bytes = Vec::with_capacity(12);
    for octet in addr.ip().octets() {
        bytes.extend_from_slice(&hex_byte_string(octet));
    }
    for byte in addr.port().to_be_bytes() {
        bytes.extend_from_slice(&hex_byte_string(byte));
    }
    move |out: WriteContext<W>| tuple((slice(b"\\"), slice(&bytes[..])))(out)
}

/// Exact wire size, in bytes, of one IPv4 server record under `encoding` including its
/// leading separator. Used to decide whether a record still fits in the packet, rather than
/// the historical implementation's fixed check against the hex-ascii record size regardless
/// of which encoding (or address family) is actually being written next.
pub fn socketaddr4_record_size(encoding: Ipv4Encoding) -> usize {
    match encoding {
        Ipv4Encoding::Raw => 1 + 4 + 2,
        Ipv4Encoding::HexAscii => 1 + 8 + 4,
    }
}

/// Exact wire size, in bytes, of one IPv6 server record (always raw), including its leading `/`.
pub const SOCKETADDR6_RECORD_SIZE: usize = 1 + 16 + 2;

fn gen_socketaddrv4<'a, 'b: 'a, W: Write + 'a>(
    encoding: Ipv4Encoding,
    addr: &'b std::net::SocketAddrV4,
) -> impl SerializeFn<W> + 'a {
    move |out: WriteContext<W>| match encoding {
        Ipv4Encoding::Raw => gen_socketaddrv4_raw(addr)(out),
        Ipv4Encoding::HexAscii => gen_socketaddrv4_hex(addr)(out),
    }
}

fn gen_socketaddrv6<'a, 'b: 'a, W: Write + 'a>(
    addr: &'b std::net::SocketAddrV6,
) -> impl SerializeFn<W> + 'a {
    let octets = addr.ip().octets();
    move |out: WriteContext<W>| {
        tuple((
            slice(b"/"),
            many_ref(&octets[..], |&i| be_u8(i)),
            be_u16(addr.port()),
        ))(out)
    }
}

/// Truncates `servers` to the subset that fits within [`MAX_PACKET_SIZE_OUT`], computing the
/// exact per-record size for each entry rather than assuming every record is the same length.
/// Returns the truncated list and whether every server was included.
pub fn fit_servers_in_packet(
    servers: &[std::net::SocketAddrV4],
    encoding: Ipv4Encoding,
    header_size: usize,
) -> (&[std::net::SocketAddrV4], bool) {
    let record_size = socketaddr4_record_size(encoding);
    let trailer = 7; // "\EOT\0\0\0"
    let budget = MAX_PACKET_SIZE_OUT.saturating_sub(header_size + trailer);
    let max_records = budget / record_size;
    if servers.len() <= max_records {
        (servers, true)
    } else {
        (&servers[..max_records], false)
    }
}

/// As [`fit_servers_in_packet`] for mixed IPv4/IPv6 server lists.
pub fn fit_ext_servers_in_packet(
    servers: &[SocketAddr],
    encoding: Ipv4Encoding,
    header_size: usize,
) -> (&[SocketAddr], bool) {
    let trailer = 7;
    let mut budget = MAX_PACKET_SIZE_OUT.saturating_sub(header_size + trailer);
    let mut count = 0;
    for server in servers {
        let size = match server {
            SocketAddr::V4(_) => socketaddr4_record_size(encoding),
            SocketAddr::V6(_) => SOCKETADDR6_RECORD_SIZE,
        };
        if size > budget {
            break;
        }
        budget -= size;
        count += 1;
    }
    (&servers[..count], count == servers.len())
}

pub fn gen_getserversresponse_message<'a, 'b: 'a, W: Write + 'a>(
    message: &'b GetServersResponseMessage,
    encoding: Ipv4Encoding,
) -> impl SerializeFn<W> + 'a {
    tuple((
        gen_message_prefix(),
        slice(b"getserversResponse"),
        many_ref(message.servers(), move |addr| {
            gen_socketaddrv4(encoding, addr)
        }),
        cond(message.eot(), slice(b"\\EOT\0\0\0")),
    ))
}

pub fn gen_getserversextresponse_message<'a, 'b: 'a, W: Write + 'a>(
    message: &'b GetServersExtResponseMessage,
    encoding: Ipv4Encoding,
) -> impl SerializeFn<W> + 'a {
    tuple((
        gen_message_prefix(),
        slice(b"getserversExtResponse"),
        many_ref(message.servers(), move |addr: &SocketAddr| {
            move |out: WriteContext<W>| match addr {
                SocketAddr::V4(a) => gen_socketaddrv4(encoding, a)(out),
                SocketAddr::V6(a) => gen_socketaddrv6(a)(out),
            }
        }),
        cond(message.eot(), slice(b"\\EOT\0\0\0")),
    ))
}

//! [`tokio_util::codec`] wiring around [`dpmaster_proto`]'s wire format.
//!
//! [`GameClientCodec`] is used by game clients querying a master server: it encodes
//! `getservers`/`getserversExt` requests and decodes the corresponding responses.
//!
//! [`MasterServerCodec`] is used by the master server itself: it decodes the inbound messages
//! a server or client may send (`heartbeat`, `infoResponse`, `getservers`, `getserversExt`) and
//! encodes the master's own outbound messages (`getinfo`, `getserversResponse`,
//! `getserversExtResponse`).

use bytes::{BufMut, BytesMut};
use cookie_factory::gen_simple;
use dpmaster_proto::deserializer::{
    getserversext_message, getserversextresponse_message, getserversresponse_message,
    heartbeat_message, inforesponse_message,
};
use dpmaster_proto::messages::{
    GetInfoMessage, GetServersExtMessage, GetServersExtResponseMessage, GetServersMessage,
    GetServersResponseMessage, HeartbeatMessage, InfoResponseMessage, Ipv4Encoding,
};
use dpmaster_proto::serializer::{
    gen_getinfo_message, gen_getserversext_message, gen_getserversextresponse_message,
    gen_getservers_message, gen_getserversresponse_message,
};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

fn io_error(message: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.to_string())
}

/// Response a game client may receive from a master server.
#[derive(Debug, PartialEq, Eq)]
pub enum GameClientResponse {
    /// Response to a `getservers` request.
    GetServers(GetServersResponseMessage),
    /// Response to a `getserversExt` request.
    GetServersExt(GetServersExtResponseMessage),
}

/// Codec for a game client talking to a master server: encodes `getservers`/`getserversExt`
/// requests, decodes `getserversResponse`/`getserversExtResponse` replies.
pub struct GameClientCodec {
    ipv4_encoding: Ipv4Encoding,
}

impl GameClientCodec {
    /// Creates a codec using the default (historical, hex-ascii) IPv4 record encoding.
    pub fn new() -> Self {
        Self {
            ipv4_encoding: Ipv4Encoding::default(),
        }
    }

    /// Creates a codec using an explicit IPv4 record encoding, for talking to a master that is
    /// known to use the standards-compliant raw wire format.
    pub fn with_ipv4_encoding(ipv4_encoding: Ipv4Encoding) -> Self {
        Self { ipv4_encoding }
    }
}

impl Default for GameClientCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder<GetServersMessage> for GameClientCodec {
    type Error = io::Error;

    fn encode(&mut self, item: GetServersMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let buffer = gen_simple(gen_getservers_message(&item), Vec::new()).map_err(io_error)?;
        dst.put_slice(&buffer);
        Ok(())
    }
}

impl Encoder<GetServersExtMessage> for GameClientCodec {
    type Error = io::Error;

    fn encode(
        &mut self,
        item: GetServersExtMessage,
        dst: &mut BytesMut,
    ) -> Result<(), Self::Error> {
        let buffer = gen_simple(gen_getserversext_message(&item), Vec::new()).map_err(io_error)?;
        dst.put_slice(&buffer);
        Ok(())
    }
}

impl Decoder for GameClientCodec {
    type Item = GameClientResponse;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        let buf = src.split_to(src.len());

        if let Ok((_, message)) = getserversextresponse_message(&buf) {
            return Ok(Some(GameClientResponse::GetServersExt(message)));
        }
        if let Ok((_, message)) = getserversresponse_message(&buf) {
            return Ok(Some(GameClientResponse::GetServers(message)));
        }

        Err(io_error("unrecognized datagram from master server"))
    }
}

/// Inbound message a master server may receive, from either a game server or a game client.
#[derive(Debug, PartialEq, Eq)]
pub enum MasterServerRequest {
    /// A game server announcing itself (or its shutdown, see
    /// [`HeartbeatMessage::is_shutdown_sentinel`]).
    Heartbeat(HeartbeatMessage),
    /// A game server's reply to a `getinfo` challenge.
    InfoResponse(InfoResponseMessage),
    /// A game client's IPv4-only server list request.
    GetServers(GetServersMessage),
    /// A game client's IPv4/IPv6 server list request.
    GetServersExt(GetServersExtMessage),
}

/// Outbound message the master server may send, to either a game server or a game client.
#[derive(Debug, PartialEq, Eq)]
pub enum MasterServerResponse {
    /// Challenge sent to a game server in response to its heartbeat.
    GetInfo(GetInfoMessage),
    /// Server list sent to a game client in response to `getservers`.
    GetServers(GetServersResponseMessage),
    /// Server list sent to a game client in response to `getserversExt`.
    GetServersExt(GetServersExtResponseMessage),
}

/// Codec used by the master server itself.
pub struct MasterServerCodec {
    ipv4_encoding: Ipv4Encoding,
}

impl MasterServerCodec {
    /// Creates a codec using the given IPv4 record encoding for outbound server lists.
    pub fn new(ipv4_encoding: Ipv4Encoding) -> Self {
        Self { ipv4_encoding }
    }
}

impl Decoder for MasterServerCodec {
    type Item = MasterServerRequest;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        let buf = src.split_to(src.len());

        if let Ok((_, message)) = heartbeat_message(&buf) {
            return Ok(Some(MasterServerRequest::Heartbeat(message)));
        }
        if let Ok((_, message)) = inforesponse_message(&buf) {
            return Ok(Some(MasterServerRequest::InfoResponse(message)));
        }
        if let Ok((_, message)) = getserversext_message(&buf) {
            return Ok(Some(MasterServerRequest::GetServersExt(message)));
        }
        if let Ok((_, message)) = dpmaster_proto::deserializer::getservers_message(&buf) {
            return Ok(Some(MasterServerRequest::GetServers(message)));
        }

        Err(io_error("unrecognized datagram"))
    }
}

impl Encoder<MasterServerResponse> for MasterServerCodec {
    type Error = io::Error;

    fn encode(
        &mut self,
        item: MasterServerResponse,
        dst: &mut BytesMut,
    ) -> Result<(), Self::Error> {
        let buffer = match item {
            MasterServerResponse::GetInfo(message) => {
                gen_simple(gen_getinfo_message(&message), Vec::new()).map_err(io_error)?
            }
            MasterServerResponse::GetServers(message) => gen_simple(
                gen_getserversresponse_message(&message, self.ipv4_encoding),
                Vec::new(),
            )
            .map_err(io_error)?,
            MasterServerResponse::GetServersExt(message) => gen_simple(
                gen_getserversextresponse_message(&message, self.ipv4_encoding),
                Vec::new(),
            )
            .map_err(io_error)?,
        };
        dst.put_slice(&buffer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpmaster_proto::messages::{Challenge, FilterOptions};

    #[test]
    fn test_game_client_codec_encode_getservers() {
        let mut codec = GameClientCodec::new();
        let mut buf = BytesMut::new();
        let message = GetServersMessage::new(None, 68, FilterOptions::new(None, false, false));
        codec.encode(message, &mut buf).unwrap();
        assert_eq!(&buf[..], &b"\xFF\xFF\xFF\xFFgetservers 68"[..]);
    }

    #[test]
    fn test_master_server_codec_decode_heartbeat() {
        let mut codec = MasterServerCodec::new(Ipv4Encoding::HexAscii);
        let mut buf = BytesMut::from(&b"\xFF\xFF\xFF\xFFheartbeat DarkPlaces\n"[..]);
        let message = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(
            message,
            MasterServerRequest::Heartbeat(HeartbeatMessage::new(
                dpmaster_proto::messages::ProtocolName::new(b"DarkPlaces".to_vec()).unwrap()
            ))
        );
    }

    #[test]
    fn test_master_server_codec_encode_getinfo() {
        let mut codec = MasterServerCodec::new(Ipv4Encoding::HexAscii);
        let mut buf = BytesMut::new();
        let message = MasterServerResponse::GetInfo(GetInfoMessage::new(
            Challenge::new(b"abcdef".to_vec()).unwrap(),
        ));
        codec.encode(message, &mut buf).unwrap();
        assert_eq!(&buf[..], &b"\xFF\xFF\xFF\xFFgetinfo abcdef"[..]);
    }
}

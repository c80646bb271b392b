use clap::Clap;
use color_eyre::{eyre::Report, eyre::WrapErr};
use dpmaster_codec::{GameClientCodec, GameClientResponse};
use dpmaster_proto::messages::{
    FilterExtOptions, FilterOptions, GameName, GameType, GetServersExtMessage, GetServersMessage,
    Ipv4Encoding,
};
use eyre::eyre;
use futures::{FutureExt, SinkExt};
use std::net::ToSocketAddrs;
use tokio::net::UdpSocket;
use tokio_stream::StreamExt;
use tokio_util::udp::UdpFramed;
use tracing::{debug, info};

#[derive(Clap, Debug)]
struct Opts {
    #[clap(subcommand)]
    subcmd: SubCommand,
}

#[derive(Clap, Debug)]
enum SubCommand {
    GetServers(GetServersOpts),
    GetServersExt(GetServersExtOpts),
}

type Bytes = Vec<u8>;

// TODO: local_bind_addr
#[derive(Clap, Debug)]
struct GetServersOpts {
    #[clap(short, long)]
    master_server: String,

    #[clap(short = 'n', long, parse(from_str))]
    game_name: Option<Bytes>,

    #[clap(short, long)]
    protocol_number: u32,

    #[clap(short = 't', long, parse(from_str))]
    game_type: Option<Bytes>,

    #[clap(short, long)]
    empty: bool,

    #[clap(short, long)]
    full: bool,
}

#[derive(Clap, Debug)]
struct GetServersExtOpts {
    #[clap(short, long)]
    master_server: String,

    #[clap(short = 'n', long, parse(from_str))]
    game_name: Bytes,

    #[clap(short, long)]
    protocol_number: u32,

    #[clap(short = 't', long, parse(from_str))]
    game_type: Option<Bytes>,

    #[clap(short, long)]
    empty: bool,

    #[clap(short, long)]
    full: bool,

    #[clap(long)]
    no_ipv4: bool,

    #[clap(long)]
    no_ipv6: bool,
}

#[tokio::main]
pub async fn main() -> Result<(), Report> {
    install_tracing();

    color_eyre::install()?;

    let opts: Opts = Opts::parse();
    debug!(?opts, "Parsed CLI options");

    match opts.subcmd {
        SubCommand::GetServers(getservers_opts) => {
            let socket = UdpSocket::bind("0.0.0.0:0").await?;
            info!(local_addr = % socket.local_addr()?, "Bound UDP socket");

            let mut framed = UdpFramed::new(socket, GameClientCodec::with_ipv4_encoding(Ipv4Encoding::HexAscii));

            let addr = resolve_master_server(&getservers_opts.master_server)?;
            info!(
                master_server = % addr,
                "Resolved master server {}", getservers_opts.master_server
            );

            let game_name = getservers_opts
                .game_name
                .map(GameName::new)
                .transpose()
                .wrap_err("invalid game name")?;
            let game_type = getservers_opts
                .game_type
                .map(GameType::new)
                .transpose()
                .wrap_err("invalid game type")?;

            let getservers = GetServersMessage::new(
                game_name,
                getservers_opts.protocol_number,
                FilterOptions::new(game_type, getservers_opts.empty, getservers_opts.full),
            );
            info!(request = ? getservers, "Sending request");
            framed.send((getservers, addr)).await?;

            let (response, _addr) = framed
                .next()
                .map(|e| e.ok_or_else(|| eyre!("master server closed connection")))
                .await??;
            match response {
                GameClientResponse::GetServers(response) => {
                    info!(response = ? response, "Received response")
                }
                GameClientResponse::GetServersExt(response) => {
                    info!(response = ? response, "Received response")
                }
            }
        }
        SubCommand::GetServersExt(getserversext_opts) => {
            let socket = UdpSocket::bind("0.0.0.0:0").await?;
            info!(local_addr = % socket.local_addr()?, "Bound UDP socket");

            let mut framed = UdpFramed::new(socket, GameClientCodec::with_ipv4_encoding(Ipv4Encoding::HexAscii));

            let addr = resolve_master_server(&getserversext_opts.master_server)?;
            info!(
                master_server = % addr,
                "Resolved master server {}", getserversext_opts.master_server
            );

            let game_name =
                GameName::new(getserversext_opts.game_name).wrap_err("invalid game name")?;
            let game_type = getserversext_opts
                .game_type
                .map(GameType::new)
                .transpose()
                .wrap_err("invalid game type")?;

            let getserversext = GetServersExtMessage::new(
                game_name,
                getserversext_opts.protocol_number,
                FilterExtOptions::new(
                    game_type,
                    getserversext_opts.empty,
                    getserversext_opts.full,
                    !getserversext_opts.no_ipv4,
                    !getserversext_opts.no_ipv6,
                ),
            );
            info!(request = ? getserversext, "Sending request");
            framed.send((getserversext, addr)).await?;

            let (response, _addr) = framed
                .next()
                .map(|e| e.ok_or_else(|| eyre!("master server closed connection")))
                .await??;
            match response {
                GameClientResponse::GetServers(response) => {
                    info!(response = ? response, "Received response")
                }
                GameClientResponse::GetServersExt(response) => {
                    info!(response = ? response, "Received response")
                }
            }
        }
    }

    Ok(())
}

fn resolve_master_server(master_server: &str) -> Result<std::net::SocketAddr, Report> {
    master_server
        .to_socket_addrs()
        .wrap_err_with(|| format!("Failed to resolve master server {}", master_server))?
        .next()
        .ok_or_else(|| eyre!("Master server {} does not resolve to any address", master_server))
}

fn install_tracing() {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{fmt, EnvFilter};

    let fmt_layer = fmt::layer().with_target(false);
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .init();
}

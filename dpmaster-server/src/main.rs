use clap::Clap;
use color_eyre::eyre::{Report, WrapErr};
use dpmaster_codec::{MasterServerCodec, MasterServerRequest};
use dpmaster_proto::messages::Ipv4Encoding;
use dpmaster_server::config::{Config, Opts};
use dpmaster_server::policy::AcceptedGames;
use dpmaster_server::addrmap::AddrMap;
use dpmaster_server::registry::Registry;
use dpmaster_server::{handle_getservers, handle_getserversext, handle_heartbeat, handle_inforesponse};
use futures::SinkExt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio_stream::StreamExt;
use tokio_util::udp::UdpFramed;
use tracing::{debug, info, warn};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
pub async fn main() -> Result<(), Report> {
    install_tracing();
    color_eyre::install()?;

    let opts: Opts = Opts::parse();
    debug!(?opts, "Parsed CLI options");

    let config = Config::load(&opts).wrap_err("failed to load configuration")?;

    let registry = Arc::new(Mutex::new(match config.max_servers {
        Some(max) => Registry::with_capacity_limit(max),
        None => Registry::new(),
    }));
    let policy = Arc::new(config.accepted_games);
    let addrmap = Arc::new(config.addrmap);
    let ipv4_encoding = config.ipv4_encoding;

    let mut tasks = Vec::new();

    if let Some(listen) = &config.listen {
        let socket = UdpSocket::bind(listen)
            .await
            .wrap_err_with(|| format!("failed to bind IPv4 socket {}", listen))?;
        info!(local_addr = %socket.local_addr()?, "Bound IPv4 UDP socket");
        tasks.push(tokio::spawn(serve(
            socket,
            registry.clone(),
            policy.clone(),
            addrmap.clone(),
            ipv4_encoding,
        )));
    }

    if let Some(listen_v6) = &config.listen_v6 {
        let socket = UdpSocket::bind(listen_v6)
            .await
            .wrap_err_with(|| format!("failed to bind IPv6 socket {}", listen_v6))?;
        info!(local_addr = %socket.local_addr()?, "Bound IPv6 UDP socket");
        tasks.push(tokio::spawn(serve(
            socket,
            registry.clone(),
            policy.clone(),
            addrmap.clone(),
            ipv4_encoding,
        )));
    }

    tasks.push(tokio::spawn(sweep_periodically(registry.clone())));

    for task in tasks {
        task.await??;
    }

    Ok(())
}

/// Drives one socket's receive loop: decode, dispatch, send replies. Implements §4.7's
/// classify-then-route dispatch on top of [`MasterServerCodec`], which already does the
/// longest-prefix-first classification into a [`MasterServerRequest`].
async fn serve(
    socket: UdpSocket,
    registry: Arc<Mutex<Registry>>,
    policy: Arc<AcceptedGames>,
    addrmap: Arc<AddrMap>,
    ipv4_encoding: Ipv4Encoding,
) -> Result<(), Report> {
    let mut framed = UdpFramed::new(socket, MasterServerCodec::new(ipv4_encoding));

    while let Some(received) = framed.next().await {
        let (request, from) = match received {
            Ok(pair) => pair,
            Err(err) => {
                warn!(%err, "dropping unrecognized datagram");
                continue;
            }
        };
        let now = Instant::now();

        let outbound = match request {
            MasterServerRequest::Heartbeat(message) => {
                let mut registry = registry.lock().expect("registry mutex poisoned");
                match handle_heartbeat(&mut registry, from, &message, now) {
                    Ok(outbound) => outbound,
                    Err(err) => {
                        warn!(%from, %err, "heartbeat rejected");
                        Vec::new()
                    }
                }
            }
            MasterServerRequest::InfoResponse(message) => {
                let mut registry = registry.lock().expect("registry mutex poisoned");
                if let Err(err) = handle_inforesponse(&mut registry, &policy, from, &message, now) {
                    warn!(%from, %err, "infoResponse rejected");
                }
                Vec::new()
            }
            MasterServerRequest::GetServers(message) => {
                let registry = registry.lock().expect("registry mutex poisoned");
                handle_getservers(&registry, &policy, from, &message, ipv4_encoding, &addrmap, now)
            }
            MasterServerRequest::GetServersExt(message) => {
                let registry = registry.lock().expect("registry mutex poisoned");
                handle_getserversext(&registry, &policy, from, &message, ipv4_encoding, &addrmap, now)
            }
        };

        for (to, response) in outbound {
            if let Err(err) = framed.send((response, to)).await {
                warn!(%to, %err, "failed to send response");
            }
        }
    }

    Ok(())
}

async fn sweep_periodically(registry: Arc<Mutex<Registry>>) -> Result<(), Report> {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        let now = Instant::now();
        let mut registry = registry.lock().expect("registry mutex poisoned");
        let before = registry.len();
        registry.sweep(now);
        let after = registry.len();
        if before != after {
            debug!(evicted = before - after, remaining = after, "swept stale registry entries");
        }
    }
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

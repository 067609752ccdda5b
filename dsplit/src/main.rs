// Copyright 2020 LEXUGE
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

mod admin;
mod logger;
mod parser;
mod worker;

use self::logger::LogRing;
use self::parser::{Mode, Parsed};
use self::worker::worker;
use anyhow::{Context, Result};
use bytes::Bytes;
use log::*;
use sroute::{
    hosts::import_gfwlist, BlackList, HostList, RespCache, Router, Tunnel, UpstreamSet,
    DNS_TIMEOUT, MAX_LEN,
};
use std::{num::NonZeroUsize, path::PathBuf, sync::Arc};
use structopt::StructOpt;
use tokio::net::UdpSocket;

// Sidecar files, relative to the working directory.
const HOST_FILE: &str = "host.txt";
const CACHE_FILE: &str = "data.txt";

#[derive(StructOpt)]
#[structopt(
    name = "dsplit",
    about = "Split-horizon DNS server with pollution detection and UDP tunneling."
)]
struct Opt {
    /// Path of the configuration file
    #[structopt(short, long, default_value = "config.json", parse(from_os_str))]
    config: PathBuf,

    #[structopt(subcommand)]
    command: Option<Command>,
}

#[derive(StructOpt)]
enum Command {
    /// Rebuild the host list from a gfwlist snapshot
    ImportGfwlist {
        /// gfwlist snapshot to read
        #[structopt(default_value = "gfwlist.txt", parse(from_os_str))]
        input: PathBuf,
        /// Host list to write
        #[structopt(default_value = "host.txt", parse(from_os_str))]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::from_args();

    if let Some(Command::ImportGfwlist { input, output }) = opt.command {
        import_gfwlist(&input, &output)
            .with_context(|| format!("failed to import {}", input.display()))?;
        println!("host list written to {}", output.display());
        return Ok(());
    }

    let config = tokio::fs::read_to_string(&opt.config)
        .await
        .with_context(|| format!("failed to read {}", opt.config.display()))?;
    let p: Parsed = serde_json::from_str(&config).context("failed to parse the configuration")?;

    let ring = logger::init(p.verbosity, p.debug)?;

    match p.mode {
        Mode::Client => run_client(p, ring).await,
        Mode::Server => run_server(p).await,
    }
}

async fn run_client(p: Parsed, ring: Arc<LogRing>) -> Result<()> {
    let listen = p.listen.context("client mode requires a Listen address")?;

    // Every tunnel client doubles as one bypass upstream.
    let mut bypass = Vec::new();
    for (local, remote) in p.bypass_tunnels {
        let tunnel = Tunnel::bind(local, remote, &p.tunnel_password)
            .await
            .with_context(|| format!("failed to start the tunnel on {}", local))?;
        bypass.push(tunnel.local_addr()?);
        tokio::spawn(tunnel.serve());
    }

    let hosts = HostList::load(HOST_FILE).await?;
    let cache = RespCache::new(
        NonZeroUsize::new(p.cache_size).context("CacheSize may not be zero")?,
    );
    if let Err(e) = cache.load(CACHE_FILE).await {
        warn!("failed to load the cache dump: {}", e);
    }

    let router = Arc::new(Router::new(
        hosts,
        BlackList::new(p.black_ip_list),
        cache.clone(),
        UpstreamSet::udp(&p.in_door_servers, DNS_TIMEOUT),
        UpstreamSet::udp(&bypass, DNS_TIMEOUT),
        p.force_remote,
        DNS_TIMEOUT,
    ));

    if let Some(addr) = p.admin_listen {
        let cache = cache.clone();
        let ring = ring.clone();
        tokio::spawn(async move {
            if let Err(e) = admin::serve(addr, cache, ring).await {
                warn!("admin interface failed: {}", e);
            }
        });
    }

    tokio::spawn(save_on_signal(cache));

    info!("dsplit ready!");

    // Bind an UDP socket
    let socket = Arc::new(UdpSocket::bind(listen).await?);
    loop {
        let mut buf = vec![0; MAX_LEN];
        let (len, src) = socket.recv_from(&mut buf).await?;
        buf.truncate(len);

        let router = router.clone();
        let socket = socket.clone();
        tokio::spawn(async move {
            match worker(router, socket, Bytes::from(buf), src).await {
                Ok(_) => (),
                Err(e) => warn!("Handling query failed: {}", e),
            }
        });
    }
}

async fn run_server(p: Parsed) -> Result<()> {
    for (local, remote) in p.server_tunnels {
        let tunnel = Tunnel::bind(local, remote, &p.tunnel_password)
            .await
            .with_context(|| format!("failed to start the tunnel on {}", local))?;
        tokio::spawn(tunnel.serve());
    }

    info!("dsplit ready!");
    wait_for_signal().await;
    Ok(())
}

// The cache survives restarts: dump it when one of the common termination
// signals arrives.
async fn save_on_signal(cache: RespCache) {
    wait_for_signal().await;
    match cache.save(CACHE_FILE).await {
        Ok(_) => info!("cache saved to {}", CACHE_FILE),
        Err(e) => warn!("failed to save the cache: {}", e),
    }
    std::process::exit(0);
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let kinds = [
        SignalKind::interrupt(),
        SignalKind::hangup(),
        SignalKind::terminate(),
        SignalKind::quit(),
        // SIGABRT, which has no named constructor.
        SignalKind::from_raw(6),
    ];
    let mut streams = Vec::new();
    for kind in kinds {
        match signal(kind) {
            Ok(stream) => streams.push(stream),
            Err(e) => warn!("failed to register a signal handler: {}", e),
        }
    }
    if streams.is_empty() {
        return std::future::pending().await;
    }
    let waits: Vec<_> = streams.iter_mut().map(|s| Box::pin(s.recv())).collect();
    futures::future::select_all(waits).await;
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

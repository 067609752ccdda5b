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

//! The obfuscated UDP forwarder carrying the bypass path. Payloads are
//! XOR'd against a repeating key derived from the shared secret; that is
//! traffic-shape obfuscation, not confidentiality.

use crate::{
    error::{Result, RouteError},
    upstream::bind_addr,
};
use log::*;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::UdpSocket, time::timeout};

/// Maximum datagram length carried through the tunnel.
pub const TUNNEL_MAX_LEN: usize = 2048;

/// Per-operation timeout for tunnel I/O.
pub const TUNNEL_TIMEOUT: Duration = Duration::from_secs(4);

/// One end of the tunnel. The client and server deployments are the same
/// forwarder with the listener and remote roles swapped.
pub struct Tunnel {
    socket: Arc<UdpSocket>,
    remote: SocketAddr,
    key: Arc<[u8]>,
}

impl Tunnel {
    /// Bind the listener. An empty secret is refused up front so the
    /// repeating key index is always well-formed.
    pub async fn bind(listen: SocketAddr, remote: SocketAddr, secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(RouteError::EmptySecret);
        }
        Ok(Self {
            socket: Arc::new(UdpSocket::bind(listen).await?),
            remote,
            key: Arc::from(secret.as_bytes()),
        })
    }

    /// The address the listener actually bound, for configs using port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Relay datagrams forever. Every inbound datagram becomes one
    /// request-reply session on its own task with its own buffer.
    pub async fn serve(self) {
        loop {
            let mut buf = vec![0u8; TUNNEL_MAX_LEN];
            let (len, peer) = match self.socket.recv_from(&mut buf).await {
                Ok(v) => v,
                Err(e) => {
                    warn!("tunnel read failed: {}", e);
                    continue;
                }
            };
            buf.truncate(len);

            debug!("handling new tunnel datagram from {}", peer);
            let socket = self.socket.clone();
            let key = self.key.clone();
            let remote = self.remote;
            tokio::spawn(async move {
                if let Err(e) = session(socket, peer, remote, buf, &key).await {
                    debug!("tunnel session with {} ended early: {}", peer, e);
                }
            });
        }
    }
}

// One request-reply cycle: dial, scramble, forward, read a single reply
// within the deadline, scramble, write back to the original peer.
async fn session(
    listener: Arc<UdpSocket>,
    peer: SocketAddr,
    remote: SocketAddr,
    mut buf: Vec<u8>,
    key: &[u8],
) -> Result<()> {
    let socket = UdpSocket::bind(bind_addr(remote.is_ipv4())).await?;
    socket.connect(remote).await?;

    scramble(&mut buf, key);
    timeout(TUNNEL_TIMEOUT, socket.send(&buf)).await??;

    buf.resize(TUNNEL_MAX_LEN, 0);
    let len = timeout(TUNNEL_TIMEOUT, socket.recv(&mut buf)).await??;
    buf.truncate(len);

    scramble(&mut buf, key);
    listener.send_to(&buf, peer).await?;
    Ok(())
}

/// XOR `buf` in place against the repeating `key`. Applying the transform
/// twice with the same key restores the payload; empty payloads pass
/// through unchanged.
pub fn scramble(buf: &mut [u8], key: &[u8]) {
    if key.is_empty() {
        return;
    }
    for (i, b) in buf.iter_mut().enumerate() {
        *b ^= key[i % key.len()];
    }
}

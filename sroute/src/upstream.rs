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

//! Upstream clients and the first-wins racer. A query fans out to every
//! server of a set in parallel; the caller observes the single winner.

use crate::{error::Result, MAX_LEN};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use domain::base::Message;
use futures::future::join_all;
use log::*;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::UdpSocket, sync::mpsc, time::timeout};

/// A handle able to resolve one DNS query into a response.
#[async_trait]
pub trait QHandle: Send + Sync {
    /// Send the query and return the response.
    async fn query(&self, msg: &Message<Bytes>) -> Result<Message<Bytes>>;
}

/// Client instance for UDP upstreams. Every query owns a fresh socket for
/// the duration of its exchange.
#[derive(Clone)]
pub struct Udp {
    addr: SocketAddr,
    timeout: Duration,
}

impl Udp {
    /// Create a new UDP client for the given remote server address.
    pub fn new(addr: SocketAddr, timeout: Duration) -> Self {
        Self { addr, timeout }
    }

    async fn exchange(&self, msg: &Message<Bytes>) -> Result<Message<Bytes>> {
        let socket = UdpSocket::bind(bind_addr(self.addr.is_ipv4())).await?;
        socket.connect(self.addr).await?;

        // Randomnize the message
        let mut msg = Message::from_octets(BytesMut::from(msg.as_slice()))?;
        msg.header_mut().set_random_id();
        let msg = msg.for_slice();

        socket.send(msg.as_slice()).await?;

        loop {
            let mut buf = BytesMut::with_capacity(MAX_LEN);
            buf.resize(MAX_LEN, 0);
            let len = socket.recv(&mut buf).await?;
            buf.resize(len, 0);

            // We ignore garbage since there is a timer on this whole thing.
            let answer = match Message::from_octets(buf.freeze()) {
                Ok(answer) => answer,
                Err(_) => continue,
            };
            if !answer.is_answer(&msg) {
                continue;
            }
            return Ok(answer);
        }
    }
}

#[async_trait]
impl QHandle for Udp {
    async fn query(&self, msg: &Message<Bytes>) -> Result<Message<Bytes>> {
        Ok(timeout(self.timeout, self.exchange(msg)).await??)
    }
}

pub(crate) fn bind_addr(is_ipv4: bool) -> SocketAddr {
    if is_ipv4 {
        ([0u8; 4], 0).into()
    } else {
        ([0u16; 8], 0).into()
    }
}

/// An ordered set of upstream servers raced as one unit.
#[derive(Clone)]
pub struct UpstreamSet {
    upstreams: Vec<Arc<dyn QHandle>>,
}

impl UpstreamSet {
    /// Create a set from pre-built handles.
    pub fn new(upstreams: Vec<Arc<dyn QHandle>>) -> Self {
        Self { upstreams }
    }

    /// Create a set of plain UDP upstreams sharing one per-exchange timeout.
    pub fn udp(addrs: &[SocketAddr], timeout: Duration) -> Self {
        Self {
            upstreams: addrs
                .iter()
                .map(|addr| Arc::new(Udp::new(*addr, timeout)) as Arc<dyn QHandle>)
                .collect(),
        }
    }

    /// Whether the set holds no upstreams.
    pub fn is_empty(&self) -> bool {
        self.upstreams.is_empty()
    }

    /// Fan the query out to every upstream and surface the first response
    /// that is neither a transport failure nor a non-NOERROR answer. `None`
    /// means every worker came up empty.
    pub async fn race(&self, msg: &Message<Bytes>) -> Option<Message<Bytes>> {
        let (tx, mut rx) = mpsc::channel(1);

        let workers: Vec<_> = self
            .upstreams
            .iter()
            .map(|u| {
                let u = u.clone();
                let tx = tx.clone();
                let msg = msg.clone();
                tokio::spawn(async move {
                    let resp = match u.query(&msg).await {
                        Ok(resp) => resp,
                        Err(e) => {
                            debug!("upstream worker came up empty: {}", e);
                            return;
                        }
                    };
                    if !resp.no_error() {
                        debug!("upstream worker dropped a non-NOERROR response");
                        return;
                    }
                    // The slot holds one response; losers drop theirs here.
                    let _ = tx.try_send(Some(resp));
                })
            })
            .collect();

        tokio::spawn(async move {
            join_all(workers).await;
            // Terminate the caller even if no worker produced anything.
            let _ = tx.try_send(None);
        });

        rx.recv().await.flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RouteError;
    use crate::message::first_address;
    use crate::mock::{a_response, query_msg, rcode_response};
    use domain::base::{iana::Rcode, Rtype};
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Mock {
        answer: Message<Bytes>,
        delay: Duration,
        hits: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl QHandle for Mock {
        async fn query(&self, _: &Message<Bytes>) -> Result<Message<Bytes>> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(self.answer.clone())
        }
    }

    struct Failing;

    #[async_trait]
    impl QHandle for Failing {
        async fn query(&self, _: &Message<Bytes>) -> Result<Message<Bytes>> {
            Err(RouteError::IoError(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "mock failure",
            )))
        }
    }

    fn mock(answer: Message<Bytes>, delay_ms: u64) -> Arc<dyn QHandle> {
        Arc::new(Mock {
            answer,
            delay: Duration::from_millis(delay_ms),
            hits: Arc::new(AtomicUsize::new(0)),
        })
    }

    #[tokio::test]
    async fn first_acceptable_response_wins() {
        let q = query_msg("example.org", Rtype::A);
        let fast = a_response(&q, Ipv4Addr::new(1, 1, 1, 1), 60);
        let slow = a_response(&q, Ipv4Addr::new(2, 2, 2, 2), 60);

        let set = UpstreamSet::new(vec![mock(fast, 10), mock(slow, 300)]);
        let winner = set.race(&q).await.unwrap();
        assert_eq!(first_address(&winner), Some("1.1.1.1".parse().unwrap()));
    }

    #[tokio::test]
    async fn errored_responses_are_filtered() {
        let q = query_msg("example.org", Rtype::A);
        let servfail = rcode_response(&q, Rcode::ServFail);
        let good = a_response(&q, Ipv4Addr::new(3, 3, 3, 3), 60);

        // The erroring worker answers first but must not win.
        let set = UpstreamSet::new(vec![mock(servfail, 0), mock(good, 50)]);
        let winner = set.race(&q).await.unwrap();
        assert_eq!(first_address(&winner), Some("3.3.3.3".parse().unwrap()));
    }

    #[tokio::test]
    async fn total_failure_terminates_with_the_sentinel() {
        let q = query_msg("example.org", Rtype::A);
        let set = UpstreamSet::new(vec![
            Arc::new(Failing) as Arc<dyn QHandle>,
            Arc::new(Failing),
        ]);
        assert!(set.race(&q).await.is_none());
    }

    #[tokio::test]
    async fn empty_set_yields_nothing() {
        let q = query_msg("example.org", Rtype::A);
        let set = UpstreamSet::new(Vec::new());
        assert!(set.race(&q).await.is_none());
    }
}

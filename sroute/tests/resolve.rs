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

use domain::base::Rtype;
use sroute::{
    message::first_address,
    mock::{query_msg, Server},
    BlackList, HostList, RespCache, Router, UpstreamSet,
};
use std::{net::Ipv4Addr, num::NonZeroUsize, time::Duration};
use tokio::net::UdpSocket;

#[tokio::test]
async fn resolve_through_a_udp_upstream() {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(Server::new(socket, Ipv4Addr::new(1, 1, 1, 1), 32).run());

    let router = Router::new(
        HostList::new(None),
        BlackList::default(),
        RespCache::new(NonZeroUsize::new(16).unwrap()),
        UpstreamSet::udp(&[addr], Duration::from_secs(1)),
        UpstreamSet::new(Vec::new()),
        false,
        Duration::from_secs(2),
    );

    let query = query_msg("www.apple.com", Rtype::A);
    let resp = router.resolve(query.clone()).await.unwrap().unwrap();
    assert_eq!(resp.header().id(), query.header().id());
    assert_eq!(first_address(&resp), Some("1.1.1.1".parse().unwrap()));

    // The mock served a 32 second TTL; the response must carry the floor.
    let ttls: Vec<u32> = resp
        .answer()
        .unwrap()
        .flatten()
        .map(|r| r.ttl())
        .collect();
    assert_eq!(ttls, vec![600]);
}

#[tokio::test]
async fn racing_two_upstreams_yields_one_response() {
    let first = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let first_addr = first.local_addr().unwrap();
    tokio::spawn(Server::new(first, Ipv4Addr::new(1, 1, 1, 1), 600).run());

    let second = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let second_addr = second.local_addr().unwrap();
    tokio::spawn(Server::new(second, Ipv4Addr::new(2, 2, 2, 2), 600).run());

    let set = UpstreamSet::udp(&[first_addr, second_addr], Duration::from_secs(1));
    let resp = set.race(&query_msg("example.org", Rtype::A)).await.unwrap();
    let addr = first_address(&resp).unwrap();
    assert!(
        addr == "1.1.1.1".parse::<std::net::IpAddr>().unwrap()
            || addr == "2.2.2.2".parse::<std::net::IpAddr>().unwrap()
    );
}

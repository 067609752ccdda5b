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

//! This module is NOT intended to be used by regular users. It is used for mocking purpose only.

use crate::error::Result;
use bytes::{Bytes, BytesMut};
use domain::base::{
    iana::{Class, Rcode},
    name::ToDname,
    Dname, Message, MessageBuilder, Rtype,
};
use domain::rdata::A;
use std::{net::Ipv4Addr, str::FromStr};
use tokio::net::UdpSocket;

/// Mock DNS server answering every query with one fixed A record.
pub struct Server {
    socket: UdpSocket,
    addr: Ipv4Addr,
    ttl: u32,
}

impl Server {
    /// Create a new mock server on an already-bound socket.
    pub fn new(socket: UdpSocket, addr: Ipv4Addr, ttl: u32) -> Self {
        Self { socket, addr, ttl }
    }

    /// Run it
    pub async fn run(self) -> Result<()> {
        let mut buf = vec![0u8; crate::MAX_LEN];
        loop {
            let (len, peer) = self.socket.recv_from(&mut buf).await?;
            let query = match Message::from_octets(Bytes::copy_from_slice(&buf[..len])) {
                Ok(query) => query,
                Err(_) => continue,
            };
            if query.first_question().is_none() {
                continue;
            }
            let resp = a_response(&query, self.addr, self.ttl);
            self.socket.send_to(resp.as_slice(), peer).await?;
        }
    }
}

/// Build a recursion-desired query for `name` with a fixed transaction id.
pub fn query_msg(name: &str, qtype: Rtype) -> Message<Bytes> {
    let name = Dname::<Bytes>::from_str(name).unwrap();
    let mut builder = MessageBuilder::from_target(BytesMut::with_capacity(512)).unwrap();
    builder.header_mut().set_id(4242);
    builder.header_mut().set_rd(true);
    let mut builder = builder.question();
    builder.push((&name, qtype)).unwrap();
    builder.into_message()
}

/// Build a NOERROR response to `query` carrying one A record on its qname.
pub fn a_response(query: &Message<Bytes>, addr: Ipv4Addr, ttl: u32) -> Message<Bytes> {
    let mut builder = MessageBuilder::from_target(BytesMut::with_capacity(512))
        .unwrap()
        .start_answer(query, Rcode::NoError)
        .unwrap();
    let name = query.first_question().unwrap().qname().to_bytes();
    builder.push((name, Class::In, ttl, A::new(addr))).unwrap();
    builder.into_message()
}

/// Build an answerless response to `query` with the given RCODE.
pub fn rcode_response(query: &Message<Bytes>, rcode: Rcode) -> Message<Bytes> {
    MessageBuilder::from_target(BytesMut::with_capacity(512))
        .unwrap()
        .start_answer(query, rcode)
        .unwrap()
        .into_message()
}

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

//! Helpers for inspecting and rebuilding DNS messages held as `Message<Bytes>`.

use crate::error::{Result, RouteError};
use bytes::{Bytes, BytesMut};
use domain::{
    base::{Message, MessageBuilder, ParsedDname},
    rdata::AllRecordData,
};
use std::net::IpAddr;

/// Rebuild `msg` with every record TTL in the answer, authority, and
/// additional sections raised to at least `min`.
pub fn floor_ttls(msg: &Message<Bytes>, min: u32) -> Result<Message<Bytes>> {
    let mut builder = MessageBuilder::from_target(BytesMut::with_capacity(crate::MAX_LEN))
        .map_err(|_| RouteError::MessageRebuild)?;
    // Copy header
    *builder.header_mut() = msg.header();

    // Copy questions
    let mut builder = builder.question();
    for item in msg.question().flatten() {
        builder.push(item).map_err(|_| RouteError::MessageRebuild)?;
    }

    let mut builder = builder.answer();
    for item in msg.answer()? {
        if let Some(mut record) = item?.into_record::<AllRecordData<_, _>>()? {
            record.set_ttl(record.ttl().max(min));
            builder.push(record).map_err(|_| RouteError::MessageRebuild)?;
        }
    }

    let mut builder = builder.authority();
    for item in msg.authority()? {
        if let Some(mut record) = item?.into_record::<AllRecordData<_, _>>()? {
            record.set_ttl(record.ttl().max(min));
            builder.push(record).map_err(|_| RouteError::MessageRebuild)?;
        }
    }

    let mut builder = builder.additional();
    for item in msg.additional()? {
        if let Some(mut record) = item?.into_record::<AllRecordData<_, _>>()? {
            record.set_ttl(record.ttl().max(min));
            builder.push(record).map_err(|_| RouteError::MessageRebuild)?;
        }
    }

    Ok(builder.into_message())
}

/// Return a copy of `msg` whose transaction id is `id`.
pub fn rewrite_id(msg: &Message<Bytes>, id: u16) -> Result<Message<Bytes>> {
    let mut msg = Message::from_octets(BytesMut::from(msg.as_slice()))?;
    msg.header_mut().set_id(id);
    Ok(Message::from_octets(msg.into_octets().freeze())?)
}

/// Extract the first usable address of the answer section: the first A
/// record's IPv4 address if any, otherwise the first AAAA record's IPv6.
pub fn first_address(msg: &Message<Bytes>) -> Option<IpAddr> {
    let answer = msg.answer().ok()?;
    let mut v6 = None;
    for record in answer.flatten() {
        let record = match record.into_record::<AllRecordData<Bytes, ParsedDname<&Bytes>>>() {
            Ok(Some(record)) => record,
            _ => continue,
        };
        match record.data() {
            AllRecordData::A(x) => return Some(IpAddr::V4(x.addr())),
            AllRecordData::Aaaa(x) if v6.is_none() => v6 = Some(IpAddr::V6(x.addr())),
            _ => (),
        }
    }
    v6
}

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

//! Router is the front door of the resolver. For every query it picks the
//! upstream set by bypass list membership, consults the cache, races the
//! upstreams, detects poisoned answers, and learns from them.

use crate::{
    blacklist::BlackList,
    cache::{RecordStatus::*, RespCache},
    error::Result,
    hosts::HostList,
    message::{first_address, floor_ttls, rewrite_id},
    upstream::UpstreamSet,
    MIN_TTL,
};
use bytes::Bytes;
use domain::base::Message;
use log::*;
use std::time::Duration;
use tokio::time::timeout;

/// Router implementation.
pub struct Router {
    hosts: HostList,
    blacklist: BlackList,
    cache: RespCache,
    direct: UpstreamSet,
    bypass: UpstreamSet,
    force_bypass: bool,
    timeout: Duration,
}

impl Router {
    /// Create a new `Router`. `timeout` bounds the whole upstream race for a
    /// query; with `force_bypass` every query takes the bypass path.
    pub fn new(
        hosts: HostList,
        blacklist: BlackList,
        cache: RespCache,
        direct: UpstreamSet,
        bypass: UpstreamSet,
        force_bypass: bool,
        timeout: Duration,
    ) -> Self {
        Self {
            hosts,
            blacklist,
            cache,
            direct,
            bypass,
            force_bypass,
            timeout,
        }
    }

    /// Resolve the query into a response. `None` means stay silent and let
    /// the client's own retry drive recovery.
    pub async fn resolve(&self, msg: Message<Bytes>) -> Result<Option<Message<Bytes>>> {
        let question = match msg.first_question() {
            Some(q) => q,
            None => {
                warn!("dropped a query without a question");
                return Ok(None);
            }
        };
        let id = msg.header().id();
        let qname = question.qname().to_string();

        if let Some(Alive(r)) = self.cache.get(&msg) {
            return Ok(Some(rewrite_id(&r, id)?));
        }

        // The membership check always runs: its parent-suffix promotion must
        // keep learning even in force-bypass mode.
        let bypass = self.hosts.contains(&qname) || self.force_bypass;
        let mut resp = self.race(bypass, &msg).await;

        // A blocklisted address in a direct answer means the path is being
        // interfered with: learn the name, then retry once over the bypass
        // set. The single retry bounds mutual poisoning.
        if !bypass {
            if let Some(r) = &resp {
                if let Some(addr) = first_address(r) {
                    if self.blacklist.contains(&addr) {
                        info!("poisoned answer for {} ({}), retrying via bypass", qname, addr);
                        self.hosts.add(&qname);
                        resp = self.race(true, &msg).await;
                    }
                }
            }
        }

        match resp {
            Some(r) => {
                let r = floor_ttls(&r, MIN_TTL)?;
                self.cache.put(r.clone());
                Ok(Some(rewrite_id(&r, id)?))
            }
            None => match self.cache.get(&msg) {
                Some(Alive(r)) | Some(Expired(r)) => {
                    info!("no upstream answered {} in time, serving the cached entry", qname);
                    Ok(Some(rewrite_id(&r, id)?))
                }
                None => {
                    info!("no upstream answered {} in time and no cache entry exists", qname);
                    Ok(None)
                }
            },
        }
    }

    async fn race(&self, bypass: bool, msg: &Message<Bytes>) -> Option<Message<Bytes>> {
        let set = if bypass { &self.bypass } else { &self.direct };
        timeout(self.timeout, set.race(msg)).await.ok().flatten()
    }
}

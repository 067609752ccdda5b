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

//! The process-wide answer cache. Entries expire after a fixed hour but are
//! kept around as stale fallbacks for queries no upstream answers in time.

use self::RecordStatus::*;
use crate::{error::Result, CACHE_TTL};
use bytes::Bytes;
use clru::CLruCache;
use domain::base::{name::ToDname, question::Question, Dname, Message};
use log::*;
use serde::{Deserialize, Serialize};
use std::{
    num::NonZeroUsize,
    path::Path,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

struct CacheRecord {
    created_instant: Instant,
    msg: Message<Bytes>,
    ttl: Duration,
}

impl CacheRecord {
    fn new(msg: Message<Bytes>, ttl: Duration) -> Self {
        Self {
            created_instant: Instant::now(),
            msg,
            ttl,
        }
    }

    fn get(&self) -> Message<Bytes> {
        self.msg.clone()
    }

    fn validate(&self) -> bool {
        Instant::now().saturating_duration_since(self.created_instant) <= self.ttl
    }

    fn remaining(&self) -> Duration {
        self.ttl
            .saturating_sub(Instant::now().saturating_duration_since(self.created_instant))
    }
}

/// Status of a cache lookup.
pub enum RecordStatus {
    /// The entry is within its TTL.
    Alive(Message<Bytes>),
    /// The entry outlived its TTL; it is only good as a stale fallback.
    Expired(Message<Bytes>),
}

// Entry layout inside a cache dump.
#[derive(Serialize, Deserialize)]
struct DumpRecord {
    msg: String,
    ttl: u64,
}

type Key = Question<Dname<Bytes>>;

// A LRU cache for responses
/// The answer cache, shared between the serving path and the admin flush.
#[derive(Clone)]
pub struct RespCache {
    cache: Arc<Mutex<CLruCache<Key, CacheRecord>>>,
}

impl RespCache {
    /// Create a new cache holding up to `size` responses.
    pub fn new(size: NonZeroUsize) -> Self {
        Self {
            cache: Arc::new(Mutex::new(CLruCache::new(size))),
        }
    }

    /// Insert or replace the entry keyed by the response's question.
    pub fn put(&self, msg: Message<Bytes>) {
        self.put_with_ttl(msg, CACHE_TTL)
    }

    pub(crate) fn put_with_ttl(&self, msg: Message<Bytes>, ttl: Duration) {
        if msg.no_error() {
            let question = match msg.first_question() {
                Some(q) => q,
                None => return,
            };
            let key: Key = (
                question.qname().to_bytes(),
                question.qtype(),
                question.qclass(),
            )
                .into();
            self.cache
                .lock()
                .unwrap()
                .put(key, CacheRecord::new(msg, ttl));
        } else {
            info!("response errored, not caching erroneous upstream response.");
        }
    }

    /// Look up the entry for the query's question, telling a fresh hit from
    /// a stale one. Expired entries are never evicted by a read.
    pub fn get(&self, msg: &Message<Bytes>) -> Option<RecordStatus> {
        let question = msg.first_question()?;
        let qname = question.qname().to_bytes();
        let key: Key = (qname.clone(), question.qtype(), question.qclass()).into();

        match self.cache.lock().unwrap().get(&key) {
            Some(r) => {
                // Get record only once.
                let resp = r.get();
                if r.validate() {
                    info!("cache hit for {}", qname);
                    Some(Alive(resp))
                } else {
                    info!("TTL passed for {}, returning expired record.", qname);
                    Some(Expired(resp))
                }
            }
            None => None,
        }
    }

    /// Drop the entry for the query's question, if any.
    pub fn remove(&self, msg: &Message<Bytes>) {
        if let Some(question) = msg.first_question() {
            let key: Key = (
                question.qname().to_bytes(),
                question.qtype(),
                question.qclass(),
            )
                .into();
            self.cache.lock().unwrap().pop(&key);
        }
    }

    /// Flush the whole cache.
    pub fn clear(&self) {
        self.cache.lock().unwrap().clear();
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.cache.lock().unwrap().is_empty()
    }

    /// Dump every entry with its remaining TTL. Entries past their TTL are
    /// written as already expired and stay usable as stale fallbacks.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let dump: Vec<DumpRecord> = {
            let cache = self.cache.lock().unwrap();
            cache
                .iter()
                .map(|(_, r)| DumpRecord {
                    msg: hex::encode(r.get().as_slice()),
                    ttl: r.remaining().as_secs(),
                })
                .collect()
        };
        tokio::fs::write(path, serde_json::to_vec(&dump)?).await?;
        Ok(())
    }

    /// Load a dump written by [`RespCache::save`]. A missing file is not an
    /// error.
    pub async fn load(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = match tokio::fs::read(path).await {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let dump: Vec<DumpRecord> = serde_json::from_slice(&data)?;
        for entry in dump {
            let msg = Message::from_octets(Bytes::from(hex::decode(entry.msg)?))?;
            self.put_with_ttl(msg, Duration::from_secs(entry.ttl));
        }
        Ok(())
    }
}

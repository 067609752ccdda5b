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

#![deny(missing_docs)]
#![deny(unsafe_code)]
// Documentation
//! This is the core library for dsplit. It implements the split-horizon query pipeline: bypass list learning, poisoned answer detection, upstream racing, answer caching, and the obfuscated UDP tunnel the bypass path runs over.

pub mod blacklist;
pub mod cache;
pub mod error;
pub mod hosts;
pub mod message;
#[doc(hidden)]
pub mod mock;
pub mod router;
pub mod tunnel;
pub mod upstream;

pub use self::{
    blacklist::BlackList,
    cache::RespCache,
    hosts::HostList,
    router::Router,
    tunnel::Tunnel,
    upstream::{QHandle, Udp, UpstreamSet},
};

use std::time::Duration;

/// Maximum length of a DNS message over UDP.
pub const MAX_LEN: usize = 65535;

/// Every TTL stored into the cache is raised to at least this value so that
/// clients do not re-query more aggressively than the cache refreshes.
pub const MIN_TTL: u32 = 600;

/// Per-operation timeout for DNS exchanges.
pub const DNS_TIMEOUT: Duration = Duration::from_secs(5);

// Cache entries live for an hour regardless of their record TTLs.
pub(crate) const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

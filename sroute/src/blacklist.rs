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

//! The set of addresses known to be injected by the interfering path. An
//! answer record carrying one of them marks the whole answer as poisoned.

use std::{collections::HashSet, net::IpAddr};

/// Known injected addresses. Immutable after startup.
#[derive(Debug, Default, Clone)]
pub struct BlackList(HashSet<IpAddr>);

impl BlackList {
    /// Build the set from the configured literals.
    pub fn new(ips: impl IntoIterator<Item = IpAddr>) -> Self {
        Self(ips.into_iter().collect())
    }

    /// Whether `ip` is a known injected address.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.0.contains(ip)
    }
}

#[cfg(test)]
mod tests {
    use super::BlackList;

    #[test]
    fn membership() {
        let list = BlackList::new(["10.0.0.1".parse().unwrap(), "2001:db8::1".parse().unwrap()]);
        assert!(list.contains(&"10.0.0.1".parse().unwrap()));
        assert!(list.contains(&"2001:db8::1".parse().unwrap()));
        assert!(!list.contains(&"10.0.0.2".parse().unwrap()));
        assert!(!BlackList::default().contains(&"10.0.0.1".parse().unwrap()));
    }
}

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

//! The suffix matcher itself. Entries and inputs are walked label by label
//! from the rightmost level, so a match is always aligned on `.` boundaries.

use hashbrown::HashMap;
use std::sync::Arc;

#[derive(Debug, PartialEq, Clone)]
struct LevelNode {
    // Marks that the path down to this node is an inserted entry, not merely
    // a level on the way to one.
    end: bool,
    next_lvs: HashMap<Arc<str>, LevelNode>,
}

impl LevelNode {
    fn new() -> Self {
        Self {
            end: false,
            next_lvs: HashMap::new(),
        }
    }
}

/// Outcome of matching a host against the inserted entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixMatch {
    /// The full input itself is an entry.
    Exact,
    /// A strict parent suffix of the input is an entry.
    Parent,
}

#[derive(Debug, Clone)]
/// Suffix matcher algorithm
pub struct Suffix {
    root: LevelNode,
}

impl Default for Suffix {
    fn default() -> Self {
        Self::new()
    }
}

impl Suffix {
    /// Create a matcher.
    pub fn new() -> Self {
        Self {
            root: LevelNode::new(),
        }
    }

    /// Pass in a string containing `\n` and get all entries inserted.
    pub fn insert_multi(&mut self, hosts: &str) {
        hosts.split('\n').for_each(|lv| {
            self.insert(lv);
        });
    }

    /// Pass in a host and insert it into the matcher. Returns `false` if the
    /// entry was already present (or empty).
    pub fn insert(&mut self, host: &str) -> bool {
        let lvs: Vec<&str> = host.split('.').filter(|lv| !lv.is_empty()).rev().collect();
        if lvs.is_empty() {
            return false;
        }
        let mut ptr = &mut self.root;
        for lv in lvs {
            ptr = ptr
                .next_lvs
                .entry(Arc::from(lv))
                .or_insert_with(LevelNode::new);
        }
        let fresh = !ptr.end;
        ptr.end = true;
        fresh
    }

    /// Match the host against inserted entries. If `apple.com` is inserted, then
    /// `www.apple.com` and `stores.www.apple.com` match as `Parent` and `apple.com`
    /// itself as `Exact`, while `apple.cn` and `pineapple.com` match nothing.
    pub fn matches(&self, host: &str) -> Option<SuffixMatch> {
        let lvs: Vec<&str> = host.split('.').filter(|lv| !lv.is_empty()).rev().collect();
        let mut ptr = &self.root;
        let mut deepest = None;
        for (lv_count, lv) in lvs.iter().enumerate() {
            ptr = match ptr.next_lvs.get(*lv) {
                Some(v) => v,
                None => break,
            };
            if ptr.end {
                deepest = Some(lv_count + 1);
            }
        }
        deepest.map(|d| {
            if d == lvs.len() {
                SuffixMatch::Exact
            } else {
                SuffixMatch::Parent
            }
        })
    }
}

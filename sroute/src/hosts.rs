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

//! The learned bypass list: host names resolved through the bypass upstreams.
//! The list grows at runtime whenever poisoning is observed and every new
//! entry is appended to the backing file right away, so a restart keeps what
//! was learned.

use crate::error::Result;
use compact_str::CompactString;
use hmatcher::suffix::{Suffix, SuffixMatch};
use log::*;
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

// Everything below this line in a gfwlist dump is whitelisted and must not
// end up in the host list.
const WHITELIST_SENTINEL: &str = "!################Whitelist Start################";

static HOST_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+)(\.\w+)+").unwrap());

struct Inner {
    matcher: Suffix,
    path: Option<PathBuf>,
}

impl Inner {
    fn add(&mut self, name: &str) {
        if !self.matcher.insert(name) {
            return;
        }
        if let Some(path) = &self.path {
            if let Err(e) = append_entry(path, name) {
                warn!("failed to append {} to {}: {}", name, path.display(), e);
            }
        }
    }
}

/// The set of hosts taking the bypass path, with suffix-aligned matching and
/// append-per-entry file persistence.
pub struct HostList {
    inner: Mutex<Inner>,
}

impl HostList {
    /// Create an empty list. With a path, every learned entry is appended
    /// there; without one the list lives in memory only.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                matcher: Suffix::new(),
                path,
            }),
        }
    }

    /// Load entries from `path`, which also becomes the backing file for
    /// later appends. A missing file yields an empty list.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let list = Self::new(Some(path.clone()));
        match tokio::fs::read_to_string(&path).await {
            Ok(data) => {
                let mut inner = list.inner.lock().unwrap();
                for line in data.replace('\r', "").split('\n') {
                    let line = line.trim();
                    if !line.is_empty() {
                        inner.matcher.insert(&normalize(line));
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (),
            Err(e) => return Err(e.into()),
        }
        Ok(list)
    }

    /// Whether `name` takes the bypass path. A hit on a strict parent suffix
    /// promotes the full name into the list so later queries hit exactly.
    pub fn contains(&self, name: &str) -> bool {
        let name = normalize(name);
        if name.is_empty() {
            return false;
        }
        let mut inner = self.inner.lock().unwrap();
        match inner.matcher.matches(&name) {
            Some(SuffixMatch::Exact) => true,
            Some(SuffixMatch::Parent) => {
                info!("promoting {} into the bypass list", name);
                inner.add(&name);
                true
            }
            None => false,
        }
    }

    /// Insert `name`; a genuinely new entry is also appended to the backing
    /// file, one open-append-close cycle per entry.
    pub fn add(&self, name: &str) {
        let name = normalize(name);
        if name.is_empty() {
            return;
        }
        self.inner.lock().unwrap().add(&name);
    }
}

// The leading newline keeps an append from merging with a dump that has no
// trailing newline.
fn append_entry(path: &Path, name: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(format!("\n{}", name).as_bytes())
}

fn normalize(name: &str) -> CompactString {
    CompactString::from(name.trim().trim_matches('.').to_lowercase())
}

/// Rebuild a host list from a gfwlist snapshot: everything below the
/// whitelist sentinel is discarded, then every `label(.label)+` token is
/// written to `output`, one per line. One-shot maintenance routine.
pub fn import_gfwlist(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<()> {
    let data = std::fs::read_to_string(input)?.replace('\r', "");
    let data = match data.find(WHITELIST_SENTINEL) {
        Some(pos) => &data[..pos],
        None => &data[..],
    };
    let hosts: Vec<&str> = HOST_TOKEN.find_iter(data).map(|m| m.as_str()).collect();
    std::fs::write(output, hosts.join("\n"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{import_gfwlist, HostList};
    use std::path::PathBuf;
    use tokio_test::block_on;

    fn tmpfile(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("sroute-hosts-{}-{}", std::process::id(), tag))
    }

    #[test]
    fn promotion_persists_across_reload() {
        let path = tmpfile("promote");
        std::fs::write(&path, "example.com\n").unwrap();

        let list = block_on(HostList::load(&path)).unwrap();
        assert!(list.contains("foo.bar.example.com."));
        drop(list);

        let list = block_on(HostList::load(&path)).unwrap();
        assert!(list.contains("foo.bar.example.com"));
        let data = std::fs::read_to_string(&path).unwrap();
        assert!(data.lines().any(|l| l.trim() == "foo.bar.example.com"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn exact_hit_appends_nothing() {
        let path = tmpfile("exact");
        // No trailing newline on purpose.
        std::fs::write(&path, "twitter.com").unwrap();

        let list = block_on(HostList::load(&path)).unwrap();
        assert!(list.contains("twitter.com"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "twitter.com");

        list.add("mobile.twitter.com");
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "twitter.com\nmobile.twitter.com"
        );

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn matching_is_case_folded() {
        let path = tmpfile("case");
        std::fs::write(&path, "Example.COM\n").unwrap();

        let list = block_on(HostList::load(&path)).unwrap();
        assert!(list.contains("EXAMPLE.com."));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_an_empty_list() {
        let path = tmpfile("missing");
        std::fs::remove_file(&path).ok();

        let list = block_on(HostList::load(&path)).unwrap();
        assert!(!list.contains("example.com"));
    }

    #[test]
    fn suffix_matching_is_label_aligned() {
        let list = HostList::new(None);
        list.add("vil.example.com");
        assert!(!list.contains("evil.example.com"));
        list.add("example.com");
        assert!(list.contains("evil.example.com"));
    }

    #[test]
    fn gfwlist_import() {
        let input = tmpfile("gfwin");
        let output = tmpfile("gfwout");
        std::fs::write(
            &input,
            "[AutoProxy 0.2.9]\r\n||twitter.com^\r\n|http://t.co/\r\n!################Whitelist Start################\r\n@@||baidu.com\r\n",
        )
        .unwrap();

        import_gfwlist(&input, &output).unwrap();
        let out = std::fs::read_to_string(&output).unwrap();
        assert!(out.lines().any(|l| l == "twitter.com"));
        assert!(out.lines().any(|l| l == "t.co"));
        assert!(!out.contains("baidu.com"));

        std::fs::remove_file(&input).ok();
        std::fs::remove_file(&output).ok();
    }
}

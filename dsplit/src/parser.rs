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

use log::LevelFilter;
use serde::Deserialize;
use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
};

#[derive(Deserialize, Clone)]
#[serde(rename_all = "lowercase")]
#[serde(remote = "LevelFilter")]
enum LevelFilterDef {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn default_mode() -> Mode {
    Mode::Server
}

fn default_cache_size() -> usize {
    2048
}

fn default_verbosity() -> LevelFilter {
    LevelFilter::Info
}

/// Which half of the system this process runs.
#[derive(Deserialize, Clone, Copy, Debug, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// DNS resolver plus one tunnel client per bypass entry.
    Client,
    /// Tunnel forwarders only.
    Server,
}

#[derive(Deserialize, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct Parsed {
    #[serde(default = "default_mode")]
    pub mode: Mode,
    #[serde(default)]
    pub listen: Option<SocketAddr>,
    #[serde(default)]
    pub in_door_servers: Vec<SocketAddr>,
    #[serde(default)]
    pub bypass_tunnels: HashMap<SocketAddr, SocketAddr>,
    #[serde(default)]
    pub server_tunnels: HashMap<SocketAddr, SocketAddr>,
    #[serde(default)]
    pub black_ip_list: Vec<IpAddr>,
    #[serde(default)]
    pub tunnel_password: String,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub force_remote: bool,
    #[serde(default)]
    pub admin_listen: Option<SocketAddr>,
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    #[serde(with = "LevelFilterDef", default = "default_verbosity")]
    pub verbosity: LevelFilter,
}

#[cfg(test)]
mod tests {
    use super::{Mode, Parsed};

    #[test]
    fn parse_default_config() {
        let p: Parsed = serde_json::from_str(include_str!("../../configs/default.json")).unwrap();
        assert_eq!(p.mode, Mode::Client);
        assert_eq!(p.in_door_servers.len(), 2);
        assert_eq!(p.bypass_tunnels.len(), 1);
        assert_eq!(p.black_ip_list.len(), 4);
        assert_eq!(p.tunnel_password, "greatwall");
        assert!(p.listen.is_some());
        assert!(p.admin_listen.is_some());
    }

    #[test]
    fn parse_server_config() {
        let p: Parsed = serde_json::from_str(include_str!("../../configs/server.json")).unwrap();
        assert_eq!(p.mode, Mode::Server);
        assert_eq!(p.server_tunnels.len(), 1);
        assert!(p.bypass_tunnels.is_empty());
    }

    #[test]
    fn everything_has_a_default() {
        let p: Parsed = serde_json::from_str("{}").unwrap();
        assert_eq!(p.mode, Mode::Server);
        assert!(p.listen.is_none());
        assert_eq!(p.cache_size, 2048);
        assert!(!p.debug);
        assert!(!p.force_remote);
        assert!(p.tunnel_password.is_empty());
    }
}

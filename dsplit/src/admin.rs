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

use crate::logger::LogRing;
use anyhow::Result;
use axum::{extract::State, routing::get, Router};
use log::*;
use sroute::RespCache;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;

#[derive(Clone)]
struct Admin {
    cache: RespCache,
    ring: Arc<LogRing>,
}

/// Serve the admin endpoints: `/clear` flushes the cache, `/log` dumps the
/// debug ring.
pub async fn serve(addr: SocketAddr, cache: RespCache, ring: Arc<LogRing>) -> Result<()> {
    let app = Router::new()
        .route("/clear", get(clear))
        .route("/log", get(dump))
        .with_state(Admin { cache, ring });
    let listener = TcpListener::bind(addr).await?;
    info!("admin interface listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn clear(State(admin): State<Admin>) -> &'static str {
    admin.cache.clear();
    info!("cache flushed through the admin interface");
    "Success"
}

async fn dump(State(admin): State<Admin>) -> String {
    admin.ring.dump()
}

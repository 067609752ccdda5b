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

//! This module provides the universal error type used in the library. The error type uses `thiserror`.

use thiserror::Error;

/// Shorthand for results produced by this library.
pub type Result<T> = std::result::Result<T, RouteError>;

/// RouteError enumerates all possible errors returned by this library.
#[derive(Error, Debug)]
pub enum RouteError {
    /// Error forwarded from `tokio::time::error`. This indicates a timeout probably.
    #[error(transparent)]
    TimeError(#[from] tokio::time::error::Elapsed),

    /// IO Error
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// The message buffer is too short to hold a DNS message.
    #[error(transparent)]
    ShortBuf(#[from] domain::base::ShortBuf),

    /// Error while parsing a DNS message section.
    #[error(transparent)]
    ParseError(#[from] domain::base::octets::ParseError),

    /// Error while serializing or deserializing a cache dump.
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    /// A cache dump contains bytes that are not valid hex.
    #[error(transparent)]
    HexError(#[from] hex::FromHexError),

    /// A DNS message could not be rebuilt.
    #[error("failed to rebuild DNS message")]
    MessageRebuild,

    /// The tunnel shared secret is empty.
    #[error("the tunnel secret may not be empty")]
    EmptySecret,
}

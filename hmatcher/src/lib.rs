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
// Documentation
//! This is a simple suffix matching algorithm to match host names against a set of user-defined host entries.
//!
//! Features:
//!
//! -  Super fast (sub-microsecond matches against a 73300+ entry set)
//! -  Tells exact hits apart from parent-suffix hits
//!
//! # Getting Started
//!
//! ```
//! use hmatcher::suffix::{Suffix, SuffixMatch};
//! let mut matcher = Suffix::new();
//! matcher.insert("apple.com");
//! assert_eq!(matcher.matches("store.apple.com"), Some(SuffixMatch::Parent));
//! assert_eq!(matcher.matches("apple.com"), Some(SuffixMatch::Exact));
//! ```

pub mod suffix;

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

use anyhow::Result;
use log::{LevelFilter, Log, Metadata, Record};
use simple_logger::SimpleLogger;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::{SystemTime, UNIX_EPOCH},
};

const RING_CAPACITY: usize = 5000;

/// Bounded in-memory buffer of recent log lines, dumped by the admin `/log`
/// endpoint.
pub struct LogRing {
    entries: Mutex<VecDeque<String>>,
}

impl LogRing {
    fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
        }
    }

    fn push(&self, line: String) {
        let mut entries = self.entries.lock().unwrap();
        entries.push_back(line);
        while entries.len() > RING_CAPACITY {
            entries.pop_front();
        }
    }

    /// Render the ring oldest-first, one line per entry.
    pub fn dump(&self) -> String {
        let entries = self.entries.lock().unwrap();
        let mut out = String::new();
        for line in entries.iter() {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

// Delegates to the plain terminal logger and, when capture is on, tees every
// record into the ring.
struct RingLogger {
    inner: SimpleLogger,
    ring: Arc<LogRing>,
    capture: bool,
}

impl Log for RingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.capture || self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if self.inner.enabled(record.metadata()) {
            self.inner.log(record);
        }
        if self.capture {
            let stamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            self.ring
                .push(format!("{} [{}] {}", stamp, record.level(), record.args()));
        }
    }

    fn flush(&self) {
        self.inner.flush()
    }
}

/// Install the process-wide logger. With `capture` the ring records every
/// message down to debug level, whatever the terminal verbosity is.
pub fn init(verbosity: LevelFilter, capture: bool) -> Result<Arc<LogRing>> {
    let ring = Arc::new(LogRing::new());
    let logger = RingLogger {
        inner: SimpleLogger::new().with_level(verbosity),
        ring: ring.clone(),
        capture,
    };
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(if capture {
        LevelFilter::Debug.max(verbosity)
    } else {
        verbosity
    });
    Ok(ring)
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Suppression of repeated decoder hits.
//!
//! The barcode decoder reports the same code on every frame while it stays in
//! view. Identical payloads within the debounce window are dropped.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct ScanDebouncer {
    window: Duration,
    last: Option<(String, Instant)>,
}

impl ScanDebouncer {
    pub const DEFAULT_WINDOW: Duration = Duration::from_millis(500);

    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Returns `true` if the payload should be processed.
    ///
    /// A different payload is always accepted. The same payload is accepted
    /// again once `window` has elapsed since it was last accepted.
    pub fn accept(&mut self, raw: &str, now: Instant) -> bool {
        if let Some((last_raw, accepted_at)) = &self.last
            && last_raw == raw
            && now.saturating_duration_since(*accepted_at) < self.window
        {
            return false;
        }
        self.last = Some((raw.to_string(), now));
        true
    }
}

impl Default for ScanDebouncer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_identical_payload_inside_window() {
        let mut debouncer = ScanDebouncer::default();
        let t0 = Instant::now();
        assert!(debouncer.accept("A", t0));
        assert!(!debouncer.accept("A", t0 + Duration::from_millis(100)));
        assert!(!debouncer.accept("A", t0 + Duration::from_millis(499)));
    }

    #[test]
    fn accepts_identical_payload_after_window() {
        let mut debouncer = ScanDebouncer::default();
        let t0 = Instant::now();
        assert!(debouncer.accept("A", t0));
        assert!(debouncer.accept("A", t0 + Duration::from_millis(500)));
    }

    #[test]
    fn different_payload_always_accepted() {
        let mut debouncer = ScanDebouncer::default();
        let t0 = Instant::now();
        assert!(debouncer.accept("A", t0));
        assert!(debouncer.accept("B", t0 + Duration::from_millis(10)));
        // "A" is no longer the last payload
        assert!(debouncer.accept("A", t0 + Duration::from_millis(20)));
    }

    #[test]
    fn dropped_hits_do_not_extend_window() {
        let mut debouncer = ScanDebouncer::new(Duration::from_millis(500));
        let t0 = Instant::now();
        assert!(debouncer.accept("A", t0));
        assert!(!debouncer.accept("A", t0 + Duration::from_millis(400)));
        assert!(debouncer.accept("A", t0 + Duration::from_millis(600)));
    }
}

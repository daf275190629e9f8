// tumbler-client-rs
// Copyright (C) 2022  Straylight <straylight_orbit@protonmail.com>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use std::time::Duration;

/// Bounded exponential backoff used when polling idempotent endpoints.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Backoff {
    /// Delay after the first failed attempt.
    pub initial: Duration,
    /// Upper bound for any single delay.
    pub max: Duration,
    /// Total number of attempts, including the first one.
    pub attempts: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(2),
            max: Duration::from_secs(120),
            attempts: 8,
        }
    }
}

impl Backoff {
    /// Returns the delays to wait between consecutive attempts. There is one delay fewer
    /// than there are attempts.
    pub fn delays(&self) -> Delays {
        Delays {
            next: self.initial,
            max: self.max,
            remaining: self.attempts.saturating_sub(1),
        }
    }
}

#[derive(Debug)]
pub struct Delays {
    next: Duration,
    max: Duration,
    remaining: u32,
}

impl Iterator for Delays {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let delay = self.next.min(self.max);
        self.next = self.next.saturating_mul(2);
        Some(delay)
    }
}

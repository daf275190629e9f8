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

use crate::escrow::ChannelId;

const API_ROOT: &str = "api/v1";

/// Relative paths of the tumbler API. Promise-phase calls live under `channels`, solver-phase
/// calls are split between `clientchannels` and `clientschannels` exactly as the server routes
/// them.
#[derive(Debug, Clone)]
pub struct Endpoints {
    root: String,
}

impl Endpoints {
    /// Endpoints of the tumbler with the given index on a server.
    pub fn new(tumbler: u32) -> Self {
        Self {
            root: format!("{API_ROOT}/tumblers/{tumbler}"),
        }
    }

    pub fn parameters(&self) -> String {
        format!("{}/parameters", self.root)
    }

    pub fn vouchers(&self) -> String {
        format!("{}/vouchers/", self.root)
    }

    pub fn redeem_voucher(&self) -> String {
        format!("{}/clientchannels/voucher", self.root)
    }

    pub fn open_channel(&self) -> String {
        format!("{}/channels/", self.root)
    }

    pub fn escrow_key(&self) -> String {
        format!("{}/clientchannels/", self.root)
    }

    pub fn sign_hashes(&self, channel: &ChannelId) -> String {
        format!("{}/channels/{}/signhashes", self.root, channel.to_hex())
    }

    pub fn promise_revelation(&self, channel: &ChannelId) -> String {
        format!("{}/channels/{}/checkrevelation", self.root, channel.to_hex())
    }

    pub fn solve_puzzles(&self, channel: &ChannelId) -> String {
        format!("{}/clientchannels/{}/solvepuzzles", self.root, channel.to_hex())
    }

    pub fn blind_factors(&self, channel: &ChannelId) -> String {
        format!(
            "{}/clientschannels/{}/checkblindfactors",
            self.root,
            channel.to_hex()
        )
    }

    pub fn solver_revelation(&self, channel: &ChannelId) -> String {
        format!(
            "{}/clientschannels/{}/checkrevelation",
            self.root,
            channel.to_hex()
        )
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints::new(0)
    }
}

/// Joins a server address and a relative path, inserting the separating slash if missing.
pub fn full_url(server: &str, path: &str) -> String {
    let mut url = String::with_capacity(server.len() + path.len() + 1);
    url.push_str(server);
    if !url.ends_with('/') {
        url.push('/');
    }
    url.push_str(path.trim_start_matches('/'));
    url
}

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

use bitcoin::Network;
use serde::{Deserialize, Serialize};

use crate::codec::{self, Codec, Message};
use crate::{endpoints::Endpoints, http};

/// Terms the tumbler operates under, as published by the tumbler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionParameters {
    #[serde(with = "crate::codec::network")]
    pub network: Network,
    /// Amount mixed per cycle, in satoshis.
    pub denomination: u64,
    /// Tumbler fee, in satoshis.
    pub fee: u64,
    pub cycle: CycleParameters,
    /// Number of puzzles (real and fake) per promise-phase batch.
    pub promise_batch_size: usize,
    /// Number of puzzles (real and fake) per solver-phase batch.
    pub solver_batch_size: usize,
    /// DER encoded RSA key vouchers are signed with.
    #[serde(with = "crate::util::hex")]
    pub voucher_key: Vec<u8>,
}

/// Mixing cycles start every `length` blocks, counting from block `start`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleParameters {
    pub start: u32,
    pub length: u32,
}

impl CycleParameters {
    pub fn is_cycle_start(&self, height: u32) -> bool {
        height >= self.start && self.length > 0 && (height - self.start) % self.length == 0
    }

    /// Start of the cycle containing `height`, if cycles have begun by then.
    pub fn current_start(&self, height: u32) -> Option<u32> {
        if height < self.start || self.length == 0 {
            return None;
        }
        Some(height - (height - self.start) % self.length)
    }
}

impl SessionParameters {
    /// Fetches the tumbler's parameters.
    pub fn request(endpoints: &Endpoints) -> http::Request<SessionParameters> {
        http::Request::get(endpoints.parameters())
    }

    /// Denomination plus fee: what the client escrows per cycle.
    pub fn amount_due(&self) -> Option<u64> {
        self.denomination.checked_add(self.fee)
    }
}

impl Message for SessionParameters {
    fn validate(&self, codec: &Codec) -> Result<(), codec::Error> {
        if self.network != codec.network() {
            return Err(codec::Error::NetworkMismatch {
                expected: codec.network(),
                actual: self.network,
            });
        }
        if self.promise_batch_size < 2 || self.solver_batch_size < 2 {
            return Err(codec::Error::Malformed("batch size below 2"));
        }
        if self.cycle.length == 0 {
            return Err(codec::Error::Malformed("zero cycle length"));
        }
        if self.denomination == 0 {
            return Err(codec::Error::Malformed("zero denomination"));
        }
        Ok(())
    }
}

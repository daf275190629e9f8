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

//! Vouchers entitle the client to open one channel. The tumbler hands them out signed with its
//! voucher key and redeems them in exchange for the payment transaction of the cycle.

use bitcoin::Txid;
use serde::{Deserialize, Serialize};

use crate::codec::{self, Codec, Message};
use crate::parameters::SessionParameters;
use crate::puzzle::PuzzleSolution;
use crate::{endpoints::Endpoints, http, util};

/// A signed voucher. Deliberately not `Clone`: redeeming one consumes it.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voucher {
    #[serde(with = "crate::util::hex")]
    pub token: Vec<u8>,
    #[serde(with = "crate::util::hex")]
    pub signature: Vec<u8>,
    pub cycle_start: u32,
}

impl Message for Voucher {
    fn validate(&self, _codec: &Codec) -> Result<(), codec::Error> {
        if self.token.is_empty() {
            return Err(codec::Error::Malformed("empty voucher token"));
        }
        Ok(())
    }
}

impl Voucher {
    /// Asks the tumbler for a voucher. The tumbler answers "not found" until it has one.
    pub fn request(endpoints: &Endpoints) -> http::Request<Voucher> {
        http::Request::get(endpoints.vouchers())
    }

    /// Digest under which a redeemed token is remembered.
    pub fn digest(&self) -> [u8; 32] {
        util::hashes::sha256_bytes(&self.token)
    }

    /// Checks the tumbler's signature over the token and that the voucher was issued for a
    /// cycle boundary.
    pub fn verify(&self, params: &SessionParameters) -> Result<(), VoucherError> {
        if !params.cycle.is_cycle_start(self.cycle_start) {
            return Err(VoucherError::WrongCycle(self.cycle_start));
        }

        let public_key = blind_rsa_signatures::PublicKey::from_der(&params.voucher_key)
            .map_err(VoucherError::Key)?;
        blind_rsa_signatures::Signature::new(self.signature.clone())
            .verify(&public_key, &self.token, &signature_options())
            .map_err(|_| VoucherError::BadSignature)
    }
}

/// Redeems a voucher against the transaction paying the tumbler.
pub fn redeem_request(
    endpoints: &Endpoints,
    codec: &Codec,
    payment: &Txid,
) -> Result<http::Request<PuzzleSolution>, codec::Error> {
    Ok(http::Request::post(
        endpoints.redeem_voucher(),
        http::Body::json(codec, payment)?,
    ))
}

/// Outcome of asking for a voucher.
#[derive(Debug)]
pub enum VoucherStatus {
    Available(Voucher),
    /// The tumbler has no voucher for the client yet. Ask again later.
    NotYetIssued,
}

#[derive(Debug)]
pub enum VoucherError {
    /// This session already redeemed the token.
    AlreadyRedeemed,
    BadSignature,
    /// The voucher's cycle start is not a cycle boundary.
    WrongCycle(u32),
    /// The voucher key advertised by the tumbler cannot be parsed.
    Key(blind_rsa_signatures::Error),
    /// The tumbler refused the voucher.
    Rejected { status: u16 },
}

impl std::fmt::Display for VoucherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoucherError::AlreadyRedeemed => write!(f, "voucher already redeemed"),
            VoucherError::BadSignature => write!(f, "bad voucher signature"),
            VoucherError::WrongCycle(start) => {
                write!(f, "voucher issued for block {}, not a cycle start", start)
            }
            VoucherError::Key(inner) => write!(f, "voucher key: {}", inner),
            VoucherError::Rejected { status } => {
                write!(f, "voucher rejected by the tumbler ({})", status)
            }
        }
    }
}

impl std::error::Error for VoucherError {}

pub(crate) fn signature_options() -> blind_rsa_signatures::Options {
    blind_rsa_signatures::Options::new(blind_rsa_signatures::Hash::Sha256, false, 32)
}

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

//! Puzzle-promise phase: the tumbler commits to a puzzle whose solution will let the client
//! claim the tumbler's escrow.

use serde::{Deserialize, Serialize};

use crate::codec::{self, Codec, Message};
use crate::escrow::ChannelId;
use crate::phase::{self, CutAndChoose, PhaseKind, Violation};
use crate::puzzle::{PuzzleBatch, PuzzleSolution, PuzzleValue, Salt};
use crate::{endpoints::Endpoints, http, PuzzleCrypto};

/// Marker for the promise flavour of [`CutAndChoose`].
#[derive(Debug)]
pub enum Promise {}

pub type PromisePhase = CutAndChoose<Promise>;

/// The tumbler's commitment for one submitted hash: an encrypted puzzle and the promise binding
/// it to the hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCommitment {
    pub puzzle: PuzzleValue,
    #[serde(with = "crate::util::hex")]
    pub promise: Vec<u8>,
}

impl Message for ServerCommitment {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRevelation {
    pub fake_indexes: Vec<u32>,
    pub salts: Vec<Salt>,
    /// Opens the fake indexes hash sent with the batch.
    #[serde(with = "crate::util::hex")]
    pub index_salt: [u8; 32],
}

impl ClientRevelation {
    /// Reveals every fake of `batch` with its salt.
    pub fn from_batch(batch: &PuzzleBatch<Salt>) -> Self {
        let (fake_indexes, salts) = batch
            .fakes()
            .map(|(index, _, salt)| (index as u32, salt.clone()))
            .unzip();
        Self {
            fake_indexes,
            salts,
            index_salt: *batch.index_salt(),
        }
    }
}

impl Message for ClientRevelation {}

impl phase::Revelation<Salt> for ClientRevelation {
    fn fake_indexes(&self) -> &[u32] {
        &self.fake_indexes
    }

    fn secrets(&self) -> &[Salt] {
        &self.salts
    }

    fn index_salt(&self) -> Option<&[u8; 32]> {
        Some(&self.index_salt)
    }
}

/// Solutions of the fake puzzles, in ascending fake index order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCommitmentsProof {
    pub fake_solutions: Vec<PuzzleSolution>,
}

impl Message for ServerCommitmentsProof {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignHashes<'a> {
    hashes: &'a [PuzzleValue],
    #[serde(with = "crate::util::hex")]
    fake_indexes_hash: [u8; 32],
}

impl phase::Kind for Promise {
    const KIND: PhaseKind = PhaseKind::Promise;

    type Secret = Salt;
    type Commitment = ServerCommitment;
    type Revelation = ClientRevelation;
    type Response = ServerCommitmentsProof;
    type Opening = PuzzleSolution;
    type Output = ServerCommitment;

    fn well_formed(commitment: &ServerCommitment) -> bool {
        !commitment.puzzle.as_ref().is_empty() && !commitment.promise.is_empty()
    }

    fn open(
        response: ServerCommitmentsProof,
        fakes: &[usize],
        real: usize,
        commitments: &[ServerCommitment],
    ) -> Result<(Vec<PuzzleSolution>, ServerCommitment), Violation> {
        if response.fake_solutions.len() != fakes.len() {
            return Err(Violation::ResponseSize {
                phase: PhaseKind::Promise,
                expected: fakes.len(),
                actual: response.fake_solutions.len(),
            });
        }
        let real = commitments
            .get(real)
            .cloned()
            .ok_or(Violation::CommitmentMismatch {
                phase: PhaseKind::Promise,
                expected: real + 1,
                actual: commitments.len(),
            })?;
        Ok((response.fake_solutions, real))
    }

    fn verify(
        crypto: &dyn PuzzleCrypto,
        hash: &PuzzleValue,
        salt: &Salt,
        commitment: &ServerCommitment,
        solution: &PuzzleSolution,
    ) -> bool {
        crypto.verify_promise(hash, salt, commitment, solution)
    }
}

/// Submits the batch of hashes for the tumbler to commit to.
pub fn sign_hashes_request(
    endpoints: &Endpoints,
    codec: &Codec,
    channel: &ChannelId,
    batch: &PuzzleBatch<Salt>,
) -> Result<http::Request<Vec<ServerCommitment>>, codec::Error> {
    let body = SignHashes {
        hashes: batch.puzzles(),
        fake_indexes_hash: batch.fake_indexes_hash(),
    };
    Ok(http::Request::post(
        endpoints.sign_hashes(channel),
        http::Body::json(codec, &body)?,
    ))
}

/// Reveals the fakes and asks the tumbler to prove its commitments to them.
pub fn revelation_request(
    endpoints: &Endpoints,
    codec: &Codec,
    channel: &ChannelId,
    revelation: &ClientRevelation,
) -> Result<http::Request<ServerCommitmentsProof>, codec::Error> {
    Ok(http::Request::post(
        endpoints.promise_revelation(channel),
        http::Body::json(codec, revelation)?,
    ))
}

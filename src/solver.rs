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

//! Puzzle-solver phase: the tumbler solves a blinded puzzle for the client in exchange for the
//! client's payment.

use serde::{Deserialize, Deserializer, Serialize};

use crate::codec::{self, Codec, Message};
use crate::escrow::ChannelId;
use crate::phase::{self, CutAndChoose, PhaseKind, Step, Violation};
use crate::puzzle::{BlindFactor, PuzzleBatch, PuzzleSolution, PuzzleValue};
use crate::{endpoints::Endpoints, http, util, PuzzleCrypto};

pub use crate::puzzle::SolutionKey;

/// Marker for the solver flavour of [`CutAndChoose`].
#[derive(Debug)]
pub enum Solver {}

pub type SolverPhase = CutAndChoose<Solver>;

/// The tumbler's commitment to the solution of one submitted puzzle: the solution encrypted
/// under a key, and the hash of that key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCommitment {
    #[serde(with = "crate::util::hex")]
    pub encrypted_solution: Vec<u8>,
    #[serde(with = "crate::util::hex")]
    pub key_hash: [u8; 32],
}

impl Message for ServerCommitment {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRevelation {
    pub fake_indexes: Vec<u32>,
    pub solutions: Vec<PuzzleSolution>,
}

impl ClientRevelation {
    /// Reveals every fake of `batch` with its known solution.
    pub fn from_batch(batch: &PuzzleBatch<PuzzleSolution>) -> Self {
        let (fake_indexes, solutions) = batch
            .fakes()
            .map(|(index, _, solution)| (index as u32, solution.clone()))
            .unzip();
        Self {
            fake_indexes,
            solutions,
        }
    }
}

impl Message for ClientRevelation {}

impl phase::Revelation<PuzzleSolution> for ClientRevelation {
    fn fake_indexes(&self) -> &[u32] {
        &self.fake_indexes
    }

    fn secrets(&self) -> &[PuzzleSolution] {
        &self.solutions
    }
}

/// What the solver phase yields for the real puzzle: its commitment and the key decrypting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealSolution {
    pub commitment: ServerCommitment,
    pub key: SolutionKey,
}

/// The tumbler's answer to a blind factor disclosure. Anything but an explicit `false` is an
/// acceptance; an empty body decodes as `{}`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Ack(pub bool);

impl<'de> Deserialize<'de> for Ack {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Ack(!matches!(value, serde_json::Value::Bool(false))))
    }
}

impl Message for Ack {}

impl phase::Kind for Solver {
    const KIND: PhaseKind = PhaseKind::Solver;

    type Secret = PuzzleSolution;
    type Commitment = ServerCommitment;
    type Revelation = ClientRevelation;
    type Response = Vec<SolutionKey>;
    type Opening = SolutionKey;
    type Output = RealSolution;

    fn well_formed(commitment: &ServerCommitment) -> bool {
        !commitment.encrypted_solution.is_empty()
    }

    fn open(
        keys: Vec<SolutionKey>,
        fakes: &[usize],
        real: usize,
        commitments: &[ServerCommitment],
    ) -> Result<(Vec<SolutionKey>, RealSolution), Violation> {
        if keys.len() != commitments.len() || real >= keys.len() {
            return Err(Violation::ResponseSize {
                phase: PhaseKind::Solver,
                expected: commitments.len(),
                actual: keys.len(),
            });
        }

        let openings = fakes
            .iter()
            .filter_map(|index| keys.get(*index).cloned())
            .collect();
        let output = RealSolution {
            commitment: commitments[real].clone(),
            key: keys[real].clone(),
        };
        Ok((openings, output))
    }

    fn verify(
        crypto: &dyn PuzzleCrypto,
        puzzle: &PuzzleValue,
        solution: &PuzzleSolution,
        commitment: &ServerCommitment,
        key: &SolutionKey,
    ) -> bool {
        util::hashes::sha256_bytes(key.as_ref()) == commitment.key_hash
            && crypto.verify_solution(puzzle, solution, commitment, key)
    }
}

impl CutAndChoose<Solver> {
    /// Checks the blind factors of the fake puzzles, in ascending fake index order, and marks
    /// them as disclosed. Must precede the revelation.
    pub fn disclose_blind_factors(
        &mut self,
        factors: &[BlindFactor],
        crypto: &dyn PuzzleCrypto,
    ) -> Result<(), phase::Error> {
        let batch = match (self.step(), self.batch()) {
            (Step::CommitmentsReceived, Some(batch)) => batch,
            _ => return Err(self.out_of_order()),
        };

        let expected = batch.len() - 1;
        if factors.len() != expected {
            return Err(Violation::RevelationSize {
                phase: PhaseKind::Solver,
                expected,
                actual: factors.len(),
            }
            .into());
        }

        for ((index, puzzle, _), factor) in batch.fakes().zip(factors) {
            if !crypto.verify_blind_factor(puzzle, factor) {
                return Err(Violation::InvalidBlindFactor { index: Some(index) }.into());
            }
        }

        self.advance_to_revealed()
    }
}

/// Submits the batch of puzzles for the tumbler to solve.
pub fn solve_puzzles_request(
    endpoints: &Endpoints,
    codec: &Codec,
    channel: &ChannelId,
    batch: &PuzzleBatch<PuzzleSolution>,
) -> Result<http::Request<Vec<ServerCommitment>>, codec::Error> {
    Ok(http::Request::post(
        endpoints.solve_puzzles(channel),
        http::Body::json(codec, &batch.puzzles())?,
    ))
}

pub fn blind_factors_request(
    endpoints: &Endpoints,
    codec: &Codec,
    channel: &ChannelId,
    factors: &[BlindFactor],
) -> Result<http::Request<Ack>, codec::Error> {
    Ok(http::Request::post(
        endpoints.blind_factors(channel),
        http::Body::json(codec, &factors)?,
    ))
}

/// Reveals the fakes and asks for the keys of every commitment.
pub fn revelation_request(
    endpoints: &Endpoints,
    codec: &Codec,
    channel: &ChannelId,
    revelation: &ClientRevelation,
) -> Result<http::Request<Vec<SolutionKey>>, codec::Error> {
    Ok(http::Request::post(
        endpoints.solver_revelation(channel),
        http::Body::json(codec, revelation)?,
    ))
}

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

//! The cut-and-choose state machine shared by the puzzle-promise and puzzle-solver phases.
//!
//! Both phases have the same shape: the client submits a batch of N puzzles, the tumbler commits
//! to an answer for each of them, the client reveals which N-1 puzzles were fakes and the tumbler
//! opens its commitments for those. The client checks every opened fake before it accepts the
//! real puzzle's answer. What differs between the phases is plugged in through [`Kind`].
//!
//! The machine performs no I/O. The session feeds it the tumbler's answers and sends whatever the
//! machine has agreed to disclose.

use std::fmt;

use crate::puzzle::{PuzzleBatch, PuzzleValue};
use crate::PuzzleCrypto;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    Promise,
    Solver,
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseKind::Promise => write!(f, "promise"),
            PhaseKind::Solver => write!(f, "solver"),
        }
    }
}

/// Externally visible progress of a phase.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Step {
    Idle,
    CommitmentsRequested,
    CommitmentsReceived,
    /// Material about the fake puzzles has been disclosed to the tumbler.
    Revealed,
    /// Proved (promise) or solved (solver).
    Complete,
}

/// The client's disclosure of the fake puzzles of a batch.
pub trait Revelation<S> {
    fn fake_indexes(&self) -> &[u32];
    fn secrets(&self) -> &[S];

    /// Salt of the fake indexes hash, for phases that commit to their fake set up front.
    fn index_salt(&self) -> Option<&[u8; 32]> {
        None
    }
}

/// Phase specific types and checks.
pub trait Kind {
    const KIND: PhaseKind;

    /// What the client knows about each fake puzzle.
    type Secret: fmt::Debug + Clone + PartialEq;
    type Commitment: fmt::Debug + Clone;
    type Revelation: Revelation<Self::Secret>;
    /// The tumbler's answer to a revelation.
    type Response;
    /// Material opening the commitment of a single fake puzzle.
    type Opening;
    /// What the phase yields for the real puzzle.
    type Output;

    fn well_formed(commitment: &Self::Commitment) -> bool;

    /// Splits the tumbler's answer into openings for the fake puzzles (in ascending index order)
    /// and the output for the real puzzle.
    fn open(
        response: Self::Response,
        fakes: &[usize],
        real: usize,
        commitments: &[Self::Commitment],
    ) -> Result<(Vec<Self::Opening>, Self::Output), Violation>;

    fn verify(
        crypto: &dyn PuzzleCrypto,
        puzzle: &PuzzleValue,
        secret: &Self::Secret,
        commitment: &Self::Commitment,
        opening: &Self::Opening,
    ) -> bool;
}

/// State machine representing one cut-and-choose phase of a channel.
pub struct CutAndChoose<K: Kind> {
    batch_size: usize,
    state: State<K>,
}

enum State<K: Kind> {
    Idle,
    CommitmentsRequested {
        batch: PuzzleBatch<K::Secret>,
    },
    CommitmentsReceived {
        batch: PuzzleBatch<K::Secret>,
        commitments: Vec<K::Commitment>,
    },
    Revealed {
        batch: PuzzleBatch<K::Secret>,
        commitments: Vec<K::Commitment>,
        revelation_sent: bool,
    },
    Complete,
}

impl<K: Kind> State<K> {
    fn step(&self) -> Step {
        match self {
            State::Idle => Step::Idle,
            State::CommitmentsRequested { .. } => Step::CommitmentsRequested,
            State::CommitmentsReceived { .. } => Step::CommitmentsReceived,
            State::Revealed { .. } => Step::Revealed,
            State::Complete => Step::Complete,
        }
    }
}

impl<K: Kind> CutAndChoose<K> {
    /// Creates a phase expecting batches of exactly `batch_size` puzzles.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            state: State::Idle,
        }
    }

    /// Which phase this machine runs.
    pub fn kind(&self) -> PhaseKind {
        K::KIND
    }

    /// The agreed N.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Current step of the phase.
    pub fn step(&self) -> Step {
        self.state.step()
    }

    /// The tumbler's commitments, once received.
    pub fn commitments(&self) -> Option<&[K::Commitment]> {
        match &self.state {
            State::CommitmentsReceived { commitments, .. } | State::Revealed { commitments, .. } => {
                Some(commitments)
            }
            _ => None,
        }
    }

    /// Registers the batch about to be submitted. While no commitments have been received the
    /// registered batch may be submitted again, but never swapped: the tumbler may already hold
    /// it, and two batches around one real puzzle give the real puzzle away.
    pub fn request_commitments(
        &mut self,
        batch: PuzzleBatch<K::Secret>,
    ) -> Result<&PuzzleBatch<K::Secret>, Error> {
        let registered = match &self.state {
            State::Idle => None,
            State::CommitmentsRequested { batch } => Some(batch),
            _ => return Err(self.out_of_order()),
        };

        if batch.len() != self.batch_size {
            return Err(Violation::BatchSize {
                phase: K::KIND,
                expected: self.batch_size,
                actual: batch.len(),
            }
            .into());
        }

        match registered {
            Some(registered) if registered.same_as(&batch) => {
                log::info!("{} phase: submitting the registered batch again", K::KIND);
            }
            Some(_) => return Err(Violation::BatchReplaced { phase: K::KIND }.into()),
            None => self.change_state(State::CommitmentsRequested { batch }),
        }

        match &self.state {
            State::CommitmentsRequested { batch } => Ok(batch),
            _ => Err(self.out_of_order()),
        }
    }

    /// Accepts the tumbler's commitments to the submitted batch. The state is left untouched if
    /// they are rejected.
    pub fn receive_commitments(&mut self, commitments: Vec<K::Commitment>) -> Result<(), Error> {
        let batch = match &self.state {
            State::CommitmentsRequested { batch } => batch,
            _ => return Err(self.out_of_order()),
        };

        if commitments.len() != self.batch_size {
            return Err(Violation::CommitmentMismatch {
                phase: K::KIND,
                expected: self.batch_size,
                actual: commitments.len(),
            }
            .into());
        }

        if let Some(position) = commitments.iter().position(|c| !K::well_formed(c)) {
            return Err(Violation::InvalidCommitment {
                phase: K::KIND,
                index: fake_only(batch, position),
            }
            .into());
        }

        self.transition(|state| match state {
            State::CommitmentsRequested { batch } => {
                Ok(State::CommitmentsReceived { batch, commitments })
            }
            other => Err(other),
        })
    }

    /// Checks that a revelation discloses exactly the fake puzzles of the batch together with
    /// their secrets, and marks it as sent. Nothing must reach the tumbler if this fails.
    ///
    /// A promise phase reveals straight after receiving commitments. A solver phase first has to
    /// disclose its blind factors.
    pub fn disclose(&mut self, revelation: &K::Revelation) -> Result<(), Error> {
        let batch = match (K::KIND, &self.state) {
            (PhaseKind::Promise, State::CommitmentsReceived { batch, .. }) => batch,
            (
                PhaseKind::Solver,
                State::Revealed {
                    batch,
                    revelation_sent: false,
                    ..
                },
            ) => batch,
            _ => return Err(self.out_of_order()),
        };

        check_revelation::<K>(batch, revelation)?;

        self.transition(|state| match state {
            State::CommitmentsReceived { batch, commitments }
            | State::Revealed {
                batch, commitments, ..
            } => Ok(State::Revealed {
                batch,
                commitments,
                revelation_sent: true,
            }),
            other => Err(other),
        })
    }

    /// Verifies the tumbler's answer to the revelation against every fake commitment and yields
    /// the real puzzle's output. On failure the state is left untouched.
    pub fn accept(
        &mut self,
        response: K::Response,
        crypto: &dyn PuzzleCrypto,
    ) -> Result<K::Output, Error> {
        let (batch, commitments) = match &self.state {
            State::Revealed {
                batch,
                commitments,
                revelation_sent: true,
            } => (batch, commitments),
            _ => return Err(self.out_of_order()),
        };

        let fakes: Vec<_> = batch.fakes().collect();
        let fake_indexes: Vec<usize> = fakes.iter().map(|(index, _, _)| *index).collect();

        let (openings, output) =
            K::open(response, &fake_indexes, batch.real_index(), commitments)?;

        if openings.len() != fakes.len() {
            return Err(Violation::ResponseSize {
                phase: K::KIND,
                expected: fakes.len(),
                actual: openings.len(),
            }
            .into());
        }

        for ((index, puzzle, secret), opening) in fakes.iter().zip(openings.iter()) {
            if !K::verify(crypto, puzzle, secret, &commitments[*index], opening) {
                return Err(Violation::InvalidCommitment {
                    phase: K::KIND,
                    index: Some(*index),
                }
                .into());
            }
        }

        self.change_state(State::Complete);
        Ok(output)
    }

    pub(crate) fn batch(&self) -> Option<&PuzzleBatch<K::Secret>> {
        match &self.state {
            State::CommitmentsRequested { batch }
            | State::CommitmentsReceived { batch, .. }
            | State::Revealed { batch, .. } => Some(batch),
            State::Idle | State::Complete => None,
        }
    }

    /// Moves from `CommitmentsReceived` to `Revealed` without sending the revelation yet.
    pub(crate) fn advance_to_revealed(&mut self) -> Result<(), Error> {
        self.transition(|state| match state {
            State::CommitmentsReceived { batch, commitments } => Ok(State::Revealed {
                batch,
                commitments,
                revelation_sent: false,
            }),
            other => Err(other),
        })
    }

    pub(crate) fn out_of_order(&self) -> Error {
        Error::OutOfOrder {
            phase: K::KIND,
            step: self.step(),
        }
    }

    /// Moves the current state into `f`. If `f` hands it back unchanged the step was wrong.
    fn transition(
        &mut self,
        f: impl FnOnce(State<K>) -> Result<State<K>, State<K>>,
    ) -> Result<(), Error> {
        let from = self.step();
        match f(std::mem::replace(&mut self.state, State::Idle)) {
            Ok(new_state) => {
                log::info!("{} phase: {:?} -> {:?}", K::KIND, from, new_state.step());
                self.state = new_state;
                Ok(())
            }
            Err(unchanged) => {
                self.state = unchanged;
                Err(self.out_of_order())
            }
        }
    }

    fn change_state(&mut self, new_state: State<K>) {
        log::info!(
            "{} phase: {:?} -> {:?}",
            K::KIND,
            self.state.step(),
            new_state.step()
        );
        self.state = new_state;
    }
}

impl<K: Kind> fmt::Debug for CutAndChoose<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CutAndChoose")
            .field("phase", &K::KIND)
            .field("batch_size", &self.batch_size)
            .field("step", &self.step())
            .finish()
    }
}

fn check_revelation<K: Kind>(
    batch: &PuzzleBatch<K::Secret>,
    revelation: &K::Revelation,
) -> Result<(), Violation> {
    let expected = batch.len() - 1;
    let indexes = revelation.fake_indexes();
    let secrets = revelation.secrets();

    if indexes.len() != expected || secrets.len() != expected {
        return Err(Violation::RevelationSize {
            phase: K::KIND,
            expected,
            actual: indexes.len().max(secrets.len()),
        });
    }

    let matches = batch
        .fakes()
        .zip(indexes.iter().zip(secrets.iter()))
        .all(|((fake_index, _, fake_secret), (index, secret))| {
            *index as usize == fake_index && secret == fake_secret
        });

    let salt_matches = revelation
        .index_salt()
        .map_or(true, |salt| salt == batch.index_salt());

    if !matches || !salt_matches {
        return Err(Violation::RevelationMismatch { phase: K::KIND });
    }

    Ok(())
}

/// Returns `index` for diagnostics unless it points at the real puzzle.
fn fake_only<S>(batch: &PuzzleBatch<S>, index: usize) -> Option<usize> {
    (index != batch.real_index()).then_some(index)
}

#[derive(Debug)]
pub enum Error {
    /// The operation is not allowed at the phase's current step.
    OutOfOrder { phase: PhaseKind, step: Step },
    Violation(Violation),
}

impl From<Violation> for Error {
    fn from(violation: Violation) -> Self {
        Error::Violation(violation)
    }
}

/// Cut-and-choose protocol violations. Indexes always refer to fake puzzles; the position of
/// the real puzzle is never reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The submitted batch does not have the agreed size.
    BatchSize {
        phase: PhaseKind,
        expected: usize,
        actual: usize,
    },
    /// A different batch was offered while the registered one awaits its commitments.
    BatchReplaced { phase: PhaseKind },
    /// The tumbler returned a different number of commitments than puzzles submitted.
    CommitmentMismatch {
        phase: PhaseKind,
        expected: usize,
        actual: usize,
    },
    /// A commitment is malformed or does not open to what the client revealed.
    InvalidCommitment {
        phase: PhaseKind,
        index: Option<usize>,
    },
    /// A revelation does not cover exactly N-1 puzzles.
    RevelationSize {
        phase: PhaseKind,
        expected: usize,
        actual: usize,
    },
    /// A revelation does not match the fake puzzles of the batch.
    RevelationMismatch { phase: PhaseKind },
    /// A blind factor does not reproduce its fake puzzle, or the tumbler refused the factors.
    InvalidBlindFactor { index: Option<usize> },
    /// The tumbler's answer to a revelation has the wrong number of entries.
    ResponseSize {
        phase: PhaseKind,
        expected: usize,
        actual: usize,
    },
}

impl Violation {
    pub fn phase(&self) -> PhaseKind {
        match self {
            Violation::BatchSize { phase, .. }
            | Violation::BatchReplaced { phase }
            | Violation::CommitmentMismatch { phase, .. }
            | Violation::InvalidCommitment { phase, .. }
            | Violation::RevelationSize { phase, .. }
            | Violation::RevelationMismatch { phase }
            | Violation::ResponseSize { phase, .. } => *phase,
            Violation::InvalidBlindFactor { .. } => PhaseKind::Solver,
        }
    }

    /// Whether the violation ends the session. Violations caught on the client's own input
    /// before anything was sent are not fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Violation::BatchSize { .. }
                | Violation::BatchReplaced { .. }
                | Violation::RevelationSize { .. }
                | Violation::RevelationMismatch { .. }
        )
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::BatchSize {
                phase,
                expected,
                actual,
            } => write!(
                f,
                "{} phase: batch of {} puzzles, expected {}",
                phase, actual, expected
            ),
            Violation::BatchReplaced { phase } => {
                write!(f, "{} phase: another batch is already submitted", phase)
            }
            Violation::CommitmentMismatch {
                phase,
                expected,
                actual,
            } => write!(
                f,
                "{} phase: received {} commitments, expected {}",
                phase, actual, expected
            ),
            Violation::InvalidCommitment {
                phase,
                index: Some(index),
            } => write!(f, "{} phase: invalid commitment at index {}", phase, index),
            Violation::InvalidCommitment { phase, index: None } => {
                write!(f, "{} phase: invalid commitment", phase)
            }
            Violation::RevelationSize {
                phase,
                expected,
                actual,
            } => write!(
                f,
                "{} phase: revelation covers {} puzzles, expected {}",
                phase, actual, expected
            ),
            Violation::RevelationMismatch { phase } => {
                write!(f, "{} phase: revelation does not match the batch", phase)
            }
            Violation::InvalidBlindFactor { index: Some(index) } => {
                write!(f, "solver phase: invalid blind factor at index {}", index)
            }
            Violation::InvalidBlindFactor { index: None } => {
                write!(f, "solver phase: blind factors rejected")
            }
            Violation::ResponseSize {
                phase,
                expected,
                actual,
            } => write!(
                f,
                "{} phase: answer has {} entries, expected {}",
                phase, actual, expected
            ),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mock::{self, MockCrypto};
    use crate::promise::{ClientRevelation, Promise, ServerCommitmentsProof};
    use crate::puzzle::Salt;

    const N: usize = 5;

    fn received(real_at: usize) -> (CutAndChoose<Promise>, PuzzleBatch<Salt>) {
        let batch = mock::promise_batch(N - 1, real_at);
        let mut phase = CutAndChoose::<Promise>::new(N);
        phase.request_commitments(batch.clone()).unwrap();
        phase
            .receive_commitments(mock::promise_commitments(batch.puzzles()))
            .unwrap();
        (phase, batch)
    }

    fn proof(batch: &PuzzleBatch<Salt>) -> ServerCommitmentsProof {
        ServerCommitmentsProof {
            fake_solutions: batch
                .fakes()
                .map(|(_, puzzle, _)| mock::promise_solution(puzzle))
                .collect(),
        }
    }

    #[test]
    fn promise_flow() {
        let (mut phase, batch) = received(2);
        assert_eq!(phase.step(), Step::CommitmentsReceived);
        assert_eq!(phase.commitments().unwrap().len(), N);

        phase
            .disclose(&ClientRevelation::from_batch(&batch))
            .unwrap();
        assert_eq!(phase.step(), Step::Revealed);

        let real = phase.accept(proof(&batch), &MockCrypto).unwrap();
        assert_eq!(phase.step(), Step::Complete);
        assert_eq!(
            real,
            mock::promise_commitments(batch.puzzles()).swap_remove(2)
        );
    }

    #[test]
    fn wrong_batch_size() {
        let mut phase = CutAndChoose::<Promise>::new(N);
        let result = phase.request_commitments(mock::promise_batch(N, 0));

        assert!(matches!(
            result,
            Err(Error::Violation(Violation::BatchSize {
                expected: N,
                actual: 6,
                ..
            }))
        ));
        assert_eq!(phase.step(), Step::Idle);
    }

    #[test]
    fn registered_batch_can_be_resubmitted() {
        let batch = mock::promise_batch(N - 1, 2);
        let mut phase = CutAndChoose::<Promise>::new(N);
        phase.request_commitments(batch.clone()).unwrap();

        let again = phase.request_commitments(batch.clone()).unwrap();
        assert!(again.same_as(&batch));
        assert_eq!(phase.step(), Step::CommitmentsRequested);
    }

    #[test]
    fn registered_batch_cannot_be_swapped() {
        let batch = mock::promise_batch(N - 1, 2);
        let mut phase = CutAndChoose::<Promise>::new(N);
        phase.request_commitments(batch.clone()).unwrap();

        // same real puzzle, other position and salt
        let result = phase.request_commitments(mock::promise_batch(N - 1, 0));
        assert!(matches!(
            result,
            Err(Error::Violation(Violation::BatchReplaced {
                phase: PhaseKind::Promise
            }))
        ));
        assert!(phase.batch().unwrap().same_as(&batch));

        // the commitments still answer the registered batch
        phase
            .receive_commitments(mock::promise_commitments(batch.puzzles()))
            .unwrap();
        assert!(phase
            .disclose(&ClientRevelation::from_batch(&batch))
            .is_ok());
    }

    #[test]
    fn revelation_must_open_the_fake_set_commitment() {
        let (mut phase, batch) = received(1);

        let mut revelation = ClientRevelation::from_batch(&batch);
        revelation.index_salt[0] ^= 0xff;

        assert!(matches!(
            phase.disclose(&revelation),
            Err(Error::Violation(Violation::RevelationMismatch { .. }))
        ));
        assert_eq!(phase.step(), Step::CommitmentsReceived);
    }

    #[test]
    fn commitment_count_mismatch() {
        let batch = mock::promise_batch(N - 1, 0);
        let mut phase = CutAndChoose::<Promise>::new(N);
        phase.request_commitments(batch.clone()).unwrap();

        let mut commitments = mock::promise_commitments(batch.puzzles());
        commitments.pop();

        let result = phase.receive_commitments(commitments);
        assert!(matches!(
            result,
            Err(Error::Violation(Violation::CommitmentMismatch {
                phase: PhaseKind::Promise,
                expected: N,
                actual: 4
            }))
        ));
        assert_eq!(phase.step(), Step::CommitmentsRequested);
    }

    #[test]
    fn malformed_commitment_at_real_index_is_not_named() {
        let batch = mock::promise_batch(N - 1, 3);
        let mut phase = CutAndChoose::<Promise>::new(N);
        phase.request_commitments(batch.clone()).unwrap();

        let mut commitments = mock::promise_commitments(batch.puzzles());
        commitments[3].promise.clear();

        let result = phase.receive_commitments(commitments);
        assert!(matches!(
            result,
            Err(Error::Violation(Violation::InvalidCommitment { index: None, .. }))
        ));
    }

    #[test]
    fn revelation_before_commitments() {
        let batch = mock::promise_batch(N - 1, 0);
        let mut phase = CutAndChoose::<Promise>::new(N);
        phase.request_commitments(batch.clone()).unwrap();

        let result = phase.disclose(&ClientRevelation::from_batch(&batch));
        assert!(matches!(
            result,
            Err(Error::OutOfOrder {
                phase: PhaseKind::Promise,
                step: Step::CommitmentsRequested
            })
        ));
    }

    #[test]
    fn revelation_must_cover_n_minus_one() {
        let (mut phase, batch) = received(0);

        let mut revelation = ClientRevelation::from_batch(&batch);
        revelation.fake_indexes.pop();
        revelation.salts.pop();

        let result = phase.disclose(&revelation);
        assert!(matches!(
            result,
            Err(Error::Violation(Violation::RevelationSize {
                expected: 4,
                actual: 3,
                ..
            }))
        ));
        assert_eq!(phase.step(), Step::CommitmentsReceived);
    }

    #[test]
    fn revelation_must_not_name_real_puzzle() {
        let (mut phase, batch) = received(1);

        let mut revelation = ClientRevelation::from_batch(&batch);
        // swap a fake for the real index
        revelation.fake_indexes[0] = 1;

        let result = phase.disclose(&revelation);
        assert!(matches!(
            result,
            Err(Error::Violation(Violation::RevelationMismatch { .. }))
        ));
        assert_eq!(phase.step(), Step::CommitmentsReceived);
    }

    #[test]
    fn revelation_is_sent_once() {
        let (mut phase, batch) = received(0);
        let revelation = ClientRevelation::from_batch(&batch);

        phase.disclose(&revelation).unwrap();
        assert!(matches!(
            phase.disclose(&revelation),
            Err(Error::OutOfOrder {
                step: Step::Revealed,
                ..
            })
        ));
    }

    #[test]
    fn tampered_fake_leaves_state_unchanged() {
        let (mut phase, batch) = received(4);
        phase
            .disclose(&ClientRevelation::from_batch(&batch))
            .unwrap();

        let mut tampered = proof(&batch);
        tampered.fake_solutions[2] = mock::tamper(&tampered.fake_solutions[2]);

        match phase.accept(tampered, &MockCrypto) {
            Err(Error::Violation(violation)) => {
                assert_eq!(
                    violation,
                    Violation::InvalidCommitment {
                        phase: PhaseKind::Promise,
                        index: Some(2)
                    }
                );
                assert!(violation.is_fatal());
            }
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
        assert_eq!(phase.step(), Step::Revealed);

        // the untampered proof is still accepted
        assert!(phase.accept(proof(&batch), &MockCrypto).is_ok());
    }

    #[test]
    fn short_proof() {
        let (mut phase, batch) = received(0);
        phase
            .disclose(&ClientRevelation::from_batch(&batch))
            .unwrap();

        let mut proof = proof(&batch);
        proof.fake_solutions.pop();

        assert!(matches!(
            phase.accept(proof, &MockCrypto),
            Err(Error::Violation(Violation::ResponseSize {
                expected: 4,
                actual: 3,
                ..
            }))
        ));
    }

    #[test]
    fn violations_name_their_phase() {
        let violation = Violation::InvalidCommitment {
            phase: PhaseKind::Solver,
            index: Some(7),
        };
        assert_eq!(
            violation.to_string(),
            "solver phase: invalid commitment at index 7"
        );
        assert!(violation.is_fatal());
        assert!(!Violation::RevelationMismatch {
            phase: PhaseKind::Promise
        }
        .is_fatal());
        assert!(!Violation::BatchReplaced {
            phase: PhaseKind::Solver
        }
        .is_fatal());
    }
}

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

//! A client session with one tumbler. The session executes requests through its [`Transport`],
//! feeds the answers to the cut-and-choose phases and keeps everything that must not be sent
//! twice. All calls block until the tumbler has answered.
//!
//! A fatal protocol violation aborts the session; every later call fails with
//! [`Error::Aborted`].

use std::collections::HashSet;
use std::thread;
use std::time::Instant;

use bitcoin::{Network, PublicKey, Txid};

use crate::codec::{self, Codec, Message};
use crate::endpoints::Endpoints;
use crate::escrow::{self, ChannelId, ClientEscrowInfo, EscrowInfo, TumblerEscrowInfo};
use crate::http::{self, Reply, Transport, TransportError};
use crate::parameters::SessionParameters;
use crate::phase::{self, PhaseKind, Step, Violation};
use crate::promise::{self, PromisePhase};
use crate::puzzle::{BlindFactor, PuzzleBatch, PuzzleSolution, Salt};
use crate::solver::{self, Ack, RealSolution, SolverPhase};
use crate::util::backoff::Backoff;
use crate::voucher::{self, Voucher, VoucherError, VoucherStatus};
use crate::PuzzleCrypto;

/// Session configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Network the tumbler must operate on.
    pub network: Network,
    /// Index of the tumbler on the server.
    pub tumbler: u32,
    /// How long to keep asking for a voucher.
    pub voucher_backoff: Backoff,
    /// Promise-phase batch size agreed out of band. The tumbler's parameters must match.
    pub promise_batch_size: Option<usize>,
    /// Solver-phase batch size agreed out of band. The tumbler's parameters must match.
    pub solver_batch_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: Network::Bitcoin,
            tumbler: 0,
            voucher_backoff: Backoff::default(),
            promise_batch_size: None,
            solver_batch_size: None,
        }
    }
}

#[derive(Debug)]
pub struct Session<T: Transport, C: PuzzleCrypto> {
    transport: T,
    crypto: C,
    codec: Codec,
    endpoints: Endpoints,
    config: Config,
    parameters: Option<SessionParameters>,
    /// Digests of the voucher tokens redeemed by this session.
    redeemed: HashSet<[u8; 32]>,
    tumbler_key: Option<PublicKey>,
    escrow: Option<EscrowInfo>,
    promise: Option<PromisePhase>,
    solver: Option<SolverPhase>,
    aborted: bool,
}

impl<T: Transport, C: PuzzleCrypto> Session<T, C> {
    /// Creates a session. Nothing is sent until the first operation.
    pub fn new(transport: T, crypto: C, config: Config) -> Self {
        Self {
            transport,
            crypto,
            codec: Codec::new(config.network),
            endpoints: Endpoints::new(config.tumbler),
            config,
            parameters: None,
            redeemed: HashSet::new(),
            tumbler_key: None,
            escrow: None,
            promise: None,
            solver: None,
            aborted: false,
        }
    }

    /// Fetches the tumbler's parameters. Only the first successful call reaches the tumbler.
    pub fn fetch_parameters(&mut self) -> Result<SessionParameters, Error> {
        self.check_aborted()?;
        let result = self.parameters_inner();
        self.settle(result)
    }

    /// Asks the tumbler for a voucher. A voucher that does not carry a valid signature by the
    /// tumbler's voucher key is refused.
    pub fn request_voucher(&mut self) -> Result<VoucherStatus, Error> {
        self.check_aborted()?;
        let result = self.request_voucher_inner();
        self.settle(result)
    }

    /// Keeps asking for a voucher until one is issued, backing off between attempts. Transport
    /// failures are retried like an absent voucher.
    pub fn poll_voucher(&mut self) -> Result<Voucher, Error> {
        let mut delays = self.config.voucher_backoff.delays();
        loop {
            match self.request_voucher() {
                Ok(VoucherStatus::Available(voucher)) => return Ok(voucher),
                Ok(VoucherStatus::NotYetIssued) => {}
                Err(error) if error.is_retryable() => {
                    log::debug!("voucher request failed: {}", error);
                }
                Err(error) => return Err(error),
            }

            match delays.next() {
                Some(delay) => {
                    log::debug!("no voucher yet, asking again in {} s", delay.as_secs());
                    thread::sleep(delay);
                }
                None => return Err(Error::NotYetAvailable),
            }
        }
    }

    /// Redeems a voucher against the payment transaction. The token is remembered before the
    /// request is sent, so a voucher can never be redeemed twice from the same session.
    pub fn redeem_voucher(
        &mut self,
        voucher: Voucher,
        payment: &Txid,
    ) -> Result<PuzzleSolution, Error> {
        self.check_aborted()?;
        let result = self.redeem_voucher_inner(voucher, payment);
        self.settle(result)
    }

    /// Asks for the key the tumbler will use in the client's escrow. Repeated calls must yield
    /// the same key.
    pub fn request_escrow_key(&mut self, info: &ClientEscrowInfo) -> Result<PublicKey, Error> {
        self.check_aborted()?;
        let result = self.request_escrow_key_inner(info);
        self.settle(result)
    }

    /// Opens the channel and sets up both cut-and-choose phases. The channel id is fixed for the
    /// rest of the session.
    pub fn open_channel(&mut self, info: &ClientEscrowInfo) -> Result<TumblerEscrowInfo, Error> {
        self.check_aborted()?;
        let result = self.open_channel_inner(info);
        self.settle(result)
    }

    /// Submits the promise-phase batch and returns the tumbler's commitments, one per puzzle.
    /// Once submitted, the batch is the only one accepted for the channel, so a retry after a
    /// transport failure has to resend the same batch.
    pub fn sign_hashes(
        &mut self,
        channel: &ChannelId,
        batch: PuzzleBatch<Salt>,
    ) -> Result<Vec<promise::ServerCommitment>, Error> {
        self.check_aborted()?;
        let result = self.sign_hashes_inner(channel, batch);
        self.settle(result)
    }

    /// Reveals the promise-phase fakes, checks the tumbler's proof for each of them and returns
    /// the commitment for the real puzzle.
    pub fn check_promise_revelation(
        &mut self,
        channel: &ChannelId,
        revelation: &promise::ClientRevelation,
    ) -> Result<promise::ServerCommitment, Error> {
        self.check_aborted()?;
        let result = self.check_promise_revelation_inner(channel, revelation);
        self.settle(result)
    }

    /// Submits the solver-phase batch and returns the tumbler's commitments, one per puzzle.
    /// Retries must resend the same batch.
    pub fn solve_puzzles(
        &mut self,
        channel: &ChannelId,
        batch: PuzzleBatch<PuzzleSolution>,
    ) -> Result<Vec<solver::ServerCommitment>, Error> {
        self.check_aborted()?;
        let result = self.solve_puzzles_inner(channel, batch);
        self.settle(result)
    }

    /// Discloses the blind factors of the solver-phase fakes, in ascending fake index order.
    pub fn check_blind_factors(
        &mut self,
        channel: &ChannelId,
        factors: &[BlindFactor],
    ) -> Result<(), Error> {
        self.check_aborted()?;
        let result = self.check_blind_factors_inner(channel, factors);
        self.settle(result)
    }

    /// Reveals the solver-phase fakes, checks the keys the tumbler returns for them and yields
    /// the real puzzle's commitment together with its key.
    pub fn check_solver_revelation(
        &mut self,
        channel: &ChannelId,
        revelation: &solver::ClientRevelation,
    ) -> Result<RealSolution, Error> {
        self.check_aborted()?;
        let result = self.check_solver_revelation_inner(channel, revelation);
        self.settle(result)
    }

    /// Parameters fetched so far, if any.
    pub fn parameters(&self) -> Option<&SessionParameters> {
        self.parameters.as_ref()
    }

    /// The opened channel.
    pub fn escrow(&self) -> Option<&EscrowInfo> {
        self.escrow.as_ref()
    }

    /// Progress of the promise phase, once a channel is open.
    pub fn promise_step(&self) -> Option<Step> {
        self.promise.as_ref().map(|phase| phase.step())
    }

    /// Progress of the solver phase, once a channel is open.
    pub fn solver_step(&self) -> Option<Step> {
        self.solver.as_ref().map(|phase| phase.step())
    }

    /// Whether a fatal error ended the session.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn parameters_inner(&mut self) -> Result<SessionParameters, Error> {
        if let Some(parameters) = &self.parameters {
            return Ok(parameters.clone());
        }

        let parameters = match self.execute(SessionParameters::request(&self.endpoints)) {
            Ok(Reply::Found(parameters)) => parameters,
            Ok(Reply::Absent) => return Err(Error::Unavailable(None)),
            Err(Error::Transport(error)) => return Err(Error::Unavailable(Some(error))),
            Err(error) => return Err(error),
        };

        for (phase, pinned, advertised) in [
            (
                PhaseKind::Promise,
                self.config.promise_batch_size,
                parameters.promise_batch_size,
            ),
            (
                PhaseKind::Solver,
                self.config.solver_batch_size,
                parameters.solver_batch_size,
            ),
        ] {
            match pinned {
                Some(expected) if expected != advertised => {
                    return Err(Error::ParameterMismatch {
                        phase,
                        expected,
                        actual: advertised,
                    })
                }
                _ => {}
            }
        }

        log::info!(
            "tumbler parameters: denomination {} sat, fee {} sat, cycle length {} blocks",
            parameters.denomination,
            parameters.fee,
            parameters.cycle.length
        );
        self.parameters = Some(parameters.clone());
        Ok(parameters)
    }

    fn request_voucher_inner(&mut self) -> Result<VoucherStatus, Error> {
        let parameters = self.parameters_inner()?;

        match self.execute(Voucher::request(&self.endpoints))? {
            Reply::Absent => Ok(VoucherStatus::NotYetIssued),
            Reply::Found(voucher) => match voucher.verify(&parameters) {
                Ok(()) => Ok(VoucherStatus::Available(voucher)),
                Err(error) => {
                    log::warn!("refusing voucher: {}", error);
                    Err(Error::InvalidVoucher(error))
                }
            },
        }
    }

    fn redeem_voucher_inner(
        &mut self,
        voucher: Voucher,
        payment: &Txid,
    ) -> Result<PuzzleSolution, Error> {
        let digest = voucher.digest();
        if self.redeemed.contains(&digest) {
            log::warn!("refusing to redeem a voucher twice");
            return Err(Error::InvalidVoucher(VoucherError::AlreadyRedeemed));
        }

        let parameters = self.parameters_inner()?;
        voucher.verify(&parameters).map_err(Error::InvalidVoucher)?;

        let request = voucher::redeem_request(&self.endpoints, &self.codec, payment)?;
        self.redeemed.insert(digest);

        match self.execute(request) {
            Ok(Reply::Found(solution)) => Ok(solution),
            Ok(Reply::Absent) => Err(rejected_voucher(404)),
            Err(Error::Status { status, .. }) if is_client_error(status) => {
                Err(rejected_voucher(status))
            }
            Err(error) => Err(error),
        }
    }

    fn request_escrow_key_inner(&mut self, info: &ClientEscrowInfo) -> Result<PublicKey, Error> {
        if self.escrow.is_some() {
            return Err(Error::ChannelAlreadyOpen);
        }

        let request = escrow::escrow_key_request(&self.endpoints, &self.codec, info)?;
        let key = escrow_answer(self.execute(request))?;

        match self.tumbler_key {
            Some(known) if known != key => Err(Error::TumblerKeyMismatch),
            _ => {
                self.tumbler_key = Some(key);
                Ok(key)
            }
        }
    }

    fn open_channel_inner(&mut self, info: &ClientEscrowInfo) -> Result<TumblerEscrowInfo, Error> {
        if self.escrow.is_some() {
            return Err(Error::ChannelAlreadyOpen);
        }
        let tumbler_key = self.tumbler_key.ok_or(Error::EscrowKeyMissing)?;
        let parameters = self.parameters_inner()?;

        let request = escrow::open_channel_request(&self.endpoints, &self.codec, info)?;
        let tumbler = escrow_answer(self.execute(request))?;

        if tumbler.tumbler_key != tumbler_key {
            return Err(Error::TumblerKeyMismatch);
        }

        log::info!("opened channel {}", tumbler.channel_id);
        self.escrow = Some(EscrowInfo {
            channel_id: tumbler.channel_id.clone(),
            client_key: info.escrow_key,
            tumbler_key,
        });
        self.promise = Some(PromisePhase::new(parameters.promise_batch_size));
        self.solver = Some(SolverPhase::new(parameters.solver_batch_size));

        Ok(tumbler)
    }

    fn sign_hashes_inner(
        &mut self,
        channel: &ChannelId,
        batch: PuzzleBatch<Salt>,
    ) -> Result<Vec<promise::ServerCommitment>, Error> {
        self.check_channel(channel)?;
        let phase = self.promise.as_mut().ok_or(Error::ChannelNotOpen)?;

        let batch = phase.request_commitments(batch)?;
        let request = promise::sign_hashes_request(&self.endpoints, &self.codec, channel, batch)?;
        let commitments = found(self.execute(request)?)?;

        let phase = self.promise.as_mut().ok_or(Error::ChannelNotOpen)?;
        phase.receive_commitments(commitments.clone())?;
        Ok(commitments)
    }

    fn check_promise_revelation_inner(
        &mut self,
        channel: &ChannelId,
        revelation: &promise::ClientRevelation,
    ) -> Result<promise::ServerCommitment, Error> {
        self.check_channel(channel)?;
        let request =
            promise::revelation_request(&self.endpoints, &self.codec, channel, revelation)?;

        let phase = self.promise.as_mut().ok_or(Error::ChannelNotOpen)?;
        phase.disclose(revelation)?;

        let proof = found(self.disclose(request)?)?;

        let phase = self.promise.as_mut().ok_or(Error::ChannelNotOpen)?;
        let real = phase.accept(proof, &self.crypto)?;
        log::info!("promise phase proved");
        Ok(real)
    }

    fn solve_puzzles_inner(
        &mut self,
        channel: &ChannelId,
        batch: PuzzleBatch<PuzzleSolution>,
    ) -> Result<Vec<solver::ServerCommitment>, Error> {
        self.check_channel(channel)?;
        let phase = self.solver.as_mut().ok_or(Error::ChannelNotOpen)?;

        let batch = phase.request_commitments(batch)?;
        let request = solver::solve_puzzles_request(&self.endpoints, &self.codec, channel, batch)?;
        let commitments = found(self.execute(request)?)?;

        let phase = self.solver.as_mut().ok_or(Error::ChannelNotOpen)?;
        phase.receive_commitments(commitments.clone())?;
        Ok(commitments)
    }

    fn check_blind_factors_inner(
        &mut self,
        channel: &ChannelId,
        factors: &[BlindFactor],
    ) -> Result<(), Error> {
        self.check_channel(channel)?;
        let request = solver::blind_factors_request(&self.endpoints, &self.codec, channel, factors)?;

        let phase = self.solver.as_mut().ok_or(Error::ChannelNotOpen)?;
        phase.disclose_blind_factors(factors, &self.crypto)?;

        match self.disclose(request) {
            Ok(Reply::Found(Ack(true))) => Ok(()),
            Ok(Reply::Found(Ack(false))) => Err(refused_blind_factors()),
            Err(Error::Status { status, .. }) if is_client_error(status) => {
                Err(refused_blind_factors())
            }
            Ok(Reply::Absent) => Err(Error::Status {
                status: 404,
                body: String::new(),
            }),
            Err(error) => Err(error),
        }
    }

    fn check_solver_revelation_inner(
        &mut self,
        channel: &ChannelId,
        revelation: &solver::ClientRevelation,
    ) -> Result<RealSolution, Error> {
        self.check_channel(channel)?;
        let request =
            solver::revelation_request(&self.endpoints, &self.codec, channel, revelation)?;

        let phase = self.solver.as_mut().ok_or(Error::ChannelNotOpen)?;
        phase.disclose(revelation)?;

        let keys = found(self.disclose(request)?)?;

        let phase = self.solver.as_mut().ok_or(Error::ChannelNotOpen)?;
        let real = phase.accept(keys, &self.crypto)?;
        log::info!("solver phase solved");
        Ok(real)
    }

    fn check_aborted(&self) -> Result<(), Error> {
        match self.aborted {
            true => Err(Error::Aborted),
            false => Ok(()),
        }
    }

    /// Aborts the session if `result` carries a fatal error.
    fn settle<R>(&mut self, result: Result<R, Error>) -> Result<R, Error> {
        if let Err(error) = &result {
            if error.is_fatal() {
                log::error!("aborting session: {}", error);
                self.aborted = true;
            }
        }
        result
    }

    fn check_channel(&self, channel: &ChannelId) -> Result<(), Error> {
        match &self.escrow {
            None => Err(Error::ChannelNotOpen),
            Some(escrow) if &escrow.channel_id != channel => Err(Error::ChannelMismatch),
            Some(_) => Ok(()),
        }
    }

    /// Executes a request that discloses secrets. Once sent it cannot be taken back, so a
    /// transport failure leaves the outcome unknown.
    fn disclose<R: Message>(&self, request: http::Request<R>) -> Result<Reply<R>, Error> {
        self.execute(request).map_err(|error| match error {
            Error::Transport(error) => Error::AmbiguousOutcome(error),
            other => other,
        })
    }

    /// Executes an HTTP request.
    fn execute<R: Message>(&self, request: http::Request<R>) -> Result<Reply<R>, Error> {
        log::debug!("HTTP >>: {:?} {}", request.method, request.path);

        let start = Instant::now();
        let response =
            self.transport
                .send(request.method, &request.path, request.body.as_ref())?;
        let req_secs = Instant::now().saturating_duration_since(start).as_secs();

        log::debug!("HTTP ({} s) <<: {}", req_secs, response.status);
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("HTTP (body) <<: {}", String::from_utf8_lossy(&response.body));
        }

        match response.status {
            404 => Ok(Reply::Absent),
            200..=299 => {
                let mut body = response.body;
                if body.is_empty() {
                    // serde doesn't allow empty strings to be deserialized to anything so we
                    // have to get around that problem by creating an empty JSON valid body
                    body.extend_from_slice(b"{}");
                }
                Ok(Reply::Found(self.codec.decode(&body)?))
            }
            status => Err(Error::Status {
                status,
                body: String::from_utf8_lossy(&response.body).to_string(),
            }),
        }
    }
}

fn found<R>(reply: Reply<R>) -> Result<R, Error> {
    match reply {
        Reply::Found(value) => Ok(value),
        Reply::Absent => Err(Error::Status {
            status: 404,
            body: String::new(),
        }),
    }
}

fn escrow_answer<R>(result: Result<Reply<R>, Error>) -> Result<R, Error> {
    match result {
        Ok(Reply::Found(value)) => Ok(value),
        Ok(Reply::Absent) => Err(Error::EscrowRejected { status: 404 }),
        Err(Error::Status { status, .. }) if is_client_error(status) => {
            Err(Error::EscrowRejected { status })
        }
        Err(error) => Err(error),
    }
}

fn rejected_voucher(status: u16) -> Error {
    log::warn!("voucher rejected by the tumbler ({})", status);
    Error::InvalidVoucher(VoucherError::Rejected { status })
}

fn refused_blind_factors() -> Error {
    Error::Violation(Violation::InvalidBlindFactor { index: None })
}

fn is_client_error(status: u16) -> bool {
    (400..500).contains(&status)
}

#[derive(Debug)]
pub enum Error {
    Transport(TransportError),
    /// The tumbler cannot be reached or does not publish parameters.
    Unavailable(Option<TransportError>),
    /// Sending a disclosure failed; the tumbler may or may not have received it.
    AmbiguousOutcome(TransportError),
    /// Polling ran out of attempts.
    NotYetAvailable,
    Violation(Violation),
    InvalidVoucher(VoucherError),
    EscrowRejected {
        status: u16,
    },
    /// `open_channel` needs the tumbler's escrow key first.
    EscrowKeyMissing,
    /// The tumbler changed its escrow key.
    TumblerKeyMismatch,
    /// The advertised batch size differs from the one agreed out of band.
    ParameterMismatch {
        phase: PhaseKind,
        expected: usize,
        actual: usize,
    },
    ChannelAlreadyOpen,
    ChannelNotOpen,
    /// The channel id does not belong to this session.
    ChannelMismatch,
    OutOfOrder {
        phase: PhaseKind,
        step: Step,
    },
    /// Unexpected HTTP status.
    Status {
        status: u16,
        body: String,
    },
    Codec(codec::Error),
    /// A fatal violation ended the session earlier.
    Aborted,
}

impl Error {
    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::Unavailable(_) | Error::NotYetAvailable
        )
    }

    /// Whether the error ends the session.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Violation(violation) => violation.is_fatal(),
            Error::TumblerKeyMismatch | Error::ParameterMismatch { .. } => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Transport(inner) => write!(f, "transport: {}", inner),
            Error::Unavailable(Some(inner)) => write!(f, "tumbler unavailable: {}", inner),
            Error::Unavailable(None) => write!(f, "tumbler unavailable"),
            Error::AmbiguousOutcome(inner) => {
                write!(f, "disclosure may or may not have been received: {}", inner)
            }
            Error::NotYetAvailable => write!(f, "not yet available"),
            Error::Violation(violation) => write!(f, "protocol violation: {}", violation),
            Error::InvalidVoucher(inner) => write!(f, "invalid voucher: {}", inner),
            Error::EscrowRejected { status } => write!(f, "escrow rejected ({})", status),
            Error::EscrowKeyMissing => write!(f, "tumbler escrow key not requested yet"),
            Error::TumblerKeyMismatch => write!(f, "tumbler escrow key changed"),
            Error::ParameterMismatch {
                phase,
                expected,
                actual,
            } => write!(
                f,
                "{} batch size is {}, expected {}",
                phase, actual, expected
            ),
            Error::ChannelAlreadyOpen => write!(f, "channel already open"),
            Error::ChannelNotOpen => write!(f, "channel not open"),
            Error::ChannelMismatch => write!(f, "unknown channel"),
            Error::OutOfOrder { phase, step } => {
                write!(f, "{} phase: not allowed at step {:?}", phase, step)
            }
            Error::Status { status, body } => write!(f, "HTTP {}: {}", status, body),
            Error::Codec(inner) => write!(f, "codec: {}", inner),
            Error::Aborted => write!(f, "session aborted"),
        }
    }
}

impl std::error::Error for Error {}

impl From<TransportError> for Error {
    fn from(error: TransportError) -> Self {
        Error::Transport(error)
    }
}

impl From<codec::Error> for Error {
    fn from(error: codec::Error) -> Self {
        Error::Codec(error)
    }
}

impl From<phase::Error> for Error {
    fn from(error: phase::Error) -> Self {
        match error {
            phase::Error::OutOfOrder { phase, step } => Error::OutOfOrder { phase, step },
            phase::Error::Violation(violation) => Error::Violation(violation),
        }
    }
}

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

//! Client side coordination of a TumbleBit tumbler: voucher exchange, escrow negotiation and the
//! two cut-and-choose phases (puzzle-promise and puzzle-solver). Puzzle arithmetic is provided
//! through [`PuzzleCrypto`] and requests travel over any [`http::Transport`].

pub mod codec;
pub mod endpoints;
pub mod escrow;
pub mod http;
pub mod parameters;
pub mod phase;
pub mod promise;
pub mod puzzle;
pub mod session;
pub mod solver;
pub mod util;
pub mod voucher;

#[cfg(test)]
mod mock;

pub use bitcoin;

#[cfg(feature = "client")]
const UA_HTTP: &str = "tumbler-client/1.0";

/// A trait that enables implementing types to check the tumbler's cryptographic answers. The
/// coordinator only moves opaque values around; every check that needs puzzle arithmetic goes
/// through here.
pub trait PuzzleCrypto: std::fmt::Debug + Send {
    /// Checks that `commitment` was made for the fake hash derived from `salt` and that
    /// `solution` opens it.
    fn verify_promise(
        &self,
        hash: &puzzle::PuzzleValue,
        salt: &puzzle::Salt,
        commitment: &promise::ServerCommitment,
        solution: &puzzle::PuzzleSolution,
    ) -> bool;

    /// Checks that `factor` blinds a fake puzzle into `puzzle`.
    fn verify_blind_factor(&self, puzzle: &puzzle::PuzzleValue, factor: &puzzle::BlindFactor)
        -> bool;

    /// Checks that `key` decrypts `commitment` into `solution` and that `solution` solves
    /// `puzzle`.
    fn verify_solution(
        &self,
        puzzle: &puzzle::PuzzleValue,
        solution: &puzzle::PuzzleSolution,
        commitment: &solver::ServerCommitment,
        key: &solver::SolutionKey,
    ) -> bool;
}

#[cfg(feature = "client")]
pub use client::{connect, TorConfig, TorTransport};
pub use phase::{PhaseKind, Step};
pub use session::{Config, Error, Session};
pub use voucher::{Voucher, VoucherStatus};

#[cfg(feature = "client")]
pub mod client {
    //! Contains a Tor-only transport. Every transport gets its own isolation tokens and therefore
    //! its own Tor circuit.
    use std::net::Ipv4Addr;
    use std::time::Duration;

    use crate::http::{Body, Method, Response, Transport, TransportError};
    use crate::session::{Config, Session};
    use crate::{endpoints, PuzzleCrypto, UA_HTTP};

    #[derive(Debug, Copy, Clone)]
    /// Tor configuration for the client.
    pub struct TorConfig {
        /// The IP address of the socks5 proxy.
        pub host: std::net::Ipv4Addr,
        /// The port of the socks5 proxy.
        pub port: u16,
        /// Determines timeout for HTTP requests.
        pub request_timeout: Duration,
    }

    impl Default for TorConfig {
        fn default() -> Self {
            Self {
                host: Ipv4Addr::LOCALHOST,
                port: 9050,
                request_timeout: Duration::from_secs(120),
            }
        }
    }

    /// HTTP transport to a tumbler server, routed through Tor.
    pub struct TorTransport {
        agent: ureq::Agent,
        server: String,
    }

    impl TorTransport {
        /// Creates a new transport with its own isolation tokens. Returns `None` if Tor is not
        /// locally running and available.
        pub fn new(tor_config: TorConfig, server: &str) -> Option<TorTransport> {
            if !port_check::is_port_reachable((tor_config.host, tor_config.port)) {
                log::warn!(
                    "Tor is not reachable at {}:{}",
                    tor_config.host,
                    tor_config.port
                );
                return None;
            }

            match build_http_agent(tor_config) {
                Ok(agent) => Some(Self {
                    agent,
                    server: server.to_owned(),
                }),
                Err(error) => {
                    log::warn!("cannot build HTTP agent: {}", error);
                    None
                }
            }
        }

        /// Root URL of the tumbler this transport talks to.
        pub fn server(&self) -> &str {
            &self.server
        }
    }

    impl std::fmt::Debug for TorTransport {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("TorTransport")
                .field("server", &self.server)
                .finish_non_exhaustive()
        }
    }

    impl Transport for TorTransport {
        fn send(
            &self,
            method: Method,
            path: &str,
            body: Option<&Body>,
        ) -> Result<Response, TransportError> {
            let url = endpoints::full_url(&self.server, path);
            let request = match method {
                Method::GET => self.agent.get(&url),
                Method::POST => self.agent.post(&url),
            };

            let response = match body {
                Some(body) => request
                    .set("Content-Type", body.content_type)
                    .send_bytes(&body.body),
                None => request.call(),
            };

            match response {
                Ok(response) | Err(ureq::Error::Status(_, response)) => {
                    use std::io::Read;
                    let mut buf = vec![];
                    let status = response.status();
                    response.into_reader().read_to_end(&mut buf)?;
                    Ok(Response { status, body: buf })
                }
                Err(ureq::Error::Transport(error)) => {
                    Err(TransportError::Connection(Box::new(error)))
                }
            }
        }
    }

    /// Opens a session with the tumbler at `server` over Tor. Returns `None` if Tor is not
    /// locally running and available.
    pub fn connect<C: PuzzleCrypto>(
        tor_config: TorConfig,
        server: &str,
        config: Config,
        crypto: C,
    ) -> Option<Session<TorTransport, C>> {
        TorTransport::new(tor_config, server).map(|transport| Session::new(transport, crypto, config))
    }

    /// Builds a new HTTP agent with new isolation tokens.
    #[allow(clippy::result_large_err)]
    fn build_http_agent(tor_config: TorConfig) -> Result<ureq::Agent, ureq::Error> {
        let TorConfig {
            host: proxy_host,
            port: proxy_port,
            request_timeout,
        } = tor_config;

        let (username, password) = isolation_tokens();

        let proxy = ureq::Proxy::new(format!(
            "socks5://{username}:{password}@{proxy_host}:{proxy_port}"
        ))?;

        Ok(ureq::builder()
            .proxy(proxy)
            .user_agent(UA_HTTP)
            .timeout_connect(request_timeout)
            .timeout(request_timeout)
            .build())
    }

    /// Generates isolation tokens for Tor SOCKS5 proxies. They are meant to be used as
    /// a username:password combination when handshaking with a proxy. That creates a new
    /// Tor ciruit every time.
    fn isolation_tokens() -> (String, String) {
        use rand::{distributions::Alphanumeric, Rng};
        let mut first: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();
        let second = first.split_off(12);
        (first, second)
    }

    #[cfg(test)]
    mod test {
        use super::*;

        #[test]
        fn isolation_tokens_differ() {
            let (user, pass) = isolation_tokens();
            assert_eq!(user.len(), 12);
            assert_eq!(pass.len(), 12);
            assert_ne!(isolation_tokens(), (user, pass));
        }

        #[test]
        fn missing_tor() {
            let tor_config = TorConfig {
                port: 1,
                ..TorConfig::default()
            };
            assert!(TorTransport::new(tor_config, "http://localhost:5000").is_none());
        }
    }
}

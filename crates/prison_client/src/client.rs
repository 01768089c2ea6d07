//! Protocol state machine.
//!
//! [`ProtocolClient`] never touches a socket. Its owner reports transport
//! lifecycle changes (`transport_opened`, `transport_closed`, ...), hands in
//! received text with [`ProtocolClient::receive`], and after every call
//! drains the outbound lines and session events the client queued.
//!
//! Events are delivered through a single queue in the order they happened;
//! the owner fans them out if more than one consumer needs them.

use std::collections::VecDeque;

use prison_core::event::SessionEvent;
use prison_core::participant::{Participant, ParticipantId};
use prison_core::timing::{Millis, AFTER_ACTION_MS};
use tracing::{debug, info, trace, warn};

use crate::hash::{TokenAlgorithm, TokenStrategy};
use crate::protocol::{split_lines, Inbound, Outbound, OFFENSIVE_ACTION};
use crate::session::Session;

/// Transport lifecycle as seen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// No transport.
    Closed,
    /// `connect` was called; waiting for the owner to open the transport.
    Opening,
    /// Transport is open.
    Open,
}

/// Sans-IO protocol client.
#[derive(Debug)]
pub struct ProtocolClient {
    strategy: Box<dyn TokenStrategy>,
    session: Option<Session>,
    link: Link,
    outbound: VecDeque<Outbound>,
    events: VecDeque<SessionEvent>,
    after_action: VecDeque<Millis>,
    close_requested: bool,
}

impl Default for ProtocolClient {
    fn default() -> Self {
        Self::new(TokenAlgorithm::default())
    }
}

impl ProtocolClient {
    /// Create a client using one of the built-in token algorithms.
    #[must_use]
    pub fn new(algorithm: TokenAlgorithm) -> Self {
        Self::with_strategy(algorithm.strategy())
    }

    /// Create a client with a custom token strategy.
    #[must_use]
    pub fn with_strategy(strategy: Box<dyn TokenStrategy>) -> Self {
        Self {
            strategy,
            session: None,
            link: Link::Closed,
            outbound: VecDeque::new(),
            events: VecDeque::new(),
            after_action: VecDeque::new(),
            close_requested: false,
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Begin a connection attempt with this recovery code.
    ///
    /// Any previous connection is dropped first. The owner must follow up
    /// with [`Self::transport_opened`] or [`Self::transport_failed`].
    pub fn connect(&mut self, recovery_code: impl Into<String>) {
        if self.link != Link::Closed {
            self.disconnect();
        }
        self.session = Some(Session::new(recovery_code));
        self.link = Link::Opening;
        info!(strategy = self.strategy.name(), "connecting");
    }

    /// Quit and drop the connection.
    ///
    /// Returns `false` (and fires nothing) if there was no connection.
    pub fn disconnect(&mut self) -> bool {
        if self.link == Link::Closed {
            return false;
        }
        if self.link == Link::Open {
            self.queue(Outbound::Quit);
            self.close_requested = true;
        }
        self.teardown();
        self.log("Disconnected");
        true
    }

    /// Ask to join a planet. Ignored unless authenticated.
    pub fn join_planet(&mut self, planet: impl Into<String>) -> bool {
        let planet = planet.into();
        let Some(session) = self.session.as_mut().filter(|s| s.is_authenticated()) else {
            debug!(%planet, "join ignored, not authenticated");
            return false;
        };
        session.set_planet(planet.clone());
        self.queue(Outbound::Join { planet });
        true
    }

    /// Send the offensive action. Ignored unless authenticated.
    ///
    /// An [`SessionEvent::AfterAction`] follows [`AFTER_ACTION_MS`] later.
    pub fn prison_user(&mut self, target: &ParticipantId, now: Millis) -> bool {
        if !self.is_authenticated() {
            debug!(%target, "action ignored, not authenticated");
            return false;
        }
        self.queue(Outbound::Prison {
            target: target.to_string(),
        });
        self.after_action.push_back(now + AFTER_ACTION_MS);
        true
    }

    // ========================================================================
    // Transport lifecycle
    // ========================================================================

    /// The owner opened the transport.
    pub fn transport_opened(&mut self) {
        if self.link != Link::Opening {
            warn!(link = ?self.link, "unexpected transport open");
            return;
        }
        self.link = Link::Open;
        self.queue(Outbound::Ident);
        self.events.push_back(SessionEvent::Connected);
        self.log("🔌 Connected");
    }

    /// The transport could not be opened.
    pub fn transport_failed(&mut self, reason: &str) {
        if self.link == Link::Closed {
            return;
        }
        warn!(reason, "transport failed");
        self.teardown();
        self.log(format!("Connection failed: {reason}"));
    }

    /// The transport closed without us asking.
    pub fn transport_closed(&mut self) {
        if self.link == Link::Closed {
            return;
        }
        info!("transport closed by peer");
        self.teardown();
        self.log("Connection closed");
    }

    /// Whether the owner should close the transport after flushing the
    /// outbound queue. Resets on read.
    pub fn take_close_request(&mut self) -> bool {
        std::mem::take(&mut self.close_requested)
    }

    // ========================================================================
    // Inbound
    // ========================================================================

    /// Process received text, which may hold several lines.
    pub fn receive(&mut self, data: &str) {
        for line in split_lines(data) {
            if self.link != Link::Open {
                break;
            }
            match Inbound::parse(line) {
                Some(inbound) => self.handle(inbound),
                None => trace!(line, "dropped unrecognised line"),
            }
        }
    }

    /// Emit due after-action events.
    pub fn poll(&mut self, now: Millis) {
        while self.after_action.front().is_some_and(|&due| due <= now) {
            self.after_action.pop_front();
            self.events.push_back(SessionEvent::AfterAction);
        }
    }

    /// Earliest pending after-action deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Millis> {
        self.after_action.front().copied()
    }

    /// Take the queued outbound lines.
    pub fn drain_outbound(&mut self) -> Vec<Outbound> {
        self.outbound.drain(..).collect()
    }

    /// Take the queued session events.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Whether the server accepted the handshake.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_authenticated)
    }

    /// Whether the transport is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.link == Link::Open
    }

    /// Transport lifecycle state.
    #[must_use]
    pub const fn link(&self) -> Link {
        self.link
    }

    /// Our participant id in the current session.
    #[must_use]
    pub fn self_id(&self) -> Option<&ParticipantId> {
        self.session.as_ref().and_then(Session::self_id)
    }

    /// Current session, if connected or connecting.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn handle(&mut self, inbound: Inbound) {
        debug!(line = inbound.name(), "inbound");
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match inbound {
            Inbound::Ping => self.queue(Outbound::Pong),
            Inbound::Challenge { seed } => {
                let code = session.recovery_code().to_string();
                session.set_token(self.strategy.token(&seed));
                self.queue(Outbound::Recover { code });
            }
            Inbound::Register { id, a, b } => {
                let token = session.token().unwrap_or_default().to_string();
                session.set_self_id(ParticipantId::new(id.clone()));
                self.queue(Outbound::User { id, a, b, token });
            }
            Inbound::AuthOk => {
                session.set_authenticated(true);
                self.events.push_back(SessionEvent::Authenticated);
                self.log("✅ Authenticated");
            }
            Inbound::PlanetJoined => {
                info!(planet = session.planet().unwrap_or("?"), "planet joined");
                self.events.push_back(SessionEvent::PlanetJoined);
            }
            Inbound::Join(entry) => {
                if !session.is_self(&entry.id) {
                    self.events.push_back(SessionEvent::UserJoin(Participant::new(
                        entry.id, entry.nick, entry.clan,
                    )));
                }
            }
            Inbound::Roster(entries) => {
                for entry in entries {
                    if !session.is_self(&entry.id) {
                        self.events.push_back(SessionEvent::UserJoin(Participant::new(
                            entry.id,
                            entry.nick,
                            "",
                        )));
                    }
                }
            }
            Inbound::Part { id } => self.events.push_back(SessionEvent::UserPart(id.into())),
            Inbound::Prisoned { id } => {
                if !session.is_self(&id) {
                    self.events.push_back(SessionEvent::EnemyAction(id.into()));
                }
            }
            Inbound::Action { kind, target } => {
                if kind == OFFENSIVE_ACTION && !session.is_self(&target) {
                    self.events.push_back(SessionEvent::EnemyAction(target.into()));
                }
            }
            Inbound::Fatal { code } => {
                warn!(code, "fatal server code");
                self.log(format!("Server error {code}"));
                self.disconnect();
            }
        }
    }

    fn teardown(&mut self) {
        self.link = Link::Closed;
        self.session = None;
        self.after_action.clear();
        self.events.push_back(SessionEvent::Disconnected);
    }

    fn queue(&mut self, line: Outbound) {
        trace!(line = line.name(), "outbound");
        self.outbound.push_back(line);
    }

    fn log(&mut self, message: impl Into<String>) {
        self.events.push_back(SessionEvent::Log(message.into()));
    }
}

//! Per-connection state.

use prison_core::participant::ParticipantId;

/// State of one connection attempt. A fresh session is built on every
/// `connect` and dropped on disconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    recovery_code: String,
    token: Option<String>,
    self_id: Option<ParticipantId>,
    authenticated: bool,
    planet: Option<String>,
}

impl Session {
    /// Start a session for this recovery code.
    #[must_use]
    pub fn new(recovery_code: impl Into<String>) -> Self {
        Self {
            recovery_code: recovery_code.into(),
            token: None,
            self_id: None,
            authenticated: false,
            planet: None,
        }
    }

    /// Recovery code sent in reply to the challenge.
    #[must_use]
    pub fn recovery_code(&self) -> &str {
        &self.recovery_code
    }

    /// Token derived from the last challenge.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Our participant id, once the server has assigned it.
    #[must_use]
    pub fn self_id(&self) -> Option<&ParticipantId> {
        self.self_id.as_ref()
    }

    /// Whether the server accepted the handshake.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Last planet we asked to join.
    #[must_use]
    pub fn planet(&self) -> Option<&str> {
        self.planet.as_deref()
    }

    /// Whether `id` is us. Always false before registration.
    #[must_use]
    pub fn is_self(&self, id: &str) -> bool {
        self.self_id.as_ref().is_some_and(|own| own == id)
    }

    pub(crate) fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub(crate) fn set_self_id(&mut self, id: ParticipantId) {
        self.self_id = Some(id);
    }

    pub(crate) fn set_authenticated(&mut self, authenticated: bool) {
        self.authenticated = authenticated;
    }

    pub(crate) fn set_planet(&mut self, planet: String) {
        self.planet = Some(planet);
    }
}

//! Engine harness with a manual clock.
//!
//! [`EngineHarness`] drives an [`Engine`] the way the bot worker does, but
//! against a scripted server model instead of a transport:
//!
//! - `Prison` settles with `AfterAction` [`AFTER_ACTION_MS`] later, or is
//!   refused with `action_dropped` while offline
//! - `Disconnect` delivers `Disconnected` immediately
//! - `Connect` delivers `Authenticated` after the model latency
//! - `JoinPlanet` delivers `PlanetJoined` after the model latency
//!
//! Every directive is recorded with its timestamp so tests can assert on the
//! full trace. [`verify_replay`] runs the same script twice and compares
//! traces, which is how pacing determinism under a fixed seed is checked.

use prison_core::engine::{Directive, Engine};
use prison_core::event::SessionEvent;
use prison_core::filters::FilterLists;
use prison_core::participant::{Participant, ParticipantId};
use prison_core::settings::Settings;
use prison_core::timing::{Millis, AFTER_ACTION_MS};

/// Latency of the scripted server for connects and joins.
pub const MODEL_LATENCY_MS: Millis = 50;

/// One scripted collaborator or server action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// `Engine::start`.
    Start,
    /// `Engine::stop`.
    Stop,
    /// A participant joins.
    Join(Participant),
    /// A participant leaves.
    Part(ParticipantId),
    /// Someone acts against a participant.
    Enemy(ParticipantId),
    /// The server drops the connection.
    Drop,
    /// Travel to a planet.
    Travel(String),
}

/// Engine plus manual clock plus scripted server.
#[derive(Debug)]
pub struct EngineHarness {
    /// Engine under test.
    pub engine: Engine,
    now: Millis,
    online: bool,
    scheduled: Vec<(Millis, u64, SessionEvent)>,
    seq: u64,
    trace: Vec<(Millis, Directive)>,
}

impl EngineHarness {
    /// Harness around an idle, offline engine at time 0.
    #[must_use]
    pub fn new(settings: Settings, filters: FilterLists, seed: u64) -> Self {
        Self {
            engine: Engine::with_seed(settings, filters, seed),
            now: 0,
            online: false,
            scheduled: Vec::new(),
            seq: 0,
            trace: Vec::new(),
        }
    }

    /// Harness around an authenticated engine at time 0.
    #[must_use]
    pub fn online(settings: Settings, filters: FilterLists, seed: u64) -> Self {
        let mut harness = Self::new(settings, filters, seed);
        harness.online = true;
        harness.deliver(SessionEvent::Authenticated);
        harness
    }

    /// Current harness time.
    #[must_use]
    pub const fn now(&self) -> Millis {
        self.now
    }

    /// Whether the scripted server considers us authenticated.
    #[must_use]
    pub const fn is_online(&self) -> bool {
        self.online
    }

    /// Every directive so far.
    #[must_use]
    pub fn trace(&self) -> &[(Millis, Directive)] {
        &self.trace
    }

    /// Every offensive action issued so far.
    #[must_use]
    pub fn prisons(&self) -> Vec<(Millis, ParticipantId)> {
        self.trace
            .iter()
            .filter_map(|(at, directive)| match directive {
                Directive::Prison(id) => Some((*at, id.clone())),
                _ => None,
            })
            .collect()
    }

    /// Whether a directive equal to `wanted` was issued.
    #[must_use]
    pub fn saw(&self, wanted: &Directive) -> bool {
        self.trace.iter().any(|(_, directive)| directive == wanted)
    }

    // ========================================================================
    // Driving
    // ========================================================================

    /// Apply one scripted step at the current time.
    pub fn apply(&mut self, step: Step) {
        match step {
            Step::Start => {
                let out = self.engine.start(self.now);
                self.record(out);
            }
            Step::Stop => {
                let out = self.engine.stop();
                self.record(out);
            }
            Step::Join(participant) => self.deliver(SessionEvent::UserJoin(participant)),
            Step::Part(id) => self.deliver(SessionEvent::UserPart(id)),
            Step::Enemy(id) => self.deliver(SessionEvent::EnemyAction(id)),
            Step::Drop => self.server_drop(),
            Step::Travel(planet) => {
                let out = self.engine.travel(planet);
                self.record(out);
            }
        }
    }

    /// Start the engine now.
    pub fn start(&mut self) {
        self.apply(Step::Start);
    }

    /// A participant joins now.
    pub fn join(&mut self, id: &str, nick: &str, clan: &str) {
        self.apply(Step::Join(Participant::new(id, nick, clan)));
    }

    /// A participant leaves now.
    pub fn part(&mut self, id: &str) {
        self.apply(Step::Part(ParticipantId::new(id)));
    }

    /// Someone acts against `id` now.
    pub fn enemy(&mut self, id: &str) {
        self.apply(Step::Enemy(ParticipantId::new(id)));
    }

    /// Feed an event to the engine now.
    pub fn deliver(&mut self, event: SessionEvent) {
        let out = self.engine.handle_event(event, self.now);
        self.record(out);
    }

    /// Deliver an event after `delay`.
    pub fn schedule(&mut self, delay: Millis, event: SessionEvent) {
        self.seq += 1;
        self.scheduled.push((self.now + delay, self.seq, event));
    }

    /// Run the clock forward to `until`, firing everything due on the way.
    pub fn advance_to(&mut self, until: Millis) {
        loop {
            let next_event = self.scheduled.iter().map(|(at, _, _)| *at).min();
            let next = match (next_event, self.engine.next_wakeup()) {
                (Some(a), Some(b)) => a.min(b),
                (a, b) => match a.or(b) {
                    Some(at) => at,
                    None => break,
                },
            };
            if next > until {
                break;
            }
            self.now = self.now.max(next);
            self.fire_scheduled();
            let out = self.engine.poll(self.now);
            self.record(out);
        }
        self.now = self.now.max(until);
    }

    /// Run the clock forward by `ms`.
    pub fn advance(&mut self, ms: Millis) {
        self.advance_to(self.now + ms);
    }

    // ========================================================================
    // Server model
    // ========================================================================

    fn fire_scheduled(&mut self) {
        loop {
            let due = self
                .scheduled
                .iter()
                .enumerate()
                .filter(|(_, (at, _, _))| *at <= self.now)
                .min_by_key(|(_, (at, seq, _))| (*at, *seq))
                .map(|(index, _)| index);
            let Some(index) = due else {
                break;
            };
            let (_, _, event) = self.scheduled.remove(index);
            self.deliver(event);
        }
    }

    fn server_drop(&mut self) {
        self.online = false;
        self.scheduled.clear();
        self.deliver(SessionEvent::Disconnected);
    }

    fn record(&mut self, out: Vec<Directive>) {
        let mut dropped = false;
        for directive in out {
            match &directive {
                Directive::Prison(_) => {
                    if self.online {
                        self.schedule(AFTER_ACTION_MS, SessionEvent::AfterAction);
                    } else {
                        dropped = true;
                    }
                }
                Directive::Disconnect => {
                    self.online = false;
                    self.scheduled.clear();
                    self.schedule(0, SessionEvent::Disconnected);
                }
                Directive::Connect => {
                    self.online = true;
                    self.schedule(MODEL_LATENCY_MS, SessionEvent::Authenticated);
                }
                Directive::JoinPlanet(_) => {
                    if self.online {
                        self.schedule(MODEL_LATENCY_MS, SessionEvent::PlanetJoined);
                    }
                }
                Directive::Armed(_) | Directive::Log(_) => {}
            }
            self.trace.push((self.now, directive));
        }
        if dropped {
            let out = self.engine.action_dropped();
            self.record(out);
        }
    }
}

/// Run a timed script twice from the same seed and report whether both
/// runs issued identical directive traces.
///
/// Each script entry is `(delay before the step, step)`. The clock runs on
/// for `tail` after the last step.
pub fn verify_replay(
    settings: &Settings,
    filters: &FilterLists,
    seed: u64,
    script: &[(Millis, Step)],
    tail: Millis,
) -> bool {
    let run = || {
        let mut harness = EngineHarness::online(settings.clone(), filters.clone(), seed);
        for (delay, step) in script {
            harness.advance(*delay);
            harness.apply(step.clone());
        }
        harness.advance(tail);
        harness.trace
    };
    run() == run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::steady_settings;

    #[test]
    fn test_harness_settles_prisons() {
        let mut harness = EngineHarness::online(steady_settings(), FilterLists::default(), 3);
        harness.start();
        harness.join("7", "Bob", "");
        harness.advance(20_000);

        let prisons = harness.prisons();
        assert!(prisons.len() >= 2);
        for pair in prisons.windows(2) {
            assert!(pair[1].0 >= pair[0].0 + AFTER_ACTION_MS + 5000);
        }
    }

    #[test]
    fn test_server_drop_halts_engine() {
        let mut harness = EngineHarness::online(steady_settings(), FilterLists::default(), 3);
        harness.start();
        harness.apply(Step::Drop);
        assert!(harness.saw(&Directive::Armed(false)));
        assert!(!harness.engine.is_armed());
    }

    #[test]
    fn test_replay_is_deterministic() {
        let script = vec![
            (0, Step::Start),
            (10, Step::Join(Participant::new("7", "Bob", ""))),
            (4000, Step::Join(Participant::new("8", "Eve", ""))),
            (9000, Step::Enemy(ParticipantId::new("8"))),
        ];
        assert!(verify_replay(
            &steady_settings(),
            &FilterLists::default(),
            99,
            &script,
            30_000
        ));
    }
}

//! Bot state machine, action loop and reconnect cycle.
//!
//! The engine is sans-IO. The owner feeds it session events and the current
//! time, calls [`Engine::poll`] whenever [`Engine::next_wakeup`] comes due,
//! and executes the returned [`Directive`]s against the protocol client.
//!
//! ```text
//! Idle ──start──▶ ActiveWaiting ──arm──▶ Acting ──after_action──▶ ActiveWaiting
//!   ▲                  │                    │
//!   │                  └──── reconnect ─────┴──▶ Reconnecting ──▶ ActiveWaiting
//!   └──────────────── disconnected / stop (from any state) ──────────────┘
//! ```
//!
//! Exactly one action timer (attack, defense or reconnect) can be armed at a
//! time. Every transition that abandons a timer bumps the cycle id, and a
//! timer only fires if it was armed in the current cycle.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::enemy::EnemyTracker;
use crate::event::SessionEvent;
use crate::filters::FilterLists;
use crate::pacing::{cooldown_deadline, Pacing};
use crate::participant::{Participant, ParticipantId};
use crate::roster::Roster;
use crate::settings::Settings;
use crate::targets::TargetQueue;
use crate::timing::{
    Millis, ARMED_RETRY_MS, EMPTY_QUEUE_RETRY_MS, GUARD_RETRY_MS, JOIN_GRACE_MS,
    RECONNECT_CYCLE_MS,
};

/// Priority given to participants picked up by the filters.
pub const DEFAULT_PRIORITY: u32 = 1;

/// Bot lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotState {
    /// Not armed. Waits for `start`.
    Idle,
    /// Armed, looking for an opportunity to act.
    ActiveWaiting,
    /// An attack or defense is armed or awaiting settlement.
    Acting,
    /// Between the disconnect and reconnect of a reconnect cycle.
    Reconnecting,
}

/// What an armed timer will do when it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerKind {
    /// Offensive action against a queued target.
    Attack(ParticipantId),
    /// Counter-action against an enemy.
    Defense(ParticipantId),
    /// End of a reconnect cycle.
    Reconnect,
}

impl TimerKind {
    fn aims_at(&self, id: &ParticipantId) -> bool {
        match self {
            Self::Attack(target) | Self::Defense(target) => target == id,
            Self::Reconnect => false,
        }
    }
}

#[derive(Debug, Clone)]
struct ArmedTimer {
    kind: TimerKind,
    due: Millis,
    cycle: u64,
}

/// Instruction for the owner of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Send the offensive action against this participant.
    Prison(ParticipantId),
    /// Drop the connection.
    Disconnect,
    /// Open a fresh connection with the last recovery code.
    Connect,
    /// Join this planet.
    JoinPlanet(String),
    /// The bot-armed status flag changed.
    Armed(bool),
    /// Line for the collaborator's log console.
    Log(String),
}

/// The decision engine.
#[derive(Debug)]
pub struct Engine {
    settings: Settings,
    filters: FilterLists,
    staged_settings: Option<Settings>,
    staged_filters: Option<FilterLists>,

    state: BotState,
    in_flight: bool,
    authenticated: bool,
    join_ready_at: Millis,
    cooldown_until: Millis,
    next_tick_at: Option<Millis>,
    timer: Option<ArmedTimer>,
    cycle: u64,

    roster: Roster,
    targets: TargetQueue,
    enemies: EnemyTracker,
    pacing: Pacing,

    planet: Option<String>,
    rejoin_pending: bool,

    rng: SmallRng,
    out: Vec<Directive>,
}

impl Engine {
    /// Create an idle engine with entropy-seeded pacing.
    #[must_use]
    pub fn new(settings: Settings, filters: FilterLists) -> Self {
        Self::with_rng(settings, filters, SmallRng::from_entropy())
    }

    /// Create an idle engine with reproducible pacing.
    #[must_use]
    pub fn with_seed(settings: Settings, filters: FilterLists, seed: u64) -> Self {
        Self::with_rng(settings, filters, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(settings: Settings, filters: FilterLists, rng: SmallRng) -> Self {
        Self {
            settings,
            filters,
            staged_settings: None,
            staged_filters: None,
            state: BotState::Idle,
            in_flight: false,
            authenticated: false,
            join_ready_at: 0,
            cooldown_until: 0,
            next_tick_at: None,
            timer: None,
            cycle: 0,
            roster: Roster::new(),
            targets: TargetQueue::new(),
            enemies: EnemyTracker::new(),
            pacing: Pacing::new(),
            planet: None,
            rejoin_pending: false,
            rng,
            out: Vec::new(),
        }
    }

    // ========================================================================
    // Collaborator surface
    // ========================================================================

    /// Arm the bot. Does nothing if it is already armed.
    pub fn start(&mut self, now: Millis) -> Vec<Directive> {
        if self.state != BotState::Idle {
            return self.drain();
        }

        self.apply_staged(now);
        self.invalidate();
        self.state = BotState::ActiveWaiting;
        self.join_ready_at = now.saturating_add(JOIN_GRACE_MS);
        self.next_tick_at = Some(now);
        self.reevaluate_targets(now);

        info!(cycle = self.cycle, "bot armed");
        self.out.push(Directive::Armed(true));
        self.log("⚡ Bot armed");
        self.drain()
    }

    /// Disarm the bot and cancel anything pending.
    pub fn stop(&mut self) -> Vec<Directive> {
        if self.state != BotState::Idle {
            self.go_idle();
            self.log("Bot stopped");
        }
        self.drain()
    }

    /// Replace the settings. While armed, applied at the first loop tick
    /// with no action in flight.
    pub fn update_settings(&mut self, settings: Settings) {
        if self.state == BotState::Idle {
            self.settings = settings;
            self.staged_settings = None;
        } else {
            self.staged_settings = Some(settings);
        }
    }

    /// Replace the filter lists. Staged like [`Engine::update_settings`].
    pub fn update_filters(&mut self, filters: FilterLists) {
        if self.state == BotState::Idle {
            self.filters = filters;
            self.staged_filters = None;
        } else {
            self.staged_filters = Some(filters);
        }
    }

    /// Filter decision for a participant under the current settings.
    #[must_use]
    pub fn should_target_user(&self, nick: &str, clan: &str) -> bool {
        self.filters.should_target(self.settings.prison_all, nick, clan)
    }

    /// Queue a target, or bump it if already queued.
    pub fn add_target(&mut self, id: ParticipantId, priority: u32, now: Millis) {
        self.targets.add(id, priority, now);
    }

    /// Stop targeting a participant, cancelling an action aimed at it.
    pub fn remove_target(&mut self, id: &ParticipantId) {
        if self.targets.remove(id).is_some() {
            self.cancel_action_on(id);
        }
    }

    /// Target at the current rotation offset.
    #[must_use]
    pub fn current_target(&self) -> Option<&ParticipantId> {
        self.targets.current()
    }

    /// Ranked target ids.
    #[must_use]
    pub fn targets(&self) -> &[ParticipantId] {
        self.targets.ids()
    }

    /// Remember a planet and join it now, or after the next authentication.
    ///
    /// A new planet scopes a new roster, so known participants and targets
    /// are dropped.
    pub fn travel(&mut self, planet: impl Into<String>) -> Vec<Directive> {
        let planet = planet.into();
        self.roster.clear();
        self.targets.clear();
        self.enemies.clear();
        self.cancel_action();

        if self.authenticated {
            self.out.push(Directive::JoinPlanet(planet.clone()));
            self.rejoin_pending = false;
        } else {
            self.rejoin_pending = true;
        }
        self.log(format!("🚀 Travelling to {planet}"));
        self.planet = Some(planet);
        self.drain()
    }

    // ========================================================================
    // Driving
    // ========================================================================

    /// Feed one session event.
    pub fn handle_event(&mut self, event: SessionEvent, now: Millis) -> Vec<Directive> {
        debug!(event = event.name(), state = ?self.state, "session event");
        match event {
            SessionEvent::Connected => {}
            SessionEvent::Disconnected => self.on_disconnected(),
            SessionEvent::Authenticated => self.on_authenticated(),
            SessionEvent::PlanetJoined => self.on_planet_joined(now),
            SessionEvent::UserJoin(participant) => self.on_user_join(participant, now),
            SessionEvent::UserPart(id) => self.on_user_part(&id, now),
            SessionEvent::EnemyAction(id) => self.on_enemy_action(id, now),
            SessionEvent::AfterAction => self.on_after_action(now),
            SessionEvent::Log(_) => {}
        }
        self.drain()
    }

    /// Fire a due timer and run the loop tick if it is due.
    pub fn poll(&mut self, now: Millis) -> Vec<Directive> {
        if self.timer.as_ref().is_some_and(|timer| timer.due <= now) {
            if let Some(timer) = self.timer.take() {
                self.fire(timer, now);
            }
        }
        if self.next_tick_at.is_some_and(|at| at <= now) {
            self.tick(now);
        }
        self.drain()
    }

    /// Earliest time at which [`Engine::poll`] has work to do.
    #[must_use]
    pub fn next_wakeup(&self) -> Option<Millis> {
        let timer = self.timer.as_ref().map(|timer| timer.due);
        match (timer, self.next_tick_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// The client refused the action the engine asked for.
    pub fn action_dropped(&mut self) -> Vec<Directive> {
        if self.in_flight {
            self.release();
            self.log("Action dropped, session not ready");
        }
        self.drain()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> BotState {
        self.state
    }

    /// Whether the bot is armed (any state but Idle).
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.state != BotState::Idle
    }

    /// Whether an action is armed or awaiting settlement.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Armed timer and its deadline.
    #[must_use]
    pub fn pending_timer(&self) -> Option<(&TimerKind, Millis)> {
        self.timer.as_ref().map(|timer| (&timer.kind, timer.due))
    }

    /// Current cycle id.
    #[must_use]
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// No action may start before this time.
    #[must_use]
    pub const fn cooldown_until(&self) -> Millis {
        self.cooldown_until
    }

    /// No action may start before this time.
    #[must_use]
    pub const fn join_ready_at(&self) -> Millis {
        self.join_ready_at
    }

    /// Current aggression multiplier.
    #[must_use]
    pub const fn aggression(&self) -> f64 {
        self.pacing.aggression()
    }

    /// Whether the session is authenticated, as last reported.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Last requested planet.
    #[must_use]
    pub fn planet(&self) -> Option<&str> {
        self.planet.as_deref()
    }

    /// Active settings.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Active filter lists.
    #[must_use]
    pub const fn filters(&self) -> &FilterLists {
        &self.filters
    }

    /// Participants on the planet.
    #[must_use]
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Ranked target queue.
    #[must_use]
    pub const fn target_queue(&self) -> &TargetQueue {
        &self.targets
    }

    /// Enemy profiles.
    #[must_use]
    pub const fn enemies(&self) -> &EnemyTracker {
        &self.enemies
    }

    // ========================================================================
    // Event handlers
    // ========================================================================

    fn on_disconnected(&mut self) {
        self.authenticated = false;
        self.roster.clear();
        self.targets.clear();

        match self.state {
            BotState::Reconnecting | BotState::Idle => {}
            BotState::ActiveWaiting | BotState::Acting => {
                self.go_idle();
                self.log("Connection lost, bot halted");
            }
        }
    }

    fn on_authenticated(&mut self) {
        self.authenticated = true;
        if !(self.rejoin_pending || self.settings.re_fly_join) {
            return;
        }
        if let Some(planet) = self.planet.clone() {
            self.rejoin_pending = false;
            self.log(format!("🌍 Re-joining {planet}"));
            self.out.push(Directive::JoinPlanet(planet));
        }
    }

    fn on_planet_joined(&mut self, now: Millis) {
        if self.settings.timeout_3sec {
            self.join_ready_at = self.join_ready_at.max(now.saturating_add(JOIN_GRACE_MS));
        }
        match &self.planet {
            Some(planet) => self.log(format!("🌍 Joined planet: {planet}")),
            None => self.log("🌍 Joined planet"),
        }
    }

    fn on_user_join(&mut self, participant: Participant, now: Millis) {
        let wanted =
            self.is_armed() && self.should_target_user(&participant.nick, &participant.clan);
        let id = participant.id.clone();
        let nick = participant.nick.clone();
        self.roster.insert(participant, now);

        if wanted {
            self.targets.add(id, DEFAULT_PRIORITY, now);
            self.log(format!("🎯 Target acquired: {nick}"));
        }
    }

    fn on_user_part(&mut self, id: &ParticipantId, now: Millis) {
        self.roster.remove(id);
        if self.targets.remove(id).is_none() {
            return;
        }
        self.cancel_action_on(id);
        debug!(%id, remaining = self.targets.len(), "target left");

        if self.settings.user_part
            && self.targets.is_empty()
            && self.state == BotState::ActiveWaiting
            && !self.in_flight
        {
            self.log("Last target left the planet");
            self.launch_reconnect(now);
        }
    }

    fn on_enemy_action(&mut self, id: ParticipantId, now: Millis) {
        let profile = self.enemies.record_hit(&id, now);
        if !self.is_armed() {
            debug!(%id, hits = profile.hits, "enemy recorded while idle");
            return;
        }
        self.targets.add(id.clone(), profile.priority(), now);
        self.log(format!(
            "⚔️ Enemy {id}: hits {}, danger {}",
            profile.hits, profile.danger
        ));

        if self.settings.stand_on_enemy && self.can_act(now) {
            self.start_defense(id, now);
        }
    }

    fn on_after_action(&mut self, now: Millis) {
        if !self.in_flight {
            debug!(state = ?self.state, "settlement without action in flight ignored");
            return;
        }

        self.timer = None;
        self.in_flight = false;
        let aggression = self.pacing.settle(now);
        self.cooldown_until = cooldown_deadline(now, &mut self.rng);
        self.targets.rotate();
        self.state = BotState::ActiveWaiting;
        debug!(
            aggression,
            cooldown_until = self.cooldown_until,
            "action settled"
        );

        if self.settings.prison_and_off {
            self.log("Action landed, going offline");
            self.out.push(Directive::Disconnect);
            self.go_idle();
        } else if self.settings.disconnect_action {
            self.launch_reconnect(now);
        }
    }

    // ========================================================================
    // Loop
    // ========================================================================

    fn tick(&mut self, now: Millis) {
        if !self.in_flight {
            self.apply_staged(now);
        }

        if !matches!(self.state, BotState::ActiveWaiting | BotState::Acting) {
            self.next_tick_at = None;
            return;
        }
        if !self.can_act(now) {
            self.next_tick_at = Some(now.saturating_add(GUARD_RETRY_MS));
            return;
        }

        match self.targets.current().cloned() {
            None => self.next_tick_at = Some(now.saturating_add(EMPTY_QUEUE_RETRY_MS)),
            Some(target) => {
                self.start_attack(target, now);
                self.next_tick_at = Some(now.saturating_add(ARMED_RETRY_MS));
            }
        }
    }

    fn can_act(&self, now: Millis) -> bool {
        self.state == BotState::ActiveWaiting
            && !self.in_flight
            && now >= self.join_ready_at
            && now >= self.cooldown_until
            && self.authenticated
    }

    fn start_attack(&mut self, target: ParticipantId, now: Millis) {
        if !self.can_act(now) {
            return;
        }
        let delay = self
            .pacing
            .attack_delay(&self.settings.attack_bounds(), &mut self.rng);
        debug!(%target, delay, "attack armed");
        self.in_flight = true;
        self.state = BotState::Acting;
        self.arm(TimerKind::Attack(target), now.saturating_add(delay));
    }

    fn start_defense(&mut self, enemy: ParticipantId, now: Millis) {
        if !self.can_act(now) {
            return;
        }
        let delay = self
            .settings
            .defense_bounds()
            .sample(&mut self.rng)
            .round() as Millis;
        debug!(%enemy, delay, "defense armed");
        self.in_flight = true;
        self.state = BotState::Acting;
        self.arm(TimerKind::Defense(enemy), now.saturating_add(delay));
    }

    fn fire(&mut self, timer: ArmedTimer, now: Millis) {
        if timer.cycle != self.cycle {
            debug!(
                timer_cycle = timer.cycle,
                cycle = self.cycle,
                "stale timer dropped"
            );
            return;
        }

        match timer.kind {
            TimerKind::Attack(target) => {
                if self.targets.contains(&target) {
                    self.log(format!("🔒 Prison → {target}"));
                    self.out.push(Directive::Prison(target));
                } else {
                    self.release();
                    debug!(%target, "target gone before attack fired");
                }
            }
            TimerKind::Defense(enemy) => {
                self.log(format!("🛡️ Counter prison → {enemy}"));
                self.out.push(Directive::Prison(enemy));
            }
            TimerKind::Reconnect => {
                self.state = BotState::ActiveWaiting;
                self.join_ready_at = now.saturating_add(JOIN_GRACE_MS);
                self.next_tick_at = Some(now);
                self.log("🔄 Reconnecting");
                self.out.push(Directive::Connect);
            }
        }
    }

    fn launch_reconnect(&mut self, now: Millis) {
        if !self.settings.reconnect {
            self.out.push(Directive::Disconnect);
            self.go_idle();
            self.log("Disconnected, auto-reconnect is off");
            return;
        }

        self.invalidate();
        self.state = BotState::Reconnecting;
        self.next_tick_at = None;
        self.rejoin_pending = true;
        self.out.push(Directive::Disconnect);
        self.arm(TimerKind::Reconnect, now.saturating_add(RECONNECT_CYCLE_MS));
        info!(cycle = self.cycle, "reconnect cycle started");
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn arm(&mut self, kind: TimerKind, due: Millis) {
        self.timer = Some(ArmedTimer {
            kind,
            due,
            cycle: self.cycle,
        });
    }

    // Abandon the current cycle: no timer armed before this call can fire.
    fn invalidate(&mut self) {
        self.cycle += 1;
        self.timer = None;
        self.in_flight = false;
    }

    fn go_idle(&mut self) {
        self.invalidate();
        self.next_tick_at = None;
        if self.state != BotState::Idle {
            self.state = BotState::Idle;
            info!(cycle = self.cycle, "bot idle");
            self.out.push(Directive::Armed(false));
        }
    }

    // Return from Acting to ActiveWaiting without settling.
    fn release(&mut self) {
        self.in_flight = false;
        if matches!(
            self.timer.as_ref().map(|timer| &timer.kind),
            Some(TimerKind::Attack(_) | TimerKind::Defense(_))
        ) {
            self.timer = None;
        }
        if self.state == BotState::Acting {
            self.state = BotState::ActiveWaiting;
        }
    }

    fn cancel_action(&mut self) {
        if self.in_flight {
            self.release();
        }
    }

    fn cancel_action_on(&mut self, id: &ParticipantId) {
        if self
            .timer
            .as_ref()
            .is_some_and(|timer| timer.kind.aims_at(id))
        {
            self.release();
        }
    }

    fn apply_staged(&mut self, now: Millis) {
        let mut changed = false;
        if let Some(settings) = self.staged_settings.take() {
            self.settings = settings;
            changed = true;
        }
        if let Some(filters) = self.staged_filters.take() {
            self.filters = filters;
            changed = true;
        }
        if changed && self.is_armed() {
            self.reevaluate_targets(now);
        }
    }

    // Bring the queue in line with the filters for everyone on the roster.
    // Active enemies stay queued whatever the filters say.
    fn reevaluate_targets(&mut self, now: Millis) {
        let mut present: Vec<&Participant> = self.roster.iter().collect();
        present.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.id.cmp(&b.id)));

        let mut add = Vec::new();
        let mut stale = Vec::new();
        for participant in present {
            let wanted = self.should_target_user(&participant.nick, &participant.clan);
            let tracked = self.targets.contains(&participant.id);
            if wanted && !tracked {
                add.push((participant.id.clone(), participant.nick.clone()));
            } else if !wanted && tracked && !self.enemies.is_hostile(&participant.id, now) {
                stale.push(participant.id.clone());
            }
        }

        for (id, nick) in add {
            self.targets.add(id, DEFAULT_PRIORITY, now);
            self.log(format!("🎯 Target acquired: {nick}"));
        }
        for id in stale {
            self.remove_target(&id);
        }
    }

    fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!(target: "prison_core::log", "{message}");
        self.out.push(Directive::Log(message));
    }

    fn drain(&mut self) -> Vec<Directive> {
        std::mem::take(&mut self.out)
    }
}

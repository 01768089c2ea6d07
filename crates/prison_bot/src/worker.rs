//! Single-task worker that owns the engine, the protocol client and the
//! transport.
//!
//! # Loop
//!
//! Each iteration waits on whichever comes first:
//! - a collaborator command
//! - text from the transport
//! - the earliest deadline of the engine, the client or the idle reconnect
//!
//! and then pumps until quiescent: client events go to the engine and the
//! collaborator, engine directives are executed, outbound lines are flushed.
//! Nothing else touches engine or client state, so every event is handled
//! to completion before the next one.
//!
//! # Reconnects
//!
//! The engine runs its own fast reconnect cycle after settled actions. The
//! worker adds the slow idle reconnect: when the connection drops without
//! anyone asking and `timer_reconnect` is positive, it reconnects after that
//! delay, travels back to the last planet and re-arms if the bot was armed.

use std::collections::VecDeque;
use std::future::pending;
use std::time::Duration;

use prison_client::client::Link;
use prison_client::error::TransportError;
use prison_client::transport::{Connector, Transport};
use prison_client::ProtocolClient;
use prison_core::engine::{BotState, Directive, Engine};
use prison_core::event::SessionEvent;
use prison_core::timing::Millis;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::BotConfig;
use crate::handle::{BotUpdate, TargetEntry, TargetReport, UiCommand};

/// Pending idle reconnect.
#[derive(Debug, Clone, Copy)]
struct IdleReconnect {
    at: Millis,
    rearm: bool,
}

enum Wake {
    Command(Option<UiCommand>),
    Received(Option<Result<String, TransportError>>),
    Deadline,
}

/// The bot worker. Build with [`Worker::new`], drive with [`Worker::run`].
pub struct Worker<C: Connector> {
    connector: C,
    endpoint: String,
    client: ProtocolClient,
    engine: Engine,
    transport: Option<C::Transport>,
    commands: UnboundedReceiver<UiCommand>,
    updates: UnboundedSender<BotUpdate>,
    epoch: Instant,
    recovery_code: Option<String>,
    idle_reconnect: Option<IdleReconnect>,
    deliberate_disconnect: bool,
    pending: VecDeque<Directive>,
}

impl<C: Connector> Worker<C> {
    /// Create a worker from a configuration. The configured planet, login
    /// and auto start are queued and run when [`Worker::run`] starts.
    pub fn new(
        config: BotConfig,
        connector: C,
        commands: UnboundedReceiver<UiCommand>,
        updates: UnboundedSender<BotUpdate>,
    ) -> Self {
        let filters = config.filters.to_lists();
        let mut worker = Self {
            connector,
            endpoint: config.endpoint,
            client: ProtocolClient::new(config.token),
            engine: Engine::new(config.settings, filters),
            transport: None,
            commands,
            updates,
            epoch: Instant::now(),
            recovery_code: config.recovery_code,
            idle_reconnect: None,
            deliberate_disconnect: false,
            pending: VecDeque::new(),
        };

        if let Some(planet) = config.planet {
            let directives = worker.engine.travel(planet);
            worker.pending.extend(directives);
        }
        if worker.recovery_code.is_some() {
            worker.pending.push_back(Directive::Connect);
        }
        if config.auto_start {
            let directives = worker.engine.start(0);
            worker.pending.extend(directives);
        }
        worker
    }

    /// Run until shut down or every handle is dropped.
    pub async fn run(mut self) {
        info!(endpoint = %self.endpoint, "worker started");
        self.pump().await;

        loop {
            let deadline = self
                .next_deadline()
                .and_then(|at| self.epoch.checked_add(Duration::from_millis(at)));
            let wake = tokio::select! {
                command = self.commands.recv() => Wake::Command(command),
                received = recv_from(self.transport.as_mut()) => Wake::Received(received),
                () = sleep_until(deadline) => Wake::Deadline,
            };

            match wake {
                Wake::Command(Some(UiCommand::Shutdown) | None) => break,
                Wake::Command(Some(command)) => self.handle_command(command).await,
                Wake::Received(Some(Ok(text))) => self.client.receive(&text),
                Wake::Received(Some(Err(e))) => {
                    warn!(error = %e, "transport error");
                    self.transport = None;
                    self.client.transport_closed();
                }
                Wake::Received(None) => {
                    self.transport = None;
                    self.client.transport_closed();
                }
                Wake::Deadline => {}
            }
            self.pump().await;
        }

        self.shutdown().await;
        info!("worker stopped");
    }

    fn now(&self) -> Millis {
        Millis::try_from(self.epoch.elapsed().as_millis()).unwrap_or(Millis::MAX)
    }

    fn next_deadline(&self) -> Option<Millis> {
        [
            self.engine.next_wakeup(),
            self.client.next_deadline(),
            self.idle_reconnect.map(|idle| idle.at),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    // ========================================================================
    // Commands
    // ========================================================================

    async fn handle_command(&mut self, command: UiCommand) {
        let now = self.now();
        debug!(?command, "command");
        match command {
            UiCommand::Connect(code) => {
                self.recovery_code = Some(code);
                self.begin_connect().await;
            }
            UiCommand::Disconnect => {
                self.idle_reconnect = None;
                self.disconnect_client();
            }
            UiCommand::Start => {
                let directives = self.engine.start(now);
                self.pending.extend(directives);
            }
            UiCommand::Stop => {
                self.idle_reconnect = None;
                let directives = self.engine.stop();
                self.pending.extend(directives);
            }
            UiCommand::JoinPlanet(planet) => {
                let directives = self.engine.travel(planet);
                self.pending.extend(directives);
            }
            UiCommand::UpdateSettings(settings) => self.engine.update_settings(settings),
            UiCommand::UpdateFilters(filters) => self.engine.update_filters(filters),
            UiCommand::Targets(reply) => {
                if reply.send(self.report(now)).is_err() {
                    debug!("target report requester went away");
                }
            }
            UiCommand::Shutdown => {}
        }
    }

    fn report(&self, now: Millis) -> TargetReport {
        let roster = self.engine.roster();
        TargetReport {
            state: self.engine.state(),
            connected: self.client.is_connected(),
            current: self.engine.current_target().cloned(),
            targets: self
                .engine
                .target_queue()
                .iter()
                .map(|(id, meta)| TargetEntry {
                    id: id.clone(),
                    nick: roster.get(id).map(|p| p.nick.clone()),
                    priority: meta.priority,
                    last_seen: meta.last_seen,
                })
                .collect(),
            hostiles: self.engine.enemies().hostiles(now),
            aggression: self.engine.aggression(),
        }
    }

    async fn shutdown(&mut self) {
        self.idle_reconnect = None;
        let directives = self.engine.stop();
        self.pending.extend(directives);
        self.disconnect_client();
        self.pump().await;
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                debug!(error = %e, "close on shutdown");
            }
        }
    }

    // ========================================================================
    // Pump
    // ========================================================================

    async fn pump(&mut self) {
        loop {
            self.flush().await;
            let now = self.now();
            self.client.poll(now);

            let events = self.client.drain_events();
            let mut busy = !events.is_empty();
            for event in events {
                self.dispatch(event, now);
            }

            if self.idle_reconnect.is_some_and(|idle| idle.at <= now) {
                if let Some(idle) = self.idle_reconnect.take() {
                    self.idle_reconnect_due(idle, now);
                }
            }

            let directives = self.engine.poll(now);
            self.pending.extend(directives);

            busy |= !self.pending.is_empty();
            if !busy {
                break;
            }
            while let Some(directive) = self.pending.pop_front() {
                self.execute(directive, now).await;
            }
        }
    }

    fn dispatch(&mut self, event: SessionEvent, now: Millis) {
        match &event {
            SessionEvent::Connected => self.publish(BotUpdate::Connected(true)),
            SessionEvent::Disconnected => {
                self.publish(BotUpdate::Connected(false));
                self.schedule_idle_reconnect(now);
            }
            SessionEvent::Log(line) => self.publish(BotUpdate::Log(line.clone())),
            _ => {}
        }
        let directives = self.engine.handle_event(event, now);
        self.pending.extend(directives);
    }

    // Must run before the engine sees the disconnect, which disarms it.
    fn schedule_idle_reconnect(&mut self, now: Millis) {
        if std::mem::take(&mut self.deliberate_disconnect) {
            return;
        }
        if self.engine.state() == BotState::Reconnecting {
            return;
        }
        let settings = self.engine.settings();
        let delay = settings.idle_reconnect_delay();
        if !settings.reconnect || delay == 0 || self.recovery_code.is_none() {
            return;
        }
        let rearm = self.engine.is_armed();
        info!(delay, rearm, "idle reconnect scheduled");
        self.publish(BotUpdate::Log(format!("🔁 Reconnecting in {delay} ms")));
        self.idle_reconnect = Some(IdleReconnect {
            at: now.saturating_add(delay),
            rearm,
        });
    }

    fn idle_reconnect_due(&mut self, idle: IdleReconnect, now: Millis) {
        info!(rearm = idle.rearm, "idle reconnect");
        if let Some(planet) = self.engine.planet().map(str::to_string) {
            let directives = self.engine.travel(planet);
            self.pending.extend(directives);
        }
        self.pending.push_back(Directive::Connect);
        if idle.rearm {
            let directives = self.engine.start(now);
            self.pending.extend(directives);
        }
    }

    async fn execute(&mut self, directive: Directive, now: Millis) {
        match directive {
            Directive::Prison(target) => {
                if !self.client.prison_user(&target, now) {
                    let directives = self.engine.action_dropped();
                    self.pending.extend(directives);
                }
            }
            Directive::Disconnect => self.disconnect_client(),
            Directive::Connect => self.begin_connect().await,
            Directive::JoinPlanet(planet) => {
                if !self.client.join_planet(planet) {
                    debug!("planet join deferred to next authentication");
                }
            }
            Directive::Armed(armed) => self.publish(BotUpdate::Armed(armed)),
            Directive::Log(line) => self.publish(BotUpdate::Log(line)),
        }
    }

    // ========================================================================
    // Transport
    // ========================================================================

    fn disconnect_client(&mut self) {
        if self.client.disconnect() {
            self.deliberate_disconnect = true;
        }
    }

    async fn begin_connect(&mut self) {
        let Some(code) = self.recovery_code.clone() else {
            warn!("connect requested without a recovery code");
            self.publish(BotUpdate::Log("No recovery code to connect with".to_string()));
            return;
        };

        self.idle_reconnect = None;
        if self.client.link() != Link::Closed {
            self.deliberate_disconnect = true;
        }
        self.client.connect(code);
        // Sends the QUIT of a replaced connection.
        self.flush().await;
        if let Some(mut old) = self.transport.take() {
            if let Err(e) = old.close().await {
                debug!(error = %e, "closing replaced transport");
            }
        }

        match self.connector.connect(&self.endpoint).await {
            Ok(transport) => {
                self.transport = Some(transport);
                self.client.transport_opened();
            }
            Err(e) => {
                warn!(error = %e, "connect failed");
                self.client.transport_failed(&e.to_string());
            }
        }
    }

    async fn flush(&mut self) {
        let lines = self.client.drain_outbound();
        let mut failed = false;
        if let Some(transport) = self.transport.as_mut() {
            for line in lines {
                if let Err(e) = transport.send_line(line.to_wire()).await {
                    warn!(error = %e, line = line.name(), "send failed");
                    failed = true;
                    break;
                }
            }
        } else if !lines.is_empty() {
            debug!(count = lines.len(), "outbound dropped, no transport");
        }

        if failed {
            self.transport = None;
            self.client.transport_closed();
        }
        if self.client.take_close_request() {
            if let Some(mut transport) = self.transport.take() {
                if let Err(e) = transport.close().await {
                    debug!(error = %e, "close after quit");
                }
            }
        }
    }

    fn publish(&self, update: BotUpdate) {
        if self.updates.send(update).is_err() {
            debug!("update receiver dropped");
        }
    }
}

async fn recv_from<T: Transport>(
    transport: Option<&mut T>,
) -> Option<Result<String, TransportError>> {
    match transport {
        Some(transport) => transport.recv().await,
        None => pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => pending().await,
    }
}

//! Worker tests against the in-memory server, on paused time.

use std::time::Duration;

use prison_bot::config::BotConfig;
use prison_bot::handle::BotUpdate;
use prison_client::DEFAULT_ENDPOINT;
use prison_core::engine::BotState;
use prison_core::settings::Settings;
use prison_test_utils::fixtures::{pid, steady_settings};
use prison_test_utils::memory::{MemoryConnector, MemoryPeer, MemoryServer};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{timeout, Instant};

const PATIENCE: Duration = Duration::from_secs(120);

fn config(settings: Settings) -> BotConfig {
    BotConfig {
        recovery_code: Some("123456".to_string()),
        planet: Some("mars".to_string()),
        auto_start: true,
        settings,
        ..BotConfig::default()
    }
}

async fn accept(server: &mut MemoryServer) -> MemoryPeer {
    timeout(PATIENCE, server.accept())
        .await
        .expect("no connection attempt")
        .expect("connector dropped")
}

async fn line(peer: &mut MemoryPeer, prefix: &str) -> String {
    timeout(PATIENCE, peer.expect_prefix(prefix))
        .await
        .unwrap_or_else(|_| panic!("no {prefix} line"))
        .unwrap_or_else(|| panic!("closed before {prefix} line"))
}

async fn wait_for(updates: &mut UnboundedReceiver<BotUpdate>, wanted: &BotUpdate) -> bool {
    timeout(PATIENCE, async {
        while let Some(update) = updates.recv().await {
            if &update == wanted {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false)
}

/// Handshake, then confirm the planet join.
async fn log_in(peer: &mut MemoryPeer) {
    assert!(peer.handshake("abc", "42").await);
    assert_eq!(line(peer, "JOIN").await, "JOIN mars");
    assert!(peer.send_line("900"));
}

#[tokio::test(start_paused = true)]
async fn test_handshake_join_and_attack() {
    let (connector, mut server) = MemoryConnector::new();
    let (handle, mut updates, _task) = prison_bot::spawn(config(steady_settings()), connector);

    let mut peer = accept(&mut server).await;
    assert_eq!(peer.url(), DEFAULT_ENDPOINT);
    assert_eq!(line(&mut peer, ":ru IDENT").await, ":ru IDENT 352 -2 4030 1 2 :GALA");
    peer.send_line("HAAAPSI abc");
    assert_eq!(line(&mut peer, "RECOVER").await, "RECOVER 123456");
    peer.send_line("REGISTER 42 guest x");
    assert_eq!(line(&mut peer, "USER").await, "USER 42 guest x 17862");
    peer.send_line("999");
    assert_eq!(line(&mut peer, "JOIN").await, "JOIN mars");

    let joined_at = Instant::now();
    peer.send_line("900");
    peer.send_line("353 mars :Me 42 Bob 7");
    assert_eq!(line(&mut peer, "ACTION").await, "ACTION 3 7");
    assert!(joined_at.elapsed() >= Duration::from_millis(3000));

    assert!(wait_for(&mut updates, &BotUpdate::Connected(true)).await);
    let report = handle.targets().await.unwrap();
    assert!(report.connected);
    assert_eq!(report.targets.len(), 1);
    assert_eq!(report.targets[0].id, pid("7"));
    assert_eq!(report.targets[0].nick.as_deref(), Some("Bob"));
}

#[tokio::test(start_paused = true)]
async fn test_ping_is_answered() {
    let (connector, mut server) = MemoryConnector::new();
    let (_handle, _updates, _task) = prison_bot::spawn(config(steady_settings()), connector);

    let mut peer = accept(&mut server).await;
    log_in(&mut peer).await;
    peer.send_line("PING");
    assert_eq!(line(&mut peer, "PONG").await, "PONG");
}

#[tokio::test(start_paused = true)]
async fn test_idle_reconnect_after_hang_up() {
    let settings = Settings {
        timer_reconnect: "5000".to_string(),
        ..steady_settings()
    };
    let (connector, mut server) = MemoryConnector::new();
    let (handle, mut updates, _task) = prison_bot::spawn(config(settings), connector);

    let mut peer = accept(&mut server).await;
    log_in(&mut peer).await;
    assert!(wait_for(&mut updates, &BotUpdate::Connected(true)).await);

    let dropped_at = Instant::now();
    peer.hang_up();
    assert!(wait_for(&mut updates, &BotUpdate::Armed(false)).await);

    let mut peer = accept(&mut server).await;
    assert!(dropped_at.elapsed() >= Duration::from_millis(5000));
    log_in(&mut peer).await;

    assert!(wait_for(&mut updates, &BotUpdate::Armed(true)).await);
    let report = handle.targets().await.unwrap();
    assert_ne!(report.state, BotState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_requested_disconnect_does_not_reconnect() {
    let settings = Settings {
        timer_reconnect: "1000".to_string(),
        ..steady_settings()
    };
    let (connector, mut server) = MemoryConnector::new();
    let probe = connector.clone();
    let (handle, mut updates, _task) = prison_bot::spawn(config(settings), connector);

    let mut peer = accept(&mut server).await;
    log_in(&mut peer).await;

    handle.disconnect().unwrap();
    assert_eq!(line(&mut peer, "QUIT").await, "QUIT :disconnect");
    assert!(wait_for(&mut updates, &BotUpdate::Connected(false)).await);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(probe.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refused_connection_then_manual_connect() {
    let (connector, mut server) = MemoryConnector::new();
    connector.refuse_next(1);
    let probe = connector.clone();
    let (handle, mut updates, _task) = prison_bot::spawn(config(steady_settings()), connector);

    assert!(wait_for(&mut updates, &BotUpdate::Connected(false)).await);
    assert_eq!(probe.attempts(), 1);

    handle.connect("654321").unwrap();
    let mut peer = accept(&mut server).await;
    line(&mut peer, ":ru IDENT").await;
    peer.send_line("HAAAPSI abc");
    assert_eq!(line(&mut peer, "RECOVER").await, "RECOVER 654321");
}

#[tokio::test(start_paused = true)]
async fn test_fatal_code_closes_connection() {
    let (connector, mut server) = MemoryConnector::new();
    let (_handle, mut updates, _task) = prison_bot::spawn(config(steady_settings()), connector);

    let mut peer = accept(&mut server).await;
    log_in(&mut peer).await;
    peer.send_line("452");

    assert_eq!(line(&mut peer, "QUIT").await, "QUIT :disconnect");
    assert!(wait_for(&mut updates, &BotUpdate::Log("Server error 452".to_string())).await);
    assert!(timeout(PATIENCE, peer.next_line()).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_quits_and_stops_worker() {
    let (connector, mut server) = MemoryConnector::new();
    let (handle, _updates, task) = prison_bot::spawn(config(steady_settings()), connector);

    let mut peer = accept(&mut server).await;
    log_in(&mut peer).await;

    handle.shutdown().unwrap();
    assert_eq!(line(&mut peer, "QUIT").await, "QUIT :disconnect");
    timeout(PATIENCE, task).await.unwrap().unwrap();
    assert!(handle.start().is_err());
}

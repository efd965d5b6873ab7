use axum::extract::ws::Message;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::Config;
use crate::leaderboard::{self, LeaderboardEntry};
use crate::state::WsClients;

/// Per roster tick each active participant advances by 0..=19 progress
/// points and earns 15 score per point drawn.
pub const PROGRESS_INCREMENT_MAX: u32 = 19;
pub const SCORE_PER_PROGRESS_POINT: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Running,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParticipantStatus {
    Active,
    Finished,
    Idle,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub progress: u8,
    pub score: u32,
    pub status: ParticipantStatus,
}

/// One live run of a quiz. The session owns its countdown and roster; the
/// quiz itself is only referenced by id.
#[derive(Debug)]
pub struct SessionState {
    pub quiz_id: String,
    pub phase: Phase,
    pub remaining_seconds: u32,
    pub roster: Vec<Participant>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub quiz_id: String,
    pub phase: Phase,
    pub remaining_seconds: u32,
    pub roster: Vec<Participant>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl SessionState {
    pub fn new(quiz_id: String, duration_secs: u32) -> Self {
        SessionState {
            quiz_id,
            phase: Phase::Idle,
            remaining_seconds: duration_secs,
            roster: Vec::new(),
        }
    }

    /// Seeds the roster and moves to Running. Anything but Idle is a no-op,
    /// so a session instance can only be started once.
    pub fn start(&mut self, names: &[String]) {
        if self.phase != Phase::Idle {
            return;
        }
        self.roster = names
            .iter()
            .enumerate()
            .map(|(i, name)| Participant {
                id: format!("s_{i}"),
                name: name.clone(),
                progress: 0,
                score: 0,
                status: ParticipantStatus::Active,
            })
            .collect();
        self.phase = Phase::Running;
    }

    /// Counts down one second, floored at 0. Reaching 0 does not end the
    /// session; the clock freezes until an explicit end.
    pub fn tick_timer(&mut self) {
        if self.phase != Phase::Running {
            return;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
    }

    /// One simulation step over the whole roster. Finished participants are
    /// latched; everyone else draws an increment and earns score for it.
    pub fn tick_roster(&mut self, rng: &mut impl Rng) {
        if self.phase != Phase::Running {
            return;
        }
        for p in &mut self.roster {
            if p.status == ParticipantStatus::Finished {
                continue;
            }
            let inc = rng.gen_range(0..=PROGRESS_INCREMENT_MAX) as u8;
            p.score += inc as u32 * SCORE_PER_PROGRESS_POINT;
            p.progress = (p.progress + inc).min(100);
            if p.progress >= 100 {
                p.status = ParticipantStatus::Finished;
            }
        }
    }

    /// Running → Ended. Also accepted from Idle before any roster exists,
    /// which covers tearing down a session that never started.
    pub fn end(&mut self) {
        match self.phase {
            Phase::Running => self.phase = Phase::Ended,
            Phase::Idle if self.roster.is_empty() => self.phase = Phase::Ended,
            _ => {}
        }
    }

    pub fn snapshot(&self, leaderboard_size: usize) -> SessionSnapshot {
        SessionSnapshot {
            quiz_id: self.quiz_id.clone(),
            phase: self.phase,
            remaining_seconds: self.remaining_seconds,
            roster: self.roster.clone(),
            leaderboard: leaderboard::project(&self.roster, leaderboard_size),
        }
    }
}

// ── Live task layer ──────────────────────────────────────

struct LiveSession {
    state: Arc<RwLock<SessionState>>,
    timer_task: JoinHandle<()>,
    roster_task: JoinHandle<()>,
}

impl LiveSession {
    fn abort(&self) {
        self.timer_task.abort();
        self.roster_task.abort();
    }
}

/// One live session at a time, matching the single live screen of the
/// dashboard. Starting a new session tears down the previous one first.
pub struct SessionManager {
    current: Mutex<Option<LiveSession>>,
}

impl SessionManager {
    pub fn new() -> Self {
        SessionManager {
            current: Mutex::new(None),
        }
    }

    /// Cancels any running session, seeds a fresh one for `quiz_id` and
    /// spawns the two tick streams: a 1 s wall clock and a slower roster
    /// simulation. The streams are independent so a stalled roster feed can
    /// never skew the countdown.
    pub async fn start(
        &self,
        quiz_id: String,
        cfg: &Config,
        ws_clients: Arc<WsClients>,
    ) -> SessionSnapshot {
        let mut slot = self.current.lock().await;
        if let Some(prev) = slot.take() {
            tracing::info!("Cancelling previous live session before restart");
            prev.abort();
        }

        let mut session = SessionState::new(quiz_id, cfg.session_duration_secs);
        session.start(&cfg.demo_participants);
        let snapshot = session.snapshot(cfg.leaderboard_size);

        let state = Arc::new(RwLock::new(session));
        let seed = cfg
            .simulation_seed
            .unwrap_or_else(|| rand::thread_rng().gen());

        let timer_task = tokio::spawn(timer_loop(
            state.clone(),
            ws_clients.clone(),
            cfg.timer_tick_secs,
            cfg.leaderboard_size,
        ));
        let roster_task = tokio::spawn(roster_loop(
            state.clone(),
            ws_clients,
            cfg.roster_tick_secs,
            cfg.leaderboard_size,
            seed,
        ));

        *slot = Some(LiveSession {
            state,
            timer_task,
            roster_task,
        });
        snapshot
    }

    /// Snapshot of the live session for `quiz_id`, if one is running.
    pub async fn snapshot_for(
        &self,
        quiz_id: &str,
        leaderboard_size: usize,
    ) -> Option<SessionSnapshot> {
        let slot = self.current.lock().await;
        let live = slot.as_ref()?;
        let state = live.state.read().await;
        if state.quiz_id != quiz_id {
            return None;
        }
        Some(state.snapshot(leaderboard_size))
    }

    /// Snapshot of whatever session is live, for newly connected dashboards.
    pub async fn current_snapshot(&self, leaderboard_size: usize) -> Option<SessionSnapshot> {
        let slot = self.current.lock().await;
        let live = slot.as_ref()?;
        let state = live.state.read().await;
        Some(state.snapshot(leaderboard_size))
    }

    /// Ends the live session for `quiz_id`: stops both tick streams and
    /// returns the final roster snapshot for the results hand-off.
    pub async fn end(&self, quiz_id: &str, leaderboard_size: usize) -> Option<SessionSnapshot> {
        let mut slot = self.current.lock().await;
        let live = slot.take()?;
        if live.state.read().await.quiz_id != quiz_id {
            *slot = Some(live);
            return None;
        }
        live.abort();
        let mut state = live.state.write().await;
        state.end();
        Some(state.snapshot(leaderboard_size))
    }
}

async fn timer_loop(
    state: Arc<RwLock<SessionState>>,
    ws_clients: Arc<WsClients>,
    period_secs: u64,
    leaderboard_size: usize,
) {
    let period = Duration::from_secs(period_secs);
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    loop {
        interval.tick().await;
        let snapshot = {
            let mut session = state.write().await;
            if session.phase != Phase::Running {
                break;
            }
            session.tick_timer();
            session.snapshot(leaderboard_size)
        };
        broadcast_snapshot(&ws_clients, &snapshot);
    }
}

async fn roster_loop(
    state: Arc<RwLock<SessionState>>,
    ws_clients: Arc<WsClients>,
    period_secs: u64,
    leaderboard_size: usize,
    seed: u64,
) {
    let mut rng = StdRng::seed_from_u64(seed);
    let period = Duration::from_secs(period_secs);
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    loop {
        interval.tick().await;
        // The whole roster is mutated under one write lock, so readers only
        // ever observe complete tick results.
        let snapshot = {
            let mut session = state.write().await;
            if session.phase != Phase::Running {
                break;
            }
            session.tick_roster(&mut rng);
            session.snapshot(leaderboard_size)
        };
        broadcast_snapshot(&ws_clients, &snapshot);
    }
}

pub fn broadcast_snapshot(clients: &WsClients, snapshot: &SessionSnapshot) {
    let msg = serde_json::json!({ "type": "session", "session": snapshot }).to_string();
    for entry in clients.iter() {
        let _ = entry.value().send(Message::Text(msg.clone().into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;

    fn running_session(names: usize) -> SessionState {
        let names: Vec<String> = (0..names).map(|i| format!("學生{i}")).collect();
        let mut s = SessionState::new("q_1".to_string(), 1200);
        s.start(&names);
        s
    }

    #[test]
    fn timer_counts_down_and_floors_at_zero() {
        let mut s = running_session(2);
        s.remaining_seconds = 2;
        let mut seen = Vec::new();
        for _ in 0..4 {
            s.tick_timer();
            seen.push(s.remaining_seconds);
        }
        assert_eq!(seen, vec![1, 0, 0, 0]);
        // Hitting zero does not end the session.
        assert_eq!(s.phase, Phase::Running);
    }

    #[test]
    fn timer_is_frozen_outside_running() {
        let mut s = SessionState::new("q_1".to_string(), 1200);
        s.tick_timer();
        assert_eq!(s.remaining_seconds, 1200);

        let mut s = running_session(2);
        s.end();
        s.tick_timer();
        assert_eq!(s.remaining_seconds, 1200);
    }

    #[test]
    fn start_seeds_roster_once() {
        let mut s = running_session(8);
        assert_eq!(s.roster.len(), 8);
        assert!(s
            .roster
            .iter()
            .all(|p| p.progress == 0 && p.score == 0 && p.status == ParticipantStatus::Active));

        // A second start on the same instance is a silent no-op.
        let mut rng = StdRng::seed_from_u64(1);
        s.tick_roster(&mut rng);
        let before: Vec<u8> = s.roster.iter().map(|p| p.progress).collect();
        s.start(&["新人".to_string()]);
        assert_eq!(s.roster.len(), 8);
        let after: Vec<u8> = s.roster.iter().map(|p| p.progress).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn progress_is_monotonic_bounded_and_finishes_exactly_at_100() {
        let mut s = running_session(4);
        let mut rng = StdRng::seed_from_u64(42);
        let mut finished_at: Vec<bool> = vec![false; 4];

        for _ in 0..200 {
            let before: Vec<u8> = s.roster.iter().map(|p| p.progress).collect();
            s.tick_roster(&mut rng);
            for (i, p) in s.roster.iter().enumerate() {
                assert!(p.progress >= before[i]);
                assert!(p.progress <= 100);
                assert_eq!(p.status == ParticipantStatus::Finished, p.progress == 100);
                if finished_at[i] {
                    // Finished participants are never touched again.
                    assert_eq!(p.progress, 100);
                    assert_eq!(p.status, ParticipantStatus::Finished);
                }
                finished_at[i] = p.status == ParticipantStatus::Finished;
            }
        }
        assert!(s.roster.iter().all(|p| p.status == ParticipantStatus::Finished));
    }

    #[test]
    fn roster_tick_is_deterministic_for_a_seed() {
        let mut a = running_session(8);
        let mut b = running_session(8);
        let mut rng_a = StdRng::seed_from_u64(7);
        let mut rng_b = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            a.tick_roster(&mut rng_a);
            b.tick_roster(&mut rng_b);
        }
        let scores_a: Vec<u32> = a.roster.iter().map(|p| p.score).collect();
        let scores_b: Vec<u32> = b.roster.iter().map(|p| p.score).collect();
        assert_eq!(scores_a, scores_b);
    }

    #[test]
    fn first_tick_scores_fifteen_per_progress_point() {
        let mut s = running_session(8);
        let mut rng = StdRng::seed_from_u64(3);
        s.tick_roster(&mut rng);
        for p in &s.roster {
            assert!(p.progress as u32 <= PROGRESS_INCREMENT_MAX);
            assert_eq!(p.score, p.progress as u32 * SCORE_PER_PROGRESS_POINT);
        }
    }

    #[test]
    fn roster_tick_is_inert_after_end() {
        let mut s = running_session(2);
        s.end();
        assert_eq!(s.phase, Phase::Ended);
        let mut rng = StdRng::seed_from_u64(1);
        s.tick_roster(&mut rng);
        assert!(s.roster.iter().all(|p| p.progress == 0 && p.score == 0));
    }

    #[test]
    fn end_from_idle_without_roster_is_accepted() {
        let mut s = SessionState::new("q_1".to_string(), 1200);
        s.end();
        assert_eq!(s.phase, Phase::Ended);
    }

    fn test_config() -> Config {
        Config {
            simulation_seed: Some(99),
            ..Config::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn restart_resets_roster_and_keeps_one_tick_stream() {
        let cfg = test_config();
        let ws: Arc<WsClients> = Arc::new(DashMap::new());
        let mgr = SessionManager::new();

        mgr.start("q_1".to_string(), &cfg, ws.clone()).await;
        tokio::task::yield_now().await;
        mgr.start("q_1".to_string(), &cfg, ws.clone()).await;
        tokio::task::yield_now().await;

        // Fresh seeded roster after the restart.
        let snap = mgr.snapshot_for("q_1", cfg.leaderboard_size).await.unwrap();
        assert_eq!(snap.roster.len(), cfg.demo_participants.len());
        assert!(snap.roster.iter().all(|p| p.progress == 0 && p.score == 0));

        // One roster period later exactly one tick's worth of mutation has
        // landed; a leaked second stream would double it.
        tokio::time::advance(Duration::from_secs(cfg.roster_tick_secs)).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        let snap = mgr.snapshot_for("q_1", cfg.leaderboard_size).await.unwrap();
        for p in &snap.roster {
            assert!(p.progress as u32 <= PROGRESS_INCREMENT_MAX);
            assert_eq!(p.score, p.progress as u32 * SCORE_PER_PROGRESS_POINT);
        }
        assert_eq!(snap.remaining_seconds, cfg.session_duration_secs - 2);
    }

    #[tokio::test(start_paused = true)]
    async fn end_stops_the_session_and_returns_the_final_roster() {
        let cfg = test_config();
        let ws: Arc<WsClients> = Arc::new(DashMap::new());
        let mgr = SessionManager::new();

        mgr.start("q_1".to_string(), &cfg, ws.clone()).await;
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(2)).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        let ended = mgr.end("q_1", cfg.leaderboard_size).await.unwrap();
        assert_eq!(ended.phase, Phase::Ended);
        assert_eq!(ended.roster.len(), cfg.demo_participants.len());

        // Nothing live any more.
        assert!(mgr.snapshot_for("q_1", cfg.leaderboard_size).await.is_none());
        assert!(mgr.end("q_1", cfg.leaderboard_size).await.is_none());
    }

    #[tokio::test]
    async fn current_snapshot_tracks_whatever_session_is_live() {
        let cfg = test_config();
        let ws: Arc<WsClients> = Arc::new(DashMap::new());
        let mgr = SessionManager::new();

        assert!(mgr.current_snapshot(cfg.leaderboard_size).await.is_none());

        mgr.start("q_1".to_string(), &cfg, ws.clone()).await;
        let snap = mgr.current_snapshot(cfg.leaderboard_size).await.unwrap();
        assert_eq!(snap.quiz_id, "q_1");
        assert_eq!(snap.phase, Phase::Running);

        mgr.end("q_1", cfg.leaderboard_size).await;
        assert!(mgr.current_snapshot(cfg.leaderboard_size).await.is_none());
    }

    #[tokio::test]
    async fn end_for_a_different_quiz_leaves_the_session_alone() {
        let cfg = test_config();
        let ws: Arc<WsClients> = Arc::new(DashMap::new());
        let mgr = SessionManager::new();

        mgr.start("q_1".to_string(), &cfg, ws.clone()).await;
        assert!(mgr.end("q_other", cfg.leaderboard_size).await.is_none());
        assert!(mgr.snapshot_for("q_1", cfg.leaderboard_size).await.is_some());
        mgr.end("q_1", cfg.leaderboard_size).await;
    }
}

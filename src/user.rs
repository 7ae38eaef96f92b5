//! Virtual user driver.
//!
//! Each virtual user runs as one tokio task: it waits for its start slot,
//! gets a fresh identity, then repeatedly selects a task, executes it and
//! waits, until the test deadline passes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tokio::time::{self, Duration, Instant};
use tracing::{debug, info};

use crate::actions::{self, Action, ActionContext};
use crate::client::HttpClient;
use crate::fake_data::{generate_password, Profile};
use crate::metrics::{ACTIONS_TOTAL, ACTION_ERRORS_TOTAL, ACTIVE_USERS, SESSIONS_STARTED_TOTAL};
use crate::outcome::{ActionOutcome, TolerancePolicy};
use crate::profiles::UserProfile;
use crate::selector::WeightedTaskSelector;
use crate::session::SessionContext;

/// Pause between two tasks of the same user, drawn uniformly from `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTime {
    pub min: Duration,
    pub max: Duration,
}

impl WaitTime {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// No pause at all.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Returns `min` when the range is empty.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min_ms = self.min.as_millis() as u64;
        let max_ms = self.max.as_millis() as u64;

        if min_ms >= max_ms {
            return self.min;
        }

        Duration::from_millis(rng.gen_range(min_ms..=max_ms))
    }
}

impl Default for WaitTime {
    fn default() -> Self {
        Self::new(Duration::from_millis(3000), Duration::from_millis(15000))
    }
}

/// Configuration for one virtual user.
pub struct VirtualUserConfig {
    pub user_id: usize,
    pub profile: UserProfile,
    pub selector: WeightedTaskSelector<Action>,
    pub http: Arc<dyn HttpClient>,
    pub policy: TolerancePolicy,
    pub wait: WaitTime,
    pub test_duration: Duration,
    /// Delay before the user starts, used to honour the spawn rate.
    pub start_delay: Duration,
    /// Fixed seed for reproducible runs; `None` seeds from the OS.
    pub seed: Option<u64>,
}

/// What one virtual user did during the test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSummary {
    pub user_id: usize,
    pub actions: u64,
    pub succeeded: u64,
    pub tolerated: u64,
    pub failed: u64,
}

impl UserSummary {
    fn record(&mut self, outcome: &ActionOutcome) {
        self.actions += 1;
        match outcome {
            ActionOutcome::Success => self.succeeded += 1,
            ActionOutcome::Tolerated { .. } => self.tolerated += 1,
            ActionOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Add another user's counts to this one.
    pub fn merge(&mut self, other: &UserSummary) {
        self.actions += other.actions;
        self.succeeded += other.succeeded;
        self.tolerated += other.tolerated;
        self.failed += other.failed;
    }
}

/// Runs a single virtual user until `start_time + test_duration`.
///
/// Tasks of one user are strictly sequential. Action failures are counted
/// and logged; they never stop the user.
pub async fn run_virtual_user(config: VirtualUserConfig, start_time: Instant) -> UserSummary {
    let VirtualUserConfig {
        user_id,
        profile,
        mut selector,
        http,
        policy,
        wait,
        test_duration,
        start_delay,
        seed,
    } = config;

    let mut summary = UserSummary {
        user_id,
        ..UserSummary::default()
    };
    let deadline = start_time + test_duration;

    time::sleep_until((start_time + start_delay).min(deadline)).await;
    if Instant::now() >= deadline {
        debug!(user_id, profile = %profile, "Test ended before user start slot");
        return summary;
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut session = SessionContext::new(user_id);
    let identity = Profile::generate(&mut rng);
    let password = generate_password(&mut rng);
    info!(
        user_id,
        profile = %profile,
        username = %identity.username,
        "Virtual user starting"
    );
    if let Err(e) = session.start(identity, password) {
        debug!(user_id, error = %e, "Session could not start");
        return summary;
    }
    SESSIONS_STARTED_TOTAL.inc();
    ACTIVE_USERS.inc();

    while Instant::now() < deadline {
        let action = selector.next_task(&mut rng);

        let outcome = {
            let mut ctx = ActionContext {
                http: http.as_ref(),
                session: &mut session,
                policy: &policy,
                rng: &mut rng,
            };
            actions::execute(action, &mut ctx).await
        };

        ACTIONS_TOTAL
            .with_label_values(&[profile.name(), action.name(), outcome.label()])
            .inc();
        if let ActionOutcome::Failed(ref err) = outcome {
            ACTION_ERRORS_TOTAL
                .with_label_values(&[err.category().label()])
                .inc();
        }
        summary.record(&outcome);

        let pause = wait.sample(&mut rng);
        time::sleep_until((Instant::now() + pause).min(deadline)).await;
    }

    session.terminate();
    ACTIVE_USERS.dec();
    info!(
        user_id,
        profile = %profile,
        actions = summary.actions,
        failed = summary.failed,
        session_secs = session.elapsed().as_secs(),
        active_group = selector.active_group(),
        "Virtual user stopping after duration limit"
    );

    summary
}

/// Start delay for the `index`-th user when `spawn_rate` users start per second.
///
/// A rate of 0 starts everyone at once. Delays are capped at `test_duration`,
/// after which the user would never run.
pub fn start_delay_for(index: usize, spawn_rate: f64, test_duration: Duration) -> Duration {
    if spawn_rate <= 0.0 || !spawn_rate.is_finite() {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(index as f64 / spawn_rate)
        .map(|delay| delay.min(test_duration))
        .unwrap_or(test_duration)
}

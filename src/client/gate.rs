//! Availability & location gate.
//!
//! Background tracking runs only while the account is `active` *and* the
//! device can report its location (permission granted and services on).
//! Three uncoordinated timers drive it:
//!
//! - every 2 s the profile is refetched, refreshing the account flag;
//! - every 5 s permission and service state are re-checked and the combined
//!   flag is reported to the backend;
//! - every 30 s, while tracking, the current position is pushed.
//!
//! Every background failure is logged and the next tick proceeds as usual.
//! When the location flag is false the gate raises `prompt_visible`, which a
//! UI renders as a blocking prompt until the device is fixed and the user
//! acknowledges it.
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::client::location::LocationProvider;
use crate::client::session::Session;

pub const ACCOUNT_REFRESH_EVERY: Duration = Duration::from_secs(2);
pub const PERMISSION_CHECK_EVERY: Duration = Duration::from_secs(5);
pub const LOCATION_PUSH_EVERY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateCadence {
    pub account_refresh: Duration,
    pub permission_check: Duration,
    pub location_push: Duration,
}

impl Default for GateCadence {
    fn default() -> Self {
        Self {
            account_refresh: ACCOUNT_REFRESH_EVERY,
            permission_check: PERMISSION_CHECK_EVERY,
            location_push: LOCATION_PUSH_EVERY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GateState {
    pub account_active: bool,
    pub location_service_on: bool,
    pub prompt_visible: bool,
    pub tracking: bool,
}

impl GateState {
    pub fn should_track(&self) -> bool {
        self.account_active && self.location_service_on
    }
}

pub struct LocationGate {
    session: Arc<Session>,
    provider: Arc<dyn LocationProvider>,
    cadence: GateCadence,
    state: watch::Sender<GateState>,
    /// Last location flag the backend acknowledged.
    reported: Mutex<Option<bool>>,
    tracker: Mutex<Option<JoinHandle<()>>>,
}

impl LocationGate {
    pub fn new(
        session: Arc<Session>,
        provider: Arc<dyn LocationProvider>,
        cadence: GateCadence,
    ) -> Arc<Self> {
        let initial = GateState {
            account_active: session.is_active(),
            ..GateState::default()
        };
        let (state, _) = watch::channel(initial);

        Arc::new(Self {
            session,
            provider,
            cadence,
            state,
            reported: Mutex::new(None),
            tracker: Mutex::new(None),
        })
    }

    pub fn snapshot(&self) -> GateState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<GateState> {
        self.state.subscribe()
    }

    /// Re-reads permission and service state, reports the combined flag and
    /// reconciles tracking. Returns the combined flag.
    pub async fn check_location_status(&self) -> bool {
        let available = match self.provider.permission_granted().await {
            Ok(true) => match self.provider.services_enabled().await {
                Ok(enabled) => enabled,
                Err(err) => {
                    warn!(error = %err, "location service check failed");
                    false
                }
            },
            Ok(false) => false,
            Err(err) => {
                warn!(error = %err, "location permission check failed");
                false
            }
        };

        self.report_location_status(available).await;

        self.state.send_modify(|state| {
            state.location_service_on = available;
            state.prompt_visible = !available;
        });
        self.reconcile();

        available
    }

    /// Refetches the profile so availability flips made elsewhere are seen.
    pub async fn refresh_account(&self) -> bool {
        if let Err(err) = self.session.refresh_profile().await {
            warn!(error = %err, "failed to refresh account status");
        }

        self.reconcile();
        self.snapshot().account_active
    }

    /// The prompt has no dismiss path of its own: acknowledging re-checks the
    /// device and the prompt stays up unless location is now available.
    pub async fn acknowledge_prompt(&self) -> bool {
        self.check_location_status().await
    }

    /// Starts or stops tracking to match the current inputs. Returns whether
    /// tracking is running afterwards.
    pub fn reconcile(&self) -> bool {
        let active = self.session.is_active();
        self.state.send_modify(|state| state.account_active = active);

        if self.snapshot().should_track() {
            self.start_tracking();
            true
        } else {
            self.stop_tracking();
            false
        }
    }

    /// Returns `false` when tracking was already running. The `tracking`
    /// flag only changes while the tracker lock is held.
    pub fn start_tracking(&self) -> bool {
        let mut tracker = lock(&self.tracker);
        if tracker.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }

        *tracker = Some(tokio::spawn(push_locations(
            self.session.clone(),
            self.provider.clone(),
            self.cadence.location_push,
        )));
        self.state.send_modify(|state| state.tracking = true);
        drop(tracker);

        info!(every_secs = self.cadence.location_push.as_secs(), "location tracking started");
        true
    }

    /// Returns `false` when tracking was not running.
    pub fn stop_tracking(&self) -> bool {
        let mut tracker = lock(&self.tracker);
        let running = tracker.take();
        self.state.send_modify(|state| state.tracking = false);
        drop(tracker);

        let Some(handle) = running else {
            return false;
        };
        handle.abort();

        info!("location tracking stopped");
        true
    }

    /// Starts the account and permission pollers. Both stop, together with
    /// tracking, when the returned handle is shut down or dropped.
    pub fn spawn(self: &Arc<Self>) -> GateHandle {
        let pollers = vec![
            tokio::spawn(poll_account(self.clone())),
            tokio::spawn(poll_permission(self.clone())),
        ];

        GateHandle {
            gate: self.clone(),
            pollers,
        }
    }

    async fn report_location_status(&self, available: bool) {
        if self.last_reported() == Some(available) {
            return;
        }

        match self.session.report_location_status(available).await {
            Ok(_) => self.set_last_reported(available),
            Err(err) => warn!(
                error = %err,
                is_location_on = available,
                "failed to report location status"
            ),
        }
    }

    fn last_reported(&self) -> Option<bool> {
        *lock(&self.reported)
    }

    fn set_last_reported(&self, available: bool) {
        *lock(&self.reported) = Some(available);
    }
}

pub struct GateHandle {
    gate: Arc<LocationGate>,
    pollers: Vec<JoinHandle<()>>,
}

impl GateHandle {
    pub fn gate(&self) -> &Arc<LocationGate> {
        &self.gate
    }

    pub fn shutdown(&mut self) {
        for poller in self.pollers.drain(..) {
            poller.abort();
        }
        self.gate.stop_tracking();
    }
}

impl Drop for GateHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn poll_account(gate: Arc<LocationGate>) {
    let mut ticker = time::interval(gate.cadence.account_refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        gate.refresh_account().await;
    }
}

async fn poll_permission(gate: Arc<LocationGate>) {
    let mut ticker = time::interval(gate.cadence.permission_check);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        gate.check_location_status().await;
    }
}

async fn push_locations(session: Arc<Session>, provider: Arc<dyn LocationProvider>, every: Duration) {
    let mut ticker = time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let position = match provider.current_position().await {
            Ok(position) => position,
            Err(err) => {
                warn!(error = %err, "failed to read current position");
                continue;
            }
        };

        match session.track_location(position).await {
            Ok(receipt) if receipt.updated_orders > 0 => {
                info!(updated_orders = receipt.updated_orders, "arrival detected");
            }
            Ok(receipt) => debug!(timestamp = receipt.timestamp, "location pushed"),
            Err(err) => warn!(error = %err, "failed to push location"),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

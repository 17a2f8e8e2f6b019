//! Monitor Loop
//!
//! Samples socket health and heartbeat timing once per interval and asks the
//! supervisor to reconnect when the socket is broken, a full reconnect was
//! requested, or the heartbeat timed out.

use std::sync::Weak;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::timeout::sleep_unless_cancelled;
use crate::domain::{Advice, HeartbeatTimes};
use crate::infrastructure::transport::{SocketSlot, SocketState};
use crate::shared::error::ClientError;

/// Snapshot of the session read once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionHealth {
    pub advice: Advice,
    pub full_reconnect: bool,
    pub heartbeat: HeartbeatTimes,
}

/// Supervisor side of the monitor.
#[async_trait]
pub trait ReconnectTarget: Send + Sync {
    /// `None` while no session is established.
    fn health(&self) -> Option<SessionHealth>;

    async fn reconnect(&self, full: bool, cancel: &CancellationToken) -> Result<(), ClientError>;
}

/// Decide whether a tick must reconnect. Returns `Some(full)` when it must.
///
/// Only the full-reconnect flag makes the reconnect full; a broken socket or a
/// bare heartbeat timeout resumes the existing client id.
pub fn reconnect_decision(
    state: SocketState,
    health: &SessionHealth,
    timed_out: bool,
) -> Option<bool> {
    (state.is_broken() || health.full_reconnect || timed_out).then_some(health.full_reconnect)
}

pub struct MonitorLoop {
    target: Weak<dyn ReconnectTarget>,
    interval: Duration,
    idle_delay: Duration,
}

impl MonitorLoop {
    pub fn new(target: Weak<dyn ReconnectTarget>, interval: Duration, idle_delay: Duration) -> Self {
        Self {
            target,
            interval,
            idle_delay,
        }
    }

    /// Run until `cancel` fires.
    pub async fn run(self, socket: SocketSlot, cancel: CancellationToken) {
        loop {
            let Some(state) = socket.state() else {
                if !sleep_unless_cancelled(self.idle_delay, &cancel).await {
                    break;
                }
                continue;
            };

            self.tick(state, &cancel).await;

            if !sleep_unless_cancelled(self.interval, &cancel).await {
                break;
            }
        }

        debug!("Monitor loop stopped");
    }

    async fn tick(&self, state: SocketState, cancel: &CancellationToken) {
        let Some(target) = self.target.upgrade() else {
            return;
        };
        let Some(health) = target.health() else {
            return;
        };

        let timed_out = health
            .advice
            .is_timed_out(&health.heartbeat, Utc::now(), self.interval);
        debug!(
            state = %state,
            full_reconnect = health.full_reconnect,
            heartbeat = %health.heartbeat,
            timed_out,
            "Monitor tick"
        );

        if let Some(full) = reconnect_decision(state, &health, timed_out) {
            match target.reconnect(full, cancel).await {
                Ok(()) => debug!(full, "Reconnected"),
                Err(e) => debug!(full, error = %e, "Error during reconnect"),
            }
        }
    }
}

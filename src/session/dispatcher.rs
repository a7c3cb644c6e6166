//! The dispatcher task: one loop that owns the [`SessionController`].

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior};

use super::controller::{Hooks, SessionController};
use super::{Delivery, SessionStatus};
use crate::config::ClientConfig;

/// Spawn the delivery context.
///
/// Must be called from within a tokio runtime.
pub(crate) fn spawn_dispatcher(
    config: &ClientConfig,
    hooks: Hooks,
    status: Arc<watch::Sender<SessionStatus>>,
) -> (mpsc::Sender<Delivery>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let controller = SessionController::new(config, hooks, status, tx.clone());
    let task = tokio::spawn(run(controller, rx, config.keep_alive_interval()));
    (tx, task)
}

async fn run(
    mut controller: SessionController,
    mut rx: mpsc::Receiver<Delivery>,
    keep_alive: Option<Duration>,
) {
    let mut keep_alive = keep_alive.map(|period| {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    loop {
        let deadline = controller.next_deadline();
        tokio::select! {
            delivery = rx.recv() => match delivery {
                Some(delivery) => controller.handle(delivery).await,
                None => break,
            },
            _ = sleep_until_deadline(deadline) => controller.expire_requests(Instant::now()),
            _ = tick(keep_alive.as_mut()) => controller.keep_alive_tick().await,
        }
    }

    tracing::debug!("Dispatcher stopped");
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

async fn tick(ticker: Option<&mut Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => pending().await,
    }
}

//! Periodic ad lifecycle scheduler
//!
//! Every tick evicts idle dialogue sessions, reminds owners whose ads are
//! about to expire and flips overdue ads to expired. The passes are
//! independent: a failure in one, or on one ad, never stops the others.

use crate::bot::transport::ChatTransport;
use crate::bot::views::owner;
use crate::market::rules::PRE_EXPIRY_WINDOW_HOURS;
use crate::market::Ad;
use crate::session::SessionStore;
use crate::store::{AdFieldUpdate, RecordStore};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Shortest accepted tick period; tokio refuses a zero interval
const MIN_TICK_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);

/// Scheduler timing and notification settings
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Time between ticks
    pub interval: std::time::Duration,
    /// Idle time after which a dialogue session is evicted
    pub session_timeout: Duration,
    /// Contact shown to ad owners
    pub help_link: String,
}

/// Outcome of one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub swept: usize,
    pub reminded: usize,
    pub expired: usize,
}

pub struct LifecycleScheduler {
    sessions: Arc<SessionStore>,
    records: Arc<dyn RecordStore>,
    transport: Arc<dyn ChatTransport>,
    options: SchedulerOptions,
}

impl LifecycleScheduler {
    #[must_use]
    pub fn new(
        sessions: Arc<SessionStore>,
        records: Arc<dyn RecordStore>,
        transport: Arc<dyn ChatTransport>,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            sessions,
            records,
            transport,
            options,
        }
    }

    /// Tick until `cancellation` fires
    pub async fn run(&self, cancellation: CancellationToken) {
        let period = self.options.interval.max(MIN_TICK_INTERVAL);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = period.as_secs(), "Lifecycle scheduler started");

        loop {
            tokio::select! {
                () = cancellation.cancelled() => {
                    info!("Lifecycle scheduler shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let report = self.tick(Utc::now()).await;
                    if report != TickReport::default() {
                        info!(?report, "Scheduler tick");
                    }
                }
            }
        }
    }

    /// Run all three passes once
    pub async fn tick(&self, now: DateTime<Utc>) -> TickReport {
        TickReport {
            swept: self.sweep_sessions(now).await,
            reminded: self.pre_expiry_pass(now).await,
            expired: self.expiry_pass(now).await,
        }
    }

    async fn sweep_sessions(&self, now: DateTime<Utc>) -> usize {
        let swept = self
            .sessions
            .sweep_idle(self.options.session_timeout, now)
            .await;
        if swept > 0 {
            debug!(swept, "Evicted idle sessions");
        }
        swept
    }

    /// Remind owners of ads expiring within the window; each ad at most once
    async fn pre_expiry_pass(&self, now: DateTime<Utc>) -> usize {
        let until = now + Duration::hours(PRE_EXPIRY_WINDOW_HOURS);
        let ads = match self.records.find_ads_expiring_between(now, until).await {
            Ok(ads) => ads,
            Err(e) => {
                warn!("Pre-expiry query failed: {e}");
                return 0;
            }
        };

        let mut reminded = 0;
        for ad in ads {
            self.notify(&ad, &owner::reminder(&ad, &self.options.help_link))
                .await;
            // Marked even when the owner is unreachable, so the ad is not re-selected
            match self
                .records
                .update_ad_fields(ad.id, AdFieldUpdate::notified(true))
                .await
            {
                Ok(_) => reminded += 1,
                Err(e) => warn!(ad_id = ad.id, "Failed to mark ad as notified: {e}"),
            }
        }
        reminded
    }

    /// Flip overdue active ads to expired and tell their owners
    async fn expiry_pass(&self, now: DateTime<Utc>) -> usize {
        let ads = match self.records.find_ads_expired_at(now).await {
            Ok(ads) => ads,
            Err(e) => {
                warn!("Expiry query failed: {e}");
                return 0;
            }
        };

        let mut expired = 0;
        for ad in ads {
            let Some(read_expiry) = ad.expires_at else {
                continue;
            };
            match self
                .records
                .update_ad_fields(ad.id, AdFieldUpdate::expire(read_expiry))
                .await
            {
                Ok(true) => {
                    expired += 1;
                    info!(ad_id = ad.id, "Ad expired");
                    self.notify(&ad, &owner::expired(&ad, &self.options.help_link))
                        .await;
                }
                Ok(false) => debug!(ad_id = ad.id, "Ad changed before expiry, skipping"),
                Err(e) => warn!(ad_id = ad.id, "Failed to expire ad: {e}"),
            }
        }
        expired
    }

    async fn notify(&self, ad: &Ad, text: &str) {
        if ad.user_id == 0 {
            debug!(ad_id = ad.id, "Ad has no owning chat, skipping notification");
            return;
        }
        if let Err(e) = self.transport.send(ad.user_id, text, None).await {
            warn!(ad_id = ad.id, user_id = ad.user_id, "Failed to notify ad owner: {e}");
        }
    }
}

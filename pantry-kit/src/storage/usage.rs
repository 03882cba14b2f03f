//! Monthly scan quota

use crate::error::{PantryError, Result};
use crate::storage::{read_json, write_json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Scans allowed per month on the free tier
pub const DEFAULT_FREE_MONTHLY_SCANS: u32 = 10;

/// Requests counted in one calendar month (UTC)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsagePeriod {
    /// `YYYY-MM`
    pub month: String,
    pub request_ids: Vec<String>,
}

impl UsagePeriod {
    pub fn starting(now: DateTime<Utc>) -> Self {
        Self {
            month: Self::month_of(now),
            request_ids: Vec::new(),
        }
    }

    pub fn month_of(time: DateTime<Utc>) -> String {
        time.format("%Y-%m").to_string()
    }

    pub fn used(&self) -> u32 {
        self.request_ids.len() as u32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UsageState {
    #[serde(default)]
    premium: bool,
    period: UsagePeriod,
}

/// Counts image scans per month against the free-tier limit
///
/// Recording the same request id twice in a month counts once. Premium
/// users are never limited.
#[derive(Debug, Clone)]
pub struct UsageTracker {
    path: PathBuf,
    monthly_limit: u32,
    state: Arc<Mutex<UsageState>>,
}

impl UsageTracker {
    pub async fn open(path: impl Into<PathBuf>, monthly_limit: u32) -> Result<Self> {
        let path = path.into();
        let state = read_json(&path).await?.unwrap_or_else(|| UsageState {
            premium: false,
            period: UsagePeriod::starting(Utc::now()),
        });

        Ok(Self {
            path,
            monthly_limit,
            state: Arc::new(Mutex::new(state)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn monthly_limit(&self) -> u32 {
        self.monthly_limit
    }

    /// Count one scan now; returns scans used this month
    pub async fn record(&self, request_id: &str) -> Result<u32> {
        self.record_at(request_id, Utc::now()).await
    }

    /// Count one scan at `now`
    ///
    /// Fails with a validation error once a free user reaches the limit.
    pub async fn record_at(&self, request_id: &str, now: DateTime<Utc>) -> Result<u32> {
        let mut state = self.state.lock().await;
        let rolled = roll_period(&mut state, now);

        if state.period.request_ids.iter().any(|id| id == request_id) {
            debug!(request_id, "Scan already counted");
            if rolled {
                write_json(&self.path, &*state).await?;
            }
            return Ok(state.period.used());
        }

        if !state.premium && state.period.used() >= self.monthly_limit {
            if rolled {
                write_json(&self.path, &*state).await?;
            }
            return Err(PantryError::Validation(format!(
                "You've used all {} free scans for this month.",
                self.monthly_limit
            )));
        }

        state.period.request_ids.push(request_id.to_string());
        if let Err(e) = write_json(&self.path, &*state).await {
            state.period.request_ids.pop();
            return Err(e);
        }

        let used = state.period.used();
        info!(used, limit = self.monthly_limit, premium = state.premium, "Recorded scan");
        Ok(used)
    }

    /// Whether `request_id` is already counted in the month of `now`
    pub async fn is_counted_at(&self, request_id: &str, now: DateTime<Utc>) -> bool {
        let state = self.state.lock().await;
        state.period.month == UsagePeriod::month_of(now)
            && state.period.request_ids.iter().any(|id| id == request_id)
    }

    pub async fn is_counted(&self, request_id: &str) -> bool {
        self.is_counted_at(request_id, Utc::now()).await
    }

    /// Whether recording `request_id` at `now` would succeed: premium, an
    /// already counted request, or free scans left
    pub async fn allows_at(&self, request_id: &str, now: DateTime<Utc>) -> bool {
        if self.is_counted_at(request_id, now).await {
            return true;
        }
        self.remaining_at(now).await.map_or(true, |left| left > 0)
    }

    pub async fn allows(&self, request_id: &str) -> bool {
        self.allows_at(request_id, Utc::now()).await
    }

    /// Scans used in the current month
    pub async fn used(&self) -> u32 {
        self.used_at(Utc::now()).await
    }

    pub async fn used_at(&self, now: DateTime<Utc>) -> u32 {
        let state = self.state.lock().await;
        if state.period.month == UsagePeriod::month_of(now) {
            state.period.used()
        } else {
            0
        }
    }

    /// Scans left this month; `None` means unlimited
    pub async fn remaining(&self) -> Option<u32> {
        self.remaining_at(Utc::now()).await
    }

    pub async fn remaining_at(&self, now: DateTime<Utc>) -> Option<u32> {
        if self.is_premium().await {
            return None;
        }
        Some(self.monthly_limit.saturating_sub(self.used_at(now).await))
    }

    pub async fn is_premium(&self) -> bool {
        self.state.lock().await.premium
    }

    pub async fn set_premium(&self, premium: bool) -> Result<()> {
        let mut state = self.state.lock().await;
        let previous = state.premium;
        state.premium = premium;
        if let Err(e) = write_json(&self.path, &*state).await {
            state.premium = previous;
            return Err(e);
        }
        Ok(())
    }
}

/// Start a fresh period if `now` is in a later month; returns whether it did
fn roll_period(state: &mut UsageState, now: DateTime<Utc>) -> bool {
    if state.period.month == UsagePeriod::month_of(now) {
        return false;
    }
    debug!(from = %state.period.month, "Starting new usage period");
    state.period = UsagePeriod::starting(now);
    true
}

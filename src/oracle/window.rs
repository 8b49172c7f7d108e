//! Time Window - Selects statistics buckets relative to a basis time
//!
//! The statistics feed delivers two independent series per good: hourly
//! buckets (nominally the last 48) and daily buckets (nominally the last 90).
//! Either may be shorter than nominal, or empty.

use chrono::{DateTime, Duration, Utc};

use crate::types::{RankFilter, TimestampedStat};

/// Time predicate of a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizon {
    /// Buckets strictly newer than `basis - N hours`
    LastHours(u32),
    /// Buckets strictly newer than `basis - N days`
    LastDays(u32),
    /// Buckets strictly older than `basis - N days`
    BeforeDays(u32),
}

impl Horizon {
    fn cutoff(&self, basis: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Horizon::LastHours(h) => basis - Duration::hours(i64::from(h)),
            Horizon::LastDays(d) | Horizon::BeforeDays(d) => basis - Duration::days(i64::from(d)),
        }
    }

    /// Whether a bucket starting at `ts` falls inside the window
    pub fn admits(&self, ts: DateTime<Utc>, basis: DateTime<Utc>) -> bool {
        let cutoff = self.cutoff(basis);
        match self {
            Horizon::LastHours(_) | Horizon::LastDays(_) => ts > cutoff,
            Horizon::BeforeDays(_) => ts < cutoff,
        }
    }

    /// Hour horizons read the hourly series, day horizons the daily one
    pub fn is_hourly(&self) -> bool {
        matches!(self, Horizon::LastHours(_))
    }
}

/// Filter `records` by time and rank.
///
/// `basis` defaults to now. Output keeps input order, which callers must not
/// rely on.
pub fn select(
    records: &[TimestampedStat],
    horizon: Horizon,
    basis: Option<DateTime<Utc>>,
    ranks: &RankFilter,
) -> Vec<TimestampedStat> {
    let basis = basis.unwrap_or_else(Utc::now);
    records
        .iter()
        .filter(|s| horizon.admits(s.timestamp, basis) && ranks.contains(s.rank))
        .cloned()
        .collect()
}

/// Both statistics series for one good
#[derive(Debug, Clone, Default)]
pub struct StatHistory {
    hourly: Vec<TimestampedStat>,
    daily: Vec<TimestampedStat>,
    /// Basis used when a query does not pass one
    basis_time: Option<DateTime<Utc>>,
}

impl StatHistory {
    pub fn new(hourly: Vec<TimestampedStat>, daily: Vec<TimestampedStat>) -> Self {
        Self {
            hourly,
            daily,
            basis_time: None,
        }
    }

    /// Pin the default basis time (replays, tests)
    pub fn with_basis_time(mut self, basis: DateTime<Utc>) -> Self {
        self.basis_time = Some(basis);
        self
    }

    pub fn hourly(&self) -> &[TimestampedStat] {
        &self.hourly
    }

    pub fn daily(&self) -> &[TimestampedStat] {
        &self.daily
    }

    pub fn is_empty(&self) -> bool {
        self.hourly.is_empty() && self.daily.is_empty()
    }

    /// Select from the series matching the horizon.
    ///
    /// Basis resolution: explicit argument, then the pinned basis, then now.
    pub fn window(
        &self,
        horizon: Horizon,
        basis: Option<DateTime<Utc>>,
        ranks: &RankFilter,
    ) -> Vec<TimestampedStat> {
        let series = if horizon.is_hourly() {
            &self.hourly
        } else {
            &self.daily
        };
        select(series, horizon, basis.or(self.basis_time), ranks)
    }

    /// Closed-trade volume over the last `hours` hours
    pub fn volume_for_last_hours(
        &self,
        hours: u32,
        basis: Option<DateTime<Utc>>,
        ranks: &RankFilter,
    ) -> u64 {
        self.window(Horizon::LastHours(hours), basis, ranks)
            .iter()
            .map(|s| s.volume)
            .sum()
    }

    /// Closed-trade volume over the last `days` days
    pub fn volume_for_last_days(
        &self,
        days: u32,
        basis: Option<DateTime<Utc>>,
        ranks: &RankFilter,
    ) -> u64 {
        self.window(Horizon::LastDays(days), basis, ranks)
            .iter()
            .map(|s| s.volume)
            .sum()
    }
}

//! Wall-clock trigger for flush cycles.
//!
//! The scheduler polls the local clock about once a second and fires each
//! configured time of day at most once per calendar day. Clock jumps (DST,
//! manual adjustment) can cause a trigger to be skipped or fired early; that
//! is a known limitation.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::dispatcher::{DigestDispatcher, FlushOutcome};
use crate::error::ScheduleError;

const TIME_FORMAT: &str = "%H:%M";

/// A time of day in 24h `HH:MM` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TriggerTime(NaiveTime);

impl TriggerTime {
    pub fn parse(s: &str) -> Result<Self, ScheduleError> {
        let s = s.trim();
        NaiveTime::parse_from_str(s, TIME_FORMAT)
            .map(Self)
            .map_err(|_| ScheduleError::InvalidTime(s.to_string()))
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }
}

impl FromStr for TriggerTime {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TriggerTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIME_FORMAT))
    }
}

/// Parse a comma-separated list like `"23:59, 08:00"`. Sorted, duplicates removed.
pub fn parse_trigger_times(list: &str) -> Result<Vec<TriggerTime>, ScheduleError> {
    let mut times = list
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(TriggerTime::parse)
        .collect::<Result<Vec<_>, _>>()?;

    times.sort();
    times.dedup();

    if times.is_empty() {
        return Err(ScheduleError::NoTriggers);
    }
    Ok(times)
}

#[derive(Debug)]
struct Trigger {
    at: TriggerTime,
    last_fired: Option<NaiveDate>,
}

/// Fires the dispatcher at configured times of day.
#[derive(Debug)]
pub struct DigestScheduler {
    triggers: Vec<Trigger>,
    poll_interval: Duration,
}

impl DigestScheduler {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

    /// Create a scheduler as of `now`.
    ///
    /// Triggers whose time has already passed today are treated as fired today,
    /// so starting late in the day does not flush immediately.
    pub fn new(times: Vec<TriggerTime>, now: NaiveDateTime) -> Result<Self, ScheduleError> {
        let mut times = times;
        times.sort();
        times.dedup();
        if times.is_empty() {
            return Err(ScheduleError::NoTriggers);
        }

        let triggers = times
            .into_iter()
            .map(|at| Trigger {
                at,
                last_fired: (now.time() >= at.time()).then_some(now.date()),
            })
            .collect();

        Ok(Self {
            triggers,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        })
    }

    /// Create a scheduler as of the current local time.
    pub fn starting_now(times: Vec<TriggerTime>) -> Result<Self, ScheduleError> {
        Self::new(times, Local::now().naive_local())
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn triggers(&self) -> Vec<TriggerTime> {
        self.triggers.iter().map(|t| t.at).collect()
    }

    /// Triggers that fire at `now`, marking them fired for `now`'s date.
    pub fn due(&mut self, now: NaiveDateTime) -> Vec<TriggerTime> {
        let today = now.date();
        let mut fired = Vec::new();

        for trigger in &mut self.triggers {
            if now.time() >= trigger.at.time() && trigger.last_fired != Some(today) {
                trigger.last_fired = Some(today);
                fired.push(trigger.at);
            }
        }

        fired
    }

    /// Poll the local clock until `shutdown` is cancelled, flushing once per
    /// wake-up in which any trigger fired.
    pub async fn run(self, dispatcher: DigestDispatcher, shutdown: CancellationToken) {
        self.run_with_clock(dispatcher, shutdown, || Local::now().naive_local())
            .await
    }

    /// Like [`run`](Self::run), reading wall-clock time from `now` on every tick.
    pub async fn run_with_clock<F>(
        mut self,
        dispatcher: DigestDispatcher,
        shutdown: CancellationToken,
        mut now: F,
    ) where
        F: FnMut() -> NaiveDateTime + Send,
    {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let triggers: Vec<String> = self.triggers().iter().map(ToString::to_string).collect();
        info!(?triggers, "Digest scheduler started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let fired = self.due(now());
            if fired.is_empty() {
                continue;
            }

            let fired: Vec<String> = fired.iter().map(ToString::to_string).collect();
            info!(triggers = ?fired, "Digest trigger fired");

            match dispatcher.flush().await {
                Ok(FlushOutcome::Empty) => info!("No new records since last digest"),
                Ok(FlushOutcome::Delivered { .. }) => {}
                Err(e) => error!(error = %e, "Scheduled flush failed"),
            }
        }

        info!("Digest scheduler stopped");
    }
}

//! Time sources, market-session calendar and trigger schedules
//!
//! All wall-clock reads in the engine go through the [`Clock`] trait so tests
//! can drive virtual time. Trigger specs are cron expressions interpreted in
//! the exchange's civil timezone.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use cron::Schedule;
use std::str::FromStr;
use std::sync::Mutex;

use crate::error::ConfigError;

/// Source of the current instant. Injected everywhere; no component calls
/// `Utc::now()` directly.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for tests.
pub struct SimClock {
    now: Mutex<DateTime<Utc>>,
}

impl SimClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut now = self.now.lock().expect("sim clock poisoned");
        *now += delta;
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        let mut now = self.now.lock().expect("sim clock poisoned");
        *now = instant;
    }
}

impl Clock for SimClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("sim clock poisoned")
    }
}

/// Exchange trading-session calendar.
///
/// Defaults model the NSE cash session: 09:15-15:30 local, Monday-Friday.
/// Exchange holidays are out of scope; the calendar only classifies weekday
/// session hours.
#[derive(Debug, Clone)]
pub struct MarketCalendar {
    tz: Tz,
    open: NaiveTime,
    close: NaiveTime,
}

impl MarketCalendar {
    pub fn new(tz: Tz, open: NaiveTime, close: NaiveTime) -> Self {
        Self { tz, open, close }
    }

    pub fn nse(tz: Tz) -> Self {
        Self {
            tz,
            open: NaiveTime::from_hms_opt(9, 15, 0).expect("valid session open"),
            close: NaiveTime::from_hms_opt(15, 30, 0).expect("valid session close"),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Whether `ts` falls inside the trading session.
    pub fn in_session(&self, ts: DateTime<Utc>) -> bool {
        let local = ts.with_timezone(&self.tz);
        if !self.is_trading_day(local.date_naive()) {
            return false;
        }
        let t = local.time();
        t >= self.open && t <= self.close
    }

    /// Session open/close for a local calendar day, as UTC instants. `None`
    /// on non-trading days.
    pub fn session_bounds(&self, day: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        if !self.is_trading_day(day) {
            return None;
        }
        let open = self
            .tz
            .from_local_datetime(&day.and_time(self.open))
            .single()?;
        let close = self
            .tz
            .from_local_datetime(&day.and_time(self.close))
            .single()?;
        Some((open.with_timezone(&Utc), close.with_timezone(&Utc)))
    }
}

/// A named cron schedule evaluated in the exchange timezone.
///
/// `session_only` specs skip fire times that land outside the trading
/// session, so "every 5 minutes during market hours" stays a single
/// expression.
#[derive(Debug, Clone)]
pub struct TriggerSpec {
    schedule: Schedule,
    tz: Tz,
    session_only: bool,
}

impl TriggerSpec {
    pub fn parse(
        trigger: &str,
        expr: &str,
        tz: Tz,
        session_only: bool,
    ) -> Result<Self, ConfigError> {
        let schedule = Schedule::from_str(expr).map_err(|e| ConfigError::InvalidCron {
            trigger: trigger.to_string(),
            expr: expr.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            schedule,
            tz,
            session_only,
        })
    }

    /// Next fire strictly after `after`, or `None` if the schedule is
    /// exhausted (finite year ranges only).
    pub fn next_fire(
        &self,
        after: DateTime<Utc>,
        calendar: &MarketCalendar,
    ) -> Option<DateTime<Utc>> {
        let local = after.with_timezone(&self.tz);
        // A session-only spec may skip a whole weekend of fires; the bound
        // only guards against a schedule that never intersects the session.
        for fire in self.schedule.after(&local).take(10_000) {
            let fire_utc = fire.with_timezone(&Utc);
            if !self.session_only || calendar.in_session(fire_utc) {
                return Some(fire_utc);
            }
        }
        None
    }
}

//! Session Clock
//!
//! Pure mapping from wall-clock time to the active trading session.
//!
//! ## What a session is
//! The reference trading day is divided into named windows (Asia, London,
//! New York, post-close) defined in a fixed reference timezone. Certain
//! sessions open with an **Initial Balance (IB)** sub-window whose high/low
//! establishes a reference range for the rest of that session.
//!
//! ## Weekend closure
//! The market is closed from the Friday close cutover through the Sunday
//! open cutover. Inside that span every query resolves to the dedicated
//! `Weekend` window and IB is never active.
//!
//! ## Midnight wraparound
//! Exactly one session may cross midnight. It is matched with
//! `t >= start || t < end`, and minutes-into-session for the post-midnight
//! half is `(1440 - start) + t`.
//!
//! ## Determinism
//! `resolve` and `resolve_next` are pure: no I/O, no hidden clock reads.
//! They are safe to call at arbitrarily high frequency. All mutable
//! session state (levels, IB prices) lives in [`crate::store`], not here.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MINUTES_PER_DAY: u16 = 1440;

/// Identifier for a tracked session window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKey {
    Asia,
    London,
    NewYork,
    PostClose,
    Weekend,
}

impl SessionKey {
    /// Every key the state store tracks, weekend included.
    pub const ALL: [SessionKey; 5] = [
        SessionKey::Asia,
        SessionKey::London,
        SessionKey::NewYork,
        SessionKey::PostClose,
        SessionKey::Weekend,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            SessionKey::Asia => 0,
            SessionKey::London => 1,
            SessionKey::NewYork => 2,
            SessionKey::PostClose => 3,
            SessionKey::Weekend => 4,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionKey::Asia => "Asia",
            SessionKey::London => "London",
            SessionKey::NewYork => "NewYork",
            SessionKey::PostClose => "PostClose",
            SessionKey::Weekend => "Weekend",
        };
        f.write_str(s)
    }
}

impl FromStr for SessionKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Asia" => Ok(SessionKey::Asia),
            "London" => Ok(SessionKey::London),
            "NewYork" => Ok(SessionKey::NewYork),
            "PostClose" => Ok(SessionKey::PostClose),
            "Weekend" => Ok(SessionKey::Weekend),
            other => Err(anyhow::anyhow!("invalid SessionKey value: {}", other)),
        }
    }
}

/// Static definition of one session window in the reference timezone.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionDefinition {
    pub key: SessionKey,
    pub name: String,
    /// Open, minutes since reference-day midnight.
    pub start_minute: u16,
    /// Close (exclusive), minutes since reference-day midnight.
    pub end_minute: u16,
    pub crosses_midnight: bool,
    /// 0 disables the Initial Balance window for this session.
    pub ib_duration_minutes: u16,
    pub focus_instruments: Vec<String>,
}

impl SessionDefinition {
    fn duration_minutes(&self) -> u16 {
        if self.crosses_midnight {
            (MINUTES_PER_DAY - self.start_minute) + self.end_minute
        } else {
            self.end_minute - self.start_minute
        }
    }

    fn contains(&self, t: u16) -> bool {
        if self.crosses_midnight {
            t >= self.start_minute || t < self.end_minute
        } else {
            t >= self.start_minute && t < self.end_minute
        }
    }
}

/// Weekend closure cutovers in the reference timezone.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct WeekendCutover {
    /// Friday minute at which the market closes for the weekend.
    pub friday_close_minute: u16,
    /// Sunday minute at which the market reopens.
    pub sunday_open_minute: u16,
}

/// The resolved session for one instant. Computed fresh per query,
/// never persisted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionWindow {
    pub key: SessionKey,
    pub name: String,
    pub is_initial_balance: bool,
    pub ib_minutes_remaining: u16,
    pub minutes_into_session: u16,
    /// Minutes since midnight in the reference timezone.
    pub local_minute: u16,
    pub weekday: Weekday,
}

/// The upcoming session plus the wait until it opens.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NextSession {
    pub definition: SessionDefinition,
    pub minutes_until: u16,
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("schedule has no session definitions")]
    Empty,

    #[error("invalid utc offset: {0} hours")]
    BadOffset(i32),

    #[error("session {key} has out-of-range minutes ({start}..{end})")]
    BadWindow { key: SessionKey, start: u16, end: u16 },

    #[error("session {key} midnight-crossing flag disagrees with its window")]
    BadCrossing { key: SessionKey },

    #[error("no session covers reference minute {minute}")]
    Gap { minute: u16 },

    #[error("reference minute {minute} is covered by more than one session")]
    Overlap { minute: u16 },

    #[error("session {key} initial balance ({ib} min) exceeds its duration")]
    IbTooLong { key: SessionKey, ib: u16 },
}

/// Validated, ordered set of session definitions plus the weekend rule.
///
/// Construction proves the definitions partition the full 1440-minute
/// reference day, so `resolve` can never miss.
#[derive(Clone, Debug)]
pub struct SessionSchedule {
    offset: FixedOffset,
    /// Sorted ascending by `start_minute`.
    definitions: Vec<SessionDefinition>,
    weekend: WeekendCutover,
}

impl SessionSchedule {
    pub fn new(
        utc_offset_hours: i32,
        mut definitions: Vec<SessionDefinition>,
        weekend: WeekendCutover,
    ) -> Result<Self, ScheduleError> {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
            .ok_or(ScheduleError::BadOffset(utc_offset_hours))?;

        if definitions.is_empty() {
            return Err(ScheduleError::Empty);
        }

        for def in &definitions {
            if def.start_minute >= MINUTES_PER_DAY || def.end_minute >= MINUTES_PER_DAY {
                return Err(ScheduleError::BadWindow {
                    key: def.key,
                    start: def.start_minute,
                    end: def.end_minute,
                });
            }
            if def.crosses_midnight != (def.end_minute <= def.start_minute) {
                return Err(ScheduleError::BadCrossing { key: def.key });
            }
            if def.ib_duration_minutes > def.duration_minutes() {
                return Err(ScheduleError::IbTooLong {
                    key: def.key,
                    ib: def.ib_duration_minutes,
                });
            }
        }

        // Exhaustive partition check over the reference day.
        for minute in 0..MINUTES_PER_DAY {
            let hits = definitions.iter().filter(|d| d.contains(minute)).count();
            match hits {
                0 => return Err(ScheduleError::Gap { minute }),
                1 => {}
                _ => return Err(ScheduleError::Overlap { minute }),
            }
        }

        definitions.sort_by_key(|d| d.start_minute);

        Ok(Self {
            offset,
            definitions,
            weekend,
        })
    }

    /// Built-in futures-style reference schedule in US Eastern time:
    /// Asia 18:00-03:00 (crosses midnight, IB 60), London 03:00-09:30
    /// (IB 60), New York 09:30-16:00 (IB 30), post-close 16:00-18:00.
    /// Weekend closure Friday 17:00 through Sunday 18:00.
    pub fn default_futures() -> Self {
        let definitions = vec![
            SessionDefinition {
                key: SessionKey::Asia,
                name: "Asia".to_string(),
                start_minute: 18 * 60,
                end_minute: 3 * 60,
                crosses_midnight: true,
                ib_duration_minutes: 60,
                focus_instruments: vec!["NKY".to_string(), "USDJPY".to_string()],
            },
            SessionDefinition {
                key: SessionKey::London,
                name: "London".to_string(),
                start_minute: 3 * 60,
                end_minute: 9 * 60 + 30,
                crosses_midnight: false,
                ib_duration_minutes: 60,
                focus_instruments: vec!["DAX".to_string(), "DXY".to_string()],
            },
            SessionDefinition {
                key: SessionKey::NewYork,
                name: "New York".to_string(),
                start_minute: 9 * 60 + 30,
                end_minute: 16 * 60,
                crosses_midnight: false,
                ib_duration_minutes: 30,
                focus_instruments: vec!["SPX".to_string(), "NDX".to_string(), "VIX".to_string()],
            },
            SessionDefinition {
                key: SessionKey::PostClose,
                name: "Post-Close".to_string(),
                start_minute: 16 * 60,
                end_minute: 18 * 60,
                crosses_midnight: false,
                ib_duration_minutes: 0,
                focus_instruments: vec!["ES".to_string()],
            },
        ];

        let weekend = WeekendCutover {
            friday_close_minute: 17 * 60,
            sunday_open_minute: 18 * 60,
        };

        // The built-in table partitions the day; keep it under the same
        // validation as user-supplied schedules.
        match Self::new(-5, definitions, weekend) {
            Ok(s) => s,
            Err(e) => unreachable!("built-in schedule failed validation: {e}"),
        }
    }

    pub fn definitions(&self) -> &[SessionDefinition] {
        &self.definitions
    }

    /// Resolve the active session for `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> SessionWindow {
        let local = now.with_timezone(&self.offset);
        let weekday = local.weekday();
        let t = (local.hour() * 60 + local.minute()) as u16;

        if self.in_weekend(weekday, t) {
            return SessionWindow {
                key: SessionKey::Weekend,
                name: "Weekend".to_string(),
                is_initial_balance: false,
                ib_minutes_remaining: 0,
                minutes_into_session: 0,
                local_minute: t,
                weekday,
            };
        }

        let def = self.definition_at(t);
        let minutes_into = if def.crosses_midnight && t < def.end_minute {
            (MINUTES_PER_DAY - def.start_minute) + t
        } else {
            t - def.start_minute
        };

        let ib_active = def.ib_duration_minutes > 0 && minutes_into < def.ib_duration_minutes;
        let ib_remaining = if ib_active {
            def.ib_duration_minutes - minutes_into
        } else {
            0
        };

        SessionWindow {
            key: def.key,
            name: def.name.clone(),
            is_initial_balance: ib_active,
            ib_minutes_remaining: ib_remaining,
            minutes_into_session: minutes_into,
            local_minute: t,
            weekday,
        }
    }

    /// Resolve the next session in cyclical order after the current one.
    ///
    /// During the weekend the next session is the one that opens at the
    /// Sunday cutover. `minutes_until` wraps by a full day when the target
    /// start is not strictly after the current reference minute.
    pub fn resolve_next(&self, now: DateTime<Utc>) -> NextSession {
        let local = now.with_timezone(&self.offset);
        let weekday = local.weekday();
        let t = (local.hour() * 60 + local.minute()) as u16;

        let target = if self.in_weekend(weekday, t) {
            self.definition_at(self.weekend.sunday_open_minute)
        } else {
            let current = self.definition_at(t);
            let pos = self
                .definitions
                .iter()
                .position(|d| d.key == current.key)
                .unwrap_or(0);
            &self.definitions[(pos + 1) % self.definitions.len()]
        };

        let minutes_until = if target.start_minute > t {
            target.start_minute - t
        } else {
            (MINUTES_PER_DAY - t) + target.start_minute
        };

        NextSession {
            definition: target.clone(),
            minutes_until,
        }
    }

    fn in_weekend(&self, weekday: Weekday, t: u16) -> bool {
        match weekday {
            Weekday::Sat => true,
            Weekday::Fri => t >= self.weekend.friday_close_minute,
            Weekday::Sun => t < self.weekend.sunday_open_minute,
            _ => false,
        }
    }

    /// Definition containing reference minute `t`. Total by construction:
    /// `new` proved the definitions partition the day.
    fn definition_at(&self, t: u16) -> &SessionDefinition {
        match self.definitions.iter().find(|d| d.contains(t)) {
            Some(def) => def,
            None => unreachable!("validated schedule left minute {t} uncovered"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn schedule() -> SessionSchedule {
        SessionSchedule::default_futures()
    }

    /// Build a UTC instant from a reference-timezone (ET) wall-clock time.
    /// 2024-01-08 is a Monday.
    fn et(day: u32, hh: u32, mm: u32) -> DateTime<Utc> {
        FixedOffset::east_opt(-5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, day, hh, mm, 0)
            .unwrap()
            .to_utc()
    }

    #[test]
    fn resolves_each_session_at_sample_times() {
        let s = schedule();

        assert_eq!(s.resolve(et(8, 20, 0)).key, SessionKey::Asia);
        assert_eq!(s.resolve(et(9, 1, 30)).key, SessionKey::Asia); // post-midnight half
        assert_eq!(s.resolve(et(8, 5, 0)).key, SessionKey::London);
        assert_eq!(s.resolve(et(8, 10, 0)).key, SessionKey::NewYork);
        assert_eq!(s.resolve(et(8, 16, 30)).key, SessionKey::PostClose);
    }

    #[test]
    fn midnight_crossing_resolves_same_session_on_both_sides() {
        let s = schedule();

        let before = s.resolve(et(9, 23, 59));
        let after = s.resolve(et(10, 0, 1));

        assert_eq!(before.key, SessionKey::Asia);
        assert_eq!(after.key, SessionKey::Asia);
    }

    #[test]
    fn crossing_session_minutes_into_session_spans_midnight() {
        let s = schedule();

        // Asia opens 18:00; 00:30 is 390 minutes in.
        let w = s.resolve(et(10, 0, 30));
        assert_eq!(w.key, SessionKey::Asia);
        assert_eq!(w.minutes_into_session, (1440 - 1080) + 30);
        assert!(!w.is_initial_balance);
    }

    #[test]
    fn weekend_closure_boundaries() {
        let s = schedule();

        // Friday 2024-01-12.
        assert_eq!(s.resolve(et(12, 16, 59)).key, SessionKey::PostClose);
        assert_eq!(s.resolve(et(12, 17, 0)).key, SessionKey::Weekend);
        // Saturday.
        assert_eq!(s.resolve(et(13, 12, 0)).key, SessionKey::Weekend);
        // Sunday reopen at 18:00.
        assert_eq!(s.resolve(et(14, 17, 59)).key, SessionKey::Weekend);
        assert_eq!(s.resolve(et(14, 18, 0)).key, SessionKey::Asia);
    }

    #[test]
    fn weekend_window_never_reports_initial_balance() {
        let s = schedule();
        let w = s.resolve(et(13, 18, 30));
        assert_eq!(w.key, SessionKey::Weekend);
        assert!(!w.is_initial_balance);
        assert_eq!(w.ib_minutes_remaining, 0);
    }

    #[test]
    fn ib_active_through_window_and_remaining_strictly_decreases() {
        let s = schedule();
        // New York IB is 30 minutes from 09:30.
        let mut last_remaining = u16::MAX;

        for m in 0..30u32 {
            let w = s.resolve(et(8, 9, 30) + chrono::Duration::minutes(m as i64));
            assert!(w.is_initial_balance, "minute {m} should be inside IB");
            assert_eq!(w.ib_minutes_remaining, 30 - m as u16);
            assert!(w.ib_minutes_remaining < last_remaining);
            last_remaining = w.ib_minutes_remaining;
        }

        let done = s.resolve(et(8, 10, 0));
        assert!(!done.is_initial_balance);
        assert_eq!(done.ib_minutes_remaining, 0);
    }

    #[test]
    fn zero_ib_session_never_reports_initial_balance() {
        let s = schedule();
        let w = s.resolve(et(8, 16, 0));
        assert_eq!(w.key, SessionKey::PostClose);
        assert!(!w.is_initial_balance);
    }

    #[test]
    fn crossing_session_ib_is_active_only_at_the_open() {
        let s = schedule();

        let open = s.resolve(et(8, 18, 30));
        assert_eq!(open.key, SessionKey::Asia);
        assert!(open.is_initial_balance);
        assert_eq!(open.ib_minutes_remaining, 30);

        let late = s.resolve(et(9, 2, 0));
        assert_eq!(late.key, SessionKey::Asia);
        assert!(!late.is_initial_balance);
    }

    #[test]
    fn next_session_same_day() {
        let s = schedule();
        // Monday 10:00 -> Post-Close opens 16:00.
        let next = s.resolve_next(et(8, 10, 0));
        assert_eq!(next.definition.key, SessionKey::PostClose);
        assert_eq!(next.minutes_until, 360);
    }

    #[test]
    fn next_session_wraps_past_midnight() {
        let s = schedule();
        // Tuesday 23:00, inside Asia -> London opens 03:00 tomorrow.
        let next = s.resolve_next(et(9, 23, 0));
        assert_eq!(next.definition.key, SessionKey::London);
        assert_eq!(next.minutes_until, 240);
    }

    #[test]
    fn next_session_from_weekend_jumps_to_sunday_open() {
        let s = schedule();
        // Saturday 12:00 -> Asia, which opens at the Sunday 18:00 cutover.
        let next = s.resolve_next(et(13, 12, 0));
        assert_eq!(next.definition.key, SessionKey::Asia);
        assert_eq!(next.minutes_until, 360);
    }

    #[test]
    fn gap_in_schedule_is_rejected() {
        let defs = vec![SessionDefinition {
            key: SessionKey::NewYork,
            name: "rth".to_string(),
            start_minute: 570,
            end_minute: 960,
            crosses_midnight: false,
            ib_duration_minutes: 30,
            focus_instruments: vec![],
        }];
        let weekend = WeekendCutover {
            friday_close_minute: 1020,
            sunday_open_minute: 1080,
        };

        let err = SessionSchedule::new(-5, defs, weekend).unwrap_err();
        assert!(matches!(err, ScheduleError::Gap { .. }));
    }

    #[test]
    fn overlapping_schedule_is_rejected() {
        let mut defs = schedule().definitions().to_vec();
        defs.push(SessionDefinition {
            key: SessionKey::London,
            name: "dup".to_string(),
            start_minute: 240,
            end_minute: 300,
            crosses_midnight: false,
            ib_duration_minutes: 0,
            focus_instruments: vec![],
        });
        let weekend = WeekendCutover {
            friday_close_minute: 1020,
            sunday_open_minute: 1080,
        };

        let err = SessionSchedule::new(-5, defs, weekend).unwrap_err();
        assert!(matches!(err, ScheduleError::Overlap { .. }));
    }

    #[test]
    fn oversized_ib_is_rejected() {
        let mut defs = schedule().definitions().to_vec();
        for d in &mut defs {
            if d.key == SessionKey::PostClose {
                d.ib_duration_minutes = 500; // window is only 120 minutes
            }
        }
        let weekend = WeekendCutover {
            friday_close_minute: 1020,
            sunday_open_minute: 1080,
        };

        let err = SessionSchedule::new(-5, defs, weekend).unwrap_err();
        assert!(matches!(err, ScheduleError::IbTooLong { .. }));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Every instant of the week resolves to exactly one window,
            /// and re-resolving the same instant is identical.
            #[test]
            fn every_minute_of_week_resolves(minute_of_week in 0u32..(7 * 1440)) {
                let s = schedule();
                let base = et(8, 0, 0); // Monday 00:00 ET
                let now = base + chrono::Duration::minutes(minute_of_week as i64);

                let a = s.resolve(now);
                let b = s.resolve(now);

                prop_assert_eq!(a.key, b.key);
                prop_assert_eq!(a.local_minute, b.local_minute);
                prop_assert_eq!(a.local_minute as u32, minute_of_week % 1440);
            }

            /// IB can only ever be reported inside the session's IB span.
            #[test]
            fn ib_only_inside_configured_span(minute_of_week in 0u32..(7 * 1440)) {
                let s = schedule();
                let base = et(8, 0, 0);
                let now = base + chrono::Duration::minutes(minute_of_week as i64);

                let w = s.resolve(now);
                if w.is_initial_balance {
                    let def = s
                        .definitions()
                        .iter()
                        .find(|d| d.key == w.key)
                        .expect("resolved key must be defined");
                    prop_assert!(def.ib_duration_minutes > 0);
                    prop_assert!(w.minutes_into_session < def.ib_duration_minutes);
                    prop_assert_eq!(
                        w.ib_minutes_remaining,
                        def.ib_duration_minutes - w.minutes_into_session
                    );
                }
            }
        }
    }
}

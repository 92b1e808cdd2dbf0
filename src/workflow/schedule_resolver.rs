use std::sync::Arc;

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Timelike, Utc, Weekday};
use tracing::{debug, warn};

use crate::error::{PermitError, PermitResult};
use crate::model::schedule::Schedule;
use crate::workflow::ports::AcademicDirectory;

/// A request instant seen on the school's wall clock, truncated to the minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalSlot {
    pub weekday: Weekday,
    pub time: NaiveTime,
}

impl LocalSlot {
    pub fn at(instant: DateTime<Utc>, offset: FixedOffset) -> Self {
        let local = instant.with_timezone(&offset);
        let time = local.time();
        let time = NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time);

        Self {
            weekday: local.weekday(),
            time,
        }
    }

    pub fn day_of_week(&self) -> u8 {
        self.weekday.number_from_monday() as u8
    }

    pub fn is_school_day(&self) -> bool {
        !matches!(self.weekday, Weekday::Sat | Weekday::Sun)
    }
}

/// True when periods sorted by start share more than a boundary minute.
fn overlaps(sorted: &[Schedule]) -> bool {
    sorted
        .windows(2)
        .any(|pair| pair[1].start_time < pair[0].end_time)
}

/// Picks the period containing `slot` (both ends inclusive).
///
/// Overlapping periods are a data fault upstream; the earliest-starting one is used
/// and the conflict is logged.
pub fn pick_period(slot: LocalSlot, candidates: Vec<Schedule>) -> PermitResult<Schedule> {
    let mut matches: Vec<Schedule> = candidates
        .into_iter()
        .filter(|s| s.day_of_week == slot.day_of_week())
        .filter(|s| s.start_time <= slot.time && slot.time <= s.end_time)
        .collect();

    matches.sort_by_key(|s| (s.start_time, s.id));

    if matches.len() > 1 {
        let ids: Vec<u64> = matches.iter().map(|s| s.id).collect();
        if overlaps(&matches) {
            warn!(
                schedule_ids = ?ids,
                class_id = matches[0].class_id,
                time = %slot.time,
                "Overlapping lesson periods, using the earliest"
            );
        } else {
            debug!(
                schedule_ids = ?ids,
                time = %slot.time,
                "Request on a period boundary, using the earlier period"
            );
        }
    }

    matches
        .into_iter()
        .next()
        .ok_or(PermitError::NoScheduleMatch)
}

#[derive(Clone)]
pub struct ScheduleResolver {
    directory: Arc<dyn AcademicDirectory>,
    offset: FixedOffset,
}

impl ScheduleResolver {
    pub fn new(directory: Arc<dyn AcademicDirectory>, offset: FixedOffset) -> Self {
        Self { directory, offset }
    }

    /// Finds the lesson period of `class_id` running at `request_time`.
    pub async fn resolve(
        &self,
        request_time: DateTime<Utc>,
        class_id: u64,
        academic_year_id: u64,
    ) -> PermitResult<Schedule> {
        let slot = LocalSlot::at(request_time, self.offset);
        if !slot.is_school_day() {
            return Err(PermitError::HolidayError);
        }

        let candidates = self
            .directory
            .schedules_on(class_id, academic_year_id, slot.day_of_week())
            .await?;

        debug!(
            class_id,
            weekday = %slot.weekday,
            time = %slot.time,
            candidates = candidates.len(),
            "Resolving lesson period"
        );

        pick_period(slot, candidates)
    }
}

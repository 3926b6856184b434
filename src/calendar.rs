use crate::error::{ScheduleError, ScheduleResult};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Company-wide leave covering `start..=end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl HolidayInterval {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            name: None,
        }
    }

    pub fn single(date: NaiveDate) -> Self {
        Self::new(date, date)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Working weekdays plus holiday intervals. The effective holiday set is the
/// union of every interval, so overlapping or adjacent intervals are fine.
///
/// The union is kept as sorted, disjoint, non-adjacent spans. Lookups are a
/// binary search and stepping jumps over a whole span at once, so interval
/// length never matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WorkCalendarConfig", into = "WorkCalendarConfig")]
pub struct WorkCalendar {
    working_days: HashSet<Weekday>,
    holidays: Vec<HolidayInterval>,
    holiday_spans: Vec<(NaiveDate, NaiveDate)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCalendarConfig {
    working_days: Vec<Weekday>,
    #[serde(default)]
    holidays: Vec<HolidayInterval>,
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self::monday_to_friday()
    }
}

impl WorkCalendar {
    const ALL_WEEKDAYS: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    pub fn new<I, J>(working_days: I, holidays: J) -> ScheduleResult<Self>
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = HolidayInterval>,
    {
        let working_days: HashSet<Weekday> = working_days.into_iter().collect();
        if working_days.is_empty() {
            return Err(ScheduleError::Configuration(
                "work calendar requires at least one working day".into(),
            ));
        }
        let mut calendar = Self {
            working_days,
            holidays: Vec::new(),
            holiday_spans: Vec::new(),
        };
        for interval in holidays {
            Self::check_interval(&interval)?;
            calendar.holidays.push(interval);
        }
        calendar.rebuild_spans();
        Ok(calendar)
    }

    pub fn monday_to_friday() -> Self {
        Self {
            working_days: Self::ALL_WEEKDAYS[..5].iter().copied().collect(),
            holidays: Vec::new(),
            holiday_spans: Vec::new(),
        }
    }

    pub fn every_day() -> Self {
        Self {
            working_days: Self::ALL_WEEKDAYS.iter().copied().collect(),
            holidays: Vec::new(),
            holiday_spans: Vec::new(),
        }
    }

    pub fn from_config(config: &WorkCalendarConfig) -> ScheduleResult<Self> {
        Self::new(
            config.working_days.iter().copied(),
            config.holidays.iter().cloned(),
        )
    }

    pub fn to_config(&self) -> WorkCalendarConfig {
        WorkCalendarConfig::from(self)
    }

    /// Working weekdays ordered Monday first.
    pub fn working_days(&self) -> Vec<Weekday> {
        Self::ALL_WEEKDAYS
            .iter()
            .copied()
            .filter(|day| self.working_days.contains(day))
            .collect()
    }

    pub fn holidays(&self) -> &[HolidayInterval] {
        &self.holidays
    }

    pub fn set_working_days<I>(&mut self, days: I) -> ScheduleResult<()>
    where
        I: IntoIterator<Item = Weekday>,
    {
        let days: HashSet<Weekday> = days.into_iter().collect();
        if days.is_empty() {
            return Err(ScheduleError::Configuration(
                "work calendar requires at least one working day".into(),
            ));
        }
        self.working_days = days;
        Ok(())
    }

    pub fn add_holiday_interval(&mut self, interval: HolidayInterval) -> ScheduleResult<()> {
        Self::check_interval(&interval)?;
        self.holidays.push(interval);
        self.rebuild_spans();
        Ok(())
    }

    pub fn add_holiday(&mut self, date: NaiveDate) {
        self.holidays.push(HolidayInterval::single(date));
        self.rebuild_spans();
    }

    /// Drops every interval overlapping `start..=end` and rebuilds the
    /// holiday spans from what remains.
    pub fn remove_holidays_between(&mut self, start: NaiveDate, end: NaiveDate) -> usize {
        let before = self.holidays.len();
        self.holidays
            .retain(|interval| interval.end < start || interval.start > end);
        self.rebuild_spans();
        before - self.holidays.len()
    }

    fn check_interval(interval: &HolidayInterval) -> ScheduleResult<()> {
        if interval.end < interval.start {
            return Err(ScheduleError::Configuration(format!(
                "holiday interval ends {} before it starts {}",
                interval.end, interval.start
            )));
        }
        Ok(())
    }

    fn rebuild_spans(&mut self) {
        let mut intervals: Vec<(NaiveDate, NaiveDate)> = self
            .holidays
            .iter()
            .map(|interval| (interval.start, interval.end))
            .collect();
        intervals.sort_unstable();

        let mut spans: Vec<(NaiveDate, NaiveDate)> = Vec::with_capacity(intervals.len());
        for (start, end) in intervals {
            match spans.last_mut() {
                // Overlapping or adjacent; a span ending on MAX swallows the rest.
                Some(last) if last.1.succ_opt().is_none_or(|next| start <= next) => {
                    last.1 = last.1.max(end);
                }
                _ => spans.push((start, end)),
            }
        }
        self.holiday_spans = spans;
    }

    fn holiday_span_at(&self, date: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let idx = self.holiday_spans.partition_point(|(start, _)| *start <= date);
        idx.checked_sub(1)
            .map(|i| self.holiday_spans[i])
            .filter(|(_, end)| date <= *end)
    }

    pub fn is_working_weekday(&self, date: NaiveDate) -> bool {
        self.working_days.contains(&date.weekday())
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holiday_span_at(date).is_some()
    }

    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        self.is_working_weekday(date) && !self.is_holiday(date)
    }

    /// Smallest business day strictly after `date`, or
    /// `ScheduleError::DateOutOfRange` when none exists before
    /// `NaiveDate::MAX`.
    pub fn next_business_day(&self, date: NaiveDate) -> ScheduleResult<NaiveDate> {
        let mut current = Self::day_after(date)?;
        loop {
            if let Some((_, end)) = self.holiday_span_at(current) {
                current = Self::day_after(end)?;
            } else if !self.is_working_weekday(current) {
                current = Self::day_after(current)?;
            } else {
                return Ok(current);
            }
        }
    }

    /// Largest business day strictly before `date`.
    pub fn previous_business_day(&self, date: NaiveDate) -> ScheduleResult<NaiveDate> {
        let mut current = Self::day_before(date)?;
        loop {
            if let Some((start, _)) = self.holiday_span_at(current) {
                current = Self::day_before(start)?;
            } else if !self.is_working_weekday(current) {
                current = Self::day_before(current)?;
            } else {
                return Ok(current);
            }
        }
    }

    /// `date` itself when it is a business day, otherwise the next one.
    pub fn roll_forward(&self, date: NaiveDate) -> ScheduleResult<NaiveDate> {
        if self.is_business_day(date) {
            Ok(date)
        } else {
            self.next_business_day(date)
        }
    }

    /// `date` itself when it is a business day, otherwise the previous one.
    pub fn roll_backward(&self, date: NaiveDate) -> ScheduleResult<NaiveDate> {
        if self.is_business_day(date) {
            Ok(date)
        } else {
            self.previous_business_day(date)
        }
    }

    /// Applies `next_business_day` `n` times. With `n <= 0` the date is only
    /// rolled forward when it is not already a business day.
    pub fn add_business_days(&self, date: NaiveDate, n: i64) -> ScheduleResult<NaiveDate> {
        if n <= 0 {
            return self.roll_forward(date);
        }
        if n > (NaiveDate::MAX - date).num_days() {
            return Err(ScheduleError::DateOutOfRange(date));
        }
        let mut current = date;
        for _ in 0..n {
            current = self.next_business_day(current)?;
        }
        Ok(current)
    }

    /// Backward mirror of [`WorkCalendar::add_business_days`].
    pub fn subtract_business_days(&self, date: NaiveDate, n: i64) -> ScheduleResult<NaiveDate> {
        if n <= 0 {
            return self.roll_backward(date);
        }
        if n > (date - NaiveDate::MIN).num_days() {
            return Err(ScheduleError::DateOutOfRange(date));
        }
        let mut current = date;
        for _ in 0..n {
            current = self.previous_business_day(current)?;
        }
        Ok(current)
    }

    fn day_after(date: NaiveDate) -> ScheduleResult<NaiveDate> {
        date.succ_opt().ok_or(ScheduleError::DateOutOfRange(date))
    }

    fn day_before(date: NaiveDate) -> ScheduleResult<NaiveDate> {
        date.pred_opt().ok_or(ScheduleError::DateOutOfRange(date))
    }

    /// Signed count of business days in `(from, to]`; negative when `to`
    /// precedes `from`.
    pub fn business_days_between(&self, from: NaiveDate, to: NaiveDate) -> i64 {
        if from == to {
            return 0;
        }
        let (start, end, sign) = if from < to {
            (from, to, 1)
        } else {
            (to, from, -1)
        };
        let count = start
            .iter_days()
            .skip(1)
            .take_while(|date| *date <= end)
            .filter(|date| self.is_business_day(*date))
            .count() as i64;
        count * sign
    }

    /// Business days in `start..=end`.
    pub fn count_business_days(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        start
            .iter_days()
            .take_while(|date| *date <= end)
            .filter(|date| self.is_business_day(*date))
            .count() as i64
    }

    /// Holiday dates in `start..=end` that fall on a working weekday, i.e.
    /// the days a holiday actually takes out of a schedule window.
    pub fn count_business_days_in_holidays(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        if end < start {
            return 0;
        }
        start
            .iter_days()
            .take_while(|date| *date <= end)
            .filter(|date| self.is_working_weekday(*date) && self.is_holiday(*date))
            .count() as i64
    }
}

impl WorkCalendarConfig {
    pub fn new<I, J>(working_days: I, holidays: J) -> Self
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = HolidayInterval>,
    {
        let mut working: Vec<Weekday> = working_days.into_iter().collect();
        working.sort_by_key(|wd| wd.num_days_from_monday());
        working.dedup();

        let mut holidays: Vec<HolidayInterval> = holidays.into_iter().collect();
        holidays.sort_by_key(|interval| (interval.start, interval.end));
        holidays.dedup();

        Self {
            working_days: working,
            holidays,
        }
    }

    pub fn working_days(&self) -> &[Weekday] {
        &self.working_days
    }

    pub fn holidays(&self) -> &[HolidayInterval] {
        &self.holidays
    }
}

impl Default for WorkCalendarConfig {
    fn default() -> Self {
        WorkCalendarConfig::from(&WorkCalendar::default())
    }
}

impl From<&WorkCalendar> for WorkCalendarConfig {
    fn from(calendar: &WorkCalendar) -> Self {
        WorkCalendarConfig::new(calendar.working_days(), calendar.holidays.iter().cloned())
    }
}

impl From<WorkCalendar> for WorkCalendarConfig {
    fn from(calendar: WorkCalendar) -> Self {
        WorkCalendarConfig::from(&calendar)
    }
}

impl TryFrom<WorkCalendarConfig> for WorkCalendar {
    type Error = ScheduleError;

    fn try_from(config: WorkCalendarConfig) -> Result<Self, Self::Error> {
        WorkCalendar::from_config(&config)
    }
}

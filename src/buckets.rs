//! Time bucketing for the time-series views.
//!
//! A [`BucketGrid`] covers the span of the data with fixed-width day buckets
//! anchored at local midnight of the earliest message. Every bucket between
//! the first and the last message exists even when nothing falls into it.

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};

const SECONDS_PER_DAY: u32 = 86_400;
const MINUTES_PER_DAY: u32 = 1_440;

/// Fixed-width day buckets over a closed time span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketGrid {
    anchor: NaiveDateTime,
    width_days: i64,
    len: usize,
}

impl BucketGrid {
    /// Grid anchored at midnight of `earliest` reaching at least `latest`.
    ///
    /// A width of zero is treated as one day.
    #[must_use]
    pub fn spanning(earliest: NaiveDateTime, latest: NaiveDateTime, width_days: u32) -> Self {
        let anchor = earliest.date().and_time(NaiveTime::default());
        let width_days = i64::from(width_days.max(1));
        let elapsed_days = (latest - anchor).num_days().max(0);
        let len = usize::try_from(elapsed_days / width_days).unwrap_or(0) + 1;
        Self {
            anchor,
            width_days,
            len,
        }
    }

    /// Grid spanning the min and max of `times`; `None` for no times
    pub fn covering<I>(times: I, width_days: u32) -> Option<Self>
    where
        I: IntoIterator<Item = NaiveDateTime>,
    {
        let mut bounds: Option<(NaiveDateTime, NaiveDateTime)> = None;
        for time in times {
            bounds = Some(match bounds {
                Some((min, max)) => (min.min(time), max.max(time)),
                None => (time, time),
            });
        }
        bounds.map(|(min, max)| Self::spanning(min, max, width_days))
    }

    /// Local midnight of the earliest message
    #[must_use]
    pub const fn anchor(&self) -> NaiveDateTime {
        self.anchor
    }

    /// Number of buckets, never zero
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Always false; a grid holds at least one bucket
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `floor(days_since_anchor / width)`, or `None` outside the grid
    #[must_use]
    pub fn index_of(&self, time: NaiveDateTime) -> Option<usize> {
        let days = (time - self.anchor).num_days();
        if time < self.anchor {
            return None;
        }
        usize::try_from(days / self.width_days)
            .ok()
            .filter(|index| *index < self.len)
    }

    /// Start of bucket `index`
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn start_of(&self, index: usize) -> NaiveDateTime {
        self.anchor + Duration::days(index as i64 * self.width_days)
    }

    /// Start of every bucket in order
    pub fn starts(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        (0..self.len).map(|index| self.start_of(index))
    }

    /// Zeroed counter per bucket
    #[must_use]
    pub fn zeroed(&self) -> Vec<usize> {
        vec![0; self.len]
    }

    /// Count `times` per bucket
    pub fn count<I>(&self, times: I) -> Vec<usize>
    where
        I: IntoIterator<Item = NaiveDateTime>,
    {
        let mut counts = self.zeroed();
        for index in times.into_iter().filter_map(|time| self.index_of(time)) {
            counts[index] += 1;
        }
        counts
    }
}

/// Round the time of day to the nearest multiple of `interval_minutes` and
/// format it as `HH:MM`. Times that round up past 23:59 wrap to `00:00`.
///
/// The interval is clamped to between one minute and one day.
#[must_use]
pub fn time_of_day_label(time: NaiveDateTime, interval_minutes: u32) -> String {
    let interval = interval_minutes.clamp(1, MINUTES_PER_DAY) * 60;
    let seconds = time.num_seconds_from_midnight();
    let slots = (f64::from(seconds) / f64::from(interval)).round();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rounded = (slots as u32 * interval) % SECONDS_PER_DAY;
    format!("{:02}:{:02}", rounded / 3600, (rounded % 3600) / 60)
}

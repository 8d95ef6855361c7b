use chrono::{DateTime, NaiveDate, NaiveTime, Offset, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use time::{Date, OffsetDateTime, UtcOffset};

/// Longest run of non-existent local times a midnight lookup will step over.
const GAP_SEARCH_STEPS: i64 = 16;
const GAP_SEARCH_STEP_MINUTES: i64 = 15;

pub fn localized_datetime(time: OffsetDateTime, tz: Tz) -> DateTime<Tz> {
    let utc = time.to_offset(UtcOffset::UTC);
    let datetime_utc = DateTime::<Utc>::from_timestamp(utc.unix_timestamp(), utc.nanosecond())
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    tz.from_utc_datetime(&datetime_utc.naive_utc())
}

/// Offset in effect in `tz` at the given instant.
pub fn offset_at(time: OffsetDateTime, tz: Tz) -> UtcOffset {
    let seconds = localized_datetime(time, tz).offset().fix().local_minus_utc();
    UtcOffset::from_whole_seconds(seconds).unwrap_or(UtcOffset::UTC)
}

/// Calendar date of `time` as observed in `tz`.
pub fn localized_date(time: OffsetDateTime, tz: Tz) -> Date {
    time.to_offset(offset_at(time, tz)).date()
}

/// First instant of `date` in `tz`.
///
/// Zones that skip local midnight start the day at the end of the gap.
pub fn start_of_day(date: Date, tz: Tz) -> OffsetDateTime {
    let fallback = date.midnight().assume_utc();
    let Some(naive) = NaiveDate::from_ymd_opt(
        date.year(),
        u32::from(u8::from(date.month())),
        u32::from(date.day()),
    ) else {
        return fallback;
    };
    let local_midnight = naive.and_time(NaiveTime::MIN);

    (0..=GAP_SEARCH_STEPS)
        .find_map(|step| {
            let candidate = local_midnight + TimeDelta::minutes(step * GAP_SEARCH_STEP_MINUTES);
            tz.from_local_datetime(&candidate).earliest()
        })
        .and_then(|resolved| {
            let offset = UtcOffset::from_whole_seconds(resolved.offset().fix().local_minus_utc())
                .ok()?;
            OffsetDateTime::from_unix_timestamp(resolved.timestamp())
                .ok()
                .map(|instant| instant.to_offset(offset))
        })
        .unwrap_or(fallback)
}

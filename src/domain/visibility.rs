//! Visibility policy: the statuses and publish-time bound a requester may see.

use std::collections::BTreeSet;

use chrono_tz::Tz;
use time::{Date, OffsetDateTime};

use super::types::{ContentStatus, PermissionLevel};
use crate::util::timezone;

/// Statuses every requester may see through the feed and search.
pub const VISIBLE_STATUSES: [ContentStatus; 2] = [ContentStatus::Published, ContentStatus::Private];

/// Exclusive upper bound on publish time, at date granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishBound {
    date: Date,
    starts_at: OffsetDateTime,
}

impl PublishBound {
    pub fn for_date(date: Date, tz: Tz) -> Self {
        Self {
            date,
            starts_at: timezone::start_of_day(date, tz),
        }
    }

    /// The calendar date the bound stops before.
    pub fn date(&self) -> Date {
        self.date
    }

    /// First instant of [`Self::date`] in the policy zone.
    pub fn starts_at(&self) -> OffsetDateTime {
        self.starts_at
    }

    pub fn admits(&self, published_at: OffsetDateTime) -> bool {
        published_at < self.starts_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityFilter {
    statuses: BTreeSet<ContentStatus>,
    upper_bound: Option<PublishBound>,
}

impl VisibilityFilter {
    pub fn statuses(&self) -> &BTreeSet<ContentStatus> {
        &self.statuses
    }

    /// `None` exactly when the requester is an administrator.
    pub fn upper_bound(&self) -> Option<PublishBound> {
        self.upper_bound
    }
}

/// Computes visibility filters in a fixed time zone.
#[derive(Debug, Clone, Copy)]
pub struct VisibilityPolicy {
    tz: Tz,
}

impl VisibilityPolicy {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn compute(&self, permission: PermissionLevel, now: OffsetDateTime) -> VisibilityFilter {
        compute_filter(permission, now, self.tz)
    }
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

/// Standard requesters stop at the start of tomorrow; administrators are unbounded.
///
/// "Tomorrow" is the next calendar day in `tz`, so daylight-saving changes
/// never skip or repeat a date.
pub fn compute_filter(permission: PermissionLevel, now: OffsetDateTime, tz: Tz) -> VisibilityFilter {
    let statuses = VISIBLE_STATUSES.into_iter().collect();
    let upper_bound = match permission {
        PermissionLevel::Administrator => None,
        PermissionLevel::Standard => {
            let today = timezone::localized_date(now, tz);
            let tomorrow = today.next_day().unwrap_or(Date::MAX);
            Some(PublishBound::for_date(tomorrow, tz))
        }
    };

    VisibilityFilter {
        statuses,
        upper_bound,
    }
}

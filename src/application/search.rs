//! Search inclusion of private and scheduled episodes.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::debug;

use super::listeners::QueryListener;
use super::repos::ContentQuery;
use crate::domain::access::Requester;
use crate::domain::types::{ContentType, PermissionLevel};
use crate::domain::visibility::VisibilityPolicy;
use crate::util::clock::Clock;

/// Who issued a query, and from where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub permission: PermissionLevel,
    pub logged_in: bool,
    /// Queries issued from the admin panel are never widened.
    pub admin_panel: bool,
}

impl RequestContext {
    pub fn front_end(requester: &Requester) -> Self {
        Self {
            permission: requester.permission_level(),
            logged_in: requester.logged_in,
            admin_panel: false,
        }
    }

    pub fn admin_panel(requester: &Requester) -> Self {
        Self {
            admin_panel: true,
            ..Self::front_end(requester)
        }
    }
}

/// Merges the episode visibility filter into `query`.
pub fn apply_episode_visibility(
    query: &mut ContentQuery,
    permission: PermissionLevel,
    policy: &VisibilityPolicy,
    now: OffsetDateTime,
) {
    query.apply_visibility(&policy.compute(permission, now));
}

/// Widens a front-end podcast query for a logged-in requester.
///
/// Returns whether the query was changed.
pub fn include_private_in_search(
    query: &mut ContentQuery,
    ctx: &RequestContext,
    policy: &VisibilityPolicy,
    now: OffsetDateTime,
) -> bool {
    if ctx.admin_panel || !ctx.logged_in || !query.targets_only(ContentType::PODCAST) {
        return false;
    }

    apply_episode_visibility(query, ctx.permission, policy, now);
    debug!(
        permission = %ctx.permission,
        bounded = query.published_before.is_some(),
        "Search query widened to private episodes"
    );
    true
}

/// [`include_private_in_search`] bound to one request.
pub struct SearchInclusion {
    ctx: RequestContext,
    policy: VisibilityPolicy,
    clock: Arc<dyn Clock>,
}

impl SearchInclusion {
    pub fn new(ctx: RequestContext, policy: VisibilityPolicy, clock: Arc<dyn Clock>) -> Self {
        Self { ctx, policy, clock }
    }
}

impl QueryListener for SearchInclusion {
    fn name(&self) -> &'static str {
        "search_inclusion"
    }

    fn before_query(&self, query: &mut ContentQuery) {
        include_private_in_search(query, &self.ctx, &self.policy, self.clock.now());
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono_tz::Tz;
    use time::macros::{date, datetime};

    use super::*;
    use crate::application::listeners::QueryListeners;
    use crate::domain::types::{Capability, ContentStatus};
    use crate::util::clock::ManualClock;

    const NOW: OffsetDateTime = datetime!(2024-03-09 23:00 -5);

    fn widened() -> Option<BTreeSet<ContentStatus>> {
        Some(BTreeSet::from([
            ContentStatus::Published,
            ContentStatus::Private,
        ]))
    }

    fn subscriber() -> Requester {
        Requester::logged_in([Capability::Read, Capability::ReadPrivatePosts])
    }

    fn admin() -> Requester {
        Requester::logged_in([Capability::Read, Capability::ManageOptions])
    }

    #[test]
    fn standard_front_end_query_is_widened_and_bounded() {
        let mut query = ContentQuery::podcast();
        let changed = include_private_in_search(
            &mut query,
            &RequestContext::front_end(&subscriber()),
            &VisibilityPolicy::default(),
            NOW,
        );

        assert!(changed);
        assert_eq!(query.statuses, widened());
        assert_eq!(
            query.published_before.map(|bound| bound.date()),
            Some(date!(2024 - 03 - 11))
        );
    }

    #[test]
    fn administrator_front_end_query_is_unbounded() {
        let mut query = ContentQuery::podcast();
        include_private_in_search(
            &mut query,
            &RequestContext::front_end(&admin()),
            &VisibilityPolicy::default(),
            NOW,
        );

        assert_eq!(query.statuses, widened());
        assert_eq!(query.published_before, None);
    }

    #[test]
    fn untouched_queries() {
        let policy = VisibilityPolicy::default();
        let cases = [
            (ContentQuery::podcast(), RequestContext::admin_panel(&admin())),
            (
                ContentQuery::podcast(),
                RequestContext::front_end(&Requester::anonymous()),
            ),
            (
                ContentQuery::for_types([ContentType::new("post").expect("valid type")]),
                RequestContext::front_end(&subscriber()),
            ),
            (
                ContentQuery::for_types([
                    ContentType::podcast(),
                    ContentType::new("post").expect("valid type"),
                ]),
                RequestContext::front_end(&subscriber()),
            ),
        ];

        for (query, ctx) in cases {
            let mut mutated = query.clone();
            assert!(!include_private_in_search(&mut mutated, &ctx, &policy, NOW));
            assert_eq!(mutated, query);
        }
    }

    #[test]
    fn feed_visibility_applies_regardless_of_login() {
        let mut query = ContentQuery::podcast();
        apply_episode_visibility(
            &mut query,
            PermissionLevel::Standard,
            &VisibilityPolicy::new(Tz::America__New_York),
            NOW,
        );
        assert_eq!(query.statuses, widened());
        assert_eq!(
            query.published_before.map(|bound| bound.date()),
            Some(date!(2024 - 03 - 10))
        );
    }

    #[test]
    fn listener_uses_request_clock() {
        let clock = Arc::new(ManualClock::new(NOW));
        let listeners = QueryListeners::new().with(Arc::new(SearchInclusion::new(
            RequestContext::front_end(&subscriber()),
            VisibilityPolicy::default(),
            clock,
        )));

        let mut query = ContentQuery::podcast();
        listeners.apply(&mut query);
        assert_eq!(query.statuses, widened());
        assert!(query.published_before.is_some());
    }
}

use std::{collections::BTreeSet, process, sync::Arc};

use privatecast::{
    application::{
        episodes::{EpisodeLister, EpisodeListerConfig},
        error::AppError,
        listeners::{PostTypeExpansion, QueryListeners},
        repos::ContentQuery,
        roles::{RoleRegistry, SUBSCRIBER_ROLE, grant_private_read_to_subscribers},
        search::{RequestContext, include_private_in_search},
    },
    cache::MemoryObjectCache,
    config::{self, EpisodesArgs, EvaluationArgs, RoleArg, SearchArgs, Settings},
    domain::{
        access::Requester,
        types::{Capability, ContentType, PermissionLevel},
        visibility::{VisibilityFilter, VisibilityPolicy},
    },
    infra::{error::InfraError, memory_store::InMemoryContentStore, telemetry},
    util::clock::{Clock, ManualClock, SystemClock},
};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    if dispatcher::has_been_set() {
        error!(kind = error.kind(), error = %report.chain(), "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(kind = error.kind(), error = %report.chain(), "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| InfraError::configuration(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        config::Command::Filter(args) => run_filter(&settings, &args),
        config::Command::Episodes(args) => run_episodes(&settings, &args).await,
        config::Command::Search(args) => run_search(&settings, &args),
        config::Command::BootstrapRoles => run_bootstrap_roles(),
    }
}

fn run_filter(settings: &Settings, args: &EvaluationArgs) -> Result<(), AppError> {
    let clock = evaluation_clock(args)?;
    let policy = VisibilityPolicy::new(settings.episodes.timezone);
    let filter = policy.compute(args.role.into(), clock.now());

    println!("permission: {}", PermissionLevel::from(args.role));
    println!("timezone: {}", policy.timezone());
    print_filter(&filter);
    Ok(())
}

async fn run_episodes(settings: &Settings, args: &EpisodesArgs) -> Result<(), AppError> {
    let clock = evaluation_clock(&args.evaluation)?;
    let fixtures = settings.content.fixtures.as_deref().ok_or_else(|| {
        AppError::validation("no content fixture configured; set `content.fixtures` or pass --fixtures")
    })?;

    let expansion = PostTypeExpansion::new(settings.episodes.podcast_post_types.iter().cloned());
    let store = InMemoryContentStore::load(fixtures)?
        .with_listeners(QueryListeners::new().with(Arc::new(expansion)));
    let cache = Arc::new(MemoryObjectCache::new(clock.clone()));
    let lister = EpisodeLister::new(
        Arc::new(store),
        cache,
        VisibilityPolicy::new(settings.episodes.timezone),
        clock,
        EpisodeListerConfig::from(settings),
    );

    let additional_types = args
        .include_types
        .iter()
        .map(|name| ContentType::new(name.as_str()))
        .collect::<Result<BTreeSet<_>, _>>()?;
    let permission = PermissionLevel::from(args.evaluation.role);

    for round in 1..=args.repeat {
        let ids = lister
            .list_episode_ids(permission, &additional_types)
            .await?;
        info!(round, episodes = ids.len(), "Listed episodes");
        let rendered: Vec<String> = ids.iter().map(ToString::to_string).collect();
        println!("{}", rendered.join(" "));
    }
    Ok(())
}

fn run_search(settings: &Settings, args: &SearchArgs) -> Result<(), AppError> {
    let clock = evaluation_clock(&args.evaluation)?;
    let policy = VisibilityPolicy::new(settings.episodes.timezone);

    let requester = if args.logged_out {
        Requester::anonymous()
    } else {
        match args.evaluation.role {
            RoleArg::Administrator => {
                Requester::logged_in([Capability::Read, Capability::ManageOptions])
            }
            RoleArg::Standard => Requester::logged_in([Capability::Read]),
        }
    };
    let ctx = if args.admin_panel {
        RequestContext::admin_panel(&requester)
    } else {
        RequestContext::front_end(&requester)
    };

    let mut query = ContentQuery::podcast();
    let widened = include_private_in_search(&mut query, &ctx, &policy, clock.now());

    println!("widened: {widened}");
    print_query(&query);
    Ok(())
}

fn run_bootstrap_roles() -> Result<(), AppError> {
    let registry = RoleRegistry::with_defaults();
    grant_private_read_to_subscribers(&registry);

    let capabilities = registry.capabilities(SUBSCRIBER_ROLE).ok_or_else(|| {
        AppError::unexpected(format!("role `{SUBSCRIBER_ROLE}` missing after bootstrap"))
    })?;
    let names: Vec<_> = capabilities.iter().map(|cap| cap.as_str()).collect();
    println!("{SUBSCRIBER_ROLE}: {}", names.join(", "));
    Ok(())
}

fn evaluation_clock(args: &EvaluationArgs) -> Result<Arc<dyn Clock>, AppError> {
    match args.at.as_deref() {
        Some(at) => {
            let now = OffsetDateTime::parse(at, &Rfc3339)
                .map_err(|err| AppError::validation(format!("invalid --at `{at}`: {err}")))?;
            Ok(Arc::new(ManualClock::new(now)))
        }
        None => Ok(Arc::new(SystemClock)),
    }
}

fn print_filter(filter: &VisibilityFilter) {
    let statuses: Vec<_> = filter.statuses().iter().map(|status| status.as_str()).collect();
    println!("statuses: {}", statuses.join(", "));
    match filter.upper_bound() {
        Some(bound) => println!(
            "published before: {} (starts at {})",
            bound.date(),
            bound
                .starts_at()
                .format(&Rfc3339)
                .unwrap_or_else(|_| bound.starts_at().to_string())
        ),
        None => println!("published before: unbounded"),
    }
}

fn print_query(query: &ContentQuery) {
    let types: Vec<_> = query.content_types.iter().map(ContentType::as_str).collect();
    println!("types: {}", types.join(", "));
    let statuses: Vec<_> = query
        .effective_statuses()
        .into_iter()
        .map(|status| status.as_str())
        .collect();
    println!("statuses: {}", statuses.join(", "));
    match query.published_before {
        Some(bound) => println!("published before: {}", bound.date()),
        None => println!("published before: unbounded"),
    }
}

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use donor_engagement::{
    compute_event_status, create_event, event_with_relations, events_for_fundraiser,
    import_population, list_events, load_donors_csv, load_fundraisers_csv, open_database, setup_database, AccountId, Config, DonorId, EventDraft,
    EventId, FundraiserId, SelectionLedger,
};
use rusqlite::Connection;
use std::env;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage:
  donor-engagement init
  donor-engagement import <fundraisers.csv> <donors.csv>
  donor-engagement create-event <name> <location> <start> <end> <expected> <organizer-id>
  donor-engagement save <event-id> <account-id> [donor-id ...]
  donor-engagement confirm <event-id> <account-id> [donor-id ...]
  donor-engagement status
  donor-engagement events [account-id]
  donor-engagement show-event <event-id>";

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    let args: Vec<String> = env::args().skip(1).collect();

    let Some(command) = args.first() else {
        bail!("{}", USAGE);
    };

    let mut conn = open(&config)?;

    match command.as_str() {
        "init" => {
            tracing::info!(path = %config.database_path.display(), "Database initialized");
        }
        "import" => run_import(&mut conn, &args[1..])?,
        "create-event" => run_create_event(&mut conn, &args[1..])?,
        "save" | "confirm" => run_ledger(&mut conn, &config, command, &args[1..])?,
        "status" => run_status(&mut conn)?,
        "events" => run_events(&mut conn, &args[1..])?,
        "show-event" => run_show_event(&mut conn, &args[1..])?,
        other => bail!("unknown command '{}'\n{}", other, USAGE),
    }

    Ok(())
}

fn open(config: &Config) -> Result<Connection> {
    let conn = open_database(&config.database_path, config.busy_timeout)
        .with_context(|| format!("Failed to open {}", config.database_path.display()))?;
    setup_database(&conn).context("Failed to set up schema")?;
    Ok(conn)
}

fn run_import(conn: &mut Connection, args: &[String]) -> Result<()> {
    let [fundraisers_csv, donors_csv] = args else {
        bail!("import needs <fundraisers.csv> <donors.csv>\n{}", USAGE);
    };

    let fundraisers = load_fundraisers_csv(Path::new(fundraisers_csv))?;
    let donors = load_donors_csv(Path::new(donors_csv))?;
    let (f, d) = import_population(conn, &fundraisers, &donors)?;

    println!("Imported {} fundraisers and {} donors", f, d);
    Ok(())
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("'{}' is not an RFC 3339 timestamp", raw))?
        .with_timezone(&Utc))
}

fn run_create_event(conn: &mut Connection, args: &[String]) -> Result<()> {
    let [name, location, start, end, expected, organizer] = args else {
        bail!("create-event needs 6 arguments\n{}", USAGE);
    };

    let draft = EventDraft {
        name: name.clone(),
        location: location.clone(),
        start_time: parse_time(start)?,
        end_time: parse_time(end)?,
        expected_selection: expected.parse().context("expected must be a count")?,
        organizer_id: FundraiserId(organizer.parse().context("organizer-id must be a number")?),
    };

    let event_id = create_event(conn, &draft)?;
    println!("Created event {}", event_id);
    Ok(())
}

fn run_ledger(conn: &mut Connection, config: &Config, command: &str, args: &[String]) -> Result<()> {
    let [event, account, donors @ ..] = args else {
        bail!("{} needs <event-id> <account-id>\n{}", command, USAGE);
    };

    let event_id = EventId(event.parse().context("event-id must be a number")?);
    let account_id = AccountId(account.parse().context("account-id must be a number")?);
    let donor_ids = donors
        .iter()
        .map(|raw| raw.parse().map(DonorId).context("donor ids must be numbers"))
        .collect::<Result<Vec<_>>>()?;

    let ledger = SelectionLedger::new(config.confirm_policy);

    if command == "save" {
        let outcome = ledger.save_selections(conn, event_id, &donor_ids, Some(account_id))?;
        println!(
            "Selected {:?}, reverted {:?}",
            outcome.newly_selected, outcome.reverted_to_pending
        );
    } else {
        let outcome = ledger.confirm_selections(conn, event_id, &donor_ids, Some(account_id))?;
        println!(
            "Confirmed {:?}, already confirmed {:?}",
            outcome.newly_confirmed, outcome.already_confirmed
        );
    }

    Ok(())
}

fn run_status(conn: &mut Connection) -> Result<()> {
    let breakdown = compute_event_status(conn)?;

    println!("Finished ({}):", breakdown.finished.len());
    for status in &breakdown.finished {
        println!(
            "  #{} {} ({}/{} fundraisers confirmed)",
            status.event.id,
            status.event.name,
            status.fundraisers_with_confirmed,
            status.total_fundraisers
        );
    }

    println!("Waiting ({}):", breakdown.waiting.len());
    for status in &breakdown.waiting {
        println!(
            "  #{} {} ({}/{} fundraisers confirmed)",
            status.event.id,
            status.event.name,
            status.fundraisers_with_confirmed,
            status.total_fundraisers
        );
    }

    Ok(())
}

fn run_events(conn: &mut Connection, args: &[String]) -> Result<()> {
    let events = match args {
        [] => list_events(conn)?,
        [account] => {
            let account_id = AccountId(account.parse().context("account-id must be a number")?);
            events_for_fundraiser(conn, Some(account_id))?
                .into_iter()
                .map(|view| view.event)
                .collect()
        }
        _ => bail!("events takes at most one <account-id>\n{}", USAGE),
    };

    for event in &events {
        println!(
            "  #{} {} @ {} ({})",
            event.id,
            event.name,
            event.location,
            event.start_time.to_rfc3339()
        );
    }
    println!("{} event(s)", events.len());
    Ok(())
}

fn run_show_event(conn: &mut Connection, args: &[String]) -> Result<()> {
    let [event] = args else {
        bail!("show-event needs <event-id>\n{}", USAGE);
    };

    let event_id = EventId(event.parse().context("event-id must be a number")?);
    let view = event_with_relations(conn, event_id)?;

    println!("#{} {}", view.event.id, view.event.name);
    println!("  location:  {}", view.event.location);
    println!(
        "  time:      {} to {}",
        view.event.start_time.to_rfc3339(),
        view.event.end_time.to_rfc3339()
    );
    println!("  expected:  {}", view.event.expected_selection);
    println!("  organizer: {} (#{})", view.organizer.name, view.organizer.id);
    for fundraiser in &view.assigned_fundraisers {
        println!("  assigned:  {} (#{})", fundraiser.name, fundraiser.id);
    }
    Ok(())
}

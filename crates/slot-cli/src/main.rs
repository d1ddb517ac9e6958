//! `slots` CLI: inspect booking-calendar availability payloads.
//!
//! ## Usage
//!
//! ```sh
//! # Bookable date range of a schedule (stdin → stdout)
//! cat schedule.json | slots horizon
//!
//! # Is a date selectable, and which slots are still open?
//! slots check -i schedule.json --date 27/09/2023
//!
//! # Month grid, Sunday first, as JSON
//! slots month -i schedule.json --month 10/2023 --first-weekday sun --json
//!
//! # Re-read the file every 5 seconds and print each new snapshot
//! slots watch -i schedule.json --interval-secs 5
//!
//! # Fix "today" and load settings from a config file
//! slots --config slots.json horizon -i schedule.json --today 01/09/2023
//! ```

use std::io::{self, Read};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use slot_engine::tracing::{init_tracing, TracingConfig, TracingOutputFormat};
use slot_engine::{
    compute_horizon_with, format_wire_date, parse_wire_date, weekday_from_iso, CalendarSession,
    Clock, DayAvailability, DayCell, EngineConfig, FixedClock, Horizon, JsonFileSource,
    PlanningMode, RefreshCoordinator, Resolver, ScheduleModel, ScheduleSnapshot, SystemClock,
    Verdict,
};
use tracing::{debug, Level};

#[derive(Parser)]
#[command(
    name = "slots",
    version,
    about = "Booking calendar availability inspector"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log debug output to stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value = "compact")]
    log_format: LogFormat,

    /// JSON configuration file (calendar and refresh settings)
    #[arg(long, global = true)]
    config: Option<String>,
}

#[derive(Args)]
struct PayloadArgs {
    /// Schedule payload file (reads from stdin if omitted)
    #[arg(short, long)]
    input: Option<String>,
    /// Treat this date as today (DD/MM/YYYY)
    #[arg(long)]
    today: Option<String>,
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the bookable date range
    Horizon {
        #[command(flatten)]
        payload: PayloadArgs,
    },
    /// Resolve availability for a single date
    Check {
        #[command(flatten)]
        payload: PayloadArgs,
        /// Date to check (DD/MM/YYYY)
        #[arg(long)]
        date: String,
    },
    /// Render the month grid with selectable days
    Month {
        #[command(flatten)]
        payload: PayloadArgs,
        /// Month to display (MM/YYYY); clamped to the horizon
        #[arg(long)]
        month: Option<String>,
        /// First column of the grid
        #[arg(long, value_enum)]
        first_weekday: Option<FirstWeekday>,
    },
    /// Poll a payload file and print every new schedule snapshot
    Watch {
        /// Schedule payload file
        #[arg(short, long)]
        input: String,
        /// Treat this date as today (DD/MM/YYYY)
        #[arg(long)]
        today: Option<String>,
        /// Polling interval; overrides the config file
        #[arg(long)]
        interval_secs: Option<u64>,
        /// Exit after this many snapshots
        #[arg(long)]
        max_updates: Option<u64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FirstWeekday {
    Mon,
    Sun,
}

impl From<FirstWeekday> for Weekday {
    fn from(value: FirstWeekday) -> Self {
        match value {
            FirstWeekday::Mon => Weekday::Mon,
            FirstWeekday::Sun => Weekday::Sun,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl From<LogFormat> for TracingOutputFormat {
    fn from(value: LogFormat) -> Self {
        match value {
            LogFormat::Compact => TracingOutputFormat::Compact,
            LogFormat::Pretty => TracingOutputFormat::Pretty,
            LogFormat::Json => TracingOutputFormat::Json,
        }
    }
}

/// Either the wall clock or a date pinned with `--today`.
enum CliClock {
    Fixed(FixedClock),
    System(SystemClock),
}

impl Clock for CliClock {
    fn today(&self) -> NaiveDate {
        match self {
            CliClock::Fixed(clock) => clock.today(),
            CliClock::System(clock) => clock.today(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging = if cli.verbose {
        TracingConfig::verbose()
    } else if cli.quiet {
        TracingConfig::default().with_level(Level::ERROR)
    } else {
        TracingConfig::default()
    };
    let logging = logging.with_format(cli.log_format.into());
    init_tracing(logging).context("Failed to initialise logging")?;

    let config = match cli.config.as_deref() {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Horizon { payload } => {
            let model = load_model(payload.input.as_deref())?;
            let today = clock(&config, payload.today.as_deref())?.today();
            let horizon =
                compute_horizon_with(&model, today, config.calendar.rolling_horizon_years);
            print_horizon(&model, &horizon, payload.json)?;
        }
        Commands::Check { payload, date } => {
            let model = load_model(payload.input.as_deref())?;
            let today = clock(&config, payload.today.as_deref())?.today();
            let date = parse_date("--date", &date)?;
            let horizon =
                compute_horizon_with(&model, today, config.calendar.rolling_horizon_years);
            let resolver = Resolver::new(&model, &horizon);
            print_day(&resolver.resolve(date), payload.json)?;
        }
        Commands::Month {
            payload,
            month,
            first_weekday,
        } => {
            let model = load_model(payload.input.as_deref())?;
            let today = clock(&config, payload.today.as_deref())?.today();
            let first_weekday = first_weekday
                .map(Weekday::from)
                .unwrap_or(config.calendar.first_weekday);

            let snapshot = ScheduleSnapshot::with_rolling_years(
                model,
                today,
                config.calendar.rolling_horizon_years,
                1,
            );
            let mut session = CalendarSession::new(first_weekday);
            session.apply_snapshot(snapshot.into());
            if let Some(raw) = month.as_deref() {
                let target = parse_month(raw)?;
                if let Some(cursor) = session.cursor_mut() {
                    cursor.jump_to(target);
                }
            }
            print_month(&session, first_weekday, payload.json)?;
        }
        Commands::Watch {
            input,
            today,
            interval_secs,
            max_updates,
        } => {
            let today_clock = clock(&config, today.as_deref())?;
            let mut refresh = config.refresh.clone();
            if let Some(secs) = interval_secs {
                refresh.interval = Duration::from_secs(secs);
            }
            let source = JsonFileSource::new(&input);
            let coordinator = RefreshCoordinator::new(source, today_clock, refresh)
                .with_rolling_years(config.calendar.rolling_horizon_years);
            let session = CalendarSession::new(config.calendar.first_weekday);

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            runtime.block_on(watch(coordinator, session, max_updates))?;
        }
    }

    Ok(())
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn load_model(path: Option<&str>) -> Result<ScheduleModel> {
    let raw = read_input(path)?;
    let model = ScheduleModel::from_json(&raw).context("Invalid schedule payload")?;
    debug!(
        mode = mode_name(&model),
        entries = model.date_entries().len(),
        booked = model.booked().len(),
        "schedule loaded"
    );
    Ok(model)
}

fn clock(config: &EngineConfig, today: Option<&str>) -> Result<CliClock> {
    match today {
        Some(raw) => Ok(CliClock::Fixed(FixedClock(parse_date("--today", raw)?))),
        None => {
            let clock = config
                .calendar
                .clock()
                .context("Invalid calendar timezone")?;
            Ok(CliClock::System(clock))
        }
    }
}

fn parse_date(flag: &str, raw: &str) -> Result<NaiveDate> {
    parse_wire_date(raw)
        .with_context(|| format!("Invalid {} '{}': expected DD/MM/YYYY", flag, raw))
}

/// `MM/YYYY` to the first day of that month.
fn parse_month(raw: &str) -> Result<NaiveDate> {
    parse_wire_date(&format!("01/{}", raw.trim()))
        .with_context(|| format!("Invalid --month '{}': expected MM/YYYY", raw))
}

fn mode_name(model: &ScheduleModel) -> &'static str {
    match model.mode() {
        PlanningMode::WeeklyRecurring { .. } => "weekly",
        PlanningMode::ExplicitDateList { .. } => "daily",
    }
}

/// Weekdays with at least one template slot, e.g. `Mon, Wed`. Empty for
/// date-list schedules.
fn open_days(model: &ScheduleModel) -> Vec<String> {
    match model.mode() {
        PlanningMode::WeeklyRecurring { template, .. } => template
            .open_weekdays()
            .into_iter()
            .filter_map(weekday_from_iso)
            .map(|day| day.to_string())
            .collect(),
        PlanningMode::ExplicitDateList { .. } => Vec::new(),
    }
}

fn verdict_text(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Open => "open",
        Verdict::OutsideHorizon => "outside horizon",
        Verdict::Tombstoned => "closed",
        Verdict::NoSlots => "no slots",
        Verdict::FullyBooked => "fully booked",
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_horizon(model: &ScheduleModel, horizon: &Horizon, as_json: bool) -> Result<()> {
    if as_json {
        return print_json(&json!({
            "mode": mode_name(model),
            "start": format_wire_date(horizon.start),
            "end": format_wire_date(horizon.end),
            "source": horizon.source,
            "days": horizon.days(),
            "loadable": horizon.is_loadable(),
            "session_minutes": model.session_duration_minutes(),
            "open_weekdays": open_days(model),
        }));
    }

    println!("Mode:      {}", mode_name(model));
    println!("Start:     {}", format_wire_date(horizon.start));
    println!("End:       {}", format_wire_date(horizon.end));
    println!("Source:    {}", serde_json::to_value(horizon.source)?.as_str().unwrap_or("-"));
    println!("Days:      {}", horizon.days());
    println!("Loadable:  {}", if horizon.is_loadable() { "yes" } else { "no" });
    let days = open_days(model);
    if !days.is_empty() {
        println!("Open days: {}", days.join(", "));
    }
    Ok(())
}

fn print_day(day: &DayAvailability, as_json: bool) -> Result<()> {
    if as_json {
        return print_json(&json!({
            "date": format_wire_date(day.date),
            "verdict": day.verdict,
            "selectable": day.is_selectable(),
            "remaining_slots": day.remaining_slots(),
            "effective_slots": day.effective_slots,
            "open_slots": day.open_slots,
        }));
    }

    println!("{}: {}", format_wire_date(day.date), verdict_text(day.verdict));
    if !day.effective_slots.is_empty() {
        println!(
            "Slots:     {}/{} open",
            day.remaining_slots(),
            day.effective_slots.len()
        );
    }
    if !day.open_slots.is_empty() {
        println!("Open:      {}", day.open_slots.join(", "));
    }
    Ok(())
}

fn cell_json(cell: &DayCell) -> serde_json::Value {
    json!({
        "date": format_wire_date(cell.date),
        "in_current_month": cell.in_current_month,
        "selectable": cell.selectable,
        "remaining_slots": cell.remaining_slots,
    })
}

fn print_month(session: &CalendarSession, first_weekday: Weekday, as_json: bool) -> Result<()> {
    let cells = session.month_cells();
    let Some(cursor) = session.cursor() else {
        anyhow::bail!("No schedule loaded");
    };
    let month = cursor.current();
    let (can_go_previous, can_go_next) = (cursor.can_go_previous(), cursor.can_go_next());
    let loadable = session.is_ready();

    if as_json {
        let weeks: Vec<Vec<serde_json::Value>> = cells
            .chunks(7)
            .map(|week| week.iter().map(cell_json).collect())
            .collect();
        return print_json(&json!({
            "month": month.format("%m/%Y").to_string(),
            "first_weekday": first_weekday.to_string(),
            "loadable": loadable,
            "can_go_previous": can_go_previous,
            "can_go_next": can_go_next,
            "weeks": weeks,
        }));
    }

    let arrow = |enabled: bool, symbol: &'static str| if enabled { symbol } else { " " };
    println!(
        "{} {} {}",
        arrow(can_go_previous, "<"),
        month.format("%B %Y"),
        arrow(can_go_next, ">")
    );

    let header: String = std::iter::successors(Some(first_weekday), |day| Some(day.succ()))
        .take(7)
        .map(|day| format!("{:>4}", day.to_string()))
        .collect();
    println!("{}", header);

    for week in cells.chunks(7) {
        let row: String = week
            .iter()
            .map(|cell| {
                if !cell.in_current_month {
                    "    ".to_string()
                } else if cell.selectable {
                    format!("{:>3}*", cell.date.day())
                } else {
                    format!("{:>3} ", cell.date.day())
                }
            })
            .collect();
        println!("{}", row.trim_end());
    }

    if !loadable {
        println!("No bookable dates.");
    }
    Ok(())
}

async fn watch(
    coordinator: RefreshCoordinator<JsonFileSource, CliClock>,
    mut session: CalendarSession,
    max_updates: Option<u64>,
) -> Result<()> {
    let handle = coordinator.spawn();
    debug!(?max_updates, "watching schedule file");
    let mut snapshots = handle.subscribe();
    session.begin_loading();
    let mut seen = 0u64;

    loop {
        let generation = tokio::select! {
            generation = session.follow(&mut snapshots) => generation,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(generation) = generation else {
            break;
        };
        let Some(snapshot) = session.snapshot() else {
            continue;
        };

        let horizon = &snapshot.horizon;
        let next = snapshot
            .resolver()
            .next_selectable(horizon.start)
            .map(format_wire_date)
            .unwrap_or_else(|| "none".to_string());
        println!(
            "generation {}: {} - {} (next open: {})",
            generation,
            format_wire_date(horizon.start),
            format_wire_date(horizon.end),
            next
        );

        seen += 1;
        if max_updates.is_some_and(|max| seen >= max) {
            break;
        }
    }

    handle.stop().await;
    Ok(())
}

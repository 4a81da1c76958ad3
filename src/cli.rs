// Command line front end over the crossing browser library
use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, TimeZone, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crossing_browser::models::{CrossingEvent, EnhancedStats, LiveCounts, StatsRange};
use crossing_browser::pagination::{DashboardFeed, PageSource};
use crossing_browser::{
    BrowserSession, ClientConfig, DataClient, DateRange, ExportFormat, ExportProgress, FetchOutcome,
    FilterField, FilterSet, PageSize, PageView, PaginationController, Record,
};

#[derive(Parser, Debug)]
#[command(name = "crossing-browser")]
#[command(about = "Search, page through and export vehicle crossing records", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// JSON config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the tracking service
    #[arg(long, global = true)]
    pub base_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List paired entry/exit records
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        filters: FilterArgs,

        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Rows per page (10, 25, 50 or 100)
        #[arg(long, value_parser = parse_page_size)]
        page_size: Option<PageSize>,
    },

    /// List raw events from the dashboard feed
    Dashboard {
        #[arg(short, long)]
        search: Option<String>,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, value_parser = parse_page_size)]
        page_size: Option<PageSize>,
    },

    /// Show a single record
    Record { id: i64 },

    /// Show the values offered as filter choices
    Vocab,

    /// Live counters and aggregate statistics
    Stats {
        #[arg(long, value_enum, default_value_t = RangeArg::All)]
        range: RangeArg,

        /// Start day for a custom range (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// End day for a custom range (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Export every matching record to a file
    Export {
        #[command(flatten)]
        filters: FilterArgs,

        /// csv or xlsx
        #[arg(long, default_value = "xlsx")]
        format: ExportFormat,

        /// File name without extension
        #[arg(long, default_value = "export")]
        name: String,

        /// Target directory (defaults to the configured export directory)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Free-text search
    #[arg(short, long)]
    pub search: Option<String>,

    /// First entry day (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last entry day (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// License plate prefix (repeatable)
    #[arg(long = "plate")]
    pub plates: Vec<String>,

    #[arg(long = "category")]
    pub categories: Vec<String>,

    #[arg(long = "color")]
    pub colors: Vec<String>,

    #[arg(long = "gate")]
    pub gates: Vec<String>,
}

impl FilterArgs {
    pub fn to_filters(&self) -> FilterSet {
        let mut filters = FilterSet::new();
        if let Some(search) = &self.search {
            filters = filters.with_search_term(search.as_str());
        }
        if self.from.is_some() || self.to.is_some() {
            filters = filters.with_date_range(DateRange::days(self.from, self.to));
        }
        let fields = [
            (FilterField::LicensePrefix, &self.plates),
            (FilterField::Category, &self.categories),
            (FilterField::Color, &self.colors),
            (FilterField::Gate, &self.gates),
        ];
        for (field, values) in fields {
            for value in values {
                if !filters.contains(field, value) {
                    filters = filters.toggle_value(field, value);
                }
            }
        }
        filters
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeArg {
    All,
    Today,
    Week,
    Month,
    Custom,
}

fn parse_page_size(s: &str) -> std::result::Result<PageSize, String> {
    let n: u32 = s.trim().parse().map_err(|_| format!("not a number: {}", s))?;
    PageSize::try_from(n)
}

pub async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli)?;
    log::debug!("Using service at {}", config.base_url());

    match cli.command {
        Commands::List {
            filters,
            page,
            page_size,
        } => {
            if let Some(size) = page_size {
                config.default_page_size = size;
            }
            let mut session = BrowserSession::new(&config).context("Failed to create HTTP client")?;
            let update = session.apply_filters(filters.to_filters()).await;
            if update.page? == FetchOutcome::Skipped {
                session.records().refresh().await?;
            }
            seek(session.records(), page).await?;
            print_records(&session.view().await);
        }
        Commands::Dashboard {
            search,
            page,
            page_size,
        } => {
            let client = Arc::new(DataClient::new(&config)?);
            let controller = PaginationController::new(
                Arc::new(DashboardFeed::new(client)),
                page_size.unwrap_or(config.default_page_size),
            );
            let filters = FilterSet::new().with_search_term(search.unwrap_or_default());
            if controller.set_filters(filters).await? == FetchOutcome::Skipped {
                controller.refresh().await?;
            }
            seek(&controller, page).await?;
            print_events(&controller.snapshot().await);
        }
        Commands::Record { id } => {
            let client = DataClient::new(&config)?;
            let record = client
                .fetch_record(id)
                .await
                .with_context(|| format!("Failed to fetch record {}", id))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Vocab => {
            let client = DataClient::new(&config)?;
            let vocabulary = client.fetch_filter_vocabulary().await?;
            println!("categories: {}", vocabulary.categories.join(", "));
            println!("colors:     {}", vocabulary.colors.join(", "));
            println!("gates:      {}", vocabulary.gates.join(", "));
        }
        Commands::Stats { range, from, to } => {
            let client = DataClient::new(&config)?;
            let range = stats_range(range, from, to)?;
            let (live, stats) = tokio::try_join!(
                client.fetch_live_counts(),
                client.fetch_enhanced_stats(range)
            )?;
            print_stats(&live, &stats);
        }
        Commands::Export {
            filters,
            format,
            name,
            dir,
        } => {
            if let Some(dir) = dir {
                config.export_dir = dir;
            }
            let mut session = BrowserSession::new(&config).context("Failed to create HTTP client")?;
            session.apply_filters(filters.to_filters()).await.page?;
            let job = session.open_export(format, &name).await;

            if let Some(kind) = job.error() {
                bail!("Could not count matching records: {}", kind);
            }
            if !job.can_confirm() {
                println!("No records match the given filters; nothing exported.");
                return Ok(());
            }

            println!("Exporting {} records to {}", job.record_count(), job.target_path().display());
            let path = job.confirm(report_progress).await.context("Export failed")?;
            eprintln!();
            println!("Saved {}", path.display());
            session.close_export();
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    let mut config = config.with_env_overrides()?;
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    Ok(config)
}

async fn seek<S: PageSource>(controller: &PaginationController<S>, page: u32) -> Result<()> {
    if page <= 1 {
        return Ok(());
    }
    if controller.go_to_page(page).await? == FetchOutcome::Skipped {
        let total = controller.snapshot().await.result.total_pages;
        log::warn!("Page {} is out of range (1..={}), showing page 1", page, total);
    }
    Ok(())
}

fn stats_range(
    range: RangeArg,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<StatsRange> {
    Ok(match range {
        RangeArg::All => StatsRange::All,
        RangeArg::Today => StatsRange::Today,
        RangeArg::Week => StatsRange::Week,
        RangeArg::Month => StatsRange::Month,
        RangeArg::Custom => {
            let days = DateRange::days(from, to);
            match (days.start(), days.end()) {
                (Some(start), Some(end)) => StatsRange::Custom { start, end },
                _ => bail!("--range custom needs both --from and --to"),
            }
        }
    })
}

fn report_progress(progress: ExportProgress) {
    let mb = progress.bytes_written as f64 / (1024.0 * 1024.0);
    match progress.percent() {
        Some(percent) => eprint!("\r{:>3}% ({:.1} MB)", percent, mb),
        None => eprint!("\r{:.1} MB", mb),
    }
    let _ = std::io::stderr().flush();
}

fn print_records(view: &PageView<Record>) {
    if let Some(kind) = view.last_error {
        eprintln!("warning: last request failed ({}); showing previous results", kind);
    }
    for record in &view.result.rows {
        let exit = match (&record.exit_timestamp, &record.exit_gate) {
            (Some(ts), Some(gate)) => format!("{} {}", local(ts), gate),
            (Some(ts), None) => local(ts),
            _ => "open".to_string(),
        };
        println!(
            "{:>7}  {:<12} {:<10} {:<8} {} {} -> {}",
            record.insertion_id,
            record.license_plate,
            record.category,
            record.color,
            local(&record.entry_timestamp),
            record.entry_gate,
            exit
        );
    }
    print_footer(view.page, view.result.total_pages, view.result.total_records);
}

fn print_events(view: &PageView<CrossingEvent>) {
    for event in &view.result.rows {
        println!(
            "{:>7}  {:<12} {:<10} {:<8} {} {} ({:?})",
            event.insertion_id,
            event.license_plate,
            event.category,
            event.color,
            local(&event.timestamp),
            event.gate,
            event.direction()
        );
    }
    print_footer(view.page, view.result.total_pages, view.result.total_records);
}

fn print_footer(page: u32, total_pages: u64, total_records: u64) {
    println!("{}", footer(page, total_pages, total_records));
}

fn footer(page: u32, total_pages: u64, total_records: u64) -> String {
    let last_page = u32::try_from(total_pages.max(1)).unwrap_or(u32::MAX);
    format!(
        "-- page {} of {} ({} records)",
        page.min(last_page),
        total_pages,
        total_records
    )
}

fn print_stats(live: &LiveCounts, stats: &EnhancedStats) {
    println!(
        "today: {}  recent entries: {}  recent exits: {}",
        live.today, live.recent_entries, live.recent_exits
    );
    println!("events in range: {}", stats.total_events);
    if let Some(hour) = stats.busiest_hour {
        println!("busiest hour: {:02}:00", hour);
    }
    if let Some(gate) = stats.most_used_gate() {
        println!("most used gate: {}", gate);
    }
    for (category, count) in &stats.category_counts {
        println!("  {:<12} {}", category, count);
    }
}

fn local(ts: &chrono::DateTime<Utc>) -> String {
    chrono::Local.from_utc_datetime(&ts.naive_utc()).format("%Y-%m-%d %H:%M:%S").to_string()
}

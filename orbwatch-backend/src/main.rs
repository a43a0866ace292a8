use orbwatch_backend::config::AppConfig;
use orbwatch_backend::module::catalog::parse_records;
use orbwatch_backend::module::conjunction::{GridStep, OrbitTier, Sgp4Provider, TrackFilter};
use orbwatch_backend::service::{DetectRequest, OrbwatchService, minutes_to_duration};

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use orbwatch_common::{ObjectType, TrackedObject};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "orbwatch", version, about = "Element-set cache and close-approach detection")]
struct Cli {
    /// Configuration file (defaults to ./orbwatch.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch (or reuse) element sets for a group
    Fetch {
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        max_age_minutes: Option<u64>,
    },
    /// Fetch (or reuse) an auxiliary JSON feed
    Feed {
        #[arg(long, default_value = "notifications")]
        name: String,
        #[arg(long)]
        max_age_minutes: Option<u64>,
    },
    /// Search for close approaches
    Detect {
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        threshold_km: Option<f64>,
        #[arg(long)]
        window_minutes: Option<u64>,
        #[arg(long)]
        step_seconds: Option<f64>,
        /// Repeatable; e.g. --include-type debris --include-type "rocket body"
        #[arg(long = "include-type")]
        include_types: Vec<ObjectType>,
        #[arg(long, default_value_t = 0.0)]
        min_confidence: f64,
        #[arg(long)]
        max_objects: Option<usize>,
        /// Use the newest cached element sets whatever their age
        #[arg(long)]
        offline: bool,
        #[arg(long)]
        json: bool,
    },
    /// List objects with orbit tier, element age, famous colour and annotation
    Objects {
        #[arg(long)]
        group: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        offline: bool,
    },
}

fn minutes(value: Option<u64>) -> Result<Option<Duration>> {
    value.map(minutes_to_duration).transpose()
}

/// Days since the element-set epoch, "-" when line 1 carries none.
fn element_age(object: &TrackedObject, now: DateTime<Utc>) -> String {
    match orbwatch_common::tle::epoch(&object.line1) {
        Ok(epoch) => format!("{:.1}d", (now - epoch).num_minutes() as f64 / 1440.0),
        Err(_) => "-".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    let _logging_guard = orbwatch_backend::logging::init_logging(&config.log_dir, "orbwatch", &config.log_level)?;

    let service = OrbwatchService::from_config(&config)?;
    let group_or_default = |group: Option<String>| group.unwrap_or_else(|| service.default_group().to_string());

    match cli.command {
        Command::Fetch { group, max_age_minutes } => {
            let group = group_or_default(group);
            let outcome = service.fetch_elements(&group, minutes(max_age_minutes)?).await?;
            let count = parse_records(&outcome.entry.raw_text, &group, outcome.entry.created_at)
                .map(|records| records.len())
                .unwrap_or(0);
            println!("{} {} ({} objects)", outcome.origin, outcome.entry.file_path.display(), count);
        }
        Command::Feed { name, max_age_minutes } => {
            let outcome = service.fetch_feed(&name, minutes(max_age_minutes)?).await?;
            println!("{} {}", outcome.origin, outcome.entry.file_path.display());
        }
        Command::Detect {
            group,
            threshold_km,
            window_minutes,
            step_seconds,
            include_types,
            min_confidence,
            max_objects,
            offline,
            json,
        } => {
            let group = group_or_default(group);
            let objects = service.load_objects(&group, None, offline).await?;
            let provider = Sgp4Provider::new(&objects);

            let mut request = DetectRequest::new(objects, Utc::now(), service.defaults())?;
            if let Some(threshold) = threshold_km {
                request.threshold_km = threshold;
            }
            if let Some(window) = window_minutes {
                request.window = minutes_to_duration(window)?;
            }
            if let Some(step) = step_seconds {
                request.step = GridStep::from_seconds(step);
            }
            if let Some(cap) = max_objects {
                request.max_objects = cap;
            }
            request.filter = TrackFilter {
                include_types: (!include_types.is_empty()).then(|| include_types.into_iter().collect::<HashSet<_>>()),
                min_confidence,
            };

            let report = service.detect(request, &provider)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for alert in &report.alerts {
                    println!("{}", alert);
                }
                println!(
                    "{} events ({} objects considered, {} filtered, {} dropped)",
                    report.events.len(),
                    report.considered,
                    report.filtered,
                    report.dropped
                );
            }
        }
        Command::Objects { group, limit, offline } => {
            let group = group_or_default(group);
            let mut objects = service.load_objects(&group, None, offline).await?;
            objects.truncate(limit);
            service.annotate(&mut objects);

            let palette = service.palette();
            let now = Utc::now();
            for object in &objects {
                let tier = OrbitTier::from_lines(&object.line1, &object.line2)
                    .map(|t| t.as_str())
                    .unwrap_or("-");
                let famous = palette.famous_color(&object.name).unwrap_or("");
                let annotation = object
                    .annotation
                    .as_ref()
                    .map(|a| format!("{} {:.0}%", a.predicted_type, a.predicted_confidence * 100.0))
                    .unwrap_or_default();
                println!(
                    "{:>6} {:<28} {:<4} {:>7} {:<8} {}",
                    object.object_id,
                    object.name,
                    tier,
                    element_age(object, now),
                    famous,
                    annotation
                );
            }
        }
    }

    Ok(())
}

use std::process::ExitCode;

use chrono::NaiveDate;
use tracing_subscriber::EnvFilter;

use timetable_cache::cache::{CacheError, TimetableCache};
use timetable_cache::domain::StationId;
use timetable_cache::storage::{GatewayConfig, SchemaVersion, StorageGateway};

/// Exit status when the cache has no data for the key.
const EXIT_MISS: u8 = 2;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            match e.downcast_ref::<CacheError>() {
                Some(err) if err.is_miss() => ExitCode::from(EXIT_MISS),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

/// Look up the key given on the command line and render it as JSON.
fn run() -> Result<String, Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let [from, to, date] = args.as_slice() else {
        return Err("usage: timetable-cache <from-station> <to-station> <YYYY-MM-DD>".into());
    };

    let from = StationId::parse(from)?;
    let to = StationId::parse(to)?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")?;

    // Location and schema from environment
    let path = std::env::var("TIMETABLE_CACHE_PATH").ok();
    let version = match std::env::var("TIMETABLE_SCHEMA") {
        Ok(v) => v.parse::<SchemaVersion>()?,
        Err(_) => SchemaVersion::latest(),
    };

    let config = path.map(GatewayConfig::new).unwrap_or_default();
    let gateway = StorageGateway::connect(config)?;
    let cache = TimetableCache::new(&gateway, version)?;

    let entries = cache.get(&from, &to, date)?;
    Ok(serde_json::to_string_pretty(&entries)?)
}

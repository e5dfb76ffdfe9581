//! CLI runner: executes one sync and prints the summary as JSON.
//!
//! Usage:
//!   callsync incremental
//!   callsync initial [--start 2026-01-01T00:00:00Z] [--end 2026-02-01T00:00:00Z]
//!   callsync manual [--limit 500]
//!   callsync all-time
//!   callsync webhook <recording-id>

use chrono::{DateTime, Utc};

use callsync::config::load_config;
use callsync::db::CrmDb;
use callsync::grain::thumbnail::ThumbnailResolver;
use callsync::grain::GrainClient;
use callsync::{SyncEngine, SyncRequest, SyncType};

fn usage() -> ! {
    eprintln!(
        "Usage: callsync <initial|incremental|manual|all-time> [--start <rfc3339>] \
         [--end <rfc3339>] [--limit <n>]\n       callsync webhook <recording-id>"
    );
    std::process::exit(2);
}

fn parse_rfc3339_arg(value: &str, flag: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(t) => t.with_timezone(&Utc),
        Err(e) => {
            eprintln!("Invalid {} value '{}': {}", flag, value, e);
            std::process::exit(2);
        }
    }
}

fn build_request(args: &[String]) -> SyncRequest {
    let Some(sync_type) = args.first().and_then(|a| SyncType::parse(a)) else {
        usage();
    };

    let mut request = SyncRequest::new(sync_type);

    if sync_type == SyncType::Webhook {
        match args.get(1) {
            Some(id) => request.recording_id = Some(id.clone()),
            None => usage(),
        }
        return request;
    }

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--start" => {
                let value = args.get(i + 1).unwrap_or_else(|| usage());
                request.start_date = Some(parse_rfc3339_arg(value, "--start"));
                i += 2;
            }
            "--end" => {
                let value = args.get(i + 1).unwrap_or_else(|| usage());
                request.end_date = Some(parse_rfc3339_arg(value, "--end"));
                i += 2;
            }
            "--limit" => {
                let value = args.get(i + 1).unwrap_or_else(|| usage());
                match value.parse::<usize>() {
                    Ok(n) if n > 0 => request.limit = Some(n),
                    _ => usage(),
                }
                i += 2;
            }
            _ => usage(),
        }
    }

    request
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let request = build_request(&args);

    let config = match load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    if config.grain.api_token.is_empty() {
        eprintln!(
            "No Grain API token configured. Set grain.apiToken in {}",
            callsync::config::config_path().display()
        );
        std::process::exit(1);
    }

    let db = match CrmDb::open() {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let client = match GrainClient::new(
        &config.grain.api_token,
        config.grain.api_base_url.as_deref(),
    ) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to build API client: {}", e);
            std::process::exit(1);
        }
    };

    let engine = SyncEngine::new(
        db,
        client,
        ThumbnailResolver::new(&config.thumbnails),
        &config.user_id,
    );

    match engine.sync(&request).await {
        Ok(summary) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).unwrap_or_default()
            );
        }
        Err(e) => {
            eprintln!("Sync failed: {}", e);
            std::process::exit(1);
        }
    }
}

//! TrustLens agent entrypoint: reads NDJSON events on stdin, writes one verdict per line on stdout.
//! Model, rules, and audit store load before the first event; any failure there stops startup.

use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, warn};
use trustlens::{
    config::AppConfig,
    error::{AuditError, StartupError},
    logging::StructuredLogger,
    model::OnnxDetector,
    pipeline::{EventVerdict, Pipeline, PipelineSettings},
    storage::SqliteAuditStore,
    RawEvent,
};

fn audit_secret(config: &AppConfig) -> Result<Option<Vec<u8>>, StartupError> {
    if !config.audit.encrypt_events {
        return Ok(None);
    }
    match std::env::var(&config.audit.secret_env) {
        Ok(s) if !s.is_empty() => Ok(Some(s.into_bytes())),
        _ => Err(AuditError::MissingSecret(config.audit.secret_env.clone()).into()),
    }
}

fn build_pipeline(config: &AppConfig) -> Result<Pipeline, StartupError> {
    let rules = config.resolve_rules()?;
    info!(allowed_hours = ?rules.allowed_hours, max_access = rules.max_access, "rules loaded");

    std::fs::create_dir_all(&config.data_dir)?;
    let secret = audit_secret(config)?;
    let store = SqliteAuditStore::open(&config.data_dir.join("audit.db"), secret.as_deref())?;
    let model = OnnxDetector::load(&config.model_path)?;

    let pipeline = Pipeline::new(
        PipelineSettings::from_config(config, rules),
        Arc::new(model),
        Arc::new(store),
    )?;
    Ok(pipeline)
}

fn parse_line(line: &str) -> Option<RawEvent> {
    match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => {
            warn!("event is not a JSON object; scoring as empty event");
            Some(RawEvent::new())
        }
        Err(e) => {
            warn!(error = %e, "skipping malformed event line");
            None
        }
    }
}

fn write_verdict(done: Result<EventVerdict, JoinError>) -> std::io::Result<()> {
    match done {
        Ok(verdict) => {
            let mut out = std::io::stdout().lock();
            StructuredLogger::emit_json(&verdict, &mut out)?;
            out.flush()
        }
        Err(e) => {
            error!(error = %e, "event task failed");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("TRUSTLENS_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.json"));
    let config = AppConfig::load(&config_path)?;

    StructuredLogger::init(config.log.json, &config.log.level);
    info!(data_dir = ?config.data_dir, "TrustLens agent starting");

    let pipeline = Arc::new(build_pipeline(&config)?);
    let in_flight = Arc::new(Semaphore::new(config.runtime.max_in_flight));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tasks = JoinSet::new();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = &mut ctrl_c => {
                info!("interrupted; draining in-flight events");
                break;
            }
        };
        let Some(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(raw) = parse_line(line) else { continue };

        let permit = in_flight.clone().acquire_owned().await?;
        let pipeline = pipeline.clone();
        tasks.spawn_blocking(move || {
            let verdict = pipeline.process_event(&raw);
            drop(permit);
            verdict
        });

        while let Some(done) = tasks.try_join_next() {
            write_verdict(done)?;
        }
    }

    while let Some(done) = tasks.join_next().await {
        write_verdict(done)?;
    }
    info!(audit_failures = pipeline.audit_failures(), "TrustLens agent stopping");
    Ok(())
}

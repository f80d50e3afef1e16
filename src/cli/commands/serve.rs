//! Serve command - answer line-delimited queries on stdin
//!
//! Input lines are `<entity>\t<query>[\t<offset>[\t<limit>]]`. Every line
//! gets exactly one line of JSON back: the rendered results, or an error
//! object. A background task reloads every open index periodically.

use crate::core::error::CatalogError;
use crate::core::search::{Encoding, SchemaVersion};
use crate::core::services::Services;
use clap::Args;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Results schema version (v1 or v2)
    #[arg(long, default_value = "v2")]
    pub schema_version: SchemaVersion,

    /// Seconds between reload checks (default from config)
    #[arg(long)]
    pub reload_interval: Option<u64>,
}

/// One parsed request line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeRequest {
    pub entity: String,
    pub query: String,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl ServeRequest {
    /// Parse `<entity>\t<query>[\t<offset>[\t<limit>]]`
    pub fn parse(line: &str) -> Result<Self, CatalogError> {
        let mut parts = line.split('\t');
        let entity = parts.next().unwrap_or_default().trim();
        let query = parts.next().ok_or_else(|| {
            CatalogError::InvalidQuery("Expected '<entity>\\t<query>'".to_string())
        })?;
        if entity.is_empty() {
            return Err(CatalogError::InvalidQuery("Missing entity".to_string()));
        }

        let offset = match parts.next() {
            Some(raw) => parse_number(raw, "offset")?,
            None => 0,
        };
        let limit = parts
            .next()
            .map(|raw| parse_number(raw, "limit"))
            .transpose()?;

        Ok(Self {
            entity: entity.to_string(),
            query: query.to_string(),
            offset,
            limit,
        })
    }
}

fn parse_number(raw: &str, what: &str) -> Result<usize, CatalogError> {
    raw.trim()
        .parse()
        .map_err(|_| CatalogError::InvalidQuery(format!("Invalid {what} '{raw}'")))
}

/// Execute the serve command
pub async fn execute(
    args: ServeArgs,
    services: &Arc<Services>,
) -> Result<(), Box<dyn std::error::Error>> {
    let opened = services.open_all()?;
    info!("Serving {} entities: {}", opened.len(), opened.join(", "));

    let interval = args
        .reload_interval
        .unwrap_or(services.config.search.reload_interval_sec)
        .max(1);
    let reloader = spawn_reloader(Arc::clone(services), Duration::from_secs(interval));

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let answered = serve_lines(Arc::clone(services), stdin, &mut stdout, args.schema_version).await;

    reloader.abort();
    let answered = answered?;
    info!("Input closed after {} requests", answered);
    Ok(())
}

/// Reload every open index on a fixed period
pub fn spawn_reloader(services: Arc<Services>, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let services = Arc::clone(&services);
            match tokio::task::spawn_blocking(move || services.reload_all()).await {
                Ok(outcomes) => {
                    for (entity, outcome) in outcomes {
                        if let Ok(true) = outcome {
                            info!("Reloaded '{}' index", entity);
                        }
                    }
                }
                Err(e) => warn!("Reload task failed: {}", e),
            }
        }
    })
}

/// Answer every line of `reader` on `writer`; returns the number answered
pub async fn serve_lines<R, W>(
    services: Arc<Services>,
    reader: R,
    writer: &mut W,
    version: SchemaVersion,
) -> std::io::Result<u64>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut answered = 0u64;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = answer(Arc::clone(&services), &line, version).await;
        let mut encoded = response.to_string();
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await?;
        writer.flush().await?;
        answered += 1;
    }

    Ok(answered)
}

async fn answer(services: Arc<Services>, line: &str, version: SchemaVersion) -> Value {
    let request = match ServeRequest::parse(line) {
        Ok(request) => request,
        Err(e) => return error_value(None, &e),
    };
    debug!("Request {:?}", request);

    let entity = request.entity.clone();
    let outcome = tokio::task::spawn_blocking(move || -> Result<Value, CatalogError> {
        let results = services.search(
            &request.entity,
            &request.query,
            request.offset,
            request.limit,
        )?;
        let rendered = services
            .server(&request.entity)?
            .render(&results, version, Encoding::Json)?;
        Ok(serde_json::from_str(&rendered)?)
    })
    .await;

    match outcome {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => error_value(Some(&entity), &e),
        Err(e) => error_value(
            Some(&entity),
            &CatalogError::SearchFailed(format!("Search task failed: {e}")),
        ),
    }
}

fn error_value(entity: Option<&str>, error: &CatalogError) -> Value {
    let kind = if error.is_not_found() {
        "not_found"
    } else if error.is_bad_request() {
        "bad_request"
    } else {
        "internal"
    };
    json!({
        "error": {
            "kind": kind,
            "entity": entity,
            "message": error.message(),
        }
    })
}

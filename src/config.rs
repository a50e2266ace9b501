//! Runtime configuration for the ingest server and the upload client.
//!
//! Both read environment variables (after `dotenvy` has loaded `.env`). Lookup
//! goes through a closure so tests can supply values without touching the
//! process environment.

use anyhow::{Context, Result};
use std::net::SocketAddr;

/// Files accepted per upload unless overridden.
pub const DEFAULT_MAX_FILES: usize = 10;
/// Records kept on the client per allowed file in a batch.
pub const RETENTION_FACTOR: usize = 3;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_BODY_BYTES: usize = 100 * 1024 * 1024; // 100MB
const DEFAULT_MODEL: &str = "google/gemini-2.0-flash-001";

/// Settings for the `doc-ingest` server binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub max_files: usize,
    pub max_body_bytes: usize,
    pub api_key: String,
    pub model: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr: SocketAddr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("BIND_ADDR is not a valid socket address")?;

        let max_files = parse_or(&lookup, "MAX_FILES", DEFAULT_MAX_FILES)?;
        if max_files == 0 {
            anyhow::bail!("MAX_FILES must be at least 1");
        }

        Ok(Self {
            bind_addr,
            max_files,
            max_body_bytes: parse_or(&lookup, "MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?,
            api_key: lookup("OPENROUTER_API_KEY")
                .context("OPENROUTER_API_KEY environment variable not set")?,
            model: lookup("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }
}

/// Settings for the upload client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub max_files: usize,
    /// How many records the client keeps across uploads.
    pub retention: usize,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_max_files(endpoint, DEFAULT_MAX_FILES)
    }

    pub fn with_max_files(endpoint: impl Into<String>, max_files: usize) -> Self {
        Self {
            endpoint: endpoint.into(),
            max_files,
            retention: max_files * RETENTION_FACTOR,
        }
    }
}

fn parse_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: usize) -> Result<usize> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a positive integer, got {:?}", key, raw)),
        None => Ok(default),
    }
}

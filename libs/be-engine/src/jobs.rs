use std::net::IpAddr;
use std::time::Duration;

use ipnetwork::IpNetwork;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::JobError;
use crate::transport::{TOKEN_HEADER, WIRE_TARGET};

// ═══════════════════════════════════════════════════════════════
//  Request / response bodies
// ═══════════════════════════════════════════════════════════════

/// Body of `POST job_url`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRequest {
    #[serde(rename = "type")]
    pub job_type: String,
    pub options: Vec<JobOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobOptions {
    pub worldscan: bool,
    pub ports: Vec<PortDef>,
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortDef {
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<u32>,
    pub modules: Vec<String>,
}

impl JobRequest {
    /// A single-port targeted scan.
    pub fn scan(
        job_type: impl Into<String>,
        port: u16,
        sample: Option<u32>,
        modules: Vec<String>,
        targets: Vec<String>,
    ) -> Self {
        Self {
            job_type: job_type.into(),
            options: vec![JobOptions {
                worldscan: false,
                ports: vec![PortDef {
                    port,
                    sample: sample.filter(|s| *s > 0),
                    modules,
                }],
                targets,
            }],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct JobResponse {
    #[serde(default)]
    stream_url: String,
    #[serde(default)]
    job_id: String,
    #[serde(default)]
    message: String,
}

/// An accepted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedJob {
    pub job_id: String,
    pub stream_url: String,
}

// ═══════════════════════════════════════════════════════════════
//  Argument parsing
// ═══════════════════════════════════════════════════════════════

/// Comma-separated targets; empty entries dropped.
///
/// The list must be homogeneous: all plain addresses or all CIDR ranges.
pub fn parse_targets(raw: &str) -> Result<Vec<String>, JobError> {
    let targets = split_list(raw);
    if targets.is_empty() {
        return Err(JobError::NoTargets);
    }

    let all_ips = targets.iter().all(|t| t.parse::<IpAddr>().is_ok());
    let all_cidrs = targets
        .iter()
        .all(|t| t.contains('/') && t.parse::<IpNetwork>().is_ok());
    if !all_ips && !all_cidrs {
        return Err(JobError::InvalidTargets(targets.join(",")));
    }
    Ok(targets)
}

/// Comma-separated module names, e.g. `"ssh,ftp"`.
pub fn parse_modules(raw: &str) -> Vec<String> {
    split_list(raw)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// ═══════════════════════════════════════════════════════════════
//  JobClient
// ═══════════════════════════════════════════════════════════════

/// Submits scan jobs to the platform.
pub struct JobClient {
    http: reqwest::Client,
    url: String,
}

impl JobClient {
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Result<Self, JobError> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self { http, url: url.into() })
    }

    pub async fn submit(
        &self,
        token: &str,
        request: &JobRequest,
        verbose: bool,
    ) -> Result<CreatedJob, JobError> {
        if verbose {
            tracing::info!(target: WIRE_TARGET, method = "POST", url = %self.url, "request");
        }
        let resp = self
            .http
            .post(&self.url)
            .header(TOKEN_HEADER, token)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if verbose {
            tracing::info!(target: WIRE_TARGET, status = %status, body = %body, "response");
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(JobError::Unauthorized);
        }

        let parsed: JobResponse = serde_json::from_str(&body).map_err(JobError::InvalidResponse)?;
        if parsed.job_id.is_empty() {
            let message = if parsed.message.is_empty() {
                format!("HTTP {status}")
            } else {
                parsed.message
            };
            return Err(JobError::Rejected(message));
        }

        tracing::info!(job_id = %parsed.job_id, "job created");
        Ok(CreatedJob {
            job_id: parsed.job_id,
            stream_url: parsed.stream_url,
        })
    }
}

//! Remote plate-solving service client.
//!
//! Wraps an astrometry.net-style web API: upload calibrated image bytes,
//! poll the submission until a job finishes, download the plate-solved FITS
//! bytes. The service is treated as opaque; polling at a fixed interval is
//! the only retried operation, and every failure surfaces as an error
//! value.

use std::path::Path;
use std::thread::sleep;
use std::time::{Duration, Instant};

use reqwest::blocking::{multipart, Client};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::consts::{SOLVER_POLL_INTERVAL, SOLVER_REQUEST_TIMEOUT};
use crate::error::{IsrError, Result};

const DEFAULT_BASE_URL: &str = "https://nova.astrometry.net";

/// Job status reported by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Job is queued or running.
    Processing,
    /// Job completed successfully.
    Success,
    /// Job failed.
    Failure,
}

/// Client for the remote plate-solving service.
#[derive(Debug)]
pub struct SolverClient {
    base_url: String,
    api_key: String,
    session_key: Option<String>,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    status: String,
    session: Option<String>,
    #[serde(default)]
    errormessage: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    status: String,
    subid: Option<u64>,
    #[serde(default)]
    errormessage: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmissionStatusResponse {
    jobs: Option<Vec<Option<u64>>>,
}

#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    status: Option<String>,
}

impl SolverClient {
    /// Create a client for the public service with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    /// Create a client against a specific service root.
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(SOLVER_REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            session_key: None,
            client,
        })
    }

    /// Log in and cache the session key.
    pub fn login(&mut self) -> Result<()> {
        let url = format!("{}/api/login", self.base_url);
        let request_json = serde_json::json!({ "apikey": self.api_key });

        let resp: LoginResponse = self
            .client
            .post(&url)
            .form(&[("request-json", request_json.to_string())])
            .send()?
            .json()?;

        if resp.status != "success" {
            return Err(IsrError::RemoteService(format!(
                "login failed: {}",
                resp.errormessage.unwrap_or_else(|| "unknown error".into())
            )));
        }

        self.session_key = resp.session;
        info!("logged in to plate-solving service");
        Ok(())
    }

    fn ensure_session(&mut self) -> Result<String> {
        if self.session_key.is_none() {
            self.login()?;
        }
        self.session_key
            .clone()
            .ok_or_else(|| IsrError::RemoteService("no session key after login".into()))
    }

    /// Upload an image file and return the submission id.
    pub fn upload(&mut self, image_path: &Path) -> Result<u64> {
        let session = self.ensure_session()?;
        let url = format!("{}/api/upload", self.base_url);

        let file_name = image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_contents = std::fs::read(image_path)?;

        let request_json = serde_json::json!({
            "session": session,
            "publicly_visible": "n",
            "allow_modifications": "d",
            "allow_commercial_use": "d",
        });

        let form = multipart::Form::new()
            .text("request-json", request_json.to_string())
            .part(
                "file",
                multipart::Part::bytes(file_contents)
                    .file_name(file_name)
                    .mime_str("application/octet-stream")
                    .map_err(|e| IsrError::RemoteService(e.to_string()))?,
            );

        let resp: UploadResponse = self.client.post(&url).multipart(form).send()?.json()?;

        if resp.status != "success" {
            return Err(IsrError::RemoteService(format!(
                "upload failed: {}",
                resp.errormessage.unwrap_or_else(|| "unknown error".into())
            )));
        }

        let subid = resp
            .subid
            .ok_or_else(|| IsrError::RemoteService("no submission id in response".into()))?;
        info!(subid, "uploaded image for plate solving");
        Ok(subid)
    }

    /// Job ids spawned by a submission so far.
    pub fn submission_jobs(&self, submission_id: u64) -> Result<Vec<u64>> {
        let url = format!("{}/api/submissions/{}", self.base_url, submission_id);
        let resp: SubmissionStatusResponse = self.client.get(&url).send()?.json()?;
        Ok(resp.jobs.unwrap_or_default().into_iter().flatten().collect())
    }

    /// Current status of one job.
    pub fn job_status(&self, job_id: u64) -> Result<JobStatus> {
        let url = format!("{}/api/jobs/{}", self.base_url, job_id);
        let resp: JobStatusResponse = self.client.get(&url).send()?.json()?;
        Ok(parse_job_status(resp.status.as_deref()))
    }

    /// Poll at a fixed interval until a job of the submission succeeds.
    pub fn wait_for_job(&self, submission_id: u64, timeout: Duration) -> Result<u64> {
        let start = Instant::now();
        info!(submission_id, ?timeout, "waiting for plate solve");

        loop {
            if start.elapsed() > timeout {
                return Err(IsrError::RemoteService(format!(
                    "timed out waiting for submission {submission_id}"
                )));
            }

            for job_id in self.submission_jobs(submission_id)? {
                match self.job_status(job_id)? {
                    JobStatus::Success => {
                        info!(job_id, "plate solve finished");
                        return Ok(job_id);
                    }
                    JobStatus::Failure => {
                        warn!(job_id, "plate solve job failed");
                    }
                    JobStatus::Processing => {
                        debug!(job_id, "job still processing");
                    }
                }
            }

            sleep(SOLVER_POLL_INTERVAL);
        }
    }

    /// Download the plate-solved FITS bytes for a finished job.
    pub fn download_solved(&self, job_id: u64) -> Result<Vec<u8>> {
        let url = format!("{}/new_fits_file/{}", self.base_url, job_id);
        let response = self.client.get(&url).send()?;

        if !response.status().is_success() {
            return Err(IsrError::RemoteService(format!(
                "failed to download solved image: HTTP {}",
                response.status()
            )));
        }

        let bytes = response.bytes()?;
        info!(bytes = bytes.len(), "downloaded plate-solved image");
        Ok(bytes.to_vec())
    }

    /// Upload, wait for solving, and return the solved FITS bytes.
    pub fn solve_file(&mut self, image_path: &Path, timeout: Duration) -> Result<Vec<u8>> {
        let submission_id = self.upload(image_path)?;
        let job_id = self.wait_for_job(submission_id, timeout)?;
        self.download_solved(job_id)
    }
}

fn parse_job_status(status: Option<&str>) -> JobStatus {
    match status {
        Some("success") => JobStatus::Success,
        Some("failure") => JobStatus::Failure,
        _ => JobStatus::Processing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_parsing() {
        assert_eq!(parse_job_status(Some("success")), JobStatus::Success);
        assert_eq!(parse_job_status(Some("failure")), JobStatus::Failure);
        assert_eq!(parse_job_status(Some("solving")), JobStatus::Processing);
        assert_eq!(parse_job_status(None), JobStatus::Processing);
    }

    #[test]
    fn test_client_starts_without_session() {
        let client = SolverClient::new("test_api_key").unwrap();
        assert!(client.session_key.is_none());
    }

    #[test]
    #[ignore] // Requires network access and an API key
    fn test_live_login() {
        let api_key = std::env::var("ASTROMETRY_API_KEY").expect("ASTROMETRY_API_KEY not set");
        let mut client = SolverClient::new(api_key).unwrap();
        client.login().expect("login failed");
        assert!(client.session_key.is_some());
    }
}

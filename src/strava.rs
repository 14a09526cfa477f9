//! Strava REST API access
//!
//! The tools only see the [`StravaApi`] trait; [`StravaClient`] is the
//! production implementation over the v3 HTTP API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://www.strava.com/api/v3";

/// Page size used when listing activities (API maximum)
const PAGE_SIZE: usize = 200;

#[derive(Debug, Error)]
pub enum StravaError {
    #[error("authorization failed (token missing or expired): {0}")]
    Auth(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Logged-in athlete
#[derive(Debug, Clone, Deserialize)]
pub struct Athlete {
    pub id: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityTotals {
    /// Meters
    #[serde(default)]
    pub distance: f64,
}

/// Lifetime statistics, distances in meters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AthleteStats {
    #[serde(default)]
    pub biggest_ride_distance: Option<f64>,
    #[serde(default)]
    pub all_run_totals: ActivityTotals,
    #[serde(default)]
    pub all_ride_totals: ActivityTotals,
}

/// Activity as returned by the listing and detail endpoints.
///
/// Distance is in meters and speed in m/s, exactly as Strava reports them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Activity {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub activity_type: Option<String>,
    #[serde(default)]
    pub sport_type: Option<String>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub start_date_local: String,
    #[serde(default)]
    pub elapsed_time: Option<u64>,
    #[serde(default)]
    pub average_speed: Option<f64>,
}

impl Activity {
    /// Activity type, falling back to the newer `sport_type` field
    pub fn kind(&self) -> Option<&str> {
        self.activity_type
            .as_deref()
            .or(self.sport_type.as_deref())
    }
}

/// Fitness data capability used by the tools
#[async_trait]
pub trait StravaApi: Send + Sync {
    async fn athlete(&self) -> Result<Athlete, StravaError>;

    async fn athlete_stats(&self, athlete_id: u64) -> Result<AthleteStats, StravaError>;

    /// Activities started after `after` and before `before` (unix seconds)
    async fn activities_between(&self, after: i64, before: i64)
        -> Result<Vec<Activity>, StravaError>;

    async fn activity(&self, activity_id: u64) -> Result<Activity, StravaError>;
}

/// HTTP client for the Strava v3 API
pub struct StravaClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl StravaClient {
    pub fn new(base_url: &str, access_token: impl Into<String>) -> Result<Self, StravaError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, StravaError> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(url = %url, "Strava request");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(classify_status(status, path, body));
        }

        serde_json::from_str(&body).map_err(|e| StravaError::Decode(format!("{path}: {e}")))
    }
}

fn classify_status(status: StatusCode, path: &str, body: String) -> StravaError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StravaError::Auth(body),
        StatusCode::NOT_FOUND => StravaError::NotFound(path.to_string()),
        StatusCode::TOO_MANY_REQUESTS => StravaError::RateLimited,
        _ => StravaError::Http {
            status: status.as_u16(),
            body,
        },
    }
}

#[async_trait]
impl StravaApi for StravaClient {
    async fn athlete(&self) -> Result<Athlete, StravaError> {
        self.get_json("/athlete", &[]).await
    }

    async fn athlete_stats(&self, athlete_id: u64) -> Result<AthleteStats, StravaError> {
        self.get_json(&format!("/athletes/{athlete_id}/stats"), &[])
            .await
    }

    async fn activities_between(
        &self,
        after: i64,
        before: i64,
    ) -> Result<Vec<Activity>, StravaError> {
        let mut activities = Vec::new();
        let mut page = 1usize;

        loop {
            let batch: Vec<Activity> = self
                .get_json(
                    "/athlete/activities",
                    &[
                        ("after", after.to_string()),
                        ("before", before.to_string()),
                        ("page", page.to_string()),
                        ("per_page", PAGE_SIZE.to_string()),
                    ],
                )
                .await?;

            let last_page = batch.len() < PAGE_SIZE;
            activities.extend(batch);
            if last_page {
                break;
            }
            page += 1;
        }

        tracing::debug!(count = activities.len(), pages = page, "Listed activities");
        Ok(activities)
    }

    async fn activity(&self, activity_id: u64) -> Result<Activity, StravaError> {
        self.get_json(&format!("/activities/{activity_id}"), &[])
            .await
    }
}

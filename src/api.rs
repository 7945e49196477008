//! Typed CampScout endpoints over [`AuthorizedClient`].
//!
//! Every call goes through the authorized client, so it carries the
//! persisted access token and a 401 refreshes the session and is retried
//! once. Public endpoints (search, availability, dashboard) are sent the
//! same way; the backend ignores the header there.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::AuthorizedClient;
use crate::models::{
    Alert, AlertUpdate, Availability, AvailabilityQuery, DashboardStats, Envelope, NewAlert, SearchRequest,
    SearchResults,
};
use crate::transport::ApiRequest;
use crate::types::SessionError;

pub const HEALTH_PATH: &str = "/api/health";
pub const SEARCH_PATH: &str = "/api/search";
pub const ALERTS_PATH: &str = "/api/campgrounds/alerts";
pub const DASHBOARD_STATS_PATH: &str = "/api/dashboard/stats";

fn alert_endpoint(alert_id: &str) -> String {
    format!("{ALERTS_PATH}/{alert_id}")
}

fn campground_alerts_endpoint(campground_id: &str) -> String {
    format!("/api/campgrounds/{campground_id}/alerts")
}

fn availability_endpoint(campground_id: &str) -> String {
    format!("/api/campgrounds/{campground_id}/availability")
}

#[derive(Clone)]
pub struct CampScoutApi {
    client: AuthorizedClient,
}

impl CampScoutApi {
    #[must_use]
    pub fn new(client: AuthorizedClient) -> Self {
        Self { client }
    }

    #[must_use]
    pub fn client(&self) -> &AuthorizedClient {
        &self.client
    }

    // =========================================================================
    // CAMPGROUNDS
    // =========================================================================

    /// Search campgrounds via `POST /api/search`.
    ///
    /// # Errors
    ///
    /// A transport error, a rejection, or a body that is not a result list.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResults, SessionError> {
        let results: SearchResults = self.fetch(ApiRequest::post(SEARCH_PATH, encode(request)?)).await?;
        tracing::debug!(found = results.data.len(), total = results.total_count, "campground search");
        Ok(results)
    }

    /// Check open sites via `GET /api/campgrounds/{id}/availability`.
    ///
    /// # Errors
    ///
    /// A transport error, a rejection (400 for bad dates), or a malformed
    /// body. Upstream provider failures are reported in the returned value.
    pub async fn availability(
        &self,
        campground_id: &str,
        query: &AvailabilityQuery,
    ) -> Result<Availability, SessionError> {
        let request = ApiRequest::get(availability_endpoint(campground_id))
            .with_query("start_date", &query.start_date)
            .with_query("end_date", &query.end_date)
            .with_query("nights", query.nights);
        self.fetch(request).await
    }

    // =========================================================================
    // ALERTS
    // =========================================================================

    /// Active alerts of the signed-in user, newest first.
    ///
    /// # Errors
    ///
    /// A transport error, a rejection (401 when signed out), or a malformed body.
    pub async fn list_alerts(&self) -> Result<Vec<Alert>, SessionError> {
        let envelope: Envelope<Vec<Alert>> = self.fetch(ApiRequest::get(ALERTS_PATH)).await?;
        Ok(envelope.data)
    }

    /// # Errors
    ///
    /// A transport error, a rejection, or a malformed body.
    pub async fn create_alert(&self, campground_id: &str, alert: &NewAlert) -> Result<Alert, SessionError> {
        let request = ApiRequest::post(campground_alerts_endpoint(campground_id), encode(alert)?);
        let envelope: Envelope<Alert> = self.fetch(request).await?;
        tracing::info!(alert_id = %envelope.data.id, %campground_id, "alert created");
        Ok(envelope.data)
    }

    /// # Errors
    ///
    /// A transport error, or a rejection: 404 for an unknown alert, 403 for
    /// someone else's, 400 when `update` sets nothing.
    pub async fn update_alert(&self, alert_id: &str, update: &AlertUpdate) -> Result<Alert, SessionError> {
        let request = ApiRequest::new(reqwest::Method::PATCH, alert_endpoint(alert_id)).with_body(encode(update)?);
        let envelope: Envelope<Alert> = self.fetch(request).await?;
        Ok(envelope.data)
    }

    /// Deactivate an alert. The backend keeps the row.
    ///
    /// # Errors
    ///
    /// A transport error, or a rejection: 404 for an unknown alert, 403 for
    /// someone else's.
    pub async fn delete_alert(&self, alert_id: &str) -> Result<(), SessionError> {
        self.client
            .execute_retrying(ApiRequest::new(reqwest::Method::DELETE, alert_endpoint(alert_id)))
            .await?;
        tracing::info!(%alert_id, "alert deleted");
        Ok(())
    }

    // =========================================================================
    // DASHBOARD
    // =========================================================================

    /// # Errors
    ///
    /// A transport error, a rejection, or a malformed body.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, SessionError> {
        let envelope: Envelope<DashboardStats> = self.fetch(ApiRequest::get(DASHBOARD_STATS_PATH)).await?;
        Ok(envelope.data)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, SessionError> {
        let body = self.client.execute_retrying(request).await?;
        decode(body)
    }
}

fn encode(payload: &impl Serialize) -> Result<Value, SessionError> {
    serde_json::to_value(payload).map_err(|e| SessionError::Encode(e.to_string()))
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, SessionError> {
    serde_json::from_value(body).map_err(|e| SessionError::MalformedResponse(e.to_string()))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;

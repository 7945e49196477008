//! CampScout API payloads: campground search, availability, alerts and
//! dashboard stats.
//!
//! Response types are lenient. The backend fills optional fields with empty
//! strings or omits them depending on what the upstream provider returned,
//! so everything beyond the identifying fields carries a serde default.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_SEARCH_LIMIT: u32 = 20;
pub const DEFAULT_SITE_TYPE: &str = "any";

/// `{ "success": ..., "data": ... }` wrapper used by most endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

// =============================================================================
// SEARCH
// =============================================================================

/// Body of `POST /api/search`. `rec_area_id` takes precedence over `location`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    pub nights: u32,
    pub weekend_only: bool,
    pub limit: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rec_area_id: Vec<String>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            location: None,
            activity: None,
            start_date: None,
            end_date: None,
            nights: 1,
            weekend_only: false,
            limit: DEFAULT_SEARCH_LIMIT,
            rec_area_id: Vec::new(),
        }
    }
}

impl SearchRequest {
    #[must_use]
    pub fn location(location: impl Into<String>) -> Self {
        Self { location: Some(location.into()), ..Self::default() }
    }

    #[must_use]
    pub fn with_dates(mut self, start_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        self.start_date = Some(start_date.into());
        self.end_date = Some(end_date.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Campground {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub activities: Vec<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub reservation_url: Option<String>,
    /// Facility id for availability checks and alerts; empty for placeholder results.
    #[serde(default)]
    pub recreation_gov_id: Option<String>,
}

impl Campground {
    /// Id to use for availability and alert endpoints.
    #[must_use]
    pub fn facility_id(&self) -> &str {
        self.recreation_gov_id.as_deref().filter(|id| !id.is_empty()).unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SearchResults {
    pub data: Vec<Campground>,
    #[serde(default)]
    pub total_count: usize,
    #[serde(default)]
    pub source: Option<String>,
}

// =============================================================================
// AVAILABILITY
// =============================================================================

/// Query of `GET /api/campgrounds/{id}/availability`; dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub start_date: String,
    pub end_date: String,
    pub nights: u32,
}

impl AvailabilityQuery {
    #[must_use]
    pub fn new(start_date: impl Into<String>, end_date: impl Into<String>, nights: u32) -> Self {
        Self { start_date: start_date.into(), end_date: end_date.into(), nights }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AvailableSite {
    /// Provider id, numeric or text depending on the upstream record.
    #[serde(default)]
    pub campsite_id: Value,
    #[serde(default)]
    pub campsite_title: Option<String>,
    #[serde(default)]
    pub booking_date: Option<String>,
    #[serde(default)]
    pub booking_url: Option<String>,
    #[serde(default)]
    pub recreation_area: Option<String>,
    #[serde(default)]
    pub facility_name: Option<String>,
    #[serde(default)]
    pub booking_nights: Option<u32>,
}

/// Availability report. Upstream lookup failures come back with a 200 and
/// `success: false`; see [`Availability::is_error`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Availability {
    #[serde(default)]
    pub success: bool,
    pub campground_id: String,
    #[serde(default)]
    pub campground_name: Option<String>,
    #[serde(default)]
    pub search_parameters: Option<AvailabilityQuery>,
    #[serde(default)]
    pub available_dates: Vec<String>,
    #[serde(default)]
    pub available_sites: Vec<AvailableSite>,
    #[serde(default)]
    pub total_sites_found: usize,
    #[serde(default)]
    pub total_available_dates: usize,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Availability {
    #[must_use]
    pub fn is_error(&self) -> bool {
        !self.success || self.status.as_deref() == Some("error")
    }
}

// =============================================================================
// ALERTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Alert {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Present on freshly created alerts only.
    #[serde(default)]
    pub campground_id: Option<String>,
    pub campground_name: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub site_type: Option<String>,
    #[serde(default)]
    pub party_size: Option<u32>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body of `POST /api/campgrounds/{id}/alerts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAlert {
    pub start_date: String,
    pub end_date: String,
    pub site_type: String,
    pub party_size: u32,
}

impl NewAlert {
    #[must_use]
    pub fn new(start_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        Self {
            start_date: start_date.into(),
            end_date: end_date.into(),
            site_type: DEFAULT_SITE_TYPE.to_owned(),
            party_size: 1,
        }
    }
}

/// Body of `PATCH /api/campgrounds/alerts/{id}`; only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl AlertUpdate {
    /// Pause or resume an alert.
    #[must_use]
    pub fn active(is_active: bool) -> Self {
        Self { is_active: Some(is_active), ..Self::default() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// =============================================================================
// DASHBOARD
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub total_users: u64,
    #[serde(default)]
    pub total_active_alerts: u64,
    #[serde(default)]
    pub recent_registrations: u64,
    #[serde(default)]
    pub service_status: String,
    #[serde(default)]
    pub last_updated: Option<String>,
}

#[cfg(test)]
#[path = "models_test.rs"]
mod tests;

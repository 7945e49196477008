//! CampScout session client.
//!
//! DESIGN
//! ======
//! The session manager owns the authenticated identity and the token pair.
//! Tokens live only in a [`store::TokenStore`]; every reader goes back to the
//! store so a refresh or logout is never shadowed by a stale copy. Network
//! access goes through the [`transport::HttpTransport`] seam, and
//! [`client::AuthorizedClient`] decorates it with bearer attachment and the
//! single-refresh-on-401 policy. [`api::CampScoutApi`] layers the typed
//! campground, alert and dashboard endpoints on top of that client.

pub mod api;
pub mod client;
pub mod config;
pub mod models;
pub mod session;
pub mod store;
pub mod transport;
pub mod types;

pub use api::CampScoutApi;
pub use client::AuthorizedClient;
pub use config::SessionConfig;
pub use models::{
    Alert, AlertUpdate, Availability, AvailabilityQuery, AvailableSite, Campground, DashboardStats, NewAlert,
    SearchRequest, SearchResults,
};
pub use reqwest::Method;
pub use session::SessionManager;
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport};
pub use types::{AuthFailure, Phase, RegisterProfile, Session, SessionError, User, UserId};

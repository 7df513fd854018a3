//! Named report views and navigation.
//!
//! Each view fetches its rows through a `ViewLoader`, derives its report
//! in memory, and hands the report back for rendering. Navigation between
//! views is gated on the session by `resolve`.

pub mod census;
pub mod daily;
pub mod discharges;
pub mod loader;
pub mod login;

pub use loader::ViewLoader;

use crate::backend::{RestClient, Session, ViewQuery};
use crate::config::Config;
use crate::models::ReportMetadata;
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error};

/// A navigable view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    /// Single-day census cards.
    Daily,
    /// Census trends over a range.
    Census,
    /// Discharge trends over a range.
    Discharges,
}

impl View {
    /// Map a path to its view; unknown paths land on the login view.
    pub fn from_path(path: &str) -> View {
        match path.trim_end_matches('/').to_lowercase().as_str() {
            "/dashboard" | "/daily" => View::Daily,
            "/census" | "/censustrends" => View::Census,
            "/trends" | "/dischargetrends" | "/discharges" => View::Discharges,
            _ => View::Login,
        }
    }

    /// Canonical path of the view.
    pub fn path(&self) -> &'static str {
        match self {
            View::Login => "/login",
            View::Daily => "/dashboard",
            View::Census => "/census",
            View::Discharges => "/trends",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            View::Login => "login",
            View::Daily => "daily",
            View::Census => "census",
            View::Discharges => "discharges",
        };
        f.write_str(name)
    }
}

/// Where a navigation request actually lands.
///
/// Without a session every view redirects to login; with one, the login
/// view redirects to the daily dashboard.
pub fn resolve(requested: View, session_present: bool) -> View {
    match (requested, session_present) {
        (_, false) => View::Login,
        (View::Login, true) => View::Daily,
        (view, true) => view,
    }
}

/// A rendered report together with the rows it was derived from.
pub struct Loaded<R, T> {
    pub report: R,
    /// Raw rows, kept for CSV export.
    pub rows: Vec<T>,
}

/// Everything a report view needs to fetch its rows.
pub struct ViewContext<'a> {
    pub config: &'a Config,
    pub rest: &'a RestClient,
    pub session: &'a Session,
    pub loader: &'a ViewLoader<ViewQuery>,
    pub show_progress: bool,
}

impl ViewContext<'_> {
    /// Fetch rows for `query`.
    ///
    /// Query failures are logged and yield no rows; the view renders
    /// zero-valued aggregates instead of failing.
    async fn fetch_rows<T: DeserializeOwned>(&self, query: ViewQuery) -> Vec<T> {
        let spinner = self.spinner(&format!("Loading {}...", query.view()));

        let result = self
            .loader
            .load(query.clone(), self.rest.fetch::<T>(&query, self.session))
            .await;

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        match result {
            Some(Ok(rows)) => rows,
            Some(Err(e)) => {
                error!("Error fetching {}: {}", query.view(), e);
                Vec::new()
            }
            None => {
                debug!(
                    "Request for {} was superseded by {:?}",
                    query,
                    self.loader.in_flight_key().map(|k| k.to_string())
                );
                Vec::new()
            }
        }
    }

    fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }

    fn metadata(&self, source_view: &str, row_count: usize) -> ReportMetadata {
        ReportMetadata {
            source_view: source_view.to_string(),
            generated_at: Utc::now(),
            row_count,
            user: self.session.email.clone(),
        }
    }
}

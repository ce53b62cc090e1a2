//! # HTS Core
//!
//! Core logic of the HIV testing services dashboard.
//!
//! This crate talks to a DHIS2 instance and turns its data values into what the dashboard shows:
//! - Login probe, session and organisation unit catalog
//! - Filter resolution and sequential per-period fetching
//! - Aggregation into a global summary and per-unit, per-period groups
//! - Table rows, chart series and CSV export
//!
//! **No API concerns**: HTTP servers, request parsing and the command line belong in `api-rest`,
//! `api-shared` and `cli`.

pub mod activity;
pub mod aggregation;
pub mod client;
pub mod config;
pub mod constants;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod filters;
pub mod models;
pub mod report;
pub mod session;
pub mod transport;
pub mod validation;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use activity::{ActivityEntry, ActivityLog};
pub use aggregation::{aggregate, Aggregation, AggregationGroup, GlobalSummary, TrendPoint};
pub use client::Dhis2Client;
pub use config::{CoreConfig, DataElementMapping};
pub use dashboard::{ApplyOutcome, DashboardService, DashboardView};
pub use error::{DashboardError, DashboardResult};
pub use export::CsvExport;
pub use fetcher::{FetchOutcome, SkippedPeriod};
pub use filters::{FilterSelection, PeriodSpec, ResolvedFilters};
pub use models::{DataRecord, OrganisationUnit, UserProfile};
pub use report::{ChartSeries, TableRow};
pub use session::{Credentials, Session};
pub use transport::{DirectTransport, HttpResponse, RelayTransport, Transport};

pub use hts_types::{NonEmptyText, Period};

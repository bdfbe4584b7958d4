#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Historic daily weather with a two-tier cache.
//!
//! This crate re-exports the core types, the store backends and the
//! Meteostat source, and provides the [`FetchReconciler`] that fills
//! station-year series from memory, the persistent store and the remote
//! source in that order.
//!
//! # Features
//!
//! - `meteostat` - Meteostat source for daily observations and station lookup
//! - `cache-sqlite` - SQLite-based persistent store

// Core types and traits
pub use weather_core::*;

// Store implementations
#[cfg(feature = "cache-sqlite")]
pub use weather_cache::SqliteStore;
pub use weather_cache::{MemoryStore, NoopStore};

// Sources
#[cfg(feature = "meteostat")]
pub use weather_meteostat::MeteostatClient;

/// Chart datasets and frame export.
pub mod chart;
mod config;
mod reconciler;
mod session;

pub use chart::{ChartData, ChartDataset, CommonDates, common_dates, series_color};
pub use config::ReconcilerConfig;
pub use reconciler::{FetchFailure, FetchOutcome, FetchReconciler, FetchReport, FetchState};
pub use session::Session;

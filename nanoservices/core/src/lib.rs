//! starlift_core — star-schema run engine
//!
//! This crate provides the building blocks for batch warehouse runs: typed
//! task kinds (staging, fact and dimension loads, quality gates), a validated
//! dependency graph bounded by begin/end sentinels, and an executor that
//! dispatches ready tasks concurrently with per-task retry and cooperative
//! cancellation.
//!
//! Basic usage:
//!
//! ```no_run
//! use starlift_core::builder::from_config;
//! use starlift_core::config::load_pipeline;
//! use starlift_core::connections::{ConnectionHandles, MemoryObjectStore, SqliteWarehouse};
//! use starlift_core::run::Executor;
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_pipeline("pipelines/music_warehouse.yml")?;
//! let (graph, defaults) = from_config(&config)?;
//! let handles = ConnectionHandles::new(
//!     Arc::new(SqliteWarehouse::open("warehouse.db")?),
//!     Arc::new(MemoryObjectStore::new()),
//! );
//! let report = Executor::new(defaults)
//!     .run(&graph, chrono::Utc::now(), handles)
//!     .await;
//! println!("{:?}", report.outcome);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod connections;
pub mod dag;
pub mod run;
pub mod tasks;

pub mod logging;

pub mod metrics;

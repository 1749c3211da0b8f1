//! Pipeboard - a pipeline board for tracking work through ordered stages
//!
//! This library provides the core functionality for Pipeboard, including:
//! - Database operations and migrations
//! - Data models for stages, records, and movements
//! - Repository layer for data access
//! - The pipeline controller (move, reorder, and stage deletion protocols)
//! - The board projection
//! - The REST API and the CLI
//!
//! # Example
//!
//! ```no_run
//! use pipeboard::models::{NewRecord, NewStage};
//! use pipeboard::pipeline::Pipeline;
//!
//! let pipeline = Pipeline::open_in_memory().unwrap();
//! let intake = pipeline.create_stage(&NewStage::named("Intake")).unwrap();
//! let done = pipeline.create_stage(&NewStage::named("Done")).unwrap();
//! let record = pipeline
//!     .create_record(&NewRecord::new(intake.id, "Roof", "Mike Davis"), None)
//!     .unwrap();
//! pipeline.move_record(record.id, done.id, Some("dispatcher")).unwrap();
//! ```

pub mod api;
pub mod board;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod repo;
pub mod seed;
pub mod utils;

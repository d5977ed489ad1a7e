#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`EngineError`, `ErrorCategory`)
//! - [`config`]: Engine configuration (`EngineConfig`, builder)
//! - [`event`]: Build events sent to the result sink (`BuildEvent`)
//! - [`types`]: Domain types (`ScanRequest`, `RunHandle`, `ScanResult`, `OsaScanResult`)
//! - [`client`]: Remote scan service seam (`ScanServiceClient`, `Remote`)
//! - [`archive`]: Source packaging seam (`Archiver`, `ArchiveHandle`, `FilterPattern`)
//! - [`schedule`]: Full or incremental scan decision
//! - [`guard`]: Duplicate scan guard (`DuplicateScanGuard`)
//! - [`submit`]: Project resolution and scan submission (`ScanSubmitter`)
//! - [`progress`]: Status polling with timeout and cancellation (`ScanProgressTracker`)
//! - [`report`]: Report retrieval and streaming XML aggregation (`ReportFetcher`, `ReportAggregator`)
//! - [`threshold`]: Threshold evaluation (`ThresholdPlan`, `Verdict`, `crossed`, `Violation`)
//! - [`osa`]: Open source analysis pipeline (`OsaOrchestrator`)
//! - [`summary`]: Summary document and workspace copy (`ArtifactWriter`)
//! - [`controller`]: Build run orchestrator (`ScanController`, `ScanControllerBuilder`)
//!
//! # Architecture
//!
//! ```text
//! RunContext --> ScanController
//!                    |
//!                    +--> schedule::decide --> DuplicateScanGuard --> ScanSubmitter
//!                    |                                                    |
//!                    |                                            ScanProgressTracker
//!                    |                                                    |
//!                    |                                    ReportFetcher --> ReportAggregator
//!                    |                                                    |
//!                    +--> OsaOrchestrator ----------------------> ThresholdPlan
//!                                                                         |
//!                                                          BuildReport + BuildEvent
//!                                                                         |
//!                                                                mpsc --> result sink
//! ```

pub mod archive;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod guard;
pub mod osa;
pub mod progress;
pub mod report;
pub mod schedule;
pub mod submit;
pub mod summary;
pub mod threshold;
pub mod types;

// --- Public API Re-exports ---

// Controller (main orchestrator)
pub use controller::{BuildCause, BuildReport, RunContext, ScanController, ScanControllerBuilder};

// Configuration
pub use config::{EngineConfig, EngineConfigBuilder};

// Error
pub use error::{EngineError, ErrorCategory};

// Events
pub use event::{BuildEvent, BuildEventKind, SkipReason};

// Seams
pub use archive::{ArchiveHandle, Archiver, FilterPattern};
pub use client::{OsaScanStatus, Remote, ScanServiceClient};

// Types
pub use types::{
    OsaScanResult, OsaSummary, QueryResult, ReportFormat, ReportHandle, RunHandle, ScanKind,
    ScanMetadata, ScanRequest, ScanResult, ScanStatus, Session, SeverityCounts,
};

// Report
pub use report::{ReportAggregator, ReportEventHandler, ReportFetcher, parse_report};

// Threshold
pub use threshold::{ThresholdConfig, ThresholdPlan, Verdict, Violation, crossed};

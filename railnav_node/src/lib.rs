// railnav_node/src/lib.rs

//! The railnav node: relay frames in, estimator snapshots out. All the
//! estimation lives in `railnav_core`; this crate owns configuration,
//! ingestion and I/O.

pub mod cli;
pub mod config;
pub mod ingest;
pub mod lidar;
pub mod output;
pub mod pipeline;

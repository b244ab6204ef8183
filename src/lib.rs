//! # netdrop
//!
//! This library provides the upload tracker behind the netdrop uploader:
//! per-file upload records with live progress, throughput and ETA, a
//! multipart HTTP transport, and the settings that decide where uploads go.
//!
//! The library is primarily used by the netdrop binary, but any front end
//! can drive an [`UploadTracker`](services::upload_tracker::UploadTracker)
//! and render its snapshots.

#![forbid(unsafe_code)]

pub mod model;
pub mod services;
pub mod settings;
pub mod utils;

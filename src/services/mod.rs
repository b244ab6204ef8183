//! This module provides the upload transport and the tracker that drives it

pub mod transport;
pub mod upload_tracker;

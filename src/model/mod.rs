//! This module provides the types shared by the tracker and its front ends

pub mod error;
pub mod live_progress;
pub mod snapshot;
pub mod source_file;
pub mod upload_record;
pub mod upload_response;
pub mod upload_status;

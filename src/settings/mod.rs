//! This module provides the layered application settings and the base address
//! every upload is sent to

pub mod app_settings;
pub mod base_address;

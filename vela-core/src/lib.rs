//! Vela Core
//!
//! Core library for an infrastructure management tool targeting the CDS cloud

pub mod provider;
pub mod resource;
pub mod schema;

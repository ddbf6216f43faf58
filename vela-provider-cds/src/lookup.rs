//! VDC lookup (data source)
//!
//! Read-only query over existing VDCs, filtered by id or name keyword.
//! Optionally dumps the raw API results to a JSON file.

use std::path::PathBuf;

use serde::Serialize;

use crate::client::vdc::{DescribeVdcRequest, VdcInfo};
use crate::client::{Result, VdcApi};

/// A lookup query for VDCs
#[derive(Debug, Clone, Default)]
pub struct VdcLookup {
    /// Match a single VDC by its id
    pub vdc_id: Option<String>,
    /// Match VDCs whose name contains this keyword
    pub keyword: Option<String>,
    /// Write the raw results to this file
    pub output_file: Option<PathBuf>,
}

/// One row of lookup output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VdcSummary {
    pub vdc_id: String,
    pub vdc_name: String,
    pub region_id: String,
}

impl From<VdcInfo> for VdcSummary {
    fn from(info: VdcInfo) -> Self {
        Self {
            vdc_id: info.vdc_id,
            vdc_name: info.vdc_name,
            region_id: info.region_id,
        }
    }
}

impl VdcLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(mut self, vdc_id: impl Into<String>) -> Self {
        self.vdc_id = Some(vdc_id.into());
        self
    }

    pub fn by_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    /// Run the lookup against the API
    pub async fn run<A: VdcApi + ?Sized>(&self, api: &A) -> Result<Vec<VdcSummary>> {
        let request = DescribeVdcRequest {
            vdc_id: self.vdc_id.clone(),
            keyword: self.keyword.clone(),
        };

        let vdcs = api.describe_vdc(request).await?;
        tracing::debug!(count = vdcs.len(), "received VDC lookup results");

        if let Some(path) = &self.output_file {
            let json = serde_json::to_string_pretty(&vdcs)?;
            tokio::fs::write(path, json).await?;
            tracing::debug!(path = %path.display(), "wrote lookup results");
        }

        Ok(vdcs.into_iter().map(VdcSummary::from).collect())
    }
}

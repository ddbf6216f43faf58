//! Resource schema definitions for the CDS provider

pub mod vdc;

use vela_core::schema::ResourceSchema;

/// Returns all schemas this provider knows about
pub fn all_schemas() -> Vec<ResourceSchema> {
    vec![vdc::vdc_schema(), vdc::vdc_lookup_schema()]
}

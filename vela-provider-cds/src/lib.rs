//! Vela CDS Provider
//!
//! Provider implementation for VDC (Virtual Data Center) resources on the
//! CDS cloud. Mutating calls go through the platform's asynchronous task
//! queue and are polled to completion before the handler returns.

pub mod client;
pub mod lookup;
pub mod schemas;

use std::collections::HashMap;

use vela_core::provider::{BoxFuture, Provider, ProviderError, ProviderResult, ResourceType};
use vela_core::resource::{Resource, ResourceId, State, Value};

use client::task::{TaskWaitConfig, wait_for_task};
use client::vdc::{
    AddPublicNetworkRequest, CreateVdcRequest, DeletePublicNetworkRequest, DeleteVdcRequest,
    DescribeVdcRequest, ModifyPublicNetworkRequest, PublicNetworkSpec, RenewPublicNetworkRequest,
    VdcInfo,
};
use client::{CdsClient, CdsConfig, CdsError, VdcApi};

/// Public-network fields the platform cannot change in place
const PUBLIC_NETWORK_FIXED_FIELDS: &[&str] =
    &["ipnum", "name", "floatbandwidth", "billingmethod", "type"];

/// VDC resource type
pub struct VdcType;

impl ResourceType for VdcType {
    fn name(&self) -> &'static str {
        "vdc"
    }
}

/// CDS Provider
///
/// Generic over the API seam so handlers can run against a mock in tests.
pub struct CdsProvider<A: VdcApi> {
    api: A,
    wait: TaskWaitConfig,
}

impl CdsProvider<CdsClient> {
    /// Build a provider from `CDS_API_TOKEN` / `CDS_API_ENDPOINT`
    pub fn from_env() -> Result<Self, CdsError> {
        Ok(Self::new(CdsClient::new(CdsConfig::from_env()?)))
    }
}

impl<A: VdcApi> CdsProvider<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            wait: TaskWaitConfig::default(),
        }
    }

    pub fn with_wait_config(mut self, wait: TaskWaitConfig) -> Self {
        self.wait = wait;
        self
    }

    /// Access to the underlying API, e.g. for lookups
    pub fn api(&self) -> &A {
        &self.api
    }

    fn api_error(&self, id: &ResourceId, context: &str, err: CdsError) -> ProviderError {
        ProviderError::new(format!("{context}: {err}"))
            .for_resource(id.clone())
            .with_cause(err)
    }

    async fn await_task(
        &self,
        id: &ResourceId,
        task_id: &str,
        context: &str,
    ) -> ProviderResult<Option<String>> {
        wait_for_task(&self.api, task_id, &self.wait)
            .await
            .map_err(|e| self.api_error(id, context, e))
    }

    fn state_from_info(&self, id: ResourceId, info: VdcInfo) -> State {
        let mut attributes = HashMap::new();
        attributes.insert("vdc_name".to_string(), Value::String(info.vdc_name));
        attributes.insert("region_id".to_string(), Value::String(info.region_id));

        if let Some(network) = info.public_network.first() {
            attributes.insert(
                "public_id".to_string(),
                Value::String(network.public_id.clone()),
            );

            let mut block = HashMap::new();
            if let Some(ip_num) = network.ip_num {
                block.insert("ipnum".to_string(), Value::Int(ip_num));
            }
            if let Some(name) = &network.name {
                block.insert("name".to_string(), Value::String(name.clone()));
            }
            if let Some(qos) = network.qos {
                block.insert("qos".to_string(), Value::Int(qos));
            }
            attributes.insert("public_network".to_string(), Value::Map(block));
        }

        State::existing(id, attributes).with_identifier(info.vdc_id)
    }

    async fn read_vdc(&self, id: &ResourceId, identifier: Option<&str>) -> ProviderResult<State> {
        let request = match identifier {
            Some(vdc_id) => DescribeVdcRequest {
                vdc_id: Some(vdc_id.to_string()),
                keyword: None,
            },
            // No cloud-side id yet, fall back to a name lookup
            None => DescribeVdcRequest {
                vdc_id: None,
                keyword: Some(id.name.clone()),
            },
        };

        let vdcs = self
            .api
            .describe_vdc(request)
            .await
            .map_err(|e| self.api_error(id, "Failed to describe VDCs", e))?;

        let found = vdcs.into_iter().find(|v| match identifier {
            Some(vdc_id) => v.vdc_id == vdc_id,
            None => v.vdc_name == id.name,
        });

        match found {
            Some(info) => Ok(self.state_from_info(id.clone(), info)),
            None => Ok(State::not_found(id.clone())),
        }
    }

    async fn create_vdc(&self, resource: &Resource) -> ProviderResult<State> {
        if let Err(errors) = schemas::vdc::vdc_schema().validate(&resource.attributes) {
            let joined = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ProviderError::new(joined).for_resource(resource.id.clone()));
        }

        let vdc_name = required_string(resource, "vdc_name")?;
        let region_id = required_string(resource, "region_id")?;
        let public_network = resource
            .attributes
            .get("public_network")
            .and_then(Value::as_map)
            .map(|block| public_network_spec(&resource.id, block))
            .transpose()?;

        let request = CreateVdcRequest {
            region_id,
            vdc_name,
            public_network,
        };

        let task_id = self
            .api
            .create_vdc(request)
            .await
            .map_err(|e| self.api_error(&resource.id, "Failed to create VDC", e))?;

        let vdc_id = self
            .await_task(&resource.id, &task_id, "VDC creation task")
            .await?
            .ok_or_else(|| {
                ProviderError::new("VDC creation task finished without a resource id")
                    .for_resource(resource.id.clone())
            })?;

        tracing::info!(vdc_id, name = %resource.id.name, "created VDC");

        let state = self.read_vdc(&resource.id, Some(&vdc_id)).await?;
        if state.exists {
            Ok(state)
        } else {
            // Listing can lag right after creation; fall back to the desired attributes
            tracing::debug!(vdc_id, "created VDC not yet listed, returning desired state");
            Ok(
                State::existing(resource.id.clone(), resource.attributes.clone())
                    .with_identifier(vdc_id),
            )
        }
    }

    async fn update_vdc(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        if attribute_changed(from, to, "vdc_name") {
            return Err(
                ProviderError::new("vdc_name cannot be changed after creation")
                    .for_resource(id.clone()),
            );
        }

        if attribute_changed(from, to, "region_id") {
            return Err(
                ProviderError::new("region_id cannot be changed after creation")
                    .for_resource(id.clone()),
            );
        }

        let empty = HashMap::new();
        let old = from
            .attributes
            .get("public_network")
            .and_then(Value::as_map)
            .unwrap_or(&empty);
        let new = to
            .attributes
            .get("public_network")
            .and_then(Value::as_map)
            .unwrap_or(&empty);

        if old != new {
            self.apply_public_network_change(id, identifier, from, to, old, new)
                .await?;
        }

        self.read_vdc(id, Some(identifier)).await
    }

    async fn apply_public_network_change(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
        old: &HashMap<String, Value>,
        new: &HashMap<String, Value>,
    ) -> ProviderResult<()> {
        // Attach a public network where there was none
        if old.is_empty() && !new.is_empty() {
            let request = AddPublicNetworkRequest {
                vdc_id: identifier.to_string(),
                network: public_network_spec(id, new)?,
            };
            let task_id = self
                .api
                .add_public_network(request)
                .await
                .map_err(|e| self.api_error(id, "Failed to add public network", e))?;
            self.await_task(id, &task_id, "Public network attach task")
                .await?;
            return Ok(());
        }

        let public_id = from
            .attributes
            .get("public_id")
            .or_else(|| to.attributes.get("public_id"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty());

        // Detach the public network when the block is removed
        if new.is_empty() && !old.is_empty() {
            let Some(public_id) = public_id else {
                // Nothing recorded to detach
                return Ok(());
            };
            let task_id = self
                .api
                .delete_public_network(DeletePublicNetworkRequest {
                    public_id: public_id.to_string(),
                })
                .await
                .map_err(|e| self.api_error(id, "Failed to delete public network", e))?;
            self.await_task(id, &task_id, "Public network detach task")
                .await?;
            return Ok(());
        }

        // In-place changes: only qos and autorenew are supported by the platform
        if field_changed(old, new, "qos") {
            let Some(public_id) = public_id else {
                return Err(ProviderError::new(
                    "cannot modify public network: no public_id recorded",
                )
                .for_resource(id.clone()));
            };
            let Some(qos) = new.get("qos").and_then(Value::as_int) else {
                return Err(
                    ProviderError::new("public_network.qos must be an integer")
                        .for_resource(id.clone()),
                );
            };
            let task_id = self
                .api
                .modify_public_network(ModifyPublicNetworkRequest {
                    public_id: public_id.to_string(),
                    qos,
                })
                .await
                .map_err(|e| self.api_error(id, "Failed to modify public network", e))?;
            self.await_task(id, &task_id, "Public network modify task")
                .await?;
        }

        if field_changed(old, new, "autorenew") {
            let Some(public_id) = public_id else {
                return Err(ProviderError::new(
                    "cannot renew public network: no public_id recorded",
                )
                .for_resource(id.clone()));
            };
            let Some(auto_renew) = new.get("autorenew").and_then(Value::as_int) else {
                return Err(
                    ProviderError::new("public_network.autorenew must be an integer")
                        .for_resource(id.clone()),
                );
            };
            self.api
                .renew_public_network(RenewPublicNetworkRequest {
                    public_id: public_id.to_string(),
                    auto_renew,
                })
                .await
                .map_err(|e| self.api_error(id, "Failed to renew public network", e))?;
        }

        for field in PUBLIC_NETWORK_FIXED_FIELDS {
            if field_changed(old, new, field) {
                tracing::debug!(
                    field,
                    "public_network field cannot be changed in place, skipping"
                );
            }
        }

        Ok(())
    }

    async fn delete_vdc(&self, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
        // The attached public network has to go first
        let state = self.read_vdc(id, Some(identifier)).await?;
        if let Some(public_id) = state
            .attributes
            .get("public_id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
        {
            let task_id = self
                .api
                .delete_public_network(DeletePublicNetworkRequest {
                    public_id: public_id.to_string(),
                })
                .await
                .map_err(|e| self.api_error(id, "Failed to delete public network", e))?;
            self.await_task(id, &task_id, "Public network detach task")
                .await?;
        }

        let task_id = self
            .api
            .delete_vdc(DeleteVdcRequest {
                vdc_id: identifier.to_string(),
            })
            .await
            .map_err(|e| self.api_error(id, "Failed to delete VDC", e))?;
        self.await_task(id, &task_id, "VDC deletion task").await?;

        tracing::info!(vdc_id = identifier, "deleted VDC");
        Ok(())
    }
}

/// Fetch a required string attribute from the desired state
fn required_string(resource: &Resource, key: &str) -> ProviderResult<String> {
    match resource.attributes.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(
            ProviderError::new(format!("{key} is required")).for_resource(resource.id.clone()),
        ),
    }
}

/// True when `to` declares a value that differs from what `from` recorded
fn attribute_changed(from: &State, to: &Resource, key: &str) -> bool {
    match (from.attributes.get(key), to.attributes.get(key)) {
        (Some(old), Some(new)) => old != new,
        _ => false,
    }
}

/// A field counts as changed only when both sides carry a value. The read
/// path records just what the API reports, so a one-sided pair means the
/// recorded state is partial, not that the operator changed anything.
fn field_changed(old: &HashMap<String, Value>, new: &HashMap<String, Value>, key: &str) -> bool {
    match (old.get(key), new.get(key)) {
        (Some(a), Some(b)) => a != b,
        _ => false,
    }
}

/// Convert a validated public_network block into the wire spec
fn public_network_spec(
    id: &ResourceId,
    block: &HashMap<String, Value>,
) -> ProviderResult<PublicNetworkSpec> {
    let int_field = |key: &str| -> ProviderResult<i64> {
        block.get(key).and_then(Value::as_int).ok_or_else(|| {
            ProviderError::new(format!("public_network.{key} must be an integer"))
                .for_resource(id.clone())
        })
    };
    let string_field = |key: &str| -> ProviderResult<String> {
        block
            .get(key)
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| {
                ProviderError::new(format!("public_network.{key} must be a string"))
                    .for_resource(id.clone())
            })
    };

    Ok(PublicNetworkSpec {
        ip_num: int_field("ipnum")?,
        name: block.get("name").and_then(Value::as_str).map(String::from),
        qos: int_field("qos")?,
        float_bandwidth: string_field("floatbandwidth")?,
        billing_method: string_field("billingmethod")?,
        auto_renew: int_field("autorenew")?,
        network_type: string_field("type")?,
    })
}

impl<A: VdcApi> Provider for CdsProvider<A> {
    fn name(&self) -> &'static str {
        "cds"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        vec![Box::new(VdcType)]
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(String::from);
        Box::pin(async move { self.read_vdc(&id, identifier.as_deref()).await })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_vdc(&resource).await })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_vdc(&id, &identifier, &from, &to).await })
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.delete_vdc(&id, &identifier).await })
    }
}

//! CDS API client
//!
//! Hand-written client for the platform's network endpoint. Every call names
//! an `Action` and a fixed API `Version` in the query string and receives a
//! `{ Code, Message, Data, TaskId }` envelope in response. Mutating actions
//! are asynchronous: they return a task id which must be polled to completion
//! (see [`task`]).

pub mod task;
pub mod vdc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use vdc::{
    AddPublicNetworkRequest, CreateVdcRequest, DeletePublicNetworkRequest, DeleteVdcRequest,
    DescribeVdcRequest, ModifyPublicNetworkRequest, RenewPublicNetworkRequest, TaskInfo, VdcInfo,
};

const DEFAULT_ENDPOINT: &str = "https://api.cds-cloud.example.com";
const API_VERSION: &str = "2019-08-08";
const SUCCESS_CODE: &str = "Success";

/// CDS client errors
#[derive(Error, Debug)]
pub enum CdsError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error for {action}: {message}")]
    Api { action: String, message: String },

    #[error("Task {task_id} failed: {message}")]
    TaskFailed { task_id: String, message: String },

    #[error("Task {task_id} did not finish within {timeout_secs}s")]
    TaskTimeout { task_id: String, timeout_secs: u64 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CdsError>;

/// Response envelope common to every CDS action
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiResponse<T> {
    code: String,
    message: Option<String>,
    data: Option<T>,
    task_id: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ensure_success(self, action: &str) -> Result<Self> {
        if self.code == SUCCESS_CODE {
            Ok(self)
        } else {
            Err(CdsError::Api {
                action: action.to_string(),
                message: self
                    .message
                    .unwrap_or_else(|| format!("unexpected response code {}", self.code)),
            })
        }
    }

    fn require_task_id(self, action: &str) -> Result<String> {
        self.task_id.ok_or_else(|| CdsError::Api {
            action: action.to_string(),
            message: "response did not include a task id".to_string(),
        })
    }
}

/// Client configuration
///
/// The region is not part of the client config: every operation that needs
/// one carries a `RegionId` in its request body.
#[derive(Debug, Clone)]
pub struct CdsConfig {
    pub api_token: String,
    pub endpoint: String,
}

impl CdsConfig {
    /// Create CdsConfig from environment variables
    pub fn from_env() -> Result<Self> {
        let api_token = std::env::var("CDS_API_TOKEN")
            .map_err(|_| CdsError::MissingEnvVar("CDS_API_TOKEN".to_string()))?;
        let endpoint =
            std::env::var("CDS_API_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());

        Ok(Self {
            api_token,
            endpoint,
        })
    }
}

/// HTTP client for the CDS network API
pub struct CdsClient {
    client: reqwest::Client,
    api_token: String,
    endpoint: String,
}

impl CdsClient {
    pub fn new(config: CdsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_token: config.api_token,
            endpoint: config.endpoint,
        }
    }

    fn url(&self) -> String {
        format!("{}/network", self.endpoint)
    }

    async fn get<Q, T>(&self, action: &str, query: &Q) -> Result<ApiResponse<T>>
    where
        Q: Serialize + Sync,
        T: DeserializeOwned,
    {
        tracing::debug!(action, "GET {}", self.url());
        let response = self
            .client
            .get(self.url())
            .query(&[("Action", action), ("Version", API_VERSION)])
            .query(query)
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        let envelope: ApiResponse<T> = response.json().await?;
        envelope.ensure_success(action)
    }

    async fn post<B, T>(&self, action: &str, body: &B) -> Result<ApiResponse<T>>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        tracing::debug!(action, "POST {}", self.url());
        let response = self
            .client
            .post(self.url())
            .query(&[("Action", action), ("Version", API_VERSION)])
            .bearer_auth(&self.api_token)
            .json(body)
            .send()
            .await?;

        let envelope: ApiResponse<T> = response.json().await?;
        envelope.ensure_success(action)
    }
}

/// Operations against the VDC API
///
/// The provider is written against this trait so handlers can be tested
/// without a network.
#[async_trait]
pub trait VdcApi: Send + Sync {
    /// List VDCs, optionally filtered by id or name keyword
    async fn describe_vdc(&self, request: DescribeVdcRequest) -> Result<Vec<VdcInfo>>;

    /// Create a VDC; returns the id of the provisioning task
    async fn create_vdc(&self, request: CreateVdcRequest) -> Result<String>;

    /// Delete a VDC; returns the id of the teardown task
    async fn delete_vdc(&self, request: DeleteVdcRequest) -> Result<String>;

    /// Attach a public network to a VDC; returns a task id
    async fn add_public_network(&self, request: AddPublicNetworkRequest) -> Result<String>;

    /// Detach a public network; returns a task id
    async fn delete_public_network(&self, request: DeletePublicNetworkRequest) -> Result<String>;

    /// Change the bandwidth limit of a public network; returns a task id
    async fn modify_public_network(&self, request: ModifyPublicNetworkRequest) -> Result<String>;

    /// Change the auto-renew flag of a public network
    async fn renew_public_network(&self, request: RenewPublicNetworkRequest) -> Result<()>;

    /// Query the progress of an asynchronous task
    async fn describe_task(&self, task_id: &str) -> Result<TaskInfo>;
}

#[async_trait]
impl VdcApi for CdsClient {
    async fn describe_vdc(&self, request: DescribeVdcRequest) -> Result<Vec<VdcInfo>> {
        let envelope: ApiResponse<Vec<VdcInfo>> = self.get("DescribeVdc", &request).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    async fn create_vdc(&self, request: CreateVdcRequest) -> Result<String> {
        let envelope: ApiResponse<serde_json::Value> = self.post("CreateVdc", &request).await?;
        envelope.require_task_id("CreateVdc")
    }

    async fn delete_vdc(&self, request: DeleteVdcRequest) -> Result<String> {
        let envelope: ApiResponse<serde_json::Value> = self.post("DeleteVdc", &request).await?;
        envelope.require_task_id("DeleteVdc")
    }

    async fn add_public_network(&self, request: AddPublicNetworkRequest) -> Result<String> {
        let envelope: ApiResponse<serde_json::Value> =
            self.post("AddPublicNetwork", &request).await?;
        envelope.require_task_id("AddPublicNetwork")
    }

    async fn delete_public_network(&self, request: DeletePublicNetworkRequest) -> Result<String> {
        let envelope: ApiResponse<serde_json::Value> =
            self.post("DeletePublicNetwork", &request).await?;
        envelope.require_task_id("DeletePublicNetwork")
    }

    async fn modify_public_network(&self, request: ModifyPublicNetworkRequest) -> Result<String> {
        let envelope: ApiResponse<serde_json::Value> =
            self.post("ModifyPublicNetwork", &request).await?;
        envelope.require_task_id("ModifyPublicNetwork")
    }

    async fn renew_public_network(&self, request: RenewPublicNetworkRequest) -> Result<()> {
        let _: ApiResponse<serde_json::Value> = self.post("RenewPublicNetwork", &request).await?;
        Ok(())
    }

    async fn describe_task(&self, task_id: &str) -> Result<TaskInfo> {
        let envelope: ApiResponse<TaskInfo> =
            self.get("DescribeTask", &[("TaskId", task_id)]).await?;
        envelope.data.ok_or_else(|| CdsError::Api {
            action: "DescribeTask".to_string(),
            message: "response did not include task data".to_string(),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted in-memory VdcApi for handler tests

    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use super::vdc::{TaskStatus, *};
    use super::{CdsError, Result, VdcApi};
    use async_trait::async_trait;

    #[derive(Default)]
    pub(crate) struct MockVdcApi {
        pub vdcs: Mutex<Vec<VdcInfo>>,
        /// Scripted DescribeTask answers per task id, popped front to back
        pub tasks: Mutex<HashMap<String, VecDeque<TaskInfo>>>,
        pub calls: Mutex<Vec<String>>,
        /// Actions that should fail, with the message to fail with
        pub failures: Mutex<HashMap<&'static str, String>>,
    }

    impl MockVdcApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_vdcs(vdcs: Vec<VdcInfo>) -> Self {
            let mock = Self::default();
            *mock.vdcs.lock().unwrap() = vdcs;
            mock
        }

        pub fn script_task(&self, task_id: &str, states: Vec<TaskInfo>) {
            self.tasks
                .lock()
                .unwrap()
                .insert(task_id.to_string(), states.into());
        }

        pub fn fail(&self, action: &'static str, message: &str) {
            self.failures
                .lock()
                .unwrap()
                .insert(action, message.to_string());
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, action: &'static str) -> Result<()> {
            self.calls.lock().unwrap().push(action.to_string());
            if let Some(message) = self.failures.lock().unwrap().get(action) {
                return Err(CdsError::Api {
                    action: action.to_string(),
                    message: message.clone(),
                });
            }
            Ok(())
        }
    }

    pub(crate) fn finished(resource_id: Option<&str>) -> TaskInfo {
        TaskInfo {
            status: TaskStatus::Finished,
            resource_id: resource_id.map(String::from),
            message: None,
        }
    }

    pub(crate) fn doing() -> TaskInfo {
        TaskInfo {
            status: TaskStatus::Doing,
            resource_id: None,
            message: None,
        }
    }

    pub(crate) fn failed(message: &str) -> TaskInfo {
        TaskInfo {
            status: TaskStatus::Failed,
            resource_id: None,
            message: Some(message.to_string()),
        }
    }

    #[async_trait]
    impl VdcApi for MockVdcApi {
        async fn describe_vdc(&self, request: DescribeVdcRequest) -> Result<Vec<VdcInfo>> {
            self.record("DescribeVdc")?;
            let vdcs = self.vdcs.lock().unwrap();
            Ok(vdcs
                .iter()
                .filter(|v| match &request.vdc_id {
                    Some(id) => &v.vdc_id == id,
                    None => true,
                })
                .filter(|v| match &request.keyword {
                    Some(keyword) => v.vdc_name.contains(keyword.as_str()),
                    None => true,
                })
                .cloned()
                .collect())
        }

        async fn create_vdc(&self, _request: CreateVdcRequest) -> Result<String> {
            self.record("CreateVdc")?;
            Ok("task-create".to_string())
        }

        async fn delete_vdc(&self, _request: DeleteVdcRequest) -> Result<String> {
            self.record("DeleteVdc")?;
            Ok("task-delete-vdc".to_string())
        }

        async fn add_public_network(&self, _request: AddPublicNetworkRequest) -> Result<String> {
            self.record("AddPublicNetwork")?;
            Ok("task-add-pn".to_string())
        }

        async fn delete_public_network(
            &self,
            _request: DeletePublicNetworkRequest,
        ) -> Result<String> {
            self.record("DeletePublicNetwork")?;
            Ok("task-delete-pn".to_string())
        }

        async fn modify_public_network(
            &self,
            _request: ModifyPublicNetworkRequest,
        ) -> Result<String> {
            self.record("ModifyPublicNetwork")?;
            Ok("task-modify-pn".to_string())
        }

        async fn renew_public_network(&self, _request: RenewPublicNetworkRequest) -> Result<()> {
            self.record("RenewPublicNetwork")?;
            Ok(())
        }

        async fn describe_task(&self, task_id: &str) -> Result<TaskInfo> {
            self.record("DescribeTask")?;
            let mut tasks = self.tasks.lock().unwrap();
            let next = tasks.get_mut(task_id).and_then(|queue| queue.pop_front());
            // Unscripted tasks finish immediately with no resource id
            Ok(next.unwrap_or_else(|| finished(None)))
        }
    }
}

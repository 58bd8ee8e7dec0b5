//! Synchronous Power BI client
//!
//! Wraps [PowerBiApi] and drives each call to completion on a runtime owned
//! by the client, for callers that are not async themselves.

use std::sync::Arc;

use tokio::runtime::Runtime;

use super::{
    api::PowerBiApi,
    config::{ClientConfig, ListQuery},
    error::{ClientError, Result},
};
use crate::{
    auth::TokenCredential,
    domain::{Group, GroupUser, ODataList, Pipeline, PipelineStage, UpdateGroupRequest, UpdatePipelineRequest},
    id::{GroupId, PipelineId},
};

/// Blocking Power BI client
///
/// Must not be used from within an async context; use [PowerBiApi] there.
pub struct PowerBiClient {
    api: Arc<PowerBiApi>,
    rt: Runtime,
}

impl PowerBiClient {
    /// Client for `base_url` (the public Power BI endpoint when `None`),
    /// authenticating with the platform-default credential chain
    pub fn new(base_url: Option<&str>) -> Result<Self> {
        Self::from_config(ClientConfig::with_optional_base_url(base_url))
    }

    pub fn from_config(config: ClientConfig) -> Result<Self> {
        Self::assemble(PowerBiApi::new(config)?)
    }

    pub fn with_credential(config: ClientConfig, credential: Arc<dyn TokenCredential>) -> Result<Self> {
        Self::assemble(PowerBiApi::with_credential(config, credential)?)
    }

    /// Wrap an already configured async client
    pub fn from_api(api: PowerBiApi) -> Result<Self> {
        Self::assemble(api)
    }

    fn assemble(api: PowerBiApi) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(ClientError::Runtime)?;

        Ok(Self { api: Arc::new(api), rt })
    }

    /// The async client this wraps
    pub fn api(&self) -> Arc<PowerBiApi> {
        self.api.clone()
    }

    pub fn validate_connection(&self) -> Result<()> {
        self.rt.block_on(self.api.validate_connection())
    }

    pub fn list_groups(&self, query: &ListQuery) -> Result<ODataList<Group>> {
        self.rt.block_on(self.api.list_groups(query))
    }

    pub fn get_group(&self, group_id: &GroupId) -> Result<Group> {
        self.rt.block_on(self.api.get_group(group_id))
    }

    pub fn find_group_by_name(&self, name: &str) -> Result<Option<Group>> {
        self.rt.block_on(self.api.find_group_by_name(name))
    }

    pub fn create_group(&self, name: &str) -> Result<Group> {
        self.rt.block_on(self.api.create_group(name))
    }

    pub fn update_group(&self, group_id: &GroupId, request: &UpdateGroupRequest) -> Result<()> {
        self.rt.block_on(self.api.update_group(group_id, request))
    }

    pub fn delete_group(&self, group_id: &GroupId) -> Result<()> {
        self.rt.block_on(self.api.delete_group(group_id))
    }

    pub fn get_group_users(&self, group_id: &GroupId, query: &ListQuery) -> Result<ODataList<GroupUser>> {
        self.rt.block_on(self.api.get_group_users(group_id, query))
    }

    pub fn add_group_user(&self, group_id: &GroupId, user: &GroupUser) -> Result<()> {
        self.rt.block_on(self.api.add_group_user(group_id, user))
    }

    pub fn update_group_user(&self, group_id: &GroupId, user: &GroupUser) -> Result<()> {
        self.rt.block_on(self.api.update_group_user(group_id, user))
    }

    pub fn delete_group_user(&self, group_id: &GroupId, user: &str) -> Result<()> {
        self.rt.block_on(self.api.delete_group_user(group_id, user))
    }

    pub fn list_pipelines(&self) -> Result<ODataList<Pipeline>> {
        self.rt.block_on(self.api.list_pipelines())
    }

    pub fn get_pipeline(&self, pipeline_id: &PipelineId) -> Result<Pipeline> {
        self.rt.block_on(self.api.get_pipeline(pipeline_id))
    }

    pub fn create_pipeline(&self, display_name: &str, description: Option<&str>) -> Result<Pipeline> {
        self.rt.block_on(self.api.create_pipeline(display_name, description))
    }

    pub fn update_pipeline(
        &self,
        pipeline_id: &PipelineId,
        request: &UpdatePipelineRequest,
    ) -> Result<Pipeline> {
        self.rt.block_on(self.api.update_pipeline(pipeline_id, request))
    }

    pub fn delete_pipeline(&self, pipeline_id: &PipelineId) -> Result<()> {
        self.rt.block_on(self.api.delete_pipeline(pipeline_id))
    }

    pub fn get_pipeline_stages(&self, pipeline_id: &PipelineId) -> Result<ODataList<PipelineStage>> {
        self.rt.block_on(self.api.get_pipeline_stages(pipeline_id))
    }

    pub fn assign_workspace(
        &self,
        pipeline_id: &PipelineId,
        stage_order: u32,
        workspace_id: &GroupId,
    ) -> Result<()> {
        self.rt
            .block_on(self.api.assign_workspace(pipeline_id, stage_order, workspace_id))
    }

    pub fn unassign_workspace(&self, pipeline_id: &PipelineId, stage_order: u32) -> Result<()> {
        self.rt.block_on(self.api.unassign_workspace(pipeline_id, stage_order))
    }
}

impl std::fmt::Debug for PowerBiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowerBiClient").field("api", &self.api).finish_non_exhaustive()
    }
}

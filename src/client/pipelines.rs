//! Deployment pipeline endpoints
//!
//! <https://learn.microsoft.com/en-us/rest/api/power-bi/pipelines>

use compact_str::format_compact;
use reqwest::Method;
use tracing::{debug, instrument};

use super::{
    api::{Operation, PowerBiApi},
    error::{ClientError, Result},
};
use crate::{
    domain::{
        AssignWorkspaceRequest, ODataList, Pipeline, PipelineCreationRequest, PipelineStage,
        UpdatePipelineRequest,
    },
    id::{GroupId, PipelineId},
    shape::PipelineUpdate,
};

impl PowerBiApi {
    /// Deployment pipelines the caller has access to, without stages
    #[instrument(skip(self))]
    pub async fn list_pipelines(&self) -> Result<ODataList<Pipeline>> {
        let pipelines: ODataList<Pipeline> = self
            .prepare(Method::GET, &["pipelines"])
            .await?
            .fetch(&Operation::new("ListPipelines"))
            .await?;

        debug!(pipeline_count = pipelines.len(), "Successfully fetched pipelines");
        Ok(pipelines)
    }

    /// A deployment pipeline with its stages expanded
    #[instrument(skip(self), fields(pipeline_id = %pipeline_id))]
    pub async fn get_pipeline(&self, pipeline_id: &PipelineId) -> Result<Pipeline> {
        self.prepare(Method::GET, &["pipelines", pipeline_id.as_str()])
            .await?
            .query("$expand", "stages")
            .fetch(&Operation::on("GetPipeline", pipeline_id))
            .await
    }

    #[instrument(skip(self))]
    pub async fn create_pipeline(&self, display_name: &str, description: Option<&str>) -> Result<Pipeline> {
        let request = PipelineCreationRequest {
            display_name,
            description: description.filter(|d| !d.is_empty()),
        };

        let pipeline: Pipeline = self
            .prepare(Method::POST, &["pipelines"])
            .await?
            .json(&request)?
            .fetch(&Operation::on("CreatePipeline", display_name))
            .await?;

        debug!(pipeline_id = %pipeline.id, "Created pipeline");
        Ok(pipeline)
    }

    /// Change the display name and/or description of a pipeline
    #[instrument(skip(self), fields(pipeline_id = %pipeline_id))]
    pub async fn update_pipeline(
        &self,
        pipeline_id: &PipelineId,
        request: &UpdatePipelineRequest,
    ) -> Result<Pipeline> {
        let body = PipelineUpdate::from_request(request)
            .map_err(|e| ClientError::validation("pipeline update", e))?;

        self.prepare(Method::PATCH, &["pipelines", pipeline_id.as_str()])
            .await?
            .json(&body)?
            .fetch(&Operation::on("UpdatePipeline", pipeline_id))
            .await
    }

    #[instrument(skip(self), fields(pipeline_id = %pipeline_id))]
    pub async fn delete_pipeline(&self, pipeline_id: &PipelineId) -> Result<()> {
        self.prepare(Method::DELETE, &["pipelines", pipeline_id.as_str()])
            .await?
            .execute(&Operation::on("DeletePipeline", pipeline_id))
            .await
    }

    #[instrument(skip(self), fields(pipeline_id = %pipeline_id))]
    pub async fn get_pipeline_stages(&self, pipeline_id: &PipelineId) -> Result<ODataList<PipelineStage>> {
        self.prepare(Method::GET, &["pipelines", pipeline_id.as_str(), "stages"])
            .await?
            .fetch(&Operation::on("GetPipelineStages", pipeline_id))
            .await
    }

    /// Assign a workspace to the stage with the given order
    #[instrument(skip(self), fields(pipeline_id = %pipeline_id, workspace_id = %workspace_id))]
    pub async fn assign_workspace(
        &self,
        pipeline_id: &PipelineId,
        stage_order: u32,
        workspace_id: &GroupId,
    ) -> Result<()> {
        let stage = stage_order.to_string();

        self.prepare(
            Method::POST,
            &["pipelines", pipeline_id.as_str(), "stages", &stage, "assignWorkspace"],
        )
        .await?
        .json(&AssignWorkspaceRequest { workspace_id })?
        .execute(&Operation::on("AssignWorkspace", format_compact!("{pipeline_id}/{stage}")))
        .await
    }

    /// Remove the workspace from the stage with the given order
    #[instrument(skip(self), fields(pipeline_id = %pipeline_id))]
    pub async fn unassign_workspace(&self, pipeline_id: &PipelineId, stage_order: u32) -> Result<()> {
        let stage = stage_order.to_string();

        self.prepare(
            Method::POST,
            &["pipelines", pipeline_id.as_str(), "stages", &stage, "unassignWorkspace"],
        )
        .await?
        .execute(&Operation::on("UnassignWorkspace", format_compact!("{pipeline_id}/{stage}")))
        .await
    }
}

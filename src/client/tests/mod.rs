//! Test utilities and common test fixtures for client modules

use std::{sync::Arc, time::Duration};

use serde_json::json;

use crate::{
    auth::StaticTokenCredential,
    client::{api::PowerBiApi, config::ClientConfig, retry::RetryPolicy},
    domain::{Group, PipelineStage},
    id::{GroupId, PipelineId},
};


pub const GROUP_ID: &str = "f089354e-8366-4e18-aea3-4cb4a3a50b48";
pub const PIPELINE_ID: &str = "a5ded933-57b7-41f4-b072-ed4c1f9d5824";

/// Create a sample Group for testing
pub fn sample_group() -> Group {
    Group {
        id: GroupId::new(GROUP_ID),
        name: "UNIT_TEST".into(),
        is_read_only: false,
        is_on_dedicated_capacity: false,
        ..Group::default()
    }
}

/// Create JSON representation of a workspace
pub fn sample_group_json() -> serde_json::Value {
    json!({
        "id": GROUP_ID,
        "isReadOnly": false,
        "isOnDedicatedCapacity": false,
        "name": "UNIT_TEST"
    })
}

pub fn groups_json_response() -> serde_json::Value {
    json!({
        "@odata.context": "http://api.powerbi.com/v1.0/myorg/$metadata#groups",
        "@odata.count": 1,
        "value": [sample_group_json()]
    })
}

pub fn group_users_json_response() -> serde_json::Value {
    json!({
        "value": [
            {
                "displayName": "John Nick",
                "emailAddress": "john@contoso.com",
                "groupUserAccessRight": "Admin",
                "identifier": "john@contoso.com",
                "graphId": "f2f5b2f0-5b1a-4f1e-8a8c-2b2b8f1a0c11",
                "principalType": "User"
            },
            {
                "displayName": "ContosoApp",
                "groupUserAccessRight": "Viewer",
                "identifier": "3d9b93c6-7b6d-4801-a491-1738910904fd",
                "graphId": "3d9b93c6-7b6d-4801-a491-1738910904fd",
                "principalType": "App"
            }
        ]
    })
}

/// Create JSON representation of a deployment pipeline with stages
pub fn sample_pipeline_json() -> serde_json::Value {
    json!({
        "id": PIPELINE_ID,
        "displayName": "Marketing Deployment Pipeline",
        "description": "Power BI deployment pipeline to manage marketing reports",
        "stages": [
            { "order": 0, "workspaceId": GROUP_ID, "workspaceName": "UNIT_TEST" },
            { "order": 1 },
            { "order": 2 }
        ]
    })
}

pub fn sample_stages() -> Vec<PipelineStage> {
    vec![
        PipelineStage {
            order: 0,
            workspace_id: Some(GroupId::new(GROUP_ID)),
            workspace_name: Some("UNIT_TEST".into()),
        },
        PipelineStage { order: 1, ..PipelineStage::default() },
        PipelineStage { order: 2, ..PipelineStage::default() },
    ]
}

pub fn pipeline_id() -> PipelineId {
    PipelineId::new(PIPELINE_ID)
}

/// Create Power BI API error response
pub fn power_bi_error_response(code: &str, message: Option<&str>) -> serde_json::Value {
    let mut json = json!({
        "error": { "code": code }
    });

    if let Some(message) = message {
        json["error"]["message"] = json!(message);
    }

    json
}

/// Mock HTTP server for testing
pub struct MockServer {
    pub server: wiremock::MockServer,
}

impl MockServer {
    /// Start a new mock server
    pub async fn start() -> Self {
        let server = wiremock::MockServer::start().await;
        Self { server }
    }

    /// Get the base URL of the mock server
    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    /// Create a test config pointing to this mock server
    pub fn test_config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url())
    }

    /// Client authenticating with a static "test-token", retrying with
    /// millisecond backoff
    pub fn test_api(&self) -> PowerBiApi {
        PowerBiApi::with_credential(
            self.test_config(),
            Arc::new(StaticTokenCredential::new("test-token")),
        )
        .unwrap()
        .with_retry_policy(fast_retry())
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3).with_backoff(Duration::from_millis(1), Duration::from_millis(5))
}

#[cfg(test)]
#[allow(clippy::module_inception)]
mod tests {
    use super::*;
    use crate::domain::{ODataList, Pipeline};

    #[test]
    fn test_fixtures_decode() {
        let groups: ODataList<Group> = serde_json::from_value(groups_json_response()).unwrap();
        assert_eq!(groups.count, Some(1));
        assert_eq!(groups.value, vec![sample_group()]);

        let pipeline: Pipeline = serde_json::from_value(sample_pipeline_json()).unwrap();
        assert_eq!(pipeline.id, pipeline_id());
        assert_eq!(pipeline.stages, sample_stages());
    }

    #[test]
    fn test_error_responses() {
        let error = power_bi_error_response("PowerBIEntityNotFound", None);
        assert_eq!(error["error"]["code"], "PowerBIEntityNotFound");
        assert!(error["error"].get("message").is_none());

        let error = power_bi_error_response("InvalidRequest", Some("Bad body"));
        assert_eq!(error["error"]["message"], "Bad body");
    }
}

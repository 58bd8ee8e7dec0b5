// Power BI REST API documentation: https://learn.microsoft.com/en-us/rest/api/power-bi/
use compact_str::CompactString;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::id::{GroupId, PipelineId};

/// A Power BI workspace, called a "group" by the REST API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub name: CompactString,
    #[serde(default)]
    pub is_read_only: bool,
    #[serde(default)]
    pub is_on_dedicated_capacity: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_id: Option<CompactString>,
    /// Only returned when the workspace is on dedicated capacity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_dataset_storage_format: Option<DatasetStorageFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataflow_storage_id: Option<CompactString>,
    /// Only returned when retrieving a single workspace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_analytics_workspace: Option<AzureResource>,
}

/// A user-owned Azure resource, such as a Log Analytics workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureResource {
    pub id: CompactString,
    #[serde(default)]
    pub resource_group: CompactString,
    #[serde(default)]
    pub resource_name: CompactString,
    #[serde(default)]
    pub subscription_id: CompactString,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetStorageFormat {
    Small,
    Large,
    #[serde(other)]
    Unknown,
}

/// A principal with access to a workspace.
///
/// Carries every property the API returns. Only a subset of these may be
/// sent back when assigning access; see [`crate::shape::GroupUserAssignment`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[builder(default, setter(into, strip_option))]
#[serde(rename_all = "camelCase")]
pub struct GroupUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<CompactString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<CompactString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_id: Option<CompactString>,
    #[serde(default)]
    pub group_user_access_right: AccessRight,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<CompactString>,
    #[serde(default)]
    pub principal_type: PrincipalType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ServicePrincipalProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<CompactString>,
}

/// Service principal profile; only relevant for Power BI Embedded multi-tenancy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipalProfile {
    pub id: CompactString,
    #[serde(default)]
    pub display_name: CompactString,
}

/// Access right of a principal on a workspace. Treated as a label, not a rank.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessRight {
    #[default]
    None,
    Viewer,
    Contributor,
    Member,
    Admin,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrincipalType {
    #[default]
    None,
    User,
    Group,
    App,
}

/// A deployment pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub id: PipelineId,
    pub display_name: CompactString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<CompactString>,
    /// Only populated when stages are expanded
    #[serde(default)]
    pub stages: Vec<PipelineStage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStage {
    /// Zero-based stage order: development, test, production
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<GroupId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_name: Option<CompactString>,
}

impl PipelineStage {
    pub fn has_workspace(&self) -> bool {
        self.workspace_id.is_some()
    }
}

/// OData list envelope returned by the collection endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ODataList<T> {
    #[serde(rename = "@odata.context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<CompactString>,
    #[serde(rename = "@odata.count", default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

impl<T> ODataList<T> {
    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn into_inner(self) -> Vec<T> {
        self.value
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct GroupCreationRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PipelineCreationRequest<'a> {
    pub display_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssignWorkspaceRequest<'a> {
    pub workspace_id: &'a GroupId,
}

/// Requested changes to a workspace. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateGroupRequest {
    pub name: Option<CompactString>,
    pub default_dataset_storage_format: Option<DatasetStorageFormat>,
}

impl UpdateGroupRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<CompactString>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_storage_format(mut self, format: DatasetStorageFormat) -> Self {
        self.default_dataset_storage_format = Some(format);
        self
    }
}

/// Requested changes to a deployment pipeline. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePipelineRequest {
    pub display_name: Option<CompactString>,
    pub description: Option<CompactString>,
}

impl UpdatePipelineRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_display_name(mut self, display_name: impl Into<CompactString>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<CompactString>) -> Self {
        self.description = Some(description.into());
        self
    }
}

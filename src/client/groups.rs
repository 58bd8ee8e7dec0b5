//! Workspace (group) and workspace user endpoints
//!
//! <https://learn.microsoft.com/en-us/rest/api/power-bi/groups>

use compact_str::{format_compact, CompactString};
use reqwest::Method;
use tracing::{debug, instrument};

use super::{
    api::{Operation, PowerBiApi},
    config::ListQuery,
    error::{ClientError, Result},
};
use crate::{
    domain::{Group, GroupCreationRequest, GroupUser, ODataList, UpdateGroupRequest},
    id::GroupId,
    shape::{GroupUpdate, GroupUserAssignment},
};

impl PowerBiApi {
    /// List workspaces the caller has access to
    #[instrument(skip(self))]
    pub async fn list_groups(&self, query: &ListQuery) -> Result<ODataList<Group>> {
        let groups: ODataList<Group> = self
            .prepare(Method::GET, &["groups"])
            .await?
            .query_opt("$filter", query.filter.as_deref())
            .query_count("$top", query.top)
            .query_count("$skip", query.skip)
            .fetch(&Operation::new("ListGroups"))
            .await?;

        debug!(group_count = groups.len(), "Successfully fetched groups");
        Ok(groups)
    }

    #[instrument(skip(self), fields(group_id = %group_id))]
    pub async fn get_group(&self, group_id: &GroupId) -> Result<Group> {
        self.prepare(Method::GET, &["groups", group_id.as_str()])
            .await?
            .fetch(&Operation::on("GetGroup", group_id))
            .await
    }

    /// Look a workspace up by its exact name
    #[instrument(skip(self))]
    pub async fn find_group_by_name(&self, name: &str) -> Result<Option<Group>> {
        let query = ListQuery::new().with_filter(name_filter(name));
        let groups = self.list_groups(&query).await?;

        Ok(groups.into_inner().into_iter().find(|g| g.name == name))
    }

    /// Create a new (v2) workspace
    #[instrument(skip(self))]
    pub async fn create_group(&self, name: &str) -> Result<Group> {
        let group: Group = self
            .prepare(Method::POST, &["groups"])
            .await?
            .query("workspaceV2", "True")
            .json(&GroupCreationRequest { name })?
            .fetch(&Operation::on("CreateGroup", name))
            .await?;

        debug!(group_id = %group.id, "Created group");
        Ok(group)
    }

    /// Change the name and/or dataset storage format of a workspace
    #[instrument(skip(self), fields(group_id = %group_id))]
    pub async fn update_group(&self, group_id: &GroupId, request: &UpdateGroupRequest) -> Result<()> {
        let body = GroupUpdate::from_request(request)
            .map_err(|e| ClientError::validation("group update", e))?;

        self.prepare(Method::PATCH, &["groups", group_id.as_str()])
            .await?
            .json(&body)?
            .execute(&Operation::on("UpdateGroup", group_id))
            .await
    }

    #[instrument(skip(self), fields(group_id = %group_id))]
    pub async fn delete_group(&self, group_id: &GroupId) -> Result<()> {
        self.prepare(Method::DELETE, &["groups", group_id.as_str()])
            .await?
            .execute(&Operation::on("DeleteGroup", group_id))
            .await
    }

    /// Users, groups and apps with access to a workspace
    #[instrument(skip(self), fields(group_id = %group_id))]
    pub async fn get_group_users(
        &self,
        group_id: &GroupId,
        query: &ListQuery,
    ) -> Result<ODataList<GroupUser>> {
        let users: ODataList<GroupUser> = self
            .prepare(Method::GET, &["groups", group_id.as_str(), "users"])
            .await?
            .query_count("$top", query.top)
            .query_count("$skip", query.skip)
            .fetch(&Operation::on("GetGroupUsers", group_id))
            .await?;

        debug!(user_count = users.len(), "Successfully fetched group users");
        Ok(users)
    }

    /// Grant a principal access to a workspace
    #[instrument(skip(self, user), fields(group_id = %group_id))]
    pub async fn add_group_user(&self, group_id: &GroupId, user: &GroupUser) -> Result<()> {
        let body = assignment(user)?;
        debug!(access_right = ?body.access_right(), "Assigning workspace access");

        self.prepare(Method::POST, &["groups", group_id.as_str(), "users"])
            .await?
            .json(&body)?
            .execute(&Operation::on("AddGroupUser", group_id))
            .await
    }

    /// Change the access right of a principal already on the workspace
    #[instrument(skip(self, user), fields(group_id = %group_id))]
    pub async fn update_group_user(&self, group_id: &GroupId, user: &GroupUser) -> Result<()> {
        let body = assignment(user)?;
        debug!(access_right = ?body.access_right(), "Assigning workspace access");

        self.prepare(Method::PUT, &["groups", group_id.as_str(), "users"])
            .await?
            .json(&body)?
            .execute(&Operation::on("UpdateGroupUser", group_id))
            .await
    }

    /// Remove a principal from a workspace
    ///
    /// `user` is the email address of a user or the object id of a group or
    /// service principal.
    #[instrument(skip(self), fields(group_id = %group_id))]
    pub async fn delete_group_user(&self, group_id: &GroupId, user: &str) -> Result<()> {
        self.prepare(Method::DELETE, &["groups", group_id.as_str(), "users", user])
            .await?
            .execute(&Operation::on("DeleteGroupUser", format_compact!("{group_id}/{user}")))
            .await
    }
}

fn assignment(user: &GroupUser) -> Result<GroupUserAssignment> {
    GroupUserAssignment::from_group_user(user).map_err(|e| ClientError::validation("group user", e))
}

/// OData equality filter on the workspace name; quotes are doubled
fn name_filter(name: &str) -> CompactString {
    format_compact!("name eq '{}'", name.replace('\'', "''"))
}

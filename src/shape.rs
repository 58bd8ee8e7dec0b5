//! Selection of the minimal wire shape for outgoing payloads
//!
//! The Power BI API rejects request bodies that carry properties not
//! applicable to the addressed principal, even when they are null or empty.
//! Each shape here is a sum type built by a pure function from the superset
//! entity; serialization dispatches on the variant, never on which fields
//! happen to be filled in.

use compact_str::CompactString;
use serde::Serialize;
use thiserror::Error;

use crate::domain::{
    AccessRight, DatasetStorageFormat, GroupUser, PrincipalType, UpdateGroupRequest,
    UpdatePipelineRequest,
};

/// Reasons a payload cannot be shaped into something the API accepts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("email address is only valid for users")]
    EmailRequiresUser,

    #[error("identifier is only valid for groups or apps")]
    IdentifierRequiresGroupOrApp,

    #[error("either an email address or an identifier is required")]
    MissingPrincipal,

    #[error("update request contains no changes")]
    EmptyUpdate,

    #[error("dataset storage format must be Small or Large")]
    UnsupportedStorageFormat,
}

/// Body for assigning a principal to a workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GroupUserAssignment {
    #[serde(rename_all = "camelCase")]
    Email {
        email_address: CompactString,
        group_user_access_right: AccessRight,
        principal_type: PrincipalType,
    },
    #[serde(rename_all = "camelCase")]
    Identifier {
        identifier: CompactString,
        group_user_access_right: AccessRight,
        principal_type: PrincipalType,
    },
}

impl GroupUserAssignment {
    /// Picks the addressing mode for `user`.
    ///
    /// An email address takes precedence over an identifier and is only legal
    /// for users; identifiers are only legal for groups and apps.
    pub fn from_group_user(user: &GroupUser) -> Result<Self, ShapeError> {
        if let Some(email) = non_empty(&user.email_address) {
            if user.principal_type != PrincipalType::User {
                return Err(ShapeError::EmailRequiresUser);
            }

            return Ok(Self::Email {
                email_address: email.clone(),
                group_user_access_right: user.group_user_access_right,
                principal_type: user.principal_type,
            });
        }

        if let Some(identifier) = non_empty(&user.identifier) {
            if !matches!(user.principal_type, PrincipalType::Group | PrincipalType::App) {
                return Err(ShapeError::IdentifierRequiresGroupOrApp);
            }

            return Ok(Self::Identifier {
                identifier: identifier.clone(),
                group_user_access_right: user.group_user_access_right,
                principal_type: user.principal_type,
            });
        }

        Err(ShapeError::MissingPrincipal)
    }

    /// Access right granted by this assignment
    pub fn access_right(&self) -> AccessRight {
        match self {
            Self::Email { group_user_access_right, .. }
            | Self::Identifier { group_user_access_right, .. } => *group_user_access_right,
        }
    }
}

impl TryFrom<&GroupUser> for GroupUserAssignment {
    type Error = ShapeError;

    fn try_from(user: &GroupUser) -> Result<Self, Self::Error> {
        Self::from_group_user(user)
    }
}

/// Body for a workspace PATCH
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GroupUpdate {
    #[serde(rename_all = "camelCase")]
    Name { name: CompactString },
    #[serde(rename_all = "camelCase")]
    StorageFormat { default_dataset_storage_format: DatasetStorageFormat },
    #[serde(rename_all = "camelCase")]
    Full {
        name: CompactString,
        default_dataset_storage_format: DatasetStorageFormat,
    },
}

impl GroupUpdate {
    pub fn from_request(request: &UpdateGroupRequest) -> Result<Self, ShapeError> {
        // Unknown only exists to decode formats this crate does not know about
        if request.default_dataset_storage_format == Some(DatasetStorageFormat::Unknown) {
            return Err(ShapeError::UnsupportedStorageFormat);
        }

        match (non_empty(&request.name), request.default_dataset_storage_format) {
            (Some(name), Some(format)) => Ok(Self::Full {
                name: name.clone(),
                default_dataset_storage_format: format,
            }),
            (Some(name), None) => Ok(Self::Name { name: name.clone() }),
            (None, Some(format)) => Ok(Self::StorageFormat { default_dataset_storage_format: format }),
            (None, None) => Err(ShapeError::EmptyUpdate),
        }
    }
}

/// Body for a pipeline PATCH
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PipelineUpdate {
    #[serde(rename_all = "camelCase")]
    DisplayName { display_name: CompactString },
    #[serde(rename_all = "camelCase")]
    Description { description: CompactString },
    #[serde(rename_all = "camelCase")]
    Full {
        display_name: CompactString,
        description: CompactString,
    },
}

impl PipelineUpdate {
    pub fn from_request(request: &UpdatePipelineRequest) -> Result<Self, ShapeError> {
        match (non_empty(&request.display_name), non_empty(&request.description)) {
            (Some(display_name), Some(description)) => Ok(Self::Full {
                display_name: display_name.clone(),
                description: description.clone(),
            }),
            (Some(display_name), None) => Ok(Self::DisplayName { display_name: display_name.clone() }),
            (None, Some(description)) => Ok(Self::Description { description: description.clone() }),
            (None, None) => Err(ShapeError::EmptyUpdate),
        }
    }
}

/// Empty strings count as unset, the same as the API does.
fn non_empty(value: &Option<CompactString>) -> Option<&CompactString> {
    value.as_ref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::domain::GroupUserBuilder;

    fn keys(value: &Value) -> Vec<&str> {
        let mut keys: Vec<&str> = value
            .as_object()
            .expect("shape serializes to an object")
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        keys
    }

    fn superset_user(principal_type: PrincipalType) -> GroupUser {
        GroupUserBuilder::default()
            .display_name("John Doe")
            .email_address("john.doe@example.com")
            .graph_id("0aa1b2c3")
            .group_user_access_right(AccessRight::Admin)
            .identifier("796131c3-8d85-44e1-bdfc-88ad8ba46520")
            .principal_type(principal_type)
            .user_type("Member")
            .build()
            .unwrap()
    }

    #[test]
    fn test_email_shape_for_user() {
        let shape = GroupUserAssignment::from_group_user(&superset_user(PrincipalType::User)).unwrap();
        let value = serde_json::to_value(&shape).unwrap();

        assert_eq!(keys(&value), vec!["emailAddress", "groupUserAccessRight", "principalType"]);
        assert_eq!(
            value,
            json!({
                "emailAddress": "john.doe@example.com",
                "groupUserAccessRight": "Admin",
                "principalType": "User"
            })
        );
    }

    #[test]
    fn test_email_rejected_for_non_users() {
        for principal_type in [PrincipalType::Group, PrincipalType::App, PrincipalType::None] {
            let result = GroupUserAssignment::from_group_user(&superset_user(principal_type));
            assert_eq!(result, Err(ShapeError::EmailRequiresUser));
        }
    }

    #[test]
    fn test_identifier_shape_for_groups_and_apps() {
        for principal_type in [PrincipalType::Group, PrincipalType::App] {
            let user = GroupUserBuilder::default()
                .identifier("796131c3-8d85-44e1-bdfc-88ad8ba46520")
                .display_name("Readers")
                .group_user_access_right(AccessRight::Viewer)
                .principal_type(principal_type)
                .build()
                .unwrap();

            let value = serde_json::to_value(GroupUserAssignment::try_from(&user).unwrap()).unwrap();
            assert_eq!(keys(&value), vec!["groupUserAccessRight", "identifier", "principalType"]);
            assert_eq!(value["identifier"], "796131c3-8d85-44e1-bdfc-88ad8ba46520");
            assert_eq!(value["groupUserAccessRight"], "Viewer");
        }
    }

    #[test]
    fn test_identifier_rejected_for_users() {
        for principal_type in [PrincipalType::User, PrincipalType::None] {
            let user = GroupUserBuilder::default()
                .identifier("796131c3-8d85-44e1-bdfc-88ad8ba46520")
                .principal_type(principal_type)
                .build()
                .unwrap();

            assert_eq!(
                GroupUserAssignment::from_group_user(&user),
                Err(ShapeError::IdentifierRequiresGroupOrApp)
            );
        }
    }

    #[test]
    fn test_empty_email_falls_through_to_identifier() {
        let user = GroupUserBuilder::default()
            .email_address("")
            .identifier("app-object-id")
            .principal_type(PrincipalType::App)
            .build()
            .unwrap();

        let shape = GroupUserAssignment::from_group_user(&user).unwrap();
        assert!(matches!(shape, GroupUserAssignment::Identifier { .. }));
    }

    #[test]
    fn test_missing_principal_is_rejected() {
        let user = GroupUserBuilder::default()
            .display_name("Nobody")
            .group_user_access_right(AccessRight::Admin)
            .principal_type(PrincipalType::User)
            .build()
            .unwrap();

        assert_eq!(GroupUserAssignment::from_group_user(&user), Err(ShapeError::MissingPrincipal));
    }

    #[test]
    fn test_shaping_is_deterministic() {
        let user = superset_user(PrincipalType::User);
        let first = serde_json::to_vec(&GroupUserAssignment::from_group_user(&user).unwrap()).unwrap();
        let second = serde_json::to_vec(&GroupUserAssignment::from_group_user(&user).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_group_update_shapes() {
        let name_only = GroupUpdate::from_request(&UpdateGroupRequest::new().with_name("Sales")).unwrap();
        assert_eq!(serde_json::to_value(&name_only).unwrap(), json!({ "name": "Sales" }));

        let format_only = GroupUpdate::from_request(
            &UpdateGroupRequest::new().with_storage_format(DatasetStorageFormat::Large),
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(&format_only).unwrap(),
            json!({ "defaultDatasetStorageFormat": "Large" })
        );

        let both = GroupUpdate::from_request(
            &UpdateGroupRequest::new()
                .with_name("Sales")
                .with_storage_format(DatasetStorageFormat::Small),
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(&both).unwrap(),
            json!({ "name": "Sales", "defaultDatasetStorageFormat": "Small" })
        );

        assert_eq!(
            GroupUpdate::from_request(&UpdateGroupRequest::new()),
            Err(ShapeError::EmptyUpdate)
        );

        for request in [
            UpdateGroupRequest::new().with_storage_format(DatasetStorageFormat::Unknown),
            UpdateGroupRequest::new()
                .with_name("Sales")
                .with_storage_format(DatasetStorageFormat::Unknown),
        ] {
            assert_eq!(
                GroupUpdate::from_request(&request),
                Err(ShapeError::UnsupportedStorageFormat)
            );
        }
    }

    #[test]
    fn test_pipeline_update_shapes() {
        let name_only =
            PipelineUpdate::from_request(&UpdatePipelineRequest::new().with_display_name("Finance"))
                .unwrap();
        assert_eq!(serde_json::to_value(&name_only).unwrap(), json!({ "displayName": "Finance" }));

        let description_only = PipelineUpdate::from_request(
            &UpdatePipelineRequest::new().with_description("Quarterly reports"),
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(&description_only).unwrap(),
            json!({ "description": "Quarterly reports" })
        );

        let both = PipelineUpdate::from_request(
            &UpdatePipelineRequest::new()
                .with_display_name("Finance")
                .with_description("Quarterly reports"),
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(&both).unwrap(),
            json!({ "displayName": "Finance", "description": "Quarterly reports" })
        );

        // an empty string is not a change
        assert_eq!(
            PipelineUpdate::from_request(&UpdatePipelineRequest::new().with_display_name("")),
            Err(ShapeError::EmptyUpdate)
        );
    }
}

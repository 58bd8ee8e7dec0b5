use compact_str::CompactString;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identifier of a Power BI workspace (a "group" in the REST API).
#[derive(Debug, Default, Clone, Eq, PartialEq, Hash)]
pub struct GroupId {
    value: CompactString,
}

/// Identifier of a deployment pipeline.
#[derive(Debug, Default, Clone, Eq, PartialEq, Hash)]
pub struct PipelineId {
    value: CompactString,
}

impl GroupId {
    pub fn new(id: impl Into<CompactString>) -> Self { Self { value: id.into() } }

    pub fn as_str(&self) -> &str { &self.value }
}

impl PipelineId {
    pub fn new(id: impl Into<CompactString>) -> Self { Self { value: id.into() } }

    pub fn as_str(&self) -> &str { &self.value }
}

impl From<&str> for GroupId {
    fn from(id: &str) -> Self { Self::new(id) }
}

impl From<&str> for PipelineId {
    fn from(id: &str) -> Self { Self::new(id) }
}

impl<'de> Deserialize<'de> for GroupId {
    fn deserialize<D>(deserializer: D) -> Result<GroupId, D::Error>
        where D: Deserializer<'de>,
    {
        let id = CompactString::deserialize(deserializer)?;
        Ok(GroupId::new(id))
    }
}

impl<'de> Deserialize<'de> for PipelineId {
    fn deserialize<D>(deserializer: D) -> Result<PipelineId, D::Error>
        where D: Deserializer<'de>,
    {
        let id = CompactString::deserialize(deserializer)?;
        Ok(PipelineId::new(id))
    }
}

impl Serialize for GroupId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where S: Serializer,
    {
        serializer.serialize_str(&self.value)
    }
}

impl Serialize for PipelineId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where S: Serializer,
    {
        serializer.serialize_str(&self.value)
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl std::fmt::Display for PipelineId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

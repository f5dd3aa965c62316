use serde::{Deserialize, Serialize};

pub type TagId = i64;
pub type TechStackId = i64;

/// A categorical label attached to ideas.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    /// CSS color, e.g. "#3b82f6"
    pub color: String,
}

/// A named technology suggested for implementing an idea. Unique by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TechStackItem {
    pub id: TechStackId,
    pub name: String,
}

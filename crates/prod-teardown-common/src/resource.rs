//! Discovered resources

use crate::family::{ResourceFamily, ResourceKind};
use crate::tags::Tags;
use serde::Serialize;

/// A live resource found during discovery, with the children that must be
/// removed before it (in removal order).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveredResource {
    /// Family whose handler owns the resource
    pub family: ResourceFamily,
    /// Concrete resource type
    pub kind: ResourceKind,
    /// Provider identifier (ARN, resource ID or name, whatever the delete call takes)
    pub id: String,
    /// Display name
    pub name: String,
    /// All tags on the resource, empty for kinds without a tag API
    pub tags: Tags,
    /// Children, in the order they must be removed
    pub dependents: Vec<DiscoveredResource>,
}

impl DiscoveredResource {
    pub fn new(kind: ResourceKind, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            family: kind.family(),
            kind,
            id: id.into(),
            name: name.into(),
            tags: Tags::new(),
            dependents: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_dependents(mut self, dependents: Vec<DiscoveredResource>) -> Self {
        self.dependents = dependents;
        self
    }

    /// Direct children of a given kind, in discovery order
    pub fn dependents_of(&self, kind: ResourceKind) -> impl Iterator<Item = &DiscoveredResource> {
        self.dependents.iter().filter(move |d| d.kind == kind)
    }

    /// Count this resource plus every nested dependent
    pub fn total_count(&self) -> usize {
        1 + self
            .dependents
            .iter()
            .map(DiscoveredResource::total_count)
            .sum::<usize>()
    }
}

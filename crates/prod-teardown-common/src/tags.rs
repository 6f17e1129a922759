//! Tag constants and matching for project-scoped discovery
//!
//! Resources that support tagging are matched by an exact `Project` tag.
//! Kinds that cannot be tagged (task definitions, DB subnet groups, IAM
//! roles, Lambda functions looked up by name) fall back to a case-insensitive
//! substring match on their name.

use crate::scope::ProjectScope;
use std::collections::HashMap;

/// Tag key identifying which project a resource belongs to
pub const TAG_PROJECT: &str = "Project";

/// Tag key holding the human-readable name on EC2 resources
pub const TAG_NAME: &str = "Name";

/// Tags on a resource, flattened to key/value pairs
pub type Tags = HashMap<String, String>;

/// How a family decides membership for one of its resource kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Exact `Project` tag only
    Tag,
    /// Name substring only (kind has no tag API)
    Name,
    /// Either the tag or the name
    TagOrName,
}

/// True iff the tags contain `Project = <project_tag>`.
///
/// No tags at all is a non-match, not an error.
pub fn tag_matches(tags: &Tags, scope: &ProjectScope) -> bool {
    tags.get(TAG_PROJECT).is_some_and(|value| *value == scope.project_tag)
}

/// True iff the lowercased name contains the lowercased project tag.
pub fn name_matches(name: &str, scope: &ProjectScope) -> bool {
    name.to_lowercase().contains(&scope.project_tag.to_lowercase())
}

/// Decide whether a provider-reported resource belongs to the project.
pub fn matches(strategy: MatchStrategy, name: &str, tags: &Tags, scope: &ProjectScope) -> bool {
    match strategy {
        MatchStrategy::Tag => tag_matches(tags, scope),
        MatchStrategy::Name => name_matches(name, scope),
        MatchStrategy::TagOrName => tag_matches(tags, scope) || name_matches(name, scope),
    }
}

/// Build a tag map from key/value pairs (test fixtures and SDK adapters)
pub fn tags_from<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Tags
where
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

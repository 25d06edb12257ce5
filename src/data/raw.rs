//! Strict intermediate representation of the upstream JSON:API payload
//!
//! The provider returns JSON:API documents: a `data` array of typed resources
//! plus an `included` array of related resources (players, leagues, games).
//! Rather than trusting ad-hoc dictionary access, the raw documents are
//! deserialized into these structs with every attribute explicitly optional;
//! the normalizer decides which fields are required per entity and which get
//! a fallback.

use serde::{Deserialize, Deserializer};

/// Raw response bodies from one upstream fetch, unparsed
///
/// Carries one document per endpoint round trip. Parsing is deferred to the
/// normalizer so that a fetch is just network I/O.
#[derive(Debug, Clone)]
pub struct RawPayload {
    /// Body of the `/leagues` response
    pub leagues: String,
    /// Body of the `/projections` response (with included players and games)
    pub projections: String,
}

/// A JSON:API document: primary resources plus included related resources
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDocument {
    /// Primary resources of the document
    #[serde(default)]
    pub data: Vec<RawResource>,
    /// Related resources referenced by the primary resources
    #[serde(default)]
    pub included: Vec<RawResource>,
}

impl RawDocument {
    /// Total number of resources carried by this document
    pub fn resource_count(&self) -> usize {
        self.data.len() + self.included.len()
    }
}

/// A single JSON:API resource of any type
#[derive(Debug, Clone, Deserialize)]
pub struct RawResource {
    /// Resource type tag (`league`, `new_player`, `game`, `projection`)
    #[serde(rename = "type")]
    pub kind: String,
    /// Resource ID (always a string in JSON:API)
    pub id: String,
    /// Attribute bag; every field optional
    #[serde(default)]
    pub attributes: RawAttributes,
    /// Relationships to other resources
    #[serde(default)]
    pub relationships: RawRelationships,
}

/// Union of the attributes the provider sends across all resource types
///
/// Only the fields the normalizer consumes are listed; unknown attributes
/// are ignored by serde.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAttributes {
    /// Display name (leagues and players)
    pub name: Option<String>,
    /// League category grouping
    pub category: Option<String>,
    /// Whether a league is active
    pub active: Option<bool>,
    /// Player team abbreviation
    pub team: Option<String>,
    /// Player position
    pub position: Option<String>,
    /// Projection stat type (e.g. "Points")
    pub stat_type: Option<String>,
    /// Projection line value; the provider sends this as number or string
    #[serde(default, deserialize_with = "number_or_string")]
    pub line_score: Option<f64>,
    /// Projection description
    pub description: Option<String>,
    /// ISO 8601 start time
    pub start_time: Option<String>,
    /// Game status
    pub status: Option<String>,
    /// Game home team
    pub home_team: Option<String>,
    /// Game away team
    pub away_team: Option<String>,
    /// Whether a projection is active
    pub is_active: Option<bool>,
}

/// Relationships block of a projection resource
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRelationships {
    /// The player this projection is for
    pub new_player: Option<RawRelationship>,
    /// The league this projection belongs to
    pub league: Option<RawRelationship>,
    /// The game this projection is attached to
    pub game: Option<RawRelationship>,
}

/// A single to-one relationship
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRelationship {
    /// Reference to the related resource; null when absent
    pub data: Option<RawRef>,
}

impl RawRelationship {
    /// Returns the referenced resource ID, if the relationship is populated
    pub fn id(&self) -> Option<&str> {
        self.data.as_ref().map(|r| r.id.as_str())
    }
}

/// A resource identifier inside a relationship
#[derive(Debug, Clone, Deserialize)]
pub struct RawRef {
    /// Resource type of the referenced entity
    #[serde(rename = "type")]
    pub kind: String,
    /// ID of the referenced entity
    pub id: String,
}

/// Deserializes a value that may arrive as a JSON number or a numeric string
fn number_or_string<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        Text(String),
    }

    let value = Option::<NumberOrString>::deserialize(deserializer)?;
    Ok(match value {
        Some(NumberOrString::Number(n)) => Some(n),
        Some(NumberOrString::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_projection_resource() {
        let json = r#"{
            "type": "projection",
            "id": "123",
            "attributes": {
                "stat_type": "Points",
                "line_score": 27.5,
                "is_active": true
            },
            "relationships": {
                "new_player": {"data": {"type": "new_player", "id": "p9"}},
                "league": {"data": {"type": "league", "id": "7"}},
                "game": {"data": null}
            }
        }"#;

        let resource: RawResource = serde_json::from_str(json).expect("Should parse resource");

        assert_eq!(resource.kind, "projection");
        assert_eq!(resource.id, "123");
        assert_eq!(resource.attributes.stat_type.as_deref(), Some("Points"));
        assert_eq!(resource.attributes.line_score, Some(27.5));
        assert_eq!(
            resource.relationships.new_player.as_ref().and_then(|r| r.id()),
            Some("p9")
        );
        assert_eq!(
            resource.relationships.league.as_ref().and_then(|r| r.id()),
            Some("7")
        );
        assert!(resource
            .relationships
            .game
            .as_ref()
            .and_then(|r| r.id())
            .is_none());
    }

    #[test]
    fn test_line_score_as_string() {
        let json = r#"{
            "type": "projection",
            "id": "1",
            "attributes": {"line_score": "27.5"}
        }"#;

        let resource: RawResource = serde_json::from_str(json).expect("Should parse resource");
        assert_eq!(resource.attributes.line_score, Some(27.5));
    }

    #[test]
    fn test_unparseable_line_score_becomes_none() {
        let json = r#"{
            "type": "projection",
            "id": "1",
            "attributes": {"line_score": "n/a"}
        }"#;

        let resource: RawResource = serde_json::from_str(json).expect("Should parse resource");
        assert!(resource.attributes.line_score.is_none());
    }

    #[test]
    fn test_document_with_missing_included_defaults_empty() {
        let json = r#"{"data": [{"type": "league", "id": "7", "attributes": {"name": "NBA"}}]}"#;

        let doc: RawDocument = serde_json::from_str(json).expect("Should parse document");
        assert_eq!(doc.data.len(), 1);
        assert!(doc.included.is_empty());
        assert_eq!(doc.resource_count(), 1);
    }
}

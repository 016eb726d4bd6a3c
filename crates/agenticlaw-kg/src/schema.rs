//! Static entity-kind registry (spec §4.2), ported from
//! `beezle_bug/memory/entity_schemas.py`. Advisory only — never rejects
//! non-conforming data; used to render system-prompt guidance and to score
//! how complete an entity's properties are.

use agenticlaw_core::KgEntity;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntitySchema {
    pub kind: &'static str,
    pub expected_properties: &'static [&'static str],
    pub common_relationships: &'static [&'static str],
}

pub const ENTITY_SCHEMAS: &[EntitySchema] = &[
    EntitySchema {
        kind: "person",
        expected_properties: &["role", "affiliation", "notes"],
        common_relationships: &["works_for", "lives_in", "knows", "member_of"],
    },
    EntitySchema {
        kind: "organization",
        expected_properties: &["industry", "founded", "headquarters"],
        common_relationships: &["located_in", "owns", "partners_with"],
    },
    EntitySchema {
        kind: "city",
        expected_properties: &["population", "country"],
        common_relationships: &["located_in", "capital_of"],
    },
    EntitySchema {
        kind: "country",
        expected_properties: &["region", "capital"],
        common_relationships: &["located_in", "borders"],
    },
    EntitySchema {
        kind: "region",
        expected_properties: &["country"],
        common_relationships: &["located_in"],
    },
    EntitySchema {
        kind: "product",
        expected_properties: &["maker", "category"],
        common_relationships: &["made_by", "competes_with"],
    },
    EntitySchema {
        kind: "programming_language",
        expected_properties: &["paradigm", "first_released"],
        common_relationships: &["influenced_by", "used_for"],
    },
    EntitySchema {
        kind: "event",
        expected_properties: &["date", "location"],
        common_relationships: &["occurred_in", "organized_by"],
    },
    EntitySchema {
        kind: "landmark",
        expected_properties: &["location", "category"],
        common_relationships: &["located_in"],
    },
    EntitySchema {
        kind: "concept",
        expected_properties: &["domain", "definition"],
        common_relationships: &["related_to", "part_of"],
    },
];

/// Registry handle, so callers don't need to know the backing slice is
/// `'static`.
pub struct EntitySchemaRegistry;

impl EntitySchemaRegistry {
    pub fn lookup(kind: &str) -> Option<&'static EntitySchema> {
        ENTITY_SCHEMAS.iter().find(|s| s.kind == kind)
    }

    /// Human-readable summary for system-prompt rendering.
    pub fn summarize() -> String {
        ENTITY_SCHEMAS
            .iter()
            .map(|s| {
                format!(
                    "{}: properties [{}], relationships [{}]",
                    s.kind,
                    s.expected_properties.join(", "),
                    s.common_relationships.join(", ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Fraction of the schema's expected properties present on `entity`,
    /// using its `kind` property (if set) to select the schema. Entities
    /// with no recognised `kind` score 0.0.
    pub fn completeness_score(entity: &KgEntity) -> f32 {
        let Some(kind) = entity.properties.get("kind") else {
            return 0.0;
        };
        let Some(schema) = Self::lookup(kind) else {
            return 0.0;
        };
        if schema.expected_properties.is_empty() {
            return 1.0;
        }
        let present = schema
            .expected_properties
            .iter()
            .filter(|p| entity.properties.contains_key(**p))
            .count();
        present as f32 / schema.expected_properties.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn completeness_score_counts_expected_properties() {
        let mut props = BTreeMap::new();
        props.insert("kind".to_string(), "person".to_string());
        props.insert("role".to_string(), "engineer".to_string());
        let entity = KgEntity {
            name: "Alice".to_string(),
            properties: props,
        };
        let score = EntitySchemaRegistry::completeness_score(&entity);
        assert!((score - (1.0 / 3.0)).abs() < 0.01);
    }

    #[test]
    fn unknown_kind_scores_zero() {
        let entity = KgEntity {
            name: "Mystery".to_string(),
            properties: BTreeMap::new(),
        };
        assert_eq!(EntitySchemaRegistry::completeness_score(&entity), 0.0);
    }
}

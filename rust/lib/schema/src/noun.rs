//! NounSchema: the parsed, ordered field map for one noun.

use indexmap::IndexMap;
use nounbase_core::ServiceError;
use serde_json::{Map, Value};

use crate::field::{FieldDef, RelationOp, is_noun_name};

/// Fields every record carries regardless of schema.
pub const SYSTEM_FIELDS: &[&str] = &["id", "createdAt", "updatedAt"];

/// A relationship field borrowed out of a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationField<'a> {
    pub name: &'a str,
    pub op: RelationOp,
    pub target: &'a str,
    pub many: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NounSchema {
    noun: String,
    fields: IndexMap<String, FieldDef>,
}

impl NounSchema {
    /// Build a schema from already-parsed definitions.
    pub fn new(
        noun: &str,
        fields: impl IntoIterator<Item = (String, FieldDef)>,
    ) -> Result<Self, ServiceError> {
        if !is_noun_name(noun) {
            return Err(ServiceError::MalformedSchema(format!(
                "invalid noun name '{}'",
                noun
            )));
        }
        let mut map = IndexMap::new();
        for (name, def) in fields {
            if SYSTEM_FIELDS.contains(&name.as_str()) {
                return Err(ServiceError::MalformedSchema(format!(
                    "{}.{} is a reserved field",
                    noun, name
                )));
            }
            map.insert(name, def);
        }
        Ok(Self { noun: noun.to_string(), fields: map })
    }

    /// Parse a schema from its JSON form (field name -> definition).
    pub fn parse(noun: &str, defs: &Map<String, Value>) -> Result<Self, ServiceError> {
        let mut fields = Vec::with_capacity(defs.len());
        for (name, value) in defs {
            let def = FieldDef::from_value(value).map_err(|e| {
                ServiceError::MalformedSchema(format!("{}.{}: {}", noun, name, e))
            })?;
            fields.push((name.clone(), def));
        }
        let schema = Self::new(noun, fields)?;
        tracing::debug!(
            noun = noun,
            fields = schema.len(),
            relations = schema.relations().count(),
            "parsed schema"
        );
        Ok(schema)
    }

    pub fn noun(&self) -> &str {
        &self.noun
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDef)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Every relationship field, in declaration order.
    pub fn relations(&self) -> impl Iterator<Item = RelationField<'_>> {
        self.fields.iter().filter_map(|(name, def)| {
            def.as_relation().map(|(op, target)| RelationField {
                name: name.as_str(),
                op,
                target,
                many: def.many,
            })
        })
    }

    pub fn relation(&self, name: &str) -> Option<RelationField<'_>> {
        self.relations().find(|r| r.name == name)
    }

    /// Forward relation fields that point at `noun`.
    pub fn forward_relations_to<'a>(
        &'a self,
        noun: &'a str,
    ) -> impl Iterator<Item = RelationField<'a>> + 'a {
        self.relations()
            .filter(move |r| r.op.is_forward() && r.target == noun)
    }

    /// Names of all nouns referenced by relation fields.
    pub fn relation_targets(&self) -> Vec<&str> {
        let mut targets: Vec<&str> = Vec::new();
        for r in self.relations() {
            if !targets.contains(&r.target) {
                targets.push(r.target);
            }
        }
        targets
    }

    /// JSON form using the canonical definition strings.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        for (name, def) in &self.fields {
            obj.insert(name.clone(), Value::String(def.to_string()));
        }
        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defs(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn parse_keeps_declaration_order() {
        let schema = NounSchema::parse(
            "Order",
            &defs(json!({
                "number": "string",
                "customer": "->Customer",
                "status": "open | closed",
                "items": ["->Product"],
                "placedAt": "datetime?",
            })),
        )
        .unwrap();

        let names: Vec<&str> = schema.fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["number", "customer", "status", "items", "placedAt"]);
        assert_eq!(schema.noun(), "Order");
        assert_eq!(schema.len(), 5);
    }

    #[test]
    fn relations_are_collected() {
        let schema = NounSchema::parse(
            "Organization",
            &defs(json!({
                "name": "string",
                "owner": "->User",
                "members": "<-User",
                "topics": "~>Topic[]",
            })),
        )
        .unwrap();

        let rels: Vec<RelationField> = schema.relations().collect();
        assert_eq!(rels.len(), 3);
        assert_eq!(rels[0], RelationField {
            name: "owner",
            op: RelationOp::ForwardExact,
            target: "User",
            many: false,
        });
        assert_eq!(rels[1].op, RelationOp::BackwardExact);
        assert!(rels[2].many);
        assert_eq!(schema.relation_targets(), vec!["User", "Topic"]);
        assert!(schema.relation("name").is_none());
        assert_eq!(schema.relation("members").unwrap().target, "User");
    }

    #[test]
    fn forward_relations_to_target() {
        let schema = NounSchema::parse(
            "User",
            &defs(json!({
                "organization": "->Organization",
                "previousOrgs": ["~>Organization"],
                "followers": "<-Organization",
                "manager": "->User",
            })),
        )
        .unwrap();

        let names: Vec<&str> = schema
            .forward_relations_to("Organization")
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["organization", "previousOrgs"]);
    }

    #[test]
    fn malformed_field_names_noun_and_field() {
        let err = NounSchema::parse("User", &defs(json!({"org": "=>Organization"}))).unwrap_err();
        match err {
            ServiceError::MalformedSchema(msg) => {
                assert!(msg.starts_with("User.org:"), "{}", msg);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn reserved_fields_rejected() {
        let err = NounSchema::parse("User", &defs(json!({"id": "string"}))).unwrap_err();
        assert!(matches!(err, ServiceError::MalformedSchema(_)));
    }

    #[test]
    fn invalid_noun_name_rejected() {
        assert!(NounSchema::parse("bad noun", &Map::new()).is_err());
        assert!(NounSchema::parse("9Lives", &Map::new()).is_err());
    }

    #[test]
    fn to_json_is_canonical() {
        let schema = NounSchema::parse(
            "Post",
            &defs(json!({"tags": ["->Tag"], "state": "'a' | 'b'"})),
        )
        .unwrap();
        assert_eq!(schema.to_json(), json!({"tags": "->Tag[]", "state": "a | b"}));
    }
}

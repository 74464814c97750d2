//! Component schema declarations.
//!
//! Every component kind declares its fields once, at registration time. The
//! schema drives three things at runtime:
//!
//! - filling in defaults and validating partial records passed to
//!   `add_component_json`,
//! - computing per-field dirty bits when a record is updated,
//! - finding entity references inside records so they can be remapped when an
//!   entity moves to another simulation instance.
//!
//! [`ComponentSchema::to_json`] exports the same description for editor and
//! inspector tooling.

use serde_json::{Map, Value};

use crate::component::Category;
use crate::entity::Entity;
use crate::error::StoreError;

/// The type of a single schema field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Bool,
    /// Any signed or unsigned integer.
    Int,
    Float,
    String,
    /// A reference to another entity.
    Entity,
    /// A list of entity references.
    EntityList,
    /// A unit enumeration serialised as one of the given variant names.
    Enum(&'static [&'static str]),
    /// A nested record, named for tooling.
    Record(&'static str),
    List(Box<FieldType>),
}

/// How a field behaves when it is absent or null in partial data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldModifier {
    /// Must be supplied and must not be null.
    Required,
    /// Falls back to the default value when absent; null is rejected.
    Default,
    /// Falls back to the default value when absent or null.
    Optional,
    /// Falls back to the default when absent; an explicit null is stored.
    Nullable,
}

impl FieldModifier {
    fn as_str(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Default => "default",
            Self::Optional => "optional",
            Self::Nullable => "nullable",
        }
    }
}

/// A single named field of a component kind.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub ty: FieldType,
    pub modifier: FieldModifier,
}

impl FieldDescriptor {
    /// A default-valued field.
    #[must_use]
    pub fn new(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            modifier: FieldModifier::Default,
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.modifier = FieldModifier::Required;
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.modifier = FieldModifier::Optional;
        self
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.modifier = FieldModifier::Nullable;
        self
    }
}

/// The declared shape of one component kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSchema {
    pub name: &'static str,
    pub category: Category,
    pub fields: Vec<FieldDescriptor>,
}

impl ComponentSchema {
    #[must_use]
    pub fn new(name: &'static str, category: Category) -> Self {
        Self {
            name,
            category,
            fields: Vec::new(),
        }
    }

    /// Append a field. Field order defines dirty-bit positions.
    #[must_use]
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// An empty record is a zero-sized tag.
    #[must_use]
    pub fn is_tag(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the dirty-bit position of a field.
    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// A mask with one bit set per declared field.
    #[must_use]
    pub fn full_mask(&self) -> u64 {
        match self.fields.len() {
            0 => 0,
            n if n >= 64 => u64::MAX,
            n => (1u64 << n) - 1,
        }
    }

    /// Merge partial `data` over the serialised `defaults` record.
    ///
    /// Unknown fields, missing required fields, disallowed nulls and values of
    /// the wrong shape are rejected.
    pub fn resolve(&self, defaults: Value, data: Option<Value>) -> Result<Value, StoreError> {
        let mut record = match defaults {
            Value::Object(map) => map,
            // Unit-like tags serialise as null.
            _ => Map::new(),
        };

        let provided = match data {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => return Err(self.invalid("expected JSON object")),
        };

        for key in provided.keys() {
            if self.field_index(key).is_none() {
                return Err(self.invalid(format!("unknown field '{key}'")));
            }
        }

        for field in &self.fields {
            match (provided.get(field.name), field.modifier) {
                (None, FieldModifier::Required) => {
                    return Err(self.invalid(format!("missing required field '{}'", field.name)));
                }
                (None, _) => {}
                (Some(Value::Null), FieldModifier::Nullable) => {
                    record.insert(field.name.to_string(), Value::Null);
                }
                (Some(Value::Null), FieldModifier::Optional) => {}
                (Some(Value::Null), _) => {
                    return Err(self.invalid(format!("field '{}' is not nullable", field.name)));
                }
                (Some(value), _) => {
                    check_type(value, &field.ty)
                        .map_err(|msg| self.invalid(format!("field '{}': {msg}", field.name)))?;
                    record.insert(field.name.to_string(), value.clone());
                }
            }
        }

        Ok(Value::Object(record))
    }

    /// One bit per field whose serialised value differs between two records.
    #[must_use]
    pub fn diff_mask(&self, before: &Value, after: &Value) -> u64 {
        let mut mask = 0;
        for (i, field) in self.fields.iter().enumerate().take(64) {
            if before.get(field.name) != after.get(field.name) {
                mask |= 1 << i;
            }
        }
        mask
    }

    /// Every entity referenced by a serialised record, in field order.
    #[must_use]
    pub fn entity_refs(&self, record: &Value) -> Vec<Entity> {
        let mut out = Vec::new();
        for field in &self.fields {
            match (&field.ty, record.get(field.name)) {
                (FieldType::Entity, Some(v)) => out.extend(as_entity(v)),
                (FieldType::EntityList, Some(Value::Array(items))) => {
                    out.extend(items.iter().filter_map(as_entity));
                }
                _ => {}
            }
        }
        out
    }

    /// Rewrite entity references in a serialised record.
    ///
    /// Single references that `map` drops become null; dropped list entries
    /// are removed. Nested records are left untouched.
    pub fn remap_entities(&self, record: &mut Value, map: &impl Fn(Entity) -> Option<Entity>) {
        let Some(obj) = record.as_object_mut() else {
            return;
        };
        for field in &self.fields {
            let Some(slot) = obj.get_mut(field.name) else {
                continue;
            };
            match field.ty {
                FieldType::Entity => {
                    if let Some(e) = as_entity(slot) {
                        *slot = map(e).map_or(Value::Null, |m| Value::from(m.id()));
                    }
                }
                FieldType::EntityList => {
                    if let Value::Array(items) = slot {
                        let remapped: Vec<Value> = items
                            .iter()
                            .filter_map(as_entity)
                            .filter_map(map)
                            .map(|m| Value::from(m.id()))
                            .collect();
                        *items = remapped;
                    }
                }
                _ => {}
            }
        }
    }

    /// Serialise the schema to a JSON description for tooling.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "category": self.category.to_string(),
            "is_tag": self.is_tag(),
            "fields": self.fields.iter().map(|f| {
                serde_json::json!({
                    "name": f.name,
                    "type": type_name(&f.ty),
                    "modifier": f.modifier.as_str(),
                })
            }).collect::<Vec<_>>(),
        })
    }

    fn invalid(&self, message: impl Into<String>) -> StoreError {
        StoreError::Validation {
            component: self.name.to_string(),
            message: message.into(),
        }
    }
}

fn as_entity(value: &Value) -> Option<Entity> {
    value
        .as_u64()
        .and_then(|raw| u32::try_from(raw).ok())
        .map(Entity)
}

fn check_type(value: &Value, ty: &FieldType) -> Result<(), String> {
    match ty {
        FieldType::Bool => value.as_bool().map(|_| ()).ok_or_else(|| "expected bool".into()),
        FieldType::Int => {
            if value.is_i64() || value.is_u64() {
                Ok(())
            } else {
                Err("expected integer".into())
            }
        }
        FieldType::Float => value.as_f64().map(|_| ()).ok_or_else(|| "expected number".into()),
        FieldType::String => value.as_str().map(|_| ()).ok_or_else(|| "expected string".into()),
        FieldType::Entity => as_entity(value)
            .map(|_| ())
            .ok_or_else(|| "expected entity id".into()),
        FieldType::EntityList => {
            let items = value.as_array().ok_or("expected array of entity ids")?;
            if items.iter().all(|v| as_entity(v).is_some()) {
                Ok(())
            } else {
                Err("expected array of entity ids".into())
            }
        }
        FieldType::Enum(variants) => match value.as_str() {
            Some(s) if variants.contains(&s) => Ok(()),
            _ => Err(format!("expected one of {variants:?}")),
        },
        FieldType::Record(_) => value
            .as_object()
            .map(|_| ())
            .ok_or_else(|| "expected object".into()),
        FieldType::List(inner) => {
            let items = value.as_array().ok_or("expected array")?;
            items.iter().try_for_each(|item| check_type(item, inner))
        }
    }
}

fn type_name(ty: &FieldType) -> String {
    match ty {
        FieldType::Bool => "bool".into(),
        FieldType::Int => "int".into(),
        FieldType::Float => "float".into(),
        FieldType::String => "string".into(),
        FieldType::Entity => "entity".into(),
        FieldType::EntityList => "list<entity>".into(),
        FieldType::Enum(variants) => format!("enum<{}>", variants.join("|")),
        FieldType::Record(name) => format!("record<{name}>"),
        FieldType::List(inner) => format!("list<{}>", type_name(inner)),
    }
}

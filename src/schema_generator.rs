use crate::canonicalizer::CanonicalTable;
use crate::ir::{CanonicalType, LiteralValue, ObjectShape, Primitive};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

/// Prefix of every component reference.
pub const COMPONENTS_PREFIX: &str = "#/components/schemas/";

/// Schema generator - converts canonical types to OpenAPI schemas
pub struct SchemaGenerator {
    /// Prefix prepended to component names in `$ref`
    ref_prefix: String,
}

/// OpenAPI Schema definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Reference to another schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Format for primitive types (e.g., "int64")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Properties for object types, in declaration order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, Schema>>,
    /// Required field names for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Value schema of index signatures and records
    #[serde(rename = "additionalProperties", skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<Schema>>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(rename = "minItems", skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(rename = "maxItems", skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Allowed values for literal and enum types
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<serde_json::Value>>,
    #[serde(rename = "anyOf", skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<Schema>>,
    #[serde(rename = "allOf", skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<Schema>>,
}

impl Schema {
    fn typed(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Self::default()
        }
    }

    fn reference(target: String) -> Self {
        Self {
            reference: Some(target),
            ..Self::default()
        }
    }

    /// Schema that only admits `null`. OpenAPI 3.0 has no `null` type.
    fn null() -> Self {
        Self {
            nullable: Some(true),
            enum_values: Some(vec![serde_json::Value::Null]),
            ..Self::default()
        }
    }

    /// Adds a description. Siblings of `$ref` are ignored, so a reference is wrapped first.
    fn described(self, description: Option<&str>) -> Self {
        let Some(description) = description else {
            return self;
        };
        let mut schema = if self.reference.is_some() {
            Schema {
                all_of: Some(vec![self]),
                ..Schema::default()
            }
        } else {
            self
        };
        schema.description = Some(description.to_string());
        schema
    }
}

impl SchemaGenerator {
    /// Create a new SchemaGenerator that points references at `#/components/schemas/`
    pub fn new() -> Self {
        debug!("Initializing SchemaGenerator");
        Self {
            ref_prefix: COMPONENTS_PREFIX.to_string(),
        }
    }

    /// Generate the schemas of every component of the table
    pub fn component_schemas(&self, table: &CanonicalTable) -> IndexMap<String, Schema> {
        table
            .components
            .iter()
            .map(|(name, ty)| {
                debug!("Generating component schema: {}", name);
                let description = table.descriptions.get(name).map(String::as_str);
                (name.clone(), self.generate_schema(ty).described(description))
            })
            .collect()
    }

    /// Generate a schema for a canonical type.
    ///
    /// An `Excluded` type only reaches this point at the top level, where it becomes
    /// the schema that matches nothing.
    pub fn generate_schema(&self, ty: &CanonicalType<String>) -> Schema {
        match ty {
            CanonicalType::Primitive(primitive) => self.primitive_to_schema(*primitive),
            CanonicalType::Literal(literal) => Schema {
                enum_values: Some(vec![literal.to_json()]),
                ..Schema::typed(literal.type_name())
            },
            CanonicalType::Object(shape) => self.object_to_schema(shape),
            CanonicalType::Array(item) => Schema {
                items: Some(Box::new(self.generate_schema(item))),
                ..Schema::typed("array")
            },
            CanonicalType::Tuple { items, required } => {
                let mut item_schemas: Vec<Schema> = Vec::with_capacity(items.len());
                for item in items {
                    let schema = self.generate_schema(item);
                    if !item_schemas.contains(&schema) {
                        item_schemas.push(schema);
                    }
                }
                let items_schema = match item_schemas.len() {
                    0 => Schema::default(),
                    1 => item_schemas.remove(0),
                    _ => Schema {
                        any_of: Some(item_schemas),
                        ..Schema::default()
                    },
                };
                Schema {
                    items: Some(Box::new(items_schema)),
                    min_items: Some(*required),
                    max_items: Some(items.len()),
                    ..Schema::typed("array")
                }
            }
            CanonicalType::Union(members) => self.union_to_schema(members),
            CanonicalType::NamedRef(name) => Schema::reference(format!("{}{}", self.ref_prefix, name)),
            CanonicalType::Excluded => Schema {
                not: Some(Box::new(Schema::default())),
                ..Schema::default()
            },
        }
    }

    fn primitive_to_schema(&self, primitive: Primitive) -> Schema {
        match primitive {
            Primitive::String => Schema::typed("string"),
            Primitive::Number => Schema::typed("number"),
            Primitive::Integer => Schema {
                format: Some("int64".to_string()),
                ..Schema::typed("integer")
            },
            Primitive::Boolean => Schema::typed("boolean"),
            Primitive::Null | Primitive::Undefined => Schema::null(),
            Primitive::Any => Schema::default(),
        }
    }

    fn object_to_schema(&self, shape: &ObjectShape<String>) -> Schema {
        let mut properties = IndexMap::with_capacity(shape.fields.len());
        let mut required = Vec::new();
        for (name, field) in &shape.fields {
            let schema = self.generate_schema(&field.ty).described(field.description.as_deref());
            properties.insert(name.clone(), schema);
            if field.required {
                required.push(name.clone());
            }
        }
        // pure maps carry only additionalProperties
        let is_map = properties.is_empty() && shape.additional.is_some();
        Schema {
            properties: (!is_map).then_some(properties),
            required: (!required.is_empty()).then_some(required),
            additional_properties: shape
                .additional
                .as_ref()
                .map(|value| Box::new(self.generate_schema(value))),
            ..Schema::typed("object")
        }
    }

    /// Unions: `null` turns into `nullable`, same-typed literals into one `enum`,
    /// everything else into `anyOf`.
    fn union_to_schema(&self, members: &[CanonicalType<String>]) -> Schema {
        let is_null = |m: &&CanonicalType<String>| {
            matches!(
                m,
                CanonicalType::Primitive(Primitive::Null | Primitive::Undefined)
            )
        };
        let nullable = members.iter().any(|m| is_null(&m));
        let rest: Vec<&CanonicalType<String>> = members.iter().filter(|m| !is_null(m)).collect();

        let mut schema = match rest.as_slice() {
            [] => return Schema::null(),
            [single] => self.generate_schema(single),
            _ => match literal_enum(&rest) {
                Some((schema_type, values)) => Schema {
                    enum_values: Some(values),
                    ..Schema::typed(schema_type)
                },
                None => Schema {
                    any_of: Some(rest.iter().map(|m| self.generate_schema(m)).collect()),
                    ..Schema::default()
                },
            },
        };

        if nullable {
            if schema.reference.is_some() {
                // siblings of `$ref` are ignored, so wrap it
                schema = Schema {
                    any_of: Some(vec![schema]),
                    ..Schema::default()
                };
            }
            schema.nullable = Some(true);
        }
        schema
    }
}

impl Default for SchemaGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// `'a' | 'b'` style unions: all members literals of one JSON type.
fn literal_enum(members: &[&CanonicalType<String>]) -> Option<(&'static str, Vec<serde_json::Value>)> {
    let mut schema_type: Option<&'static str> = None;
    let mut values = Vec::with_capacity(members.len());
    for member in members {
        let CanonicalType::Literal(literal) = member else {
            return None;
        };
        let member_type = match literal {
            LiteralValue::Number(_) => "number",
            other => other.type_name(),
        };
        match schema_type {
            None => schema_type = Some(member_type),
            Some(existing) if existing != member_type => return None,
            Some(_) => {}
        }
        values.push(literal.to_json());
    }
    // integer-only enums keep the narrower type
    let all_integers = members
        .iter()
        .all(|m| matches!(m, CanonicalType::Literal(literal) if literal.type_name() == "integer"));
    let schema_type = if all_integers { Some("integer") } else { schema_type };
    schema_type.map(|t| (t, values))
}

use crate::canonicalizer::CanonicalTable;
use crate::ir::{CanonicalType, HandlerDescriptor};
use crate::schema_generator::{Schema, SchemaGenerator, COMPONENTS_PREFIX};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const JSON_MEDIA_TYPE: &str = "application/json";

/// An operation name was added twice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("operation `{0}` is already part of the document")]
pub struct DuplicateOperation(pub String);

/// OpenAPI document builder
pub struct OpenApiBuilder {
    /// OpenAPI info section
    info: Info,
    /// Paths collection (`/<operation>` -> PathItem)
    paths: IndexMap<String, PathItem>,
    schema_gen: SchemaGenerator,
}

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI PathItem object. Every handler is invoked with POST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    pub post: Operation,
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Handler class name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(rename = "operationId")]
    pub operation_id: String,
    #[serde(rename = "requestBody")]
    pub request_body: RequestBody,
    /// Responses by status code
    pub responses: IndexMap<String, Response>,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    pub required: bool,
    /// Request schemas come from the handler registry and are emitted verbatim
    pub content: IndexMap<String, MediaType<Value>>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType<S = Schema> {
    /// Schema for this media type
    pub schema: S,
}

/// OpenAPI Response object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
    pub content: IndexMap<String, MediaType>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    /// Schema definitions
    pub schemas: IndexMap<String, Schema>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    pub info: Info,
    /// API paths, in handler enumeration order
    pub paths: IndexMap<String, PathItem>,
    pub components: Components,
}

impl OpenApiBuilder {
    /// Create a new OpenApiBuilder with default info
    pub fn new() -> Self {
        debug!("Initializing OpenApiBuilder");
        Self {
            info: Self::default_info(),
            paths: IndexMap::new(),
            schema_gen: SchemaGenerator::new(),
        }
    }

    /// Info section used when nothing else is configured
    pub fn default_info() -> Info {
        Info {
            title: "Generated API".to_string(),
            version: "1.0.0".to_string(),
            description: Some("API contract generated from handler classes".to_string()),
        }
    }

    /// Set custom info for the API
    pub fn with_info(mut self, title: String, version: String, description: Option<String>) -> Self {
        self.info = Info {
            title,
            version,
            description,
        };
        self
    }

    /// Whether an operation with this name was already added
    pub fn contains(&self, operation: &str) -> bool {
        self.paths.contains_key(&Self::path_of(operation))
    }

    /// Add a handler operation to the document.
    ///
    /// `response` must already be rewritten to component names, see
    /// [`CanonicalTable::rewrite`].
    pub fn add_operation(
        &mut self,
        handler: &HandlerDescriptor,
        summary: Option<String>,
        request_schema: Value,
        response: &CanonicalType<String>,
    ) -> Result<(), DuplicateOperation> {
        let path = Self::path_of(&handler.operation);
        if self.paths.contains_key(&path) {
            return Err(DuplicateOperation(handler.operation.clone()));
        }
        debug!("Adding operation: POST {} ({})", path, handler.class);

        let mut request_content = IndexMap::new();
        request_content.insert(
            JSON_MEDIA_TYPE.to_string(),
            MediaType {
                schema: request_schema,
            },
        );

        let mut response_content = IndexMap::new();
        response_content.insert(
            JSON_MEDIA_TYPE.to_string(),
            MediaType {
                schema: self.schema_gen.generate_schema(response),
            },
        );
        let mut responses = IndexMap::new();
        responses.insert(
            "200".to_string(),
            Response {
                description: "Successful response".to_string(),
                content: response_content,
            },
        );

        let operation = Operation {
            summary,
            operation_id: handler.operation.clone(),
            request_body: RequestBody {
                required: true,
                content: request_content,
            },
            responses,
        };
        self.paths.insert(path, PathItem { post: operation });
        Ok(())
    }

    fn path_of(operation: &str) -> String {
        format!("/{}", operation)
    }

    /// Build the final OpenAPI document
    pub fn build(self, table: &CanonicalTable) -> OpenApiDocument {
        debug!(
            "Building final OpenAPI document: {} path(s), {} component(s)",
            self.paths.len(),
            table.components.len()
        );
        OpenApiDocument {
            openapi: "3.0.0".to_string(),
            info: self.info,
            paths: self.paths,
            components: Components {
                schemas: self.schema_gen.component_schemas(table),
            },
        }
    }
}

impl Default for OpenApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Every `#/components/schemas/...` pointer in the document whose target is missing.
pub fn dangling_references(document: &OpenApiDocument) -> Vec<String> {
    let Ok(value) = serde_json::to_value(document) else {
        return Vec::new();
    };
    let mut found = Vec::new();
    collect_refs(&value, &mut |target| {
        if let Some(name) = target.strip_prefix(COMPONENTS_PREFIX) {
            if !document.components.schemas.contains_key(name) && !found.iter().any(|f| f == target) {
                found.push(target.to_string());
            }
        }
    });
    found
}

fn collect_refs(value: &Value, visit: &mut impl FnMut(&str)) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                match child {
                    Value::String(target) if key == "$ref" => visit(target),
                    _ => collect_refs(child, visit),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_refs(item, visit)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{DeclarationKey, ModulePath, Primitive};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn handler(operation: &str, class: &str) -> HandlerDescriptor {
        let module = ModulePath::new(format!("src/action/{}", class));
        HandlerDescriptor {
            operation: operation.to_string(),
            class: DeclarationKey::new(module.clone(), class),
            scope: module,
        }
    }

    fn table(components: &[(&str, CanonicalType<String>)]) -> CanonicalTable {
        CanonicalTable {
            names: IndexMap::new(),
            components: components
                .iter()
                .map(|(name, ty)| (name.to_string(), ty.clone()))
                .collect(),
            descriptions: IndexMap::new(),
        }
    }

    #[test]
    fn test_new_builder() {
        let builder = OpenApiBuilder::new();

        assert_eq!(builder.info.title, "Generated API");
        assert_eq!(builder.info.version, "1.0.0");
        assert!(builder.info.description.is_some());
        assert!(builder.paths.is_empty());
    }

    #[test]
    fn test_with_info() {
        let builder = OpenApiBuilder::new().with_info(
            "My API".to_string(),
            "2.0.0".to_string(),
            Some("Custom description".to_string()),
        );

        assert_eq!(builder.info.title, "My API");
        assert_eq!(builder.info.version, "2.0.0");
        assert_eq!(builder.info.description, Some("Custom description".to_string()));
    }

    #[test]
    fn test_add_operation_layout() {
        let mut builder = OpenApiBuilder::new();
        builder
            .add_operation(
                &handler("get_info", "GetInfo"),
                Some("GetInfo".to_string()),
                json!({"type": "object"}),
                &CanonicalType::NamedRef("Info".to_string()),
            )
            .unwrap();
        let document = builder.build(&table(&[("Info", CanonicalType::Primitive(Primitive::String))]));

        let value = serde_json::to_value(&document).unwrap();
        assert_eq!(value["openapi"], json!("3.0.0"));
        assert_eq!(
            value["paths"]["/get_info"]["post"],
            json!({
                "summary": "GetInfo",
                "operationId": "get_info",
                "requestBody": {
                    "required": true,
                    "content": {"application/json": {"schema": {"type": "object"}}}
                },
                "responses": {
                    "200": {
                        "description": "Successful response",
                        "content": {
                            "application/json": {"schema": {"$ref": "#/components/schemas/Info"}}
                        }
                    }
                }
            })
        );
        assert_eq!(value["components"]["schemas"]["Info"], json!({"type": "string"}));
        assert!(dangling_references(&document).is_empty());
    }

    #[test]
    fn test_duplicate_operation_rejected() {
        let mut builder = OpenApiBuilder::new();
        let any = CanonicalType::Primitive(Primitive::Any);
        builder
            .add_operation(&handler("send_msg", "SendMsg"), None, json!({}), &any)
            .unwrap();
        let err = builder
            .add_operation(&handler("send_msg", "SendMsgV2"), None, json!({}), &any)
            .unwrap_err();

        assert_eq!(err, DuplicateOperation("send_msg".to_string()));
        assert!(builder.contains("send_msg"));
        assert_eq!(builder.paths.len(), 1);
    }

    #[test]
    fn test_dangling_references_found_in_request_and_components() {
        let mut builder = OpenApiBuilder::new();
        builder
            .add_operation(
                &handler("op", "Op"),
                None,
                json!({"$ref": "#/components/schemas/Missing"}),
                &CanonicalType::NamedRef("Present".to_string()),
            )
            .unwrap();
        let document = builder.build(&table(&[
            ("Present", CanonicalType::NamedRef("AlsoMissing".to_string())),
        ]));

        assert_eq!(
            dangling_references(&document),
            vec![
                "#/components/schemas/Missing".to_string(),
                "#/components/schemas/AlsoMissing".to_string(),
            ]
        );
    }

    #[test]
    fn test_paths_keep_insertion_order() {
        let mut builder = OpenApiBuilder::new();
        let any = CanonicalType::Primitive(Primitive::Any);
        for operation in ["zeta", "alpha", "mid"] {
            builder
                .add_operation(&handler(operation, "H"), None, json!({}), &any)
                .unwrap();
        }
        let document = builder.build(&CanonicalTable::default());
        let paths: Vec<&str> = document.paths.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["/zeta", "/alpha", "/mid"]);
    }
}

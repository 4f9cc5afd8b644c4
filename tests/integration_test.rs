use indexmap::IndexMap;
use openapi_from_handlers::{
    cli::{self, CliArgs},
    config::ProjectConfig,
    expander::ExpansionOptions,
    generator::{ContractGenerator, GenerationReport, SkipReason},
    openapi_builder::dangling_references,
    oracle::ProjectIndex,
    parser::SourceParser,
    registry::ManifestRegistry,
    scanner::FileScanner,
    serializer::{serialize_json, serialize_yaml},
};
use clap::Parser;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;

const FIXTURE: &[(&str, &str)] = &[
    ("handlers.yaml", include_str!("fixtures/onebot/handlers.yaml")),
    ("openapi-handlers.yaml", include_str!("fixtures/onebot/openapi-handlers.yaml")),
    (
        "src/onebot/action/OneBotAction.ts",
        include_str!("fixtures/onebot/src/onebot/action/OneBotAction.ts"),
    ),
    (
        "src/onebot/action/router.ts",
        include_str!("fixtures/onebot/src/onebot/action/router.ts"),
    ),
    (
        "src/onebot/action/system/GetLoginInfo.ts",
        include_str!("fixtures/onebot/src/onebot/action/system/GetLoginInfo.ts"),
    ),
    (
        "src/onebot/action/system/GetStatus.ts",
        include_str!("fixtures/onebot/src/onebot/action/system/GetStatus.ts"),
    ),
    (
        "src/onebot/action/msg/SendMsg.ts",
        include_str!("fixtures/onebot/src/onebot/action/msg/SendMsg.ts"),
    ),
    (
        "src/onebot/action/msg/SendPrivateMsg.ts",
        include_str!("fixtures/onebot/src/onebot/action/msg/SendPrivateMsg.ts"),
    ),
    (
        "src/onebot/action/extends/SetQQProfile.ts",
        include_str!("fixtures/onebot/src/onebot/action/extends/SetQQProfile.ts"),
    ),
    (
        "src/onebot/types/index.ts",
        include_str!("fixtures/onebot/src/onebot/types/index.ts"),
    ),
    (
        "src/onebot/types/user.ts",
        include_str!("fixtures/onebot/src/onebot/types/user.ts"),
    ),
    (
        "src/onebot/types/message.ts",
        include_str!("fixtures/onebot/src/onebot/types/message.ts"),
    ),
];

/// Helper function to create a temporary test project
fn create_test_project(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    for (path, content) in files {
        let file_path = temp_dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(&file_path, content).expect("Failed to write test file");
    }

    temp_dir
}

/// Runs the library pipeline over the fixture project
fn generate(temp_dir: &TempDir) -> GenerationReport {
    let root = temp_dir.path();
    let config = ProjectConfig::load(&root.join("openapi-handlers.yaml")).expect("Failed to load config");

    let scan_result = FileScanner::new(root.to_path_buf())
        .with_excludes(config.exclude.clone())
        .scan()
        .expect("Failed to scan directory");
    assert_eq!(scan_result.source_files.len(), 10, "Should find every .ts file");

    let parsed_files: Vec<_> = SourceParser::parse_files(root, &scan_result.source_files)
        .into_iter()
        .filter_map(Result::ok)
        .collect();
    assert_eq!(parsed_files.len(), 10, "Should parse every file");

    let index = ProjectIndex::build(parsed_files, &config.aliases).expect("Failed to index project");
    let registry = ManifestRegistry::load(&root.join("handlers.yaml")).expect("Failed to load handlers");

    ContractGenerator::new(&index, config.expansion_options())
        .generate(&registry)
        .expect("Generation should not fail")
}

fn response_schema(document: &Value, operation: &str) -> Value {
    document["paths"][format!("/{}", operation)]["post"]["responses"]["200"]["content"]["application/json"]
        ["schema"]
        .clone()
}

#[test]
fn test_onebot_end_to_end_generation() {
    let temp_dir = create_test_project(FIXTURE);
    let report = generate(&temp_dir);

    assert_eq!(
        report.operations,
        vec!["get_login_info", "get_status", "send_msg", "send_private_msg"]
    );
    assert!(dangling_references(&report.document).is_empty());

    let document = serde_json::to_value(&report.document).unwrap();
    assert_eq!(document["openapi"], "3.0.0");
    assert_eq!(
        response_schema(&document, "get_login_info"),
        json!({"$ref": "#/components/schemas/OB11User"})
    );
    assert_eq!(
        document["components"]["schemas"]["OB11User"],
        json!({
            "type": "object",
            "properties": {
                "user_id": {"type": "number"},
                "nickname": {"type": "string"},
                "remark": {"type": "string"},
                "sex": {"type": "string", "enum": ["male", "female", "unknown"]},
                "level": {"type": "number"}
            },
            "required": ["user_id", "nickname", "level"]
        })
    );
}

#[test]
fn test_inline_response_with_date_and_callable_field() {
    let temp_dir = create_test_project(FIXTURE);
    let report = generate(&temp_dir);
    let document = serde_json::to_value(&report.document).unwrap();

    assert_eq!(
        response_schema(&document, "get_status"),
        json!({
            "type": "object",
            "properties": {
                "online": {"type": "boolean"},
                "good": {"type": "boolean"},
                "stat": {"type": "object", "additionalProperties": {"type": "number"}},
                "since": {"type": "string"}
            },
            "required": ["online", "good", "stat", "since"]
        })
    );
}

#[test]
fn test_response_inherited_through_intermediate_bases() {
    let temp_dir = create_test_project(FIXTURE);
    let report = generate(&temp_dir);
    let document = serde_json::to_value(&report.document).unwrap();

    let expected = json!({"$ref": "#/components/schemas/ReturnDataType"});
    assert_eq!(response_schema(&document, "send_msg"), expected);
    assert_eq!(response_schema(&document, "send_private_msg"), expected);

    let schemas: Vec<&String> = report.document.components.schemas.keys().collect();
    assert_eq!(
        schemas,
        vec![
            "OB11User",
            "ReturnDataType",
            "OB11Message",
            "OB11MessageType",
            "OB11Sender",
            "OB11MessageSegment"
        ]
    );
    assert_eq!(
        document["components"]["schemas"]["OB11MessageType"],
        json!({"type": "string", "enum": ["private", "group"]})
    );
    assert_eq!(
        document["components"]["schemas"]["OB11Message"]["properties"]["time"],
        json!({"type": "string"})
    );

    // request schemas from the manifest are emitted verbatim
    assert_eq!(
        document["paths"]["/send_msg"]["post"]["requestBody"]["content"]["application/json"]["schema"]
            ["required"],
        json!(["message"])
    );
}

#[test]
fn test_doc_comments_become_descriptions() {
    let temp_dir = create_test_project(FIXTURE);
    let report = generate(&temp_dir);
    let document = serde_json::to_value(&report.document).unwrap();

    let sender = &document["components"]["schemas"]["OB11Sender"];
    assert_eq!(sender["description"], json!("Author of a message as seen by the receiving bot."));
    assert_eq!(
        sender["properties"]["user_id"],
        json!({"type": "number", "description": "QQ number of the sender"})
    );
    assert_eq!(sender["properties"]["nickname"], json!({"type": "string"}));
}

#[test]
fn test_cli_named_types_without_handlers() {
    // no manifest and a config that names none
    let temp_dir = create_test_project(&FIXTURE[2..]);
    std::fs::write(
        temp_dir.path().join("openapi-handlers.yaml"),
        "exclude: [dist]\naliases:\n  \"@/*\": src/*\n",
    )
    .unwrap();
    let output = temp_dir.path().join("types.json");
    let args = CliArgs::try_parse_from([
        "openapi-from-handlers",
        "-f",
        "json",
        "-o",
        output.to_str().unwrap(),
        "--type",
        "OB11Sender",
        "--type",
        "OB11MessageType",
        temp_dir.path().to_str().unwrap(),
    ])
    .unwrap();

    cli::run(cli::parse_args_from_parsed(args).unwrap()).expect("CLI run should succeed");

    let parsed: Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(parsed["paths"], json!({}));
    let schemas: Vec<&String> = parsed["components"]["schemas"].as_object().unwrap().keys().collect();
    assert_eq!(schemas, vec!["OB11Sender", "OB11MessageType"]);
}

#[test]
fn test_skipped_operations_are_reported() {
    let temp_dir = create_test_project(FIXTURE);
    let report = generate(&temp_dir);

    let skipped: Vec<&str> = report.skipped.iter().map(|s| s.operation.as_str()).collect();
    assert_eq!(skipped, vec!["set_qq_profile", "send_msg", "get_robot_uin_range"]);
    assert!(matches!(report.skipped[0].reason, SkipReason::Hierarchy(_)));
    assert_eq!(report.skipped[1].reason, SkipReason::Duplicate);
    assert_eq!(report.skipped[2].reason, SkipReason::HandlerMissing);
}

#[test]
fn test_yaml_and_json_output() {
    let temp_dir = create_test_project(FIXTURE);
    let report = generate(&temp_dir);

    let yaml = serialize_yaml(&report.document).expect("Failed to serialize to YAML");
    assert!(yaml.contains("openapi: 3.0.0"));
    assert!(yaml.contains("/send_private_msg:"));
    assert!(yaml.contains("operationId: send_private_msg"));

    let json = serialize_json(&report.document).expect("Failed to serialize to JSON");
    let parsed: Value = serde_json::from_str(&json).expect("Generated JSON should be valid");
    assert_eq!(parsed["paths"]["/get_status"]["post"]["summary"], "GetStatus");
}

#[test]
fn test_generation_is_deterministic() {
    let first = create_test_project(FIXTURE);
    let second = create_test_project(FIXTURE);

    let first = serialize_json(&generate(&first).document).unwrap();
    let second = serialize_json(&generate(&second).document).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_cli_run_writes_output_file() {
    let temp_dir = create_test_project(FIXTURE);
    let output = temp_dir.path().join("out").join("openapi.json");
    let args = CliArgs::try_parse_from([
        "openapi-from-handlers",
        "-f",
        "json",
        "-o",
        output.to_str().unwrap(),
        temp_dir.path().to_str().unwrap(),
    ])
    .unwrap();

    let args = cli::parse_args_from_parsed(args).unwrap();
    cli::run(args).expect("CLI run should succeed");

    let content = std::fs::read_to_string(&output).expect("Output file should exist");
    let parsed: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(parsed["info"]["title"], "NapCat OneBot 11 API");
    assert_eq!(parsed["paths"].as_object().unwrap().len(), 4);
}

#[test]
fn test_missing_alias_leaves_handlers_unresolved() {
    let temp_dir = create_test_project(FIXTURE);
    let root = temp_dir.path();
    let scan_result = FileScanner::new(root.to_path_buf()).scan().unwrap();
    let parsed_files: Vec<_> = SourceParser::parse_files(root, &scan_result.source_files)
        .into_iter()
        .filter_map(Result::ok)
        .collect();
    let index = ProjectIndex::build(parsed_files, &IndexMap::new()).unwrap();
    let registry = ManifestRegistry::load(&root.join("handlers.yaml")).unwrap();

    let report = ContractGenerator::new(&index, ExpansionOptions::default())
        .generate(&registry)
        .unwrap();

    // without `@/` only the handler whose response needs no aliased import survives
    assert_eq!(report.operations, vec!["get_status"]);
    assert_eq!(report.skipped.len(), 6);
    assert!(matches!(report.skipped[0].reason, SkipReason::Expansion(_)));
}

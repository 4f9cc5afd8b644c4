use indexmap::IndexMap;
use openapi_from_handlers::{
    expander::ExpansionOptions,
    generator::ContractGenerator,
    openapi_builder::dangling_references,
    oracle::ProjectIndex,
    parser::SourceParser,
    registry::{ManifestEntry, ManifestRegistry},
    scanner::FileScanner,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;

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

fn generate(temp_dir: &TempDir, handlers: &[(&str, &str)]) -> Value {
    let root = temp_dir.path();
    let scan_result = FileScanner::new(root.to_path_buf()).scan().unwrap();
    let parsed_files: Vec<_> = SourceParser::parse_files(root, &scan_result.source_files)
        .into_iter()
        .filter_map(Result::ok)
        .collect();
    let index = ProjectIndex::build(parsed_files, &IndexMap::new()).unwrap();
    let registry = ManifestRegistry::from_entries(
        handlers
            .iter()
            .map(|(operation, class)| ManifestEntry {
                operation: operation.to_string(),
                class: Some(class.to_string()),
                request_schema: None,
            })
            .collect(),
    );

    let report = ContractGenerator::new(&index, ExpansionOptions::default())
        .generate(&registry)
        .unwrap();
    assert!(report.skipped.is_empty(), "{:?}", report.skipped);
    assert!(dangling_references(&report.document).is_empty());
    serde_json::to_value(&report.document).unwrap()
}

const BASE: (&str, &str) = ("src/base.ts", "export abstract class Base<Req, Res> {}");

#[test]
fn test_same_name_in_two_modules_gets_two_components() {
    let temp_dir = create_test_project(&[
        BASE,
        (
            "src/group/GetGroupInfo.ts",
            r#"
            import { Base } from '../base';
            interface Payload { group_id: number; member_count: number }
            export class GetGroupInfo extends Base<void, Payload> {}
            "#,
        ),
        (
            "src/guild/GetGuildInfo.ts",
            r#"
            import { Base } from '../base';
            interface Payload { guild_id: string }
            export class GetGuildInfo extends Base<void, Payload> {}
            "#,
        ),
    ]);

    let document = generate(&temp_dir, &[("get_group_info", "GetGroupInfo"), ("get_guild_info", "GetGuildInfo")]);
    let schemas = document["components"]["schemas"].as_object().unwrap();

    let names: Vec<&String> = schemas.keys().collect();
    assert_eq!(names, vec!["Payload", "Payload_1"]);
    assert_eq!(
        schemas["Payload_1"]["properties"],
        json!({"guild_id": {"type": "string"}})
    );
    assert_eq!(
        document["paths"]["/get_guild_info"]["post"]["responses"]["200"]["content"]["application/json"]["schema"],
        json!({"$ref": "#/components/schemas/Payload_1"})
    );
}

#[test]
fn test_type_shared_by_handlers_is_emitted_once() {
    let temp_dir = create_test_project(&[
        BASE,
        (
            "src/types/friend.ts",
            r#"
            export interface Friend { user_id: number; nickname: string; category?: Category }
            export interface Category { id: number; friends?: Friend[] }
            "#,
        ),
        (
            "src/types/index.ts",
            "export { Friend, Category as FriendCategory } from './friend';",
        ),
        (
            "src/action/GetFriendList.ts",
            r#"
            import { Base } from '../base';
            import { Friend } from '../types';
            export class GetFriendList extends Base<{ no_cache?: boolean }, Friend[]> {}
            "#,
        ),
        (
            "src/action/GetFriendsWithCategory.ts",
            r#"
            import { Base } from '../base';
            import * as types from '../types';
            export class GetFriendsWithCategory extends Base<void, Array<types.FriendCategory>> {}
            "#,
        ),
    ]);

    let document = generate(
        &temp_dir,
        &[
            ("get_friend_list", "GetFriendList"),
            ("get_friends_with_category", "GetFriendsWithCategory"),
        ],
    );
    let schemas = document["components"]["schemas"].as_object().unwrap();

    let names: Vec<&String> = schemas.keys().collect();
    assert_eq!(names, vec!["Friend", "Category"]);
    assert_eq!(
        schemas["Category"]["properties"]["friends"],
        json!({"type": "array", "items": {"$ref": "#/components/schemas/Friend"}})
    );
    assert_eq!(
        document["paths"]["/get_friends_with_category"]["post"]["responses"]["200"]["content"]["application/json"]
            ["schema"],
        json!({"type": "array", "items": {"$ref": "#/components/schemas/Category"}})
    );
}

#[test]
fn test_generic_response_wrapper_is_inlined() {
    let temp_dir = create_test_project(&[
        BASE,
        (
            "src/types.ts",
            r#"
            export interface Page<T> { items: T[]; total: number; next?: string | null }
            export type Id = string & { readonly __brand: 'Id' };
            "#,
        ),
        (
            "src/action/ListIds.ts",
            r#"
            import { Base } from '../base';
            import { Page, Id } from '../types';
            export class ListIds extends Base<void, Page<Id>> {}
            "#,
        ),
    ]);

    let document = generate(&temp_dir, &[("list_ids", "ListIds")]);

    assert_eq!(
        document["paths"]["/list_ids"]["post"]["responses"]["200"]["content"]["application/json"]["schema"],
        json!({
            "type": "object",
            "properties": {
                "items": {"type": "array", "items": {"$ref": "#/components/schemas/Id"}},
                "total": {"type": "number"},
                "next": {"type": "string", "nullable": true}
            },
            "required": ["items", "total"]
        })
    );
    assert_eq!(document["components"]["schemas"]["Id"], json!({"type": "string"}));
}

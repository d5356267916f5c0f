mod common;

use common::{position_after, text_position, TestFixture};
use pathalias_lsp::server::handlers::handle_completion;
use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionParams, CompletionTextEdit, Position, Range,
    Url,
};

const HELPER: &str = "export function add(a: number, b: number): number {\n  return a + b;\n}\nexport const PI = 3.14;\nexport default function main() {}\n";

fn params(uri: &Url, position: Position) -> CompletionParams {
    CompletionParams {
        text_document_position: text_position(uri, position),
        work_done_progress_params: Default::default(),
        partial_result_params: Default::default(),
        context: None,
    }
}

fn workspace() -> TestFixture {
    let fixture = TestFixture::new();
    fixture.write("src/utils/helper.ts", HELPER);
    fixture.write("src/utils/format.js", "export const fmt = 1;\n");
    fixture.write("src/components/Button.tsx", "export const Button = 1;\n");
    fixture
}

fn edit_of(item: &CompletionItem) -> (Range, String) {
    match item.text_edit.as_ref().unwrap() {
        CompletionTextEdit::Edit(edit) => (edit.range, edit.new_text.clone()),
        CompletionTextEdit::InsertAndReplace(_) => panic!("unexpected edit kind"),
    }
}

#[tokio::test]
async fn test_completes_directory_children_without_extension() {
    let fixture = workspace();
    fixture.alias_src().await;

    let content = "import { add } from '@/utils/he';\n";
    let uri = fixture.open("src/app.ts", content);
    let position = position_after(content, "@/utils/he");

    let items = handle_completion(params(&uri, position), &fixture.state)
        .await
        .expect("completion items");
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert_eq!(labels, vec!["format.js", "helper.ts"]);

    let helper = &items[1];
    assert_eq!(helper.kind, Some(CompletionItemKind::FILE));
    let (range, text) = edit_of(helper);
    assert_eq!(text, "helper");
    assert_eq!(range.start.character, position.character - 2);
    assert_eq!(range.end, position);
}

#[tokio::test]
async fn test_completes_alias_root_with_folders_and_files() {
    let fixture = workspace();
    let content = "import x from '@/';\n";
    let uri = fixture.open("src/app.ts", content);
    fixture.alias_src().await;

    let items = handle_completion(params(&uri, position_after(content, "@/")), &fixture.state)
        .await
        .unwrap();

    let components = items.iter().find(|i| i.label == "components").unwrap();
    assert_eq!(components.kind, Some(CompletionItemKind::FOLDER));
    let app = items.iter().find(|i| i.label == "app.ts").unwrap();
    assert_eq!(edit_of(app).1, "app");
}

#[tokio::test]
async fn test_include_extension_keeps_file_names() {
    let fixture = workspace();
    fixture.mkdir("src");
    fixture
        .configure(serde_json::json!({
            "alias": { "map": { "@": "${cwd}/src" } },
            "completion": { "include_extension": true }
        }))
        .await;

    let content = "import { add } from '@/utils/';\n";
    let uri = fixture.open("src/app.ts", content);
    let items = handle_completion(params(&uri, position_after(content, "@/utils/")), &fixture.state)
        .await
        .unwrap();

    let helper = items.iter().find(|i| i.label == "helper.ts").unwrap();
    assert_eq!(edit_of(helper).1, "helper.ts");
}

#[tokio::test]
async fn test_suggests_alias_tokens_before_first_slash() {
    let fixture = workspace();
    fixture.mkdir("lib");
    fixture
        .configure(serde_json::json!({
            "alias": { "map": { "@": "${cwd}/src", "@lib": "${cwd}/lib", "~": "${cwd}/src" } }
        }))
        .await;

    let content = "import x from '@';\n";
    let uri = fixture.open("src/app.ts", content);
    let items = handle_completion(params(&uri, position_after(content, "'@")), &fixture.state)
        .await
        .unwrap();

    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert_eq!(labels, vec!["@", "@lib"]);
    assert!(items.iter().all(|i| i.kind == Some(CompletionItemKind::FOLDER)));
}

#[tokio::test]
async fn test_unaliased_path_gets_nothing() {
    let fixture = workspace();
    fixture.alias_src().await;

    let content = "import x from 'react/';\n";
    let uri = fixture.open("src/app.ts", content);
    let items = handle_completion(params(&uri, position_after(content, "react/")), &fixture.state).await;
    assert!(items.is_none());
}

#[tokio::test]
async fn test_import_member_completion() {
    let fixture = workspace();
    fixture.alias_src().await;

    let content = "import {  } from '@/utils/helper';\n";
    let uri = fixture.open("src/app.ts", content);
    let items = handle_completion(params(&uri, position_after(content, "{ ")), &fixture.state)
        .await
        .expect("member items");

    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert_eq!(labels, vec!["add", "PI", "main"]);
    assert_eq!(items[0].kind, Some(CompletionItemKind::FUNCTION));
    assert_eq!(items[1].kind, Some(CompletionItemKind::PROPERTY));
    assert_eq!(items[2].kind, Some(CompletionItemKind::FUNCTION));
}

#[tokio::test]
async fn test_member_completion_while_typing_name() {
    let fixture = workspace();
    fixture.alias_src().await;

    let content = "import { ad } from '@/utils/helper';\n";
    let uri = fixture.open("src/app.ts", content);
    let items = handle_completion(params(&uri, position_after(content, "{ ad")), &fixture.state)
        .await
        .unwrap();
    assert!(items.iter().any(|i| i.label == "add"));
}

#[tokio::test]
async fn test_disabled_completion_returns_none() {
    let fixture = workspace();
    fixture.mkdir("src");
    fixture
        .configure(serde_json::json!({
            "alias": { "map": { "@": "${cwd}/src" } },
            "features": { "completion": false }
        }))
        .await;

    let content = "import x from '@/';\n";
    let uri = fixture.open("src/app.ts", content);
    let items = handle_completion(params(&uri, position_after(content, "@/")), &fixture.state).await;
    assert!(items.is_none());
}

#[tokio::test]
async fn test_javascript_importer_probes_js_files() {
    let fixture = workspace();
    fixture.alias_src().await;

    let content = "import { f } from '@/utils/format';\nimport { a } from '@/utils/helper';\n";
    let uri = fixture.open("src/app.js", content);

    let items = handle_completion(params(&uri, position_after(content, "{ f")), &fixture.state)
        .await
        .unwrap();
    assert!(items.iter().any(|i| i.label == "fmt"));

    // `.ts` is not probed from a `.js` importer.
    let items = handle_completion(params(&uri, position_after(content, "{ a")), &fixture.state).await;
    assert!(items.map_or(true, |items| items.is_empty()));
}

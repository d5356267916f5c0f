mod common;

use common::{position_after, position_of, text_position, TestFixture};
use pathalias_lsp::server::handlers::handle_definition;
use tower_lsp::lsp_types::{
    GotoDefinitionParams, GotoDefinitionResponse, Location, Position, Url,
};

const HELPER: &str = "export function add(a: number, b: number): number {\n  return a + b;\n}\nexport const PI = 3.14;\nexport default function main() {}\n";

fn params(uri: &Url, position: Position) -> GotoDefinitionParams {
    GotoDefinitionParams {
        text_document_position_params: text_position(uri, position),
        work_done_progress_params: Default::default(),
        partial_result_params: Default::default(),
    }
}

async fn workspace() -> TestFixture {
    let fixture = TestFixture::new();
    fixture.write("src/utils/helper.ts", HELPER);
    fixture.write("src/components/index.ts", "export const Button = 1;\n");
    fixture.alias_src().await;
    fixture
}

async fn definition(fixture: &TestFixture, uri: &Url, position: Position) -> Option<Location> {
    match handle_definition(params(uri, position), &fixture.state).await? {
        GotoDefinitionResponse::Scalar(location) => Some(location),
        other => panic!("unexpected response {:?}", other),
    }
}

#[tokio::test]
async fn test_source_string_jumps_to_file_start() {
    let fixture = workspace().await;
    let content = "import { add } from '@/utils/helper';\n";
    let uri = fixture.open("src/app.ts", content);

    let location = definition(&fixture, &uri, position_after(content, "@/ut"))
        .await
        .unwrap();
    assert_eq!(location.uri, fixture.uri("src/utils/helper.ts"));
    assert_eq!(location.range.start, Position::new(0, 0));
}

#[tokio::test]
async fn test_directory_import_resolves_index() {
    let fixture = workspace().await;
    let content = "import { Button } from '@/components';\n";
    let uri = fixture.open("src/app.ts", content);

    let location = definition(&fixture, &uri, position_after(content, "@/comp"))
        .await
        .unwrap();
    assert_eq!(location.uri, fixture.uri("src/components/index.ts"));
}

#[tokio::test]
async fn test_named_import_jumps_to_export() {
    let fixture = workspace().await;
    let content = "import { add, PI } from '@/utils/helper';\n";
    let uri = fixture.open("src/app.ts", content);

    let location = definition(&fixture, &uri, position_of(content, "add"))
        .await
        .unwrap();
    assert_eq!(location.uri, fixture.uri("src/utils/helper.ts"));
    assert_eq!(location.range.start, Position::new(0, 16));

    let location = definition(&fixture, &uri, position_of(content, "PI"))
        .await
        .unwrap();
    assert_eq!(location.range.start, Position::new(3, 13));
}

#[tokio::test]
async fn test_usage_follows_renamed_import() {
    let fixture = workspace().await;
    let content = "import { add as plus } from '@/utils/helper';\n\nconst x = plus(1, 2);\n";
    let uri = fixture.open("src/app.ts", content);

    let location = definition(&fixture, &uri, position_of(content, "plus(1"))
        .await
        .unwrap();
    assert_eq!(location.range.start, Position::new(0, 16));
}

#[tokio::test]
async fn test_default_import_jumps_to_default_keyword() {
    let fixture = workspace().await;
    let content = "import main from '@/utils/helper';\nmain();\n";
    let uri = fixture.open("src/app.ts", content);

    let location = definition(&fixture, &uri, position_of(content, "main();"))
        .await
        .unwrap();
    assert_eq!(location.range.start, Position::new(4, 7));
}

#[tokio::test]
async fn test_namespace_import_jumps_to_file_start() {
    let fixture = workspace().await;
    let content = "import * as helper from '@/utils/helper';\nhelper.add(1, 2);\n";
    let uri = fixture.open("src/app.ts", content);

    let location = definition(&fixture, &uri, position_of(content, "helper.add"))
        .await
        .unwrap();
    assert_eq!(location.uri, fixture.uri("src/utils/helper.ts"));
    assert_eq!(location.range.start, Position::new(0, 0));
}

#[tokio::test]
async fn test_missing_export_falls_back_to_file_start() {
    let fixture = workspace().await;
    let content = "import { nothing } from '@/utils/helper';\n";
    let uri = fixture.open("src/app.ts", content);

    let location = definition(&fixture, &uri, position_of(content, "nothing"))
        .await
        .unwrap();
    assert_eq!(location.range.start, Position::new(0, 0));
}

#[tokio::test]
async fn test_relative_and_package_imports_are_ignored() {
    let fixture = workspace().await;
    let content = "import { add } from './utils/helper';\nimport React from 'react';\n";
    let uri = fixture.open("src/app.ts", content);

    assert!(definition(&fixture, &uri, position_after(content, "./ut")).await.is_none());
    assert!(definition(&fixture, &uri, position_of(content, "add")).await.is_none());
    assert!(definition(&fixture, &uri, position_of(content, "React")).await.is_none());
}

#[tokio::test]
async fn test_document_outside_workspace_is_ignored() {
    let fixture = workspace().await;
    let other = TestFixture::new();
    let content = "import { add } from '@/utils/helper';\n";
    let uri = other.write("app.ts", content);
    let uri = Url::from_file_path(uri).unwrap();
    fixture
        .state
        .document_manager
        .open(uri.clone(), "typescript".into(), content.into(), 1);

    assert!(definition(&fixture, &uri, position_after(content, "@/ut")).await.is_none());
}

const APP_VUE: &str = "<template>\n  <div><my-button /></div>\n</template>\n<script>\nimport MyButton from '@/components/MyButton';\nexport default { components: { MyButton } };\n</script>\n";

#[tokio::test]
async fn test_vue_component_tag_jumps_to_component_file() {
    let fixture = TestFixture::new();
    fixture.write("src/components/MyButton.vue", "<template><button/></template>\n");
    fixture.alias_src().await;
    let uri = fixture.open("src/App.vue", APP_VUE);

    let location = definition(&fixture, &uri, position_after(APP_VUE, "<my-b"))
        .await
        .expect("tag definition");
    assert_eq!(location.uri, fixture.uri("src/components/MyButton.vue"));
    assert_eq!(location.range.start, Position::new(0, 0));

    assert!(definition(&fixture, &uri, position_after(APP_VUE, "<di")).await.is_none());
}

#[tokio::test]
async fn test_vue_script_import_resolves_like_typescript() {
    let fixture = TestFixture::new();
    fixture.write("src/components/MyButton.vue", "<template><button/></template>\n");
    fixture.alias_src().await;
    let uri = fixture.open("src/App.vue", APP_VUE);

    let location = definition(&fixture, &uri, position_after(APP_VUE, "from '@/comp"))
        .await
        .unwrap();
    assert_eq!(location.uri, fixture.uri("src/components/MyButton.vue"));
}

mod common;

use common::TestFixture;
use std::path::PathBuf;

fn resolve(fixture: &TestFixture, specifier: &str) -> Option<PathBuf> {
    let trees = fixture.state.trees.snapshot();
    let ws = trees.for_path(&fixture.root)?;
    ws.resolve(specifier, "ts").map(|r| r.path)
}

fn aliases(fixture: &TestFixture) -> Vec<String> {
    let trees = fixture.state.trees.snapshot();
    trees
        .for_path(&fixture.root)
        .map(|ws| ws.tree.aliases().iter().map(|a| a.to_string()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_settings_alias_with_cwd_placeholder() {
    let fixture = TestFixture::new();
    fixture.write("src/a.ts", "");
    fixture.alias_src().await;

    assert_eq!(resolve(&fixture, "@/a"), Some(fixture.path("src/a.ts")));
}

#[tokio::test]
async fn test_rc_file_beats_package_json_beats_settings() {
    let fixture = TestFixture::new();
    fixture.write("settings/a.ts", "");
    fixture.write("pkg/a.ts", "");
    fixture.write("rc/a.ts", "");
    fixture.write("shared/s.ts", "");
    fixture.write(
        "package.json",
        r#"{ "name": "demo", "pathalias": { "@": "${cwd}/pkg", "@shared": "${cwd}/shared" } }"#,
    );
    fixture.write(".pathaliasrc", r#"{ "@": "${cwd}/rc" }"#);

    fixture
        .configure(serde_json::json!({ "alias": { "map": { "@": "${cwd}/settings" } } }))
        .await;

    assert_eq!(resolve(&fixture, "@/a"), Some(fixture.path("rc/a.ts")));
    assert_eq!(resolve(&fixture, "@shared/s"), Some(fixture.path("shared/s.ts")));
}

#[tokio::test]
async fn test_toml_config_overrides_settings() {
    let fixture = TestFixture::new();
    fixture.write("src/a.ts", "");
    fixture.write("lib/a.ts", "");
    fixture.write(
        "pathalias.toml",
        "[alias.map]\n\"@\" = \"${cwd}/lib\"\n\n[cache]\ncapacity = 5\n",
    );
    fixture.alias_src().await;

    assert_eq!(resolve(&fixture, "@/a"), Some(fixture.path("lib/a.ts")));
    let config = fixture.state.config.current().await;
    assert_eq!(config.cache.capacity, 5);
}

#[tokio::test]
async fn test_broken_toml_keeps_previous_configuration() {
    let fixture = TestFixture::new();
    fixture.write("lib/a.ts", "");
    fixture.write("pathalias.toml", "[alias.map]\n\"@\" = \"${cwd}/lib\"\n");
    fixture.alias_src().await;
    assert_eq!(resolve(&fixture, "@/a"), Some(fixture.path("lib/a.ts")));

    fixture.write("pathalias.toml", "[alias.map\n");
    fixture.rebuild().await;
    assert_eq!(resolve(&fixture, "@/a"), Some(fixture.path("lib/a.ts")));
}

#[tokio::test]
async fn test_malformed_rc_contributes_nothing() {
    let fixture = TestFixture::new();
    fixture.write("src/a.ts", "");
    fixture.write(".pathaliasrc", "{ not json");
    fixture.alias_src().await;

    assert_eq!(aliases(&fixture), vec!["@"]);
}

#[tokio::test]
async fn test_invalid_targets_are_dropped() {
    let fixture = TestFixture::new();
    fixture.write("src/a.ts", "");
    fixture
        .configure(serde_json::json!({
            "alias": { "map": {
                "@": "${cwd}/src",
                "missing": "${cwd}/nope",
                "relative": "src"
            } }
        }))
        .await;

    assert_eq!(aliases(&fixture), vec!["@"]);
}

#[tokio::test]
async fn test_settings_nested_under_section_key() {
    let fixture = TestFixture::new();
    fixture.write("src/a.ts", "");
    fixture
        .configure(serde_json::json!({
            "pathalias": { "alias": { "map": { "~": "${cwd}/src" } } }
        }))
        .await;

    assert_eq!(resolve(&fixture, "~/a"), Some(fixture.path("src/a.ts")));
}

#[tokio::test]
async fn test_node_modules_never_enter_the_tree() {
    let fixture = TestFixture::new();
    fixture.write("src/node_modules/pkg/index.js", "");
    fixture.write("src/b.js", "");
    fixture.alias_src().await;

    assert!(resolve(&fixture, "@/node_modules/pkg").is_none());
    assert_eq!(resolve(&fixture, "@/b"), Some(fixture.path("src/b.js")));
}

#[tokio::test]
async fn test_webpack_aliases_when_enabled() {
    let fixture = TestFixture::new();
    fixture.write("app/a.js", "");
    fixture.write(
        "package.json",
        r#"{ "name": "demo", "devDependencies": { "webpack": "^5.0.0" } }"#,
    );
    fixture.write(
        "webpack.config.js",
        r#"const path = require('path');
module.exports = {
  resolve: {
    alias: {
      '@app': path.resolve(__dirname, 'app'),
    },
  },
};
"#,
    );

    fixture.configure(serde_json::json!({})).await;
    assert!(aliases(&fixture).is_empty());

    fixture
        .configure(serde_json::json!({ "alias": { "discover_bundler": true } }))
        .await;
    assert_eq!(aliases(&fixture), vec!["@app"]);
    assert_eq!(resolve(&fixture, "@app/a"), Some(fixture.path("app/a.js")));
}

#[tokio::test]
async fn test_multiple_roots_are_independent() {
    let first = TestFixture::new();
    let second = TestFixture::new();
    first.write("src/a.ts", "");
    second.write("lib/b.ts", "");
    second.write(".pathaliasrc", r##"{ "#": "${cwd}/lib" }"##);

    first
        .state
        .set_workspace_roots(vec![first.root.clone(), second.root.clone()]);
    first.alias_src().await;

    let trees = first.state.trees.snapshot();
    assert_eq!(trees.len(), 2);
    let ws = trees.for_path(&second.root.join("lib/b.ts")).unwrap();
    assert_eq!(
        ws.resolve("#/b", "ts").map(|r| r.path),
        Some(second.root.join("lib/b.ts"))
    );
    // `${cwd}/src` from the editor settings does not exist in the second root.
    assert!(ws.tree.get("@").is_none());
}

//! Import resolution through a whole workspace.

use crate::helpers::source_fixtures::*;
use crate::helpers::workspace::*;
use robotls::Position;
use robotls::project::ImportStatus;

#[test]
fn test_quoted_and_unquoted_path_with_space_resolve_identically() {
    let plain = "*** Settings ***\nLibrary    ./libs/My Lib.py\n\n*** Test Cases ***\nT\n    Greet User    me\n";
    let quoted = "*** Settings ***\nLibrary    \"./libs/My Lib.py\"\n\n*** Test Cases ***\nT\n    Greet User    me\n";
    let ws = TestWorkspace::new(&[
        ("libs/My Lib.py", MY_LIB),
        ("plain.robot", plain),
        ("quoted.robot", quoted),
    ]);
    let analysis = ws.host.analysis();
    let snapshot = analysis.snapshot();

    let targets: Vec<_> = ["plain.robot", "quoted.robot"]
        .iter()
        .map(|name| {
            let entry = snapshot.document(&ws.path(name)).unwrap();
            assert_eq!(entry.imports.len(), 1);
            assert_eq!(entry.imports[0].status, ImportStatus::Resolved);
            entry.imports[0].target.clone()
        })
        .collect();
    assert_eq!(targets[0], targets[1]);
    assert!(targets[0].as_ref().unwrap().ends_with("libs/My Lib.py"));

    for name in ["plain.robot", "quoted.robot"] {
        assert_eq!(analysis.lookup_keyword("Greet User", ws.path(name)).len(), 1);
        assert!(analysis.lookup_keyword("_helper", ws.path(name)).is_empty());
        assert!(analysis.diagnostics(ws.path(name)).is_empty());
    }
}

#[test]
fn test_search_path_is_tried_after_importer_directory() {
    let suite = "*** Settings ***\nResource    shared.resource\n\n*** Test Cases ***\nT\n    Say Hello\n";
    let mut config = offline_config();
    config.search_paths = vec!["common".into()];
    let ws = TestWorkspace::with_config(
        &[("common/shared.resource", GREET_RESOURCE), ("tests/suite.robot", suite)],
        config,
    );
    let found = ws
        .host
        .analysis()
        .definition_of(ws.path("tests/suite.robot"), Position::new(5, 6));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].path, ws.path("common/shared.resource"));
}

#[test]
fn test_unicode_directory_round_trips() {
    let suite = "*** Settings ***\nResource    ../ресурсы dir/greet.resource\n\n*** Test Cases ***\nT\n    Say Hello\n";
    let ws = TestWorkspace::new(&[
        ("ресурсы dir/greet.resource", GREET_RESOURCE),
        ("suites/suite.robot", suite),
    ]);
    let found = ws
        .host
        .analysis()
        .definition_of(ws.path("suites/suite.robot"), Position::new(5, 6));
    assert_eq!(found[0].path, ws.path("ресурсы dir/greet.resource"));
}

#[test]
fn test_reupsert_identical_text_does_not_reintrospect() {
    let mut ws = TestWorkspace::new(&[("libs/My Lib.py", MY_LIB), ("suite.robot", "")]);
    let suite = "*** Settings ***\nLibrary    libs/My Lib.py\nLibrary    Collections\n";
    ws.edit("suite.robot", suite);
    let libraries = ws.host.index().libraries().clone();
    let before = libraries.stats();
    let entries = libraries.len();

    ws.edit("suite.robot", suite);
    let after = libraries.stats();
    assert_eq!(after.introspections, before.introspections);
    assert_eq!(libraries.len(), entries);
    assert!(after.hits > before.hits);
}

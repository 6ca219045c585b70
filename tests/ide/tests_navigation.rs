//! Go-to-definition and hover across documents.

use rstest::rstest;

use robotls::Position;

use crate::helpers::source_fixtures::{GREET_RESOURCE, GREET_SUITE, SHADOW_RESOURCE, SHADOW_SUITE};
use crate::helpers::workspace::TestWorkspace;

#[rstest]
#[case::first_call(5, 6)]
#[case::call_with_argument(6, 4)]
fn test_definition_in_resource(#[case] line: u32, #[case] column: u32) {
    let ws = TestWorkspace::new(&[
        ("greet.resource", GREET_RESOURCE),
        ("suite.robot", GREET_SUITE),
    ]);
    let targets = ws
        .host
        .analysis()
        .definition_of(ws.path("suite.robot"), Position::new(line, column));

    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].path, ws.path("greet.resource"));
    assert_eq!(targets[0].span.start.line, 1);
}

#[rstest]
#[case::section_header(0, 3)]
#[case::test_name(4, 2)]
#[case::argument(6, 18)]
fn test_non_references_have_no_definition(#[case] line: u32, #[case] column: u32) {
    let ws = TestWorkspace::new(&[
        ("greet.resource", GREET_RESOURCE),
        ("suite.robot", GREET_SUITE),
    ]);
    let targets = ws
        .host
        .analysis()
        .definition_of(ws.path("suite.robot"), Position::new(line, column));
    assert!(targets.is_empty(), "{targets:?}");
}

#[test]
fn test_definition_prefers_local_keyword() {
    let ws = TestWorkspace::new(&[
        ("shadow.resource", SHADOW_RESOURCE),
        ("suite.robot", SHADOW_SUITE),
    ]);
    let suite = ws.path("suite.robot");
    let targets = ws.host.analysis().definition_of(&suite, Position::new(8, 6));
    assert_eq!(targets[0].path, suite);
    assert_eq!(targets[0].span.start.line, 11);
}

#[test]
fn test_hover_shows_resource_signature() {
    let ws = TestWorkspace::new(&[
        ("greet.resource", GREET_RESOURCE),
        ("suite.robot", GREET_SUITE),
    ]);
    let hover = ws
        .host
        .analysis()
        .hover(ws.path("suite.robot"), Position::new(5, 6))
        .expect("hover on keyword call");
    assert!(hover.contents.starts_with("**Say Hello** (greet)"), "{}", hover.contents);
    assert!(hover.contents.contains("name=world"), "{}", hover.contents);
}

#[test]
fn test_references_follow_importers_and_edits() {
    let mut ws = TestWorkspace::new(&[
        ("greet.resource", GREET_RESOURCE),
        ("suite.robot", GREET_SUITE),
    ]);
    let resource = ws.path("greet.resource");
    let suite = ws.path("suite.robot");

    let refs = ws.host.analysis().references(&resource, Position::new(1, 3), false);
    let lines: Vec<u32> = refs.iter().map(|r| r.location.span.start.line).collect();
    assert!(refs.iter().all(|r| r.location.path == suite));
    assert_eq!(lines, vec![5, 6]);

    ws.edit(
        "suite.robot",
        "*** Settings ***\nResource    greet.resource\n\n*** Test Cases ***\nGreets\n    Say Hello\n",
    );
    let from_call = ws.host.analysis().references(&suite, Position::new(5, 6), true);
    assert_eq!(from_call.len(), 2);
    assert!(from_call[0].is_definition);
    assert_eq!(from_call[0].location.path, resource);
}

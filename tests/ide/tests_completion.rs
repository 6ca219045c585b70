//! Completion through the host, against on-disk workspaces.

use robotls::Position;
use robotls::ide::CompletionKind;

use crate::helpers::source_fixtures::{ALIAS_SUITE, GREET_RESOURCE, GREET_SUITE};
use crate::helpers::workspace::TestWorkspace;

#[test]
fn test_aliased_library_completion() {
    let ws = TestWorkspace::new(&[("suite.robot", ALIAS_SUITE)]);
    let items = ws
        .host
        .analysis()
        .completions(ws.path("suite.robot"), Position::new(5, 8));

    assert!(!items.is_empty());
    assert!(items.iter().all(|i| i.kind == CompletionKind::Keyword));
    assert!(items.iter().all(|i| i.label.ends_with("(Col)")));
    let append = items
        .iter()
        .find(|i| &*i.label == "Append To List (Col)")
        .expect("Append To List offered");
    assert_eq!(&*append.insert_text, "Col.Append To List");
}

#[test]
fn test_completion_sees_resource_keywords_after_edit() {
    let mut ws = TestWorkspace::new(&[
        ("greet.resource", GREET_RESOURCE),
        ("suite.robot", GREET_SUITE),
    ]);
    let suite = ws.path("suite.robot");
    let before = ws.host.analysis().completions(&suite, Position::new(5, 7));
    assert_eq!(&*before[0].label, "Say Hello (greet)");

    ws.edit(
        "greet.resource",
        "*** Keywords ***\nSay Goodbye\n    No Operation\n",
    );
    let after = ws.host.analysis().completions(&suite, Position::new(5, 7));
    assert!(after.iter().any(|i| &*i.label == "Say Goodbye (greet)"));
    assert!(!after.iter().any(|i| &*i.label == "Say Hello (greet)"));
}

#[test]
fn test_local_keywords_rank_before_imported() {
    let ws = TestWorkspace::new(&[
        ("greet.resource", GREET_RESOURCE),
        (
            "suite.robot",
            "*** Settings ***\nResource    greet.resource\n\n*** Test Cases ***\nT\n    Sa\n\n*** Keywords ***\nSave State\n    No Operation\n",
        ),
    ]);
    let items = ws
        .host
        .analysis()
        .completions(ws.path("suite.robot"), Position::new(5, 6));
    let labels: Vec<&str> = items.iter().map(|i| &*i.label).collect();
    let local = labels.iter().position(|l| *l == "Save State (suite)").unwrap();
    let imported = labels.iter().position(|l| *l == "Say Hello (greet)").unwrap();
    assert!(local < imported, "{labels:?}");
}

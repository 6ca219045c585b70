//! Lookup precedence across local, resource, library and built-in scopes.

use crate::helpers::source_fixtures::*;
use crate::helpers::workspace::*;
use robotls::hir::{KeywordTier, VariableTier};
use robotls::project::VariablePrecedence;
use rstest::rstest;

#[rstest]
#[case("Nowhere To Be Found")]
#[case("Col.Nothing")]
#[case("")]
#[case("Given")]
fn test_unknown_keywords_are_empty(#[case] name: &str) {
    let ws = TestWorkspace::new(&[("suite.robot", SHADOW_SUITE), ("shadow.resource", SHADOW_RESOURCE)]);
    assert!(ws.host.analysis().lookup_keyword(name, ws.path("suite.robot")).is_empty());
}

#[test]
fn test_unknown_variables_and_documents_are_empty() {
    let ws = TestWorkspace::new(&[("suite.robot", SHADOW_SUITE)]);
    let analysis = ws.host.analysis();
    assert!(analysis.lookup_variable("${NOT_THERE}", ws.path("suite.robot")).is_empty());
    assert!(analysis.lookup_keyword("Shared", ws.path("missing.robot")).is_empty());
}

#[test]
fn test_local_keyword_wins_over_resource() {
    let ws = TestWorkspace::new(&[("suite.robot", SHADOW_SUITE), ("shadow.resource", SHADOW_RESOURCE)]);
    let candidates = ws.host.analysis().lookup_keyword("Shared", ws.path("suite.robot"));
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].tier, KeywordTier::Local);
    assert_eq!(candidates[1].tier, KeywordTier::Resource);
    assert_eq!(candidates[1].source, "shadow");
}

#[test]
fn test_gherkin_and_case_insensitive_names() {
    let ws = TestWorkspace::new(&[("suite.robot", SHADOW_SUITE), ("shadow.resource", SHADOW_RESOURCE)]);
    let analysis = ws.host.analysis();
    for call in ["Given shared", "And SHARED", "shadow.Shared", "BuiltIn.Log"] {
        assert!(
            !analysis.lookup_keyword(call, ws.path("suite.robot")).is_empty(),
            "{call} should resolve"
        );
    }
    let builtin = analysis.lookup_keyword("Should Be Equal", ws.path("suite.robot"));
    assert_eq!(builtin[0].tier, KeywordTier::BuiltIn);
}

#[test]
fn test_document_table_wins_over_resource_table() {
    let ws = TestWorkspace::new(&[("suite.robot", SHADOW_SUITE), ("shadow.resource", SHADOW_RESOURCE)]);
    let candidates = ws.host.analysis().lookup_variable("${shared}", ws.path("suite.robot"));
    assert_eq!(candidates[0].tier, VariableTier::Document);
    assert_eq!(candidates[0].value, "from suite");
    assert_eq!(candidates[1].tier, VariableTier::Resource);
}

#[rstest]
#[case(VariablePrecedence::WorkspaceAfterResources, VariableTier::Resource)]
#[case(VariablePrecedence::WorkspaceBeforeResources, VariableTier::Workspace)]
fn test_workspace_variables_precedence(#[case] precedence: VariablePrecedence, #[case] first: VariableTier) {
    let suite = "*** Settings ***\nResource    shadow.resource\n";
    let mut config = offline_config();
    config.variables.insert("SHARED".to_string(), "from config".to_string());
    config.variable_precedence = precedence;
    let ws = TestWorkspace::with_config(&[("suite.robot", suite), ("shadow.resource", SHADOW_RESOURCE)], config);

    let candidates = ws.host.analysis().lookup_variable("${SHARED}", ws.path("suite.robot"));
    let tiers: Vec<_> = candidates.iter().map(|c| c.tier).collect();
    assert_eq!(tiers[0], first);
    assert!(tiers.contains(&VariableTier::Workspace));
    assert!(tiers.contains(&VariableTier::Resource));
}

#[test]
fn test_builtin_variables_come_last() {
    let ws = TestWorkspace::new(&[("suite.robot", "*** Variables ***\n${TRUE}    shadowed\n")]);
    let candidates = ws.host.analysis().lookup_variable("${TRUE}", ws.path("suite.robot"));
    assert_eq!(candidates.first().map(|c| c.tier), Some(VariableTier::Document));
    assert_eq!(candidates.last().map(|c| c.tier), Some(VariableTier::BuiltIn));
}

#[test]
fn test_transitive_resources_and_cycles() {
    let a = "*** Settings ***\nResource    b.resource\n\n*** Keywords ***\nFrom A\n    No Operation\n";
    let b = "*** Settings ***\nResource    a.resource\n\n*** Keywords ***\nFrom B\n    No Operation\n";
    let suite = "*** Settings ***\nResource    a.resource\n";
    let ws = TestWorkspace::new(&[("a.resource", a), ("b.resource", b), ("suite.robot", suite)]);
    let analysis = ws.host.analysis();
    assert_eq!(analysis.lookup_keyword("From B", ws.path("suite.robot")).len(), 1);
    assert_eq!(analysis.lookup_keyword("From A", ws.path("b.resource")).len(), 1);
}

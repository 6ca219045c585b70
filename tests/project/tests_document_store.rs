//! Document store behaviour across edits.

use robotls::base::Fingerprint;
use robotls::project::DocumentStore;
use rstest::rstest;

#[rstest]
#[case("")]
#[case("*** Test Cases ***\nT\n    Log    x\n")]
#[case("*** Bogus ***\nnot robot at all\n")]
#[case("*** Keywords ***\nÜber Keyword\n    Log    ✓\n")]
fn test_upsert_then_get_has_newer_version_and_text_fingerprint(#[case] text: &str) {
    let mut store = DocumentStore::new();
    let path = "/ws/suite.robot";
    let before = store.upsert(path, "*** Comments ***\n");

    let version = store.upsert(path, text);
    let document = store.get(path).unwrap();
    assert!(version > before);
    assert_eq!(document.version, version);
    assert_eq!(document.fingerprint, Fingerprint::of_text(text));
    assert_eq!(&*document.text, text);
}

#[test]
fn test_readded_path_gets_newer_version() {
    let mut store = DocumentStore::new();
    let first = store.upsert("/ws/a.robot", "x");
    store.remove("/ws/a.robot");
    assert!(store.get("/ws/a.robot").is_none());
    let second = store.upsert("/ws/a.robot", "x");
    assert!(second > first);
}

#[test]
fn test_malformed_section_keeps_rest_queryable() {
    let mut store = DocumentStore::new();
    store.upsert(
        "/ws/a.robot",
        "*** Nonsense ***\nfoo\n\n*** Keywords ***\nStill Here\n    No Operation\n",
    );
    let document = store.get("/ws/a.robot").unwrap();
    assert!(document.tree.has_errors());
    assert_eq!(document.tree.keywords.len(), 1);
    assert_eq!(document.tree.keywords[0].name.text, "Still Here");
}

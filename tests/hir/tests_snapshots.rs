//! Readers always see a whole index generation.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::helpers::workspace::offline_config;
use robotls::hir::WorkspaceIndex;
use robotls::project::{DocumentStore, LibrarySpecCache};

fn source(n: usize) -> String {
    format!(
        "*** Variables ***\n${{ROUND}}    {n}\n\n*** Keywords ***\nRound {n}\n    No Operation\n"
    )
}

#[test]
fn test_readers_never_observe_partial_patch() {
    let index = Arc::new(WorkspaceIndex::new(Arc::new(LibrarySpecCache::default())));
    index.init(None, offline_config());
    let path = PathBuf::from("/virtual/rounds.robot");
    let mut store = DocumentStore::new();
    store.upsert(&path, &source(0));
    index.on_document_changed(store.get(&path).unwrap());

    let done = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let index = index.clone();
            let done = done.clone();
            let path = path.clone();
            thread::spawn(move || {
                let mut last_generation = 0;
                let mut checked = 0;
                while !done.load(Ordering::Acquire) || checked == 0 {
                    let snapshot = index.snapshot();
                    assert!(snapshot.generation() >= last_generation);
                    last_generation = snapshot.generation();

                    let round = snapshot.lookup_variable("${ROUND}", &path, None);
                    let value = &round[0].value;
                    let keyword = snapshot.lookup_keyword(&format!("Round {value}"), &path);
                    assert_eq!(keyword.len(), 1, "generation {last_generation} is torn");
                    checked += 1;
                }
            })
        })
        .collect();

    for n in 1..=50 {
        store.upsert(&path, &source(n));
        index.on_document_changed(store.get(&path).unwrap());
    }
    done.store(true, Ordering::Release);
    for reader in readers {
        reader.join().unwrap();
    }
    let last = index.snapshot().lookup_variable("${ROUND}", &path, None);
    assert_eq!(last[0].value, "50");
}

#[test]
fn test_subscribers_see_changed_and_dependent_documents() {
    let index = WorkspaceIndex::new(Arc::new(LibrarySpecCache::default()));
    index.init(None, offline_config());
    let dir = tempfile::tempdir().unwrap();
    let resource = dir.path().join("common.resource");
    let suite = dir.path().join("suite.robot");
    std::fs::write(&resource, "*** Keywords ***\nK\n    No Operation\n").unwrap();
    std::fs::write(&suite, "*** Settings ***\nResource    common.resource\n").unwrap();

    let mut store = DocumentStore::new();
    store.upsert(&resource, "*** Keywords ***\nK\n    No Operation\n");
    store.upsert(&suite, "*** Settings ***\nResource    common.resource\n");
    index.on_documents_changed(vec![store.get(&resource).unwrap(), store.get(&suite).unwrap()]);

    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = seen.clone();
    index.subscribe(move |change, _| sink.lock().push((change.changed.clone(), change.removed.clone())));

    index.on_document_removed(&store.remove(&resource).unwrap().path);
    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].1, vec![robotls::base::paths::normalize(&resource)]);
    assert!(seen[0].0.contains(&robotls::base::paths::normalize(&suite)));
}

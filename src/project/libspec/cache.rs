//! Memoized library specs.
//!
//! Entries are keyed by library target and import arguments and stamped with
//! the fingerprint of the library source. A lookup whose current fingerprint
//! differs from the stored one replaces exactly that entry. Reads take a
//! shared lock; only inserting a fresh entry takes the write lock.
//!
//! Concurrent misses on one key share a per-key slot so the library is
//! introspected once. Failed introspections are not stored and the next
//! lookup tries again.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::introspect::{DefaultIntrospector, IntrospectRequest, LibraryIntrospector, LibraryTarget};
use super::{LibrarySpec, LibspecError};
use crate::base::constants::BUILTIN_LIBRARY;
use crate::base::{Fingerprint, paths};
use crate::project::search_path::{
    ImportStatus, PathLookup, SearchContext, find_python_modules, resolve_path,
};

/// A library import as written: literal name or path, arguments, alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryImport<'a> {
    pub literal: &'a str,
    pub args: &'a [String],
    pub alias: Option<&'a str>,
}

/// A spec bound to the alias of the import that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLibrary {
    pub spec: Arc<LibrarySpec>,
    pub alias: Option<SmolStr>,
}

impl ResolvedLibrary {
    /// Name used for `Name.Keyword` calls and completion labels.
    pub fn name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.spec.name)
    }
}

/// Outcome of [`LibrarySpecCache::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecResolution {
    pub status: ImportStatus,
    pub library: Option<ResolvedLibrary>,
    /// Resolved source file, when the library has one.
    pub target: Option<PathBuf>,
    /// Why the import did not resolve cleanly.
    pub message: Option<String>,
}

impl SpecResolution {
    fn not_found(message: String) -> Self {
        Self {
            status: ImportStatus::NotFound,
            library: None,
            target: None,
            message: Some(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SpecKey {
    target: LibraryTarget,
    args: Vec<String>,
}

impl SpecKey {
    fn identity(&self) -> String {
        let mut identity = self.target.identity();
        for arg in &self.args {
            identity.push_str("::");
            identity.push_str(arg);
        }
        identity
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    fingerprint: Fingerprint,
    spec: Arc<LibrarySpec>,
}

/// Counters for observing cache behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub introspections: usize,
    pub hits: usize,
    pub disk_loads: usize,
}

/// Read-mostly, thread-safe cache of library specs.
pub struct LibrarySpecCache {
    entries: RwLock<FxHashMap<SpecKey, CacheEntry>>,
    in_flight: Mutex<FxHashMap<SpecKey, Arc<Mutex<()>>>>,
    introspector: Arc<dyn LibraryIntrospector>,
    cache_dir: RwLock<Option<PathBuf>>,
    introspections: AtomicUsize,
    hits: AtomicUsize,
    disk_loads: AtomicUsize,
}

impl std::fmt::Debug for LibrarySpecCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibrarySpecCache")
            .field("entries", &self.entries.read().len())
            .field("cache_dir", &*self.cache_dir.read())
            .field("stats", &self.stats())
            .finish()
    }
}

impl Default for LibrarySpecCache {
    fn default() -> Self {
        Self::new(Arc::new(DefaultIntrospector::new()))
    }
}

impl LibrarySpecCache {
    pub fn new(introspector: Arc<dyn LibraryIntrospector>) -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
            in_flight: Mutex::new(FxHashMap::default()),
            introspector,
            cache_dir: RwLock::new(None),
            introspections: AtomicUsize::new(0),
            hits: AtomicUsize::new(0),
            disk_loads: AtomicUsize::new(0),
        }
    }

    /// Directory for persisted specs; `None` disables persistence.
    pub fn set_cache_dir(&self, dir: Option<PathBuf>) {
        *self.cache_dir.write() = dir;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            introspections: self.introspections.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            disk_loads: self.disk_loads.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry for a library source file.
    pub fn invalidate_file(&self, path: &Path) {
        self.entries
            .write()
            .retain(|key, _| key.target != LibraryTarget::File(path.to_path_buf()));
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// The always-imported `BuiltIn` library.
    pub fn builtin(&self, ctx: &SearchContext) -> Option<ResolvedLibrary> {
        let import = LibraryImport {
            literal: BUILTIN_LIBRARY,
            args: &[],
            alias: None,
        };
        self.resolve(&import, ctx).library
    }

    /// Resolve a library import to a spec.
    ///
    /// Path imports try the absolute path, the importer directory and then
    /// each search root. Name imports look for a module file under the same
    /// roots before falling back to the interpreter or bundled specs.
    pub fn resolve(&self, import: &LibraryImport<'_>, ctx: &SearchContext) -> SpecResolution {
        let cleaned = paths::clean_import_literal(import.literal, ctx.importer_dir.as_deref());
        let mut status = ImportStatus::Resolved;
        let mut message = None;

        let target = if paths::looks_like_path(&cleaned) {
            match resolve_path(import.literal, ctx) {
                PathLookup::File(path) => LibraryTarget::File(path),
                PathLookup::Directory(dir) => {
                    let init = dir.join("__init__.py");
                    if init.is_file() {
                        LibraryTarget::File(init)
                    } else {
                        return SpecResolution::not_found(format!(
                            "Library '{}' is a directory without __init__.py",
                            import.literal
                        ));
                    }
                }
                PathLookup::NotFound { checked } => {
                    return SpecResolution::not_found(format!(
                        "Library '{}' not found. Checked: {}",
                        import.literal,
                        checked
                            .iter()
                            .map(|p| p.display().to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ));
                }
            }
        } else if cleaned == BUILTIN_LIBRARY {
            LibraryTarget::Module(cleaned)
        } else {
            let modules = find_python_modules(&cleaned, ctx);
            if modules.len() > 1 {
                status = ImportStatus::Ambiguous;
                message = Some(format!(
                    "Library '{}' matches multiple modules: {}",
                    cleaned,
                    modules
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
            }
            match modules.into_iter().next() {
                Some(path) => LibraryTarget::File(path),
                None => LibraryTarget::Module(cleaned),
            }
        };

        let fingerprint = match self.fingerprint(&target, import.args, ctx) {
            Ok(fp) => fp,
            Err(e) => return SpecResolution::not_found(e.to_string()),
        };
        let source = match &target {
            LibraryTarget::File(path) => Some(path.clone()),
            LibraryTarget::Module(_) => None,
        };
        let key = SpecKey {
            target,
            args: import.args.to_vec(),
        };

        match self.lookup(&key, fingerprint, ctx) {
            Ok(spec) => SpecResolution {
                status,
                target: source.or_else(|| spec.source.clone()),
                library: Some(ResolvedLibrary {
                    spec,
                    alias: import.alias.map(SmolStr::new),
                }),
                message,
            },
            Err(e) => SpecResolution::not_found(format!(
                "Library '{}' could not be loaded: {e}",
                import.literal
            )),
        }
    }

    fn fingerprint(
        &self,
        target: &LibraryTarget,
        args: &[String],
        ctx: &SearchContext,
    ) -> Result<Fingerprint, LibspecError> {
        match target {
            LibraryTarget::File(path) => Ok(Fingerprint::of_bytes(&fs::read(path)?)),
            LibraryTarget::Module(name) => {
                let interpreter = ctx
                    .interpreter
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let mut parts: Vec<&[u8]> = vec![name.as_bytes(), interpreter.as_bytes()];
                parts.extend(args.iter().map(|a| a.as_bytes()));
                Ok(Fingerprint::of_parts(parts))
            }
        }
    }

    fn cached(&self, key: &SpecKey, fingerprint: Fingerprint) -> Option<Arc<LibrarySpec>> {
        let entries = self.entries.read();
        let entry = entries.get(key).filter(|e| e.fingerprint == fingerprint)?;
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(entry.spec.clone())
    }

    fn lookup(
        &self,
        key: &SpecKey,
        fingerprint: Fingerprint,
        ctx: &SearchContext,
    ) -> Result<Arc<LibrarySpec>, String> {
        if let Some(spec) = self.cached(key, fingerprint) {
            return Ok(spec);
        }

        let slot = self.in_flight.lock().entry(key.clone()).or_default().clone();
        let outcome = {
            let _turn = slot.lock();
            match self.cached(key, fingerprint) {
                Some(spec) => Ok(spec),
                None => self.load(key, fingerprint, ctx),
            }
        };

        // The map and this call hold the only references when nobody waits.
        // Each caller releases its reference under the map lock.
        let mut in_flight = self.in_flight.lock();
        let idle = Arc::strong_count(&slot) <= 2;
        if idle && in_flight.get(key).is_some_and(|s| Arc::ptr_eq(s, &slot)) {
            in_flight.remove(key);
        }
        drop(slot);
        drop(in_flight);
        outcome
    }

    /// Disk or introspector; successful specs are stored in memory.
    fn load(
        &self,
        key: &SpecKey,
        fingerprint: Fingerprint,
        ctx: &SearchContext,
    ) -> Result<Arc<LibrarySpec>, String> {
        let spec = match self.load_persisted(key, fingerprint) {
            Some(spec) => spec,
            None => {
                self.introspections.fetch_add(1, Ordering::Relaxed);
                let request = IntrospectRequest {
                    target: &key.target,
                    args: &key.args,
                    interpreter: ctx.interpreter.as_deref(),
                    search_paths: &ctx.search_paths,
                    fingerprint,
                };
                match self.introspector.introspect(&request) {
                    Ok(spec) => {
                        tracing::info!(
                            library = %spec.name,
                            keywords = spec.keywords.len(),
                            origin = ?spec.origin,
                            "library spec generated"
                        );
                        let spec = Arc::new(spec);
                        self.persist(key, &spec);
                        spec
                    }
                    Err(e) => {
                        tracing::warn!(library = %key.identity(), "introspection failed: {e}");
                        return Err(e.to_string());
                    }
                }
            }
        };

        self.entries.write().insert(
            key.clone(),
            CacheEntry {
                fingerprint,
                spec: spec.clone(),
            },
        );
        Ok(spec)
    }

    fn persisted_path(&self, key: &SpecKey, fingerprint: Fingerprint) -> Option<PathBuf> {
        let dir = self.cache_dir.read().clone()?;
        let identity: String = key
            .identity()
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        Some(dir.join(format!("{}-{}.json", identity, fingerprint.short())))
    }

    fn load_persisted(&self, key: &SpecKey, fingerprint: Fingerprint) -> Option<Arc<LibrarySpec>> {
        let path = self.persisted_path(key, fingerprint)?;
        let text = fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<LibrarySpec>(&text) {
            Ok(spec) if spec.fingerprint == fingerprint => {
                self.disk_loads.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(path = %path.display(), "library spec loaded from disk");
                Some(Arc::new(spec))
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring corrupt spec cache file: {e}");
                None
            }
        }
    }

    fn persist(&self, key: &SpecKey, spec: &LibrarySpec) {
        let Some(path) = self.persisted_path(key, spec.fingerprint) else {
            return;
        };
        let result = path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| {
                let json = serde_json::to_string(spec).map_err(std::io::Error::other)?;
                fs::write(&path, json)
            });
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), "failed to persist library spec: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::libspec::{KeywordSignature, SpecOrigin};

    /// Counts calls and returns a one-keyword spec.
    struct CountingIntrospector;

    impl LibraryIntrospector for CountingIntrospector {
        fn introspect(&self, request: &IntrospectRequest<'_>) -> Result<LibrarySpec, LibspecError> {
            let mut spec = LibrarySpec::empty(request.target.display_name(), request.fingerprint);
            spec.origin = SpecOrigin::StaticScan;
            spec.keywords.push(KeywordSignature::new("Do Thing"));
            Ok(spec)
        }
    }

    /// Fails until `fail_first` calls have been made, sleeping on each.
    struct FlakyIntrospector {
        calls: AtomicUsize,
        fail_first: usize,
        delay: std::time::Duration,
    }

    impl FlakyIntrospector {
        fn new(fail_first: usize, delay_ms: u64) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first,
                delay: std::time::Duration::from_millis(delay_ms),
            }
        }
    }

    impl LibraryIntrospector for FlakyIntrospector {
        fn introspect(&self, request: &IntrospectRequest<'_>) -> Result<LibrarySpec, LibspecError> {
            std::thread::sleep(self.delay);
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                return Err(LibspecError::Timeout(request.target.display_name()));
            }
            let mut spec = LibrarySpec::empty(request.target.display_name(), request.fingerprint);
            spec.keywords.push(KeywordSignature::new("Connect"));
            Ok(spec)
        }
    }

    fn setup() -> (tempfile::TempDir, SearchContext, LibrarySpecCache) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("libs")).unwrap();
        fs::write(dir.path().join("libs/My Lib.py"), "def do_thing():\n    pass\n").unwrap();
        let ctx = SearchContext::new(vec![], None).for_importer(Some(dir.path()));
        let cache = LibrarySpecCache::new(Arc::new(CountingIntrospector));
        (dir, ctx, cache)
    }

    fn import(literal: &str) -> LibraryImport<'_> {
        LibraryImport {
            literal,
            args: &[],
            alias: None,
        }
    }

    #[test]
    fn test_memoized_until_source_changes() {
        let (dir, ctx, cache) = setup();
        let first = cache.resolve(&import("libs/My Lib.py"), &ctx);
        assert_eq!(first.status, ImportStatus::Resolved);
        cache.resolve(&import("./libs/My Lib.py"), &ctx);
        assert_eq!(cache.stats().introspections, 1);
        assert_eq!(cache.stats().hits, 1);

        fs::write(dir.path().join("libs/My Lib.py"), "def other():\n    pass\n").unwrap();
        let second = cache.resolve(&import("libs/My Lib.py"), &ctx);
        assert_eq!(cache.stats().introspections, 2);
        assert_ne!(
            first.library.unwrap().spec.fingerprint,
            second.library.unwrap().spec.fingerprint
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_alias_is_per_import() {
        let (_dir, ctx, cache) = setup();
        let aliased = LibraryImport {
            literal: "libs/My Lib.py",
            args: &[],
            alias: Some("ML"),
        };
        let a = cache.resolve(&aliased, &ctx).library.unwrap();
        let b = cache.resolve(&import("libs/My Lib.py"), &ctx).library.unwrap();
        assert_eq!(a.name(), "ML");
        assert_eq!(b.name(), "My Lib");
        assert!(Arc::ptr_eq(&a.spec, &b.spec));
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let (_dir, ctx, cache) = setup();
        let res = cache.resolve(&import("libs/Nope.py"), &ctx);
        assert_eq!(res.status, ImportStatus::NotFound);
        assert!(res.message.unwrap().contains("Checked"));
        assert_eq!(cache.stats().introspections, 0);
    }

    #[test]
    fn test_persisted_specs_survive_new_cache() {
        let (dir, ctx, cache) = setup();
        let store = dir.path().join(".cache");
        cache.set_cache_dir(Some(store.clone()));
        cache.resolve(&import("libs/My Lib.py"), &ctx);
        assert_eq!(cache.stats().introspections, 1);
        assert_eq!(fs::read_dir(&store).unwrap().count(), 1);

        let fresh = LibrarySpecCache::new(Arc::new(CountingIntrospector));
        fresh.set_cache_dir(Some(store));
        let res = fresh.resolve(&import("libs/My Lib.py"), &ctx);
        assert_eq!(res.status, ImportStatus::Resolved);
        assert_eq!(fresh.stats().introspections, 0);
        assert_eq!(fresh.stats().disk_loads, 1);
    }

    #[test]
    fn test_default_introspector_bundled_collections() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = SearchContext::new(vec![], None).for_importer(Some(dir.path()));
        let cache = LibrarySpecCache::default();
        let res = cache.resolve(
            &LibraryImport {
                literal: "Collections",
                args: &[],
                alias: Some("Col"),
            },
            &ctx,
        );
        let lib = res.library.unwrap();
        assert_eq!(lib.name(), "Col");
        assert_eq!(lib.spec.name, "Collections");
        assert!(cache.builtin(&ctx).is_some());
    }

    #[test]
    fn test_failed_introspection_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = SearchContext::new(vec![], None).for_importer(Some(dir.path()));
        let cache = LibrarySpecCache::new(Arc::new(FlakyIntrospector::new(1, 0)));

        let first = cache.resolve(&import("RemoteDriver"), &ctx);
        assert_eq!(first.status, ImportStatus::NotFound);
        assert!(first.message.unwrap().contains("could not be loaded"));
        assert!(cache.is_empty());

        let retry = cache.resolve(&import("RemoteDriver"), &ctx);
        assert_eq!(retry.status, ImportStatus::Resolved);
        assert_eq!(retry.library.unwrap().spec.keywords[0].name, "Connect");
        assert_eq!(cache.stats().introspections, 2);

        cache.resolve(&import("RemoteDriver"), &ctx);
        assert_eq!(cache.stats().introspections, 2);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_concurrent_misses_introspect_once() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = SearchContext::new(vec![], None).for_importer(Some(dir.path()));
        let cache = LibrarySpecCache::new(Arc::new(FlakyIntrospector::new(0, 50)));

        let statuses: Vec<ImportStatus> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| cache.resolve(&import("RemoteDriver"), &ctx).status))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(statuses.iter().all(|s| *s == ImportStatus::Resolved));
        assert_eq!(cache.stats().introspections, 1);
        assert_eq!(cache.stats().hits, 3);
        assert!(cache.in_flight.lock().is_empty());
    }
}

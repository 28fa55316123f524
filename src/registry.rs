//! Strategy discovery and the process-wide strategy registry

use crate::manifest::{manifest_paths, StrategyManifest};
use crate::strategies;
use crate::strategy::{ComparisonStrategy, StrategyDescriptor};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Outcome of one discovery pass. Immutable once built; the registry
/// swaps whole reports on reload.
pub struct ScanReport {
    /// Registered strategies by name, in registration order
    pub strategies: IndexMap<String, Arc<dyn ComparisonStrategy>>,
    /// Source id each strategy was registered from
    pub sources: IndexMap<String, String>,
    /// Discovery errors keyed by source id
    pub errors: IndexMap<String, String>,
    pub scanned_at: DateTime<Utc>,
}

impl fmt::Debug for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanReport")
            .field("strategies", &self.strategies.keys().collect::<Vec<_>>())
            .field("errors", &self.errors)
            .field("scanned_at", &self.scanned_at)
            .finish()
    }
}

impl ScanReport {
    fn new() -> Self {
        Self {
            strategies: IndexMap::new(),
            sources: IndexMap::new(),
            errors: IndexMap::new(),
            scanned_at: Utc::now(),
        }
    }

    fn register(&mut self, source: String, strategy: Arc<dyn ComparisonStrategy>) {
        let name = strategy.name().to_string();

        if let Err(e) = strategy.parameters().validate() {
            self.fail(source, format!("Strategy '{}': {}", name, e));
            return;
        }
        if let Some(first) = self.sources.get(&name) {
            let message = format!("Duplicate strategy name '{}' (already registered from {})", name, first);
            self.fail(source, message);
            return;
        }

        log::debug!("Registered strategy '{}' from {}", name, source);
        self.sources.insert(name.clone(), source);
        self.strategies.insert(name, strategy);
    }

    fn fail(&mut self, source: String, message: String) {
        log::warn!("Discovery error in {}: {}", source, message);
        self.errors.insert(source, message);
    }

    fn load_manifest(&mut self, path: &Path) {
        let source = path.display().to_string();
        let manifest = match StrategyManifest::load(path) {
            Ok(manifest) => manifest,
            Err(e) => return self.fail(source, e.to_string()),
        };

        if !manifest.is_complete() {
            log::debug!("Skipping incomplete strategy manifest {}", source);
            return;
        }

        let base_name = manifest.base.as_deref().unwrap_or_default();
        let base = match self.strategies.get(base_name) {
            Some(base) => Arc::clone(base),
            None => return self.fail(source, format!("Unknown base strategy '{}'", base_name)),
        };

        match manifest.instantiate(base, path) {
            Ok(preset) => self.register(source, Arc::new(preset)),
            Err(e) => self.fail(source, e.to_string()),
        }
    }
}

/// Discover strategies: built-ins first, then manifests under `source`.
///
/// Every source loads independently; a broken manifest or an unreadable
/// directory is recorded in `errors` and never stops the others.
pub fn scan(source: Option<&Path>) -> ScanReport {
    scan_with(source, &[])
}

/// Like [`scan`], with host-compiled strategies registered after the
/// built-ins and before any manifest
pub fn scan_with(source: Option<&Path>, extra: &[Arc<dyn ComparisonStrategy>]) -> ScanReport {
    let mut report = ScanReport::new();

    for strategy in strategies::builtin() {
        let id = format!("builtin:{}", strategy.name());
        report.register(id, strategy);
    }
    for strategy in extra {
        let id = format!("static:{}", strategy.name());
        report.register(id, Arc::clone(strategy));
    }

    if let Some(dir) = source {
        if dir.is_dir() {
            for entry in manifest_paths(dir) {
                match entry {
                    Ok(path) => report.load_manifest(&path),
                    Err(e) => {
                        let id = e.path().unwrap_or(dir).display().to_string();
                        report.fail(id, e.to_string());
                    }
                }
            }
        } else {
            report.fail(dir.display().to_string(), "Strategy directory not found".to_string());
        }
    }

    log::info!(
        "Loaded {} strategies ({} discovery errors)",
        report.strategies.len(),
        report.errors.len()
    );
    report
}

/// Registry of named strategies over one optional manifest directory
pub struct StrategyRegistry {
    source: Option<PathBuf>,
    extra: Vec<Arc<dyn ComparisonStrategy>>,
    snapshot: RwLock<Arc<ScanReport>>,
}

impl StrategyRegistry {
    /// Scan `source` (if any) and build a registry over the result
    pub fn new(source: Option<PathBuf>) -> Self {
        Self::with_strategies(source, Vec::new())
    }

    /// Registry that also carries strategies compiled into the host;
    /// they survive every reload
    pub fn with_strategies(source: Option<PathBuf>, extra: Vec<Arc<dyn ComparisonStrategy>>) -> Self {
        let report = scan_with(source.as_deref(), &extra);
        Self {
            source,
            extra,
            snapshot: RwLock::new(Arc::new(report)),
        }
    }

    /// Registry holding only the built-in strategies
    pub fn builtin() -> Self {
        Self::new(None)
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// The current immutable snapshot. Holders keep a consistent view
    /// across a concurrent reload.
    pub fn snapshot(&self) -> Arc<ScanReport> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Re-scan the source and swap in the new snapshot
    pub fn reload(&self) -> Arc<ScanReport> {
        let report = Arc::new(scan_with(self.source(), &self.extra));
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&report);
        report
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn ComparisonStrategy>> {
        self.snapshot().strategies.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.snapshot().strategies.keys().cloned().collect()
    }

    pub fn descriptors(&self) -> Vec<StrategyDescriptor> {
        self.snapshot().strategies.values().map(|s| s.descriptor()).collect()
    }

    pub fn errors(&self) -> IndexMap<String, String> {
        self.snapshot().errors.clone()
    }
}

static GLOBAL: OnceLock<Arc<StrategyRegistry>> = OnceLock::new();

/// Initialise the process-wide registry over `source`.
///
/// Only the first call scans; later calls return the existing registry.
pub fn init(source: Option<PathBuf>) -> Arc<StrategyRegistry> {
    let mut requested = Some(source);
    let registry = GLOBAL.get_or_init(|| {
        let source = requested.take().flatten();
        Arc::new(StrategyRegistry::new(source))
    });
    if let Some(source) = requested {
        if source.as_deref() != registry.source() {
            log::warn!("Strategy registry already initialised; ignoring new source");
        }
    }
    Arc::clone(registry)
}

/// The process-wide registry, initialised with built-ins only when no
/// `init` call happened first
pub fn global() -> Arc<StrategyRegistry> {
    Arc::clone(GLOBAL.get_or_init(|| Arc::new(StrategyRegistry::builtin())))
}

/// Re-scan the process-wide registry's source
pub fn reload_global() -> Arc<ScanReport> {
    global().reload()
}

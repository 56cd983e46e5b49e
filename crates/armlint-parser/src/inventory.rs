//! Shared cache of parsed documents and the references between them

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use armlint_core::SpecPath;
use dashmap::DashMap;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, debug_span, warn, Instrument};

use crate::dependency_graph::DependencyGraph;
use crate::document::ParsedDocument;
use crate::error::ParserError;
use crate::fs::FileSystem;

/// One cache slot. The cell is where concurrent loads of the same document
/// meet; `expanded` makes sure its references are followed only once.
#[derive(Default)]
struct Entry {
    cell: OnceCell<Arc<ParsedDocument>>,
    expanded: AtomicBool,
}

/// A `$ref` resolved to a node inside a loaded document.
#[derive(Debug, Clone)]
pub struct ResolvedRef {
    pub document: Arc<ParsedDocument>,
    pub pointer: String,
}

impl ResolvedRef {
    pub fn value(&self) -> &Value {
        // presence is checked when the ref is resolved
        self.document.pointer(&self.pointer).unwrap_or(&Value::Null)
    }
}

/// Loads documents through a [`FileSystem`], follows their references, and
/// keeps every document it has seen. Each document is parsed at most once per
/// inventory, no matter how many loads ask for it.
pub struct DocumentInventory {
    file_system: Arc<dyn FileSystem>,
    entries: DashMap<SpecPath, Arc<Entry>>,
    graph: RwLock<DependencyGraph>,
    parse_count: AtomicUsize,
}

impl DocumentInventory {
    pub fn new(file_system: Arc<dyn FileSystem>) -> Self {
        Self {
            file_system,
            entries: DashMap::new(),
            graph: RwLock::new(DependencyGraph::new()),
            parse_count: AtomicUsize::new(0),
        }
    }

    /// Load `path` and, transitively, every document it references.
    ///
    /// Returns the cached document when it is already loaded. A document that
    /// fails to load while being followed as a reference is logged and
    /// skipped; only a failure of `path` itself is returned.
    pub fn load_document<'a>(
        &'a self,
        path: &'a SpecPath,
    ) -> BoxFuture<'a, Result<Arc<ParsedDocument>, ParserError>> {
        let span = debug_span!("load_document", path = %path);
        async move {
            let entry = self
                .entries
                .entry(path.clone())
                .or_insert_with(|| Arc::new(Entry::default()))
                .clone();

            let document = entry
                .cell
                .get_or_try_init(|| self.parse(path))
                .await?
                .clone();

            if !entry.expanded.swap(true, Ordering::SeqCst) {
                self.follow_references(&document).await;
            }

            Ok(document)
        }
        .instrument(span)
        .boxed()
    }

    /// Load several documents concurrently.
    pub async fn load_all(
        &self,
        paths: &[SpecPath],
    ) -> Vec<Result<Arc<ParsedDocument>, ParserError>> {
        join_all(paths.iter().map(|path| self.load_document(path))).await
    }

    async fn parse(&self, path: &SpecPath) -> Result<Arc<ParsedDocument>, ParserError> {
        let text = self
            .file_system
            .read(path)
            .await
            .map_err(|e| e.in_document(path.as_str()))?;
        let document = ParsedDocument::parse(path.clone(), text)?;
        self.parse_count.fetch_add(1, Ordering::SeqCst);
        debug!(
            "Parsed {} ({} references)",
            path,
            document.references().len()
        );
        Ok(Arc::new(document))
    }

    async fn follow_references(&self, document: &ParsedDocument) {
        {
            let mut graph = self.graph_mut();
            graph.add_document(document.path());
            for target in document.references() {
                graph.add_reference(document.path(), target);
            }
        }

        let targets: Vec<&SpecPath> = document.references().iter().collect();
        let results = join_all(targets.iter().map(|target| self.load_document(target))).await;

        for (target, result) in targets.into_iter().zip(results) {
            if let Err(err) = result {
                warn!(
                    "Could not load {} referenced from {}: {}",
                    target,
                    document.path(),
                    err
                );
            }
        }
    }

    /// An already loaded document.
    pub fn get(&self, path: &SpecPath) -> Option<Arc<ParsedDocument>> {
        self.entries
            .get(path)
            .and_then(|entry| entry.cell.get().cloned())
    }

    /// Every loaded document, ordered by path.
    pub fn documents(&self) -> Vec<Arc<ParsedDocument>> {
        let mut documents: Vec<Arc<ParsedDocument>> = self
            .entries
            .iter()
            .filter_map(|entry| entry.value().cell.get().cloned())
            .collect();
        documents.sort_by(|a, b| a.path().cmp(b.path()));
        documents
    }

    /// Documents that reference `path` directly.
    pub fn references_of(&self, path: &SpecPath) -> BTreeSet<SpecPath> {
        self.graph().references_of(path)
    }

    /// Documents `path` references directly.
    pub fn dependencies_of(&self, path: &SpecPath) -> BTreeSet<SpecPath> {
        self.graph().dependencies_of(path)
    }

    pub fn transitive_dependencies(&self, path: &SpecPath) -> BTreeSet<SpecPath> {
        self.graph().transitive_dependencies(path)
    }

    /// Groups of documents whose references form a loop.
    pub fn reference_cycles(&self) -> Vec<Vec<SpecPath>> {
        self.graph().detect_cycles()
    }

    /// How many documents have actually been parsed.
    pub fn parse_count(&self) -> usize {
        self.parse_count.load(Ordering::SeqCst)
    }

    /// Resolve a `$ref` found in `from`: either local (`#/definitions/X`) or
    /// absolute (`/specs/other.json#/definitions/X`). `None` when the target
    /// document is not loaded or the pointer names nothing.
    pub fn resolve_pointer(&self, from: &SpecPath, reference: &str) -> Option<ResolvedRef> {
        let (file, pointer) = reference.split_once('#').unwrap_or((reference, ""));

        let document = if file.is_empty() {
            self.get(from)?
        } else {
            let target = from.join(file).ok()?;
            self.get(&target)?
        };

        document.pointer(pointer)?;
        Some(ResolvedRef {
            document,
            pointer: pointer.to_string(),
        })
    }

    fn graph(&self) -> RwLockReadGuard<'_, DependencyGraph> {
        self.graph.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn graph_mut(&self) -> RwLockWriteGuard<'_, DependencyGraph> {
        self.graph.write().unwrap_or_else(PoisonError::into_inner)
    }
}

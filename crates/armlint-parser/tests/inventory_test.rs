//! Loading multi-file fixtures through the inventory

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use armlint_core::SpecPath;
use armlint_parser::{
    compose, ComposeLimits, DocumentInventory, FileSystem, LocalFileSystem, MemoryFileSystem,
    ParserError,
};
use async_trait::async_trait;
use armlint_test_fixtures::{fixture, Fixture, FixtureType, TestFixtures};
use pretty_assertions::assert_eq;

fn memory_inventory(
    fixture: &Fixture,
) -> Result<(DocumentInventory, SpecPath), Box<dyn std::error::Error>> {
    let fs = MemoryFileSystem::new();
    for (path, text) in &fixture.files {
        fs.insert(path, text.as_str())?;
    }
    let root = SpecPath::new(&fixture.root)?;
    Ok((DocumentInventory::new(Arc::new(fs)), root))
}

/// Reads slowly and counts how often it is asked.
struct SlowFileSystem {
    files: MemoryFileSystem,
    reads: AtomicUsize,
}

impl SlowFileSystem {
    fn new(files: MemoryFileSystem) -> Self {
        Self {
            files,
            reads: AtomicUsize::new(0),
        }
    }

    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileSystem for SlowFileSystem {
    async fn read(&self, path: &SpecPath) -> Result<String, ParserError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.files.read(path).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_loads_parse_once() -> Result<(), Box<dyn std::error::Error>> {
    let files = MemoryFileSystem::new()
        .with("/s/a.json", r##"{"definitions": {"A": {"$ref": "b.json#/definitions/B"}}}"##)?
        .with("/s/b.json", r##"{"definitions": {"B": {"$ref": "a.json#/definitions/A"}}}"##)?;
    let fs = Arc::new(SlowFileSystem::new(files));
    let inventory = Arc::new(DocumentInventory::new(fs.clone()));
    let a = SpecPath::new("/s/a.json")?;
    let b = SpecPath::new("/s/b.json")?;
    let spellings = [a.clone(), SpecPath::new("/S/A.JSON")?, b.clone()];

    let mut handles = Vec::new();
    for i in 0..12 {
        let inventory = inventory.clone();
        let path = spellings[i % spellings.len()].clone();
        handles.push(tokio::spawn(async move {
            let document = inventory.load_document(&path).await?;
            Ok::<_, ParserError>((path, document))
        }));
    }

    let mut loaded_a = Vec::new();
    for handle in handles {
        let (path, document) = handle.await??;
        if path == a {
            loaded_a.push(document);
        } else {
            assert_eq!(document.path(), &b);
        }
    }

    assert_eq!(loaded_a.len(), 8);
    for document in &loaded_a[1..] {
        assert!(Arc::ptr_eq(&loaded_a[0], document));
    }
    assert_eq!(inventory.parse_count(), 2);
    assert_eq!(fs.reads(), inventory.parse_count());
    assert_eq!(inventory.reference_cycles(), vec![vec![a, b]]);
    Ok(())
}

#[tokio::test]
async fn test_reference_edges_recorded() -> Result<(), Box<dyn std::error::Error>> {
    let (inventory, root) = memory_inventory(&fixture(FixtureType::Widgets))?;
    inventory.load_document(&root).await?;

    let common = SpecPath::new("/specs/common/types.json")?;
    assert_eq!(
        inventory.references_of(&common).into_iter().collect::<Vec<_>>(),
        vec![root.clone()]
    );
    assert!(inventory.references_of(&root).is_empty());
    assert!(inventory.reference_cycles().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_cross_file_cycle_loads_and_composes() -> Result<(), Box<dyn std::error::Error>> {
    let (inventory, root) = memory_inventory(&fixture(FixtureType::CrossFileCycle))?;
    let b = SpecPath::new("/specs/cycle/b.json")?;

    let doc = tokio::time::timeout(Duration::from_secs(5), inventory.load_document(&root)).await??;
    assert_eq!(doc.path(), &root);
    assert!(inventory.get(&b).is_some());
    assert_eq!(inventory.parse_count(), 2);
    assert_eq!(inventory.reference_cycles(), vec![vec![root.clone(), b.clone()]]);

    let composed = compose(&inventory, &root, ComposeLimits::default()).ok_or("not loaded")?;
    let a = &composed["definitions"]["A"];
    // A -> B -> A is expanded, the second hop into B stops at the cycle
    assert_eq!(a["properties"]["b"]["type"], "object");
    assert_eq!(a["properties"]["b"]["properties"]["a"]["type"], "object");
    assert_eq!(
        a["properties"]["b"]["properties"]["a"]["properties"]["b"]["$ref"],
        "/specs/cycle/b.json#/definitions/B"
    );
    Ok(())
}

#[tokio::test]
async fn test_loads_from_disk() -> Result<(), Box<dyn std::error::Error>> {
    let mut fixtures = TestFixtures::new();
    let root_file = fixtures.setup(FixtureType::Widgets);

    let inventory = DocumentInventory::new(Arc::new(LocalFileSystem));
    let root = SpecPath::new(root_file.to_string_lossy())?;
    let doc = inventory.load_document(&root).await?;

    assert_eq!(doc.references().len(), 1);
    assert_eq!(inventory.documents().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_malformed_root_reports_position() -> Result<(), Box<dyn std::error::Error>> {
    let (inventory, root) = memory_inventory(&fixture(FixtureType::Malformed))?;
    let err = inventory.load_document(&root).await.unwrap_err();
    let position = err.position().ok_or("parse errors carry a position")?;
    assert!(position.line >= 4);
    assert!(err.to_string().contains("broken.json"));
    Ok(())
}

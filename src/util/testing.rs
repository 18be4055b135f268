use std::collections::HashMap;
use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};
use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::{fields, BomDocument, DomainResult, FieldValue, NodeId, Payload};
use crate::infrastructure::traits::FileSystem;

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "trace");
        }
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");

    let noisy_modules = ["csv"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::ENTER | FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Payload with just a part number and name.
pub fn payload(number: &str) -> Payload {
    let mut payload = Payload::new();
    payload.insert(fields::PART_NUMBER.into(), FieldValue::from(number));
    payload.insert(fields::PART_NAME.into(), FieldValue::from(format!("{} name", number)));
    payload
}

/// Ids of the nodes in [`sample_document`].
#[derive(Debug, Clone, Copy)]
pub struct SampleIds {
    pub r1: NodeId,
    pub c1: NodeId,
    pub g1: NodeId,
    pub c2: NodeId,
    pub r2: NodeId,
}

/// ```text
/// R1
/// ├── C1
/// │   └── G1
/// └── C2
/// R2
/// ```
/// Everything collapsed, nothing selected.
pub fn sample_document() -> (BomDocument, SampleIds) {
    match build_sample() {
        Ok(sample) => sample,
        Err(e) => panic!("sample document: {}", e),
    }
}

fn build_sample() -> DomainResult<(BomDocument, SampleIds)> {
    let mut doc = BomDocument::new();
    let r1 = doc.add_root(payload("R1"));
    let r2 = doc.add_root(payload("R2"));
    let c1 = doc.add_child(r1, payload("C1"))?;
    let g1 = doc.add_child(c1, payload("G1"))?;
    let c2 = doc.add_child(r1, payload("C2"))?;
    doc.collapse_all();
    Ok((doc, SampleIds { r1, c1, g1, c2, r2 }))
}

/// Part numbers in pre-order.
pub fn labels(doc: &BomDocument) -> Vec<String> {
    doc.tree()
        .iter()
        .map(|n| n.label(fields::PART_NUMBER))
        .collect()
}

/// In-memory [`FileSystem`] for service tests.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<HashMap<PathBuf, String>>,
}

impl MemoryFileSystem {
    pub fn with_file(path: impl Into<PathBuf>, content: &str) -> Self {
        let fs = Self::default();
        fs.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.into(), content.to_string());
        fs
    }

    pub fn content(&self, path: &Path) -> Option<String> {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .cloned()
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.content(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use treetable::application::{TreeConfig, TreeEvent, TreeTable};
use treetable::domain::{ChildRecord, NodeId, NodeKind, SourceError, Target};
use treetable::infrastructure::traits::{
    AutoConfirm, ConfirmPrompt, Confirmation, CrudReply, CrudRequest, RemoteSource, TreeObserver,
};
use treetable::infrastructure::{DataFile, MemorySource, StoredNode};
use treetable::util::testing;

pub fn init() {
    testing::init_test_setup();
}

pub fn stored(id: &str, name: &str, parent: Option<&str>) -> StoredNode {
    StoredNode {
        id: id.into(),
        name: name.to_string(),
        kind: NodeKind::default(),
        parent: parent.map(NodeId::from),
    }
}

pub fn folder(id: &str, name: &str, parent: Option<&str>) -> StoredNode {
    StoredNode {
        kind: NodeKind::folder(),
        ..stored(id, name, parent)
    }
}

/// ```text
/// docs (1)
/// ├── B (2)
/// │   ├── x (4)
/// │   └── y (5)
/// │       └── z (6)
/// └── a (3)
/// src (7)
/// ```
pub fn sample_data() -> DataFile {
    DataFile {
        next_id: 8,
        nodes: vec![
            folder("1", "docs", None),
            folder("2", "B", Some("1")),
            stored("3", "a", Some("1")),
            stored("4", "x", Some("2")),
            folder("5", "y", Some("2")),
            stored("6", "z", Some("5")),
            folder("7", "src", None),
        ],
    }
}

/// Source wrapper that can hold calls at a gate and inject failures.
///
/// Gated calls wait until [`GatedSource::release`] is called once per call.
pub struct GatedSource {
    pub inner: MemorySource,
    gate: Mutex<Option<Arc<Notify>>>,
    failures: Mutex<VecDeque<SourceError>>,
}

impl GatedSource {
    pub fn new(data: DataFile) -> Self {
        Self {
            inner: MemorySource::new(data),
            gate: Mutex::new(None),
            failures: Mutex::new(VecDeque::new()),
        }
    }

    /// Hold every following call until released.
    pub fn close(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Notify::new()));
    }

    pub fn open(&self) {
        if let Some(gate) = self.gate.lock().unwrap().take() {
            gate.notify_waiters();
        }
    }

    /// Let one held call through.
    pub fn release(&self) {
        if let Some(gate) = self.gate.lock().unwrap().as_ref() {
            gate.notify_one();
        }
    }

    /// Fail the next call with `error`.
    pub fn fail_next(&self, error: SourceError) {
        self.failures.lock().unwrap().push_back(error);
    }

    async fn pass(&self) -> Result<(), SourceError> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match self.failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteSource for GatedSource {
    async fn fetch_children(&self, parent: &Target) -> Result<Vec<ChildRecord>, SourceError> {
        self.pass().await?;
        self.inner.fetch_children(parent).await
    }

    async fn execute(&self, request: &CrudRequest) -> Result<CrudReply, SourceError> {
        self.pass().await?;
        self.inner.execute(request).await
    }
}

/// Confirmation surface that records prompts and answers with a fixed value.
pub struct ScriptedConfirm {
    pub answer: bool,
    pub prompts: Mutex<Vec<ConfirmPrompt>>,
}

impl ScriptedConfirm {
    pub fn new(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<ConfirmPrompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Confirmation for ScriptedConfirm {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.answer
    }
}

#[derive(Default)]
pub struct Recorder(Mutex<Vec<TreeEvent>>);

impl Recorder {
    pub fn events(&self) -> Vec<TreeEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().iter().map(TreeEvent::name).collect()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

impl TreeObserver for Recorder {
    fn notify(&self, event: &TreeEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

pub struct Fixture {
    pub source: Arc<GatedSource>,
    pub table: TreeTable,
    pub events: Arc<Recorder>,
}

pub fn fixture_with(data: DataFile, confirmation: Arc<dyn Confirmation>) -> Fixture {
    init();
    let source = Arc::new(GatedSource::new(data));
    let table = TreeTable::new(TreeConfig::new(source.clone()), confirmation);
    let events = Arc::new(Recorder::default());
    table.subscribe(events.clone());
    Fixture {
        source,
        table,
        events,
    }
}

pub fn fixture() -> Fixture {
    fixture_with(sample_data(), Arc::new(AutoConfirm(true)))
}

pub fn names(table: &TreeTable, parent: &Target) -> Vec<String> {
    table.children(parent).into_iter().map(|n| n.name).collect()
}

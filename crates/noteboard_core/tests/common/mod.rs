#![allow(dead_code)]

use noteboard_core::{
    from_raw, EditorSnapshot, HostShell, Note, NoteCollection, NoteId, NoteStore, NoteSummary,
    NoteUpdate, NotesConfig, Notice, OwnerId, ProjectId, SessionContext, SqliteNoteStore,
    StoreError, StoreResult,
};
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;
use uuid::Uuid;

/// One call observed by `RecordingStore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List(ProjectId),
    Get(NoteId),
    Create(ProjectId),
    /// Content update with the saved document's plain text.
    SaveContent(NoteId, String),
    Rename(NoteId, String),
    Delete(NoteId),
}

/// `SqliteNoteStore` wrapper that logs calls and injects failures.
pub struct RecordingStore {
    inner: SqliteNoteStore,
    calls: RefCell<Vec<StoreCall>>,
    failing_updates: Cell<usize>,
    fail_deletes: Cell<bool>,
    fail_creates: Cell<bool>,
    fail_lists: Cell<bool>,
    corrupt: RefCell<BTreeSet<NoteId>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteNoteStore::open_in_memory().unwrap(),
            calls: RefCell::new(Vec::new()),
            failing_updates: Cell::new(0),
            fail_deletes: Cell::new(false),
            fail_creates: Cell::new(false),
            fail_lists: Cell::new(false),
            corrupt: RefCell::new(BTreeSet::new()),
        }
    }

    /// Direct access that bypasses the call log, as another client would.
    pub fn inner(&self) -> &SqliteNoteStore {
        &self.inner
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn saves(&self) -> Vec<StoreCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, StoreCall::SaveContent(..)))
            .collect()
    }

    /// Next `count` update calls fail as unavailable.
    pub fn fail_next_updates(&self, count: usize) {
        self.failing_updates.set(count);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.set(fail);
    }

    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.set(fail);
    }

    pub fn fail_lists(&self, fail: bool) {
        self.fail_lists.set(fail);
    }

    /// Reads of `note_id` report undecodable content.
    pub fn corrupt(&self, note_id: NoteId) {
        self.corrupt.borrow_mut().insert(note_id);
    }

    fn record(&self, call: StoreCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl NoteStore for RecordingStore {
    fn list_notes(&self, project_id: ProjectId) -> StoreResult<Vec<NoteSummary>> {
        self.record(StoreCall::List(project_id));
        if self.fail_lists.get() {
            return Err(StoreError::Unavailable("list refused".to_string()));
        }
        self.inner.list_notes(project_id)
    }

    fn get_note_content(&self, note_id: NoteId) -> StoreResult<Note> {
        self.record(StoreCall::Get(note_id));
        if self.corrupt.borrow().contains(&note_id) {
            return Err(StoreError::InvalidData("content is not a document".to_string()));
        }
        self.inner.get_note_content(note_id)
    }

    fn create_note(&self, owner_id: OwnerId, project_id: ProjectId) -> StoreResult<Note> {
        self.record(StoreCall::Create(project_id));
        if self.fail_creates.get() {
            return Err(StoreError::Unavailable("create refused".to_string()));
        }
        self.inner.create_note(owner_id, project_id)
    }

    fn update_note(&self, note_id: NoteId, update: &NoteUpdate) -> StoreResult<Note> {
        if let Some(content) = &update.content {
            let text = from_raw(content.clone()).unwrap().plain_text();
            self.record(StoreCall::SaveContent(note_id, text));
        }
        if let Some(name) = &update.name {
            self.record(StoreCall::Rename(note_id, name.clone()));
        }
        let failing = self.failing_updates.get();
        if failing > 0 {
            self.failing_updates.set(failing - 1);
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        self.inner.update_note(note_id, update)
    }

    fn delete_note(&self, note_id: NoteId) -> StoreResult<()> {
        self.record(StoreCall::Delete(note_id));
        if self.fail_deletes.get() {
            return Err(StoreError::Unavailable("delete refused".to_string()));
        }
        self.inner.delete_note(note_id)
    }
}

/// Host shell that keeps every notice and counts snapshot updates.
#[derive(Clone, Default)]
pub struct RecordingShell {
    pub notices: Rc<RefCell<Vec<Notice>>>,
    pub snapshots: Rc<Cell<usize>>,
}

impl HostShell for RecordingShell {
    fn snapshot_changed(&mut self, _snapshot: &EditorSnapshot) {
        self.snapshots.set(self.snapshots.get() + 1);
    }

    fn notice(&mut self, notice: &Notice) {
        self.notices.borrow_mut().push(notice.clone());
    }
}

pub struct Fixture {
    pub notes: NoteCollection<RecordingStore>,
    pub shell: RecordingShell,
    pub owner_id: OwnerId,
    pub project_id: ProjectId,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_store(RecordingStore::new(), Uuid::new_v4())
    }

    pub fn with_store(store: RecordingStore, project_id: ProjectId) -> Self {
        let owner_id = Uuid::new_v4();
        let context = SessionContext::new(owner_id, project_id);
        let mut notes = NoteCollection::new(store, NotesConfig::default(), context);
        let shell = RecordingShell::default();
        notes.set_shell(Box::new(shell.clone()));
        Self {
            notes,
            shell,
            owner_id,
            project_id,
        }
    }

    /// Store pre-filled with `count` notes for one project, oldest first.
    pub fn seeded(count: usize) -> (Self, Vec<NoteId>) {
        let store = RecordingStore::new();
        let owner_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        let ids = (0..count)
            .map(|_| store.inner().create_note(owner_id, project_id).unwrap().id)
            .collect();
        (Self::with_store(store, project_id), ids)
    }

    pub fn store(&self) -> &RecordingStore {
        self.notes.store()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.shell.notices.borrow().clone()
    }

    pub fn stored_text(&self, note_id: NoteId) -> String {
        let note = self.store().inner().get_note_content(note_id).unwrap();
        from_raw(note.content).unwrap().plain_text()
    }
}

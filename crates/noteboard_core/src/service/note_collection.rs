//! Note collection manager.
//!
//! # Responsibility
//! - Load a project's notes and pick the note to open.
//! - Switch, create, rename and delete notes without losing edits.
//! - Forward editing input to the `Editor` and feed changes to autosave.
//!
//! # Invariants
//! - At most one note is current; the editor always shows its content, or an
//!   empty document when no note is current.
//! - A note with unsaved changes is flushed before another note is opened.
//! - Save failures never block editing; they surface as `Notice::SaveFailed`.
//! - A debounced save is issued as a `SaveTicket` and completed separately, so
//!   edits keep flowing while the update call is out.
//! - A failed project switch leaves no note of the previous project open.
//! - The first edit that adds text while no note is current creates one.

use crate::codec::{from_raw, to_json, CodecError};
use crate::config::{NotesConfig, SessionContext};
use crate::editor::{CommandOutcome, Editor, EditorSnapshot, FormattingState, KeyEvent};
use crate::model::document::{BlockType, Document, InlineStyle};
use crate::model::note::{Note, NoteId, NoteSummary, OwnerId, ProjectId, SaveState};
use crate::model::selection::Selection;
use crate::store::{NoteStore, NoteUpdate, StoreError, StoreResult};
use crate::sync::{AutosaveScheduler, SaveDecision, SaveOutcome, SaveTicket};
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

/// Manager error for note use-cases.
#[derive(Debug)]
pub enum NotesError {
    /// Note is not in the loaded list or no longer exists in the store.
    NoteNotFound(NoteId),
    /// Rename input is blank or too long.
    InvalidName(String),
    NoCurrentNote,
    Store(StoreError),
}

impl Display for NotesError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::InvalidName(message) => write!(f, "invalid note name: {message}"),
            Self::NoCurrentNote => write!(f, "no note is open"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NotesError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for NotesError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => Self::NoteNotFound(id),
            other => Self::Store(other),
        }
    }
}

/// Result of `load_notes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { count: usize },
    /// The project has no notes; the editor shows an empty document.
    Empty,
}

/// Out-of-band event for the host shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    SaveFailed { note_id: NoteId, message: String },
    /// Creating a note for the first typed text failed; the text is kept.
    CreateFailed { message: String },
    /// The store no longer has this note.
    NoteGone(NoteId),
    /// Stored content was unreadable and was replaced by an empty document.
    DocumentRecovered(NoteId),
}

/// Listener implemented by the host shell. Both hooks default to no-ops.
pub trait HostShell {
    fn snapshot_changed(&mut self, _snapshot: &EditorSnapshot) {}
    fn notice(&mut self, _notice: &Notice) {}
}

/// Read model of the collection for list rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteCollectionState {
    pub notes: Vec<NoteSummary>,
    pub current_note_id: Option<NoteId>,
    /// Only notes that are not clean.
    pub save_states: BTreeMap<NoteId, SaveState>,
}

/// Owner of the note list, the current note and its editor session.
pub struct NoteCollection<S: NoteStore> {
    store: S,
    config: NotesConfig,
    context: SessionContext,
    notes: Vec<NoteSummary>,
    current: Option<NoteId>,
    editor: Editor,
    scheduler: AutosaveScheduler,
    shell: Option<Box<dyn HostShell>>,
}

impl<S: NoteStore> NoteCollection<S> {
    pub fn new(store: S, config: NotesConfig, context: SessionContext) -> Self {
        Self {
            editor: Editor::new(config.editor_options()),
            scheduler: AutosaveScheduler::new(config.debounce()),
            store,
            config,
            context,
            notes: Vec::new(),
            current: None,
            shell: None,
        }
    }

    pub fn set_shell(&mut self, shell: Box<dyn HostShell>) {
        self.shell = Some(shell);
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &NotesConfig {
        &self.config
    }

    pub fn session_context(&self) -> &SessionContext {
        &self.context
    }

    pub fn notes(&self) -> &[NoteSummary] {
        &self.notes
    }

    pub fn current_note_id(&self) -> Option<NoteId> {
        self.current
    }

    pub fn current_note(&self) -> Result<&NoteSummary, NotesError> {
        let note_id = self.current.ok_or(NotesError::NoCurrentNote)?;
        self.position(note_id)
            .map(|index| &self.notes[index])
            .ok_or(NotesError::NoteNotFound(note_id))
    }

    pub fn snapshot(&self) -> &EditorSnapshot {
        self.editor.snapshot()
    }

    pub fn current_formatting_state(&self) -> FormattingState {
        self.editor.snapshot().formatting_state()
    }

    pub fn shows_placeholder(&self) -> bool {
        self.editor.snapshot().shows_placeholder()
    }

    /// Plain-text preview of the open document.
    pub fn preview(&self) -> Option<String> {
        self.editor
            .snapshot()
            .document()
            .preview_text(self.config.preview_chars)
    }

    pub fn save_state(&self, note_id: NoteId) -> SaveState {
        self.scheduler.state(note_id)
    }

    pub fn collection_state(&self) -> NoteCollectionState {
        NoteCollectionState {
            notes: self.notes.clone(),
            current_note_id: self.current,
            save_states: self.scheduler.unsaved_states(),
        }
    }

    /// Loads `project_id`'s notes and opens one of them.
    ///
    /// Opens the session's preferred note when listed, otherwise the most
    /// recently updated one. Reloading the same project keeps the current
    /// note open if it still exists.
    pub fn load_notes(
        &mut self,
        project_id: ProjectId,
        now: Instant,
    ) -> Result<LoadOutcome, NotesError> {
        let switching = self.context.project_id != project_id;
        if switching {
            if let Some(outgoing) = self.current.take() {
                self.flush_note(outgoing, now);
            }
            self.context.project_id = project_id;
            self.context.preferred_note_id = None;
        }

        let notes = match self.store.list_notes(project_id) {
            Ok(notes) => notes,
            Err(err) => {
                error!(
                    "event=notes_load module=service status=error project_id={project_id} error={err}"
                );
                if switching {
                    self.notes.clear();
                    self.show_empty();
                }
                return Err(err.into());
            }
        };
        info!(
            "event=notes_load module=service status=ok project_id={project_id} count={}",
            notes.len()
        );
        self.notes = notes;

        if let Some(current) = self.current {
            if self.position(current).is_some() {
                return Ok(LoadOutcome::Loaded {
                    count: self.notes.len(),
                });
            }
            self.note_gone(current);
        }

        let Some(target) = self.pick_initial_note() else {
            self.show_empty();
            return Ok(LoadOutcome::Empty);
        };
        self.open(target)?;
        Ok(LoadOutcome::Loaded {
            count: self.notes.len(),
        })
    }

    /// Makes `note_id` current, flushing the outgoing note first.
    pub fn select_note(&mut self, note_id: NoteId, now: Instant) -> Result<(), NotesError> {
        if self.current == Some(note_id) {
            return Ok(());
        }
        if self.position(note_id).is_none() {
            return Err(NotesError::NoteNotFound(note_id));
        }
        if let Some(outgoing) = self.current {
            self.flush_note(outgoing, now);
        }
        self.open(note_id)
    }

    /// Creates a note and opens it when it belongs to the loaded project.
    ///
    /// The note goes to the top of the list, matching the store's newest-first
    /// order. Text typed while no note was open becomes its content.
    pub fn create_note(
        &mut self,
        owner_id: OwnerId,
        project_id: ProjectId,
        now: Instant,
    ) -> Result<NoteId, NotesError> {
        let note = match self.store.create_note(owner_id, project_id) {
            Ok(note) => note,
            Err(err) => {
                error!("event=note_create module=service status=error error={err}");
                return Err(err.into());
            }
        };
        info!(
            "event=note_create module=service status=ok note_id={} project_id={project_id}",
            note.id
        );
        if project_id != self.context.project_id {
            return Ok(note.id);
        }

        let note_id = note.id;
        let typed = match self.current {
            Some(outgoing) => {
                self.flush_note(outgoing, now);
                None
            }
            None => Some(self.document_arc()).filter(|document| document.has_text()),
        };
        match typed {
            Some(document) => self.adopt_unsaved(note, document, now),
            None => {
                self.notes.insert(0, note.summary());
                self.install_note(note);
            }
        }
        Ok(note_id)
    }

    /// Renames a note; the list shows the new name until the store refuses it.
    pub fn rename_note(
        &mut self,
        note_id: NoteId,
        new_name: &str,
    ) -> Result<NoteSummary, NotesError> {
        let name = new_name.trim();
        if name.is_empty() {
            return Err(NotesError::InvalidName("name is blank".to_string()));
        }
        let length = name.chars().count();
        if length > self.config.max_name_chars {
            return Err(NotesError::InvalidName(format!(
                "name has {length} characters, at most {} allowed",
                self.config.max_name_chars
            )));
        }
        let index = self
            .position(note_id)
            .ok_or(NotesError::NoteNotFound(note_id))?;

        let previous = std::mem::replace(&mut self.notes[index].name, name.to_string());
        match self.store.update_note(note_id, &NoteUpdate::name(name)) {
            Ok(note) => {
                info!("event=note_rename module=service status=ok note_id={note_id}");
                let summary = note.summary();
                self.notes[index] = summary.clone();
                Ok(summary)
            }
            Err(err) => {
                warn!(
                    "event=note_rename module=service status=rolled_back note_id={note_id} error={err}"
                );
                self.notes[index].name = previous;
                Err(err.into())
            }
        }
    }

    /// Deletes a note. Deleting the current note opens its list neighbour.
    ///
    /// A note the store already lost counts as deleted. Any other store
    /// failure leaves the collection untouched.
    pub fn delete_note(&mut self, note_id: NoteId) -> Result<(), NotesError> {
        let index = self
            .position(note_id)
            .ok_or(NotesError::NoteNotFound(note_id))?;
        match self.store.delete_note(note_id) {
            Ok(()) | Err(StoreError::NotFound(_)) => {}
            Err(err) => {
                error!("event=note_delete module=service status=error note_id={note_id} error={err}");
                return Err(NotesError::Store(err));
            }
        }
        info!("event=note_delete module=service status=ok note_id={note_id}");

        self.scheduler.forget(note_id);
        self.notes.remove(index);
        if self.context.preferred_note_id == Some(note_id) {
            self.context.preferred_note_id = None;
        }
        if self.current != Some(note_id) {
            return Ok(());
        }

        self.current = None;
        let fallback = self
            .notes
            .get(index)
            .or_else(|| self.notes.last())
            .map(|summary| summary.id);
        match fallback {
            Some(next) => {
                if let Err(err) = self.open(next) {
                    warn!(
                        "event=note_delete_fallback module=service status=error note_id={next} error={err}"
                    );
                    if self.current.is_none() {
                        self.show_empty();
                    }
                }
            }
            None => self.show_empty(),
        }
        Ok(())
    }

    /// Runs every save whose debounce window has elapsed and waits for each.
    ///
    /// Returns the number of update calls issued.
    pub fn tick(&mut self, now: Instant) -> usize {
        let tickets = self.issue_due_saves(now);
        for ticket in &tickets {
            let result = self.send_save(ticket);
            self.complete_save(ticket, result, now);
        }
        tickets.len()
    }

    /// Starts every save whose debounce window has elapsed.
    ///
    /// Each returned ticket is in flight until `complete_save` receives its
    /// result; editing may continue meanwhile.
    pub fn issue_due_saves(&mut self, now: Instant) -> Vec<SaveTicket> {
        self.scheduler
            .due(now)
            .into_iter()
            .filter_map(|note_id| match self.scheduler.begin_save(note_id) {
                SaveDecision::Issue(ticket) => Some(ticket),
                SaveDecision::Idle | SaveDecision::InFlight | SaveDecision::Unchanged => None,
            })
            .collect()
    }

    /// Sends `ticket`'s content to the store.
    pub fn send_save(&self, ticket: &SaveTicket) -> StoreResult<Note> {
        self.store
            .update_note(ticket.note_id, &NoteUpdate::content(ticket.content.clone()))
    }

    /// Applies the store's answer to an issued ticket.
    ///
    /// Returns the note's save state, or `None` when the ticket was stale or
    /// the note is gone.
    pub fn complete_save(
        &mut self,
        ticket: &SaveTicket,
        result: StoreResult<Note>,
        now: Instant,
    ) -> Option<SaveState> {
        let note_id = ticket.note_id;
        match result {
            Ok(note) => {
                let state = self
                    .scheduler
                    .finish_save(ticket, SaveOutcome::Persisted, now);
                info!(
                    "event=note_save module=service status=ok note_id={note_id} bytes={}",
                    ticket.json.len()
                );
                self.refresh_summary(note.summary());
                state
            }
            Err(StoreError::NotFound(_)) => {
                self.scheduler
                    .finish_save(ticket, SaveOutcome::NoteGone, now);
                warn!("event=note_save module=service status=gone note_id={note_id}");
                if self.position(note_id).is_some() || self.current == Some(note_id) {
                    self.note_gone(note_id);
                }
                None
            }
            Err(err) => {
                let state = self.scheduler.finish_save(ticket, SaveOutcome::Failed, now);
                error!("event=note_save module=service status=error note_id={note_id} error={err}");
                if state.is_some() {
                    self.emit_notice(Notice::SaveFailed {
                        note_id,
                        message: err.to_string(),
                    });
                }
                state
            }
        }
    }

    /// Earliest instant at which `tick` has work.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Saves the current note immediately instead of waiting for its timer.
    pub fn save_now(&mut self, now: Instant) -> Result<SaveState, NotesError> {
        let note_id = self.current.ok_or(NotesError::NoCurrentNote)?;
        self.flush_note(note_id, now);
        Ok(self.scheduler.state(note_id))
    }

    /// Retries every note whose last save failed.
    pub fn retry_failed(&mut self, now: Instant) -> usize {
        let mut issued = 0;
        for note_id in self.scheduler.failed() {
            if self.scheduler.flush(note_id, now) && self.run_save(note_id, now) {
                issued += 1;
            }
        }
        issued
    }

    /// Drops every pending autosave timer.
    pub fn unmount(&mut self) {
        self.scheduler.cancel_all();
        info!("event=notes_unmount module=service status=ok");
    }

    pub fn set_selection(&mut self, selection: Selection) -> bool {
        let changed = self.editor.set_selection(selection);
        if changed {
            self.emit_snapshot();
        }
        changed
    }

    pub fn apply_text_edit(&mut self, selection: &Selection, new_text: &str, now: Instant) -> bool {
        let before = self.document_arc();
        let changed = self.editor.apply_text_edit(selection, new_text);
        self.after_edit(changed, &before, now)
    }

    pub fn insert_text(&mut self, text: &str, now: Instant) -> bool {
        let before = self.document_arc();
        let changed = self.editor.insert_text(text);
        self.after_edit(changed, &before, now)
    }

    pub fn toggle_inline_style(&mut self, style: InlineStyle, now: Instant) -> bool {
        let before = self.document_arc();
        let changed = self.editor.toggle_inline_style(style);
        self.after_edit(changed, &before, now)
    }

    pub fn toggle_block_type(&mut self, block_type: BlockType, now: Instant) -> bool {
        let before = self.document_arc();
        let changed = self.editor.toggle_block_type(block_type);
        self.after_edit(changed, &before, now)
    }

    /// Dispatches a command symbol such as `bold` or `split-block`.
    pub fn dispatch_command(&mut self, symbol: &str, now: Instant) -> CommandOutcome {
        let before = self.document_arc();
        let outcome = self.editor.dispatch_symbol(symbol);
        self.after_edit(outcome.changed, &before, now);
        outcome
    }

    pub fn dispatch_key_event(&mut self, event: &KeyEvent, now: Instant) -> CommandOutcome {
        let before = self.document_arc();
        let outcome = self.editor.dispatch_key_event(event);
        self.after_edit(outcome.changed, &before, now);
        outcome
    }

    fn document_arc(&self) -> Arc<Document> {
        Arc::clone(self.editor.snapshot().document_arc())
    }

    fn after_edit(&mut self, changed: bool, before: &Arc<Document>, now: Instant) -> bool {
        if !changed {
            return false;
        }
        self.emit_snapshot();
        let document = self.document_arc();
        if Arc::ptr_eq(before, &document) {
            return true;
        }
        let current = self.current;
        match current {
            Some(note_id) => self.scheduler.record_edit(note_id, document, now),
            None if document.has_text() => self.create_for_first_edit(document, now),
            None => {}
        }
        true
    }

    fn create_for_first_edit(&mut self, document: Arc<Document>, now: Instant) {
        let note = match self
            .store
            .create_note(self.context.owner_id, self.context.project_id)
        {
            Ok(note) => note,
            Err(err) => {
                error!("event=note_create module=service status=error trigger=first_edit error={err}");
                self.emit_notice(Notice::CreateFailed {
                    message: err.to_string(),
                });
                return;
            }
        };
        info!(
            "event=note_create module=service status=ok trigger=first_edit note_id={}",
            note.id
        );
        self.adopt_unsaved(note, document, now);
    }

    /// Makes a freshly created note current with the editor's unsaved document.
    fn adopt_unsaved(&mut self, note: Note, document: Arc<Document>, now: Instant) {
        let persisted = from_raw(note.content.clone())
            .and_then(|stored| to_json(&stored))
            .ok();
        self.notes.insert(0, note.summary());
        self.current = Some(note.id);
        self.context.preferred_note_id = Some(note.id);
        self.scheduler.track(note.id, persisted);
        self.scheduler.record_edit(note.id, document, now);
    }

    /// Flushes `note_id` when it has anything unsaved and saves it now.
    fn flush_note(&mut self, note_id: NoteId, now: Instant) {
        if self.scheduler.flush(note_id, now) {
            self.run_save(note_id, now);
        }
    }

    /// Issues one update call if the scheduler asks for it and applies the
    /// result.
    fn run_save(&mut self, note_id: NoteId, now: Instant) -> bool {
        let ticket = match self.scheduler.begin_save(note_id) {
            SaveDecision::Issue(ticket) => ticket,
            SaveDecision::Idle | SaveDecision::InFlight | SaveDecision::Unchanged => return false,
        };
        let result = self.send_save(&ticket);
        self.complete_save(&ticket, result, now);
        true
    }

    /// Opens a listed note, preferring unsaved local content over the store.
    fn open(&mut self, note_id: NoteId) -> Result<(), NotesError> {
        if let Some(unsaved) = self.scheduler.unsaved_document(note_id) {
            self.show_note(note_id, (*unsaved).clone());
            return Ok(());
        }

        match self.store.get_note_content(note_id) {
            Ok(note) => {
                self.refresh_summary(note.summary());
                self.install_note(note);
                Ok(())
            }
            Err(StoreError::InvalidData(message)) => {
                error!(
                    "event=note_open module=service status=recovered note_id={note_id} error={message}"
                );
                self.scheduler.track(note_id, None);
                self.show_note(note_id, Document::empty());
                self.emit_notice(Notice::DocumentRecovered(note_id));
                Ok(())
            }
            Err(StoreError::NotFound(_)) => {
                self.note_gone(note_id);
                Err(NotesError::NoteNotFound(note_id))
            }
            Err(err) => {
                error!("event=note_open module=service status=error note_id={note_id} error={err}");
                Err(NotesError::Store(err))
            }
        }
    }

    fn install_note(&mut self, note: Note) {
        let note_id = note.id;
        match decode_content(note) {
            Ok((document, persisted)) => {
                self.scheduler.track(note_id, Some(persisted));
                self.show_note(note_id, document);
            }
            Err(err) => {
                error!(
                    "event=note_open module=service status=recovered note_id={note_id} error={err}"
                );
                self.scheduler.track(note_id, None);
                self.show_note(note_id, Document::empty());
                self.emit_notice(Notice::DocumentRecovered(note_id));
            }
        }
    }

    fn show_note(&mut self, note_id: NoteId, document: Document) {
        self.editor.reset(document);
        self.current = Some(note_id);
        self.context.preferred_note_id = Some(note_id);
        self.emit_snapshot();
    }

    fn show_empty(&mut self) {
        self.current = None;
        self.editor.reset(Document::empty());
        self.emit_snapshot();
    }

    /// Drops a note the store no longer has.
    fn note_gone(&mut self, note_id: NoteId) {
        self.scheduler.forget(note_id);
        if let Some(index) = self.position(note_id) {
            self.notes.remove(index);
        }
        if self.context.preferred_note_id == Some(note_id) {
            self.context.preferred_note_id = None;
        }
        self.emit_notice(Notice::NoteGone(note_id));
        if self.current == Some(note_id) {
            self.show_empty();
        }
    }

    fn pick_initial_note(&self) -> Option<NoteId> {
        if let Some(preferred) = self.context.preferred_note_id {
            if self.position(preferred).is_some() {
                return Some(preferred);
            }
        }
        self.notes
            .iter()
            .fold(None::<&NoteSummary>, |best, note| match best {
                Some(best) if best.updated_at >= note.updated_at => Some(best),
                _ => Some(note),
            })
            .map(|note| note.id)
    }

    fn refresh_summary(&mut self, summary: NoteSummary) {
        if let Some(index) = self.position(summary.id) {
            self.notes[index] = summary;
        }
    }

    fn position(&self, note_id: NoteId) -> Option<usize> {
        self.notes.iter().position(|note| note.id == note_id)
    }

    fn emit_snapshot(&mut self) {
        if let Some(shell) = self.shell.as_mut() {
            shell.snapshot_changed(self.editor.snapshot());
        }
    }

    fn emit_notice(&mut self, notice: Notice) {
        if let Some(shell) = self.shell.as_mut() {
            shell.notice(&notice);
        }
    }
}

/// Decodes stored content and its canonical serialization.
fn decode_content(note: Note) -> Result<(Document, String), CodecError> {
    let document = from_raw(note.content)?;
    let persisted = to_json(&document)?;
    Ok((document, persisted))
}

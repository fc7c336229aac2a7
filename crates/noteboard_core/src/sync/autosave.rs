//! Debounced autosave state machine.
//!
//! Each tracked note owns one slot: its `SaveState`, at most one pending
//! deadline, the newest unsaved document and the serialization the store is
//! known to hold. Issuing an update (`begin_save`) and completing it
//! (`finish_save`) are separate steps so a host may keep editing while a call
//! is out.

use crate::codec::{to_raw, RawDocument};
use crate::model::document::Document;
use crate::model::note::{NoteId, SaveState};
use log::{debug, error};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_DEBOUNCE_MS: u64 = 750;

/// One issued update call.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveTicket {
    pub note_id: NoteId,
    seq: u64,
    /// Content to send to the store.
    pub content: RawDocument,
    /// Canonical JSON of `content`; becomes the persisted baseline on success.
    pub json: String,
}

/// What `begin_save` decided for a note.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveDecision {
    /// Nothing unsaved.
    Idle,
    /// A call for this note is already out; retry after it completes.
    InFlight,
    /// Content matches the persisted serialization; marked clean, no call.
    Unchanged,
    Issue(SaveTicket),
}

/// Completion report for an issued ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Persisted,
    /// The store no longer knows the note.
    NoteGone,
    Failed,
}

#[derive(Debug, Clone, Default)]
struct SaveSlot {
    state: SaveState,
    deadline: Option<Instant>,
    latest: Option<Arc<Document>>,
    persisted_json: Option<String>,
    in_flight: Option<u64>,
    edited_in_flight: bool,
}

impl SaveSlot {
    fn is_pending(&self) -> bool {
        self.latest.is_some() && matches!(self.state, SaveState::Dirty | SaveState::SaveFailed)
    }
}

/// Per-note debounce timers and save states.
#[derive(Debug, Clone)]
pub struct AutosaveScheduler {
    debounce: Duration,
    slots: BTreeMap<NoteId, SaveSlot>,
    next_seq: u64,
}

impl Default for AutosaveScheduler {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_DEBOUNCE_MS))
    }
}

impl AutosaveScheduler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            slots: BTreeMap::new(),
            next_seq: 1,
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Registers a freshly hydrated note as clean.
    ///
    /// `persisted_json` is the canonical serialization the store holds, or
    /// `None` when it is unknown (the first save then always issues a call).
    /// A slot that still holds unsaved content keeps it.
    pub fn track(&mut self, note_id: NoteId, persisted_json: Option<String>) {
        let slot = self.slots.entry(note_id).or_default();
        if slot.is_pending() || slot.in_flight.is_some() {
            return;
        }
        *slot = SaveSlot {
            persisted_json,
            ..SaveSlot::default()
        };
    }

    /// Records new content and restarts the note's debounce window.
    pub fn record_edit(&mut self, note_id: NoteId, document: Arc<Document>, now: Instant) {
        let slot = self.slots.entry(note_id).or_default();
        slot.latest = Some(document);
        slot.deadline = Some(now + self.debounce);
        if slot.in_flight.is_some() {
            slot.edited_in_flight = true;
        } else {
            slot.state = SaveState::Dirty;
        }
    }

    /// Notes whose deadline has elapsed and that have no call in flight,
    /// earliest deadline first.
    pub fn due(&self, now: Instant) -> Vec<NoteId> {
        let mut due: Vec<(Instant, NoteId)> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.in_flight.is_none())
            .filter_map(|(id, slot)| slot.deadline.map(|deadline| (deadline, *id)))
            .filter(|(deadline, _)| *deadline <= now)
            .collect();
        due.sort();
        due.into_iter().map(|(_, id)| id).collect()
    }

    /// Decides whether an update call is needed and marks it in flight.
    pub fn begin_save(&mut self, note_id: NoteId) -> SaveDecision {
        let Some(slot) = self.slots.get_mut(&note_id) else {
            return SaveDecision::Idle;
        };
        if slot.in_flight.is_some() {
            return SaveDecision::InFlight;
        }
        slot.deadline = None;
        if !slot.is_pending() {
            return SaveDecision::Idle;
        }
        let Some(document) = slot.latest.clone() else {
            return SaveDecision::Idle;
        };

        let content = to_raw(&document);
        let json = match serde_json::to_string(&content) {
            Ok(json) => json,
            Err(err) => {
                error!("event=autosave_encode module=sync status=error note_id={note_id} error={err}");
                slot.state = SaveState::SaveFailed;
                return SaveDecision::Idle;
            }
        };

        if slot.persisted_json.as_deref() == Some(json.as_str()) {
            slot.state = SaveState::Clean;
            slot.latest = None;
            return SaveDecision::Unchanged;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        slot.in_flight = Some(seq);
        slot.edited_in_flight = false;
        slot.state = SaveState::Saving;
        SaveDecision::Issue(SaveTicket {
            note_id,
            seq,
            content,
            json,
        })
    }

    /// Applies the completion of `ticket`.
    ///
    /// Returns the note's new state, or `None` when the ticket is stale or
    /// the note was forgotten.
    pub fn finish_save(
        &mut self,
        ticket: &SaveTicket,
        outcome: SaveOutcome,
        now: Instant,
    ) -> Option<SaveState> {
        let slot = self.slots.get_mut(&ticket.note_id)?;
        if slot.in_flight != Some(ticket.seq) {
            debug!(
                "event=autosave_finish module=sync status=stale note_id={} seq={}",
                ticket.note_id, ticket.seq
            );
            return None;
        }
        slot.in_flight = None;
        let edited = std::mem::take(&mut slot.edited_in_flight);

        match outcome {
            SaveOutcome::Persisted => {
                slot.persisted_json = Some(ticket.json.clone());
                if edited {
                    slot.state = SaveState::Dirty;
                    slot.deadline.get_or_insert(now + self.debounce);
                } else {
                    slot.state = SaveState::Clean;
                    slot.latest = None;
                    slot.deadline = None;
                }
            }
            SaveOutcome::NoteGone => {
                self.slots.remove(&ticket.note_id);
                return None;
            }
            SaveOutcome::Failed => {
                if edited {
                    slot.state = SaveState::Dirty;
                    slot.deadline.get_or_insert(now + self.debounce);
                } else {
                    slot.state = SaveState::SaveFailed;
                    slot.deadline = None;
                }
            }
        }
        Some(slot.state)
    }

    /// Moves the note's deadline to `now` if it has unsaved content.
    ///
    /// Returns true when a save is now due or already in flight.
    pub fn flush(&mut self, note_id: NoteId, now: Instant) -> bool {
        let Some(slot) = self.slots.get_mut(&note_id) else {
            return false;
        };
        if slot.in_flight.is_some() {
            if slot.edited_in_flight {
                slot.deadline = Some(now);
            }
            return true;
        }
        if slot.is_pending() {
            slot.deadline = Some(now);
            return true;
        }
        false
    }

    /// Drops the pending deadline; unsaved content and state are kept.
    pub fn cancel(&mut self, note_id: NoteId) {
        if let Some(slot) = self.slots.get_mut(&note_id) {
            slot.deadline = None;
        }
    }

    /// Forgets the note entirely; a later completion for it is ignored.
    pub fn forget(&mut self, note_id: NoteId) {
        self.slots.remove(&note_id);
    }

    pub fn cancel_all(&mut self) {
        for slot in self.slots.values_mut() {
            slot.deadline = None;
        }
    }

    /// Untracked notes report `Clean`.
    pub fn state(&self, note_id: NoteId) -> SaveState {
        self.slots
            .get(&note_id)
            .map_or(SaveState::Clean, |slot| slot.state)
    }

    /// Every tracked note that is not clean.
    pub fn unsaved_states(&self) -> BTreeMap<NoteId, SaveState> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.state.has_unsaved_changes())
            .map(|(id, slot)| (*id, slot.state))
            .collect()
    }

    /// Notes whose last save failed.
    pub fn failed(&self) -> Vec<NoteId> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.state == SaveState::SaveFailed)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn pending_deadline(&self, note_id: NoteId) -> Option<Instant> {
        self.slots.get(&note_id).and_then(|slot| slot.deadline)
    }

    /// Earliest deadline that `due` could return.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots
            .values()
            .filter(|slot| slot.in_flight.is_none())
            .filter_map(|slot| slot.deadline)
            .min()
    }

    /// Newest content the store has not acknowledged yet.
    pub fn unsaved_document(&self, note_id: NoteId) -> Option<Arc<Document>> {
        self.slots
            .get(&note_id)
            .filter(|slot| slot.state.has_unsaved_changes())
            .and_then(|slot| slot.latest.clone())
    }
}

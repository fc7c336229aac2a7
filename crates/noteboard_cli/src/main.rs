//! CLI smoke entry point.
//!
//! # Responsibility
//! - Drive one scripted editing session against a SQLite note store.
//! - Keep output deterministic apart from generated ids.
//!
//! Usage: `noteboard_cli [DB_PATH] [CONFIG_JSON_PATH]`; without `DB_PATH` the
//! session runs against an in-memory database.

use log::info;
use noteboard_core::{
    core_version, init_logging, BlockType, HostShell, InlineStyle, Key, KeyEvent, LoadOutcome,
    NoteCollection, NotesConfig, Notice, SessionContext, SqliteNoteStore,
};
use std::error::Error;
use std::process::ExitCode;
use std::time::Instant;
use uuid::Uuid;

struct StdoutShell;

impl HostShell for StdoutShell {
    fn notice(&mut self, notice: &Notice) {
        println!("notice={notice:?}");
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("noteboard_cli error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let db_path = args.next();
    let config = match args.next() {
        Some(path) => NotesConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => NotesConfig::default(),
    };
    init_logging(&config.logging)?;

    let store = match db_path.as_deref() {
        Some(path) => SqliteNoteStore::open(path)?,
        None => SqliteNoteStore::open_in_memory()?,
    };
    println!("noteboard_core version={}", core_version());

    let context = SessionContext::new(Uuid::new_v4(), Uuid::new_v4());
    let project_id = context.project_id;
    let mut notes = NoteCollection::new(store, config, context);
    notes.set_shell(Box::new(StdoutShell));

    let now = Instant::now();
    match notes.load_notes(project_id, now)? {
        LoadOutcome::Loaded { count } => println!("loaded notes={count}"),
        LoadOutcome::Empty => println!("loaded notes=0 placeholder={}", notes.shows_placeholder()),
    }

    notes.insert_text("Shopping", now);
    notes.dispatch_key_event(&KeyEvent::plain(Key::Enter), now);
    notes.toggle_block_type(BlockType::UnorderedListItem, now);
    notes.toggle_inline_style(InlineStyle::Bold, now);
    notes.insert_text("milk", now);

    let formatting = notes.current_formatting_state();
    println!(
        "formatting block_type={} bold={}",
        formatting.block_type.as_str(),
        formatting.inline_styles.contains(&InlineStyle::Bold)
    );

    let state = notes.save_now(now)?;
    let current = notes.current_note()?;
    println!("saved note={} state={state:?}", current.name);
    if let Some(preview) = notes.preview() {
        println!("preview={preview}");
    }

    notes.unmount();
    info!(
        "event=cli_session module=cli status=ok notes={}",
        notes.notes().len()
    );
    Ok(())
}

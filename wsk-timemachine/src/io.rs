//! Reading and writing `state.json` and `entries/<id>.json` through the
//! workspace directly (the only component permitted to touch `/.time`).

use chrono::Utc;
use wsk_vfs::Workspace;

use crate::entry::{entry_path, Entry};
use crate::error::TmError;
use crate::state::{TmState, STATE_PATH};

pub fn ensure_namespace(ws: &mut Workspace) -> Result<(), TmError> {
    ws.mkdir("/.time", true)?;
    ws.mkdir(crate::state::ENTRIES_DIR, true)?;
    ws.mkdir(crate::state::BLOBS_DIR, true)?;
    Ok(())
}

pub fn load_state(ws: &Workspace) -> Result<TmState, TmError> {
    match ws.read_file(STATE_PATH) {
        Ok(bytes) => Ok(serde_json::from_slice(bytes)?),
        Err(_) => Ok(TmState::new(Utc::now())),
    }
}

pub fn save_state(ws: &mut Workspace, state: &TmState) -> Result<(), TmError> {
    let bytes = serde_json::to_vec_pretty(state)?;
    ws.write_file(STATE_PATH, &bytes, true)?;
    Ok(())
}

pub fn load_entry(ws: &Workspace, id: &str) -> Result<Entry, TmError> {
    let bytes = ws
        .read_file(&entry_path(id))
        .map_err(|_| TmError::UnknownEntry(id.to_string()))?;
    Ok(serde_json::from_slice(bytes)?)
}

pub fn save_entry(ws: &mut Workspace, entry: &Entry) -> Result<(), TmError> {
    let bytes = serde_json::to_vec_pretty(entry)?;
    ws.write_file(&entry_path(&entry.id), &bytes, true)?;
    Ok(())
}

pub fn delete_entry(ws: &mut Workspace, id: &str) {
    let _ = ws.delete(&entry_path(id));
}

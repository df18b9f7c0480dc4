//! Blob storage: raw byte copies of file contents at a before/after side of
//! an entry, under `/.time/blobs/<id>/{before|after}/<relative-path>`.

use wsk_commons::normalize;
use wsk_vfs::Workspace;

use crate::error::TmError;
use crate::state::BLOBS_DIR;

pub fn blob_path(id: &str, side: &str, path: &str) -> String {
    let relative = path.trim_start_matches('/');
    format!("{BLOBS_DIR}/{id}/{side}/{relative}")
}

pub fn write_blob(ws: &mut Workspace, id: &str, side: &str, path: &str, data: &[u8]) -> Result<(), TmError> {
    let target = normalize(&blob_path(id, side, path));
    ws.write_file(&target, data, true)?;
    Ok(())
}

pub fn read_blob(ws: &Workspace, blob_path: &str) -> Result<Vec<u8>, TmError> {
    Ok(ws.read_file(&normalize(blob_path))?.to_vec())
}

/// Delete the entire `/.time/blobs/<id>` subtree, best-effort (entries with
/// no blobs at all have nothing to remove).
pub fn delete_blob_subtree(ws: &mut Workspace, id: &str) {
    let root = format!("{BLOBS_DIR}/{id}");
    for side in ["before", "after"] {
        let side_dir = format!("{root}/{side}");
        delete_recursive(ws, &side_dir);
    }
    let _ = ws.delete(&root);
}

fn delete_recursive(ws: &mut Workspace, dir: &str) {
    let Ok(children) = ws.list(dir) else {
        return;
    };
    for name in children {
        let child = format!("{dir}/{name}");
        if ws.stat(&child).map(|s| s.kind) == Some(wsk_vfs::EntryKind::Dir) {
            delete_recursive(ws, &child);
        } else {
            let _ = ws.delete(&child);
        }
    }
    let _ = ws.delete(dir);
}

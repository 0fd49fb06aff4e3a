use bitflags::bitflags;
use notify_debouncer_full::notify::event::{EventKind, ModifyKind, RenameMode};
use notify_debouncer_full::notify::Event;
use std::path::PathBuf;

bitflags! {
    /// Operations carried by a file-system event. One event may carry several.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChangeOp: u8 {
        const CREATE = 0b0000_0001;
        const WRITE = 0b0000_0010;
        const REMOVE = 0b0000_0100;
        const RENAME = 0b0000_1000;
        const CHMOD = 0b0001_0000;
    }
}

/// One path touched by a raw event, with the operations that applied to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub path: PathBuf,
    pub op: ChangeOp,
}

impl Change {
    pub fn new(path: impl Into<PathBuf>, op: ChangeOp) -> Self {
        Self {
            path: path.into(),
            op,
        }
    }
}

/// Split a raw `notify` event into per-path changes.
///
/// Renames are treated the way editors use them for atomic saves: the old
/// name is removed, the new name is created and written.
pub fn changes_from_event(event: &Event) -> Vec<Change> {
    let renamed_away = ChangeOp::RENAME | ChangeOp::REMOVE;
    let renamed_here = ChangeOp::RENAME | ChangeOp::CREATE | ChangeOp::WRITE;

    let per_path = |op: ChangeOp| -> Vec<Change> {
        event
            .paths
            .iter()
            .map(|p| Change::new(p.clone(), op))
            .collect()
    };

    match event.kind {
        EventKind::Create(_) => per_path(ChangeOp::CREATE),
        EventKind::Remove(_) => per_path(ChangeOp::REMOVE),
        EventKind::Modify(ModifyKind::Metadata(_)) => per_path(ChangeOp::CHMOD),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => per_path(renamed_away),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => per_path(renamed_here),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut changes = Vec::with_capacity(event.paths.len());
            if let Some(from) = event.paths.first() {
                changes.push(Change::new(from.clone(), renamed_away));
            }
            if let Some(to) = event.paths.get(1) {
                changes.push(Change::new(to.clone(), renamed_here));
            }
            changes
        }
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| {
                let op = if p.exists() { renamed_here } else { renamed_away };
                Change::new(p.clone(), op)
            })
            .collect(),
        EventKind::Modify(_) => per_path(ChangeOp::WRITE),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

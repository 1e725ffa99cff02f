use crate::types::{FileDescriptor, ImportBatch, ScopeId};

pub const DEFAULT_MAX_FILES: usize = 100;
pub const DEFAULT_MAX_BYTES: u64 = 80 * 1024 * 1024;

/// Ceilings for a single ingestion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_count: usize,
    pub max_bytes: u64,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_count: DEFAULT_MAX_FILES,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// Splits files sharing one grant into bounded batches.
///
/// Ceilings are checked before a file is added: the current batch is
/// flushed once it holds `max_count` files or once adding the next file
/// would bring it to `max_bytes` or beyond. A file larger than the byte
/// ceiling still gets a batch of its own. Order is preserved within and
/// across batches, and no batch is empty.
pub fn make_batches(
    scope_ids: &[ScopeId],
    files: Vec<FileDescriptor>,
    limits: BatchLimits,
) -> Vec<ImportBatch> {
    let max_count = limits.max_count.max(1);
    let mut batches = Vec::new();
    let mut current: Vec<FileDescriptor> = Vec::new();
    let mut bytes: u64 = 0;

    for file in files {
        let full = current.len() >= max_count
            || bytes.saturating_add(file.size_bytes) >= limits.max_bytes;
        if full && !current.is_empty() {
            batches.push(ImportBatch {
                scope_ids: scope_ids.to_vec(),
                files: std::mem::take(&mut current),
            });
            bytes = 0;
        }

        bytes = bytes.saturating_add(file.size_bytes);
        current.push(file);
    }

    if !current.is_empty() {
        batches.push(ImportBatch {
            scope_ids: scope_ids.to_vec(),
            files: current,
        });
    }

    batches
}

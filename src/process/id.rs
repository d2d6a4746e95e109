//! Process-wide identity allocator.

use std::sync::atomic::{AtomicI64, Ordering};

/// Global id counter shared by every tree in the process.
static NEXT_ID: AtomicI64 = AtomicI64::new(1);

/// Returns the next process id.
///
/// Ids start at 1, increase monotonically and are never reused.
#[inline]
pub(crate) fn next_id() -> i64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

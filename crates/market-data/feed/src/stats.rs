//! Quality-stats snapshot exposed on the observability surface (§6.6).

/// Monotonic counters for one feed handler instance. Cheap to copy for a
/// point-in-time snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub total_processed: u64,
    pub invalid_messages: u64,
    pub duplicate_messages: u64,
    pub sequence_gaps: u64,
}

//! Seek position construction for topic searches.
//!
//! A search must tell the broker where to start reading: one of the fixed
//! sentinels (latest, beginning, offset) or a per-partition timestamp list.
//! Timestamp seeks are wall-clock dependent and are rebuilt for every search
//! call; the partition list is produced by
//! [`TopicSearchClient::seek_for_timestamp`](crate::search::TopicSearchClient::seek_for_timestamp).

use serde::{Deserialize, Serialize};

/// Direction the broker walks the log in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SeekDirection {
    /// From the seek position towards newer records (`FORWARD`).
    Oldest,
    /// From the seek position towards older records (`BACKWARD`).
    #[default]
    Newest,
}

impl SeekDirection {
    /// Wire value for the `seekDirection` query parameter.
    pub fn wire(&self) -> &'static str {
        match self {
            SeekDirection::Oldest => "FORWARD",
            SeekDirection::Newest => "BACKWARD",
        }
    }
}

/// Seek position mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SeekMode {
    /// Newest records (`LATEST`).
    #[default]
    Latest,
    /// Oldest records (`BEGINNING`).
    Earliest,
    /// Per-partition wall-clock positions (`TIMESTAMP`).
    Timestamp,
    /// Explicit per-partition offsets (`OFFSET`).
    Offset,
}

impl SeekMode {
    /// Wire value for the `seekType` query parameter.
    pub fn wire(&self) -> &'static str {
        match self {
            SeekMode::Latest => "LATEST",
            SeekMode::Earliest => "BEGINNING",
            SeekMode::Timestamp => "TIMESTAMP",
            SeekMode::Offset => "OFFSET",
        }
    }
}

/// A fully built seek position for one search call.
///
/// Immutable once constructed. For `Timestamp` and `Offset` modes the
/// position list carries one `(partition, position)` pair per partition, in
/// ascending partition order; the sentinel modes carry none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeekSpec {
    pub direction: SeekDirection,
    pub mode: SeekMode,
    positions: Vec<(u32, i64)>,
}

impl SeekSpec {
    /// Seek to the newest records.
    pub fn latest(direction: SeekDirection) -> Self {
        Self {
            direction,
            mode: SeekMode::Latest,
            positions: Vec::new(),
        }
    }

    /// Seek to the beginning of the log.
    pub fn earliest(direction: SeekDirection) -> Self {
        Self {
            direction,
            mode: SeekMode::Earliest,
            positions: Vec::new(),
        }
    }

    /// Seek to explicit per-partition offsets.
    pub fn offsets(direction: SeekDirection, mut positions: Vec<(u32, i64)>) -> Self {
        positions.sort_by_key(|(partition, _)| *partition);
        Self {
            direction,
            mode: SeekMode::Offset,
            positions,
        }
    }

    /// Seek to a timestamp on every partition.
    ///
    /// `partitions` must equal the topic's partition count; the search client
    /// performs that lookup.
    pub fn timestamp(direction: SeekDirection, partitions: u32, at_millis: i64) -> Self {
        let positions = (0..partitions).map(|p| (p, at_millis)).collect();
        Self {
            direction,
            mode: SeekMode::Timestamp,
            positions,
        }
    }

    /// Per-partition positions, ascending by partition.
    pub fn positions(&self) -> &[(u32, i64)] {
        &self.positions
    }

    /// The `seekTo` query parameter: comma-joined `partition::position`
    /// pairs, or `None` for sentinel modes.
    pub fn seek_to(&self) -> Option<String> {
        if self.positions.is_empty() {
            return None;
        }
        let joined = self
            .positions
            .iter()
            .map(|(partition, position)| format!("{}::{}", partition, position))
            .collect::<Vec<_>>()
            .join(",");
        Some(joined)
    }
}

impl Default for SeekSpec {
    /// Newest-first latest seek, the default for string searches.
    fn default() -> Self {
        Self::latest(SeekDirection::Newest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values() {
        assert_eq!(SeekDirection::Oldest.wire(), "FORWARD");
        assert_eq!(SeekDirection::Newest.wire(), "BACKWARD");
        assert_eq!(SeekMode::Latest.wire(), "LATEST");
        assert_eq!(SeekMode::Earliest.wire(), "BEGINNING");
        assert_eq!(SeekMode::Timestamp.wire(), "TIMESTAMP");
        assert_eq!(SeekMode::Offset.wire(), "OFFSET");
    }

    #[test]
    fn test_sentinel_seeks_have_no_positions() {
        assert_eq!(SeekSpec::latest(SeekDirection::Newest).seek_to(), None);
        assert_eq!(SeekSpec::earliest(SeekDirection::Oldest).seek_to(), None);
    }

    #[test]
    fn test_timestamp_covers_all_partitions_in_order() {
        let seek = SeekSpec::timestamp(SeekDirection::Newest, 4, 1700000000000);
        assert_eq!(seek.positions().len(), 4);
        assert_eq!(
            seek.positions()
                .iter()
                .map(|(p, _)| *p)
                .collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
        assert_eq!(
            seek.seek_to().unwrap(),
            "0::1700000000000,1::1700000000000,2::1700000000000,3::1700000000000"
        );
    }

    #[test]
    fn test_single_partition_has_no_trailing_comma() {
        let seek = SeekSpec::timestamp(SeekDirection::Newest, 1, 42);
        assert_eq!(seek.seek_to().unwrap(), "0::42");
    }

    #[test]
    fn test_offsets_sorted_by_partition() {
        let seek = SeekSpec::offsets(SeekDirection::Oldest, vec![(2, 30), (0, 10), (1, 20)]);
        assert_eq!(seek.seek_to().unwrap(), "0::10,1::20,2::30");
    }

    #[test]
    fn test_default_is_newest_latest() {
        let seek = SeekSpec::default();
        assert_eq!(seek.direction, SeekDirection::Newest);
        assert_eq!(seek.mode, SeekMode::Latest);
    }
}

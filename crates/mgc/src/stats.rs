//! Heap Statistics - Collection and Allocation Metrics

/// Aggregate statistics for the heap, accumulated across its lifetime
#[derive(Debug, Default, Clone)]
pub struct HeapStats {
    /// Collections performed (scavenges plus tenures)
    pub collections: u64,
    /// Scavenges between the semi-spaces
    pub scavenges: u64,
    /// Tenure evacuations into an older generation
    pub tenures: u64,
    /// Objects copied by evacuation
    pub objects_evacuated: u64,
    /// Byte arrays copied by evacuation
    pub byte_arrays_evacuated: u64,
    /// Total bytes copied by evacuation
    pub bytes_evacuated: u64,
    /// Finalizers run (during collections and at teardown)
    pub finalizers_run: u64,
}

impl HeapStats {
    /// Total evacuation operations (objects plus byte arrays)
    pub fn total_evacuated(&self) -> u64 {
        self.objects_evacuated + self.byte_arrays_evacuated
    }

    /// Average bytes moved per collection, zero before the first collection
    pub fn avg_bytes_per_collection(&self) -> f64 {
        if self.collections == 0 {
            0.0
        } else {
            self.bytes_evacuated as f64 / self.collections as f64
        }
    }
}

/// Usage snapshot of a single space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpaceUsage {
    /// Space name
    pub name: &'static str,
    /// Fixed capacity in bytes
    pub capacity: usize,
    /// Bytes in use across both segments
    pub used: usize,
    /// Bytes free between the two cursors
    pub free: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_evacuated() {
        let stats = HeapStats {
            objects_evacuated: 3,
            byte_arrays_evacuated: 2,
            ..Default::default()
        };
        assert_eq!(stats.total_evacuated(), 5);
    }

    #[test]
    fn test_avg_bytes_no_collections() {
        let stats = HeapStats::default();
        assert_eq!(stats.avg_bytes_per_collection(), 0.0);
    }

    #[test]
    fn test_avg_bytes_per_collection() {
        let stats = HeapStats {
            collections: 2,
            bytes_evacuated: 128,
            ..Default::default()
        };
        assert_eq!(stats.avg_bytes_per_collection(), 64.0);
    }
}

//! Usage counters for the query service.

/// Counters collected by [`OntologyQueryService`](super::OntologyQueryService).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryStats {
    /// Closure lookups served, hits and misses together.
    pub queries_executed: usize,
    /// Lookups answered from the cache.
    pub cache_hits: usize,
    /// Lookups that had to walk the graph.
    pub cache_misses: usize,
    /// Wall time spent walking the graph on misses, in milliseconds.
    pub walk_time_ms: f64,
}

impl QueryStats {
    /// Fraction of lookups answered from the cache, in `[0, 1]`.
    pub fn hit_ratio(&self) -> f64 {
        match self.cache_hits + self.cache_misses {
            0 => 0.0,
            total => self.cache_hits as f64 / total as f64,
        }
    }

    /// Mean walk time of a miss in milliseconds.
    pub fn mean_walk_ms(&self) -> f64 {
        if self.cache_misses == 0 {
            return 0.0;
        }
        self.walk_time_ms / self.cache_misses as f64
    }

    pub(super) fn record_hit(&mut self) {
        self.queries_executed += 1;
        self.cache_hits += 1;
    }

    pub(super) fn record_miss(&mut self, walk_ms: f64) {
        self.queries_executed += 1;
        self.cache_misses += 1;
        self.walk_time_ms += walk_ms;
    }
}

impl std::fmt::Display for QueryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} closure lookups, {} hits / {} misses ({:.1}% cached), {:.2}ms per walk",
            self.queries_executed,
            self.cache_hits,
            self.cache_misses,
            self.hit_ratio() * 100.0,
            self.mean_walk_ms()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratios() {
        let mut stats = QueryStats::default();
        stats.record_miss(4.0);
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();

        assert_eq!(stats.queries_executed, 4);
        assert!((stats.hit_ratio() - 0.75).abs() < 1e-9);
        assert!((stats.mean_walk_ms() - 4.0).abs() < 1e-9);
        assert!(stats.to_string().contains("(75.0% cached)"));
    }

    #[test]
    fn test_empty_stats() {
        let stats = QueryStats::default();
        assert_eq!(stats.hit_ratio(), 0.0);
        assert_eq!(stats.mean_walk_ms(), 0.0);
    }
}

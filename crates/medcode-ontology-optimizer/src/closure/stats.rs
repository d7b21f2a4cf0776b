//! Statistics about transitive closure builds.

/// Statistics about the transitive closure.
#[derive(Debug, Clone, Default)]
pub struct ClosureStats {
    /// Number of codes in the closure.
    pub code_count: usize,
    /// Number of direct parent/child edges processed.
    pub edge_count: usize,
    /// Maximum number of levels above any code.
    pub max_hierarchy_depth: usize,
    /// Average number of ancestors per code.
    pub avg_ancestors: f64,
    /// Average number of descendants per code.
    pub avg_descendants: f64,
    /// Codes whose ancestor walk returned to themselves.
    pub cyclic_codes: usize,
    /// Time taken to build the closure in milliseconds.
    pub build_time_ms: u64,
    /// Estimated memory usage in bytes.
    pub memory_estimate_bytes: usize,
}

impl ClosureStats {
    /// Returns estimated memory usage in megabytes.
    pub fn memory_mb(&self) -> f64 {
        self.memory_estimate_bytes as f64 / (1024.0 * 1024.0)
    }
}

impl std::fmt::Display for ClosureStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Transitive Closure Statistics:")?;
        writeln!(f, "  Codes:           {}", self.code_count)?;
        writeln!(f, "  Edges:           {}", self.edge_count)?;
        writeln!(f, "  Max depth:       {}", self.max_hierarchy_depth)?;
        writeln!(f, "  Avg ancestors:   {:.1}", self.avg_ancestors)?;
        writeln!(f, "  Avg descendants: {:.1}", self.avg_descendants)?;
        if self.cyclic_codes > 0 {
            writeln!(f, "  Cyclic codes:    {}", self.cyclic_codes)?;
        }
        writeln!(f, "  Build time:      {}ms", self.build_time_ms)?;
        writeln!(f, "  Memory estimate: {:.1} MB", self.memory_mb())?;
        Ok(())
    }
}

//! Directory Configuration

/// Directory service configuration
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Read-modify-write attempts before giving up with `Contention`
    pub max_write_attempts: u32,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            max_write_attempts: 8,
        }
    }
}

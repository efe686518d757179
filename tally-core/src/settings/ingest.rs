use serde::Deserialize;

/// Admission-control settings for the capture pipeline.
#[derive(Debug, Deserialize, Clone)]
pub struct IngestSettings {
    /// Flat per-IP limit per minute; not tenant-configurable.
    #[serde(default = "default_ip_limit_per_minute")]
    pub ip_limit_per_minute: u64,

    /// Source recorded when the payload names none.
    #[serde(default = "default_source")]
    pub default_source: String,

    /// Rate-limit counters older than this many days are swept.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

fn default_ip_limit_per_minute() -> u64 {
    100
}

fn default_source() -> String {
    "web".to_string()
}

fn default_retention_days() -> i64 {
    7
}

impl Default for IngestSettings {
    fn default() -> Self {
        IngestSettings {
            ip_limit_per_minute: default_ip_limit_per_minute(),
            default_source: default_source(),
            retention_days: default_retention_days(),
        }
    }
}

use serde::Deserialize;

/// App-level MQ configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct MqAppConfig {
    /// Whether activity messages go through the queue. Default: false.
    /// When disabled the server applies activity directly to the document store.
    /// Note: the logger ignores this field (always requires MQ).
    #[serde(default)]
    pub enabled: bool,
    /// Redis connection URL. Default: "redis://localhost:6379".
    #[serde(default = "default_mq_url")]
    pub url: String,
    /// Connection pool size. Default: 5.
    #[serde(default = "default_mq_pool_size")]
    pub pool_size: u8,
    /// Queue carrying activity messages (server publishes, logger consumes). Default: "activity_log".
    #[serde(default = "default_activity_queue")]
    pub activity_queue: String,
}

fn default_mq_url() -> String {
    "redis://localhost:6379".into()
}
fn default_mq_pool_size() -> u8 {
    5
}
fn default_activity_queue() -> String {
    "activity_log".into()
}

impl Default for MqAppConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_mq_url(),
            pool_size: default_mq_pool_size(),
            activity_queue: default_activity_queue(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentBackend {
    #[default]
    Sql,
    Memory,
}

/// Document store configuration shared by the server and the logger.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DocumentsConfig {
    #[serde(default)]
    pub backend: DocumentBackend,
    /// Connection URL for the SQL backend. Falls back to the relational database URL.
    #[serde(default)]
    pub url: Option<String>,
}

/// S3-compatible object storage settings.
#[derive(Debug, Deserialize, Clone)]
pub struct S3Config {
    pub bucket: String,
    #[serde(default = "default_s3_region")]
    pub region: String,
    /// Custom endpoint (MinIO, R2, ...). When unset the AWS endpoint for `region` is used.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub path_style: bool,
    /// Key prefix for stored objects. Default: "event-images".
    #[serde(default = "default_s3_prefix")]
    pub prefix: String,
}

fn default_s3_region() -> String {
    "us-east-1".into()
}
fn default_s3_prefix() -> String {
    "event-images".into()
}

use std::future::Future;

use mqtt_bridge_common::{Credentials, RedisSection};
use redis::AsyncCommands;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("vault request failed: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Key-value lookup used to resolve broker credentials.
pub trait SecretStore {
    fn fetch(&self, key: &str) -> impl Future<Output = Result<Option<String>, VaultError>> + Send;
}

pub struct RedisVault {
    url: String,
}

impl RedisVault {
    pub fn new(section: &RedisSection) -> Self {
        Self {
            url: format!(
                "redis://{}:{}/{}",
                section.host, section.port, section.vaultdb
            ),
        }
    }
}

impl SecretStore for RedisVault {
    async fn fetch(&self, key: &str) -> Result<Option<String>, VaultError> {
        let client = redis::Client::open(self.url.as_str())?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }
}

/// Single lookup of `uid`; every failure degrades to empty credentials.
pub async fn resolve_credentials<S: SecretStore>(store: &S, uid: &str) -> Credentials {
    let record = match store.fetch(uid).await {
        Ok(record) => record,
        Err(err) => {
            warn!("vault lookup for {uid} failed: {err}");
            None
        }
    };

    let credentials = Credentials::from_record(record.as_deref());
    if credentials.is_empty() {
        warn!("no usable vault record for {uid}, continuing without credentials");
    } else {
        debug!("resolved broker credentials for {uid}");
    }
    credentials
}

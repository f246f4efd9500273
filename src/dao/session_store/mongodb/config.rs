use std::time::Duration;

use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};

const DEFAULT_DB: &str = "trivia_board";

/// Backoff applied while waiting for the first successful ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectBackoff {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl ConnectBackoff {
    /// Delay to wait after `delay`, doubling up to `max_delay`.
    pub fn next_delay(&self, delay: Duration) -> Duration {
        (delay * 2).min(self.max_delay)
    }
}

impl Default for ConnectBackoff {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Connection settings for the MongoDB session store.
#[derive(Clone)]
pub struct MongoConfig {
    pub options: ClientOptions,
    pub database_name: String,
    pub backoff: ConnectBackoff,
}

impl MongoConfig {
    pub async fn from_uri(uri: &str, db_name: Option<&str>) -> MongoResult<Self> {
        let database_name = db_name.unwrap_or(DEFAULT_DB).to_owned();
        let options =
            ClientOptions::parse(uri)
                .await
                .map_err(|source| MongoDaoError::InvalidUri {
                    uri: uri.to_owned(),
                    source,
                })?;

        Ok(Self {
            options,
            database_name,
            backoff: ConnectBackoff::default(),
        })
    }

    /// Cap the number of initial ping attempts; at least one attempt is always made.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.backoff.max_attempts = max_attempts.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_until_capped() {
        let backoff = ConnectBackoff::default();
        let mut delay = backoff.initial_delay;
        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(delay.as_millis());
            delay = backoff.next_delay(delay);
        }
        assert_eq!(seen, [250, 500, 1000, 2000, 4000, 5000]);
    }
}

use mongodb::{Client, Database, bson::doc};
use tokio::time::sleep;
use tracing::{info, warn};

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
};

/// Open a client for `config` and ping until the server answers or the backoff gives up.
pub async fn establish_connection(config: &MongoConfig) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(config.options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(&config.database_name);
    let backoff = config.backoff;

    let mut delay = backoff.initial_delay;
    for attempt in 1.. {
        let err = match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => {
                info!(database = %config.database_name, attempt, "connected to MongoDB");
                break;
            }
            Err(err) => err,
        };
        if attempt >= backoff.max_attempts {
            return Err(MongoDaoError::InitialPing {
                attempts: attempt,
                source: err,
            });
        }
        warn!(
            attempt,
            max_attempts = backoff.max_attempts,
            wait_ms = delay.as_millis(),
            error = %err,
            "MongoDB ping failed; retrying"
        );
        sleep(delay).await;
        delay = backoff.next_delay(delay);
    }

    Ok((client, database))
}

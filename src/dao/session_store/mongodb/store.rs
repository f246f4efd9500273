use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database,
    bson::doc,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoBoardDocument, MongoPlayerDocument, doc_id},
};
use crate::dao::{
    models::{BoardEntity, PlayerEntity},
    session_store::SessionStore,
    storage::StorageResult,
};

const BOARD_COLLECTION_NAME: &str = "boards";
const PLAYER_COLLECTION_NAME: &str = "players";
const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Clone)]
pub struct MongoSessionStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    // Kept alive alongside the database handle it produced.
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) = establish_connection(&self.config).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoSessionStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) = establish_connection(&config).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.board_collection().await;
        let index = mongodb::IndexModel::builder()
            .keys(doc! {"pin": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("board_pin_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: BOARD_COLLECTION_NAME,
                index: "pin",
                source,
            })?;

        let player_collection = self.player_collection().await;
        let player_index = mongodb::IndexModel::builder()
            .keys(doc! {"board_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("player_board_idx".to_owned()))
                    .build(),
            )
            .build();

        player_collection
            .create_index(player_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PLAYER_COLLECTION_NAME,
                index: "board_id",
                source,
            })?;

        Ok(())
    }

    async fn board_collection(&self) -> Collection<MongoBoardDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoBoardDocument>(BOARD_COLLECTION_NAME)
    }

    async fn player_collection(&self) -> Collection<MongoPlayerDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoPlayerDocument>(PLAYER_COLLECTION_NAME)
    }

    async fn find_board(
        &self,
        filter: mongodb::bson::Document,
        key: String,
    ) -> MongoResult<Option<BoardEntity>> {
        let collection = self.board_collection().await;
        let document = collection
            .find_one(filter)
            .await
            .map_err(|source| MongoDaoError::LoadBoard { key, source })?;

        document.map(BoardEntity::try_from).transpose()
    }

    async fn create_board(&self, board: BoardEntity) -> MongoResult<()> {
        let id = board.id;
        let pin = board.pin.clone();
        let document: MongoBoardDocument = board.into();
        let collection = self.board_collection().await;

        collection
            .insert_one(&document)
            .await
            .map_err(|source| {
                if is_duplicate_key(&source) {
                    MongoDaoError::DuplicatePin { pin }
                } else {
                    MongoDaoError::SaveBoard { id, source }
                }
            })?;
        Ok(())
    }

    async fn save_board(&self, board: BoardEntity) -> MongoResult<()> {
        let id = board.id;
        let document: MongoBoardDocument = board.into();
        let collection = self.board_collection().await;

        collection
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveBoard { id, source })?;
        Ok(())
    }

    async fn create_player(&self, player: PlayerEntity) -> MongoResult<()> {
        let id = player.id;
        let document: MongoPlayerDocument = player.into();
        let collection = self.player_collection().await;

        collection
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::SavePlayer { id, source })?;
        Ok(())
    }

    async fn save_player(&self, player: PlayerEntity) -> MongoResult<bool> {
        let id = player.id;
        let document: MongoPlayerDocument = player.into();
        let collection = self.player_collection().await;

        let result = collection
            .replace_one(doc_id(id), &document)
            .await
            .map_err(|source| MongoDaoError::SavePlayer { id, source })?;
        Ok(result.matched_count > 0)
    }

    async fn find_players(&self, filter: mongodb::bson::Document) -> MongoResult<Vec<PlayerEntity>> {
        let collection = self.player_collection().await;

        let documents: Vec<MongoPlayerDocument> = collection
            .find(filter)
            .await
            .map_err(|source| MongoDaoError::LoadPlayers { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadPlayers { source })?;

        documents.into_iter().map(PlayerEntity::try_from).collect()
    }

    async fn find_players_by_ids(&self, ids: Vec<Uuid>) -> MongoResult<Vec<PlayerEntity>> {
        let raw_ids: Vec<String> = ids.iter().map(Uuid::to_string).collect();
        let mut players = self.find_players(doc! {"_id": {"$in": raw_ids}}).await?;
        // `$in` gives no ordering guarantee; keep the caller's (join) order.
        players.sort_by_key(|player| ids.iter().position(|id| *id == player.id));
        Ok(players)
    }

    async fn delete_player(&self, id: Uuid) -> MongoResult<bool> {
        let collection = self.player_collection().await;
        let result = collection
            .delete_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::DeletePlayer { id, source })?;
        Ok(result.deleted_count > 0)
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY_CODE
    )
}

impl SessionStore for MongoSessionStore {
    fn find_board_by_pin(&self, pin: String) -> BoxFuture<'static, StorageResult<Option<BoardEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_board(doc! {"pin": pin.as_str()}, pin.clone())
                .await
                .map_err(Into::into)
        })
    }

    fn find_board_by_id(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<BoardEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_board(doc_id(id), id.to_string())
                .await
                .map_err(Into::into)
        })
    }

    fn create_board(&self, board: BoardEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.create_board(board).await.map_err(Into::into) })
    }

    fn save_board(&self, board: BoardEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_board(board).await.map_err(Into::into) })
    }

    fn create_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.create_player(player).await.map_err(Into::into) })
    }

    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut players = store.find_players(doc_id(id)).await?;
            Ok(players.pop())
        })
    }

    fn find_players(&self, ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_players_by_ids(ids).await.map_err(Into::into) })
    }

    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.save_player(player).await.map_err(Into::into) })
    }

    fn delete_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_player(id).await.map_err(Into::into) })
    }

    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_players(doc! {}).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    clock::now_millis,
    dao::{
        game_store::GameStore,
        models::{GamePatch, GameRecord},
        storage::{StorageError, StorageResult},
    },
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{CouchGameDocument, FindResponse, game_doc_id, share_code_query},
};

/// Attempts made by `update_game` before giving up on revision conflicts.
const MAX_UPDATE_ATTEMPTS: usize = 3;

/// Games stored as one CouchDB document each, keyed `game::<uuid>`.
#[derive(Clone)]
pub struct CouchGameStore {
    client: Client,
    database_url: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchGameStore {
    /// Build the client and create the database when it does not exist yet.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;
        let database_url = format!(
            "{}/{}",
            config.base_url.trim_end_matches('/'),
            config.database
        );
        let store = Self {
            client,
            database_url: database_url.into(),
            auth: config
                .username
                .zip(config.password)
                .map(|(user, pass)| (user.into(), pass.into())),
        };
        store.ensure_database().await?;
        Ok(store)
    }

    /// Request against the database itself (`path` empty) or one of its endpoints.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = if path.is_empty() {
            self.database_url.to_string()
        } else {
            format!("{}/{}", self.database_url, path)
        };
        let builder = self.client.request(method, url);
        match &self.auth {
            Some((user, pass)) => builder.basic_auth(user, Some(pass)),
            None => builder,
        }
    }

    async fn send(&self, path: &str, builder: RequestBuilder) -> CouchResult<Response> {
        builder
            .send()
            .await
            .map_err(|source| CouchDaoError::Transport {
                path: path.to_string(),
                source,
            })
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> CouchResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|source| CouchDaoError::Decode {
                path: path.to_string(),
                source,
            })
    }

    fn unexpected(path: &str, status: StatusCode) -> CouchDaoError {
        CouchDaoError::Status {
            path: path.to_string(),
            status,
        }
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let probe = self.send("", self.request(Method::GET, "")).await?;
        match probe.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let created = self.send("", self.request(Method::PUT, "")).await?;
                match created.status() {
                    // 412: created concurrently by another instance.
                    status if status.is_success() || status == StatusCode::PRECONDITION_FAILED => {
                        info!(database = %self.database_url, "created CouchDB database");
                        Ok(())
                    }
                    status => Err(Self::unexpected("", status)),
                }
            }
            status => Err(Self::unexpected("", status)),
        }
    }

    async fn load(&self, doc_id: &str) -> CouchResult<Option<CouchGameDocument>> {
        let response = self.send(doc_id, self.request(Method::GET, doc_id)).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Self::decode(doc_id, response).await.map(Some),
            status => Err(Self::unexpected(doc_id, status)),
        }
    }

    /// Store `doc`; `false` when its revision is stale.
    async fn store(&self, doc: &CouchGameDocument) -> CouchResult<bool> {
        let builder = self.request(Method::PUT, &doc.id).json(doc);
        let response = self.send(&doc.id, builder).await?;
        match response.status() {
            StatusCode::CONFLICT => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(Self::unexpected(&doc.id, status)),
        }
    }

    async fn find_first(&self, query: serde_json::Value) -> CouchResult<Option<CouchGameDocument>> {
        const FIND: &str = "_find";
        let response = self
            .send(FIND, self.request(Method::POST, FIND).json(&query))
            .await?;
        if !response.status().is_success() {
            return Err(Self::unexpected(FIND, response.status()));
        }
        let found: FindResponse = Self::decode(FIND, response).await?;
        Ok(found.docs.into_iter().next())
    }
}

impl GameStore for CouchGameStore {
    fn create_game(&self, game: GameRecord) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = CouchGameDocument::from((game, None));
            if store.store(&doc).await? {
                Ok(())
            } else {
                Err(Self::unexpected(&doc.id, StatusCode::CONFLICT).into())
            }
        })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameRecord>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store.load(&game_doc_id(id)).await?;
            Ok(doc.map(|doc| doc.game))
        })
    }

    fn find_by_share_code(
        &self,
        share_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameRecord>>> {
        let store = self.clone();
        Box::pin(async move {
            // Codes are issued uppercase; Mango matches are case sensitive.
            let query = share_code_query(&share_code.to_ascii_uppercase());
            let doc = store.find_first(query).await?;
            Ok(doc.map(|doc| doc.game))
        })
    }

    fn update_game(
        &self,
        id: Uuid,
        patch: GamePatch,
    ) -> BoxFuture<'static, StorageResult<GameRecord>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = game_doc_id(id);
            for attempt in 1..=MAX_UPDATE_ATTEMPTS {
                let Some(mut doc) = store.load(&doc_id).await? else {
                    return Err(StorageError::Missing { id });
                };
                doc.game.apply(&patch);
                doc.game.updated_at = now_millis();
                if store.store(&doc).await? {
                    return Ok(doc.game);
                }
                debug!(game_id = %id, attempt, "revision conflict; retrying update");
            }
            Err(CouchDaoError::Conflict {
                path: doc_id,
                attempts: MAX_UPDATE_ATTEMPTS,
            }
            .into())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let response = store.send("", store.request(Method::GET, "")).await?;
            if response.status().is_success() {
                Ok(())
            } else {
                Err(Self::unexpected("", response.status()).into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.ensure_database().await?) })
    }
}

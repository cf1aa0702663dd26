use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::{CollectionStore, Records, Result, StoreError};

/// A store client speaking the Firebase-style REST dialect, where a
/// collection `C` lives at `{base}/C.json` and a record at `{base}/C/{key}.json`.
#[derive(Debug, Clone)]
pub struct RestStore {
    base_url: Url,
    client: Client,
}

/// The reply to a record creation
#[derive(Debug, Deserialize)]
struct CreatedKey {
    name: String,
}

impl RestStore {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            client: Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}.json",
            self.base_url.as_str().trim_end_matches('/'),
            path
        )
    }

    async fn send(&self, collection: &str, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|source| StoreError::Transport {
                collection: collection.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                collection: collection.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    async fn decode<T>(&self, collection: &str, response: Response) -> Result<T>
    where
        T: DeserializeOwned,
    {
        response.json().await.map_err(|source| StoreError::Decode {
            collection: collection.to_string(),
            source,
        })
    }
}

#[async_trait]
impl CollectionStore for RestStore {
    async fn fetch_all(&self, collection: &str) -> Result<Records> {
        let request = self.client.get(self.endpoint(collection));
        let response = self.send(collection, request).await?;

        // An absent collection is a `null` body, not an empty object
        let records: Option<Records> = self.decode(collection, response).await?;

        Ok(records.unwrap_or_default())
    }

    async fn query_equal(&self, collection: &str, field: &str, value: &str) -> Result<Records> {
        let request = self
            .client
            .get(self.endpoint(collection))
            .query(&[("orderBy", quoted(field)), ("equalTo", quoted(value))]);

        let response = self.send(collection, request).await?;
        let records: Option<Records> = self.decode(collection, response).await?;

        Ok(records.unwrap_or_default())
    }

    async fn create(&self, collection: &str, record: Value) -> Result<String> {
        let request = self.client.post(self.endpoint(collection)).json(&record);
        let response = self.send(collection, request).await?;

        let created: CreatedKey = self.decode(collection, response).await?;

        Ok(created.name)
    }

    async fn merge(&self, collection: &str, key: &str, partial: Value) -> Result<()> {
        let path = format!("{collection}/{key}");
        let request = self.client.patch(self.endpoint(&path)).json(&partial);

        self.send(collection, request).await.map(|_| ())
    }
}

/// The store's filter syntax expects JSON-quoted operands
fn quoted(raw: &str) -> String {
    format!("\"{raw}\"")
}

//! [`GeoStore`] over the geodata HTTP API.
use geo_utils::{
    GEODATA_PATH, Record,
    record::{GeodataRequest, created_id},
};
use geojson::Feature;
use reqwest::{Client, RequestBuilder, Response};

use crate::store::{GeoStore, StoreError};

#[derive(Clone, Debug)]
pub struct HttpStore {
    client: Client,
    base_url: String,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}{GEODATA_PATH}", self.base_url)
    }

    fn record_url(&self, id: &str) -> String {
        format!("{}{GEODATA_PATH}/{id}", self.base_url)
    }

    async fn send(&self, what: &str, request: RequestBuilder) -> Result<Response, StoreError> {
        log::debug!("geodata {what}");
        let response = request.send().await.map_err(|e| {
            log::warn!("geodata {what} failed to send: {e}");
            StoreError::Network(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::warn!("geodata {what} failed: {status} - {body}");
            return Err(StoreError::Server {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn body_text(response: Response) -> Result<String, StoreError> {
        response
            .text()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))
    }
}

impl GeoStore for HttpStore {
    async fn list_all(&self) -> Result<Vec<Record>, StoreError> {
        let response = self
            .send("list", self.client.get(self.collection_url()))
            .await?;
        let body = Self::body_text(response).await?;
        let records: Vec<Record> = serde_json::from_str(&body).inspect_err(|e| {
            log::warn!("Failed to parse geodata list: {e}\nResponse body: {body}");
        })?;
        log::debug!("geodata list returned {} records", records.len());
        Ok(records)
    }

    async fn create(&self, feature: &Feature) -> Result<Record, StoreError> {
        let response = self
            .send(
                "create",
                self.client
                    .post(self.collection_url())
                    .json(&GeodataRequest::create(feature)),
            )
            .await?;
        let status = response.status().as_u16();
        let body = Self::body_text(response).await?;

        // A success status with an unreadable body or no id is still a failed create.
        let id = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .as_ref()
            .and_then(created_id)
            .ok_or_else(|| {
                log::warn!("geodata create response carried no id: {body}");
                StoreError::Server {
                    status,
                    body: format!("response carried no id: {body}"),
                }
            })?;

        Ok(Record::new(id, feature))
    }

    async fn update(&self, id: &str, feature: &Feature) -> Result<(), StoreError> {
        self.send(
            "update",
            self.client
                .put(self.record_url(id))
                .json(&GeodataRequest::edit(feature)),
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.send("delete", self.client.delete(self.record_url(id)))
            .await?;
        Ok(())
    }
}

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! PostgREST mirror store (Supabase REST API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};

use passport_kernel::AssetId;

use super::{EventRow, MirrorStore, SnapshotRow, StoreError};

pub const SNAPSHOT_TABLE: &str = "passports";
pub const EVENT_TABLE: &str = "passport_events";

#[derive(Debug, Clone)]
pub struct RestMirrorStore {
    base_url: String,
    service_key: String,
    client: Client,
}

impl RestMirrorStore {
    pub fn new(base_url: &str, service_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn execute(req: RequestBuilder) -> Result<Response, StoreError> {
        let resp = req
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Rejected { status, body });
        }
        Ok(resp)
    }
}

#[async_trait]
impl MirrorStore for RestMirrorStore {
    async fn delete_events(&self, asset: &AssetId) -> Result<(), StoreError> {
        let req = self
            .authorized(self.client.delete(self.table_url(EVENT_TABLE)))
            .query(&[("tire_id", format!("eq.{}", asset))]);
        Self::execute(req).await?;
        Ok(())
    }

    async fn insert_events(&self, rows: &[EventRow]) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }
        let req = self
            .authorized(self.client.post(self.table_url(EVENT_TABLE)))
            .header("Prefer", "return=minimal")
            .json(rows);
        Self::execute(req).await?;
        Ok(())
    }

    async fn upsert_snapshot(&self, row: &SnapshotRow) -> Result<(), StoreError> {
        let req = self
            .authorized(self.client.post(self.table_url(SNAPSHOT_TABLE)))
            .query(&[("on_conflict", "tire_id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[row]);
        Self::execute(req).await?;
        Ok(())
    }
}

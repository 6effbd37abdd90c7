//! Typed surface over the backend's dataset/version/asset/job/label routes.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    api::{ApiClient, ApiError},
    model::{
        Asset, AssetCreate, DataSource, Dataset, DatasetCreate, DatasetVersion, Job, JobCreate,
        LabelCreate, SourceCreate, VersionCreate,
    },
};

type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Clone)]
pub struct Client {
    api: ApiClient,
}

impl Client {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn create_dataset(&self, payload: &DatasetCreate) -> Result<Dataset> {
        required(self.api.post("/datasets", payload).await?)
    }

    pub async fn list_datasets(&self) -> Result<Vec<Dataset>> {
        list(self.api.get("/datasets").await?)
    }

    pub async fn get_dataset(&self, dataset_id: &str) -> Result<Dataset> {
        required(self.api.get(&format!("/datasets/{dataset_id}")).await?)
    }

    pub async fn create_version(
        &self,
        dataset_id: &str,
        payload: &VersionCreate,
    ) -> Result<DatasetVersion> {
        required(
            self.api
                .post(&format!("/datasets/{dataset_id}/versions"), payload)
                .await?,
        )
    }

    pub async fn list_versions(&self, dataset_id: &str) -> Result<Vec<DatasetVersion>> {
        list(self.api.get(&format!("/datasets/{dataset_id}/versions")).await?)
    }

    /// Register a batch of assets under a version in one call.
    pub async fn add_assets(
        &self,
        dataset_id: &str,
        version_id: &str,
        assets: &[AssetCreate],
    ) -> Result<Vec<Asset>> {
        list(
            self.api
                .post(
                    &format!("/datasets/{dataset_id}/versions/{version_id}/assets"),
                    assets,
                )
                .await?,
        )
    }

    pub async fn list_assets(&self, dataset_id: &str, version_id: &str) -> Result<Vec<Asset>> {
        list(
            self.api
                .get(&format!("/datasets/{dataset_id}/versions/{version_id}/assets"))
                .await?,
        )
    }

    pub async fn add_source(
        &self,
        dataset_id: &str,
        version_id: &str,
        payload: &SourceCreate,
    ) -> Result<DataSource> {
        required(
            self.api
                .post(
                    &format!("/datasets/{dataset_id}/versions/{version_id}/sources"),
                    payload,
                )
                .await?,
        )
    }

    pub async fn list_sources(&self, dataset_id: &str, version_id: &str) -> Result<Vec<DataSource>> {
        list(
            self.api
                .get(&format!("/datasets/{dataset_id}/versions/{version_id}/sources"))
                .await?,
        )
    }

    pub async fn create_job(
        &self,
        dataset_id: &str,
        version_id: &str,
        payload: &JobCreate,
    ) -> Result<Job> {
        required(
            self.api
                .post(
                    &format!("/datasets/{dataset_id}/versions/{version_id}/jobs"),
                    payload,
                )
                .await?,
        )
    }

    pub async fn list_jobs(&self, dataset_id: &str, version_id: &str) -> Result<Vec<Job>> {
        list(
            self.api
                .get(&format!("/datasets/{dataset_id}/versions/{version_id}/jobs"))
                .await?,
        )
    }

    /// Ask the backend to start executing an already-created job.
    pub async fn run_job(&self, job_id: &str) -> Result<()> {
        self.api
            .post(&format!("/jobs/{job_id}/run"), &empty_body())
            .await?;
        Ok(())
    }

    pub async fn save_label(
        &self,
        dataset_id: &str,
        version_id: &str,
        asset_id: &str,
        payload: &LabelCreate,
    ) -> Result<()> {
        self.api
            .post(
                &format!("/datasets/{dataset_id}/versions/{version_id}/labels/{asset_id}"),
                payload,
            )
            .await?;
        Ok(())
    }

    pub async fn run_auto_label(&self, dataset_id: &str, version_id: &str) -> Result<()> {
        self.api
            .post(
                &format!("/datasets/{dataset_id}/versions/{version_id}/auto-label"),
                &empty_body(),
            )
            .await?;
        Ok(())
    }
}

fn empty_body() -> Value {
    Value::Object(serde_json::Map::new())
}

fn required<T: DeserializeOwned>(body: Option<Value>) -> Result<T> {
    let body = body.ok_or(ApiError::Empty)?;
    Ok(serde_json::from_value(body)?)
}

/// List endpoints answer with an array or nothing; nothing means empty.
fn list<T: DeserializeOwned>(body: Option<Value>) -> Result<Vec<T>> {
    match body {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(Vec::new()),
    }
}

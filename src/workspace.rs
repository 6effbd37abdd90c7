//! Version workspace.
//!
//! A stateful view over one dataset version: the dataset record plus the
//! version's sources, assets, and jobs. Mutating actions never patch local
//! state; they re-fetch the whole snapshot afterwards, so the backend stays
//! the only authority.

use crate::{
    api::ApiError,
    client::Client,
    model::{Asset, AssetCreate, DataSource, Dataset, Job, JobCreate},
};

type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
pub struct VersionWorkspace {
    client: Client,
    dataset_id: String,
    version_id: String,
    dataset: Dataset,
    sources: Vec<DataSource>,
    assets: Vec<Asset>,
    jobs: Vec<Job>,
}

impl VersionWorkspace {
    /// Open the workspace, fetching the full snapshot.
    pub async fn open(
        client: Client,
        dataset_id: impl Into<String>,
        version_id: impl Into<String>,
    ) -> Result<Self> {
        let dataset_id = dataset_id.into();
        let version_id = version_id.into();
        let dataset = client.get_dataset(&dataset_id).await?;
        let sources = client.list_sources(&dataset_id, &version_id).await?;
        let assets = client.list_assets(&dataset_id, &version_id).await?;
        let jobs = client.list_jobs(&dataset_id, &version_id).await?;
        Ok(Self {
            client,
            dataset_id,
            version_id,
            dataset,
            sources,
            assets,
            jobs,
        })
    }

    /// Re-derive every part of the view from the backend.
    pub async fn refresh(&mut self) -> Result<()> {
        self.dataset = self.client.get_dataset(&self.dataset_id).await?;
        self.sources = self
            .client
            .list_sources(&self.dataset_id, &self.version_id)
            .await?;
        self.assets = self
            .client
            .list_assets(&self.dataset_id, &self.version_id)
            .await?;
        self.jobs = self
            .client
            .list_jobs(&self.dataset_id, &self.version_id)
            .await?;
        Ok(())
    }

    /// Register one asset under the version, then refresh.
    pub async fn add_asset(&mut self, uri: &str, media_type: &str) -> Result<()> {
        let asset = AssetCreate {
            uri: uri.to_string(),
            media_type: media_type.to_string(),
            metadata: serde_json::Map::new(),
        };
        self.client
            .add_assets(&self.dataset_id, &self.version_id, std::slice::from_ref(&asset))
            .await?;
        self.refresh().await
    }

    /// Create a pipeline job, start it, then refresh. Returns the job id;
    /// completion is the backend's business and is observed via refreshes.
    pub async fn run_pipeline(&mut self) -> Result<String> {
        let job = self
            .client
            .create_job(&self.dataset_id, &self.version_id, &JobCreate::pipeline_run())
            .await?;
        self.client.run_job(&job.id).await?;
        self.refresh().await?;
        Ok(job.id)
    }

    #[must_use]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    #[must_use]
    pub fn sources(&self) -> &[DataSource] {
        &self.sources
    }

    #[must_use]
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    #[must_use]
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    #[must_use]
    pub fn version_id(&self) -> &str {
        &self.version_id
    }
}

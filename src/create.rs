//! Dataset creation workflow.
//!
//! Turns one submitted form into the backend sequence dataset → version →
//! (file uploads + asset batch | source registration | nothing), then hands
//! off to the new version's curation view. The steps are not atomic: the
//! backend offers no transaction across them, so a failure part-way leaves
//! the records created so far in place. [`CreateSaga`] records the furthest
//! completed step so the caller can report exactly where the workflow
//! stopped.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

use crate::{
    api::ApiError,
    client::Client,
    infer,
    model::{
        AssetCreate, ConnectorKind, DataType, DatasetCreate, SourceCreate, VersionCreate,
        DEFAULT_MEDIA_TYPE,
    },
    session::SessionUser,
    storage::{LocalFile, StorageClient, UploadError},
};

/// Notice surfaced when attached files change the selected data types.
pub const TYPE_NOTICE: &str = "Detected file types and updated dataset types automatically.";

/// Target-output text offered before the user edits it.
pub const DEFAULT_TARGET_OUTPUT: &str = r#"{
  "images": "coco",
  "text": "jsonl",
  "numerical": "parquet"
}"#;

#[derive(Debug, Error)]
pub enum CreateError {
    #[error("Please sign in first.")]
    SignInRequired,
    #[error("Invalid target output configuration: {0}")]
    InvalidTargetOutput(#[source] serde_json::Error),
    #[error("Local upload selected but object storage is not configured.")]
    StorageUnavailable,
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Ordered steps of the workflow. Which of the last three run depends on the
/// selected source kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CreateStep {
    Dataset,
    Version,
    Uploads,
    Assets,
    Source,
}

impl CreateStep {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dataset => "dataset",
            Self::Version => "version",
            Self::Uploads => "uploads",
            Self::Assets => "assets",
            Self::Source => "source",
        }
    }
}

impl std::fmt::Display for CreateStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The creation form as submitted. Field defaults match a fresh form: all
/// data types selected, local upload, the stock target-output text.
#[derive(Debug, Clone)]
pub struct CreateDatasetForm {
    pub name: String,
    pub description: String,
    pub data_types: BTreeSet<DataType>,
    pub target_output: String,
    pub connector: ConnectorKind,
    pub source_uri: Option<String>,
    pub files: Vec<LocalFile>,
}

impl CreateDatasetForm {
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            data_types: DataType::ALL.into_iter().collect(),
            target_output: DEFAULT_TARGET_OUTPUT.to_string(),
            connector: ConnectorKind::LocalUpload,
            source_uri: None,
            files: Vec::new(),
        }
    }

    /// Attach files for upload, classifying each and merging the resolved
    /// categories into the selected data types. Returns the auto-detection
    /// notice when the batch resolved at least one category.
    pub fn attach_files(&mut self, files: Vec<LocalFile>) -> Option<&'static str> {
        let inferred: Vec<DataType> = files
            .iter()
            .filter_map(|file| infer::classify(&file.name, file.media_type.as_deref()))
            .collect();
        self.files = files;
        if infer::merge_inferred(&mut self.data_types, inferred) {
            Some(TYPE_NOTICE)
        } else {
            None
        }
    }

    fn wants_upload(&self) -> bool {
        self.connector == ConnectorKind::LocalUpload && !self.files.is_empty()
    }

    fn connection_uri(&self) -> Option<&str> {
        self.source_uri.as_deref().filter(|uri| !uri.is_empty())
    }
}

/// Result of a completed run: the created records plus the path of the
/// curation view to navigate to.
#[derive(Debug)]
pub struct CreateOutcome {
    pub dataset: crate::model::Dataset,
    pub version: crate::model::DatasetVersion,
    pub curate_path: String,
}

/// One submission of the creation form. Holds the furthest completed step
/// across the run so failures can name what already exists; a future
/// resume/rollback hooks in at the same place.
#[derive(Debug)]
pub struct CreateSaga<'a> {
    client: &'a Client,
    storage: Option<&'a StorageClient>,
    completed: Option<CreateStep>,
}

impl<'a> CreateSaga<'a> {
    #[must_use]
    pub const fn new(client: &'a Client, storage: Option<&'a StorageClient>) -> Self {
        Self {
            client,
            storage,
            completed: None,
        }
    }

    #[must_use]
    pub const fn furthest_completed(&self) -> Option<CreateStep> {
        self.completed
    }

    /// Run the workflow. Every step is validated or performed strictly in
    /// order, each network call consuming an identifier returned by the one
    /// before it; nothing is attempted before the session and the
    /// target-output text check out.
    pub async fn run(
        &mut self,
        user: Option<&SessionUser>,
        form: &CreateDatasetForm,
    ) -> Result<CreateOutcome, CreateError> {
        if user.is_none() {
            return Err(CreateError::SignInRequired);
        }
        let target_output: Map<String, Value> =
            serde_json::from_str(form.target_output.trim()).map_err(CreateError::InvalidTargetOutput)?;
        let storage = if form.wants_upload() {
            Some(self.storage.ok_or(CreateError::StorageUnavailable)?)
        } else {
            None
        };

        info!("Creating dataset...");
        let dataset = self
            .client
            .create_dataset(&DatasetCreate {
                name: form.name.clone(),
                description: (!form.description.is_empty()).then(|| form.description.clone()),
                data_types: form.data_types.iter().copied().collect(),
            })
            .await?;
        self.completed = Some(CreateStep::Dataset);

        let version = self
            .client
            .create_version(&dataset.id, &VersionCreate { target_output })
            .await?;
        self.completed = Some(CreateStep::Version);

        if let Some(storage) = storage {
            info!("Uploading files...");
            let mut uploaded = Vec::with_capacity(form.files.len());
            for file in &form.files {
                // Sequential and fail-fast: the first failing file aborts
                // the batch and nothing is registered.
                let uri = storage.upload(&dataset.id, &version.id, file).await?;
                uploaded.push(uri);
            }
            self.completed = Some(CreateStep::Uploads);

            let assets: Vec<AssetCreate> = uploaded
                .into_iter()
                .map(|uri| AssetCreate {
                    uri,
                    media_type: DEFAULT_MEDIA_TYPE.to_string(),
                    metadata: source_metadata(form.connector),
                })
                .collect();
            self.client
                .add_assets(&dataset.id, &version.id, &assets)
                .await?;
            self.completed = Some(CreateStep::Assets);
        } else if let Some(uri) = form.connection_uri() {
            self.client
                .add_source(
                    &dataset.id,
                    &version.id,
                    &SourceCreate {
                        source_type: form.connector.label().to_string(),
                        source_uri: uri.to_string(),
                        options: Map::new(),
                    },
                )
                .await?;
            self.completed = Some(CreateStep::Source);
        }

        let curate_path = format!("/datasets/{}/curate/{}", dataset.id, version.id);
        info!("Dataset ready, continuing at {curate_path}");
        Ok(CreateOutcome {
            dataset,
            version,
            curate_path,
        })
    }
}

fn source_metadata(connector: ConnectorKind) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert(
        "source_type".to_string(),
        Value::String(connector.label().to_string()),
    );
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_form_selects_every_type() {
        let form = CreateDatasetForm::new("Reviews", "");
        assert_eq!(form.data_types.len(), DataType::ALL.len());
        assert_eq!(form.connector, ConnectorKind::LocalUpload);
        assert_eq!(form.target_output, DEFAULT_TARGET_OUTPUT);
    }

    #[test]
    fn attach_files_merges_and_notices() {
        let mut form = CreateDatasetForm::new("Reviews", "");
        form.data_types = [DataType::Numerical].into_iter().collect();

        let files = vec![
            LocalFile::from_bytes("reviews.jsonl", None, Vec::new()),
            LocalFile::from_bytes("cover.png", None, Vec::new()),
            LocalFile::from_bytes("notes.unknown", None, Vec::new()),
        ];
        let notice = form.attach_files(files.clone());
        assert_eq!(notice, Some(TYPE_NOTICE));
        assert!(form.data_types.contains(&DataType::Text));
        assert!(form.data_types.contains(&DataType::Image));
        assert!(form.data_types.contains(&DataType::Numerical));

        // Re-attaching the same batch changes nothing further.
        let selected = form.data_types.clone();
        form.attach_files(files);
        assert_eq!(form.data_types, selected);
    }

    #[test]
    fn unclassifiable_batch_gives_no_notice() {
        let mut form = CreateDatasetForm::new("Blobs", "");
        form.data_types = [DataType::Text].into_iter().collect();
        let notice = form.attach_files(vec![LocalFile::from_bytes("weights.bin", None, Vec::new())]);
        assert_eq!(notice, None);
        assert_eq!(form.data_types.len(), 1);
    }
}

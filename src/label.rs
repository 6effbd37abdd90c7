//! Labeling workflow for the assets of one version.

use crate::{
    api::ApiError,
    client::Client,
    model::LabelCreate,
    session::SessionUser,
};

/// Annotator recorded if an unauthenticated caller ever reaches a save.
/// Sessions are checked before the view renders, so this is a fallback, not
/// an expected path.
pub const FALLBACK_ANNOTATOR: &str = "user";

type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
pub struct LabelingWorkflow {
    client: Client,
    dataset_id: String,
    version_id: String,
    annotator: String,
}

impl LabelingWorkflow {
    #[must_use]
    pub fn new(
        client: Client,
        dataset_id: impl Into<String>,
        version_id: impl Into<String>,
        user: Option<&SessionUser>,
    ) -> Self {
        Self {
            client,
            dataset_id: dataset_id.into(),
            version_id: version_id.into(),
            annotator: user.map_or_else(|| FALLBACK_ANNOTATOR.to_string(), |user| user.id.clone()),
        }
    }

    /// Upsert a manual label for one asset; confidence is fixed at 1.0.
    pub async fn save_label(&self, asset_id: &str, label: &str) -> Result<()> {
        let payload = LabelCreate::manual(label, self.annotator.clone());
        self.client
            .save_label(&self.dataset_id, &self.version_id, asset_id, &payload)
            .await
    }

    /// Trigger backend auto-labeling for the whole version. The client does
    /// not poll for completion; it only reports acceptance.
    pub async fn run_auto_label(&self) -> Result<()> {
        self.client
            .run_auto_label(&self.dataset_id, &self.version_id)
            .await
    }

    #[must_use]
    pub fn annotator(&self) -> &str {
        &self.annotator
    }
}

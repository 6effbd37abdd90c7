//! Command line interface.
//!
//! Each subcommand is one user-initiated action: it resolves the session,
//! performs its calls, and owns its own error reporting.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::warn;

use crate::{
    api::ApiClient,
    auth::{AuthClient, SignUpOutcome, CONFIRMATION_NOTICE},
    client::Client,
    config::{self, Config},
    create::{CreateDatasetForm, CreateSaga, DEFAULT_TARGET_OUTPUT},
    label::LabelingWorkflow,
    model::{ConnectorKind, DataType, DEFAULT_MEDIA_TYPE},
    session::{SessionManager, SessionStore, SessionUser},
    storage::{LocalFile, StorageClient},
    workspace::VersionWorkspace,
};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file. If not provided, load from default location.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show default file locations and the active configuration.
    Config,
    /// List the available source connectors.
    Connectors,
    /// Manage the session with the identity provider.
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Create and inspect datasets.
    #[command(subcommand)]
    Dataset(DatasetCommand),
    /// Work with one dataset version.
    #[command(subcommand)]
    Version(VersionCommand),
    /// Label the assets of a version.
    #[command(subcommand)]
    Label(LabelCommand),
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Sign in with email and password.
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long, env = "DATALOOM_PASSWORD")]
        password: String,
    },
    /// Create an account, signing in when the provider allows it.
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long, env = "DATALOOM_PASSWORD")]
        password: String,
    },
    /// Sign out and clear the stored token.
    SignOut,
    /// Show the current session user.
    Whoami,
}

#[derive(Debug, Subcommand)]
pub enum DatasetCommand {
    /// Create a dataset with a first version and optional sources.
    Create(CreateArgs),
    /// List all datasets.
    List,
    /// Show one dataset and its versions.
    Show {
        dataset_id: String,
    },
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Dataset name.
    #[arg(long)]
    name: String,
    /// Dataset description.
    #[arg(long, default_value = "")]
    description: String,
    /// Declared data type; repeat for several. Defaults to all of them, and
    /// types inferred from attached files are merged in.
    #[arg(long = "data-type", value_name = "TYPE")]
    data_types: Vec<DataType>,
    /// Source connector kind.
    #[arg(long, default_value = "Local Upload")]
    source: ConnectorKind,
    /// Connection string for remote connectors.
    #[arg(long)]
    source_uri: Option<String>,
    /// Target output configuration as JSON text.
    #[arg(long)]
    target_output: Option<String>,
    /// Files to upload when the source is Local Upload.
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum VersionCommand {
    /// Create a new version of an existing dataset.
    Create {
        dataset_id: String,
        /// Target output configuration as JSON text.
        #[arg(long, default_value = DEFAULT_TARGET_OUTPUT)]
        target_output: String,
    },
    /// Show the version's sources, assets, and jobs.
    Show {
        dataset_id: String,
        version_id: String,
    },
    /// Register one asset under the version.
    AddAsset {
        dataset_id: String,
        version_id: String,
        /// Asset location (file:///absolute/path or s3://...).
        #[arg(long)]
        uri: String,
        #[arg(long, default_value = DEFAULT_MEDIA_TYPE)]
        media_type: String,
    },
    /// Create a pipeline job and start it.
    RunPipeline {
        dataset_id: String,
        version_id: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum LabelCommand {
    /// Save a manual label for one asset.
    Save {
        dataset_id: String,
        version_id: String,
        asset_id: String,
        label: String,
    },
    /// Trigger backend auto-labeling for the whole version.
    Auto {
        dataset_id: String,
        version_id: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let app = App::load(self.config.as_deref())?;
        match self.command {
            Commands::Config => app.show_config(),
            Commands::Connectors => {
                show_connectors();
                Ok(())
            }
            Commands::Auth(command) => app.run_auth(command).await,
            Commands::Dataset(command) => app.run_dataset(command).await,
            Commands::Version(command) => app.run_version(command).await,
            Commands::Label(command) => app.run_label(command).await,
        }
    }
}

struct App {
    config_path: PathBuf,
    config: Config,
    session: SessionStore,
    auth: Option<AuthClient>,
    client: Client,
}

impl App {
    fn load(config_override: Option<&Path>) -> Result<Self> {
        let config_path = match config_override {
            Some(path) => path.to_path_buf(),
            None => config::default_config_file()?,
        };
        let config = Config::load(&config_path)?;
        let session = SessionStore::open(config::default_token_file()?);
        let auth = config
            .auth
            .as_ref()
            .map(|auth| AuthClient::new(&auth.url, &auth.anon_key));
        let client = Client::new(ApiClient::new(&config.api.base_url, session.clone()));
        Ok(Self {
            config_path,
            config,
            session,
            auth,
            client,
        })
    }

    fn auth(&self) -> Result<&AuthClient> {
        self.auth
            .as_ref()
            .context("Identity provider is not configured; add an [auth] section to the configuration.")
    }

    fn storage(&self) -> Option<StorageClient> {
        self.config
            .auth
            .as_ref()
            .map(|auth| StorageClient::new(&auth.url, &auth.anon_key, self.session.clone()))
    }

    async fn current_user(&self) -> Option<SessionUser> {
        SessionManager::new(self.session.clone(), self.auth.clone())
            .resolve()
            .await
            .user
    }

    fn show_config(&self) -> Result<()> {
        println!("Configuration file: {}", self.config_path.display());
        println!("Token file: {}", self.session.path().display());
        print!("{}", self.config.to_toml());
        Ok(())
    }

    async fn run_auth(&self, command: AuthCommand) -> Result<()> {
        match command {
            AuthCommand::SignIn { email, password } => {
                let session = self.auth()?.sign_in_with_password(&email, &password).await?;
                self.session.set(Some(session.access_token.as_str()))?;
                println!("Signed in as {email}.");
            }
            AuthCommand::SignUp { email, password } => {
                match self.auth()?.sign_up_with_fallback(&email, &password).await? {
                    SignUpOutcome::SignedIn(session) => {
                        self.session.set(Some(session.access_token.as_str()))?;
                        println!("Account created; signed in as {email}.");
                    }
                    SignUpOutcome::ConfirmationPending => {
                        println!("{CONFIRMATION_NOTICE}");
                    }
                }
            }
            AuthCommand::SignOut => {
                if let (Ok(auth), Some(token)) = (self.auth(), self.session.get()) {
                    if let Err(err) = auth.sign_out(&token).await {
                        warn!("Provider sign-out failed: {err}");
                    }
                }
                self.session.set(None)?;
                println!("Signed out.");
            }
            AuthCommand::Whoami => match self.current_user().await {
                Some(user) => println!("Signed in as {}.", user.email.unwrap_or(user.id)),
                None => println!("Not signed in."),
            },
        }
        Ok(())
    }

    async fn run_dataset(&self, command: DatasetCommand) -> Result<()> {
        match command {
            DatasetCommand::Create(args) => self.create_dataset(args).await,
            DatasetCommand::List => {
                for dataset in self.client.list_datasets().await? {
                    let types: Vec<&str> =
                        dataset.data_types.iter().map(|t| t.as_str()).collect();
                    println!("{}  {}  [{}]", dataset.id, dataset.name, types.join(", "));
                }
                Ok(())
            }
            DatasetCommand::Show { dataset_id } => {
                let dataset = self.client.get_dataset(&dataset_id).await?;
                println!("{}  {}", dataset.id, dataset.name);
                if let Some(description) = &dataset.description {
                    println!("{description}");
                }
                for version in self.client.list_versions(&dataset_id).await? {
                    println!(
                        "  v{}  {}  {}",
                        version.version,
                        version.id,
                        version.status.as_deref().unwrap_or("-")
                    );
                }
                Ok(())
            }
        }
    }

    async fn create_dataset(&self, args: CreateArgs) -> Result<()> {
        let mut form = CreateDatasetForm::new(args.name, args.description);
        if !args.data_types.is_empty() {
            form.data_types = args.data_types.into_iter().collect();
        }
        form.connector = args.source;
        form.source_uri = args.source_uri;
        if let Some(target_output) = args.target_output {
            form.target_output = target_output;
        }

        let mut files = Vec::with_capacity(args.files.len());
        for path in &args.files {
            files.push(LocalFile::from_path(path)?);
        }
        if let Some(notice) = form.attach_files(files) {
            println!("{notice}");
        }
        if form.connector != ConnectorKind::LocalUpload && form.source_uri.is_none() {
            println!(
                "No connection string given for {}; expected something like {}",
                form.connector,
                form.connector.placeholder()
            );
        }

        let user = self.current_user().await;
        let storage = self.storage();
        let mut saga = CreateSaga::new(&self.client, storage.as_ref());
        match saga.run(user.as_ref(), &form).await {
            Ok(outcome) => {
                println!(
                    "Created dataset {} (version v{}).",
                    outcome.dataset.id, outcome.version.version
                );
                println!("Curation view: {}", outcome.curate_path);
                Ok(())
            }
            Err(err) => match saga.furthest_completed() {
                Some(step) => bail!("{err} (workflow stopped after the {step} step)"),
                None => Err(err.into()),
            },
        }
    }

    async fn run_version(&self, command: VersionCommand) -> Result<()> {
        match command {
            VersionCommand::Create {
                dataset_id,
                target_output,
            } => {
                let target_output: serde_json::Map<String, serde_json::Value> =
                    serde_json::from_str(target_output.trim())
                        .context("Invalid target output configuration")?;
                let version = self
                    .client
                    .create_version(&dataset_id, &crate::model::VersionCreate { target_output })
                    .await?;
                println!("Created version v{} ({}).", version.version, version.id);
                println!("Version view: /datasets/{dataset_id}/versions/{}", version.id);
            }
            VersionCommand::Show {
                dataset_id,
                version_id,
            } => {
                let workspace =
                    VersionWorkspace::open(self.client.clone(), dataset_id, version_id).await?;
                println!("Curating: {}", workspace.dataset().name);
                println!("Sources:");
                for source in workspace.sources() {
                    println!("  {}  {}", source.source_type, source.source_uri);
                }
                println!("Assets:");
                for asset in workspace.assets() {
                    println!(
                        "  {}  {}  {}",
                        asset.uri,
                        asset.media_type,
                        asset.status.as_deref().unwrap_or("-")
                    );
                }
                println!("Jobs:");
                for job in workspace.jobs() {
                    println!(
                        "  {}  {}  {}",
                        job.id,
                        job.job_type,
                        job.status.as_deref().unwrap_or("-")
                    );
                }
            }
            VersionCommand::AddAsset {
                dataset_id,
                version_id,
                uri,
                media_type,
            } => {
                let mut workspace =
                    VersionWorkspace::open(self.client.clone(), dataset_id, version_id).await?;
                workspace.add_asset(&uri, &media_type).await?;
                println!("Asset added ({} assets total).", workspace.assets().len());
            }
            VersionCommand::RunPipeline {
                dataset_id,
                version_id,
            } => {
                let mut workspace =
                    VersionWorkspace::open(self.client.clone(), dataset_id, version_id).await?;
                let job_id = workspace.run_pipeline().await?;
                println!("Pipeline running (job {job_id}).");
            }
        }
        Ok(())
    }

    async fn run_label(&self, command: LabelCommand) -> Result<()> {
        match command {
            LabelCommand::Save {
                dataset_id,
                version_id,
                asset_id,
                label,
            } => {
                let user = self.current_user().await;
                let workflow = LabelingWorkflow::new(
                    self.client.clone(),
                    dataset_id,
                    version_id,
                    user.as_ref(),
                );
                workflow.save_label(&asset_id, &label).await?;
                println!("Saved.");
            }
            LabelCommand::Auto {
                dataset_id,
                version_id,
            } => {
                let user = self.current_user().await;
                let workflow = LabelingWorkflow::new(
                    self.client.clone(),
                    dataset_id,
                    version_id,
                    user.as_ref(),
                );
                workflow.run_auto_label().await?;
                println!("Auto labels created.");
            }
        }
        Ok(())
    }
}

fn show_connectors() {
    for kind in ConnectorKind::ALL {
        if kind.placeholder().is_empty() {
            println!("{}", kind.label());
        } else {
            println!("{}  ({})", kind.label(), kind.placeholder());
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli() {
        Cli::command().debug_assert();
    }
}

use std::fs;
use std::io;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::archive;
use crate::assets::{self, AssetRecord};
use crate::config::DEFAULT_PAGE_LIMIT;
use crate::domain::{Category, Credentials, Project};
use crate::error::ExportError;
use crate::glitch::{AssetSession, GlitchClient};
use crate::layout::{Layout, is_plain_component};

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub no_assets: bool,
    pub no_skip: bool,
    pub force_assets: bool,
    pub no_unpack: bool,
    pub keep_archives: bool,
    pub page_limit: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            no_assets: false,
            no_skip: false,
            force_assets: false,
            no_unpack: false,
            keep_archives: false,
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectAction {
    Skipped,
    Downloaded,
    Unpacked,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssetSummary {
    pub live: usize,
    pub downloaded: usize,
    pub failed: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectOutcome {
    pub category: Category,
    pub id: String,
    pub title: String,
    pub action: ProjectAction,
    pub path: Option<String>,
    pub error: Option<String>,
    pub assets: Option<AssetSummary>,
}

impl ProjectOutcome {
    fn new(category: Category, project: &Project, action: ProjectAction) -> Self {
        Self {
            category,
            id: project.id.clone(),
            title: project.title().to_string(),
            action,
            path: None,
            error: None,
            assets: None,
        }
    }

    fn failed(category: Category, project: &Project, err: &ExportError) -> Self {
        Self {
            error: Some(err.to_string()),
            ..Self::new(category, project, ProjectAction::Failed)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub category: Category,
    pub url: String,
    #[serde(skip)]
    pub projects: Vec<Project>,
    pub count: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub listings: Vec<Listing>,
    pub items: Vec<ProjectOutcome>,
    pub finished_at: String,
}

impl ExportResult {
    pub fn count(&self, action: ProjectAction) -> usize {
        self.items.iter().filter(|item| item.action == action).count()
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

fn note(sink: &dyn ProgressSink, message: impl Into<String>) {
    sink.event(ProgressEvent {
        message: message.into(),
        elapsed: None,
    });
}

pub struct App<C: GlitchClient> {
    layout: Layout,
    client: C,
}

impl<C: GlitchClient> App<C> {
    pub fn new(layout: Layout, client: C) -> Self {
        Self { layout, client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Lists and downloads active projects, then archived ones.
    pub fn export(
        &self,
        credentials: &Credentials,
        options: &ExportOptions,
        sink: &dyn ProgressSink,
    ) -> ExportResult {
        let mut listings = Vec::new();
        let mut items = Vec::new();

        for category in Category::ALL {
            let listing = self.list_projects(credentials, category, options.page_limit, sink);
            let noun = match category {
                Category::Active => "projects",
                Category::Archived => "archived projects",
            };
            note(sink, format!("Downloading {} {noun}...", listing.projects.len()));
            for project in &listing.projects {
                items.push(self.download_project(credentials, project, category, options, sink));
            }
            listings.push(listing);
        }

        ExportResult {
            listings,
            items,
            finished_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Fetches one category's project list. Any failure yields an empty list.
    pub fn list_projects(
        &self,
        credentials: &Credentials,
        category: Category,
        limit: u32,
        sink: &dyn ProgressSink,
    ) -> Listing {
        note(sink, format!("Fetching {category} project list..."));
        let url = self.client.listing_url(credentials, category, limit);
        match self.client.list_projects(credentials, category, limit) {
            Ok(projects) => {
                info!(%category, count = projects.len(), "project list fetched");
                if projects.len() as u64 >= u64::from(limit) {
                    warn!(%category, limit, "project list hit the page limit and may be truncated");
                }
                Listing {
                    category,
                    url,
                    count: projects.len(),
                    projects,
                    error: None,
                }
            }
            Err(err) => {
                warn!(%category, %url, error = %err, "project listing failed");
                match &err {
                    ExportError::ListingParse(_) => note(sink, "could not parse JSON"),
                    _ => note(sink, format!("could not open {url}")),
                }
                note(sink, err.to_string());
                Listing {
                    category,
                    url,
                    projects: Vec::new(),
                    count: 0,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    pub fn download_project(
        &self,
        credentials: &Credentials,
        project: &Project,
        category: Category,
        options: &ExportOptions,
        sink: &dyn ProgressSink,
    ) -> ProjectOutcome {
        let title = project.title();
        if !is_plain_component(title) {
            let err = ExportError::InvalidTitle(title.to_string());
            warn!(project = %project.id, error = %err, "skipping project");
            note(sink, format!("ERROR: {err}"));
            return ProjectOutcome::failed(category, project, &err);
        }

        let dest = self.layout.project_dir(category, title);
        if dest.as_std_path().exists() {
            if !options.no_skip {
                note(sink, format!("Skipping {title} (already downloaded)"));
                return ProjectOutcome {
                    path: Some(dest.to_string()),
                    ..ProjectOutcome::new(category, project, ProjectAction::Skipped)
                };
            }
            debug!(project = title, "removing previous download");
            if let Err(err) = Layout::remove_project(&dest) {
                note(sink, format!("ERROR: {err}"));
                return ProjectOutcome::failed(category, project, &err);
            }
        }

        match self.materialize(credentials, project, category, &dest, options, sink) {
            Ok(mut outcome) => {
                if outcome.action == ProjectAction::Unpacked && !options.no_assets {
                    outcome.assets =
                        Some(self.fetch_assets(&dest, title, options.force_assets, sink));
                }
                outcome
            }
            Err(err) => {
                warn!(project = title, %category, error = %err, "project download failed");
                note(sink, format!("ERROR: {err}"));
                ProjectOutcome::failed(category, project, &err)
            }
        }
    }

    fn materialize(
        &self,
        credentials: &Credentials,
        project: &Project,
        category: Category,
        dest: &Utf8Path,
        options: &ExportOptions,
        sink: &dyn ProgressSink,
    ) -> Result<ProjectOutcome, ExportError> {
        let title = project.title();
        self.layout.ensure_dirs(category)?;
        let archive_path = self.layout.archive_path(title);

        note(sink, format!("\nDownloading '{title}'..."));
        let start = Instant::now();
        let bytes = self
            .client
            .download_archive(credentials, project, archive_path.as_std_path())?;
        info!(project = title, bytes, "archive downloaded");
        sink.event(ProgressEvent {
            message: format!("Downloaded {bytes} bytes"),
            elapsed: Some(start.elapsed()),
        });

        if options.no_unpack {
            return Ok(ProjectOutcome {
                path: Some(archive_path.to_string()),
                ..ProjectOutcome::new(category, project, ProjectAction::Downloaded)
            });
        }

        note(sink, "Unpacking...");
        self.unpack(&archive_path, category, title, dest)?;

        if !options.keep_archives {
            if let Err(err) = fs::remove_file(archive_path.as_std_path()) {
                warn!(archive = %archive_path, error = %err, "could not remove archive");
            }
        }

        Ok(ProjectOutcome {
            path: Some(dest.to_string()),
            ..ProjectOutcome::new(category, project, ProjectAction::Unpacked)
        })
    }

    /// Extracts into a scratch dir beside `dest` and renames its `app` root into place.
    fn unpack(
        &self,
        archive_path: &Utf8Path,
        category: Category,
        title: &str,
        dest: &Utf8Path,
    ) -> Result<(), ExportError> {
        let scratch = tempfile::Builder::new()
            .prefix(".unpack-")
            .tempdir_in(self.layout.category_dir(category).as_std_path())
            .map_err(|err| ExportError::Filesystem(err.to_string()))?;
        let app_dir = archive::extract_app(archive_path.as_std_path(), scratch.path(), title)?;
        fs::rename(&app_dir, dest.as_std_path())
            .map_err(|err| ExportError::Filesystem(format!("move to {dest}: {err}")))
    }

    /// Reads `.glitch-assets` from an unpacked project and downloads every live asset.
    pub fn fetch_assets(
        &self,
        project_dir: &Utf8Path,
        title: &str,
        relax_tls: bool,
        sink: &dyn ProgressSink,
    ) -> AssetSummary {
        let mut summary = AssetSummary::default();
        let manifest_path = Layout::manifest_path(project_dir);

        let text = match fs::read_to_string(manifest_path.as_std_path()) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(project = title, "no asset manifest");
                note(sink, format!("No .glitch-assets file for {title}"));
                return summary;
            }
            Err(err) => {
                let err = ExportError::Filesystem(err.to_string());
                return self.manifest_failed(summary, title, &err, sink);
            }
        };
        let live = match assets::parse_manifest(&text) {
            Ok(records) => assets::reduce(records),
            Err(err) => return self.manifest_failed(summary, title, &err, sink),
        };
        summary.live = live.len();

        let assets_dir = Layout::assets_dir(project_dir);
        if let Err(err) = fs::create_dir_all(assets_dir.as_std_path()) {
            let err = ExportError::Filesystem(format!("create {assets_dir}: {err}"));
            return self.manifest_failed(summary, title, &err, sink);
        }
        note(sink, format!("Downloading all assets into {assets_dir}..."));

        // Dropped at the end of this function, which also ends any relaxed TLS.
        let session = match self.client.asset_session(relax_tls) {
            Ok(session) => session,
            Err(err) => return self.manifest_failed(summary, title, &err, sink),
        };

        for record in live.iter() {
            match fetch_asset(&*session, record, &assets_dir, sink) {
                Ok(()) => summary.downloaded += 1,
                Err(err) => {
                    warn!(
                        project = title,
                        asset = %record.uuid,
                        error = %err,
                        "asset download failed"
                    );
                    note(
                        sink,
                        format!("error getting asset {}: {err}", asset_label(record)),
                    );
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    fn manifest_failed(
        &self,
        mut summary: AssetSummary,
        title: &str,
        err: &ExportError,
        sink: &dyn ProgressSink,
    ) -> AssetSummary {
        warn!(project = title, error = %err, "asset manifest unusable");
        note(sink, format!("glitch-assets error for {title}: {err}"));
        summary.error = Some(err.to_string());
        summary
    }
}

fn fetch_asset(
    session: &dyn AssetSession,
    record: &AssetRecord,
    assets_dir: &Utf8Path,
    sink: &dyn ProgressSink,
) -> Result<(), ExportError> {
    let name = record.name.as_deref().ok_or_else(|| ExportError::IncompleteAsset {
        uuid: record.uuid.clone(),
        field: "name",
    })?;
    let url = record.url.as_deref().ok_or_else(|| ExportError::IncompleteAsset {
        uuid: record.uuid.clone(),
        field: "url",
    })?;
    if !is_plain_component(name) {
        return Err(ExportError::InvalidAssetName(name.to_string()));
    }

    let url = assets::repair_url(url);
    let dest: Utf8PathBuf = assets_dir.join(name);
    note(sink, format!("Downloading {name} from {url}..."));
    session.download(&url, dest.as_std_path())?;
    Ok(())
}

fn asset_label(record: &AssetRecord) -> &str {
    record.name.as_deref().unwrap_or(&record.uuid)
}

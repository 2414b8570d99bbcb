//! Command dispatch: one function per subcommand.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use tracing::{debug, instrument};

use crate::application::{Outcome, TreeTable};
use crate::cli::args::{Cli, Commands, ConfigCommands, CreatePosition, MovePosition};
use crate::cli::confirm::TerminalConfirm;
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{ActionKind, CreateAction, NodeId, NodeKind, Target, TreeError};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::{AutoConfirm, Confirmation, RemoteSource};
use crate::infrastructure::{HttpSource, MemorySource, ReqwestTransport};

const DATA_FILE: &str = "treetable.json";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn execute_command(cli: &Cli) -> CliResult<()> {
    let project_dir = cli.project_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let mut settings = Settings::load(Some(&project_dir))?;
    if let Some(locale) = &cli.locale {
        settings.locale = locale.clone();
    }
    debug!("settings: {settings:?}");

    match &cli.command {
        Some(Commands::Show { depth }) => _show(cli, settings, &project_dir, *depth).await,
        Some(Commands::Children { node, reload }) => {
            _children(cli, settings, &project_dir, node, *reload).await
        }
        Some(Commands::Create {
            position,
            name,
            anchor,
            kind,
        }) => _create(cli, settings, &project_dir, *position, name, anchor, kind.as_deref()).await,
        Some(Commands::Update { id, name, kind }) => {
            _update(cli, settings, &project_dir, id, name, kind.as_deref()).await
        }
        Some(Commands::Delete { id, yes }) => _delete(cli, settings, &project_dir, id, *yes).await,
        Some(Commands::Move {
            id,
            target,
            position,
        }) => _move(cli, settings, &project_dir, id, target, *position).await,
        Some(Commands::Locales { code, check }) => _locales(&settings, code.as_deref(), *check),
        Some(Commands::Config { command }) => _config(command, &settings, &project_dir),
        Some(Commands::Completion { shell }) => {
            _completion(*shell);
            Ok(())
        }
        None => Ok(()),
    }
}

/// One CLI invocation's tree-table plus the data file it persists to.
struct Session {
    container: ServiceContainer,
    table: TreeTable,
    store: Option<(Arc<MemorySource>, PathBuf)>,
}

impl Session {
    fn open(
        cli: &Cli,
        settings: Settings,
        project_dir: &Path,
        confirmation: Arc<dyn Confirmation>,
    ) -> CliResult<Self> {
        let (source, store) = if cli.remote {
            let (Some(source_url), Some(crud_url)) = (&settings.source_url, &settings.crud_url)
            else {
                return Err(CliError::Usage(
                    "--remote needs source_url and crud_url in the configuration".to_string(),
                ));
            };
            let transport = ReqwestTransport::new(HTTP_TIMEOUT).map_err(TreeError::from)?;
            let http = HttpSource::new(transport, source_url.clone(), crud_url.clone())
                .with_root_id(settings.root_id.clone());
            let source: Arc<dyn RemoteSource> = Arc::new(http);
            (source, None)
        } else {
            let path = cli
                .file
                .clone()
                .unwrap_or_else(|| project_dir.join(DATA_FILE));
            let memory = Arc::new(MemorySource::from_file(&path)?);
            let source: Arc<dyn RemoteSource> = memory.clone();
            (source, Some((memory, path)))
        };

        let container = ServiceContainer::new(settings, source, confirmation)?;
        let table = container.table();
        Ok(Self {
            container,
            table,
            store,
        })
    }

    fn target(&self, raw: &str) -> Target {
        if raw == self.container.settings.root_id {
            Target::Root
        } else {
            Target::node(raw)
        }
    }

    fn label(&self, action: ActionKind) -> String {
        self.table
            .locale()
            .action_label(action)
            .map(String::from)
            .unwrap_or_else(|| action.to_string())
    }

    /// Translate a tree error into its localized CLI form.
    fn fail(&self, error: TreeError) -> CliError {
        CliError::Tree {
            message: self.table.message_for(&error),
            source: error,
        }
    }

    async fn expand(&self, depth: Option<usize>) -> CliResult<usize> {
        self.table.expand_all(depth).await.map_err(|e| self.fail(e))
    }

    fn save(&self) -> CliResult<()> {
        if let Some((memory, path)) = &self.store {
            memory.save(path)?;
            debug!("saved {}", path.display());
        }
        Ok(())
    }
}

fn kind_or_default(kind: Option<&str>) -> NodeKind {
    kind.map(NodeKind::new).unwrap_or_default()
}

#[instrument(skip(cli, settings))]
async fn _show(
    cli: &Cli,
    settings: Settings,
    project_dir: &Path,
    depth: Option<usize>,
) -> CliResult<()> {
    let session = Session::open(cli, settings, project_dir, Arc::new(AutoConfirm(false)))?;
    let count = session.expand(depth).await?;
    debug!("show: {count} nodes loaded");
    let root_label = session.container.settings.root_id.clone();
    output::info(&session.table.render(&root_label));
    Ok(())
}

#[instrument(skip(cli, settings))]
async fn _children(
    cli: &Cli,
    settings: Settings,
    project_dir: &Path,
    node: &str,
    reload: bool,
) -> CliResult<()> {
    let session = Session::open(cli, settings, project_dir, Arc::new(AutoConfirm(false)))?;
    let target = session.target(node);
    if !target.is_root() {
        session.expand(None).await?;
    }
    let children = session
        .table
        .load_children(&target, reload)
        .await
        .map_err(|e| session.fail(e))?;
    let types = &session.container.settings.types;
    for child in children {
        let icon = types.get(&child.kind).map(String::as_str).unwrap_or(" ");
        output::child_row(icon, &child);
    }
    Ok(())
}

#[instrument(skip(cli, settings))]
async fn _create(
    cli: &Cli,
    settings: Settings,
    project_dir: &Path,
    position: CreatePosition,
    name: &str,
    anchor: &str,
    kind: Option<&str>,
) -> CliResult<()> {
    let session = Session::open(cli, settings, project_dir, Arc::new(AutoConfirm(true)))?;
    session.expand(None).await?;
    let action = CreateAction::from(position);
    let outcome = session
        .table
        .create(action, &session.target(anchor), name, kind_or_default(kind))
        .await
        .map_err(|e| session.fail(e))?;
    if let Outcome::Created { id, .. } = outcome {
        output::node_action(&session.label(action.into()), name, &id);
    }
    session.save()
}

#[instrument(skip(cli, settings))]
async fn _update(
    cli: &Cli,
    settings: Settings,
    project_dir: &Path,
    id: &str,
    name: &str,
    kind: Option<&str>,
) -> CliResult<()> {
    let session = Session::open(cli, settings, project_dir, Arc::new(AutoConfirm(true)))?;
    session.expand(None).await?;
    let id = NodeId::from(id);
    let kind = match kind {
        Some(k) => NodeKind::new(k),
        None => session
            .table
            .get(&id)
            .map(|n| n.kind)
            .ok_or_else(|| session.fail(TreeError::unknown_node(&id)))?,
    };
    session
        .table
        .update(&id, name, kind)
        .await
        .map_err(|e| session.fail(e))?;
    output::node_action(&session.label(ActionKind::Update), name, &id);
    session.save()
}

#[instrument(skip(cli, settings))]
async fn _delete(
    cli: &Cli,
    settings: Settings,
    project_dir: &Path,
    id: &str,
    yes: bool,
) -> CliResult<()> {
    let confirmation: Arc<dyn Confirmation> = if yes {
        Arc::new(AutoConfirm(true))
    } else {
        Arc::new(TerminalConfirm)
    };
    let session = Session::open(cli, settings, project_dir, confirmation)?;
    session.expand(None).await?;
    let outcome = session
        .table
        .delete(&NodeId::from(id))
        .await
        .map_err(|e| session.fail(e))?;
    match outcome {
        Outcome::Deleted { id, removed } => {
            output::node_removed(&session.label(ActionKind::Delete), &id, removed);
            session.save()
        }
        _ => {
            output::warning(&session.table.locale().cancel);
            Ok(())
        }
    }
}

#[instrument(skip(cli, settings))]
async fn _move(
    cli: &Cli,
    settings: Settings,
    project_dir: &Path,
    id: &str,
    target: &str,
    position: MovePosition,
) -> CliResult<()> {
    let session = Session::open(cli, settings, project_dir, Arc::new(AutoConfirm(true)))?;
    session.expand(None).await?;
    let outcome = session
        .table
        .move_node(&NodeId::from(id), &session.target(target), position.into())
        .await
        .map_err(|e| session.fail(e))?;
    if let Outcome::Moved { plan } = outcome {
        output::node_moved(&plan);
    }
    session.save()
}

fn _locales(settings: &Settings, code: Option<&str>, check: bool) -> CliResult<()> {
    let catalog = settings.catalog()?;
    match code {
        Some(code) => {
            if check {
                catalog.validate(code).map_err(crate::application::ApplicationError::from)?;
            }
            let locale = catalog.resolve(code);
            let rendered = toml::to_string_pretty(&locale)
                .map_err(|e| CliError::Usage(format!("render locale {code}: {e}")))?;
            output::info(&rendered);
        }
        None => {
            output::header(&format!("Locales (default: {})", catalog.default_code()));
            let mut incomplete = Vec::new();
            for code in catalog.codes() {
                let missing = catalog.missing_keys(code).unwrap_or_default();
                output::locale_status(code, &missing);
                if !missing.is_empty() {
                    incomplete.push(code.to_string());
                }
            }
            if check && !incomplete.is_empty() {
                return Err(CliError::InvalidArgs(format!(
                    "incomplete locales: {}",
                    incomplete.join(", ")
                )));
            }
        }
    }
    Ok(())
}

fn _config(command: &ConfigCommands, settings: &Settings, project_dir: &Path) -> CliResult<()> {
    match command {
        ConfigCommands::Show => output::info(&settings.to_toml()?),
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            match global_config_path() {
                Some(global) => output::config_path("global:", &global),
                None => output::warning("no config directory on this platform"),
            }
            output::config_path("local:", &local_config_path(project_dir));
        }
    }
    Ok(())
}

fn _completion(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use rustic_viewer_core::{get_sorted_image_files, vertical_tabs, FsLister, TabRow};
use rustic_viewer_session::{FileStorage, SessionPersistence, StoredSession};
use rustic_viewer_settings::PreferencesStore;
use rustic_viewer_store::TabStore;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "RUSTIC_VIEWER_LOG";

#[derive(Parser)]
#[command(
    name = "rustic-viewer-cli",
    about = "Inspect and edit Rustic Viewer tab sessions",
    author,
    version
)]
struct Cli {
    /// 指定工作區根目錄；預設為目前目錄。 / Workspace root (defaults to current directory).
    #[arg(long, global = true, value_name = "PATH")]
    workspace: Option<PathBuf>,
    /// 輸出除錯記錄。 / Emit debug logs on stderr.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 列出目錄中的影像（自然排序）。 / List a directory's images in natural order.
    List(ListArgs),
    /// 在儲存的工作階段中開啟影像。 / Open images into the saved session.
    Open(OpenArgs),
    /// 檢視或管理儲存的工作階段。 / Inspect or manage the saved session.
    #[command(subcommand)]
    Session(SessionCommand),
    /// 顯示目前偏好設定。 / Print the effective preferences.
    Preferences,
}

#[derive(Args)]
struct ListArgs {
    /// 要列出的資料夾。 / Directory to list.
    #[arg(value_name = "DIR")]
    directory: PathBuf,
}

#[derive(Args)]
struct OpenArgs {
    /// 影像檔案路徑。 / Image files to open.
    #[arg(required = true, value_name = "FILE")]
    images: Vec<PathBuf>,
    /// 每個影像都開在新分頁。 / Open every image in its own tab.
    #[arg(long)]
    new_tab: bool,
}

#[derive(Subcommand)]
enum SessionCommand {
    /// 顯示分頁列表。 / Print the restored tab list.
    Show,
    /// 將舊版格式升級並寫回。 / Upgrade a legacy session in place.
    Migrate,
    /// 刪除儲存的工作階段。 / Delete the saved session.
    Clear,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli {
        workspace,
        verbose,
        command,
    } = Cli::parse();
    init_logging(verbose);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    match command {
        Commands::List(args) => runtime.block_on(execute_list(args)),
        Commands::Open(args) => {
            let workspace_root = resolve_workspace(workspace)?;
            runtime.block_on(execute_open(args, &workspace_root))
        }
        Commands::Session(subcommand) => {
            let workspace_root = resolve_workspace(workspace)?;
            runtime.block_on(execute_session_command(subcommand, &workspace_root))
        }
        Commands::Preferences => {
            let workspace_root = resolve_workspace(workspace)?;
            show_preferences(&workspace_root)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn execute_list(args: ListArgs) -> Result<()> {
    let directory = resolve_input_path(&args.directory)?;
    let directory = path_to_string(&directory)?;
    let images = get_sorted_image_files(&FsLister, &directory)
        .await
        .with_context(|| format!("failed to list {directory}"))?;
    for image in images {
        println!("{image}");
    }
    Ok(())
}

async fn execute_open(args: OpenArgs, workspace_root: &Path) -> Result<()> {
    let preferences = load_preferences(workspace_root)?;
    let persistence = session_persistence(workspace_root, &preferences)?;
    let mut store = TabStore::new(Arc::new(FsLister), preferences.preferences())
        .with_persistence(persistence);
    store.restore_session().await;

    for image in &args.images {
        let path = path_to_string(&resolve_input_path(image)?)?;
        let id = store
            .open_image(&path, args.new_tab)
            .await
            .with_context(|| format!("failed to open {path}"))?;
        debug!(tab = %id, path = %path, "opened image");
    }
    store.shutdown().await;
    print_tabs(&store);
    Ok(())
}

async fn execute_session_command(command: SessionCommand, workspace_root: &Path) -> Result<()> {
    let preferences = load_preferences(workspace_root)?;
    let persistence = session_persistence(workspace_root, &preferences)?;
    match command {
        SessionCommand::Show => {
            let mut store = TabStore::new(Arc::new(FsLister), preferences.preferences())
                .with_persistence(persistence);
            if store.restore_session().await {
                print_tabs(&store);
            } else {
                println!("No saved session");
            }
            Ok(())
        }
        SessionCommand::Migrate => {
            let stored = persistence
                .read_stored()
                .context("failed to read saved session")?;
            match stored {
                None => println!("No saved session"),
                Some(StoredSession::Current(_)) => println!("Session already up to date"),
                Some(StoredSession::Legacy(_)) => {
                    let migrated = persistence
                        .try_parse_session()
                        .await
                        .context("failed to migrate saved session")?;
                    let tabs = migrated.map_or(0, |session| session.single_tabs.len());
                    println!("Migrated session ({tabs} tabs)");
                }
            }
            Ok(())
        }
        SessionCommand::Clear => {
            persistence
                .clear()
                .context("failed to delete saved session")?;
            println!("Cleared saved session");
            Ok(())
        }
    }
}

fn show_preferences(workspace_root: &Path) -> Result<()> {
    let store = load_preferences(workspace_root)?;
    let json = serde_json::to_string_pretty(store.preferences())
        .context("failed to serialize preferences")?;
    println!("{json}");
    Ok(())
}

fn print_tabs(store: &TabStore) {
    let state = store.state();
    if state.is_empty() {
        println!("No tabs");
        return;
    }
    for row in vertical_tabs(state) {
        match row {
            TabRow::Comparison { label, active, .. } => {
                println!("{} {label}", marker(active));
            }
            TabRow::Single {
                label,
                active,
                parent: Some((_, slot)),
                ..
            } => println!("{}   [{}] {label}", marker(active), slot + 1),
            TabRow::Single { label, active, .. } => println!("{} {label}", marker(active)),
        }
    }
}

fn marker(active: bool) -> char {
    if active {
        '*'
    } else {
        ' '
    }
}

fn load_preferences(workspace_root: &Path) -> Result<PreferencesStore> {
    let path = preferences_path(workspace_root);
    PreferencesStore::load(&path)
        .with_context(|| format!("failed to load preferences from {}", path.display()))
}

fn session_persistence(
    workspace_root: &Path,
    preferences: &PreferencesStore,
) -> Result<SessionPersistence> {
    let prefs = preferences.preferences();
    let root = state_dir(workspace_root).join("sessions");
    std::fs::create_dir_all(&root)
        .with_context(|| format!("failed to create {}", root.display()))?;
    Ok(SessionPersistence::new(
        Arc::new(FileStorage::new(root)),
        Arc::new(FsLister),
        prefs.session.storage_key.clone(),
    )
    .with_limits(prefs.tab_limits()))
}

fn state_dir(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".rustic-viewer")
}

fn preferences_path(workspace_root: &Path) -> PathBuf {
    state_dir(workspace_root).join("preferences.json")
}

fn path_to_string(path: &Path) -> Result<String> {
    match path.to_str() {
        Some(path) => Ok(path.replace('\\', "/")),
        None => bail!("path '{}' is not valid UTF-8", path.display()),
    }
}

fn resolve_workspace(workspace: Option<PathBuf>) -> Result<PathBuf> {
    match workspace {
        Some(path) => resolve_input_path(&path),
        None => std::env::current_dir().context("determine current directory"),
    }
}

fn resolve_input_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("determine current directory")?
            .join(path))
    }
}

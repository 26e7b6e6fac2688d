//! note-client: keeps a local text file in sync with a note on the notes API.
//!
//! Edit the file with any editor; changes are saved a second after you stop
//! typing, and edits made elsewhere are pulled back into the file.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use note_client::command::HELP;
use note_client::config::{default_config_dir, expand_tilde};
use note_client::{Config, FileEvent, FileSurface, FileWatcher, HttpStore, UserCommand};
use note_sync::{ControllerHandle, NoteId, SyncController};

#[derive(Parser, Debug)]
#[command(name = "note-client")]
#[command(about = "Sync a local text file with a note")]
struct Args {
    /// Local file that holds the note content
    #[arg(short, long, default_value = "note.txt")]
    file: String,

    /// Note to open: a bare id or any URL containing one
    #[arg(short, long)]
    note: Option<String>,

    /// Base URL of the notes API
    #[arg(long, env = "NOTE_API_BASE")]
    api_base: Option<String>,

    /// Authorization header value (selects private notes)
    #[arg(long, env = "NOTE_AUTH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Directory containing config.json
    #[arg(long, env = "NOTE_CONFIG_DIR")]
    config_dir: Option<String>,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging - respects RUST_LOG env var, defaults to info (or debug with --verbose)
    let default_filter = if args.verbose {
        "debug,note_client=debug,note_sync=debug"
    } else {
        "info,note_client=info,note_sync=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Resolve the note up front so a typo fails before anything is written.
    let initial_note = args
        .note
        .as_deref()
        .map(NoteId::find_in_path)
        .transpose()
        .context("--note does not contain a note id")?;

    let config_dir = args
        .config_dir
        .as_deref()
        .map(expand_tilde)
        .unwrap_or_else(default_config_dir);
    let config = Config::load(&config_dir)?.with_overrides(args.api_base, args.token);

    let file_path = expand_tilde(&args.file);

    info!("Starting note-client");
    info!("Note file: {:?}", file_path);
    info!("API base: {}", config.api_base);
    if config.auth_token.is_some() {
        info!("Using authorization token (private mode)");
    }

    let store = HttpStore::new(&config.api_base, config.auth_token.clone(), config.request_timeout())
        .context("Failed to build HTTP client")?;
    let surface = Arc::new(FileSurface::new(file_path.clone()));

    let (controller, handle) =
        SyncController::new(store, Arc::clone(&surface), config.timing.to_sync_config());
    let controller_task = tokio::spawn(controller.run());

    open_initial_note(&handle, &surface, initial_note).await?;

    // Watch only after the initial content is in place.
    let mut watcher = FileWatcher::new(&file_path)?;
    info!("Watching {:?}", watcher.file_path());

    let mut stdin = spawn_stdin_reader();

    eprintln!("{}", HELP);
    info!("Running. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            Some(event) = watcher.event_rx().recv() => {
                on_file_event(&handle, &surface, event).await;
            }

            Some(line) = stdin.recv() => {
                if !on_input_line(&handle, &line).await {
                    break;
                }
            }

            // Handle graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!("Shutting down");
    if let Err(e) = handle.shutdown().await {
        warn!("Controller already stopped: {}", e);
    }
    controller_task.await.context("Controller task panicked")?;
    Ok(())
}

/// Pick the note to edit at startup.
///
/// An explicit note is loaded. Otherwise text already in the file becomes a
/// new note, and an empty file starts a new empty note.
async fn open_initial_note(
    handle: &ControllerHandle,
    surface: &FileSurface,
    initial_note: Option<NoteId>,
) -> Result<()> {
    if let Some(id) = initial_note {
        info!("Opening note {}", id);
        handle.load(id).await?;
        return Ok(());
    }

    let existing = surface
        .read_content()
        .await
        .with_context(|| format!("Failed to read {}", surface.path().display()))?;

    if existing.is_empty() {
        handle.create_new().await?;
    } else {
        info!("Saving existing file content as a new note");
        handle.request_save(existing)?;
    }
    Ok(())
}

async fn on_file_event(handle: &ControllerHandle, surface: &FileSurface, event: FileEvent) {
    match event {
        FileEvent::Modified => match surface.read_content().await {
            Ok(content) => {
                if let Err(e) = handle.request_save(content) {
                    error!("Failed to queue save: {}", e);
                }
            }
            Err(e) => {
                error!("Failed to read {}: {}", surface.path().display(), e);
            }
        },
        FileEvent::Removed => {
            // Never turn a deleted file into an emptied note.
            warn!("{} was removed, note left unchanged", surface.path().display());
        }
    }
}

/// Read stdin lines on a plain thread.
///
/// A blocking stdin read cannot be cancelled, so it must not live on the
/// runtime's blocking pool or shutdown would wait for the next Enter.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    return;
                }
            }
        }
        debug!("stdin closed, commands disabled");
    });
    rx
}

/// Run one stdin command. Returns false when the user asked to quit.
async fn on_input_line(handle: &ControllerHandle, line: &str) -> bool {
    let command = match UserCommand::parse_line(line) {
        Ok(Some(command)) => command,
        Ok(None) => return true,
        Err(e) => {
            eprintln!("{}", e);
            return true;
        }
    };

    match command {
        UserCommand::New => {
            if let Err(e) = handle.create_new().await {
                error!("Failed to create note: {}", e);
            }
        }
        UserCommand::Load(id) => {
            if let Err(e) = handle.load(id).await {
                error!("Failed to open note: {}", e);
            }
        }
        UserCommand::ShowId => match handle.session().await {
            Ok(session) => match session.note_id {
                Some(id) => println!("{}", id),
                None => println!("(not saved yet)"),
            },
            Err(e) => error!("Failed to read session: {}", e),
        },
        UserCommand::Help => eprintln!("{}", HELP),
        UserCommand::Quit => return false,
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["note-client"]).unwrap();
        assert_eq!(args.file, "note.txt");
        assert!(args.note.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_flags() {
        let args = Args::try_parse_from([
            "note-client",
            "--file",
            "/tmp/todo.txt",
            "--note",
            "https://notes.lhamacorp.com/01HZX3K9M2Q8R7T6V5W4Y3Z2A1",
            "--api-base",
            "http://localhost:8080/api/notes",
            "--verbose",
        ])
        .unwrap();
        assert_eq!(args.file, "/tmp/todo.txt");
        assert_eq!(args.api_base.as_deref(), Some("http://localhost:8080/api/notes"));
        assert!(args.verbose);
    }
}

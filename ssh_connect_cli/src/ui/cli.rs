use std::io::{stdout, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use log::info;
use ssh_connect_core::{
    Application, ConnectionProfile, FileBackend, MemoryBackend, ProfileBackend, ProfileDraft,
    ProfileStore, Sequencer, SequencerConfig, SessionHandle,
};

/// Enable raw mode via crossterm, throwing an error if it fails.
/// This disables line-buffering and echo on all supported platforms.
fn set_raw_mode() -> anyhow::Result<()> {
    enable_raw_mode().context("Failed to enable raw mode")
}

/// Restore normal terminal mode.
/// crossterm internally remembers the previous mode and restores it.
fn restore_mode() {
    let _ = disable_raw_mode();
}

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "ssh-connect", version, subcommand_required = true)]
pub struct Args {
    /// Directory holding the saved profiles (defaults to the user config dir)
    #[arg(long, global = true)]
    pub store_dir: Option<PathBuf>,
    /// Keep profiles in memory only for this run
    #[arg(long, global = true, conflicts_with = "store_dir")]
    pub ephemeral: bool,
    /// Milliseconds between simulated session lines
    #[arg(long, global = true, default_value_t = 800)]
    pub cadence_ms: u64,
    /// Seed for the host-key fingerprint generator
    #[arg(long, global = true)]
    pub seed: Option<u64>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Save a new connection profile
    Save {
        /// Server IPv4 address
        #[arg(long)]
        ip: String,
        /// Login name
        #[arg(long)]
        username: String,
        /// Display name (defaults to user@ip)
        #[arg(long, default_value = "")]
        name: String,
        /// SSH port (default 22)
        #[arg(long, default_value = "")]
        port: String,
    },
    /// List saved profiles, newest first
    List,
    /// Delete a saved profile
    Delete {
        /// Profile id
        id: String,
    },
    /// Open a simulated session for a saved profile or ad-hoc parameters
    Connect {
        /// Saved profile id or name
        #[arg(conflicts_with_all = ["ip", "username"])]
        profile: Option<String>,
        /// Server IPv4 address
        #[arg(long)]
        ip: Option<String>,
        /// Login name
        #[arg(long)]
        username: Option<String>,
        /// SSH port (default 22)
        #[arg(long, default_value = "")]
        port: String,
    },
}

fn open_backend(args: &Args) -> anyhow::Result<Box<dyn ProfileBackend + Send>> {
    if args.ephemeral {
        return Ok(Box::new(MemoryBackend::new()));
    }
    let backend = match &args.store_dir {
        Some(dir) => FileBackend::in_dir(dir)
            .with_context(|| format!("Cannot use store directory {}", dir.display()))?,
        None => FileBackend::new().context("Cannot locate config directory")?,
    };
    info!("Profiles file: {}", backend.path().display());
    Ok(Box::new(backend))
}

fn build_application(args: &Args) -> anyhow::Result<Application> {
    let store = ProfileStore::open(open_backend(args)?);
    let config = SequencerConfig {
        cadence: Duration::from_millis(args.cadence_ms),
    };
    let sequencer = match args.seed {
        Some(seed) => Sequencer::with_seed(config, seed),
        None => Sequencer::new(config),
    };
    Ok(Application::new(store, sequencer))
}

pub async fn run_cli(args: Args) -> anyhow::Result<()> {
    let mut app = build_application(&args)?;

    match args.command {
        Command::Save {
            ip,
            username,
            name,
            port,
        } => {
            let draft = ProfileDraft::from_form(&name, &ip, &username, &port)?;
            let profile = app.on_save(draft)?;
            println!("Saved {} [{}]", profile, profile.id);
        }
        Command::List => print_profiles(app.profiles()),
        Command::Delete { id } => println!("{}", delete_profile(&mut app, &id)),
        Command::Connect {
            profile,
            ip,
            username,
            port,
        } => {
            let session = match profile {
                Some(key) => {
                    let profile = app
                        .store()
                        .find(&key)
                        .cloned()
                        .ok_or_else(|| anyhow!("No saved profile with id or name '{key}'"))?;
                    app.on_connect(&profile)
                }
                None => {
                    let draft = ProfileDraft::from_form(
                        "",
                        ip.as_deref().unwrap_or_default(),
                        username.as_deref().unwrap_or_default(),
                        &port,
                    )?;
                    app.on_quick_connect(draft)?
                }
            };
            run_session_view(&mut app, session, set_raw_mode, wait_for_close_keys).await?;
        }
    }
    Ok(())
}

fn print_profiles(profiles: &[ConnectionProfile]) {
    if profiles.is_empty() {
        println!("No saved connections.");
        return;
    }
    println!("Saved Connections ({})", profiles.len());
    for profile in profiles {
        println!(
            "{}  {:<24} {:<28} {}",
            profile.id,
            profile.name,
            profile.target(),
            profile.created_at.format("%b %-d, %H:%M")
        );
    }
}

/// Deletes the profile with `id` and describes what happened.
fn delete_profile(app: &mut Application, id: &str) -> String {
    let Some(name) = app.store().get(id).map(|p| p.name.clone()) else {
        return format!("No saved profile with id '{id}'");
    };
    app.on_delete(id);
    format!("{name} has been removed")
}

/// Renders a session until the user closes it with Ctrl+A then 'x'.
///
/// Lines keep arriving while the view is open; closing it cancels whatever
/// has not been emitted yet. The session is closed on every exit path.
async fn run_session_view(
    app: &mut Application,
    session: SessionHandle,
    enter_raw_mode: fn() -> anyhow::Result<()>,
    wait_for_close: fn() -> std::io::Result<()>,
) -> anyhow::Result<()> {
    println!("{}", session.title());
    println!("Press Ctrl+A then 'x' to close the session.");

    let mut feed = session.subscribe();
    let printer = tokio::spawn(async move {
        let mut out = stdout();
        while let Some(line) = feed.next().await {
            // The prompt keeps the cursor on its own line.
            let _ = if line.is_password_prompt() {
                write!(out, "{} ", line.text)
            } else {
                write!(out, "{}\r\n", line.text)
            };
            let _ = out.flush();
        }
    });

    let closed = match enter_raw_mode() {
        Ok(()) => {
            let closed = tokio::task::spawn_blocking(wait_for_close).await;
            restore_mode();
            closed
                .context("Key reader task failed")
                .and_then(|read| read.context("Failed to read terminal input"))
        }
        Err(e) => Err(e),
    };

    app.on_session_close();
    let _ = printer.await;
    println!();
    info!("Session view closed.");

    closed
}

fn wait_for_close_keys() -> std::io::Result<()> {
    let mut last_was_ctrl_a = false;
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                last_was_ctrl_a = true;
            }
            KeyCode::Char('x') if last_was_ctrl_a => return Ok(()),
            _ => last_was_ctrl_a = false,
        }
    }
}

use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc::UnboundedReceiver;

use ades_lib::{
    api::{EventHistory, Registration},
    config::ClientConfig,
    notify::{ClientEvent, Notification, NotificationLevel},
    trigger::{TriggerOutcome, TriggerPhase},
    utils::init_logging,
    AppState,
};

#[derive(Parser)]
#[command(name = "ades", about = "Autonomous Drone Emergency System client")]
struct Cli {
    /// Directory holding config.json and the stored session.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        password: String,
    },
    /// Sign in and store the access token.
    Login {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored credentials.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// List past emergency events.
    History,
    /// Press and hold the emergency trigger.
    Trigger {
        /// Let go after this many milliseconds instead of holding to the end.
        #[arg(long)]
        release_after_ms: Option<u64>,
    },
    /// Print real-time alerts until interrupted.
    Listen,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            log::error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.data_dir {
        Some(dir) => {
            let mut config = ClientConfig::load_from(dir)?;
            config.apply_env();
            config
        }
        None => ClientConfig::load()?,
    };
    init_logging(config.debug);
    if config.static_location.is_none() {
        log::warn!("no static_location configured; location will be unavailable");
    }

    let (state, mut events) = AppState::for_terminal(config)?;
    let code = match cli.command {
        Command::Register {
            name,
            user_id,
            password,
        } => {
            let registration = Registration {
                name,
                user_id,
                password,
            };
            match state.api.register(&registration).await {
                Ok(()) => {
                    println!("Registration successful! Please log in.");
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    eprintln!("{}", err.user_message("Registration failed."));
                    ExitCode::FAILURE
                }
            }
        }
        Command::Login { user_id, password } => match state.api.login(&user_id, &password).await {
            Ok(_) => {
                println!("Login successful!");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("{}", err.user_message("Login failed."));
                ExitCode::FAILURE
            }
        },
        Command::Logout => {
            state.api.logout().context("failed to clear stored session")?;
            println!("Logged out successfully.");
            ExitCode::SUCCESS
        }
        Command::Whoami => match state.session.current() {
            Some(identity) => {
                println!("{}", identity.user_id);
                ExitCode::SUCCESS
            }
            None => {
                eprintln!("Not logged in.");
                ExitCode::FAILURE
            }
        },
        Command::History => history(&state).await,
        Command::Trigger { release_after_ms } => {
            trigger(&state, &mut events, release_after_ms.map(Duration::from_millis)).await
        }
        Command::Listen => listen(&state, &mut events).await?,
    };

    state.shutdown().await;
    Ok(code)
}

async fn history(state: &AppState) -> ExitCode {
    let Some(identity) = state.session.current() else {
        eprintln!("User ID not found. Please log in.");
        return ExitCode::FAILURE;
    };

    match state.api.list_events(&identity.user_id).await {
        Ok(events) if events.is_empty() => {
            println!("No events found for your user ID.");
            ExitCode::SUCCESS
        }
        Ok(events) => {
            for event in events {
                println!(
                    "#{:<5} {}  {:>9.4} {:>10.4}  {:<11}  {}",
                    event.id,
                    event.triggered_at_display(),
                    event.latitude,
                    event.longitude,
                    event.status.as_str(),
                    event.position().maps_url()
                );
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", err.user_message("Failed to fetch event history."));
            ExitCode::FAILURE
        }
    }
}

async fn trigger(
    state: &AppState,
    events: &mut UnboundedReceiver<ClientEvent>,
    release_after: Option<Duration>,
) -> ExitCode {
    state.location.refresh();
    state.location.settled().await;

    if state.trigger.begin_hold().await.is_err() {
        drain_notifications(events);
        return ExitCode::FAILURE;
    }

    if let Some(delay) = release_after {
        let controller = state.trigger.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            controller.end_hold().await;
        });
    }

    let mut released = false;
    while let Some(event) = events.recv().await {
        match event {
            ClientEvent::Progress(percent) => {
                print!("\rHolding... {percent:>3}%");
                let _ = io::stdout().flush();
            }
            ClientEvent::PhaseChanged(snapshot) => match snapshot.phase {
                TriggerPhase::Cancelled => released = true,
                TriggerPhase::Idle if released => {
                    println!("\nReleased early; nothing was sent.");
                    return ExitCode::SUCCESS;
                }
                _ => {}
            },
            ClientEvent::Notification(notification) => {
                println!();
                print_notification(&notification);
            }
            ClientEvent::Outcome(TriggerOutcome::Sent { .. }) => return ExitCode::SUCCESS,
            ClientEvent::Outcome(TriggerOutcome::Failed { .. }) => return ExitCode::FAILURE,
            _ => {}
        }
    }
    ExitCode::FAILURE
}

async fn listen(
    state: &AppState,
    events: &mut UnboundedReceiver<ClientEvent>,
) -> Result<ExitCode> {
    state.alerts.connect(state.config.ws_endpoint.clone()).await;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ClientEvent::Notification(notification)) => print_notification(&notification),
                Some(ClientEvent::ChannelStatus(status)) => println!("WebSocket: {status:?}"),
                Some(_) => {}
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                break;
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn drain_notifications(events: &mut UnboundedReceiver<ClientEvent>) {
    while let Ok(event) = events.try_recv() {
        if let ClientEvent::Notification(notification) = event {
            print_notification(&notification);
        }
    }
}

fn print_notification(notification: &Notification) {
    let tag = match notification.level {
        NotificationLevel::Info => "info",
        NotificationLevel::Success => "ok",
        NotificationLevel::Error => "error",
    };
    match &notification.text {
        Some(text) => println!("[{tag}] {}: {text}", notification.title),
        None => println!("[{tag}] {}", notification.title),
    }
}

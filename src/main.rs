//! Chapar - terminal client for the post scheduling backend
#![allow(clippy::uninlined_format_args)]

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use tokio::runtime::Runtime;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use chapar::api::media::UploadFile;
use chapar::cache::ChannelCache;
use chapar::models::PostId;
use chapar::nav::NoopNavigator;
use chapar::session::Session;
use chapar::views::status::PostAction;
use chapar::views::{ChatView, ComposerView, LoginView, OtpLoginView, StatusKind, StatusView};
use chapar::{Config, paths};

fn main() -> Result<()> {
    let command = parse_args()?;

    // The TUI owns the terminal, so it logs to a file
    if matches!(command, Command::Run) {
        init_file_logging()?;
        return chapar::app::run();
    }

    // RUST_LOG=debug for verbose output
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match command {
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Version => {
            print_version();
            Ok(())
        }
        Command::Config => show_config(),
        command => Runtime::new()?.block_on(run_cli(command)),
    }
}

fn init_file_logging() -> Result<()> {
    let path = paths::log_path()?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

/// CLI commands
enum Command {
    Run,
    Login {
        email: String,
    },
    LoginOtp {
        email: String,
    },
    Logout,
    Whoami,
    Channels,
    Post {
        content: String,
        channels: Vec<u64>,
        media: Vec<u64>,
        at: Option<String>,
    },
    Posts {
        kind: StatusKind,
        page: u64,
    },
    Action {
        action: PostAction,
        id: PostId,
    },
    Media,
    Upload {
        path: PathBuf,
    },
    Chat {
        message: String,
        session: Option<Uuid>,
    },
    Prompts,
    Config,
    Help,
    Version,
}

/// Value after `flag`, if present
fn flag_value<'a>(args: &'a [String], flags: &[&str]) -> Option<&'a str> {
    args.iter()
        .position(|a| flags.contains(&a.as_str()))
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn id_list(value: Option<&str>) -> Result<Vec<u64>> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().map_err(|_| anyhow!("Not a numeric id: {s}")))
        .collect()
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() == 1 {
        return Ok(Command::Run);
    }

    let arg = |i: usize, what: &str| {
        args.get(i)
            .cloned()
            .ok_or_else(|| anyhow!("Missing {what}\nRun 'chapar --help' for usage"))
    };

    match args[1].as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help),
        "-v" | "--version" | "version" => Ok(Command::Version),
        "config" => Ok(Command::Config),

        "login" => Ok(Command::Login {
            email: arg(2, "email")?,
        }),
        "login-otp" => Ok(Command::LoginOtp {
            email: arg(2, "email")?,
        }),
        "logout" => Ok(Command::Logout),
        "whoami" | "me" => Ok(Command::Whoami),
        "channels" => Ok(Command::Channels),

        "post" => {
            let content = arg(2, "post content")?;
            let channels = id_list(flag_value(&args, &["--to", "-t"]))?;
            if channels.is_empty() {
                return Err(anyhow!("Pick at least one channel with --to <ids>"));
            }
            Ok(Command::Post {
                content,
                channels,
                media: id_list(flag_value(&args, &["--media", "-m"]))?,
                at: flag_value(&args, &["--at", "-a"]).map(str::to_string),
            })
        }

        "posts" => {
            let name = args.get(2).map_or("pending", String::as_str);
            let kind = StatusKind::from_str(name)
                .ok_or_else(|| anyhow!("Unknown list: {name}\nUse pending, scheduled, sent or failed"))?;
            let page = flag_value(&args, &["--page", "-p"])
                .and_then(|s| s.parse().ok())
                .unwrap_or(1);
            Ok(Command::Posts { kind, page })
        }

        name @ ("retry" | "cancel" | "delete") => {
            let action = match name {
                "retry" => PostAction::Retry,
                "cancel" => PostAction::Cancel,
                _ => PostAction::Delete,
            };
            let id = arg(2, "post id")?
                .parse()
                .map_err(|_| anyhow!("Post id must be a number"))?;
            Ok(Command::Action { action, id })
        }

        "media" => Ok(Command::Media),
        "upload" => Ok(Command::Upload {
            path: PathBuf::from(arg(2, "file path")?),
        }),

        "chat" => {
            let message = arg(2, "message")?;
            let session = flag_value(&args, &["--session", "-s"])
                .map(|s| s.parse().map_err(|_| anyhow!("Not a session id: {s}")))
                .transpose()?;
            Ok(Command::Chat { message, session })
        }
        "prompts" => Ok(Command::Prompts),

        other => Err(anyhow!(
            "Unknown command: {other}\nRun 'chapar --help' for usage"
        )),
    }
}

fn print_help() {
    let config_path =
        paths::config_path().map_or_else(|_| "Unknown".to_string(), |p| p.display().to_string());

    println!(
        r#"{}
📮 Chapar - schedule posts to your Telegram and Bale channels

USAGE:
    chapar                             Launch TUI
    chapar [COMMAND]

COMMANDS:
    login <email>                      Log in (password read from stdin)
    login-otp <email>                  Log in with an emailed code
    logout                             End the session
    whoami                             Show the logged-in user

    channels                           List channels
    post <content> [OPTIONS]           Send or schedule a post
      Options:
        -t, --to <ids>                 Comma-separated channel ids
        -m, --media <ids>              Comma-separated gallery media ids
        -a, --at <time>                "2026-05-01 18:30", "18:30" or "+2h"
      Examples:
        chapar post "Hello" --to 1,2
        chapar post "Tonight" --to 1 --at "+3h"

    posts [pending|scheduled|sent|failed] [--page n]
    retry <id>                         Retry a failed post
    cancel <id>                        Cancel a scheduled post
    delete <id>                        Delete a failed post

    media                              List gallery media and storage use
    upload <path>                      Upload a file to the gallery

    chat <message> [--session <id>]    Ask the AI assistant
    prompts                            List saved prompts

    config                             Show config and session paths

OPTIONS:
    -h, --help                         Show this help message
    -v, --version                      Show version information

CONFIG:
    {}
"#,
        chapar::LOGO,
        config_path
    );
}

fn print_version() {
    println!("chapar {}", chapar::VERSION);
}

fn show_config() -> Result<()> {
    let config = Config::load()?;
    println!("Config:   {}", paths::config_path()?.display());
    println!("Session:  {}", paths::session_path()?.display());
    println!("Log:      {}", paths::log_path()?.display());
    println!("Backend:  {}", config.base_url());
    println!("Theme:    {}", config.theme);
    Ok(())
}

/// Read one line, echoing the prompt to stderr
fn prompt(label: &str) -> Result<String> {
    eprint!("{label}: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Report a form's banner; an error banner fails the command
fn report(state: &chapar::views::FormState) -> Result<()> {
    match state.banner() {
        Some((msg, false)) => {
            println!("✓ {msg}");
            Ok(())
        }
        Some((msg, true)) => Err(anyhow!("{msg}")),
        None => match state {
            chapar::views::FormState::FieldErrors(errors) => Err(anyhow!(
                "{}",
                errors
                    .iter()
                    .map(|(field, msg)| format!("{field}: {msg}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            )),
            _ => Ok(()),
        },
    }
}

async fn run_cli(command: Command) -> Result<()> {
    let config = Config::load()?;
    let session = Session::open(&config, Arc::new(NoopNavigator))?;
    let api = &session.api;

    let result = match command {
        Command::Login { email } => {
            let mut view = LoginView::new();
            view.email = email;
            view.password = prompt("Password")?;
            view.submit(api).await;
            report(&view.state)
        }
        Command::LoginOtp { email } => {
            let mut view = OtpLoginView::new();
            view.email = email;
            view.submit(api).await;
            report(&view.state)?;
            view.otp = prompt("Code")?;
            view.submit(api).await;
            report(&view.state)
        }
        Command::Logout => {
            if let Err(err) = api.logout().await {
                eprintln!("⚠ {}", err.user_message("Logout request failed"));
            }
            session.forget()?;
            println!("✓ Logged out");
            return Ok(());
        }
        Command::Whoami => {
            let user = api.me().await?;
            println!("{}", user.display_name());
            if let Some(email) = &user.email {
                println!("  {email}");
            }
            if user.needs_verification() {
                println!("  ⚠ email not verified");
            }
            Ok(())
        }
        Command::Channels => {
            let channels = api.channels().await?;
            if channels.is_empty() {
                println!("No channels yet.");
            }
            for channel in channels {
                let mark = if channel.is_verified { "✓" } else { "✗" };
                println!("  #{:<4} {} {mark}", channel.id, channel.label());
            }
            Ok(())
        }
        Command::Post {
            content,
            channels,
            media,
            at,
        } => {
            let mut view = ComposerView::new();
            view.content = content;
            for id in channels {
                view.toggle_channel(id);
            }
            if !media.is_empty() {
                let items: Vec<_> = api
                    .media_list()
                    .await?
                    .into_iter()
                    .filter(|m| media.contains(&m.id))
                    .collect();
                if items.len() != media.len() {
                    return Err(anyhow!("Some media ids were not found in the gallery"));
                }
                view.set_has_media(true);
                view.set_gallery_media(items);
            }
            view.schedule = at.unwrap_or_default();
            view.submit(api, None).await;
            report(&view.state)
        }
        Command::Posts { kind, page } => {
            let cache = ChannelCache::new();
            let mut view = StatusView::new(kind).with_page_size(config.page_size());
            view.page = page.max(1);
            view.load(api, &cache).await;
            if let Some(err) = &view.error {
                return Err(anyhow!("{err}"));
            }
            println!("{} (page {}/{})", kind.title(), view.page, view.total_pages.max(1));
            println!("{}", "─".repeat(60));
            for post in &view.posts {
                println!(
                    "\n{} #{} → {}",
                    post.status.emoji(),
                    post.id,
                    cache.labels(&post.channels).join(", ")
                );
                if let Some(at) = post.scheduled_time_display() {
                    println!("  at {at}");
                }
                println!("  {}", post.text());
                if let Some(err) = &post.error_message {
                    println!("  ⚠ {err}");
                }
            }
            Ok(())
        }
        Command::Action { action, id } => {
            action.run(api, id).await?;
            println!("✓ Post #{id}: {} done", action.label());
            Ok(())
        }
        Command::Media => {
            let (list, storage) = tokio::join!(api.media_list(), api.storage_info());
            if let Ok(storage) = storage {
                println!(
                    "Storage: {:.1} / {:.1} MB ({:.0}%)\n",
                    storage.used_space_mb,
                    storage.total_space_mb,
                    storage.percent()
                );
            }
            for item in list? {
                println!(
                    "  #{:<4} {} {}  {}",
                    item.id,
                    item.media_type.emoji(),
                    item.title,
                    item.size_display()
                );
            }
            Ok(())
        }
        Command::Upload { path } => {
            let file = UploadFile::read(&path).await?;
            let uploaded = api.upload_media(&file, None).await?;
            match uploaded {
                Some(media) => println!("✓ Uploaded as #{}", media.id),
                None => println!("✓ Uploaded {}", file.file_name),
            }
            Ok(())
        }
        Command::Chat { message, session } => {
            let mut view = ChatView::new();
            if let Some(id) = session {
                view.select(id);
            }
            view.input = message;
            view.send(api).await;
            if let Some(err) = &view.error {
                return Err(anyhow!("{err}"));
            }
            if let Some(reply) = view.messages.last() {
                println!("{}", reply.content);
            }
            if session.is_none()
                && let Some(id) = view.current
            {
                eprintln!("(session {id})");
            }
            Ok(())
        }
        Command::Prompts => {
            for prompt in api.prompts().await? {
                println!("  {} {}", prompt.id, prompt.title);
            }
            Ok(())
        }
        Command::Run | Command::Config | Command::Help | Command::Version => Ok(()),
    };

    session.persist()?;
    result
}

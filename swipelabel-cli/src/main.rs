use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use swipelabel_cli::{
    FileSessionCache, HttpReviewApi, SessionDriver, SessionEvent, SessionSnapshot, SessionState,
};
use swipelabel_core::{Credentials, ReviewScore};

/// Swipelabel: review your batch of images from the terminal
#[derive(Parser, Debug)]
#[command(name = "swipelabel")]
#[command(about = "Review your batch of images from the terminal", long_about = None)]
#[command(version)]
struct Cli {
    /// Base URL of the review server
    #[arg(long, env = "SWIPELABEL_SERVER", default_value = "http://localhost:3000")]
    server: String,

    /// Directory holding the local session cache
    #[arg(long, env = "SWIPELABEL_STATE_DIR", default_value = ".swipelabel")]
    state_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and load your review queue
    Login(LoginArgs),
    /// Like or dislike images one at a time
    Review,
    /// Show the cached session without contacting the server
    Status,
    /// Reload the queue from the server and reset the session counter
    NewSession,
    /// Forget the signed-in reviewer and all cached state
    Logout,
}

#[derive(Parser, Debug)]
struct LoginArgs {
    /// Reviewer email
    #[arg(long)]
    email: String,

    /// Password (if not provided, read from SWIPELABEL_PASSWORD or stdin)
    #[arg(long, env = "SWIPELABEL_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

type Driver = SessionDriver<HttpReviewApi, FileSessionCache>;

/// Print `label` and read one trimmed line. `None` at end of input.
fn prompt(label: &str) -> Result<Option<String>> {
    eprint!("{}", label);
    std::io::stderr().flush().ok();

    let mut line = String::new();
    let read = std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn print_banner(driver: &Driver) {
    if let Some(message) = driver.banner() {
        eprintln!("! {}", message);
    }
}

fn describe(state: &SessionState) -> String {
    match state {
        SessionState::Unauthenticated { .. } => "Not signed in.".to_string(),
        SessionState::Authenticating { email } => format!("Signing in as {}...", email),
        SessionState::Fetching { email, .. } => format!("Loading images for {}...", email),
        SessionState::Reviewing {
            email,
            images,
            index,
            reviewed,
            ..
        } => format!(
            "{}: image {} of {} ({} reviewed this session)",
            email,
            index + 1,
            images.len(),
            reviewed
        ),
        SessionState::Complete { email, reviewed } => format!(
            "{}: no images left to review ({} reviewed this session)",
            email, reviewed
        ),
    }
}

fn open_driver(cli: &Cli) -> Result<Driver> {
    let api = HttpReviewApi::new(&cli.server)?;
    Ok(SessionDriver::new(api, FileSessionCache::in_dir(&cli.state_dir)))
}

async fn run_login(cli: &Cli, args: &LoginArgs) -> Result<()> {
    let mut driver = open_driver(cli)?;
    driver.restore().await;
    if let Some(email) = driver.state().email().filter(|_| driver.state().is_signed_in()) {
        bail!("Already signed in as {}; run `swipelabel logout` first", email);
    }

    let password = match &args.password {
        Some(password) => password.clone(),
        None => prompt("Password: ")?.context("No password provided")?,
    };

    let state = driver
        .dispatch(SessionEvent::LoginRequested {
            credentials: Credentials {
                email: args.email.clone(),
                password,
            },
        })
        .await;
    let summary = describe(state);

    print_banner(&driver);
    if !driver.state().is_signed_in() {
        bail!("Login failed");
    }
    println!("{}", summary);
    Ok(())
}

async fn run_review(cli: &Cli) -> Result<()> {
    let mut driver = open_driver(cli)?;
    driver.restore().await;
    if !driver.state().is_signed_in() {
        bail!("Not signed in; run `swipelabel login --email <EMAIL>` first");
    }

    loop {
        println!("{}", describe(driver.state()));
        print_banner(&driver);

        let event = match driver.state().clone() {
            SessionState::Reviewing {
                images,
                index,
                image_url: Some(url),
                ..
            } => {
                if let Some(image) = images.get(index) {
                    println!("  id:  {}", image.id);
                    println!("  url: {}", url);
                }
                match prompt("[l]ike, [d]islike, [q]uit: ")?.as_deref() {
                    Some("l") | Some("like") => SessionEvent::DecisionMade {
                        score: ReviewScore::Like,
                    },
                    Some("d") | Some("dislike") => SessionEvent::DecisionMade {
                        score: ReviewScore::Dislike,
                    },
                    None | Some("q") | Some("quit") => break,
                    Some(other) => {
                        eprintln!("Unknown choice {:?}", other);
                        continue;
                    }
                }
            }
            SessionState::Reviewing { image_url: None, .. } => {
                match prompt("[r]etry loading the image, [q]uit: ")?.as_deref() {
                    Some("r") | Some("retry") => SessionEvent::ImageUrlRetryRequested,
                    None | Some("q") | Some("quit") => break,
                    Some(other) => {
                        eprintln!("Unknown choice {:?}", other);
                        continue;
                    }
                }
            }
            SessionState::Complete { .. } => {
                match prompt("[n]ew session, [q]uit: ")?.as_deref() {
                    Some("n") | Some("new") => SessionEvent::NewSessionRequested,
                    None | Some("q") | Some("quit") => break,
                    Some(other) => {
                        eprintln!("Unknown choice {:?}", other);
                        continue;
                    }
                }
            }
            _ => break,
        };

        driver.dispatch(event).await;
    }

    Ok(())
}

fn run_status(cli: &Cli) -> Result<()> {
    let cache = FileSessionCache::in_dir(&cli.state_dir);
    let snapshot = SessionSnapshot::load(&cache);

    match &snapshot.email {
        None => println!("Not signed in."),
        Some(email) => {
            println!("Signed in as {}", email);
            match &snapshot.images {
                Some(images) => println!(
                    "Cached queue: {} images, at position {}",
                    images.len(),
                    snapshot.index.unwrap_or(0) + 1
                ),
                None => println!("No cached queue"),
            }
        }
    }
    println!("Server: {}", cli.server);
    println!("Cache: {}", cache.path().display());
    Ok(())
}

async fn run_new_session(cli: &Cli) -> Result<()> {
    let mut driver = open_driver(cli)?;
    driver.restore().await;
    if !driver.state().is_signed_in() {
        bail!("Not signed in; run `swipelabel login --email <EMAIL>` first");
    }

    let state = driver.dispatch(SessionEvent::NewSessionRequested).await;
    let summary = describe(state);
    print_banner(&driver);
    println!("{}", summary);
    Ok(())
}

async fn run_logout(cli: &Cli) -> Result<()> {
    let mut driver = open_driver(cli)?;
    driver.dispatch(SessionEvent::LogoutRequested).await;
    println!("Signed out.");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Login(args) => run_login(&cli, args).await,
        Commands::Review => run_review(&cli).await,
        Commands::Status => run_status(&cli),
        Commands::NewSession => run_new_session(&cli).await,
        Commands::Logout => run_logout(&cli).await,
    }
}

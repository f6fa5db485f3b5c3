//! Main module for the Applemar bot CLI (`applemar`).
//!
//! Parses the command line, loads the configuration and persisted state, and
//! dispatches to the matching library operation.
//!
//! # Examples
//!
//! ```sh
//! applemar init
//! applemar ask "Têm o novo iPhone em stock?"
//! applemar chat --contact ana
//! applemar settings set --personality "Calorosa e objetiva."
//! applemar connect
//! ```

use applemar_bot::{
    commands::{Cli, Commands, SettingsCommand},
    config::{AppConfig, load_config_or_default},
    config_dir,
    connection::{self, DEFAULT_TICK},
    conversation::Origin,
    notify::ConsoleNotifier,
    reply::ReplyGenerator,
    notify::Notifier,
    session::{ChatSession, demo_contacts, filter_contacts, overview_stats},
    state::{self, AppState, StateStore, YamlStateStore},
};
use clap::Parser;
use crossterm::{
    ExecutableCommand,
    style::{Attribute, Color, SetAttribute, SetForegroundColor},
};
use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::OnceCell;
use std::{
    error::Error,
    fs,
    io::{Write, stdin, stdout},
    path::Path,
};
use tracing::{debug, info};

static TRACING: OnceCell<()> = OnceCell::new();

fn main() -> Result<(), Box<dyn Error>> {
    TRACING.get_or_init(|| {
        tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    });
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run())
}

/// Main asynchronous function of the CLI.
///
/// # Errors
///
/// Returns an error if the configuration or state cannot be loaded or saved,
/// or if the backend cannot be constructed. Reply generation itself never
/// fails.
async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => config_dir()?.join("config.yaml"),
    };

    dispatch(cli.command, &config_path).await
}

/// Load configuration and state, then run `command`.
async fn dispatch(command: Commands, config_path: &Path) -> Result<(), Box<dyn Error>> {
    let config = load_config_or_default(config_path)?;
    debug!("Config loaded: {:?}", config);
    let store = YamlStateStore::new(config.state_path()?);
    let mut app_state = store.load()?;
    let notifier = ConsoleNotifier;

    match command {
        Commands::Init => init()?,
        Commands::Ask {
            utterance,
            sample_history,
        } => {
            let generator = ReplyGenerator::from_config(&config)?;
            let history = if sample_history {
                ChatSession::seeded(demo_contacts().remove(0)).turns().to_vec()
            } else {
                Vec::new()
            };
            let reply = generator
                .generate_reply(&utterance, &history, &app_state.bot)
                .await;
            print_turn(&app_state.bot.name, Origin::Assistant, &reply)?;
        }
        Commands::Chat { contact } => {
            chat(&config, &app_state, &notifier, contact.as_deref()).await?;
        }
        Commands::Contacts { query } => {
            let contacts = demo_contacts();
            let query = query.unwrap_or_default();
            let matches = filter_contacts(&contacts, &query);
            if matches.is_empty() {
                println!("Nenhum contacto encontrado para \"{query}\"");
            }
            for contact in matches {
                println!(
                    "{:<16} {:<8} {}",
                    contact.name, contact.last_seen, contact.last_message
                );
            }
        }
        Commands::Settings(SettingsCommand::Show) => {
            print!("{}", serde_yaml::to_string(&app_state.bot)?);
        }
        Commands::Settings(SettingsCommand::Set(args)) => {
            let update = args.into();
            state::update_settings(&mut app_state, update, &store, &notifier)?;
        }
        Commands::Settings(SettingsCommand::ToggleAutoReply) => {
            state::toggle_auto_reply(&mut app_state, &store, &notifier)?;
        }
        Commands::Connect => {
            let bar = ProgressBar::new(100);
            bar.set_style(ProgressStyle::with_template(
                "A sincronizar {bar:40.yellow/white} {pos:>3}%",
            )?);
            connection::pair(&mut app_state, &store, &notifier, DEFAULT_TICK, |progress| {
                bar.set_position(u64::from(progress))
            })
            .await?;
            bar.finish_and_clear();
        }
        Commands::Disconnect => {
            connection::disconnect(&mut app_state, &store, &notifier)?;
        }
        Commands::Status => {
            println!("WhatsApp: {}", connection::status_label(&app_state));
            println!("Assistente: {}", app_state.bot.name);
            println!(
                "Respostas automáticas: {}",
                if app_state.bot.auto_reply_enabled {
                    "ativas"
                } else {
                    "desativadas"
                }
            );
            println!();
            for stat in overview_stats() {
                println!("{:<20} {:>7} {:>6}", stat.label, stat.value, stat.trend);
            }
        }
    }

    Ok(())
}

/// Interactive live chat with one contact, until `exit` or end of input.
async fn chat(
    config: &AppConfig,
    app_state: &AppState,
    notifier: &dyn Notifier,
    contact_query: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let contacts = demo_contacts();
    let contact = filter_contacts(&contacts, contact_query.unwrap_or_default())
        .into_iter()
        .next()
        .cloned()
        .ok_or("No contact matches that name")?;

    let generator = ReplyGenerator::from_config(config)?;
    let mut session = ChatSession::open(contact, notifier);
    let bot = &app_state.bot;

    println!("Conversa com {}", session.contact.name);
    for turn in session.turns() {
        let speaker = match turn.origin {
            Origin::Customer => session.contact.name.as_str(),
            Origin::Assistant => bot.name.as_str(),
        };
        print_turn(speaker, turn.origin, &turn.text)?;
    }

    loop {
        let mut out = stdout();
        out.execute(SetForegroundColor(Color::Green))?;
        write!(out, "\nVocê: ")?;
        out.execute(SetForegroundColor(Color::Reset))?;
        out.flush()?;

        let mut input = String::new();
        if stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim_end_matches(['\r', '\n']);

        if input.trim().eq_ignore_ascii_case("exit") {
            break;
        }

        match session.send(input, &generator, bot).await {
            Some(reply) => print_turn(&bot.name, Origin::Assistant, &reply.text)?,
            None if !input.trim().is_empty() => {
                info!("Auto-reply disabled; message recorded without answer");
            }
            None => {}
        }
    }

    Ok(())
}

fn print_turn(speaker: &str, origin: Origin, text: &str) -> Result<(), Box<dyn Error>> {
    let mut out = stdout();
    let color = match origin {
        Origin::Customer => Color::Green,
        Origin::Assistant => Color::Blue,
    };
    out.execute(SetForegroundColor(color))?;
    out.execute(SetAttribute(Attribute::Bold))?;
    write!(out, "{speaker}: ")?;
    out.execute(SetAttribute(Attribute::Reset))?;
    out.execute(SetForegroundColor(Color::Reset))?;
    writeln!(out, "{text}")?;
    out.flush()?;
    Ok(())
}

/// Creates the configuration directory with default config and state files.
///
/// Existing files are left untouched.
fn init() -> Result<(), Box<dyn Error>> {
    let config_dir = config_dir()?;
    info!("Creating config directory: {}", config_dir.display());
    fs::create_dir_all(&config_dir)?;

    let config_path = config_dir.join("config.yaml");
    if config_path.exists() {
        println!("Keeping existing {}", config_path.display());
    } else {
        info!("Creating config file: {}", config_path.display());
        fs::write(&config_path, serde_yaml::to_string(&AppConfig::default())?)?;
    }

    let store = YamlStateStore::new(config_dir.join("state.yaml"));
    if store.path().exists() {
        println!("Keeping existing {}", store.path().display());
    } else {
        store.save(&AppState::default())?;
    }

    println!("Set API_KEY in your environment to authenticate with the generation service.");
    Ok(())
}

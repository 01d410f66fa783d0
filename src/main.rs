use agenda::{Agenda, Config, Lookup, Session};
use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Context, Result};
use std::path::PathBuf;
use tracing::Level;

const DIVIDER_WIDTH: usize = 60;

#[derive(Parser)]
#[command(name = "agenda")]
#[command(about = "Import a conference agenda spreadsheet and look up its sessions")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to the config file (default: <config dir>/agenda/agenda.yml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the agenda database (overrides the config file)
    #[arg(short, long)]
    db: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the stored agenda with the rows of a spreadsheet
    Import {
        /// Agenda spreadsheet (.xls, .xlsx or .ods)
        file: PathBuf,
    },

    /// Show sessions matching a column value or a speaker
    Lookup {
        /// Column to match (date, time_start, time_end, session_title, location, description) or "speaker"
        column: String,

        /// Value to match, case-insensitive
        value: String,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Also list the speakers of each session
        #[arg(long)]
        speakers: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::resolve(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(db) = cli.db {
        config.database = db;
    }

    // Setup tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(log_level(&config, cli.verbose))
        .init();

    match cli.command {
        Commands::Import { file } => {
            // Reject a bad file before the database is touched
            let rows = agenda::spreadsheet::read_agenda(&file)
                .with_context(|| format!("Failed to read agenda from {}", file.display()))?;

            let agenda = Agenda::open(&config.database).context("Failed to open agenda database")?;
            let imported = agenda.import(&rows);
            agenda.close().context("Failed to close agenda database")?;
            let summary = imported.context("Import failed")?;

            println!(
                "Imported {} sessions, {} sub-sessions and {} speakers into {}",
                summary.sessions,
                summary.sub_sessions,
                summary.speakers,
                config.database.display()
            );
        }
        Commands::Lookup {
            column,
            value,
            json,
            speakers,
        } => {
            // Reject a bad column before the database is touched
            let lookup = Lookup::parse(&column, &value)?;

            let agenda = Agenda::open(&config.database).context("Failed to open agenda database")?;
            let rendered = render_lookup(&agenda, &lookup, json, speakers);
            agenda.close().context("Failed to close agenda database")?;
            print!("{}", rendered?);
        }
    }

    Ok(())
}

fn log_level(config: &Config, verbose: u8) -> Level {
    match verbose {
        0 => config
            .log_level
            .as_deref()
            .and_then(|l| l.parse().ok())
            .unwrap_or(Level::WARN),
        1 => Level::INFO,
        _ => Level::DEBUG,
    }
}

fn render_lookup(agenda: &Agenda, lookup: &Lookup, json: bool, with_speakers: bool) -> Result<String> {
    let sessions = agenda.lookup(lookup).context("Lookup failed")?;

    if json {
        let mut entries = Vec::with_capacity(sessions.len());
        for session in &sessions {
            let mut entry = serde_json::to_value(session)?;
            if with_speakers {
                let names: Vec<String> = agenda
                    .speakers_for(session.id)?
                    .into_iter()
                    .map(|s| s.speaker_name)
                    .collect();
                entry["speakers"] = serde_json::json!(names);
            }
            entries.push(entry);
        }
        return Ok(format!("{}\n", serde_json::to_string_pretty(&entries)?));
    }

    let mut out = String::new();
    for session in &sessions {
        let names = if with_speakers {
            Some(
                agenda
                    .speakers_for(session.id)?
                    .into_iter()
                    .map(|s| s.speaker_name)
                    .collect::<Vec<_>>(),
            )
        } else {
            None
        };
        out.push_str(&render_session(session, names.as_deref()));
    }

    let noun = if sessions.len() == 1 { "match" } else { "matches" };
    out.push_str(&format!("{} {}\n", sessions.len(), noun));
    Ok(out)
}

fn render_session(session: &Session, speakers: Option<&[String]>) -> String {
    let mut out = String::new();
    let title = if session.is_root() {
        session.session_title.bold().to_string()
    } else {
        format!("  {}", session.session_title.italic())
    };

    out.push_str(&format!("{}\n", session.date));
    out.push_str(&format!("{} - {}\n", session.time_start, session.time_end));
    out.push_str(&format!("{}\n", title));
    out.push_str(&format!("{}\n", session.location));
    out.push_str(&format!("{}\n", session.description));
    if let Some(speakers) = speakers.filter(|s| !s.is_empty()) {
        out.push_str(&format!("Speakers: {}\n", speakers.join(", ")));
    }
    out.push_str(&format!("{}\n", "-".repeat(DIVIDER_WIDTH)));
    out
}

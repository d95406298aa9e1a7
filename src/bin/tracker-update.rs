//! Command-line demo for the update engine: open a store, run a handful of
//! statements or a line-oriented update-text script against it, and print
//! what happened.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tracker_update_engine::{ontology::reference_ontology, Engine, EngineConfig};

/// Update-engine demo CLI.
#[derive(Parser)]
#[command(name = "tracker-update")]
#[command(version, about = "Demo CLI for the ontology-driven update engine", long_about = None)]
struct Cli {
    /// Path to the redb database file. Created if it does not exist.
    #[arg(long, global = true, default_value = "tracker-update.redb")]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs a small scripted sequence of statements against the reference
    /// ontology, printing instance counts as it goes.
    Demo,

    /// Parses and executes an update-text script, one `INSERT`/`DELETE`
    /// statement per line (see `sparql_text`), within a single transaction.
    Update {
        /// Path to a file containing the update-text script. Reads stdin if
        /// omitted.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Marks a volume mounted (`tracker:Volume` + `tracker:mountPoint` +
    /// `Available`).
    EnableVolume { udi: String, mount_path: String },

    /// Marks a volume unmounted and unavailable.
    DisableVolume { udi: String },

    /// Disables every known volume, e.g. at startup.
    DisableAllVolumes,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "tracker_update_engine=info".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut engine = Engine::open(&cli.db, reference_ontology(), EngineConfig::default())
        .with_context(|| format!("opening store at {}", cli.db.display()))?;

    match cli.command {
        Commands::Demo => run_demo(&mut engine)?,
        Commands::Update { file } => run_update(&mut engine, file)?,
        Commands::EnableVolume { udi, mount_path } => {
            engine.begin()?;
            engine.enable_volume(&udi, &mount_path)?;
            engine.commit()?;
            println!("enabled volume {udi} at {mount_path}");
        }
        Commands::DisableVolume { udi } => {
            engine.begin()?;
            engine.disable_volume(&udi)?;
            engine.commit()?;
            println!("disabled volume {udi}");
        }
        Commands::DisableAllVolumes => {
            engine.begin()?;
            engine.disable_all_volumes()?;
            engine.commit()?;
            println!("disabled all volumes");
        }
    }

    Ok(())
}

fn run_demo(engine: &mut Engine) -> Result<()> {
    engine.begin()?;
    engine.insert_statement(None, "http://example.com/doc1", "rdf:type", "nfo:Document")?;
    engine.insert_statement(None, "http://example.com/doc1", "nie:title", "Hello, World")?;
    engine.insert_statement(None, "http://example.com/doc1", "nfo:fileSize", "4096")?;
    engine.commit()?;

    let document = engine
        .ontology()
        .class_by_uri("nfo:Document")
        .expect("reference ontology registers nfo:Document");
    println!(
        "committed http://example.com/doc1; nfo:Document instances = {}",
        engine.ontology().instance_count(document)
    );
    Ok(())
}

fn run_update(engine: &mut Engine, file: Option<PathBuf>) -> Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?,
        None => std::io::read_to_string(std::io::stdin()).context("reading update text from stdin")?,
    };

    engine.begin()?;
    let blank_uris = engine.execute_update_text_returning_blank_nodes(&text)?;
    engine.commit()?;

    println!("committed {} line(s)", text.lines().count());
    for uri in blank_uris {
        println!("materialized blank node: {uri}");
    }
    Ok(())
}

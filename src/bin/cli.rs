use std::{path::PathBuf, sync::Arc};

use channelserve::{
    catalog::ProgramCatalog, config::Config, enrich::SlotEnricher, library::MediaLibrary,
    schedule::ScheduleEngine, store::ChannelStore,
};
use clap::Parser;
use jiff::{SignedDuration, Timestamp};
use serde::Serialize;

#[derive(Parser)]
struct Args {
    #[clap(long)]
    config: Option<PathBuf>,
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Parser)]
enum Command {
    /// Print the timetable of a channel
    Schedule {
        channel: String,
        #[clap(long)]
        hours: Option<u32>,
        /// Start of the listing, RFC 3339; defaults to now
        #[clap(long)]
        at: Option<Timestamp>,
    },
    /// Print what a channel is playing
    Now {
        channel: String,
        #[clap(long)]
        at: Option<Timestamp>,
    },
    /// List configured channels
    Channels,
    /// List the libraries found in the library directory
    Libraries,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "channelserve=warn".into()),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(args.config)?;
    let store = ChannelStore::open(&config.channels_file)?;

    let library = Arc::new(MediaLibrary::open(&config.library_dir)?);
    let engine = ScheduleEngine::new(
        ProgramCatalog::new(library.clone()),
        SlotEnricher::new(library.clone(), config.enrichment_timeout()),
    );

    match args.cmd {
        Command::Schedule { channel, hours, at } => {
            let channel = store.get(&channel).await?;
            let start = at.unwrap_or_else(Timestamp::now);
            let hours = hours.unwrap_or(config.schedule_hours);
            let end = start.checked_add(SignedDuration::from_hours(i64::from(hours)))?;
            print_json(&engine.schedule(&channel, start, end).await?)?;
        }
        Command::Now { channel, at } => {
            let channel = store.get(&channel).await?;
            let now = at.unwrap_or_else(Timestamp::now);
            match engine.now_playing(&channel, now).await? {
                Some(slot) => print_json(&slot)?,
                None => eprintln!("nothing is playing on {}", channel.id),
            }
        }
        Command::Channels => {
            print_json(&store.list().await)?;
        }
        Command::Libraries => {
            print_json(&library.library_refs())?;
        }
    }
    Ok(())
}

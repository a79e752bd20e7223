//! Lumen - drive the playback queue engine from the command line
use clap::{Parser, Subcommand};
use lumen_library::{FileProbe, FolderSiblings, MediaScanner};
use lumen_queue::{QueueController, QueueEntry, QueueEvent, QueueSettings, RepeatMode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Upper bound on waiting for background work between steps
const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "lumen")]
#[command(about = "Lumen playback queue engine", long_about = None)]
struct Cli {
    /// Settings file path
    #[arg(short, long, global = true, env = "LUMEN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a queue from a file or folder and step through it
    Play {
        /// Media file (expands to its folder) or folder to queue
        path: PathBuf,

        /// Turn shuffle on after loading
        #[arg(long)]
        shuffle: bool,

        /// Repeat mode: off, track or all
        #[arg(long)]
        repeat: Option<RepeatMode>,

        /// Number of entries to play through
        #[arg(long, default_value_t = 3)]
        steps: usize,

        /// Do not grow a single file into its folder
        #[arg(long)]
        no_expand: bool,
    },
    /// List the media files a folder would queue
    Scan {
        /// Directory path to scan
        path: PathBuf,

        /// Descend into symlinked folders
        #[arg(long)]
        follow_links: bool,

        /// Maximum folder depth to descend
        #[arg(long)]
        max_depth: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lumen_cli=info,lumen_queue=info,lumen_library=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            path,
            shuffle,
            repeat,
            steps,
            no_expand,
        } => {
            let mut settings = QueueSettings::load(cli.config.as_deref())?;
            if let Some(mode) = repeat {
                settings.repeat = mode;
            }
            if no_expand {
                settings.expand_to_siblings = false;
            }
            play(&path, settings, shuffle, steps).await?;
        }
        Commands::Scan {
            path,
            follow_links,
            max_depth,
        } => {
            let mut scanner = MediaScanner::new().follow_links(follow_links);
            if let Some(depth) = max_depth {
                scanner = scanner.max_depth(depth);
            }
            scan_directory(&scanner, &path)?;
        }
    }

    Ok(())
}

async fn play(
    path: &Path,
    settings: QueueSettings,
    shuffle: bool,
    steps: usize,
) -> anyhow::Result<()> {
    let entries = if path.is_dir() {
        MediaScanner::new()
            .scan_directory(path)?
            .into_iter()
            .map(QueueEntry::from_path)
            .collect::<Vec<_>>()
    } else if path.is_file() {
        vec![QueueEntry::from_path(path)]
    } else {
        anyhow::bail!("{} does not exist", path.display());
    };

    if entries.is_empty() {
        anyhow::bail!("no media files found in {}", path.display());
    }

    tracing::info!("Queueing {} entries from {}", entries.len(), path.display());

    let mut controller = QueueController::new(
        settings,
        Arc::new(FolderSiblings::new()),
        Arc::new(FileProbe::default()),
    );

    let first = entries[0].id();
    controller.load(entries, Some(&first));
    settle(&mut controller).await;

    if shuffle {
        controller.set_shuffle(true);
        settle(&mut controller).await;
    }

    print_queue(&controller);

    for _ in 0..steps {
        let result = controller.end_of_track();
        settle(&mut controller).await;

        if result.is_terminal {
            println!("-- end of queue");
            break;
        }
        if let Some(entry) = &result.entry {
            let verb = if result.is_restart { "restart" } else { "play" };
            println!("-- {} {}", verb, entry.source());
        }
        print_queue(&controller);
    }

    controller.shutdown();
    settle(&mut controller).await;
    Ok(())
}

/// Apply background completions until none are outstanding
async fn settle(controller: &mut QueueController) {
    loop {
        match tokio::time::timeout(SETTLE_TIMEOUT, controller.next_completion()).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(_) => {
                tracing::warn!("Background work still running after {:?}", SETTLE_TIMEOUT);
                break;
            }
        }
    }

    for event in controller.drain_events() {
        log_event(&event);
    }
}

fn log_event(event: &QueueEvent) {
    match event {
        QueueEvent::ExpansionCompleted { added } => {
            tracing::info!("Expanded queue with {} sibling entries", added);
        }
        QueueEvent::ExpansionFailed { message } => {
            tracing::warn!("Could not expand queue: {}", message);
        }
        QueueEvent::WarmupFailed { entry_id, message } => {
            tracing::warn!("Entry {} unavailable: {}", entry_id, message);
        }
        QueueEvent::PlaybackEnded => tracing::info!("Playback ended"),
        other => tracing::debug!("{:?}", other),
    }
}

fn print_queue(controller: &QueueController) {
    let snapshot = controller.snapshot();
    let warm = controller.warm_entries();

    println!(
        "queue v{} | {} entries | repeat {:?} | shuffle {}",
        snapshot.version,
        controller.entries().len(),
        controller.repeat(),
        if controller.store().is_shuffled() { "on" } else { "off" },
    );

    for (index, entry) in controller.entries().iter().enumerate() {
        let marker = if snapshot.current_index == Some(index) { '>' } else { ' ' };
        let buffer = if warm.iter().any(|w| w.id() == entry.id()) { '*' } else { ' ' };
        let missing = if entry.available { "" } else { " (unavailable)" };
        println!("{}{} {:>3}  {}{}", marker, buffer, index, entry.source(), missing);
    }
}

fn scan_directory(scanner: &MediaScanner, path: &Path) -> anyhow::Result<()> {
    tracing::info!("Scanning directory: {}", path.display());

    let files = scanner.scan_directory(path)?;
    for file in &files {
        println!("{}", file.display());
    }

    tracing::info!("Found {} media files", files.len());
    Ok(())
}

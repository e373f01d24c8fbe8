//! songflow - song workflow engine for a record label
//!
//! Moves songs through department stages with per-stage checklists,
//! permission checks, an audit trail and alerts.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use songflow::commands::{self, OutputFormat, SongFieldArgs};
use songflow::config::{self, SongflowPaths};
use songflow::mcp;
use songflow::models::{NewRecording, ADMIN_LEVEL};

#[derive(Parser)]
#[command(name = "songflow")]
#[command(author, version, about = "Song workflow engine: staged checklists, permissions, audit trail and alerts")]
struct Cli {
    /// Act as this user (id from `songflow user list`)
    #[arg(long = "as", global = true, value_name = "USER")]
    as_user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize songflow (first-time setup)
    Init,

    /// Manage users
    User {
        #[command(subcommand)]
        operation: UserCli,
    },

    /// Create, inspect and edit songs
    Song {
        #[command(subcommand)]
        operation: SongCli,
    },

    /// Move a song to another stage
    Transition {
        song_id: i64,

        /// Target stage (e.g. publishing, label_recording, archived)
        stage: String,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Hand a ready_for_digital song to the digital team
    SendToDigital {
        song_id: i64,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Archive a song
    Archive {
        song_id: i64,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Show a song's checklist
    Checklist {
        song_id: i64,

        /// Stage to show (defaults to the current stage)
        #[arg(short, long)]
        stage: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Flip a manual checklist item
    Toggle { item_id: i64 },

    /// Re-run automatic checklist validators
    Revalidate { song_id: i64 },

    /// Show a song's stage history
    History { song_id: i64 },

    /// List your alerts
    Alerts {
        /// Only unread alerts
        #[arg(short, long)]
        unread: bool,

        /// Mark all your alerts read
        #[arg(long)]
        mark_all: bool,
    },

    /// Mark an alert read
    Read { alert_id: i64 },

    /// Songs waiting on your department
    Queue,

    /// Songs past their stage deadline (managers)
    Overdue,

    /// Song counts by stage and priority
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Upload and review assets
    Asset {
        #[command(subcommand)]
        operation: AssetCli,
    },

    /// Add a note to a song, or list its notes when no text is given
    Note {
        song_id: i64,

        text: Option<String>,

        /// Record a sales pitch to this party
        #[arg(long)]
        pitched_to: Option<String>,
    },

    /// Manage works, splits, recordings and releases
    Catalog {
        #[command(subcommand)]
        operation: CatalogCli,
    },

    /// Start the JSON-RPC server on stdio
    Serve,
}

#[derive(Subcommand)]
enum UserCli {
    /// Add or update a user
    Add {
        id: String,
        name: String,

        /// publishing, label, marketing, digital or sales
        #[arg(short, long)]
        department: Option<String>,

        #[arg(short, long, default_value_t = 100)]
        level: u32,

        /// Shorthand for the administrator level
        #[arg(long)]
        admin: bool,
    },

    /// List users
    List,
}

#[derive(Subcommand)]
enum SongCli {
    /// Create a song in draft
    New {
        title: String,

        #[command(flatten)]
        fields: SongFieldArgs,
    },

    /// Show a song
    Show {
        song_id: i64,

        #[arg(long)]
        json: bool,
    },

    /// List songs you can see
    List {
        #[arg(short, long)]
        stage: Option<String>,
    },

    /// Edit song metadata
    Update {
        song_id: i64,

        #[arg(long)]
        title: Option<String>,

        #[command(flatten)]
        fields: SongFieldArgs,

        /// Stage deadline (YYYY-MM-DD)
        #[arg(long)]
        deadline: Option<String>,

        /// Assign a user
        #[arg(long)]
        assign: Option<String>,
    },

    /// Flag a blocking issue
    Block {
        song_id: i64,

        #[arg(short, long)]
        reason: Option<String>,

        /// Clear the block instead
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Subcommand)]
enum AssetCli {
    /// Submit an asset for review
    Upload {
        song_id: i64,

        /// cover_art, press_photo, promo_graphic, video or other
        asset_type: String,

        /// Storage location (path, bucket key or URL)
        location: String,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(long)]
        width: Option<u32>,

        #[arg(long)]
        height: Option<u32>,
    },

    /// Review a pending asset
    Review {
        asset_id: String,

        /// approve, request_changes or reject
        decision: String,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List a song's assets
    List { song_id: i64 },
}

#[derive(Subcommand)]
enum CatalogCli {
    /// Create and link the song's work
    Work {
        song_id: i64,
        title: String,

        #[arg(long)]
        iswc: Option<String>,
    },

    /// Set the ISWC on the song's work
    Iswc { song_id: i64, iswc: String },

    /// Record a writer, publisher or master share
    Split {
        song_id: i64,

        /// writer, publisher or master
        right_type: String,

        party: String,

        /// Percentage, e.g. 50 or 33.33
        share: String,

        /// Recording for master splits (defaults to the primary recording)
        #[arg(long)]
        recording: Option<i64>,
    },

    /// Add a recording
    Recording {
        song_id: i64,
        title: String,

        #[arg(long)]
        isrc: Option<String>,

        #[arg(long)]
        master_audio: Option<String>,

        #[arg(long)]
        instrumental_audio: Option<String>,
    },

    /// Credit a party on a recording
    Credit {
        recording_id: i64,
        party: String,
        role: String,
    },

    /// Add a release
    Release {
        song_id: i64,
        title: String,

        #[arg(long)]
        release_type: Option<String>,

        /// Release date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        upc: Option<String>,
    },

    /// List a release on a platform
    Publication {
        release_id: i64,
        platform: String,

        #[arg(long)]
        url: Option<String>,
    },
}

fn format(json: bool) -> OutputFormat {
    if json {
        OutputFormat::Json
    } else {
        OutputFormat::Summary
    }
}

/// Log to stderr; `SONGFLOW_LOG` overrides the configured level
fn init_tracing() {
    let default_level = SongflowPaths::new()
        .ok()
        .and_then(|paths| config::load_config(&paths).ok())
        .map(|config| config.log_level)
        .unwrap_or_else(|| "info".to_string());

    let filter = EnvFilter::try_from_env("SONGFLOW_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();
    let as_user = cli.as_user.as_deref();

    match cli.command {
        Commands::Init => {
            commands::init()?;
        }
        Commands::User { operation } => match operation {
            UserCli::Add {
                id,
                name,
                department,
                level,
                admin,
            } => {
                let level = if admin { ADMIN_LEVEL } else { level };
                commands::user_add(&id, &name, level, department.as_deref())?;
            }
            UserCli::List => commands::user_list()?,
        },
        Commands::Song { operation } => match operation {
            SongCli::New { title, fields } => {
                commands::song_new(as_user, &title, fields)?;
            }
            SongCli::Show { song_id, json } => {
                commands::song_show(as_user, song_id, format(json))?;
            }
            SongCli::List { stage } => {
                commands::song_list(as_user, stage.as_deref())?;
            }
            SongCli::Update {
                song_id,
                title,
                fields,
                deadline,
                assign,
            } => {
                commands::song_update(as_user, song_id, title, fields, deadline.as_deref(), assign)?;
            }
            SongCli::Block {
                song_id,
                reason,
                clear,
            } => {
                commands::song_block(as_user, song_id, clear, reason)?;
            }
        },
        Commands::Transition {
            song_id,
            stage,
            notes,
        } => {
            commands::transition(as_user, song_id, &stage, notes)?;
        }
        Commands::SendToDigital { song_id, notes } => {
            commands::send_to_digital(as_user, song_id, notes)?;
        }
        Commands::Archive { song_id, notes } => {
            commands::archive(as_user, song_id, notes)?;
        }
        Commands::Checklist {
            song_id,
            stage,
            json,
        } => {
            commands::checklist(as_user, song_id, stage.as_deref(), format(json))?;
        }
        Commands::Toggle { item_id } => commands::toggle(as_user, item_id)?,
        Commands::Revalidate { song_id } => commands::revalidate(as_user, song_id)?,
        Commands::History { song_id } => commands::history(as_user, song_id)?,
        Commands::Alerts { unread, mark_all } => commands::alerts(as_user, unread, mark_all)?,
        Commands::Read { alert_id } => commands::read(as_user, alert_id)?,
        Commands::Queue => commands::queue(as_user)?,
        Commands::Overdue => commands::overdue(as_user)?,
        Commands::Stats { json } => commands::stats(as_user, format(json))?,
        Commands::Asset { operation } => match operation {
            AssetCli::Upload {
                song_id,
                asset_type,
                location,
                title,
                width,
                height,
            } => {
                commands::asset_upload(as_user, song_id, &asset_type, &location, title, width, height)?;
            }
            AssetCli::Review {
                asset_id,
                decision,
                notes,
            } => {
                commands::asset_review(as_user, &asset_id, &decision, notes)?;
            }
            AssetCli::List { song_id } => commands::asset_list(as_user, song_id)?,
        },
        Commands::Note {
            song_id,
            text,
            pitched_to,
        } => {
            commands::note(as_user, song_id, text.as_deref(), pitched_to)?;
        }
        Commands::Catalog { operation } => match operation {
            CatalogCli::Work {
                song_id,
                title,
                iswc,
            } => commands::catalog_work(as_user, song_id, &title, iswc)?,
            CatalogCli::Iswc { song_id, iswc } => commands::catalog_iswc(as_user, song_id, &iswc)?,
            CatalogCli::Split {
                song_id,
                right_type,
                party,
                share,
                recording,
            } => commands::catalog_split(as_user, song_id, &right_type, &party, &share, recording)?,
            CatalogCli::Recording {
                song_id,
                title,
                isrc,
                master_audio,
                instrumental_audio,
            } => commands::catalog_recording(
                as_user,
                song_id,
                NewRecording {
                    title,
                    isrc,
                    master_audio,
                    instrumental_audio,
                },
            )?,
            CatalogCli::Credit {
                recording_id,
                party,
                role,
            } => commands::catalog_credit(as_user, recording_id, &party, &role)?,
            CatalogCli::Release {
                song_id,
                title,
                release_type,
                date,
                upc,
            } => commands::catalog_release(as_user, song_id, &title, release_type, date.as_deref(), upc)?,
            CatalogCli::Publication {
                release_id,
                platform,
                url,
            } => commands::catalog_publication(as_user, release_id, &platform, url)?,
        },
        Commands::Serve => {
            let paths = SongflowPaths::new()?;
            if !paths.is_initialized() {
                anyhow::bail!("songflow not initialized. Run `songflow init` first.");
            }
            let config = config::load_config(&paths)?;
            let mut server = mcp::McpServer::new(&paths, &config)?;
            server.run().await?;
        }
    }

    Ok(())
}

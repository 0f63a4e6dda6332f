use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use database::{DatabaseConfig, ReplayDatabase, ReplayRecord};
use ingest::media::{discard_demo, store_demo};
use ingest::{AppConfig, IngestOutcome, LocalMapSource, NoopMapSource, ReplayIngestor, Upload};
use types::ParsedDemo;

#[derive(Parser, Debug)]
#[command(about = "Stores parsed Spring demos and queries the replay database")]
struct Params {
    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides DATABASE_URL and the config file
    #[arg(long)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a demo file together with its parsed JSON form
    Ingest {
        demo: PathBuf,
        parsed: PathBuf,
        #[arg(short, long, default_value = "")]
        tags: String,
        #[arg(short, long, default_value = "")]
        short: String,
        #[arg(short, long, default_value = "")]
        long: String,
        #[arg(short, long)]
        uploader: String,
        /// Player name the upload is attributed to; must have played before
        #[arg(long)]
        owner: Option<String>,
    },
    /// Replace description and tags of a stored replay
    Edit {
        game_id: String,
        #[arg(short, long)]
        tags: String,
        #[arg(short, long)]
        short: String,
        #[arg(short, long, default_value = "")]
        long: String,
    },
    /// Count a download and print the stored file path
    Download { game_id: String },
    Show { game_id: String },
    Search { term: String },
    Tags {
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },
    Maps {
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },
    /// List replays by at most one criterion, newest first
    List {
        #[command(flatten)]
        filter: ListFilter,
    },
    Gametypes,
    Players,
    Migrate,
}

#[derive(clap::Args, Debug)]
#[group(multiple = false)]
struct ListFilter {
    #[arg(long)]
    tag: Option<String>,
    #[arg(long)]
    map: Option<String>,
    #[arg(long)]
    gametype: Option<String>,
    #[arg(long)]
    uploader: Option<String>,
    /// Match date prefix: 2012, 2012-03 or 2012-03-04
    #[arg(long)]
    played: Option<String>,
    /// Upload date prefix
    #[arg(long)]
    uploaded: Option<String>,
    #[arg(long)]
    accountid: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Params::parse();
    log::info!("args: {args:?}");

    let config = AppConfig::load(args.config.as_deref())?;
    let db_config = DatabaseConfig::from_cli_or_env_or_yaml(args.database_url, config.database_url.clone());
    let db = ReplayDatabase::connect(&db_config).await?;

    match args.command {
        Command::Ingest {
            demo,
            parsed,
            tags,
            short,
            long,
            uploader,
            owner,
        } => {
            let uploader = match owner {
                Some(owner) => {
                    let account = db
                        .owner_account(&owner)
                        .await?
                        .ok_or_else(|| format!("Owner {owner} has no replays yet"))?;
                    log::info!("Owner is {} (accountid {})", owner, account.accountid);
                    owner
                }
                None => uploader,
            };
            let parsed = ParsedDemo::from_json(&std::fs::read_to_string(&parsed)?)?;
            let file = store_demo(&demo, &config.media_root)?;
            let upload = Upload {
                tags,
                short,
                long_text: long,
                uploader,
                file,
            };

            let maps = LocalMapSource::new(&config.map_cache, &config.map_images);
            let ingestor = ReplayIngestor::new(db, maps.clone());
            match ingestor.ingest(&parsed, &upload).await {
                Ok(IngestOutcome::Created(replay)) => {
                    maps.forget_written();
                    print_replay(&replay);
                }
                Ok(IngestOutcome::Duplicate(replay)) => {
                    discard_demo(&upload.file);
                    println!("already stored:");
                    print_replay(&replay);
                }
                Err(e) => {
                    // the transaction rolled back, so nothing refers to these files
                    discard_demo(&upload.file);
                    let removed = maps.remove_written();
                    log::info!("Removed {} map images of the failed ingestion", removed);
                    return Err(e.into());
                }
            }
        }
        Command::Edit {
            game_id,
            tags,
            short,
            long,
        } => {
            let ingestor = ReplayIngestor::new(db, NoopMapSource);
            let replay = ingestor.update_description(&game_id, &short, &long, &tags).await?;
            print_replay(&replay);
        }
        Command::Download { game_id } => {
            let file = db.record_download(&game_id).await?;
            println!(
                "{} ({} downloads)",
                Path::new(&file.path).join(&file.filename).display(),
                file.download_count
            );
        }
        Command::Show { game_id } => {
            let detail = db.replay_detail(&game_id).await?;
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }
        Command::Search { term } => {
            for replay in db.search_replays(&term).await? {
                print_replay(&replay);
            }
        }
        Command::Tags { limit } => {
            println!("{} replays", db.replay_count().await?);
            for tag in db.top_tags(limit).await? {
                println!("{:>6}  {}", tag.count, tag.name);
            }
        }
        Command::Maps { limit } => {
            for map in db.top_maps(limit).await? {
                println!("{:>6}  {}", map.count, map.name);
            }
        }
        Command::List { filter } => {
            let replays = if let Some(tag) = filter.tag {
                db.replays_tagged(&tag).await?
            } else if let Some(map) = filter.map {
                db.replays_on_map(&map).await?
            } else if let Some(gametype) = filter.gametype {
                db.replays_of_gametype(&gametype).await?
            } else if let Some(uploader) = filter.uploader {
                db.replays_by_uploader(&uploader).await?
            } else if let Some(played) = filter.played {
                db.replays_played_on(&played).await?
            } else if let Some(uploaded) = filter.uploaded {
                db.replays_uploaded_on(&uploaded).await?
            } else if let Some(accountid) = filter.accountid {
                db.replays_of_account(accountid).await?
            } else {
                db.newest_replays(20).await?
            };
            for replay in &replays {
                print_replay(replay);
            }
        }
        Command::Gametypes => {
            for gametype in db.gametype_counts().await? {
                println!("{:>6}  {}", gametype.count, gametype.name);
            }
        }
        Command::Players => {
            for account in db.account_summaries().await? {
                println!(
                    "{:>8}  {:<24} {:>5} played {:>5} watched",
                    account.accountid, account.name, account.replay_count, account.spectator_count
                );
            }
        }
        // connect already applied pending migrations
        Command::Migrate => log::info!("Database at {} is up to date", db_config.url),
    }
    Ok(())
}

fn print_replay(replay: &ReplayRecord) {
    println!(
        "{}  {}  {}  {}",
        replay.game_id,
        replay.unix_time,
        replay.mapname.as_deref().unwrap_or("?"),
        replay.title
    );
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use console::Emoji;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use podlist::config::{
    DEFAULT_API_URL, DEFAULT_BATCH_SIZE, DEFAULT_SHOW_NAME, default_cache_dir,
};
use podlist::{
    ApiClient, AudioBackend, CachingSource, Config, EpisodeSource, FeedPager, HttpProbe,
    NoopReporter, OnlineStatus, PlaybackEngine, PlaybackState, PlaylistStore, ProgressEvent,
    ProgressReporter, ReqwestClient, Session, SharedProgressReporter, Show, ShowCache, TrackEnded,
    download_playlist,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[i] ");
static DOWNLOAD: Emoji<'_, '_> = Emoji("📥 ", "[v] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static PARTY: Emoji<'_, '_> = Emoji("🎉 ", "[*] ");
static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "x ");
static CACHED: Emoji<'_, '_> = Emoji("💾 ", "[c] ");

type Source = Arc<CachingSource<ApiClient<ReqwestClient>>>;

/// Browse a podcast, manage playlists and listen offline
#[derive(Parser, Debug)]
#[command(name = "podlist")]
#[command(about = "Browse a podcast, manage playlists and listen offline")]
#[command(version)]
struct Args {
    /// Base URL of the episode API
    #[arg(long, env = "PODLIST_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Podcast name used in API requests
    #[arg(long, env = "PODLIST_SHOW_NAME", default_value = DEFAULT_SHOW_NAME)]
    show_name: String,

    /// Directory for downloaded audio, show details and playlists
    #[arg(long, env = "PODLIST_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Shows fetched per page
    #[arg(short = 'b', long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode - suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List shows, newest first
    Shows {
        /// Only shows matching this text
        #[arg(short, long)]
        filter: Option<String>,

        /// Number of pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: usize,
    },

    /// List playlists
    Playlists,

    /// Create and edit playlists
    Playlist {
        #[command(subcommand)]
        action: PlaylistAction,
    },

    /// Download every show of a playlist that is not cached yet
    Download {
        /// Playlist name
        playlist: String,
    },

    /// Play a show, or a whole playlist
    Play {
        /// Show number
        #[arg(required_unless_present = "playlist")]
        number: Option<i32>,

        /// Play this playlist from the start
        #[arg(long, conflicts_with = "number")]
        playlist: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum PlaylistAction {
    /// Create an empty playlist
    Create { name: String },
    /// Rename a playlist
    Rename { name: String, new_name: String },
    /// Delete a playlist
    Delete { name: String },
    /// List the shows of a playlist
    Show { name: String },
    /// Add shows by number
    Add { name: String, numbers: Vec<i32> },
    /// Remove shows by number
    Remove { name: String, numbers: Vec<i32> },
    /// Add every listed show
    AddAll {
        name: String,
        #[arg(short, long)]
        filter: Option<String>,
        #[arg(short, long, default_value_t = 1)]
        pages: usize,
    },
    /// Move a show one place towards the start
    MoveUp { name: String, number: i32 },
    /// Move a show one place towards the end
    MoveDown { name: String, number: i32 },
}

/// Progress reporter using indicatif for terminal output
struct IndicatifReporter {
    multi: MultiProgress,
    bars: Mutex<HashMap<i32, ProgressBar>>,
    playback: Mutex<Option<ProgressBar>>,
    main_bar: ProgressBar,
}

impl IndicatifReporter {
    fn new() -> Self {
        let multi = MultiProgress::new();

        let main_style = ProgressStyle::default_bar()
            .template("{spinner:.green} {wide_msg}")
            .unwrap();

        let main_bar = multi.add(ProgressBar::new_spinner());
        main_bar.set_style(main_style);
        main_bar.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            multi,
            bars: Mutex::new(HashMap::new()),
            playback: Mutex::new(None),
            main_bar,
        }
    }

    fn get_or_create_bar(&self, show_number: i32) -> ProgressBar {
        let mut bars = self.bars.lock().unwrap();

        if let Some(bar) = bars.get(&show_number) {
            return bar.clone();
        }

        let style = ProgressStyle::default_bar()
            .template(&format!(
                "  {DOWNLOAD}[{{bar:30.cyan/blue}}] {{bytes}}/{{total_bytes}} {{wide_msg}}"
            ))
            .unwrap()
            .progress_chars("█▓░");

        let bar = self.multi.add(ProgressBar::new(0));
        bar.set_style(style);
        bars.insert(show_number, bar.clone());
        bar
    }

    fn finish_bar(&self, show_number: i32) {
        let mut bars = self.bars.lock().unwrap();
        if let Some(bar) = bars.remove(&show_number) {
            bar.finish_and_clear();
        }
    }

    fn playback_bar(&self) -> ProgressBar {
        let mut playback = self.playback.lock().unwrap();
        if let Some(bar) = playback.as_ref() {
            return bar.clone();
        }

        let style = ProgressStyle::default_bar()
            .template(&format!("  {HEADPHONES}[{{bar:30.green/blue}}] {{wide_msg}}"))
            .unwrap()
            .progress_chars("█▓░");

        let bar = self.multi.add(ProgressBar::new(100));
        bar.set_style(style);
        *playback = Some(bar.clone());
        bar
    }

    fn finish_playback_bar(&self) {
        if let Some(bar) = self.playback.lock().unwrap().take() {
            bar.finish_and_clear();
        }
    }
}

impl ProgressReporter for IndicatifReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::ShowsChanged { count } => {
                self.main_bar
                    .set_message(format!("{SEARCH}{} shows loaded", count.to_string().cyan()));
            }

            ProgressEvent::PlaylistDownloadProgress {
                show_number,
                current,
                total,
            } => {
                self.main_bar.set_message(format!(
                    "{DOWNLOAD}Downloading {} of {} (show {})",
                    current.to_string().cyan(),
                    total.to_string().cyan(),
                    show_number.to_string().yellow()
                ));
            }

            ProgressEvent::DownloadStarting {
                show_number,
                content_length,
            } => {
                let bar = self.get_or_create_bar(show_number);
                bar.set_length(content_length.unwrap_or(0));
                bar.set_position(0);
                bar.set_message(format!("show {}", show_number.to_string().cyan()));
            }

            ProgressEvent::DownloadProgress {
                show_number,
                bytes_downloaded,
                total_bytes,
            } => {
                let bar = self.get_or_create_bar(show_number);
                if let Some(total) = total_bytes {
                    bar.set_length(total);
                }
                bar.set_position(bytes_downloaded);
            }

            ProgressEvent::DownloadCompleted {
                show_number,
                bytes_downloaded,
            } => {
                let bar = self.get_or_create_bar(show_number);
                bar.set_position(bytes_downloaded);
                bar.set_message(format!("{SUCCESS}show {}", show_number.to_string().green()));
                self.finish_bar(show_number);
            }

            ProgressEvent::DownloadFailed { show_number, error } => {
                let bar = self.get_or_create_bar(show_number);
                bar.abandon_with_message(format!(
                    "{FAILURE}show {} - {}",
                    show_number.to_string().red(),
                    error.red()
                ));
                self.finish_bar(show_number);
            }

            ProgressEvent::PlaylistDownloadCompleted {
                downloaded_count,
                skipped_count,
                failed_count,
            } => {
                self.main_bar.finish_and_clear();
                println!(
                    "\n{PARTY}{} {} downloaded, {} already cached, {} failed",
                    "Download complete:".bold().green(),
                    downloaded_count.to_string().green().bold(),
                    skipped_count.to_string().yellow(),
                    if failed_count > 0 {
                        failed_count.to_string().red().bold()
                    } else {
                        failed_count.to_string().green()
                    }
                );
            }

            ProgressEvent::PlaybackStateChanged { state, message } => {
                let text = if message.is_empty() {
                    format!("{state:?}")
                } else {
                    message
                };
                self.main_bar
                    .set_message(format!("{HEADPHONES}{}", text.bold()));
                if state == PlaybackState::Stopped {
                    self.finish_playback_bar();
                }
            }

            ProgressEvent::PlaybackProgress {
                percentage,
                position,
            } => {
                let bar = self.playback_bar();
                bar.set_position(percentage.round() as u64);
                bar.set_message(position);
            }

            ProgressEvent::PlaylistAdvanced {
                show_number,
                index,
                count,
            } => {
                self.main_bar.println(format!(
                    "{HEADPHONES}Playlist {}/{}: show {}",
                    index.to_string().cyan(),
                    count.to_string().cyan(),
                    show_number.to_string().yellow()
                ));
            }

            ProgressEvent::NavigateHome => {
                self.main_bar.finish_and_clear();
                println!("\n{PARTY}{}", "Playlist finished".bold().green());
            }
        }
    }
}

fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() <= max_len {
        title.to_string()
    } else {
        let cut: String = title.chars().take(max_len.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default},hyper_util=warn,reqwest=warn")));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

fn print_shows(shows: &[Show], cache: &ShowCache) {
    if shows.is_empty() {
        println!("  {}", "No shows".dimmed());
        return;
    }

    for show in shows {
        let date = show
            .date_published
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let marker = if cache.is_downloaded(show) {
            CACHED.to_string()
        } else {
            "   ".to_string()
        };
        println!(
            "  {marker}{:>5}  {}  {}",
            show.show_number.to_string().cyan(),
            date.dimmed(),
            truncate_title(&show.show_title, 60)
        );
    }
}

fn select_by_name(session: &mut Session, name: &str) -> Result<()> {
    let id = session
        .find_playlist_by_name(name)
        .map(|p| p.id)
        .with_context(|| format!("No playlist named '{name}'"))?;
    session.select_playlist(id);
    Ok(())
}

/// Load `pages` batches into the session, filtered when `filter` is given
async fn load_pages(
    pager: &FeedPager<Source>,
    session: &mut Session,
    probe: &HttpProbe<ReqwestClient>,
    filter: Option<&str>,
    pages: usize,
) -> Result<()> {
    let first = match filter {
        Some(text) => pager.set_filter(session, text, probe).await,
        None => pager.load_more(session, probe).await,
    };
    first.context("Failed to load shows")?;

    for _ in 1..pages {
        if pager
            .fetch_next_batch(session)
            .await
            .context("Failed to load shows")?
            == 0
        {
            break;
        }
    }
    Ok(())
}

async fn run_playlist_action(
    action: PlaylistAction,
    session: &mut Session,
    pager: &FeedPager<Source>,
    probe: &HttpProbe<ReqwestClient>,
    cache: &ShowCache,
) -> Result<()> {
    match action {
        PlaylistAction::Create { name } => {
            if session.find_playlist_by_name(&name).is_some() {
                bail!("A playlist named '{name}' already exists");
            }
            session.begin_add(&name);
            session.submit_draft();
            println!("{SUCCESS}Created {}", name.bold());
        }

        PlaylistAction::Rename { name, new_name } => {
            select_by_name(session, &name)?;
            if let Some(draft) = session.begin_edit() {
                draft.name = new_name.clone();
            }
            session.submit_draft();
            println!("{SUCCESS}Renamed {} to {}", name.bold(), new_name.bold());
        }

        PlaylistAction::Delete { name } => {
            select_by_name(session, &name)?;
            session.delete_playlist();
            println!("{SUCCESS}Deleted {}", name.bold());
        }

        PlaylistAction::Show { name } => {
            select_by_name(session, &name)?;
            session.toggle_show_playlist_only();
            println!("{HEADPHONES}{}", name.bold().green());
            print_shows(session.all_shows(), cache);
        }

        PlaylistAction::Add { name, numbers } => {
            select_by_name(session, &name)?;
            let shows = pager
                .source()
                .get_shows_by_numbers(&numbers)
                .await
                .context("Failed to look up shows")?;
            let missing = numbers
                .iter()
                .filter(|n| !shows.iter().any(|s| s.show_number == **n));
            for number in missing {
                eprintln!("{CROSS}Show {} not found", number.to_string().yellow());
            }
            for show in &shows {
                session.add_show_to_playlist(show);
            }
            println!("{SUCCESS}Added {} shows to {}", shows.len(), name.bold());
        }

        PlaylistAction::Remove { name, numbers } => {
            select_by_name(session, &name)?;
            let doomed: Vec<Show> = session
                .selected_playlist()
                .map(|p| {
                    p.shows
                        .iter()
                        .filter(|s| numbers.contains(&s.show_number))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            for show in &doomed {
                session.remove_show_from_playlist(show);
            }
            println!("{SUCCESS}Removed {} shows from {}", doomed.len(), name.bold());
        }

        PlaylistAction::AddAll {
            name,
            filter,
            pages,
        } => {
            select_by_name(session, &name)?;
            load_pages(pager, session, probe, filter.as_deref(), pages).await?;
            let added = session.add_all_to_playlist();
            println!("{SUCCESS}Added {} shows to {}", added, name.bold());
        }

        PlaylistAction::MoveUp { name, number } => move_show(session, &name, number, true)?,

        PlaylistAction::MoveDown { name, number } => move_show(session, &name, number, false)?,
    }
    Ok(())
}

fn move_show(session: &mut Session, name: &str, number: i32, up: bool) -> Result<()> {
    select_by_name(session, name)?;
    let draft = session
        .begin_edit()
        .context("No playlist selected")?;
    let show = draft
        .shows
        .iter()
        .find(|s| s.show_number == number)
        .cloned()
        .with_context(|| format!("Show {number} is not in '{name}'"))?;

    let moved = if up {
        draft.move_show_up(&show)
    } else {
        draft.move_show_down(&show)
    };
    if !moved {
        session.cancel_draft();
        let end = if up { "top" } else { "bottom" };
        println!("{FOLDER}Show {} is already at the {}", number, end);
        return Ok(());
    }

    session.submit_draft();
    let direction = if up { "up" } else { "down" };
    println!("{SUCCESS}Moved show {} {}", number.to_string().cyan(), direction);
    Ok(())
}

#[cfg_attr(not(feature = "audio"), allow(dead_code))]
enum PlayTarget {
    Show(i32),
    Playlist(String),
}

#[cfg_attr(not(feature = "audio"), allow(dead_code))]
enum Input {
    Line(Option<String>),
    TrackEnded,
}

/// Interactive transport controls until the user quits or playback is over
#[cfg_attr(not(feature = "audio"), allow(dead_code))]
async fn transport<A: AudioBackend>(
    engine: &mut PlaybackEngine<ReqwestClient, Source, A>,
    session: &Session,
) -> Result<()> {
    println!(
        "{}",
        "p play  a pause  r resume  s stop  f +10s  b -10s  q quit".dimmed()
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let input = tokio::select! {
            line = lines.next_line() => Input::Line(line.context("Failed to read input")?),
            _ = engine.track_ended() => Input::TrackEnded,
            _ = tokio::signal::ctrl_c() => Input::Line(None),
        };

        match input {
            Input::TrackEnded => match engine.on_track_ended(session).await {
                Ok(TrackEnded::Advanced { .. }) => {}
                Ok(TrackEnded::Stopped) => {
                    println!("{SUCCESS}Finished");
                }
                Ok(TrackEnded::PlaylistFinished) => break,
                Err(e) => eprintln!("{FAILURE}{}", e.to_string().red()),
            },
            Input::Line(None) => break,
            Input::Line(Some(command)) => match command.trim() {
                "p" => {
                    if let Err(e) = engine.play_current().await {
                        eprintln!("{FAILURE}{}", e.to_string().red());
                    }
                }
                "r" => engine.resume(),
                "s" => engine.stop(),
                "f" => engine.seek_forward(),
                "b" => engine.seek_backward(),
                "a" => engine.pause(),
                "" => {}
                "q" => break,
                other => eprintln!("{CROSS}Unknown command '{}'", other.yellow()),
            },
        }
    }

    engine.leave();
    Ok(())
}

/// Token cancelled by the first Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });
    cancel
}

#[cfg_attr(not(feature = "audio"), allow(dead_code))]
async fn run_play<A: AudioBackend>(
    backend: A,
    client: ReqwestClient,
    source: Source,
    cache: ShowCache,
    session: &mut Session,
    reporter: SharedProgressReporter,
    target: PlayTarget,
) -> Result<()> {
    let cancel = cancel_on_ctrl_c();
    let mut engine = PlaybackEngine::new(client, source, backend, cache)
        .with_reporter(reporter)
        .with_download_cancel(cancel.clone());

    let started = match target {
        PlayTarget::Playlist(name) => {
            select_by_name(session, &name)?;
            match engine.play_playlist(session).await {
                Ok(false) => bail!("Playlist '{name}' is empty"),
                Ok(true) => Ok(()),
                Err(e) => Err(anyhow::Error::new(e).context("Failed to start playlist")),
            }
        }
        PlayTarget::Show(number) => {
            let show = engine
                .load_show(number)
                .await
                .with_context(|| format!("Failed to load show {number}"))?;
            println!(
                "{HEADPHONES}{} {}",
                show.show_number.to_string().cyan(),
                show.show_title.bold()
            );
            engine
                .play_current()
                .await
                .with_context(|| format!("Failed to play show {number}"))
        }
    };

    if cancel.is_cancelled() {
        println!("{CROSS}Download cancelled");
        return Ok(());
    }
    started?;

    transport(&mut engine, session).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if !args.quiet {
        println!(
            "\n{}{} {}\n",
            MICROPHONE,
            "podlist".bold().magenta(),
            "- Podcast Playlists".dimmed()
        );
    }

    let config = Config {
        api_url: args.api_url,
        show_name: args.show_name,
        cache_dir: args
            .cache_dir
            .unwrap_or_else(|| default_cache_dir().to_path_buf()),
        batch_size: args.batch_size,
        ..Default::default()
    };

    let client = ReqwestClient::new();
    let online = OnlineStatus::default();
    let probe = HttpProbe::new(client.clone(), config.api_url.clone());
    if !online.refresh(&probe).await && !args.quiet {
        println!("{}", "Offline: using cached shows only".yellow());
    }

    let api = ApiClient::new(client.clone(), &config.api_url, &config.show_name)
        .context("Invalid API URL")?;
    let source: Source = Arc::new(CachingSource::new(api, config.details_dir(), online.clone()));
    let cache = ShowCache::new(&config.cache_dir);
    let mut session = Session::open(PlaylistStore::in_dir(&config.cache_dir), online.clone());

    let quiet = args.quiet;
    let reporter = move || -> SharedProgressReporter {
        if quiet {
            NoopReporter::shared()
        } else {
            Arc::new(IndicatifReporter::new())
        }
    };
    let pager = FeedPager::new(source.clone()).with_batch_size(config.batch_size);

    match args.command {
        Command::Shows { filter, pages } => {
            load_pages(&pager, &mut session, &probe, filter.as_deref(), pages).await?;
            print_shows(session.all_shows(), &cache);
        }

        Command::Playlists => {
            if session.playlists().is_empty() {
                println!("  {}", "No playlists".dimmed());
            }
            for playlist in session.playlists() {
                println!(
                    "  {FOLDER}{}  {} shows, {} not downloaded  {}",
                    playlist.name.bold(),
                    playlist.shows.len().to_string().cyan(),
                    cache.not_downloaded_count(playlist).to_string().yellow(),
                    playlist.date_created.format("%Y-%m-%d").to_string().dimmed()
                );
            }
        }

        Command::Playlist { action } => {
            run_playlist_action(action, &mut session, &pager, &probe, &cache).await?;
        }

        Command::Download { playlist } => {
            select_by_name(&mut session, &playlist)?;
            let selected = session
                .selected_playlist()
                .cloned()
                .context("No playlist selected")?;

            let cancel = cancel_on_ctrl_c();
            let result = download_playlist(
                &client,
                &source,
                &cache,
                &selected,
                &online,
                &reporter(),
                &cancel,
            )
            .await
            .context("Failed to download playlist")?;

            if !args.quiet && !result.failed_shows.is_empty() {
                println!("\n{}", "Failed shows:".red().bold());
                for (number, error) in &result.failed_shows {
                    println!(
                        "  {}{} - {}",
                        CROSS,
                        number.to_string().yellow(),
                        error.to_string().dimmed()
                    );
                }
            }

            if !args.quiet {
                if result.cancelled {
                    println!("\n{}", "Cancelled".yellow());
                }
                println!(
                    "\n{FOLDER}Cache: {}\n",
                    config.cache_dir.display().to_string().cyan()
                );
            }

            if result.failed > 0 && result.downloaded == 0 {
                std::process::exit(1);
            }
        }

        Command::Play { number, playlist } => {
            let target = match (number, playlist) {
                (_, Some(name)) => PlayTarget::Playlist(name),
                (Some(number), None) => PlayTarget::Show(number),
                (None, None) => bail!("Give a show number or --playlist"),
            };

            #[cfg(feature = "audio")]
            {
                let backend = podlist::playback::RodioBackend::open_default()
                    .context("Failed to open audio output")?;
                run_play(
                    backend,
                    client,
                    source,
                    cache,
                    &mut session,
                    reporter(),
                    target,
                )
                .await?;
            }

            #[cfg(not(feature = "audio"))]
            {
                let _ = target;
                bail!("podlist was built without audio support; rebuild with `--features audio`");
            }
        }
    }

    Ok(())
}

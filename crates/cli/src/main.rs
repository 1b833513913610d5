use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::debug;

use catalog::{Genre, MovieCatalog};
use domain::{GenrePreference, GroupId, MovieCandidate, SessionSettings, VoteValue};
use server::{App, AppConfig, logging};

/// Movie Night - pick a movie together
#[derive(Parser)]
#[command(name = "movie-night")]
#[command(about = "Group movie recommendations and voting", long_about = None)]
struct Cli {
    /// Configuration file (defaults to movie-night.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serve the catalog from this JSON fixture instead of the configured provider
    #[arg(short, long)]
    fixture: Option<PathBuf>,

    /// Show service logs
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog genres
    Genres,

    /// Search for movies by title
    Search {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "1")]
        page: u32,
    },

    /// Recommend movies for an ad-hoc group
    Recommend {
        /// Member preferences as NAME:GENRE=WEIGHT,GENRE=WEIGHT (genre by name or id)
        #[arg(long = "member", required = true)]
        members: Vec<String>,

        #[arg(long, default_value = "10")]
        limit: usize,

        /// Show why each movie was picked
        #[arg(long)]
        explain: bool,
    },

    /// Run a whole movie night: group, preferences, session, random votes, results
    Simulate {
        #[arg(long, default_value = "4")]
        members: usize,

        #[arg(long, default_value = "10")]
        candidates: usize,

        /// Seed for reproducible preferences and votes
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Run concurrent recommendation requests and report latency
    Benchmark {
        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,
    },
}

/// One `--member` argument.
#[derive(Debug, Clone, PartialEq)]
struct MemberSpec {
    name: String,
    genres: Vec<(String, u8)>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(path) = cli.fixture {
        config.catalog.provider = server::CatalogProvider::Fixture;
        config.catalog.fixture_path = path;
    }
    if !cli.verbose {
        config.log.filter = "warn".to_string();
    }
    logging::init(&config.log)?;

    let start = Instant::now();
    let app = App::build(config).context("Failed to initialise services")?;
    debug!("Services ready in {:?}", start.elapsed());

    match cli.command {
        Commands::Genres => handle_genres(&app).await?,
        Commands::Search { title, page } => handle_search(&app, &title, page).await?,
        Commands::Recommend {
            members,
            limit,
            explain,
        } => handle_recommend(&app, &members, limit, explain).await?,
        Commands::Simulate {
            members,
            candidates,
            seed,
        } => handle_simulate(&app, members, candidates, seed).await?,
        Commands::Benchmark {
            requests,
            concurrent,
        } => handle_benchmark(&app, requests, concurrent).await?,
    }

    Ok(())
}

/// Handle the 'genres' command
async fn handle_genres(app: &App) -> Result<()> {
    let genres = app.engine.catalog().genres().await?;
    println!("{}", "Genres:".bold().blue());
    for genre in genres {
        println!("{:>6}  {}", genre.id.to_string().green(), genre.name);
    }
    Ok(())
}

/// Handle the 'search' command
async fn handle_search(app: &App, title: &str, page: u32) -> Result<()> {
    let movies = app.engine.catalog().search(title, page).await?;
    println!("{}", format!("Search results for '{}':", title).bold().blue());
    if movies.is_empty() {
        println!("  no matches");
    }
    for movie in movies {
        println!(
            "{:>8}: {} ({}) [{}] {:.1}/10 ({} votes)",
            movie.id,
            movie.title.bold(),
            movie.year().map(|y| y.to_string()).unwrap_or_else(|| "????".to_string()),
            movie.genre_names().join(", "),
            movie.vote_average,
            movie.vote_count
        );
    }
    Ok(())
}

/// Handle the 'recommend' command
async fn handle_recommend(app: &App, members: &[String], limit: usize, explain: bool) -> Result<()> {
    let specs = members
        .iter()
        .map(|raw| parse_member(raw))
        .collect::<Result<Vec<_>>>()?;
    let genres = app.engine.catalog().genres().await?;

    let mut names = Vec::with_capacity(specs.len());
    let mut preferences = Vec::with_capacity(specs.len());
    for spec in specs {
        let resolved = spec
            .genres
            .iter()
            .map(|(genre, weight)| {
                resolve_genre(&genres, genre).map(|g| GenrePreference::new(g.id, g.name, *weight))
            })
            .collect::<Result<Vec<_>>>()?;
        names.push(spec.name);
        preferences.push(resolved);
    }

    let group_id = build_group(app, &names).await?;
    for (name, prefs) in names.iter().zip(preferences) {
        app.preferences
            .set_member_preferences(group_id, &user_id(name), prefs)
            .await?;
    }

    let recommendations = app
        .recommend_for_group(group_id, &user_id(&names[0]), Some(limit))
        .await?;
    print_recommendations(&recommendations, explain);
    Ok(())
}

/// Handle the 'simulate' command
async fn handle_simulate(app: &App, members: usize, candidates: usize, seed: Option<u64>) -> Result<()> {
    if members < 2 {
        bail!("a movie night needs at least 2 members");
    }
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let genres = app.engine.catalog().genres().await?;
    if genres.is_empty() {
        bail!("the catalog has no genres");
    }

    let names: Vec<String> = (1..=members).map(|i| format!("member-{}", i)).collect();
    let group_id = build_group(app, &names).await?;
    println!("{} Group created with {} members", "✓".green(), members);

    for name in &names {
        let prefs = random_preferences(&mut rng, &genres);
        let listed = prefs
            .iter()
            .map(|p| format!("{}={}", p.genre_name, p.weight))
            .collect::<Vec<_>>()
            .join(", ");
        app.preferences
            .set_member_preferences(group_id, &user_id(name), prefs)
            .await?;
        println!("  {} likes {}", name.bold(), listed);
    }

    let owner = user_id(&names[0]);
    let settings = SessionSettings {
        max_recommendations: candidates,
        ..SessionSettings::default()
    };
    let session = app.voting.create_session(group_id, &owner, settings).await?;
    app.voting.start_session(session.id, &owner).await?;
    println!(
        "{} Voting on {} candidates",
        "✓".green(),
        session.candidates.len()
    );

    for name in &names {
        for candidate in &session.candidates {
            if rng.random_bool(0.5) {
                let value = if rng.random_bool(0.6) { VoteValue::Yes } else { VoteValue::No };
                app.voting
                    .cast_vote(session.id, &user_id(name), candidate.movie_id, value)
                    .await?;
            }
        }
    }

    let stats = app.voting.voting_stats(session.id, &owner).await?;
    let results = app.voting.end_session(session.id, &owner).await?;

    println!("{}", "Results:".bold().blue());
    for (rank, result) in results.results.iter().enumerate() {
        println!(
            "{}. {} - {} yes / {} no (score {:.1})",
            (rank + 1).to_string().green(),
            result.title,
            result.yes_votes,
            result.no_votes,
            result.score
        );
    }
    println!(
        "Participation: {}% ({} of {} members, {} votes)",
        stats.participation_rate, stats.voted_members, stats.total_members, stats.total_votes
    );
    match results.winner {
        Some(winner) => println!("{} Tonight's movie: {}", "★".yellow(), winner.title.bold()),
        None => println!("No winner"),
    }
    Ok(())
}

/// Handle the 'benchmark' command
async fn handle_benchmark(app: &App, requests: usize, concurrent: usize) -> Result<()> {
    if requests == 0 {
        bail!("requests must be positive");
    }
    let genres = app.engine.catalog().genres().await?;
    if genres.is_empty() {
        bail!("the catalog has no genres");
    }

    let names = ["bench-owner".to_string(), "bench-guest".to_string()];
    let group_id = build_group(app, &names).await?;
    let mut rng = StdRng::from_os_rng();
    for name in &names {
        app.preferences
            .set_member_preferences(group_id, &user_id(name), random_preferences(&mut rng, &genres))
            .await?;
    }

    let owner = user_id(&names[0]);
    let limit = app.config.recommendations.default_limit;
    let permits = Arc::new(Semaphore::new(concurrent.max(1)));

    let wall_clock = Instant::now();
    let mut handles = vec![];
    for _ in 0..requests {
        let app = app.clone();
        let owner = owner.clone();
        let permits = permits.clone();
        handles.push(tokio::spawn(async move {
            let _permit = permits.acquire_owned().await?;
            let start = Instant::now();
            app.recommend_for_group(group_id, &owner, Some(limit)).await?;
            Ok::<_, anyhow::Error>(start.elapsed())
        }));
    }

    let mut timings = vec![];
    for handle in handles {
        timings.push(handle.await??);
    }
    let total_time = wall_clock.elapsed();

    timings.sort();
    let avg_latency = timings.iter().sum::<Duration>() / timings.len() as u32;
    let throughput = requests as f64 / total_time.as_secs_f64();

    println!("{}", "Benchmark results:".bold().blue());
    println!("Requests: {} ({} concurrent)", requests, concurrent.max(1));
    println!("Total time: {:?}", total_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", percentile(&timings, 0.50));
    println!("P95 latency: {:?}", percentile(&timings, 0.95));
    println!("P99 latency: {:?}", percentile(&timings, 0.99));
    println!("Throughput: {:.2} requests/second", throughput);
    Ok(())
}

/// Register users and put them in one group; the first name owns it.
async fn build_group(app: &App, names: &[String]) -> Result<GroupId> {
    let owner = names.first().ok_or_else(|| anyhow!("at least one member is required"))?;
    for name in names {
        let id = user_id(name);
        app.users
            .ensure_user(&id, &format!("{}@movie-night.local", id), name)
            .await?;
    }
    let group = app
        .groups
        .create_group(&user_id(owner), "Movie Night", None)
        .await?;
    for name in &names[1..] {
        app.groups
            .join_group(&group.invitation_code, &user_id(name))
            .await?;
    }
    Ok(group.id)
}

fn user_id(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

/// Parse `NAME:GENRE=WEIGHT,GENRE=WEIGHT`.
fn parse_member(raw: &str) -> Result<MemberSpec> {
    let (name, list) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("member '{}' must look like NAME:GENRE=WEIGHT,...", raw))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("member '{}' has no name", raw);
    }

    let genres = list
        .split(',')
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| {
            let (genre, weight) = entry
                .split_once('=')
                .ok_or_else(|| anyhow!("'{}' must look like GENRE=WEIGHT", entry.trim()))?;
            let weight: u8 = weight
                .trim()
                .parse()
                .with_context(|| format!("invalid weight in '{}'", entry.trim()))?;
            Ok((genre.trim().to_string(), weight))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(MemberSpec {
        name: name.to_string(),
        genres,
    })
}

/// Match a genre by id or case-insensitive name.
fn resolve_genre(genres: &[Genre], key: &str) -> Result<Genre> {
    let by_id = key.parse::<u32>().ok();
    genres
        .iter()
        .find(|g| Some(g.id) == by_id || g.name.eq_ignore_ascii_case(key))
        .cloned()
        .ok_or_else(|| anyhow!("unknown genre '{}'", key))
}

fn random_preferences(rng: &mut impl Rng, genres: &[Genre]) -> Vec<GenrePreference> {
    let count = rng.random_range(1..=genres.len().min(3));
    let mut picked: Vec<&Genre> = Vec::with_capacity(count);
    while picked.len() < count {
        let genre = &genres[rng.random_range(0..genres.len())];
        if !picked.iter().any(|g| g.id == genre.id) {
            picked.push(genre);
        }
    }
    picked
        .into_iter()
        .map(|g| GenrePreference::new(g.id, g.name.clone(), rng.random_range(1..=10)))
        .collect()
}

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    let index = ((sorted.len() as f64 * p) as usize).min(sorted.len() - 1);
    sorted[index]
}

/// Helper function to format and print recommendations
fn print_recommendations(recommendations: &[MovieCandidate], explain: bool) {
    println!("{}", "Movie Recommendations:".bold().blue());
    for (i, movie) in recommendations.iter().enumerate() {
        println!(
            "{}. {} ({}) [{}] - Score: {:.2}",
            (i + 1).to_string().green(),
            movie.title,
            movie.year.map(|y| y.to_string()).unwrap_or_else(|| "????".to_string()),
            movie.genres.join(", "),
            movie.score
        );
        if explain {
            println!("   {}", movie.reason);
        }
    }
}

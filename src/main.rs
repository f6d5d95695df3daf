extern crate octocrab;
extern crate tokio;
#[macro_use]
extern crate serde_derive;

use anyhow::Result;
use chrono::{Local, Utc};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use std::path::PathBuf;

pub mod companies;
pub mod credentials;
pub mod fetcher;
pub mod github;
pub mod oracle;
pub mod pulls;
pub mod report;
pub mod target;

use companies::Registry;
use credentials::GitHubToken;
use fetcher::{Paginator, DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE};
use github::GitHubClient;
use pulls::TimeRange;
use target::Target;

const TOP_AUTHORS: usize = 10;

#[derive(Parser)]
#[command(version, about = "Merged and closed pull requests of GitHub repositories and accounts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report merged and closed pull requests of a repository or of a whole account
    Prs(PrsArgs),
    /// Search the French company registry
    Companies(CompaniesArgs),
    /// Ask the oracle
    Oracle,
}

#[derive(Args)]
struct PrsArgs {
    /// https://github.com/owner/repo or https://github.com/username
    url: String,
    #[arg(long, value_enum, default_value_t = TimeRange::Year)]
    range: TimeRange,
    /// Only keep pull requests of this author; repeat for several
    #[arg(long = "author")]
    authors: Vec<String>,
    /// Print the authors found and exit
    #[arg(long)]
    list_authors: bool,
    /// Pages fetched per repository at most
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    max_pages: u32,
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    per_page: u8,
    #[arg(long)]
    merged_csv: Option<PathBuf>,
    #[arg(long)]
    closed_csv: Option<PathBuf>,
    #[arg(long)]
    hide_merged: bool,
    #[arg(long)]
    hide_closed: bool,
    #[arg(long)]
    hide_merged_authors: bool,
    #[arg(long)]
    hide_closed_authors: bool,
    #[arg(long)]
    hide_evolution: bool,
}

#[derive(Args)]
struct CompaniesArgs {
    /// Activity, name, ...
    keyword: String,
    #[arg(long, default_value_t = companies::DEFAULT_RESULTS)]
    count: u8,
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Prs(args) => pull_requests(args).await,
        Command::Companies(args) => search_companies(args).await,
        Command::Oracle => {
            println!("{}", oracle::consult(&mut rand::thread_rng()));
            println!("Revealed on {}", Local::now().format("%A %d %B %Y, %H:%M:%S"));
            Ok(())
        }
    }
}

async fn pull_requests(args: PrsArgs) -> Result<()> {
    // Fail on a missing token before anything goes over the network.
    let token = GitHubToken::from_env()?;
    let target = Target::parse(&args.url)?;
    let paginator = Paginator::new(args.max_pages, args.per_page)?;
    let client = GitHubClient::new(&token)?;

    match &target {
        Target::Repository { .. } => info!("Single repository mode: {}", target),
        Target::Account { .. } => info!("Full account mode: {}", target),
    }
    info!(
        "Fetching at most {} pages of {} pull requests per repository",
        paginator.max_pages(),
        paginator.page_size()
    );
    let collection = github::collect(&client, &target, &paginator).await?;
    info!("{} closed pull requests fetched", collection.pulls.len());

    let authors = pulls::authors(&collection.pulls);
    if args.list_authors {
        for author in &authors {
            println!("{}", author);
        }
        return Ok(());
    }
    for unknown in args.authors.iter().filter(|a| !authors.contains(*a)) {
        warn!("No pull request by {}", unknown);
    }

    let classified = pulls::classify(&collection.pulls, &args.authors, args.range.limit(Utc::now()));
    if classified.is_empty() {
        println!("No data to display.");
        return Ok(());
    }

    for (title, rows, hidden) in [
        ("Merged PRs", &classified.merged, args.hide_merged),
        ("Closed PRs", &classified.closed, args.hide_closed),
    ] {
        if hidden {
            continue;
        }
        println!("\n{}\n", title);
        if rows.is_empty() {
            println!("No {} found.", title);
        } else {
            print!("{}", report::render_table(rows));
        }
    }

    for (title, rows, hidden) in [
        ("Merged PRs", &classified.merged, args.hide_merged_authors),
        ("Closed PRs", &classified.closed, args.hide_closed_authors),
    ] {
        if hidden {
            continue;
        }
        println!("\n{} by author\n", title);
        if rows.is_empty() {
            println!("No {} found.", title);
        } else {
            print!("{}", report::render_bars(&report::top_authors(rows, TOP_AUTHORS)));
        }
    }

    if !args.hide_evolution {
        println!("\nPR trends over time\n");
        print!(
            "{}",
            report::render_evolution(&report::evolution(&classified.merged, &classified.closed))
        );
    }

    if let Some(path) = &args.merged_csv {
        report::export_csv(path, &classified.merged).await?;
    }
    if let Some(path) = &args.closed_csv {
        report::export_csv(path, &classified.closed).await?;
    }

    if !collection.truncated.is_empty() {
        println!(
            "\nResults may be incomplete for {} (raise --max-pages to fetch more).",
            collection.truncated.join(", ")
        );
    }
    Ok(())
}

async fn search_companies(args: CompaniesArgs) -> Result<()> {
    let found = Registry::default().search(&args.keyword, args.count).await?;
    if found.is_empty() {
        println!("No company found.");
        return Ok(());
    }

    println!("{} companies found for « {} »\n", found.len(), args.keyword);
    let cells: Vec<Vec<String>> = found.iter().map(|c| c.cells()).collect();
    print!("{}", report::render_grid(&companies::HEADER, &cells));

    if let Some(path) = &args.csv {
        report::export_csv(path, &found).await?;
    }
    Ok(())
}

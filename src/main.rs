//! entregas - command-line front end.
//!
//! ```bash
//! # replay entregas/tp1 into the tp1 branch of a student's repository
//! entregas sync 54321 entregas/tp1 --branch tp1
//!
//! # same for a group, creating the repository first if needed
//! entregas sync G07 entregas/tp2 --branch tp2 --grupo --create
//!
//! # where does a student's work live
//! entregas show 54321 --entrega tp2
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use entregas::config::Config;
use entregas::history::LocalHistory;
use entregas::provision::{self, Provisioned};
use entregas::remote::{BranchName, GithubClient, ObjectStore, RepositoryIdentity};
use entregas::roster::{Roster, StudentRepo};
use entregas::sync::{ReplayOptions, Replayer, SyncReport, SyncRequest};

#[derive(Parser, Debug)]
#[command(name = "entregas")]
#[command(version)]
#[command(about = "Replay assignment history into student repositories")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "CORRECTOR_CONFIG", default_value = "conf/entregas.yml")]
    config: PathBuf,

    /// GitHub token, overrides the configured one
    #[arg(long, global = true, env = "CORRECTOR_GH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log every API call
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay pending changes of an entrega into a student repository
    Sync(SyncArgs),

    /// Create the repository if it does not exist
    Ensure {
        #[command(flatten)]
        who: Who,
        /// Repository to seed a new repository from (owner/name)
        #[arg(long)]
        skeleton: Option<String>,
    },

    /// Print the repository, URL and usernames of a student or group
    Show {
        #[command(flatten)]
        who: Who,
    },

    /// Print the current tip of a branch
    Status {
        #[command(flatten)]
        who: Who,
        #[arg(long)]
        branch: String,
    },
}

/// Which repository to work on.
#[derive(Args, Debug)]
struct Who {
    /// Legajo, several joined with '_', or a group id with --grupo
    key: String,
    /// Treat KEY as a group id
    #[arg(long)]
    grupo: bool,
    /// Entrega id, selects the group column for group entregas
    #[arg(long)]
    entrega: Option<String>,
    /// Roster column to read the repository from
    #[arg(long, conflicts_with = "entrega")]
    column: Option<String>,
}

#[derive(Args, Debug)]
struct SyncArgs {
    #[command(flatten)]
    who: Who,
    /// Directory holding the entrega inside its git repository
    entrega_dir: PathBuf,
    /// Branch to update
    #[arg(long)]
    branch: String,
    /// Directory in the student repository (default: the branch name, "" for the root)
    #[arg(long)]
    target: Option<String>,
    /// Create the repository first if it does not exist
    #[arg(long)]
    create: bool,
    /// Fail if the branch moves while syncing
    #[arg(long)]
    check_tip: bool,
    /// Only list what would be replayed
    #[arg(long)]
    dry_run: bool,
    /// Seed for author selection
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "entregas=debug" } else { "entregas=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> entregas::Result<()> {
    let mut config = Config::load(&cli.config)?;
    if let Some(token) = cli.token {
        config = config.token(token);
    }
    let roster = Roster::from_config(&config)?;

    match cli.command {
        Commands::Sync(args) => cmd_sync(&config, &roster, args),
        Commands::Ensure { who, skeleton } => {
            let repo = resolve(&roster, &who)?;
            let skeleton = skeleton.or_else(|| config.skeleton_repo.clone());
            cmd_ensure(&config, &repo, skeleton.as_deref())
        }
        Commands::Show { who } => {
            let repo = resolve(&roster, &who)?;
            cmd_show(&config, &repo);
            Ok(())
        }
        Commands::Status { who, branch } => {
            let repo = resolve(&roster, &who)?;
            cmd_status(&config, &repo, &branch)
        }
    }
}

fn resolve(roster: &Roster, who: &Who) -> entregas::Result<StudentRepo> {
    let repo = if who.grupo {
        roster.from_grupo(&who.key)?
    } else {
        roster.from_legajo(&who.key, who.entrega.as_deref(), who.column.as_deref())?
    };
    Ok(repo)
}

fn cmd_sync(config: &Config, roster: &Roster, args: SyncArgs) -> entregas::Result<()> {
    let repo = resolve(roster, &args.who)?;
    let client = GithubClient::new(&config.github);

    if args.create {
        cmd_ensure(config, &repo, config.skeleton_repo.as_deref())?;
    }

    let history = LocalHistory::open(&args.entrega_dir)?;
    let subdir = history.relative_path(&args.entrega_dir)?;
    let mut request = SyncRequest::new(BranchName::new(args.branch)?, subdir, repo.contributors()?);
    if let Some(target) = args.target {
        request = request.target_dir(target);
    }

    let options = ReplayOptions {
        check_tip: args.check_tip,
        dry_run: args.dry_run,
        exclude: config.exclude.clone(),
    };
    let store = client.store(repo.identity.clone());
    let report = match args.seed {
        Some(seed) => Replayer::new(store, StdRng::seed_from_u64(seed))
            .options(options)
            .sync(&history, &request)?,
        None => Replayer::new(store, rand::thread_rng())
            .options(options)
            .sync(&history, &request)?,
    };

    print_report(&repo, &report);
    Ok(())
}

fn cmd_ensure(config: &Config, repo: &StudentRepo, skeleton: Option<&str>) -> entregas::Result<()> {
    let client = GithubClient::new(&config.github);
    let skeleton = skeleton.map(RepositoryIdentity::new).transpose()?;

    match provision::ensure_exists(&client, &config.github, &repo.identity, skeleton.as_ref())? {
        Provisioned::Existing => println!("{} already exists", repo.identity),
        Provisioned::Created { seeded_branches } => {
            println!("created {} ({} branches seeded)", repo.url(&config.github.web_url), seeded_branches)
        }
    }
    Ok(())
}

fn cmd_show(config: &Config, repo: &StudentRepo) {
    println!("repository: {}", repo.identity);
    println!("url:        {}", repo.url(&config.github.web_url));
    println!(
        "legajos:    {}",
        repo.legajos.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
    );
    println!("github:     {}", repo.github_users.join(", "));
    println!("reviewer:   {}", if repo.has_reviewer(&config.reviewees) { "yes" } else { "no" });
}

fn cmd_status(config: &Config, repo: &StudentRepo, branch: &str) -> entregas::Result<()> {
    let client = GithubClient::new(&config.github);
    let store = client.store(repo.identity.clone());
    let branch = BranchName::new(branch)?;

    let tip = store.read_ref(&branch)?;
    let commit = store.read_commit(&tip)?;
    println!("{} {} @ {}", repo.identity, branch, tip);
    println!("author: {} <{}>", commit.author_name, commit.author_email);
    println!("date:   {}", commit.authored.to_rfc3339());
    println!("        {}", commit.message.lines().next().unwrap_or(""));
    println!();
    for item in store.read_tree(&commit.tree)? {
        println!("{} {:<6} {}  {}", item.mode, item.kind, item.sha.short(), item.path);
    }
    Ok(())
}

fn print_report(repo: &StudentRepo, report: &SyncReport) {
    if report.is_noop() {
        println!("{} {}: up to date", repo.identity, report.branch);
        return;
    }

    for change in &report.changes {
        let commit = change.commit.as_ref().map(|sha| sha.short()).unwrap_or("-------");
        let author = change.author.as_deref().unwrap_or("");
        println!("{} -> {}  {}  {}", change.source.short(), commit, author, change.summary);
    }

    match &report.new_tip {
        Some(tip) => println!(
            "{} {}: {} -> {} ({} changes)",
            repo.identity,
            report.branch,
            report.previous_tip.short(),
            tip.short(),
            report.changes.len()
        ),
        None => println!(
            "{} {}: {} changes pending (dry run)",
            repo.identity,
            report.branch,
            report.changes.len()
        ),
    }
}

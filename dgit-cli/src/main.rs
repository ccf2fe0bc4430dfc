//! dgit command-line interface

mod render;

use anyhow::{Context, Result, bail};
use clap::{ArgGroup, Parser, Subcommand};
use dgit_core::{ObjectId, ObjectKind, Repository, Signature};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "dgit")]
#[command(author = "dgit Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Minimal content-addressed version control", long_about = None)]
struct Cli {
    /// Run as if started in this directory
    #[arg(short = 'C', global = true, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an empty repository in the current directory
    Init,

    /// Compute the blob id of a file
    HashObject {
        /// Also write the blob into the object store
        #[arg(short)]
        w: bool,
        file: PathBuf,
    },

    /// Store files as blobs and stage them in the index
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// List staged paths
    LsFiles {
        /// Show mode and object id too
        #[arg(short, long)]
        stage: bool,
    },

    /// Snapshot the work tree as a tree object
    WriteTree,

    /// Create a commit object for a tree
    CommitTree {
        tree: String,
        #[arg(short = 'm', long = "message")]
        message: String,
        #[arg(short = 'p', long = "parent")]
        parent: Option<String>,
    },

    /// Show history from a commit back to the root
    Log { commit: String },

    /// List the entries of a tree object
    LsTree { tree: String },

    /// Show an object's content, type or size
    #[command(group(ArgGroup::new("mode").required(true).args(["pretty", "kind", "size"])))]
    CatFile {
        #[arg(short = 'p')]
        pretty: bool,
        #[arg(short = 't')]
        kind: bool,
        #[arg(short = 's')]
        size: bool,
        object: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = match &cli.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    run(cli.command, &cwd)
}

fn init_tracing(verbose: bool) {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands, cwd: &Path) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Init => {
            let repo = Repository::init(cwd)?;
            writeln!(
                out,
                "Initialized empty dgit repository in {}",
                repo.git_dir().display()
            )?;
        }

        Commands::HashObject { w, file } => {
            let path = cwd.join(file);
            let id = if w {
                Repository::discover(cwd)?.hash_file(&path, true)?
            } else {
                let content = std::fs::read(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                dgit_core::hash_object(ObjectKind::Blob, &content)
            };
            writeln!(out, "{}", id)?;
        }

        Commands::Add { paths } => {
            let repo = Repository::discover(cwd)?;
            for path in paths {
                let staged = repo.add(&cwd.join(&path))?;
                debug!(path = %staged.path, id = %staged.id, "staged");
            }
        }

        Commands::LsFiles { stage } => {
            let repo = Repository::discover(cwd)?;
            for entry in repo.index().load()? {
                if stage {
                    writeln!(out, "{:06o} {}\t{}", entry.mode, entry.hash, entry.path)?;
                } else {
                    writeln!(out, "{}", entry.path)?;
                }
            }
        }

        Commands::WriteTree => {
            let repo = Repository::discover(cwd)?;
            writeln!(out, "{}", repo.write_tree()?)?;
        }

        Commands::CommitTree {
            tree,
            message,
            parent,
        } => {
            let repo = Repository::discover(cwd)?;
            let tree = parse_id(&tree)?;
            let parent = parent.as_deref().map(parse_id).transpose()?;
            let sig = signature(&repo);
            let id = repo.commit_tree_with(tree, parent, &message, sig.clone(), sig)?;
            writeln!(out, "{}", id)?;
        }

        Commands::Log { commit } => {
            let repo = Repository::discover(cwd)?;
            let start = parse_id(&commit)?;
            for (i, step) in repo.log(start).enumerate() {
                let (id, commit) = step?;
                if i > 0 {
                    writeln!(out)?;
                }
                write!(out, "{}", render::log_entry(&id, &commit))?;
            }
        }

        Commands::LsTree { tree } => {
            let repo = Repository::discover(cwd)?;
            let entries = repo.read_tree(&parse_id(&tree)?)?;
            write!(out, "{}", render::tree_listing(&entries))?;
        }

        Commands::CatFile {
            pretty,
            kind,
            size: _,
            object,
        } => {
            let repo = Repository::discover(cwd)?;
            let id = parse_id(&object)?;
            if kind {
                let (kind, _) = repo.objects().read_header(&id)?;
                writeln!(out, "{}", kind)?;
            } else if pretty {
                let (kind, payload) = repo.objects().get(&id)?;
                match kind {
                    ObjectKind::Tree => {
                        let entries = dgit_core::tree::decode(&payload)?;
                        write!(out, "{}", render::tree_listing(&entries))?;
                    }
                    ObjectKind::Blob | ObjectKind::Commit => out.write_all(&payload)?,
                }
            } else {
                let (_, size) = repo.objects().read_header(&id)?;
                writeln!(out, "{}", size)?;
            }
        }
    }

    out.flush()?;
    Ok(())
}

fn parse_id(hex: &str) -> Result<ObjectId> {
    match hex.parse::<ObjectId>() {
        Ok(id) => Ok(id),
        Err(_) => bail!("Not a valid object id: {:?} (expected 40 hex characters)", hex),
    }
}

/// Configured identity, overridden by `DGIT_AUTHOR_NAME` / `DGIT_AUTHOR_EMAIL`
fn signature(repo: &Repository) -> Signature {
    let mut sig = repo.signature();
    if let Ok(name) = std::env::var("DGIT_AUTHOR_NAME") {
        sig.name = name;
    }
    if let Ok(email) = std::env::var("DGIT_AUTHOR_EMAIL") {
        sig.email = email;
    }
    sig
}

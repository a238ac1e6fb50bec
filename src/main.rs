use std::collections::HashMap;
use std::path::PathBuf;

use bytesize::ByteSize;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use skiff::cli::args::{Cli, Commands, GetArgs, PutArgs, TreeArgs};
use skiff::config::{paths::skiff_config_dir, Settings, Verbosity};
use skiff::engine::{plan_downloads, plan_uploads, TransferEngine, TransferOutcome, TransferTask};
use skiff::error::SkiffError;
use skiff::progress::{bar, progress_channel};
use skiff::select::Selection;
use skiff::store::dir::DirStore;
use skiff::store::ObjectStore;
use skiff::tree::{KeyForest, NodeId, NodeKind};

fn main() {
    let cli = Cli::parse();

    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);

    // RUST_LOG env var overrides CLI flags
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(verbosity.as_tracing_filter())),
        )
        .with_writer(std::io::stderr) // Keep stdout clean for output
        .init();

    if let Err(err) = run(cli) {
        display_error(&err);
        std::process::exit(1);
    }
}

/// Execute the dispatched command.
fn run(cli: Cli) -> Result<(), SkiffError> {
    let config_dir = match &cli.config_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            dir.clone()
        }
        None => skiff_config_dir()?,
    };
    let mut settings = Settings::load(&config_dir);
    let quiet = cli.quiet;

    match cli.command {
        Commands::Connect(args) => {
            settings.set_connection(args.endpoint.clone(), args.access_key, args.secret_key);
            settings.save(&config_dir)?;
            tracing::info!(endpoint = %args.endpoint, "connection parameters saved");
            if !quiet {
                eprintln!("Connection saved for {}", args.endpoint);
            }
            Ok(())
        }
        Commands::Output(args) => {
            settings.output_folder = args.folder.clone();
            settings.save(&config_dir)?;
            if !quiet {
                eprintln!("Output folder set to {}", args.folder.display());
            }
            Ok(())
        }
        Commands::Buckets(args) => {
            let store = open_store(args.store.as_ref(), &settings)?;
            for bucket in store.list_buckets()? {
                println!("{}", bucket.name);
            }
            Ok(())
        }
        Commands::Tree(args) => cmd_tree(args, &settings),
        Commands::Get(args) => cmd_get(args, &settings, quiet),
        Commands::Put(args) => cmd_put(args, &settings, quiet),
    }
}

/// Resolve the store root: `--store` flag first, configured endpoint next.
fn open_store(flag: Option<&PathBuf>, settings: &Settings) -> Result<DirStore, SkiffError> {
    let root = match flag {
        Some(path) => path.clone(),
        None => {
            if settings.endpoint.is_empty() {
                return Err(SkiffError::Connection {
                    endpoint: "(unset)".to_string(),
                    reason: "no store configured; pass --store or run `skiff connect`".to_string(),
                });
            }
            PathBuf::from(&settings.endpoint)
        }
    };
    DirStore::open(&root)
}

fn cmd_tree(args: TreeArgs, settings: &Settings) -> Result<(), SkiffError> {
    let store = open_store(args.store.as_ref(), settings)?;

    let buckets = match &args.bucket {
        Some(name) => vec![name.clone()],
        None => store
            .list_buckets()?
            .into_iter()
            .map(|b| b.name)
            .collect(),
    };

    let mut forest = KeyForest::new();
    for name in &buckets {
        let objects = store.list_objects(name)?;
        let count = objects.len();
        let total: u64 = objects.iter().filter_map(|o| o.size).sum();
        println!("{} ({} objects, {})", name, count, ByteSize(total));

        let root = forest.add_bucket(name);
        for object in objects {
            forest.insert_key(root, &object.key);
        }
        for &child in forest.children(root) {
            print_node(&forest, child, 1);
        }
    }
    Ok(())
}

fn print_node(forest: &KeyForest, id: NodeId, depth: usize) {
    let node = forest.node(id);
    let marker = match node.kind {
        NodeKind::Directory => "/",
        NodeKind::File => "",
    };
    println!("{}{}{}", "  ".repeat(depth), node.name, marker);
    for &child in forest.children(id) {
        print_node(forest, child, depth + 1);
    }
}

fn cmd_get(args: GetArgs, settings: &Settings, quiet: bool) -> Result<(), SkiffError> {
    let store = open_store(args.store.as_ref(), settings)?;
    let output_root = args
        .output
        .unwrap_or_else(|| settings.output_folder.clone());

    // Fresh listing so directory selections see the current namespace
    let forest = KeyForest::from_store(&store)?;
    let selection = resolve_selection(&forest, &args.paths)?;
    if selection.is_empty() {
        if !quiet {
            eprintln!("Nothing to download.");
        }
        return Ok(());
    }

    let tasks = plan_downloads(selection.paths(), &output_root)?;
    let engine = TransferEngine::new(args.jobs);
    let outcomes = run_batch(&engine, &store, tasks, quiet);
    summarize(&outcomes, "Downloaded", quiet)
}

fn cmd_put(args: PutArgs, settings: &Settings, quiet: bool) -> Result<(), SkiffError> {
    let store = open_store(args.store.as_ref(), settings)?;

    let tasks = plan_uploads(&args.sources, &args.bucket, &args.prefix)?;
    if tasks.is_empty() {
        if !quiet {
            eprintln!("Nothing to upload.");
        }
        return Ok(());
    }

    let engine = TransferEngine::new(args.jobs);
    let outcomes = run_batch(&engine, &store, tasks, quiet);
    summarize(&outcomes, "Uploaded", quiet)
}

/// Run the engine on a worker thread while the progress consumer drains
/// events on this one. Returns once every task has an outcome.
fn run_batch(
    engine: &TransferEngine,
    store: &dyn ObjectStore,
    tasks: Vec<TransferTask>,
    quiet: bool,
) -> Vec<TransferOutcome> {
    let labels: HashMap<u64, String> = tasks
        .iter()
        .map(|t| (t.id, t.remote_path()))
        .collect();
    let (reporter, rx) = progress_channel();

    std::thread::scope(|scope| {
        let handle = scope.spawn(move || engine.run(store, tasks, reporter));
        bar::render(rx, &labels, quiet);
        handle.join().expect("transfer batch panicked")
    })
}

/// Report batch results; partial failure is an error exit but never
/// hides the successes.
fn summarize(
    outcomes: &[TransferOutcome],
    verb: &str,
    quiet: bool,
) -> Result<(), SkiffError> {
    let ok = outcomes.iter().filter(|o| o.error.is_none()).count();
    let failed = outcomes.len() - ok;

    if !quiet {
        eprintln!("{} {} file(s)", verb, ok);
    }
    if failed > 0 {
        eprintln!("{} transfer(s) failed:", failed);
        for outcome in outcomes.iter().filter(|o| o.error.is_some()) {
            eprintln!(
                "  {}: {}",
                outcome.task.remote_path(),
                outcome.error.as_ref().expect("filtered on error")
            );
        }
        return Err(SkiffError::Io {
            source: std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("{} transfer(s) failed", failed),
            ),
        });
    }
    Ok(())
}

/// Map CLI path arguments onto the forest.
///
/// A path naming a file selects that leaf; a path naming a directory
/// (or a bare bucket) selects every file underneath it.
fn resolve_selection(forest: &KeyForest, paths: &[String]) -> Result<Selection, SkiffError> {
    let mut selection = Selection::new();
    for path in paths {
        let node = find_node(forest, path).ok_or_else(|| {
            let (bucket, key) = path.split_once('/').unwrap_or((path.as_str(), ""));
            SkiffError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }
        })?;
        match forest.node(node).kind {
            NodeKind::File => selection.add(&forest.full_path(node)),
            NodeKind::Directory => selection.add_subtree(forest, node),
        }
    }
    Ok(selection)
}

fn find_node(forest: &KeyForest, path: &str) -> Option<NodeId> {
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let bucket = segments.next()?;
    let mut current = forest
        .roots()
        .iter()
        .copied()
        .find(|&id| forest.node(id).name == bucket)?;
    for segment in segments {
        current = forest.child(current, segment)?;
    }
    Some(current)
}

/// Display a SkiffError with optional suggestion hint to stderr.
fn display_error(err: &SkiffError) {
    eprintln!("error: {}", err);
    if let Some(suggestion) = err.suggestion() {
        eprintln!("  hint: {}", suggestion);
    }
}

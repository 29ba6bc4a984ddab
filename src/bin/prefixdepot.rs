use clap::{Parser, Subcommand};
use prefixdepot_core::prefix::sort_records;
use prefixdepot_core::{DepotConfig, PrefixDepot, PrefixKind, PrefixRecord, SortKey};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "prefixdepot")]
#[command(about = "Inventory and clean up Proton compatibility prefixes", long_about = None)]
struct Cli {
    /// Home directory to derive Steam and backup locations from (defaults to $HOME)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List every prefix with its owner, state and size
    List {
        /// Only show rows whose name or app id contains this text
        #[arg(long)]
        filter: Option<String>,
        /// Sort by name, appid, kind, state or size
        #[arg(long)]
        sort: Option<SortKey>,
        /// Reverse the sort order
        #[arg(long)]
        desc: bool,
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete the prefixes of the given app ids
    Delete {
        #[arg(required = true)]
        app_ids: Vec<String>,
        /// Zip each prefix into the backup directory before deleting it
        #[arg(long)]
        backup: bool,
        /// Do not ask for confirmation
        #[arg(long, short)]
        yes: bool,
    },
    /// Delete every prefix no installed game or shortcut claims
    CleanOrphans {
        #[arg(long)]
        backup: bool,
        #[arg(long, short)]
        yes: bool,
    },
}

fn main() {
    let filter =
        EnvFilter::try_from_env("PREFIXDEPOT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Cli::parse();

    let config = match args.home {
        Some(home) => DepotConfig::for_home(&home),
        None => match DepotConfig::from_env() {
            Ok(config) => config,
            Err(e) => {
                error!("Error loading configuration: {:#}", e);
                process::exit(1);
            }
        },
    };
    let mut depot = PrefixDepot::new(config);
    depot.get_inventory();

    let code = match args.command {
        Commands::List {
            filter,
            sort,
            desc,
            json,
        } => run_list(&depot, filter.as_deref(), sort, desc, json),
        Commands::Delete { app_ids, backup, yes } => run_delete(&depot, &app_ids, backup, yes),
        Commands::CleanOrphans { backup, yes } => run_clean_orphans(&depot, backup, yes),
    };

    process::exit(code);
}

fn run_list(
    depot: &PrefixDepot,
    filter: Option<&str>,
    sort: Option<SortKey>,
    desc: bool,
    json: bool,
) -> i32 {
    let mut records = match filter {
        Some(query) => depot.filter(query),
        None => depot.inventory().to_vec(),
    };
    if let Some(key) = sort {
        sort_records(&mut records, key, desc);
    }

    if json {
        match serde_json::to_string_pretty(&records) {
            Ok(out) => println!("{}", out),
            Err(e) => {
                error!("Error serializing inventory: {}", e);
                return 1;
            }
        }
    } else {
        print_table(&records);
    }
    0
}

fn print_table(records: &[PrefixRecord]) {
    println!(
        "{:<40} {:>10} {:<10} {:<9} {:>10}  {}",
        "Game", "AppID", "Type", "Status", "Size", "Install Path"
    );
    for record in records {
        println!(
            "{:<40} {:>10} {:<10} {:<9} {:>10}  {}",
            truncate(&record.name, 40),
            record.app_id,
            record.kind.label(),
            record.status_label(),
            record.size_display,
            record.install_path
        );
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width - 1).collect();
    out.push('~');
    out
}

fn run_delete(depot: &PrefixDepot, app_ids: &[String], backup: bool, yes: bool) -> i32 {
    if !confirm(&format!("Delete {} prefixes?", app_ids.len()), yes) {
        return 0;
    }

    if let [app_id] = app_ids {
        let outcome = depot.delete_one(app_id, backup);
        println!("{}: {}", app_id, outcome.message);
        return if outcome.success { 0 } else { 1 };
    }

    let outcome = depot.delete_many(app_ids, backup);
    println!("Deleted {} prefixes", outcome.removed);
    if !outcome.backed_up.is_empty() {
        println!("Backup saved in: {:?}", depot.config().backup_dir);
    }
    for failure in &outcome.failures {
        println!("Failed: {}", failure);
    }
    if outcome.failures.is_empty() {
        0
    } else {
        1
    }
}

fn run_clean_orphans(depot: &PrefixDepot, backup: bool, yes: bool) -> i32 {
    let count = depot
        .inventory()
        .iter()
        .filter(|record| record.kind == PrefixKind::Orphan)
        .count();
    if count > 0 && !confirm(&format!("{} orphan prefixes found. Delete them?", count), yes) {
        return 0;
    }

    let outcome = depot.delete_orphans(backup);
    println!("Deleted {} orphan prefixes: {}", outcome.removed, outcome.message);
    if outcome.completed() {
        0
    } else {
        1
    }
}

fn confirm(prompt: &str, assume_yes: bool) -> bool {
    if assume_yes {
        return true;
    }
    match prompt_confirm(prompt, Some(false)) {
        Ok(answer) => answer,
        Err(e) => {
            error!("Error reading confirmation: {}", e);
            false
        }
    }
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;

use tabsql::catalog::{Table, TableRegistry};
use tabsql::query::{
    ConcurrencyPolicy, ControllerConfig, ExecutionController, ExecutionOutcome, QueryResultSet,
};

const HISTORY_FILE: &str = ".tabsql_history";
const HISTORY_SHOWN: usize = 10;
const HISTORY_PREVIEW_CHARS: usize = 50;

#[derive(Parser)]
#[command(author, version, about = "tabsql - ad hoc SQL across named in-memory tables")]
struct Cli {
    /// Table to register at startup, as NAME=PATH to a JSON table file (repeatable)
    #[arg(short, long = "table", value_parser = parse_table_arg)]
    tables: Vec<(String, PathBuf)>,

    /// What to do when a query is submitted while another is running
    #[arg(long, value_enum, default_value_t = PolicyArg::Unbounded)]
    policy: PolicyArg,

    /// Give up on a query after this many milliseconds
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Command to execute
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive shell
    Shell,

    /// Execute a SQL query directly
    Query {
        /// SQL query to execute
        query: String,
    },

    /// List registered tables
    Tables,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Unbounded,
    SingleSlot,
}

impl From<PolicyArg> for ConcurrencyPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Unbounded => ConcurrencyPolicy::Unbounded,
            PolicyArg::SingleSlot => ConcurrencyPolicy::SingleSlot,
        }
    }
}

fn parse_table_arg(s: &str) -> Result<(String, PathBuf), String> {
    let (name, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=PATH, got '{}'", s))?;
    Ok((name.to_string(), PathBuf::from(path)))
}

/// Recently executed queries, shown by `.history`
#[derive(Default)]
struct QueryHistory {
    entries: VecDeque<String>,
}

impl QueryHistory {
    fn record(&mut self, sql: &str) {
        let timestamp = Local::now().format("%H:%M:%S");
        let preview: String = sql.chars().take(HISTORY_PREVIEW_CHARS).collect();
        let ellipsis = if sql.chars().count() > HISTORY_PREVIEW_CHARS { "..." } else { "" };
        self.entries.push_back(format!("[{}] {}{}", timestamp, preview, ellipsis));
    }

    fn recent(&self) -> impl Iterator<Item = &String> {
        self.entries.iter().skip(self.entries.len().saturating_sub(HISTORY_SHOWN))
    }
}

/// Registry, controller and history for one shell process
struct Session {
    registry: TableRegistry,
    controller: ExecutionController,
    history: QueryHistory,
}

impl Session {
    fn new(config: ControllerConfig) -> Self {
        Session {
            registry: TableRegistry::new(),
            controller: ExecutionController::new(config),
            history: QueryHistory::default(),
        }
    }

    fn load(&mut self, name: &str, path: &Path, replace: bool) -> Result<()> {
        let table = read_table_file(path)?;
        let (rows, cols) = (table.row_count(), table.column_count());
        if replace {
            self.registry.replace(name, table)?;
        } else {
            self.registry.register(name, table)?;
        }
        println!("Loaded {} ({} rows, {} columns)", name, rows, cols);
        Ok(())
    }

    fn execute_query(&mut self, sql: &str) -> ExecutionOutcome {
        self.history.record(sql);
        let handle = self.controller.submit_from(sql, &self.registry);
        let outcome = handle.wait_with_progress(|progress| {
            eprintln!("[{:>3}%] {}", progress.percent, progress.phase);
        });
        let _ = std::io::stderr().flush();
        outcome
    }
}

fn read_table_file(path: &Path) -> Result<Table> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open table file {}", path.display()))?;
    let table: Table = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to read table file {}", path.display()))?;
    Ok(table.clean()?)
}

enum ShellAction {
    Continue,
    Exit,
}

fn handle_line(session: &mut Session, line: &str) -> Result<ShellAction> {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        ["exit"] | ["quit"] => return Ok(ShellAction::Exit),
        ["help"] => print_help(),
        [".tables"] => print_tables(&session.registry),
        [".schema"] => {
            for name in session.registry.names() {
                if let Some(table) = session.registry.get(name) {
                    println!("{}", table.schema_string(name));
                }
            }
        }
        [".profile", name] => print_profile(&session.registry, name)?,
        [".load", name, path] => session.load(name, Path::new(path), false)?,
        [".load", name, path, "--replace"] => session.load(name, Path::new(path), true)?,
        [".rename", old, new] => {
            session.registry.rename(old, new)?;
            println!("Renamed {} to {}", old, new);
        }
        [".drop", name] => {
            session.registry.remove(name)?;
            println!("Dropped {}", name);
        }
        [".use", name] => session.registry.set_active(name)?,
        [".history"] => {
            for entry in session.history.recent() {
                println!("{}", entry);
            }
        }
        [cmd, ..] if cmd.starts_with('.') => bail!("Unknown command: {}", cmd),
        _ => match session.execute_query(line) {
            ExecutionOutcome::Success(result) => display_result(&result),
            ExecutionOutcome::Failure(err) => println!("Error: {}", err.message()),
        },
    }
    Ok(ShellAction::Continue)
}

fn run_shell(session: &mut Session) -> Result<()> {
    println!("Welcome to tabsql. Type 'help' for assistance or 'exit' to quit.");

    let mut rl = Editor::<(), DefaultHistory>::new()?;
    if let Err(err) = rl.load_history(HISTORY_FILE) {
        if !err.to_string().contains("No such file or directory") {
            println!("Error loading history: {}", err);
        }
    }

    loop {
        let prompt = match session.registry.active_name() {
            Some(active) => format!("tabsql [{}]> ", active),
            None => "tabsql> ".to_string(),
        };
        match rl.readline(&prompt) {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match handle_line(session, line) {
                    Ok(ShellAction::Exit) => {
                        println!("Goodbye!");
                        break;
                    }
                    Ok(ShellAction::Continue) => {}
                    Err(err) => println!("Error: {}", err),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                break;
            }
            Err(err) => {
                println!("Error: {}", err);
                break;
            }
        }
    }

    if let Err(err) = rl.save_history(HISTORY_FILE) {
        println!("Error saving history: {}", err);
    }
    Ok(())
}

fn print_help() {
    println!("Table commands:");
    println!("  .load <name> <file.json> [--replace]  - Register a table from a JSON file");
    println!("  .tables                              - List tables with row and column counts");
    println!("  .schema                              - Show CREATE TABLE text for every table");
    println!("  .profile <name>                      - Non-null and distinct counts per column");
    println!("  .rename <old> <new>                  - Rename a table");
    println!("  .drop <name>                         - Remove a table");
    println!("  .use <name>                          - Make a table the active one");
    println!("  .history                             - Show the last {} queries", HISTORY_SHOWN);
    println!();
    println!("Anything else is run as one SQL statement against all registered tables.");
    println!();
    println!("Other commands:");
    println!("  help                                 - Display this help message");
    println!("  exit                                 - Exit the shell");
}

fn print_tables(registry: &TableRegistry) {
    if registry.is_empty() {
        println!("No tables loaded");
        return;
    }
    for summary in registry.summaries() {
        let marker = if summary.active { "*" } else { " " };
        println!("{} {:<24} {:>8} rows {:>4} columns", marker, summary.name, summary.rows, summary.columns);
    }
}

fn print_profile(registry: &TableRegistry, name: &str) -> Result<()> {
    let table = registry
        .get(name)
        .ok_or_else(|| anyhow!("Table not found: {}", name))?;
    for profile in table.column_profiles() {
        let pct = |n: usize| if profile.total == 0 { 0.0 } else { n as f64 / profile.total as f64 * 100.0 };
        println!(
            "{:<24} {:<10} non-null {}/{} ({:.1}%)  distinct {} ({:.1}%)",
            profile.name,
            profile.data_type,
            profile.non_null,
            profile.total,
            pct(profile.non_null),
            profile.distinct,
            pct(profile.distinct),
        );
    }
    Ok(())
}

fn display_result(result: &QueryResultSet) {
    if result.row_count() == 0 {
        println!("{}", result.empty_message());
    } else {
        println!("{}", result.to_string_table());
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ControllerConfig {
        policy: cli.policy.into(),
        deadline: cli.deadline_ms.map(Duration::from_millis),
        ..ControllerConfig::default()
    };
    let mut session = Session::new(config);
    for (name, path) in &cli.tables {
        session
            .load(name, path, false)
            .with_context(|| format!("Failed to register table {}", name))?;
    }

    match &cli.command {
        Some(Commands::Query { query }) => match session.execute_query(query) {
            ExecutionOutcome::Success(result) => display_result(&result),
            ExecutionOutcome::Failure(err) => bail!("Error executing query: {}", err.message()),
        },
        Some(Commands::Tables) => print_tables(&session.registry),
        Some(Commands::Shell) | None => run_shell(&mut session)?,
    }

    Ok(())
}

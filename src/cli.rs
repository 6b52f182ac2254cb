//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_feed_adapter::CsvFeedAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{validate_feed_config, EngineConfig};
use crate::domain::editor::GraphEditor;
use crate::domain::error::FlowtraderError;
use crate::domain::graph::StrategyGraph;
use crate::domain::resolver::vpi_options;
use crate::ports::config_port::ConfigPort;
use crate::ports::feed_port::StateFeed;

#[derive(Parser, Debug)]
#[command(name = "flowtrader", about = "Node-based trading strategy engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a strategy graph file
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
    },
    /// Evaluate one node's expression against a snapshot
    Eval {
        #[arg(short, long)]
        strategy: PathBuf,
        /// Snapshot CSV; overrides the config's [feed] path
        #[arg(long)]
        snapshot: Option<PathBuf>,
        #[arg(short, long)]
        node: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// List the position identifiers referenced by a strategy graph
    Vpis {
        #[arg(short, long)]
        strategy: PathBuf,
    },
    /// Validate a strategy graph file and print it back in canonical JSON
    Export {
        #[arg(short, long)]
        strategy: PathBuf,
    },
    /// Save a strategy graph file to the store
    Save {
        #[arg(short, long)]
        strategy: PathBuf,
        #[arg(long)]
        id: String,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List stored strategies
    List {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print a stored strategy graph as JSON
    Show {
        #[arg(long)]
        id: String,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Delete a stored strategy
    Delete {
        #[arg(long)]
        id: String,
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Validate { strategy } => run_validate(&strategy),
        Command::Eval {
            strategy,
            snapshot,
            node,
            config,
        } => run_eval(&strategy, snapshot.as_ref(), &node, config.as_ref()),
        Command::Vpis { strategy } => run_vpis(&strategy),
        Command::Export { strategy } => run_export(&strategy),
        Command::Save {
            strategy,
            id,
            config,
        } => run_save(&strategy, &id, &config),
        Command::List { config } => run_list(&config),
        Command::Show { id, config } => run_show(&id, &config),
        Command::Delete { id, config } => run_delete(&id, &config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = FlowtraderError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Read a strategy graph file and install it into an editor through the same
/// validation path `import` uses everywhere else.
fn load_editor(strategy_path: &PathBuf, history_limit: usize) -> Result<GraphEditor, ExitCode> {
    let serialized = fs::read_to_string(strategy_path).map_err(|e| {
        eprintln!("error: failed to read {}: {e}", strategy_path.display());
        ExitCode::from(1)
    })?;

    let mut editor = GraphEditor::new(StrategyGraph::new(Vec::new(), Vec::new()), history_limit);
    editor.import(&serialized).map_err(|e| {
        report_graph_error(&e);
        ExitCode::from(&e)
    })?;
    Ok(editor)
}

fn report_graph_error(err: &FlowtraderError) {
    match err {
        FlowtraderError::GraphInvalid { violations } => {
            eprintln!("error: graph is invalid ({} violations)", violations.len());
            for v in violations {
                eprintln!("  [{}] {}", v.rule, v.message);
            }
        }
        other => eprintln!("error: {other}"),
    }
}

fn run_validate(strategy_path: &PathBuf) -> ExitCode {
    eprintln!("Validating strategy: {}", strategy_path.display());
    let editor = match load_editor(strategy_path, 1) {
        Ok(e) => e,
        Err(code) => return code,
    };

    let graph = editor.graph();
    eprintln!(
        "Graph is valid: {} nodes, {} edges",
        graph.nodes.len(),
        graph.edges.len()
    );
    let with_expr = graph
        .nodes
        .iter()
        .filter(|n| n.data.expression.is_some())
        .count();
    eprintln!("  {} nodes carry an expression", with_expr);
    ExitCode::SUCCESS
}

fn run_eval(
    strategy_path: &PathBuf,
    snapshot_path: Option<&PathBuf>,
    node_id: &str,
    config_path: Option<&PathBuf>,
) -> ExitCode {
    let mut history_limit = EngineConfig::default().history_limit;
    let mut adapter = None;

    if let Some(path) = config_path {
        let config = match load_config(path) {
            Ok(a) => a,
            Err(code) => return code,
        };
        let engine = match EngineConfig::from_config(&config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };
        history_limit = engine.history_limit;
        adapter = Some(config);
    }

    // --snapshot wins over [feed] path; the pinned [feed] clock applies either way
    let feed = match (snapshot_path, adapter.as_ref()) {
        (Some(path), config) => {
            let mut feed = CsvFeedAdapter::new(path);
            if let Some(raw) = config.and_then(|c| c.get_string("feed", "clock")) {
                use crate::adapters::csv_feed_adapter::CLOCK_FORMAT;
                match chrono::NaiveDateTime::parse_from_str(&raw, CLOCK_FORMAT) {
                    Ok(clock) => feed = feed.with_clock(clock),
                    Err(e) => {
                        eprintln!("error: invalid [feed] clock: {e}");
                        return ExitCode::from(2);
                    }
                }
            }
            feed
        }
        (None, Some(config)) => {
            if let Err(e) = validate_feed_config(config) {
                eprintln!("error: {e}");
                return (&e).into();
            }
            match CsvFeedAdapter::from_config(config) {
                Ok(feed) => feed,
                Err(e) => {
                    eprintln!("error: {e}");
                    return (&e).into();
                }
            }
        }
        (None, None) => {
            eprintln!("error: either --snapshot or --config with a [feed] path is required");
            return ExitCode::from(2);
        }
    };

    let editor = match load_editor(strategy_path, history_limit) {
        Ok(e) => e,
        Err(code) => return code,
    };

    let ctx = match feed.snapshot() {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    match editor.evaluate_node(node_id, &ctx) {
        Ok(value) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_vpis(strategy_path: &PathBuf) -> ExitCode {
    let editor = match load_editor(strategy_path, 1) {
        Ok(e) => e,
        Err(code) => return code,
    };

    let options = vpi_options(editor.graph());
    if options.is_empty() {
        eprintln!("No position identifiers referenced");
    } else {
        for vpi in &options {
            println!("{vpi}");
        }
    }
    ExitCode::SUCCESS
}

fn run_export(strategy_path: &PathBuf) -> ExitCode {
    let editor = match load_editor(strategy_path, 1) {
        Ok(e) => e,
        Err(code) => return code,
    };

    match editor.export() {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_save(strategy_path: &PathBuf, strategy_id: &str, config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_store_adapter::SqliteStoreAdapter;
        use crate::adapters::user_provider::StaticUserProvider;
        use crate::domain::config_validation::validate_store_config;

        if let Err(e) = validate_store_config(&config) {
            eprintln!("error: {e}");
            return (&e).into();
        }

        let store = match SqliteStoreAdapter::from_config(&config) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };
        let users = StaticUserProvider::from_config(&config);

        let mut editor = match load_editor(strategy_path, 1) {
            Ok(e) => e,
            Err(code) => return code,
        };

        match editor.save(&store, &users, strategy_id) {
            Ok(()) => {
                eprintln!("Saved strategy {strategy_id}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                report_graph_error(&e);
                (&e).into()
            }
        }
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (config, strategy_path, strategy_id);
        eprintln!("error: sqlite feature is required for save");
        ExitCode::from(1)
    }
}

fn run_list(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::ports::store_port::StrategyStore;

        let (store, user_id) = match open_store(&config) {
            Ok(pair) => pair,
            Err(code) => return code,
        };

        let summaries = match store.list(&user_id) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        if summaries.is_empty() {
            eprintln!("No strategies stored for {user_id}");
        } else {
            for summary in &summaries {
                println!("{}  {}", summary.created_at, summary.id);
            }
        }
        ExitCode::SUCCESS
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = config;
        eprintln!("error: sqlite feature is required for list");
        ExitCode::from(1)
    }
}

fn run_show(strategy_id: &str, config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::ports::store_port::StrategyStore;

        let (store, user_id) = match open_store(&config) {
            Ok(pair) => pair,
            Err(code) => return code,
        };

        let record = match store.load(&user_id, strategy_id) {
            Ok(Some(r)) => r,
            Ok(None) => {
                eprintln!("error: no strategy {strategy_id} for {user_id}");
                return ExitCode::from(3);
            }
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        match serde_json::to_string_pretty(&record.graph) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                let err = FlowtraderError::from(e);
                eprintln!("error: {err}");
                (&err).into()
            }
        }
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (config, strategy_id);
        eprintln!("error: sqlite feature is required for show");
        ExitCode::from(1)
    }
}

fn run_delete(strategy_id: &str, config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::ports::store_port::StrategyStore;

        let (store, user_id) = match open_store(&config) {
            Ok(pair) => pair,
            Err(code) => return code,
        };

        match store.delete(&user_id, strategy_id) {
            Ok(()) => {
                eprintln!("Deleted strategy {strategy_id}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                (&e).into()
            }
        }
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (config, strategy_id);
        eprintln!("error: sqlite feature is required for delete");
        ExitCode::from(1)
    }
}

#[cfg(feature = "sqlite")]
fn open_store(
    config: &FileConfigAdapter,
) -> Result<(crate::adapters::sqlite_store_adapter::SqliteStoreAdapter, String), ExitCode> {
    use crate::adapters::sqlite_store_adapter::SqliteStoreAdapter;
    use crate::adapters::user_provider::StaticUserProvider;
    use crate::domain::config_validation::validate_store_config;
    use crate::ports::store_port::CurrentUserProvider;

    if let Err(e) = validate_store_config(config) {
        eprintln!("error: {e}");
        return Err((&e).into());
    }

    let store = SqliteStoreAdapter::from_config(config).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })?;

    let user_id = StaticUserProvider::from_config(config)
        .current_user_id()
        .ok_or_else(|| {
            eprintln!("error: [store] user is required");
            ExitCode::from(2)
        })?;

    Ok((store, user_id))
}

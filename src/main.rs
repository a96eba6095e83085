//! `tu`: command line front end of the translation-unit engine.
//!
//! Every command opens one [`Engine`] session on the configured cache and
//! index, runs, and exits with a status scripts can branch on.

use anyhow::{Context, anyhow};
use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tu_intel::ast::PrintOptions;
use tu_intel::completion::CancellationToken;
use tu_intel::display::{
    THEME, create_build_table, create_cache_table, create_completion_table, create_spinner,
    create_symbol_table,
};
use tu_intel::engine::{Engine, QueryFilter};
use tu_intel::indexing::{BuildOptions, BuildStatus};
use tu_intel::parsing::get_registry;
use tu_intel::unit::{CompileContext, SourceFile};
use tu_intel::{Settings, SymbolKind, TuError, logging};

/// Nothing matched, but the command itself worked.
const EXIT_NOT_FOUND: u8 = 3;
/// At least one file of a build failed.
const EXIT_BUILD_ERRORS: u8 = 4;
const EXIT_CONFIG: u8 = 6;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Translation-unit intelligence
#[derive(Parser)]
#[command(
    name = "tu",
    version = env!("CARGO_PKG_VERSION"),
    about = "Incremental parsing, symbol resolution and completion for Java, Python, C and C++",
    next_line_help = true,
    styles = clap_cargo_style()
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (overridden by TU_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .tu/settings.toml with defaults
    Init {
        #[arg(short, long)]
        force: bool,
    },

    /// Print the active configuration
    Config,

    /// Build files or directories and update the symbol index
    #[command(
        after_help = "Examples:\n  tu build src\n  tu build src/main.cpp -I include --std c++17\n  tu build --force --threads 1 ."
    )]
    Build {
        /// Files or directories (defaults to the current directory)
        paths: Vec<PathBuf>,

        /// Reparse even when the cache is fresh
        #[arg(short, long)]
        force: bool,

        /// Worker threads (overrides indexing.parallel_threads)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Language of every listed file instead of detecting it
        #[arg(long)]
        lang: Option<String>,

        /// Include directory handed to C/C++ parsers
        #[arg(short = 'I', long = "include")]
        include: Vec<PathBuf>,

        /// Classpath entry
        #[arg(long)]
        classpath: Vec<PathBuf>,

        /// Extra toolchain flag, passed through unchanged
        #[arg(long = "flag", allow_hyphen_values = true)]
        flags: Vec<String>,

        /// Language version, e.g. c++17
        #[arg(long)]
        std: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// List indexed definitions
    Query {
        #[arg(long)]
        name: Option<String>,

        /// class, method, function, field, ...
        #[arg(long)]
        kind: Option<String>,

        #[arg(long)]
        file: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Ranked completions at a cursor
    Complete {
        #[command(flatten)]
        cursor: CursorArgs,
    },

    /// References of the symbol under a cursor
    References {
        #[command(flatten)]
        cursor: CursorArgs,
    },

    /// Definition of the symbol under a cursor
    Definition {
        #[command(flatten)]
        cursor: CursorArgs,
    },

    /// Cache maintenance
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Print the syntax tree of a file
    #[command(name = "print-ast")]
    PrintAst {
        file: PathBuf,

        #[arg(long)]
        no_types: bool,

        #[arg(long)]
        no_locations: bool,

        #[arg(long)]
        max_depth: Option<usize>,
    },
}

#[derive(clap::Args)]
struct CursorArgs {
    #[arg(long)]
    file: PathBuf,

    /// 1-based line
    #[arg(long)]
    line: u32,

    /// 1-based byte column
    #[arg(long)]
    column: u32,

    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Delete every cache entry
    Clear,
    /// Cache size and this session's counters
    Stats {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    status: String,
    error: String,
    suggestions: Vec<&'a str>,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)
            .map_err(|e| anyhow!("configuration error loading {}: {e}", path.display()))?,
        None => Settings::load().map_err(|e| anyhow!("configuration error: {e}"))?,
    };
    Ok(settings)
}

fn wants_json(command: &Commands) -> bool {
    match command {
        Commands::Build { json, .. } | Commands::Query { json, .. } => *json,
        Commands::Complete { cursor } | Commands::References { cursor } | Commands::Definition { cursor } => {
            cursor.json
        }
        Commands::Cache {
            action: CacheAction::Stats { json },
        } => *json,
        _ => false,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            let tu_error = e.downcast_ref::<TuError>();
            if wants_json(&cli.command) {
                let envelope = ErrorEnvelope {
                    status: tu_error.map_or_else(|| "GENERAL_ERROR".to_string(), TuError::status_code),
                    error: format!("{e:#}"),
                    suggestions: tu_error.map(TuError::recovery_suggestions).unwrap_or_default(),
                };
                let _ = print_json(&envelope);
            } else {
                eprintln!("{}", THEME.error_with_icon(&format!("{e:#}")));
                for suggestion in tu_error.map(TuError::recovery_suggestions).unwrap_or_default() {
                    eprintln!("  {suggestion}");
                }
            }
            match tu_error {
                Some(TuError::ConfigError { .. }) => ExitCode::from(EXIT_CONFIG),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    if let Commands::Init { force } = &cli.command {
        let path = Settings::init_config_file(*force).map_err(|e| anyhow!("{e}"))?;
        println!("{}", THEME.success_with_icon(&format!("Created {}", path.display())));
        return Ok(ExitCode::SUCCESS);
    }

    let mut settings = load_settings(cli)?;
    if let Commands::Config = &cli.command {
        print!("{}", toml::to_string_pretty(&settings)?);
        return Ok(ExitCode::SUCCESS);
    }
    if let Commands::Build { threads: Some(threads), .. } = &cli.command {
        settings.indexing.parallel_threads = *threads;
    }
    if settings.workspace_root.is_none() {
        settings.workspace_root = Some(std::env::current_dir()?);
    }

    let engine = Engine::open(Arc::new(settings)).context("failed to open the engine")?;
    let token = CancellationToken::new();

    match &cli.command {
        Commands::Init { .. } | Commands::Config => Ok(ExitCode::SUCCESS),

        Commands::Build {
            paths,
            force,
            threads,
            lang,
            include,
            classpath,
            flags,
            std,
            json,
        } => {
            let language = match lang {
                Some(name) => Some(
                    get_registry()
                        .find_language_id(name)
                        .ok_or_else(|| anyhow!("unknown language '{name}'"))?,
                ),
                None => None,
            };
            let context = CompileContext {
                include_paths: include.clone(),
                classpath: classpath.clone(),
                language_version: std.clone(),
                flags: flags.clone(),
            };
            let roots = if paths.is_empty() {
                vec![PathBuf::from(".")]
            } else {
                paths.clone()
            };
            let files: Vec<SourceFile> = engine
                .expand_paths(&roots)?
                .into_iter()
                .map(|file| {
                    let file = file.with_context(context.clone());
                    match language {
                        Some(language) => file.with_language(language),
                        None => file,
                    }
                })
                .collect();

            let spinner = (!json).then(|| create_spinner(&format!("Building {} files", files.len())));
            let options = BuildOptions {
                force: *force,
                threads: *threads,
            };
            let report = engine.build(&files, options);
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }
            let report = report?;

            if *json {
                print_json(&report)?;
            } else {
                println!("{}", create_build_table(&report));
                for (language, reason) in &report.unavailable_languages {
                    println!("{}", THEME.warning_with_icon(&format!("{language} skipped: {reason}")));
                }
                println!("{}", report.stats.summary());
            }
            if report.count(BuildStatus::Error) > 0 {
                Ok(ExitCode::from(EXIT_BUILD_ERRORS))
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }

        Commands::Query {
            name,
            kind,
            file,
            json,
        } => {
            let kind = match kind {
                Some(kind) => Some(
                    kind.parse::<SymbolKind>()
                        .map_err(|e| anyhow!("{e}: '{kind}'"))?,
                ),
                None => None,
            };
            let filter = QueryFilter {
                name: name.clone(),
                kind,
                file: file.clone(),
            };
            let records = engine.query(&filter)?;
            if *json {
                print_json(&records)?;
            } else if !records.is_empty() {
                println!("{}", create_symbol_table(&records));
            }
            Ok(found(!records.is_empty()))
        }

        Commands::Complete { cursor } => {
            let completion = engine.complete(&cursor.file, cursor.line, cursor.column, &token)?;
            if cursor.json {
                print_json(&completion)?;
            } else {
                stale_notice(&cursor.file, completion.freshness);
                println!("{}", create_completion_table(&completion.items));
            }
            Ok(found(!completion.items.is_empty()))
        }

        Commands::References { cursor } => {
            let set = engine.references(&cursor.file, cursor.line, cursor.column, &token)?;
            if cursor.json {
                print_json(&set)?;
            } else if let Some(set) = &set {
                stale_notice(&cursor.file, set.freshness);
                println!(
                    "{} {} defined at {}",
                    set.symbol.kind,
                    THEME.apply(&THEME.code, &set.symbol.name),
                    THEME.apply(&THEME.path, set.definition())
                );
                for location in set.references() {
                    println!("  {location}");
                }
            }
            Ok(found(set.is_some()))
        }

        Commands::Definition { cursor } => {
            let definition = engine.definition(&cursor.file, cursor.line, cursor.column, &token)?;
            if cursor.json {
                print_json(&definition.as_ref().map(|(location, _)| location))?;
            } else if let Some((location, freshness)) = &definition {
                stale_notice(&cursor.file, *freshness);
                println!("{location}");
            }
            Ok(found(definition.is_some()))
        }

        Commands::Cache { action } => match action {
            CacheAction::Clear => {
                let removed = engine.cache_clear()?;
                println!("{}", THEME.success_with_icon(&format!("Removed {removed} cache entries")));
                Ok(ExitCode::SUCCESS)
            }
            CacheAction::Stats { json } => {
                let cache = engine.cache_stats()?;
                let index = engine.index_stats()?;
                if *json {
                    print_json(&serde_json::json!({ "cache": cache, "index": index }))?;
                } else {
                    println!("{}", create_cache_table(&cache, &index));
                }
                Ok(ExitCode::SUCCESS)
            }
        },

        Commands::PrintAst {
            file,
            no_types,
            no_locations,
            max_depth,
        } => {
            let options = PrintOptions {
                show_types: !no_types,
                show_locations: !no_locations,
                max_depth: *max_depth,
                ..Default::default()
            };
            print!("{}", engine.print_ast(file, options)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn found(any: bool) -> ExitCode {
    if any {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_NOT_FOUND)
    }
}

fn stale_notice(file: &Path, freshness: tu_intel::completion::Freshness) {
    if let Some(notice) = THEME.freshness_notice(&file.display().to_string(), freshness) {
        eprintln!("{notice}");
    }
}

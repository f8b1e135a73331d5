//! Command-line interface for calltrace.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};

use crate::config::Config;
use crate::graph::{CallGraphBuilder, ContextFilter, QueryEngine, SearchMode, TraceOptions};
use crate::registry::{MemberId, Registry};
use crate::report::{self, Format};
use crate::resolve::ResolveOptions;
use crate::store::Store;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_EMPTY: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Static call-graph analysis for Java codebases.
///
/// Run `analyze` once over a source tree, then query the stored graph:
/// list types and members, trace what a member calls, or find its callers.
#[derive(Parser)]
#[command(name = "calltrace")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database path (default: from config, else the user data directory)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, global = true, default_value = "pretty")]
    pub format: String,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress bars and warnings
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a source tree and store its call graph
    Analyze(AnalyzeArgs),
    /// List all types
    Types,
    /// List members of a type
    Members(MembersArgs),
    /// Search members by name or signature
    Search(SearchArgs),
    /// Show everything a member calls, recursively
    Trace(TraceArgs),
    /// Show the callers of a member
    Callers(CallersArgs),
    /// Show calls into and out of a member
    Bidi(TraceArgs),
    /// List call sites by syntactic context
    Calls(CallsArgs),
}

#[derive(Parser)]
pub struct AnalyzeArgs {
    /// Root directory of the sources
    pub path: PathBuf,

    /// Discard the stored graph before analyzing
    #[arg(long)]
    pub reset: bool,

    /// Worker threads (default: one per core)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Parser)]
pub struct MembersArgs {
    /// Type name, qualified or simple
    pub type_name: String,

    /// Include inherited members
    #[arg(long)]
    pub inherited: bool,
}

#[derive(Parser)]
pub struct SearchArgs {
    /// Substring (case-insensitive) or regular expression
    pub pattern: String,

    /// Treat the pattern as a regular expression
    #[arg(long)]
    pub regex: bool,
}

#[derive(Parser)]
pub struct TraceArgs {
    /// Member id, as shown by `members` or `search`
    pub member: i64,

    /// Leave out calls into platform packages
    #[arg(long)]
    pub user_only: bool,

    /// Maximum depth (default: from config)
    #[arg(short, long)]
    pub depth: Option<usize>,
}

#[derive(Parser)]
pub struct CallersArgs {
    /// Member id, as shown by `members` or `search`
    pub member: i64,

    /// Follow callers of callers
    #[arg(short, long)]
    pub recursive: bool,
}

#[derive(Parser)]
pub struct CallsArgs {
    /// Required context, repeatable: try, catch, finally, loop, for,
    /// foreach, while, do, conditional, lambda
    #[arg(long = "in", value_name = "CONTEXT")]
    pub contexts: Vec<String>,

    /// Only calls made by this member id
    #[arg(short, long)]
    pub member: Option<i64>,
}

/// Settings shared by every command.
struct Session {
    config: Config,
    format: Format,
    database: PathBuf,
}

impl Session {
    fn new(cli: &Cli) -> anyhow::Result<Self> {
        let Some(format) = Format::parse(&cli.format) else {
            anyhow::bail!("invalid format {:?}, must be 'pretty' or 'json'", cli.format);
        };
        let cwd = std::env::current_dir()?;
        let config = Config::load(cli.config.as_deref(), &cwd)?;
        let database = cli.db.clone().unwrap_or_else(|| config.database_path());
        Ok(Self {
            config,
            format,
            database,
        })
    }

    fn load(&self) -> anyhow::Result<Registry> {
        let store = Store::open(&self.database)?;
        Ok(store.load(&ResolveOptions::from_config(&self.config))?)
    }

    /// Print `result` as JSON, or as the pretty rendering.
    fn emit<T: serde::Serialize>(
        &self,
        command: &str,
        result: &T,
        pretty: impl FnOnce() -> String,
    ) -> anyhow::Result<()> {
        match self.format {
            Format::Json => report::write_json(command, result),
            Format::Pretty => {
                print!("{}", pretty());
                Ok(())
            }
        }
    }
}

fn member_id(raw: i64) -> anyhow::Result<MemberId> {
    MemberId::from_db_id(raw).ok_or_else(|| anyhow::anyhow!("invalid member id {}", raw))
}

fn exit_code(empty: bool) -> i32 {
    if empty {
        EXIT_EMPTY
    } else {
        EXIT_SUCCESS
    }
}

/// Run the parsed command.
pub fn run(cli: &Cli) -> anyhow::Result<i32> {
    let session = Session::new(cli)?;
    match &cli.command {
        Commands::Analyze(args) => run_analyze(&session, args, cli.quiet),
        Commands::Types => {
            let registry = session.load()?;
            let types = QueryEngine::new(&registry, &session.config).list_types();
            session.emit("types", &types, || report::render_types(&types))?;
            Ok(exit_code(types.is_empty()))
        }
        Commands::Members(args) => {
            let registry = session.load()?;
            let members = QueryEngine::new(&registry, &session.config)
                .members_of_type(&args.type_name, args.inherited)?;
            session.emit("members", &members, || {
                report::render_members(&args.type_name, &members)
            })?;
            Ok(exit_code(members.is_empty()))
        }
        Commands::Search(args) => {
            let registry = session.load()?;
            let mode = if args.regex {
                SearchMode::Regex
            } else {
                SearchMode::Substring
            };
            let members = QueryEngine::new(&registry, &session.config).search_members(&args.pattern, mode)?;
            session.emit("search", &members, || report::render_members("Matches", &members))?;
            Ok(exit_code(members.is_empty()))
        }
        Commands::Trace(args) => {
            let registry = session.load()?;
            let tree = QueryEngine::new(&registry, &session.config)
                .forward(member_id(args.member)?, trace_options(&session.config, args))?;
            session.emit("trace", &tree, || report::render_trace(&tree))?;
            Ok(exit_code(tree.children.is_empty()))
        }
        Commands::Callers(args) => {
            let registry = session.load()?;
            let engine = QueryEngine::new(&registry, &session.config);
            let member = member_id(args.member)?;
            let target = engine.member(member)?;
            let callers = engine.callers(member, args.recursive)?;
            session.emit("callers", &callers, || report::render_callers(&target, &callers))?;
            Ok(exit_code(callers.is_empty()))
        }
        Commands::Bidi(args) => {
            let registry = session.load()?;
            let engine = QueryEngine::new(&registry, &session.config);
            let member = member_id(args.member)?;
            let target = engine.member(member)?;
            let edges = engine.bidirectional(member, trace_options(&session.config, args))?;
            session.emit("bidi", &edges, || report::render_bidirectional(&target, &edges))?;
            Ok(exit_code(edges.is_empty()))
        }
        Commands::Calls(args) => {
            let filters = context_filters(&args.contexts)?;
            let caller = args.member.map(member_id).transpose()?;
            let registry = session.load()?;
            let calls = QueryEngine::new(&registry, &session.config).calls_in_context(&filters, caller)?;
            session.emit("calls", &calls, || report::render_calls("Calls", &calls))?;
            Ok(exit_code(calls.is_empty()))
        }
    }
}

fn context_filters(raw: &[String]) -> anyhow::Result<Vec<ContextFilter>> {
    raw.iter()
        .map(|name| {
            ContextFilter::parse(name).ok_or_else(|| anyhow::anyhow!("invalid context {:?}", name))
        })
        .collect()
}

fn trace_options(config: &Config, args: &TraceArgs) -> TraceOptions {
    TraceOptions {
        exclude_platform: args.user_only,
        max_depth: args.depth.unwrap_or(config.max_trace_depth),
    }
}

fn run_analyze(session: &Session, args: &AnalyzeArgs, quiet: bool) -> anyhow::Result<i32> {
    let root = absolute(&args.path);
    let mut store = Store::open(&session.database)?;
    let mut registry = if args.reset {
        store.reset()?;
        Registry::new()
    } else {
        store.load(&ResolveOptions::from_config(&session.config))?
    };

    let progress = !quiet && session.format == Format::Pretty && std::io::stderr().is_terminal();
    let stats = CallGraphBuilder::new(&session.config)
        .with_progress(progress)
        .with_jobs(args.jobs)
        .build(&root, &mut registry)?;
    store.save(&registry)?;

    let database = session.database.to_string_lossy().to_string();
    session.emit("analyze", &stats, || {
        report::render_build(&args.path.to_string_lossy(), &database, &stats)
    })?;
    Ok(EXIT_SUCCESS)
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "calltrace", "trace", "12", "--user-only", "--format", "json", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.format, "json");
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Trace(args) => {
                assert_eq!(args.member, 12);
                assert!(args.user_only);
                assert!(args.depth.is_none());
            }
            _ => panic!("expected trace"),
        }
    }

    #[test]
    fn test_parse_calls_filters() {
        let cli = Cli::try_parse_from([
            "calltrace", "calls", "--in", "try", "--in", "foreach", "--member", "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Calls(args) => {
                assert_eq!(args.member, Some(3));
                let filters = context_filters(&args.contexts).unwrap();
                assert_eq!(
                    filters,
                    vec![
                        ContextFilter::Try,
                        ContextFilter::LoopKind(crate::analysis::LoopKind::Foreach)
                    ]
                );
            }
            _ => panic!("expected calls"),
        }
        assert!(context_filters(&["sometimes".to_string()]).is_err());
        assert!(context_filters(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_member_id() {
        assert_eq!(member_id(1).unwrap(), MemberId(0));
        assert!(member_id(0).is_err());
        assert!(member_id(-4).is_err());
    }
}

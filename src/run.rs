use anyhow::anyhow;
use argh::FromArgs;
use std::path::Path;

use crate::error::Error;
use crate::file_state::FileSystemState;
use crate::fs::RealFileSystem;
use crate::progress::ConsoleProgress;
use crate::task::ShellRunner;
use crate::{manager, signal, trace, work};

pub const DEFAULT_GRAPH_PATH: &str = ".opgraph/OperationGraph.bin";

#[derive(FromArgs)]
/// Evaluate and inspect persisted operation graphs.
struct Args {
    /// chdir before running
    #[argh(option, short = 'C')]
    dir: Option<String>,

    /// operation graph file [default=.opgraph/OperationGraph.bin]
    #[argh(option, short = 'f', default = "DEFAULT_GRAPH_PATH.to_string()")]
    file: String,

    /// debugging tools, use -d list to list
    #[argh(option, short = 'd')]
    debug: Option<String>,

    /// print executed command lines and debug logging
    #[argh(switch, short = 'v')]
    verbose: bool,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Build(BuildArgs),
    Show(ShowArgs),
    Outdated(OutdatedArgs),
}

#[derive(FromArgs)]
/// Re-evaluate the saved graph, running out-of-date operations.
#[argh(subcommand, name = "build")]
struct BuildArgs {}

#[derive(FromArgs)]
/// Print the saved graph.
#[argh(subcommand, name = "show")]
struct ShowArgs {}

#[derive(FromArgs)]
/// List the operations a build would run, without running them.
#[argh(subcommand, name = "outdated")]
struct OutdatedArgs {}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(format!("opgraph={}", level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn load(path: &Path, file_state: &mut FileSystemState) -> anyhow::Result<Option<crate::graph::OperationGraph>> {
    let graph = trace::scope("load", || manager::try_load_state(path, file_state))?;
    if graph.is_none() {
        println!("opgraph: no operation graph at {}", path.display());
    }
    Ok(graph)
}

fn build(path: &Path, file_state: &mut FileSystemState, verbose: bool) -> anyhow::Result<i32> {
    let mut graph = match load(path, file_state)? {
        Some(graph) => graph,
        None => return Ok(1),
    };

    signal::register_sigint();
    let mut runner = ShellRunner::new();
    let mut progress = ConsoleProgress::new(verbose);
    let result = trace::scope("evaluate", || {
        work::evaluate(file_state, &mut graph, &mut runner, &mut progress)
    });
    let summary = match result {
        Ok(summary) => summary,
        Err(Error::BuildFailed { title, .. }) => {
            if signal::interrupted() {
                println!("opgraph: interrupted");
            } else {
                println!("opgraph: build failed: {}", title);
            }
            return Ok(1);
        }
        Err(err) => return Err(err.into()),
    };

    trace::scope("save", || manager::save_state(path, &mut graph, file_state))?;
    if summary.executed == 0 {
        println!("opgraph: no work to do");
    } else {
        println!(
            "opgraph: ran {} operations, now up to date",
            summary.executed
        );
    }
    Ok(0)
}

fn file_list(file_state: &FileSystemState, ids: &[crate::graph::FileId]) -> String {
    ids.iter()
        .map(|&id| file_state.file_path(id))
        .collect::<Vec<_>>()
        .join(" ")
}

fn show(path: &Path, file_state: &mut FileSystemState) -> anyhow::Result<i32> {
    let graph = match load(path, file_state)? {
        Some(graph) => graph,
        None => return Ok(1),
    };
    println!("state {}", graph.state_id());
    let roots: Vec<String> = graph
        .root_operation_ids()
        .iter()
        .map(|id| id.to_string())
        .collect();
    println!("roots {}", roots.join(" "));
    for op in graph.operations() {
        println!("{} {}", op.id, op.title);
        println!("  command: {}", op.command);
        println!("  declared input: {}", file_list(file_state, &op.declared_input));
        println!("  declared output: {}", file_list(file_state, &op.declared_output));
        let children: Vec<String> = op.children.iter().map(|id| id.to_string()).collect();
        println!("  children: {}", children.join(" "));
        println!("  dependencies: {}", op.dependency_count);
        println!("  successful: {}", op.was_successful_run);
        println!("  observed input: {}", file_list(file_state, &op.observed_input));
        println!("  observed output: {}", file_list(file_state, &op.observed_output));
    }
    Ok(0)
}

fn outdated(path: &Path, file_state: &mut FileSystemState) -> anyhow::Result<i32> {
    let graph = match load(path, file_state)? {
        Some(graph) => graph,
        None => return Ok(1),
    };
    for id in work::outdated(&graph, file_state)? {
        println!("{}", graph.operation(id)?.title);
    }
    Ok(0)
}

fn run_impl() -> anyhow::Result<i32> {
    let args: Args = argh::from_env();
    init_tracing(args.verbose);

    if let Some(debug) = &args.debug {
        match debug.as_str() {
            "list" => {
                println!("debug tools:");
                println!("  trace  generate json performance trace");
                return Ok(1);
            }
            "trace" => trace::open("trace.json")?,
            _ => anyhow::bail!("unknown -d {:?}, use -d list to list", debug),
        }
    }

    if let Some(dir) = &args.dir {
        let dir = Path::new(dir);
        std::env::set_current_dir(dir).map_err(|err| anyhow!("chdir {:?}: {}", dir, err))?;
    }

    let path = Path::new(&args.file);
    let mut file_state = FileSystemState::new(Box::new(RealFileSystem::new()));
    match args.command {
        Command::Build(_) => build(path, &mut file_state, args.verbose),
        Command::Show(_) => show(path, &mut file_state),
        Command::Outdated(_) => outdated(path, &mut file_state),
    }
}

pub fn run() -> anyhow::Result<i32> {
    let res = run_impl();
    trace::close()?;
    res
}

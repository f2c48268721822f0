use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use texlapse::{
    GitCli, PipelineState, Project, Scheduler, StageId, StageStatus, TerminalReporter,
    VersionControl, assemble_video, default_stages,
};

#[derive(Parser, Debug)]
#[command(name = "texlapse", version)]
struct Cli {
    /// Directory holding one subdirectory per project.
    #[arg(long, global = true, default_value = "./projects")]
    projects_dir: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a repository (local path or URL) as a new project.
    Init(InitArgs),
    /// Process every commit and encode the timelapse (requires `ffmpeg` on PATH).
    Run(RunArgs),
    /// List known projects.
    List,
    /// Show per-snapshot stage status and errors.
    Status(StatusArgs),
    /// Reset a stage, and every stage after it, for all snapshots.
    Reset(ResetArgs),
}

#[derive(Parser, Debug)]
struct InitArgs {
    project: String,
    source: String,
}

#[derive(Parser, Debug)]
struct RunArgs {
    project: String,

    /// Video file name inside the project's output directory.
    output: String,

    /// Reset this stage and every later one before running.
    #[arg(long)]
    stage: Option<StageId>,

    /// Override the configured worker count for this run.
    #[arg(long)]
    workers: Option<usize>,

    /// Only process this commit (full or abbreviated hash).
    #[arg(long)]
    commit: Option<String>,

    /// Skip video encoding.
    #[arg(long, default_value_t = false)]
    no_video: bool,
}

#[derive(Parser, Debug)]
struct StatusArgs {
    project: String,
}

#[derive(Parser, Debug)]
struct ResetArgs {
    project: String,

    #[arg(long)]
    stage: StageId,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Init(args) => cmd_init(&cli.projects_dir, args),
        Command::Run(args) => cmd_run(&cli.projects_dir, args),
        Command::List => cmd_list(&cli.projects_dir),
        Command::Status(args) => cmd_status(&cli.projects_dir, args),
        Command::Reset(args) => cmd_reset(&cli.projects_dir, args),
    }
}

fn cmd_init(root: &std::path::Path, args: InitArgs) -> anyhow::Result<()> {
    let project = Project::create(root, &args.project, &args.source)
        .with_context(|| format!("create project '{}'", args.project))?;
    eprintln!("created {}", project.paths().root().display());
    Ok(())
}

fn cmd_run(root: &std::path::Path, args: RunArgs) -> anyhow::Result<()> {
    let project = Project::open(root, &args.project)
        .with_context(|| format!("open project '{}'", args.project))?;
    let vcs: Arc<dyn VersionControl> = Arc::new(GitCli);
    let mut set = project.load_snapshots(vcs.as_ref())?;
    let mut stages = default_stages(Arc::clone(&vcs));

    if let Some(stage) = args.stage {
        project.reset_from(&mut set, stage, &stages)?;
    }

    let reporter = TerminalReporter::new();
    let scheduler = Scheduler::new(project.paths(), &project.config, args.workers)?;
    let summary = match args.commit.as_deref() {
        Some(commit) => scheduler.run_snapshot(&mut set, commit, &mut stages, &reporter)?,
        None => scheduler.run(&mut set, &mut stages, &reporter)?,
    };
    reporter.finish();
    eprintln!(
        "{} completed, {} failed, {} pending ({} stage runs, {} fallbacks)",
        summary.completed, summary.failed, summary.pending, summary.stage_runs, summary.fallbacks
    );

    if args.no_video {
        return Ok(());
    }
    let out = assemble_video(&project, &args.output, &reporter).context("encode video")?;
    reporter.finish();
    eprintln!("wrote {}", out.display());
    Ok(())
}

fn cmd_list(root: &std::path::Path) -> anyhow::Result<()> {
    let projects = Project::list(root)
        .with_context(|| format!("list projects in '{}'", root.display()))?;
    if projects.is_empty() {
        eprintln!("no projects in {}", root.display());
        return Ok(());
    }
    for p in projects {
        println!("{}\t{}", p.name(), p.paths().root().display());
    }
    Ok(())
}

fn cmd_status(root: &std::path::Path, args: StatusArgs) -> anyhow::Result<()> {
    let project = Project::open(root, &args.project)
        .with_context(|| format!("open project '{}'", args.project))?;
    let set = project.load_snapshots(&GitCli)?;
    let order = StageId::ALL;

    for s in set.snapshots() {
        let marks: String = order
            .iter()
            .map(|&id| match s.stage_status(id) {
                None | Some(StageStatus::Pending) => '.',
                Some(StageStatus::InProgress) => '~',
                Some(StageStatus::Completed) => '#',
                Some(StageStatus::Failed) => '!',
            })
            .collect();
        let state = if set.is_orphaned(s.commit()) {
            "orphaned"
        } else {
            match s.state(&order) {
                PipelineState::Completed => "done",
                PipelineState::Failed => "failed",
                PipelineState::Incomplete => "pending",
            }
        };
        println!(
            "{:>5}  {}  {}  {marks}  {state}",
            s.index,
            s.short_commit(),
            s.commit_date.format("%Y-%m-%d %H:%M"),
        );
        if let Some(err) = s.error.as_deref() {
            println!("       {}", err.lines().next().unwrap_or_default());
        }
    }
    Ok(())
}

fn cmd_reset(root: &std::path::Path, args: ResetArgs) -> anyhow::Result<()> {
    let project = Project::open(root, &args.project)
        .with_context(|| format!("open project '{}'", args.project))?;
    let vcs: Arc<dyn VersionControl> = Arc::new(GitCli);
    let mut set = project.load_snapshots(vcs.as_ref())?;
    let stages = default_stages(vcs);
    project.reset_from(&mut set, args.stage, &stages)?;
    eprintln!("reset '{}' and later stages for {} snapshots", args.stage.key(), set.len());
    Ok(())
}

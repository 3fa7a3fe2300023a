//! SP-009: CLI — build, run and watch orchestration around the assembler.

use crate::core::artifact::{self, ArtifactSettings, Overrides};
use crate::core::types::BuildMode;
use crate::core::{BuildContext, BuildError};
use crate::runner::Runner;
use crate::tripwire::watch::{Watcher, POLL_INTERVAL};
use clap::Args;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Entry file, or a project directory containing index.splice
    #[arg(default_value = ".")]
    pub input: PathBuf,

    /// Output file name (always written, never executed)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Define a symbol for #:if blocks (repeatable)
    #[arg(short = 'D', long = "define", value_name = "NAME")]
    pub defines: Vec<String>,

    /// Override the manifest build mode
    #[arg(short = 'B', long, value_enum)]
    pub build_mode: Option<BuildMode>,

    /// Rebuild whenever a project file changes
    #[arg(short, long)]
    pub watch: bool,

    /// Print the entry manifest as JSON and exit
    #[arg(long)]
    pub print_manifest: bool,
}

/// How often a foreground run checks whether its process has exited.
const EXIT_POLL: Duration = Duration::from_millis(50);

/// Dispatch a CLI invocation.
pub fn dispatch(args: BuildArgs) -> Result<(), String> {
    let (root, entry) = artifact::resolve_input(&args.input).map_err(|e| e.to_string())?;
    let ctx = BuildContext::new(&root, args.defines);

    if args.print_manifest {
        return cmd_print_manifest(&ctx, &entry);
    }

    let mut session = Session {
        ctx,
        entry,
        overrides: Overrides {
            output: args.output,
            build_mode: args.build_mode,
        },
        // A single run keeps the terminal; watch restarts happen in the background
        runner: if args.watch {
            Runner::new()
        } else {
            Runner::foreground()
        },
    };

    if args.watch {
        cmd_watch(&mut session)
    } else {
        cmd_build(&mut session)
    }
}

fn cmd_print_manifest(ctx: &BuildContext, entry: &str) -> Result<(), String> {
    let manifest = ctx.load_manifest(entry).map_err(|e| e.to_string())?;
    let json = serde_json::to_string_pretty(&manifest)
        .map_err(|e| format!("JSON serialize error: {}", e))?;
    println!("{}", json);
    Ok(())
}

fn cmd_build(session: &mut Session) -> Result<(), String> {
    let report = session.write().map_err(|e| e.to_string())?;
    if !report.settings.executes() {
        println!("Build complete -> {}", report.path.display());
        return Ok(());
    }

    runtime()?.block_on(async {
        let mut interrupt = Interrupt::install()?;
        session
            .runner
            .start(&report.path)
            .map_err(|e| e.to_string())?;
        supervise(&mut session.runner, &report.path, interrupt.recv()).await
    })
}

/// Wait for the running artifact, stopping it if `interrupt` fires first.
async fn supervise(
    runner: &mut Runner,
    path: &Path,
    interrupt: impl Future<Output = ()>,
) -> Result<(), String> {
    tokio::pin!(interrupt);
    loop {
        if let Some(status) = runner.try_wait().map_err(|e| e.to_string())? {
            if status.success() {
                return Ok(());
            }
            return Err(format!("{} exited with {}", path.display(), status));
        }
        tokio::select! {
            _ = &mut interrupt => {
                runner.stop();
                return Err("interrupted".to_string());
            }
            _ = tokio::time::sleep(EXIT_POLL) => {}
        }
    }
}

fn cmd_watch(session: &mut Session) -> Result<(), String> {
    runtime()?.block_on(async {
        let mut interrupt = Interrupt::install()?;
        let mut watcher = Watcher::new(session.ctx.root());
        session.rebuild(&mut watcher);

        println!(
            "Watching {} ({} files). Ctrl+C to stop.",
            session.ctx.root().display(),
            watcher.tracked_files()
        );
        watch_loop(session, &mut watcher, interrupt.recv()).await;
        Ok(())
    })
}

async fn watch_loop(
    session: &mut Session,
    watcher: &mut Watcher,
    shutdown: impl Future<Output = ()>,
) {
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = tokio::time::sleep(POLL_INTERVAL) => {
                if watcher.poll() {
                    println!("Changes detected. Rebuilding...");
                    session.rebuild(watcher);
                }
            }
        }
    }

    println!("Stopping watcher...");
    session.runner.stop();
}

fn runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("cannot start runtime: {}", e))
}

/// Ctrl-C listener. Registered on construction, so an interrupt that lands
/// before the first `recv` is still seen.
struct Interrupt {
    #[cfg(unix)]
    signal: tokio::signal::unix::Signal,
}

impl Interrupt {
    /// Must be called inside a runtime.
    #[cfg(unix)]
    fn install() -> Result<Self, String> {
        use tokio::signal::unix::{signal, SignalKind};
        let signal = signal(SignalKind::interrupt())
            .map_err(|e| format!("cannot listen for Ctrl+C: {}", e))?;
        Ok(Self { signal })
    }

    #[cfg(not(unix))]
    fn install() -> Result<Self, String> {
        Ok(Self {})
    }

    async fn recv(&mut self) {
        #[cfg(unix)]
        self.signal.recv().await;
        #[cfg(not(unix))]
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Outcome of one successful build.
#[derive(Debug)]
struct BuildReport {
    path: PathBuf,
    settings: ArtifactSettings,
}

/// Everything that survives between rebuilds. Each build still starts from
/// a fresh visited set inside [`BuildContext::assemble`].
struct Session {
    ctx: BuildContext,
    entry: String,
    overrides: Overrides,
    runner: Runner,
}

impl Session {
    /// Assemble and write the artifact without running it.
    fn write(&self) -> Result<BuildReport, BuildError> {
        let assembly = self.ctx.assemble(&self.entry)?;
        let settings = ArtifactSettings::resolve(&assembly.manifest, &self.overrides);
        let path = settings.target_path(self.ctx.root());
        artifact::write_artifact(&path, &settings.render(&assembly.text), settings.executes())?;
        Ok(BuildReport { path, settings })
    }

    /// Write and, in run mode, (re)start the artifact.
    fn build(&mut self) -> Result<BuildReport, BuildError> {
        let report = self.write()?;
        if report.settings.executes() {
            self.runner.start(&report.path)?;
        } else {
            println!("Build complete -> {}", report.path.display());
        }
        Ok(report)
    }

    /// Build inside the watch loop. Failures are logged, never fatal.
    fn rebuild(&mut self, watcher: &mut Watcher) {
        match self.build() {
            Ok(report) => watcher.ignore(report.path),
            Err(e) => tracing::error!("build failed: {}", e),
        }
        watcher.mark_built();
    }
}

//! xcci CLI
//!
//! Entry point for the `xcci` command. Run without a subcommand it behaves
//! as the GitHub Action: the first invocation in a job is the main phase,
//! the second the post phase.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;
use xcci::artifact::TarArtifactSink;
use xcci::exec::SystemExec;
use xcci::gha::{GithubState, HostEnv, Inputs, LayeredInputs, StdoutConsole};
use xcci::pipeline::{self, Host, Outcome};
use xcci::toolchain::XcodeSelect;
use xcci::Result;

#[derive(Parser)]
#[command(name = "xcci")]
#[command(about = "Select Xcode, derive xcodebuild invocations and run them on CI", version)]
struct Cli {
    /// TOML file of input values; `INPUT_*` variables take precedence
    #[arg(long, global = true, env = "XCCI_INPUTS")]
    inputs: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the main or post phase, whichever is due (default)
    Run,

    /// Run the main phase
    Main,

    /// Clean up signing material left by the main phase
    Post,

    /// Print the planned xcodebuild invocations without running them
    Explain {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .with_env_var("XCCI_LOG")
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let console = StdoutConsole;

    if let Err(e) = execute(&cli, &console) {
        pipeline::report_failure(&console, &e);
        process::exit(1);
    }
}

fn execute(cli: &Cli, console: &StdoutConsole) -> Result<()> {
    let inputs = LayeredInputs::standard(cli.inputs.as_deref())?;
    let verbose = inputs.get("verbosity").as_deref() == Some("verbose");

    let exec = SystemExec::new(console, verbose);
    let state = GithubState::from_env();
    let env = HostEnv::from_env();
    let active = XcodeSelect::new(&exec);
    let sink = TarArtifactSink::in_runner_temp(&env.runner_temp);
    let host = Host {
        exec: &exec,
        console,
        state: &state,
        active: &active,
        artifacts: &sink,
        env: &env,
    };

    match cli.command {
        None | Some(Commands::Run) => match pipeline::run(host, &inputs)? {
            Outcome::Main(report) => {
                tracing::info!(invocations = report.invocations.len(), "main phase finished");
            }
            Outcome::Post(report) => {
                tracing::info!(failures = report.failures.len(), "post phase finished");
            }
        },
        Some(Commands::Main) => {
            pipeline::main_phase(host, &inputs)?;
        }
        Some(Commands::Post) => {
            pipeline::post_phase(host);
        }
        Some(Commands::Explain { json }) => {
            let explanation = pipeline::explain(host, &inputs)?;
            if json {
                match serde_json::to_string_pretty(&explanation) {
                    Ok(text) => println!("{}", text),
                    Err(e) => {
                        eprintln!("Error serializing output: {}", e);
                        process::exit(1);
                    }
                }
            } else {
                println!("Xcode:       {}", explanation.selection.xcode);
                if let Some(ref swift) = explanation.selection.swift {
                    println!("Swift:       {}", swift);
                }
                println!("Directory:   {}", explanation.working_directory.display());
                println!("Action:      {}", explanation.action);
                if let Some(ref reason) = explanation.generate_xcodeproj {
                    println!("Generate:    .xcodeproj ({})", reason);
                }
                println!();
                for invocation in &explanation.invocations {
                    println!("xcodebuild {}", invocation.argv.join(" "));
                }
            }
        }
    }
    Ok(())
}

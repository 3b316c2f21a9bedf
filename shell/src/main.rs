use anyhow::Result;
use argh::FromArgs;
use dsh::{DEFAULT_MAX_COMMANDS, DumpMode, Interpreter, LineEditor, ShellConfig};
use std::env;
use std::process;
use tracing::debug;

#[derive(FromArgs)]
/// An interactive shell with pipelines and a few built-ins (exit, cd, rc, dragon).
struct Args {
    #[argh(option)]
    /// prompt printed before each line read from a terminal
    prompt: Option<String>,

    #[argh(option, default = "DEFAULT_MAX_COMMANDS")]
    /// maximum number of commands in one pipeline
    max_commands: usize,

    #[argh(switch)]
    /// print each parsed command line before running it
    dump: bool,

    #[argh(switch)]
    /// print each parsed command line and run nothing
    parse_only: bool,

    #[argh(switch)]
    /// do not keep a history of entered lines
    no_history: bool,

    #[argh(switch, short = 'v')]
    /// log debug diagnostics to stderr
    verbose: bool,
}

impl Args {
    fn into_config(self) -> ShellConfig {
        let dump = if self.parse_only {
            DumpMode::ParseOnly
        } else if self.dump {
            DumpMode::BeforeExecute
        } else {
            DumpMode::Off
        };
        let defaults = ShellConfig::default();
        ShellConfig {
            prompt: self.prompt.unwrap_or(defaults.prompt),
            max_commands: self.max_commands,
            dump,
            history: !self.no_history,
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let env_filter = env::var("RUST_LOG").unwrap_or_else(|_| level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from(env_filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn run(config: ShellConfig) -> Result<dsh::ExitCode> {
    let config = config.validate()?;
    debug!(?config, "starting shell");
    let mut source = LineEditor::new(config.history)?;
    Interpreter::new(config).repl(&mut source)
}

fn main() -> process::ExitCode {
    let args: Args = argh::from_env();
    init_logging(args.verbose);

    match run(args.into_config()) {
        Ok(code) => {
            println!("cmd loop returned {}", code);
            process::ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
        Err(e) => {
            eprintln!("dsh: {:#}", e);
            process::ExitCode::FAILURE
        }
    }
}

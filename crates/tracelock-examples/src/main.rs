use facet::Facet;
use figue as args;
use tracing::info;

mod scenarios;

type AnyResult<T> = Result<T, String>;

#[derive(Facet, Debug)]
struct Cli {
    #[facet(flatten)]
    builtins: args::FigueBuiltins,
    /// Emit a trace record for every lock operation, regardless of TRACELOCK_TRACE.
    #[facet(args::named, default)]
    trace: bool,
    #[facet(args::subcommand)]
    command: CommandKind,
}

#[derive(Facet, Debug)]
#[repr(u8)]
enum CommandKind {
    /// One thread holds a mutex while another attempts a trylock.
    TrylockDuringHold,
    /// Three readers share an rwlock while a writer trylock fails.
    ConcurrentReaders,
    /// A waiter sleeps on a condition until another thread signals it.
    SignalWaiter,
    /// A timed wait on a condition nobody signals.
    TimedWait,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> AnyResult<()> {
    let cli = parse_cli()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if cli.trace {
        tracelock::configure(true).map_err(|e| format!("failed to enable lock tracing: {e}"))?;
    }
    info!(
        tracing = tracelock::process_tracing_enabled(),
        backend = <tracelock::DefaultBackend as tracelock::Backend>::NAME,
        "running {:?}",
        cli.command
    );

    dispatch_command(cli.command)
}

fn parse_cli() -> AnyResult<Cli> {
    let figue_config = args::builder::<Cli>()
        .map_err(|e| format!("failed to build CLI schema: {e}"))?
        .cli(|cli| cli.strict())
        .help(|h| {
            h.program_name("tracelock-examples")
                .description("Run tracelock scenarios as subcommands")
                .version(option_env!("CARGO_PKG_VERSION").unwrap_or("dev"))
        })
        .build();

    args::Driver::new(figue_config)
        .run()
        .into_result()
        .map(|v| v.value)
        .map_err(|e| e.to_string())
}

fn dispatch_command(command: CommandKind) -> AnyResult<()> {
    match command {
        CommandKind::TrylockDuringHold => scenarios::trylock_during_hold::run(),
        CommandKind::ConcurrentReaders => scenarios::concurrent_readers::run(),
        CommandKind::SignalWaiter => scenarios::signal_waiter::run(),
        CommandKind::TimedWait => scenarios::timed_wait::run(),
    }
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;
use vpn_router::config::DEFAULT_CONFIG_PATH;
use vpn_router::platform::get_routing_manager;
use vpn_router::source::GitSync;
use vpn_router::{ApplyReport, Config, Reconciler, StatusReport, UpdateOutcome};

// Exit codes. These are relied on by cron jobs and VPN client hooks; keep them stable.
const EXIT_CONFIG: i32 = 1;
const EXIT_UPDATE: i32 = 2;
const EXIT_START: i32 = 3;
const EXIT_STOP: i32 = 4;
const EXIT_STATUS: i32 = 5;
const EXIT_RESTART: i32 = 6;
const EXIT_UPDATE_REPO: i32 = 7;
const EXIT_INIT: i32 = 8;

#[derive(Parser)]
#[command(name = "vpn-router")]
#[command(about = "Route selected networks through the VPN interface via a policy routing table")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the YAML config file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Reparse route files and configured networks, save and apply them
    Update,
    /// Apply the saved route list
    Start,
    /// Flush the VPN routing table and remove the policy rule
    Stop,
    /// Show the policy rule, table contents and saved route count
    Status {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Stop, then start
    Restart,
    /// Pull the route file repository, then update
    UpdateRepo,
    /// Generate default config file
    Init {
        /// Where to write the config
        #[arg(short, long, default_value = "vpn-router.yaml")]
        path: PathBuf,
    },
}

impl Commands {
    fn exit_code(&self) -> i32 {
        match self {
            Commands::Update => EXIT_UPDATE,
            Commands::Start => EXIT_START,
            Commands::Stop => EXIT_STOP,
            Commands::Status { .. } => EXIT_STATUS,
            Commands::Restart => EXIT_RESTART,
            Commands::UpdateRepo => EXIT_UPDATE_REPO,
            Commands::Init { .. } => EXIT_INIT,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            process::exit(EXIT_CONFIG);
        }
        // --help and --version
        Err(e) => e.exit(),
    };

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Commands::Init { path } = &cli.command {
        let config = Config::default();
        if let Err(e) = config.save(path) {
            error!("Init failed: {}", e);
            process::exit(EXIT_INIT);
        }
        println!("Created default config: {}", path.display());
        return Ok(());
    }

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("{}: {}", cli.config.display(), e);
            process::exit(EXIT_CONFIG);
        }
    };

    if let Err(e) = run(&cli.command, &config) {
        error!("{}", e);
        println!("FAILED: {}", e);
        process::exit(cli.command.exit_code());
    }

    Ok(())
}

fn run(command: &Commands, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let manager = get_routing_manager()?;
    let reconciler = Reconciler::new(config, manager.as_ref());

    match command {
        Commands::Update => {
            info!("Updating routes...");
            print_update(reconciler.update()?);
        }
        Commands::UpdateRepo => {
            info!("Updating route repository...");
            print_update(reconciler.update_repo(&GitSync)?);
        }
        Commands::Start => {
            info!("Applying saved routes...");
            print_apply(&reconciler.start()?);
        }
        Commands::Restart => {
            info!("Restarting...");
            print_apply(&reconciler.restart()?);
        }
        Commands::Stop => {
            info!("Removing VPN routes...");
            reconciler.stop();
            println!("OK: routes removed");
        }
        Commands::Status { json } => {
            let report = reconciler.status()?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_status(&report);
            }
        }
        // Written in main, before any config is loaded
        Commands::Init { .. } => {}
    }

    Ok(())
}

fn print_update(outcome: UpdateOutcome) {
    match outcome {
        UpdateOutcome::Applied(report) => print_apply(&report),
        UpdateOutcome::Degraded { stored } => {
            println!("OK: {} routes saved, VPN interface down, not applied", stored);
        }
    }
}

fn print_apply(report: &ApplyReport) {
    println!(
        "OK: {} routes applied, {} failed ({} /23 split)",
        report.applied, report.failed, report.split
    );
}

fn print_status(report: &StatusReport) {
    match &report.interface {
        Some(name) => println!(
            "Interface: {} ({})",
            name,
            if report.interface_up { "up" } else { "down" }
        ),
        None => println!("Interface: not configured"),
    }
    println!(
        "Rule {} -> table {}: {}",
        report.priority,
        report.table,
        if report.rule_present { "present" } else { "absent" }
    );
    match report.stored_routes {
        Some(n) => println!("Saved routes: {}", n),
        None => println!("Saved routes: none"),
    }
    println!("\nRules:\n{}", report.rules.trim_end());
    println!("\nTable {}:\n{}", report.table, report.routes.trim_end());
}

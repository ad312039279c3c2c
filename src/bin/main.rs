use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use unitg::{
    cli::{Cli, Commands, parse_args},
    config::{InstallConfig, load_config},
    error::UnitgError,
    installer::{Installer, UnitStatus, render_hints},
    systemctl::Systemctl,
};

fn main() {
    let args = parse_args();
    init_logging(&args);

    if let Err(err) = run(args) {
        // A failing systemctl has already explained itself on stderr.
        if err.reported_by_command() {
            debug!("{err}");
        } else {
            error!("{err}");
        }
        std::process::exit(err.exit_code());
    }
}

fn run(args: Cli) -> Result<(), UnitgError> {
    let config = load_config(args.config.as_deref(), args.overrides())?;
    let command = args.command.unwrap_or(Commands::Install);

    match command {
        Commands::Install => {
            let installer = build_installer(config);
            let report = installer.install()?;
            info!(
                "Installed {} ({})",
                report.destination.display(),
                if report.changed { "updated" } else { "unchanged" }
            );
            println!("Service '{}' installed, enabled and started.", report.unit);
            println!();
            print!("{}", render_hints(&report.unit));
        }
        Commands::Uninstall => {
            let installer = build_installer(config);
            let report = installer.uninstall()?;
            if report.removed {
                println!("Service '{}' removed.", report.unit);
            } else {
                println!("Service '{}' is not installed.", report.unit);
            }
        }
        Commands::Status { json } => {
            let installer = build_installer(config);
            let status = installer.status()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }
        Commands::Hints => {
            print!("{}", render_hints(&config.unit_name()));
        }
    }

    Ok(())
}

fn init_logging(args: &Cli) {
    let filter = if let Some(level) = args.log_level {
        EnvFilter::default().add_directive(level.0.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_installer(config: InstallConfig) -> Installer<Systemctl> {
    let manager = Systemctl::from_config(&config);
    Installer::new(config, manager)
}

fn print_status(status: &UnitStatus) {
    println!("{:<10} {}", "UNIT", status.unit);
    println!(
        "{:<10} {} ({})",
        "FILE",
        status.unit_file.display(),
        if status.installed { "present" } else { "missing" }
    );
    println!("{:<10} {}", "ENABLED", status.enabled);
    println!("{:<10} {}", "ACTIVE", status.active);
}

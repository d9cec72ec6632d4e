use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use vmctl::cli::{Cli, Command, SnapshotCommand};
use vmctl::config::{self, Settings};
use vmctl::control::Control;
use vmctl::error::VmError;
use vmctl::lease::LeaseMatch;
use vmctl::locator::Locator;
use vmctl::outcome::Outcome;
use vmctl::process::ShellInvoker;
use vmctl::status::{self, VmStatus};
use vmctl::{clone, network};

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    let terminal_filter = if cli.verbose {
        EnvFilter::new("vmctl=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vmctl=warn"))
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(terminal_filter),
        )
        .init();

    match run(cli) {
        // Failed outcomes exit with their own code, not miette's generic 1.
        Err(VmError::CommandFailed { code, message }) => {
            eprintln!("Error: {message}");
            std::process::exit(if code == 0 { 1 } else { code });
        }
        other => other.map_err(Into::into),
    }
}

fn run(cli: Cli) -> Result<(), VmError> {
    let settings = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => config::load_default()?,
    };
    match &settings.config_path {
        Some(path) => tracing::debug!(config = %path.display(), "loaded config"),
        None => tracing::debug!("no config file, using built-in defaults"),
    }
    let invoker = ShellInvoker;
    let locator = Locator::new(&settings, &invoker);
    let control = Control::new(&locator);

    match cli.command {
        Command::List { running } => {
            let mut names = if running {
                finish(locator.list_running()?)?
            } else {
                finish(locator.list_all())?
            };
            names.sort();
            for name in names {
                println!("{name}");
            }
        }
        Command::Status { name, json } => {
            let statuses: Vec<(String, VmStatus)> = match name {
                Some(name) => {
                    require_exists(&locator, &name)?;
                    let status = finish(status::status_of(&locator, &name)?)?;
                    vec![(name, status)]
                }
                None => finish(status::status_of_all(&locator)?)?.into_iter().collect(),
            };
            print_status(&statuses, json);
        }
        Command::Start { name, gui } => {
            require_exists(&locator, &name)?;
            if gui && !status::gui_running(&settings, &invoker)? {
                tracing::warn!(
                    gui = %settings.gui_process,
                    "hypervisor GUI is not running; the control command will launch it"
                );
            }
            report(control.start(&name, gui)?, &name)?;
        }
        Command::Stop { name, hard } => {
            require_exists(&locator, &name)?;
            report(control.stop(&name, hard)?, &name)?;
        }
        Command::Suspend { name } => {
            require_exists(&locator, &name)?;
            report(control.suspend(&name)?, &name)?;
        }
        Command::Reset { name } => {
            require_exists(&locator, &name)?;
            report(control.reset(&name)?, &name)?;
        }
        Command::Clone { source, target } => {
            run_clone(&settings, &locator, &source, &target)?;
        }
        Command::Ip { name } => {
            require_exists(&locator, &name)?;
            let info = finish(network::net_info(&locator, &name)?)?;
            println!("MAC: {}", info.mac);
            match &info.lease {
                LeaseMatch::Found(lease) => {
                    println!("IP: {}", lease.ip_address.as_deref().unwrap_or("unknown"));
                    if let Some(end) = lease.end {
                        let state = if lease.is_expired() { "expired" } else { "expires" };
                        println!("Lease {state}: {}", end.format("%Y-%m-%d %H:%M:%S UTC"));
                    }
                }
                LeaseMatch::Absent => println!("IP: unknown (no DHCP lease for this MAC)"),
            }
        }
        Command::Snapshot { action } => match action {
            SnapshotCommand::List { name } => {
                require_exists(&locator, &name)?;
                for snapshot in finish(control.list_snapshots(&name)?)? {
                    println!("{snapshot}");
                }
            }
            SnapshotCommand::Create { name, snapshot } => {
                require_exists(&locator, &name)?;
                report(control.snapshot(&name, &snapshot)?, &name)?;
            }
            SnapshotCommand::Revert { name, snapshot } => {
                require_exists(&locator, &name)?;
                report(control.revert(&name, &snapshot)?, &name)?;
            }
            SnapshotCommand::Delete { name, snapshot } => {
                require_exists(&locator, &name)?;
                report(control.delete_snapshot(&name, &snapshot)?, &name)?;
            }
        },
    }

    Ok(())
}

fn run_clone(
    settings: &Settings,
    locator: &Locator<'_, ShellInvoker>,
    source: &str,
    target: &str,
) -> Result<(), VmError> {
    require_exists(locator, source)?;
    if locator.exists(target) {
        return Err(VmError::CommandFailed {
            code: 1,
            message: format!("VM '{target}' already exists"),
        });
    }
    if finish(status::status_of(locator, source)?)? == VmStatus::Running {
        return Err(VmError::CommandFailed {
            code: 1,
            message: format!("VM '{source}' is running; stop it before cloning"),
        });
    }

    let path = finish(clone::clone_vm(settings, source, target)?)?;
    println!("Cloned '{source}' to '{target}' ({})", path.display());
    Ok(())
}

/// Unwrap a successful outcome's payload or turn the failure into an exit.
fn finish<T>(outcome: Outcome<T>) -> Result<T, VmError> {
    if !outcome.successful() {
        return Err(VmError::CommandFailed {
            code: outcome.code(),
            message: outcome.message().to_string(),
        });
    }
    let message = outcome.message().to_string();
    outcome.into_data().ok_or(VmError::CommandFailed {
        code: 1,
        message: if message.is_empty() {
            "operation returned no data".into()
        } else {
            message
        },
    })
}

fn report(outcome: Outcome<String>, name: &str) -> Result<(), VmError> {
    let message = outcome.message().to_string();
    finish(outcome)?;
    println!("VM '{name}': {message}");
    Ok(())
}

fn require_exists(locator: &Locator<'_, ShellInvoker>, name: &str) -> Result<(), VmError> {
    if locator.exists(name) {
        Ok(())
    } else {
        Err(VmError::CommandFailed {
            code: 1,
            message: format!("VM '{name}' does not exist"),
        })
    }
}

fn print_status(statuses: &[(String, VmStatus)], json: bool) {
    if json {
        let rows: Vec<StatusJson> = statuses
            .iter()
            .map(|(name, status)| StatusJson {
                name: name.clone(),
                state: status.as_str().to_string(),
            })
            .collect();
        println!(
            "{}",
            facet_json::to_string(&rows).expect("JSON serialization")
        );
        return;
    }

    if statuses.is_empty() {
        println!("No VMs found.");
    }
    for (name, status) in statuses {
        println!("VM '{name}': {status}");
    }
}

// ── JSON output structs ─────────────────────────────────────────────

#[derive(facet::Facet)]
struct StatusJson {
    name: String,
    state: String,
}

//! `authkeys` command-line front end.
//!
//! Maps subcommands onto `KeyStore` operations and prints the resulting reports.

use std::path::PathBuf;
use std::process::ExitCode;

use authkeys::report::{TITLE_CREATE, TITLE_DELETE, TITLE_EXPORT, TITLE_EXTRACT, TITLE_IMPORT};
use authkeys::{ConfigFile, KeyIdentity, KeyStore, Report, ServiceCommand, ServiceControl};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "authkeys")]
#[command(about = "Manage host authentication key pairs")]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, env = "AUTHKEYS_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List all keys as NAME/TYPE
    List,
    /// Create a new key pair for a user group or role
    Create { name: String },
    /// Delete one key, e.g. `teachers/public`
    Delete { key: Option<String> },
    /// Import a key file; its type is detected automatically
    Import { file: PathBuf, name: String },
    /// Export one key to a file (default: NAME_TYPE_key.pem)
    Export {
        key: Option<String>,
        file: Option<PathBuf>,
        /// Overwrite an existing output file
        #[arg(long)]
        force: bool,
    },
    /// Detect whether a file holds a public or private key
    Detect { file: PathBuf },
    /// Write the public key derived from a stored private key
    Extract { name: String },
    /// Control the background service
    Service {
        #[arg(value_enum)]
        action: ServiceAction,
        /// Path to the service executable (default: next to this program)
        #[arg(long)]
        executable: Option<PathBuf>,
        #[arg(long, default_value = "HostService")]
        service_name: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ServiceAction {
    Start,
    Stop,
    Register,
    Unregister,
    /// Show whether the service is registered and running
    Status,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "authkeys=info",
        1 => "authkeys=debug",
        _ => "authkeys=trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut store = match KeyStore::new(config) {
        Ok(store) => store,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let report = match cli.command {
        Commands::List => {
            for key in store.list_keys() {
                println!("{}", key);
            }
            return ExitCode::SUCCESS;
        }
        Commands::Create { name } => {
            let result = store.create_key_pair(&name);
            Report::from_store(TITLE_CREATE, &result, &store)
        }
        Commands::Delete { key } => match selected_key(TITLE_DELETE, key) {
            Ok(identity) => {
                let result = store.delete_key(identity.name.as_str(), identity.key_type);
                Report::from_store(TITLE_DELETE, &result, &store)
            }
            Err(report) => report,
        },
        Commands::Import { file, name } => match store.detect_key_type(&file) {
            Ok(classification) => match classification.key_type() {
                Some(key_type) => {
                    let result = store.import_key(&name, key_type, &file);
                    Report::from_store(TITLE_IMPORT, &result, &store)
                }
                None => Report {
                    success: false,
                    title: TITLE_IMPORT.to_string(),
                    message: store.result_message().to_string(),
                },
            },
            Err(e) => Report::from_store(TITLE_IMPORT, &Err::<(), _>(e), &store),
        },
        Commands::Export { key, file, force } => match selected_key(TITLE_EXPORT, key) {
            Ok(identity) => {
                let file =
                    file.unwrap_or_else(|| PathBuf::from(identity.default_export_file_name()));
                let name = identity.name.as_str();
                let result = store.export_key(name, identity.key_type, &file, force);
                Report::from_store(TITLE_EXPORT, &result, &store)
            }
            Err(report) => report,
        },
        Commands::Detect { file } => {
            let result = store.detect_key_type(&file);
            if let Ok(classification) = &result {
                println!("{:?}", classification);
            }
            Report::from_store("Detect key type", &result, &store)
        }
        Commands::Extract { name } => {
            let result = store.extract_public_key(&name);
            Report::from_store(TITLE_EXTRACT, &result, &store)
        }
        Commands::Service {
            action,
            executable,
            service_name,
        } => return run_service(action, executable, service_name),
    };

    show_report(&report)
}

fn run_service(
    action: ServiceAction,
    executable: Option<PathBuf>,
    service_name: String,
) -> ExitCode {
    let control = match executable {
        Some(executable) => ServiceControl::new(executable, service_name, false),
        None => match ServiceControl::with_default_executable(service_name, false) {
            Ok(control) => control,
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
    };

    let command = match action {
        ServiceAction::Start => ServiceCommand::Start,
        ServiceAction::Stop => ServiceCommand::Stop,
        ServiceAction::Register => ServiceCommand::Register,
        ServiceAction::Unregister => ServiceCommand::Unregister,
        ServiceAction::Status => return show_service_status(&control),
    };

    match control.run(command) {
        Ok(status) if status.success() => ExitCode::SUCCESS,
        Ok(status) => {
            error!("service executable exited with {}", status);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn show_service_status(control: &ServiceControl) -> ExitCode {
    match control.is_registered().and_then(|registered| Ok((registered, control.is_running()?))) {
        Ok((registered, running)) => {
            println!("registered: {}", registered);
            println!("running: {}", running);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> authkeys::Result<ConfigFile> {
    let mut config = match path {
        Some(path) => ConfigFile::from_file(path)?,
        None => ConfigFile::default(),
    };
    config.apply_env()?;
    Ok(config)
}

fn selected_key(title: &str, key: Option<String>) -> Result<KeyIdentity, Report> {
    let Some(key) = key else {
        return Err(Report::missing_selection(title));
    };
    key.parse().map_err(|e: authkeys::Error| Report {
        success: false,
        title: title.to_string(),
        message: e.to_string(),
    })
}

fn show_report(report: &Report) -> ExitCode {
    if report.should_display() {
        if report.success {
            println!("{}: {}", report.title, report.message);
        } else {
            eprintln!("{}: {}", report.title, report.message);
        }
    }

    if report.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

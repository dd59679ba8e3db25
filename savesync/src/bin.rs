use std::path::PathBuf;

use env_logger::Env;
use savesync::{
    app::App,
    engine::StatusReport,
    error::SyncError,
    fingerprint::Comparison,
    session::SyncSession,
};
use savesync_core::{config::SyncConfig, status::StatusSender, types::WorldName};
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "savesync", about = "Keep a game save folder in sync with a remote store")]
struct Opt {
    #[structopt(subcommand)]
    command: Option<Command>,
}

#[derive(StructOpt, Debug)]
enum Command {
    /// Watch the game launcher: pull when it starts, push when it stops
    Monitor,
    /// Upload local world now
    Push,
    /// Download remote world now
    Pull,
    /// Display authentication and synchronization state
    Status,
    /// Write configuration file
    Configure {
        #[structopt(long = "launcher")]
        launcher_path: String,
        #[structopt(long = "replica-root", parse(from_os_str))]
        replica_root: PathBuf,
        #[structopt(long = "world")]
        world_name: String,
        #[structopt(long = "canary", default_value = "level.dat", parse(from_os_str))]
        canary_file: PathBuf,
    },
    /// Import an OAuth token file
    Login {
        #[structopt(long = "token-file", parse(from_os_str))]
        token_file: PathBuf,
    },
}

fn configure(
    app: &App,
    launcher_path: String,
    replica_root: PathBuf,
    world_name: String,
    canary_file: PathBuf,
) -> Result<(), SyncError> {
    // Keep store settings of an existing configuration
    let mut config = match app.load_config() {
        Ok(config) => config,
        Err(SyncError::ConfigMissing) | Err(SyncError::ConfigCorrupt(_)) => SyncConfig::new(
            launcher_path.clone(),
            replica_root.clone(),
            WorldName(world_name.clone()),
        ),
        Err(error) => return Err(error),
    };
    config.launcher_path = launcher_path;
    config.replica_root = replica_root;
    config.world_name = WorldName(world_name);
    config.canary_file = canary_file;
    if !config.world_name.is_valid() {
        return Err(SyncError::ConfigCorrupt(format!(
            "World name '{}' is not a folder name",
            config.world_name
        )));
    }
    app.save_config(&config)?;

    if app.check_authenticated() {
        let engine = app.engine(&config)?;
        engine.reconcile(&mut SyncSession::new());
    }
    Ok(())
}

fn display_report(report: &StatusReport) {
    let date = |date: Option<chrono::DateTime<chrono::Utc>>| {
        date.map(|date| date.to_rfc3339())
            .unwrap_or_else(|| "none".to_string())
    };
    println!("World            : {}", report.world_name);
    println!("Local folder     : {}", report.replica_path.display());
    println!("Authenticated    : {}", report.authenticated);
    println!("Local modified   : {}", date(report.local_modified));
    println!("Remote modified  : {}", date(report.remote_modified));
    println!("Push in progress : {}", report.lock_held);
    match &report.comparison {
        Comparison::Equal(_) => println!("In sync          : yes"),
        Comparison::Different { .. } => println!("In sync          : no"),
        Comparison::Unavailable(reason) => println!("In sync          : unknown ({})", reason),
    }
}

fn run(opt: Opt) -> Result<(), SyncError> {
    let app = App::from_env(StatusSender::default())?;

    match opt.command.unwrap_or(Command::Monitor) {
        Command::Monitor => {
            if let Some(handle) = app.start_monitor()? {
                handle
                    .join()
                    .map_err(|_| SyncError::Unexpected(anyhow::anyhow!("Monitor thread panicked")))?;
            }
        }
        Command::Push => {
            app.push_now()?;
        }
        Command::Pull => match app.pull_now() {
            Err(error) if !error.is_fatal() => log::info!("{}", error),
            result => {
                result?;
            }
        },
        Command::Status => {
            display_report(&app.report()?);
        }
        Command::Configure {
            launcher_path,
            replica_root,
            world_name,
            canary_file,
        } => configure(&app, launcher_path, replica_root, world_name, canary_file)?,
        Command::Login { token_file } => app.login(&token_file)?,
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let opt = Opt::from_args();

    if let Err(error) = run(opt) {
        log::error!("{}", error);
        std::process::exit(1);
    }
    log::info!("Exit application");
}

use crate::cli::{Cli, CliError, Commands};
use crate::config::Config;
use pgshift_backend::PgLedger;
use pgshift_migration::{
    Catalog, ConsolePrinter, DirCatalog, Ledger, Log, Printer, Runner, Squash, Timer, file_names,
};
use std::path::Path;

pub async fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Init {
            path,
            db,
            name,
            credentials,
            ssl,
            port,
            no_color,
        } => {
            let config = Config {
                db_name: name,
                path,
                db_url: db,
                credentials,
                port,
                ssl_mode: ssl,
                no_color,
            };
            init(&cli.config_dir, config).await
        }
        Commands::Add { name } => add(&cli.config_dir, name.as_deref()).await,
        Commands::Run { time, dry_run } => run(&cli.config_dir, &time, dry_run).await,
        Commands::Squash { from, to } => squash(&cli.config_dir, &from, &to).await,
        Commands::Log => log(&cli.config_dir).await,
    }
}

async fn connect(config: &Config) -> Result<PgLedger, CliError> {
    Ok(PgLedger::connect(&config.connection_string()?).await?)
}

async fn init(config_dir: &Path, config: Config) -> Result<(), CliError> {
    config.connection_string()?;
    config.store(config_dir).await?;

    let ledger = connect(&config).await?;
    ledger.ensure().await?;

    ConsolePrinter::new(config.no_color).print_success("configuration stored, ledger table ready");
    Ok(())
}

async fn add(config_dir: &Path, name: Option<&str>) -> Result<(), CliError> {
    let config = Config::load(config_dir).await?;
    let catalog = DirCatalog::new(&config.path);
    let timer = Timer::system();

    let (up, down) = file_names((timer.now)().timestamp(), name);
    catalog.create(&up).await?;
    catalog.create(&down).await?;

    ConsolePrinter::new(config.no_color).print_success(&format!("created {up} and {down}"));
    Ok(())
}

async fn run(config_dir: &Path, time: &str, dry_run: bool) -> Result<(), CliError> {
    let config = Config::load(config_dir).await?;
    let printer = ConsolePrinter::new(config.no_color);
    let catalog = DirCatalog::new(&config.path);
    let ledger = connect(&config).await?;
    let timer = Timer::system();

    Runner {
        catalog: &catalog,
        ledger: &ledger,
        printer: &printer,
        timer: &timer,
        dry_run,
    }
    .run(time)
    .await?;

    printer.print_success("migrations in sync");
    Ok(())
}

async fn squash(config_dir: &Path, from: &str, to: &str) -> Result<(), CliError> {
    let config = Config::load(config_dir).await?;
    let printer = ConsolePrinter::new(config.no_color);
    let catalog = DirCatalog::new(&config.path);
    let ledger = connect(&config).await?;
    let timer = Timer::system();

    Squash {
        catalog: &catalog,
        ledger: &ledger,
        timer: &timer,
    }
    .run(from, to)
    .await?;

    printer.print_success("range squashed");
    Ok(())
}

async fn log(config_dir: &Path) -> Result<(), CliError> {
    let config = Config::load(config_dir).await?;
    let printer = ConsolePrinter::new(config.no_color);
    let catalog = DirCatalog::new(&config.path);
    let ledger = connect(&config).await?;
    let timer = Timer::system();

    Log {
        catalog: &catalog,
        ledger: &ledger,
        printer: &printer,
        timer: &timer,
    }
    .run()
    .await?;

    Ok(())
}

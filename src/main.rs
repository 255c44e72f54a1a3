use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use thiserror::Error;

use recipe_share::{
    actions::import_ingredients,
    api::{routes::routes, state::AppState},
    config::{Config, ConfigError},
    error::TypeError,
    seed::parse_ingredient_csv,
    Cache,
};

#[derive(Parser, Debug)]
#[command(name = "recipe-share", version, about = "Recipe sharing backend.")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Load the ingredient catalog from a `name,measurement_unit` CSV file
    ImportIngredients {
        /// Path to the CSV file
        path: PathBuf,
    },
}

#[derive(Debug, Error)]
enum StartupError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("Database unavailable: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migrations failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    App(#[from] recipe_share::error::Error),

    #[error("Could not read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid ingredient file: {0}")]
    Csv(#[from] TypeError),
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::ImportIngredients { path } => import(path).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn connect(config: &Config) -> Result<Pool<Postgres>, StartupError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

async fn serve() -> Result<(), StartupError> {
    let config = Config::load()?;
    let pool = connect(&config).await?;
    let state = AppState::new(&config, pool)?.shared();

    log::info!("Listening on http://{}", config.bind_address);
    warp::serve(routes(state)).run(config.bind_address).await;

    Ok(())
}

async fn import(path: PathBuf) -> Result<(), StartupError> {
    let config = Config::load()?;
    let input = tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| StartupError::Read {
            path: path.clone(),
            source,
        })?;
    let rows = parse_ingredient_csv(&input)?;

    let pool = connect(&config).await?;
    let cache = Cache::open(&config.redis_url).map_err(recipe_share::error::Error::from)?;
    let inserted = import_ingredients(&rows, &cache, &pool).await?;

    println!("Inserted {inserted} of {} ingredients", rows.len());
    Ok(())
}

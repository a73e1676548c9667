use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use gerrydb::repos::{NewGeoLayer, NewNamespace};
use gerrydb::{GerryDb, GerryDbError, GerryDbOptions};
use tracing::debug;

mod logger;

#[derive(Debug, Parser)]
#[command(name = "gerrydb", about = "Manage objects in a GerryDB instance")]
struct Cli {
    #[arg(help = "Configuration profile to use, `default` if unset.")]
    #[arg(short, long, global = true, value_name = "PROFILE")]
    profile: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(subcommand, about = "Create an object.")]
    Create(CreateCommand),
}

#[derive(Debug, Subcommand)]
enum CreateCommand {
    #[command(about = "Create a namespace.")]
    Namespace(CreateNamespaceArgs),
    #[command(about = "Create a geographic layer.")]
    GeoLayer(CreateGeoLayerArgs),
}

#[derive(Debug, Args)]
struct CreateNamespaceArgs {
    #[arg(help = "Path of the namespace, e.g. `census.2020`.")]
    path: String,
    #[arg(long, help = "Description of the namespace.")]
    description: String,
    #[arg(long, help = "Make the namespace readable by all users.")]
    public: bool,
}

#[derive(Debug, Args)]
struct CreateGeoLayerArgs {
    #[arg(help = "Path of the layer, e.g. `bg`.")]
    path: String,
    #[arg(long, help = "Namespace to create the layer in.")]
    namespace: String,
    #[arg(long, help = "Description of the layer.")]
    description: String,
    #[arg(long, value_name = "URL", help = "Where the layer's geographies come from.")]
    source_url: Option<String>,
}

impl CreateNamespaceArgs {
    async fn handle(self, db: &GerryDb) -> Result<(), GerryDbError> {
        let ctx = db
            .context(&format!("Creating namespace '{}' from the CLI", self.path))
            .await?;
        let namespace = ctx
            .namespaces()
            .create(NewNamespace {
                path: self.path,
                description: self.description,
                public: self.public,
            })
            .await?;
        println!("created namespace '{}'", namespace.path);
        Ok(())
    }
}

impl CreateGeoLayerArgs {
    async fn handle(self, db: &GerryDb) -> Result<(), GerryDbError> {
        let ctx = db
            .context(&format!(
                "Creating geographic layer '{}' in namespace '{}' from the CLI",
                self.path, self.namespace
            ))
            .await?;
        let layer = ctx
            .geo_layers()
            .create(NewGeoLayer {
                path: format!("/{}/{}", self.namespace, self.path),
                description: Some(self.description),
                source_url: self.source_url,
            })
            .await?;
        println!("created geographic layer '{}'", layer.full_path());
        Ok(())
    }
}

/// Treat creating an object that already exists as success.
fn allow_existing(result: Result<(), GerryDbError>) -> Result<(), GerryDbError> {
    match result {
        Err(GerryDbError::Conflict { resource, path, .. }) => {
            println!("{resource} '{path}' already exists");
            Ok(())
        },
        other => other,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init_logger();
    let cli = Cli::parse();
    debug!(?cli, "parsed arguments");

    let db = GerryDb::new(GerryDbOptions {
        profile: cli.profile,
        ..Default::default()
    })
    .context("failed to connect to GerryDB")?;

    let result = match cli.command {
        Command::Create(CreateCommand::Namespace(args)) => args.handle(&db).await,
        Command::Create(CreateCommand::GeoLayer(args)) => args.handle(&db).await,
    };
    allow_existing(result)?;
    Ok(())
}

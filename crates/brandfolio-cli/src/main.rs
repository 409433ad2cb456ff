mod add;
mod import;
mod prompt;
mod tags;

use std::path::PathBuf;

use brandfolio_core::{SchemaConfig, SchemaField};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "brandfolio")]
#[command(about = "Import and curate store collections")]
struct Cli {
    /// Collection file to operate on (overrides BRANDFOLIO_COLLECTION_PATH)
    #[arg(long, global = true)]
    collection: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import stores from a CSV or JSON file
    Import {
        /// File to import
        file: PathBuf,
        /// Input format; inferred from the file extension when omitted
        #[arg(long, value_enum)]
        format: Option<InputFormat>,
        /// Add to the collection or replace its stores entirely
        #[arg(long, value_enum, default_value = "append")]
        mode: ModeArg,
        /// What to do when an incoming store's name is already taken
        #[arg(long, value_enum, default_value = "ask")]
        on_duplicate: DuplicatePolicy,
        /// How to handle groups of near-identical tags
        #[arg(long, value_enum, default_value = "ask")]
        tags: TagPolicy,
        /// Map a field to a column explicitly, e.g. `--map store_name="Shop Name"`
        #[arg(long = "map", value_name = "FIELD=HEADER", value_parser = parse_mapping_override)]
        overrides: Vec<(SchemaField, String)>,
        /// Run the full pipeline and print the report without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Show which columns of a file would feed each field
    Mapping {
        file: PathBuf,
        #[arg(long, value_enum)]
        format: Option<InputFormat>,
    },
    /// List groups of similar tags across the stored collection
    Tags {
        /// Similarity threshold in (0, 1]; defaults to the schema setting
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Add a single store by hand
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        website: Option<String>,
        #[arg(long)]
        instagram: Option<String>,
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        city: Option<String>,
        /// Tags separated by `|`, `;` or `,`
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        price: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InputFormat {
    Csv,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Append,
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DuplicatePolicy {
    Ask,
    Merge,
    Overwrite,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TagPolicy {
    Ask,
    /// Keep the first spelling of every group
    Primary,
    Skip,
}

fn parse_mapping_override(raw: &str) -> Result<(SchemaField, String), String> {
    let (field, header) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=HEADER, got '{raw}'"))?;
    let field: SchemaField = field.trim().parse().map_err(|e| format!("{e}"))?;
    let header = header.trim();
    if header.is_empty() {
        return Err(format!("no header given for {field}"));
    }
    Ok((field, header.to_string()))
}

fn load_schema(config: &brandfolio_core::AppConfig) -> anyhow::Result<SchemaConfig> {
    match &config.schema_path {
        Some(path) => {
            let schema = brandfolio_core::load_schema_config(path)?;
            tracing::info!(path = %path.display(), "loaded schema overrides");
            Ok(schema)
        }
        None => Ok(SchemaConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = brandfolio_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Some(path) = cli.collection {
        config.collection_path = path;
    }
    let schema = load_schema(&config)?;
    let store = brandfolio_store::JsonFileStore::new(&config.collection_path);

    match cli.command {
        Some(Commands::Import {
            file,
            format,
            mode,
            on_duplicate,
            tags,
            overrides,
            dry_run,
        }) => {
            let options = import::ImportOptions {
                format,
                mode,
                on_duplicate,
                tags,
                overrides,
                dry_run,
            };
            import::run_import(&store, &schema, &file, options).await?;
        }
        Some(Commands::Mapping { file, format }) => {
            import::run_mapping_preview(&schema, &file, format).await?;
        }
        Some(Commands::Tags { threshold }) => {
            tags::run_tags(&store, &schema, threshold).await?;
        }
        Some(Commands::Add {
            name,
            website,
            instagram,
            country,
            city,
            tags,
            description,
            price,
        }) => {
            let fields = add::AddFields {
                name,
                website,
                instagram,
                country,
                city,
                tags,
                description,
                price,
            };
            add::run_add(&store, &schema, &fields).await?;
        }
        None => println!(
            "brandfolio: collection at {} (run with --help for commands)",
            config.collection_path.display()
        ),
    }

    Ok(())
}

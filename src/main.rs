use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use qwickfiche::{
    ChatCompletionsModel, Config, Exporter, Language, RetryPolicy, SheetForm, SheetPipeline, SheetService, SheetStore,
    SheetVault, server,
};

#[derive(Parser, Debug)]
#[command(name = "qwickfiche", version, about = "Generate product sheets with a language model")]
struct Cli {
    /// YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON logs.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a product sheet from the command line.
    Generate {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        audience: String,
        /// fr, en or es (defaults to the configured language).
        #[arg(long)]
        language: Option<Language>,
        /// Save the sheet for this user.
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        pdf: bool,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Serve the HTTP API.
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
    /// List a user's saved sheets.
    List {
        #[arg(long)]
        user: String,
    },
    /// Export a saved sheet again.
    Export {
        #[arg(long)]
        user: String,
        #[arg(long)]
        id: String,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        pdf: bool,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

fn build_service(config: &Config) -> Result<SheetService> {
    let model = ChatCompletionsModel::from_config(config).context("Failed to configure the model client")?;
    let pipeline = SheetPipeline::new(Arc::new(model))?.with_retry(RetryPolicy {
        max_retries: config.max_retries,
        ..RetryPolicy::default()
    });
    let vault = SheetVault::open(&config.db_path)
        .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?;
    Ok(SheetService::new(pipeline, Arc::new(vault)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    qwickfiche::telemetry::init(cli.log_json);

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    info!(model = %config.model, base_url = %config.base_url, "configuration loaded");

    match cli.command {
        Command::Generate {
            name,
            description,
            audience,
            language,
            user,
            json,
            pdf,
            out_dir,
        } => {
            let service = build_service(&config)?;
            let form = SheetForm::new(name)
                .with_description(description)
                .with_target_audience(audience)
                .with_language(language.unwrap_or(config.language));

            let outcome = service.generate(&form, user.as_deref()).await?;
            println!("{}", qwickfiche::export::to_json(&outcome.sheet)?);
            if let Some(id) = &outcome.record_id {
                eprintln!("saved as {id}");
            }
            for warning in &outcome.warnings {
                eprintln!("warning: {warning}");
            }

            let exporter = Exporter::new(out_dir.unwrap_or(config.export_dir));
            if json {
                eprintln!("wrote {}", exporter.write_json(&outcome.sheet)?.display());
            }
            if pdf {
                eprintln!("wrote {}", exporter.write_pdf(&outcome.sheet)?.display());
            }
        }
        Command::Serve { bind } => {
            let service = Arc::new(build_service(&config)?);
            let bind = bind.unwrap_or(config.bind.clone());
            let app = server::router(service, config.static_dir.clone());

            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("Failed to bind {bind}"))?;
            info!("listening on {}", listener.local_addr()?);
            axum::serve(listener, app).await?;
        }
        Command::List { user } => {
            let vault = SheetVault::open(&config.db_path)?;
            for record in vault.list(&user)? {
                println!(
                    "{}  {}  {}  ({})",
                    record.id,
                    record.created_at.format("%Y-%m-%d %H:%M"),
                    record.generated_title,
                    record.product_input_name
                );
            }
        }
        Command::Export {
            user,
            id,
            json,
            pdf,
            out_dir,
        } => {
            let vault = SheetVault::open(&config.db_path)?;
            let sheet = vault
                .fetch(&user, &id)
                .with_context(|| format!("No saved sheet {id} for {user}"))?
                .sheet();

            let exporter = Exporter::new(out_dir.unwrap_or(config.export_dir));
            if json || !pdf {
                println!("{}", exporter.write_json(&sheet)?.display());
            }
            if pdf {
                println!("{}", exporter.write_pdf(&sheet)?.display());
            }
        }
    }

    Ok(())
}

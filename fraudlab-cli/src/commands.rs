//! CLI subcommand handlers.

use crate::{Commands, ConfigAction, RegisterAction};
use fraudlab_core::config::{self, FraudlabConfig};
use fraudlab_core::demo::DemoRegistrar;
use fraudlab_core::store::{DerivedKind, FeatureStoreClient, InMemoryFeatureStore};
use fraudlab_core::{CatalogClass, CleanupReport, StoreError};
use std::fmt::Write as _;
use std::path::PathBuf;

/// Settings shared by every subcommand.
pub struct Context {
    pub workspace: PathBuf,
    pub config_path: Option<PathBuf>,
    pub offline: bool,
}

impl Context {
    fn load_config(&self) -> anyhow::Result<FraudlabConfig> {
        config::load_config(Some(&self.workspace), self.config_path.as_deref())
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    async fn store(&self, config: &FraudlabConfig) -> anyhow::Result<Box<dyn FeatureStoreClient>> {
        if self.offline {
            tracing::info!("Using the offline rehearsal store");
            return Ok(Box::new(rehearsal_store()));
        }
        Ok(Box::new(fraudlab_core::connect(config).await?))
    }
}

/// Handle a CLI subcommand.
pub async fn handle_command(command: Commands, ctx: &Context) -> anyhow::Result<()> {
    match command {
        Commands::Cleanup { quiet_report, json } => handle_cleanup(ctx, quiet_report, json).await,
        Commands::Classify { names } => {
            print!("{}", format_classification(&names));
            Ok(())
        }
        Commands::Identifier { name } => {
            println!("{}", fraudlab_core::to_identifier(&name)?);
            Ok(())
        }
        Commands::Register { action } => handle_register(ctx, action).await,
        Commands::Playground => handle_playground(ctx).await,
        Commands::Config { action } => handle_config(ctx, action),
    }
}

async fn handle_cleanup(ctx: &Context, quiet_report: bool, json: bool) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let store = ctx.store(&config).await?;
    let verbose = config.cleanup.verbose && !quiet_report;
    let report = fraudlab_core::cleanup(store.as_ref(), verbose).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_report(&report));
    }
    Ok(())
}

async fn handle_register(ctx: &Context, action: RegisterAction) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let store = ctx.store(&config).await?;
    let catalog = store
        .active_catalog()
        .await?
        .ok_or(StoreError::NoActiveCatalog)?;
    let registrar = DemoRegistrar::new(store.as_ref(), &config.demo);

    match action {
        RegisterAction::Tables => {
            for table in registrar.register_tables(&catalog).await? {
                println!("{}\t{:?}", table.name, table.kind);
            }
        }
        RegisterAction::Entities => {
            for entity in registrar.register_entities(&catalog).await? {
                println!("{}\t{}", entity.name, entity.serving_names.join(","));
            }
        }
        RegisterAction::Tags => {
            let tables = registrar.register_tables(&catalog).await?;
            registrar.tag_entities(&catalog, &tables).await?;
            println!("Tagged entity columns in catalog: {}", catalog.name);
        }
        RegisterAction::All => {
            let tables = registrar.register_all(&catalog).await?;
            println!(
                "Registered {} tables with entities in catalog: {}",
                tables.len(),
                catalog.name
            );
        }
    }
    Ok(())
}

async fn handle_playground(ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let store = ctx.store(&config).await?;
    let playground = fraudlab_core::create_playground_catalog(store.as_ref(), &config).await?;
    print!("{}", format_report(&playground.cleanup));
    println!("Playground catalog ready: {}", playground.catalog.name);
    Ok(())
}

fn handle_config(ctx: &Context, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let (path, written) = config::init_workspace_config(&ctx.workspace)?;
            if written {
                println!("Created default configuration at: {}", path.display());
            } else {
                println!("Configuration file already exists at: {}", path.display());
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = ctx.load_config()?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// One `<class>\t<name>` line per catalog name.
fn format_classification(names: &[String]) -> String {
    let mut out = String::new();
    for name in names {
        let _ = writeln!(out, "{}\t{}", CatalogClass::of(name).as_str(), name);
    }
    out
}

/// Human-readable summary of a cleanup pass.
fn format_report(report: &CleanupReport) -> String {
    let mut out = String::new();
    if !report.changed_anything() {
        out.push_str("No tutorial catalogs needed cleaning.\n");
        return out;
    }
    for cleaned in &report.cleaned {
        let _ = writeln!(out, "Cleaned catalog: {}", cleaned.catalog);
        for (label, count) in cleaned.counts.nonzero() {
            let _ = writeln!(out, "  {count} {label}");
        }
    }
    if let Some(restored) = &report.restored {
        let _ = writeln!(out, "Re-activated catalog: {}", restored.name);
    }
    out
}

/// Offline store seeded with the catalogs a workshop account usually has.
fn rehearsal_store() -> InMemoryFeatureStore {
    let quick_start = "quick start feature engineering";
    let deep_dive = "deep dive data modeling";
    let playground = "credit card playground 20240101:0900_rehearsal";
    InMemoryFeatureStore::new()
        .with_catalog("default")
        .with_catalog(quick_start)
        .with_deployment(quick_start, "fraud detection", true)
        .with_derived(quick_start, DerivedKind::ObservationTable, "preview sample")
        .with_derived(
            quick_start,
            DerivedKind::HistoricalFeatureTable,
            "training data",
        )
        .with_catalog(deep_dive)
        .with_derived(deep_dive, DerivedKind::BatchRequestTable, "scoring batch")
        .with_derived(deep_dive, DerivedKind::BatchFeatureTable, "scored features")
        .with_catalog(playground)
        .with_derived(playground, DerivedKind::ObservationTable, "my observations")
        .with_active("default")
}

//! Subcommand implementations. Each produces one JSON document.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result, bail};
use igcat_core::{fact::FactKind, settings::Settings, store::CatalogStore};
use igcat_router::{
  AskRequest, HttpExecutor, QueryRouter, RouterConfig, Slots, StoreExecutor,
};
use igcat_store_sqlite::SqliteStore;
use serde_json::{Value, json};

use crate::Command;

/// JSON printed by a command, and whether the process should exit non-zero.
#[derive(Debug)]
pub struct Output {
  pub json:   Value,
  pub failed: bool,
}

impl Output {
  fn ok<T: serde::Serialize>(value: &T) -> Result<Self> {
    Ok(Self { json: serde_json::to_value(value)?, failed: false })
  }
}

pub async fn run(command: Command, settings: &Settings) -> Result<()> {
  let output = execute(command, settings).await?;
  println!("{}", serde_json::to_string_pretty(&output.json)?);
  if output.failed {
    std::process::exit(1);
  }
  Ok(())
}

async fn open_store(settings: &Settings) -> Result<SqliteStore> {
  let path = &settings.database_path;
  SqliteStore::open(path)
    .await
    .with_context(|| format!("failed to open store at {path:?}"))
}

pub async fn execute(command: Command, settings: &Settings) -> Result<Output> {
  match command {
    Command::Import { package, dir } => {
      let store = open_store(settings).await?;
      let summary = igcat_ingest::import_structure_definitions(
        &store,
        &package.ig,
        &package.ig_version,
        &dir,
      )
      .await
      .with_context(|| format!("import of {} failed", dir.display()))?;
      Output::ok(&summary)
    }

    Command::LoadFacts { package, kinds, truncate } => {
      let kinds = if kinds.is_empty() { FactKind::ALL.to_vec() } else { kinds };
      let store = open_store(settings).await?;
      let summary =
        igcat_ingest::load_facts(&store, &package.ig, &package.ig_version, &kinds, truncate)
          .await
          .context("fact load failed")?;
      Output::ok(&summary)
    }

    Command::Resolve { canonical, version } => {
      let store = open_store(settings).await?;
      match igcat_ingest::resolve_resource(&store, &canonical, version.as_deref()).await {
        Ok(resolved) => Output::ok(&resolved),
        Err(e) if e.is_not_found() => {
          Ok(Output { json: json!({ "error": "not found" }), failed: true })
        }
        Err(e) => Err(e).context("resolve failed"),
      }
    }

    Command::Ask {
      question,
      mode,
      canonical,
      version,
      path,
      value_set,
      api_url,
      timeout_ms,
    } => {
      let request = AskRequest {
        question,
        mode,
        hints: Slots { canonical, version, path, value_set },
      };
      let config = RouterConfig::from(settings);

      let response = match api_url {
        Some(url) => {
          let executor = HttpExecutor::new(&url, Duration::from_millis(timeout_ms))
            .context("failed to build HTTP client")?;
          QueryRouter::from_config(config, executor)?.route(request).await
        }
        None => {
          let store = Arc::new(open_store(settings).await?);
          QueryRouter::from_config(config, StoreExecutor::new(store))?
            .route(request)
            .await
        }
      };
      Output::ok(&response)
    }

    Command::Packages => {
      let store = open_store(settings).await?;
      let packages = store.list_packages().await.context("failed to list packages")?;
      Output::ok(&packages)
    }

    Command::DropPackage { package } => {
      let store = open_store(settings).await?;
      let Some(found) = store
        .find_package(&package.ig, &package.ig_version)
        .await
        .context("failed to look up package")?
      else {
        bail!("package not found for ig={}, ig_version={}", package.ig, package.ig_version);
      };
      let deleted = store
        .delete_package(found.id)
        .await
        .context("failed to delete package")?;
      Ok(Output {
        json:   json!({
          "ig": found.ig,
          "ig_version": found.ig_version,
          "package_id": found.id,
          "deleted": deleted,
        }),
        failed: false,
      })
    }
  }
}

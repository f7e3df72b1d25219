//! [`SqliteStore`]: the SQLite implementation of [`CatalogStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use igcat_core::{
  artifact::{Artifact, ArtifactImport, NewArtifact, Package, PackageScope},
  fact::{
    BindingFact, BindingUsage, ConstraintFact, ElementFact, FactBatch, FactKind, UpsertCounts,
  },
  fingerprint::{Decision, decide},
  store::CatalogStore,
};

use crate::{
  Result,
  encode::{
    ARTIFACT_COLUMNS, ARTIFACT_WIDTH, BINDING_COLUMNS, CONSTRAINT_COLUMNS, ELEMENT_COLUMNS,
    EncodedRow, PACKAGE_COLUMNS, RawArtifact, RawBinding, RawConstraint, RawElement, RawPackage,
    encode_binding, encode_constraint, encode_dt, encode_element,
  },
  schema::{
    BINDING_EXISTS, BINDING_UPSERT, CONSTRAINT_EXISTS, CONSTRAINT_UPSERT, ELEMENT_EXISTS,
    ELEMENT_UPSERT, SCHEMA,
  },
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An IG catalog backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store. Used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run one fact batch through its existence check and upsert statement
  /// inside a single transaction.
  async fn upsert_rows(
    &self,
    exists_sql: &'static str,
    upsert_sql: &'static str,
    rows: Vec<EncodedRow>,
  ) -> Result<UpsertCounts> {
    let counts = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut counts = UpsertCounts::default();
        {
          let mut exists = tx.prepare_cached(exists_sql)?;
          let mut upsert = tx.prepare_cached(upsert_sql)?;
          for row in &rows {
            let existed = exists
              .query_row(rusqlite::params_from_iter(row.key.iter()), |_| Ok(()))
              .optional()?
              .is_some();
            let changed = upsert.execute(rusqlite::params_from_iter(row.values.iter()))?;
            match (existed, changed) {
              (false, _) => counts.inserted += 1,
              (true, 0) => counts.unchanged += 1,
              (true, _) => counts.updated += 1,
            }
          }
        }
        tx.commit()?;
        Ok(counts)
      })
      .await?;
    Ok(counts)
  }

  async fn query_artifacts(
    &self,
    sql: String,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<Artifact>> {
    let raws: Vec<RawArtifact> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawArtifact::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawArtifact::into_artifact).collect()
  }

  /// Raw `loaded_at` column of one fact table, in row order.
  #[cfg(test)]
  pub(crate) async fn loaded_at(&self, kind: FactKind) -> Result<Vec<String>> {
    let sql = format!("SELECT loaded_at FROM {} ORDER BY id", fact_table(kind));
    let values = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| row.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(values)
  }
}

fn fact_table(kind: FactKind) -> &'static str {
  match kind {
    FactKind::Elements => "sd_elements",
    FactKind::Bindings => "sd_bindings",
    FactKind::Constraints => "sd_constraints",
  }
}

fn encode_batches<F>(
  batch: &[FactBatch<F>],
  loaded_at: &str,
  encode: impl Fn(i64, &F, &str) -> Result<EncodedRow>,
) -> Result<Vec<EncodedRow>> {
  batch
    .iter()
    .flat_map(|b| b.facts.iter().map(move |f| (b.artifact_id, f)))
    .map(|(artifact_id, f)| encode(artifact_id, f, loaded_at))
    .collect()
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  type Error = crate::Error;

  // ── Packages ──────────────────────────────────────────────────────────────

  async fn find_package<'a>(&'a self, ig: &'a str, ig_version: &'a str) -> Result<Option<Package>> {
    let ig = ig.to_owned();
    let ig_version = ig_version.to_owned();

    let raw: Option<RawPackage> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PACKAGE_COLUMNS} FROM packages WHERE ig = ?1 AND ig_version = ?2"),
            rusqlite::params![ig, ig_version],
            RawPackage::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawPackage::into_package).transpose()
  }

  async fn get_package(&self, id: i64) -> Result<Option<Package>> {
    let raw: Option<RawPackage> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PACKAGE_COLUMNS} FROM packages WHERE id = ?1"),
            rusqlite::params![id],
            RawPackage::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawPackage::into_package).transpose()
  }

  async fn list_packages(&self) -> Result<Vec<Package>> {
    let raws: Vec<RawPackage> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PACKAGE_COLUMNS} FROM packages ORDER BY ig, ig_version"
        ))?;
        let rows = stmt
          .query_map([], RawPackage::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPackage::into_package).collect()
  }

  async fn delete_package(&self, id: i64) -> Result<bool> {
    let removed = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM packages WHERE id = ?1", [id])?))
      .await?;
    Ok(removed > 0)
  }

  // ── Artifacts ─────────────────────────────────────────────────────────────

  async fn import_artifacts(
    &self,
    scope: PackageScope,
    batch: Vec<NewArtifact>,
  ) -> Result<ArtifactImport> {
    let now = encode_dt(Utc::now());

    let (raw, inserted, updated, unchanged) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let existing: Option<i64> = tx
          .query_row(
            "SELECT id FROM packages WHERE ig = ?1 AND ig_version = ?2",
            rusqlite::params![scope.ig, scope.ig_version],
            |r| r.get(0),
          )
          .optional()?;

        let package_id = match existing {
          Some(id) => {
            tx.execute(
              "UPDATE packages SET imported_at = ?2, source_path = ?3 WHERE id = ?1",
              rusqlite::params![id, now, scope.source_path],
            )?;
            id
          }
          None => {
            tx.execute(
              "INSERT INTO packages (ig, ig_version, imported_at, source_path)
               VALUES (?1, ?2, ?3, ?4)",
              rusqlite::params![scope.ig, scope.ig_version, now, scope.source_path],
            )?;
            tx.last_insert_rowid()
          }
        };

        let (mut inserted, mut updated, mut unchanged) = (0, 0, 0);
        {
          let mut lookup = tx.prepare_cached(
            "SELECT id, sha256 FROM artifacts
             WHERE package_id = ?1 AND canonical_url = ?2
               AND coalesce(version, '') = coalesce(?3, '')",
          )?;

          for art in &batch {
            let found: Option<(i64, String)> = lookup
              .query_row(
                rusqlite::params![package_id, art.canonical_url, art.version],
                |r| Ok((r.get(0)?, r.get(1)?)),
              )
              .optional()?;

            let decision = decide(found.as_ref().map(|(_, sha)| sha.as_str()), &art.sha256);
            match (decision, found) {
              (Decision::Insert, _) => {
                tx.execute(
                  "INSERT INTO artifacts (
                     package_id, resource_type, canonical_url, version, name, title,
                     sd_type, base_definition, file_path, sha256, indexed_at
                   ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                  rusqlite::params![
                    package_id,
                    art.resource_type,
                    art.canonical_url,
                    art.version,
                    art.name,
                    art.title,
                    art.sd_type,
                    art.base_definition,
                    art.file_path,
                    art.sha256,
                    now,
                  ],
                )?;
                inserted += 1;
              }
              (Decision::Update, Some((id, _))) => {
                tx.execute(
                  "UPDATE artifacts SET
                     resource_type = ?2, name = ?3, title = ?4, sd_type = ?5,
                     base_definition = ?6, file_path = ?7, sha256 = ?8, indexed_at = ?9
                   WHERE id = ?1",
                  rusqlite::params![
                    id,
                    art.resource_type,
                    art.name,
                    art.title,
                    art.sd_type,
                    art.base_definition,
                    art.file_path,
                    art.sha256,
                    now,
                  ],
                )?;
                updated += 1;
              }
              _ => unchanged += 1,
            }
          }
        }

        let raw = tx.query_row(
          &format!("SELECT {PACKAGE_COLUMNS} FROM packages WHERE id = ?1"),
          [package_id],
          RawPackage::from_row,
        )?;
        tx.commit()?;
        Ok((raw, inserted, updated, unchanged))
      })
      .await?;

    let package = raw.into_package()?;
    tracing::debug!(
      package_id = package.id,
      inserted,
      updated,
      unchanged,
      "artifact batch committed"
    );

    Ok(ArtifactImport { package, inserted, updated, unchanged })
  }

  async fn list_artifacts<'a>(
    &'a self,
    package_id: i64,
    resource_type: &'a str,
  ) -> Result<Vec<Artifact>> {
    self
      .query_artifacts(
        format!(
          "SELECT {ARTIFACT_COLUMNS} FROM artifacts a
           WHERE a.package_id = ?1 AND a.resource_type = ?2
           ORDER BY a.id"
        ),
        vec![package_id.into(), resource_type.to_owned().into()],
      )
      .await
  }

  async fn artifacts_by_canonical<'a>(&'a self, canonical: &'a str) -> Result<Vec<Artifact>> {
    self
      .query_artifacts(
        format!("SELECT {ARTIFACT_COLUMNS} FROM artifacts a WHERE a.canonical_url = ?1"),
        vec![canonical.to_owned().into()],
      )
      .await
  }

  // ── Facts — writes ────────────────────────────────────────────────────────

  async fn truncate_facts(&self, kind: FactKind, artifact_ids: Vec<i64>) -> Result<usize> {
    let table = fact_table(kind);

    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut removed = 0;
        {
          let mut delete =
            tx.prepare_cached(&format!("DELETE FROM {table} WHERE artifact_id = ?1"))?;
          for id in &artifact_ids {
            removed += delete.execute([id])?;
          }
        }
        tx.commit()?;
        Ok(removed)
      })
      .await?;

    tracing::debug!(kind = %kind, removed, "facts truncated");
    Ok(removed)
  }

  async fn upsert_elements(&self, batch: Vec<FactBatch<ElementFact>>) -> Result<UpsertCounts> {
    let loaded_at = encode_dt(Utc::now());
    let rows = encode_batches(&batch, &loaded_at, encode_element)?;
    self.upsert_rows(ELEMENT_EXISTS, ELEMENT_UPSERT, rows).await
  }

  async fn upsert_bindings(&self, batch: Vec<FactBatch<BindingFact>>) -> Result<UpsertCounts> {
    let loaded_at = encode_dt(Utc::now());
    let rows = encode_batches(&batch, &loaded_at, encode_binding)?;
    self.upsert_rows(BINDING_EXISTS, BINDING_UPSERT, rows).await
  }

  async fn upsert_constraints(
    &self,
    batch: Vec<FactBatch<ConstraintFact>>,
  ) -> Result<UpsertCounts> {
    let loaded_at = encode_dt(Utc::now());
    let rows = encode_batches(&batch, &loaded_at, encode_constraint)?;
    self.upsert_rows(CONSTRAINT_EXISTS, CONSTRAINT_UPSERT, rows).await
  }

  // ── Facts — reads ─────────────────────────────────────────────────────────

  async fn element_facts<'a>(
    &'a self,
    artifact_id: i64,
    path: Option<&'a str>,
    must_support_only: bool,
  ) -> Result<Vec<ElementFact>> {
    let path = path.map(str::to_owned);

    let raws: Vec<RawElement> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ELEMENT_COLUMNS} FROM sd_elements
           WHERE artifact_id = ?1
             AND (?2 IS NULL OR path = ?2)
             AND (?3 = 0 OR must_support = 1)
           ORDER BY path"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![artifact_id, path, must_support_only],
            RawElement::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawElement::into_fact).collect()
  }

  async fn binding_facts<'a>(
    &'a self,
    artifact_id: i64,
    path: Option<&'a str>,
  ) -> Result<Vec<BindingFact>> {
    let path = path.map(str::to_owned);

    let raws: Vec<RawBinding> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {BINDING_COLUMNS} FROM sd_bindings
           WHERE artifact_id = ?1 AND (?2 IS NULL OR path = ?2)
           ORDER BY path, value_set"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![artifact_id, path], |row| RawBinding::from_row(row, 0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawBinding::into_fact).collect()
  }

  async fn constraint_facts<'a>(
    &'a self,
    artifact_id: i64,
    path: Option<&'a str>,
  ) -> Result<Vec<ConstraintFact>> {
    let path = path.map(str::to_owned);

    let raws: Vec<RawConstraint> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CONSTRAINT_COLUMNS} FROM sd_constraints
           WHERE artifact_id = ?1 AND (?2 IS NULL OR path = ?2)
           ORDER BY path, key"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![artifact_id, path], RawConstraint::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawConstraint::into_fact).collect()
  }

  async fn binding_usages<'a>(
    &'a self,
    value_set: &'a str,
    package_id: Option<i64>,
  ) -> Result<Vec<BindingUsage>> {
    let value_set = value_set.to_owned();

    let raws: Vec<(RawArtifact, RawBinding)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ARTIFACT_COLUMNS},
                  b.path, b.strength, b.value_set, b.binding_json, b.source_choice
           FROM sd_bindings b
           JOIN artifacts a ON a.id = b.artifact_id
           WHERE b.value_set = ?1 AND (?2 IS NULL OR a.package_id = ?2)
           ORDER BY a.sd_type, a.canonical_url, b.path"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![value_set, package_id], |row| {
            Ok((RawArtifact::from_row(row)?, RawBinding::from_row(row, ARTIFACT_WIDTH)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(a, b)| {
        Ok(BindingUsage {
          artifact: a.into_artifact()?,
          binding:  b.into_fact()?,
        })
      })
      .collect()
  }
}

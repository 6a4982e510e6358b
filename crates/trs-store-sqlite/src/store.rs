//! [`SqliteStore`]: the SQLite implementation of [`RecordStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use trs_core::{
  attribute::{AttributeValue, IdentifyingAttribute},
  outbox::OutboxMessage,
  person::{CandidateRecord, ExternalKey, ExternalKeys, MatchQuery, NameSet, PersonId},
  review::ReviewArtifact,
  store::{CandidateStore, NewPerson, RecordStore},
};

use crate::{
  Error, Result,
  encode::{
    PERSON_COLUMNS, RawOutboxMessage, RawPerson, RawReviewTask, encode_date, encode_dt,
    encode_priority, encode_uuid, match_key, name_keys,
  },
  schema::SCHEMA,
};

/// The first TRN a fresh store hands out.
pub const DEFAULT_TRN_RANGE_START: u32 = 1_000_000;

/// TRNs are seven decimal digits.
const MAX_TRN: u32 = 9_999_999;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A TRS record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
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

  /// Open an in-memory store, for tests.
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

  /// Raise the TRN sequence so the next allocation is at least `start`.
  ///
  /// Never lowers the sequence, so reapplying the configured start on every
  /// boot is safe.
  pub async fn set_trn_range_start(&self, start: u32) -> Result<()> {
    if start == 0 || start > MAX_TRN {
      return Err(Error::InvalidTrnRangeStart(start));
    }
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE trn_sequence SET next_value = ?1 WHERE id = 1 AND next_value < ?1",
          [start],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Load persons matching a `WHERE` fragment over `persons p`, in insertion
  /// order, together with their previous names.
  async fn select_persons(&self, filter: String, params: Vec<String>) -> Result<Vec<CandidateRecord>> {
    let raws: Vec<RawPerson> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {PERSON_COLUMNS} FROM persons p WHERE {filter} ORDER BY p.rowid");
        let mut stmt = conn.prepare(&sql)?;
        let mut persons = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawPerson::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut names = conn.prepare(
          "SELECT first_name, middle_name, last_name FROM previous_names
           WHERE person_id = ?1 ORDER BY position",
        )?;
        for person in &mut persons {
          person.previous_names = names
            .query_map([&person.person_id], |row| {
              Ok(NameSet {
                first_name:  row.get(0)?,
                middle_name: row.get(1)?,
                last_name:   row.get(2)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        }
        Ok(persons)
      })
      .await?;

    raws.into_iter().map(RawPerson::into_record).collect()
  }
}

/// `OR`-joined conditions with positional parameters.
#[derive(Default)]
struct Filter {
  conds:  Vec<String>,
  params: Vec<String>,
}

impl Filter {
  /// Bind `value` and push the condition built from its parameter index.
  fn push(&mut self, value: String, cond: impl FnOnce(usize) -> String) {
    self.params.push(value);
    self.conds.push(cond(self.params.len()));
  }

  fn into_parts(self) -> Option<(String, Vec<String>)> {
    if self.conds.is_empty() {
      return None;
    }
    let sql = self
      .conds
      .iter()
      .map(|c| format!("({c})"))
      .collect::<Vec<_>>()
      .join(" OR ");
    Some((sql, self.params))
  }
}

fn key_column(key: &ExternalKey) -> &'static str {
  match key {
    ExternalKey::HusId(_) => "hus_id",
    ExternalKey::SlugId(_) => "slug_id",
    ExternalKey::IttSlugId(_) => "itt_slug_id",
  }
}

/// External keys with blank values dropped.
fn populated_keys(keys: &ExternalKeys) -> ExternalKeys {
  let mut populated = ExternalKeys::default();
  for key in keys.keys() {
    match key {
      ExternalKey::HusId(v) => populated.hus_id = Some(v),
      ExternalKey::SlugId(v) => populated.slug_id = Some(v),
      ExternalKey::IttSlugId(v) => populated.itt_slug_id = Some(v),
    }
  }
  populated
}

enum Allocation {
  Allocated(String),
  NotFound,
  AlreadyHeld(String),
  Exhausted,
}

// ─── CandidateStore impl ─────────────────────────────────────────────────────

impl CandidateStore for SqliteStore {
  type Error = Error;

  async fn find_by_any_attribute(&self, query: &MatchQuery) -> Result<Vec<CandidateRecord>> {
    let mut filter = Filter::default();

    for (attribute, column) in [
      (IdentifyingAttribute::FirstName, "first_name_key"),
      (IdentifyingAttribute::MiddleName, "middle_name_key"),
      (IdentifyingAttribute::LastName, "last_name_key"),
    ] {
      if let Some(key) = match_key(query, attribute) {
        filter.push(key, |n| {
          format!(
            "p.{column} = ?{n} OR EXISTS (SELECT 1 FROM previous_names pn
               WHERE pn.person_id = p.person_id AND pn.{column} = ?{n})"
          )
        });
      }
    }
    if let Some(dob) = query.date_of_birth {
      filter.push(encode_date(dob), |n| format!("p.date_of_birth = ?{n}"));
    }
    if let Some(nino) = match_key(query, IdentifyingAttribute::NationalInsuranceNumber) {
      filter.push(nino, |n| format!("p.nino_key = ?{n}"));
    }
    if let Some(AttributeValue::Text(trn)) = query.value(IdentifyingAttribute::Trn) {
      filter.push(trn.to_owned(), |n| format!("p.trn = ?{n}"));
    }
    if let Some(provider) = query.itt_provider_id {
      filter.push(encode_uuid(provider), |n| format!("p.itt_provider_id = ?{n}"));
    }

    let Some((sql, params)) = filter.into_parts() else {
      return Ok(vec![]);
    };
    let candidates = self.select_persons(sql, params).await?;
    tracing::debug!(candidates = candidates.len(), "coarse candidate fetch");
    Ok(candidates)
  }

  async fn find_by_external_key(&self, key: &ExternalKey) -> Result<Option<CandidateRecord>> {
    let filter = format!("p.{} = ?1", key_column(key));
    let found = self.select_persons(filter, vec![key.value().to_owned()]).await?;
    Ok(found.into_iter().next())
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  async fn add_person(&self, input: NewPerson) -> Result<CandidateRecord> {
    let mut attributes = input.attributes;
    attributes.trn = attributes.trn.filter(|t| !t.trim().is_empty());

    let record = CandidateRecord {
      person_id: PersonId::random(),
      attributes,
      previous_names: input.previous_names,
      external_keys: populated_keys(&input.external_keys),
      risk_flags: input.risk_flags,
      created_at: Utc::now(),
    };

    let a = &record.attributes;
    let id_str          = encode_uuid(record.person_id.0);
    let at_str          = encode_dt(record.created_at);
    let first_name      = a.first_name.clone();
    let middle_name     = a.middle_name.clone();
    let last_name       = a.last_name.clone();
    let dob_str         = a.date_of_birth.map(encode_date);
    let nino            = a.national_insurance_number.clone();
    let trn             = a.trn.clone();
    let provider_str    = a.itt_provider_id.map(encode_uuid);
    let keys            = record.external_keys.clone();
    let flags           = record.risk_flags;
    let first_key       = match_key(a, IdentifyingAttribute::FirstName);
    let middle_key      = match_key(a, IdentifyingAttribute::MiddleName);
    let last_key        = match_key(a, IdentifyingAttribute::LastName);
    let nino_key        = match_key(a, IdentifyingAttribute::NationalInsuranceNumber);
    let previous_names  = record.previous_names.clone();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO persons (
             person_id, created_at, first_name, middle_name, last_name,
             date_of_birth, nino, trn, itt_provider_id,
             hus_id, slug_id, itt_slug_id,
             has_active_sanctions, has_qts_date, has_eyts_date,
             first_name_key, middle_name_key, last_name_key, nino_key
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                     ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
          rusqlite::params![
            id_str,
            at_str,
            first_name,
            middle_name,
            last_name,
            dob_str,
            nino,
            trn,
            provider_str,
            keys.hus_id,
            keys.slug_id,
            keys.itt_slug_id,
            flags.has_active_sanctions,
            flags.has_qts_date,
            flags.has_eyts_date,
            first_key,
            middle_key,
            last_key,
            nino_key,
          ],
        )?;
        for (position, name) in previous_names.iter().enumerate() {
          insert_previous_name(&tx, &id_str, position as i64, name)?;
        }
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(Error::from_write)?;

    tracing::debug!(person_id = %record.person_id, "person added");
    Ok(record)
  }

  async fn allocate_trn(&self, person_id: PersonId) -> Result<String> {
    let id_str = encode_uuid(person_id.0);

    let allocation = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let current: Option<Option<String>> = tx
          .query_row(
            "SELECT trn FROM persons WHERE person_id = ?1",
            [&id_str],
            |r| r.get(0),
          )
          .optional()?;

        let allocation = match current {
          None => Allocation::NotFound,
          Some(Some(trn)) => Allocation::AlreadyHeld(trn),
          Some(None) => {
            let mut next: u32 = tx.query_row(
              "SELECT next_value FROM trn_sequence WHERE id = 1",
              [],
              |r| r.get(0),
            )?;
            // Skip values already held by imported records.
            loop {
              if next > MAX_TRN {
                break Allocation::Exhausted;
              }
              let trn = format!("{next:07}");
              let taken = tx
                .query_row("SELECT 1 FROM persons WHERE trn = ?1", [&trn], |_| Ok(()))
                .optional()?
                .is_some();
              next += 1;
              if !taken {
                tx.execute("UPDATE trn_sequence SET next_value = ?1 WHERE id = 1", [next])?;
                tx.execute(
                  "UPDATE persons SET trn = ?1 WHERE person_id = ?2",
                  rusqlite::params![trn, id_str],
                )?;
                break Allocation::Allocated(trn);
              }
            }
          }
        };
        tx.commit()?;
        Ok(allocation)
      })
      .await
      .map_err(Error::from_write)?;

    match allocation {
      Allocation::Allocated(trn) => {
        tracing::info!(%person_id, %trn, "TRN allocated");
        Ok(trn)
      }
      Allocation::NotFound => Err(Error::PersonNotFound(person_id)),
      Allocation::AlreadyHeld(trn) => Err(Error::TrnAlreadyAllocated { person_id, trn }),
      Allocation::Exhausted => Err(Error::TrnRangeExhausted),
    }
  }

  async fn add_previous_name(&self, person_id: PersonId, name: NameSet) -> Result<()> {
    let id_str = encode_uuid(person_id.0);

    let found = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let position: Option<i64> = tx
          .query_row(
            "SELECT (SELECT COALESCE(MAX(position) + 1, 0) FROM previous_names
                     WHERE person_id = ?1)
             FROM persons WHERE person_id = ?1",
            [&id_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(position) = position else {
          return Ok(false);
        };
        insert_previous_name(&tx, &id_str, position, &name)?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if found { Ok(()) } else { Err(Error::PersonNotFound(person_id)) }
  }

  async fn get_person(&self, person_id: PersonId) -> Result<Option<CandidateRecord>> {
    let found = self
      .select_persons("p.person_id = ?1".to_owned(), vec![encode_uuid(person_id.0)])
      .await?;
    Ok(found.into_iter().next())
  }

  // ── Review tasks ──────────────────────────────────────────────────────────

  async fn save_review_artifact(&self, artifact: ReviewArtifact) -> Result<()> {
    let id_str        = encode_uuid(artifact.artifact_id);
    let regarding_str = encode_uuid(artifact.regarding.0);
    let duplicate_str = artifact.duplicate.map(|d| encode_uuid(d.0));
    let category      = artifact.category.code();
    let priority      = encode_priority(artifact.priority);
    let at_str        = encode_dt(artifact.created_at);
    let description   = artifact.description;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO review_tasks (
             artifact_id, regarding, duplicate, category, priority, description, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str,
            regarding_str,
            duplicate_str,
            category,
            priority,
            description,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::from_write)?;
    Ok(())
  }

  async fn list_review_artifacts(&self) -> Result<Vec<ReviewArtifact>> {
    let raws: Vec<RawReviewTask> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT artifact_id, regarding, duplicate, category, priority, description, created_at
           FROM review_tasks ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawReviewTask {
              artifact_id: row.get(0)?,
              regarding:   row.get(1)?,
              duplicate:   row.get(2)?,
              category:    row.get(3)?,
              priority:    row.get(4)?,
              description: row.get(5)?,
              created_at:  row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReviewTask::into_artifact).collect()
  }

  // ── Outbox ────────────────────────────────────────────────────────────────

  async fn enqueue_outbox_message(&self, message: OutboxMessage) -> Result<()> {
    let id_str     = encode_uuid(message.message_id);
    let target_str = encode_uuid(message.target_person_id.0);
    let at_str     = encode_dt(message.created_at);
    let name       = message.message_name;
    let payload    = message.payload.to_vec();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO outbox_messages (
             message_id, message_name, payload, target_person_id, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, name, payload, target_str, at_str],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::from_write)?;
    Ok(())
  }

  async fn list_outbox_messages(&self) -> Result<Vec<OutboxMessage>> {
    let raws: Vec<RawOutboxMessage> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT message_id, message_name, payload, target_person_id, created_at
           FROM outbox_messages ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawOutboxMessage {
              message_id:       row.get(0)?,
              message_name:     row.get(1)?,
              payload:          row.get(2)?,
              target_person_id: row.get(3)?,
              created_at:       row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawOutboxMessage::into_message).collect()
  }
}

fn insert_previous_name(
  conn: &rusqlite::Connection,
  person_id: &str,
  position: i64,
  name: &NameSet,
) -> rusqlite::Result<()> {
  let [first_key, middle_key, last_key] = name_keys(name);
  conn.execute(
    "INSERT INTO previous_names (
       person_id, position, first_name, middle_name, last_name,
       first_name_key, middle_name_key, last_name_key
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    rusqlite::params![
      person_id,
      position,
      name.first_name,
      name.middle_name,
      name.last_name,
      first_key,
      middle_key,
      last_key,
    ],
  )?;
  Ok(())
}

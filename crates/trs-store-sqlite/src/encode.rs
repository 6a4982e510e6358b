//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, dates as `YYYY-MM-DD`, UUIDs as
//! hyphenated lowercase strings and booleans as `0`/`1`.

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use trs_core::{
  attribute::{AttributeValue, IdentifyingAttribute, normalize},
  outbox::OutboxMessage,
  person::{
    CandidateRecord, ExternalKeys, NameSet, PersonAttributes, PersonId, RiskFlags,
  },
  review::{ReviewArtifact, TaskCategory, TaskPriority},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_person_id(s: &str) -> Result<PersonId> { decode_uuid(s).map(PersonId) }

// ─── Dates ────────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── TaskPriority ─────────────────────────────────────────────────────────────

pub fn encode_priority(p: TaskPriority) -> &'static str {
  match p {
    TaskPriority::Normal => "normal",
    TaskPriority::High => "high",
  }
}

pub fn decode_priority(s: &str) -> Result<TaskPriority> {
  match s {
    "normal" => Ok(TaskPriority::Normal),
    "high" => Ok(TaskPriority::High),
    other => Err(Error::UnknownPriority(other.to_owned())),
  }
}

// ─── Match keys ───────────────────────────────────────────────────────────────

/// The normalised form of a textual attribute, or `None` when blank.
pub fn match_key(attributes: &PersonAttributes, attribute: IdentifyingAttribute) -> Option<String> {
  match attributes.value(attribute)? {
    AttributeValue::Text(s) => Some(normalize(attribute, s)),
    AttributeValue::Date(_) | AttributeValue::Id(_) => None,
  }
}

/// Normalised `(first, middle, last)` keys for a name set.
pub fn name_keys(name: &NameSet) -> [Option<String>; 3] {
  let attributes = PersonAttributes::default().with_name(name);
  [
    match_key(&attributes, IdentifyingAttribute::FirstName),
    match_key(&attributes, IdentifyingAttribute::MiddleName),
    match_key(&attributes, IdentifyingAttribute::LastName),
  ]
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `persons` row, with its previous names.
pub struct RawPerson {
  pub person_id:            String,
  pub created_at:           String,
  pub first_name:           Option<String>,
  pub middle_name:          Option<String>,
  pub last_name:            Option<String>,
  pub date_of_birth:        Option<String>,
  pub nino:                 Option<String>,
  pub trn:                  Option<String>,
  pub itt_provider_id:      Option<String>,
  pub hus_id:               Option<String>,
  pub slug_id:              Option<String>,
  pub itt_slug_id:          Option<String>,
  pub has_active_sanctions: bool,
  pub has_qts_date:         bool,
  pub has_eyts_date:        bool,
  // previous_names rows, in position order
  pub previous_names:       Vec<NameSet>,
}

/// Column list matching [`RawPerson::from_row`].
pub const PERSON_COLUMNS: &str = "p.person_id, p.created_at, p.first_name, p.middle_name,
  p.last_name, p.date_of_birth, p.nino, p.trn, p.itt_provider_id, p.hus_id, p.slug_id,
  p.itt_slug_id, p.has_active_sanctions, p.has_qts_date, p.has_eyts_date";

impl RawPerson {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      person_id:            row.get(0)?,
      created_at:           row.get(1)?,
      first_name:           row.get(2)?,
      middle_name:          row.get(3)?,
      last_name:            row.get(4)?,
      date_of_birth:        row.get(5)?,
      nino:                 row.get(6)?,
      trn:                  row.get(7)?,
      itt_provider_id:      row.get(8)?,
      hus_id:               row.get(9)?,
      slug_id:              row.get(10)?,
      itt_slug_id:          row.get(11)?,
      has_active_sanctions: row.get(12)?,
      has_qts_date:         row.get(13)?,
      has_eyts_date:        row.get(14)?,
      previous_names:       Vec::new(),
    })
  }

  pub fn into_record(self) -> Result<CandidateRecord> {
    Ok(CandidateRecord {
      person_id:      decode_person_id(&self.person_id)?,
      attributes:     PersonAttributes {
        first_name:                self.first_name,
        middle_name:               self.middle_name,
        last_name:                 self.last_name,
        date_of_birth:             self.date_of_birth.as_deref().map(decode_date).transpose()?,
        national_insurance_number: self.nino,
        trn:                       self.trn,
        itt_provider_id:           self
          .itt_provider_id
          .as_deref()
          .map(decode_uuid)
          .transpose()?,
      },
      previous_names: self.previous_names,
      external_keys:  ExternalKeys {
        hus_id:      self.hus_id,
        slug_id:     self.slug_id,
        itt_slug_id: self.itt_slug_id,
      },
      risk_flags:     RiskFlags {
        has_active_sanctions: self.has_active_sanctions,
        has_qts_date:         self.has_qts_date,
        has_eyts_date:        self.has_eyts_date,
      },
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `review_tasks` row.
pub struct RawReviewTask {
  pub artifact_id: String,
  pub regarding:   String,
  pub duplicate:   Option<String>,
  pub category:    String,
  pub priority:    String,
  pub description: String,
  pub created_at:  String,
}

impl RawReviewTask {
  pub fn into_artifact(self) -> Result<ReviewArtifact> {
    Ok(ReviewArtifact {
      artifact_id: decode_uuid(&self.artifact_id)?,
      regarding:   decode_person_id(&self.regarding)?,
      duplicate:   self.duplicate.as_deref().map(decode_person_id).transpose()?,
      category:    TaskCategory::from_code(&self.category)?,
      priority:    decode_priority(&self.priority)?,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from an `outbox_messages` row.
pub struct RawOutboxMessage {
  pub message_id:       String,
  pub message_name:     String,
  pub payload:          Vec<u8>,
  pub target_person_id: String,
  pub created_at:       String,
}

impl RawOutboxMessage {
  pub fn into_message(self) -> Result<OutboxMessage> {
    Ok(OutboxMessage {
      message_id:       decode_uuid(&self.message_id)?,
      message_name:     self.message_name,
      payload:          Bytes::from(self.payload),
      target_person_id: decode_person_id(&self.target_person_id)?,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

//! Outbox messages for resolved induction-requirement facts.
//!
//! The message name doubles as the type discriminant; the payload is the
//! JSON-encoded message body without the tag.

use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString};
use uuid::Uuid;

use crate::{Error, Result, clock::Clock, person::PersonId};

// ─── Recognition routes ──────────────────────────────────────────────────────

/// Exemption reason: has, or is eligible for, full registration in Scotland.
pub const SCOTLAND_EXEMPTION_REASON_ID: Uuid =
  Uuid::from_u128(0xa112e691_1694_46a7_8f33_5ec5b845c181);

/// Exemption reason: passed induction in Northern Ireland.
pub const NORTHERN_IRELAND_EXEMPTION_REASON_ID: Uuid =
  Uuid::from_u128(0x3471ab35_e6e4_4fa9_a72b_b8bd113df591);

/// Exemption reason: qualified through overseas teacher recognition.
pub const OVERSEAS_EXEMPTION_REASON_ID: Uuid =
  Uuid::from_u128(0x4c97e211_10d2_4c63_8da9_b0fcebe7f2f9);

/// How an applicant's teaching qualification was recognised.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecognitionRoute {
  Scotland,
  NorthernIreland,
  OverseasTrainedTeachers,
}

impl RecognitionRoute {
  /// Parse a route code, rejecting unknown codes.
  pub fn from_code(code: &str) -> Result<Self> {
    Self::from_str(code).map_err(|_| Error::UnknownRecognitionRoute(code.to_owned()))
  }

  /// The fixed induction-exemption reason for this route.
  pub fn exemption_reason_id(self) -> Uuid {
    match self {
      Self::Scotland => SCOTLAND_EXEMPTION_REASON_ID,
      Self::NorthernIreland => NORTHERN_IRELAND_EXEMPTION_REASON_ID,
      Self::OverseasTrainedTeachers => OVERSEAS_EXEMPTION_REASON_ID,
    }
  }
}

// ─── Messages ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetInductionRequiredToCompleteMessage {
  pub person_id: PersonId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddInductionExemptionMessage {
  pub person_id:           PersonId,
  pub exemption_reason_id: Uuid,
}

/// The typed body of an induction outbox message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InductionMessage {
  #[serde(rename = "SetInductionRequiredToCompleteMessage")]
  SetInductionRequiredToComplete(SetInductionRequiredToCompleteMessage),
  #[serde(rename = "AddInductionExemptionMessage")]
  AddInductionExemption(AddInductionExemptionMessage),
}

impl InductionMessage {
  /// The message name; must match the serde renames above.
  pub fn name(&self) -> &'static str {
    match self {
      Self::SetInductionRequiredToComplete(_) => "SetInductionRequiredToCompleteMessage",
      Self::AddInductionExemption(_) => "AddInductionExemptionMessage",
    }
  }

  pub fn person_id(&self) -> PersonId {
    match self {
      Self::SetInductionRequiredToComplete(m) => m.person_id,
      Self::AddInductionExemption(m) => m.person_id,
    }
  }

  /// Serialise the inner body (without the type tag).
  pub fn to_payload(&self) -> Result<Bytes> {
    let full = serde_json::to_value(self)?;
    let data = full.get("data").cloned().unwrap_or(serde_json::Value::Null);
    Ok(Bytes::from(serde_json::to_vec(&data)?))
  }

  /// Rebuild a message from its name and payload.
  pub fn from_parts(name: &str, payload: &[u8]) -> Result<Self> {
    if !matches!(
      name,
      "SetInductionRequiredToCompleteMessage" | "AddInductionExemptionMessage"
    ) {
      return Err(Error::UnknownMessageName(name.to_owned()));
    }
    let data: serde_json::Value = serde_json::from_slice(payload)?;
    let wrapped = serde_json::json!({ "type": name, "data": data });
    Ok(serde_json::from_value(wrapped)?)
  }
}

/// Which message, if any, a resolved induction fact produces.
///
/// `None` for `induction_required` means the fact is not yet resolved.
pub fn induction_message(
  person_id: PersonId,
  route: RecognitionRoute,
  induction_required: Option<bool>,
) -> Option<InductionMessage> {
  match induction_required? {
    true => Some(InductionMessage::SetInductionRequiredToComplete(
      SetInductionRequiredToCompleteMessage { person_id },
    )),
    false => Some(InductionMessage::AddInductionExemption(
      AddInductionExemptionMessage {
        person_id,
        exemption_reason_id: route.exemption_reason_id(),
      },
    )),
  }
}

// ─── Envelope ────────────────────────────────────────────────────────────────

/// A queued message; never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxMessage {
  pub message_id:       Uuid,
  pub message_name:     String,
  pub payload:          Bytes,
  pub target_person_id: PersonId,
  pub created_at:       DateTime<Utc>,
}

impl OutboxMessage {
  pub fn new(message: &InductionMessage, clock: &dyn Clock) -> Result<Self> {
    Ok(Self {
      message_id:       Uuid::new_v4(),
      message_name:     message.name().to_owned(),
      payload:          message.to_payload()?,
      target_person_id: message.person_id(),
      created_at:       clock.now(),
    })
  }

  pub fn decode(&self) -> Result<InductionMessage> {
    InductionMessage::from_parts(&self.message_name, &self.payload)
  }
}

/// Compose the outbox message for a resolved induction fact.
pub fn compose(
  person_id: PersonId,
  route: RecognitionRoute,
  induction_required: Option<bool>,
  clock: &dyn Clock,
) -> Result<Option<OutboxMessage>> {
  induction_message(person_id, route, induction_required)
    .map(|message| OutboxMessage::new(&message, clock))
    .transpose()
}

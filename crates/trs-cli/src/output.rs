//! Plain-text rendering of API responses.

use std::fmt::Write as _;

use trs_core::{
  outbox::OutboxMessage,
  ranking::RankedMatch,
  resolution::Decision,
  review::ReviewArtifact,
  threshold::Qualification,
};

use crate::client::TrnRequestOutcome;

fn qualification(q: &Qualification) -> String {
  match q {
    Qualification::NameDobTriad { matched } => format!("{matched} of name/DOB"),
    Qualification::StrongIdentifier { attribute } => format!("{} match", attribute.label()),
    Qualification::IdentifierGroups { matched } => format!("{matched} identifier groups"),
  }
}

pub fn matches(matches: &[RankedMatch]) -> String {
  if matches.is_empty() {
    return "no qualifying matches\n".to_owned();
  }
  let mut out = String::new();
  for m in matches {
    let names: Vec<&str> = m
      .result
      .matched_attributes
      .iter()
      .map(|a| a.label())
      .collect();
    let _ = writeln!(
      out,
      "{:>2}. {}  trn={}  [{}]  {}{}",
      m.rank,
      m.candidate.person_id,
      m.candidate.attributes.trn.as_deref().unwrap_or("-"),
      qualification(&m.qualification),
      names.join(", "),
      if m.result.matched_previous_name { " (previous name)" } else { "" },
    );
  }
  out
}

pub fn outcome(outcome: &TrnRequestOutcome) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "person:  {}", outcome.person_id);
  match &outcome.decision {
    Decision::Allocated { .. } => {
      let _ = writeln!(out, "trn:     {}", outcome.trn.as_deref().unwrap_or("-"));
    }
    Decision::Escalated(escalation) => {
      let duplicate = escalation
        .candidate
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_owned());
      let _ = writeln!(out, "status:  pending review (duplicate of {duplicate})");
    }
  }
  if !outcome.matches.is_empty() {
    out.push_str(&matches(&outcome.matches));
  }
  if let Some(task) = &outcome.task {
    out.push_str(&tasks(std::slice::from_ref(task)));
  }
  out
}

pub fn tasks(tasks: &[ReviewArtifact]) -> String {
  if tasks.is_empty() {
    return "no review tasks\n".to_owned();
  }
  let mut out = String::new();
  for t in tasks {
    let _ = writeln!(
      out,
      "{}  {}  {:?}  regarding {}  {}",
      t.created_at.format("%Y-%m-%d %H:%M"),
      t.category.code(),
      t.priority,
      t.regarding,
      t.duplicate
        .map(|d| format!("duplicate of {d}"))
        .unwrap_or_default(),
    );
    for line in t.description.lines() {
      let _ = writeln!(out, "    {line}");
    }
  }
  out
}

pub fn outbox(messages: &[OutboxMessage]) -> String {
  if messages.is_empty() {
    return "outbox is empty\n".to_owned();
  }
  let mut out = String::new();
  for m in messages {
    let _ = writeln!(
      out,
      "{}  {}  -> {}  {}",
      m.created_at.format("%Y-%m-%d %H:%M"),
      m.message_name,
      m.target_person_id,
      String::from_utf8_lossy(&m.payload),
    );
  }
  out
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use trs_core::{
    person::PersonId,
    review::{TaskCategory, TaskPriority},
  };
  use uuid::Uuid;

  use super::*;

  #[test]
  fn empty_lists_say_so() {
    assert_eq!(matches(&[]), "no qualifying matches\n");
    assert_eq!(tasks(&[]), "no review tasks\n");
    assert_eq!(outbox(&[]), "outbox is empty\n");
  }

  #[test]
  fn task_description_is_indented() {
    let task = ReviewArtifact {
      artifact_id: Uuid::nil(),
      regarding:   PersonId(Uuid::nil()),
      duplicate:   None,
      category:    TaskCategory::DmsImportTrn,
      priority:    TaskPriority::High,
      description: "Potential duplicate\nMatched on\n  - Last name: 'Bloggs'\n".into(),
      created_at:  Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 0).unwrap(),
    };
    let text = tasks(&[task]);
    assert!(text.starts_with("2025-01-02 03:04  DMSImportTrn  High  regarding "));
    assert!(text.contains("\n    Potential duplicate\n    Matched on\n      - Last name: 'Bloggs'\n"));
  }
}

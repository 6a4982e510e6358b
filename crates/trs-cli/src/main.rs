//! `trs`: command-line client for the TRS identity-matching API.
//!
//! # Usage
//!
//! ```
//! trs --url http://localhost:8080 match --first-name Joe --last-name Bloggs --dob 1990-05-23
//! trs --config ~/.config/trs/config.toml tasks
//! ```

mod client;
mod output;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use trs_core::{
  intake::IntakeRequest,
  person::{ExternalKeys, MatchQuery, PersonId},
  threshold::ThresholdPolicy,
};
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "trs", about = "Command-line client for the TRS matching API")]
struct Args {
  /// Path to a TOML config file (url).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Base URL of the TRS server (default: http://localhost:8080).
  #[arg(long, env = "TRS_URL")]
  url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Dry-run a match against stored records.
  Match {
    #[command(flatten)]
    person:          PersonArgs,
    /// Stated TRN to match on.
    #[arg(long)]
    trn:             Option<String>,
    #[arg(long, value_name = "UUID")]
    itt_provider_id: Option<Uuid>,
    /// Use the identifier-group rule instead of the TRN-request rule.
    #[arg(long)]
    find_teachers:   bool,
  },
  /// Submit a TRN request through the full intake flow.
  RequestTrn {
    #[command(flatten)]
    person:         PersonArgs,
    #[arg(long)]
    stated_trn:     Option<String>,
    /// UKPRN of the ITT provider.
    #[arg(long)]
    ukprn:          Option<String>,
    /// Teacher status code, e.g. 211.
    #[arg(long)]
    teacher_status: Option<String>,
    /// Qualification subject code; repeat up to three times.
    #[arg(long = "subject", value_name = "CODE")]
    subjects:       Vec<String>,
    #[arg(long)]
    hus_id:         Option<String>,
    #[arg(long)]
    slug_id:        Option<String>,
    #[arg(long)]
    itt_slug_id:    Option<String>,
    /// Task category code for any review task raised.
    #[arg(long)]
    category:       Option<String>,
  },
  /// List review tasks.
  Tasks,
  /// List outbox messages.
  Outbox,
  /// Record a resolved induction fact for a person.
  Induction {
    #[arg(long)]
    person_id: Uuid,
    /// Recognition route: scotland, northern_ireland or overseas_trained_teachers.
    #[arg(long)]
    route:     String,
    /// Whether induction is required; omit while unresolved.
    #[arg(long)]
    required:  Option<bool>,
  },
}

#[derive(ClapArgs, Debug)]
struct PersonArgs {
  #[arg(long)]
  first_name:  Option<String>,
  #[arg(long)]
  middle_name: Option<String>,
  #[arg(long)]
  last_name:   Option<String>,
  /// Date of birth, YYYY-MM-DD.
  #[arg(long)]
  dob:         Option<NaiveDate>,
  /// National Insurance number.
  #[arg(long)]
  nino:        Option<String>,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| "http://localhost:8080".to_string()),
  };
  let client = ApiClient::new(api_config)?;

  match args.command {
    Command::Match {
      person,
      trn,
      itt_provider_id,
      find_teachers,
    } => {
      let query = MatchQuery {
        first_name: person.first_name,
        middle_name: person.middle_name,
        last_name: person.last_name,
        date_of_birth: person.dob,
        national_insurance_number: person.nino,
        trn,
        itt_provider_id,
      };
      let policy = if find_teachers {
        ThresholdPolicy::FindTeachers
      } else {
        ThresholdPolicy::TrnRequest
      };
      let matches = client.find_matches(&query, policy).await?;
      print!("{}", output::matches(&matches));
    }
    Command::RequestTrn {
      person,
      stated_trn,
      ukprn,
      teacher_status,
      subjects,
      hus_id,
      slug_id,
      itt_slug_id,
      category,
    } => {
      let request = IntakeRequest {
        first_name: person.first_name,
        middle_name: person.middle_name,
        last_name: person.last_name,
        date_of_birth: person.dob,
        national_insurance_number: person.nino,
        stated_trn,
        itt_provider_ukprn: ukprn,
        teacher_status,
        qualification_subjects: subjects,
        external_keys: ExternalKeys {
          hus_id,
          slug_id,
          itt_slug_id,
        },
      };
      let outcome = client.request_trn(&request, category.as_deref()).await?;
      print!("{}", output::outcome(&outcome));
    }
    Command::Tasks => {
      let tasks = client.list_tasks().await?;
      print!("{}", output::tasks(&tasks));
    }
    Command::Outbox => {
      let messages = client.list_outbox().await?;
      print!("{}", output::outbox(&messages));
    }
    Command::Induction {
      person_id,
      route,
      required,
    } => match client
      .record_induction(PersonId(person_id), &route, required)
      .await?
    {
      Some(message) => print!("{}", output::outbox(std::slice::from_ref(&message))),
      None => println!("induction requirement unresolved; nothing queued"),
    },
  }

  Ok(())
}

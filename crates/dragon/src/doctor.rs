// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `dragon doctor` command implementation.
//!
//! Runs diagnostic checks against configuration and storage so a learner can
//! tell which backend is in use and whether its data is readable.

use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use colored::Colorize;

use dragon_config::{BackendPreference, DragonConfig};
use dragon_core::{BackendKind, DragonError, StorageBackend};
use dragon_storage::BackendSelector;

/// Status of a diagnostic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `dragon doctor` command.
pub async fn run_doctor(
    config: &DragonConfig,
    config_path: Option<&Path>,
    use_color: bool,
    out: &mut dyn Write,
) -> Result<(), DragonError> {
    let mut results = vec![check_config(config_path)];

    #[cfg(feature = "sqlite")]
    if config.storage.backend != BackendPreference::Local {
        results.push(check_db_integrity(&config.storage.database_path).await);
    }

    let start = Instant::now();
    match BackendSelector::new(config.storage.clone()).get().await {
        Ok(backend) => {
            results.push(check_backend(config, backend.kind(), start));
            results.push(check_profiles(backend.as_ref()).await);
            let _ = backend.close().await;
        }
        Err(e) => results.push(CheckResult::new(
            "Storage backend",
            CheckStatus::Fail,
            e.to_string(),
            start,
        )),
    }

    render(&results, use_color, out)
}

fn render(results: &[CheckResult], use_color: bool, out: &mut dyn Write) -> Result<(), DragonError> {
    writeln!(out)?;
    writeln!(out, "  dragon doctor")?;
    writeln!(out, "  {}", "-".repeat(50))?;

    let mut issues = 0;
    for result in results {
        let duration_ms = result.duration.as_millis();
        let (tag, message) = match (result.status, use_color) {
            (CheckStatus::Pass, true) => ("✓".green().to_string(), result.message.clone()),
            (CheckStatus::Warn, true) => ("!".yellow().to_string(), result.message.yellow().to_string()),
            (CheckStatus::Fail, true) => ("✗".red().to_string(), result.message.red().to_string()),
            (CheckStatus::Pass, false) => ("[OK]  ".to_string(), result.message.clone()),
            (CheckStatus::Warn, false) => ("[WARN]".to_string(), result.message.clone()),
            (CheckStatus::Fail, false) => ("[FAIL]".to_string(), result.message.clone()),
        };
        if result.status != CheckStatus::Pass {
            issues += 1;
        }
        writeln!(
            out,
            "    {tag} {:<20} {message} ({duration_ms}ms)",
            result.name
        )?;
    }

    writeln!(out)?;
    match issues {
        0 => writeln!(out, "  All checks passed.")?,
        1 => writeln!(out, "  1 issue found.")?,
        n => writeln!(out, "  {n} issues found.")?,
    }
    writeln!(out)?;
    Ok(())
}

/// Check configuration loads without errors.
fn check_config(path: Option<&Path>) -> CheckResult {
    let start = Instant::now();
    let loaded = match path {
        Some(path) => dragon_config::load_and_validate_path(path),
        None => dragon_config::load_and_validate(),
    };
    match loaded {
        Ok(_) => CheckResult::new("Configuration", CheckStatus::Pass, "valid", start),
        Err(errors) => CheckResult::new(
            "Configuration",
            CheckStatus::Fail,
            format!("{} error(s)", errors.len()),
            start,
        ),
    }
}

/// Report which backend was selected and whether that matches the preference.
fn check_backend(config: &DragonConfig, kind: BackendKind, start: Instant) -> CheckResult {
    let storage = &config.storage;
    let wanted_relational = match storage.backend {
        BackendPreference::Local => false,
        BackendPreference::Relational => true,
        BackendPreference::Auto => cfg!(feature = "sqlite"),
    };

    match kind {
        BackendKind::Relational => CheckResult::new(
            "Storage backend",
            CheckStatus::Pass,
            format!("relational ({})", storage.database_path),
            start,
        ),
        BackendKind::Local if wanted_relational => CheckResult::new(
            "Storage backend",
            CheckStatus::Warn,
            format!("fell back to local ({}), see logs", storage.kv_dir),
            start,
        ),
        BackendKind::Local => CheckResult::new(
            "Storage backend",
            CheckStatus::Pass,
            format!("local ({})", storage.kv_dir),
            start,
        ),
    }
}

/// Check the profile list decodes and the current pointer names a saved profile.
async fn check_profiles(backend: &dyn StorageBackend) -> CheckResult {
    let start = Instant::now();
    let profiles = match backend.profiles_load().await {
        Ok(profiles) => profiles,
        Err(e) => return CheckResult::new("Profiles", CheckStatus::Fail, e.to_string(), start),
    };
    let current = match backend.profiles_get_current().await {
        Ok(current) => current,
        Err(e) => return CheckResult::new("Profiles", CheckStatus::Fail, e.to_string(), start),
    };

    match current {
        None => CheckResult::new(
            "Profiles",
            CheckStatus::Pass,
            format!("{} saved, none current", profiles.len()),
            start,
        ),
        Some(id) => match profiles.iter().find(|p| p.id == id) {
            Some(p) => CheckResult::new(
                "Profiles",
                CheckStatus::Pass,
                format!("{} saved, current: {}", profiles.len(), p.name),
                start,
            ),
            None => CheckResult::new(
                "Profiles",
                CheckStatus::Warn,
                format!("current profile {id} is not in the saved list"),
                start,
            ),
        },
    }
}

/// Run SQLite's integrity check on an existing database file.
#[cfg(feature = "sqlite")]
async fn check_db_integrity(db_path: &str) -> CheckResult {
    let start = Instant::now();
    if !Path::new(db_path).exists() {
        return CheckResult::new(
            "DB integrity",
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first run)"),
            start,
        );
    }

    let db = match dragon_storage::Database::open(db_path, false).await {
        Ok(db) => db,
        Err(e) => return CheckResult::new("DB integrity", CheckStatus::Fail, e.to_string(), start),
    };
    match db.integrity_check().await {
        Ok(problems) if problems.is_empty() => {
            CheckResult::new("DB integrity", CheckStatus::Pass, "ok", start)
        }
        Ok(problems) => CheckResult::new(
            "DB integrity",
            CheckStatus::Fail,
            format!("{} problem(s): {}", problems.len(), problems[0]),
            start,
        ),
        Err(e) => CheckResult::new("DB integrity", CheckStatus::Fail, e.to_string(), start),
    }
}

use anyhow::{Context, Result, bail};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tatrisk_core::exclusion::DEFAULT_FOREVER_KEYWORDS;
use tatrisk_core::policy::{
    MAX_CAPACITY_HOURS, TAT_IR_DAYS, TAT_SR_DAYS, TAT_WARNING_THRESHOLD, WARNING_CAPACITY_HOURS,
};
use tatrisk_core::{CapacityPolicy, EnginePolicy, ForeverTickets, TatPolicy, team};

use crate::state::{ensure_tatrisk_home, tatrisk_home};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tat_thresholds: TatSection,
    pub sprint_capacity: CapacitySection,
    pub forever_tickets: ForeverSection,
    pub team_members: TeamSection,
    pub display: DisplaySection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TatSection {
    pub ir_days: f64,
    pub sr_days: f64,
    /// Percent of the limit, e.g. 75.
    pub warning_percent: f64,
}

impl Default for TatSection {
    fn default() -> Self {
        Self {
            ir_days: TAT_IR_DAYS,
            sr_days: TAT_SR_DAYS,
            warning_percent: TAT_WARNING_THRESHOLD * 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacitySection {
    pub max_hours: f64,
    pub warning_hours: f64,
}

impl Default for CapacitySection {
    fn default() -> Self {
        Self {
            max_hours: MAX_CAPACITY_HOURS,
            warning_hours: WARNING_CAPACITY_HOURS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForeverSection {
    pub keywords: Vec<String>,
}

impl Default for ForeverSection {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_FOREVER_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamSection {
    /// Account names; empty disables team filtering.
    pub valid_team_members: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySection {
    /// IANA zone for audit stamps and naive extract timestamps.
    pub timezone: String,
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            timezone: "America/Chicago".to_string(),
        }
    }
}

impl Config {
    pub fn timezone(&self) -> Result<Tz> {
        self.display
            .timezone
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid timezone: {}", self.display.timezone))
    }

    /// Reject values that would make percentages meaningless.
    pub fn validate(&self) -> Result<()> {
        let tat = &self.tat_thresholds;
        let cap = &self.sprint_capacity;
        for (name, v) in [
            ("tat_thresholds.ir_days", tat.ir_days),
            ("tat_thresholds.sr_days", tat.sr_days),
            ("sprint_capacity.max_hours", cap.max_hours),
        ] {
            if !(v.is_finite() && v > 0.0) {
                bail!("{name} must be a positive number, got {v}");
            }
        }
        if !(tat.warning_percent > 0.0 && tat.warning_percent <= 100.0) {
            bail!(
                "tat_thresholds.warning_percent must be in (0, 100], got {}",
                tat.warning_percent
            );
        }
        if !(cap.warning_hours >= 0.0 && cap.warning_hours <= cap.max_hours) {
            bail!(
                "sprint_capacity.warning_hours must be between 0 and max_hours ({}), got {}",
                cap.max_hours,
                cap.warning_hours
            );
        }
        Ok(())
    }

    pub fn policy(&self) -> Result<EnginePolicy> {
        self.validate()?;
        Ok(EnginePolicy {
            tat: TatPolicy {
                ir_days: self.tat_thresholds.ir_days,
                sr_days: self.tat_thresholds.sr_days,
                warning_threshold: self.tat_thresholds.warning_percent / 100.0,
            },
            capacity: CapacityPolicy {
                max_hours: self.sprint_capacity.max_hours,
                warning_hours: self.sprint_capacity.warning_hours,
            },
            forever: ForeverTickets::new(self.forever_tickets.keywords.iter().cloned()),
            timezone: self.timezone()?,
        })
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(tatrisk_home()?.join("config.toml"))
}

fn resolve(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(p.to_path_buf()),
        None => config_path(),
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let p = resolve(path)?;
    if !p.exists() {
        tracing::debug!(path = %p.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<PathBuf> {
    let p = match path {
        Some(p) => p.to_path_buf(),
        None => ensure_tatrisk_home()?.join("config.toml"),
    };
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    // The roster is cached from this file.
    team::invalidate();
    Ok(p)
}

pub fn init_config(path: Option<&Path>) -> Result<()> {
    let p = resolve(path)?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    let written = save_config(&Config::default(), path)?;
    println!("Wrote {}", written.display());
    Ok(())
}

/// Valid team members, read from the config file once per process.
pub fn team_roster(path: Option<&Path>) -> Arc<Vec<String>> {
    team::load_with(|| {
        let cfg = load_config(path)?;
        Ok(cfg.team_members.valid_team_members)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
[tat_thresholds]
sr_days = 30

[team_members]
valid_team_members = ["ana", "ben"]
"#,
        )
        .unwrap();

        let p = cfg.policy().unwrap();
        assert_eq!(p.tat.sr_days, 30.0);
        assert_eq!(p.tat.ir_days, 0.8);
        assert_eq!(p.tat.warning_threshold, 0.75);
        assert_eq!(p.capacity.max_hours, 52.0);
        assert_eq!(p.forever.keywords().len(), 2);
        assert_eq!(p.timezone, chrono_tz::America::Chicago);
        assert_eq!(cfg.team_members.valid_team_members, vec!["ana", "ben"]);
    }

    #[test]
    fn bad_timezone_is_an_error() {
        let cfg: Config = toml::from_str("[display]\ntimezone = \"Mars/Olympus\"\n").unwrap();
        assert!(cfg.policy().is_err());
    }

    #[test]
    fn degenerate_limits_are_rejected() {
        for (toml_src, field) in [
            ("[tat_thresholds]\nir_days = 0\n", "ir_days"),
            ("[tat_thresholds]\nsr_days = -3\n", "sr_days"),
            ("[tat_thresholds]\nwarning_percent = 0\n", "warning_percent"),
            ("[tat_thresholds]\nwarning_percent = 150\n", "warning_percent"),
            ("[sprint_capacity]\nmax_hours = 0\n", "max_hours"),
            ("[sprint_capacity]\nwarning_hours = 60\n", "warning_hours"),
            ("[sprint_capacity]\nmax_hours = nan\n", "max_hours"),
        ] {
            let cfg: Config = toml::from_str(toml_src).unwrap();
            let err = cfg.policy().unwrap_err().to_string();
            assert!(err.contains(field), "{toml_src}: {err}");
        }
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let s = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&s).unwrap();
        assert_eq!(back.forever_tickets.keywords, ForeverSection::default().keywords);
        assert_eq!(back.sprint_capacity.warning_hours, 45.0);
    }
}

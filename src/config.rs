// Report profile: the header values a user normally keeps between runs.
//
// Stored as JSON (`report_profile.json` by default). Every field is
// optional in the file; command-line flags override whatever it holds.
use crate::sections::default_endpoints;
use crate::types::ReportHeader;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_PROFILE_PATH: &str = "report_profile.json";
pub const DEFAULT_ONE_WAY_FEE: f64 = 2680.0;
pub const DEFAULT_MONTHLY_ALLOWANCE: f64 = 112560.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub organization: String,
    pub position: String,
    pub name: String,
    pub from_section: String,
    pub to_section: String,
    pub one_way_fee: f64,
    /// Monthly amount approved for the commute; only used for the
    /// expected-trip estimate.
    pub monthly_allowance: f64,
}

impl Default for Profile {
    fn default() -> Self {
        let (from_section, to_section) = default_endpoints();
        Profile {
            organization: String::new(),
            position: String::new(),
            name: String::new(),
            from_section,
            to_section,
            one_way_fee: DEFAULT_ONE_WAY_FEE,
            monthly_allowance: DEFAULT_MONTHLY_ALLOWANCE,
        }
    }
}

/// Header overrides from the command line.
#[derive(Debug, Clone, Default)]
pub struct HeaderOverrides {
    pub organization: Option<String>,
    pub position: Option<String>,
    pub name: Option<String>,
    pub from_section: Option<String>,
    pub to_section: Option<String>,
    pub one_way_fee: Option<f64>,
    pub monthly_allowance: Option<f64>,
}

impl Profile {
    /// Load `path` if given, else the default profile file when it exists,
    /// else built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p,
            None => {
                let default = Path::new(DEFAULT_PROFILE_PATH);
                if !default.exists() {
                    return Ok(Profile::default());
                }
                default
            }
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading profile {}", path.display()))?;
        let profile: Profile = serde_json::from_str(&text)
            .with_context(|| format!("parsing profile {}", path.display()))?;
        log::info!("Loaded report profile from {}", path.display());
        Ok(profile)
    }

    pub fn apply(&mut self, o: HeaderOverrides) {
        if let Some(v) = o.organization {
            self.organization = v;
        }
        if let Some(v) = o.position {
            self.position = v;
        }
        if let Some(v) = o.name {
            self.name = v;
        }
        if let Some(v) = o.from_section {
            self.from_section = v;
        }
        if let Some(v) = o.to_section {
            self.to_section = v;
        }
        if let Some(v) = o.one_way_fee {
            self.one_way_fee = v;
        }
        if let Some(v) = o.monthly_allowance {
            self.monthly_allowance = v;
        }
    }

    pub fn header(&self) -> ReportHeader {
        ReportHeader {
            organization: self.organization.clone(),
            position: self.position.clone(),
            name: self.name.clone(),
            from_section: self.from_section.clone(),
            to_section: self.to_section.clone(),
            one_way_fee: self.one_way_fee,
        }
    }
}

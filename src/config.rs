// src/config.rs
//
// Run configuration and credential sourcing. Values resolve in order:
// command line, then the optional YAML file, then the built-in portal
// defaults; the report year falls back to an interactive prompt.

use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Environment variable holding the portal username.
pub const USERNAME_VAR: &str = "ICLUB_USERNAME";
/// Environment variable holding the portal password.
pub const PASSWORD_VAR: &str = "ICLUB_PASSWORD";

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Portal root every endpoint path is joined onto.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Club identifier sent with every report request.
    #[serde(default = "default_club")]
    pub club: String,
    /// Where the flattened CSV lands.
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_base_url() -> String {
    "https://www.myiclub.com/".to_string()
}

fn default_club() -> String {
    "10175".to_string()
}

fn default_output() -> PathBuf {
    PathBuf::from("data_test.csv")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            club: default_club(),
            output: default_output(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("opening config file {}", path.display()))?;
        serde_yaml::from_reader(file)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    /// The base URL parsed for joining endpoint paths.
    pub fn portal_url(&self) -> Result<Url> {
        Url::parse(&self.base_url).with_context(|| format!("parsing base URL {}", self.base_url))
    }
}

/// Login credentials for the portal session.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Where login credentials come from. Lets a run swap the interactive
/// prompt for the environment without touching the scrape flow.
pub trait CredentialSource {
    fn credentials(&self) -> Result<Credentials>;
}

/// Reads `ICLUB_USERNAME` / `ICLUB_PASSWORD`.
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn credentials(&self) -> Result<Credentials> {
        let username =
            env::var(USERNAME_VAR).with_context(|| format!("reading {USERNAME_VAR}"))?;
        let password =
            env::var(PASSWORD_VAR).with_context(|| format!("reading {PASSWORD_VAR}"))?;
        Ok(Credentials { username, password })
    }
}

/// Asks for the username and password on stdin.
pub struct PromptCredentials;

impl CredentialSource for PromptCredentials {
    fn credentials(&self) -> Result<Credentials> {
        Ok(Credentials {
            username: prompt_line("ICLUB username: ")?,
            password: prompt_line("ICLUB password: ")?,
        })
    }
}

/// Pick the credential source for this run: the environment when both
/// variables are present, the interactive prompt otherwise.
pub fn credential_source() -> Box<dyn CredentialSource> {
    if env::var(USERNAME_VAR).is_ok() && env::var(PASSWORD_VAR).is_ok() {
        Box::new(EnvCredentials)
    } else {
        Box::new(PromptCredentials)
    }
}

/// Ask for the report year when it was not supplied on the command line.
pub fn prompt_year() -> Result<i32> {
    let line = prompt_line("Enter the report year: ")?;
    line.parse()
        .with_context(|| format!("invalid report year {line:?}"))
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush().context("flushing prompt")?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("reading from stdin")?;
    Ok(line.trim().to_string())
}

use cheddar_maze::{
    error::SessionError,
    session::WalletSession,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub account_id: String,
}

#[derive(Clone, Debug)]
pub struct ProfileDescriptor {
    pub name: String,
    pub path: PathBuf,
}

impl ProfileDescriptor {
    pub fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }

    pub fn load(&self) -> Result<Profile> {
        let raw = fs::read(&self.path)
            .wrap_err_with(|| format!("Failed to read profile '{}'", self.name))?;
        serde_json::from_slice(&raw)
            .wrap_err_with(|| format!("Profile '{}' is not valid JSON", self.name))
    }
}

pub fn default_profiles_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").wrap_err("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".cheddar").join("profiles"))
}

pub fn resolve_profiles_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir {
        Some(raw) => {
            let expanded = shellexpand::tilde(raw);
            Ok(PathBuf::from(expanded.into_owned()))
        }
        None => default_profiles_dir(),
    }
}

pub fn list_profiles(dir: &Path) -> Result<Vec<ProfileDescriptor>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut profiles = Vec::new();
    for entry in fs::read_dir(dir).wrap_err("Failed to read profile directory")? {
        let entry = entry.wrap_err("Failed to read profile entry")?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| eyre!("Invalid profile filename {:?}", path))?
            .to_owned();
        profiles.push(ProfileDescriptor::new(name, path));
    }
    profiles.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(profiles)
}

/// Loads every readable profile, skipping the broken ones with a warning.
pub fn load_accounts(dir: &Path) -> Result<Vec<String>> {
    let mut accounts = Vec::new();
    for descriptor in list_profiles(dir)? {
        match descriptor.load() {
            Ok(profile) => accounts.push(profile.account_id),
            Err(err) => tracing::warn!(profile = %descriptor.name, ?err, "skipping profile"),
        }
    }
    Ok(accounts)
}

/// Wallet session backed by local account profiles. Asking for the login
/// prompt only raises a flag; the UI answers it with a profile picker.
#[derive(Debug, Default)]
pub struct ProfileSession {
    accounts: Vec<String>,
    current: Option<String>,
    prompt_requested: bool,
}

impl ProfileSession {
    pub fn new(accounts: Vec<String>, preselected: Option<String>) -> Self {
        Self {
            accounts,
            current: preselected,
            prompt_requested: false,
        }
    }

    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    pub fn sign_in(&mut self, account_id: impl Into<String>) {
        let account_id = account_id.into();
        tracing::info!(%account_id, "signed in");
        self.current = Some(account_id);
        self.prompt_requested = false;
    }

    pub fn sign_in_index(&mut self, index: usize) -> Option<&str> {
        let account_id = self.accounts.get(index)?.clone();
        self.sign_in(account_id);
        self.current.as_deref()
    }

    pub fn take_prompt_request(&mut self) -> bool {
        std::mem::take(&mut self.prompt_requested)
    }
}

impl WalletSession for ProfileSession {
    fn account_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    fn is_signed_in(&self) -> bool {
        self.current.is_some()
    }

    fn show_login_prompt(&mut self) {
        self.prompt_requested = true;
    }

    async fn sign_out(&mut self) -> Result<(), SessionError> {
        self.current.take().ok_or(SessionError::NotSignedIn)?;
        Ok(())
    }
}

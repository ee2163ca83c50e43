//! services/client/src/adapters/storage.rs
//!
//! This module contains the on-disk credential store, the concrete
//! implementation of the `CredentialStore` port from the `core` crate.
//! Each slot is its own file so a partial write before a crash leaves the
//! other slots individually interpretable.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use telehealth_core::domain::{Credential, Profile};
use telehealth_core::ports::CredentialStore;
use tracing::warn;

const ACCESS_TOKEN_FILE: &str = "access_token";
const REFRESH_TOKEN_FILE: &str = "refresh_token";
const PROFILE_FILE: &str = "profile.json";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A file-backed credential store with an in-memory cache.
///
/// All three slots are loaded once at construction, so the trait's reads
/// are synchronous and never touch the disk; mutations write through.
pub struct FileCredentialStore {
    dir: PathBuf,
    cache: Mutex<Slots>,
}

#[derive(Default)]
struct Slots {
    access: Option<String>,
    refresh: Option<String>,
    profile: Option<Profile>,
}

impl FileCredentialStore {
    /// Opens (creating if needed) the storage directory and loads whatever
    /// slots survived the last process.
    pub fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let access = load_token(&dir, ACCESS_TOKEN_FILE);
        let refresh = load_token(&dir, REFRESH_TOKEN_FILE);
        let profile = load_profile(&dir);

        Ok(Self {
            dir,
            cache: Mutex::new(Slots {
                access,
                refresh,
                profile,
            }),
        })
    }

    fn write_slot(&self, name: &str, contents: &str) {
        if let Err(e) = fs::write(self.dir.join(name), contents) {
            warn!("Failed to persist credential slot {name}: {e}");
        }
    }

    fn remove_slot(&self, name: &str) {
        let path = self.dir.join(name);
        if path.exists() {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove credential slot {name}: {e}");
            }
        }
    }
}

/// Reads a token slot. Empty or whitespace-only contents count as absent,
/// upholding the "tokens are never empty strings" invariant.
fn load_token(dir: &PathBuf, name: &str) -> Option<String> {
    let contents = fs::read_to_string(dir.join(name)).ok()?;
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn load_profile(dir: &PathBuf) -> Option<Profile> {
    let contents = fs::read_to_string(dir.join(PROFILE_FILE)).ok()?;
    match serde_json::from_str(&contents) {
        Ok(profile) => Some(profile),
        Err(e) => {
            warn!("Ignoring unreadable persisted profile: {e}");
            None
        }
    }
}

//=========================================================================================
// `CredentialStore` Trait Implementation
//=========================================================================================

impl CredentialStore for FileCredentialStore {
    fn access_token(&self) -> Option<String> {
        self.cache.lock().unwrap().access.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.cache.lock().unwrap().refresh.clone()
    }

    fn profile(&self) -> Option<Profile> {
        self.cache.lock().unwrap().profile.clone()
    }

    fn store(&self, credential: &Credential) {
        let mut cache = self.cache.lock().unwrap();
        cache.access = Some(credential.access_token.clone());
        cache.refresh = Some(credential.refresh_token.clone());
        cache.profile = Some(credential.user.clone());

        self.write_slot(ACCESS_TOKEN_FILE, &credential.access_token);
        self.write_slot(REFRESH_TOKEN_FILE, &credential.refresh_token);
        match serde_json::to_string(&credential.user) {
            Ok(json) => self.write_slot(PROFILE_FILE, &json),
            Err(e) => warn!("Failed to serialize profile for persistence: {e}"),
        }
    }

    fn replace_access_token(&self, access_token: &str) {
        self.cache.lock().unwrap().access = Some(access_token.to_string());
        self.write_slot(ACCESS_TOKEN_FILE, access_token);
    }

    fn clear(&self) {
        let mut cache = self.cache.lock().unwrap();
        cache.access = None;
        cache.refresh = None;
        cache.profile = None;

        self.remove_slot(ACCESS_TOKEN_FILE);
        self.remove_slot(REFRESH_TOKEN_FILE);
        self.remove_slot(PROFILE_FILE);
    }
}

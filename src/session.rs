use std::fs;
use std::path::PathBuf;

use tracing::info;

use crate::error::SyncError;
use crate::models::Session;

/// File-backed credential store: the bearer token and subject id survive
/// restarts, an absent file means signed out. There is exactly one clear
/// path; auth failures anywhere in the engine funnel into [`clear`].
///
/// [`clear`]: SessionStore::clear
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SessionStore { path: path.into() }
    }

    pub fn load(&self) -> Result<Option<Session>, SyncError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn save(&self, session: &Session) -> Result<(), SyncError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string(session)?)?;
        info!(subject_id = session.subject_id, "Saved session");
        Ok(())
    }

    /// Signs out. Idempotent: clearing an absent session is not an error.
    pub fn clear(&self) -> Result<(), SyncError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Cleared session");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

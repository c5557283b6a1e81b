use service::import::StudentImporter;
use service::roster::RosterStore;

/// Shared handler state. The roster owns the one backend handle opened at
/// startup.
#[derive(Clone)]
pub struct AppState {
    pub roster: RosterStore,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(roster: RosterStore, max_upload_bytes: usize) -> Self {
        Self { roster, max_upload_bytes }
    }

    pub fn importer(&self) -> StudentImporter {
        StudentImporter::new(self.roster.clone())
    }
}

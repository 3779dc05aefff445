use std::sync::Arc;

use crate::config::Config;
use crate::email::Mailer;
use crate::stores::blob::BlobStore;
use crate::stores::identity::IdentityProvider;
use crate::stores::record::RecordStore;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub records: Arc<dyn RecordStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub mailer: Option<Arc<dyn Mailer>>,
    pub config: Config,
}

use tokio::sync::Mutex;

use crate::auth::MongoAuthGateway;
use crate::config::Config;
use crate::controller::TaskListController;
use crate::session::{FileCredentialStore, SessionGate};
use crate::store::MongoTaskStore;

pub struct AppState {
    /// The one task list for the signed-in session. The mutex doubles as
    /// the per-controller request queue: overlapping mutations from the
    /// client are serialized instead of racing on the final list.
    pub controller: Mutex<TaskListController<MongoTaskStore>>,
    pub session: SessionGate<MongoAuthGateway, FileCredentialStore>,
    pub config: Config,
}

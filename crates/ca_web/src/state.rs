use ca_service::SyncService;

pub struct AppState {
    pub service: SyncService,
}

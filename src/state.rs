use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

use crate::config::Config;
use crate::db::Store;
use crate::domain::events::AuditEvent;
use crate::services::{
    AuditService, AuthService, LoginApprovalService, SeaOrmAuthService, TokenIssuer,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub tokens: Arc<TokenIssuer>,

    pub approvals: Arc<LoginApprovalService>,

    pub audit_service: Arc<AuditService>,

    pub event_bus: broadcast::Sender<AuditEvent>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let (event_bus, _) = broadcast::channel(config.general.event_bus_buffer_size);

        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let tokens = Arc::new(TokenIssuer::new(
            store.clone(),
            &config.auth,
            event_bus.clone(),
        ));

        let approvals = Arc::new(LoginApprovalService::new(
            store.clone(),
            tokens.clone(),
            &config.auth,
            event_bus.clone(),
        ));

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            tokens.clone(),
            approvals.clone(),
            config.security.clone(),
            event_bus.clone(),
        )) as Arc<dyn AuthService>;

        let audit_service = Arc::new(AuditService::new(store.clone(), event_bus.clone()));
        audit_service.clone().start_listener();

        let config = Arc::new(RwLock::new(config));

        Ok(Self {
            config,
            store,
            auth_service,
            tokens,
            approvals,
            audit_service,
            event_bus,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}

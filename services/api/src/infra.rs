use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use claim_resolution::clock::{Clock, SystemClock};
use claim_resolution::config::AppConfig;
use claim_resolution::error::AppError;
use claim_resolution::llm::OpenAiCompatibleClient;
use claim_resolution::store::SqliteStore;
use claim_resolution::workflows::analysis::ClaimAnalysisService;
use claim_resolution::workflows::escalation::notify::{HttpEmailSender, LogEmailSender};
use claim_resolution::workflows::escalation::storage::{HttpBlobFetcher, SignedUrlStorage};
use claim_resolution::workflows::escalation::{
    ArtifactAssembler, EmailSender, EscalationSettings, LegalEscalationService,
    NotificationDispatcher,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) store: Arc<SqliteStore>,
}

/// Services wired from configuration, sharing one store and one notification dispatcher.
pub(crate) struct Engine {
    pub(crate) store: Arc<SqliteStore>,
    pub(crate) analysis: Arc<ClaimAnalysisService<SqliteStore>>,
    pub(crate) escalation: Arc<LegalEscalationService<SqliteStore>>,
    pub(crate) notifier: Arc<NotificationDispatcher>,
}

impl Engine {
    pub(crate) fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let store = Arc::new(SqliteStore::open(&config.database.path)?);
        Self::with_store(config, store)
    }

    pub(crate) fn with_store(config: &AppConfig, store: Arc<SqliteStore>) -> Result<Self, AppError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        if config.llm.api_key.is_none() {
            warn!("LLM_API_KEY is not set; analysis endpoints will fail until it is configured");
        }
        let model = Arc::new(OpenAiCompatibleClient::new(&config.llm)?);

        let timeout = config.escalation.notification_timeout;
        let sender: Arc<dyn EmailSender> = match HttpEmailSender::from_config(&config.email, timeout)? {
            Some(sender) => Arc::new(sender),
            None => {
                info!("no email provider configured; notifications will be logged only");
                Arc::new(LogEmailSender)
            }
        };
        let notifier = Arc::new(NotificationDispatcher::new(
            sender,
            store.clone(),
            clock.clone(),
            timeout,
        ));

        let assembler = Arc::new(ArtifactAssembler::new(
            Arc::new(SignedUrlStorage::new(&config.storage, clock.clone())),
            Arc::new(HttpBlobFetcher::new(config.storage.fetch_timeout)?),
            config.storage.url_ttl,
        ));

        let analysis = Arc::new(ClaimAnalysisService::new(store.clone(), model, clock.clone()));
        let escalation = Arc::new(LegalEscalationService::new(
            store.clone(),
            assembler,
            notifier.clone(),
            clock,
            EscalationSettings::from(&config.escalation),
        ));

        Ok(Self {
            store,
            analysis,
            escalation,
            notifier,
        })
    }
}

//! Application state shared across handlers.
//!
//! Everything a handler needs is built once at startup and injected here:
//! repositories, the order feed, and the services wrapping external APIs.
//! Integrations that are not configured are simply absent; the endpoints
//! depending on them answer 503 or fall back.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::Repositories;
use crate::realtime::OrderFeed;
use crate::services::ai::{AiError, AiModel, GeminiClient};
use crate::services::email::EmailError;
use crate::services::fcm::{FcmClient, FcmError, PushMessenger};
use crate::services::maps::MapsError;
use crate::services::{
    AiService, AnalyticsService, EmailService, MapsClient, NotificationService, OrderService,
};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("push messaging: {0}")]
    Messaging(#[from] FcmError),
    #[error("AI model: {0}")]
    Ai(#[from] AiError),
    #[error("maps: {0}")]
    Maps(#[from] MapsError),
    #[error("email: {0}")]
    Email(#[from] EmailError),
}

/// External clients, each optional.
#[derive(Clone, Default)]
pub struct Integrations {
    pub messenger: Option<Arc<dyn PushMessenger>>,
    pub ai_model: Option<Arc<dyn AiModel>>,
    pub maps: Option<MapsClient>,
}

impl Integrations {
    /// Build the clients the configuration enables.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if a configured client cannot be created
    /// (e.g. an unparseable service account key).
    pub fn from_config(config: &AppConfig) -> Result<Self, StateError> {
        let messenger = match &config.firebase {
            Some(firebase) => Some(Arc::new(FcmClient::new(firebase)?) as Arc<dyn PushMessenger>),
            None => None,
        };
        let ai_model = match &config.gemini {
            Some(gemini) => Some(Arc::new(GeminiClient::new(gemini)?) as Arc<dyn AiModel>),
            None => None,
        };
        let maps = config.maps.as_ref().map(MapsClient::new).transpose()?;

        Ok(Self {
            messenger,
            ai_model,
            maps,
        })
    }
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    repositories: Repositories,
    orders: OrderService,
    notifications: NotificationService,
    ai: AiService,
    email: EmailService,
    maps: Option<MapsClient>,
    analytics: AnalyticsService,
}

impl AppState {
    /// Create the state with clients built from `config`.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if a configured integration cannot be created.
    pub fn new(config: AppConfig, repositories: Repositories) -> Result<Self, StateError> {
        let integrations = Integrations::from_config(&config)?;
        Self::with_integrations(config, repositories, integrations)
    }

    /// Create the state with explicitly provided clients.
    ///
    /// # Errors
    ///
    /// Returns `StateError::Email` if the SMTP relay cannot be configured.
    pub fn with_integrations(
        config: AppConfig,
        repositories: Repositories,
        integrations: Integrations,
    ) -> Result<Self, StateError> {
        let feed = OrderFeed::new(Arc::clone(&repositories.orders));
        let orders = OrderService::new(Arc::clone(&repositories.orders), feed);
        let notifications = NotificationService::new(
            integrations.messenger,
            Arc::clone(&repositories.tokens),
            Arc::clone(&repositories.restaurants),
            Arc::clone(&repositories.orders),
            config.site_url.clone(),
        );
        let ai = AiService::new(integrations.ai_model);
        let email = EmailService::new(&config.email, config.environment)?;
        let analytics = AnalyticsService::new(Arc::clone(&repositories.analytics));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                repositories,
                orders,
                notifications,
                ai,
                email,
                maps: integrations.maps,
                analytics,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn repositories(&self) -> &Repositories {
        &self.inner.repositories
    }

    /// Order writes; also owns the live order feed.
    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn feed(&self) -> &OrderFeed {
        self.inner.orders.feed()
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationService {
        &self.inner.notifications
    }

    #[must_use]
    pub fn ai(&self) -> &AiService {
        &self.inner.ai
    }

    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }

    /// The geocoding client, if `GOOGLE_MAPS_API_KEY` is set.
    #[must_use]
    pub fn maps(&self) -> Option<&MapsClient> {
        self.inner.maps.as_ref()
    }

    #[must_use]
    pub fn analytics(&self) -> &AnalyticsService {
        &self.inner.analytics
    }
}

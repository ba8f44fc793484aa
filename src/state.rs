use std::sync::Arc;

use anyhow::Context;
use tracing::warn;

use crate::catalog::CatalogStore;
use crate::chat::{ChatRelay, ConversationLog, SqlConversationLog};
use crate::config::{Config, TARGET_LANGUAGES};
use crate::i18n::TextDictionaries;
use crate::images::ImageReconciler;
use crate::listings::ListingService;
use crate::mail::MailRelay;
use crate::translation::{GeminiClient, LanguageService, Translator};

/// Everything request handlers share
pub struct AppState {
    pub catalog: Arc<CatalogStore>,
    pub dictionaries: Arc<TextDictionaries>,
    pub listings: ListingService,
    pub chat: ChatRelay,
    pub mail: MailRelay,
}

impl AppState {
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let service: Option<Arc<dyn LanguageService>> = match &config.gemini_api_key {
            Some(key) => Some(Arc::new(GeminiClient::new(key, &config.gemini_model)?)),
            None => {
                warn!("GEMINI_API_KEY not set, chatbot and translations will use fallbacks");
                None
            }
        };

        let log: Arc<dyn ConversationLog> = Arc::new(
            SqlConversationLog::connect(&config.database_url)
                .await
                .context("Failed to open conversation database")?,
        );

        Ok(Self::assemble(
            Arc::new(CatalogStore::open(config.catalog_path()).await),
            Arc::new(TextDictionaries::new(config.i18n_dir())),
            ImageReconciler::new(&config.static_dir),
            service,
            log,
            MailRelay::from_credentials(config.mail.as_ref()),
        ))
    }

    pub fn assemble(
        catalog: Arc<CatalogStore>,
        dictionaries: Arc<TextDictionaries>,
        images: ImageReconciler,
        service: Option<Arc<dyn LanguageService>>,
        log: Arc<dyn ConversationLog>,
        mail: MailRelay,
    ) -> Self {
        let listings = ListingService::new(
            catalog.clone(),
            dictionaries.clone(),
            images,
            Translator::new(service.clone()),
            TARGET_LANGUAGES.iter().map(|l| l.to_string()).collect(),
        );
        let chat = ChatRelay::new(catalog.clone(), service, log);

        Self {
            catalog,
            dictionaries,
            listings,
            chat,
            mail,
        }
    }
}

pub mod log;

pub use log::{ConversationLog, SqlConversationLog};

use std::fmt::Write;
use std::sync::Arc;

use chrono::Local;
use tracing::{error, warn};

use crate::catalog::{query::format_price, CatalogStore};
use crate::error::{AppError, Result};
use crate::models::{Conversation, Property};
use crate::translation::LanguageService;

pub const UNAVAILABLE_REPLY: &str = "Συγγνώμη, ο βοηθός δεν είναι διαθέσιμος αυτή τη στιγμή.";
pub const FALLBACK_REPLY: &str = "Sorry, I am unable to respond right now.";

const COMPANY_CONTACT: &str = "\nCompany Contact Info:\n\
Phone: +30 694 619 3307\n\
Email: info@grouprealestate.gr\n\
Address: El. Venizelou 40, Nea Vrasna, 57021\n";

/// Answers visitor questions from the catalog and logs every exchange.
pub struct ChatRelay {
    catalog: Arc<CatalogStore>,
    service: Option<Arc<dyn LanguageService>>,
    log: Arc<dyn ConversationLog>,
}

impl ChatRelay {
    pub fn new(
        catalog: Arc<CatalogStore>,
        service: Option<Arc<dyn LanguageService>>,
        log: Arc<dyn ConversationLog>,
    ) -> Self {
        Self {
            catalog,
            service,
            log,
        }
    }

    pub async fn ask(&self, message: &str, session_id: Option<String>) -> Result<String> {
        if message.trim().is_empty() {
            return Err(AppError::MissingInput("message".into()));
        }

        let reply = match &self.service {
            None => UNAVAILABLE_REPLY.to_string(),
            Some(service) => {
                let properties = self.catalog.snapshot().await;
                let prompt = build_prompt(&build_context(&properties), message);
                match service.generate(&prompt).await {
                    Ok(text) => text,
                    Err(e) => {
                        error!(error = %e, "Error communicating with language service");
                        FALLBACK_REPLY.to_string()
                    }
                }
            }
        };

        let entry = Conversation {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            user_question: message.to_string(),
            bot_answer: reply.clone(),
            session_id,
        };
        if let Err(e) = self.log.append(&entry).await {
            warn!(error = %e, "Error logging conversation");
        }

        Ok(reply)
    }
}

/// One line per listing plus the office contact block.
pub fn build_context(properties: &[Property]) -> String {
    let mut context = String::from("Here is the available property data:\n");
    for property in properties {
        let price = if property.price > 0 {
            format!("€{}", format_price(property.price))
        } else {
            "On request".to_string()
        };
        let _ = writeln!(
            context,
            "- Property ID: {}, Type: {}, Location: {}, Price: {}",
            property.id, property.property_type, property.location, price
        );
    }
    context.push_str(COMPANY_CONTACT);
    context
}

fn build_prompt(context: &str, message: &str) -> String {
    format!(
        r#"You are a helpful and professional real estate assistant for "Group Real Estate" and your answers must always be in Greek.
Your role is to answer user questions based ONLY on the information provided below.
Be friendly, concise, and act like a real estate expert.
If the user asks for something not in the provided data, politely state that you don't have that information.
Never mention that you are an AI.

--- PROVIDED DATA ---
{context}
--- END OF DATA ---

User Question: "{message}"
"#
    )
}

use std::sync::Arc;

use axum::extract::{Form, State};
use axum::response::Redirect;
use axum::routing::post;
use axum::Router;
use serde::Deserialize;
use tracing::info;

use super::pages::required;
use crate::error::{AppError, Result};
use crate::mail::{inquiry_email, offer_email, PropertyInquiry};
use crate::state::AppState;

const NO_PHONE: &str = "N/A";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/send_message", post(send_message))
        .route("/propose_price", post(propose_price))
}

/// Fields both property forms share, plus whichever one each adds
#[derive(Debug, Deserialize)]
pub struct InquiryForm {
    property_id: Option<String>,
    property_title: Option<String>,
    name: Option<String>,
    email: Option<String>,
    phone_full: Option<String>,
    message: Option<String>,
    proposed_price: Option<String>,
}

impl InquiryForm {
    fn inquiry(&self) -> Result<PropertyInquiry<'_>> {
        Ok(PropertyInquiry {
            property_id: required(&self.property_id, "property_id")?,
            property_title: required(&self.property_title, "property_title")?,
            name: required(&self.name, "name")?,
            email: required(&self.email, "email")?,
            phone: self
                .phone_full
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .unwrap_or(NO_PHONE),
        })
    }
}

/// The page to return to once the mail is out. Unknown listings are
/// rejected before anything is sent.
async fn listing_page(state: &AppState, property_id: &str) -> Result<String> {
    let property = state
        .catalog
        .get(property_id)
        .await
        .ok_or_else(|| AppError::NotFound(property_id.to_string()))?;
    Ok(format!("/property/{}", property.id))
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Form(form): Form<InquiryForm>,
) -> Result<Redirect> {
    let inquiry = form.inquiry()?;
    let message = required(&form.message, "message")?;
    let back = listing_page(&state, inquiry.property_id).await?;

    let sent = state.mail.send(&inquiry_email(&inquiry, message)).await;
    info!(property = inquiry.property_id, sent, "property inquiry handled");
    Ok(Redirect::to(&back))
}

async fn propose_price(
    State(state): State<Arc<AppState>>,
    Form(form): Form<InquiryForm>,
) -> Result<Redirect> {
    let inquiry = form.inquiry()?;
    let price = required(&form.proposed_price, "proposed_price")?;
    let back = listing_page(&state, inquiry.property_id).await?;

    let sent = state.mail.send(&offer_email(&inquiry, price)).await;
    info!(property = inquiry.property_id, sent, "price offer handled");
    Ok(Redirect::to(&back))
}

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::{html_escape, source_texts, text_for, wrap_page};
use crate::catalog::LocationFacets;
use crate::error::{AppError, Result};
use crate::images::UploadedImage;
use crate::listings::form::FEATURE_PREFIX;
use crate::listings::{ListingForm, ListingOutcome};
use crate::models::Property;
use crate::state::AppState;
use crate::translation::LanguageOutcome;

/// Multipart field carrying uploaded pictures
const IMAGES_FIELD: &str = "images";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin", get(new_listing))
        .route("/admin/dashboard", get(dashboard))
        .route("/admin/edit/{id}", get(edit_listing))
        .route("/api/add_property", post(add_property))
        .route("/api/update_property/{id}", post(update_property))
}

/// JSON body returned by both admin write endpoints
#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_id: Option<String>,
    pub translations: Vec<LanguageOutcome>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub feature_translations: Vec<LanguageOutcome>,
}

impl SaveResponse {
    fn new(message: &'static str, new_id: Option<String>, outcome: ListingOutcome) -> Self {
        Self {
            message,
            new_id,
            translations: outcome.translations,
            feature_translations: outcome.feature_translations,
        }
    }
}

async fn add_property(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<SaveResponse>> {
    let form = read_listing_form(multipart).await?;
    let outcome = state.listings.create(form).await?;
    let id = outcome.id.clone();
    Ok(Json(SaveResponse::new(
        "Property added successfully",
        Some(id),
        outcome,
    )))
}

async fn update_property(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<SaveResponse>> {
    let form = read_listing_form(multipart).await?;
    let outcome = state.listings.update(&id, form).await?;
    Ok(Json(SaveResponse::new(
        "Property updated successfully",
        None,
        outcome,
    )))
}

/// Split a multipart submission into text fields and picture uploads.
async fn read_listing_form(mut multipart: Multipart) -> Result<ListingForm> {
    let mut fields = Vec::new();
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == IMAGES_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(bad_multipart)?;
            // Browsers send an empty part when no file was picked.
            if file_name.is_empty() || bytes.is_empty() {
                continue;
            }
            debug!(file = %file_name, bytes = bytes.len(), "received upload");
            uploads.push(UploadedImage {
                file_name,
                bytes: bytes.to_vec(),
            });
        } else {
            let value = field.text().await.map_err(bad_multipart)?;
            fields.push((name, value));
        }
    }

    Ok(ListingForm::from_fields(&fields, uploads))
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::InvalidInput {
        field: "form".into(),
        reason: e.body_text(),
    }
}

async fn new_listing(State(state): State<Arc<AppState>>) -> Html<String> {
    let properties = state.catalog.snapshot().await;
    let texts = source_texts(&state).await;
    let content = format!(
        r#"<h1>Νέο Ακίνητο</h1>
{form}"#,
        form = listing_form(None, &texts)
    );
    Html(wrap_page(
        "Admin",
        &content,
        &LocationFacets::from_properties(&properties),
    ))
}

async fn dashboard(State(state): State<Arc<AppState>>) -> Html<String> {
    let properties = state.catalog.snapshot().await;
    let texts = source_texts(&state).await;

    let rows: String = properties
        .iter()
        .map(|p| {
            format!(
                r#"<tr data-id="{id}"><td>{id}</td><td>{title}</td><td>{location}</td><td>{price}</td><td><a href="/admin/edit/{id}">Επεξεργασία</a></td></tr>"#,
                id = html_escape(&p.id),
                title = html_escape(text_for(&texts, &p.title_key)),
                location = html_escape(&p.location),
                price = p.price,
            )
        })
        .collect();

    let content = format!(
        r#"<h1>Πίνακας Ελέγχου</h1>
<a class="button" href="/admin">Νέο Ακίνητο</a>
<table class="admin-table"><thead><tr><th>ID</th><th>Τίτλος</th><th>Τοποθεσία</th><th>Τιμή</th><th></th></tr></thead>
<tbody>{rows}</tbody></table>"#
    );
    Html(wrap_page(
        "Dashboard",
        &content,
        &LocationFacets::from_properties(&properties),
    ))
}

async fn edit_listing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Html<String>> {
    let properties = state.catalog.snapshot().await;
    let property = properties
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| AppError::NotFound(id.clone()))?;
    let texts = source_texts(&state).await;

    let content = format!(
        r#"<h1>Επεξεργασία: {id}</h1>
{form}"#,
        id = html_escape(&property.id),
        form = listing_form(Some(property), &texts)
    );
    Ok(Html(wrap_page(
        "Edit",
        &content,
        &LocationFacets::from_properties(&properties),
    )))
}

/// The create form when `property` is `None`, otherwise the pre-filled edit form.
fn listing_form(property: Option<&Property>, texts: &Map<String, Value>) -> String {
    let input = |name: &str, value: &str| {
        format!(
            r#"<label>{name}<input name="{name}" value="{}"></label>"#,
            html_escape(value)
        )
    };
    let number = |name: &str, value: String| input(name, &value);
    let optional = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();

    let (action, id_field) = match property {
        Some(p) => (
            format!("/api/update_property/{}", html_escape(&p.id)),
            format!(
                r#"<input type="hidden" name="id" value="{}">"#,
                html_escape(&p.id)
            ),
        ),
        None => ("/api/add_property".to_string(), input("id", "")),
    };

    let text = |key: Option<&String>| {
        key.map(|k| text_for(texts, k).to_string())
            .unwrap_or_default()
    };
    let title = text(property.map(|p| &p.title_key));
    let description = text(property.map(|p| &p.description_key));

    let features: String = texts
        .iter()
        .filter(|(key, _)| key.starts_with(FEATURE_PREFIX))
        .map(|(key, label)| {
            let checked = property
                .map(|p| p.features_keys.contains(key))
                .unwrap_or(false);
            format!(
                r#"<label><input type="checkbox" name="features" value="{}"{}>{}</label>"#,
                html_escape(key),
                if checked { " checked" } else { "" },
                html_escape(label.as_str().unwrap_or(key))
            )
        })
        .collect();

    let images: String = property
        .map(|p| {
            p.images
                .iter()
                .map(|src| {
                    format!(
                        r#"<li class="image-item" data-src="{src}"><img src="{src}" alt=""><input type="hidden" name="existing_images" value="{src}"><input type="radio" name="main_image" value="{src}"{main}></li>"#,
                        src = html_escape(src),
                        main = if *src == p.main_image { " checked" } else { "" },
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    format!(
        r#"<form id="property-form" class="admin-form" method="post" action="{action}" enctype="multipart/form-data">
{id_field}
<label>title<input name="title" value="{title}"></label>
<label>description<textarea name="description">{description}</textarea></label>
{location}{kind}{status}{price}{area}{bedrooms}{bathrooms}{lat}{lon}
<fieldset class="features">{features}</fieldset>
<label>new_feature_key<input name="new_feature_key"></label>
<label>new_feature_label<input name="new_feature_label"></label>
<ul id="image-list" class="sortable">{images}</ul>
<input type="hidden" name="image_order" id="image-order">
<input type="file" name="images" multiple accept="image/*">
<button type="submit">Αποθήκευση</button>
</form>
<script type="module" src="/static/js/admin.js"></script>"#,
        title = html_escape(&title),
        description = html_escape(&description),
        location = input("location", property.map(|p| p.location.as_str()).unwrap_or_default()),
        kind = input("type", property.map(|p| p.property_type.as_str()).unwrap_or_default()),
        status = input("status", property.map(|p| p.status.as_str()).unwrap_or("for_sale")),
        price = number("price", property.map(|p| p.price.to_string()).unwrap_or_default()),
        area = number("area", property.map(|p| p.area.to_string()).unwrap_or_default()),
        bedrooms = number("bedrooms", property.map(|p| p.bedrooms.to_string()).unwrap_or_default()),
        bathrooms = number("bathrooms", property.map(|p| p.bathrooms.to_string()).unwrap_or_default()),
        lat = input("lat", &optional(property.and_then(|p| p.lat))),
        lon = input("lon", &optional(property.and_then(|p| p.lon))),
    )
}

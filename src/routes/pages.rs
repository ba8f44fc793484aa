use std::sync::Arc;

use axum::extract::{Form, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{html_escape, script_json, source_texts, text_for, wrap_page};
use crate::catalog::query::{format_price, map_points, ALL};
use crate::catalog::{ListingFilters, LocationFacets};
use crate::error::{AppError, Result};
use crate::mail::{contact_email, ContactMessage};
use crate::models::{MapPoint, Property};
use crate::state::AppState;

/// Listing featured at the top of the home page
pub const FEATURED_ID: &str = "the-twins";

/// Project shown on its own showcase page
pub const SHOWCASE_PROJECT: &str = "kerdylia_riviera";

/// Records that belong to the showcase and stay off the home page list
const SHOWCASE_IDS: [&str; 6] = [
    "kerdylia-monokatoikia",
    "the-twins",
    "kerdylia-maisonette-m1",
    "kerdylia-apartment-d1",
    "kerdylia-isogio",
    "kerdylia-orofos",
];

const HOME_LISTINGS: usize = 3;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(home))
        .route("/about", get(about))
        .route("/listings", get(listings))
        .route("/property/{id}", get(property_page))
        .route("/project-kerdylia", get(project_kerdylia))
        .route("/contact", get(contact).post(send_contact))
}

async fn home(State(state): State<Arc<AppState>>) -> Html<String> {
    let properties = state.catalog.snapshot().await;
    let texts = source_texts(&state).await;
    let facets = LocationFacets::from_properties(&properties);

    let featured = properties
        .iter()
        .find(|p| p.id == FEATURED_ID)
        .map(|p| {
            format!(
                r#"<section class="featured-project"><h2 data-lang-key="featured_title">Προτεινόμενο Έργο</h2>{}</section>"#,
                property_card(p, &texts)
            )
        })
        .unwrap_or_default();

    let latest: String = properties
        .iter()
        .filter(|p| !SHOWCASE_IDS.contains(&p.id.as_str()))
        .take(HOME_LISTINGS)
        .map(|p| property_card(p, &texts))
        .collect();

    let content = format!(
        r#"<section class="hero"><h1 data-lang-key="hero_title">Group Real Estate</h1></section>
{featured}
<section class="latest-listings"><h2 data-lang-key="latest_title">Νέες Καταχωρήσεις</h2>
<div class="property-grid">{latest}</div></section>"#
    );
    Html(wrap_page("Αρχική", &content, &facets))
}

async fn about(State(state): State<Arc<AppState>>) -> Html<String> {
    let properties = state.catalog.snapshot().await;
    let content = r#"<section class="about">
<h1 data-lang-key="about_title">Σχετικά με εμάς</h1>
<p data-lang-key="about_text">Η Group Real Estate δραστηριοποιείται στη Νέα Βρασνά και σε όλη την ακτή του Στρυμονικού κόλπου.</p>
<p>El. Venizelou 40, Nea Vrasna, 57021 · +30 694 619 3307 · info@grouprealestate.gr</p>
</section>"#;
    Html(wrap_page(
        "Σχετικά",
        content,
        &LocationFacets::from_properties(&properties),
    ))
}

async fn listings(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<ListingFilters>,
) -> Html<String> {
    let properties = state.catalog.snapshot().await;
    let texts = source_texts(&state).await;
    let facets = LocationFacets::from_properties(&properties);
    let selected = filters.apply(&properties);

    let cards: String = if selected.is_empty() {
        r#"<p class="no-results" data-lang-key="no_results">Δεν βρέθηκαν ακίνητα.</p>"#.to_string()
    } else {
        selected.iter().map(|p| property_card(p, &texts)).collect()
    };

    let content = format!(
        r#"<h1 data-lang-key="listings_title">Ακίνητα</h1>
{form}
<div id="map" class="listings-map"></div>
<div class="property-grid">{cards}</div>
<script id="map-data" type="application/json">{map}</script>"#,
        form = filter_form(&filters, &facets),
        map = script_json(&map_points(&properties)),
    );
    Html(wrap_page("Ακίνητα", &content, &facets))
}

async fn property_page(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let properties = state.catalog.snapshot().await;
    let facets = LocationFacets::from_properties(&properties);
    let Some(property) = properties.iter().find(|p| p.id == id) else {
        return (
            StatusCode::NOT_FOUND,
            Html(wrap_page(
                "Property not found",
                "<h1>Property not found</h1>",
                &facets,
            )),
        )
            .into_response();
    };

    let texts = source_texts(&state).await;
    let title = text_for(&texts, &property.title_key);
    let gallery: String = property
        .images
        .iter()
        .map(|src| {
            format!(
                r#"<img src="{}" alt="{}" loading="lazy">"#,
                html_escape(src),
                html_escape(title)
            )
        })
        .collect();
    let features: String = property
        .features_keys
        .iter()
        .map(|key| {
            format!(
                r#"<li data-lang-key="{}">{}</li>"#,
                html_escape(key),
                html_escape(text_for(&texts, key))
            )
        })
        .collect();
    let rooms = if property.is_plot() {
        String::new()
    } else {
        format!(
            "<li>Υπνοδωμάτια: {}</li><li>Μπάνια: {}</li>",
            property.bedrooms, property.bathrooms
        )
    };
    let point: Vec<MapPoint> = MapPoint::from_property(property).into_iter().collect();
    let hidden = format!(
        r#"<input type="hidden" name="property_id" value="{}"><input type="hidden" name="property_title" value="{}">"#,
        html_escape(&property.id),
        html_escape(title)
    );

    let content = format!(
        r#"<article class="property-detail">
<h1 data-lang-key="{title_key}">{title}</h1>
<img class="main-image" src="{main}" alt="{title}">
<div class="gallery">{gallery}</div>
<p class="price">{price}</p>
<ul class="facts"><li>{location}</li><li>{area} m²</li>{rooms}</ul>
<div class="description" data-lang-key="{description_key}">{description}</div>
<ul class="features">{features}</ul>
<div id="map" class="property-map"></div>
<script id="map-data" type="application/json">{map}</script>
</article>
<form class="inquiry-form" method="post" action="/send_message">{hidden}
<input name="name" required><input name="email" type="email" required><input name="phone_full">
<textarea name="message" required></textarea><button type="submit" data-lang-key="send">Αποστολή</button></form>
<form class="offer-form" method="post" action="/propose_price">{hidden}
<input name="name" required><input name="email" type="email" required><input name="phone_full">
<input name="proposed_price" required><button type="submit" data-lang-key="propose">Πρόταση Τιμής</button></form>"#,
        title_key = html_escape(&property.title_key),
        title = html_escape(title),
        main = html_escape(&property.main_image),
        price = price_label(property.price),
        location = html_escape(&property.location),
        area = property.area,
        description_key = html_escape(&property.description_key),
        description = html_escape(text_for(&texts, &property.description_key)),
        map = script_json(&point),
    );
    Html(wrap_page(title, &content, &facets)).into_response()
}

async fn project_kerdylia(State(state): State<Arc<AppState>>) -> Html<String> {
    let properties = state.catalog.snapshot().await;
    let texts = source_texts(&state).await;
    let cards: String = properties
        .iter()
        .filter(|p| p.project_id() == Some(SHOWCASE_PROJECT))
        .map(|p| property_card(p, &texts))
        .collect();

    let content = format!(
        r#"<h1 data-lang-key="project_title">Kerdylia Riviera</h1>
<div class="property-grid">{cards}</div>"#
    );
    Html(wrap_page(
        "Kerdylia Riviera",
        &content,
        &LocationFacets::from_properties(&properties),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ContactForm {
    name: Option<String>,
    email: Option<String>,
    subject: Option<String>,
    message: Option<String>,
}

async fn contact(State(state): State<Arc<AppState>>) -> Html<String> {
    contact_page(&state, None).await
}

async fn send_contact(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ContactForm>,
) -> Result<Html<String>> {
    let message = ContactMessage {
        name: required(&form.name, "name")?,
        email: required(&form.email, "email")?,
        subject: required(&form.subject, "subject")?,
        message: required(&form.message, "message")?,
    };
    let sent = state.mail.send(&contact_email(&message)).await;
    Ok(contact_page(&state, Some(sent)).await)
}

async fn contact_page(state: &AppState, sent: Option<bool>) -> Html<String> {
    let properties = state.catalog.snapshot().await;
    let notice = match sent {
        Some(true) => r#"<p class="notice success" data-lang-key="contact_sent">Το μήνυμά σας στάλθηκε.</p>"#,
        Some(false) => r#"<p class="notice error" data-lang-key="contact_failed">Το μήνυμα δεν στάλθηκε. Δοκιμάστε ξανά.</p>"#,
        None => "",
    };
    let content = format!(
        r#"<h1 data-lang-key="contact_title">Επικοινωνία</h1>
{notice}
<form class="contact-form" method="post" action="/contact">
<input name="name" required><input name="email" type="email" required>
<input name="subject" required><textarea name="message" required></textarea>
<button type="submit" data-lang-key="send">Αποστολή</button></form>"#
    );
    Html(wrap_page(
        "Επικοινωνία",
        &content,
        &LocationFacets::from_properties(&properties),
    ))
}

/// A form value that must be present and non-blank.
pub(crate) fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::MissingInput(field.to_string()))
}

fn price_label(price: i64) -> String {
    if price > 0 {
        format!("€{}", format_price(price))
    } else {
        r#"<span data-lang-key="price_on_request">Τιμή κατόπιν επικοινωνίας</span>"#.to_string()
    }
}

fn property_card(property: &Property, texts: &Map<String, Value>) -> String {
    format!(
        r#"<a class="property-card" href="/property/{id}" data-id="{id}">
<img src="{image}" alt="{title}" loading="lazy">
<h3 data-lang-key="{title_key}">{title}</h3>
<p class="location">{location}</p><p class="price">{price}</p></a>"#,
        id = html_escape(&property.id),
        image = html_escape(&property.main_image),
        title_key = html_escape(&property.title_key),
        title = html_escape(text_for(texts, &property.title_key)),
        location = html_escape(&property.location),
        price = price_label(property.price),
    )
}

fn filter_form(filters: &ListingFilters, facets: &LocationFacets) -> String {
    let option = |value: &str, label: &str, current: &str| {
        format!(
            r#"<option value="{}"{}>{}</option>"#,
            html_escape(value),
            if value == current { " selected" } else { "" },
            html_escape(label)
        )
    };

    let types: String = [
        (ALL, "Όλοι οι τύποι"),
        ("apartment", "Διαμέρισμα"),
        ("house", "Μονοκατοικία"),
        ("maisonette", "Μεζονέτα"),
        ("plot", "Οικόπεδο"),
    ]
    .into_iter()
    .map(|(value, label)| option(value, label, &filters.r#type))
    .collect();

    let mut locations = option(ALL, "Όλες οι περιοχές", &filters.location);
    for (slug, name) in &facets.locations {
        locations.push_str(&option(slug, name, &filters.location));
    }

    let sorts: String = [
        ("", "Προεπιλογή"),
        ("price_asc", "Τιμή αύξουσα"),
        ("price_desc", "Τιμή φθίνουσα"),
    ]
    .into_iter()
    .map(|(value, label)| option(value, label, &filters.sort))
    .collect();

    format!(
        r#"<form class="filters" method="get" action="/listings">
<select name="type">{types}</select><select name="location">{locations}</select>
<select name="sort">{sorts}</select><button type="submit" data-lang-key="filter">Αναζήτηση</button></form>"#
    )
}

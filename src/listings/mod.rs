pub mod form;

pub use form::ListingForm;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Map;
use tracing::{info, warn};

use crate::catalog::CatalogStore;
use crate::config::SOURCE_LANGUAGE;
use crate::error::{AppError, Result};
use crate::i18n::TextDictionaries;
use crate::images::ImageReconciler;
use crate::models::Property;
use crate::translation::{LanguageOutcome, TranslationStatus, Translator};
use form::NewFeature;

/// Result of a successful create or update
#[derive(Debug, Clone, Serialize)]
pub struct ListingOutcome {
    pub id: String,
    pub translations: Vec<LanguageOutcome>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub feature_translations: Vec<LanguageOutcome>,
}

/// One dictionary entry to publish in every language
struct SourceText {
    field: &'static str,
    key: String,
    text: String,
}

/// Admin create/update of listings: catalog, pictures and translated texts.
pub struct ListingService {
    catalog: Arc<CatalogStore>,
    dictionaries: Arc<TextDictionaries>,
    images: ImageReconciler,
    translator: Translator,
    targets: Vec<String>,
}

impl ListingService {
    pub fn new(
        catalog: Arc<CatalogStore>,
        dictionaries: Arc<TextDictionaries>,
        images: ImageReconciler,
        translator: Translator,
        targets: Vec<String>,
    ) -> Self {
        Self {
            catalog,
            dictionaries,
            images,
            translator,
            targets,
        }
    }

    pub async fn create(&self, mut form: ListingForm) -> Result<ListingOutcome> {
        let id = form.require_id()?;
        let (title_key, description_key) = (form::title_key(&id), form::description_key(&id));
        let mut tx = self.catalog.begin().await?;
        let taken = tx.contains(&id)
            || tx.uses_text_key(&title_key)
            || tx.uses_text_key(&description_key);
        if taken {
            return Err(AppError::Conflict(id));
        }

        let feature = tag_feature(&mut form);
        let mut property = Property {
            id: id.clone(),
            title_key: title_key.clone(),
            description_key: description_key.clone(),
            location: String::new(),
            location_slug: String::new(),
            property_type: String::new(),
            status: String::new(),
            price: 0,
            area: 0.0,
            bedrooms: 0,
            bathrooms: 0,
            lat: None,
            lon: None,
            images: Vec::new(),
            main_image: String::new(),
            features_keys: Vec::new(),
            extra: Map::new(),
        };
        apply_form(&mut property, &form);

        let images = self
            .images
            .reconcile(&id, &[], std::mem::take(&mut form.images))
            .await?;
        info!(id = %id, saved = images.saved.len(), "images stored");
        property.images = images.images;
        property.main_image = images.main_image;

        tx.push(property);
        tx.commit().await?;
        info!(id = %id, "property created");

        let translations = self
            .publish(listing_texts(title_key, description_key, &form))
            .await?;
        let feature_translations = self.introduce_feature(feature).await?;

        Ok(ListingOutcome {
            id,
            translations,
            feature_translations,
        })
    }

    pub async fn update(&self, id: &str, mut form: ListingForm) -> Result<ListingOutcome> {
        let mut tx = self.catalog.begin().await?;
        let previous = match tx.find(id) {
            Some(existing) => existing.images.clone(),
            None => return Err(AppError::NotFound(id.to_string())),
        };

        let feature = tag_feature(&mut form);
        let images = self
            .images
            .reconcile(id, &previous, std::mem::take(&mut form.images))
            .await?;

        let property = tx
            .find_mut(id)
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;
        apply_form(property, &form);
        info!(
            id,
            saved = images.saved.len(),
            deleted = images.deleted.len(),
            "images reconciled"
        );
        property.images = images.images;
        property.main_image = images.main_image;
        let (title_key, description_key) =
            (property.title_key.clone(), property.description_key.clone());

        tx.commit().await?;
        info!(id, "property updated");

        let translations = self
            .publish(listing_texts(title_key, description_key, &form))
            .await?;
        let feature_translations = self.introduce_feature(feature).await?;

        Ok(ListingOutcome {
            id: id.to_string(),
            translations,
            feature_translations,
        })
    }

    /// Register the operator's new feature label in every dictionary.
    /// A key that already exists is left untouched.
    async fn introduce_feature(&self, feature: Option<NewFeature>) -> Result<Vec<LanguageOutcome>> {
        let Some(feature) = feature else {
            return Ok(Vec::new());
        };
        if self
            .dictionaries
            .contains_key(SOURCE_LANGUAGE, &feature.key)
            .await?
        {
            info!(key = %feature.key, "feature already known");
            return Ok(Vec::new());
        }

        self.publish(vec![SourceText {
            field: "label",
            key: feature.key,
            text: feature.label,
        }])
        .await
    }

    /// Write the Greek entries, then translate and write each target
    /// language in turn. Only the Greek write can fail the call.
    async fn publish(&self, texts: Vec<SourceText>) -> Result<Vec<LanguageOutcome>> {
        let greek: BTreeMap<String, String> = texts
            .iter()
            .map(|t| (t.key.clone(), t.text.clone()))
            .collect();
        self.dictionaries.upsert(SOURCE_LANGUAGE, &greek).await?;

        let fields: BTreeMap<String, String> = texts
            .iter()
            .map(|t| (t.field.to_string(), t.text.clone()))
            .collect();

        let mut outcomes = Vec::with_capacity(self.targets.len());
        for language in &self.targets {
            let translation = self.translator.translate(&fields, language).await;
            let entries: BTreeMap<String, String> = texts
                .iter()
                .filter_map(|t| {
                    translation
                        .values
                        .get(t.field)
                        .map(|value| (t.key.clone(), value.clone()))
                })
                .collect();

            let outcome = match self.dictionaries.upsert(language, &entries).await {
                Ok(()) => LanguageOutcome {
                    language: language.clone(),
                    status: translation.status,
                    error: translation.error,
                },
                Err(e) => {
                    warn!(language = %language, error = %e, "could not write dictionary");
                    LanguageOutcome {
                        language: language.clone(),
                        status: TranslationStatus::Failed,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}

/// Tag the listing with the operator's new feature, if any, and hand it back
/// for translation once the catalog is written.
fn tag_feature(form: &mut ListingForm) -> Option<NewFeature> {
    let feature = form.new_feature.take()?;
    if !form.features.contains(&feature.key) {
        form.features.push(feature.key.clone());
    }
    Some(feature)
}

fn apply_form(property: &mut Property, form: &ListingForm) {
    let (bedrooms, bathrooms) = form.rooms();
    property.location = form.location.clone();
    property.location_slug = form::slugify(&form.location);
    property.property_type = form.property_type.clone();
    property.status = form.status.clone();
    property.price = form.price;
    property.area = form.area;
    property.bedrooms = bedrooms;
    property.bathrooms = bathrooms;
    property.lat = form.lat;
    property.lon = form.lon;
    property.features_keys = form.features.clone();
}

fn listing_texts(title_key: String, description_key: String, form: &ListingForm) -> Vec<SourceText> {
    vec![
        SourceText {
            field: "title",
            key: title_key,
            text: form.title.clone(),
        },
        SourceText {
            field: "description",
            key: description_key,
            text: form.description.clone(),
        },
    ]
}

pub mod admin;
pub mod chatbot;
pub mod forms;
pub mod pages;

use std::path::Path;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use serde::Serialize;
use serde_json::{Map, Value};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::catalog::LocationFacets;
use crate::config::SOURCE_LANGUAGE;
use crate::state::AppState;

pub fn router(state: Arc<AppState>, static_dir: &Path, max_upload_bytes: usize) -> Router {
    Router::new()
        .merge(pages::router())
        .merge(forms::router())
        .merge(chatbot::router())
        .merge(admin::router())
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// HTML-escape a string for hand-built markup.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Serialize for an inline `<script type="application/json">` block.
pub fn script_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "[]".to_string())
        .replace("</", "<\\/")
}

/// Greek display texts; pages still render if the dictionary is unreadable.
pub async fn source_texts(state: &AppState) -> Map<String, Value> {
    match state.dictionaries.load(SOURCE_LANGUAGE).await {
        Ok(texts) => texts,
        Err(e) => {
            warn!(error = %e, "could not load Greek dictionary");
            Map::new()
        }
    }
}

/// Look up `key`, falling back to the key itself.
pub fn text_for<'a>(texts: &'a Map<String, Value>, key: &'a str) -> &'a str {
    texts.get(key).and_then(Value::as_str).unwrap_or(key)
}

/// Wrap page content in the site shell: navigation, location menu, chat widget.
pub fn wrap_page(title: &str, content: &str, facets: &LocationFacets) -> String {
    let locations: String = facets
        .locations
        .iter()
        .map(|(slug, name)| {
            format!(
                r#"<li><a href="/listings?location={slug}">{name} ({count})</a></li>"#,
                slug = html_escape(slug),
                name = html_escape(name),
                count = facets.counts.get(slug).copied().unwrap_or(0),
            )
        })
        .collect();

    let base = r##"<!DOCTYPE html>
<html lang="el">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>__TITLE__ | Group Real Estate</title>
    <link rel="stylesheet" href="/static/css/style.css">
</head>
<body>
    <nav class="main-nav">
        <a href="/" data-lang-key="nav_home">Αρχική</a>
        <a href="/listings" data-lang-key="nav_listings">Ακίνητα</a>
        <a href="/project-kerdylia" data-lang-key="nav_project">Kerdylia Riviera</a>
        <a href="/about" data-lang-key="nav_about">Σχετικά</a>
        <a href="/contact" data-lang-key="nav_contact">Επικοινωνία</a>
        <ul class="location-menu">__LOCATIONS__</ul>
    </nav>
    <main>
__CONTENT__
    </main>
    <div class="chat-window widget-panel"><div class="chat-body"></div>
        <form id="chatbot-form"><input id="chatbot-input" autocomplete="off"></form>
    </div>
    <button id="chatbot-toggle-button">💬</button>
    <script type="module" src="/static/js/main.js"></script>
    <script type="module" src="/static/js/chatbot.js"></script>
</body>
</html>"##;
    base.replace("__TITLE__", &html_escape(title))
        .replace("__LOCATIONS__", &locations)
        .replace("__CONTENT__", content)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::CatalogStore;
    use crate::chat::tests::MemoryLog;
    use crate::i18n::TextDictionaries;
    use crate::images::ImageReconciler;
    use crate::mail::tests::FakeProvider;
    use crate::mail::{MailProvider, MailRelay};
    use crate::models::Property;
    use crate::translation::LanguageService;
    use axum::body::Body;
    use axum::http::Request;
    use axum::response::Response;
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::ServiceExt;

    pub(crate) struct TestApp {
        pub(crate) dir: TempDir,
        pub(crate) router: Router,
        pub(crate) log: Arc<MemoryLog>,
        pub(crate) mail: Arc<FakeProvider>,
    }

    impl TestApp {
        pub(crate) async fn new(
            properties: Vec<Property>,
            service: Option<Arc<dyn LanguageService>>,
        ) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let data = dir.path().join("js/data");
            std::fs::create_dir_all(data.join("i18n")).unwrap();
            std::fs::write(
                data.join("properties.json"),
                serde_json::to_string(&properties).unwrap(),
            )
            .unwrap();

            let log = Arc::new(MemoryLog::default());
            let mail = FakeProvider::new(false);
            let state = AppState::assemble(
                Arc::new(CatalogStore::open(data.join("properties.json")).await),
                Arc::new(TextDictionaries::new(data.join("i18n"))),
                ImageReconciler::new(dir.path()),
                service,
                log.clone(),
                MailRelay::new(vec![mail.clone() as Arc<dyn MailProvider>]),
            );
            let router = super::router(Arc::new(state), dir.path(), 10 * 1024 * 1024);

            Self {
                dir,
                router,
                log,
                mail,
            }
        }

        pub(crate) async fn send(&self, request: Request<Body>) -> Response {
            self.router.clone().oneshot(request).await.unwrap()
        }

        pub(crate) async fn get(&self, uri: &str) -> Response {
            self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
        }

        pub(crate) fn stored_catalog(&self) -> Vec<Property> {
            let bytes = std::fs::read(self.dir.path().join("js/data/properties.json")).unwrap();
            serde_json::from_slice(&bytes).unwrap()
        }
    }

    pub(crate) async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            html_escape(r#"<a href="x">Tom's & co</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom&#x27;s &amp; co&lt;/a&gt;"
        );
    }

    #[test]
    fn inline_json_cannot_close_the_script() {
        let json = script_json(&vec!["</script><script>alert(1)"]);
        assert!(!json.contains("</script>"));
    }

    #[test]
    fn shell_lists_locations_with_counts() {
        let facets = LocationFacets {
            counts: [("nea-vrasna".to_string(), 3)].into_iter().collect(),
            locations: vec![("nea-vrasna".to_string(), "Nea Vrasna".to_string())],
        };
        let html = wrap_page("Home", "<p>hi</p>", &facets);
        assert!(html.contains(r#"<a href="/listings?location=nea-vrasna">Nea Vrasna (3)</a>"#));
        assert!(html.contains("<title>Home | Group Real Estate</title>"));
    }
}

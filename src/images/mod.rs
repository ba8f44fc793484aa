use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Component, Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;
use crate::models::PLACEHOLDER_IMAGE;

/// Prefix operators use to point at a file uploaded in the same request.
pub const NEW_UPLOAD_PREFIX: &str = "new:";

const WEB_ROOT: &str = "/static/";
const IMAGES_WEB_ROOT: &str = "/static/images/";

#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// File name as sent by the browser
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Everything the operator submitted about a listing's pictures
#[derive(Debug, Clone, Default)]
pub struct ImageChanges {
    pub retained: Vec<String>,
    pub uploads: Vec<UploadedImage>,
    pub final_order: Vec<String>,
    pub main_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledImages {
    pub images: Vec<String>,
    pub main_image: String,
    pub saved: Vec<String>,
    pub deleted: Vec<String>,
}

/// Places uploads under `images/properties/<id>/` in the static root and
/// removes pictures the operator dropped.
pub struct ImageReconciler {
    static_dir: PathBuf,
}

impl ImageReconciler {
    pub fn new(static_dir: impl Into<PathBuf>) -> Self {
        Self {
            static_dir: static_dir.into(),
        }
    }

    /// Apply `changes` to a listing whose current pictures are `previous`.
    ///
    /// Deletion is best effort: failures are logged and the result still
    /// reflects the requested state. Failing to store an upload is an error.
    pub async fn reconcile(
        &self,
        property_id: &str,
        previous: &[String],
        changes: ImageChanges,
    ) -> Result<ReconciledImages> {
        let mut saved = Vec::with_capacity(changes.uploads.len());
        for upload in &changes.uploads {
            saved.push(self.store_upload(property_id, upload).await?);
        }
        // Repeated browser names resolve in upload order.
        let mut by_upload_name: HashMap<&str, VecDeque<String>> = HashMap::new();
        for (upload, web_path) in changes.uploads.iter().zip(&saved) {
            by_upload_name
                .entry(upload.file_name.as_str())
                .or_default()
                .push_back(web_path.clone());
        }

        let retained: HashSet<&str> = changes.retained.iter().map(String::as_str).collect();
        let mut deleted = Vec::new();
        for path in previous.iter().filter(|p| !retained.contains(p.as_str())) {
            if self.remove(property_id, path).await {
                deleted.push(path.clone());
            }
        }

        let chosen_main = changes.main_image.as_deref().and_then(|entry| {
            match entry.strip_prefix(NEW_UPLOAD_PREFIX) {
                Some(name) => by_upload_name.get(name).and_then(|q| q.front()).cloned(),
                None => Some(entry.to_string()),
            }
        });

        let images: Vec<String> = if changes.final_order.is_empty() {
            previous
                .iter()
                .filter(|p| retained.contains(p.as_str()))
                .cloned()
                .chain(saved.iter().cloned())
                .collect()
        } else {
            let mut images = Vec::with_capacity(changes.final_order.len());
            for entry in &changes.final_order {
                match entry.strip_prefix(NEW_UPLOAD_PREFIX) {
                    Some(name) => {
                        match by_upload_name.get_mut(name).and_then(VecDeque::pop_front) {
                            Some(web_path) => images.push(web_path),
                            None => warn!(entry = %entry, "dropping reference to a missing upload"),
                        }
                    }
                    None if entry.starts_with(IMAGES_WEB_ROOT) => images.push(entry.clone()),
                    None => warn!(entry = %entry, "dropping image path outside the image folder"),
                }
            }
            // Uploads the order never mentioned go last.
            for web_path in &saved {
                if !images.contains(web_path) {
                    images.push(web_path.clone());
                }
            }
            images
        };

        let main_image = chosen_main
            .filter(|chosen| images.contains(chosen))
            .or_else(|| images.first().cloned())
            .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string());

        Ok(ReconciledImages {
            images,
            main_image,
            saved,
            deleted,
        })
    }

    async fn store_upload(&self, property_id: &str, upload: &UploadedImage) -> Result<String> {
        let relative_dir = format!("images/properties/{property_id}");
        let dir = self.static_dir.join(&relative_dir);
        tokio::fs::create_dir_all(&dir).await?;

        let name = unique_name(&dir, &sanitize_file_name(&upload.file_name)).await;
        tokio::fs::write(dir.join(&name), &upload.bytes).await?;

        let web_path = format!("{WEB_ROOT}{relative_dir}/{name}");
        info!(path = %web_path, bytes = upload.bytes.len(), "stored image");
        Ok(web_path)
    }

    /// Delete a picture of `property_id`. Paths outside that listing's
    /// folder are left alone. Returns whether a deletion was attempted.
    async fn remove(&self, property_id: &str, web_path: &str) -> bool {
        let Some(disk_path) = self.disk_path(property_id, web_path) else {
            warn!(
                property = property_id,
                path = web_path,
                "refusing to delete file outside the listing's image folder"
            );
            return false;
        };
        match tokio::fs::remove_file(&disk_path).await {
            Ok(()) => info!(path = web_path, "deleted image"),
            Err(e) => warn!(path = web_path, error = %e, "could not delete image"),
        }
        true
    }

    /// Map `/static/images/properties/<id>/<file>` to its file on disk.
    fn disk_path(&self, property_id: &str, web_path: &str) -> Option<PathBuf> {
        let relative = web_path
            .strip_prefix(WEB_ROOT)
            .or_else(|| web_path.strip_prefix("static/"))?;
        let file = relative
            .strip_prefix("images/properties/")?
            .strip_prefix(property_id)?
            .strip_prefix('/')?;
        if !single_component(property_id) || !single_component(file) {
            return None;
        }
        Some(
            self.static_dir
                .join("images/properties")
                .join(property_id)
                .join(file),
        )
    }
}

fn single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Keep only the final path component and replace anything outside
/// `[A-Za-z0-9._-]`. Never returns an empty or dot-leading name.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}

async fn unique_name(dir: &Path, name: &str) -> String {
    if !tokio::fs::try_exists(dir.join(name)).await.unwrap_or(false) {
        return name.to_string();
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    let mut n = 1;
    loop {
        let candidate = match ext {
            Some(ext) => format!("{stem}-{n}.{ext}"),
            None => format!("{stem}-{n}"),
        };
        if !tokio::fs::try_exists(dir.join(&candidate)).await.unwrap_or(false) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn web(name: &str) -> String {
        format!("/static/images/properties/villa/{name}")
    }

    fn seed(dir: &Path, names: &[&str]) {
        let folder = dir.join("images/properties/villa");
        std::fs::create_dir_all(&folder).unwrap();
        for name in names {
            std::fs::write(folder.join(name), b"jpeg").unwrap();
        }
    }

    #[tokio::test]
    async fn drops_unretained_and_keeps_caller_order() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), &["a.jpg", "b.jpg", "c.jpg"]);
        let reconciler = ImageReconciler::new(dir.path());

        let previous = vec![web("a.jpg"), web("b.jpg"), web("c.jpg")];
        let changes = ImageChanges {
            retained: vec![web("a.jpg"), web("c.jpg")],
            uploads: vec![UploadedImage {
                file_name: "d.jpg".into(),
                bytes: b"new".to_vec(),
            }],
            final_order: vec![web("c.jpg"), web("a.jpg"), "new:d.jpg".into()],
            main_image: None,
        };

        let result = reconciler.reconcile("villa", &previous, changes).await.unwrap();

        assert_eq!(result.images, vec![web("c.jpg"), web("a.jpg"), web("d.jpg")]);
        assert_eq!(result.main_image, web("c.jpg"));
        assert_eq!(result.deleted, vec![web("b.jpg")]);
        let folder = dir.path().join("images/properties/villa");
        assert!(!folder.join("b.jpg").exists());
        assert!(folder.join("a.jpg").exists());
        assert_eq!(std::fs::read(folder.join("d.jpg")).unwrap(), b"new");
    }

    #[tokio::test]
    async fn chosen_main_image_wins_when_present() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), &["a.jpg", "c.jpg"]);
        let reconciler = ImageReconciler::new(dir.path());
        let previous = vec![web("a.jpg"), web("c.jpg")];

        let changes = ImageChanges {
            retained: previous.clone(),
            final_order: previous.clone(),
            main_image: Some(web("c.jpg")),
            ..Default::default()
        };
        let result = reconciler.reconcile("villa", &previous, changes).await.unwrap();
        assert_eq!(result.main_image, web("c.jpg"));

        let changes = ImageChanges {
            retained: previous.clone(),
            final_order: previous.clone(),
            main_image: Some(web("gone.jpg")),
            ..Default::default()
        };
        let result = reconciler.reconcile("villa", &previous, changes).await.unwrap();
        assert_eq!(result.main_image, web("a.jpg"));
    }

    #[tokio::test]
    async fn no_images_falls_back_to_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let reconciler = ImageReconciler::new(dir.path());
        let result = reconciler
            .reconcile("villa", &[], ImageChanges::default())
            .await
            .unwrap();
        assert!(result.images.is_empty());
        assert_eq!(result.main_image, PLACEHOLDER_IMAGE);
    }

    #[tokio::test]
    async fn missing_files_do_not_abort_deletion() {
        let dir = tempfile::tempdir().unwrap();
        let reconciler = ImageReconciler::new(dir.path());
        let previous = vec![web("never-existed.jpg")];
        let result = reconciler
            .reconcile("villa", &previous, ImageChanges::default())
            .await
            .unwrap();
        assert_eq!(result.deleted, previous);
        assert_eq!(result.main_image, PLACEHOLDER_IMAGE);
    }

    #[tokio::test]
    async fn empty_order_keeps_retained_then_uploads() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), &["a.jpg", "b.jpg"]);
        let reconciler = ImageReconciler::new(dir.path());
        let previous = vec![web("a.jpg"), web("b.jpg")];

        let changes = ImageChanges {
            retained: vec![web("b.jpg"), web("a.jpg")],
            uploads: vec![UploadedImage {
                file_name: "a.jpg".into(),
                bytes: b"dup".to_vec(),
            }],
            ..Default::default()
        };
        let result = reconciler.reconcile("villa", &previous, changes).await.unwrap();
        assert_eq!(result.images, vec![web("a.jpg"), web("b.jpg"), web("a-1.jpg")]);
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\photos\\σπίτι 1.JPG"), "______1.JPG");
        assert_eq!(sanitize_file_name("..hidden"), "hidden");
        assert_eq!(sanitize_file_name(".."), "image");
        assert_eq!(sanitize_file_name("living room (2).png"), "living_room__2_.png");
    }

    #[test]
    fn only_the_listing_folder_maps_to_disk() {
        let reconciler = ImageReconciler::new("/srv/static");
        assert!(reconciler.disk_path("villa", "/static/../secrets.txt").is_none());
        assert!(reconciler
            .disk_path("villa", "/static/images/properties/villa/../../a.jpg")
            .is_none());
        assert!(reconciler.disk_path("villa", "/static/images/a.jpg").is_none());
        assert!(reconciler
            .disk_path("villa", "/static/images/properties/villa-2/a.jpg")
            .is_none());
        assert!(reconciler
            .disk_path("villa", "/static/js/data/i18n/en.json")
            .is_none());
        assert!(reconciler
            .disk_path("..", "/static/images/properties/../a.jpg")
            .is_none());
        assert_eq!(
            reconciler.disk_path("villa", &web("a.jpg")),
            Some(PathBuf::from("/srv/static/images/properties/villa/a.jpg"))
        );
    }

    #[tokio::test]
    async fn site_files_cannot_be_ordered_in_or_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let strings = dir.path().join("js/data/i18n/en.json");
        std::fs::create_dir_all(strings.parent().unwrap()).unwrap();
        std::fs::write(&strings, b"{}").unwrap();
        let reconciler = ImageReconciler::new(dir.path());

        let changes = ImageChanges {
            final_order: vec!["/static/js/data/i18n/en.json".into()],
            main_image: Some("/static/js/data/i18n/en.json".into()),
            ..Default::default()
        };
        let result = reconciler.reconcile("villa", &[], changes).await.unwrap();
        assert!(result.images.is_empty());
        assert_eq!(result.main_image, PLACEHOLDER_IMAGE);

        // Even if an older record lists it, dropping it leaves the file alone.
        let previous = vec![
            "/static/js/data/i18n/en.json".to_string(),
            "/static/images/properties/other/a.jpg".to_string(),
        ];
        let result = reconciler
            .reconcile("villa", &previous, ImageChanges::default())
            .await
            .unwrap();
        assert!(result.deleted.is_empty());
        assert!(strings.exists());
    }

    #[tokio::test]
    async fn repeated_upload_names_are_all_kept() {
        let dir = tempfile::tempdir().unwrap();
        let reconciler = ImageReconciler::new(dir.path());
        let upload = |bytes: &[u8]| UploadedImage {
            file_name: "IMG_0001.jpg".into(),
            bytes: bytes.to_vec(),
        };

        let changes = ImageChanges {
            uploads: vec![upload(&b"first"[..]), upload(&b"second"[..])],
            final_order: vec!["new:IMG_0001.jpg".into()],
            main_image: Some("new:IMG_0001.jpg".into()),
            ..Default::default()
        };
        let result = reconciler.reconcile("villa", &[], changes).await.unwrap();

        assert_eq!(
            result.images,
            vec![web("IMG_0001.jpg"), web("IMG_0001-1.jpg")]
        );
        assert_eq!(result.main_image, web("IMG_0001.jpg"));
        let folder = dir.path().join("images/properties/villa");
        assert_eq!(std::fs::read(folder.join("IMG_0001-1.jpg")).unwrap(), b"second");
    }

    #[tokio::test]
    async fn references_to_missing_uploads_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let reconciler = ImageReconciler::new(dir.path());
        let changes = ImageChanges {
            final_order: vec!["new:ghost.jpg".into()],
            main_image: Some("new:ghost.jpg".into()),
            ..Default::default()
        };
        let result = reconciler.reconcile("villa", &[], changes).await.unwrap();
        assert!(result.images.is_empty());
        assert_eq!(result.main_image, PLACEHOLDER_IMAGE);
    }
}

//! Scene loading from ZIP bundles and directories.
//!
//! Both layouts hold a `scene.json` at the root; image paths inside it are
//! relative to that root. A bare `.json` file works the same way, with image
//! paths relative to the file's directory.

use super::images::load_rgba_from_bytes;
use super::{Scene, SceneImage};
use crate::error::{FastpackError, Result};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Name of the scene description inside a bundle.
pub const SCENE_FILE: &str = "scene.json";

/// Load a scene from a file path.
///
/// Supports ZIP files, directories and `.json` scene files.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Scene> {
    let path = path.as_ref();

    if path.is_dir() {
        load_from_json_file(&path.join(SCENE_FILE))
    } else if is_json_file(path) {
        load_from_json_file(path)
    } else {
        let data = std::fs::read(path)?;
        load_from_bytes(&data)
    }
}

/// Load a scene from ZIP bytes. Images are decoded into memory and lose
/// their in-bundle path.
pub fn load_from_bytes(data: &[u8]) -> Result<Scene> {
    let cursor = std::io::Cursor::new(data);
    let mut archive = zip::ZipArchive::new(cursor)?;

    let mut scene_json = None;
    let mut files: HashMap<String, Vec<u8>> = HashMap::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }

        let file_path = normalize_entry_path(file.name());
        if file_path == SCENE_FILE {
            let mut contents = String::new();
            file.read_to_string(&mut contents)?;
            scene_json = Some(contents);
        } else {
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes)?;
            files.insert(file_path, bytes);
        }
    }

    let scene_json = scene_json.ok_or_else(|| {
        FastpackError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "bundle has no scene.json",
        ))
    })?;
    let mut scene = Scene::from_json(&scene_json)?;

    for image in &mut scene.images {
        let Some(path) = &image.path else {
            log::warn!("Image {} has no path in bundle", image.name);
            continue;
        };

        let key = normalize_entry_path(&path.to_string_lossy());
        let bytes = files
            .get(&key)
            .ok_or_else(|| FastpackError::UnknownImage(format!("{} ({})", image.name, key)))?;
        let pixels = load_rgba_from_bytes(bytes)?;
        (image.width, image.height) = pixels.dimensions();
        image.pixels = Some(pixels);
        // Entry paths name nothing on disk once the bundle is unpacked.
        image.path = None;
    }

    log::info!(
        "Loaded bundle: {} objects, {} materials, {} images",
        scene.objects.len(),
        scene.materials.len(),
        scene.images.len()
    );

    Ok(scene)
}

fn is_json_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Load a scene description from disk. Image paths resolve against the
/// file's directory and the images are only probed for their size.
fn load_from_json_file(path: &Path) -> Result<Scene> {
    let contents = std::fs::read_to_string(path)?;
    let mut scene = Scene::from_json(&contents)?;
    let root = path.parent().unwrap_or_else(|| Path::new(""));

    for image in &mut scene.images {
        let Some(relative) = image.path.clone() else {
            continue;
        };

        let resolved = SceneImage::from_file(image.name.clone(), root.join(relative))?;
        *image = resolved;
    }

    log::info!(
        "Loaded {:?}: {} objects, {} materials, {} images",
        path,
        scene.objects.len(),
        scene.materials.len(),
        scene.images.len()
    );

    Ok(scene)
}

/// Strip leading `./` and normalise separators.
fn normalize_entry_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.trim_start_matches("./").to_string()
}

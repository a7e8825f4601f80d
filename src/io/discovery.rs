use crate::core::scene::{Scene, SceneId};
use crate::types::GlacioResult;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Landsat 8 green band file suffix
pub const GREEN_BAND_SUFFIX: &str = "_B3.TIF";
/// Landsat 8 shortwave infrared band file suffix
pub const SWIR1_BAND_SUFFIX: &str = "_B6.TIF";
/// Derived snow index layer file suffix
pub const NDSI_SUFFIX: &str = "_NDSI.TIF";

#[derive(Default)]
struct SceneFiles {
    green: Option<PathBuf>,
    swir1: Option<PathBuf>,
    ndsi: Option<PathBuf>,
}

/// Collect complete scenes from a directory of band files.
///
/// Files pair up by scene name, the file name with its band suffix removed.
/// A scene needs both the green and swir1 band to be usable; anything
/// incomplete or with an unparseable name is skipped with a warning. The
/// result is ordered by scene name.
pub fn collect_scenes(dir: &Path) -> GlacioResult<Vec<Scene>> {
    let mut files: BTreeMap<String, SceneFiles> = BTreeMap::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let name = match file_name.to_str() {
            Some(name) => name,
            None => continue,
        };

        if let Some(scene_name) = name.strip_suffix(GREEN_BAND_SUFFIX) {
            files.entry(scene_name.to_string()).or_default().green = Some(entry.path());
        } else if let Some(scene_name) = name.strip_suffix(SWIR1_BAND_SUFFIX) {
            files.entry(scene_name.to_string()).or_default().swir1 = Some(entry.path());
        } else if let Some(scene_name) = name.strip_suffix(NDSI_SUFFIX) {
            files.entry(scene_name.to_string()).or_default().ndsi = Some(entry.path());
        }
    }

    let mut scenes = Vec::new();
    for (name, parts) in files {
        let id = match SceneId::parse(&name) {
            Ok(id) => id,
            Err(e) => {
                warn!("Skipping unrecognized scene name {}: {}", name, e);
                continue;
            }
        };
        let (green_path, swir1_path) = match (parts.green, parts.swir1) {
            (Some(green), Some(swir1)) => (green, swir1),
            (green, _) => {
                warn!(
                    "Skipping incomplete scene {}: missing {} band",
                    name,
                    if green.is_none() { "green" } else { "swir1" }
                );
                continue;
            }
        };

        debug!(
            "Scene {}: green, swir1{}",
            name,
            if parts.ndsi.is_some() { ", ndsi" } else { "" }
        );
        scenes.push(Scene {
            id,
            green_path,
            swir1_path,
            ndsi_path: parts.ndsi,
        });
    }

    log::info!("Collected {} scene(s) from {}", scenes.len(), dir.display());
    Ok(scenes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_collects_complete_scenes() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "LC81960292015232LGN00_B3.TIF");
        touch(dir.path(), "LC81960292015232LGN00_B6.TIF");
        touch(dir.path(), "LC81960292016235LGN00_B3.TIF");
        touch(dir.path(), "LC81960292016235LGN00_B6.TIF");
        touch(dir.path(), "LC81960292016235LGN00_NDSI.TIF");

        let scenes = collect_scenes(dir.path()).unwrap();
        assert_eq!(scenes.len(), 2);

        // ordered by scene name
        assert_eq!(scenes[0].id.name, "LC81960292015232LGN00");
        assert!(scenes[0].ndsi_path.is_none());
        assert_eq!(scenes[1].id.name, "LC81960292016235LGN00");
        assert!(scenes[1].ndsi_path.is_some());
    }

    #[test]
    fn test_incomplete_scene_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "LC81960292015232LGN00_B3.TIF");
        // swir1 band missing

        let scenes = collect_scenes(dir.path()).unwrap();
        assert!(scenes.is_empty());
    }

    #[test]
    fn test_unparseable_name_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "notascene_B3.TIF");
        touch(dir.path(), "notascene_B6.TIF");
        touch(dir.path(), "LC81960292015232LGN00_B3.TIF");
        touch(dir.path(), "LC81960292015232LGN00_B6.TIF");

        let scenes = collect_scenes(dir.path()).unwrap();
        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].id.name, "LC81960292015232LGN00");
    }

    #[test]
    fn test_unrelated_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "readme.txt");
        touch(dir.path(), "LC81960292015232LGN00_B4.TIF");

        let scenes = collect_scenes(dir.path()).unwrap();
        assert!(scenes.is_empty());
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        assert!(collect_scenes(Path::new("/nonexistent/scenes")).is_err());
    }
}

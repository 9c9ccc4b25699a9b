//! Finds the photos under a folder and generates their thumbnails.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::photo::Photo;
use crate::thumbnail;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}

/// Recursively collect supported image files under `dir`, sorted by path.
/// Fails only if `dir` itself cannot be read; unreadable subfolders are skipped.
pub fn find_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    let mut stack = Vec::new();
    collect_entries(
        std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))?,
        &mut stack,
        &mut paths,
    );

    while let Some(sub) = stack.pop() {
        match std::fs::read_dir(&sub) {
            Ok(entries) => collect_entries(entries, &mut stack, &mut paths),
            Err(e) => log::warn!("Skipping folder {}: {}", sub.display(), e),
        }
    }
    paths.sort();
    Ok(paths)
}

fn collect_entries(entries: std::fs::ReadDir, dirs: &mut Vec<PathBuf>, images: &mut Vec<PathBuf>) {
    for entry in entries.flatten() {
        let path = entry.path();
        // file_type() does not follow symlinks, so linked folders are never entered.
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            dirs.push(path);
        } else if (file_type.is_file() || path.is_file()) && is_supported_image(&path) {
            images.push(path);
        }
    }
}

/// Build a [`Photo`] with a fresh thumbnail for every image under `dir`.
///
/// A missing folder yields an empty gallery. A file whose thumbnail fails
/// is still listed, with `thumbnail_path` left empty.
pub fn load_photos(dir: &Path, settings: &Settings) -> Result<Vec<Photo>> {
    if !dir.is_dir() {
        log::info!("Gallery folder {} does not exist", dir.display());
        return Ok(Vec::new());
    }

    let paths = find_images(dir)?;
    let photos: Vec<Photo> = paths
        .par_iter()
        .map(|path| {
            let mut photo = Photo::new(path);
            match thumbnail::generate_thumbnail(path, settings) {
                Ok(thumb) => photo.thumbnail_path = Some(thumb),
                Err(e) => log::warn!("Thumbnail failed for {}: {}", path.display(), e),
            }
            photo
        })
        .collect();

    let failed = photos.iter().filter(|p| p.thumbnail_path.is_none()).count();
    log::info!(
        "Loaded {} photos from {} ({} without thumbnail)",
        photos.len(),
        dir.display(),
        failed
    );
    Ok(photos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn settings_in(dir: &Path) -> Settings {
        Settings {
            thumbnail_dir: Some(dir.to_path_buf()),
            ..Settings::default()
        }
    }

    fn write_png(path: &Path) {
        image::RgbImage::from_pixel(40, 20, image::Rgb([0, 128, 255]))
            .save(path)
            .unwrap();
    }

    // ── extension filtering ─────────────────────────────────────────────

    #[test]
    fn supported_extensions() {
        for name in ["a.jpg", "a.jpeg", "a.png", "a.gif"] {
            assert!(is_supported_image(Path::new(name)), "{name}");
        }
    }

    #[test]
    fn extension_match_ignores_case() {
        assert!(is_supported_image(Path::new("IMG_0001.JPG")));
        assert!(is_supported_image(Path::new("scan.Png")));
        assert!(is_supported_image(Path::new("anim.GIF")));
    }

    #[test]
    fn unsupported_files_rejected() {
        for name in ["clip.mp4", "notes.txt", "raw.cr2", "pic.webp", "pic.bmp", "README", "jpg"] {
            assert!(!is_supported_image(Path::new(name)), "{name}");
        }
    }

    // ── find_images ─────────────────────────────────────────────────────

    #[test]
    fn find_images_recurses_and_sorts() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("2024").join("summer");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("b.png"), b"x").unwrap();
        std::fs::write(dir.path().join("a.JPG"), b"x").unwrap();
        std::fs::write(nested.join("c.gif"), b"x").unwrap();
        std::fs::write(nested.join("video.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let found = find_images(dir.path()).unwrap();
        let expected = vec![
            dir.path().join("2024").join("summer").join("c.gif"),
            dir.path().join("a.JPG"),
            dir.path().join("b.png"),
        ];
        assert_eq!(found, expected);
    }

    #[test]
    fn find_images_on_empty_dir() {
        let dir = tempdir().unwrap();
        assert!(find_images(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn find_images_on_missing_dir_is_an_error() {
        let dir = tempdir().unwrap();
        let err = find_images(&dir.path().join("gone")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn find_images_does_not_follow_directory_symlinks() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"x").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();

        let found = find_images(dir.path()).unwrap();
        assert_eq!(found, vec![dir.path().join("a.png")]);
    }

    #[cfg(unix)]
    #[test]
    fn find_images_lists_symlinked_files() {
        let dir = tempdir().unwrap();
        let elsewhere = tempdir().unwrap();
        std::fs::write(elsewhere.path().join("real.jpg"), b"x").unwrap();
        std::os::unix::fs::symlink(
            elsewhere.path().join("real.jpg"),
            dir.path().join("link.jpg"),
        )
        .unwrap();
        std::os::unix::fs::symlink(
            elsewhere.path().join("gone.jpg"),
            dir.path().join("dangling.jpg"),
        )
        .unwrap();

        let found = find_images(dir.path()).unwrap();
        assert_eq!(found, vec![dir.path().join("link.jpg")]);
    }

    #[cfg(unix)]
    #[test]
    fn find_images_skips_unreadable_subfolder() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::write(locked.join("hidden.png"), b"x").unwrap();
        std::fs::write(dir.path().join("open.png"), b"x").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Root ignores permission bits; nothing is unreadable then.
        let unreadable = std::fs::read_dir(&locked).is_err();
        let found = find_images(dir.path());
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        let found = found.unwrap();
        assert!(found.contains(&dir.path().join("open.png")));
        if unreadable {
            assert_eq!(found, vec![dir.path().join("open.png")]);
        }
    }

    // ── load_photos ─────────────────────────────────────────────────────

    #[test]
    fn load_photos_missing_dir_is_empty_gallery() {
        let dir = tempdir().unwrap();
        let photos = load_photos(&dir.path().join("E-test-images"), &Settings::default()).unwrap();
        assert!(photos.is_empty());
    }

    #[test]
    fn load_photos_generates_thumbnails_in_order() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        write_png(&src.path().join("one.png"));
        write_png(&src.path().join("two.png"));
        std::fs::write(src.path().join("skip.txt"), b"x").unwrap();

        let photos = load_photos(src.path(), &settings_in(out.path())).unwrap();

        let names: Vec<&str> = photos.iter().map(|p| p.file_name.as_str()).collect();
        assert_eq!(names, ["one.png", "two.png"]);
        for photo in &photos {
            let thumb = photo.thumbnail_path.as_ref().expect("thumbnail generated");
            assert!(thumb.starts_with(out.path()));
            assert_eq!(image::image_dimensions(thumb).unwrap(), (200, 100));
        }
    }

    #[test]
    fn load_photos_keeps_files_whose_thumbnail_fails() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        write_png(&src.path().join("good.png"));
        std::fs::write(src.path().join("bad.jpg"), b"not an image").unwrap();

        let photos = load_photos(src.path(), &settings_in(out.path())).unwrap();
        assert_eq!(photos.len(), 2);

        let bad = photos.iter().find(|p| p.file_name == "bad.jpg").unwrap();
        assert!(bad.thumbnail_path.is_none());
        let good = photos.iter().find(|p| p.file_name == "good.png").unwrap();
        assert!(good.thumbnail_path.is_some());
    }
}

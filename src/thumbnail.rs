use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};

use crate::config::Settings;
use crate::error::{Error, Result};

/// Upper bound on thumbnail pixels; a 1px-wide strip would otherwise
/// scale to millions of rows.
const MAX_THUMBNAIL_PIXELS: u64 = 8 * 1024 * 1024;

/// Decode `image_path`, scale it to `settings.thumbnail_width` pixels wide
/// and write it as a JPEG into the thumbnail directory. Returns the path of
/// the new file. Every call writes a fresh, uniquely named file.
pub fn generate_thumbnail(image_path: &Path, settings: &Settings) -> Result<PathBuf> {
    let target_width = settings.thumbnail_width;
    let orientation = read_orientation(image_path);

    let img = match decode_jpeg_scaled(image_path, target_width, orientation) {
        Some(img) => img,
        None => decode_full(image_path)?,
    };
    let img = apply_orientation(img, orientation);

    let (w, h) = img.dimensions();
    let (tw, th) = thumbnail_dimensions(w, h, target_width);
    if tw as u64 * th as u64 > MAX_THUMBNAIL_PIXELS {
        return Err(Error::TooLarge {
            path: image_path.to_path_buf(),
            width: tw,
            height: th,
        });
    }
    let thumb = img.resize_exact(tw, th, FilterType::Triangle).to_rgb8();

    let out_dir = settings.output_dir();
    std::fs::create_dir_all(&out_dir).map_err(|e| Error::io(&out_dir, e))?;
    let out_path = out_dir.join(thumbnail_file_name(image_path));

    save_thumbnail(&out_path, &thumb, settings.jpeg_quality)?;
    Ok(out_path)
}

/// Write `thumb` to `out_path`, removing whatever was written if encoding fails.
fn save_thumbnail(out_path: &Path, thumb: &image::RgbImage, quality: u8) -> Result<()> {
    let result = write_jpeg(out_path, thumb, quality);
    if result.is_err() && out_path.exists() {
        if let Err(e) = std::fs::remove_file(out_path) {
            log::warn!("Failed to remove partial thumbnail {}: {}", out_path.display(), e);
        }
    }
    result
}

/// `thumb_<uuid>_<source name>.jpg`
fn thumbnail_file_name(image_path: &Path) -> String {
    let source_name = image_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    format!("thumb_{}_{}.jpg", uuid::Uuid::new_v4(), source_name)
}

/// Size of a thumbnail exactly `target_width` wide with the source's
/// aspect ratio. Height never drops below 1.
pub fn thumbnail_dimensions(width: u32, height: u32, target_width: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (target_width, target_width);
    }
    let w = width as u64;
    let scaled = (height as u64 * target_width as u64 + w / 2) / w;
    (target_width, scaled.clamp(1, u32::MAX as u64) as u32)
}

fn decode_full(path: &Path) -> Result<DynamicImage> {
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| Error::io(path, e))?;
    reader.decode().map_err(|source| Error::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn write_jpeg(out_path: &Path, thumb: &image::RgbImage, quality: u8) -> Result<()> {
    let file = File::create(out_path).map_err(|e| Error::io(out_path, e))?;
    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, quality)
        .encode_image(thumb)
        .map_err(|source| Error::Encode {
            path: out_path.to_path_buf(),
            source,
        })?;
    writer.flush().map_err(|e| Error::io(out_path, e))
}

// --- Downscaled JPEG decode ---

/// Decode a JPEG at reduced resolution using DCT scaling, so a 4000x3000
/// photo headed for a 200px thumbnail never decodes all 12M pixels.
/// Returns None for non-JPEG files, images already near the target size,
/// or on any failure (the caller falls back to a full decode).
fn decode_jpeg_scaled(path: &Path, target_width: u32, orientation: u32) -> Option<DynamicImage> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    if ext != "jpg" && ext != "jpeg" {
        return None;
    }

    let file = File::open(path).ok()?;
    let mut decoder = jpeg_decoder::Decoder::new(BufReader::new(file));
    decoder.read_info().ok()?;
    let info = decoder.info()?;

    // The target width applies after orientation; 5..=8 swap the axes.
    let swapped = (5..=8).contains(&orientation);
    let (stored_w, stored_h) = (info.width as u32, info.height as u32);
    let (req_w, req_h) = if swapped {
        let (tw, th) = thumbnail_dimensions(stored_h, stored_w, target_width);
        (th, tw)
    } else {
        thumbnail_dimensions(stored_w, stored_h, target_width)
    };

    let clamp = |v: u32| v.min(u16::MAX as u32) as u16;
    let (actual_w, actual_h) = decoder.scale(clamp(req_w), clamp(req_h)).ok()?;
    if actual_w == info.width && actual_h == info.height {
        return None;
    }

    let pixels = decoder.decode().ok()?;
    scaled_image(info.pixel_format, (actual_w.into(), actual_h.into()), pixels)
}

/// Wrap decoder output as an image. Only the layouts a thumbnail can use
/// directly are accepted; anything else goes through the full decode.
fn scaled_image(
    format: jpeg_decoder::PixelFormat,
    (width, height): (u32, u32),
    pixels: Vec<u8>,
) -> Option<DynamicImage> {
    use jpeg_decoder::PixelFormat;

    match format {
        PixelFormat::RGB24 => {
            image::RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
        }
        PixelFormat::L8 => {
            image::GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8)
        }
        _ => None,
    }
}

// --- EXIF ---

/// EXIF orientation tag, 1 (normal) when absent or unreadable.
fn read_orientation(path: &Path) -> u32 {
    let Ok(file) = File::open(path) else {
        return 1;
    };
    let mut reader = BufReader::new(file);
    let Ok(exif) = exif::Reader::new().read_from_container(&mut reader) else {
        return 1;
    };
    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img, // 1 = normal, or unknown
    }
}

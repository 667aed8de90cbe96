// ============================================================================
// IMAGE I/O — decode inputs, encode the exported composite
// ============================================================================
//
// Inputs decode through the `image` crate (PNG, JPEG, WEBP, BMP, TGA, TIFF,
// …) into straight-alpha RGBA8. The only persisted artifact the engine
// produces is a lossless PNG of the rendered composite — editor state is
// in-memory only and dies with the session.
// ============================================================================

use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;

use image::ImageError;
use image::RgbaImage;
use image::codecs::png::PngEncoder;

use crate::session::EditorSession;

/// Synchronously decode any supported raster format to RGBA8.
pub fn load_image(path: &Path) -> Result<RgbaImage, String> {
    let img = image::open(path)
        .map_err(|e| format!("could not load '{}': {}", path.display(), e))?
        .to_rgba8();
    if img.width() == 0 || img.height() == 0 {
        return Err(format!("'{}' decoded to a zero-size image", path.display()));
    }
    Ok(img)
}

/// Encode a raster as a PNG byte stream.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ImageError> {
    let mut bytes = Vec::new();
    let encoder = PngEncoder::new(Cursor::new(&mut bytes));
    #[allow(deprecated)]
    encoder.encode(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ColorType::Rgba8,
    )?;
    Ok(bytes)
}

/// Encode and write a raster to a PNG file through a buffered writer.
pub fn write_png(image: &RgbaImage, path: &Path) -> Result<(), ImageError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let encoder = PngEncoder::new(&mut writer);
    #[allow(deprecated)]
    encoder.encode(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ColorType::Rgba8,
    )?;
    writer.flush()?;
    Ok(())
}

/// Render the session's composite at native resolution and write it as PNG.
pub fn export_png(session: &EditorSession, path: &Path) -> Result<(), String> {
    if !session.has_image() {
        return Err("no image is loaded".to_string());
    }
    write_png(&session.render_composite(), path).map_err(|e| e.to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn png_bytes_round_trip() {
        let img = RgbaImage::from_fn(5, 3, |x, y| Rgba([x as u8 * 40, y as u8 * 70, 9, 200]));
        let bytes = encode_png(&img).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.as_raw(), img.as_raw());
    }

    #[test]
    fn export_requires_a_loaded_image() {
        let session = EditorSession::new();
        assert!(export_png(&session, Path::new("/tmp/never-written.png")).is_err());
    }
}

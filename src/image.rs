use crate::pdf_generator::PdfGenerator;
use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::time::Duration;

/// Upper bound on bytes read for a single remote image.
const MAX_IMAGE_BYTES: u64 = 20 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

/// Pixel data in the form the PDF backend embeds it.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageData {
    /// Original JPEG bytes, embedded as-is with DCTDecode
    Jpeg { bytes: Vec<u8>, components: u8 },
    /// Decoded 8-bit RGB pixels, with one alpha byte per pixel when the
    /// source has transparency
    Rgb { pixels: Vec<u8>, alpha: Option<Vec<u8>> },
}

/// An image that was fetched and validated, ready to be placed on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportImage {
    /// Path or URL the image was loaded from
    pub source: String,
    pub width_px: u32,
    pub height_px: u32,
    pub data: ImageData,
}

impl ReportImage {
    /// Width and height for a placement `height` inches tall, scaled down
    /// further if that would be wider than `max_width`.
    pub fn size_for_height(&self, height: f32, max_width: f32) -> (f32, f32) {
        let w = self.width_px as f32;
        let h = self.height_px as f32;
        let width = height * w / h;
        if width > max_width {
            (max_width, max_width * h / w)
        } else {
            (width, height)
        }
    }

    /// Largest size no wider than `max_width` and no taller than
    /// `max_height`, preserving aspect ratio.
    pub fn fit_within(&self, max_width: f32, max_height: f32) -> (f32, f32) {
        let w = self.width_px as f32;
        let h = self.height_px as f32;
        let scale = (max_width / w).min(max_height / h);
        (w * scale, h * scale)
    }
}

/// Detect format from raw bytes
pub fn detect_image_format(data: &[u8]) -> Result<ImageFormat> {
    if data.len() < 4 {
        return Err(anyhow!("Image data too short"));
    }
    if data[0] == 0xFF && data[1] == 0xD8 && data[2] == 0xFF {
        Ok(ImageFormat::Jpeg)
    } else if data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47 {
        Ok(ImageFormat::Png)
    } else {
        Err(anyhow!("Unsupported image format"))
    }
}

/// Parse the JPEG SOF marker for width, height and component count
fn parse_jpeg_header(data: &[u8]) -> Result<(u32, u32, u8)> {
    let mut i = 2; // skip FF D8
    while i + 1 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }
        let marker = data[i + 1];
        i += 2;

        // Baseline, extended and progressive frames
        if marker == 0xC0 || marker == 0xC1 || marker == 0xC2 {
            if i + 8 > data.len() {
                return Err(anyhow!("JPEG SOF marker truncated"));
            }
            let height = ((data[i + 3] as u32) << 8) | (data[i + 4] as u32);
            let width = ((data[i + 5] as u32) << 8) | (data[i + 6] as u32);
            let components = data[i + 7];
            return Ok((width, height, components));
        }

        // Skip non-SOF markers by reading their length
        if i + 1 >= data.len() {
            break;
        }
        let seg_len = ((data[i] as usize) << 8) | (data[i + 1] as usize);
        i += seg_len;
    }
    Err(anyhow!("Could not find JPEG SOF marker"))
}

/// Parse PNG IHDR chunk for width and height
fn parse_png_dimensions(data: &[u8]) -> Result<(u32, u32)> {
    // bytes 8..12 = chunk length, 12..16 = "IHDR", 16..20 = width, 20..24 = height
    if data.len() < 24 {
        return Err(anyhow!("PNG data too short"));
    }
    let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
    let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
    Ok((width, height))
}

/// Validate image bytes and convert them to an embeddable image.
pub fn decode_report_image(source: &str, bytes: Vec<u8>) -> Result<ReportImage> {
    let format = detect_image_format(&bytes)?;
    let image = match format {
        ImageFormat::Jpeg => {
            let (width_px, height_px, components) = parse_jpeg_header(&bytes)?;
            if !matches!(components, 1 | 3 | 4) {
                return Err(anyhow!("Unsupported JPEG component count {}", components));
            }
            ReportImage {
                source: source.to_string(),
                width_px,
                height_px,
                data: ImageData::Jpeg { bytes, components },
            }
        }
        ImageFormat::Png => {
            let (width_px, height_px) = parse_png_dimensions(&bytes)?;
            let decoded = ::image::load_from_memory_with_format(&bytes, ::image::ImageFormat::Png)
                .context("Failed to decode PNG")?;
            let data = if decoded.color().has_alpha() {
                let rgba = decoded.to_rgba8().into_raw();
                let mut pixels = Vec::with_capacity(rgba.len() / 4 * 3);
                let mut alpha = Vec::with_capacity(rgba.len() / 4);
                for px in rgba.chunks_exact(4) {
                    pixels.extend_from_slice(&px[..3]);
                    alpha.push(px[3]);
                }
                ImageData::Rgb { pixels, alpha: Some(alpha) }
            } else {
                ImageData::Rgb { pixels: decoded.to_rgb8().into_raw(), alpha: None }
            };
            ReportImage {
                source: source.to_string(),
                width_px,
                height_px,
                data,
            }
        }
    };

    if image.width_px == 0 || image.height_px == 0 {
        return Err(anyhow!("Image has no pixels"));
    }
    Ok(image)
}

// --- Fetching ---

/// Reads image bytes from a local path or a URL.
pub trait ImageFetcher {
    fn fetch(&self, location: &str) -> Result<Vec<u8>>;
}

pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Reads local files from disk and remote images over HTTP.
pub struct DefaultImageFetcher {
    agent: ureq::Agent,
}

impl DefaultImageFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl Default for DefaultImageFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl ImageFetcher for DefaultImageFetcher {
    fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        if is_remote(location) {
            let response = self
                .agent
                .get(location)
                .call()
                .map_err(|e| anyhow!("HTTP request for {} failed: {}", location, e))?;
            let mut bytes = Vec::new();
            response
                .into_reader()
                .take(MAX_IMAGE_BYTES + 1)
                .read_to_end(&mut bytes)
                .with_context(|| format!("Failed to read {}", location))?;
            check_image_size(location, bytes.len() as u64)?;
            Ok(bytes)
        } else {
            std::fs::read(location).with_context(|| format!("Failed to read {}", location))
        }
    }
}

/// Remote images past the size limit are rejected rather than truncated.
fn check_image_size(location: &str, len: u64) -> Result<()> {
    if len > MAX_IMAGE_BYTES {
        return Err(anyhow!("{} is larger than {} bytes", location, MAX_IMAGE_BYTES));
    }
    Ok(())
}

/// Fetch and validate an image. Any failure means "no image": the reason is
/// logged and `None` returned.
pub fn load_image(fetcher: &dyn ImageFetcher, location: &str) -> Option<ReportImage> {
    let result = fetcher.fetch(location).and_then(|bytes| decode_report_image(location, bytes));
    match result {
        Ok(image) => Some(image),
        Err(e) => {
            log::warn!("Skipping image {}: {:#}", location, e);
            None
        }
    }
}

// --- PDF embedding ---

/// Create an image XObject for the image and return its object id
pub fn create_image_object(generator: &mut PdfGenerator, image: &ReportImage) -> u32 {
    match &image.data {
        ImageData::Jpeg { bytes, components } => {
            let (color_space, decode) = match components {
                1 => ("/DeviceGray", ""),
                4 => ("/DeviceCMYK", "/Decode [1 0 1 0 1 0 1 0]\n"),
                _ => ("/DeviceRGB", ""),
            };
            let image_dict = format!(
                "<< /Type /XObject\n\
                 /Subtype /Image\n\
                 /Width {}\n\
                 /Height {}\n\
                 /BitsPerComponent 8\n\
                 /ColorSpace {}\n\
                 {}\
                 /Filter /DCTDecode\n\
                 /Length {}\n\
                 >>\n",
                image.width_px,
                image.height_px,
                color_space,
                decode,
                bytes.len()
            );
            generator.add_stream_object(image_dict, bytes.clone())
        }
        ImageData::Rgb { pixels, alpha } => {
            let smask = alpha.as_ref().map(|alpha| {
                let compressed = crate::compression::compress_deflate(alpha);
                let mask_dict = format!(
                    "<< /Type /XObject\n\
                     /Subtype /Image\n\
                     /Width {}\n\
                     /Height {}\n\
                     /BitsPerComponent 8\n\
                     /ColorSpace /DeviceGray\n\
                     /Filter /FlateDecode\n\
                     /Length {}\n\
                     >>\n",
                    image.width_px,
                    image.height_px,
                    compressed.len()
                );
                generator.add_stream_object(mask_dict, compressed)
            });
            let smask_entry = smask.map(|id| format!("/SMask {} 0 R\n", id)).unwrap_or_default();

            let compressed = crate::compression::compress_deflate(pixels);
            let image_dict = format!(
                "<< /Type /XObject\n\
                 /Subtype /Image\n\
                 /Width {}\n\
                 /Height {}\n\
                 /BitsPerComponent 8\n\
                 /ColorSpace /DeviceRGB\n\
                 {}\
                 /Filter /FlateDecode\n\
                 /Length {}\n\
                 >>\n",
                image.width_px,
                image.height_px,
                smask_entry,
                compressed.len()
            );
            generator.add_stream_object(image_dict, compressed)
        }
    }
}

/// Content stream operators that draw an image XObject. Coordinates are PDF
/// points with the origin at the bottom-left corner.
pub fn create_image_content_stream(x: f32, y: f32, width: f32, height: f32, image_name: &str) -> Vec<u8> {
    let mut content = Vec::new();
    content.extend_from_slice(b"q\n");
    content.extend_from_slice(format!("{:.2} 0 0 {:.2} {:.2} {:.2} cm\n", width, height, x, y).as_bytes());
    content.extend_from_slice(format!("/{} Do\n", image_name).as_bytes());
    content.extend_from_slice(b"Q\n");
    content
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_detect_jpeg() {
        let data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00];
        assert_eq!(detect_image_format(&data).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_detect_png() {
        let data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D];
        assert_eq!(detect_image_format(&data).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_detect_unknown() {
        assert!(detect_image_format(&[0x42, 0x4D, 0x00, 0x00]).is_err());
        assert!(detect_image_format(b"<html>not found</html>").is_err());
    }

    #[test]
    fn test_parse_jpeg_header() {
        let (w, h, components) = parse_jpeg_header(&jpeg_bytes(512, 256)).unwrap();
        assert_eq!((w, h, components), (512, 256, 3));
    }

    #[test]
    fn test_parse_png_dimensions() {
        let mut data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]; // signature
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x0D]); // IHDR length
        data.extend_from_slice(b"IHDR");
        data.extend_from_slice(&640u32.to_be_bytes());
        data.extend_from_slice(&480u32.to_be_bytes());

        let (w, h) = parse_png_dimensions(&data).unwrap();
        assert_eq!((w, h), (640, 480));
    }

    #[test]
    fn test_decode_real_png() {
        let img = ::image::RgbImage::from_fn(3, 2, |_, _| ::image::Rgb([10, 20, 30]));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, ::image::ImageOutputFormat::Png).unwrap();

        let image = decode_report_image("thumb.png", buf.into_inner()).unwrap();
        assert_eq!((image.width_px, image.height_px), (3, 2));
        match image.data {
            ImageData::Rgb { pixels, alpha } => {
                assert_eq!(pixels.len(), 3 * 2 * 3);
                assert!(alpha.is_none());
            }
            other => panic!("expected RGB pixels, got {:?}", other),
        }
    }

    fn transparent_png() -> Vec<u8> {
        let img = ::image::RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 { ::image::Rgba([0, 0, 0, 0]) } else { ::image::Rgba([200, 100, 50, 255]) }
        });
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, ::image::ImageOutputFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_decode_png_keeps_alpha() {
        let image = decode_report_image("logo.png", transparent_png()).unwrap();
        match image.data {
            ImageData::Rgb { pixels, alpha } => {
                assert_eq!(pixels, vec![0, 0, 0, 200, 100, 50]);
                assert_eq!(alpha, Some(vec![0, 255]));
            }
            other => panic!("expected RGB pixels, got {:?}", other),
        }
    }

    #[test]
    fn test_transparent_png_gets_soft_mask() {
        let image = decode_report_image("logo.png", transparent_png()).unwrap();
        let mut generator = PdfGenerator::new();
        let id = create_image_object(&mut generator, &image);

        assert_eq!(generator.objects.len(), 2);
        let mask = &generator.objects[0];
        assert!(mask.content.contains("/ColorSpace /DeviceGray"));
        let alpha = crate::compression::decompress_deflate(mask.stream_data.as_ref().unwrap()).unwrap();
        assert_eq!(alpha, vec![0, 255]);

        let color = generator.objects.iter().find(|o| o.id == id).unwrap();
        assert!(color.content.contains(&format!("/SMask {} 0 R", mask.id)));
        assert!(color.content.contains("/ColorSpace /DeviceRGB"));
    }

    #[test]
    fn test_oversized_remote_image_rejected() {
        assert!(check_image_size("https://img.example.org/a.jpg", MAX_IMAGE_BYTES).is_ok());
        assert!(check_image_size("https://img.example.org/a.jpg", MAX_IMAGE_BYTES + 1).is_err());
    }

    #[test]
    fn test_size_for_height() {
        let image = decode_report_image("a.jpg", jpeg_bytes(400, 200)).unwrap();
        assert_eq!(image.size_for_height(1.0, 3.0), (2.0, 1.0));
        // Very wide images are limited by the available width.
        let wide = decode_report_image("b.jpg", jpeg_bytes(1000, 100)).unwrap();
        let (w, h) = wide.size_for_height(1.0, 3.0);
        assert!((w - 3.0).abs() < 1e-6);
        assert!((h - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_fit_within() {
        let image = decode_report_image("a.jpg", jpeg_bytes(800, 600)).unwrap();
        let (w, h) = image.fit_within(3.5, 9.0);
        assert!((w - 3.5).abs() < 1e-5);
        assert!((h - 2.625).abs() < 1e-5);

        let tall = decode_report_image("t.jpg", jpeg_bytes(100, 1000)).unwrap();
        let (w, h) = tall.fit_within(3.5, 5.0);
        assert!((w - 0.5).abs() < 1e-5);
        assert!((h - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_load_image_degrades_to_none() {
        let mut served = HashMap::new();
        served.insert("good.jpg".to_string(), jpeg_bytes(10, 10));
        served.insert("broken.jpg".to_string(), b"not an image".to_vec());
        let fetcher = MapFetcher(served);

        assert!(load_image(&fetcher, "good.jpg").is_some());
        assert!(load_image(&fetcher, "broken.jpg").is_none());
        assert!(load_image(&fetcher, "missing.jpg").is_none());
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://example.org/a.jpg"));
        assert!(!is_remote("/var/files/a.jpg"));
    }

    #[test]
    fn test_create_image_content_stream() {
        let cs = create_image_content_stream(100.0, 200.0, 300.0, 400.0, "Im1");
        let s = String::from_utf8(cs).unwrap();
        assert!(s.contains("q\n"));
        assert!(s.contains("300.00 0 0 400.00 100.00 200.00 cm"));
        assert!(s.contains("/Im1 Do"));
        assert!(s.contains("Q\n"));
    }
}

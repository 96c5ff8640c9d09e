//! Turning raster images into PDF image XObjects and placing them on a page.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::GenericImageView;
use lopdf::{dictionary, Object, Stream};

use super::error::Result;
use crate::source::ImageFormat;

/// A4 in points.
pub const A4_WIDTH: f32 = 595.28;
pub const A4_HEIGHT: f32 = 841.89;

/// Fraction of the page an image may fill along its constraining axis.
const FILL_RATIO: f32 = 0.95;

/// Where an image lands on its page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub page_width: f32,
    pub page_height: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Placement {
    /// Pick a portrait or landscape A4 page and center the image on it,
    /// scaled uniformly to 95% of the tighter dimension.
    pub fn for_image(image_width: u32, image_height: u32) -> Self {
        let (iw, ih) = (image_width as f32, image_height as f32);
        let (page_width, page_height) = if iw > ih {
            (A4_HEIGHT, A4_WIDTH)
        } else {
            (A4_WIDTH, A4_HEIGHT)
        };

        let scale = (page_width / iw).min(page_height / ih) * FILL_RATIO;
        let width = iw * scale;
        let height = ih * scale;

        Placement {
            page_width,
            page_height,
            x: (page_width - width) / 2.0,
            y: (page_height - height) / 2.0,
            width,
            height,
        }
    }

    pub fn is_landscape(&self) -> bool {
        self.page_width > self.page_height
    }
}

/// Image data ready to be added to a document.
pub struct EmbeddedImage {
    pub width: u32,
    pub height: u32,
    pub xobject: Stream,
    /// Alpha channel, to be referenced from the XObject's `/SMask`.
    pub smask: Option<Stream>,
}

pub fn embed_image(bytes: &[u8], format: ImageFormat) -> Result<EmbeddedImage> {
    match format {
        ImageFormat::Jpeg => embed_jpeg(bytes),
        ImageFormat::Png => embed_png(bytes),
    }
}

/// JPEG data goes into the PDF untouched behind a DCTDecode filter.
fn embed_jpeg(bytes: &[u8]) -> Result<EmbeddedImage> {
    let decoded = image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg)?;
    let (width, height) = decoded.dimensions();

    // The decoder converts CMYK to RGB, so the colour space comes from the
    // frame header of the stream that is passed through.
    let header = JpegHeader::parse(bytes);
    let components = header.map_or(3, |h| h.components);
    let color_space = match components {
        1 => "DeviceGray",
        4 => "DeviceCMYK",
        _ => "DeviceRGB",
    };

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
        "Filter" => "DCTDecode",
    };
    // Adobe writes CMYK JPEGs inverted.
    if components == 4 && header.is_some_and(|h| h.adobe) {
        let decode: Vec<Object> = [1, 0, 1, 0, 1, 0, 1, 0].into_iter().map(Object::Integer).collect();
        dict.set("Decode", decode);
    }

    let xobject = Stream::new(dict, bytes.to_vec()).with_compression(false);

    Ok(EmbeddedImage {
        width,
        height,
        xobject,
        smask: None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct JpegHeader {
    components: u8,
    /// An Adobe APP14 segment precedes the frame header.
    adobe: bool,
}

impl JpegHeader {
    /// Walk the marker segments up to the first start-of-frame.
    fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.get(..2)? != [0xFF, 0xD8] {
            return None;
        }
        let mut adobe = false;
        let mut pos = 2;
        loop {
            if *bytes.get(pos)? != 0xFF {
                return None;
            }
            let marker = *bytes.get(pos + 1)?;
            if marker == 0xFF {
                pos += 1;
                continue;
            }
            let len = u16::from_be_bytes([*bytes.get(pos + 2)?, *bytes.get(pos + 3)?]) as usize;
            let segment = bytes.get(pos + 4..pos + 2 + len)?;
            match marker {
                0xEE => adobe |= segment.starts_with(b"Adobe"),
                0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                    return Some(JpegHeader {
                        components: *segment.get(5)?,
                        adobe,
                    });
                }
                0xD9 | 0xDA => return None,
                _ => {}
            }
            pos += 2 + len;
        }
    }
}

/// PNG is decoded and stored as Flate-compressed RGB plus an optional alpha mask.
fn embed_png(bytes: &[u8]) -> Result<EmbeddedImage> {
    let decoded = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)?;
    let (width, height) = decoded.dimensions();
    let rgba = decoded.to_rgba8();

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    let mut has_alpha = false;
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        has_alpha |= a != 255;
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    let xobject = flate_image(width, height, "DeviceRGB", &rgb)?;
    let smask = if has_alpha {
        Some(flate_image(width, height, "DeviceGray", &alpha)?)
    } else {
        None
    };

    Ok(EmbeddedImage {
        width,
        height,
        xobject,
        smask,
    })
}

fn flate_image(width: u32, height: u32, color_space: &str, data: &[u8]) -> Result<Stream> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    let compressed = encoder.finish()?;

    Ok(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        compressed,
    )
    .with_compression(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::testing::{sample_jpeg, sample_png};

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn test_portrait_placement() {
        let p = Placement::for_image(1000, 2000);
        assert!(!p.is_landscape());
        assert!(close(p.page_width, A4_WIDTH));
        assert!(close(p.page_height, A4_HEIGHT));
        // height constrains: 841.89 / 2000 * 0.95
        let scale = A4_HEIGHT / 2000.0 * 0.95;
        assert!(close(p.height, 2000.0 * scale));
        assert!(close(p.width, 1000.0 * scale));
        assert!(close(p.x, (A4_WIDTH - p.width) / 2.0));
        assert!(close(p.y, (A4_HEIGHT - p.height) / 2.0));
    }

    #[test]
    fn test_landscape_placement() {
        let p = Placement::for_image(3000, 1000);
        assert!(p.is_landscape());
        assert!(close(p.page_width, A4_HEIGHT));
        assert!(close(p.page_height, A4_WIDTH));
        assert!(close(p.width, A4_HEIGHT * 0.95));
    }

    #[test]
    fn test_square_image_is_portrait() {
        let p = Placement::for_image(500, 500);
        assert!(!p.is_landscape());
        assert!(close(p.width, p.height));
    }

    #[test]
    fn test_embed_png_with_alpha() {
        let image = embed_image(&sample_png(4, 3, true), ImageFormat::Png).unwrap();
        assert_eq!((image.width, image.height), (4, 3));
        assert!(image.smask.is_some());
    }

    #[test]
    fn test_embed_opaque_png_has_no_mask() {
        let image = embed_image(&sample_png(4, 3, false), ImageFormat::Png).unwrap();
        assert!(image.smask.is_none());
    }

    #[test]
    fn test_embed_jpeg_passthrough() {
        let bytes = sample_jpeg(8, 6);
        let image = embed_image(&bytes, ImageFormat::Jpeg).unwrap();
        assert_eq!((image.width, image.height), (8, 6));
        assert_eq!(image.xobject.content, bytes);
        assert_eq!(
            image.xobject.dict.get(b"ColorSpace").unwrap().as_name().unwrap(),
            b"DeviceRGB"
        );
    }

    #[test]
    fn test_jpeg_header_of_rgb_image() {
        let header = JpegHeader::parse(&sample_jpeg(8, 6)).unwrap();
        assert_eq!(header.components, 3);
    }

    #[test]
    fn test_jpeg_header_cmyk_adobe() {
        let mut bytes = vec![0xFF, 0xD8];
        // APP14 "Adobe" segment
        bytes.extend_from_slice(&[0xFF, 0xEE, 0x00, 0x0E]);
        bytes.extend_from_slice(b"Adobe\x00\x64\x00\x00\x00\x00\x00");
        // SOF0: precision, height 2, width 3, four components
        bytes.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x14, 0x08, 0x00, 0x02, 0x00, 0x03, 0x04]);
        bytes.extend_from_slice(&[1, 0x11, 0, 2, 0x11, 0, 3, 0x11, 0, 4, 0x11, 0]);
        bytes.extend_from_slice(&[0xFF, 0xD9]);

        assert_eq!(
            JpegHeader::parse(&bytes),
            Some(JpegHeader {
                components: 4,
                adobe: true
            })
        );
    }

    #[test]
    fn test_jpeg_header_rejects_truncated() {
        assert_eq!(JpegHeader::parse(&[0xFF, 0xD8, 0xFF, 0xC0, 0x00]), None);
        assert_eq!(JpegHeader::parse(b"nope"), None);
    }

    #[test]
    fn test_embed_garbage_fails() {
        assert!(embed_image(b"nope", ImageFormat::Png).is_err());
    }
}

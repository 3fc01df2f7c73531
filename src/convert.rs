//! Camera pixel format conversion for the detector handoff.
//!
//! The capture pipeline delivers YUV_420_888: three planes with independent
//! row and pixel strides, chroma possibly interleaved (pixel stride 2). The
//! detector wants packed RGB. Conversion goes through an NV21 repack
//! (full-resolution luma, then interleaved V/U chroma) before the BT.601
//! integer expansion, mirroring how the capture stack hands frames around.
//!
//! Any plane-shape mismatch aborts the current frame only; the caller logs
//! and waits for the next frame.

use crate::frame::{ImageFormat, RawImage};

/// Packed RGB24 image, the detector input format.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    /// width * height * 3 bytes, row-major RGB.
    pub data: Vec<u8>,
}

/// Why a camera image could not be converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    UnsupportedFormat(ImageFormat),
    /// Zero or odd dimensions, which 4:2:0 subsampling cannot represent.
    InvalidDimensions { width: usize, height: usize },
    /// Plane count does not match the declared format.
    PlaneCount { expected: usize, got: usize },
    /// A plane is too small for the declared dimensions and strides.
    ShapeMismatch {
        plane: usize,
        expected: usize,
        got: usize,
    },
}

impl std::fmt::Display for ConvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedFormat(fmt) => write!(f, "unsupported image format: {:?}", fmt),
            Self::InvalidDimensions { width, height } => {
                write!(f, "invalid dimensions {}x{} for 4:2:0 subsampling", width, height)
            }
            Self::PlaneCount { expected, got } => {
                write!(f, "expected {} planes, got {}", expected, got)
            }
            Self::ShapeMismatch {
                plane,
                expected,
                got,
            } => write!(
                f,
                "plane {} too small: need {} bytes, got {}",
                plane, expected, got
            ),
        }
    }
}

impl std::error::Error for ConvertError {}

/// Repack a three-plane YUV_420_888 image into NV21 layout.
///
/// NV21: `width * height` luma bytes, then `width * height / 2` chroma bytes
/// as interleaved V/U pairs at quarter resolution. Handles both planar
/// chroma (pixel stride 1) and interleaved chroma (pixel stride 2), and
/// row strides wider than the image.
pub fn yuv420_to_nv21(img: &RawImage) -> Result<Vec<u8>, ConvertError> {
    if img.format != ImageFormat::Yuv420_888 {
        return Err(ConvertError::UnsupportedFormat(img.format));
    }

    let (w, h) = (img.width, img.height);
    // 4:2:0 chroma is sampled per 2x2 block; zero or odd dimensions have no
    // valid plane layout.
    if w == 0 || h == 0 || w % 2 != 0 || h % 2 != 0 {
        return Err(ConvertError::InvalidDimensions {
            width: w,
            height: h,
        });
    }
    if img.planes.len() != 3 {
        return Err(ConvertError::PlaneCount {
            expected: 3,
            got: img.planes.len(),
        });
    }

    let (cw, ch) = (w / 2, h / 2);

    // Luma plane must cover h rows of w samples.
    let y_plane = &img.planes[0];
    let y_needed = (h - 1) * y_plane.row_stride + w;
    if y_plane.data.len() < y_needed {
        return Err(ConvertError::ShapeMismatch {
            plane: 0,
            expected: y_needed,
            got: y_plane.data.len(),
        });
    }

    // Chroma planes must cover ch rows of cw samples at their pixel stride.
    for (i, plane) in img.planes.iter().enumerate().skip(1) {
        let needed = (ch - 1) * plane.row_stride + (cw - 1) * plane.pixel_stride + 1;
        if plane.data.len() < needed {
            return Err(ConvertError::ShapeMismatch {
                plane: i,
                expected: needed,
                got: plane.data.len(),
            });
        }
    }

    let mut nv21 = vec![0u8; w * h + cw * ch * 2];

    // Deinterleave luma rows (drop row padding).
    for row in 0..h {
        let src = row * y_plane.row_stride;
        let dst = row * w;
        nv21[dst..dst + w].copy_from_slice(&y_plane.data[src..src + w]);
    }

    // Repack chroma: NV21 wants V first, then U, interleaved.
    let u_plane = &img.planes[1];
    let v_plane = &img.planes[2];
    let chroma_base = w * h;
    for row in 0..ch {
        for col in 0..cw {
            let v = v_plane.data[row * v_plane.row_stride + col * v_plane.pixel_stride];
            let u = u_plane.data[row * u_plane.row_stride + col * u_plane.pixel_stride];
            let dst = chroma_base + (row * cw + col) * 2;
            nv21[dst] = v;
            nv21[dst + 1] = u;
        }
    }

    Ok(nv21)
}

/// Expand an NV21 buffer into packed RGB24 using integer BT.601.
pub fn nv21_to_rgb(nv21: &[u8], width: usize, height: usize) -> Result<RgbImage, ConvertError> {
    if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
        return Err(ConvertError::InvalidDimensions { width, height });
    }

    let (cw, ch) = (width / 2, height / 2);
    let needed = width * height + cw * ch * 2;
    if nv21.len() < needed {
        return Err(ConvertError::ShapeMismatch {
            plane: 0,
            expected: needed,
            got: nv21.len(),
        });
    }

    let mut rgb = vec![0u8; width * height * 3];
    let chroma_base = width * height;

    for row in 0..height {
        for col in 0..width {
            let y = nv21[row * width + col] as i32;
            let coff = chroma_base + ((row / 2) * cw + col / 2) * 2;
            let v = nv21[coff] as i32 - 128;
            let u = nv21[coff + 1] as i32 - 128;

            // BT.601 limited-range expansion, fixed point.
            let c = 298 * (y - 16);
            let r = (c + 409 * v + 128) >> 8;
            let g = (c - 100 * u - 208 * v + 128) >> 8;
            let b = (c + 516 * u + 128) >> 8;

            let dst = (row * width + col) * 3;
            rgb[dst] = r.clamp(0, 255) as u8;
            rgb[dst + 1] = g.clamp(0, 255) as u8;
            rgb[dst + 2] = b.clamp(0, 255) as u8;
        }
    }

    Ok(RgbImage {
        width,
        height,
        data: rgb,
    })
}

/// Full conversion from a raw camera image to detector input.
pub fn camera_image_to_rgb(img: &RawImage) -> Result<RgbImage, ConvertError> {
    match img.format {
        ImageFormat::Yuv420_888 => {
            let nv21 = yuv420_to_nv21(img)?;
            nv21_to_rgb(&nv21, img.width, img.height)
        }
        other => Err(ConvertError::UnsupportedFormat(other)),
    }
}

//! Splash screen bitmaps.
//!
//! A splash screen is an uncompressed `.bmp` file painted over the whole client area.

use std::error::Error;
use std::path::Path;
use std::{fmt, fs, io};

use windows_sys::Win32::Graphics::Gdi::{SetDIBitsToDevice, BITMAPINFO, DIB_RGB_COLORS, HDC};

/// `BITMAPFILEHEADER`.
const FILE_HEADER_LEN: usize = 14;
/// `BITMAPINFOHEADER`, the smallest info header `SetDIBitsToDevice` accepts.
const INFO_HEADER_LEN: usize = 40;

#[derive(Debug)]
pub enum BadBitmap {
    Io(io::Error),
    /// The file does not start with `BM`.
    NotBitmap,
    /// The headers are cut short or point past the end of the file.
    Truncated,
}

impl fmt::Display for BadBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BadBitmap::Io(err) => write!(f, "failed to read the bitmap: {err}"),
            BadBitmap::NotBitmap => f.write_str("not a BMP file"),
            BadBitmap::Truncated => f.write_str("the bitmap is truncated"),
        }
    }
}

impl Error for BadBitmap {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BadBitmap::Io(err) => Some(err),
            _ => None,
        }
    }
}

/// A decoded bitmap ready for `SetDIBitsToDevice`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SplashBitmap {
    /// `BITMAPINFO` and color table, copied into a 4-byte aligned buffer.
    info: Vec<u32>,
    pixels: Vec<u8>,
    width: i32,
    height: i32,
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let field = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([field[0], field[1], field[2], field[3]]))
}

impl SplashBitmap {
    pub fn load(path: &Path) -> Result<Self, BadBitmap> {
        let bytes = fs::read(path).map_err(BadBitmap::Io)?;
        Self::parse(&bytes)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, BadBitmap> {
        if bytes.len() < 2 || &bytes[..2] != b"BM" {
            return Err(BadBitmap::NotBitmap);
        }
        if bytes.len() < FILE_HEADER_LEN + INFO_HEADER_LEN {
            return Err(BadBitmap::Truncated);
        }
        let pixels_offset = read_u32(bytes, 10).ok_or(BadBitmap::Truncated)? as usize;
        if pixels_offset < FILE_HEADER_LEN + INFO_HEADER_LEN || pixels_offset > bytes.len() {
            return Err(BadBitmap::Truncated);
        }

        let info_bytes = &bytes[FILE_HEADER_LEN..pixels_offset];
        let width = read_u32(info_bytes, 4).ok_or(BadBitmap::Truncated)? as i32;
        // Negative heights are top-down bitmaps.
        let height = (read_u32(info_bytes, 8).ok_or(BadBitmap::Truncated)? as i32).abs();

        let mut info = vec![0u32; info_bytes.len().div_ceil(4)];
        for (word, chunk) in info.iter_mut().zip(info_bytes.chunks(4)) {
            let mut le = [0u8; 4];
            le[..chunk.len()].copy_from_slice(chunk);
            *word = u32::from_le_bytes(le);
        }

        Ok(Self { info, pixels: bytes[pixels_offset..].to_vec(), width, height })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn draw(&self, hdc: HDC) {
        unsafe {
            SetDIBitsToDevice(
                hdc,
                0,
                0,
                self.width.max(0) as u32,
                self.height as u32,
                0,
                0,
                0,
                self.height as u32,
                self.pixels.as_ptr().cast(),
                self.info.as_ptr().cast::<BITMAPINFO>(),
                DIB_RGB_COLORS,
            )
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 2x1 24-bit bitmap.
    fn tiny_bitmap(height: i32) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"BM");
        bytes.extend_from_slice(&62u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&54u32.to_le_bytes());
        bytes.extend_from_slice(&40u32.to_le_bytes());
        bytes.extend_from_slice(&2i32.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&24u16.to_le_bytes());
        bytes.extend_from_slice(&[0; 24]);
        bytes.extend_from_slice(&[0xff, 0, 0, 0, 0xff, 0, 0, 0]);
        bytes
    }

    #[test]
    fn parses_headers_and_pixels() {
        let splash = SplashBitmap::parse(&tiny_bitmap(1)).unwrap();
        assert_eq!((splash.width(), splash.height()), (2, 1));
        assert_eq!(splash.info.len(), 10);
        assert_eq!(splash.info[0], 40);
        assert_eq!(splash.pixels.len(), 8);
    }

    #[test]
    fn top_down_height() {
        let splash = SplashBitmap::parse(&tiny_bitmap(-1)).unwrap();
        assert_eq!(splash.height(), 1);
    }

    #[test]
    fn rejects_other_files() {
        assert!(matches!(SplashBitmap::parse(b"GIF89a"), Err(BadBitmap::NotBitmap)));
        assert!(matches!(SplashBitmap::parse(b"BM\0\0"), Err(BadBitmap::Truncated)));

        let mut bytes = tiny_bitmap(1);
        bytes[10..14].copy_from_slice(&4096u32.to_le_bytes());
        assert!(matches!(SplashBitmap::parse(&bytes), Err(BadBitmap::Truncated)));
    }
}

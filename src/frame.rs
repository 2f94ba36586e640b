use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Pixel layout of a frame delivered by a capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameFormat {
    /// Packed 8-bit RGB
    Rgb24,
    /// Packed 8-bit RGBA
    Rgba32,
    /// Already JPEG-compressed frame
    Jpeg,
}

impl FrameFormat {
    /// Get bytes per pixel for the format
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            FrameFormat::Rgb24 => 3,
            FrameFormat::Rgba32 => 4,
            FrameFormat::Jpeg => 0, // Variable size, compressed
        }
    }

    /// Check if format is compressed
    pub fn is_compressed(&self) -> bool {
        matches!(self, FrameFormat::Jpeg)
    }
}

/// The current frame of a live preview
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Monotonic frame counter assigned by the device
    pub id: u64,
    pub timestamp: SystemTime,
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub format: FrameFormat,
}

impl FrameData {
    pub fn new(
        id: u64,
        timestamp: SystemTime,
        data: impl Into<Bytes>,
        width: u32,
        height: u32,
        format: FrameFormat,
    ) -> Self {
        Self {
            id,
            timestamp,
            data: data.into(),
            width,
            height,
            format,
        }
    }

    /// A device that has not produced an image yet reports zero dimensions
    pub fn has_picture(&self) -> bool {
        self.width > 0 && self.height > 0 && !self.data.is_empty()
    }

    /// Get the expected frame size for uncompressed formats
    pub fn expected_size(&self) -> Option<usize> {
        if self.format.is_compressed() {
            None
        } else {
            Some(self.width as usize * self.height as usize * self.format.bytes_per_pixel())
        }
    }

    /// Validate frame data size against expected size
    pub fn validate_size(&self) -> bool {
        match self.expected_size() {
            Some(expected) => self.data.len() == expected,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_format_properties() {
        assert_eq!(FrameFormat::Rgb24.bytes_per_pixel(), 3);
        assert_eq!(FrameFormat::Rgba32.bytes_per_pixel(), 4);
        assert!(FrameFormat::Jpeg.is_compressed());
        assert!(!FrameFormat::Rgb24.is_compressed());
    }

    #[test]
    fn test_frame_size_validation() {
        let valid = FrameData::new(
            1,
            SystemTime::now(),
            vec![0u8; 64 * 48 * 3],
            64,
            48,
            FrameFormat::Rgb24,
        );
        assert!(valid.validate_size());
        assert!(valid.has_picture());

        let short = FrameData::new(2, SystemTime::now(), vec![0u8; 10], 64, 48, FrameFormat::Rgb24);
        assert!(!short.validate_size());

        let jpeg = FrameData::new(3, SystemTime::now(), vec![0u8; 500], 64, 48, FrameFormat::Jpeg);
        assert!(jpeg.validate_size());
    }

    #[test]
    fn test_zero_dimension_frame_has_no_picture() {
        let frame = FrameData::new(0, SystemTime::now(), Vec::new(), 0, 0, FrameFormat::Rgb24);
        assert!(!frame.has_picture());
    }
}

//! SROM firmware image handling.

/// Borrowed SROM image streamed to the sensor during bring-up.
///
/// The content is opaque to the driver; it must match the chip revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Firmware<'a> {
    data: &'a [u8],
}

impl<'a> Firmware<'a> {
    /// Wraps an image, typically produced with `include_bytes!`.
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Raw image bytes in upload order.
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Image length in bytes.
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` when the image holds no data.
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Identity the sensor reports in `SROM_ID` once this image runs.
    ///
    /// PixArt images carry it in their second byte.
    pub fn srom_id(&self) -> Option<u8> {
        self.data.get(1).copied()
    }
}

impl<'a> From<&'a [u8]> for Firmware<'a> {
    fn from(data: &'a [u8]) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::Firmware;

    #[test]
    fn srom_id_is_second_byte() {
        let image = Firmware::new(&[0x01, 0x04, 0x8E, 0x96]);
        assert_eq!(image.srom_id(), Some(0x04));
        assert_eq!(image.len(), 4);
    }

    #[test]
    fn short_image_has_no_identity() {
        assert_eq!(Firmware::new(&[0x01]).srom_id(), None);
        assert!(Firmware::new(&[]).is_empty());
    }
}

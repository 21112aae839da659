/// Pixel storage of an output image.
#[derive(Debug, Clone, PartialEq)]
pub enum Pixels {
    /// 8 bit channels, read back as `value / 255.0`.
    Unorm8(Vec<u8>),
    /// Raw float channels.
    Float(Vec<f32>),
}

/// A named, tightly packed `width * height * components` pixel buffer, rows top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub components: u32,
    pub pixels: Pixels,
}

impl Image {
    pub fn new_unorm8(name: impl Into<String>, width: u32, height: u32, components: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            components,
            pixels: Pixels::Unorm8(vec![0; (width * height * components) as usize]),
        }
    }

    pub fn new_float(name: impl Into<String>, width: u32, height: u32, components: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            components,
            pixels: Pixels::Float(vec![0.0; (width * height * components) as usize]),
        }
    }

    pub fn row_len(&self) -> usize {
        (self.width * self.components) as usize
    }

    /// Channel values as floats, normalizing 8 bit storage.
    pub fn to_f32(&self) -> Vec<f32> {
        match &self.pixels {
            Pixels::Unorm8(data) => data.iter().map(|&b| b as f32 / 255.0).collect(),
            Pixels::Float(data) => data.clone(),
        }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.pixels {
            Pixels::Unorm8(data) => Some(data),
            Pixels::Float(_) => None,
        }
    }

    pub fn floats(&self) -> Option<&[f32]> {
        match &self.pixels {
            Pixels::Unorm8(_) => None,
            Pixels::Float(data) => Some(data),
        }
    }

    pub fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        match &mut self.pixels {
            Pixels::Unorm8(data) => Some(data),
            Pixels::Float(_) => None,
        }
    }

    pub fn floats_mut(&mut self) -> Option<&mut [f32]> {
        match &mut self.pixels {
            Pixels::Unorm8(_) => None,
            Pixels::Float(data) => Some(data),
        }
    }
}

#[cfg(test)]
mod image_tests {
    use super::*;

    #[test]
    fn buffers_match_their_dimensions() {
        let mut image = Image::new_unorm8("$lightmap", 4, 2, 3);
        assert_eq!(image.row_len(), 12);
        assert_eq!(image.bytes().map(<[u8]>::len), Some(24));
        assert!(image.floats_mut().is_none());

        image.bytes_mut().unwrap()[0] = 255;
        assert_eq!(image.to_f32()[..2], [1.0, 0.0]);

        let volume = Image::new_float("$lightgrid_vector", 2, 6, 3);
        assert_eq!(volume.floats().map(<[f32]>::len), Some(36));
        assert!(volume.bytes().is_none());
    }
}

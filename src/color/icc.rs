use std::sync::Arc;

use super::ProfileError;

const HEADER_LEN: usize = 128;

/// Data colour space declared in an ICC header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IccColorSpace {
    Gray,
    Rgb,
    Cmyk,
}

impl IccColorSpace {
    /// Number of colour components (`/N` of the ICC stream).
    pub fn components(self) -> i64 {
        match self {
            Self::Gray => 1,
            Self::Rgb => 3,
            Self::Cmyk => 4,
        }
    }

    fn from_signature(sig: &[u8]) -> Option<Self> {
        match sig {
            b"GRAY" => Some(Self::Gray),
            b"RGB " => Some(Self::Rgb),
            b"CMYK" => Some(Self::Cmyk),
            _ => None,
        }
    }
}

/// An ICC profile whose header has been checked.
///
/// Only the header is inspected: declared size, `acsp` signature, a device
/// class usable as an output intent and a supported data colour space. The
/// tag table is passed through untouched.
#[derive(Debug, Clone)]
pub struct IccProfile {
    data: Arc<[u8]>,
    color_space: IccColorSpace,
}

impl IccProfile {
    pub fn parse(data: Arc<[u8]>) -> Result<Self, ProfileError> {
        if data.len() < HEADER_LEN {
            return Err(ProfileError::Truncated(data.len()));
        }

        let declared = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if declared < HEADER_LEN || declared > data.len() {
            return Err(ProfileError::SizeMismatch {
                declared,
                actual: data.len(),
            });
        }

        if &data[36..40] != b"acsp" {
            return Err(ProfileError::MissingSignature);
        }

        let class = &data[12..16];
        if !matches!(class, b"mntr" | b"prtr" | b"scnr" | b"spac") {
            return Err(ProfileError::UnsupportedDeviceClass(
                String::from_utf8_lossy(class).into_owned(),
            ));
        }

        let color_space = IccColorSpace::from_signature(&data[16..20]).ok_or_else(|| {
            ProfileError::UnsupportedColorSpace(String::from_utf8_lossy(&data[16..20]).into_owned())
        })?;

        Ok(Self { data, color_space })
    }

    pub fn color_space(&self) -> IccColorSpace {
        self.color_space
    }

    pub fn components(&self) -> i64 {
        self.color_space.components()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::PdfForgeError;

/// Resolution, in DPI, that images are downsampled to.
const IMAGE_RESOLUTION: u32 = 120;

/// Ghostscript quality preset.
///
/// Only these four values ever reach the command line; anything else is
/// rejected while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityPreset {
    /// Lowest quality, smallest output.
    Screen,
    /// Medium quality.
    #[default]
    Ebook,
    /// High quality.
    Printer,
    /// Highest quality, color preserving.
    Prepress,
}

impl QualityPreset {
    /// All presets, in ascending quality.
    pub const ALL: [Self; 4] = [Self::Screen, Self::Ebook, Self::Printer, Self::Prepress];

    /// Names accepted by [`FromStr`].
    pub fn names() -> &'static [&'static str] {
        &["screen", "ebook", "printer", "prepress"]
    }

    /// Lowercase preset name as Ghostscript expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Screen => "screen",
            Self::Ebook => "ebook",
            Self::Printer => "printer",
            Self::Prepress => "prepress",
        }
    }

    /// Parse an optional form value; a missing value selects the default.
    pub fn from_field(value: Option<&str>) -> Result<Self, PdfForgeError> {
        match value {
            Some(value) => value.parse(),
            None => Ok(Self::default()),
        }
    }

    /// Ghostscript argument vector rewriting `input` into `output`.
    pub fn ghostscript_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-sDEVICE=pdfwrite".to_string(),
            "-dCompatibilityLevel=1.4".to_string(),
            format!("-dPDFSETTINGS=/{}", self.as_str()),
            "-dCompressFonts=true".to_string(),
            "-dDownsampleColorImages=true".to_string(),
            "-dDownsampleGrayImages=true".to_string(),
            "-dDownsampleMonoImages=true".to_string(),
            format!("-dColorImageResolution={IMAGE_RESOLUTION}"),
            format!("-dGrayImageResolution={IMAGE_RESOLUTION}"),
            format!("-dMonoImageResolution={IMAGE_RESOLUTION}"),
            "-dNOPAUSE".to_string(),
            "-dQUIET".to_string(),
            "-dBATCH".to_string(),
        ]
        .into_iter()
        .map(OsString::from)
        .collect();

        let mut output_arg = OsString::from("-sOutputFile=");
        output_arg.push(output);
        args.push(output_arg);
        args.push(input.as_os_str().to_os_string());
        args
    }
}

impl FromStr for QualityPreset {
    type Err = PdfForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PdfForgeError::InvalidPreset {
                preset: s.to_string(),
            })
    }
}

impl fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

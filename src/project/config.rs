use crate::changes::{ChangeMapper, DEFAULT_TEXT_EXTENSIONS};
use crate::document::ReferencePolicy;
use crate::foundation::error::{TimelapseError, TimelapseResult};

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TextReplacement {
    pub old: String,
    pub new: String,
}

/// Pixels trimmed from each edge of a page image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CropMargins {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

impl CropMargins {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CropSettings {
    pub enabled: bool,
    /// Use `alt` for every second page (index 1, 3, ...), for mirrored two-sided layouts.
    pub two_page: bool,
    pub margins: CropMargins,
    pub alt: CropMargins,
}

impl CropSettings {
    /// Margins for the page at `index` (0-based), or `None` when cropping is off.
    pub fn margins_for(&self, index: usize) -> Option<CropMargins> {
        if !self.enabled {
            return None;
        }
        if self.two_page && index % 2 == 1 {
            Some(self.alt)
        } else {
            Some(self.margins)
        }
    }
}

/// Per-project settings, stored in `project.json`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Main document relative to the repository root; discovered per commit when unset.
    pub main_file: Option<String>,

    pub rows: u32,
    pub columns: u32,
    /// Gaussian blur sigma applied to every page; `0` disables it.
    pub blur: f32,
    pub highlight_changes: bool,
    /// Padding around highlighted boxes, in image pixels.
    pub highlight_padding: f64,

    /// Worker threads; `None` uses the available parallelism.
    pub workers: Option<usize>,

    pub start_commit: Option<String>,
    pub end_commit: Option<String>,
    /// Keep one commit out of every N. `0`, `1` and negative values disable it.
    pub concat_commits: i32,
    /// Fallback attempts per failed group; `None` means `concat_commits - 1`.
    pub fallback_limit: Option<usize>,

    pub latex_cmd: String,
    /// Run `texliveonfly` before compiling.
    pub install_missing_packages: bool,
    /// Accept a nonzero compiler exit as long as a PDF was produced.
    pub tolerate_compile_errors: bool,
    pub text_replacements: Vec<TextReplacement>,

    pub raster_dpi: u32,
    pub text_extensions: Vec<String>,
    pub asset_reference_policy: ReferencePolicy,
    pub crop: CropSettings,

    pub framerate: u32,
    /// Scale factor applied to frames when encoding.
    pub video_scale: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            main_file: None,
            rows: 2,
            columns: 8,
            blur: 0.0,
            highlight_changes: true,
            highlight_padding: 25.0,
            workers: None,
            start_commit: None,
            end_commit: None,
            concat_commits: 0,
            fallback_limit: None,
            latex_cmd: "latexmk -pdf -interaction=nonstopmode -synctex=1".to_string(),
            install_missing_packages: false,
            tolerate_compile_errors: true,
            text_replacements: Vec::new(),
            raster_dpi: 150,
            text_extensions: DEFAULT_TEXT_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            asset_reference_policy: ReferencePolicy::default(),
            crop: CropSettings::default(),
            framerate: 8,
            video_scale: 0.25,
        }
    }
}

impl Config {
    pub fn validate(&self) -> TimelapseResult<()> {
        if self.rows == 0 || self.columns == 0 {
            return Err(TimelapseError::validation("rows and columns must be > 0"));
        }
        if !(self.blur.is_finite() && self.blur >= 0.0) {
            return Err(TimelapseError::validation("blur must be a finite value >= 0"));
        }
        if !(self.highlight_padding.is_finite() && self.highlight_padding >= 0.0) {
            return Err(TimelapseError::validation(
                "highlight_padding must be a finite value >= 0",
            ));
        }
        if self.workers == Some(0) {
            return Err(TimelapseError::validation("workers must be >= 1"));
        }
        if self.latex_cmd.split_whitespace().next().is_none() {
            return Err(TimelapseError::validation("latex_cmd must not be empty"));
        }
        if let Some(r) = self.text_replacements.iter().find(|r| r.old.is_empty()) {
            return Err(TimelapseError::validation(format!(
                "text replacement with empty 'old' (new = '{}')",
                r.new
            )));
        }
        if self.raster_dpi == 0 {
            return Err(TimelapseError::validation("raster_dpi must be > 0"));
        }
        if self.framerate == 0 {
            return Err(TimelapseError::validation("framerate must be > 0"));
        }
        if !(self.video_scale.is_finite() && self.video_scale > 0.0) {
            return Err(TimelapseError::validation("video_scale must be > 0"));
        }
        if self.crop.enabled && self.crop.margins.is_zero() && self.crop.alt.is_zero() {
            return Err(TimelapseError::validation(
                "crop is enabled but every crop margin is zero",
            ));
        }
        Ok(())
    }

    /// Group size for concatenation; `1` when disabled.
    pub fn concat_factor(&self) -> usize {
        if self.concat_commits > 1 {
            self.concat_commits as usize
        } else {
            1
        }
    }

    pub fn fallback_attempts(&self) -> usize {
        let factor = self.concat_factor();
        self.fallback_limit
            .unwrap_or(factor - 1)
            .min(factor - 1)
    }

    /// Compiler program and its arguments, without the main file.
    pub fn latex_command(&self) -> TimelapseResult<(String, Vec<String>)> {
        let mut parts = self.latex_cmd.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| TimelapseError::validation("latex_cmd must not be empty"))?;
        Ok((program, parts.collect()))
    }

    pub fn change_mapper(&self) -> ChangeMapper {
        ChangeMapper {
            padding: self.highlight_padding,
            policy: self.asset_reference_policy,
            text_extensions: self
                .text_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/project/config.rs"]
mod tests;

//! Precache manifest: the paths fetched unconditionally at install time.

use std::path::Path;

use figment::{
    Figment,
    providers::{Format, Toml},
};
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Built-in manifest for the greeting site.
///
/// Videos and upscaled images are left out to keep install light; they are
/// cached on first use by the cache-first route instead.
const DEFAULT_ASSETS: &[&str] = &[
    "/",
    "/index.html",
    "/favicon.ico",
    "/manifest.json",
    "/assets/balloons.png",
    "/assets/cake.png",
    "/assets/dove.gif",
    "/assets/heartballoon.png",
    "/assets/letter-envelope.png",
    "/assets/table.png",
    "/assets/girl/pic1.png",
    "/assets/girl/pic2.png",
    "/assets/girl/pic3.png",
    "/assets/girl/pic4.png",
    "/assets/girl/pic5.png",
    "/assets/songs/Bhalobashi Bole Dao.mp3",
    "/assets/songs/Timro Pratiksa.mp3",
    "/assets/songs/Tum Jo Aaye.mp3",
    "/assets/voice/And in that moment.wav",
    "/assets/voice/And now that you hold it.wav",
    "/assets/voice/Did you feel it.wav",
    "/assets/voice/Distance means nothing .wav",
    "/assets/voice/From Bangladesh, with all my love.wav",
    "/assets/voice/I knew you also love me.wav",
    "/assets/voice/Somewhere far away, under the same sky… I think of you.wav",
    "/assets/voice/That's me… arriving in your heart.wav",
    "/assets/voice/With every beat of my heart.wav",
    "/assets/voice/bg song.wav",
    "/assets/voice/bg song1.wav",
    "/assets/voice/letter.wav",
    "/assets/voice/when a heart knows.wav",
    "/assets/16-9/normal_images/boy_sending_love.jpg",
    "/assets/16-9/normal_images/boy_standing.jpg",
    "/assets/16-9/normal_images/girl_catching_love.jpg",
    "/assets/16-9/normal_images/girl_grabing_love.jpg",
    "/assets/9-16/normal_images/boy_sending_love.jpg",
    "/assets/9-16/normal_images/boy_standing.jpg",
    "/assets/9-16/normal_images/girl_catching_love.jpg",
    "/assets/9-16/normal_images/girl_grabing_love.jpg",
];

/// Ordered set of root-relative paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ManifestFile", into = "ManifestFile")]
pub struct PrecacheManifest {
    assets: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct ManifestFile {
    assets: Vec<String>,
}

impl TryFrom<ManifestFile> for PrecacheManifest {
    type Error = ConfigError;

    fn try_from(file: ManifestFile) -> Result<Self, Self::Error> {
        PrecacheManifest::new(file.assets)
    }
}

impl From<PrecacheManifest> for ManifestFile {
    fn from(manifest: PrecacheManifest) -> Self {
        ManifestFile { assets: manifest.assets }
    }
}

impl PrecacheManifest {
    /// Build a manifest, dropping repeated paths but keeping first-seen order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for a path that does not start with `/`.
    pub fn new<I, S>(assets: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut deduped: Vec<String> = Vec::new();
        for asset in assets {
            let asset = asset.into();
            if !asset.starts_with('/') {
                return Err(ConfigError::Invalid {
                    field: "assets".into(),
                    reason: format!("{asset:?} must start with '/'"),
                });
            }
            if !deduped.contains(&asset) {
                deduped.push(asset);
            }
        }
        Ok(Self { assets: deduped })
    }

    /// Load a manifest from a TOML file of the form `assets = ["/", ...]`.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::Missing {
                field: "manifest_path".into(),
                hint: format!("{} does not exist", path.display()),
            });
        }

        Figment::from(Toml::file(path))
            .extract::<ManifestFile>()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?
            .try_into()
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl Default for PrecacheManifest {
    fn default() -> Self {
        Self { assets: DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect() }
    }
}

//! Avatar storage and the initials fallback.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::models::User;

/// Upload limit for avatar files.
pub const MAX_BYTES: usize = 2 * 1024 * 1024;

const PALETTE: [&str; 20] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf", "#667eea", "#764ba2", "#f093fb", "#f5576c", "#4facfe", "#43e97b",
    "#fa709a", "#fee140", "#a8edea", "#d299c2",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarSize {
    Original,
    Thumbnail,
    Small,
}

impl AvatarSize {
    /// Unknown names fall back to `Original`.
    pub fn parse(s: &str) -> Self {
        match s {
            "thumbnail" => AvatarSize::Thumbnail,
            "small" => AvatarSize::Small,
            _ => AvatarSize::Original,
        }
    }

    pub fn pixels(self) -> u32 {
        match self {
            AvatarSize::Original => 500,
            AvatarSize::Thumbnail => 150,
            AvatarSize::Small => 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
}

impl ImageKind {
    pub const ALLOWED: &'static str = "jpeg, png, jpg, webp";

    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Webp => "webp",
        }
    }

    /// Identify the format from the file's magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageKind::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageKind::Png)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageKind::Webp)
        } else {
            None
        }
    }
}

/// Up to two uppercase initials, `U` when the name has none.
pub fn initials(name: &str) -> String {
    let letters: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .take(2)
        .collect();

    if letters.is_empty() {
        "U".to_string()
    } else {
        letters
    }
}

/// Background colour picked deterministically from the email.
pub fn color_for(email: &str) -> &'static str {
    let digest = Sha256::digest(email.as_bytes());
    PALETTE[digest[0] as usize % PALETTE.len()]
}

pub fn default_svg(name: &str, email: &str, size: u32) -> String {
    let font_size = size * 2 / 5;
    let baseline = size * 5 / 8;
    let half = size / 2;
    format!(
        r#"<svg width="{size}" height="{size}" xmlns="http://www.w3.org/2000/svg"><rect width="{size}" height="{size}" fill="{color}"/><text x="{half}" y="{baseline}" font-family="Arial, sans-serif" font-size="{font_size}" font-weight="bold" text-anchor="middle" fill="white">{initials}</text></svg>"#,
        color = color_for(email),
        initials = escape_xml(&initials(name)),
    )
}

pub fn default_data_uri(name: &str, email: &str, size: u32) -> String {
    format!(
        "data:image/svg+xml;base64,{}",
        STANDARD.encode(default_svg(name, email, size))
    )
}

/// Public URL of an uploaded avatar file.
pub fn public_url(config: &Config, filename: &str) -> String {
    format!(
        "{}/storage/avatars/{filename}",
        config.base_url.trim_end_matches('/')
    )
}

/// Avatar for user payloads: uploaded file URL, else the 200px initials SVG.
pub fn url_for(config: &Config, user: &User) -> String {
    match user.avatar.as_deref() {
        Some(filename) => public_url(config, filename),
        None => default_data_uri(&user.name, &user.email, 200),
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Avatar files under `<storage_dir>/avatars`.
pub struct AvatarStore {
    dir: PathBuf,
}

impl AvatarStore {
    pub fn new(storage_dir: &Path) -> Self {
        Self {
            dir: storage_dir.join("avatars"),
        }
    }

    pub async fn save(&self, filename: &str, bytes: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(filename), bytes).await
    }

    /// Best-effort delete; failures are logged and ignored.
    pub async fn remove(&self, filename: &str) {
        let Some(name) = Path::new(filename).file_name() else {
            return;
        };
        match tokio::fs::remove_file(self.dir.join(name)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove avatar {filename}: {e}"),
        }
    }
}

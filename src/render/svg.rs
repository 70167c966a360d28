use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{EscalationCard, EscalationRenderer, RenderError};
use crate::client::Gender;
use crate::i18n::get_text;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 360;

/// Renders cards as standalone SVG files under a scratch directory.
pub struct SvgCardRenderer {
    dir: PathBuf,
    seq: AtomicU64,
}

impl SvgCardRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seq: AtomicU64::new(0),
        }
    }

    fn next_path(&self, user_id: &str) -> PathBuf {
        let n = self.seq.fetch_add(1, Ordering::Relaxed);
        let safe: String = user_id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        self.dir.join(format!("escalation-{}-{}.svg", safe, n))
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn accent(gender: Gender) -> &'static str {
    match gender {
        Gender::Male => "#2f80ed",
        Gender::Female => "#eb5790",
        Gender::Unknown => "#8e8e93",
    }
}

/// Build the SVG document for a card.
pub(crate) fn card_svg(card: &EscalationCard) -> String {
    let lang = card.locale.as_str();
    let color = accent(card.gender);
    let initial = card
        .display_name
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect::<String>())
        .unwrap_or_else(|| "?".to_string());
    // community groups get a different banner
    let banner = if card.group_type == 2 { "#1b1f3a" } else { "#2b1a1a" };

    let avatar = if card.avatar.is_empty() {
        format!(
            r##"<circle cx="120" cy="180" r="70" fill="{color}"/><text x="120" y="205" font-size="64" text-anchor="middle" fill="#fff">{}</text>"##,
            escape(&initial)
        )
    } else {
        format!(
            r##"<clipPath id="av"><circle cx="120" cy="180" r="70"/></clipPath><image href="{}" x="50" y="110" width="140" height="140" clip-path="url(#av)"/><circle cx="120" cy="180" r="72" fill="none" stroke="{color}" stroke-width="4"/>"##,
            escape(&card.avatar)
        )
    };

    format!(
        concat!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"##,
            r##"<rect width="100%" height="100%" rx="24" fill="{banner}"/>"##,
            r##"<rect x="0" y="0" width="100%" height="56" rx="24" fill="#d63031"/>"##,
            r##"<text x="400" y="38" font-size="26" font-weight="bold" text-anchor="middle" fill="#fff">{title}</text>"##,
            "{avatar}",
            r##"<text x="230" y="140" font-size="34" font-weight="bold" fill="#fff">{name}</text>"##,
            r##"<text x="230" y="190" font-size="22" fill="#dfe6e9">{group_label}: {group}</text>"##,
            r##"<text x="230" y="230" font-size="22" fill="#dfe6e9">{reason_label}: {reason}</text>"##,
            r##"<text x="230" y="290" font-size="28" font-weight="bold" fill="{color}">{action}</text>"##,
            "</svg>"
        ),
        w = WIDTH,
        h = HEIGHT,
        banner = banner,
        title = escape(&get_text(lang, "card.title")),
        avatar = avatar,
        name = escape(&card.display_name),
        group_label = escape(&get_text(lang, "card.group")),
        group = escape(&card.group_name),
        reason_label = escape(&get_text(lang, "card.reason")),
        reason = escape(&card.reason),
        color = color,
        action = escape(&card.action),
    )
}

#[async_trait]
impl EscalationRenderer for SvgCardRenderer {
    async fn render_escalation_card(&self, card: &EscalationCard) -> Result<PathBuf, RenderError> {
        let path = self.next_path(&card.user_id);
        let dir = self.dir.clone();
        let card = card.clone();
        let out = path.clone();
        tokio::task::spawn_blocking(move || {
            let io_err = |source| RenderError::Io {
                path: out.display().to_string(),
                source,
            };
            std::fs::create_dir_all(&dir).map_err(io_err)?;
            std::fs::write(&out, card_svg(&card)).map_err(io_err)
        })
        .await??;
        debug!("Rendered escalation card {}", path.display());
        Ok(path)
    }

    async fn clear_image_path(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!("Cleared {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to clear {}: {}", path.display(), e),
        }
    }
}

//! Result summarizer: display title and description for a result card.

use crate::config::SummaryConfig;
use crate::conversation::ResultRecord;
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

const HOME_TITLE: &str = "Home";
const UNTITLED: &str = "Untitled";

/// Card shown for one result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultCard {
    pub title: String,
    /// Link target; `#` when the result has no URL.
    pub href: String,
    /// Cleaned description, empty when nothing meaningful is left.
    pub description: String,
    /// URL path shown under the card.
    pub path: Option<String>,
}

impl ResultCard {
    pub fn from_record(record: &ResultRecord, rules: &DescriptionRules) -> Self {
        let path = url::Url::parse(&record.url)
            .ok()
            .map(|url| url.path().to_string());
        Self {
            title: derive_title(record),
            href: if record.url.is_empty() {
                "#".to_string()
            } else {
                record.url.clone()
            },
            description: derive_description(record.description.as_deref(), rules),
            path,
        }
    }

    /// Host and path shown under the card title, or the raw link when the
    /// URL has no path.
    pub fn location(&self) -> String {
        let host = url::Url::parse(&self.href)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string));
        match (host, self.path.as_deref()) {
            (Some(host), Some(path)) => format!("{}{}", host, path),
            _ => self.href.clone(),
        }
    }
}

/// Title for a result: explicit title, else one derived from the URL path,
/// else the record's name, else "Untitled".
pub fn derive_title(record: &ResultRecord) -> String {
    if let Some(title) = record.title.as_deref() {
        let title = title.trim();
        if !title.is_empty() && title != record.url {
            return title.to_string();
        }
    }

    title_from_url(&record.url)
        .or_else(|| {
            record
                .name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| UNTITLED.to_string())
}

fn title_from_url(raw: &str) -> Option<String> {
    let url = url::Url::parse(raw).ok()?;
    // `mailto:` and other opaque URLs have no path to title from
    let segment = url
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .unwrap_or("");

    if segment.is_empty() || is_index_page(segment) {
        return Some(HOME_TITLE.to_string());
    }

    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    let stem = strip_extension(&decoded);

    let title = stem
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");

    if title.is_empty() { None } else { Some(title) }
}

/// Drop a trailing file extension: a dot followed by a short alphanumeric
/// word starting with a letter. `node.js-tips` and `v1.2` keep their dots.
fn strip_extension(segment: &str) -> &str {
    match segment.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.starts_with(|c: char| c.is_ascii_alphabetic())
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            stem
        }
        _ => segment,
    }
}

fn is_index_page(segment: &str) -> bool {
    let lower = segment.to_ascii_lowercase();
    let Some(stem) = lower
        .strip_suffix(".html")
        .or_else(|| lower.strip_suffix(".htm"))
    else {
        return false;
    };
    stem.strip_prefix("index")
        .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_digit()))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Thresholds and field vocabulary for [`derive_description`].
#[derive(Debug, Clone)]
pub struct DescriptionRules {
    field_labels: Option<Regex>,
    min_len: usize,
    max_len: usize,
    boundary_floor: usize,
}

impl DescriptionRules {
    pub fn new(config: &SummaryConfig) -> Self {
        let field_labels = if config.strip_fields.is_empty() {
            None
        } else {
            let alternatives = config
                .strip_fields
                .iter()
                .map(|field| regex::escape(field.trim()))
                .collect::<Vec<_>>()
                .join("|");
            match Regex::new(&format!(r"(?i)\b(?:{}):\s*", alternatives)) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("Ignoring description field labels: {}", e);
                    None
                }
            }
        };
        Self {
            field_labels,
            min_len: config.min_description_len,
            max_len: config.max_description_len,
            boundary_floor: config.boundary_floor,
        }
    }
}

impl Default for DescriptionRules {
    fn default() -> Self {
        Self::new(&SummaryConfig::default())
    }
}

struct NoisePatterns {
    front_matter: Regex,
    fence_markers: Regex,
    urls: Regex,
    doc_paths: Regex,
    whitespace: Regex,
}

fn noise() -> &'static NoisePatterns {
    static NOISE: OnceLock<NoisePatterns> = OnceLock::new();
    NOISE.get_or_init(|| NoisePatterns {
        front_matter: Regex::new(r"(?m)^---[\s\S]*?---\s*").expect("valid front matter regex"),
        fence_markers: Regex::new(r"(?m)^\s*---\s*").expect("valid marker regex"),
        urls: Regex::new(r"(?i)https?://\S+").expect("valid url regex"),
        doc_paths: Regex::new(r"/[A-Za-z0-9_\-/]+\.(?:html|pdf)").expect("valid path regex"),
        whitespace: Regex::new(r"\s+").expect("valid whitespace regex"),
    })
}

/// Clean a raw result description for display.
///
/// Strips front matter, metadata field labels, URLs and document paths
/// leaking from the indexed source, then applies the length rules.
pub fn derive_description(raw: Option<&str>, rules: &DescriptionRules) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    if raw.trim().is_empty() {
        return String::new();
    }

    let noise = noise();
    let mut cleaned = noise.front_matter.replace(raw, "").into_owned();
    cleaned = noise.fence_markers.replace_all(&cleaned, "").into_owned();
    if let Some(labels) = &rules.field_labels {
        cleaned = labels.replace_all(&cleaned, " ").into_owned();
    }
    cleaned = noise.urls.replace_all(&cleaned, "").into_owned();
    cleaned = noise.doc_paths.replace_all(&cleaned, "").into_owned();
    let cleaned = noise.whitespace.replace_all(&cleaned, " ");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() < rules.min_len {
        return String::new();
    }
    if cleaned.chars().count() <= rules.max_len {
        return cleaned.to_string();
    }
    truncate_at_boundary(cleaned, rules.max_len, rules.boundary_floor)
}

fn truncate_at_boundary(text: &str, max_len: usize, floor: usize) -> String {
    let head: String = text.chars().take(max_len).collect();
    let head = head.trim_end();
    let char_pos = |byte: usize| head[..byte].chars().count();

    if let Some(period) = head.rfind('.') {
        if char_pos(period) > floor {
            return head[..=period].to_string();
        }
    }
    if let Some(space) = head.rfind(' ') {
        if char_pos(space) > floor {
            return format!("{}...", &head[..space]);
        }
    }
    format!("{}...", head)
}

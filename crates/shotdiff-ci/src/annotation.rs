//! Annotation markup and terminal links for failing screenshots.

use serde::{Deserialize, Serialize};
use shotdiff_core::{ComparisonResult, ScreenshotLayout};

/// Visual style of an annotation panel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationStyle {
    Success,
    Info,
    Warning,
    Error,
}

impl AnnotationStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationStyle::Success => "success",
            AnnotationStyle::Info => "info",
            AnnotationStyle::Warning => "warning",
            AnnotationStyle::Error => "error",
        }
    }
}

/// Links to the build under test and to the baseline it was compared with.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferenceLinks {
    pub current_build_url: Option<String>,
    pub reference_build_number: Option<u64>,
    pub reference_build_url: Option<String>,
    pub reference_job_url: Option<String>,
}

/// Scores are always printed with two decimals so `12` reads as `12.00`.
pub fn format_score(score: f64) -> String {
    format!("{score:.2}")
}

/// Escape text for inclusion in annotation markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Escape sequence that log viewers render as an inline link to an uploaded
/// artifact.
pub fn terminal_link(artifact: &str) -> String {
    format!("\x1b]1338;url='artifact://{artifact}';alt='{artifact}'\x07")
}

/// Markup for one failing screenshot, meant to be appended to the run's
/// annotation.
pub fn render_failure(result: &ComparisonResult, links: &ReferenceLinks) -> String {
    let path = escape_html(&result.path);
    let reference = escape_html(&ScreenshotLayout::comparison_artifact(&result.path));

    let mut builds = Vec::new();
    if let Some(url) = &links.current_build_url {
        builds.push(format!("<a href=\"{}\">this build</a>", escape_html(url)));
    }
    if let Some(url) = links
        .reference_job_url
        .as_ref()
        .or(links.reference_build_url.as_ref())
    {
        let label = match links.reference_build_number {
            Some(n) => format!("reference build #{n}"),
            None => "reference build".to_string(),
        };
        builds.push(format!("<a href=\"{}\">{label}</a>", escape_html(url)));
    }
    let builds = if builds.is_empty() {
        String::new()
    } else {
        format!(" ({})", builds.join(" vs "))
    };

    let mut images = vec![
        image(&format!("artifact://{path}"), &format!("current {path}")),
        image(&format!("artifact://{reference}"), &reference),
    ];
    if result.diff.is_some() {
        let diff = escape_html(&ScreenshotLayout::diff_artifact(&result.path));
        images.push(image(&format!("artifact://{diff}"), &diff));
    }

    format!(
        "<p>Screenshot <b>{path}</b> has changed: {score} &gt;= {threshold}{builds}</p>\n<p>{}</p>\n",
        images.join(" "),
        score = format_score(result.score),
        threshold = format_score(result.threshold),
    )
}

fn image(src: &str, alt: &str) -> String {
    format!("<a href=\"{src}\"><img src=\"{src}\" alt=\"{alt}\" height=250></a>")
}

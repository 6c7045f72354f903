//! Template Renderer — merges a `ResumeDocument` into an HTML layout.
//!
//! The layout file owns styling and page structure and exposes three
//! placeholders: `{{document_title}}`, `{{header}}`, `{{sections}}`.
//! Everything inside them is produced here.
//!
//! The output is loaded by a browser with scripts enabled, so every value
//! coming from the document is escaped before it touches the markup.

use std::fmt::Write as _;

use crate::models::{Education, Experience, Personal, ResumeDocument};

const PLACEHOLDER_OPEN: &str = "{{";
const PLACEHOLDER_CLOSE: &str = "}}";

// ────────────────────────────────────────────────────────────────────────────
// Layout variants
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TemplateVariant {
    #[default]
    Modern,
}

impl TemplateVariant {
    /// Maps the document's `template` selector to a variant. Blank selects the default.
    pub fn from_selector(selector: &str) -> Option<Self> {
        match selector.trim().to_ascii_lowercase().as_str() {
            "" | "modern" => Some(TemplateVariant::Modern),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateVariant::Modern => "modern",
        }
    }

    /// Layout file name inside the templates directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            TemplateVariant::Modern => "modern.html",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rendering
// ────────────────────────────────────────────────────────────────────────────

/// Renders the full HTML page for `document` into `layout`.
///
/// `photo_url` must already be resolved (see `render::assets`).
/// Section order is fixed: summary, experience, education, skills,
/// languages, interests. Empty sections are left out entirely.
pub fn render_resume(layout: &str, document: &ResumeDocument, photo_url: Option<&str>) -> String {
    let title = match document.personal.name.trim() {
        "" => "Resume".to_string(),
        name => format!("{name} - Resume"),
    };

    let header = render_header(&document.personal, photo_url);

    let mut sections = String::new();
    render_summary(&mut sections, &document.summary);
    render_experience(&mut sections, &document.experience);
    render_education(&mut sections, &document.education);
    render_tags(&mut sections, "skills", "Skills", &document.skills);
    render_list(&mut sections, "languages", "Languages", &document.languages);
    render_list(&mut sections, "interests", "Interests", &document.interests);

    fill_placeholders(
        layout,
        &[
            ("document_title", escape_html(&title).as_str()),
            ("header", header.as_str()),
            ("sections", sections.as_str()),
        ],
    )
}

/// Substitutes `{{key}}` tokens in one pass over `layout`.
///
/// Substituted values are never rescanned, so a user-supplied `{{sections}}`
/// inside the header stays literal text. Unknown tokens are left as-is.
fn fill_placeholders(layout: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(layout.len() + values.iter().map(|(_, v)| v.len()).sum::<usize>());
    let mut rest = layout;

    while let Some(start) = rest.find(PLACEHOLDER_OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + PLACEHOLDER_OPEN.len()..];

        let Some(end) = after_open.find(PLACEHOLDER_CLOSE) else {
            out.push_str(&rest[start..]);
            return out;
        };

        let key = after_open[..end].trim();
        match values.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + PLACEHOLDER_OPEN.len() + end + PLACEHOLDER_CLOSE.len()]),
        }
        rest = &after_open[end + PLACEHOLDER_CLOSE.len()..];
    }

    out.push_str(rest);
    out
}

fn render_header(personal: &Personal, photo_url: Option<&str>) -> String {
    let mut html = String::from("<header class=\"resume-header\">\n");

    if let Some(src) = photo_url.filter(|src| is_safe_image_src(src)) {
        let _ = writeln!(
            html,
            "  <img class=\"photo\" src=\"{}\" alt=\"Profile\" crossorigin=\"anonymous\" referrerpolicy=\"no-referrer\">",
            escape_html(src)
        );
    }

    html.push_str("  <div class=\"identity\">\n");
    let name = match personal.name.trim() {
        "" => "Full Name",
        name => name,
    };
    let _ = writeln!(html, "    <h1 class=\"name\">{}</h1>", escape_html(name));
    if !personal.title.trim().is_empty() {
        let _ = writeln!(
            html,
            "    <p class=\"headline\">{}</p>",
            escape_html(personal.title.trim())
        );
    }

    let contacts = contact_items(personal);
    if !contacts.is_empty() {
        html.push_str("    <ul class=\"contact\">\n");
        for item in contacts {
            let _ = writeln!(html, "      <li>{item}</li>");
        }
        html.push_str("    </ul>\n");
    }

    html.push_str("  </div>\n</header>");
    html
}

/// Contact line entries, already escaped.
fn contact_items(personal: &Personal) -> Vec<String> {
    let mut items = Vec::new();

    let email = personal.email.trim();
    if !email.is_empty() {
        items.push(format!(
            "<a href=\"mailto:{0}\">{0}</a>",
            escape_html(email)
        ));
    }
    for plain in [&personal.phone, &personal.address] {
        if !plain.trim().is_empty() {
            items.push(escape_html(plain.trim()));
        }
    }
    for (raw, label) in [(&personal.linkedin, "LinkedIn"), (&personal.portfolio, "Portfolio")] {
        if let Some(href) = safe_href(raw) {
            items.push(format!(
                "<a href=\"{}\" target=\"_blank\" rel=\"noreferrer\">{label}</a>",
                escape_html(&href)
            ));
        }
    }

    items
}

fn render_summary(out: &mut String, summary: &str) {
    let summary = summary.trim();
    if summary.is_empty() {
        return;
    }
    open_section(out, "summary", "Professional Summary");
    let _ = writeln!(out, "  <p>{}</p>", escape_html(summary));
    close_section(out);
}

fn render_experience(out: &mut String, experience: &[Experience]) {
    if experience.is_empty() {
        return;
    }
    open_section(out, "experience", "Professional Experience");
    for exp in experience {
        out.push_str("  <div class=\"entry\">\n");
        entry_head(out, &exp.position, &exp.start, &exp.end);
        if !exp.company.trim().is_empty() {
            let _ = writeln!(out, "    <p class=\"org\">{}</p>", escape_html(exp.company.trim()));
        }
        if !exp.description.trim().is_empty() {
            let _ = writeln!(
                out,
                "    <p class=\"description\">{}</p>",
                escape_html(exp.description.trim())
            );
        }
        out.push_str("  </div>\n");
    }
    close_section(out);
}

fn render_education(out: &mut String, education: &[Education]) {
    if education.is_empty() {
        return;
    }
    open_section(out, "education", "Education");
    for edu in education {
        out.push_str("  <div class=\"entry\">\n");
        entry_head(out, &edu.degree, &edu.start, &edu.end);
        if !edu.institution.trim().is_empty() {
            let _ = writeln!(out, "    <p class=\"org\">{}</p>", escape_html(edu.institution.trim()));
        }
        out.push_str("  </div>\n");
    }
    close_section(out);
}

fn render_tags(out: &mut String, class: &str, heading: &str, labels: &[String]) {
    render_labels(out, class, heading, "tags", labels);
}

fn render_list(out: &mut String, class: &str, heading: &str, labels: &[String]) {
    render_labels(out, class, heading, "list", labels);
}

fn render_labels(out: &mut String, class: &str, heading: &str, list_class: &str, labels: &[String]) {
    if labels.is_empty() {
        return;
    }
    open_section(out, class, heading);
    let _ = writeln!(out, "  <ul class=\"{list_class}\">");
    for label in labels {
        let _ = writeln!(out, "    <li>{}</li>", escape_html(label.trim()));
    }
    out.push_str("  </ul>\n");
    close_section(out);
}

fn entry_head(out: &mut String, heading: &str, start: &str, end: &str) {
    out.push_str("    <div class=\"entry-head\">\n");
    let _ = writeln!(out, "      <h3>{}</h3>", escape_html(heading.trim()));
    if let Some(range) = date_range(start, end) {
        let _ = writeln!(out, "      <span class=\"dates\">{}</span>", escape_html(&range));
    }
    out.push_str("    </div>\n");
}

fn open_section(out: &mut String, class: &str, heading: &str) {
    let _ = writeln!(
        out,
        "<section class=\"{class}\">\n  <h2 class=\"section-title\">{heading}</h2>"
    );
}

fn close_section(out: &mut String) {
    out.push_str("</section>\n");
}

fn date_range(start: &str, end: &str) -> Option<String> {
    match (start.trim(), end.trim()) {
        ("", "") => None,
        (start, "") => Some(start.to_string()),
        ("", end) => Some(end.to_string()),
        (start, end) => Some(format!("{start} - {end}")),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Escaping
// ────────────────────────────────────────────────────────────────────────────

/// Escapes text for both element content and quoted attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Link targets limited to web and mail schemes. Scheme-less values are
/// treated as web addresses (`linkedin.com/in/x`). Returns unescaped text.
fn safe_href(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let lower = raw.to_ascii_lowercase();
    if lower.starts_with("https://") || lower.starts_with("http://") || lower.starts_with("mailto:") {
        return Some(raw.to_string());
    }
    // anything else with a scheme (javascript:, data:, ...) is dropped
    let scheme_end = raw.find(':');
    let path_start = raw.find(['/', '?', '#'].as_slice());
    match (scheme_end, path_start) {
        (Some(colon), Some(slash)) if colon < slash => None,
        (Some(_), None) => None,
        _ => Some(format!("https://{raw}")),
    }
}

fn is_safe_image_src(src: &str) -> bool {
    let lower = src.trim_start().to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://") || lower.starts_with("data:image/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODERN: &str = include_str!("../../templates/modern.html");

    fn sample_document() -> ResumeDocument {
        ResumeDocument {
            personal: Personal {
                name: "Ada Lovelace".into(),
                title: "Analytical Engineer".into(),
                email: "ada@example.com".into(),
                phone: "+44 20 0000 0000".into(),
                address: "London".into(),
                linkedin: "linkedin.com/in/ada".into(),
                ..Personal::default()
            },
            summary: "Writes programs for engines that do not exist yet.".into(),
            education: vec![Education {
                degree: "Mathematics".into(),
                institution: "Private tutoring".into(),
                start: "1829".into(),
                end: "1833".into(),
            }],
            experience: vec![Experience {
                position: "Translator".into(),
                company: "Taylor's Scientific Memoirs".into(),
                start: "1842".into(),
                end: "1843".into(),
                description: "Translated Menabrea.\nAdded notes A to G.".into(),
            }],
            skills: vec!["Bernoulli numbers".into(), "Punch cards".into()],
            languages: vec!["English".into(), "French".into()],
            interests: vec!["Poetical science".into()],
            template: String::new(),
        }
    }

    #[test]
    fn test_empty_document_renders_header_only() {
        let html = render_resume(MODERN, &ResumeDocument::default(), None);

        assert!(html.contains("<header class=\"resume-header\">"));
        assert!(!html.contains("<section"));
        assert!(!html.contains("<h2"));
        assert!(!html.contains("<img"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_whitespace_summary_is_treated_as_empty() {
        let doc = ResumeDocument {
            summary: "  \n ".into(),
            ..ResumeDocument::default()
        };
        let html = render_resume(MODERN, &doc, None);
        assert!(!html.contains("Professional Summary"));
    }

    #[test]
    fn test_sections_render_in_fixed_order() {
        let html = render_resume(MODERN, &sample_document(), None);

        let positions: Vec<usize> = [
            "resume-header",
            "class=\"summary\"",
            "class=\"experience\"",
            "class=\"education\"",
            "class=\"skills\"",
            "class=\"languages\"",
            "class=\"interests\"",
        ]
        .iter()
        .map(|marker| html.find(marker).unwrap_or_else(|| panic!("missing {marker}")))
        .collect();

        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
    }

    #[test]
    fn test_list_items_keep_input_order() {
        let html = render_resume(MODERN, &sample_document(), None);
        let english = html.find("<li>English</li>").unwrap();
        let french = html.find("<li>French</li>").unwrap();
        assert!(english < french);
    }

    #[test]
    fn test_html_significant_characters_are_escaped_everywhere() {
        let hostile = "<script>alert(\"x\")</script> & co";
        let doc = ResumeDocument {
            personal: Personal {
                name: hostile.into(),
                title: hostile.into(),
                email: hostile.into(),
                ..Personal::default()
            },
            summary: hostile.into(),
            experience: vec![Experience {
                position: hostile.into(),
                company: hostile.into(),
                description: hostile.into(),
                ..Experience::default()
            }],
            skills: vec![hostile.into()],
            interests: vec![hostile.into()],
            ..ResumeDocument::default()
        };

        let html = render_resume(MODERN, &doc, None);

        assert!(!html.contains("<script>"));
        assert!(!html.contains("alert(\"x\")"));
        assert!(html.contains("&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; co"));
    }

    #[test]
    fn test_placeholder_text_in_values_is_not_expanded() {
        let doc = ResumeDocument {
            personal: Personal {
                name: "{{sections}}".into(),
                ..Personal::default()
            },
            summary: "real summary".into(),
            ..ResumeDocument::default()
        };
        let html = render_resume(MODERN, &doc, None);

        assert_eq!(html.matches("real summary").count(), 1);
        assert!(html.contains("<h1 class=\"name\">{{sections}}</h1>"));
    }

    #[test]
    fn test_photo_rendered_only_when_resolved() {
        let html = render_resume(
            MODERN,
            &sample_document(),
            Some("https://api.example.com/uploads/a.jpg?x=1&y=2"),
        );
        assert!(html.contains("src=\"https://api.example.com/uploads/a.jpg?x=1&amp;y=2\""));

        let html = render_resume(MODERN, &sample_document(), Some("javascript:alert(1)"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_contact_links_are_scheme_checked() {
        let doc = ResumeDocument {
            personal: Personal {
                linkedin: "javascript:alert(1)".into(),
                portfolio: "ada.dev/work".into(),
                ..Personal::default()
            },
            ..ResumeDocument::default()
        };
        let html = render_resume(MODERN, &doc, None);

        assert!(!html.contains("javascript:"));
        assert!(!html.contains(">LinkedIn<"));
        assert!(html.contains("href=\"https://ada.dev/work\""));
    }

    #[test]
    fn test_date_range_variants() {
        assert_eq!(date_range("2020", "2022").as_deref(), Some("2020 - 2022"));
        assert_eq!(date_range("2020", "").as_deref(), Some("2020"));
        assert_eq!(date_range(" ", "Present").as_deref(), Some("Present"));
        assert_eq!(date_range("", ""), None);
    }

    #[test]
    fn test_fill_placeholders_leaves_unknown_and_unterminated_tokens() {
        let out = fill_placeholders("a {{x}} {{ y }} {{z", &[("y", "Y")]);
        assert_eq!(out, "a {{x}} Y {{z");
    }

    #[test]
    fn test_template_selector() {
        assert_eq!(TemplateVariant::from_selector(""), Some(TemplateVariant::Modern));
        assert_eq!(TemplateVariant::from_selector(" Modern "), Some(TemplateVariant::Modern));
        assert_eq!(TemplateVariant::from_selector("classic"), None);
    }
}

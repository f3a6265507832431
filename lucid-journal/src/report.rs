//! HTML export for cases and SILVA spaces
//!
//! Documents are self-contained (inline CSS, no scripts) so the browser can
//! save or print them as-is. All user text goes through [`escape_html`].

use chrono::{DateTime, Utc};
use lucid_common::models::{Absence, Case, InvisibleThreshold, SilvaSpace, Threshold};
use std::fmt::Write;

/// The entries of one case, by module
#[derive(Debug, Clone)]
pub enum CaseEntries {
    Thresholds(Vec<Threshold>),
    InvisibleThresholds(Vec<InvisibleThreshold>),
    Absences(Vec<Absence>),
    /// SILVA cases carry no structured entries
    None,
}

/// Figures shown under the entry table
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub entry_count: usize,
    /// Mean intensity, or mean impact for absences
    pub mean_rating: Option<f64>,
    /// IRREVERSA only
    pub crossed_count: Option<usize>,
}

impl CaseEntries {
    pub fn summary(&self) -> ReportSummary {
        let ratings: Vec<i64> = match self {
            CaseEntries::Thresholds(rows) => rows.iter().map(|t| t.intensity).collect(),
            CaseEntries::InvisibleThresholds(rows) => rows.iter().map(|t| t.intensity).collect(),
            CaseEntries::Absences(rows) => rows.iter().map(|a| a.impact).collect(),
            CaseEntries::None => Vec::new(),
        };

        let mean_rating = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().sum::<i64>() as f64 / ratings.len() as f64)
        };

        let crossed_count = match self {
            CaseEntries::Thresholds(rows) => Some(rows.iter().filter(|t| t.crossed).count()),
            _ => None,
        };

        ReportSummary {
            entry_count: ratings.len(),
            mean_rating,
            crossed_count,
        }
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// File-name stem derived from a title: lowercase ASCII words joined by `-`
pub fn slugify(title: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;

    for c in title.chars().flat_map(char::to_lowercase) {
        let folded = match c {
            'à' | 'â' | 'ä' | 'á' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' | 'í' => 'i',
            'ô' | 'ö' | 'ó' => 'o',
            'ù' | 'û' | 'ü' | 'ú' => 'u',
            'ç' => 'c',
            'ÿ' => 'y',
            other => other,
        };

        if folded.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(folded);
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "lucid".to_string()
    } else {
        slug.chars().take(60).collect::<String>().trim_end_matches('-').to_string()
    }
}

fn format_date(date: DateTime<Utc>) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn opt_date(date: Option<DateTime<Utc>>) -> String {
    date.map(format_date).unwrap_or_else(|| "-".to_string())
}

fn opt_text(text: &Option<String>) -> String {
    text.as_deref().map(escape_html).unwrap_or_default()
}

const STYLE: &str = "body{font-family:Georgia,serif;max-width:52rem;margin:2rem auto;color:#222;line-height:1.5}\
h1{margin-bottom:.2rem}.meta{color:#666;font-size:.9rem}\
table{border-collapse:collapse;width:100%;margin:1.5rem 0}\
th,td{border:1px solid #ccc;padding:.4rem .6rem;text-align:left;vertical-align:top}\
th{background:#f4f4f4}.summary{background:#fafafa;border:1px solid #ddd;padding:.8rem 1rem}\
@media print{body{margin:0}}";

fn document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"fr\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_html(title),
        STYLE,
        body
    )
}

fn entry_table(entries: &CaseEntries) -> String {
    let mut html = String::new();

    match entries {
        CaseEntries::Thresholds(rows) => {
            html.push_str("<table>\n<tr><th>Seuil</th><th>Type</th><th>Intensité</th><th>Franchi</th><th>Description</th></tr>\n");
            for t in rows {
                let crossed = if t.crossed {
                    format!("oui ({})", opt_date(t.crossed_at))
                } else {
                    "non".to_string()
                };
                let _ = writeln!(
                    html,
                    "<tr><td>{}</td><td>{}</td><td>{}/5</td><td>{}</td><td>{}</td></tr>",
                    escape_html(&t.title),
                    t.threshold_type,
                    t.intensity,
                    crossed,
                    opt_text(&t.description)
                );
            }
        }
        CaseEntries::InvisibleThresholds(rows) => {
            html.push_str("<table>\n<tr><th>Seuil</th><th>Signal</th><th>Intensité</th><th>Ressenti le</th><th>Description</th></tr>\n");
            for t in rows {
                let _ = writeln!(
                    html,
                    "<tr><td>{}</td><td>{}</td><td>{}/5</td><td>{}</td><td>{}</td></tr>",
                    escape_html(&t.title),
                    opt_text(&t.signal),
                    t.intensity,
                    opt_date(t.sensed_at),
                    opt_text(&t.description)
                );
            }
        }
        CaseEntries::Absences(rows) => {
            html.push_str("<table>\n<tr><th>Absence</th><th>Catégorie</th><th>Impact</th><th>Depuis</th><th>Description</th></tr>\n");
            for a in rows {
                let _ = writeln!(
                    html,
                    "<tr><td>{}</td><td>{}</td><td>{}/5</td><td>{}</td><td>{}</td></tr>",
                    escape_html(&a.title),
                    a.category,
                    a.impact,
                    opt_date(a.started_at),
                    opt_text(&a.description)
                );
            }
        }
        CaseEntries::None => return html,
    }

    html.push_str("</table>\n");
    html
}

fn summary_block(summary: &ReportSummary) -> String {
    let mut html = String::from("<div class=\"summary\">\n");
    let _ = writeln!(html, "<p>Entrées : {}</p>", summary.entry_count);
    if let Some(mean) = summary.mean_rating {
        let _ = writeln!(html, "<p>Moyenne : {:.1}/5</p>", mean);
    }
    if let Some(crossed) = summary.crossed_count {
        let _ = writeln!(html, "<p>Seuils franchis : {}</p>", crossed);
    }
    html.push_str("</div>\n");
    html
}

/// Full report for one case
pub fn render_case_report(case: &Case, entries: &CaseEntries, generated_at: DateTime<Utc>) -> String {
    let mut body = String::new();

    let _ = writeln!(body, "<p class=\"meta\">{}</p>", case.module.label());
    let _ = writeln!(body, "<h1>{}</h1>", escape_html(&case.title));
    let _ = writeln!(
        body,
        "<p class=\"meta\">Statut : {} · créé le {} · modifié le {} · exporté le {}</p>",
        case.status,
        format_date(case.created_at),
        format_date(case.updated_at),
        format_date(generated_at)
    );
    if let Some(description) = &case.description {
        let _ = writeln!(body, "<p>{}</p>", escape_html(description));
    }

    body.push_str(&entry_table(entries));
    body.push_str(&summary_block(&entries.summary()));

    document(&format!("{} - {}", case.module.label(), case.title), &body)
}

/// SILVA space export: title and one paragraph per blank-line-separated block
pub fn render_silva_report(space: &SilvaSpace, generated_at: DateTime<Utc>) -> String {
    let mut body = String::new();

    let _ = writeln!(body, "<p class=\"meta\">SILVA</p>");
    let _ = writeln!(body, "<h1>{}</h1>", escape_html(&space.title));
    let _ = writeln!(
        body,
        "<p class=\"meta\">Modifié le {} · exporté le {}</p>",
        format_date(space.updated_at),
        format_date(generated_at)
    );

    for paragraph in space
        .content
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        let lines: Vec<String> = paragraph.lines().map(escape_html).collect();
        let _ = writeln!(body, "<p>{}</p>", lines.join("<br>"));
    }

    document(&format!("SILVA - {}", space.title), &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucid_common::models::{CaseStatus, Module, ThresholdType};
    use uuid::Uuid;

    fn case(title: &str) -> Case {
        Case {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            workspace_id: None,
            module: Module::Irreversa,
            title: title.to_string(),
            description: Some("<b>gras</b> & co".to_string()),
            status: CaseStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn threshold(case: &Case, intensity: i64, crossed: bool) -> Threshold {
        Threshold {
            id: Uuid::new_v4(),
            case_id: case.id,
            user_id: case.user_id,
            title: "<script>alert(1)</script>".to_string(),
            description: None,
            threshold_type: ThresholdType::Irreversible,
            intensity,
            crossed,
            crossed_at: crossed.then(Utc::now),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">l'été & co</a>"#),
            "&lt;a href=&quot;x&quot;&gt;l&#39;été &amp; co&lt;/a&gt;"
        );
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Quitter Lyon, peut-être ?"), "quitter-lyon-peut-etre");
        assert_eq!(slugify("  Été 2025  "), "ete-2025");
        assert_eq!(slugify("???"), "lucid");
    }

    #[test]
    fn test_summary_for_thresholds() {
        let case = case("Départ");
        let entries = CaseEntries::Thresholds(vec![
            threshold(&case, 2, true),
            threshold(&case, 5, false),
        ]);

        let summary = entries.summary();
        assert_eq!(summary.entry_count, 2);
        assert_eq!(summary.mean_rating, Some(3.5));
        assert_eq!(summary.crossed_count, Some(1));

        let empty = CaseEntries::None.summary();
        assert_eq!(empty.entry_count, 0);
        assert_eq!(empty.mean_rating, None);
        assert_eq!(empty.crossed_count, None);
    }

    #[test]
    fn test_case_report_escapes_user_text() {
        let case = case("Moi & <toi>");
        let entries = CaseEntries::Thresholds(vec![threshold(&case, 3, true)]);

        let html = render_case_report(&case, &entries, Utc::now());

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("IRREVERSA"));
        assert!(html.contains("Moi &amp; &lt;toi&gt;"));
        assert!(html.contains("&lt;b&gt;gras&lt;/b&gt; &amp; co"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("Seuils franchis : 1"));
        assert!(html.contains("Moyenne : 3.0/5"));
    }

    #[test]
    fn test_silva_report_paragraphs() {
        let space = SilvaSpace {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            workspace_id: None,
            title: "Clairière".to_string(),
            content: "Premier <i>bloc</i>\nsuite\n\n\n\nSecond bloc".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let html = render_silva_report(&space, Utc::now());

        assert!(html.contains("<p>Premier &lt;i&gt;bloc&lt;/i&gt;<br>suite</p>"));
        assert!(html.contains("<p>Second bloc</p>"));
    }
}

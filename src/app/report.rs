use crate::config::OutputFormat;
use crate::domain::model::{Candidate, ClassificationResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;

#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub file_name: String,
    pub model: String,
    pub classified_at: DateTime<Utc>,
    pub result: ClassificationResult,
}

impl ClassificationReport {
    pub fn new(
        file_name: impl Into<String>,
        model: impl Into<String>,
        result: ClassificationResult,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            model: model.into(),
            classified_at: Utc::now(),
            result,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();

        match &self.result {
            ClassificationResult::Success { data } => {
                let _ = writeln!(out, "♻️  E-waste classification for {}", self.file_name);
                let _ = writeln!(out);
                let _ = writeln!(out, "{}", describe_primary(&data.primary));
                if let Some(description) = &data.primary.description {
                    let _ = writeln!(out, "   {}", description);
                }

                if !data.alternatives.is_empty() {
                    let _ = writeln!(out);
                    let _ = writeln!(out, "Other possibilities:");
                    for (rank, alternative) in data.alternatives.iter().enumerate() {
                        let _ = writeln!(
                            out,
                            "  {}. {} ({}%)",
                            rank + 1,
                            display_category(alternative),
                            alternative.confidence
                        );
                    }
                }

                let _ = writeln!(out);
                let _ = writeln!(out, "Recycling: {}", data.recycling.recommendations);
                let _ = writeln!(
                    out,
                    "Environmental impact: {}",
                    data.recycling.environmental_impact
                );
            }
            ClassificationResult::Failure { kind, error } => {
                let _ = writeln!(out, "❌ Could not classify {} ({} error)", self.file_name, kind);
                let _ = writeln!(out, "   {}", error);
            }
        }

        let _ = write!(
            out,
            "\n({} at {})",
            self.model,
            self.classified_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        out
    }
}

impl OutputFormat {
    pub fn render(self, report: &ClassificationReport) -> String {
        match self {
            Self::Text => report.render_text(),
            Self::Json => report.to_json().unwrap_or_else(|e| {
                tracing::error!("❌ Could not serialize report: {}", e);
                report.render_text()
            }),
        }
    }
}

fn describe_primary(primary: &Candidate) -> String {
    match &primary.image {
        Some(glyph) if !glyph.is_empty() => format!(
            "{} {} ({}% confidence)",
            glyph,
            display_category(primary),
            primary.confidence
        ),
        _ => format!(
            "{} ({}% confidence)",
            display_category(primary),
            primary.confidence
        ),
    }
}

fn display_category(candidate: &Candidate) -> &str {
    if candidate.category.is_empty() {
        "(unnamed)"
    } else {
        &candidate.category
    }
}

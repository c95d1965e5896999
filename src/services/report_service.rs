use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::models::quiz_response::QuizResponse;
use crate::models::tier::Tier;
use crate::services::projection_service::{project_response, TierProjection};
use crate::utils::time::{file_stamp, now, report_date};

pub const REPORT_TITLE: &str = "Seven Frequencies Report";

#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    pub tier: Tier,
    /// Admin "preview as tier" rendering; marks every page.
    pub preview: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub title: String,
    pub participant: String,
    pub response_id: String,
    pub generated_at: DateTime<Utc>,
    pub tier: Tier,
    pub preview: bool,
    pub pages: Vec<ReportPage>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportPage {
    Cover {
        participant: String,
        completed_on: String,
        tier_name: String,
    },
    Summary {
        bars: Vec<ScoreBar>,
    },
    Frequency {
        rank: usize,
        name: String,
        score: f64,
        description: Option<String>,
    },
    Upgrade {
        locked: usize,
        offers: Vec<UpgradeOffer>,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBar {
    pub name: String,
    pub score: f64,
    pub percent_of_top: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeOffer {
    pub tier: Tier,
    pub name: String,
    pub price: String,
    pub features: Vec<String>,
}

pub struct ReportService;

impl ReportService {
    /// Lays out a report for an already projected result.
    pub fn render(
        response: &QuizResponse,
        projection: &TierProjection,
        options: ReportOptions,
    ) -> Report {
        let participant = response.full_name();
        let mut pages = Vec::with_capacity(projection.frequencies.len() + 3);

        pages.push(ReportPage::Cover {
            participant: participant.clone(),
            completed_on: report_date(response.created_on),
            tier_name: options.tier.pricing().name.to_string(),
        });

        let top = projection.frequencies.first().map(|f| f.value).unwrap_or(0.0);
        let bars = projection
            .frequencies
            .iter()
            .map(|f| ScoreBar {
                name: f.name.clone(),
                score: f.value,
                percent_of_top: if top > 0.0 {
                    (f.value / top * 1000.0).round() / 10.0
                } else {
                    0.0
                },
            })
            .collect();
        pages.push(ReportPage::Summary { bars });

        for (idx, frequency) in projection.frequencies.iter().enumerate() {
            pages.push(ReportPage::Frequency {
                rank: idx + 1,
                name: frequency.name.clone(),
                score: frequency.value,
                description: frequency.description.clone(),
            });
        }

        if !options.tier.is_max() {
            let offers = options
                .tier
                .upgrades()
                .map(|tier| {
                    let pricing = tier.pricing();
                    UpgradeOffer {
                        tier,
                        name: pricing.name.to_string(),
                        price: pricing.price_display(),
                        features: pricing.features.iter().map(|f| f.to_string()).collect(),
                    }
                })
                .collect();
            pages.push(ReportPage::Upgrade {
                locked: projection.hidden.len(),
                offers,
            });
        }

        let title = if options.preview {
            format!("{} (Preview: Tier {})", REPORT_TITLE, options.tier)
        } else {
            REPORT_TITLE.to_string()
        };

        Report {
            id: Uuid::new_v4(),
            title,
            participant,
            response_id: response.id.clone(),
            generated_at: now(),
            tier: options.tier,
            preview: options.preview,
            pages,
        }
    }

    /// Projects `response` at `options.tier` and renders it. Fails when the
    /// response carries no scores; no partial report is produced.
    pub fn render_for_tier(response: &QuizResponse, options: ReportOptions) -> Result<Report> {
        let projection = project_response(response, options.tier)?;
        Ok(Self::render(response, &projection, options))
    }

    pub fn write_json(report: &Report, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let name: String = report
            .participant
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        let filename = format!(
            "{}_tier{}_{}{}.json",
            name,
            report.tier,
            file_stamp(report.generated_at),
            if report.preview { "_preview" } else { "" }
        );
        let path = dir.join(filename);
        fs::write(&path, serde_json::to_vec_pretty(report)?)?;
        info!(path = %path.display(), pages = report.pages.len(), "Report written");
        Ok(path)
    }
}

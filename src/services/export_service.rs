use crate::error::Result;
use crate::models::quiz_response::QuizResponse;
use crate::models::tier::Tier;
use rust_xlsxwriter::*;

pub struct ExportService;

impl ExportService {
    fn frequency_summary(response: &QuizResponse) -> String {
        match response.scores() {
            Ok(scores) if !scores.is_empty() => scores
                .ranked()
                .iter()
                .map(|f| format!("{}: {:.0}", f.name, f.value))
                .collect::<Vec<_>>()
                .join("\n"),
            _ => "—".to_string(),
        }
    }
}

impl ExportService {
    /// Generate a styled XLSX workbook from a list of quiz responses.
    pub fn generate_responses_xlsx(responses: &[QuizResponse]) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Responses")?;

        // ── Color palette ──
        let primary_color = Color::RGB(0x1E293B); // Slate 800
        let header_bg = Color::RGB(0x0F172A); // Slate 900
        let header_text = Color::White;
        let alt_row_1 = Color::RGB(0xF8FAFC); // Slate 50
        let alt_row_2 = Color::White;
        let border_color = Color::RGB(0xE2E8F0); // Slate 200

        // Tier colors
        let tier_one = Color::RGB(0x64748B); // Slate
        let tier_three = Color::RGB(0xF59E0B); // Amber
        let tier_seven = Color::RGB(0x10B981); // Emerald

        // ── Column definitions ──
        let columns = [
            ("#", 8.0),
            ("Name", 30.0),
            ("Email", 30.0),
            ("Completed", 20.0),
            ("Tier", 10.0),
            ("Top Frequency", 24.0),
            ("Top Score", 12.0),
            ("All Frequencies", 40.0),
        ];

        for (i, (_, width)) in columns.iter().enumerate() {
            worksheet.set_column_width(i as u16, *width)?;
        }

        // ── Title row ──
        let title_format = Format::new()
            .set_font_size(16)
            .set_bold()
            .set_font_color(header_text)
            .set_background_color(primary_color)
            .set_align(FormatAlign::CenterAcross)
            .set_align(FormatAlign::VerticalCenter);

        worksheet.set_row_height(0, 40)?;
        worksheet.merge_range(
            0,
            0,
            0,
            (columns.len() - 1) as u16,
            "Seven Frequencies Quiz Responses",
            &title_format,
        )?;

        // ── Subtitle row ──
        let subtitle_format = Format::new()
            .set_font_size(10)
            .set_italic()
            .set_font_color(Color::RGB(0x94A3B8))
            .set_background_color(primary_color)
            .set_align(FormatAlign::CenterAcross)
            .set_align(FormatAlign::VerticalCenter);

        worksheet.set_row_height(1, 22)?;
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M UTC").to_string();
        let subtitle_text = format!("Exported: {}  •  Responses: {}", now, responses.len());
        worksheet.merge_range(
            1,
            0,
            1,
            (columns.len() - 1) as u16,
            &subtitle_text,
            &subtitle_format,
        )?;

        // ── Header row ──
        let header_format = Format::new()
            .set_bold()
            .set_font_size(10)
            .set_font_color(header_text)
            .set_background_color(header_bg)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_text_wrap()
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);

        let header_row = 2;
        worksheet.set_row_height(header_row, 30)?;
        for (i, (name, _)) in columns.iter().enumerate() {
            worksheet.write_string_with_format(header_row, i as u16, *name, &header_format)?;
        }

        // ── Data rows ──
        let data_start_row = 3;
        for (idx, response) in responses.iter().enumerate() {
            let row = data_start_row + idx as u32;
            let bg = if idx % 2 == 0 { alt_row_1 } else { alt_row_2 };

            let base_fmt = Format::new()
                .set_font_size(10)
                .set_background_color(bg)
                .set_align(FormatAlign::VerticalCenter)
                .set_border(FormatBorder::Thin)
                .set_border_color(border_color);

            let center_fmt = base_fmt.clone().set_align(FormatAlign::Center);
            let wrap_fmt = base_fmt.clone().set_text_wrap();

            worksheet.set_row_height(row, 22)?;

            worksheet.write_number_with_format(row, 0, (idx + 1) as f64, &center_fmt)?;

            let name_fmt = base_fmt.clone().set_bold();
            worksheet.write_string_with_format(row, 1, &response.full_name(), &name_fmt)?;

            worksheet.write_string_with_format(
                row,
                2,
                response.email.as_deref().unwrap_or("—"),
                &base_fmt,
            )?;

            let completed = response.created_on.format("%Y-%m-%d %H:%M").to_string();
            worksheet.write_string_with_format(row, 3, &completed, &center_fmt)?;

            // Tier (colored)
            let tier = response.current_tier();
            let tier_color = match tier {
                Tier::One => tier_one,
                Tier::Three => tier_three,
                Tier::Seven => tier_seven,
            };
            let tier_fmt = Format::new()
                .set_font_size(10)
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(tier_color)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_border(FormatBorder::Thin)
                .set_border_color(border_color);
            worksheet.write_number_with_format(row, 4, tier.rank() as f64, &tier_fmt)?;

            // Top frequency
            let top = response.scores().ok().and_then(|s| s.top().cloned());
            match top {
                Some(top) => {
                    worksheet.write_string_with_format(row, 5, &top.name, &base_fmt)?;
                    worksheet.write_number_with_format(row, 6, top.value, &center_fmt)?;
                }
                None => {
                    worksheet.write_string_with_format(row, 5, "—", &center_fmt)?;
                    worksheet.write_string_with_format(row, 6, "—", &center_fmt)?;
                }
            }

            worksheet.write_string_with_format(
                row,
                7,
                &Self::frequency_summary(response),
                &wrap_fmt,
            )?;
        }

        // ── Summary row ──
        let total_row = data_start_row + responses.len() as u32 + 1;
        let summary_fmt = Format::new()
            .set_bold()
            .set_font_size(10)
            .set_font_color(primary_color)
            .set_background_color(Color::RGB(0xE0E7FF)) // Indigo 100
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);

        worksheet.set_row_height(total_row, 26)?;
        worksheet.merge_range(
            total_row,
            0,
            total_row,
            1,
            &format!("Total: {} responses", responses.len()),
            &summary_fmt,
        )?;

        let count_tier = |tier: Tier| responses.iter().filter(|r| r.current_tier() == tier).count();
        let tier_summary = format!(
            "Tier 1: {} | Tier 3: {} | Tier 7: {}",
            count_tier(Tier::One),
            count_tier(Tier::Three),
            count_tier(Tier::Seven)
        );
        worksheet.merge_range(total_row, 2, total_row, 4, &tier_summary, &summary_fmt)?;

        let top_scores: Vec<f64> = responses
            .iter()
            .filter_map(|r| r.scores().ok().and_then(|s| s.top().map(|f| f.value)))
            .collect();
        let avg_top = if top_scores.is_empty() {
            0.0
        } else {
            top_scores.iter().sum::<f64>() / top_scores.len() as f64
        };
        worksheet.merge_range(
            total_row,
            5,
            total_row,
            7,
            &format!("Avg. top score: {:.1}", avg_top),
            &summary_fmt,
        )?;

        // Freeze panes (header stays visible while scrolling)
        worksheet.set_freeze_panes(3, 0)?;

        worksheet.autofilter(
            2,
            0,
            (data_start_row + responses.len() as u32).saturating_sub(1).max(2),
            (columns.len() - 1) as u16,
        )?;

        let buffer = workbook.save_to_buffer()?;
        Ok(buffer)
    }
}

//! Spreadsheet comparing every scenario's answers side by side.
//!
//! Column 0 holds the scripted prompt, column `i + 1` scenario `i`. Each
//! prompt takes three rows: the reply, its citation, and JSON metadata.

use std::path::Path;

use rust_xlsxwriter::{Format, FormatAlign, Workbook};
use serde_json::json;

use super::{ScenarioReport, TestResultItem};
use crate::Result;

pub const DEFAULT_REPORT_PATH: &str = "output.xlsx";
pub const NO_CITATION: &str = "(no citation)";

const ROWS_PER_PROMPT: usize = 3;

/// Cell contents of the report, before any formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSheet {
    pub header: Vec<String>,
    /// One entry per prompt: the prompt and its three rows of cells, one
    /// cell per scenario.
    pub blocks: Vec<PromptBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBlock {
    pub prompt: String,
    pub rows: [Vec<String>; ROWS_PER_PROMPT],
}

pub fn layout(prompts: &[String], scenarios: &[ScenarioReport]) -> ReportSheet {
    let mut header = vec!["prompt".to_string()];
    header.extend((1..=scenarios.len()).map(|n| format!("response-{n}")));

    let blocks = prompts
        .iter()
        .enumerate()
        .map(|(turn, prompt)| {
            let mut rows: [Vec<String>; ROWS_PER_PROMPT] = Default::default();
            for scenario in scenarios {
                let [reply, citation, metadata] = cells(scenario, turn);
                rows[0].push(reply);
                rows[1].push(citation);
                rows[2].push(metadata);
            }
            PromptBlock {
                prompt: prompt.clone(),
                rows,
            }
        })
        .collect();

    ReportSheet { header, blocks }
}

fn cells(scenario: &ScenarioReport, turn: usize) -> [String; ROWS_PER_PROMPT] {
    if let Some(error) = &scenario.error {
        return [
            format!("error: {error}"),
            NO_CITATION.to_string(),
            json!({ "error": error }).to_string(),
        ];
    }
    match scenario.items.get(turn) {
        Some(item) => [
            item.assistant_messages.join("\n"),
            item.quote.clone().unwrap_or_else(|| NO_CITATION.to_string()),
            metadata(item),
        ],
        None => [String::new(), NO_CITATION.to_string(), "{}".to_string()],
    }
}

fn metadata(item: &TestResultItem) -> String {
    let value = json!({
        "status": item.status,
        "usage": item.usage,
        "toolCalls": item.tool_calls,
    });
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

pub fn write_report(path: &Path, sheet: &ReportSheet) -> Result<()> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let cell_format = Format::new().set_text_wrap().set_align(FormatAlign::Top);
    let prompt_format = Format::new()
        .set_text_wrap()
        .set_align(FormatAlign::VerticalCenter);

    let worksheet = workbook.add_worksheet();
    for (col, title) in sheet.header.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, title.as_str(), &header_format)?;
        worksheet.set_column_width(col as u16, if col == 0 { 30.0 } else { 60.0 })?;
    }

    for (block_index, block) in sheet.blocks.iter().enumerate() {
        let first_row = (1 + block_index * ROWS_PER_PROMPT) as u32;
        let last_row = first_row + ROWS_PER_PROMPT as u32 - 1;
        worksheet.merge_range(first_row, 0, last_row, 0, &block.prompt, &prompt_format)?;

        for (offset, row) in block.rows.iter().enumerate() {
            for (col, cell) in row.iter().enumerate() {
                worksheet.write_string_with_format(
                    first_row + offset as u32,
                    (col + 1) as u16,
                    cell.as_str(),
                    &cell_format,
                )?;
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

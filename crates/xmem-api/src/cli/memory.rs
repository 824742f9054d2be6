//! Memory CLI commands: CSV import and search.

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use uuid::Uuid;

use xmem_types::import::ImportSummary;
use xmem_types::memory::{SearchRequest, SearchResult};

use crate::state::AppState;

/// Import a CSV file for `tenant`.
///
/// # Examples
///
/// ```bash
/// xmem import notes.csv --tenant acme
/// ```
pub async fn import_csv(state: &AppState, file: &Path, tenant: &str, json: bool) -> Result<()> {
    let tenant = state.cli_tenant(tenant)?;
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let summary = state.importer.import(&tenant, bytes.as_slice()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    print_import_summary(&summary, file);
    Ok(())
}

fn print_import_summary(summary: &ImportSummary, file: &Path) {
    println!();
    println!(
        "  {} Imported {} of {} rows from {}",
        style("✓").green().bold(),
        style(summary.imported).bold(),
        summary.total_records,
        style(file.display()).cyan()
    );
    if !summary.unique_categories.is_empty() {
        println!(
            "  {} {}",
            style("Categories:").dim(),
            summary.unique_categories.join(", ")
        );
    }
    if !summary.unique_tags.is_empty() {
        println!("  {} {}", style("Tags:").dim(), summary.unique_tags.join(", "));
    }
    for failure in &summary.failed {
        println!(
            "  {} row {}: {}",
            style("✗").red(),
            failure.row,
            failure.message
        );
    }
    println!();
}

/// Search `tenant`'s memories.
pub async fn search(
    state: &AppState,
    query: &str,
    tenant: &str,
    top_k: Option<usize>,
    project: Option<Uuid>,
    tags: Vec<String>,
    json: bool,
) -> Result<()> {
    let tenant = state.cli_tenant(tenant)?;
    let request = SearchRequest {
        query_text: query.to_string(),
        top_k,
        project_id: project,
        tags,
    };
    let results = state.memory_service.search(&tenant, &request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!();
        println!("  {} No matching memories.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    println!();
    println!("{}", results_table(&results));
    println!();
    Ok(())
}

fn results_table(results: &[SearchResult]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Similarity").fg(Color::White),
        Cell::new("Content").fg(Color::White),
        Cell::new("Id").fg(Color::White),
    ]);

    for result in results {
        let content = truncate(&result.content, 60);
        table.add_row(vec![
            Cell::new(format!("{:.3}", result.similarity)).fg(Color::Yellow),
            Cell::new(content).fg(Color::White),
            Cell::new(result.id.to_string()).fg(Color::DarkGrey),
        ]);
    }
    table
}

/// Shorten to `max` characters on a char boundary.
fn truncate(text: &str, max: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= max {
        return single_line;
    }
    let cut: String = single_line.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}

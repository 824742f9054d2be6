//! `xmem stats`: collection counts for one tenant, as the operator sees
//! them (backend aggregates included).

use anyhow::Result;
use console::style;

use xmem_types::vector::StatsSource;

use crate::state::AppState;

pub async fn stats(state: &AppState, tenant: &str, json: bool) -> Result<()> {
    let tenant = state.cli_tenant(tenant)?;
    let collection = state.memory_service.operator_collection_stats(&tenant).await?;
    let path = state.memory_service.active_path()?;

    if json {
        let value = serde_json::json!({
            "tenant_id": tenant,
            "retrieval_path": path,
            "collection": collection,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let note = match collection.source {
        StatsSource::Collection => "",
        StatsSource::Aggregate => " (collection missing, summed over all collections)",
        StatsSource::Unimplemented => " (backend cannot report counts)",
        StatsSource::Unavailable => " (backend unavailable)",
    };

    println!();
    println!("  Stats for '{}'", style(&tenant).cyan().bold());
    println!();
    println!("  {} {}", style("Retrieval:").dim(), path);
    println!("  {} {}", style("Collection:").dim(), collection.collection);
    println!(
        "  {} {}{}",
        style("Vectors:").dim(),
        style(collection.vector_count).bold(),
        style(note).yellow()
    );
    println!();
    Ok(())
}

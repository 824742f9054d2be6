//! `xmem sync`: pull enabled external sources now.

use anyhow::Result;
use chrono::Utc;
use console::style;

use xmem_types::source::SyncResult;

use crate::state::AppState;

pub async fn sync(state: &AppState, tenant: Option<&str>, due_only: bool, json: bool) -> Result<()> {
    let results = match tenant {
        Some(tenant) => {
            let tenant = state.cli_tenant(tenant)?;
            state.scheduler.sync_enabled(Some(&tenant)).await?
        }
        None if due_only => state.scheduler.sync_due(Utc::now()).await?,
        None => state.scheduler.sync_enabled(None).await?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    print_results(&results);
    Ok(())
}

fn print_results(results: &[SyncResult]) {
    println!();
    if results.is_empty() {
        println!("  {} No sources to sync.", style("i").blue().bold());
        println!();
        return;
    }
    for result in results {
        let mark = if result.success {
            style("✓").green()
        } else {
            style("✗").red()
        };
        println!(
            "  {} {} {} {}",
            mark,
            style(&result.tenant_id).dim(),
            style(&result.source).cyan(),
            result.message
        );
    }
    let failed = results.iter().filter(|r| !r.success).count();
    println!();
    println!(
        "  {} synced, {} failed",
        style(results.len() - failed).bold(),
        style(failed).bold()
    );
    println!();
}

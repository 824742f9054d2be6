//! Provider CLI commands.
//!
//! Providers are built from `config.toml` at startup; this only reports
//! what the registry ended up holding.

use anyhow::Result;
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use xmem_types::provider::{ProviderInfo, ProviderRole};

use crate::state::AppState;

/// Provider subcommands.
#[derive(Subcommand)]
pub enum ProviderCommand {
    /// List registered providers per role, marking the defaults.
    List,
}

/// Handle a provider subcommand.
pub async fn handle_provider_command(
    cmd: ProviderCommand,
    state: &AppState,
    json: bool,
) -> Result<()> {
    match cmd {
        ProviderCommand::List => list(state, json),
    }
}

fn list(state: &AppState, json: bool) -> Result<()> {
    let mut providers: Vec<ProviderInfo> = state.registry.list(ProviderRole::Llm);
    providers.extend(state.registry.list(ProviderRole::Vector));

    if json {
        println!("{}", serde_json::to_string_pretty(&providers)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Role").fg(Color::White),
        Cell::new("Name").fg(Color::White),
        Cell::new("Default").fg(Color::White),
    ]);
    for info in &providers {
        let default_cell = if info.is_default {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("").fg(Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(info.role.to_string()).fg(Color::Cyan),
            Cell::new(&info.name).fg(Color::White),
            default_cell,
        ]);
    }

    println!();
    println!("{table}");
    if state.registry.default_name(ProviderRole::Vector).is_none() {
        println!(
            "  {} No vector provider configured; search scans the relational store.",
            style("i").blue().bold()
        );
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::state::test_state::test_state;

    #[tokio::test]
    async fn test_list_providers() {
        let state = test_state(true).await;
        handle_provider_command(ProviderCommand::List, &state, false)
            .await
            .unwrap();
        handle_provider_command(ProviderCommand::List, &state, true)
            .await
            .unwrap();
    }
}

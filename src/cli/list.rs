//! List command.
//!
//! Show the configured targets as a table or JSON.

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::cli::{output, Context};
use crate::core::registry::TargetHost;
use crate::error::Result;

#[derive(Tabled)]
struct Row<'a> {
    #[tabled(rename = "alias")]
    alias: &'a str,
    #[tabled(rename = "nixosconfig")]
    nixosconfig: &'a str,
    #[tabled(rename = "hostname")]
    hostname: &'a str,
    #[tabled(rename = "port")]
    port: u16,
}

impl<'a> From<&'a TargetHost> for Row<'a> {
    fn from(t: &'a TargetHost) -> Self {
        Self {
            alias: &t.alias,
            nixosconfig: &t.nixosconfig,
            hostname: &t.hostname,
            port: t.port,
        }
    }
}

/// Render the target table.
pub fn render<'a>(targets: impl IntoIterator<Item = &'a TargetHost>) -> String {
    let mut table = Table::new(targets.into_iter().map(Row::from));
    table.with(Style::rounded());
    table.to_string()
}

/// List targets.
pub fn execute(ctx: &Context, json: bool) -> Result<()> {
    if json {
        let targets: Vec<_> = ctx
            .registry
            .iter()
            .map(|t| {
                serde_json::json!({
                    "alias": t.alias,
                    "nixosconfig": t.nixosconfig,
                    "hostname": t.hostname,
                    "port": t.port,
                    "secrets": t.secrets,
                })
            })
            .collect();

        let result = serde_json::json!({
            "targets": targets,
            "count": ctx.registry.len()
        });
        output::data(&serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    output::blank();
    output::header("Current targets:");
    output::blank();
    output::data(&render(ctx.registry.iter()));
    Ok(())
}

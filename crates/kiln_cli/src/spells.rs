//! `kiln spells`: lists the registered spells.

use kiln_spells::SpellRegistry;
use serde::Serialize;

use crate::ReportFormat;

#[derive(Debug, Serialize)]
struct SpellInfo<'a> {
    name: &'a str,
    reads_only: bool,
    description: &'a str,
}

fn listing(registry: &SpellRegistry) -> Vec<SpellInfo<'_>> {
    registry
        .iter()
        .map(|spell| SpellInfo {
            name: spell.name(),
            reads_only: spell.reads_only(),
            description: spell.description(),
        })
        .collect()
}

fn render_text(spells: &[SpellInfo<'_>]) -> String {
    let width = spells.iter().map(|s| s.name.len()).max().unwrap_or(0);
    spells
        .iter()
        .map(|s| {
            let mode = if s.reads_only { "read" } else { "write" };
            format!("{:<width$}  {mode:<5}  {}\n", s.name, s.description)
        })
        .collect()
}

/// Runs the `kiln spells` command.
pub fn run(format: ReportFormat) -> Result<i32, Box<dyn std::error::Error>> {
    let registry = SpellRegistry::with_builtins();
    let spells = listing(&registry);
    match format {
        ReportFormat::Text => print!("{}", render_text(&spells)),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&spells)?),
    }
    Ok(0)
}

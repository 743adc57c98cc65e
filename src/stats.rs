//! Catalog-wide analysis: device workflows and the aggregate report.

use anyhow::Result;
use std::collections::HashMap;
use std::fmt::Write;

use crate::catalog_store::RackStore;
use crate::features::FeatureVector;

/// A device-pair workflow (an ordered adjacent pair within a chain) and how
/// widely it is used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowPattern {
    /// Bigram key, e.g. "Eq8 -> Compressor2".
    pub workflow: String,
    /// Number of racks containing the pair at least once.
    pub rack_count: u32,
    /// Total occurrences across the catalog.
    pub occurrences: u32,
    /// Up to three example rack names.
    pub examples: Vec<String>,
}

/// Device-pair workflows appearing in at least `min_racks` racks, most
/// widespread first.
pub fn common_workflows(
    records: &[(String, FeatureVector)],
    min_racks: u32,
) -> Vec<WorkflowPattern> {
    let mut by_workflow: HashMap<&str, WorkflowPattern> = HashMap::new();

    for (name, features) in records {
        for (bigram, &count) in &features.bigrams {
            let entry = by_workflow
                .entry(bigram.as_str())
                .or_insert_with(|| WorkflowPattern {
                    workflow: bigram.clone(),
                    rack_count: 0,
                    occurrences: 0,
                    examples: Vec::new(),
                });
            entry.rack_count += 1;
            entry.occurrences += count;
            if entry.examples.len() < 3 {
                entry.examples.push(name.clone());
            }
        }
    }

    let mut workflows: Vec<WorkflowPattern> = by_workflow
        .into_values()
        .filter(|w| w.rack_count >= min_racks)
        .collect();
    workflows.sort_by(|a, b| {
        b.rack_count
            .cmp(&a.rack_count)
            .then(b.occurrences.cmp(&a.occurrences))
            .then(a.workflow.cmp(&b.workflow))
    });
    workflows
}

/// Render the full catalog report: store aggregates plus workflow analysis.
pub fn render_report(store: &dyn RackStore) -> Result<String> {
    let stats = store.statistics()?;
    let records = store.get_all()?;
    let workflows = common_workflows(&records, 2);

    let mut out = String::new();
    let _ = writeln!(out, "Catalog report");
    let _ = writeln!(out, "==============");
    let _ = writeln!(out, "Racks: {}", stats.total_racks);
    let _ = writeln!(out, "Device instances: {}", stats.total_devices);

    let _ = writeln!(out, "\nMost used devices:");
    for (device_type, count) in &stats.popular_devices {
        let _ = writeln!(out, "  {:>4}  {}", count, device_type);
    }

    let _ = writeln!(out, "\nCommon device workflows (2+ racks):");
    for workflow in workflows.iter().take(10) {
        let _ = writeln!(
            out,
            "  {} ({} racks, e.g. {})",
            workflow.workflow,
            workflow.rack_count,
            workflow.examples.join(", ")
        );
    }

    let _ = writeln!(out, "\nCategories:");
    for (category, count) in &stats.categories {
        let _ = writeln!(out, "  {:>4}  {}", count, category);
    }

    let _ = writeln!(
        out,
        "\nComplexity: min {}, avg {:.1}, max {}",
        stats.complexity.minimum, stats.complexity.average, stats.complexity.maximum
    );

    if stats.total_macros > 0 {
        let empty_pct = f64::from(stats.empty_macros) / f64::from(stats.total_macros) * 100.0;
        let _ = writeln!(
            out,
            "Macros: {} total, {:.1}% unnamed",
            stats.total_macros, empty_pct
        );
        let _ = writeln!(out, "Most common macro names:");
        for (name, count) in &stats.popular_macro_names {
            let _ = writeln!(out, "  {:>4}  {}", count, name);
        }
    }

    Ok(out)
}

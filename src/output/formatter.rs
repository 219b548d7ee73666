use colored::Colorize;

use crate::launch::{LaunchAsset, LaunchOutcome, LaunchTarget};
use crate::partition::health::PartitionHealthIndex;
use crate::partition::selection::SelectionState;
use crate::partition::span::{self, string_for_span};
use crate::remote::PartitionSet;

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg.green());
}

/// Print an error message.
pub fn print_error(msg: &str) {
    println!("{} {}", "✗".red().bold(), msg.red());
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    println!("{} {}", "!".yellow().bold(), msg.yellow());
}

/// Title of the launch dialog.
pub fn dialog_title(assets: &[LaunchAsset]) -> String {
    match assets {
        [single] => format!(
            "Launch runs to materialize {}",
            single.asset_key.display_name()
        ),
        _ => format!("Launch runs to materialize {} assets", assets.len()),
    }
}

/// Label of the launch button for the current selection.
pub fn launch_button_label(launching: bool, selected: usize) -> String {
    if launching {
        "Launching...".to_string()
    } else if selected == 1 {
        "Launch 1 Run".to_string()
    } else {
        format!("Launch {}-Run Backfill", selected)
    }
}

/// Warning shown when selected partitions lack upstream materializations.
pub fn upstream_warning(state: &SelectionState) -> Option<String> {
    let spans = state.upstream_unavailable_spans();
    if spans.is_empty() {
        return None;
    }

    let ranges: Vec<String> = spans
        .iter()
        .map(|s| string_for_span(s, state.selected()))
        .collect();
    Some(format!(
        "{} cannot be materialized because upstream materializations are missing. \
         Consider materializing upstream assets or remove these partitions to avoid failures.",
        ranges.join(", ")
    ))
}

/// Notice shown when backfills are already running for the partition set.
pub fn running_backfills_notice(partition_set_name: &str, running: &[String]) -> Option<String> {
    match running {
        [] => None,
        [id] => Some(format!(
            "Backfill {} is already running for partition set '{}'.",
            id, partition_set_name
        )),
        ids => Some(format!(
            "{} backfills are already running for partition set '{}': {}.",
            ids.len(),
            partition_set_name,
            ids.join(", ")
        )),
    }
}

/// Print per-asset materialized and missing ranges.
pub fn print_health(index: &PartitionHealthIndex) {
    for (i, asset) in index.assets().iter().enumerate() {
        let keys = index.keys(i);
        let materialized = keys.iter().filter(|k| index.is_materialized(i, k)).count();
        println!(
            "{} {}",
            asset.asset_key.display_name().bold(),
            format!("({}/{} materialized)", materialized, keys.len()).dimmed()
        );

        if keys.is_empty() {
            println!("  {}", "no partitions".dimmed());
            continue;
        }

        for s in span::assemble(keys, |k| index.is_materialized(i, k)) {
            let label = string_for_span(&s, keys);
            if s.status {
                println!("  {} {}", "●".green(), label);
            } else {
                println!("  {} {}", "○".red(), label.red());
            }
        }
    }
}

/// Print what a launch would submit, without submitting it.
pub fn print_launch_plan(
    target: &LaunchTarget,
    set: Option<&PartitionSet>,
    running_backfills: &[String],
    state: &SelectionState,
) {
    println!();
    println!("{}", dialog_title(&target.assets).bold());
    println!();
    println!("  {} {}", "Job:".dimmed(), target.job_name);
    println!("  {} {}", "Repository:".dimmed(), target.repo);
    match set {
        Some(set) => println!(
            "  {} {} (mode {})",
            "Partition set:".dimmed(),
            set.name,
            set.mode
        ),
        None => println!("  {} {}", "Partition set:".dimmed(), "unresolved".yellow()),
    }
    println!("  {} {}", "Steps:".dimmed(), target.step_keys().join(", "));

    let selected = state.selected();
    let ranges = span::selection_to_range_text(selected, state.primary_keys());
    println!(
        "  {} {}",
        "Partitions:".dimmed(),
        if ranges.is_empty() { "(none)".to_string() } else { ranges }
    );
    println!();

    if let Some(warning) = upstream_warning(state) {
        print_warning(&warning);
        println!();
    }

    if let Some(notice) = set.and_then(|s| running_backfills_notice(&s.name, running_backfills)) {
        print_warning(&notice);
        println!();
    }

    println!("{}", launch_button_label(false, selected.len()).bold());
}

/// Print the outcome of a launch.
pub fn print_outcome(outcome: &LaunchOutcome) {
    match outcome {
        LaunchOutcome::SingleRunLaunched { run_id } => {
            print_success(&format!("Launched run {}", run_id))
        }
        LaunchOutcome::BackfillLaunched { backfill_id } => {
            print_success(&format!("Created backfill {}", backfill_id))
        }
        LaunchOutcome::Failed { stage, message } => {
            print_error(&format!("Launch failed ({})", stage));
            for line in message.lines() {
                println!("  {}", line);
            }
        }
    }
}

//! Plain-text rendering of board and tree views.
use chrono::NaiveDateTime;
use docflow_core::{
    CheckState, PhaseSummary, PipelineKind, RunView, StepView, TreeRow, TreeView, WorkflowPhase,
};

pub fn timestamped(line: &str, at: NaiveDateTime) -> String {
    format!("{} {}", at.format("%H:%M:%S"), line)
}

pub fn run_lines(run: &RunView) -> Vec<String> {
    let kind = match run.kind {
        PipelineKind::ScanAndIndex => "scan & index",
        PipelineKind::Analyze => "analysis",
    };
    let mut lines = vec![format!(
        "Project {} {} (run {}): {:?}, {:.0}%",
        run.project_id,
        kind,
        run.run_id,
        run.outcome,
        run.progress * 100.0
    )];
    lines.extend(run.steps.iter().map(|step| format!("  {}", step_line(step))));
    lines
}

pub fn step_line(step: &StepView) -> String {
    match &step.state {
        WorkflowPhase::Idle => format!("[ ] {}", step.label),
        WorkflowPhase::Running(_, detail) => {
            let mut line = format!("[>] {}", step.label);
            if let Some(item) = &detail.current_item {
                line.push_str(&format!(": {item}"));
                if let Some(sub) = &detail.sub_item {
                    line.push_str(&format!(" ({sub})"));
                }
            } else if !detail.message.is_empty() {
                line.push_str(&format!(": {}", detail.message));
            }
            if let Some(total) = detail.total_items {
                line.push_str(&format!(" [{}/{}]", detail.current_index, total));
            }
            if detail.failed > 0 {
                line.push_str(&format!(", {} failed", detail.failed));
            }
            line
        }
        WorkflowPhase::Complete(summary) => {
            format!("[x] {}: {}", step.label, summary_text(summary))
        }
        WorkflowPhase::Failed(error) => format!("[!] {}: {}", step.label, error.message),
        WorkflowPhase::Cancelled => format!("[-] {}: cancelled", step.label),
    }
}

pub fn summary_text(summary: &PhaseSummary) -> String {
    match summary {
        PhaseSummary::Scan(scan) => {
            let mut text = format!(
                "{} found, {} added, {} updated, {} removed",
                scan.files_found, scan.files_added, scan.files_updated, scan.files_removed
            );
            if scan.failed > 0 {
                text.push_str(&format!(", {} failed", scan.failed));
            }
            text
        }
        PhaseSummary::Index(index) if index.failed == 0 => format!(
            "{} files indexed, {} chunks",
            index.files_indexed, index.chunks_created
        ),
        PhaseSummary::Index(index) => format!(
            "{} files indexed, {} chunks, {} errors",
            index.files_indexed,
            index.chunks_created,
            index.failed
        ),
        PhaseSummary::Analysis(analysis) => format!(
            "{}/{} analyzed, {} failed",
            analysis.completed, analysis.total, analysis.failed
        ),
        PhaseSummary::Items { completed, failed } => {
            format!("{completed} done, {failed} failed")
        }
        PhaseSummary::Skipped => "skipped".to_string(),
    }
}

pub fn tree_lines(view: &TreeView) -> Vec<String> {
    match view {
        TreeView::Nested(rows) => rows.iter().map(tree_row).collect(),
        TreeView::Flat(hits) => hits
            .iter()
            .map(|hit| {
                format!(
                    "{} {} ({})",
                    check_mark(hit.selected),
                    hit.path,
                    format_size(hit.size)
                )
            })
            .collect(),
    }
}

fn tree_row(row: &TreeRow) -> String {
    match row {
        TreeRow::Folder {
            name,
            depth,
            expanded,
            rollup,
            ..
        } => {
            let mark = match rollup.check_state() {
                CheckState::Unchecked => "[ ]",
                CheckState::Mixed => "[~]",
                CheckState::Checked => "[x]",
            };
            let arrow = if *expanded { 'v' } else { '>' };
            format!(
                "{}{} {} {}/ ({}/{})",
                indent(*depth),
                arrow,
                mark,
                name,
                rollup.selected,
                rollup.total
            )
        }
        TreeRow::File {
            name,
            depth,
            size,
            selected,
            ..
        } => format!(
            "{}  {} {} ({})",
            indent(*depth),
            check_mark(*selected),
            name,
            format_size(*size)
        ),
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

fn check_mark(selected: bool) -> &'static str {
    if selected {
        "[x]"
    } else {
        "[ ]"
    }
}

pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let value = bytes as f64;
    if value < KB {
        format!("{bytes} B")
    } else if value < KB * KB {
        format!("{:.1} KB", value / KB)
    } else {
        format!("{:.1} MB", value / (KB * KB))
    }
}

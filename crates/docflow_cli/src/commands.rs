use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use docflow_core::{
    AnalysisWizard, PipelineInput, ProjectId, RefineRequest, RefineStatus, RunOutcome,
    SelectionTree,
};
use docflow_engine::{ApiClient, ClientSettings, Coordinator};
use docflow_logging::{flow_debug, flow_info};
use tokio::runtime::Runtime;

use crate::cli::{
    AnalyzeCommand, Cli, Command, RefineCommand, ScanCommand, SpecsCommand, StatsCommand,
};
use crate::config;
use crate::interrupt::Interrupt;
use crate::logging::init_logging;
use crate::render::{run_lines, step_line, timestamped, tree_lines};

const POLL: Duration = Duration::from_millis(200);

pub fn run(cli: Cli) -> Result<()> {
    let config = config::load(cli.config.as_deref())?;
    init_logging(&config.log);
    let mut settings = config.server.to_settings();
    if let Some(base_url) = cli.server {
        settings.base_url = base_url;
    }
    flow_info!("Using server {}", settings.base_url);

    let runtime = Runtime::new().context("failed to start the async runtime")?;
    match cli.command {
        Command::Scan(cmd) => scan(&runtime, settings, cmd),
        Command::Analyze(cmd) => analyze(&runtime, settings, cmd),
        Command::Refine(cmd) => refine(&runtime, settings, cmd),
        Command::Specs(cmd) => specs(&runtime, settings, cmd),
        Command::Stats(cmd) => stats(&runtime, settings, cmd),
    }
}

fn scan(runtime: &Runtime, settings: ClientSettings, cmd: ScanCommand) -> Result<()> {
    let mut coordinator = Coordinator::connect(settings, runtime.handle().clone())?;
    coordinator.start(
        cmd.project,
        PipelineInput::ScanAndIndex {
            parse_content: !cmd.no_parse,
            force_reindex: cmd.force_reindex,
            skip_index: cmd.skip_index,
        },
    );
    follow(&mut coordinator, cmd.project, &Interrupt::listen(runtime.handle()))
}

fn analyze(runtime: &Runtime, settings: ClientSettings, cmd: AnalyzeCommand) -> Result<()> {
    let api = ApiClient::new(settings.clone())?;
    let mut wizard = AnalysisWizard::new(cmd.project);
    wizard.set_documents(cmd.documents.clone())?;

    let documents = wizard.request_suggestions()?;
    match runtime.block_on(api.suggest_specs(cmd.project, &documents)) {
        Ok(suggestions) => wizard.suggestions_loaded(suggestions),
        Err(err) => {
            wizard.suggestions_failed(err.to_string());
            bail!("could not load spec suggestions: {err}");
        }
    }

    if !cmd.specs.is_empty() || !cmd.folders.is_empty() {
        let catalog = runtime.block_on(api.spec_tree(cmd.project))?;
        wizard.load_catalog(catalog);
        for document in &cmd.documents {
            let tree = wizard.selection_mut(*document)?;
            tree.clear();
            for spec in &cmd.specs {
                if !tree.is_selected(spec) && !tree.toggle_file(spec) {
                    bail!("unknown spec path '{spec}'");
                }
            }
            for folder in &cmd.folders {
                tree.toggle_folder(folder, true);
            }
        }
    }
    for document in &cmd.documents {
        let count = wizard
            .selection(*document)
            .map_or(0, SelectionTree::selected_count);
        println!("Document {document}: {count} specs selected");
    }

    let input = wizard.start_analysis()?;
    let mut coordinator = Coordinator::connect(settings, runtime.handle().clone())?;
    coordinator.start(cmd.project, input);
    let outcome = follow(
        &mut coordinator,
        cmd.project,
        &Interrupt::listen(runtime.handle()),
    );
    wizard.finish();
    outcome
}

fn refine(runtime: &Runtime, settings: ClientSettings, cmd: RefineCommand) -> Result<()> {
    let mut coordinator = Coordinator::connect(settings, runtime.handle().clone())?;
    coordinator.refine(RefineRequest {
        project_id: cmd.project,
        result_id: cmd.result,
        spec_paths: cmd.specs,
        instruction: cmd.instruction,
    });
    println!("Refining result {}...", cmd.result);
    loop {
        match coordinator.take_settled_refine(cmd.result) {
            Some(RefineStatus::Done) => {
                println!("Result {} refined", cmd.result);
                return Ok(());
            }
            Some(RefineStatus::Failed(message)) => bail!("refine failed: {message}"),
            Some(RefineStatus::Rejected(err)) => bail!("refine refused: {err}"),
            Some(RefineStatus::Pending) => {}
            None if coordinator.board().refine_status(cmd.result).is_none() => {
                bail!("refine for result {} was never recorded", cmd.result)
            }
            None => {}
        }
        coordinator.pump_timeout(POLL);
    }
}

fn specs(runtime: &Runtime, settings: ClientSettings, cmd: SpecsCommand) -> Result<()> {
    let api = ApiClient::new(settings)?;
    let catalog = runtime.block_on(api.spec_tree(cmd.project))?;
    let mut tree = match cmd.document {
        Some(document) => {
            let suggestions = runtime.block_on(api.suggest_specs(cmd.project, &[document]))?;
            let catalog = catalog.with_files(suggestions.spec_files());
            SelectionTree::with_selection(Arc::new(catalog), suggestions.seed_for(document))
        }
        None => SelectionTree::new(Arc::new(catalog)),
    };
    tree.expand_all();
    for line in tree_lines(&tree.filter(&cmd.filter)) {
        println!("{line}");
    }
    println!(
        "{} files, {} selected",
        tree.catalog().len(),
        tree.selected_count()
    );
    Ok(())
}

fn stats(runtime: &Runtime, settings: ClientSettings, cmd: StatsCommand) -> Result<()> {
    let api = ApiClient::new(settings)?;
    let project = runtime.block_on(api.get_project(cmd.project))?;
    let kb = runtime.block_on(api.knowledge_base_stats(cmd.project))?;

    println!("{} (#{})", project.project.name, project.project.id);
    println!("  RFI folder:   {}", project.project.rfi_folder_path);
    println!("  Specs folder: {}", project.project.specs_folder_path);
    match project.project.last_scanned {
        Some(at) => println!("  Last scanned: {}", at.format("%Y-%m-%d %H:%M")),
        None => println!("  Last scanned: never"),
    }
    println!(
        "  Files: {} total, {} RFIs, {} submittals, {} specs, {} drawings",
        project.total_files,
        project.rfi_count,
        project.submittal_count,
        project.spec_count,
        project.drawing_count
    );
    println!("  Results: {}", project.result_count);
    let indexed = match kb.last_indexed {
        Some(at) => format!("indexed {}", at.format("%Y-%m-%d %H:%M")),
        None if kb.indexed => "indexed".to_string(),
        None => "not indexed".to_string(),
    };
    println!(
        "  Knowledge base: {indexed}, {} chunks{}",
        kb.document_count,
        kb.embedding_model
            .map(|model| format!(" ({model})"))
            .unwrap_or_default()
    );
    Ok(())
}

/// Prints step changes until the project's run settles.
fn follow(
    coordinator: &mut Coordinator,
    project: ProjectId,
    interrupt: &Interrupt,
) -> Result<()> {
    if let Some(err) = coordinator.board().rejection(project) {
        bail!("{err}");
    }
    let mut last_line = String::new();
    loop {
        if interrupt.take() {
            println!("Cancelling...");
            flow_info!("Cancelling pipeline for project {}", project);
            coordinator.cancel(project);
        }
        coordinator.pump_timeout(POLL);
        if let Some(view) = coordinator.take_view_if_dirty() {
            let run = view
                .run(project)
                .ok_or_else(|| anyhow!("run for project {project} disappeared"))?;
            if let Some(step) = run.steps.iter().find(|step| step.state.is_running()) {
                let line = step_line(step);
                if line != last_line {
                    println!("{}", timestamped(&line, Local::now().naive_local()));
                    last_line = line;
                }
            }
        }

        let Some(run) = coordinator.board().run(project) else {
            bail!("run for project {project} disappeared");
        };
        if run.is_active() {
            continue;
        }
        let outcome = run.outcome();
        flow_debug!("Run {} settled as {:?}", run.id(), outcome);
        if let Some(run) = coordinator.board().view().run(project) {
            for line in run_lines(run) {
                println!("{line}");
            }
        }
        return match outcome {
            RunOutcome::Failed => Err(anyhow!("pipeline failed")),
            RunOutcome::Cancelled => Err(anyhow!("pipeline cancelled")),
            RunOutcome::Complete | RunOutcome::Active => Ok(()),
        };
    }
}

use crate::{Board, Effect, Msg};

/// Pure update function: applies a message to the board and returns any effects.
pub fn update(mut board: Board, msg: Msg) -> (Board, Vec<Effect>) {
    let effects = match msg {
        Msg::StartPipeline { project_id, input } => {
            // Validation failures never touch a running workflow.
            if let Err(err) = input.validate() {
                board.reject(project_id, err);
                return (board, Vec::new());
            }
            board.start_run(project_id, input)
        }
        Msg::PhaseEvent {
            run_id,
            phase_index,
            event,
        } => board.apply_phase_event(run_id, phase_index, &event),
        Msg::CancelClicked { project_id } => board
            .cancel_run(project_id)
            .map(|run_id| vec![Effect::CloseStream { run_id }])
            .unwrap_or_default(),
        Msg::ViewClosed { project_id } => board
            .discard_run(project_id)
            .map(|run_id| vec![Effect::CloseStream { run_id }])
            .unwrap_or_default(),
        Msg::RefineRequested(request) => {
            if board.begin_refine(&request) {
                vec![Effect::Refine(request)]
            } else {
                Vec::new()
            }
        }
        Msg::RefineSettled { result_id, outcome } => board.settle_refine(result_id, outcome),
        Msg::NoOp => Vec::new(),
    };

    (board, effects)
}

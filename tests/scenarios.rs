//! End-to-end runs through the public API: the worked cabinet-shop scenarios.

use std::sync::mpsc;
use std::time::Duration;

use panel_cut::{
    OptimizationController, OptimizationRun, OptimizeOptions, Piece, RunOutcome, RunState,
    RunStatus, Sheet, UnplaceableReason,
};

fn plywood() -> Sheet {
    Sheet::new(1220, 2440, 4)
}

fn workshop_order() -> Vec<Piece> {
    vec![
        Piece::new("carcass-side", 580, 720, 8),
        Piece::new("shelf", 564, 300, 12),
        Piece::new("door", 396, 716, 8).with_rotation(false),
        Piece::new("drawer-front", 396, 176, 16),
        Piece::new("back", 1200, 720, 4),
        Piece::new("kick", 1100, 100, 6),
    ]
}

#[test]
fn two_small_pieces_share_one_sheet() {
    let result = OptimizationController::default()
        .optimize(&plywood(), &[Piece::new("panel", 400, 500, 2)])
        .unwrap();

    assert_eq!(result.meta.status, RunStatus::Completed);
    assert_eq!(result.placed_pieces.len(), 2);
    assert!(result.placed_pieces.iter().all(|p| p.sheet_index == 0));
    assert_eq!(result.sheet_count(), 1);
    assert_eq!(result.stats.len(), 1);

    // 2 * 400 * 500 over 1220 * 2440
    let expected = 400_000.0 / 2_976_800.0 * 100.0;
    assert!((result.stats[0].efficiency - expected).abs() < 1e-6);
    assert_eq!(result.stats[0].waste_area, 2_976_800 - 400_000);
}

#[test]
fn piece_longer_than_the_sheet_is_reported() {
    let result = OptimizationController::default()
        .optimize(&plywood(), &[Piece::new("beam", 3000, 100, 1)])
        .unwrap();

    assert_eq!(result.meta.status, RunStatus::Completed);
    assert!(result.placed_pieces.is_empty());
    assert_eq!(result.unplaceable.len(), 1);
    assert_eq!(result.unplaceable[0].piece_id, "beam");
    assert_eq!(result.unplaceable[0].reason, UnplaceableReason::ExceedsSheet);
    assert!(!result.meta.time_limited);
}

#[test]
fn oversized_piece_does_not_block_the_rest() {
    let mut pieces = workshop_order();
    pieces.push(Piece::new("beam", 3000, 100, 1));
    let result = OptimizationController::new(OptimizeOptions::new().with_max_passes(3))
        .optimize(&plywood(), &pieces)
        .unwrap();

    assert_eq!(result.unplaceable_for(UnplaceableReason::ExceedsSheet), 1);
    assert_eq!(result.placed_pieces.len(), 54);
}

#[test]
fn zero_budget_truncates_instead_of_failing() {
    let options = OptimizeOptions::new().with_time_limit_ms(0);
    let result = OptimizationController::new(options)
        .optimize(&plywood(), &workshop_order())
        .unwrap();

    assert_eq!(result.meta.status, RunStatus::Completed);
    assert!(result.meta.time_limited);
    assert_eq!(result.unplaceable_for(UnplaceableReason::ExceedsSheet), 0);
    assert!(result.unplaceable_for(UnplaceableReason::TimeLimit) > 0);
    assert_eq!(result.placed_pieces.len() + result.unplaceable.len(), 54);
}

#[test]
fn cancelled_before_start_settles_as_cancelled() {
    let run = OptimizationRun::new(&plywood(), &workshop_order(), OptimizeOptions::new()).unwrap();
    run.cancel();
    let result = run.execute(|_, _| {}).unwrap();

    assert_eq!(result.meta.status, RunStatus::Cancelled);
    assert_eq!(result.meta.passes_completed, 0);
    assert_eq!(result.unplaceable_for(UnplaceableReason::Cancelled), 54);
    assert!(result.stats.is_empty());
}

#[test]
fn cancel_after_start_delivers_one_final_result() {
    // One 60x60 block per 100x100 sheet: the first pass is long and the search
    // never stops early on the area bound.
    let blocks = [Piece::new("block", 60, 60, 5000).with_rotation(false)];
    let (tx, rx) = mpsc::channel();
    let handle = panel_cut::run(
        &Sheet::new(100, 100, 0),
        &blocks,
        60_000,
        |_, _| {},
        move |outcome: &RunOutcome| {
            let _ = tx.send(outcome.clone());
        },
    )
    .unwrap();
    panel_cut::cancel(&handle);

    let delivered = rx
        .recv_timeout(Duration::from_secs(60))
        .unwrap()
        .unwrap();
    let joined = handle.join().unwrap();
    assert_eq!(delivered, joined);
    assert!(rx.try_recv().is_err());

    assert_eq!(joined.meta.status, RunStatus::Cancelled);
    assert_eq!(joined.meta.passes_completed, 0);
    assert!(!joined.meta.time_limited);
    assert!(joined.unplaceable_for(UnplaceableReason::Cancelled) > 0);
    assert_eq!(joined.placed_pieces.len() + joined.unplaceable.len(), 5000);
}

#[test]
fn handle_reaches_terminal_state() {
    let (tx, rx) = mpsc::channel();
    let handle = OptimizationController::new(OptimizeOptions::new().with_max_passes(2))
        .start(
            &plywood(),
            &workshop_order(),
            |_, _| {},
            move |_| {
                let _ = tx.send(());
            },
        )
        .unwrap();
    rx.recv_timeout(Duration::from_secs(30)).unwrap();
    let result = handle.join().unwrap();
    assert_eq!(result.meta.status, RunStatus::Completed);
    assert!(result.meta.passes_completed >= 1);
}

#[test]
fn validation_rejects_before_running() {
    let err = OptimizationRun::new(
        &plywood(),
        &[Piece::new("a", 100, 100, 1), Piece::new("a", 200, 200, 1)],
        OptimizeOptions::new(),
    )
    .unwrap_err();
    assert_eq!(err.piece_id(), Some("a"));

    let err = OptimizationController::default()
        .optimize(&Sheet::new(0, 2440, 4), &workshop_order())
        .unwrap_err();
    assert!(matches!(err, panel_cut::OptimizeError::Validation(_)));
}

#[test]
fn new_run_starts_idle() {
    let run = OptimizationRun::new(&plywood(), &workshop_order(), OptimizeOptions::new()).unwrap();
    assert_eq!(run.state(), RunState::Idle);
}

#[test]
fn result_serializes_for_clients() {
    let result = OptimizationController::new(OptimizeOptions::new().with_max_passes(1))
        .optimize(&plywood(), &[Piece::new("panel", 400, 500, 1)])
        .unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["meta"]["status"], "completed");
    assert_eq!(json["placed_pieces"][0]["piece_id"], "panel");
    assert_eq!(json["placed_pieces"][0]["sheet_index"], 0);
    assert!(json["stats"][0]["efficiency"].as_f64().is_some());
}

#[test]
fn request_pieces_accept_float_dimensions() {
    let pieces: Vec<Piece> = serde_json::from_str(
        r#"[{"id": "a", "width": 400.0, "height": 500, "quantity": 2, "can_rotate": false}]"#,
    )
    .unwrap();
    assert_eq!(pieces[0].width, 400);
    assert_eq!(pieces[0].quantity, 2);
    assert!(!pieces[0].can_rotate);

    let bad = serde_json::from_str::<Vec<Piece>>(r#"[{"id": "a", "width": 1.5, "height": 5}]"#);
    assert!(bad.is_err());
}

//! End-to-end editor flows: brush → AOI → derived views, with undo/redo.

use gv_core::{AoiId, ImageId, ImageSize, PersonId, parse_fixation_table};
use gv_editor::input::InputEvent;
use gv_editor::views::ViewStatus;
use gv_editor::{EditorConfig, EditorError, EditorSession, ViewKind};
use pretty_assertions::assert_eq;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn session() -> EditorSession {
    init_logging();
    let dataset = parse_fixation_table(include_str!("fixtures/session.tsv")).unwrap();
    let mut session = EditorSession::new(dataset, EditorConfig::default());
    session
        .select_image(Some(ImageId::intern("hall.jpg")))
        .unwrap();
    session
}

fn drag(session: &mut EditorSession, from: (f32, f32), to: (f32, f32)) {
    session.handle_input(&InputEvent::down(from.0, from.1));
    session.handle_input(&InputEvent::PointerMove { x: to.0, y: to.1 });
    session.handle_input(&InputEvent::PointerUp { x: to.0, y: to.1 });
}

fn draw(session: &mut EditorSession, from: (f32, f32), to: (f32, f32)) -> AoiId {
    drag(session, from, to);
    session.add_aoi().unwrap().expect("selection is large enough")
}

fn aoi_ids(session: &EditorSession) -> Vec<u32> {
    session
        .context()
        .list_aois()
        .iter()
        .map(|a| a.id.0)
        .collect()
}

fn matrix(session: &mut EditorSession) -> Vec<Vec<u32>> {
    assert_eq!(session.refresh_transition_graph(), &ViewStatus::Rendered);
    session.transition_graph().unwrap().graph.matrix.clone()
}

#[test]
fn brushed_aois_drive_the_graph() {
    let mut s = session();
    assert_eq!(draw(&mut s, (0.0, 0.0), (100.0, 100.0)), AoiId(1));
    assert_eq!(draw(&mut s, (200.0, 200.0), (300.0, 300.0)), AoiId(2));

    assert_eq!(matrix(&mut s), vec![vec![0, 1], vec![2, 0]]);

    s.context_mut().toggle_user(PersonId::intern("Q"), false);
    assert_eq!(matrix(&mut s), vec![vec![0, 1], vec![1, 0]]);
}

#[test]
fn graph_status_follows_image_and_aois() {
    let mut s = session();
    assert_eq!(s.refresh_transition_graph(), &ViewStatus::NoAois);
    assert!(s.transition_graph().is_none());

    s.select_image(None).unwrap();
    assert_eq!(s.refresh_transition_graph(), &ViewStatus::Idle);
}

#[test]
fn small_brush_is_not_an_aoi() {
    let mut s = session();
    drag(&mut s, (0.0, 0.0), (40.0, 400.0));
    assert!(!s.brush().can_add_aoi());
    assert_eq!(s.add_aoi().unwrap(), None);
    assert!(s.context().list_aois().is_empty());
}

#[test]
fn brush_highlights_points() {
    let mut s = session();
    drag(&mut s, (0.0, 0.0), (100.0, 100.0));
    assert_eq!(s.selected_points().unwrap().len(), 3);
    s.clear_brush();
    assert!(s.brush_selection().is_none());
    assert!(s.selected_points().unwrap().is_empty());
}

#[test]
fn overlapping_aois_mark_points_once() {
    let mut s = session();
    assert!(s.points_under_aois().is_empty());

    draw(&mut s, (0.0, 0.0), (100.0, 100.0));
    draw(&mut s, (40.0, 40.0), (150.0, 150.0));
    assert_eq!(s.points_under_aois().len(), 3);

    draw(&mut s, (200.0, 200.0), (300.0, 300.0));
    assert_eq!(s.points_under_aois().len(), 5);

    s.select_image(None).unwrap();
    assert!(s.points_under_aois().is_empty());
}

#[test]
fn bad_image_size_is_replaced_by_default() {
    let mut s = session();
    s.set_image_size(ImageSize {
        width: f32::NAN,
        height: -1.0,
    });
    assert_eq!(s.context().image_size(), ImageSize::default());
    drag(&mut s, (0.0, 0.0), (5000.0, 100.0));
    assert_eq!(
        s.brush_selection().map(|b| b.x1),
        Some(ImageSize::default().width + 100.0)
    );
    assert_eq!(s.refresh_attention_map(), &ViewStatus::Rendered);
}

#[test]
fn delete_at_and_undo_restore_same_id() {
    let mut s = session();
    draw(&mut s, (0.0, 0.0), (100.0, 100.0));
    draw(&mut s, (200.0, 200.0), (300.0, 300.0));

    assert_eq!(s.delete_aoi_at(250.0, 250.0).unwrap(), Some(AoiId(2)));
    assert_eq!(s.delete_aoi_at(900.0, 900.0).unwrap(), None);
    assert_eq!(aoi_ids(&s), vec![1]);
    assert_eq!(matrix(&mut s), vec![vec![0]]);

    assert_eq!(s.undo().unwrap().as_deref(), Some("delete AOI"));
    assert_eq!(aoi_ids(&s), vec![1, 2]);
    assert_eq!(matrix(&mut s), vec![vec![0, 1], vec![2, 0]]);

    s.redo().unwrap();
    assert_eq!(aoi_ids(&s), vec![1]);
}

#[test]
fn clear_all_then_undo() {
    let mut s = session();
    draw(&mut s, (0.0, 0.0), (100.0, 100.0));
    draw(&mut s, (200.0, 200.0), (300.0, 300.0));
    s.clear_aois().unwrap();
    assert_eq!(s.refresh_transition_graph(), &ViewStatus::NoAois);
    s.undo().unwrap();
    assert_eq!(aoi_ids(&s), vec![1, 2]);
}

#[test]
fn registries_are_per_image() {
    let mut s = session();
    draw(&mut s, (0.0, 0.0), (100.0, 100.0));

    s.select_image(Some(ImageId::intern("garden.jpg"))).unwrap();
    assert!(s.context().list_aois().is_empty());
    assert!(!s.can_undo());

    s.select_image(Some(ImageId::intern("hall.jpg"))).unwrap();
    assert_eq!(aoi_ids(&s), vec![1]);
}

#[test]
fn unknown_image_is_rejected() {
    let mut s = session();
    let err = s
        .select_image(Some(ImageId::intern("nowhere.jpg")))
        .unwrap_err();
    assert!(matches!(err, EditorError::Core(_)));
    assert_eq!(s.context().image(), Some(ImageId::intern("hall.jpg")));
}

#[test]
fn add_aoi_without_image() {
    let mut s = session();
    s.select_image(None).unwrap();
    drag(&mut s, (0.0, 0.0), (100.0, 100.0));
    assert!(matches!(s.add_aoi(), Err(EditorError::NoImage)));
}

#[test]
fn attention_map_is_restricted_to_aois() {
    let mut s = session();
    assert_eq!(s.refresh_attention_map(), &ViewStatus::Rendered);
    let grid = s.attention_map().unwrap();
    assert!(grid.value_at(250.0, 250.0).unwrap() > 0.0);

    draw(&mut s, (0.0, 0.0), (100.0, 100.0));
    assert_eq!(s.refresh_attention_map(), &ViewStatus::Rendered);
    let grid = s.attention_map().unwrap();
    assert_eq!(grid.value_at(250.0, 250.0), Some(0.0));
    assert!(grid.value_at(50.0, 50.0).unwrap() > 0.0);
}

#[test]
fn layout_ticks_until_cool() {
    let mut s = session();
    draw(&mut s, (0.0, 0.0), (100.0, 100.0));
    draw(&mut s, (200.0, 200.0), (300.0, 300.0));
    s.refresh_transition_graph();

    s.pin_node(0, 10.0, 10.0);
    s.tick_layout();
    let scene = s.transition_graph().unwrap();
    assert_eq!(scene.layout.positions()[0], (10.0, 10.0));

    s.unpin_node(0);
    let mut ticks = 0;
    while s.tick_layout() {
        ticks += 1;
        assert!(ticks < 10_000);
    }
    assert!(!s.transition_graph().unwrap().layout.is_running());
}

#[test]
fn acknowledge_without_error_is_noop() {
    let mut s = session();
    s.refresh_transition_graph();
    assert_eq!(s.acknowledge(ViewKind::TransitionGraph), None);
    assert_eq!(s.refresh_transition_graph(), &ViewStatus::NoAois);
}

use std::time::{Duration, Instant};

use retro_desk::constants::{
    BREATHING_SHADOW_CLASS, FLOAT_LAYER_ID, PIXEL_WRAPPER_CLASS, SCATTERED_ATTR,
};
use retro_desk::dom::{Document, NodeId};
use retro_desk::effects::{Bitmap, RevealPhase};
use retro_desk::window::{GestureKind, PointerOutcome};
use retro_desk::{ClickDisposition, Desk, DeskConfig, Geometry, Point};

fn config() -> DeskConfig {
    DeskConfig {
        scatter_seed: Some(11),
        ..DeskConfig::default()
    }
}

fn page() -> Document {
    let mut doc = Document::new();
    let page = Geometry::new(0, 0, 1200, 900);
    doc.set_layout(doc.root(), page);
    doc.set_layout(doc.body(), page);
    doc
}

fn add_window(doc: &mut Document, parent: NodeId, rect: Geometry) -> NodeId {
    let node = doc.create_with_classes("div", &["retro-window"]);
    doc.append_child(parent, node).unwrap();
    doc.set_layout(node, rect);
    node
}

fn title_point(rect: Geometry) -> Point {
    Point::new(rect.x + 30, rect.y + 8)
}

#[test]
fn raising_the_lowest_window_moves_the_breathing_shadow() {
    let mut doc = page();
    let body = doc.body();
    let nodes: Vec<NodeId> = [(2, 0), (5, 400), (3, 800)]
        .into_iter()
        .map(|(z, x)| {
            let node = add_window(&mut doc, body, Geometry::new(x, 100, 300, 200));
            doc.set_style(node, "z-index", z.to_string());
            node
        })
        .collect();
    let mut desk = Desk::with_document(config(), doc);
    let now = Instant::now();
    desk.page_ready(now);

    let id = |desk: &Desk, node| desk.registry().id_for_node(node).unwrap();
    assert_eq!(desk.topmost(), Some(id(&desk, nodes[1])));

    // Pointer-down on the body raises without starting a gesture.
    let outcome = desk.pointer_down(Point::new(150, 250), now);
    assert_eq!(outcome, PointerOutcome::Ignored);

    let first = desk.registry().get(id(&desk, nodes[0])).unwrap().clone();
    assert_eq!(first.z_index, 6);
    assert_eq!(desk.document().style(nodes[0], "z-index"), Some("6"));
    assert!(first.has_breathing_shadow);
    for &other in &nodes[1..] {
        let handle = desk.registry().get(id(&desk, other)).unwrap();
        assert!(!handle.has_breathing_shadow);
        assert!(!desk.document().has_class(other, BREATHING_SHADOW_CLASS));
    }
    let lit = desk
        .windows()
        .iter()
        .filter(|h| h.has_breathing_shadow)
        .count();
    assert_eq!(lit, 1);
}

#[test]
fn external_z_index_changes_are_picked_up_by_the_poll() {
    let mut doc = page();
    let body = doc.body();
    let a = add_window(&mut doc, body, Geometry::new(0, 0, 300, 200));
    let b = add_window(&mut doc, body, Geometry::new(400, 0, 300, 200));
    let mut desk = Desk::with_document(config(), doc);
    let start = Instant::now();
    desk.page_ready(start);
    desk.tick(start);
    let a_id = desk.registry().id_for_node(a).unwrap();
    assert_ne!(desk.topmost(), Some(a_id));

    // Someone else bumps the z-index behind the engine's back.
    desk.document_mut().set_style(a, "z-index", "99");
    desk.tick(start + Duration::from_millis(10));
    assert!(desk.document().has_class(b, BREATHING_SHADOW_CLASS));
    desk.tick(start + desk.config().focus_poll_interval);
    assert_eq!(desk.topmost(), Some(a_id));
    assert!(desk.document().has_class(a, BREATHING_SHADOW_CLASS));
}

#[test]
fn window_put_back_after_a_detach_is_registered_again() {
    let mut doc = page();
    let body = doc.body();
    let panel = doc.create_element("section");
    doc.append_child(body, panel).unwrap();
    doc.set_layout(panel, Geometry::new(0, 0, 1200, 900));
    let rect = Geometry::new(100, 100, 300, 200);
    let window = add_window(&mut doc, panel, rect);
    let mut desk = Desk::with_document(config(), doc);
    let start = Instant::now();
    desk.page_ready(start);
    assert!(desk.registry().id_for_node(window).is_some());

    desk.document_mut().detach(panel).unwrap();
    desk.tick(start + Duration::from_millis(16));
    assert!(desk.registry().id_for_node(window).is_none());

    desk.document_mut().append_child(body, panel).unwrap();
    for frame in 2..60u64 {
        desk.tick(start + Duration::from_millis(16 * frame));
    }
    let id = desk.registry().id_for_node(window).unwrap();
    assert_eq!(desk.topmost(), Some(id));
    assert!(matches!(
        desk.pointer_down(title_point(rect), start + Duration::from_secs(1)),
        PointerOutcome::Started {
            kind: GestureKind::Drag,
            ..
        }
    ));
}

#[test]
fn second_gesture_waits_for_the_first() {
    let mut doc = page();
    let body = doc.body();
    let a_rect = Geometry::new(50, 50, 300, 200);
    let b_rect = Geometry::new(600, 50, 300, 200);
    let a = add_window(&mut doc, body, a_rect);
    let b = add_window(&mut doc, body, b_rect);
    let mut desk = Desk::with_document(config(), doc);
    let now = Instant::now();
    desk.page_ready(now);
    let a_id = desk.registry().id_for_node(a).unwrap();
    let b_id = desk.registry().id_for_node(b).unwrap();

    let start = title_point(a_rect);
    assert_eq!(
        desk.pointer_down(start, now),
        PointerOutcome::Started {
            id: a_id,
            kind: GestureKind::Drag
        }
    );
    desk.pointer_move(Point::new(start.x + 20, start.y + 20), now);
    let before_b = desk.document().layout(b);
    let b_z = desk.registry().get(b_id).unwrap().z_index;

    assert_eq!(desk.pointer_down(title_point(b_rect), now), PointerOutcome::Busy);
    assert!(desk.registry().get(a_id).unwrap().is_dragging());
    assert!(!desk.registry().get(b_id).unwrap().is_dragging());
    assert_eq!(desk.registry().get(b_id).unwrap().z_index, b_z);
    assert_eq!(desk.document().layout(b), before_b);

    assert!(matches!(
        desk.pointer_up(Point::new(start.x + 20, start.y + 20), now),
        PointerOutcome::Ended { id, click: false, .. } if id == a_id
    ));
    assert_eq!(
        desk.click(Point::new(start.x + 20, start.y + 20)),
        ClickDisposition::Suppressed
    );

    // Now B can be grabbed.
    assert!(matches!(
        desk.pointer_down(title_point(b_rect), now),
        PointerOutcome::Started { id, .. } if id == b_id
    ));
}

#[test]
fn dragging_far_off_screen_keeps_a_margin_visible() {
    let mut doc = page();
    let body = doc.body();
    let rect = Geometry::new(100, 100, 300, 200);
    let node = add_window(&mut doc, body, rect);
    let mut desk = Desk::with_document(config(), doc);
    let now = Instant::now();
    desk.page_ready(now);
    let margin = desk.config().min_visible_margin as u64;
    let bounds = Geometry::new(0, 0, 1200, 900);

    let start = title_point(rect);
    desk.pointer_down(start, now);
    for target in [
        Point::new(-5000, -5000),
        Point::new(9000, 9000),
        Point::new(-5000, 9000),
    ] {
        desk.pointer_move(target, now);
        let visible = desk.document().layout(node).intersection_area(&bounds);
        assert!(visible >= margin * margin, "only {visible}px visible at {target:?}");
    }
    desk.pointer_up(Point::new(-5000, 9000), now);
    assert!(desk.document().layout(node).intersection_area(&bounds) > 0);
}

#[test]
fn route_change_tears_down_the_float_layer() {
    let mut doc = page();
    let body = doc.body();
    let rect = Geometry::new(100, 100, 300, 200);
    let old = add_window(&mut doc, body, rect);
    let mut desk = Desk::with_document(config(), doc);
    let now = Instant::now();
    desk.page_ready(now);

    desk.pointer_down(title_point(rect), now);
    desk.pointer_move(Point::new(200, 200), now);
    assert!(desk.windows().iter().any(|h| h.is_floating));
    assert_eq!(desk.document().query_all(&format!("#{FLOAT_LAYER_ID}")).len(), 1);

    // The host swaps page content, then reports the navigation.
    let doc = desk.document_mut();
    let body = doc.body();
    for child in doc.children(body).to_vec() {
        if doc.attribute(child, "id") != Some(FLOAT_LAYER_ID) {
            doc.remove(child).unwrap();
        }
    }
    let fresh = add_window(doc, body, Geometry::new(10, 10, 300, 200));
    desk.route_changed(now);

    assert!(desk.document().query_all(&format!("#{FLOAT_LAYER_ID}")).is_empty());
    assert!(desk.windows().iter().all(|h| !h.is_floating));
    assert_eq!(desk.active_gesture(), None);
    assert!(desk.registry().id_for_node(old).is_none());
    let fresh_id = desk.registry().id_for_node(fresh).unwrap();
    assert_eq!(desk.topmost(), Some(fresh_id));
    // No stale suppression leaks into the new page.
    assert_eq!(
        desk.click(Point::new(50, 50)),
        ClickDisposition::Allowed {
            target: Some(fresh_id)
        }
    );
}

#[test]
fn scatter_runs_once_per_container() {
    let mut doc = page();
    let body = doc.body();
    let desktop = doc.create_with_classes("div", &["retro-desktop"]);
    doc.append_child(body, desktop).unwrap();
    doc.set_layout(desktop, Geometry::new(0, 0, 1200, 900));
    let windows: Vec<NodeId> = (0..4)
        .map(|i| add_window(&mut doc, desktop, Geometry::new(i * 10, i * 10, 240, 160)))
        .collect();
    let mut desk = Desk::with_document(config(), doc);
    desk.page_ready(Instant::now());
    assert!(desk.document().has_attribute(desktop, SCATTERED_ATTR));

    let placed: Vec<Geometry> = windows.iter().map(|&w| desk.document().layout(w)).collect();
    let styles: Vec<Option<String>> = windows
        .iter()
        .map(|&w| desk.document().style(w, "transform").map(str::to_string))
        .collect();
    assert_eq!(desk.reapply_scatter_effect(), 0);
    desk.route_changed(Instant::now());
    for (i, &w) in windows.iter().enumerate() {
        assert_eq!(desk.document().layout(w), placed[i]);
        assert_eq!(desk.document().style(w, "transform").map(str::to_string), styles[i]);
    }
}

#[test]
fn late_desktop_is_scattered_by_the_mutation_bridge() {
    let mut desk = Desk::with_document(config(), page());
    let now = Instant::now();
    desk.page_ready(now);

    let doc = desk.document_mut();
    let desktop = doc.create_with_classes("div", &["retro-desktop"]);
    doc.set_layout(desktop, Geometry::new(0, 0, 1200, 900));
    for i in 0..3 {
        add_window(doc, desktop, Geometry::new(i * 20, 0, 240, 160));
    }
    let body = doc.body();
    doc.append_child(body, desktop).unwrap();
    desk.tick(now + Duration::from_millis(16));

    assert_eq!(desk.registry().len(), 3);
    assert!(desk.document().has_attribute(desktop, SCATTERED_ATTR));
}

#[test]
fn pixel_reveal_restores_the_image_after_the_last_step() {
    let mut doc = page();
    let body = doc.body();
    let window = add_window(&mut doc, body, Geometry::new(0, 0, 320, 240));
    let img = doc.create_element("img");
    doc.append_child(window, img).unwrap();
    doc.set_layout(img, Geometry::new(8, 32, 128, 96));
    doc.set_style(img, "border", "1px solid");
    let before = doc.style_snapshot(img);

    let mut desk = Desk::with_document(config(), doc);
    let start = Instant::now();
    desk.page_ready(start);
    assert_eq!(desk.reveals().phase(img), Some(RevealPhase::Pending));
    assert_eq!(desk.document().query_all(&format!(".{PIXEL_WRAPPER_CLASS}")).len(), 1);
    assert_eq!(desk.document().style(img, "visibility"), Some("hidden"));

    let bitmap = Bitmap::gradient(64, 48, [0, 0, 0], [255, 255, 255]).unwrap();
    assert!(desk.image_loaded(img, bitmap, start));
    let steps = desk.reveals().steps();
    let frame = desk.config().reveal_frame;
    for step in 1..=steps {
        assert!(!desk.reveals().phase(img).unwrap().is_terminal());
        desk.tick(start + frame * step);
    }

    let doc = desk.document();
    assert_eq!(desk.reveals().phase(img), Some(RevealPhase::Done));
    assert!(doc.query_all("canvas").is_empty());
    assert!(doc.query_all(&format!(".{PIXEL_WRAPPER_CLASS}")).is_empty());
    assert_eq!(doc.parent(img), Some(window));
    assert_eq!(doc.style_snapshot(img), before);

    // A finished image is never wrapped again.
    assert_eq!(desk.reinitialize_pixel_effect(), 0);
}

#[test]
fn failed_image_falls_back_to_the_plain_image() {
    let mut doc = page();
    let body = doc.body();
    let window = add_window(&mut doc, body, Geometry::new(0, 0, 320, 240));
    let img = doc.create_element("img");
    doc.append_child(window, img).unwrap();
    let mut desk = Desk::with_document(config(), doc);
    desk.page_ready(Instant::now());

    assert!(desk.image_failed(img));
    assert_eq!(desk.reveals().phase(img), Some(RevealPhase::Failed));
    assert_eq!(desk.document().style(img, "visibility"), None);
    assert!(desk.document().query_all("canvas").is_empty());
    assert!(!desk.image_failed(img));
}

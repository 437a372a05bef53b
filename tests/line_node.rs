use std::rc::Rc;

use cgmath::{InnerSpace, Vector3, Zero};
use thickline::gfx::lines::MAX_COLOR;
use thickline::prelude::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn zigzag() -> LineGeometry {
    LineGeometry::from_points(&[
        Vector3::new(-2.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(2.0, 0.0, 0.0),
    ])
}

#[test]
fn two_default_lines_share_nothing() {
    init_logging();

    let first = Line2::new();
    let second = Line2::new();

    assert!(first.is_thick_line());
    assert!(second.is_thick_line());
    assert_eq!(first.kind().as_str(), "Line2");
    assert!(!Rc::ptr_eq(first.geometry(), second.geometry()));
    assert!(!Rc::ptr_eq(first.material(), second.material()));
    assert!(first.geometry().borrow().is_empty());
    assert!(first.material().borrow().color() <= MAX_COLOR);
}

#[test]
fn one_material_drives_many_lines() {
    init_logging();

    let material = shared(LineMaterial::new(
        LineMaterialParameters::default()
            .with_color(0xFF8800)
            .with_linewidth(3.0),
    ));
    let a = Line2::from_parts(Some(shared(zigzag())), Some(material.clone()));
    let b = Line2::from_parts(None, Some(material.clone()));

    material.borrow_mut().set_linewidth(6.0);

    assert_eq!(a.material().borrow().linewidth(), 6.0);
    assert_eq!(b.material().borrow().linewidth(), 6.0);
    assert_eq!(Rc::strong_count(&material), 3);
    assert_eq!(a.kind(), NodeKind::Line2);
}

#[test]
fn dashing_distances_follow_the_polyline() {
    init_logging();

    let line = Line2::with_geometry(shared(zigzag()));
    line.compute_line_distances();

    let geometry = line.geometry().borrow();
    let instances = geometry.instances();
    let leg = 5.0f32.sqrt();
    assert_eq!(instances.len(), 2);
    assert!((instances[0].end_distance - leg).abs() < 1e-5);
    assert!((instances[1].start_distance - leg).abs() < 1e-5);
    assert!((instances[1].end_distance - 2.0 * leg).abs() < 1e-5);
}

#[test]
fn picking_from_screen_finds_the_line() {
    init_logging();

    let camera = OrbitCamera::new(10.0, 0.0, 0.0, Vector3::zero(), 1.0);
    let material = shared(LineMaterial::new(
        LineMaterialParameters::default()
            .with_linewidth(6.0)
            .with_resolution(800.0, 800.0),
    ));

    let mut scene = Scene::new();
    let flat = LineGeometry::from_points(&[
        Vector3::new(-3.0, 0.0, 0.0),
        Vector3::new(3.0, 0.0, 0.0),
    ]);
    scene.add(Line2::from_parts(Some(shared(flat)), Some(material.clone())));
    let mut raised = Line2::from_parts(Some(shared(zigzag())), Some(material));
    raised.set_translation(Vector3::new(0.0, 2.0, 0.0));
    let raised_index = scene.add(raised);

    // center pixel looks straight down the -z axis at y = 0
    let center = Raycaster::from_screen((400.0, 400.0), (800.0, 800.0), &camera);
    let hit = scene.pick(&center).expect("center ray hits the flat line");
    assert_eq!(hit.node_index, 0);
    assert!(hit.intersection.point_on_line.magnitude() < 1e-3);

    // a pixel well above the center misses both lines
    let above = Raycaster::from_screen((400.0, 200.0), (800.0, 800.0), &camera);
    assert!(scene.pick(&above).is_none());

    // the node transform moves the bounds too
    let aabb = scene.get(raised_index).and_then(SceneNode::world_bounding_box);
    assert_eq!(aabb.map(|b| b.max.y), Some(3.0));
}

#[test]
fn kind_is_stable_across_edits() {
    init_logging();

    let mut line = Line2::new();
    line.geometry()
        .borrow_mut()
        .set_positions(&[0.0, 0.0, 0.0, 1.0, 2.0, 3.0])
        .expect("two points");
    line.material().borrow_mut().set_color(0x123456);
    line.set_geometry(shared(zigzag()));
    line.visible = false;

    assert_eq!(line.kind(), NodeKind::Line2);
    assert!(line.is_thick_line());
    assert_eq!(line.into_inner().kind(), NodeKind::LineSegments2);
}

use tex_atlas_core::prelude::*;

fn place(p: &mut BoxPacker, w: u32, h: u32) -> Option<Rect> {
    p.insert((w, h)).unwrap().map(|n| n.rect())
}

#[test]
fn full_size_item_exhausts_packer() {
    let mut p = BoxPacker::new((100, 100), 0).unwrap();
    assert_eq!(p.percentage_used(), 0.0);
    assert_eq!(place(&mut p, 100, 100), Some(Rect::new(0, 0, 100, 100)));
    assert_eq!(place(&mut p, 100, 100), None);
    assert_eq!(p.percentage_used(), 1.0);
    assert_eq!(p.len(), 1);
}

#[test]
fn two_halves_cover_the_root() {
    let mut p = BoxPacker::new((100, 100), 0).unwrap();
    assert_eq!(place(&mut p, 50, 100), Some(Rect::new(0, 0, 50, 100)));
    assert_eq!(place(&mut p, 50, 100), Some(Rect::new(50, 0, 50, 100)));
    assert_eq!(p.percentage_used(), 1.0);
    assert!(!p.can_fit((1, 1)));
}

#[test]
fn border_padding_is_charged_per_item() {
    let count = |size: u32, border: u32| {
        let mut p = BoxPacker::new((size, size), border).unwrap();
        (0..5).filter(|_| p.insert((50, 50)).unwrap().is_some()).count()
    };
    assert_eq!(count(104, 1), 4);
    assert_eq!(count(100, 0), 4);
    // 102x102 leaves no room for a second padded 52x52 column.
    assert_eq!(count(102, 1), 1);
}

#[test]
fn occupied_rect_includes_border() {
    let mut p = BoxPacker::new((64, 64), 2).unwrap();
    let node = p.insert((10, 6)).unwrap().unwrap();
    assert_eq!(node.rect().size(), Size::new(14, 10));
    assert_eq!(node.rect().inset(2), Rect::new(2, 2, 10, 6));
}

#[test]
fn best_area_fit_prefers_tighter_leaf() {
    let mut p = BoxPacker::new((100, 100), 0).unwrap();
    // Leaves after this: 60x40 at (40,0) and 100x60 at (0,40).
    assert_eq!(place(&mut p, 40, 40), Some(Rect::new(0, 0, 40, 40)));
    assert_eq!(place(&mut p, 30, 30), Some(Rect::new(40, 0, 30, 30)));
    // Too tall for anything left in the top band.
    assert_eq!(place(&mut p, 50, 50), Some(Rect::new(0, 40, 50, 50)));
}

#[test]
fn ids_and_timestamps_increase() {
    let mut p = BoxPacker::new((128, 128), 1).unwrap();
    let nodes: Vec<PackNode> = (1..=6u32).filter_map(|i| p.insert((i * 4, 8)).unwrap()).collect();
    assert_eq!(nodes.len(), 6);
    for pair in nodes.windows(2) {
        assert!(pair[0].id().unwrap() < pair[1].id().unwrap());
        assert!(pair[0].timestamp() < pair[1].timestamp());
    }
    for n in &nodes {
        let id = n.id().unwrap();
        assert_eq!(p.get_node(id), Some(n));
    }
    let occupied: Vec<_> = p.occupied().into_iter().map(|n| n.id()).collect();
    let inserted: Vec<_> = nodes.iter().map(|n| n.id()).collect();
    assert_eq!(occupied, inserted);
}

#[test]
fn can_fit_leaves_tree_untouched() {
    let mut p = BoxPacker::new((64, 64), 0).unwrap();
    p.insert((20, 20)).unwrap();
    let before = p.nodes().len();
    // Free leaves are now 44x20 at (20,0) and 64x44 at (0,20).
    assert!(p.can_fit((64, 44)));
    assert!(!p.can_fit((44, 64)));
    assert!(!p.can_fit((65, 1)));
    assert!(!p.can_fit((0, 4)));
    assert_eq!(p.nodes().len(), before);
    assert_eq!(p.len(), 1);
}

#[test]
fn find_slot_predicts_next_insert() {
    let mut p = BoxPacker::new((64, 64), 1).unwrap();
    p.insert((18, 18)).unwrap();
    let before = p.nodes().len();
    let slot = p.find_slot((28, 28)).unwrap();
    assert_eq!(slot, Some(Rect::new(0, 20, 30, 30)));
    assert_eq!(p.nodes().len(), before);
    assert_eq!(place(&mut p, 28, 28), slot);

    assert_eq!(p.find_slot((64, 64)).unwrap(), None);
    assert!(matches!(p.find_slot((3, 0)), Err(AtlasError::InvalidInput(_))));
}

#[test]
fn clear_keeps_ids_unique() {
    let mut p = BoxPacker::new((32, 32), 0).unwrap();
    let first = p.insert((32, 32)).unwrap().unwrap().id().unwrap();
    p.clear();
    assert!(p.is_empty());
    assert_eq!(p.percentage_used(), 0.0);
    assert!(p.get_node(first).is_none());
    let second = p.insert((32, 32)).unwrap().unwrap().id().unwrap();
    assert_ne!(first, second);
}

#[test]
fn rejects_invalid_dimensions() {
    assert!(matches!(
        BoxPacker::new((0, 10), 0),
        Err(AtlasError::InvalidDimensions { width: 0, height: 10 })
    ));
    assert!(matches!(
        BoxPacker::new((10, 10), 5),
        Err(AtlasError::InvalidConfig(_))
    ));
    let mut p = BoxPacker::new((10, 10), 0).unwrap();
    assert!(matches!(p.insert((0, 5)), Err(AtlasError::InvalidInput(_))));
    assert!(p.is_empty());
}

#[test]
fn stats_follow_occupied_area() {
    let mut p = BoxPacker::new((100, 100), 0).unwrap();
    p.insert((50, 100)).unwrap();
    let stats = p.stats();
    assert_eq!(stats.items, 1);
    assert_eq!(stats.used_area, 5000);
    assert_eq!(stats.total_area, 10000);
    assert_eq!(stats.wasted_area(), 5000);
    assert!((stats.occupancy - 0.5).abs() < 1e-9);
}

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tex_atlas_core::prelude::*;

fn random_sizes(seed: u64, count: usize) -> Vec<(u32, u32)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (rng.gen_range(1..=64), rng.gen_range(1..=64)))
        .collect()
}

fn pack(sizes: &[(u32, u32)], border: u32) -> (BoxPacker, Vec<Option<Rect>>) {
    let mut p = BoxPacker::new((512, 512), border).unwrap();
    let placed = sizes
        .iter()
        .map(|&s| p.insert(s).unwrap().map(|n| n.rect()))
        .collect();
    (p, placed)
}

#[test]
fn random_items_never_overlap() {
    let sizes = random_sizes(7, 300);
    let (p, placed) = pack(&sizes, 1);
    let bounds = Rect::new(0, 0, 512, 512);
    let rects: Vec<Rect> = placed.iter().flatten().copied().collect();
    assert!(rects.len() > 50, "only {} placed", rects.len());
    for (i, a) in rects.iter().enumerate() {
        assert!(bounds.contains(a));
        for b in &rects[i + 1..] {
            assert!(!a.intersects(b), "{:?} overlaps {:?}", a, b);
        }
    }
    for (size, rect) in sizes.iter().zip(&placed) {
        if let Some(r) = rect {
            assert_eq!(r.size(), Size::from(*size).padded(1));
        }
    }
    let used: u64 = rects.iter().map(|r| r.area()).sum();
    assert_eq!(p.stats().used_area, used);
}

#[test]
fn utilization_only_grows() {
    let mut p = BoxPacker::new((256, 256), 0).unwrap();
    let mut last = 0.0f32;
    for (w, h) in random_sizes(11, 200) {
        p.insert((w, h)).unwrap();
        let now = p.percentage_used();
        assert!(now >= last);
        assert!(now <= 1.0);
        last = now;
    }
}

#[test]
fn same_input_same_layout() {
    let sizes = random_sizes(99, 150);
    let (a, ra) = pack(&sizes, 2);
    let (b, rb) = pack(&sizes, 2);
    assert_eq!(ra, rb);
    assert_eq!(a.to_string(), b.to_string());
}

#[test]
fn tree_leaves_partition_the_root() {
    let (p, _) = pack(&random_sizes(3, 120), 1);
    let leaf_area: u64 = p
        .nodes()
        .into_iter()
        .filter(|n| n.is_leaf())
        .map(|n| n.rect().area())
        .sum();
    assert_eq!(leaf_area, 512 * 512);
    assert!(p.root().children().is_some());
}

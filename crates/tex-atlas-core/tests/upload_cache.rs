use std::sync::Arc;

use image::{Rgba, RgbaImage};
use tex_atlas_core::prelude::*;

#[derive(Default)]
struct Releaser {
    released: Vec<u32>,
}

impl TextureReleaser<u32> for Releaser {
    fn release(&mut self, handle: u32) {
        self.released.push(handle);
    }
}

fn image(color: u8) -> Arc<RgbaImage> {
    Arc::new(RgbaImage::from_pixel(4, 4, Rgba([color, color, color, 255])))
}

#[test]
fn miss_then_hit() {
    let mut cache = UploadCache::new(4, Releaser::default());
    let img = image(1);
    assert_eq!(cache.get(&img), None);
    cache.insert(&img, 7);
    assert_eq!(cache.get(&img), Some(&7));
    let stats = cache.stats();
    assert_eq!((stats.hits, stats.misses), (1, 1));
    assert_eq!(stats.hit_ratio(), 0.5);
}

#[test]
fn keys_are_identity_not_content() {
    let mut cache = UploadCache::new(4, Releaser::default());
    let a = image(9);
    let b = image(9);
    assert_eq!(*a, *b);
    cache.insert(&a, 1);
    assert!(cache.contains(&a));
    assert!(cache.contains(&Arc::clone(&a)));
    assert!(!cache.contains(&b));
}

#[test]
fn eviction_releases_oldest_handle() {
    let mut cache = UploadCache::new(2, Releaser::default());
    let images: Vec<_> = (0..3).map(image).collect();
    for (i, img) in images.iter().enumerate() {
        cache.insert(img, 10 + i as u32);
    }
    assert_eq!(cache.len(), 2);
    assert!(!cache.contains(&images[0]));
    assert_eq!(cache.releaser().released, vec![10]);
    let stats = cache.stats();
    assert_eq!((stats.evictions, stats.releases), (1, 1));
}

#[test]
fn get_or_upload_skips_cached_images() {
    let mut cache = UploadCache::new(8, Releaser::default());
    let img = image(3);
    let mut uploads = 0;
    for _ in 0..3 {
        let handle = cache
            .get_or_upload(&img, |pixels: &RgbaImage| {
                uploads += 1;
                Ok::<u32, String>(pixels.width())
            })
            .unwrap();
        assert_eq!(handle, 4);
    }
    assert_eq!(uploads, 1);
    assert_eq!(cache.stats().hits, 2);
}

#[test]
fn failed_upload_leaves_cache_untouched() {
    let mut cache = UploadCache::new(8, Releaser::default());
    let img = image(5);
    let err = cache
        .get_or_upload(&img, |_: &RgbaImage| Err::<u32, _>("device lost"))
        .unwrap_err();
    assert_eq!(err, "device lost");
    assert!(cache.is_empty());
    assert!(cache.releaser().released.is_empty());
}

#[test]
fn replace_remove_and_clear_release_handles() {
    let mut cache = UploadCache::new(8, Releaser::default());
    let a = image(1);
    let b = image(2);
    let c = image(3);
    cache.insert(&a, 1);
    cache.insert(&a, 2);
    cache.insert(&b, 3);
    cache.insert(&c, 4);
    assert!(cache.remove(&b));
    assert!(!cache.remove(&b));
    cache.clear();
    assert_eq!(cache.releaser().released, vec![1, 3, 2, 4]);
    let stats = cache.stats();
    assert_eq!((stats.evictions, stats.releases), (0, 4));
}

#[test]
fn shrinking_releases_excess() {
    let mut cache = UploadCache::new(4, Releaser::default());
    let images: Vec<_> = (0..4).map(image).collect();
    for (i, img) in images.iter().enumerate() {
        cache.insert(img, i as u32);
    }
    cache.set_max(1);
    assert_eq!(cache.max(), 1);
    assert_eq!(cache.releaser().released, vec![0, 1, 2]);
    assert_eq!(cache.percentage(), 1.0);
    cache.releaser_mut().released.clear();
    assert!(cache.releaser().released.is_empty());
}

#[test]
fn closure_releaser() {
    let mut count = 0;
    {
        let mut cache = UploadCache::new(1, |_h: u32| count += 1);
        let a = image(1);
        let b = image(2);
        cache.insert(&a, 1);
        cache.insert(&b, 2);
    }
    assert_eq!(count, 1);
}

#[test]
fn capacity_from_byte_budget() {
    let cfg = CacheConfig {
        max_entries: None,
        byte_budget: 4096,
        entry_bytes: 1024,
    };
    let cache: UploadCache<RgbaImage, u32, Releaser> =
        UploadCache::from_config(&cfg, Releaser::default());
    assert_eq!(cache.max(), 4);

    let quarter_gig =
        CacheConfig::for_textures(1024 * 1024 * 1024 / 4, 1024, 1024, PixelFormat::Rgba8);
    assert_eq!(quarter_gig.entry_limit(), 64);
    assert_eq!(CacheConfig::default().entry_limit(), 64);

    let explicit = CacheConfig {
        max_entries: Some(1000),
        ..CacheConfig::default()
    };
    assert_eq!(explicit.entry_limit(), 1000);
}

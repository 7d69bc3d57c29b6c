use std::str::FromStr;

use tex_atlas_core::prelude::*;

#[test]
fn defaults_match_atlas_texture() {
    let cfg = AtlasConfig::default();
    assert_eq!(cfg.size, 1024);
    assert_eq!(cfg.format, PixelFormat::Rgba8);
    assert_eq!(cfg.filter, FilterMode::Linear);
    assert_eq!(cfg.border, 1);
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.max_item_size(), 1022);
}

#[test]
fn missing_json_fields_take_defaults() {
    let cfg: AtlasConfig = serde_json::from_str(r#"{"size": 512, "format": "l8"}"#).unwrap();
    assert_eq!(cfg.size, 512);
    assert_eq!(cfg.format, PixelFormat::L8);
    assert_eq!(cfg.border, 1);
    assert_eq!(cfg.filter, FilterMode::Linear);
}

#[test]
fn format_and_filter_parse_aliases() {
    assert_eq!(PixelFormat::from_str("RGBA8"), Ok(PixelFormat::Rgba8));
    assert_eq!(PixelFormat::from_str("luma8"), Ok(PixelFormat::L8));
    assert_eq!(PixelFormat::from_str("la8"), Ok(PixelFormat::La8));
    assert!(PixelFormat::from_str("bgra").is_err());
    assert_eq!(FilterMode::from_str("point"), Ok(FilterMode::Nearest));
    assert_eq!(FilterMode::from_str("Bilinear"), Ok(FilterMode::Linear));
    assert_eq!(PixelFormat::La8.bytes_per_pixel(), 2);
    assert_eq!(
        PixelFormat::from_color_type(image::ColorType::Rgb8),
        Some(PixelFormat::Rgb8)
    );
}

#[test]
fn border_must_leave_interior() {
    assert!(AtlasConfig::builder().size(4).border(1).build().validate().is_ok());
    assert!(AtlasConfig::builder().size(4).border(2).build().validate().is_err());
    assert!(AtlasConfig::builder().size(0).border(0).build().validate().is_err());
}

use std::fs;

use fontbake_text::cache::{encode_metrics, pack_version, AtlasMetrics};
use fontbake_text::{
    create_font_data, AtlasRegion, CacheKey, CodePointRange, Dpi, FaceMetrics, FontData,
    FontDataService, FontError, FontFace, FontRequest, GlyphBitmap, Rasterizer, ATLAS_HEIGHT,
    ATLAS_WIDTH,
};
use tempfile::TempDir;

/// Rasterizer double that renders every glyph as a solid box
#[derive(Debug, Default)]
struct BoxRasterizer {
    /// Width per code point (defaults to 8)
    width_of: Option<fn(u32) -> u32>,
    /// Code points the "font" has no glyph for
    missing: Vec<u32>,
    faces_opened: usize,
    glyphs_rendered: usize,
}

struct BoxFace<'a> {
    owner: &'a mut BoxRasterizer,
}

impl Rasterizer for BoxRasterizer {
    fn open_face<'a>(
        &'a mut self,
        _request: &FontRequest,
    ) -> fontbake_text::Result<Box<dyn FontFace + 'a>> {
        self.faces_opened += 1;
        Ok(Box::new(BoxFace { owner: self }))
    }
}

impl FontFace for BoxFace<'_> {
    fn metrics(&self) -> FaceMetrics {
        FaceMetrics {
            ascender_64: 12 * 64,
            descender_64: -4 * 64,
            line_height_64: 16 * 64,
            is_fixed_pitch: true,
        }
    }

    fn rasterize(&mut self, code_point: u32) -> Option<GlyphBitmap> {
        if self.owner.missing.contains(&code_point) {
            return None;
        }
        self.owner.glyphs_rendered += 1;
        let width = self.owner.width_of.map_or(8, |f| f(code_point));
        let height = 10;
        Some(GlyphBitmap {
            code_point,
            width,
            height,
            stride: width as usize,
            buffer: vec![0xff; (width * height) as usize],
            left: 0,
            top: 0,
            advance_64: 480,
        })
    }
}

/// Rasterizer double whose font file cannot be opened
struct BrokenRasterizer;

impl Rasterizer for BrokenRasterizer {
    fn open_face<'a>(
        &'a mut self,
        request: &FontRequest,
    ) -> fontbake_text::Result<Box<dyn FontFace + 'a>> {
        Err(FontError::FontLoad {
            path: request.path().to_path_buf(),
            reason: "no such face".to_string(),
        })
    }
}

fn request(start: u32, end: u32) -> FontRequest {
    FontRequest::new("fonts/BoxMono.ttf")
        .unwrap()
        .with_point_size(12)
        .with_dpi(Dpi { x: 96.0, y: 96.0 })
        .with_range(CodePointRange::new(start, end).unwrap())
}

fn region(glyph: &fontbake_text::Glyph) -> AtlasRegion {
    AtlasRegion {
        x: glyph.offset % ATLAS_WIDTH,
        y: glyph.offset / ATLAS_WIDTH,
        width: glyph.size.x as u32,
        height: glyph.size.y as u32,
    }
}

#[test]
fn abc_scenario() {
    let cache_dir = TempDir::new().unwrap();
    let mut rasterizer = BoxRasterizer::default();

    let data = create_font_data(&mut rasterizer, cache_dir.path(), &request(65, 68)).unwrap();

    assert_eq!(data.glyph_count(), 3);
    assert_eq!(data.glyphs[&65].offset, 0);
    assert_eq!(data.glyphs[&66].offset, 9);
    for glyph in data.glyphs.values() {
        assert_eq!(glyph.advance, 7);
    }
    assert_eq!(data.name, "BoxMono.ttf");
    assert!(data.is_monospaced);
    assert_eq!(data.text_height, 8.0);
    assert_eq!(
        data.image_path,
        cache_dir.path().join("Fonts/BoxMono.ttf_65_68_12.png")
    );

    let image = image::open(&data.image_path).unwrap();
    assert_eq!((image.width(), image.height()), (ATLAS_WIDTH, ATLAS_HEIGHT));
    let rgba = image.into_rgba8();
    assert_eq!(rgba.get_pixel(0, 0).0, [0xff, 0xff, 0xff, 0xff]);
    // Padding column after the first glyph stays black but opaque
    assert_eq!(rgba.get_pixel(8, 0).0, [0, 0, 0, 0xff]);
}

#[test]
fn second_request_is_served_from_cache() {
    let cache_dir = TempDir::new().unwrap();
    let mut rasterizer = BoxRasterizer::default();
    let request = request(32, 128);

    let first = create_font_data(&mut rasterizer, cache_dir.path(), &request).unwrap();
    assert_eq!(rasterizer.faces_opened, 1);
    assert_eq!(rasterizer.glyphs_rendered, 96);

    let second = create_font_data(&mut rasterizer, cache_dir.path(), &request).unwrap();
    assert_eq!(rasterizer.faces_opened, 1, "cache hit must not rasterize");
    assert_eq!(rasterizer.glyphs_rendered, 96);
    assert_eq!(first, second);
}

#[test]
fn missing_image_forces_full_regeneration() {
    let cache_dir = TempDir::new().unwrap();
    let mut rasterizer = BoxRasterizer::default();
    let request = request(32, 64);

    let first = create_font_data(&mut rasterizer, cache_dir.path(), &request).unwrap();
    fs::remove_file(&first.image_path).unwrap();

    let second = create_font_data(&mut rasterizer, cache_dir.path(), &request).unwrap();
    assert_eq!(rasterizer.faces_opened, 2);
    assert!(second.image_path.is_file());
    assert_eq!(first.glyphs, second.glyphs);
}

#[test]
fn missing_metrics_forces_full_regeneration() {
    let cache_dir = TempDir::new().unwrap();
    let mut rasterizer = BoxRasterizer::default();
    let request = request(32, 64);

    create_font_data(&mut rasterizer, cache_dir.path(), &request).unwrap();
    let mut service = FontDataService::new(&mut rasterizer, cache_dir.path());
    let paths = service
        .cache()
        .paths(&CacheKey::from_request(&request))
        .unwrap();
    fs::remove_file(&paths.metrics).unwrap();

    service.load(&request).unwrap();
    assert!(paths.is_complete());
    assert_eq!(rasterizer.faces_opened, 2);
}

#[test]
fn stale_metrics_version_is_rebaked() {
    let cache_dir = TempDir::new().unwrap();
    let mut rasterizer = BoxRasterizer::default();
    let request = request(65, 91);

    let first = create_font_data(&mut rasterizer, cache_dir.path(), &request).unwrap();
    let metrics_path = first.image_path.with_extension("bin");

    let mut bytes = fs::read(&metrics_path).unwrap();
    bytes[0..4].copy_from_slice(&pack_version(0, 1, 0).to_le_bytes());
    fs::write(&metrics_path, &bytes).unwrap();

    let second = create_font_data(&mut rasterizer, cache_dir.path(), &request).unwrap();
    assert_eq!(rasterizer.faces_opened, 2);
    assert_eq!(first, second);
}

#[test]
fn truncated_metrics_are_rebaked() {
    let cache_dir = TempDir::new().unwrap();
    let mut rasterizer = BoxRasterizer::default();
    let request = request(65, 91);

    let first = create_font_data(&mut rasterizer, cache_dir.path(), &request).unwrap();
    let metrics_path = first.image_path.with_extension("bin");
    let bytes = fs::read(&metrics_path).unwrap();
    fs::write(&metrics_path, &bytes[..bytes.len() / 2]).unwrap();

    let second = create_font_data(&mut rasterizer, cache_dir.path(), &request).unwrap();
    assert_eq!(rasterizer.faces_opened, 2);
    assert_eq!(first.glyph_count(), second.glyph_count());
}

#[test]
fn hit_trusts_existing_files() {
    let cache_dir = TempDir::new().unwrap();
    let request = request(65, 66);
    let mut rasterizer = BrokenRasterizer;

    let mut service = FontDataService::new(&mut rasterizer, cache_dir.path());
    let paths = service
        .cache()
        .paths(&CacheKey::from_request(&request))
        .unwrap();
    let metrics = AtlasMetrics {
        text_height: 3.0,
        ..Default::default()
    };
    fs::write(&paths.metrics, encode_metrics(&metrics)).unwrap();
    // Image content is never checked on a hit
    fs::write(&paths.image, b"not really a png").unwrap();

    let data = service.load(&request).unwrap();
    assert_eq!(data.glyph_count(), 0);
    assert_eq!(data.text_height, 3.0);
}

#[test]
fn unrenderable_code_points_are_absent() {
    let cache_dir = TempDir::new().unwrap();
    let mut rasterizer = BoxRasterizer {
        missing: vec![66],
        ..Default::default()
    };

    let data = create_font_data(&mut rasterizer, cache_dir.path(), &request(65, 68)).unwrap();
    assert_eq!(data.glyph_count(), 2);
    assert!(!data.glyphs.contains_key(&66));
    assert_eq!(data.glyphs[&67].offset, 9);
}

#[test]
fn rasterizer_failure_is_fatal() {
    let cache_dir = TempDir::new().unwrap();
    let mut rasterizer = BrokenRasterizer;

    let result = create_font_data(&mut rasterizer, cache_dir.path(), &request(65, 68));
    assert!(matches!(result, Err(FontError::FontLoad { .. })));

    let image = cache_dir.path().join("Fonts/BoxMono.ttf_65_68_12.png");
    assert!(!image.exists());
}

#[test]
fn dpi_is_not_part_of_the_key() {
    let cache_dir = TempDir::new().unwrap();
    let mut rasterizer = BoxRasterizer::default();

    let low = request(65, 68).with_dpi(Dpi { x: 72.0, y: 72.0 });
    create_font_data(&mut rasterizer, cache_dir.path(), &low).unwrap();
    create_font_data(&mut rasterizer, cache_dir.path(), &request(65, 68)).unwrap();
    assert_eq!(rasterizer.faces_opened, 1);
}

fn varied_width(code_point: u32) -> u32 {
    3 + (code_point * 7) % 29
}

fn check_packing(data: &FontData) {
    let mut glyphs: Vec<_> = data.glyphs.iter().collect();
    glyphs.sort_by_key(|(code_point, _)| **code_point);

    let regions: Vec<AtlasRegion> = glyphs.iter().map(|(_, glyph)| region(glyph)).collect();
    for (i, a) in regions.iter().enumerate() {
        assert!(a.x + a.width <= ATLAS_WIDTH, "{a:?} exceeds canvas width");
        assert!(a.y + a.height <= ATLAS_HEIGHT, "{a:?} exceeds canvas height");
        for b in &regions[i + 1..] {
            assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
        }
    }

    for pair in glyphs.windows(2) {
        let (prev, next) = (pair[0].1, pair[1].1);
        let prev_row = prev.offset / ATLAS_WIDTH;
        let next_row = next.offset / ATLAS_WIDTH;
        let prev_end = prev.offset % ATLAS_WIDTH + prev.size.x as u32 + 1;
        let wrapped = prev_end + next.size.x as u32 >= ATLAS_WIDTH;
        assert!(next_row >= prev_row);
        assert_eq!(next_row > prev_row, wrapped);
    }

    for (_, glyph) in &glyphs {
        for uv in &glyph.texcoords {
            assert!((0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y));
        }
        let du = glyph.texcoords[1].x - glyph.texcoords[0].x;
        assert!((du - glyph.size.x / ATLAS_WIDTH as f32).abs() < 1e-6);
    }
}

#[test]
fn shelf_packing_invariants() {
    let cache_dir = TempDir::new().unwrap();
    let mut rasterizer = BoxRasterizer {
        width_of: Some(varied_width),
        ..Default::default()
    };

    let data = create_font_data(&mut rasterizer, cache_dir.path(), &request(32, 600)).unwrap();
    assert_eq!(data.glyph_count(), 568);
    check_packing(&data);
}

#[test]
fn overflowing_range_drops_tail_glyphs() {
    let cache_dir = TempDir::new().unwrap();
    let mut rasterizer = BoxRasterizer::default();

    // 56 glyphs per 17px shelf, 30 shelves fit in 512 rows
    let data = create_font_data(&mut rasterizer, cache_dir.path(), &request(0, 2000)).unwrap();
    assert_eq!(data.glyph_count(), 56 * 30);
    assert!(data.glyphs.contains_key(&0));
    assert!(!data.glyphs.contains_key(&1999));
    check_packing(&data);
}

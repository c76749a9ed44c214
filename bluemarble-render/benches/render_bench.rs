use criterion::{criterion_group, criterion_main, Criterion};

use bluemarble_core::{TemplateCoords, TileCoords};
use bluemarble_render::{
    composite_tile, encode_png, CompositeOptions, RgbaBuffer, Shred, Template, TemplateMeta,
    TILE_SIZE,
};

fn checker_image(width: u32, height: u32) -> RgbaBuffer {
    let mut img = RgbaBuffer::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let px = if (x / 4 + y / 4) % 2 == 0 {
                [237, 28, 36, 255]
            } else {
                [0, 0, 0, 255]
            };
            img.set_pixel(x, y, px);
        }
    }
    img
}

fn bench_slice(c: &mut Criterion) {
    let img = checker_image(256, 256);
    let anchor = TemplateCoords::new(0, 0, 900, 900);

    c.bench_function("slice_256x256_four_tiles", |b| {
        b.iter(|| {
            Template::slice(
                TemplateMeta::new("bench", 0, "!"),
                &img,
                anchor,
                TILE_SIZE,
                Shred::default(),
            )
        });
    });
}

fn bench_composite(c: &mut Criterion) {
    let img = checker_image(256, 256);
    let template = Template::slice(
        TemplateMeta::new("bench", 0, "!"),
        &img,
        TemplateCoords::new(0, 0, 100, 100),
        TILE_SIZE,
        Shred::default(),
    )
    .expect("slice")
    .template;
    let remote = encode_png(&RgbaBuffer::new(TILE_SIZE, TILE_SIZE)).expect("encode");
    let options = CompositeOptions::default();

    c.bench_function("composite_1000_tile_one_template", |b| {
        b.iter(|| composite_tile(&remote, TileCoords::new(0, 0), &[&template], &options));
    });
}

criterion_group!(benches, bench_slice, bench_composite);
criterion_main!(benches);

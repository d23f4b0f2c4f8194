// benches/pipeline.rs - End-to-end generation timing on a synthetic portrait

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use maze_core::{GrayBuffer, Layout, MazeConfig, MazeSession, QuadtreeParams};

fn portrait(size: u32) -> GrayBuffer {
    let c = size as f64 / 2.0;
    GrayBuffer::from_fn(size, size, |x, y| {
        let (dx, dy) = (x as f64 - c, y as f64 - c);
        ((dx * dx + dy * dy).sqrt() / c * 255.0).min(255.0) as u8
    })
    .expect("non-empty synthetic image")
}

fn bench_generate(c: &mut Criterion) {
    let image = portrait(512);
    let config = MazeConfig {
        layout: Layout::Quadtree(QuadtreeParams {
            min_cell_size: 4,
            max_cell_size: 64,
            edge_sensitivity: 0.5,
        }),
        ..Default::default()
    };
    let session = MazeSession::new(&image, config).expect("valid config");
    c.bench_function("generate_quadtree_512", |b| {
        b.iter(|| black_box(session.generate().expect("generation succeeds")))
    });

    let grid = MazeSession::new(
        &image,
        MazeConfig {
            layout: Layout::Grid { cols: 64, rows: 64, cell_size: 10, edge_weight: 0.0 },
            ..Default::default()
        },
    )
    .expect("valid config");
    c.bench_function("generate_grid_64", |b| {
        b.iter(|| black_box(grid.generate().expect("generation succeeds")))
    });
}

criterion_group!(benches, bench_generate);
criterion_main!(benches);

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use frames2tiles::split_into_grid;
use ndarray::Array3;

fn create_mock_frame(width: usize, height: usize) -> Array3<u8> {
    Array3::from_shape_fn((height, width, 3), |(y, x, c)| ((x + y * 3 + c) % 256) as u8)
}

fn benchmark_grid_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_split");
    let frame = create_mock_frame(800, 600);

    for grid in [4u32, 8, 16].iter() {
        group.bench_with_input(BenchmarkId::new("split_into_grid", grid), grid, |b, grid| {
            b.iter(|| {
                let tiles = split_into_grid(black_box(frame.view().into_dyn()), *grid, *grid);
                black_box(tiles)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_grid_split);
criterion_main!(benches);

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use voxbot_sim::block::BlockKind;
use voxbot_sim::config::BotConfig;
use voxbot_sim::navmesh::NavMesh;
use voxbot_sim::pathfinding::{PathSearch, find_path};
use voxbot_sim::types::{Dimension, VoxelCoord};
use voxbot_sim::world::VoxelWorld;

use std::task::Poll;

fn flat_world(size: u32) -> VoxelWorld {
    let mut world = VoxelWorld::new(size, 4, size);
    let edge = size as i32 - 1;
    world.fill(VoxelCoord::new(0, 0, 0), VoxelCoord::new(edge, 0, edge), BlockKind::Stone);
    world
}

fn bench_pathfinding(c: &mut Criterion) {
    let config = BotConfig::default();
    let world = flat_world(64);
    let mut navmesh = NavMesh::new();

    let mut group = c.benchmark_group("voxbot/pathfinding");

    group.bench_function("rebuild_nav_64x64", |b| {
        b.iter(|| {
            let delta = navmesh.rebuild_all(&world, &config);
            black_box(delta.nodes_added);
        })
    });

    navmesh.rebuild_all(&world, &config);
    let start = VoxelCoord::new(1, 1, 1);
    let goal = VoxelCoord::new(60, 1, 45);

    group.bench_function("find_path_flat", |b| {
        b.iter(|| {
            let path = find_path(
                &navmesh.graph,
                &world,
                Dimension::Overworld,
                start,
                goal,
                &config.player,
                &config.pathfinding,
            );
            black_box(path.map(|p| p.len()).unwrap_or_default());
        })
    });

    group.bench_function("find_path_sliced", |b| {
        b.iter(|| {
            let mut search = PathSearch::new(
                Dimension::Overworld,
                start,
                goal,
                &config.player,
                &config.pathfinding,
            );
            let budget = config.pathfinding.nodes_per_slice;
            let result = loop {
                if let Poll::Ready(result) =
                    search.step(&navmesh.graph, &world, Dimension::Overworld, budget)
                {
                    break result;
                }
            };
            black_box(result.map(|p| p.len()).unwrap_or_default());
        })
    });

    group.finish();
}

criterion_group!(benches, bench_pathfinding);
criterion_main!(benches);

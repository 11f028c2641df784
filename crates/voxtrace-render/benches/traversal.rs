use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::Vec3;

use voxtrace_render::{
    Camera, ChildOrder, CpuRenderer, MaskDescentTraversal, Palette, RenderConfig,
    StackAabbConfig, StackAabbTraversal, VoxelRayIntersector,
};
use voxtrace_scene::{build_aabb_octree, build_tree64, DemoScene};

const EDGE: u32 = 64;
const VIEWPORT: u32 = 64;

fn bench_camera() -> Camera {
    let radius = 1.6 * EDGE as f32;
    let angle: f32 = 40f32.to_radians();
    let target = Vec3::splat(EDGE as f32 * 0.5);
    let position = target + Vec3::new(angle.sin() * radius, radius * 0.6, angle.cos() * radius);
    Camera::new(position, target, Vec3::Y, 50f32.to_radians(), 1.0, 0.1, 1000.0)
}

fn cast_viewport(intersector: &dyn VoxelRayIntersector, camera: &Camera) -> u32 {
    let mut hits = 0;
    for y in 0..VIEWPORT {
        for x in 0..VIEWPORT {
            let ray = camera.ray_for_pixel(x, y, VIEWPORT, VIEWPORT);
            hits += u32::from(intersector.cast(&ray).is_hit());
        }
    }
    hits
}

fn criterion_benchmark(c: &mut Criterion) {
    let palette = Palette::default();
    let camera = bench_camera();

    for demo in [DemoScene::Sphere, DemoScene::Terrain] {
        let grid = demo.generate(EDGE, 7);
        let tree64 = build_tree64(&grid, &palette).unwrap();
        let aabb = build_aabb_octree(&grid, &palette).unwrap();

        let mask = MaskDescentTraversal::new(&tree64);
        c.bench_function(&format!("cpu mask-descent {}", demo.name()), |b| {
            b.iter(|| black_box(cast_viewport(&mask, &camera)))
        });

        for order in [ChildOrder::SortedByDistance, ChildOrder::RunningMinimum] {
            let config = StackAabbConfig::default().with_child_order(order);
            let stack = StackAabbTraversal::with_config(&aabb, config);
            c.bench_function(
                &format!("cpu stack-aabb {} {}", order.name(), demo.name()),
                |b| b.iter(|| black_box(cast_viewport(&stack, &camera))),
            );
        }
    }

    let grid = DemoScene::Terrain.generate(EDGE, 7);
    let tree64 = build_tree64(&grid, &palette).unwrap();
    let renderer = CpuRenderer::new(RenderConfig::new(160, 90));
    let mut camera = bench_camera();
    camera.set_aspect(renderer.config().aspect());
    c.bench_function("parallel render terrain 160x90", |b| {
        b.iter(|| black_box(renderer.render(&MaskDescentTraversal::new(&tree64), &camera)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

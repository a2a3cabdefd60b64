use criterion::{criterion_group, criterion_main, Criterion};
use footstep_planning::{
    feet_around, FootstepPlanner, FootstepPlannerGoal, FootstepPlannerParameters,
    FootstepPlannerRequest, HeightMap, Terrain,
};
use nalgebra::{Isometry3, Point2};
use std::hint::black_box;

fn flat_bench_single(c: &mut Criterion) {
    let (left, right) = feet_around(&Isometry3::identity(), 0.2);
    let goal = FootstepPlannerGoal::PoseBetweenFeet(Isometry3::translation(2.0, 0.0, 0.0));
    let terrains = [
        ("flat ground", Terrain::FlatGround { height: 0.0 }),
        (
            "height map",
            Terrain::HeightMap(HeightMap::from_fn(0.05, Point2::new(1.0, 0.0), 100, |x, y| {
                Some(0.05 * (2.0 * x).sin() + 0.02 * y)
            })),
        ),
    ];
    for (name, terrain) in terrains {
        let request = FootstepPlannerRequest::new(left, right, goal.clone(), terrain);
        c.bench_function(format!("{name}, 2 m").as_str(), |b| {
            b.iter(|| {
                let mut planner = FootstepPlanner::new(FootstepPlannerParameters::default());
                black_box(planner.plan(request.clone()).ok());
            })
        });
    }
}

criterion_group!(benches, flat_bench_single);
criterion_main!(benches);

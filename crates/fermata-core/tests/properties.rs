use fermata_core::{Coord, DeltaGeometry, MotionState, StepError, Tower};

fn geometry() -> DeltaGeometry {
    DeltaGeometry::new(100.0, 260.0).unwrap()
}

/// Maps raw generator output onto a point inside the reachable envelope.
fn point(geometry: &DeltaGeometry, (x, y, z): (i16, i16, i16)) -> Option<Coord> {
    let reach = 0.95 * (geometry.rod_length() - geometry.radius());
    let unit = |v: i16| v as f64 / 32768.0;
    let p = Coord::new(
        unit(x) * reach,
        unit(y) * reach,
        unit(z) * geometry.rod_length(),
    );
    (p.x.hypot(p.y) <= reach).then_some(p)
}

#[test]
fn forward_inverse_round_trip() {
    let geometry = geometry();
    bolero::check!()
        .with_type::<(i16, i16, i16)>()
        .for_each(|&raw| {
            let Some(p) = point(&geometry, raw) else {
                return;
            };
            let heights = geometry.towers_from_position(p).unwrap();
            let candidates = geometry.positions_from_towers(&heights);
            assert!(
                candidates.contains_near(p, 1e-9 * geometry.rod_length()),
                "{p} not in {candidates:?}"
            );
            let canonical = geometry.position_from_towers(&heights).unwrap();
            assert!(canonical.max_abs_diff(p) <= 1e-9 * geometry.rod_length());
            for q in &candidates {
                assert!(q.z < heights.min());
            }
        });
}

#[test]
fn step_time_grows_with_offset() {
    let geometry = geometry();
    bolero::check!()
        .with_type::<((i16, i16, i16), (i8, i8, i8), (u8, u8, u8, bool))>()
        .for_each(|&(raw, (vx, vy, vz), (tower, near, further, up))| {
            let Some(p) = point(&geometry, raw) else {
                return;
            };
            let velocity = Coord::new(vx as f64, vy as f64, vz as f64) * (1.0 / 16.0);
            let state = MotionState::new(p, velocity);
            let tower = Tower::ALL[tower as usize % 3];
            let sign = if up { 1.0 } else { -1.0 };
            let near = sign * near as f64 * 0.01;
            let far = near + sign * further.max(1) as f64 * 0.01;

            let Ok(t_far) = geometry.time_to_reach(tower, far, &state) else {
                return;
            };
            // the carriage must pass the nearer height on the way
            let t_near = geometry.time_to_reach(tower, near, &state).unwrap();
            assert!(t_near >= 0.0);
            assert!(t_near <= t_far * (1.0 + 1e-9) + 1e-12, "{t_near} > {t_far}");
        });
}

#[test]
fn step_time_is_never_negative() {
    let geometry = geometry();
    bolero::check!()
        .with_type::<((i16, i16, i16), (i8, i8, i8), (u8, i8))>()
        .for_each(|&(raw, (vx, vy, vz), (tower, offset))| {
            let Some(p) = point(&geometry, raw) else {
                return;
            };
            let state = MotionState::new(p, Coord::new(vx as f64, vy as f64, vz as f64));
            let tower = Tower::ALL[tower as usize % 3];
            match geometry.time_to_reach(tower, offset as f64 * 0.1, &state) {
                Ok(t) => assert!(t >= 0.0 && t.is_finite()),
                Err(StepError::WrongDirection) => {}
                Err(err) => panic!("{p} is reachable but got {err}"),
            }
        });
}

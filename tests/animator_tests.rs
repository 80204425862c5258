//! CarAnimator integration tests

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use traffic_view::{
        animator::{AnimationState, CarAnimator, CarModel, WHEEL_COUNT},
        pose::{self, Axis},
    };

    const EPS: f32 = 1e-3;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < EPS
    }

    fn centroid(points: impl Iterator<Item = Vec3>) -> Vec3 {
        let mut sum = Vec3::ZERO;
        let mut n = 0.0;
        for p in points {
            sum += p;
            n += 1.0;
        }
        sum / n
    }

    // -----------------------------------------------------------------------
    // Interpolation
    // -----------------------------------------------------------------------

    #[test]
    fn first_waypoint_is_rendered_in_place() {
        let mut car = CarAnimator::new("car-1", &CarModel::default());
        car.set_next_waypoint(Vec3::new(3.0, 0.0, 2.0));
        assert_eq!(car.position(), Some(Vec3::new(3.0, 0.0, 2.0)));

        car.tick(0.0, 0.0);
        let body = car.body().centroid();
        let base = car.body().base().vertices.iter().copied();
        assert!(close(body, centroid(base) + Vec3::new(3.0, 0.0, 2.0)));
    }

    #[test]
    fn second_segment_starts_at_previous_target() {
        let mut car = CarAnimator::new("car-1", &CarModel::default());
        let p0 = Vec3::new(0.0, 0.0, 0.0);
        let p1 = Vec3::new(0.0, 0.0, 10.0);
        car.set_next_waypoint(p0);
        car.set_next_waypoint(p1);
        assert_eq!(car.position(), Some(p0));
        assert_eq!(car.progress(), 0.0);
    }

    #[test]
    fn position_clamps_to_target_after_duration() {
        let mut car = CarAnimator::new("car-1", &CarModel::default());
        car.set_movement_duration(0.7);
        let waypoints = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 10.0),
            Vec3::new(-3.3, 0.0, 7.1),
        ];

        let mut clock = 0.0;
        for p in waypoints {
            car.set_next_waypoint(p);
            // Uneven frames that overshoot the duration.
            for dt in [0.016, 0.3, 0.25, 0.2] {
                clock += dt;
                car.tick(dt, clock);
            }
            assert_eq!(car.state(), AnimationState::Settled);
            assert_eq!(car.position(), Some(p));
        }
    }

    #[test]
    fn midpoint_is_linear() {
        let mut car = CarAnimator::new("car-1", &CarModel::default());
        car.set_movement_duration(2.0);
        car.set_next_waypoint(Vec3::ZERO);
        car.set_next_waypoint(Vec3::new(0.0, 0.0, 8.0));
        car.tick(1.0, 1.0);
        assert!(close(car.position().unwrap(), Vec3::new(0.0, 0.0, 4.0)));
        assert_eq!(car.state(), AnimationState::Animating);
    }

    // -----------------------------------------------------------------------
    // Heading
    // -----------------------------------------------------------------------

    #[test]
    fn body_faces_direction_of_travel() {
        let mut car = CarAnimator::new("car-1", &CarModel::default());
        car.set_next_waypoint(Vec3::ZERO);
        car.set_next_waypoint(Vec3::new(-5.0, 0.0, 0.0));
        assert!((car.heading() + 90.0).abs() < EPS);

        car.tick(1.0, 1.0);
        // The front of the default body (+Z in model space) now points -X.
        let rotated = pose::apply(&pose::rotation(car.heading(), Axis::Y), Vec3::Z);
        assert!(close(rotated, Vec3::NEG_X));
    }

    // -----------------------------------------------------------------------
    // Wheels
    // -----------------------------------------------------------------------

    #[test]
    fn wheels_follow_the_body_around_their_pivots() {
        let model = CarModel::default();
        let mut car = CarAnimator::new("car-1", &model);
        car.set_next_waypoint(Vec3::new(0.0, 0.0, 0.0));
        car.set_next_waypoint(Vec3::new(10.0, 0.0, 10.0));
        car.tick(0.5, 0.5);

        let position = car.position().unwrap();
        let heading = pose::rotation(car.heading(), Axis::Y);
        assert_eq!(car.wheels().len(), WHEEL_COUNT);
        for (wheel, pivot) in car.wheels().iter().zip(model.wheel_pivots) {
            assert_eq!(wheel.pivot(), pivot);
            let center = centroid(wheel.world_vertices());
            assert!(close(center, position + pose::apply(&heading, pivot)));
        }
    }

    #[test]
    fn wheel_spin_depends_only_on_global_clock() {
        let model = CarModel::default();
        let mut early = CarAnimator::new("early", &model);
        early.set_next_waypoint(Vec3::ZERO);
        early.set_next_waypoint(Vec3::new(0.0, 0.0, 5.0));
        early.tick(0.5, 0.5);
        early.set_next_waypoint(Vec3::new(0.0, 0.0, 5.0));

        let mut late = CarAnimator::new("late", &model);
        late.set_next_waypoint(Vec3::new(50.0, 0.0, 0.0));

        let clock = 1.3;
        early.tick(0.1, clock);
        late.tick(0.1, clock);
        assert_eq!(early.spin_angle(clock), late.spin_angle(clock));

        let (pe, pl) = (early.position().unwrap(), late.position().unwrap());
        for (we, wl) in early.wheels().iter().zip(late.wheels()) {
            for (ve, vl) in we.mesh().vertices().iter().zip(wl.mesh().vertices()) {
                assert!(close(*ve - pe, *vl - pl));
            }
        }
    }

    #[test]
    fn wheels_stop_once_settled() {
        let mut car = CarAnimator::new("car-1", &CarModel::default());
        car.set_next_waypoint(Vec3::ZERO);
        car.tick(2.0, 2.0);
        assert_eq!(car.state(), AnimationState::Settled);
        let before: Vec<Vec3> = car.wheels()[0].mesh().vertices().to_vec();

        car.tick(0.5, 2.5);
        assert_eq!(car.wheels()[0].mesh().vertices(), before.as_slice());
    }

    // -----------------------------------------------------------------------
    // Geometry
    // -----------------------------------------------------------------------

    #[test]
    fn normals_stay_unit_length_after_posing() {
        let mut car = CarAnimator::new("car-1", &CarModel::default());
        car.set_next_waypoint(Vec3::ZERO);
        car.set_next_waypoint(Vec3::new(3.0, 0.0, 4.0));
        car.tick(0.3, 0.3);

        let normals = car.body().normals();
        assert_eq!(normals.len(), car.body().vertices().len());
        for n in normals {
            assert!((n.length() - 1.0).abs() < EPS);
        }
    }
}

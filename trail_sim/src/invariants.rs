//! Per-tick checks that must hold for every trail, whatever the motion.

use trail_core::{TickOutcome, Trail};

/// Verifies the trail's state after a tick at time `now`.
///
/// Returns the first violated property as a message.
pub fn check_tick(trail: &Trail, now: f64, outcome: &TickOutcome) -> Result<(), String> {
    let config = trail.config();
    let points = trail.points();

    if points.len() > points.capacity() {
        return Err(format!("{} points exceed capacity {}", points.len(), points.capacity()));
    }

    // Finalized trails keep expiring, so this holds on every tick
    if let Some(oldest) = points.oldest() {
        if oldest.age(now) > config.segment_lifetime {
            return Err(format!(
                "point aged {:.4}s outlived lifetime {:.4}s",
                oldest.age(now),
                config.segment_lifetime
            ));
        }
    }

    let ages_monotonic = points
        .iter()
        .zip(points.iter().skip(1))
        .all(|(older, newer)| older.created_at <= newer.created_at);
    if !ages_monotonic {
        return Err("history not ordered oldest to newest".to_string());
    }

    if trail.is_emitting() && !config.is_degenerate() && points.len() < 2 {
        return Err(format!("emitting with only {} points", points.len()));
    }

    match outcome {
        TickOutcome::Fading { .. } if points.len() < 2 => {
            return Err(format!("fading a ribbon of {} points", points.len()));
        }
        TickOutcome::Hidden if !trail.is_emitting() && points.len() >= 2 => {
            return Err(format!("hidden mid-fade with {} points", points.len()));
        }
        TickOutcome::Finalized if trail.global_alpha() != 0.0 => {
            return Err(format!("finalized at alpha {}", trail.global_alpha()));
        }
        _ => {}
    }

    let alpha = trail.global_alpha();
    let initial = trail.initial_alpha();
    if !(initial.min(0.0)..=initial.max(0.0)).contains(&alpha) {
        return Err(format!("alpha {} outside [0, {}]", alpha, trail.initial_alpha()));
    }

    if let TickOutcome::Rebuilt { cross_sections, triangles } = *outcome {
        check_mesh(trail, cross_sections, triangles)?;
    }

    Ok(())
}

fn check_mesh(trail: &Trail, cross_sections: usize, triangles: usize) -> Result<(), String> {
    let mesh = trail.mesh();
    let n = trail.point_count();

    if n < 2 {
        return Err(format!("rebuilt a ribbon from {} points", n));
    }
    if cross_sections != n {
        return Err(format!("{} cross-sections for {} points", cross_sections, n));
    }
    if mesh.vertices.len() != 2 * n || mesh.colors.len() != 2 * n || mesh.uvs.len() != 2 * n {
        return Err(format!(
            "buffer sizes {}/{}/{} for {} points",
            mesh.vertices.len(),
            mesh.colors.len(),
            mesh.uvs.len(),
            n
        ));
    }
    if mesh.triangles.len() != 6 * (n - 1) || triangles != 2 * (n - 1) {
        return Err(format!("{} indices for {} points", mesh.triangles.len(), n));
    }
    if let Some(bad) = mesh.triangles.iter().find(|&&i| i as usize >= 2 * n) {
        return Err(format!("index {} out of range for {} vertices", bad, 2 * n));
    }

    let finite = mesh.vertices.iter().all(|v| v.iter().all(|c| c.is_finite()))
        && mesh.uvs.iter().all(|uv| uv.iter().all(|c| c.is_finite()))
        && mesh.colors.iter().all(|c| c.is_finite());
    if !finite {
        return Err("non-finite value in mesh buffers".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use proptest::prelude::*;
    use trail_core::{RenderAction, TrailConfig};
    use trail_env::Pose;

    fn outcome_of(action: RenderAction<'_>) -> TickOutcome {
        match action {
            RenderAction::Hide => TickOutcome::Hidden,
            RenderAction::UpdateAlpha(alpha) => TickOutcome::Fading { alpha },
            RenderAction::Finalize => TickOutcome::Finalized,
            RenderAction::Rebuild(mesh) => TickOutcome::Rebuilt {
                cross_sections: mesh.cross_sections(),
                triangles: mesh.triangle_count(),
            },
        }
    }

    #[test]
    fn test_fresh_trail_passes() {
        let mut trail = Trail::new(TrailConfig::default(), 1.0);
        let outcome = outcome_of(trail.tick(0.0, Pose::default(), 0.0));
        assert_eq!(check_tick(&trail, 0.0, &outcome), Ok(()));
    }

    #[test]
    fn test_mismatched_outcome_is_reported() {
        let mut trail = Trail::new(TrailConfig::default(), 1.0);
        trail.tick(0.0, Pose::default(), 0.0);

        let wrong = TickOutcome::Rebuilt { cross_sections: 5, triangles: 8 };
        assert!(check_tick(&trail, 0.0, &wrong).is_err());
    }

    #[test]
    fn test_finalize_above_zero_is_reported() {
        let mut trail = Trail::new(TrailConfig::default(), 1.0);
        trail.tick(0.0, Pose::default(), 0.0);
        assert!(check_tick(&trail, 0.0, &TickOutcome::Finalized).is_err());
    }

    #[test]
    fn test_full_alpha_stop_runs_to_empty() {
        let mut trail = Trail::new(TrailConfig::default(), 1.0);
        let dt = 1.0 / 30.0;
        for i in 0..90 {
            if i == 30 {
                trail.set_emitting(false);
            }
            let now = i as f64 * dt;
            let pose = Pose::at(Vector3::new(i.min(29) as f32 * 1.5, 0.0, 0.0));
            let outcome = outcome_of(trail.tick(now, pose, dt));
            assert_eq!(check_tick(&trail, now, &outcome), Ok(()), "tick {}", i);
        }
        assert!(trail.is_finalized());
        assert_eq!(trail.point_count(), 0);
    }

    proptest! {
        #[test]
        fn prop_any_walk_satisfies_invariants(
            steps in prop::collection::vec((-5.0f32..5.0, -5.0f32..5.0, -180.0f32..180.0), 1..80),
            lifetime in 0.05f64..2.0,
            stop_at in 0usize..80,
            alpha in prop_oneof![Just(1.0f32), 0.05f32..1.0],
        ) {
            let config = TrailConfig::default()
                .with_lifetime(lifetime)
                .with_maximum_points(16);
            let mut trail = Trail::new(config, alpha);
            let dt = 1.0 / 30.0;
            let mut position = Vector3::zeros();

            for (i, (dx, dz, yaw)) in steps.into_iter().enumerate() {
                if i == stop_at {
                    trail.set_emitting(false);
                }
                position += Vector3::new(dx, 0.0, dz) * dt as f32;
                let rotation = nalgebra::UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw.to_radians());
                let now = i as f64 * dt;

                let outcome = outcome_of(trail.tick(now, Pose::new(position, rotation), dt));
                prop_assert_eq!(check_tick(&trail, now, &outcome), Ok(()));
            }
        }
    }
}

//! Normalisation adapter (spec.md §4.7). Pure unit conversion from the
//! device's protobuf metric structure into the sink-neutral [`ShotRecord`].
//! Kept free of I/O and session state so it is trivially unit-testable.

const MPS_TO_MPH: f64 = 2.2369;

/// Sink-neutral shot representation. Field names mirror spec.md's
/// vocabulary rather than the wire proto's.
#[derive(Debug, Clone, PartialEq)]
pub struct ShotRecord {
    pub shot_id: u32,
    pub ball_speed_mph: f64,
    pub club_speed_mph: f64,
    pub launch_angle_deg: f64,
    pub launch_direction_deg: f64,
    pub spin_axis_deg: f64,
    pub side_spin_rpm: f64,
    pub back_spin_rpm: f64,
    pub attack_angle_deg: f64,
    pub club_face_deg: f64,
    pub club_path_deg: f64,
}

/// Converts a raw `r10_proto::ShotMetrics` into a [`ShotRecord`].
///
/// The device reports `spin_axis` with the opposite sign convention from
/// the sink, and total spin is decomposed into side/back components via the
/// (already sign-flipped) axis angle.
pub fn normalize_shot(metrics: &r10_proto::ShotMetrics) -> ShotRecord {
    let spin_axis_deg = -metrics.spin_axis_deg;
    let axis_rad = spin_axis_deg.to_radians();

    ShotRecord {
        shot_id: metrics.shot_id,
        ball_speed_mph: metrics.ball_speed_mps * MPS_TO_MPH,
        club_speed_mph: metrics.club_head_speed_mps * MPS_TO_MPH,
        launch_angle_deg: metrics.launch_angle_deg,
        launch_direction_deg: metrics.launch_direction_deg,
        spin_axis_deg,
        side_spin_rpm: metrics.total_spin_rpm * axis_rad.sin(),
        back_spin_rpm: metrics.total_spin_rpm * axis_rad.cos(),
        attack_angle_deg: metrics.attack_angle_deg,
        club_face_deg: metrics.club_face_deg,
        club_path_deg: metrics.club_path_deg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(shot_id: u32, ball_speed_mps: f64, spin_axis_deg: f64, total_spin_rpm: f64) -> r10_proto::ShotMetrics {
        r10_proto::ShotMetrics {
            shot_id,
            ball_speed_mps,
            launch_angle_deg: 0.0,
            launch_direction_deg: 0.0,
            spin_axis_deg,
            total_spin_rpm,
            club_head_speed_mps: 0.0,
            attack_angle_deg: 0.0,
            club_face_deg: 0.0,
            club_path_deg: 0.0,
        }
    }

    #[test]
    fn s2_shot_delivery_scenario() {
        // spec.md §8, scenario S2.
        let shot = normalize_shot(&metrics(42, 50.0, 3.0, 3000.0));
        assert_eq!(shot.shot_id, 42);
        assert!((shot.ball_speed_mph - 111.845).abs() < 1e-3);
        assert!((shot.spin_axis_deg - (-3.0)).abs() < 1e-9);

        let expected_side = 3000.0 * (-3.0f64.to_radians()).sin();
        assert!((shot.side_spin_rpm - expected_side).abs() < 1e-9);
    }

    #[test]
    fn zero_spin_axis_has_zero_side_spin_and_full_back_spin() {
        let shot = normalize_shot(&metrics(1, 40.0, 0.0, 2500.0));
        assert!(shot.side_spin_rpm.abs() < 1e-9);
        assert!((shot.back_spin_rpm - 2500.0).abs() < 1e-9);
    }
}

// Pure gameplay rules shared by the simulation passes.

use super::entity::Team;
use super::state::{Phase, Winner};
use super::tuning::PhaseTuning;
use glam::Vec2;

/// Linear falloff from 100% at the centre to 50% at the rim; `None` outside the blast.
pub fn explosion_factor(distance: f32, radius: f32) -> Option<f32> {
    if radius <= 0.0 || distance > radius {
        return None;
    }
    Some(1.0 - 0.5 * (distance / radius))
}

/// Damage after falloff, floored, never negative.
pub fn explosion_damage(damage: i32, factor: f32) -> i32 {
    ((damage as f32) * factor).floor().max(0.0) as i32
}

/// Smallest signed difference between two angles, in `[-PI, PI]`.
pub fn angle_delta(a: f32, b: f32) -> f32 {
    let mut d = (a - b) % std::f32::consts::TAU;
    if d > std::f32::consts::PI {
        d -= std::f32::consts::TAU;
    } else if d < -std::f32::consts::PI {
        d += std::f32::consts::TAU;
    }
    d
}

pub fn in_cone(origin: Vec2, facing: f32, target: Vec2, radius: f32, half_angle: f32) -> bool {
    let offset = target - origin;
    let distance = offset.length();
    if distance > radius {
        return false;
    }
    if distance <= f32::EPSILON {
        return true;
    }
    angle_delta(offset.y.atan2(offset.x), facing).abs() <= half_angle
}

/// Phase implied by elapsed match time alone (ignores early wins).
pub fn phase_for_elapsed(elapsed_ms: u64, tuning: &PhaseTuning) -> Phase {
    let combat_at = tuning.building_ms;
    let deathmatch_at = combat_at + tuning.combat_ms;
    let end_at = deathmatch_at + tuning.deathmatch_ms;
    if elapsed_ms >= end_at {
        Phase::Ended
    } else if elapsed_ms >= deathmatch_at {
        Phase::Deathmatch
    } else if elapsed_ms >= combat_at {
        Phase::Combat
    } else {
        Phase::Building
    }
}

/// Absolute time at which `phase` ends for a match started at `started_at_ms`.
pub fn phase_end_ms(phase: Phase, started_at_ms: u64, tuning: &PhaseTuning) -> u64 {
    let combat_at = started_at_ms + tuning.building_ms;
    let deathmatch_at = combat_at + tuning.combat_ms;
    match phase {
        Phase::Building => combat_at,
        Phase::Combat => deathmatch_at,
        Phase::Deathmatch | Phase::Ended => deathmatch_at + tuning.deathmatch_ms,
    }
}

/// Per-team facts the win rules look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamStanding {
    pub team: Team,
    pub bed_hp: i32,
    pub living: usize,
}

/// A team is out once its bed is gone and none of its characters is alive.
pub fn elimination_winner(standings: &[TeamStanding; 2]) -> Option<Winner> {
    let eliminated = |s: &TeamStanding| s.bed_hp <= 0 && s.living == 0;
    match (eliminated(&standings[0]), eliminated(&standings[1])) {
        (true, true) => Some(Winner::Draw),
        (true, false) => Some(Winner::Team(standings[1].team)),
        (false, true) => Some(Winner::Team(standings[0].team)),
        (false, false) => None,
    }
}

/// Time ran out in deathmatch: bed hp, then living characters, then draw.
pub fn timeout_winner(standings: &[TeamStanding; 2]) -> Winner {
    let [a, b] = standings;
    if a.bed_hp != b.bed_hp {
        return Winner::Team(if a.bed_hp > b.bed_hp { a.team } else { b.team });
    }
    if a.living != b.living {
        return Winner::Team(if a.living > b.living { a.team } else { b.team });
    }
    Winner::Draw
}

/// Point on the circle boundary along the same bearing, if `position` lies outside it.
pub fn clamp_to_radius(center: Vec2, position: Vec2, radius: f32) -> Option<Vec2> {
    let offset = position - center;
    let distance = offset.length();
    if distance <= radius {
        return None;
    }
    Some(center + offset / distance * radius)
}

/// Eight-way approach flags `(up, down, left, right)` towards `delta`.
pub fn eight_way(delta: Vec2, deadband: f32) -> (bool, bool, bool, bool) {
    (
        delta.y < -deadband,
        delta.y > deadband,
        delta.x < -deadband,
        delta.x > deadband,
    )
}

/// Centre of the grid cell containing `position`.
pub fn snap_to_cell(position: Vec2, cell: f32) -> Vec2 {
    (position / cell).floor() * cell + Vec2::splat(cell / 2.0)
}

/// Circle vs axis-aligned rectangle overlap.
pub fn circle_overlaps_rect(center: Vec2, radius: f32, rect_center: Vec2, half: Vec2) -> bool {
    let nearest = center.clamp(rect_center - half, rect_center + half);
    nearest.distance_squared(center) < radius * radius
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning() -> PhaseTuning {
        PhaseTuning {
            building_ms: 1_000,
            combat_ms: 2_000,
            deathmatch_ms: 3_000,
            ..PhaseTuning::default()
        }
    }

    #[test]
    fn when_distance_is_at_rim_then_factor_is_half() {
        assert_eq!(explosion_factor(0.0, 160.0), Some(1.0));
        assert_eq!(explosion_factor(160.0, 160.0), Some(0.5));
        assert_eq!(explosion_factor(160.5, 160.0), None);
        assert_eq!(explosion_damage(120, 0.75), 90);
        assert_eq!(explosion_damage(7, 0.99), 6);
    }

    #[test]
    fn when_target_is_inside_half_angle_then_cone_hits() {
        let origin = Vec2::ZERO;
        assert!(in_cone(origin, 0.0, Vec2::new(50.0, 20.0), 64.0, 30f32.to_radians()));
        assert!(!in_cone(origin, 0.0, Vec2::new(20.0, 50.0), 64.0, 30f32.to_radians()));
        assert!(!in_cone(origin, 0.0, Vec2::new(70.0, 0.0), 64.0, 30f32.to_radians()));
        // Facing just under PI still covers targets just past -PI.
        assert!(in_cone(
            origin,
            3.1,
            Vec2::new(-50.0, -1.0),
            64.0,
            30f32.to_radians()
        ));
    }

    #[test]
    fn when_elapsed_grows_then_phase_never_goes_back() {
        let tuning = tuning();
        let mut last = Phase::Building;
        for elapsed in (0..7_000).step_by(50) {
            let phase = phase_for_elapsed(elapsed, &tuning);
            assert!(phase >= last);
            last = phase;
        }
        assert_eq!(phase_for_elapsed(999, &tuning), Phase::Building);
        assert_eq!(phase_for_elapsed(1_000, &tuning), Phase::Combat);
        assert_eq!(phase_for_elapsed(3_000, &tuning), Phase::Deathmatch);
        assert_eq!(phase_for_elapsed(6_000, &tuning), Phase::Ended);
        assert_eq!(phase_end_ms(Phase::Combat, 500, &tuning), 3_500);
    }

    #[test]
    fn when_one_team_has_no_bed_and_no_players_then_other_team_wins() {
        let standings = [
            TeamStanding {
                team: Team::Red,
                bed_hp: 0,
                living: 0,
            },
            TeamStanding {
                team: Team::Blue,
                bed_hp: 0,
                living: 1,
            },
        ];
        assert_eq!(
            elimination_winner(&standings),
            Some(Winner::Team(Team::Blue))
        );
    }

    #[test]
    fn when_bed_stands_then_empty_team_is_not_eliminated() {
        let standings = [
            TeamStanding {
                team: Team::Red,
                bed_hp: 10,
                living: 0,
            },
            TeamStanding {
                team: Team::Blue,
                bed_hp: 500,
                living: 2,
            },
        ];
        assert_eq!(elimination_winner(&standings), None);
    }

    #[test]
    fn when_time_runs_out_then_bed_hp_then_living_count_decide() {
        let red = |bed_hp, living| TeamStanding {
            team: Team::Red,
            bed_hp,
            living,
        };
        let blue = |bed_hp, living| TeamStanding {
            team: Team::Blue,
            bed_hp,
            living,
        };
        assert_eq!(timeout_winner(&[red(0, 1), blue(20, 0)]), Winner::Team(Team::Blue));
        assert_eq!(timeout_winner(&[red(0, 3), blue(0, 2)]), Winner::Team(Team::Red));
        assert_eq!(timeout_winner(&[red(0, 2), blue(0, 2)]), Winner::Draw);
    }

    #[test]
    fn when_outside_radius_then_clamp_keeps_bearing() {
        let clamped = clamp_to_radius(Vec2::ZERO, Vec2::new(300.0, 400.0), 100.0)
            .expect("outside radius");
        assert!((clamped - Vec2::new(60.0, 80.0)).length() < 1e-4);
        assert_eq!(clamp_to_radius(Vec2::ZERO, Vec2::new(10.0, 0.0), 100.0), None);
    }

    #[test]
    fn when_snapping_then_position_lands_in_cell_centre() {
        assert_eq!(snap_to_cell(Vec2::new(41.0, 79.0), 40.0), Vec2::new(60.0, 60.0));
        assert_eq!(snap_to_cell(Vec2::new(0.0, 0.0), 40.0), Vec2::new(20.0, 20.0));
    }
}

use crate::domain::agent::{Behavior, BehaviorCtx};
use crate::domain::entity::EntityId;
use crate::domain::input::PlayerInput;
use crate::domain::items::ItemKind;
use crate::domain::rules::eight_way;
use glam::Vec2;

/// Drives a session's idle character: trail the active teammate and shoot at the closest enemy.
pub struct AiControl;

impl Behavior for AiControl {
    fn update(&mut self, ctx: &mut BehaviorCtx<'_, '_>) {
        let Some(input) = synthesize(ctx) else {
            return;
        };
        ctx.inputs.push_back(input);
    }
}

fn synthesize(ctx: &BehaviorCtx<'_, '_>) -> Option<PlayerInput> {
    let me = ctx.me()?;
    let player = me.as_player()?;
    if player.is_active || player.is_dead {
        return None;
    }

    let tuning = &ctx.env.tuning.player;
    let position = me.position;

    let leader = ctx.others().find_map(|e| {
        let p = e.as_player()?;
        (p.owner == player.owner && p.is_active && p.is_alive()).then_some(e.position)
    });

    let mut input = PlayerInput {
        aim: player.aim,
        ..PlayerInput::default()
    };

    if let Some(leader) = leader {
        let delta = leader - position;
        if delta.length() > tuning.ai_follow_distance {
            let (up, down, left, right) = eight_way(delta, tuning.ai_deadband);
            input.up = up;
            input.down = down;
            input.left = left;
            input.right = right;
        }
    }

    let armed = player.selected_item() == Some(ItemKind::Bow)
        && player.inventory.count(ItemKind::Arrow) > 0;
    if armed {
        if let Some((_, target)) = nearest_enemy(ctx, position, tuning.ai_detection_range) {
            input.aim = target;
            input.shoot = true;
        }
    }

    Some(input)
}

/// Closest living enemy within range; equal distances resolve to the lowest entity id.
fn nearest_enemy(ctx: &BehaviorCtx<'_, '_>, from: Vec2, range: f32) -> Option<(EntityId, Vec2)> {
    let team = ctx.me()?.as_player()?.team;
    let mut best: Option<(f32, EntityId, Vec2)> = None;
    for entity in ctx.others() {
        let Some(other) = entity.as_player() else {
            continue;
        };
        if other.team == team || other.is_dead {
            continue;
        }
        let distance = entity.position.distance(from);
        if distance > range {
            continue;
        }
        // Store iteration is in id order, so strict `<` keeps the lowest id on ties.
        if best.is_none_or(|(d, _, _)| distance < d) {
            best = Some((distance, entity.id, entity.position));
        }
    }
    best.map(|(_, id, position)| (id, position))
}

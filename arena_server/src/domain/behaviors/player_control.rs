use crate::domain::agent::{Behavior, BehaviorCtx};
use crate::domain::input::{Command, DropDirection, PlayerInput};
use crate::domain::inventory::{INVENTORY_SLOTS, TakeAmount};
use tracing::trace;

/// Applies queued inputs to the character: movement, aim, slot, build mode and actions.
pub struct PlayerControl;

impl Behavior for PlayerControl {
    fn update(&mut self, ctx: &mut BehaviorCtx<'_, '_>) {
        let Some(dead) = ctx.me().and_then(|e| e.as_player()).map(|p| p.is_dead) else {
            return;
        };
        if dead {
            // Dead characters cannot act; stale inputs must not fire after respawn.
            ctx.inputs.clear();
            return;
        }

        while let Some(input) = ctx.inputs.pop_front() {
            apply_input(ctx, input);
        }
    }
}

fn apply_input(ctx: &mut BehaviorCtx<'_, '_>, input: PlayerInput) {
    let now = ctx.env.now_ms;
    let speed = ctx.env.tuning.player.speed;
    let projectiles = ctx.env.tuning.projectile;
    let combat = ctx.env.tuning.combat;
    let entity_id = ctx.entity_id;

    ctx.env
        .physics
        .drive(ctx.body, input.move_dir() * speed);

    let Some(me) = ctx.me_mut() else { return };
    let position = me.position;
    let Some(player) = me.as_player_mut() else {
        return;
    };

    player.aim = input.aim;
    if let Some(slot) = input.selected_slot {
        if slot < INVENTORY_SLOTS {
            player.selected_slot = slot;
        }
    }
    player.build_mode = input.build;

    let aim_offset = input.aim - position;
    let facing = aim_offset.y.atan2(aim_offset.x);
    let selected = player.selected_item();
    let mut commands = Vec::new();

    if input.shoot {
        let block = selected.and_then(|item| item.block());
        let weapon = selected.and_then(|item| item.weapon());
        if player.build_mode && block.is_some() {
            if ready(player.last_place_ms, now, combat.place_cooldown_ms) {
                player.last_place_ms = Some(now);
                commands.push(Command::PlaceBlock {
                    player: entity_id,
                    target: input.aim,
                });
            }
        } else if let Some(weapon) = weapon {
            let cooldown = projectiles.profile(weapon).cooldown_ms;
            if ready(player.last_shot_ms, now, cooldown) {
                player.last_shot_ms = Some(now);
                commands.push(Command::Shoot {
                    shooter: entity_id,
                    target: input.aim,
                });
            } else {
                trace!(entity_id = entity_id.0, "shot on cooldown; dropped");
            }
        }
    }

    if input.melee && ready(player.last_melee_ms, now, combat.melee_cooldown_ms) {
        player.last_melee_ms = Some(now);
        commands.push(Command::Melee {
            attacker: entity_id,
            facing,
        });
    }

    if input.drop {
        commands.push(Command::DropItem {
            player: entity_id,
            slot: player.selected_slot,
            amount: TakeAmount::One,
            direction: DropDirection::Aim(aim_offset),
        });
    }

    for command in commands {
        ctx.push_command(command);
    }
}

fn ready(last: Option<u64>, now: u64, cooldown_ms: u64) -> bool {
    last.is_none_or(|at| now.saturating_sub(at) >= cooldown_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_cooldown_has_not_elapsed_then_action_is_not_ready() {
        assert!(ready(None, 0, 600));
        assert!(!ready(Some(1_000), 1_599, 600));
        assert!(ready(Some(1_000), 1_600, 600));
    }
}

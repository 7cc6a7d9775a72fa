use crate::domain::agent::{Behavior, BehaviorCtx};

/// Copies the body position back into the replicated entity record.
pub struct SyncTransform;

impl Behavior for SyncTransform {
    fn post_update(&mut self, ctx: &mut BehaviorCtx<'_, '_>) {
        let Some(position) = ctx.env.physics.position(ctx.body) else {
            return;
        };
        if let Some(me) = ctx.me_mut() {
            me.position = position;
        }
    }
}

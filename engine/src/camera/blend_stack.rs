//! Camera Blend Stack
//!
//! Owns one persistent [`CameraMode`] instance per `(kind, view target)` pair
//! and an ordered stack of active entries, index 0 on top. Each tick the
//! stack:
//!
//! 1. Picks the best mode for the current view target and pushes or promotes it
//! 2. Advances transition alphas, dropping entries that have fully blended out
//! 3. Updates every entry (locked outgoing entries replay their last POV)
//! 4. Blends the entries' POVs by normalized weight
//!
//! Rotation is blended bottom-up with a shortest-path angular lerp, so two
//! cameras at yaw 170 and -170 meet at 180 rather than sweeping through 0.

use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::collision::CollisionQuery;
use super::mode::{CameraMode, CameraModeKind, CameraUpdateContext, DEFAULT_APERTURE};
use super::types::{CameraPov, DepthOfField, ViewTarget, ViewTargetId};
use crate::math::{Rotator, SMALL_NUMBER, clamp_angle};

/// Aperture assumed for blending entries that do not report one.
pub const OUTGOING_DEFAULT_APERTURE: f32 = 8.0;

/// Stack-wide tuning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendStackSettings {
    /// Planar distance between the new view target and the previous camera
    /// past which a target change cuts instead of blending. Default 10000.
    pub teleport_distance: f32,
    /// Upper bound on the tick for physics-simulated view targets
    pub max_physics_delta_time: f32,
    /// `(min, max)` view pitch when the active mode has no override
    pub default_view_pitch_limits: (f32, f32),
    /// Extra clearance around the player capsule before it is hidden
    pub hide_player_padding: f32,
}

impl Default for BlendStackSettings {
    fn default() -> Self {
        Self {
            teleport_distance: 10_000.0,
            max_physics_delta_time: 1.0 / 30.0,
            default_view_pitch_limits: (-89.9, 89.9),
            hide_player_padding: 15.0,
        }
    }
}

/// Resolves view target ids to this tick's target state.
pub trait ViewTargetSource {
    fn view_target(&self, id: ViewTargetId) -> Option<ViewTarget>;
}

impl ViewTargetSource for HashMap<ViewTargetId, ViewTarget> {
    fn view_target(&self, id: ViewTargetId) -> Option<ViewTarget> {
        self.get(&id).copied()
    }
}

impl ViewTargetSource for [ViewTarget] {
    fn view_target(&self, id: ViewTargetId) -> Option<ViewTarget> {
        self.iter().find(|t| t.id == id).copied()
    }
}

impl ViewTargetSource for Vec<ViewTarget> {
    fn view_target(&self, id: ViewTargetId) -> Option<ViewTarget> {
        self.as_slice().view_target(id)
    }
}

/// Builds fresh mode instances on demand.
pub trait CameraModeFactory: Send {
    fn create(&self, kind: CameraModeKind) -> Box<dyn CameraMode>;
}

impl<F> CameraModeFactory for F
where
    F: Fn(CameraModeKind) -> Box<dyn CameraMode> + Send,
{
    fn create(&self, kind: CameraModeKind) -> Box<dyn CameraMode> {
        self(kind)
    }
}

/// Chooses the mode a view target should be viewed through. `None` falls
/// back to the static camera.
pub trait CameraModeSelector: Send {
    fn select(&self, target: &ViewTarget) -> Option<CameraModeKind>;
}

impl<F> CameraModeSelector for F
where
    F: Fn(&ViewTarget) -> Option<CameraModeKind> + Send,
{
    fn select(&self, target: &ViewTarget) -> Option<CameraModeKind> {
        self(target)
    }
}

/// Vehicles get the driving camera, characters the third-person camera.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultModeSelector;

impl CameraModeSelector for DefaultModeSelector {
    fn select(&self, target: &ViewTarget) -> Option<CameraModeKind> {
        if target.vehicle.is_some() {
            Some(CameraModeKind::Driving)
        } else if target.capsule.is_some() {
            Some(CameraModeKind::ThirdPerson)
        } else {
            None
        }
    }
}

/// Identity of a mode instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstanceKey {
    pub kind: CameraModeKind,
    pub view_target: ViewTargetId,
}

#[derive(Clone, Copy, Debug)]
struct ActiveCameraEntry {
    key: InstanceKey,
    transition_alpha: f32,
    transition_update_rate: f32, // alpha per second, 0 = already fully in
    blend_weight: f32,
    lock_outgoing_pov: bool,
    last_pov: CameraPov,
}

/// Snapshot of one stack entry for the debug channel.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraStackEntryInfo {
    pub index: usize,
    pub kind: CameraModeKind,
    pub name: &'static str,
    pub view_target: ViewTargetId,
    pub transition_alpha: f32,
    pub blend_weight: f32,
    pub lock_outgoing_pov: bool,
    pub blocking_targets: Vec<ViewTargetId>,
}

#[derive(Clone, Copy, Debug, Default)]
struct AlternateCamera {
    mode: Option<CameraModeKind>,
    view_target: Option<ViewTargetId>,
    transition_time: f32,
    in_use: bool,
    saved_view_target: Option<ViewTargetId>,
}

/// Blends the outputs of every active camera mode into the final POV.
pub struct CameraBlendStack {
    settings: BlendStackSettings,
    factory: Box<dyn CameraModeFactory>,
    selector: Box<dyn CameraModeSelector>,
    instances: HashMap<InstanceKey, Box<dyn CameraMode>>,
    stack: Vec<ActiveCameraEntry>,
    view_target: Option<ViewTargetId>,
    pov: CameraPov,
    transition_goal_pov: CameraPov,
    control_rotation: Rotator,
    view_pitch_limits: (f32, f32),
    alternate: AlternateCamera,
    /// Overrides the next pushed entry's transition time
    pending_transition_time: Option<f32>,
    player: Option<ViewTargetId>,
    player_hidden: bool,
}

impl CameraBlendStack {
    pub fn new(
        settings: BlendStackSettings,
        factory: impl CameraModeFactory + 'static,
        selector: impl CameraModeSelector + 'static,
    ) -> Self {
        Self {
            settings,
            factory: Box::new(factory),
            selector: Box::new(selector),
            instances: HashMap::new(),
            stack: Vec::new(),
            view_target: None,
            pov: CameraPov::default(),
            transition_goal_pov: CameraPov::default(),
            control_rotation: Rotator::ZERO,
            view_pitch_limits: settings.default_view_pitch_limits,
            alternate: AlternateCamera::default(),
            pending_transition_time: None,
            player: None,
            player_hidden: false,
        }
    }

    #[inline]
    pub fn settings(&self) -> &BlendStackSettings {
        &self.settings
    }

    #[inline]
    pub fn get_view_target(&self) -> Option<ViewTargetId> {
        self.view_target
    }

    #[inline]
    pub fn set_view_target(&mut self, target: Option<ViewTargetId>) {
        self.view_target = target;
    }

    /// Last blended POV.
    #[inline]
    pub fn get_pov(&self) -> CameraPov {
        self.pov
    }

    #[inline]
    pub fn get_control_rotation(&self) -> Rotator {
        self.control_rotation
    }

    #[inline]
    pub fn set_control_rotation(&mut self, rotation: Rotator) {
        self.control_rotation = rotation;
    }

    /// Applies look input, keeping pitch inside the active view pitch limits.
    pub fn add_control_input(&mut self, delta: Rotator) {
        let mut rotation = (self.control_rotation + delta).normalized();
        let (min, max) = self.view_pitch_limits;
        rotation.pitch = clamp_angle(rotation.pitch, min, max);
        self.control_rotation = rotation;
    }

    #[inline]
    pub fn get_view_pitch_limits(&self) -> (f32, f32) {
        self.view_pitch_limits
    }

    /// Entity whose capsule is hidden when the camera gets too close.
    #[inline]
    pub fn set_player_character(&mut self, player: Option<ViewTargetId>) {
        self.player = player;
        if player.is_none() {
            self.player_hidden = false;
        }
    }

    #[inline]
    pub fn is_player_hidden(&self) -> bool {
        self.player_hidden
    }

    #[inline]
    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    #[inline]
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Kind of the top entry.
    pub fn current_mode(&self) -> Option<CameraModeKind> {
        self.stack.first().map(|e| e.key.kind)
    }

    pub fn instance(&self, key: InstanceKey) -> Option<&dyn CameraMode> {
        self.instances.get(&key).map(|m| m.as_ref())
    }

    pub fn instance_mut(&mut self, key: InstanceKey) -> Option<&mut (dyn CameraMode + 'static)> {
        self.instances.get_mut(&key).map(|m| m.as_mut())
    }

    // ========================================================================
    // Alternate camera
    // ========================================================================

    /// Registers the camera used while the alternate camera is switched on.
    pub fn configure_alternate_camera(&mut self, mode: CameraModeKind, target: ViewTargetId, transition_time: f32) {
        self.alternate.mode = Some(mode);
        self.alternate.view_target = Some(target);
        self.alternate.transition_time = transition_time.max(0.0);
    }

    pub fn has_alternate_camera_available(&self) -> bool {
        self.alternate.mode.is_some() && self.alternate.view_target.is_some()
    }

    #[inline]
    pub fn is_using_alternate_camera(&self) -> bool {
        self.alternate.in_use
    }

    /// Switches to or away from the alternate camera. Switching on saves the
    /// current view target so switching off can restore it.
    pub fn set_using_alternate_camera(&mut self, use_alternate: bool) {
        if use_alternate == self.alternate.in_use {
            return;
        }
        if use_alternate {
            if !self.has_alternate_camera_available() {
                log::debug!("alternate camera requested but none is configured");
                return;
            }
            self.alternate.saved_view_target = self.view_target;
            self.view_target = self.alternate.view_target;
            self.alternate.in_use = true;
        } else {
            self.view_target = self.alternate.saved_view_target.take();
            self.alternate.in_use = false;
        }
        self.pending_transition_time = Some(self.alternate.transition_time);
        log::debug!("alternate camera {}", if use_alternate { "on" } else { "off" });
    }

    pub fn clear_alternate_camera(&mut self) {
        if self.alternate.in_use {
            self.set_using_alternate_camera(false);
        }
        self.alternate = AlternateCamera::default();
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Runs one camera tick and returns the blended POV. Without a resolvable
    /// view target the previous POV is returned unchanged.
    pub fn update_view_target(
        &mut self,
        targets: &dyn ViewTargetSource,
        collision: &dyn CollisionQuery,
        delta_time: f32,
    ) -> CameraPov {
        let Some(target_id) = self.view_target else {
            return self.pov;
        };
        let Some(target) = targets.view_target(target_id) else {
            log::debug!("view target {} not found, keeping previous pov", target_id);
            return self.pov;
        };

        let dt = if target.simulating_physics {
            delta_time.min(self.settings.max_physics_delta_time)
        } else {
            delta_time
        };

        let kind = self.determine_best_kind(&target);
        let key = InstanceKey { kind, view_target: target_id };
        if !self.instances.contains_key(&key) {
            log::debug!("creating {:?} camera for target {}", kind, target_id);
            self.instances.insert(key, self.factory.create(kind));
        }

        if self.stack.first().map(|e| e.key) != Some(key) {
            self.push_camera(key, &target);
        }

        self.advance_blend_weights(targets, dt);

        let base_pov = CameraPov {
            location: self.pov.location,
            rotation: self.pov.rotation,
            ..Default::default()
        };
        // Bottom-up so the top entry writes the control rotation last
        for index in (0..self.stack.len()).rev() {
            let entry = &mut self.stack[index];
            if index > 0 && entry.lock_outgoing_pov {
                continue;
            }
            let Some(view_target) = targets.view_target(entry.key.view_target) else {
                continue;
            };
            let Some(mode) = self.instances.get_mut(&entry.key) else {
                continue;
            };
            let mut pov = base_pov;
            let mut ctx = CameraUpdateContext {
                view_target: &view_target,
                control_rotation: &mut self.control_rotation,
                collision,
                delta_time: dt,
            };
            mode.update_camera(&mut ctx, &mut pov);
            entry.last_pov = pov;
        }

        let blended = self.blend_entries();
        self.pov = blended;
        self.transition_goal_pov = self.stack.first().map_or(blended, |e| e.last_pov);
        self.update_player_visibility(targets);
        blended
    }

    fn determine_best_kind(&self, target: &ViewTarget) -> CameraModeKind {
        if self.alternate.in_use && self.has_alternate_camera_available() {
            if let Some(mode) = self.alternate.mode {
                return mode;
            }
        }
        self.selector.select(target).unwrap_or_default()
    }

    fn push_camera(&mut self, key: InstanceKey, target: &ViewTarget) {
        let previous = self.stack.first().map(|e| e.key);
        if let Some(top) = self.stack.first_mut() {
            top.lock_outgoing_pov = self
                .instances
                .get(&top.key)
                .is_some_and(|m| m.should_lock_outgoing_pov());
        }
        let pending_transition_time = self.pending_transition_time.take();

        if let Some(index) = self.stack.iter().position(|e| e.key == key) {
            self.stack.swap(0, index);
            if self.stack[0].transition_update_rate.abs() <= SMALL_NUMBER {
                self.stack[0].transition_alpha = 1.0;
                let removed: Vec<InstanceKey> = self.stack.drain(1..).map(|e| e.key).collect();
                self.notify_removed(&removed);
            }
        } else {
            let mut transition_time = if self.stack.is_empty() {
                0.0
            } else {
                pending_transition_time
                    .unwrap_or_else(|| self.instances.get(&key).map_or(0.0, |m| m.transition_time()))
            };
            if previous.is_some_and(|prev| prev.view_target != key.view_target) {
                let jump = (target.location - self.transition_goal_pov.location).truncate().length();
                if jump > self.settings.teleport_distance {
                    log::debug!("view target jumped {:.0} units, cutting", jump);
                    transition_time = 0.0;
                }
            }

            let entry = if transition_time > 0.0 {
                ActiveCameraEntry {
                    key,
                    transition_alpha: 0.0,
                    transition_update_rate: 1.0 / transition_time,
                    blend_weight: 0.0,
                    lock_outgoing_pov: false,
                    last_pov: self.pov,
                }
            } else {
                let removed: Vec<InstanceKey> = self.stack.drain(..).map(|e| e.key).collect();
                self.notify_removed(&removed);
                ActiveCameraEntry {
                    key,
                    transition_alpha: 1.0,
                    transition_update_rate: 0.0,
                    blend_weight: 1.0,
                    lock_outgoing_pov: false,
                    last_pov: self.pov,
                }
            };
            self.stack.insert(0, entry);
        }

        if let Some(prev) = previous {
            if let Some(mode) = self.instances.get_mut(&prev) {
                mode.on_become_inactive(key.kind);
            }
        }
        let camera = self.pov;
        let mut pitch_override = None;
        if let Some(mode) = self.instances.get_mut(&key) {
            mode.on_become_active(target, previous.map(|k| k.kind), &camera);
            pitch_override = mode.settings().view_pitch_override;
        }
        self.view_pitch_limits = pitch_override.unwrap_or(self.settings.default_view_pitch_limits);

        log::debug!(
            "camera {:?} -> {:?} on target {} (stack depth {})",
            previous.map(|k| k.kind),
            key.kind,
            key.view_target,
            self.stack.len()
        );
    }

    fn notify_removed(&mut self, keys: &[InstanceKey]) {
        for key in keys {
            if let Some(mode) = self.instances.get_mut(key) {
                mode.on_removed_from_stack();
            }
        }
    }

    fn advance_blend_weights(&mut self, targets: &dyn ViewTargetSource, dt: f32) {
        let Some(top) = self.stack.first_mut() else {
            return;
        };
        let delta = top.transition_update_rate * dt;
        top.transition_alpha = (top.transition_alpha + delta).clamp(0.0, 1.0);
        top.blend_weight = self.instances.get(&top.key).map_or(1.0, |m| m.blend_alpha(top.transition_alpha));

        let mut removed = Vec::new();
        let mut index = 1;
        while index < self.stack.len() {
            let entry = &mut self.stack[index];
            entry.transition_alpha = (entry.transition_alpha - delta).clamp(0.0, 1.0);
            entry.blend_weight = self
                .instances
                .get(&entry.key)
                .map_or(0.0, |m| m.blend_alpha(entry.transition_alpha));
            let target_alive = targets.view_target(entry.key.view_target).is_some();
            if !target_alive || entry.transition_alpha <= SMALL_NUMBER || entry.blend_weight <= SMALL_NUMBER {
                removed.push(self.stack.remove(index).key);
            } else {
                index += 1;
            }
        }
        self.notify_removed(&removed);
    }

    fn blend_entries(&self) -> CameraPov {
        if self.stack.is_empty() {
            return self.pov;
        }
        let total: f32 = self.stack.iter().map(|e| e.blend_weight).sum();
        let weight_of = |index: usize, entry: &ActiveCameraEntry| {
            if total > SMALL_NUMBER {
                entry.blend_weight / total
            } else if index == 0 {
                1.0
            } else {
                0.0
            }
        };

        let mut location = Vec3::ZERO;
        let mut fov = 0.0;
        let mut fstop = 0.0;
        let mut fstop_override = false;
        let mut focal_distance = 0.0;
        let mut focal_override = false;
        let mut skipped_focal_weight = 0.0;
        for (index, entry) in self.stack.iter().enumerate() {
            let w = weight_of(index, entry);
            let pov = &entry.last_pov;
            location += pov.location * w;
            fov += pov.fov * w;

            let default_aperture = if index == 0 { DEFAULT_APERTURE } else { OUTGOING_DEFAULT_APERTURE };
            fstop += pov.depth_of_field.fstop.unwrap_or(default_aperture) * w;
            fstop_override |= pov.depth_of_field.fstop.is_some();

            match pov.depth_of_field.focal_distance {
                Some(distance) => {
                    focal_distance += distance * w;
                    focal_override = true;
                }
                None => skipped_focal_weight += w,
            }
        }
        if focal_override && 1.0 - skipped_focal_weight > SMALL_NUMBER {
            focal_distance /= 1.0 - skipped_focal_weight;
        }

        // Bottom-up so each entry blends against everything beneath it
        let mut rotation = Rotator::ZERO;
        let mut rotation_weight = 0.0;
        for (index, entry) in self.stack.iter().enumerate().rev() {
            let w = weight_of(index, entry);
            if index == self.stack.len() - 1 {
                rotation = entry.last_pov.rotation;
                rotation_weight = w;
            } else {
                rotation = blend_rots(entry.last_pov.rotation, w, rotation, rotation_weight);
                rotation_weight += w;
            }
        }

        CameraPov {
            location,
            rotation,
            fov,
            depth_of_field: DepthOfField {
                fstop: fstop_override.then_some(fstop),
                focal_distance: focal_override.then_some(focal_distance),
            },
        }
    }

    fn update_player_visibility(&mut self, targets: &dyn ViewTargetSource) {
        let Some(player) = self.player.and_then(|id| targets.view_target(id)) else {
            self.player_hidden = false;
            return;
        };
        let Some(capsule) = player.capsule else {
            self.player_hidden = false;
            return;
        };
        let hidden = capsule.distance_to_axis(player.location, self.pov.location)
            < capsule.radius + self.settings.hide_player_padding;
        if hidden != self.player_hidden {
            log::debug!("player {} {}", player.id, if hidden { "hidden" } else { "visible" });
        }
        self.player_hidden = hidden;
    }

    // ========================================================================
    // Maintenance and debug
    // ========================================================================

    /// Drops mode instances whose view targets no longer resolve, along with
    /// their stack entries.
    pub fn cleanup_outdated_instances(&mut self, targets: &dyn ViewTargetSource) {
        let before = self.instances.len();
        self.instances.retain(|key, _| targets.view_target(key.view_target).is_some());
        let instances = &self.instances;
        self.stack.retain(|e| instances.contains_key(&e.key));
        let dropped = before - self.instances.len();
        if dropped > 0 {
            log::debug!("dropped {} outdated camera instances", dropped);
        }
    }

    pub fn debug_entries(&self) -> Vec<CameraStackEntryInfo> {
        self.stack
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let mode = self.instances.get(&entry.key);
                CameraStackEntryInfo {
                    index,
                    kind: entry.key.kind,
                    name: mode.map_or("missing", |m| m.debug_name()),
                    view_target: entry.key.view_target,
                    transition_alpha: entry.transition_alpha,
                    blend_weight: entry.blend_weight,
                    lock_outgoing_pov: entry.lock_outgoing_pov,
                    blocking_targets: mode.map(|m| m.blocking_targets().to_vec()).unwrap_or_default(),
                }
            })
            .collect()
    }
}

/// Moves `a` toward `b` along the shortest arc by `b`'s share of the weight.
pub fn blend_rots(a: Rotator, weight_a: f32, b: Rotator, weight_b: f32) -> Rotator {
    let total = weight_a + weight_b;
    if total <= SMALL_NUMBER {
        return a;
    }
    let delta = (b - a).normalized();
    (a + delta * (weight_b / total)).normalized()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::collision::NoCollision;
    use crate::camera::mode::{CameraModeSettings, StaticCamera, TransitionParams};
    use crate::camera::types::Capsule;

    /// Static camera that reports a fixed pose so blends are easy to check.
    struct PoseCamera {
        settings: CameraModeSettings,
        location: Vec3,
        rotation: Rotator,
        active: bool,
    }

    impl CameraMode for PoseCamera {
        fn kind(&self) -> CameraModeKind {
            CameraModeKind::ThirdPerson
        }

        fn settings(&self) -> &CameraModeSettings {
            &self.settings
        }

        fn update_camera(&mut self, ctx: &mut CameraUpdateContext<'_>, pov: &mut CameraPov) {
            pov.location = ctx.view_target.location + self.location;
            pov.rotation = self.rotation;
            pov.fov = self.settings.fov;
        }

        fn on_become_active(&mut self, _target: &ViewTarget, _previous: Option<CameraModeKind>, _camera: &CameraPov) {
            self.active = true;
        }

        fn on_become_inactive(&mut self, _next: CameraModeKind) {
            self.active = false;
        }

        fn skip_next_interpolation(&mut self) {}

        fn is_active(&self) -> bool {
            self.active
        }
    }

    fn linear(blend_time: f32) -> CameraModeSettings {
        CameraModeSettings {
            fov: 90.0,
            transition: TransitionParams {
                blend_time,
                blend_function: crate::camera::mode::BlendFunction::Linear,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn pose_factory(blend_time: f32, yaw_by_kind: [f32; 3]) -> impl CameraModeFactory {
        move |kind: CameraModeKind| -> Box<dyn CameraMode> {
            let yaw = match kind {
                CameraModeKind::Static => yaw_by_kind[0],
                CameraModeKind::ThirdPerson => yaw_by_kind[1],
                CameraModeKind::Driving => yaw_by_kind[2],
            };
            Box::new(PoseCamera {
                settings: linear(blend_time),
                location: Vec3::new(-100.0, 0.0, 0.0),
                rotation: Rotator::new(0.0, yaw, 0.0),
                active: false,
            })
        }
    }

    fn character(id: ViewTargetId, location: Vec3) -> ViewTarget {
        ViewTarget {
            capsule: Some(Capsule { radius: 40.0, half_height: 90.0 }),
            ..ViewTarget::new(id, location, Rotator::ZERO)
        }
    }

    fn prop(id: ViewTargetId, location: Vec3) -> ViewTarget {
        ViewTarget::new(id, location, Rotator::ZERO)
    }

    // ========================================================================
    // Rotation blending
    // ========================================================================

    #[test]
    fn test_blend_rots_takes_shortest_arc() {
        let r = blend_rots(Rotator::new(0.0, 170.0, 0.0), 0.5, Rotator::new(0.0, -170.0, 0.0), 0.5);
        assert!((r.yaw.abs() - 180.0).abs() < 1e-3, "yaw = {}", r.yaw);

        let r = blend_rots(Rotator::new(0.0, 10.0, 0.0), 0.75, Rotator::new(0.0, 50.0, 0.0), 0.25);
        assert!((r.yaw - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_blend_rots_zero_weight_keeps_first() {
        let a = Rotator::new(10.0, 20.0, 0.0);
        assert_eq!(blend_rots(a, 0.0, Rotator::new(0.0, 90.0, 0.0), 0.0), a);
    }

    // ========================================================================
    // Stack behaviour
    // ========================================================================

    #[test]
    fn test_first_camera_cuts_in() {
        let mut stack = CameraBlendStack::new(BlendStackSettings::default(), pose_factory(1.0, [0.0; 3]), DefaultModeSelector);
        let targets = vec![character(1, Vec3::new(50.0, 0.0, 0.0))];
        stack.set_view_target(Some(1));

        let pov = stack.update_view_target(&targets, &NoCollision, 0.1);

        assert_eq!(stack.stack_len(), 1);
        assert_eq!(stack.current_mode(), Some(CameraModeKind::ThirdPerson));
        assert!((pov.location - Vec3::new(-50.0, 0.0, 0.0)).length() < 1e-4);
        let info = stack.debug_entries();
        assert_eq!(info[0].transition_alpha, 1.0);
        assert_eq!(info[0].blend_weight, 1.0);
    }

    #[test]
    fn test_missing_view_target_keeps_previous_pov() {
        let mut stack = CameraBlendStack::new(BlendStackSettings::default(), pose_factory(1.0, [0.0; 3]), DefaultModeSelector);
        let targets = vec![character(1, Vec3::ZERO)];
        stack.set_view_target(Some(1));
        let first = stack.update_view_target(&targets, &NoCollision, 0.1);

        stack.set_view_target(Some(7));
        let second = stack.update_view_target(&targets, &NoCollision, 0.1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_weights_normalize_during_transition() {
        let mut stack = CameraBlendStack::new(
            BlendStackSettings::default(),
            pose_factory(1.0, [170.0, 0.0, -170.0]),
            DefaultModeSelector,
        );
        let mut targets = vec![prop(1, Vec3::ZERO)];
        stack.set_view_target(Some(1));
        stack.update_view_target(&targets, &NoCollision, 0.1);

        // Same target becomes a vehicle, so the driving mode blends in over 1 s
        targets[0].vehicle = Some(Default::default());
        let pov = stack.update_view_target(&targets, &NoCollision, 0.5);

        let info = stack.debug_entries();
        assert_eq!(info.len(), 2);
        assert_eq!(info[0].kind, CameraModeKind::Driving);
        assert!((info[0].transition_alpha - 0.5).abs() < 1e-5);
        assert!((info[1].transition_alpha - 0.5).abs() < 1e-5);
        let total: f32 = info.iter().map(|e| e.blend_weight).sum();
        assert!((total - 1.0).abs() < 1e-5);
        // 170 and -170 at equal weight meet at the back
        assert!((pov.rotation.yaw.abs() - 180.0).abs() < 1e-3, "yaw = {}", pov.rotation.yaw);
        assert!((pov.fov - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_outgoing_entry_removed_after_blend() {
        let mut stack = CameraBlendStack::new(BlendStackSettings::default(), pose_factory(0.5, [0.0; 3]), DefaultModeSelector);
        let mut targets = vec![prop(1, Vec3::ZERO)];
        stack.set_view_target(Some(1));
        stack.update_view_target(&targets, &NoCollision, 0.1);

        targets[0].vehicle = Some(Default::default());
        for _ in 0..3 {
            stack.update_view_target(&targets, &NoCollision, 0.15);
        }
        assert_eq!(stack.stack_len(), 2);
        stack.update_view_target(&targets, &NoCollision, 0.15);
        assert_eq!(stack.stack_len(), 1);
        assert_eq!(stack.current_mode(), Some(CameraModeKind::Driving));
    }

    #[test]
    fn test_teleport_cuts_instead_of_blending() {
        let mut stack = CameraBlendStack::new(BlendStackSettings::default(), pose_factory(1.0, [0.0; 3]), DefaultModeSelector);
        let targets = vec![character(1, Vec3::ZERO), character(2, Vec3::new(20_000.0, 0.0, 0.0))];
        stack.set_view_target(Some(1));
        stack.update_view_target(&targets, &NoCollision, 0.1);

        stack.set_view_target(Some(2));
        let pov = stack.update_view_target(&targets, &NoCollision, 0.1);

        assert_eq!(stack.stack_len(), 1);
        assert!((pov.location - Vec3::new(19_900.0, 0.0, 0.0)).length() < 1e-2);
    }

    #[test]
    fn test_nearby_target_change_blends() {
        let mut stack = CameraBlendStack::new(BlendStackSettings::default(), pose_factory(1.0, [0.0; 3]), DefaultModeSelector);
        let targets = vec![character(1, Vec3::ZERO), character(2, Vec3::new(1_000.0, 0.0, 0.0))];
        stack.set_view_target(Some(1));
        stack.update_view_target(&targets, &NoCollision, 0.1);

        stack.set_view_target(Some(2));
        let pov = stack.update_view_target(&targets, &NoCollision, 0.5);

        assert_eq!(stack.stack_len(), 2);
        assert!((pov.location.x - 400.0).abs() < 1e-2, "x = {}", pov.location.x);
    }

    #[test]
    fn test_returning_to_settled_entry_cuts() {
        let mut stack = CameraBlendStack::new(BlendStackSettings::default(), pose_factory(1.0, [0.0; 3]), DefaultModeSelector);
        let targets = vec![character(1, Vec3::ZERO), character(2, Vec3::new(1_000.0, 0.0, 0.0))];
        stack.set_view_target(Some(1));
        stack.update_view_target(&targets, &NoCollision, 0.1);
        stack.set_view_target(Some(2));
        stack.update_view_target(&targets, &NoCollision, 0.1);
        assert_eq!(stack.stack_len(), 2);

        // Entry for target 1 was pushed as a cut, so promoting it again is a cut too
        stack.set_view_target(Some(1));
        let pov = stack.update_view_target(&targets, &NoCollision, 0.1);
        assert_eq!(stack.stack_len(), 1);
        assert!((pov.location - Vec3::new(-100.0, 0.0, 0.0)).length() < 1e-3);
        let outgoing_active = stack
            .instance(InstanceKey { kind: CameraModeKind::ThirdPerson, view_target: 2 })
            .map(|m| m.is_active());
        assert_eq!(outgoing_active, Some(false));
    }

    #[test]
    fn test_locked_outgoing_pov_is_replayed() {
        let factory = |kind: CameraModeKind| -> Box<dyn CameraMode> {
            let mut settings = linear(1.0);
            settings.transition.lock_outgoing = kind == CameraModeKind::ThirdPerson;
            Box::new(PoseCamera {
                settings,
                location: Vec3::new(-100.0, 0.0, 0.0),
                rotation: Rotator::ZERO,
                active: false,
            })
        };
        let mut stack = CameraBlendStack::new(BlendStackSettings::default(), factory, DefaultModeSelector);
        let mut targets = vec![character(1, Vec3::ZERO)];
        stack.set_view_target(Some(1));
        stack.update_view_target(&targets, &NoCollision, 0.1);

        // Character gets in a vehicle and drives off; the outgoing camera stays put
        targets[0].vehicle = Some(Default::default());
        targets[0].location = Vec3::new(200.0, 0.0, 0.0);
        let pov = stack.update_view_target(&targets, &NoCollision, 0.5);

        let info = stack.debug_entries();
        assert!(info[1].lock_outgoing_pov);
        // Driving camera at 100, locked third-person camera still at -100
        assert!(pov.location.x.abs() < 1e-2, "x = {}", pov.location.x);
    }

    #[test]
    fn test_physics_targets_clamp_delta_time() {
        let mut stack = CameraBlendStack::new(BlendStackSettings::default(), pose_factory(1.0, [0.0; 3]), DefaultModeSelector);
        let mut targets = vec![prop(1, Vec3::ZERO)];
        targets[0].simulating_physics = true;
        stack.set_view_target(Some(1));
        stack.update_view_target(&targets, &NoCollision, 0.1);

        targets[0].vehicle = Some(Default::default());
        stack.update_view_target(&targets, &NoCollision, 0.5);
        let info = stack.debug_entries();
        assert!((info[0].transition_alpha - 1.0 / 30.0).abs() < 1e-5);
    }

    #[test]
    fn test_depth_of_field_aggregation() {
        let factory = |kind: CameraModeKind| -> Box<dyn CameraMode> {
            let mut settings = linear(1.0);
            if kind == CameraModeKind::Driving {
                settings.cine.use_cine_cam = true;
                settings.cine.use_cine_cam_settings = true;
                settings.cine.aperture = 4.0;
            }
            Box::new(StaticCamera::new(settings))
        };
        let mut stack = CameraBlendStack::new(BlendStackSettings::default(), factory, DefaultModeSelector);
        let mut targets = vec![prop(1, Vec3::new(100.0, 0.0, 0.0))];
        stack.set_view_target(Some(1));
        stack.update_view_target(&targets, &NoCollision, 0.1);

        targets[0].vehicle = Some(Default::default());
        let pov = stack.update_view_target(&targets, &NoCollision, 0.5);

        // Top aperture 4 at half weight, outgoing static default 8 at half weight
        assert_eq!(pov.depth_of_field.fstop, Some(6.0));
        // Only the driving entry reports focus, so it is renormalized to full weight
        let focal = pov.depth_of_field.focal_distance.unwrap();
        assert!((focal - 100.0).abs() < 1e-3, "focal = {}", focal);
    }

    // ========================================================================
    // Control rotation, alternate camera, player hiding
    // ========================================================================

    /// Writes a per-kind yaw into the control rotation.
    struct AimCamera {
        kind: CameraModeKind,
        settings: CameraModeSettings,
        active: bool,
    }

    impl CameraMode for AimCamera {
        fn kind(&self) -> CameraModeKind {
            self.kind
        }

        fn settings(&self) -> &CameraModeSettings {
            &self.settings
        }

        fn update_camera(&mut self, ctx: &mut CameraUpdateContext<'_>, pov: &mut CameraPov) {
            let yaw = if self.kind == CameraModeKind::Driving { 50.0 } else { 10.0 };
            *ctx.control_rotation = Rotator::new(0.0, yaw, 0.0);
            pov.location = ctx.view_target.location;
            pov.rotation = *ctx.control_rotation;
        }

        fn on_become_active(&mut self, _target: &ViewTarget, _previous: Option<CameraModeKind>, _camera: &CameraPov) {
            self.active = true;
        }

        fn on_become_inactive(&mut self, _next: CameraModeKind) {
            self.active = false;
        }

        fn skip_next_interpolation(&mut self) {}

        fn is_active(&self) -> bool {
            self.active
        }
    }

    #[test]
    fn test_top_entry_owns_control_rotation() {
        let factory = |kind: CameraModeKind| -> Box<dyn CameraMode> {
            Box::new(AimCamera { kind, settings: linear(1.0), active: false })
        };
        let mut stack = CameraBlendStack::new(BlendStackSettings::default(), factory, DefaultModeSelector);
        let mut targets = vec![character(1, Vec3::ZERO)];
        stack.set_view_target(Some(1));
        stack.update_view_target(&targets, &NoCollision, 0.1);
        assert!((stack.get_control_rotation().yaw - 10.0).abs() < 1e-4);

        targets[0].vehicle = Some(Default::default());
        stack.update_view_target(&targets, &NoCollision, 0.1);

        assert_eq!(stack.stack_len(), 2);
        assert!((stack.get_control_rotation().yaw - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_control_input_clamped_to_pitch_limits() {
        let mut stack = CameraBlendStack::new(BlendStackSettings::default(), pose_factory(1.0, [0.0; 3]), DefaultModeSelector);
        stack.add_control_input(Rotator::new(120.0, 30.0, 0.0));
        assert!((stack.get_control_rotation().pitch - 89.9).abs() < 1e-4);
        assert!((stack.get_control_rotation().yaw - 30.0).abs() < 1e-4);
    }

    #[test]
    fn test_view_pitch_override_applies_while_active() {
        let factory = |_kind: CameraModeKind| -> Box<dyn CameraMode> {
            let mut settings = linear(0.0);
            settings.view_pitch_override = Some((-30.0, 10.0));
            Box::new(StaticCamera::new(settings))
        };
        let mut stack = CameraBlendStack::new(BlendStackSettings::default(), factory, DefaultModeSelector);
        let targets = vec![prop(1, Vec3::ZERO)];
        stack.set_view_target(Some(1));
        stack.update_view_target(&targets, &NoCollision, 0.1);

        assert_eq!(stack.get_view_pitch_limits(), (-30.0, 10.0));
        stack.add_control_input(Rotator::new(-60.0, 0.0, 0.0));
        assert!((stack.get_control_rotation().pitch + 30.0).abs() < 1e-4);
    }

    #[test]
    fn test_alternate_camera_round_trip() {
        let mut stack = CameraBlendStack::new(BlendStackSettings::default(), pose_factory(1.0, [0.0; 3]), DefaultModeSelector);
        let targets = vec![character(1, Vec3::ZERO), prop(2, Vec3::new(500.0, 0.0, 0.0))];
        stack.set_view_target(Some(1));
        stack.update_view_target(&targets, &NoCollision, 0.1);

        stack.set_using_alternate_camera(true);
        assert!(!stack.is_using_alternate_camera(), "nothing configured yet");

        stack.configure_alternate_camera(CameraModeKind::Driving, 2, 0.0);
        stack.set_using_alternate_camera(true);
        assert_eq!(stack.get_view_target(), Some(2));
        stack.update_view_target(&targets, &NoCollision, 0.1);
        assert_eq!(stack.current_mode(), Some(CameraModeKind::Driving));
        assert_eq!(stack.stack_len(), 1);

        stack.clear_alternate_camera();
        assert!(!stack.is_using_alternate_camera());
        assert!(!stack.has_alternate_camera_available());
        assert_eq!(stack.get_view_target(), Some(1));
        stack.update_view_target(&targets, &NoCollision, 0.1);
        assert_eq!(stack.current_mode(), Some(CameraModeKind::ThirdPerson));
    }

    #[test]
    fn test_player_hidden_when_camera_inside_padding() {
        let factory = |_kind: CameraModeKind| -> Box<dyn CameraMode> {
            Box::new(PoseCamera {
                settings: linear(0.0),
                location: Vec3::new(-50.0, 0.0, 0.0),
                rotation: Rotator::ZERO,
                active: false,
            })
        };
        let mut stack = CameraBlendStack::new(BlendStackSettings::default(), factory, DefaultModeSelector);
        let targets = vec![character(1, Vec3::ZERO)];
        stack.set_view_target(Some(1));
        stack.set_player_character(Some(1));

        // 50 units from the axis is inside radius 40 + padding 15
        stack.update_view_target(&targets, &NoCollision, 0.1);
        assert!(stack.is_player_hidden());

        stack.set_player_character(None);
        assert!(!stack.is_player_hidden());
    }

    #[test]
    fn test_cleanup_drops_instances_for_missing_targets() {
        let mut stack = CameraBlendStack::new(BlendStackSettings::default(), pose_factory(0.0, [0.0; 3]), DefaultModeSelector);
        let mut targets = vec![character(1, Vec3::ZERO), character(2, Vec3::new(100.0, 0.0, 0.0))];
        stack.set_view_target(Some(1));
        stack.update_view_target(&targets, &NoCollision, 0.1);
        stack.set_view_target(Some(2));
        stack.update_view_target(&targets, &NoCollision, 0.1);
        assert_eq!(stack.instance_count(), 2);

        targets.remove(0);
        stack.cleanup_outdated_instances(&targets);
        assert_eq!(stack.instance_count(), 1);

        // Removing the viewed target empties the stack too
        targets.clear();
        stack.cleanup_outdated_instances(&targets);
        assert_eq!(stack.instance_count(), 0);
        assert_eq!(stack.stack_len(), 0);
    }
}

use bevy::color::Alpha;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use std::collections::HashSet;
use std::mem;

use crate::components::{Interactive, PickBounds, ValueContainer, ValueLabel};
use crate::resources::{
    LatestPreview, OpacityState, PointerAction, PointerQueue, ValueboxAnimator, ValueboxPicker,
    ValueboxSettings,
};
use crate::scene::{quat_to_na, vec3_to_na, WorldScene};
use crate::{InsertionOutput, SubmitRejected, SubmitValues, ToggleOpacity};
use valuebox_interaction_core::{Clock, CodePreview, SubmitOutcome, Timestamp, ValueKind};
use valuebox_scene_core::{
    CameraState, PointerEvent, PointerPosition, Projection as ViewProjection, ViewportState,
};

/// Keep the animator's clock on the app's elapsed time.
pub fn sync_clock_system(time: Res<Time>, mut anim: ResMut<ValueboxAnimator>) {
    anim.0.clock_mut().set(Timestamp::from(time.elapsed()));
}

/// Translate primary-window mouse and touch input into pointer actions.
pub fn capture_pointer_system(
    mouse: Option<Res<ButtonInput<MouseButton>>>,
    touches: Option<Res<Touches>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut queue: ResMut<PointerQueue>,
) {
    let Ok(window) = windows.get_single() else {
        return;
    };
    let viewport = ViewportState::new(0.0, 0.0, window.width(), window.height());

    if let Some(mouse) = mouse {
        if let Some(cursor) = window.cursor_position() {
            let event = PointerEvent::mouse(cursor.x, cursor.y);
            if mouse.just_pressed(MouseButton::Left) {
                queue.push(PointerAction::Down(event), viewport);
            } else if mouse.pressed(MouseButton::Left) {
                queue.push(PointerAction::Move(event), viewport);
            }
        }
        if mouse.just_released(MouseButton::Left) {
            queue.push(PointerAction::Up, viewport);
        }
    }

    if let Some(touches) = touches {
        let points: Vec<PointerPosition> = touches
            .iter()
            .map(|t| PointerPosition::new(t.position().x, t.position().y))
            .collect();
        if touches.any_just_pressed() {
            queue.push(
                PointerAction::Down(PointerEvent::Touch { touches: points }),
                viewport,
            );
        } else if !points.is_empty() {
            queue.push(
                PointerAction::Move(PointerEvent::Touch { touches: points }),
                viewport,
            );
        } else if touches.any_just_released() {
            queue.push(PointerAction::Up, viewport);
        }
    }
}

fn active_camera(world: &mut World) -> Option<CameraState> {
    let mut cameras = world.query::<(&Camera, &GlobalTransform, &Projection)>();
    let (_, global, projection) = cameras.iter(world).find(|(cam, _, _)| cam.is_active)?;
    let (_, rotation, translation) = global.to_scale_rotation_translation();
    let projection = match projection {
        Projection::Perspective(p) => ViewProjection::Perspective {
            fov_y: p.fov,
            near: p.near,
            far: p.far,
        },
        Projection::Orthographic(o) => ViewProjection::Orthographic {
            half_height: o.area.height() * 0.5,
            near: o.near,
            far: o.far,
        },
    };
    Some(CameraState {
        position: vec3_to_na(translation),
        rotation: quat_to_na(rotation),
        projection,
    })
}

/// Feed queued pointer actions to the picker. Presses are tested against
/// every `Interactive` entity; drags rotate the picked one.
pub fn handle_pointer_system(world: &mut World) {
    let actions = mem::take(&mut world.resource_mut::<PointerQueue>().pending);
    if actions.is_empty() {
        return;
    }
    let camera = active_camera(world);
    let candidates: Vec<Entity> = world
        .query_filtered::<Entity, With<Interactive>>()
        .iter(world)
        .collect();

    world.resource_scope(|world, mut picker: Mut<ValueboxPicker>| {
        let mut scene = WorldScene::new(world);
        for (action, viewport) in actions {
            match action {
                PointerAction::Down(event) => {
                    let Some(camera) = camera.as_ref() else {
                        debug!("valuebox: pointer down without an active camera");
                        continue;
                    };
                    let result =
                        picker
                            .0
                            .on_pointer_down(&event, &viewport, camera, &candidates, &scene);
                    trace!("valuebox: pick {result:?}");
                }
                PointerAction::Move(event) => {
                    if let Err(e) = picker.0.on_pointer_move(&event, &mut scene) {
                        warn!("valuebox: drag ended: {e}");
                    }
                }
                PointerAction::Up => picker.0.on_pointer_up(),
            }
        }
    });
}

fn find_containers(world: &mut World) -> Option<[Entity; 3]> {
    let mut slots: [Option<Entity>; 3] = [None; 3];
    let mut query = world.query::<(Entity, &ValueContainer)>();
    for (entity, container) in query.iter(world) {
        slots[container.slot.slot()] = Some(entity);
    }
    Some([slots[0]?, slots[1]?, slots[2]?])
}

/// Run every pending `SubmitValues` through the animator.
pub fn handle_submit_system(world: &mut World) {
    let submits: Vec<SubmitValues> = world
        .resource_mut::<Events<SubmitValues>>()
        .drain()
        .collect();
    if submits.is_empty() {
        return;
    }
    let Some(containers) = find_containers(world) else {
        warn!(
            "valuebox: ignoring {} submission(s): expected one ValueContainer per kind {:?}",
            submits.len(),
            ValueKind::ALL
        );
        return;
    };

    for SubmitValues { inputs } in submits {
        let result = world.resource_scope(|world, mut anim: Mut<ValueboxAnimator>| {
            let mut scene = WorldScene::new(world);
            anim.0.submit(&inputs, containers, &mut scene)
        });
        if !matches!(result, Ok(SubmitOutcome::Busy)) {
            world.resource_mut::<LatestPreview>().0 = Some(CodePreview::from_inputs(&inputs));
        }
        match result {
            Ok(SubmitOutcome::Started {
                batch,
                timelines,
                skipped,
            }) => {
                info!("valuebox: {batch} started ({timelines} label(s), skipped {skipped:?})");
            }
            Ok(SubmitOutcome::Empty) => debug!("valuebox: empty submission"),
            Ok(SubmitOutcome::Busy) => debug!("valuebox: submission ignored while animating"),
            Err(report) => {
                info!("valuebox: {report}");
                world.send_event(SubmitRejected { report });
            }
        }
    }
}

/// Advance all insertion timelines and forward the animator's events.
pub fn tick_insertions_system(world: &mut World) {
    let now = world.resource::<ValueboxAnimator>().0.clock().now();
    let events = world.resource_scope(|world, mut anim: Mut<ValueboxAnimator>| {
        let mut scene = WorldScene::new(world);
        anim.0.tick(now, &mut scene)
    });
    for event in events {
        world.send_event(InsertionOutput(event));
    }
}

/// Box materials under a container: its own and those of descendants with
/// `PickBounds`. Value label subtrees are skipped.
fn collect_materials(
    entity: Entity,
    is_container: bool,
    children: &Query<&Children>,
    handles: &Query<&Handle<StandardMaterial>>,
    parts: &Query<(Has<PickBounds>, Has<ValueLabel>)>,
    out: &mut HashSet<AssetId<StandardMaterial>>,
) {
    let (bounded, label) = parts.get(entity).unwrap_or((false, false));
    if label {
        return;
    }
    if is_container || bounded {
        if let Ok(handle) = handles.get(entity) {
            out.insert(handle.id());
        }
    }
    if let Ok(cs) = children.get(entity) {
        for &c in cs.iter() {
            collect_materials(c, false, children, handles, parts, out);
        }
    }
}

/// Flip the boxes between opaque and translucent.
#[allow(clippy::too_many_arguments)]
pub fn toggle_opacity_system(
    mut toggles: EventReader<ToggleOpacity>,
    mut state: ResMut<OpacityState>,
    settings: Res<ValueboxSettings>,
    containers: Query<Entity, With<ValueContainer>>,
    children: Query<&Children>,
    handles: Query<&Handle<StandardMaterial>>,
    parts: Query<(Has<PickBounds>, Has<ValueLabel>)>,
    materials: Option<ResMut<Assets<StandardMaterial>>>,
) {
    let flips = toggles.read().count();
    if flips == 0 {
        return;
    }
    if flips % 2 == 1 {
        state.translucent = !state.translucent;
    }
    let Some(mut materials) = materials else {
        return;
    };
    let (alpha, mode) = if state.translucent {
        (settings.translucent_alpha, AlphaMode::Blend)
    } else {
        (1.0, AlphaMode::Opaque)
    };

    let mut ids = HashSet::new();
    for container in containers.iter() {
        collect_materials(container, true, &children, &handles, &parts, &mut ids);
    }
    for id in ids {
        if let Some(material) = materials.get_mut(id) {
            material.base_color.set_alpha(alpha);
            material.alpha_mode = mode;
        }
    }
}

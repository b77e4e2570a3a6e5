//! Animated insertion of validated values into their boxes.
//!
//! A submission becomes one batch: every non-blank value gets a freshly
//! created label and a [`Timeline`] from the spawn point to its box. The host
//! calls [`InsertionAnimator::tick`] once per frame; when a timeline completes
//! its label is reparented into the box within that same tick. Only one batch
//! runs at a time.
//!
//! The animator keeps handles only. Every tick re-checks that labels and boxes
//! still exist and cancels timelines whose objects were destroyed elsewhere.

use std::mem;

use crate::config::InsertionConfig;
use crate::error::{ConfigError, InsertionError};
use crate::input::{validate, AnimationRequest, CodePreview, RawInputs, ValidationReport, ValueKind};
use crate::outputs::{BatchId, InsertionEvent, SubmitOutcome};
use valuebox_animation_core::{
    Clock, IdAllocator, SystemClock, Timeline, TimelineState, Timestamp,
};
use valuebox_scene_core::{SceneAdapter, SceneError};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum AnimatorPhase {
    #[default]
    Idle,
    Validating,
    Animating,
}

/// A label that reached its box and is now parented to it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BoundLabel<H> {
    pub label: H,
    pub container: H,
    pub kind: ValueKind,
}

#[derive(Debug)]
struct ActiveInsertion<H> {
    batch: BatchId,
    kind: ValueKind,
    label: H,
    container: H,
    timeline: Timeline,
}

#[derive(Debug)]
pub struct InsertionAnimator<H, C = SystemClock> {
    cfg: InsertionConfig,
    clock: C,
    ids: IdAllocator,
    phase: AnimatorPhase,
    batch_in_flight: bool,
    next_batch: u32,
    current_batch: Option<BatchId>,
    bound_in_batch: usize,
    cancelled_in_batch: usize,
    active: Vec<ActiveInsertion<H>>,
    inserted: Vec<BoundLabel<H>>,
    events: Vec<InsertionEvent<H>>,
}

impl<H, C> InsertionAnimator<H, C>
where
    H: Copy + Eq + std::hash::Hash + std::fmt::Debug,
    C: Clock,
{
    pub fn new(cfg: InsertionConfig, clock: C) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self::build(cfg, clock))
    }

    /// Animator with the default insertion settings.
    pub fn with_defaults(clock: C) -> Self {
        Self::build(InsertionConfig::default(), clock)
    }

    fn build(cfg: InsertionConfig, clock: C) -> Self {
        Self {
            cfg,
            clock,
            ids: IdAllocator::new(),
            phase: AnimatorPhase::Idle,
            batch_in_flight: false,
            next_batch: 0,
            current_batch: None,
            bound_in_batch: 0,
            cancelled_in_batch: 0,
            active: Vec::new(),
            inserted: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &InsertionConfig {
        &self.cfg
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn phase(&self) -> AnimatorPhase {
        self.phase
    }

    pub fn is_batch_in_flight(&self) -> bool {
        self.batch_in_flight
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Running timelines with the label each one moves.
    pub fn active_timelines(&self) -> impl Iterator<Item = (H, &Timeline)> + '_ {
        self.active.iter().map(|a| (a.label, &a.timeline))
    }

    /// Labels bound by this animator since the last clear.
    pub fn inserted(&self) -> &[BoundLabel<H>] {
        &self.inserted
    }

    /// Take every event queued since the last drain.
    pub fn drain_events(&mut self) -> Vec<InsertionEvent<H>> {
        mem::take(&mut self.events)
    }

    pub fn code_preview(&self, inputs: &RawInputs) -> CodePreview {
        CodePreview::from_inputs(inputs)
    }

    /// Validate `inputs` and start a batch animating each non-blank value
    /// into `containers[kind.slot()]`.
    ///
    /// Ignored (`Busy`) while a batch is in flight. Invalid input is rejected
    /// as a whole with no side effects. Blank input yields `Empty` and leaves
    /// prior labels in place. Otherwise prior labels are cleared first, then
    /// each value is started; a value whose label or target cannot be
    /// resolved is skipped without affecting the others.
    pub fn submit<S>(
        &mut self,
        inputs: &RawInputs,
        containers: [H; 3],
        scene: &mut S,
    ) -> Result<SubmitOutcome, ValidationReport>
    where
        S: SceneAdapter<Handle = H> + ?Sized,
    {
        if self.batch_in_flight {
            log::debug!("submit ignored: a batch is still animating");
            return Ok(SubmitOutcome::Busy);
        }

        self.phase = AnimatorPhase::Validating;
        let requests = match validate(inputs, containers) {
            Ok(requests) => requests,
            Err(report) => {
                self.phase = AnimatorPhase::Idle;
                log::debug!("submit rejected: {report}");
                return Err(report);
            }
        };
        if requests.is_empty() {
            self.phase = AnimatorPhase::Idle;
            return Ok(SubmitOutcome::Empty);
        }

        self.clear_prior_labels(scene);

        let batch = BatchId(self.next_batch);
        self.next_batch = self.next_batch.wrapping_add(1);
        let now = self.clock.now();
        let first_event = self.events.len();
        let mut skipped = Vec::new();
        for request in &requests {
            match self.start(batch, request, now, scene) {
                Ok(started) => {
                    self.events.push(InsertionEvent::LabelSpawned {
                        batch,
                        kind: started.kind,
                        label: started.label,
                        container: started.container,
                        timeline: started.timeline.id(),
                    });
                    self.active.push(started);
                }
                Err(reason) => {
                    log::warn!("{batch}: skipping {} value: {reason}", request.kind());
                    skipped.push(request.kind());
                    self.events.push(InsertionEvent::LabelSkipped {
                        batch,
                        kind: request.kind(),
                        reason,
                    });
                }
            }
        }

        let timelines = self.active.len();
        if timelines == 0 {
            self.phase = AnimatorPhase::Idle;
        } else {
            self.batch_in_flight = true;
            self.current_batch = Some(batch);
            self.bound_in_batch = 0;
            self.cancelled_in_batch = 0;
            self.phase = AnimatorPhase::Animating;
            self.events
                .insert(first_event, InsertionEvent::BatchStarted { batch, timelines });
            log::debug!("{batch} started with {timelines} timeline(s)");
        }
        Ok(SubmitOutcome::Started {
            batch,
            timelines,
            skipped,
        })
    }

    fn start<S>(
        &mut self,
        batch: BatchId,
        request: &AnimationRequest<H>,
        now: Timestamp,
        scene: &mut S,
    ) -> Result<ActiveInsertion<H>, InsertionError>
    where
        S: SceneAdapter<Handle = H> + ?Sized,
    {
        let container = request.target_container();
        // Resolve the target first so a missing box never leaves a stray label.
        let end = scene.world_position(container)? + self.cfg.rest();
        let spawn = self.cfg.spawn();
        let label = scene.create_label(request.raw_value())?;
        let timeline = Timeline::new(
            self.ids.alloc_timeline(),
            spawn,
            end,
            now,
            self.cfg.duration(),
            self.cfg.easing,
        );
        let placed = timeline.map_err(InsertionError::from).and_then(|timeline| {
            scene.set_local_transform(label, Some(spawn), None)?;
            Ok(timeline)
        });
        match placed {
            Ok(timeline) => Ok(ActiveInsertion {
                batch,
                kind: request.kind(),
                label,
                container,
                timeline,
            }),
            Err(e) => {
                let _ = scene.destroy(label);
                Err(e)
            }
        }
    }

    /// Advance every running timeline to `now`, bind the labels that landed
    /// and return all events queued since the previous call.
    pub fn tick<S>(&mut self, now: Timestamp, scene: &mut S) -> Vec<InsertionEvent<H>>
    where
        S: SceneAdapter<Handle = H> + ?Sized,
    {
        for mut entry in mem::take(&mut self.active) {
            if !scene.contains(entry.container) || !scene.contains(entry.label) {
                self.cancel_entry(&mut entry, scene);
                continue;
            }

            let position = entry.timeline.advance(now);
            if let Err(e) = scene.set_local_transform(entry.label, Some(position), None) {
                log::warn!("{}: cannot move label {:?}: {e}", entry.batch, entry.label);
                self.cancel_entry(&mut entry, scene);
                continue;
            }

            if entry.timeline.state() == TimelineState::Completed {
                match bind_label(scene, entry.label, entry.container) {
                    Ok(()) => {
                        self.inserted.push(BoundLabel {
                            label: entry.label,
                            container: entry.container,
                            kind: entry.kind,
                        });
                        self.bound_in_batch += 1;
                        self.events.push(InsertionEvent::LabelBound {
                            batch: entry.batch,
                            kind: entry.kind,
                            label: entry.label,
                            container: entry.container,
                        });
                    }
                    Err(e) => {
                        log::warn!(
                            "{}: cannot bind label {:?} to {:?}: {e}",
                            entry.batch,
                            entry.label,
                            entry.container
                        );
                        let _ = scene.destroy(entry.label);
                        self.cancelled_in_batch += 1;
                    }
                }
            } else {
                self.active.push(entry);
            }
        }
        self.finish_batch_if_idle();
        self.drain_events()
    }

    /// Cancel all running timelines and destroy every label this animator
    /// created, bound or not. Labels it did not create are left alone.
    /// Returns the number of labels removed.
    pub fn clear_prior_labels<S>(&mut self, scene: &mut S) -> usize
    where
        S: SceneAdapter<Handle = H> + ?Sized,
    {
        let mut removed = 0;
        for mut entry in mem::take(&mut self.active) {
            let present = scene.contains(entry.label);
            self.cancel_entry(&mut entry, scene);
            if present {
                removed += 1;
            }
        }
        for bound in mem::take(&mut self.inserted) {
            if scene.contains(bound.label) && scene.destroy(bound.label).is_ok() {
                removed += 1;
            }
        }
        self.finish_batch_if_idle();
        if removed > 0 {
            log::debug!("cleared {removed} prior label(s)");
            self.events
                .push(InsertionEvent::PriorLabelsCleared { removed });
        }
        removed
    }

    fn cancel_entry<S>(&mut self, entry: &mut ActiveInsertion<H>, scene: &mut S)
    where
        S: SceneAdapter<Handle = H> + ?Sized,
    {
        entry.timeline.cancel();
        if scene.contains(entry.label) {
            let _ = scene.destroy(entry.label);
        }
        log::warn!(
            "{}: {} timeline {:?} cancelled",
            entry.batch,
            entry.kind,
            entry.timeline.id()
        );
        self.cancelled_in_batch += 1;
        self.events.push(InsertionEvent::TimelineCancelled {
            batch: entry.batch,
            kind: entry.kind,
            label: entry.label,
            container: entry.container,
            timeline: entry.timeline.id(),
        });
    }

    fn finish_batch_if_idle(&mut self) {
        if !self.active.is_empty() || !self.batch_in_flight {
            return;
        }
        self.batch_in_flight = false;
        self.phase = AnimatorPhase::Idle;
        if let Some(batch) = self.current_batch.take() {
            log::debug!(
                "{batch} finished: {} bound, {} cancelled",
                self.bound_in_batch,
                self.cancelled_in_batch
            );
            self.events.push(InsertionEvent::BatchFinished {
                batch,
                bound: self.bound_in_batch,
                cancelled: self.cancelled_in_batch,
            });
        }
    }
}

/// Parent `label` under `container`, rewriting its transform into the
/// container's local space so it stays where it is in the world.
fn bind_label<S>(scene: &mut S, label: S::Handle, container: S::Handle) -> Result<(), SceneError>
where
    S: SceneAdapter + ?Sized,
{
    let container_world = scene.world_transform(container)?;
    if !container_world.is_invertible() {
        return Err(SceneError::InvalidHierarchy(format!(
            "{container:?} has a degenerate transform"
        )));
    }
    let label_world = scene.world_transform(label)?;
    let local = label_world.relative_to(&container_world);
    if let Some(parent) = scene.parent(label) {
        scene.remove_child(parent, label)?;
    }
    scene.add_child(container, label)?;
    scene.set_local_transform(label, Some(local.translation), Some(local.rotation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use std::time::Duration;
    use valuebox_animation_core::{ManualClock, TimelineId};
    use valuebox_scene_core::{Aabb, NodeKind, ObjectId, SceneGraph, SceneQuery, Transform};

    fn timeline_ids(anim: &InsertionAnimator<ObjectId, ManualClock>) -> Vec<TimelineId> {
        anim.active_timelines().map(|(_, t)| t.id()).collect()
    }

    struct Rig {
        graph: SceneGraph,
        boxes: [ObjectId; 3],
        anim: InsertionAnimator<ObjectId, ManualClock>,
    }

    fn rig() -> Rig {
        let mut graph = SceneGraph::new();
        let mut boxes = [ObjectId(0); 3];
        for (i, x) in [-3.5f32, 0.0, 3.5].into_iter().enumerate() {
            boxes[i] = graph
                .spawn(
                    format!("box{i}"),
                    NodeKind::Mesh,
                    Transform::from_translation(Vector3::new(x, 0.0, 0.0)),
                    Some(Aabb::from_half_extents(Vector3::new(1.0, 1.0, 1.0))),
                    None,
                )
                .unwrap();
        }
        let anim =
            InsertionAnimator::new(InsertionConfig::default(), ManualClock::new(Timestamp::ZERO))
                .unwrap();
        Rig { graph, boxes, anim }
    }

    fn run_to_end(rig: &mut Rig) -> Vec<InsertionEvent<ObjectId>> {
        let mut events = Vec::new();
        for _ in 0..20 {
            rig.anim.clock_mut().advance(Duration::from_millis(100));
            let now = rig.anim.clock().now();
            events.extend(rig.anim.tick(now, &mut rig.graph));
        }
        events
    }

    #[test]
    fn full_batch_binds_every_label() {
        let mut rig = rig();
        let outcome = rig
            .anim
            .submit(&RawInputs::new("12", "3.5", "Q"), rig.boxes, &mut rig.graph)
            .unwrap();
        assert_eq!(outcome.timelines(), 3);
        assert!(rig.anim.is_batch_in_flight());
        assert_eq!(rig.anim.phase(), AnimatorPhase::Animating);

        let events = run_to_end(&mut rig);
        assert!(!rig.anim.is_batch_in_flight());
        assert_eq!(rig.anim.phase(), AnimatorPhase::Idle);
        for (i, b) in rig.boxes.iter().enumerate() {
            let labels = rig.graph.labels_under(*b);
            assert_eq!(labels.len(), 1, "box {i}");
            assert_relative_eq!(
                rig.graph.local_transform(labels[0]).unwrap().translation,
                Vector3::new(0.0, 0.3, 0.0),
                epsilon = 1e-5
            );
        }
        assert!(events.iter().any(|e| matches!(
            e,
            InsertionEvent::BatchFinished {
                bound: 3,
                cancelled: 0,
                ..
            }
        )));
    }

    #[test]
    fn busy_while_animating() {
        let mut rig = rig();
        rig.anim
            .submit(&RawInputs::new("1", "", ""), rig.boxes, &mut rig.graph)
            .unwrap();
        let ids = timeline_ids(&rig.anim);
        let again = rig
            .anim
            .submit(&RawInputs::new("2", "", ""), rig.boxes, &mut rig.graph)
            .unwrap();
        assert_eq!(again, SubmitOutcome::Busy);
        assert_eq!(timeline_ids(&rig.anim), ids);
    }

    #[test]
    fn empty_submit_keeps_previous_labels() {
        let mut rig = rig();
        rig.anim
            .submit(&RawInputs::new("7", "", ""), rig.boxes, &mut rig.graph)
            .unwrap();
        run_to_end(&mut rig);
        let outcome = rig
            .anim
            .submit(&RawInputs::default(), rig.boxes, &mut rig.graph)
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::Empty);
        assert_eq!(rig.graph.labels_under(rig.boxes[0]).len(), 1);
        assert!(!rig.anim.is_batch_in_flight());
    }

    #[test]
    fn next_batch_replaces_prior_labels() {
        let mut rig = rig();
        rig.anim
            .submit(&RawInputs::new("7", "", ""), rig.boxes, &mut rig.graph)
            .unwrap();
        run_to_end(&mut rig);
        let first = rig.graph.labels_under(rig.boxes[0])[0];
        rig.anim
            .submit(&RawInputs::new("8", "", ""), rig.boxes, &mut rig.graph)
            .unwrap();
        assert!(!rig.graph.contains(first));
        let events = rig.anim.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, InsertionEvent::PriorLabelsCleared { removed: 1 })));
    }

    #[test]
    fn labels_not_ready_skips_every_field() {
        let mut rig = rig();
        rig.graph.set_labels_ready(false);
        let outcome = rig
            .anim
            .submit(&RawInputs::new("1", "2", "c"), rig.boxes, &mut rig.graph)
            .unwrap();
        match outcome {
            SubmitOutcome::Started {
                timelines, skipped, ..
            } => {
                assert_eq!(timelines, 0);
                assert_eq!(skipped, ValueKind::ALL.to_vec());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(!rig.anim.is_batch_in_flight());
        assert_eq!(rig.anim.phase(), AnimatorPhase::Idle);
    }

    #[test]
    fn invalid_input_changes_nothing() {
        let mut rig = rig();
        let before = rig.graph.len();
        let report = rig
            .anim
            .submit(&RawInputs::new("3.2", "", ""), rig.boxes, &mut rig.graph)
            .unwrap_err();
        assert_eq!(
            report.error_for(ValueKind::Int),
            Some(crate::input::ValidationError::NotAnInteger)
        );
        assert_eq!(rig.graph.len(), before);
        assert_eq!(rig.anim.active_count(), 0);
        assert_eq!(rig.anim.phase(), AnimatorPhase::Idle);
    }
}

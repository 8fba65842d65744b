//! The rotation graph: plate-pair rotation sequences keyed by plate id.
//!
//! Edges run from a fixed plate to a moving plate and carry an ordered
//! sequence of pole samples. Several edges may join the same plate pair
//! (sequences split at crossovers) and the graph may contain cycles; the
//! [`ReconstructionTree`](super::ReconstructionTree) builder turns it into a
//! tree for one anchor plate and time.

use std::collections::HashMap;

use thiserror::Error;

use super::pole_sample::PoleSample;
use crate::maths::FiniteRotation;
use crate::time::{GeoTimeInstant, TimePeriod};

/// Plate identifier.
pub type PlateId = u32;

/// Errors raised while assembling a [`RotationGraph`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RotationGraphError {
    #[error("Rotation sequence {fixed} -> {moving} has {count} pole samples, at least 2 required")]
    TooFewPoleSamples {
        fixed: PlateId,
        moving: PlateId,
        count: usize,
    },
    #[error("Rotation sequence {fixed} -> {moving} is not ordered by time at sample {index}")]
    UnorderedPoleSamples {
        fixed: PlateId,
        moving: PlateId,
        index: usize,
    },
}

/// A fixed → moving rotation sequence.
#[derive(Debug, Clone)]
pub struct RotationGraphEdge {
    fixed_plate_id: PlateId,
    moving_plate_id: PlateId,
    /// Ordered youngest to oldest.
    pole_samples: Vec<PoleSample>,
    period: TimePeriod,
}

impl RotationGraphEdge {
    pub fn fixed_plate_id(&self) -> PlateId {
        self.fixed_plate_id
    }

    pub fn moving_plate_id(&self) -> PlateId {
        self.moving_plate_id
    }

    /// Pole samples ordered from youngest to oldest.
    pub fn pole_samples(&self) -> &[PoleSample] {
        &self.pole_samples
    }

    /// The period spanned by the pole samples.
    pub fn period(&self) -> TimePeriod {
        self.period
    }

    pub fn is_valid_at(&self, time: GeoTimeInstant) -> bool {
        self.period.contains(time)
    }

    /// Rotation of the moving plate relative to the fixed plate at `time`.
    ///
    /// Returns `None` when `time` lies outside the sequence.
    pub fn interpolate(&self, time: GeoTimeInstant) -> Option<FiniteRotation> {
        for pair in self.pole_samples.windows(2) {
            let (younger, older) = (&pair[0], &pair[1]);

            if time.is_coincident_with(younger.time()) {
                return Some(sample_rotation(younger));
            }
            if time.is_strictly_later_than(older.time()) && time.is_strictly_earlier_than(younger.time()) {
                // An infinite bracket degenerates to its finite end.
                if older.time().is_distant_past() {
                    return Some(sample_rotation(younger));
                }
                if younger.time().is_distant_future() {
                    return Some(sample_rotation(older));
                }
                let axis_hint = older.axis_hint().or(younger.axis_hint());
                return Some(FiniteRotation::interpolate(
                    older.rotation(),
                    younger.rotation(),
                    older.time().value(),
                    younger.time().value(),
                    time.value(),
                    axis_hint,
                ));
            }
        }

        let last = self.pole_samples.last()?;
        time.is_coincident_with(last.time()).then(|| sample_rotation(last))
    }

    /// Like [`interpolate`](Self::interpolate) but clamps times outside the
    /// sequence to the nearest end sample.
    pub fn rotation_at(&self, time: GeoTimeInstant) -> FiniteRotation {
        if let Some(rotation) = self.interpolate(time) {
            return rotation;
        }
        let nearest = if time.is_strictly_earlier_than(self.period.begin()) {
            self.pole_samples.last()
        } else {
            self.pole_samples.first()
        };
        nearest.map(sample_rotation).unwrap_or_default()
    }
}

fn sample_rotation(sample: &PoleSample) -> FiniteRotation {
    sample.rotation().with_axis_hint(sample.axis_hint())
}

#[derive(Debug, Clone, Default)]
struct PlateEdges {
    /// Edges where this plate is the fixed plate, in data order.
    outgoing: Vec<usize>,
    /// Edges where this plate is the moving plate, in data order.
    incoming: Vec<usize>,
}

/// Directed multigraph of rotation sequences.
#[derive(Debug, Clone, Default)]
pub struct RotationGraph {
    edges: Vec<RotationGraphEdge>,
    plates: HashMap<PlateId, PlateEdges>,
}

impl RotationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from (fixed, moving, samples) sequences in data order.
    pub fn from_sequences<I>(sequences: I) -> Result<Self, RotationGraphError>
    where
        I: IntoIterator<Item = (PlateId, PlateId, Vec<PoleSample>)>,
    {
        let mut graph = Self::new();
        for (fixed, moving, samples) in sequences {
            graph.add_edge(fixed, moving, samples)?;
        }
        Ok(graph)
    }

    /// Adds a rotation sequence and returns its edge index.
    ///
    /// Samples may be given youngest-first or oldest-first but must be
    /// monotonic in time. Edge order is the data order used to break ties
    /// during tree construction.
    pub fn add_edge(
        &mut self,
        fixed_plate_id: PlateId,
        moving_plate_id: PlateId,
        mut pole_samples: Vec<PoleSample>,
    ) -> Result<usize, RotationGraphError> {
        if pole_samples.len() < 2 {
            return Err(RotationGraphError::TooFewPoleSamples {
                fixed: fixed_plate_id,
                moving: moving_plate_id,
                count: pole_samples.len(),
            });
        }

        let first = pole_samples[0].time();
        let last = pole_samples[pole_samples.len() - 1].time();
        if first.is_strictly_earlier_than(last) {
            pole_samples.reverse();
        }
        if let Some(index) = pole_samples
            .windows(2)
            .position(|pair| pair[0].time().is_strictly_earlier_than(pair[1].time()))
        {
            return Err(RotationGraphError::UnorderedPoleSamples {
                fixed: fixed_plate_id,
                moving: moving_plate_id,
                index: index + 1,
            });
        }

        let period = TimePeriod::new(
            pole_samples[pole_samples.len() - 1].time(),
            pole_samples[0].time(),
        );
        let index = self.edges.len();
        self.edges.push(RotationGraphEdge {
            fixed_plate_id,
            moving_plate_id,
            pole_samples,
            period,
        });
        self.plates.entry(fixed_plate_id).or_default().outgoing.push(index);
        self.plates.entry(moving_plate_id).or_default().incoming.push(index);

        Ok(index)
    }

    pub fn edge(&self, index: usize) -> &RotationGraphEdge {
        &self.edges[index]
    }

    pub fn edges(&self) -> &[RotationGraphEdge] {
        &self.edges
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Edges where `plate_id` is the fixed plate, in data order.
    pub fn outgoing_edges(&self, plate_id: PlateId) -> &[usize] {
        self.plates.get(&plate_id).map_or(&[], |p| p.outgoing.as_slice())
    }

    /// Edges where `plate_id` is the moving plate, in data order.
    pub fn incoming_edges(&self, plate_id: PlateId) -> &[usize] {
        self.plates.get(&plate_id).map_or(&[], |p| p.incoming.as_slice())
    }

    pub fn plate_ids(&self) -> impl Iterator<Item = PlateId> + '_ {
        self.plates.keys().copied()
    }
}

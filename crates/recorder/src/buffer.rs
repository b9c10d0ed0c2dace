//! Staging list of samples awaiting upload.

use rides::models::GpsPoint;
use validator::{Validate, ValidationErrors};

/// What happened to a sample offered to the buffer.
#[derive(Debug)]
pub enum Admission {
    Buffered,
    /// Failed field validation.
    Invalid(ValidationErrors),
    /// Reported accuracy (meters) worse than the filter.
    Inaccurate(f64),
}

/// Ordered, append-only list of samples for one route.
///
/// Samples leave only through [`take_snapshot`](Self::take_snapshot), and a
/// snapshot that could not be delivered goes back in front of everything
/// recorded since.
#[derive(Debug, Clone)]
pub struct PointBuffer {
    points: Vec<GpsPoint>,
    accuracy_filter_m: f64,
}

impl PointBuffer {
    pub fn new(accuracy_filter_m: f64) -> Self {
        Self {
            points: Vec::new(),
            accuracy_filter_m,
        }
    }

    /// Validates and filters `point`, appending it to the tail when it is kept.
    pub fn push(&mut self, point: GpsPoint) -> Admission {
        if let Err(errors) = point.validate() {
            return Admission::Invalid(errors);
        }
        if !point.passes_accuracy_filter(self.accuracy_filter_m) {
            return Admission::Inaccurate(point.accuracy.unwrap_or_default());
        }
        self.points.push(point);
        Admission::Buffered
    }

    /// Removes and returns every buffered sample.
    pub fn take_snapshot(&mut self) -> Vec<GpsPoint> {
        std::mem::take(&mut self.points)
    }

    /// Puts an undelivered snapshot back ahead of the current contents.
    pub fn requeue_front(&mut self, mut snapshot: Vec<GpsPoint>) {
        snapshot.append(&mut self.points);
        self.points = snapshot;
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[GpsPoint] {
        &self.points
    }
}

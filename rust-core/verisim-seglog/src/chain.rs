// SPDX-License-Identifier: PMPL-1.0-or-later
//
// VeriSimDB Segment Log - Segment chains
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Segments form a doubly linked list through their bookends: each header's
// `prev` names the predecessor and each trailer's `next` names the
// successor. Chain order comes from these names only, never from file
// name sorting. A walk ends at the first unsealed segment, which is the
// newest one: either still active or cut short by a crash.
//
// A walk also ends at a sealed segment whose successor is absent. The
// trailer is written before the next file exists, so a crash between the
// two leaves a valid chain with a dangling `next`.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::error::{SegLogError, SegLogResult};
use crate::record::RecordFrame;
use crate::segment::Segment;

/// Outcome of walking a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainWalk<'a> {
    /// Segment names in chain order.
    pub order: Vec<&'a str>,
    /// Successor named by the last segment's trailer but not present.
    pub dangling_next: Option<&'a str>,
}

impl<'a> ChainWalk<'a> {
    /// Last segment reached.
    pub fn last(&self) -> Option<&'a str> {
        self.order.last().copied()
    }
}

/// A set of decoded segments keyed by name.
#[derive(Debug, Clone, Default)]
pub struct SegmentChain {
    segments: BTreeMap<String, Segment>,
}

impl SegmentChain {
    /// An empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a segment under `name`, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, segment: Segment) {
        self.segments.insert(name.into(), segment);
    }

    /// Look up a segment by name.
    pub fn get(&self, name: &str) -> Option<&Segment> {
        self.segments.get(name)
    }

    /// Number of segments held.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` if no segments are held.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Name of the segment that starts the chain, i.e. the only one whose
    /// header has an empty `prev`.
    pub fn head(&self) -> SegLogResult<&str> {
        let mut heads = self
            .segments
            .iter()
            .filter(|(_, segment)| segment.header.is_first())
            .map(|(name, _)| name.as_str());

        match (heads.next(), heads.next()) {
            (Some(head), None) => Ok(head),
            (None, _) => Err(SegLogError::UnknownSegment(
                "<chain head with empty prev>".to_string(),
            )),
            (Some(first), Some(second)) => Err(SegLogError::BrokenChain {
                from: first.to_string(),
                to: second.to_string(),
                reason: "more than one segment has an empty prev".to_string(),
            }),
        }
    }

    /// Walk the chain from its head.
    pub fn walk(&self) -> SegLogResult<ChainWalk<'_>> {
        self.walk_from(self.head()?)
    }

    /// Walk `next` pointers from `start`, checking that each successor's
    /// `prev` points back. Stops at an unsealed segment or at a successor
    /// that is not held, which is reported as `dangling_next`.
    pub fn walk_from(&self, start: &str) -> SegLogResult<ChainWalk<'_>> {
        let mut order: Vec<&str> = Vec::new();
        let mut visited = HashSet::new();
        let mut dangling_next = None;
        let (mut name, mut segment) = self
            .segments
            .get_key_value(start)
            .map(|(name, segment)| (name.as_str(), segment))
            .ok_or_else(|| SegLogError::UnknownSegment(start.to_string()))?;

        loop {
            if !visited.insert(name) {
                return Err(SegLogError::ChainCycle(name.to_string()));
            }
            order.push(name);

            let Some(next) = segment.next() else {
                break;
            };
            let Some((next_name, next_segment)) = self.segments.get_key_value(next) else {
                warn!(
                    segment = name,
                    next,
                    "Sealed segment names a successor that does not exist"
                );
                dangling_next = Some(next);
                break;
            };

            if next_segment.header.prev != name {
                return Err(SegLogError::BrokenChain {
                    from: name.to_string(),
                    to: next.to_string(),
                    reason: format!(
                        "successor names `{}` as its predecessor",
                        next_segment.header.prev
                    ),
                });
            }

            name = next_name.as_str();
            segment = next_segment;
        }

        debug!(
            length = order.len(),
            start,
            dangling = dangling_next.is_some(),
            "Walked segment chain"
        );
        Ok(ChainWalk {
            order,
            dangling_next,
        })
    }

    /// The last segment reached from the head, if it is unsealed. A chain
    /// ending in a dangling `next` has no active tail.
    pub fn active_tail(&self) -> SegLogResult<Option<&str>> {
        let walk = self.walk()?;
        Ok(walk
            .last()
            .filter(|name| self.segments.get(*name).is_some_and(|s| !s.is_sealed())))
    }

    /// Every record in chain order.
    pub fn records(&self) -> SegLogResult<Vec<&RecordFrame>> {
        let mut records = Vec::new();
        for name in self.walk()?.order {
            if let Some(segment) = self.segments.get(name) {
                records.extend(segment.records.iter());
            }
        }
        Ok(records)
    }
}

impl FromIterator<(String, Segment)> for SegmentChain {
    fn from_iter<I: IntoIterator<Item = (String, Segment)>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

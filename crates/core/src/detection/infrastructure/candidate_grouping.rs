//! Neighbour-count grouping of raw detector candidates.
//!
//! Candidates that overlap (transitively) form one cluster. A cluster is
//! reported as a face only when it holds more than `min_neighbors`
//! candidates, i.e. the face is supported by at least `min_neighbors`
//! detections besides one of its own. The reported box is the cluster mean.

use crate::detection::domain::face_detector::FaceBox;

/// IoU above which two candidates are considered the same face.
pub const GROUPING_IOU_THRESHOLD: f64 = 0.4;

/// A raw detection in frame coordinates, `[x1, y1]` top-left to `[x2, y2]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub confidence: f64,
}

impl Candidate {
    fn corners(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// Clusters candidates and returns one box per well-supported cluster,
/// clamped to the `frame_w` × `frame_h` frame. Output order follows each
/// cluster's earliest candidate.
pub fn group_candidates(
    candidates: &[Candidate],
    min_neighbors: usize,
    iou_threshold: f64,
    frame_w: u32,
    frame_h: u32,
) -> Vec<FaceBox> {
    let mut sets = DisjointSet::new(candidates.len());
    for i in 0..candidates.len() {
        for j in (i + 1)..candidates.len() {
            if bbox_iou(&candidates[i].corners(), &candidates[j].corners()) > iou_threshold {
                sets.union(i, j);
            }
        }
    }

    sets.clusters()
        .into_iter()
        .filter(|members| members.len() > min_neighbors)
        .filter_map(|members| {
            let n = members.len() as f64;
            let mut mean = [0.0f64; 4];
            for &m in &members {
                for (acc, v) in mean.iter_mut().zip(candidates[m].corners()) {
                    *acc += v / n;
                }
            }
            clamp_box(mean, frame_w, frame_h)
        })
        .collect()
}

fn clamp_box(corners: [f64; 4], frame_w: u32, frame_h: u32) -> Option<FaceBox> {
    let x1 = corners[0].round().clamp(0.0, frame_w as f64);
    let y1 = corners[1].round().clamp(0.0, frame_h as f64);
    let x2 = corners[2].round().clamp(0.0, frame_w as f64);
    let y2 = corners[3].round().clamp(0.0, frame_h as f64);
    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some(FaceBox::new(
        x1 as i32,
        y1 as i32,
        (x2 - x1) as u32,
        (y2 - y1) as u32,
    ))
}

/// IoU between two boxes given as `[x1, y1, x2, y2]`.
pub fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

/// Union-find with path halving.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Lower index becomes the root so roots stay stable.
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }

    /// Member indices per set, ascending, sets ordered by smallest member.
    fn clusters(&mut self) -> Vec<Vec<usize>> {
        let n = self.parent.len();
        let mut by_root: Vec<Vec<usize>> = vec![Vec::new(); n];
        for i in 0..n {
            let root = self.find(i);
            by_root[root].push(i);
        }
        by_root.into_iter().filter(|m| !m.is_empty()).collect()
    }
}

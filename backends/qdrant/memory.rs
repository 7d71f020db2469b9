//! In-process point store / 内存点存储
//!
//! Holds every point of one collection and ranks by cosine similarity.
//! Contents live as long as the handle.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{Point, ScoredPoint};

#[derive(Default)]
struct Points {
    /// insertion order, used for tie-breaking
    items: Vec<Point>,
    /// id -> position in `items`
    index: HashMap<String, usize>,
}

#[derive(Default)]
pub struct MemoryStore {
    points: RwLock<Points>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.read().items.len()
    }

    /// Insert or replace by id / 写入或覆盖
    pub fn upsert(&self, points: Vec<Point>) {
        let mut guard = self.points.write();
        let stored = &mut *guard;
        stored.items.reserve(points.len());
        for point in points {
            match stored.index.get(&point.id) {
                Some(&pos) => stored.items[pos] = point,
                None => {
                    stored.index.insert(point.id.clone(), stored.items.len());
                    stored.items.push(point);
                }
            }
        }
    }

    /// Best `limit` points, highest similarity first / 相似度检索
    pub fn search(&self, vector: &[f32], limit: usize) -> Vec<ScoredPoint> {
        let stored = self.points.read();
        let mut scored: Vec<ScoredPoint> = stored
            .items
            .iter()
            .map(|p| ScoredPoint {
                score: cosine(&p.vector, vector),
                document: p.document.clone(),
                title: p.title.clone(),
            })
            .collect();

        // stable: equal scores keep insertion order
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        scored
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

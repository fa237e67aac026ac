//! Nearest-neighbor queries over body positions and the highlight star.

use glam::Vec3;

use crate::body::BodyId;

/// The `k` bodies closest to `from`, excluding `from` itself.
///
/// Sorted by non-decreasing distance; ties keep registry order.
pub fn nearest(positions: &[Vec3], from: BodyId, k: usize) -> Vec<BodyId> {
    let Some(origin) = positions.get(from.index()).copied() else {
        return Vec::new();
    };

    let mut candidates: Vec<(BodyId, f32)> = positions
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != from.index())
        .map(|(i, p)| (BodyId(i), origin.distance_squared(*p)))
        .collect();

    // sort_by is stable, which keeps registry order for ties
    candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
    candidates.truncate(k);
    candidates.into_iter().map(|(id, _)| id).collect()
}

/// Selected body, its primary neighbors and the edges to draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightGraph {
    pub selected: BodyId,
    /// Primary neighbors, nearest first.
    pub primary: Vec<BodyId>,
    /// `(selected, primary)` edges first, then `(primary, hop)` per primary.
    pub edges: Vec<(BodyId, BodyId)>,
}

impl HighlightGraph {
    /// Every body touched by an edge, excluding the selection, first-seen order.
    pub fn highlighted(&self) -> Vec<BodyId> {
        let mut out = Vec::new();
        for &(a, b) in &self.edges {
            for id in [a, b] {
                if id != self.selected && !out.contains(&id) {
                    out.push(id);
                }
            }
        }
        out
    }
}

/// Two-level star around `selected`.
///
/// Second hops are taken literally: one may point back at the selection or
/// at another primary neighbor.
pub fn highlight_graph(
    positions: &[Vec3],
    selected: BodyId,
    primary_k: usize,
    secondary_k: usize,
) -> HighlightGraph {
    let primary = nearest(positions, selected, primary_k);

    let mut edges: Vec<(BodyId, BodyId)> = primary.iter().map(|&p| (selected, p)).collect();
    for &p in &primary {
        for hop in nearest(positions, p, secondary_k) {
            edges.push((p, hop));
        }
    }

    HighlightGraph {
        selected,
        primary,
        edges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(xs: &[f32]) -> Vec<Vec3> {
        xs.iter().map(|&x| Vec3::new(x, 0.0, 0.0)).collect()
    }

    #[test]
    fn test_nearest_excludes_self_and_sorts() {
        let positions = line(&[0.0, 10.0, 3.0, -5.0, 100.0]);
        let result = nearest(&positions, BodyId(0), 3);
        assert_eq!(result, vec![BodyId(2), BodyId(3), BodyId(1)]);
        assert!(!result.contains(&BodyId(0)));
    }

    #[test]
    fn test_nearest_truncates_and_handles_small_sets() {
        let positions = line(&[0.0, 1.0]);
        assert_eq!(nearest(&positions, BodyId(0), 5), vec![BodyId(1)]);
        assert!(nearest(&line(&[0.0]), BodyId(0), 5).is_empty());
        assert!(nearest(&positions, BodyId(9), 5).is_empty());
    }

    #[test]
    fn test_ties_keep_registry_order() {
        let positions = line(&[0.0, 2.0, -2.0, 2.0]);
        assert_eq!(nearest(&positions, BodyId(0), 3), vec![BodyId(1), BodyId(2), BodyId(3)]);
    }

    #[test]
    fn test_nearest_distances_are_non_decreasing() {
        let positions: Vec<Vec3> = (0..40)
            .map(|i| {
                let a = i as f32 * 0.7;
                Vec3::new(a.cos() * (200.0 + i as f32 * 9.0), 0.0, a.sin() * 300.0)
            })
            .collect();
        for from in 0..positions.len() {
            let result = nearest(&positions, BodyId(from), 5);
            assert_eq!(result.len(), 5);
            let d: Vec<f32> = result.iter().map(|id| positions[from].distance(positions[id.0])).collect();
            assert!(d.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn test_highlight_star_keeps_back_edges() {
        // 0 and 1 are mutual nearest neighbors
        let positions = line(&[0.0, 1.0, 10.0]);
        let graph = highlight_graph(&positions, BodyId(0), 5, 1);
        assert_eq!(graph.primary, vec![BodyId(1), BodyId(2)]);
        assert_eq!(
            graph.edges,
            vec![
                (BodyId(0), BodyId(1)),
                (BodyId(0), BodyId(2)),
                (BodyId(1), BodyId(0)),
                (BodyId(2), BodyId(1)),
            ]
        );
        assert_eq!(graph.highlighted(), vec![BodyId(1), BodyId(2)]);
    }
}

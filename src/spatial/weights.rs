use geo::{BoundingRect, MultiPolygon, Rect, Relate};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::DiagnosticsError;

/// Which shared boundary makes two polygons neighbors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Contiguity {
    /// Any shared boundary point.
    #[default]
    Queen,
    /// A shared boundary segment of positive length.
    Rook,
}

/// A bounding box in an R-tree, associated with a MultiPolygon by index.
#[derive(Debug, Clone)]
struct BoundingBox {
    idx: usize,
    bbox: Rect<f64>,
}

impl RTreeObject for BoundingBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}

/// Row-standardized spatial weights in compressed sparse row format.
///
/// Neighbor lists are symmetric and sorted; each non-island row sums to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialWeights {
    size: usize,
    offsets: Vec<u32>,
    edges: Vec<u32>,
    edge_weights: Vec<f64>,
    contiguity: Contiguity,
}

/// Shape of a weights structure, for reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightsSummary {
    pub contiguity: Contiguity,
    pub units: usize,
    pub links: usize,
    pub mean_neighbors: f64,
    pub min_neighbors: usize,
    pub max_neighbors: usize,
    pub islands: Vec<usize>,
}

impl SpatialWeights {
    /// Construct from adjacency lists. Lists are made symmetric, sorted, and deduplicated.
    pub fn from_neighbors(neighbors: &[Vec<u32>], contiguity: Contiguity) -> Self {
        let size = neighbors.len();
        let mut lists = neighbors.to_vec();
        for (i, list) in neighbors.iter().enumerate() {
            for &j in list {
                assert!((j as usize) < size, "neighbor {j} of unit {i} is out of range");
                lists[j as usize].push(i as u32);
            }
        }
        for (i, list) in lists.iter_mut().enumerate() {
            list.retain(|&j| j as usize != i);
            list.sort_unstable();
            list.dedup();
        }

        Self {
            size,
            offsets: std::iter::once(0u32).chain(
                lists.iter()
                    .map(|v| v.len() as u32)
                    .scan(0u32, |acc, len| { *acc += len; Some(*acc) })
            ).collect(),
            edge_weights: lists.iter()
                .flat_map(|v| std::iter::repeat_n(1.0 / v.len() as f64, v.len()))
                .collect(),
            edges: lists.into_iter().flatten().collect(),
            contiguity,
        }
    }

    /// Build contiguity weights from polygons.
    /// Candidate pairs come from an R-tree of bounding boxes and are confirmed with a DE-9IM relate.
    pub fn contiguity(geoms: &[MultiPolygon<f64>], contiguity: Contiguity) -> Result<Self, DiagnosticsError> {
        let rtree = RTree::bulk_load(geoms.iter().enumerate()
            .filter_map(|(idx, poly)| Some(BoundingBox { idx, bbox: poly.bounding_rect()? }))
            .collect());

        let mut adj_list = vec![Vec::new(); geoms.len()];
        for (i, geom) in geoms.iter().enumerate() {
            let Some(rect) = geom.bounding_rect() else { continue };
            let search = AABB::from_corners(rect.min().into(), rect.max().into());

            for cand in rtree.locate_in_envelope_intersecting(&search) {
                let j = cand.idx;
                if j <= i { continue } // check each unordered pair once

                let im = geom.relate(&geoms[j]);
                let adjacent = match contiguity {
                    Contiguity::Queen => im.is_intersects(),
                    // Index 4 of the DE-9IM string is Boundary/Boundary
                    Contiguity::Rook => im.matches("****1****")
                        .map_err(|e| DiagnosticsError::Geometry(format!("{e:?}")))?,
                };
                if adjacent { adj_list[i].push(j as u32) }
            }
        }

        let weights = Self::from_neighbors(&adj_list, contiguity);
        let islands = weights.islands();
        if !islands.is_empty() {
            warn!(islands = islands.len(), units = ?islands, "{} islands detected", islands.len());
        }
        info!(units = weights.len(), links = weights.links(), ?contiguity, "built contiguity weights");

        Ok(weights)
    }

    #[inline] pub fn len(&self) -> usize { self.size }

    #[inline] pub fn is_empty(&self) -> bool { self.size == 0 }

    /// Number of directed neighbor links.
    #[inline] pub fn links(&self) -> usize { self.edges.len() }

    #[inline]
    fn range(&self, unit: usize) -> std::ops::Range<usize> {
        self.offsets[unit] as usize .. self.offsets[unit + 1] as usize
    }

    #[inline] pub fn neighbor_count(&self, unit: usize) -> usize { self.range(unit).len() }

    #[inline]
    pub fn neighbors(&self, unit: usize) -> impl Iterator<Item = usize> + '_ {
        self.range(unit).map(move |e| self.edges[e] as usize)
    }

    #[inline]
    pub fn neighbors_with_weights(&self, unit: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.range(unit).map(move |e| (self.edges[e] as usize, self.edge_weights[e]))
    }

    /// Weight of the link `i -> j`, zero when absent.
    pub fn weight(&self, i: usize, j: usize) -> f64 {
        let range = self.range(i);
        self.edges[range.clone()].binary_search(&(j as u32))
            .map_or(0.0, |k| self.edge_weights[range.start + k])
    }

    /// Units without neighbors.
    pub fn islands(&self) -> Vec<usize> {
        (0..self.size).filter(|&i| self.neighbor_count(i) == 0).collect()
    }

    /// Spatial lag `sum_j w_ij x_j` of every unit.
    pub fn lag(&self, x: &[f64]) -> Vec<f64> {
        (0..self.size)
            .map(|i| self.neighbors_with_weights(i).map(|(j, w)| w * x[j]).sum())
            .collect()
    }

    /// Restrict to the given units (ascending), renumbered `0..keep.len()` and re-standardized.
    pub fn subset(&self, keep: &[usize]) -> Self {
        let mut new_index = vec![None; self.size];
        for (new, &old) in keep.iter().enumerate() {
            new_index[old] = Some(new as u32);
        }

        let lists = keep.iter()
            .map(|&old| self.neighbors(old).filter_map(|j| new_index[j]).collect::<Vec<_>>())
            .collect::<Vec<_>>();

        Self::from_neighbors(&lists, self.contiguity)
    }

    /// The classic weight sums: `S0 = sum w_ij`, `S1 = 1/2 sum (w_ij + w_ji)^2`,
    /// `S2 = sum_i (w_i. + w_.i)^2`.
    pub fn sums(&self) -> (f64, f64, f64) {
        let s0 = self.edge_weights.iter().sum::<f64>();

        let s1 = 0.5 * (0..self.size)
            .flat_map(|i| self.neighbors_with_weights(i).map(move |(j, w)| (i, j, w)))
            .map(|(i, j, w)| (w + self.weight(j, i)).powi(2))
            .sum::<f64>();

        let mut col_sums = vec![0.0; self.size];
        for i in 0..self.size {
            for (j, w) in self.neighbors_with_weights(i) { col_sums[j] += w }
        }
        let s2 = (0..self.size)
            .map(|i| (self.neighbors_with_weights(i).map(|(_, w)| w).sum::<f64>() + col_sums[i]).powi(2))
            .sum::<f64>();

        (s0, s1, s2)
    }

    pub fn summary(&self) -> WeightsSummary {
        let counts = (0..self.size).map(|i| self.neighbor_count(i));
        WeightsSummary {
            contiguity: self.contiguity,
            units: self.size,
            links: self.links(),
            mean_neighbors: if self.size > 0 { self.links() as f64 / self.size as f64 } else { 0.0 },
            min_neighbors: counts.clone().min().unwrap_or(0),
            max_neighbors: counts.max().unwrap_or(0),
            islands: self.islands(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn make_test_weights() -> SpatialWeights {
        SpatialWeights::from_neighbors(
            &[
                vec![1, 2],       // 0
                vec![0, 2],       // 1
                vec![0, 1, 3],    // 2
                vec![2],          // 3
                vec![],           // 4
            ],
            Contiguity::Queen,
        )
    }

    fn square(x: f64, y: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![(x: x, y: y), (x: x + 1.0, y: y), (x: x + 1.0, y: y + 1.0), (x: x, y: y + 1.0)]])
    }

    /// Row-major `cols` x `rows` grid of unit squares.
    fn grid(cols: usize, rows: usize) -> Vec<MultiPolygon<f64>> {
        (0..rows).flat_map(|r| (0..cols).map(move |c| square(c as f64, r as f64))).collect()
    }

    #[test]
    fn csr_layout() {
        let w = make_test_weights();

        assert_eq!(w.len(), 5);
        assert_eq!(w.offsets, vec![0, 2, 4, 7, 8, 8]);
        assert_eq!(w.edges, vec![1, 2, 0, 2, 0, 1, 3, 2]);
        for window in w.offsets.windows(2) { assert!(window[0] <= window[1]) }
    }

    #[test]
    fn rows_are_standardized() {
        let w = make_test_weights();
        for i in 0..4 {
            let sum = w.neighbors_with_weights(i).map(|(_, w)| w).sum::<f64>();
            assert!((sum - 1.0).abs() < 1e-12);
        }
        assert_eq!(w.weight(2, 3), 1.0 / 3.0);
        assert_eq!(w.weight(3, 2), 1.0);
        assert_eq!(w.weight(3, 0), 0.0);
    }

    #[test]
    fn asymmetric_input_is_symmetrized() {
        let w = SpatialWeights::from_neighbors(&[vec![1, 1, 0], vec![], vec![]], Contiguity::Rook);
        assert_eq!(w.neighbors(0).collect::<Vec<_>>(), vec![1]);
        assert_eq!(w.neighbors(1).collect::<Vec<_>>(), vec![0]);
        assert_eq!(w.islands(), vec![2]);
    }

    #[test]
    fn island_is_reported() {
        let w = make_test_weights();
        assert_eq!(w.islands(), vec![4]);
        assert_eq!(w.summary().islands, vec![4]);
        assert_eq!(w.summary().max_neighbors, 3);
    }

    #[test]
    fn subset_renumbers_and_restandardizes() {
        let w = make_test_weights().subset(&[0, 2, 3]);

        assert_eq!(w.len(), 3);
        assert_eq!(w.neighbors(0).collect::<Vec<_>>(), vec![1]);
        assert_eq!(w.neighbors(1).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(w.weight(1, 0), 0.5);
    }

    #[test]
    fn sums_of_row_standardized_weights() {
        // path 0 - 1 - 2
        let w = SpatialWeights::from_neighbors(&[vec![1], vec![2], vec![]], Contiguity::Queen);
        let (s0, s1, s2) = w.sums();

        assert!((s0 - 3.0).abs() < 1e-12);
        // pairs (0,1): (1 + 0.5)^2 twice, (1,2): same
        assert!((s1 - 0.5 * 4.0 * 2.25).abs() < 1e-12);
        // row sums 1, col sums 0.5, 2, 0.5
        assert!((s2 - (2.25 + 9.0 + 2.25)).abs() < 1e-12);
    }

    #[test]
    fn queen_and_rook_on_a_grid() {
        let geoms = grid(3, 3);
        let queen = SpatialWeights::contiguity(&geoms, Contiguity::Queen).unwrap();
        let rook = SpatialWeights::contiguity(&geoms, Contiguity::Rook).unwrap();

        // centre cell
        assert_eq!(queen.neighbors(4).collect::<Vec<_>>(), vec![0, 1, 2, 3, 5, 6, 7, 8]);
        assert_eq!(rook.neighbors(4).collect::<Vec<_>>(), vec![1, 3, 5, 7]);
        // corner cell
        assert_eq!(queen.neighbor_count(0), 3);
        assert_eq!(rook.neighbors(0).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn contiguity_kind_survives_subset() {
        let rook = SpatialWeights::contiguity(&grid(3, 3), Contiguity::Rook).unwrap();
        assert_eq!(rook.summary().contiguity, Contiguity::Rook);
        assert_eq!(rook.subset(&[0, 1, 3, 4]).summary().contiguity, Contiguity::Rook);
    }

    #[test]
    fn detached_polygon_is_an_island() {
        let mut geoms = grid(2, 1);
        geoms.push(square(10.0, 10.0));
        let w = SpatialWeights::contiguity(&geoms, Contiguity::Queen).unwrap();

        assert_eq!(w.islands(), vec![2]);
        assert_eq!(w.neighbors(0).collect::<Vec<_>>(), vec![1]);
    }
}

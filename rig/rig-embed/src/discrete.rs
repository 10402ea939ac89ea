//! Discrete joint assignment over the sphere graph.

use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};
use rig_field::VisibilityTester;
use rig_skeleton::Skeleton;
use tracing::debug;

use crate::error::{EmbedError, EmbedResult};
use crate::graph::SphereGraph;
use crate::EmbedParams;

/// Comparison slack for the lexicographic (total cost, length term)
/// tie-break.
const TIE_EPS: f64 = 1e-9;

/// Assign each reduced-skeleton joint to a sphere-graph vertex minimizing
/// the embedding cost.
///
/// The cost sums, over bones: squared deviation of the assigned graph
/// distance from the template length (normalized by total skeleton length),
/// squared angular deviation from the template direction, and an infinite
/// penalty for bones whose endpoints cannot see each other through the
/// interior; over joints: the vertical coordinate for feet, the negated
/// sphere radius for fat joints, and the squared distance between symmetric
/// pairs after reflection across the sagittal plane.
///
/// The search tabulates best subtree costs bottom-up over the reduced tree,
/// then runs a depth-first branch-and-bound over joints in index order with
/// the tables as an admissible remaining-cost bound, pruning any partial
/// assignment already worse than the incumbent. Ties in total cost break
/// toward the smaller length term.
///
/// # Errors
///
/// Returns an error when the graph is empty, the skeleton has no bones, or
/// no assignment passes the visibility requirement.
pub fn discrete_embedding(
    skeleton: &Skeleton,
    graph: &SphereGraph,
    tester: &VisibilityTester<'_>,
    params: &EmbedParams,
) -> EmbedResult<Vec<Point3<f64>>> {
    if graph.vertex_count() == 0 {
        return Err(EmbedError::EmptyPacking);
    }
    if skeleton.reduced_count() < 2 {
        return Err(EmbedError::DegenerateSkeleton);
    }

    let mut search = Search::new(skeleton, graph, tester, params);
    search.tabulate_subtrees();

    let mut assign = Vec::with_capacity(search.joint_count);
    search.descend(0, &mut assign, 0.0, 0.0);

    let Some(best) = search.best_assign else {
        return Err(EmbedError::NoEmbedding);
    };
    debug!(cost = search.best_cost, "discrete embedding found");
    Ok(best
        .iter()
        .map(|&v| graph.spheres()[v].center)
        .collect())
}

/// Expand reduced-joint positions to the full skeleton, placing collapsed
/// chain joints along their bone by cumulative length fractions.
#[must_use]
pub fn expand_to_full(skeleton: &Skeleton, reduced: &[Point3<f64>]) -> Vec<Point3<f64>> {
    let n = skeleton.full_count();
    let fc = skeleton.fc_map();
    let cf = skeleton.cf_map();
    let parent = skeleton.full_parent();
    let fraction = skeleton.fc_fraction();

    let mut out = vec![Point3::origin(); n];
    for f in 0..n {
        if fc[f] >= 0 {
            #[allow(clippy::cast_sign_loss)]
            {
                out[f] = reduced[fc[f] as usize];
            }
        }
    }

    for c in 1..skeleton.reduced_count() {
        // walk the collapsed chain from the surviving joint up to its
        // reduced parent
        let mut chain: Vec<usize> = Vec::new();
        let mut cur = cf[c];
        loop {
            chain.push(cur);
            #[allow(clippy::cast_sign_loss)]
            {
                cur = parent[cur] as usize;
            }
            if fc[cur] >= 0 {
                break;
            }
        }

        let start = out[cur];
        let end = reduced[c];
        let mut cumulative = 0.0;
        for &f in chain.iter().rev() {
            cumulative += fraction[f];
            if fc[f] < 0 {
                out[f] = start + (end - start) * cumulative;
            }
        }
    }

    out
}

/// Reflect a point across the sagittal plane `x = 0.5` of the normalized
/// mesh frame.
fn reflect_sagittal(p: Point3<f64>) -> Point3<f64> {
    Point3::new(1.0 - p.x, p.y, p.z)
}

struct Search<'a> {
    skeleton: &'a Skeleton,
    graph: &'a SphereGraph,
    tester: &'a VisibilityTester<'a>,
    params: &'a EmbedParams,

    joint_count: usize,
    total_length: f64,
    template_dir: Vec<Vector3<f64>>,
    children: Vec<Vec<usize>>,
    graph_dist: Vec<Vec<f64>>,
    visibility: HashMap<(u32, u32), bool>,

    /// `subtree[j][v]`: best cost of `j`'s subtree with `j` placed at `v`,
    /// ignoring symmetry.
    subtree: Vec<Vec<f64>>,

    best_cost: f64,
    best_length_term: f64,
    best_assign: Option<Vec<usize>>,
}

impl<'a> Search<'a> {
    fn new(
        skeleton: &'a Skeleton,
        graph: &'a SphereGraph,
        tester: &'a VisibilityTester<'a>,
        params: &'a EmbedParams,
    ) -> Self {
        let m = skeleton.reduced_count();
        let positions = skeleton.reduced_positions();
        let parent = skeleton.reduced_parent();

        let mut template_dir = vec![Vector3::zeros(); m];
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); m];
        for j in 1..m {
            #[allow(clippy::cast_sign_loss)]
            let p = parent[j] as usize;
            template_dir[j] = (positions[j] - positions[p])
                .try_normalize(0.0)
                .unwrap_or_else(Vector3::zeros);
            children[p].push(j);
        }

        Self {
            skeleton,
            graph,
            tester,
            params,
            joint_count: m,
            total_length: skeleton.total_length().max(1e-12),
            template_dir,
            children,
            graph_dist: graph.all_pairs_distances(),
            visibility: HashMap::new(),
            subtree: vec![vec![0.0; graph.vertex_count()]; m],
            best_cost: f64::INFINITY,
            best_length_term: f64::INFINITY,
            best_assign: None,
        }
    }

    fn visible(&mut self, v: usize, w: usize) -> bool {
        if v == w {
            return true;
        }
        #[allow(clippy::cast_possible_truncation)]
        let key = (v.min(w) as u32, v.max(w) as u32);
        if let Some(&cached) = self.visibility.get(&key) {
            return cached;
        }
        let a = self.graph.spheres()[v].center;
        let b = self.graph.spheres()[w].center;
        let result = self.tester.can_see(a, b);
        self.visibility.insert(key, result);
        result
    }

    /// Joint-local cost: feet and fat terms.
    fn node_cost(&self, j: usize, v: usize) -> f64 {
        let sphere = &self.graph.spheres()[v];
        let mut cost = 0.0;
        if self.skeleton.reduced_feet()[j] {
            cost += self.params.feet_weight * sphere.center.y;
        }
        if self.skeleton.reduced_fat()[j] {
            cost -= self.params.fat_weight * sphere.radius;
        }
        cost
    }

    /// Bone cost for joint `j` at `w` with its parent at `v`; also returns
    /// the length term alone for tie-breaking. Infinite when the bone is
    /// not interior-visible.
    fn bone_cost(&mut self, j: usize, v: usize, w: usize) -> (f64, f64) {
        let d = self.graph_dist[v][w];
        if !d.is_finite() || !self.visible(v, w) {
            return (f64::INFINITY, 0.0);
        }

        let deviation = (d - self.skeleton.reduced_length()[j]) / self.total_length;
        let length_term = self.params.length_weight * deviation * deviation;

        let dir = self.graph.spheres()[w].center - self.graph.spheres()[v].center;
        let angle = if dir.norm() < 1e-12 {
            std::f64::consts::PI
        } else {
            dir.angle(&self.template_dir[j])
        };
        let cost = length_term + self.params.orientation_weight * angle * angle;
        (cost, length_term)
    }

    fn symmetry_cost(&self, v: usize, partner: usize) -> f64 {
        let a = self.graph.spheres()[v].center;
        let b = self.graph.spheres()[partner].center;
        self.params.symmetry_weight * (a - reflect_sagittal(b)).norm_squared()
    }

    /// Fill `subtree` bottom-up; children have larger indices than parents.
    fn tabulate_subtrees(&mut self) {
        let nv = self.graph.vertex_count();
        for j in (0..self.joint_count).rev() {
            for v in 0..nv {
                let mut cost = self.node_cost(j, v);
                for c_idx in 0..self.children[j].len() {
                    let child = self.children[j][c_idx];
                    let mut best = f64::INFINITY;
                    for w in 0..nv {
                        let (bone, _) = self.bone_cost(child, v, w);
                        let total = bone + self.subtree[child][w];
                        if total < best {
                            best = total;
                        }
                    }
                    cost += best;
                }
                self.subtree[j][v] = cost;
            }
        }
    }

    /// Best remaining cost for an unassigned root `j` given its parent's
    /// vertex.
    fn root_bound(&mut self, j: usize, parent_vertex: usize) -> f64 {
        let mut best = f64::INFINITY;
        for w in 0..self.graph.vertex_count() {
            let (bone, _) = self.bone_cost(j, parent_vertex, w);
            let total = bone + self.subtree[j][w];
            if total < best {
                best = total;
            }
        }
        best
    }

    /// Depth-first branch-and-bound, assigning joint `k`.
    fn descend(&mut self, k: usize, assign: &mut Vec<usize>, g: f64, g_length: f64) {
        if k == self.joint_count {
            if g < self.best_cost - TIE_EPS
                || (g < self.best_cost + TIE_EPS && g_length < self.best_length_term)
            {
                self.best_cost = g;
                self.best_length_term = g_length;
                self.best_assign = Some(assign.clone());
            }
            return;
        }

        let parent = self.skeleton.reduced_parent()[k];
        let sym = self.skeleton.reduced_sym()[k];

        // bound contribution of remaining subtree roots hanging off joints
        // assigned before k; roots hanging off k itself depend on the
        // candidate and are added per vertex
        let mut h_fixed = 0.0;
        for j in (k + 1)..self.joint_count {
            let pj = self.skeleton.reduced_parent()[j];
            if pj >= 0 && (pj as usize) < k {
                #[allow(clippy::cast_sign_loss)]
                let bound = self.root_bound(j, assign[pj as usize]);
                h_fixed += bound;
            }
        }
        if !h_fixed.is_finite() {
            return;
        }

        // score every candidate vertex
        let nv = self.graph.vertex_count();
        let mut candidates: Vec<(f64, usize, f64, f64)> = Vec::with_capacity(nv);
        for v in 0..nv {
            let mut delta = self.node_cost(k, v);
            let mut delta_length = 0.0;
            if parent >= 0 {
                #[allow(clippy::cast_sign_loss)]
                let (bone, length_term) = self.bone_cost(k, assign[parent as usize], v);
                if !bone.is_finite() {
                    continue;
                }
                delta += bone;
                delta_length = length_term;
            }
            #[allow(clippy::cast_sign_loss)]
            if sym >= 0 && (sym as usize) < k {
                delta += self.symmetry_cost(v, assign[sym as usize]);
            }

            let mut h_v = 0.0;
            let own_children: Vec<usize> = self.children[k]
                .iter()
                .copied()
                .filter(|&c| c > k)
                .collect();
            for j in own_children {
                h_v += self.root_bound(j, v);
            }
            if !h_v.is_finite() {
                continue;
            }

            candidates.push((delta + h_v, v, delta, delta_length));
        }

        candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        for (score, v, delta, delta_length) in candidates {
            let bound = g + score + h_fixed;
            if bound > self.best_cost + TIE_EPS {
                break; // sorted: everything after is worse
            }
            assign.push(v);
            self.descend(k + 1, assign, g + delta, g_length + delta_length);
            assign.pop();
        }
    }
}

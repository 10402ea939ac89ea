//! Skeleton core: full and reduced joint graphs.

use hashbrown::HashMap;
use nalgebra::Point3;
use tracing::debug;

use crate::error::{SkeletonError, SkeletonResult};

/// A tree of joints plus its reduced-bone graph.
///
/// Immutable once built; construct via [`SkeletonBuilder`], the built-in
/// constructors ([`Skeleton::human`] and friends), or
/// [`Skeleton::from_file`].
#[derive(Debug, Clone)]
pub struct Skeleton {
    // full graph
    positions: Vec<Point3<f64>>,
    parent: Vec<i32>,
    sym: Vec<i32>,
    names: HashMap<String, usize>,

    // reduced graph (degree-2 interior chains collapsed)
    c_positions: Vec<Point3<f64>>,
    c_parent: Vec<i32>,
    c_sym: Vec<i32>,
    c_feet: Vec<bool>,
    c_fat: Vec<bool>,
    c_length: Vec<f64>,

    // maps between the graphs
    cf_map: Vec<usize>,
    fc_map: Vec<i32>,
    fc_fraction: Vec<f64>,
}

impl Skeleton {
    /// Number of joints in the full graph.
    #[inline]
    #[must_use]
    pub fn full_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of joints in the reduced graph.
    #[inline]
    #[must_use]
    pub fn reduced_count(&self) -> usize {
        self.c_positions.len()
    }

    /// Number of bones in the full graph (one per non-root joint).
    #[inline]
    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.positions.len().saturating_sub(1)
    }

    /// Full joint positions, in the `[-0.5, 0.5]` skeleton frame.
    #[must_use]
    pub fn full_positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    /// Full-graph parent of each joint; the root has parent −1.
    #[must_use]
    pub fn full_parent(&self) -> &[i32] {
        &self.parent
    }

    /// Full-graph symmetry partner of each joint, −1 when unpaired.
    #[must_use]
    pub fn full_sym(&self) -> &[i32] {
        &self.sym
    }

    /// Reduced joint positions.
    #[must_use]
    pub fn reduced_positions(&self) -> &[Point3<f64>] {
        &self.c_positions
    }

    /// Reduced-graph parent of each joint; the root has parent −1.
    #[must_use]
    pub fn reduced_parent(&self) -> &[i32] {
        &self.c_parent
    }

    /// Reduced-graph symmetry partners, −1 when unpaired.
    #[must_use]
    pub fn reduced_sym(&self) -> &[i32] {
        &self.c_sym
    }

    /// Which reduced joints should sit near the ground plane.
    #[must_use]
    pub fn reduced_feet(&self) -> &[bool] {
        &self.c_feet
    }

    /// Which reduced joints should claim a large interior sphere.
    #[must_use]
    pub fn reduced_fat(&self) -> &[bool] {
        &self.c_fat
    }

    /// Length of each reduced bone (sum of the collapsed chain's edges);
    /// entry 0 (the root) is 0.
    #[must_use]
    pub fn reduced_length(&self) -> &[f64] {
        &self.c_length
    }

    /// Map from reduced joint index to the full joint it survives as.
    #[must_use]
    pub fn cf_map(&self) -> &[usize] {
        &self.cf_map
    }

    /// Map from full joint index to reduced joint index, −1 for collapsed
    /// chain interiors.
    #[must_use]
    pub fn fc_map(&self) -> &[i32] {
        &self.fc_map
    }

    /// For each full joint, the ratio of its incoming edge length to the
    /// length of the reduced bone containing it; −1 for the root.
    #[must_use]
    pub fn fc_fraction(&self) -> &[f64] {
        &self.fc_fraction
    }

    /// Look up a joint index by name.
    #[must_use]
    pub fn joint_index(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    /// Uniformly scale all joint positions and bone lengths.
    pub fn scale(&mut self, factor: f64) {
        for p in &mut self.positions {
            p.coords *= factor;
        }
        for p in &mut self.c_positions {
            p.coords *= factor;
        }
        for l in &mut self.c_length {
            *l *= factor;
        }
    }

    /// Total template length over all reduced bones.
    #[must_use]
    pub fn total_length(&self) -> f64 {
        self.c_length.iter().sum()
    }
}

/// Declarative joint record consumed by [`SkeletonBuilder`].
struct JointRecord {
    name: String,
    position: Point3<f64>,
    parent: Option<String>,
}

/// Incremental skeleton construction.
///
/// Joints are added parent-before-child with positions in `[-1, 1]` (halved
/// on insert). Symmetry pairs and foot/fat hints reference joints by name;
/// [`SkeletonBuilder::build`] collapses degree-2 chains and derives the
/// reduced graph.
///
/// # Example
///
/// ```
/// use rig_skeleton::SkeletonBuilder;
/// use nalgebra::Point3;
///
/// let skeleton = SkeletonBuilder::new()
///     .joint("root", Point3::new(0.0, 0.0, 0.0), None)
///     .joint("mid", Point3::new(0.0, 0.5, 0.0), Some("root"))
///     .joint("tip", Point3::new(0.0, 1.0, 0.0), Some("mid"))
///     .build()
///     .unwrap();
///
/// // `mid` has degree 2 and collapses away
/// assert_eq!(skeleton.reduced_count(), 2);
/// ```
#[derive(Default)]
pub struct SkeletonBuilder {
    joints: Vec<JointRecord>,
    symmetric: Vec<(String, String)>,
    feet: Vec<String>,
    fat: Vec<String>,
}

impl SkeletonBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a joint. `position` is in the `[-1, 1]` convention and will be
    /// halved; `parent` must name an already-added joint, or be `None` for
    /// the root.
    #[must_use]
    pub fn joint(mut self, name: &str, position: Point3<f64>, parent: Option<&str>) -> Self {
        self.joints.push(JointRecord {
            name: name.to_owned(),
            position,
            parent: parent.map(str::to_owned),
        });
        self
    }

    /// Mark two joints as a symmetric pair.
    #[must_use]
    pub fn symmetric(mut self, a: &str, b: &str) -> Self {
        self.symmetric.push((a.to_owned(), b.to_owned()));
        self
    }

    /// Mark a joint as a foot (embedding biases it toward the ground plane).
    #[must_use]
    pub fn foot(mut self, name: &str) -> Self {
        self.feet.push(name.to_owned());
        self
    }

    /// Mark a joint as fat (embedding biases it toward a large sphere).
    #[must_use]
    pub fn fat(mut self, name: &str) -> Self {
        self.fat.push(name.to_owned());
        self
    }

    /// Build the skeleton, deriving the reduced graph.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate joint names, references to unknown
    /// joints, or a root count other than one.
    #[allow(clippy::too_many_lines)]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    // Truncation: joint counts are tiny (tens); i32 indices follow the
    // root-is-minus-one convention of the file formats.
    pub fn build(self) -> SkeletonResult<Skeleton> {
        let count = self.joints.len();
        let mut names: HashMap<String, usize> = HashMap::with_capacity(count);
        let mut positions = Vec::with_capacity(count);
        let mut parent: Vec<i32> = Vec::with_capacity(count);
        let mut degree = vec![0usize; count];

        for (i, record) in self.joints.iter().enumerate() {
            if names.insert(record.name.clone(), i).is_some() {
                return Err(SkeletonError::DuplicateJoint {
                    name: record.name.clone(),
                });
            }
            // skeletons are specified in [-1, 1] and fit an object in [0, 1]
            positions.push(record.position * 0.5);

            match &record.parent {
                None => parent.push(-1),
                Some(parent_name) => {
                    let p = *names
                        .get(parent_name)
                        .ok_or_else(|| SkeletonError::UnknownJoint {
                            name: parent_name.clone(),
                        })?;
                    parent.push(p as i32);
                    degree[p] += 1;
                    degree[i] += 1;
                }
            }
        }

        let roots = parent.iter().filter(|&&p| p < 0).count();
        if roots != 1 {
            return Err(SkeletonError::BadRootCount { count: roots });
        }

        let mut sym = vec![-1i32; count];
        for (a, b) in &self.symmetric {
            let mut ia = *names.get(a).ok_or_else(|| SkeletonError::UnknownJoint {
                name: a.clone(),
            })?;
            let mut ib = *names.get(b).ok_or_else(|| SkeletonError::UnknownJoint {
                name: b.clone(),
            })?;
            if ia > ib {
                std::mem::swap(&mut ia, &mut ib);
            }
            sym[ib] = ia as i32;
        }

        // --- reduced graph: drop degree-2 non-root joints ---
        let mut fc_map = vec![-1i32; count];
        let mut cf_map: Vec<usize> = Vec::new();
        for i in 0..count {
            // the root always survives the collapse
            if degree[i] == 2 && i != 0 {
                continue;
            }
            fc_map[i] = cf_map.len() as i32;
            cf_map.push(i);
        }

        let reduced = cf_map.len();
        let mut c_positions = Vec::with_capacity(reduced);
        let mut c_parent = vec![-1i32; reduced];
        let mut c_sym = vec![-1i32; reduced];

        for (i, &full) in cf_map.iter().enumerate() {
            c_positions.push(positions[full]);

            if sym[full] >= 0 {
                c_sym[i] = fc_map[sym[full] as usize];
            }

            if i > 0 {
                // nearest surviving ancestor
                let mut cur = parent[full];
                while fc_map[cur as usize] < 0 {
                    cur = parent[cur as usize];
                }
                c_parent[i] = fc_map[cur as usize];
            }
        }

        // --- chain lengths and per-joint fractions ---
        let mut c_length = vec![0.0f64; reduced];
        let mut fc_fraction = vec![-1.0f64; count];
        for i in 1..reduced {
            let mut chain: Vec<(usize, f64)> = Vec::new();
            let mut cur = cf_map[i];
            loop {
                let p = parent[cur] as usize;
                let len = (positions[cur] - positions[p]).norm();
                chain.push((cur, len));
                c_length[i] += len;
                cur = p;
                if fc_map[cur] >= 0 {
                    break;
                }
            }
            for (joint, len) in chain {
                fc_fraction[joint] = len / c_length[i];
            }
        }

        let mut c_feet = vec![false; reduced];
        let mut c_fat = vec![false; reduced];
        for (names_list, flags) in [(&self.feet, &mut c_feet), (&self.fat, &mut c_fat)] {
            for name in names_list {
                let i = *names.get(name).ok_or_else(|| SkeletonError::UnknownJoint {
                    name: name.clone(),
                })?;
                if fc_map[i] < 0 {
                    return Err(SkeletonError::InteriorJoint { name: name.clone() });
                }
                flags[fc_map[i] as usize] = true;
            }
        }

        debug!(full = count, reduced, "built skeleton");

        Ok(Skeleton {
            positions,
            parent,
            sym,
            names,
            c_positions,
            c_parent,
            c_sym,
            c_feet,
            c_fat,
            c_length,
            cf_map,
            fc_map,
            fc_fraction,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn maps_are_mutually_inverse() {
        let s = Skeleton::human();
        for (c, &f) in s.cf_map().iter().enumerate() {
            assert_eq!(s.fc_map()[f] as usize, c);
        }
        for (f, &c) in s.fc_map().iter().enumerate() {
            if c >= 0 {
                assert_eq!(s.cf_map()[c as usize], f);
            }
        }
    }

    #[test]
    fn fractions_sum_to_one_per_chain() {
        let s = Skeleton::human();
        for c in 1..s.reduced_count() {
            let mut sum = 0.0;
            let mut cur = s.cf_map()[c];
            loop {
                sum += s.fc_fraction()[cur];
                cur = s.full_parent()[cur] as usize;
                if s.fc_map()[cur] >= 0 {
                    break;
                }
            }
            assert_relative_eq!(sum, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn chain_lengths_match_edge_sums() {
        let s = Skeleton::human();
        for c in 1..s.reduced_count() {
            let mut sum = 0.0;
            let mut cur = s.cf_map()[c];
            loop {
                let p = s.full_parent()[cur] as usize;
                sum += (s.full_positions()[cur] - s.full_positions()[p]).norm();
                cur = p;
                if s.fc_map()[cur] >= 0 {
                    break;
                }
            }
            assert_relative_eq!(s.reduced_length()[c], sum, epsilon = 1e-12);
        }
    }

    #[test]
    fn scale_is_uniform() {
        let mut s = Skeleton::human();
        let length_before = s.total_length();
        s.scale(0.7);
        assert_relative_eq!(s.total_length(), 0.7 * length_before, epsilon = 1e-12);
    }

    #[test]
    fn duplicate_name_rejected() {
        let result = SkeletonBuilder::new()
            .joint("a", Point3::origin(), None)
            .joint("a", Point3::new(1.0, 0.0, 0.0), Some("a"))
            .build();
        assert!(matches!(result, Err(SkeletonError::DuplicateJoint { .. })));
    }

    #[test]
    fn unknown_parent_rejected() {
        let result = SkeletonBuilder::new()
            .joint("a", Point3::origin(), Some("ghost"))
            .build();
        assert!(matches!(result, Err(SkeletonError::UnknownJoint { .. })));
    }

    #[test]
    fn positions_halved_on_insert() {
        let s = SkeletonBuilder::new()
            .joint("a", Point3::new(1.0, -1.0, 0.0), None)
            .joint("b", Point3::new(0.0, 1.0, 0.0), Some("a"))
            .build()
            .unwrap();
        assert_eq!(s.full_positions()[0], Point3::new(0.5, -0.5, 0.0));
    }
}

//! Sparse least squares with hard equality constraints.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{SolveError, SolveResult};
use crate::spd::{Llt, SpdMatrix};

/// Opaque handle for a least-squares variable, allocated by
/// [`LsqSystem::variable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(u32);

/// Opaque handle for a constraint, returned by [`LsqSystem::add_constraint`];
/// used to update right-hand sides between solves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintId(u32);

#[derive(Debug, Clone)]
struct Constraint {
    hard: bool,
    lhs: Vec<(u32, f64)>,
    rhs: f64,
}

/// State produced by [`LsqSystem::factor`] and reused across solves.
#[derive(Debug)]
struct Factored {
    soft_num: usize,
    hard_num: usize,
    /// Position of each constraint in the combined rhs vector: soft
    /// constraints first, then one slot per hard-constraint substitution.
    position: Vec<usize>,
    /// Variables: free (softly solved) first, then substituted.
    var_ids: Vec<u32>,
    n_free: usize,
    /// Each substitution as `(free variable index, coefficient)` pairs.
    substituted: Vec<Vec<(usize, f64)>>,
    /// Per substitution, how hard right-hand sides flow into the combined
    /// rhs vector: `(target position, factor)`.
    rhs_transform: Vec<Vec<(usize, f64)>>,
    /// Soft constraint rows over free-variable indices, sorted.
    soft_matrix: Vec<Vec<(usize, f64)>>,
    llt: Llt,
}

/// Sparse linear least squares with mixed hard and soft constraints.
///
/// Hard constraints are eliminated exactly by Gaussian row reduction with a
/// pivot rule favoring near-assignments; the soft constraints then form
/// normal equations `AᵀA` handed to the sparse SPD factorizer.
///
/// Usage is factor-once, solve-many: right-hand sides may change between
/// solves ([`LsqSystem::set_rhs`]) without refactoring.
///
/// # Example
///
/// ```
/// use rig_solver::LsqSystem;
///
/// let mut sys = LsqSystem::new();
/// let x = sys.variable();
/// let y = sys.variable();
/// sys.add_constraint(true, &[(x, 1.0), (y, 1.0)], 2.0); // hard: x + y = 2
/// sys.add_constraint(false, &[(y, 1.0)], 0.0);          // soft: y = 0
/// sys.factor().unwrap();
/// sys.solve().unwrap();
/// assert!((sys.result(x).unwrap() - 2.0).abs() < 1e-12);
/// assert!(sys.result(y).unwrap().abs() < 1e-12);
/// ```
#[derive(Debug, Default)]
pub struct LsqSystem {
    var_count: u32,
    constraints: Vec<Constraint>,
    factored: Option<Factored>,
    result: Vec<f64>,
    solved: bool,
}

impl LsqSystem {
    /// Create an empty system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh variable.
    pub fn variable(&mut self) -> VarId {
        let id = VarId(self.var_count);
        self.var_count += 1;
        id
    }

    /// Allocate `count` variables at once.
    pub fn variables(&mut self, count: usize) -> Vec<VarId> {
        (0..count).map(|_| self.variable()).collect()
    }

    /// Add a constraint `Σ coefficient · variable = rhs`.
    ///
    /// Hard constraints are satisfied exactly; soft constraints in the
    /// least-squares sense. The returned handle can update the right-hand
    /// side later.
    pub fn add_constraint(&mut self, hard: bool, lhs: &[(VarId, f64)], rhs: f64) -> ConstraintId {
        #[allow(clippy::cast_possible_truncation)]
        let id = ConstraintId(self.constraints.len() as u32);
        self.constraints.push(Constraint {
            hard,
            lhs: lhs.iter().map(|&(v, c)| (v.0, c)).collect(),
            rhs,
        });
        self.solved = false;
        id
    }

    /// Add a constraint whose right-hand side is supplied later.
    ///
    /// The side starts at zero; set it with [`LsqSystem::set_rhs`] before
    /// each solve. The factorization depends only on the left-hand sides,
    /// so deferred sides never force a refactor.
    pub fn constraint_with_deferred_rhs(
        &mut self,
        hard: bool,
        lhs: &[(VarId, f64)],
    ) -> ConstraintId {
        self.add_constraint(hard, lhs, 0.0)
    }

    /// Update a constraint's right-hand side; the factorization is reused.
    pub fn set_rhs(&mut self, id: ConstraintId, rhs: f64) {
        self.constraints[id.0 as usize].rhs = rhs;
        self.solved = false;
    }

    /// Row-reduce the hard constraints and factor the soft normal equations.
    ///
    /// The pivot rule picks the `(equation, variable)` pair maximizing
    /// `|coefficient| / (row length − 0.9)`, which heavily prefers simple
    /// assignments; a direct assignment short-circuits the search.
    ///
    /// # Errors
    ///
    /// Returns an error when the hard constraints are near-singular, a
    /// variable is determined by no constraint, or the normal equations are
    /// not positive definite.
    #[allow(clippy::too_many_lines)]
    pub fn factor(&mut self) -> SolveResult<()> {
        self.factored = None;
        self.solved = false;

        // positions in the combined rhs vector: soft constraints first
        let mut position = vec![usize::MAX; self.constraints.len()];
        let mut soft_num = 0usize;
        for (idx, c) in self.constraints.iter().enumerate() {
            if !c.hard {
                position[idx] = soft_num;
                soft_num += 1;
            }
        }

        // working copies of the hard constraints
        let mut hard: Vec<BTreeMap<u32, f64>> = Vec::new();
        let mut hard_ids: Vec<usize> = Vec::new();
        let mut hard_rhs: Vec<BTreeMap<usize, f64>> = Vec::new();
        for (idx, c) in self.constraints.iter().enumerate() {
            if c.hard {
                hard.push(c.lhs.iter().copied().collect());
                hard_ids.push(idx);
                let mut rhs = BTreeMap::new();
                rhs.insert(idx, 1.0);
                hard_rhs.push(rhs);
            }
        }
        let hard_num = hard.len();

        // substitutions: var -> linear combination of other vars, plus the
        // constant part as a combination of constraint right-hand sides
        let mut substitutions: BTreeMap<u32, BTreeMap<u32, f64>> = BTreeMap::new();
        let mut substitutions_rhs: BTreeMap<u32, BTreeMap<usize, f64>> = BTreeMap::new();
        let mut subst_order: BTreeMap<u32, usize> = BTreeMap::new();

        while !hard.is_empty() {
            // pivot search
            let mut best_val = 0.0f64;
            let mut best_eq = usize::MAX;
            let mut best_var = 0u32;
            'outer: for (eq, lhs) in hard.iter().enumerate() {
                #[allow(clippy::cast_precision_loss)]
                let denom = lhs.len() as f64 - 0.9;
                for (&var, &coef) in lhs {
                    let val = coef.abs() / denom;
                    if val > best_val {
                        best_val = val;
                        best_eq = eq;
                        best_var = var;
                        // an assignment or simple equality is always good enough
                        if val > 0.5 && lhs.len() <= 2 {
                            break 'outer;
                        }
                    }
                }
            }

            if best_val < 1e-10 {
                return Err(SolveError::SingularConstraints);
            }

            let subst_idx = substitutions.len();
            subst_order.insert(best_var, subst_idx);
            position[hard_ids[best_eq]] = soft_num + subst_idx;

            let last = hard.len() - 1;
            hard.swap(best_eq, last);
            hard_ids.swap(best_eq, last);
            hard_rhs.swap(best_eq, last);
            #[allow(clippy::unwrap_used)] // non-empty by the loop condition
            let pivot_lhs = hard.pop().unwrap();
            hard_ids.pop();
            #[allow(clippy::unwrap_used)]
            let pivot_rhs = hard_rhs.pop().unwrap();

            let factor = -1.0 / pivot_lhs[&best_var];
            let cur_sub: BTreeMap<u32, f64> = pivot_lhs
                .iter()
                .filter(|&(&v, _)| v != best_var)
                .map(|(&v, &c)| (v, c * factor))
                .collect();
            let cur_sub_rhs: BTreeMap<usize, f64> = pivot_rhs
                .iter()
                .map(|(&cidx, &r)| (cidx, r * -factor))
                .collect();

            // substitute into the unprocessed hard constraints
            for (lhs, rhs) in hard.iter_mut().zip(hard_rhs.iter_mut()) {
                let Some(weight) = lhs.remove(&best_var) else {
                    continue;
                };
                for (&v, &s) in &cur_sub {
                    *lhs.entry(v).or_insert(0.0) += s * weight;
                }
                for (&cidx, &s) in &cur_sub_rhs {
                    *rhs.entry(cidx).or_insert(0.0) -= s * weight;
                }
            }

            // and into the substitutions made so far
            for (&var, sub) in &mut substitutions {
                let Some(weight) = sub.remove(&best_var) else {
                    continue;
                };
                for (&v, &s) in &cur_sub {
                    *sub.entry(v).or_insert(0.0) += s * weight;
                }
                #[allow(clippy::unwrap_used)] // created together with `sub`
                let srhs = substitutions_rhs.get_mut(&var).unwrap();
                for (&cidx, &s) in &cur_sub_rhs {
                    *srhs.entry(cidx).or_insert(0.0) += s * weight;
                }
            }

            substitutions.insert(best_var, cur_sub);
            substitutions_rhs.insert(best_var, cur_sub_rhs);
        }

        // index the free variables (first appearance in the soft
        // constraints), then the substituted ones
        let mut var_index: BTreeMap<u32, usize> = BTreeMap::new();
        let mut var_ids: Vec<u32> = Vec::new();
        for c in &self.constraints {
            if c.hard {
                continue;
            }
            for &(v, _) in &c.lhs {
                if !var_index.contains_key(&v) && !substitutions.contains_key(&v) {
                    var_index.insert(v, var_ids.len());
                    var_ids.push(v);
                }
            }
        }
        let n_free = var_ids.len();
        var_ids.resize(n_free + substitutions.len(), 0);
        for (&var, &order) in &subst_order {
            var_index.insert(var, n_free + order);
            var_ids[n_free + order] = var;
        }

        // substitutions in index form, over free variables only
        let mut substituted: Vec<Vec<(usize, f64)>> = vec![Vec::new(); substitutions.len()];
        for (&var, sub) in &substitutions {
            let order = subst_order[&var];
            for (&v, &s) in sub {
                match var_index.get(&v) {
                    Some(&vi) if vi < n_free => substituted[order].push((vi, s)),
                    // fixed by hard constraints only through another
                    // substituted variable, or by nothing at all
                    _ => return Err(SolveError::UnconstrainedVariable { var: v }),
                }
            }
        }

        // soft rows with substitutions applied, tracking how hard right-hand
        // sides leak into soft rows
        let mut rhs_transform_map: Vec<BTreeMap<usize, f64>> =
            vec![BTreeMap::new(); substitutions.len()];
        let mut soft_matrix: Vec<Vec<(usize, f64)>> = vec![Vec::new(); soft_num];
        for (cidx, c) in self.constraints.iter().enumerate() {
            if c.hard {
                continue;
            }
            let row = position[cidx];
            let mut mod_lhs: BTreeMap<u32, f64> = c.lhs.iter().copied().collect();
            for &(v, fac) in &c.lhs {
                let Some(sub) = substitutions.get(&v) else {
                    continue;
                };
                for (&v2, &s) in sub {
                    *mod_lhs.entry(v2).or_insert(0.0) += fac * s;
                }
                for (&cidx2, &s) in &substitutions_rhs[&v] {
                    *rhs_transform_map[position[cidx2] - soft_num]
                        .entry(row)
                        .or_insert(0.0) -= fac * s;
                }
            }
            for (&v, &coef) in &mod_lhs {
                if substitutions.contains_key(&v) {
                    continue;
                }
                soft_matrix[row].push((var_index[&v], coef));
            }
            soft_matrix[row].sort_unstable_by_key(|&(i, _)| i);
        }

        // hard right-hand sides also reconstruct the substituted variables
        for (&var, srhs) in &substitutions_rhs {
            let target = soft_num + subst_order[&var];
            for (&cidx, &s) in srhs {
                *rhs_transform_map[position[cidx] - soft_num]
                    .entry(target)
                    .or_insert(0.0) += s;
            }
        }
        let rhs_transform: Vec<Vec<(usize, f64)>> = rhs_transform_map
            .into_iter()
            .map(|m| m.into_iter().collect())
            .collect();

        // normal equations AᵀA (lower triangle) over the free variables
        let mut spd_map: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); n_free];
        for row in &soft_matrix {
            for (j, &(cj, vj)) in row.iter().enumerate() {
                for &(ck, vk) in &row[..=j] {
                    *spd_map[cj].entry(ck).or_insert(0.0) += vj * vk;
                }
            }
        }
        let spd_rows: Vec<Vec<(usize, f64)>> =
            spd_map.into_iter().map(|m| m.into_iter().collect()).collect();
        let llt = SpdMatrix::from_lower_rows(spd_rows)?.factor()?;

        debug!(
            soft = soft_num,
            hard = hard_num,
            free = n_free,
            "factored least-squares system"
        );

        self.factored = Some(Factored {
            soft_num,
            hard_num,
            position,
            var_ids,
            n_free,
            substituted,
            rhs_transform,
            soft_matrix,
            llt,
        });
        Ok(())
    }

    /// Solve for the current right-hand sides.
    ///
    /// # Errors
    ///
    /// Returns an error if called before [`LsqSystem::factor`].
    pub fn solve(&mut self) -> SolveResult<()> {
        let f = self
            .factored
            .as_ref()
            .ok_or(SolveError::OutOfOrder("solve before factor"))?;
        if self.constraints.len() != f.position.len() {
            return Err(SolveError::OutOfOrder("constraints added after factor"));
        }

        // gather the right-hand sides into combined positions
        let mut rhs0 = vec![0.0f64; f.soft_num + f.hard_num];
        for (cidx, c) in self.constraints.iter().enumerate() {
            rhs0[f.position[cidx]] = c.rhs;
        }

        // hard right-hand sides act through the transform, not directly
        let mut rhs1 = rhs0.clone();
        for slot in rhs1.iter_mut().skip(f.soft_num) {
            *slot = 0.0;
        }
        for (i, row) in f.rhs_transform.iter().enumerate() {
            for &(pos, fac) in row {
                rhs1[pos] += fac * rhs0[f.soft_num + i];
            }
        }

        // multiply by Aᵀ
        let mut rhs2 = vec![0.0f64; f.n_free];
        for (i, row) in f.soft_matrix.iter().enumerate() {
            for &(col, v) in row {
                rhs2[col] += v * rhs1[i];
            }
        }

        let x = f.llt.solve(&rhs2);

        self.result = vec![0.0; self.var_count as usize];
        for (i, &xi) in x.iter().enumerate() {
            self.result[f.var_ids[i] as usize] = xi;
        }
        for (i, sub) in f.substituted.iter().enumerate() {
            let mut value = rhs1[f.soft_num + i];
            for &(vi, s) in sub {
                value += s * x[vi];
            }
            self.result[f.var_ids[f.n_free + i] as usize] = value;
        }

        self.solved = true;
        Ok(())
    }

    /// The solved value of a variable; `None` before a successful solve.
    #[must_use]
    pub fn result(&self, var: VarId) -> Option<f64> {
        if self.solved {
            self.result.get(var.0 as usize).copied()
        } else {
            None
        }
    }
}

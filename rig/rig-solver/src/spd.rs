//! Sparse SPD factorization: minimum-degree ordering plus up-looking LDLᵀ.

use hashbrown::HashSet;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::debug;

use crate::error::{SolveError, SolveResult};

/// A sparse symmetric positive-definite matrix, stored row-wise as its lower
/// triangle.
///
/// Each row holds `(column, value)` pairs sorted by column, ending with the
/// diagonal entry.
#[derive(Debug, Clone)]
pub struct SpdMatrix {
    rows: Vec<Vec<(usize, f64)>>,
}

/// The factored form `P A Pᵀ = L D Lᵀ`.
///
/// `L` is unit lower triangular and stored by columns; `D` is the diagonal.
/// [`Llt::solve`] applies the permutation, the two triangular passes, and
/// the inverse permutation.
#[derive(Debug, Clone)]
pub struct Llt {
    /// `perm[k]` is the original index eliminated at step `k`.
    perm: Vec<usize>,
    /// Columns of the strictly-lower part of `L`: `(row, value)` pairs in
    /// increasing row order.
    l_cols: Vec<Vec<(usize, f64)>>,
    /// The diagonal `D`.
    diag: Vec<f64>,
}

impl SpdMatrix {
    /// Create a matrix from sorted lower-triangle rows.
    ///
    /// # Errors
    ///
    /// Returns an error if a row is empty, unsorted, contains an entry past
    /// the diagonal, or lacks its diagonal entry.
    pub fn from_lower_rows(rows: Vec<Vec<(usize, f64)>>) -> SolveResult<Self> {
        for (r, row) in rows.iter().enumerate() {
            let Some(&(last_col, _)) = row.last() else {
                return Err(SolveError::InvalidStructure {
                    row: r,
                    message: "empty row",
                });
            };
            if last_col != r {
                return Err(SolveError::InvalidStructure {
                    row: r,
                    message: "row must end with its diagonal entry",
                });
            }
            if !row.windows(2).all(|w| w[0].0 < w[1].0) {
                return Err(SolveError::InvalidStructure {
                    row: r,
                    message: "row columns must be strictly increasing",
                });
            }
        }
        Ok(Self { rows })
    }

    /// Matrix dimension.
    #[must_use]
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    /// Compute a fill-reducing elimination order by greedy minimum degree.
    ///
    /// Eliminating a vertex turns its neighborhood into a clique; the next
    /// vertex is always one of minimum current degree (stale heap entries
    /// are skipped lazily).
    fn fill_reducing_permutation(&self) -> Vec<usize> {
        let n = self.rows.len();
        let mut adjacency: Vec<HashSet<usize>> = vec![HashSet::new(); n];
        for (r, row) in self.rows.iter().enumerate() {
            for &(c, _) in row {
                if c != r {
                    adjacency[r].insert(c);
                    adjacency[c].insert(r);
                }
            }
        }

        let mut heap: BinaryHeap<Reverse<(usize, usize)>> = (0..n)
            .map(|v| Reverse((adjacency[v].len(), v)))
            .collect();
        let mut eliminated = vec![false; n];
        let mut perm = Vec::with_capacity(n);

        while let Some(Reverse((degree, v))) = heap.pop() {
            if eliminated[v] || adjacency[v].len() != degree {
                continue; // stale entry
            }
            eliminated[v] = true;
            perm.push(v);

            let neighbors: Vec<usize> = adjacency[v].iter().copied().collect();
            for &u in &neighbors {
                adjacency[u].remove(&v);
            }
            for i in 0..neighbors.len() {
                for j in (i + 1)..neighbors.len() {
                    let (a, b) = (neighbors[i], neighbors[j]);
                    adjacency[a].insert(b);
                    adjacency[b].insert(a);
                }
            }
            for &u in &neighbors {
                heap.push(Reverse((adjacency[u].len(), u)));
            }
        }

        perm
    }

    /// Factor the matrix as `P A Pᵀ = L D Lᵀ`.
    ///
    /// Up-looking LDLᵀ: for each row the nonzero pattern is found by walking
    /// the elimination tree from the row's entries, then the sparse
    /// triangular solve runs over that pattern in topological order.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::NotPositiveDefinite`] when a pivot is not
    /// strictly positive.
    pub fn factor(&self) -> SolveResult<Llt> {
        let n = self.rows.len();
        let perm = self.fill_reducing_permutation();
        let mut inv = vec![0usize; n];
        for (k, &orig) in perm.iter().enumerate() {
            inv[orig] = k;
        }

        // columns of the upper triangle of P A Pᵀ (== rows of its lower
        // triangle), diagonal last
        let mut upper: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        for (r, row) in self.rows.iter().enumerate() {
            for &(c, v) in row {
                let (pr, pc) = (inv[r], inv[c]);
                let (hi, lo) = if pr >= pc { (pr, pc) } else { (pc, pr) };
                upper[hi].push((lo, v));
            }
        }
        for col in &mut upper {
            col.sort_unstable_by_key(|&(i, _)| i);
        }

        const NONE: usize = usize::MAX;
        let mut l_cols: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        let mut diag = vec![0.0f64; n];
        let mut parent = vec![NONE; n];
        let mut flag = vec![NONE; n];
        let mut y = vec![0.0f64; n];
        let mut pattern = vec![0usize; n];
        let mut path = vec![0usize; n];

        for k in 0..n {
            flag[k] = k;
            let mut top = n;
            diag[k] = 0.0;

            for &(i, v) in &upper[k] {
                if i == k {
                    diag[k] += v;
                    continue;
                }
                y[i] += v;
                // walk up the elimination tree collecting the new path
                let mut len = 0;
                let mut node = i;
                while flag[node] != k {
                    path[len] = node;
                    len += 1;
                    flag[node] = k;
                    if parent[node] == NONE {
                        parent[node] = k;
                    }
                    node = parent[node];
                }
                // reverse onto the stack: descendants end up processed first
                while len > 0 {
                    len -= 1;
                    top -= 1;
                    pattern[top] = path[len];
                }
            }

            for t in top..n {
                let j = pattern[t];
                let yj = y[j];
                y[j] = 0.0;
                for &(r, lx) in &l_cols[j] {
                    y[r] -= lx * yj;
                }
                let l_kj = yj / diag[j];
                diag[k] -= l_kj * yj;
                l_cols[j].push((k, l_kj));
            }

            if diag[k] <= 0.0 {
                debug!(row = k, pivot = diag[k], "non-positive pivot");
                return Err(SolveError::NotPositiveDefinite { row: k });
            }
        }

        Ok(Llt { perm, l_cols, diag })
    }
}

impl Llt {
    /// Matrix dimension.
    #[must_use]
    pub fn size(&self) -> usize {
        self.diag.len()
    }

    /// Solve `A x = b`.
    ///
    /// Applies the permutation, forward-substitutes through `L`, scales by
    /// `D⁻¹`, back-substitutes through `Lᵀ`, and un-permutes.
    #[must_use]
    pub fn solve(&self, b: &[f64]) -> Vec<f64> {
        let n = self.diag.len();
        let mut x: Vec<f64> = (0..n).map(|k| b[self.perm[k]]).collect();

        // forward: L y = P b
        for j in 0..n {
            let xj = x[j];
            for &(r, lx) in &self.l_cols[j] {
                x[r] -= lx * xj;
            }
        }
        // diagonal
        for (xi, d) in x.iter_mut().zip(&self.diag) {
            *xi /= d;
        }
        // backward: Lᵀ z = y
        for j in (0..n).rev() {
            let mut xj = x[j];
            for &(r, lx) in &self.l_cols[j] {
                xj -= lx * x[r];
            }
            x[j] = xj;
        }

        // un-permute
        let mut out = vec![0.0f64; n];
        for (k, &orig) in self.perm.iter().enumerate() {
            out[orig] = x[k];
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Multiply the full symmetric matrix by a vector, from the lower rows.
    fn mul_sym(rows: &[Vec<(usize, f64)>], x: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; x.len()];
        for (r, row) in rows.iter().enumerate() {
            for &(c, v) in row {
                out[r] += v * x[c];
                if c != r {
                    out[c] += v * x[r];
                }
            }
        }
        out
    }

    #[test]
    fn three_by_three_reference_system() {
        let rows = vec![
            vec![(0, 4.0)],
            vec![(0, 1.0), (1, 5.0)],
            vec![(0, 2.0), (1, 3.0), (2, 10.0)],
        ];
        let llt = SpdMatrix::from_lower_rows(rows.clone()).unwrap().factor().unwrap();

        for b in [[1.0, 0.0, 0.0], [0.5, -2.0, 7.0], [3.0, 3.0, 3.0]] {
            let x = llt.solve(&b);
            let ax = mul_sym(&rows, &x);
            for (got, want) in ax.iter().zip(&b) {
                assert!((got - want).abs() < 1e-10, "residual too large");
            }
        }
    }

    #[test]
    fn indefinite_matrix_rejected() {
        let rows = vec![vec![(0, 1.0)], vec![(0, 2.0), (1, 1.0)]];
        // [[1, 2], [2, 1]] has a negative eigenvalue
        let result = SpdMatrix::from_lower_rows(rows).unwrap().factor();
        assert!(matches!(result, Err(SolveError::NotPositiveDefinite { .. })));
    }

    #[test]
    fn structure_validation() {
        assert!(SpdMatrix::from_lower_rows(vec![vec![]]).is_err());
        // missing diagonal
        assert!(SpdMatrix::from_lower_rows(vec![vec![(0, 1.0)], vec![(0, 1.0)]]).is_err());
        // unsorted
        assert!(
            SpdMatrix::from_lower_rows(vec![vec![(0, 1.0)], vec![(0, 1.0), (1, 2.0)], vec![
                (1, 1.0),
                (0, 1.0),
                (2, 3.0)
            ]])
            .is_err()
        );
    }

    #[test]
    fn random_diagonally_dominant_systems() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..100 {
            let n = rng.gen_range(5..40);
            // ~10% fill below the diagonal
            let mut rows: Vec<Vec<(usize, f64)>> = (0..n).map(|_| Vec::new()).collect();
            let mut row_sums = vec![0.0f64; n];
            for r in 1..n {
                for c in 0..r {
                    if rng.gen_bool(0.1) {
                        let v = rng.gen_range(-1.0..1.0);
                        rows[r].push((c, v));
                        row_sums[r] += v.abs();
                        row_sums[c] += v.abs();
                    }
                }
            }
            for (r, row) in rows.iter_mut().enumerate() {
                // strict diagonal dominance makes the matrix SPD
                row.push((r, row_sums[r] + rng.gen_range(0.5..2.0)));
            }

            let llt = SpdMatrix::from_lower_rows(rows.clone()).unwrap().factor().unwrap();
            let b: Vec<f64> = (0..n).map(|_| rng.gen_range(-5.0..5.0)).collect();
            let x = llt.solve(&b);
            let ax = mul_sym(&rows, &x);
            for (got, want) in ax.iter().zip(&b) {
                assert!((got - want).abs() < 1e-8, "residual {}", (got - want).abs());
            }
        }
    }

    #[test]
    fn identity_permutation_not_required() {
        // an arrow matrix: the dense first row forces reordering to pay off
        let n = 12;
        let mut rows: Vec<Vec<(usize, f64)>> = Vec::new();
        rows.push(vec![(0, 10.0)]);
        for r in 1..n {
            rows.push(vec![(0, 1.0), (r, 10.0)]);
        }
        let llt = SpdMatrix::from_lower_rows(rows.clone()).unwrap().factor().unwrap();
        let b: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let x = llt.solve(&b);
        let ax = mul_sym(&rows, &x);
        for (got, want) in ax.iter().zip(&b) {
            assert_relative_eq!(got, want, epsilon = 1e-10);
        }
    }
}

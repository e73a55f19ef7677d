use std::f64::consts::PI;

/// Normalised sinc, `sin(πd) / (πd)`, with `sinc(0) = 1`.
#[inline]
pub fn sinc(d: f64) -> f64 {
    if d == 0.0 {
        1.0
    } else {
        let pi_d = PI * d;
        pi_d.sin() / pi_d
    }
}

/// Maps a mesh frequency index in `[0, mesh)` onto its signed representative
/// in `[-mesh/2, mesh/2)`.
#[inline]
pub fn shifted_frequency(n: usize, mesh: usize) -> isize {
    let m = mesh as isize;
    n as isize - (n as f64 / mesh as f64).round() as isize * m
}

/// Signed frequency for the centred loops of the error estimators, folded
/// back into `[0, mesh)` for table lookups.
#[inline]
pub fn unshifted_frequency(n: isize, mesh: usize) -> usize {
    n.rem_euclid(mesh as isize) as usize
}

/// True when `n` is a multiple of half the mesh, i.e. `2n ≡ 0 (mod mesh)`.
/// For odd meshes only `n = 0` qualifies.
#[inline]
pub fn is_half_mesh_multiple(n: usize, mesh: usize) -> bool {
    (2 * n) % mesh == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn sinc_is_one_at_origin_and_zero_at_integers() {
        assert_eq!(sinc(0.0), 1.0);
        for k in 1..5 {
            assert!(sinc(k as f64).abs() < TOLERANCE);
            assert!(sinc(-(k as f64)).abs() < TOLERANCE);
        }
    }

    #[test]
    fn sinc_at_half_is_two_over_pi() {
        assert!((sinc(0.5) - 2.0 / PI).abs() < TOLERANCE);
        assert!((sinc(-0.5) - 2.0 / PI).abs() < TOLERANCE);
    }

    #[test]
    fn shifted_frequency_covers_centered_range() {
        let mesh = 8;
        let shifted: Vec<isize> = (0..mesh).map(|n| shifted_frequency(n, mesh)).collect();
        assert_eq!(shifted, vec![0, 1, 2, 3, -4, -3, -2, -1]);
    }

    #[test]
    fn shifted_frequency_handles_odd_meshes() {
        let shifted: Vec<isize> = (0..5).map(|n| shifted_frequency(n, 5)).collect();
        assert_eq!(shifted, vec![0, 1, 2, -2, -1]);
    }

    #[test]
    fn unshifted_frequency_inverts_shift() {
        for mesh in [6usize, 7, 16] {
            for n in 0..mesh {
                assert_eq!(unshifted_frequency(shifted_frequency(n, mesh), mesh), n);
            }
        }
    }

    #[test]
    fn half_mesh_multiples_on_even_and_odd_meshes() {
        assert!(is_half_mesh_multiple(0, 8));
        assert!(is_half_mesh_multiple(4, 8));
        assert!(!is_half_mesh_multiple(2, 8));
        assert!(is_half_mesh_multiple(0, 7));
        assert!(!is_half_mesh_multiple(3, 7));
        assert!(!is_half_mesh_multiple(4, 7));
    }
}

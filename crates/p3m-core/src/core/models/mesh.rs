use rustfft::num_complex::Complex;
use serde::Deserialize;

/// Folds a (possibly negative) mesh coordinate into `[0, size)`.
#[inline]
pub fn wrap(index: isize, size: usize) -> usize {
    index.rem_euclid(size as isize) as usize
}

/// Periodic index folding used by charge assignment and force gather.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WrapStrategy {
    /// Euclidean remainder; valid for every mesh size.
    #[default]
    Modulo,
    /// `index & (size - 1)`; only valid when `size` is a power of two.
    Bitmask,
}

impl WrapStrategy {
    #[inline]
    pub fn apply(self, index: isize, size: usize) -> usize {
        match self {
            WrapStrategy::Modulo => wrap(index, size),
            WrapStrategy::Bitmask => (index & (size as isize - 1)) as usize,
        }
    }

    pub fn supports(self, size: usize) -> bool {
        match self {
            WrapStrategy::Modulo => size > 0,
            WrapStrategy::Bitmask => size.is_power_of_two(),
        }
    }
}

/// Periodic cubic grid of `size³` complex values.
///
/// The flat layout is `(i * size + j) * size + k`, with `k` the fastest
/// running coordinate. The primary assignment grid lives in the real parts,
/// the interlaced grid in the imaginary parts.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    size: usize,
    data: Vec<Complex<f64>>,
}

impl Mesh {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            data: vec![Complex::new(0.0, 0.0); size * size * size],
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        (i * self.size + j) * self.size + k
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> Complex<f64> {
        self.data[self.index(i, j, k)]
    }

    pub fn data(&self) -> &[Complex<f64>] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [Complex<f64>] {
        &mut self.data
    }

    /// Resets every cell to zero; called at the start of each assignment cycle.
    pub fn clear(&mut self) {
        self.data.fill(Complex::new(0.0, 0.0));
    }

    /// Sum of the real parts, i.e. the total charge on the primary grid.
    pub fn total_real(&self) -> f64 {
        self.data.iter().map(|c| c.re).sum()
    }

    /// Sum of the imaginary parts, i.e. the total charge on the interlaced grid.
    pub fn total_imag(&self) -> f64 {
        self.data.iter().map(|c| c.im).sum()
    }
}

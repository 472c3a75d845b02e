/// Arithmetic mean of a slice
#[inline]
pub fn mean(slice: &[f64]) -> f64 {
    let (sum, len) = slice.iter().fold((0.0, 0), |acc, x| (acc.0 + x, acc.1 + 1));
    sum / len as f64
}

/// Calculate the standard deviation (population) of a slice
#[inline]
pub fn stddev(slice: &[f64]) -> f64 {
    let n = slice.len() as f64;
    let mean = mean(slice);
    (slice.iter().fold(0.0f64, |acc, x| acc + (x - mean).powi(2)) / n).sqrt()
}

//! Small in-place array helpers used by the framed transforms.
//!
//! None of these allocate, which makes them safe to call from the audio path.

/// Circularly shifts `data` by `shift` positions.
///
/// A positive shift moves samples towards higher indices, so `out[i]` equals
/// `in[(i - shift) mod len]`. Any integer shift is accepted.
pub fn circshift(data: &mut [f64], shift: isize) {
    let len = data.len();
    if len == 0 {
        return;
    }
    let k = shift.rem_euclid(len as isize) as usize;
    if k != 0 {
        data.rotate_right(k);
    }
}

/// Moves the zero-frequency (or zero-time) sample of a centred array to index 0.
///
/// Equivalent to `circshift(data, -(len / 2))`.
pub fn ifftshift(data: &mut [f64]) {
    let half = data.len() / 2;
    data.rotate_left(half);
}

/// Moves index 0 to the centre of the array.
///
/// Equivalent to `circshift(data, (len + 1) / 2)`; undoes [`ifftshift`].
pub fn fftshift(data: &mut [f64]) {
    let half = data.len() / 2;
    data.rotate_right(half);
}

/// Wraps `input` around a circle of `out.len()` samples and sums the overlaps.
///
/// `out[i] = sum_k in[i + k * out.len()]`. When `input` is shorter than `out`
/// the remaining samples are zero, so folding doubles as zero padding.
pub fn fold(input: &[f64], out: &mut [f64]) {
    out.fill(0.0);
    if out.is_empty() {
        return;
    }
    for chunk in input.chunks(out.len()) {
        for (o, &x) in out.iter_mut().zip(chunk) {
            *o += x;
        }
    }
}

/// Repeats `input` periodically to fill `out`.
///
/// `out[i] = in[i mod input.len()]`. An empty input fills `out` with zeros.
pub fn periodize(input: &[f64], out: &mut [f64]) {
    if input.is_empty() {
        out.fill(0.0);
        return;
    }
    for chunk in out.chunks_mut(input.len()) {
        let n = chunk.len();
        chunk.copy_from_slice(&input[..n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circshift_positive() {
        let mut v = [0.0, 1.0, 2.0, 3.0, 4.0];
        circshift(&mut v, 2);
        assert_eq!(v, [3.0, 4.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_circshift_negative_and_large() {
        let mut v = [0.0, 1.0, 2.0, 3.0, 4.0];
        circshift(&mut v, -1);
        assert_eq!(v, [1.0, 2.0, 3.0, 4.0, 0.0]);

        let mut w = [0.0, 1.0, 2.0, 3.0, 4.0];
        circshift(&mut w, 12);
        assert_eq!(w, [3.0, 4.0, 0.0, 1.0, 2.0]);

        let mut empty: [f64; 0] = [];
        circshift(&mut empty, 3);
    }

    #[test]
    fn test_circshift_inverse() {
        let original = [1.0, 5.0, 2.0, 8.0, 3.0, 7.0];
        let mut v = original;
        circshift(&mut v, -4);
        circshift(&mut v, 4);
        assert_eq!(v, original);
    }

    #[test]
    fn test_fftshift_odd_and_even() {
        let mut even = [0.0, 1.0, 2.0, 3.0];
        fftshift(&mut even);
        assert_eq!(even, [2.0, 3.0, 0.0, 1.0]);

        let mut odd = [0.0, 1.0, 2.0, 3.0, 4.0];
        fftshift(&mut odd);
        assert_eq!(odd, [3.0, 4.0, 0.0, 1.0, 2.0]);
        ifftshift(&mut odd);
        assert_eq!(odd, [0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_fold_wraps_and_sums() {
        let input = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let mut out = [0.0; 3];
        fold(&input, &mut out);
        assert_eq!(out, [1.0 + 4.0 + 7.0, 2.0 + 5.0, 3.0 + 6.0]);
    }

    #[test]
    fn test_fold_zero_pads_short_input() {
        let mut out = [9.0; 5];
        fold(&[1.0, 2.0], &mut out);
        assert_eq!(out, [1.0, 2.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_periodize() {
        let mut out = [0.0; 7];
        periodize(&[1.0, 2.0, 3.0], &mut out);
        assert_eq!(out, [1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn test_fold_periodize_adjoint() {
        // <fold(x), y> == <x, periodize(y)>
        let x: Vec<f64> = (0..11).map(|i| (i as f64 * 0.7).sin()).collect();
        let y = [0.3, -1.2, 2.5, 0.9];

        let mut folded = [0.0; 4];
        fold(&x, &mut folded);
        let lhs: f64 = folded.iter().zip(&y).map(|(a, b)| a * b).sum();

        let mut periodic = vec![0.0; x.len()];
        periodize(&y, &mut periodic);
        let rhs: f64 = x.iter().zip(&periodic).map(|(a, b)| a * b).sum();

        assert!((lhs - rhs).abs() < 1e-12);
    }

    #[test]
    fn test_fold_of_periodize_scales() {
        // Periodizing to an exact multiple and folding back multiplies by the count.
        let y = [1.0, -2.0, 3.0];
        let mut periodic = [0.0; 9];
        periodize(&y, &mut periodic);
        let mut back = [0.0; 3];
        fold(&periodic, &mut back);
        assert_eq!(back, [3.0, -6.0, 9.0]);
    }
}

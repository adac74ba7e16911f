/// Stable LSD radix sort of parallel index/value arrays, keyed by index.
/// - `inds` ends up ascending
/// - `vals` are moved along with their index
/// - equal indices keep their input order
///
/// Byte passes whose digit is identical for every key are skipped, so the
/// common case of a small vocabulary costs one or two passes instead of four.
pub fn radix_sort_by_index<N: Copy + Default>(inds: &mut [u32], vals: &mut [N]) {
    assert_eq!(inds.len(), vals.len(), "inds and vals must have the same length");
    let n = inds.len();
    if n <= 1 || is_sorted_by_index(inds) {
        return;
    }
    if n <= 32 {
        insertion_sort_by_index(inds, vals);
        return;
    }

    let mut scratch_inds = vec![0u32; n];
    let mut scratch_vals = vec![N::default(); n];

    // true の間は結果が scratch 側にある
    let mut in_scratch = false;

    for shift in [0u32, 8, 16, 24] {
        let (src_i, src_v, dst_i, dst_v) = if in_scratch {
            (&scratch_inds[..], &scratch_vals[..], &mut *inds, &mut *vals)
        } else {
            (&inds[..], &vals[..], &mut scratch_inds[..], &mut scratch_vals[..])
        };

        let mut buckets = [0usize; 256];
        for &k in src_i {
            buckets[digit(k, shift)] += 1;
        }
        if buckets.iter().any(|&c| c == n) {
            continue;
        }

        let mut offset = 0usize;
        for slot in buckets.iter_mut() {
            let count = *slot;
            *slot = offset;
            offset += count;
        }

        for (&k, &v) in src_i.iter().zip(src_v.iter()) {
            let b = digit(k, shift);
            let pos = buckets[b];
            buckets[b] = pos + 1;
            dst_i[pos] = k;
            dst_v[pos] = v;
        }
        in_scratch = !in_scratch;
    }

    if in_scratch {
        inds.copy_from_slice(&scratch_inds);
        vals.copy_from_slice(&scratch_vals);
    }
}

#[inline(always)]
fn digit(key: u32, shift: u32) -> usize {
    ((key >> shift) & 0xFF) as usize
}

#[inline]
fn is_sorted_by_index(inds: &[u32]) -> bool {
    inds.windows(2).all(|w| w[0] <= w[1])
}

#[inline]
fn insertion_sort_by_index<N: Copy>(inds: &mut [u32], vals: &mut [N]) {
    for i in 1..inds.len() {
        let mut j = i;
        while j > 0 && inds[j] < inds[j - 1] {
            inds.swap(j, j - 1);
            vals.swap(j, j - 1);
            j -= 1;
        }
    }
}

/// Owned variant of [`radix_sort_by_index`].
#[inline]
pub fn sorted_by_index<N: Copy + Default>(mut inds: Vec<u32>, mut vals: Vec<N>) -> (Vec<u32>, Vec<N>) {
    radix_sort_by_index(&mut inds, &mut vals);
    (inds, vals)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct XorShift(u32);

    impl XorShift {
        fn next(&mut self) -> u32 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            self.0 = x;
            x
        }
    }

    fn stable_reference(inds: &[u32], vals: &[f64]) -> (Vec<u32>, Vec<f64>) {
        let mut pairs: Vec<(u32, f64)> = inds.iter().copied().zip(vals.iter().copied()).collect();
        pairs.sort_by_key(|p| p.0);
        pairs.into_iter().unzip()
    }

    #[test]
    fn trivial_inputs_are_untouched() {
        let mut inds: Vec<u32> = vec![];
        let mut vals: Vec<f64> = vec![];
        radix_sort_by_index(&mut inds, &mut vals);
        assert!(inds.is_empty());

        let mut inds = vec![9u32];
        let mut vals = vec![0.5f64];
        radix_sort_by_index(&mut inds, &mut vals);
        assert_eq!((inds, vals), (vec![9], vec![0.5]));
    }

    #[test]
    fn duplicates_keep_input_order() {
        let mut inds = vec![4u32, 2, 4, 0, 2];
        let mut vals = vec![0.0f64, 1.0, 2.0, 3.0, 4.0];
        radix_sort_by_index(&mut inds, &mut vals);
        assert_eq!(inds, vec![0, 2, 2, 4, 4]);
        assert_eq!(vals, vec![3.0, 1.0, 4.0, 0.0, 2.0]);
    }

    #[test]
    fn matches_reference_across_sizes_and_key_widths() {
        let mut rng = XorShift(0x9E37_79B9);
        for &mask in &[0x0000_00FFu32, 0x0000_FFFF, 0xFFFF_FFFF] {
            for &n in &[2usize, 31, 32, 33, 100, 257, 2048] {
                let inds: Vec<u32> = (0..n).map(|_| rng.next() & mask).collect();
                let vals: Vec<f64> = (0..n).map(|i| i as f64).collect();
                let (want_i, want_v) = stable_reference(&inds, &vals);

                let (got_i, got_v) = sorted_by_index(inds, vals);
                assert_eq!(got_i, want_i, "mask={mask:#x} n={n}");
                assert_eq!(got_v, want_v, "mask={mask:#x} n={n}");
            }
        }
    }

    #[test]
    fn single_varying_byte_is_copied_back() {
        // 下位バイトだけが異なる -> 1 pass のみ実行され scratch から戻す必要がある
        let mut inds: Vec<u32> = (0..64u32).rev().map(|k| 0x0100_0000 | k).collect();
        let mut vals: Vec<f64> = inds.iter().map(|&k| (k & 0xFF) as f64).collect();
        radix_sort_by_index(&mut inds, &mut vals);
        assert!(is_sorted_by_index(&inds));
        for (k, v) in inds.iter().zip(vals.iter()) {
            assert_eq!((k & 0xFF) as f64, *v);
        }
    }
}

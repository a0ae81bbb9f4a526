/// Resizes `buf` to `len` elements, reusing its allocation when it can hold
/// `capacity` (defaults to `len`, never below it).
///
/// With enough capacity the existing prefix is kept and only the length
/// changes. Otherwise the old contents are dropped and a fresh allocation of
/// `capacity` is made; this is a reset, not a grow-and-copy. New slots are
/// filled with `T::default()`. Capacity never shrinks.
///
/// Returns `true` when a fresh allocation was made.
pub fn ensure_capacity_and_reset<T: Clone + Default>(
    buf: &mut Vec<T>,
    len: usize,
    capacity: Option<usize>,
) -> bool {
    let capacity = capacity.unwrap_or(len).max(len);
    let fresh = buf.capacity() < capacity;
    if fresh {
        *buf = Vec::with_capacity(capacity);
    } else {
        buf.truncate(len);
    }
    buf.resize(len, T::default());
    fresh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_allocation_when_capacity_suffices() {
        let mut buf: Vec<u32> = Vec::with_capacity(16);
        buf.extend([1, 2, 3, 4]);
        let ptr = buf.as_ptr();
        assert!(!ensure_capacity_and_reset(&mut buf, 2, Some(8)));
        assert_eq!(buf, vec![1, 2]);
        assert_eq!(buf.as_ptr(), ptr);
        assert!(buf.capacity() >= 16);
    }

    #[test]
    fn allocates_fresh_without_copying() {
        let mut buf: Vec<u32> = vec![7, 7];
        assert!(ensure_capacity_and_reset(&mut buf, 3, Some(32)));
        assert_eq!(buf, vec![0, 0, 0]);
        assert!(buf.capacity() >= 32);
    }

    #[test]
    fn hint_defaults_to_len_and_never_undercuts_it() {
        let mut buf: Vec<u8> = Vec::new();
        ensure_capacity_and_reset(&mut buf, 5, None);
        assert_eq!(buf.len(), 5);
        assert!(buf.capacity() >= 5);

        let mut buf: Vec<u8> = Vec::new();
        ensure_capacity_and_reset(&mut buf, 6, Some(2));
        assert_eq!(buf.len(), 6);
    }

    #[test]
    fn capacity_never_shrinks() {
        let mut buf: Vec<u64> = Vec::new();
        ensure_capacity_and_reset(&mut buf, 0, Some(64));
        let grown = buf.capacity();
        ensure_capacity_and_reset(&mut buf, 0, Some(4));
        ensure_capacity_and_reset(&mut buf, 1, None);
        assert!(buf.capacity() >= grown);
    }
}

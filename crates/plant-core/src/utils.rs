pub trait FloatProducer: ExactSizeIterator<Item = f32> + Sized {
    /// Position of the smallest value, NaN values ignored.
    fn arg_min(self) -> Option<usize> {
        let (mut i_min, mut v_min) = (0, f32::NAN);
        for (i, v) in self.enumerate() {
            if v < v_min || (v_min.is_nan() && !v.is_nan()) {
                (i_min, v_min) = (i, v)
            }
        }
        if v_min.is_nan() {
            None
        } else {
            Some(i_min)
        }
    }
}

impl<I> FloatProducer for I where I: ExactSizeIterator<Item = f32> {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn smallest_value() {
        assert_eq!([3., 1., 2.].into_iter().arg_min(), Some(1));
        assert_eq!([f32::NAN, 4., 5.].into_iter().arg_min(), Some(1));
        assert_eq!(Vec::<f32>::new().into_iter().arg_min(), None);
    }
}

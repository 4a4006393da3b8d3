use num_traits::{Float, FromPrimitive, NumAssign};

/// Scalar type of all solver arithmetic.
///
/// Implemented for f32 and f64.  The bounds are exactly what the solver
/// exercises: IEEE float semantics with compound assignment
/// ([Float](num_traits::Float), [NumAssign](num_traits::NumAssign)),
/// conversion from primitive constants
/// ([FromPrimitive](num_traits::FromPrimitive)), and the formatting
/// traits used by progress printing (`Display`, `LowerExp`) and by the
/// derived `Debug` output of the container types.

pub trait FloatT:
    Float + NumAssign + FromPrimitive + std::fmt::Display + std::fmt::LowerExp + std::fmt::Debug
{
}
impl FloatT for f32 {}
impl FloatT for f64 {}

/// Conversion of literal constants to [FloatT](crate::algebra::FloatT) values.
///
/// Lets numeric code write `(0.5).as_T()` for a constant of generic
/// scalar type instead of spelling out `T::from_f64(0.5).unwrap()` at
/// every use.  Only f64 literals appear in the solver, so only f64
/// carries the conversion.

#[allow(non_snake_case)]
pub trait AsFloatT<T> {
    fn as_T(&self) -> T;
}

impl<T: FloatT> AsFloatT<T> for f64 {
    #[inline]
    fn as_T(&self) -> T {
        T::from_f64(*self).unwrap()
    }
}

/// Trait for attempting to get a reference to a specific variant in an enum.
///
/// Enables safe downcasting from an enum to a specific variant's inner type.
pub trait TryAsRef<T> {
    /// Returns a reference to the inner type if the enum variant matches.
    fn try_as_ref(&self) -> Option<&T>;
}

/// Trait for attempting to get a mutable reference to a specific variant in an enum.
pub trait TryAsMut<T> {
    /// Returns a mutable reference to the inner type if the enum variant matches.
    fn try_as_mut(&mut self) -> Option<&mut T>;
}

/// Implements both `TryAsRef` and `TryAsMut` for an enum type.
///
/// # Example
/// ```
/// use tapir_utils::impl_try_as;
///
/// enum MyEnum {
///     Variant1(String),
///     Variant2(usize),
/// }
///
/// impl_try_as!(MyEnum, Variant1(String), Variant2(usize));
/// ```
#[macro_export]
macro_rules! impl_try_as {
    ($enum_type:ident, $($variant:ident($variant_type:ty)),* $(,)?) => {
        $(
            impl $crate::TryAsRef<$variant_type> for $enum_type {
                fn try_as_ref(&self) -> Option<&$variant_type> {
                    match self {
                        $enum_type::$variant(val) => Some(val),
                        _ => None,
                    }
                }
            }

            impl $crate::TryAsMut<$variant_type> for $enum_type {
                fn try_as_mut(&mut self) -> Option<&mut $variant_type> {
                    match self {
                        $enum_type::$variant(val) => Some(val),
                        _ => None,
                    }
                }
            }
        )*
    };
}

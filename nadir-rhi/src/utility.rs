macro_rules! resolve_count_function {
    ($unsigned:ty) => {
        $crate::paste! {
            /// Clamp an open-ended `count` starting at `base` to what remains of `total`.
            ///
            /// `0` and `MAX` both mean "everything from `base` on".
            pub(crate) fn [<resolve_count_ $unsigned>](base: $unsigned, count: $unsigned, total: $unsigned) -> $unsigned {
                let remaining = total.saturating_sub(base);
                if count == 0 {
                    remaining
                } else {
                    count.min(remaining)
                }
            }
        }
    };
}

resolve_count_function!(u32);

/// `Clone` for a backend-generic struct, field by field.
///
/// A derive would require the native object types to be `Clone` themselves, while the
/// fields only hold `Arc`s and `Handle`s of them.
macro_rules! impl_backend_clone {
    ($name:ident { $($field:ident),* $(,)? }) => {
        impl<B: $crate::backend::Backend> Clone for $name<B> {
            fn clone(&self) -> Self {
                Self { $($field: self.$field.clone()),* }
            }
        }
    };
}

/// `Clone`, `PartialEq`, `Eq` and `Hash` for a backend-generic cache key, field by field.
macro_rules! impl_backend_key {
    ($name:ident { $($field:ident),* $(,)? }) => {
        $crate::utility::impl_backend_clone!($name { $($field),* });

        impl<B: $crate::backend::Backend> PartialEq for $name<B> {
            fn eq(&self, other: &Self) -> bool {
                true $(&& self.$field == other.$field)*
            }
        }

        impl<B: $crate::backend::Backend> Eq for $name<B> {}

        impl<B: $crate::backend::Backend> std::hash::Hash for $name<B> {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                $(std::hash::Hash::hash(&self.$field, state);)*
            }
        }
    };
}

pub(crate) use impl_backend_clone;
pub(crate) use impl_backend_key;

/// Round `value` up to a multiple of `alignment`; an alignment of zero leaves it untouched.
pub(crate) fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return value;
    }
    value.div_ceil(alignment) * alignment
}

/// Every (mip, layer) pair of a subresource range, mip-major.
pub(crate) fn subresources(base_mip_level: u32, level_count: u32, base_array_layer: u32, layer_count: u32) -> impl Iterator<Item = (u32, u32)> {
    (base_mip_level..base_mip_level + level_count)
        .flat_map(move |mip| (base_array_layer..base_array_layer + layer_count).map(move |layer| (mip, layer)))
}

//! Collection aliases with the engine-wide hasher.

pub type DefaultHashBuilder = foldhash::fast::RandomState;

pub mod hashmap {
    pub use hashbrown::hash_map::EntryRef;

    pub type HashMap<K, V> = hashbrown::HashMap<K, V, super::DefaultHashBuilder>;
}

pub mod hashset {
    pub type HashSet<T> = hashbrown::HashSet<T, super::DefaultHashBuilder>;
}

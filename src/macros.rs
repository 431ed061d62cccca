//! # Internal Macros
//!
//! Boilerplate reduction for zerocopy header structs.
//!
//! ## zerocopy_accessors!
//!
//! Generates getter and setter methods for struct fields stored as
//! little-endian wrapper types.
//!
//! ### Usage
//!
//! ```ignore
//! use zerocopy::little_endian::U32;
//!
//! #[repr(C)]
//! struct Header {
//!     num_keys: U32,
//!     next_leaf: U32,
//! }
//!
//! impl Header {
//!     zerocopy_accessors! {
//!         num_keys: u32,
//!         next_leaf: u32,
//!     }
//! }
//!
//! // Generates:
//! // pub fn num_keys(&self) -> u32 { self.num_keys.get() }
//! // pub fn set_num_keys(&mut self, val: u32) { self.num_keys = U32::new(val); }
//! // pub fn next_leaf(&self) -> u32 { self.next_leaf.get() }
//! // pub fn set_next_leaf(&mut self, val: u32) { self.next_leaf = U32::new(val); }
//! ```

/// Generates getter and setter methods for zerocopy little-endian fields.
#[macro_export]
macro_rules! zerocopy_accessors {
    (@impl $field:ident, u32) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u32 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u32) {
                self.$field = ::zerocopy::little_endian::U32::new(val);
            }
        }
    };
    ($($field:ident : $ty:tt),* $(,)?) => {
        $(
            $crate::zerocopy_accessors!(@impl $field, $ty);
        )*
    };
}
